use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

/// Observable playback state, as last reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
    /// The engine reported a stream failure. Cleared by the next load.
    Error,
}

impl PlaybackStatus {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackStatus::Stopped => "stopped",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Error => "error",
        }
    }
}

/// Abstraction over the process that actually produces audio.
///
/// Every method is a non-blocking dispatch: it hands the request to the
/// engine and returns. Outcomes arrive asynchronously through the
/// [`StatusCell`], tagged with the generation the engine was given at load
/// time so late reports from an abandoned stream are discarded.
pub trait Engine: Send + Sync + 'static {
    /// Begin loading `url` and start playback once the stream opens.
    fn load(&self, generation: u64, url: &str) -> Result<(), PlaybackError>;
    fn play(&self) -> Result<(), PlaybackError>;
    fn pause(&self) -> Result<(), PlaybackError>;
    fn stop(&self) -> Result<(), PlaybackError>;
    fn set_volume(&self, percent: u8) -> Result<(), PlaybackError>;
}

struct Slot {
    generation: u64,
    status: PlaybackStatus,
}

/// Shared status mailbox between the engine's reader task and the facade.
///
/// Writers must pass the generation their stream was loaded under; a publish
/// carrying an older generation than the slot's is dropped, so a slow first
/// stream can never overwrite the state of the one that replaced it.
#[derive(Clone)]
pub struct StatusCell {
    slot: Arc<Mutex<Slot>>,
}

impl StatusCell {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                status: PlaybackStatus::Stopped,
            })),
        }
    }

    pub fn publish(&self, generation: u64, status: PlaybackStatus) {
        let mut slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if generation < slot.generation {
            return;
        }
        slot.generation = generation;
        slot.status = status;
    }

    pub fn get(&self) -> PlaybackStatus {
        match self.slot.lock() {
            Ok(slot) => slot.status,
            Err(poisoned) => poisoned.into_inner().status,
        }
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Playback facade. Owns the command side of the engine and the volume
/// setting; status flows back through the shared [`StatusCell`].
pub struct Player<E: Engine> {
    engine: E,
    cell: StatusCell,
    generation: AtomicU64,
    volume: u8,
    loaded: bool,
}

impl<E: Engine> Player<E> {
    pub fn new(engine: E, cell: StatusCell, volume: u8) -> Self {
        Self {
            engine,
            cell,
            generation: AtomicU64::new(0),
            volume: volume.min(100),
            loaded: false,
        }
    }

    /// Tune to `url`: bump the generation, reset status, and ask the engine
    /// to open the stream at the current volume.
    pub fn load(&mut self, url: &str) -> Result<(), PlaybackError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.cell.publish(generation, PlaybackStatus::Stopped);
        if let Err(e) = self.engine.load(generation, url) {
            self.cell.publish(generation, PlaybackStatus::Error);
            return Err(e);
        }
        if let Err(e) = self.engine.set_volume(self.volume) {
            self.cell.publish(generation, PlaybackStatus::Error);
            return Err(e);
        }
        self.loaded = true;
        Ok(())
    }

    pub fn play(&mut self) -> Result<(), PlaybackError> {
        self.require_loaded()?;
        self.engine.play()
    }

    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        self.require_loaded()?;
        self.engine.pause()
    }

    pub fn stop(&mut self) -> Result<(), PlaybackError> {
        self.require_loaded()?;
        self.engine.stop()
    }

    /// Set the volume as a percentage. Values above 100 are rejected and
    /// leave the previous setting in place.
    pub fn set_volume(&mut self, percent: u8) -> Result<(), PlaybackError> {
        if percent > 100 {
            return Err(PlaybackError::InvalidVolume(percent));
        }
        self.engine.set_volume(percent)?;
        self.volume = percent;
        Ok(())
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn status(&self) -> PlaybackStatus {
        self.cell.get()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn require_loaded(&self) -> Result<(), PlaybackError> {
        if self.loaded {
            Ok(())
        } else {
            Err(PlaybackError::EngineUnavailable("no stream loaded".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeEngine {
        calls: StdMutex<Vec<String>>,
        fail_load: bool,
        fail_volume: bool,
    }

    impl FakeEngine {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    impl Engine for Arc<FakeEngine> {
        fn load(&self, generation: u64, url: &str) -> Result<(), PlaybackError> {
            self.record(format!("load:{generation}:{url}"));
            if self.fail_load {
                return Err(PlaybackError::StreamOpen(url.to_string()));
            }
            Ok(())
        }

        fn play(&self) -> Result<(), PlaybackError> {
            self.record("play");
            Ok(())
        }

        fn pause(&self) -> Result<(), PlaybackError> {
            self.record("pause");
            Ok(())
        }

        fn stop(&self) -> Result<(), PlaybackError> {
            self.record("stop");
            Ok(())
        }

        fn set_volume(&self, percent: u8) -> Result<(), PlaybackError> {
            self.record(format!("volume:{percent}"));
            if self.fail_volume {
                return Err(PlaybackError::EngineUnavailable("volume refused".into()));
            }
            Ok(())
        }
    }

    fn player(fail_load: bool) -> (Arc<FakeEngine>, StatusCell, Player<Arc<FakeEngine>>) {
        let engine = Arc::new(FakeEngine {
            fail_load,
            ..FakeEngine::default()
        });
        let cell = StatusCell::new();
        let player = Player::new(Arc::clone(&engine), cell.clone(), 80);
        (engine, cell, player)
    }

    #[test]
    fn test_load_dispatches_with_fresh_generation() {
        let (engine, _cell, mut player) = player(false);
        player.load("http://a").unwrap();
        player.load("http://b").unwrap();
        let calls = engine.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                "load:1:http://a",
                "volume:80",
                "load:2:http://b",
                "volume:80"
            ]
        );
        assert_eq!(player.generation(), 2);
    }

    #[test]
    fn test_failed_load_reports_error_status() {
        let (_engine, _cell, mut player) = player(true);
        let err = player.load("http://dead").unwrap_err();
        assert_eq!(err, PlaybackError::StreamOpen("http://dead".into()));
        assert_eq!(player.status(), PlaybackStatus::Error);
        // Nothing is loaded, so transport controls refuse to dispatch.
        assert!(matches!(
            player.play().unwrap_err(),
            PlaybackError::EngineUnavailable(_)
        ));
    }

    #[test]
    fn test_failed_volume_after_load_reports_error_status() {
        let engine = Arc::new(FakeEngine {
            fail_volume: true,
            ..FakeEngine::default()
        });
        let cell = StatusCell::new();
        let mut player = Player::new(Arc::clone(&engine), cell, 80);
        let err = player.load("http://a").unwrap_err();
        assert!(matches!(err, PlaybackError::EngineUnavailable(_)));
        assert_eq!(player.status(), PlaybackStatus::Error);
        // The stream never finished loading from the facade's view.
        assert!(player.play().is_err());
    }

    #[test]
    fn test_controls_require_a_loaded_stream() {
        let (_engine, _cell, mut player) = player(false);
        assert!(player.play().is_err());
        assert!(player.pause().is_err());
        assert!(player.stop().is_err());
        player.load("http://a").unwrap();
        assert!(player.play().is_ok());
        assert!(player.pause().is_ok());
        assert!(player.stop().is_ok());
    }

    #[test]
    fn test_set_volume_rejects_out_of_range() {
        let (engine, _cell, mut player) = player(false);
        assert_eq!(
            player.set_volume(150).unwrap_err(),
            PlaybackError::InvalidVolume(150)
        );
        assert_eq!(player.volume(), 80);
        player.set_volume(100).unwrap();
        assert_eq!(player.volume(), 100);
        let calls = engine.calls.lock().unwrap();
        assert_eq!(*calls, vec!["volume:100"]);
    }

    #[test]
    fn test_stale_generation_publish_is_dropped() {
        let cell = StatusCell::new();
        cell.publish(2, PlaybackStatus::Playing);
        // A report from the stream loaded under generation 1 arrives late.
        cell.publish(1, PlaybackStatus::Error);
        assert_eq!(cell.get(), PlaybackStatus::Playing);
        cell.publish(2, PlaybackStatus::Paused);
        assert_eq!(cell.get(), PlaybackStatus::Paused);
    }

    #[test]
    fn test_load_clears_previous_error() {
        let (_engine, cell, mut player) = player(false);
        player.load("http://a").unwrap();
        cell.publish(1, PlaybackStatus::Error);
        assert_eq!(player.status(), PlaybackStatus::Error);
        player.load("http://b").unwrap();
        assert_eq!(player.status(), PlaybackStatus::Stopped);
    }
}
