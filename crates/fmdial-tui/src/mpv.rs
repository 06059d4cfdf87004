//! mpv engine driver with separated reader/writer tasks.
//!
//! Architecture:
//!
//! ```text
//!   MpvEngine::spawn()
//!         │
//!         ├── writer_task   ← receives serialised JSON lines via mpsc → socket
//!         ├── reader_task   ← reads JSON lines from socket
//!         │                      ├── response (has request_id) → logged, errors → StatusCell
//!         │                      └── property-change / end-file → StatusCell
//!         └── monitor_task  ← waits on the child, publishes Error if it dies
//! ```
//!
//! The `Engine` trait methods are synchronous fire-and-forget dispatches into
//! the writer channel; playback state flows back through the shared
//! [`StatusCell`] tagged with the generation of the stream it belongs to.
//!
//! Platform notes:
//! - Unix:   Unix domain sockets
//! - Windows: Named pipes  \\.\pipe\<name>

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use fmdial_core::playback::{Engine, PlaybackStatus, StatusCell};
use fmdial_core::{platform, PlaybackError};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

/// Fixed observe_property IDs.  We match on these in property-change events.
const OBS_CORE_IDLE: u64 = 1;
const OBS_PAUSE: u64 = 2;

/// Playback engine backed by an external mpv process.
///
/// Cheap to clone; all clones share the writer channel and generation slot.
#[derive(Clone)]
pub struct MpvEngine {
    cmd_tx: mpsc::Sender<String>,
    generation: Arc<AtomicU64>,
}

impl MpvEngine {
    /// Spawn an mpv process, connect to its IPC socket, and start the I/O
    /// tasks. Status updates are published into `cell`.
    pub async fn spawn(cell: StatusCell, volume: u8) -> anyhow::Result<Self> {
        let mpv_binary = platform::find_mpv_binary()
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found (install mpv or place it beside the executable)"))?;

        info!("mpv: spawning {}", mpv_binary.display());
        let ipc_arg = platform::mpv_socket_arg();
        let vol_arg = format!("--volume={}", volume.min(100));

        #[cfg(unix)]
        let socket_path = std::path::PathBuf::from(platform::mpv_socket_name());
        #[cfg(unix)]
        let _ = tokio::fs::remove_file(&socket_path).await;

        let mut child = tokio::process::Command::new(mpv_binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg(&ipc_arg)
            .arg("--quiet")
            .arg(vol_arg)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;

        let generation = Arc::new(AtomicU64::new(0));
        let (cmd_tx, cmd_rx) = mpsc::channel::<String>(64);

        #[cfg(unix)]
        {
            // Wait for the IPC socket to appear
            for _ in 0..50 {
                tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                if socket_path.exists() {
                    break;
                }
            }
            if !socket_path.exists() {
                let _ = child.kill().await;
                anyhow::bail!("mpv IPC socket did not appear");
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

            let stream = UnixStream::connect(&socket_path).await?;
            info!("mpv: connected to IPC socket");
            let (read_half, write_half) = stream.into_split();
            tokio::spawn(writer_task(write_half, cmd_rx));
            tokio::spawn(reader_task(
                BufReader::new(read_half),
                cell.clone(),
                generation.clone(),
            ));
        }

        #[cfg(windows)]
        {
            let pipe_path = format!(r"\\.\pipe\{}", platform::mpv_socket_name());
            let mut pipe = None;
            for _ in 0..50 {
                tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                    pipe = Some(client);
                    break;
                }
            }
            let Some(pipe) = pipe else {
                let _ = child.kill().await;
                anyhow::bail!("mpv named pipe did not appear");
            };
            info!("mpv: connected to named pipe");
            let (read_half, write_half) = tokio::io::split(pipe);
            tokio::spawn(writer_task(write_half, cmd_rx));
            tokio::spawn(reader_task(
                BufReader::new(read_half),
                cell.clone(),
                generation.clone(),
            ));
        }

        // Monitor the child; if mpv dies the whole engine is gone.
        let monitor_cell = cell.clone();
        let monitor_gen = generation.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => warn!("mpv process exited: {}", status),
                Err(e) => warn!("mpv process wait failed: {}", e),
            }
            monitor_cell.publish(monitor_gen.load(Ordering::SeqCst), PlaybackStatus::Error);
        });

        let engine = Self { cmd_tx, generation };
        engine.dispatch(json!(["observe_property", OBS_CORE_IDLE, "core-idle"]))?;
        engine.dispatch(json!(["observe_property", OBS_PAUSE, "pause"]))?;
        Ok(engine)
    }

    /// Ask mpv to exit. The monitor task reports the resulting death.
    pub fn quit(&self) {
        let _ = self.dispatch(json!(["quit"]));
    }

    fn dispatch(&self, command: Value) -> Result<(), PlaybackError> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = msg.to_string();
        raw.push('\n');
        self.cmd_tx
            .try_send(raw)
            .map_err(|_| PlaybackError::EngineUnavailable("mpv command channel closed or full".into()))
    }
}

impl Engine for MpvEngine {
    fn load(&self, generation: u64, url: &str) -> Result<(), PlaybackError> {
        self.generation.store(generation, Ordering::SeqCst);
        self.dispatch(json!(["loadfile", url]))?;
        self.dispatch(json!(["set_property", "pause", false]))
    }

    fn play(&self) -> Result<(), PlaybackError> {
        self.dispatch(json!(["set_property", "pause", false]))
    }

    fn pause(&self) -> Result<(), PlaybackError> {
        self.dispatch(json!(["set_property", "pause", true]))
    }

    fn stop(&self) -> Result<(), PlaybackError> {
        self.dispatch(json!(["stop"]))
    }

    fn set_volume(&self, percent: u8) -> Result<(), PlaybackError> {
        self.dispatch(json!(["set_property", "volume", percent.min(100)]))
    }
}

// ── reader task ───────────────────────────────────────────────────────────────

/// Tracks the booleans mpv reports and folds them into a [`PlaybackStatus`].
#[derive(Default)]
struct StreamState {
    idle: bool,
    paused: bool,
    failed: bool,
}

impl StreamState {
    fn status(&self) -> PlaybackStatus {
        if !self.idle {
            PlaybackStatus::Playing
        } else if self.failed {
            PlaybackStatus::Error
        } else if self.paused {
            PlaybackStatus::Paused
        } else {
            PlaybackStatus::Stopped
        }
    }
}

async fn reader_task<R>(mut reader: BufReader<R>, cell: StatusCell, generation: Arc<AtomicU64>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut state = StreamState {
        idle: true,
        ..StreamState::default()
    };
    let mut last_gen = generation.load(Ordering::SeqCst);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                // mpv events carry no stream identity, so everything is
                // stamped with the generation current at receipt. A straggler
                // from a superseded stream can land under the new generation;
                // the failure-latch reset on generation change and on
                // start-file is what contains it.
                let gen = generation.load(Ordering::SeqCst);
                if gen != last_gen {
                    last_gen = gen;
                    state.failed = false;
                }

                if let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) {
                    if val["error"].as_str() != Some("success") {
                        let err = val["error"].as_str().unwrap_or("unknown error");
                        warn!("mpv reader: response req={} err={}", req_id, err);
                        state.failed = true;
                        cell.publish(gen, state.status());
                    } else {
                        debug!("mpv reader: response req={} ok", req_id);
                    }
                    continue;
                }

                match val.get("event").and_then(|v| v.as_str()) {
                    Some("property-change") => {
                        let id = val.get("id").and_then(|v| v.as_u64()).unwrap_or(0);
                        let data = val.get("data").and_then(|v| v.as_bool());
                        match (id, data) {
                            (OBS_CORE_IDLE, Some(b)) => state.idle = b,
                            (OBS_PAUSE, Some(b)) => state.paused = b,
                            _ => continue,
                        }
                        cell.publish(gen, state.status());
                    }
                    Some("end-file") => {
                        let reason = val.get("reason").and_then(|v| v.as_str()).unwrap_or("");
                        debug!("mpv reader: end-file reason={}", reason);
                        if reason == "error" {
                            state.failed = true;
                        }
                        state.idle = true;
                        cell.publish(gen, state.status());
                    }
                    Some("start-file") => {
                        state.failed = false;
                    }
                    _ => {}
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                break;
            }
        }
    }
    cell.publish(generation.load(Ordering::SeqCst), PlaybackStatus::Error);
}

// ── writer task ───────────────────────────────────────────────────────────────

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<String>)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(payload) = rx.recv().await {
        debug!("mpv writer: send {}", payload.trim());
        if let Err(e) = writer.write_all(payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_state_folding() {
        let mut s = StreamState {
            idle: true,
            ..StreamState::default()
        };
        assert_eq!(s.status(), PlaybackStatus::Stopped);
        s.idle = false;
        assert_eq!(s.status(), PlaybackStatus::Playing);
        s.idle = true;
        s.paused = true;
        assert_eq!(s.status(), PlaybackStatus::Paused);
        s.failed = true;
        assert_eq!(s.status(), PlaybackStatus::Error);
        // An active stream outranks a stale failure latch.
        s.idle = false;
        assert_eq!(s.status(), PlaybackStatus::Playing);
    }
}
