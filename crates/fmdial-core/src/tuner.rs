use rand::Rng;

use crate::catalog::{Catalog, Station};
use crate::error::TunerError;

/// Single source of truth for "which station is selected".
///
/// The cursor wraps circularly in both directions so the dial never
/// dead-ends at the list boundaries. Invariant: `cursor < catalog.len()`
/// whenever the catalog is non-empty.
pub struct Tuner {
    catalog: Catalog,
    cursor: usize,
}

impl Tuner {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog, cursor: 0 }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Cursor position, or `None` when the catalog is empty.
    pub fn cursor(&self) -> Option<usize> {
        if self.catalog.is_empty() {
            None
        } else {
            Some(self.cursor)
        }
    }

    pub fn current(&self) -> Option<&Station> {
        self.catalog.get(self.cursor)
    }

    /// Advance one station, wrapping past the last index to 0.
    pub fn next(&mut self) -> Result<&Station, TunerError> {
        let len = self.catalog.len();
        if len == 0 {
            return Err(TunerError::EmptyCatalog);
        }
        self.cursor = (self.cursor + 1) % len;
        Ok(&self.catalog.stations()[self.cursor])
    }

    /// Step back one station, wrapping from 0 to the last index.
    pub fn previous(&mut self) -> Result<&Station, TunerError> {
        let len = self.catalog.len();
        if len == 0 {
            return Err(TunerError::EmptyCatalog);
        }
        self.cursor = if self.cursor == 0 {
            len - 1
        } else {
            self.cursor - 1
        };
        Ok(&self.catalog.stations()[self.cursor])
    }

    /// Jump directly to `index`. Leaves the cursor unchanged on failure.
    pub fn select(&mut self, index: usize) -> Result<&Station, TunerError> {
        let len = self.catalog.len();
        if index >= len {
            return Err(TunerError::OutOfRange { index, len });
        }
        self.cursor = index;
        Ok(&self.catalog.stations()[self.cursor])
    }

    /// Tune to a uniformly random station, avoiding the current one when
    /// more than one exists.
    pub fn random<R: Rng>(&mut self, rng: &mut R) -> Result<&Station, TunerError> {
        let len = self.catalog.len();
        if len == 0 {
            return Err(TunerError::EmptyCatalog);
        }
        if len > 1 {
            let mut idx = rng.gen_range(0..len - 1);
            if idx >= self.cursor {
                idx += 1;
            }
            self.cursor = idx;
        }
        Ok(&self.catalog.stations()[self.cursor])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn station(name: &str) -> Station {
        Station {
            name: name.to_string(),
            url: format!("https://example.com/{name}"),
            frequency: String::new(),
        }
    }

    fn tuner_of(n: usize) -> Tuner {
        let stations = (0..n).map(|i| station(&format!("S{i}"))).collect();
        Tuner::new(Catalog::from_stations(stations))
    }

    #[test]
    fn test_next_cycles_back_to_start() {
        for start in 0..5 {
            let mut tuner = tuner_of(5);
            tuner.select(start).unwrap();
            for _ in 0..5 {
                tuner.next().unwrap();
            }
            assert_eq!(tuner.cursor(), Some(start));
        }
    }

    #[test]
    fn test_previous_inverts_next() {
        let mut tuner = tuner_of(4);
        tuner.select(2).unwrap();
        tuner.next().unwrap();
        tuner.previous().unwrap();
        assert_eq!(tuner.cursor(), Some(2));
    }

    #[test]
    fn test_two_station_wraparound() {
        let catalog = Catalog::parse(
            r#"{"stations": [
                {"name": "A", "url": "u1", "frequency": "98.5"},
                {"name": "B", "url": "u2", "frequency": "101.0"}
            ]}"#,
        )
        .unwrap();
        let mut tuner = Tuner::new(catalog);
        assert_eq!(tuner.current().unwrap().name, "A");
        assert_eq!(tuner.next().unwrap().name, "B");
        assert_eq!(tuner.next().unwrap().name, "A"); // wrapped forward
        assert_eq!(tuner.previous().unwrap().name, "B"); // wrapped backward
    }

    #[test]
    fn test_select_out_of_range_leaves_cursor() {
        let mut tuner = tuner_of(3);
        tuner.select(1).unwrap();
        let err = tuner.select(3).unwrap_err();
        assert_eq!(err, TunerError::OutOfRange { index: 3, len: 3 });
        assert_eq!(tuner.cursor(), Some(1));
    }

    #[test]
    fn test_empty_catalog() {
        let mut tuner = Tuner::new(Catalog::from_stations(Vec::new()));
        assert!(tuner.current().is_none());
        assert_eq!(tuner.cursor(), None);
        assert_eq!(tuner.next().unwrap_err(), TunerError::EmptyCatalog);
        assert_eq!(tuner.previous().unwrap_err(), TunerError::EmptyCatalog);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(tuner.random(&mut rng).unwrap_err(), TunerError::EmptyCatalog);
    }

    #[test]
    fn test_random_avoids_current() {
        let mut tuner = tuner_of(6);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let before = tuner.cursor();
            tuner.random(&mut rng).unwrap();
            assert_ne!(tuner.cursor(), before);
        }
    }

    #[test]
    fn test_random_single_station_is_stable() {
        let mut tuner = tuner_of(1);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(tuner.random(&mut rng).unwrap().name, "S0");
        assert_eq!(tuner.cursor(), Some(0));
    }
}
