use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CatalogError;

/// One selectable stream entry. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Station {
    pub name: String,
    pub url: String,
    /// Dial position shown on the display, e.g. "98.5". Purely cosmetic —
    /// never used for ordering or lookup.
    #[serde(default)]
    pub frequency: String,
}

/// Ordered station list. Order is meaningful: it defines next/previous
/// traversal and matches the source file exactly. A `Catalog` returned from
/// [`Catalog::load`] is never empty.
#[derive(Debug, Clone)]
pub struct Catalog {
    stations: Vec<Station>,
}

/// Intermediate struct matching the `stations.json` document. Kept separate
/// from `Station` so a half-filled entry deserializes instead of failing the
/// whole file; validation happens per entry afterwards.
#[derive(Debug, Deserialize)]
struct StationFile {
    #[serde(default)]
    stations: Vec<RawStation>,
}

#[derive(Debug, Deserialize)]
struct RawStation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    frequency: String,
}

impl Catalog {
    /// Load a catalog from a `stations.json` file.
    ///
    /// Entries missing a name or url are skipped with a warning; the load
    /// fails only when the file is unreadable, unparseable, or nothing
    /// usable remains.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, CatalogError> {
        let file: StationFile = serde_json::from_str(content)?;
        let mut stations = Vec::new();
        for (idx, raw) in file.stations.into_iter().enumerate() {
            if raw.name.trim().is_empty() || raw.url.trim().is_empty() {
                warn!(index = idx, "skipping station entry with missing name or url");
                continue;
            }
            stations.push(Station {
                name: raw.name,
                url: raw.url,
                frequency: raw.frequency,
            });
        }
        if stations.is_empty() {
            return Err(CatalogError::NoStations);
        }
        Ok(Self { stations })
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Station> {
        self.stations.get(index)
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// Build a catalog directly from stations. Used by the tuner tests and
    /// anywhere a catalog is assembled without going through a file.
    pub fn from_stations(stations: Vec<Station>) -> Self {
        Self { stations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_order() {
        let catalog = Catalog::parse(
            r#"{"stations": [
                {"name": "A", "url": "u1", "frequency": "98.5"},
                {"name": "B", "url": "u2", "frequency": "101.0"},
                {"name": "C", "url": "u3"}
            ]}"#,
        )
        .unwrap();
        let names: Vec<_> = catalog.stations().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert_eq!(catalog.get(2).unwrap().frequency, "");
    }

    #[test]
    fn test_parse_skips_invalid_entries() {
        let catalog = Catalog::parse(
            r#"{"stations": [
                {"name": "", "url": "u1"},
                {"name": "Good", "url": "u2", "frequency": "88.1"},
                {"name": "NoUrl"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(0).unwrap().name, "Good");
    }

    #[test]
    fn test_parse_rejects_empty_catalog() {
        assert!(matches!(
            Catalog::parse(r#"{"stations": []}"#),
            Err(CatalogError::NoStations)
        ));
        assert!(matches!(
            Catalog::parse(r#"{"stations": [{"name": "", "url": ""}]}"#),
            Err(CatalogError::NoStations)
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(matches!(
            Catalog::parse("{not json"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Catalog::load(Path::new("/nonexistent/stations.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
    }
}
