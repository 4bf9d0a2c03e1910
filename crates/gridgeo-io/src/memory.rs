//! In-process store with JSON snapshot persistence.
//!
//! Line paths are kept as encoded blobs, exactly as a database column would
//! hold them, and only decoded on read. A corrupt blob therefore surfaces as
//! `GeoError::Serialization` from [`GeoDataStore::read_lines`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use anyhow::{Context, Result};
use gridgeo_core::{Country, GeoError, GeoResult, LineGeoData, SubstationGeoData};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{decode_coordinates, encode_coordinates};
use crate::store::{GeoDataStore, StoreQuery, StoredLine};

/// Persisted form of a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country1: Option<Country>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country2: Option<Country>,
    pub substation_start: String,
    pub substation_end: String,
    /// Encoded coordinate sequence
    pub coordinates: String,
    #[serde(default)]
    pub ordered: bool,
}

impl LineRecord {
    fn encode(stored: &StoredLine) -> GeoResult<Self> {
        let line = &stored.line;
        Ok(Self {
            id: line.id.clone(),
            country1: line.country1.clone(),
            country2: line.country2.clone(),
            substation_start: line.substation_start.clone(),
            substation_end: line.substation_end.clone(),
            coordinates: encode_coordinates(&line.coordinates)?,
            ordered: stored.ordered,
        })
    }

    fn decode(&self) -> GeoResult<StoredLine> {
        let coordinates = decode_coordinates(&self.coordinates).map_err(|err| {
            GeoError::Serialization(format!("line {}: {err}", self.id))
        })?;
        Ok(StoredLine {
            line: LineGeoData {
                id: self.id.clone(),
                country1: self.country1.clone(),
                country2: self.country2.clone(),
                substation_start: self.substation_start.clone(),
                substation_end: self.substation_end.clone(),
                coordinates,
            },
            ordered: self.ordered,
        })
    }

    fn touches(&self, countries: &[Country]) -> bool {
        countries
            .iter()
            .any(|c| self.country1.as_ref() == Some(c) || self.country2.as_ref() == Some(c))
    }
}

/// On-disk snapshot of an [`InMemoryGeoStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub substations: Vec<SubstationGeoData>,
    #[serde(default)]
    pub lines: Vec<LineRecord>,
}

#[derive(Debug, Default)]
pub struct InMemoryGeoStore {
    substations: RwLock<BTreeMap<String, SubstationGeoData>>,
    lines: RwLock<BTreeMap<String, LineRecord>>,
}

fn poisoned<T>(_: T) -> GeoError {
    GeoError::Other("geo-data store lock poisoned".to_string())
}

impl InMemoryGeoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        if let (Ok(mut substations), Ok(mut lines)) = (store.substations.write(), store.lines.write()) {
            substations.extend(snapshot.substations.into_iter().map(|s| (s.id.clone(), s)));
            lines.extend(snapshot.lines.into_iter().map(|l| (l.id.clone(), l)));
        }
        store
    }

    pub fn snapshot(&self) -> GeoResult<StoreSnapshot> {
        Ok(StoreSnapshot {
            substations: self.substations.read().map_err(poisoned)?.values().cloned().collect(),
            lines: self.lines.read().map_err(poisoned)?.values().cloned().collect(),
        })
    }

    /// Load a snapshot file; a missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "store snapshot not found, starting empty");
            return Ok(Self::new());
        }
        let file = fs::File::open(path)
            .with_context(|| format!("opening store snapshot '{}'", path.display()))?;
        let snapshot: StoreSnapshot = serde_json::from_reader(file)
            .with_context(|| format!("parsing store snapshot '{}'", path.display()))?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating store directory '{}'", parent.display()))?;
        }
        let snapshot = self.snapshot()?;
        let json = serde_json::to_string_pretty(&snapshot).context("serializing store snapshot")?;
        fs::write(path, json)
            .with_context(|| format!("writing store snapshot '{}'", path.display()))?;
        Ok(())
    }
}

impl GeoDataStore for InMemoryGeoStore {
    fn read_substations(&self, query: &StoreQuery) -> GeoResult<Vec<SubstationGeoData>> {
        let substations = self.substations.read().map_err(poisoned)?;
        let found = match query {
            StoreQuery::Countries(countries) => substations
                .values()
                .filter(|s| s.country.as_ref().is_some_and(|c| countries.contains(c)))
                .cloned()
                .collect(),
            StoreQuery::Ids(ids) => ids.iter().filter_map(|id| substations.get(id).cloned()).collect(),
        };
        Ok(found)
    }

    fn read_lines(&self, query: &StoreQuery) -> GeoResult<Vec<StoredLine>> {
        let lines = self.lines.read().map_err(poisoned)?;
        match query {
            StoreQuery::Countries(countries) => lines
                .values()
                .filter(|l| l.touches(countries))
                .map(LineRecord::decode)
                .collect(),
            StoreQuery::Ids(ids) => ids
                .iter()
                .filter_map(|id| lines.get(id))
                .map(LineRecord::decode)
                .collect(),
        }
    }

    fn write_substations(&self, substations: &[SubstationGeoData]) -> GeoResult<()> {
        let mut stored = self.substations.write().map_err(poisoned)?;
        for substation in substations {
            stored.insert(substation.id.clone(), substation.clone());
        }
        debug!(count = substations.len(), "stored substation positions");
        Ok(())
    }

    fn write_lines(&self, lines: &[StoredLine]) -> GeoResult<()> {
        let records = lines
            .iter()
            .map(LineRecord::encode)
            .collect::<GeoResult<Vec<_>>>()?;
        let mut stored = self.lines.write().map_err(poisoned)?;
        for record in records {
            stored.insert(record.id.clone(), record);
        }
        debug!(count = lines.len(), "stored line paths");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridgeo_core::Coordinate;
    use tempfile::tempdir;

    fn fr() -> Country {
        Country::parse("FR").unwrap()
    }

    fn be() -> Country {
        Country::parse("BE").unwrap()
    }

    fn sample_store() -> InMemoryGeoStore {
        let store = InMemoryGeoStore::new();
        store
            .write_substations(&[
                SubstationGeoData::new("A", Some(fr()), Coordinate::new(45.0, 5.0)),
                SubstationGeoData::new("B", Some(be()), Coordinate::new(50.0, 4.0)),
            ])
            .unwrap();
        store
            .write_lines(&[StoredLine::unordered(
                LineGeoData::new("AB", "A", "B")
                    .with_countries(Some(fr()), Some(be()))
                    .with_coordinates(vec![Coordinate::new(47.0, 4.5), Coordinate::new(46.0, 4.8)]),
            )])
            .unwrap();
        store
    }

    #[test]
    fn queries_filter_by_country_and_id() {
        let store = sample_store();
        let fr_subs = store.read_substations(&StoreQuery::Countries(vec![fr()])).unwrap();
        assert_eq!(fr_subs.len(), 1);
        assert_eq!(fr_subs[0].id, "A");

        let by_id = store.read_substations(&StoreQuery::ids(["B", "missing"])).unwrap();
        assert_eq!(by_id.len(), 1);

        // a cross-border line is visible from both countries
        assert_eq!(store.read_lines(&StoreQuery::Countries(vec![be()])).unwrap().len(), 1);
        assert_eq!(store.read_lines(&StoreQuery::Countries(vec![fr()])).unwrap().len(), 1);
    }

    #[test]
    fn line_coordinates_keep_their_order() {
        let store = sample_store();
        let lines = store.read_lines(&StoreQuery::ids(["AB"])).unwrap();
        assert_eq!(
            lines[0].line.coordinates,
            vec![Coordinate::new(47.0, 4.5), Coordinate::new(46.0, 4.8)]
        );
        assert!(!lines[0].ordered);
    }

    #[test]
    fn corrupt_blob_fails_the_read() {
        let store = InMemoryGeoStore::from_snapshot(StoreSnapshot {
            substations: Vec::new(),
            lines: vec![LineRecord {
                id: "BROKEN".into(),
                country1: Some(fr()),
                country2: None,
                substation_start: "A".into(),
                substation_end: "B".into(),
                coordinates: "not json".into(),
                ordered: true,
            }],
        });
        let err = store.read_lines(&StoreQuery::Countries(vec![fr()])).unwrap_err();
        assert!(matches!(err, GeoError::Serialization(_)));
    }

    #[test]
    fn snapshot_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        sample_store().save(&path).unwrap();

        let reloaded = InMemoryGeoStore::load(&path).unwrap();
        assert_eq!(reloaded.read_substations(&StoreQuery::ids(["A", "B"])).unwrap().len(), 2);
        assert_eq!(reloaded.read_lines(&StoreQuery::ids(["AB"])).unwrap().len(), 1);

        let empty = InMemoryGeoStore::load(&dir.path().join("absent.json")).unwrap();
        assert!(empty.snapshot().unwrap().lines.is_empty());
    }
}
