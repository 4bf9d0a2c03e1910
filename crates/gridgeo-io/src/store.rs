use gridgeo_core::{Country, GeoResult, LineGeoData, SubstationGeoData};
use serde::{Deserialize, Serialize};

/// Which stored positions to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreQuery {
    /// Everything attached to any of these countries
    Countries(Vec<Country>),
    /// These ids only
    Ids(Vec<String>),
}

impl StoreQuery {
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StoreQuery::Ids(ids.into_iter().map(Into::into).collect())
    }
}

/// A stored line path.
///
/// When `ordered` is false the coordinates are an unordered bag of pylons;
/// otherwise they are a previously computed path from `substation_start` to
/// `substation_end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLine {
    pub line: LineGeoData,
    #[serde(default)]
    pub ordered: bool,
}

impl StoredLine {
    pub fn unordered(line: LineGeoData) -> Self {
        Self {
            line,
            ordered: false,
        }
    }

    pub fn ordered(line: LineGeoData) -> Self {
        Self {
            line,
            ordered: true,
        }
    }
}

/// Known-position store.
///
/// Implementations are shared between concurrent requests.
pub trait GeoDataStore: Send + Sync {
    fn read_substations(&self, query: &StoreQuery) -> GeoResult<Vec<SubstationGeoData>>;

    /// Fails with `GeoError::Serialization` when a stored path cannot be decoded.
    fn read_lines(&self, query: &StoreQuery) -> GeoResult<Vec<StoredLine>>;

    fn write_substations(&self, substations: &[SubstationGeoData]) -> GeoResult<()>;

    fn write_lines(&self, lines: &[StoredLine]) -> GeoResult<()>;
}
