//! Service configuration, read from a TOML file.
//!
//! ```toml
//! [engine]
//! max_iterations = 50
//! declutter_threshold = 5
//!
//! [pool]
//! max_concurrent_requests = 4
//!
//! [data]
//! store = "geodata.json"
//! default_positions = "defaults.csv"
//!
//! [default_positions]
//! FR = { latitude = 46.6, longitude = 1.9 }
//!
//! [logging]
//! level = "info"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gridgeo_algo::{DEFAULT_DECLUTTER_THRESHOLD, DEFAULT_MAX_ITERATIONS};
use gridgeo_core::{Coordinate, Country, DefaultPositionEntry, DefaultPositions, GeoError, GeoResult};
use gridgeo_io::load_default_positions_csv;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeoDataConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub data: DataSettings,
    /// Inline fallback positions, merged over the CSV table
    #[serde(default)]
    pub default_positions: BTreeMap<String, InlinePosition>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Inference engine tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Pass cap for each propagation phase
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Clusters larger than this are spread on a spiral
    #[serde(default = "default_declutter_threshold")]
    pub declutter_threshold: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            declutter_threshold: default_declutter_threshold(),
        }
    }
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_declutter_threshold() -> usize {
    DEFAULT_DECLUTTER_THRESHOLD
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Worker count (0 = number of CPUs)
    #[serde(default)]
    pub max_concurrent_requests: usize,
}

impl PoolSettings {
    pub fn worker_count(&self) -> usize {
        if self.max_concurrent_requests == 0 {
            num_cpus::get()
        } else {
            self.max_concurrent_requests
        }
    }
}

/// Data file locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSettings {
    /// JSON store snapshot
    #[serde(default)]
    pub store: Option<PathBuf>,
    /// `country,latitude,longitude` CSV
    #[serde(default)]
    pub default_positions: Option<PathBuf>,
    /// Network used when a command does not name one
    #[serde(default)]
    pub network: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InlinePosition {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl GeoDataConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> GeoResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> GeoResult<Self> {
        toml::from_str(contents).map_err(|err| GeoError::Config(err.to_string()))
    }

    /// Build the fallback table: the CSV file first, then the inline entries.
    ///
    /// Relative CSV paths resolve against `base_dir`.
    pub fn default_positions(&self, base_dir: Option<&Path>) -> GeoResult<DefaultPositions> {
        let mut positions = DefaultPositions::new();

        if let Some(csv_path) = &self.data.default_positions {
            let resolved = match base_dir {
                Some(base) if csv_path.is_relative() => base.join(csv_path),
                _ => csv_path.clone(),
            };
            let entries = load_default_positions_csv(&resolved)
                .map_err(|err| GeoError::Config(format!("{err:#}")))?;
            positions.extend(entries);
        }

        let inline = self
            .default_positions
            .iter()
            .map(|(code, position)| {
                let country = Country::parse(code)
                    .map_err(|_| GeoError::Config(format!("unknown country code '{code}' in [default_positions]")))?;
                Ok(DefaultPositionEntry {
                    country,
                    coordinate: Coordinate::new(position.latitude, position.longitude),
                })
            })
            .collect::<GeoResult<Vec<_>>>()?;
        positions.extend(inline);

        debug!(countries = positions.len(), "default positions loaded");
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = GeoDataConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.engine.max_iterations, 50);
        assert_eq!(config.engine.declutter_threshold, 5);
        assert_eq!(config.logging.level, "info");
        assert!(config.pool.worker_count() >= 1);
    }

    #[test]
    fn partial_sections_keep_field_defaults() {
        let config = GeoDataConfig::from_toml(
            r#"
            [engine]
            max_iterations = 7

            [pool]
            max_concurrent_requests = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.max_iterations, 7);
        assert_eq!(config.engine.declutter_threshold, 5);
        assert_eq!(config.pool.worker_count(), 3);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = GeoDataConfig::from_toml("[engine\nmax_iterations = ").unwrap_err();
        assert!(matches!(err, GeoError::Config(_)));
    }

    #[test]
    fn inline_defaults_override_csv() {
        let dir = tempdir().unwrap();
        let mut csv = std::fs::File::create(dir.path().join("defaults.csv")).unwrap();
        writeln!(csv, "country,latitude,longitude").unwrap();
        writeln!(csv, "FR,46.6,1.9").unwrap();
        writeln!(csv, "BE,50.6,4.6").unwrap();

        let config = GeoDataConfig::from_toml(
            r#"
            [data]
            default_positions = "defaults.csv"

            [default_positions]
            fr = { latitude = 47.0, longitude = 2.0 }
            "#,
        )
        .unwrap();
        let positions = config.default_positions(Some(dir.path())).unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(
            positions.get(Some(&Country::parse("FR").unwrap())),
            Some(Coordinate::new(47.0, 2.0))
        );
        assert_eq!(
            positions.get(Some(&Country::parse("BE").unwrap())),
            Some(Coordinate::new(50.6, 4.6))
        );
    }

    #[test]
    fn unknown_country_in_table_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[default_positions]").unwrap();
        writeln!(file, "FRANCE = {{ latitude = 46.6, longitude = 1.9 }}").unwrap();
        let config = GeoDataConfig::load(file.path()).unwrap();
        let err = config.default_positions(None).unwrap_err();
        assert!(matches!(err, GeoError::Config(_)));
    }
}
