//! Unified error type for the geo-data engine
//!
//! [`GeoError`] covers every failure the engine, the stores and the service
//! layer can report. Only some of them abort a request: data-completeness
//! gaps (a dangling line, a substation nobody can place) are logged and the
//! element is dropped from the response. See [`GeoError::is_fatal`].
//!
//! # Example
//!
//! ```ignore
//! use gridgeo_core::{GeoError, GeoResult};
//!
//! fn lines_for(country: &str) -> GeoResult<Vec<LineGeoData>> {
//!     let country = Country::parse(country)?;
//!     service.lines_by_countries(&network, &[country])
//! }
//! ```

use thiserror::Error;

/// Unified error type for all geo-data operations.
#[derive(Error, Debug)]
pub enum GeoError {
    /// A line terminal could not be mapped to a substation
    #[error("Topology error on line {line}: {reason}")]
    TopologyResolution { line: String, reason: String },

    /// No position could be derived for a substation
    #[error("Unresolved substation: {0}")]
    UnresolvedSubstation(String),

    /// Stored coordinate payload could not be encoded/decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Malformed request (bad country code, empty id list, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// I/O errors (store snapshots, configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation errors (duplicate ids in a network, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using GeoError.
pub type GeoResult<T> = Result<T, GeoError>;

impl GeoError {
    pub fn topology(line: impl Into<String>, reason: impl Into<String>) -> Self {
        GeoError::TopologyResolution {
            line: line.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error must abort the whole request.
    ///
    /// Topology and propagation gaps only exclude the affected element.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            GeoError::TopologyResolution { .. } | GeoError::UnresolvedSubstation(_)
        )
    }
}

impl From<anyhow::Error> for GeoError {
    fn from(err: anyhow::Error) -> Self {
        GeoError::Other(err.to_string())
    }
}

impl From<String> for GeoError {
    fn from(s: String) -> Self {
        GeoError::Other(s)
    }
}

impl From<&str> for GeoError {
    fn from(s: &str) -> Self {
        GeoError::Other(s.to_string())
    }
}

// Coordinate blobs are the only JSON payloads the engine decodes
impl From<serde_json::Error> for GeoError {
    fn from(err: serde_json::Error) -> Self {
        GeoError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GeoError::topology("L1", "voltage level VL9 not found");
        assert!(err.to_string().contains("Topology error"));
        assert!(err.to_string().contains("VL9"));
    }

    #[test]
    fn test_fatality_split() {
        assert!(!GeoError::topology("L1", "dangling").is_fatal());
        assert!(!GeoError::UnresolvedSubstation("S1".into()).is_fatal());
        assert!(GeoError::Serialization("bad blob".into()).is_fatal());
        assert!(GeoError::InvalidRequest("XYZ".into()).is_fatal());
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let json_err = serde_json::from_str::<Vec<f64>>("[1.0,").unwrap_err();
        let err: GeoError = json_err.into();
        assert!(matches!(err, GeoError::Serialization(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> GeoResult<()> {
            Err(GeoError::InvalidRequest("empty id list".into()))
        }

        fn outer() -> GeoResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
