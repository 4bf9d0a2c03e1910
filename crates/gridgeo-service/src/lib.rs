//! # gridgeo-service: Geo-data requests over a known-position store
//!
//! [`GeoDataService`] answers the six geo-data operations (substations and
//! lines, by countries or by ids, plus the two pass-through saves) against a
//! [`gridgeo_io::GeoDataStore`]. [`RequestPool`] bounds how many requests run
//! at once. [`GeoDataConfig`] is the TOML configuration of both.

pub mod config;
pub mod pool;
pub mod service;

pub use config::{DataSettings, EngineSettings, GeoDataConfig, InlinePosition, LoggingSettings, PoolSettings};
pub use pool::{PoolGauge, RequestHandle, RequestPool};
pub use service::{GeoDataService, GeoResponse};
