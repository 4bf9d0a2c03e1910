//! # gridgeo-core: Geo-data model for transmission networks
//!
//! Shared types for locating substations and transmission lines on a map when
//! the upstream geo-database only knows some of the positions.
//!
//! ## Core Data Structures
//!
//! - [`Coordinate`] - latitude/longitude pair, compared exactly
//! - [`SubstationGeoData`] - one placed substation
//! - [`LineGeoData`] - one line path, oriented by `substation_start` / `substation_end`
//! - [`DefaultPositions`] - read-only per-country fallback table
//! - [`GridNetwork`] / [`TopologyProvider`] - the network snapshot a request runs against
//!
//! ## Quick Start
//!
//! ```rust
//! use gridgeo_core::*;
//!
//! let fr = Country::parse("FR").unwrap();
//! let mut network = GridNetwork::new();
//! network.add_substation(Substation::new("P1").with_country(fr.clone())).unwrap();
//! network.add_substation(Substation::new("P2").with_country(fr)).unwrap();
//! network.add_voltage_level("P1_400", "P1").unwrap();
//! network.add_voltage_level("P2_400", "P2").unwrap();
//! network.add_line("P1-P2", "P1_400", "P2_400").unwrap();
//!
//! let line = network.line("P1-P2").unwrap();
//! let (side1, side2) = network.terminals(line).unwrap();
//! assert_eq!((side1.id.as_str(), side2.id.as_str()), ("P1", "P2"));
//! ```
//!
//! ## Modules
//!
//! - [`geo`] - coordinates, country codes and [`distance`]
//! - [`network`] - topology snapshot
//! - [`diagnostics`] - per-request issue reporting and accuracy counters
//! - [`error`] - [`GeoError`]

pub mod defaults;
pub mod diagnostics;
pub mod error;
pub mod geo;
pub mod geodata;
pub mod network;

pub use defaults::{DefaultPositionEntry, DefaultPositions};
pub use diagnostics::{DiagnosticIssue, Diagnostics, ResolutionStats, Severity};
pub use error::{GeoError, GeoResult};
pub use geo::{distance, Coordinate, Country};
pub use geodata::{LineGeoData, SubstationGeoData};
pub use network::{GridNetwork, Line, NetworkDocument, Substation, TopologyProvider, VoltageLevel};
