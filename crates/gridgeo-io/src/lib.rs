//! # gridgeo-io: Geo-data persistence and file loading
//!
//! The known-position store behind the geo-data service, and loaders for the
//! files a deployment is fed with.
//!
//! ## Store
//!
//! [`GeoDataStore`] is the seam between inference and persistence. Reads are
//! scoped by [`StoreQuery`] (countries or ids). Line paths carry an `ordered`
//! flag: unordered paths are bags of pylons that still need reconstruction,
//! ordered paths are reused as is.
//!
//! [`InMemoryGeoStore`] keeps everything in memory, with coordinate sequences
//! encoded by [`codec`], and persists to a JSON snapshot file.
//!
//! ```rust
//! use gridgeo_core::{Coordinate, Country, SubstationGeoData};
//! use gridgeo_io::{GeoDataStore, InMemoryGeoStore, StoreQuery};
//!
//! let store = InMemoryGeoStore::new();
//! let fr = Country::parse("FR").unwrap();
//! store
//!     .write_substations(&[SubstationGeoData::new("P1", Some(fr.clone()), Coordinate::new(48.8, 2.3))])
//!     .unwrap();
//! assert_eq!(store.read_substations(&StoreQuery::Countries(vec![fr])).unwrap().len(), 1);
//! ```
//!
//! ## Loaders ([`loaders`])
//! - [`load_network`] - network snapshot JSON
//! - [`load_default_positions_csv`] - `country,latitude,longitude` table
//! - [`load_substations`] / [`load_lines`] - position imports

pub mod codec;
pub mod loaders;
pub mod memory;
pub mod store;

pub use codec::{decode_coordinates, encode_coordinates};
pub use loaders::{load_default_positions_csv, load_lines, load_network, load_substations, write_json};
pub use memory::{InMemoryGeoStore, LineRecord, StoreSnapshot};
pub use store::{GeoDataStore, StoreQuery, StoredLine};
