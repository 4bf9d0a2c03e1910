//! # gridgeo-algo: Position inference for substations and lines
//!
//! The engine runs once per request over in-memory maps, single threaded:
//!
//! 1. [`build_neighbor_graph`] - substation adjacency from line connections
//! 2. [`PropagationEngine::resolve`] - seed from known positions, then place
//!    unknown substations from their neighbors or their country default
//! 3. [`Declutterer::declutter`] - spread substations stacked on a country default
//! 4. [`line_path::reconstruct`] + [`line_path::stitch`] - order the pylons of each
//!    line and attach the substation endpoints
//!
//! ## Example
//!
//! ```ignore
//! use gridgeo_algo::{build_neighbor_graph, Declutterer, PropagationEngine};
//!
//! let requested = network.substations(&[fr]);
//! let graph = build_neighbor_graph(&network, &requested, &mut diagnostics);
//! let mut placements = PropagationEngine::new(defaults.clone()).resolve(&known, &requested, &graph);
//! Declutterer::new(defaults).declutter(&mut placements, &graph);
//! ```

pub mod declutter;
pub mod line_path;
pub mod neighbors;
pub mod propagation;

pub use declutter::{Declutterer, Spiral, DEFAULT_DECLUTTER_THRESHOLD};
pub use line_path::{order_pylons, reconstruct, stitch, PathSource, ReconstructedLine};
pub use neighbors::{build_neighbor_graph, NeighborGraph, NeighborGraphStats};
pub use propagation::{
    average_coordinate, PlacedSubstation, Placements, PositionOrigin, PropagationEngine,
    DEFAULT_MAX_ITERATIONS,
};
