//! Iterative position propagation over the neighbor graph.
//!
//! Substations with a stored position seed the map. Unknown substations are
//! then placed in two phases, each capped at `max_iterations` passes and ended
//! early by a pass that places nothing:
//!
//! 1. **Centroid**: a substation with at least two placed neighbors takes the
//!    mean of their coordinates.
//! 2. **Fallback**: a substation with one placed neighbor sits just beside it
//!    (or at its country default when the neighbor is across a border); a
//!    substation with no placed neighbor takes its country default in the
//!    same pass. Two or more placed neighbors still give their mean.
//!
//! Every pass reads a snapshot of the placements and applies what it derived
//! once the pass is over, so the order substations are visited in a pass only
//! decides which of them receives which neighborhood jitter.
//!
//! Substations that share the same set of placed neighbors would all land on
//! the same centroid. During the centroid phase, each repeated use of a
//! neighbor set therefore nudges the centroid along its widest axis by an offset that alternates sign and grows
//! by [`NEIGHBORHOOD_OFFSET_STEP`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use gridgeo_core::{
    Coordinate, Country, DefaultPositions, ResolutionStats, Substation, SubstationGeoData,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::neighbors::NeighborGraph;

pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Latitude/longitude delta applied to a lone neighbor's position.
pub const SINGLE_NEIGHBOR_OFFSET: (f64, f64) = (-0.002, -0.007);

/// Growth of the jitter applied to repeated neighbor sets (degrees).
pub const NEIGHBORHOOD_OFFSET_STEP: f64 = 0.01;

/// How a substation position was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionOrigin {
    /// Read from the store
    Known,
    /// Mean of two or more placed neighbors
    Neighbors,
    /// Beside a single placed neighbor
    NeighborOffset,
    /// Country default, or derived only from country-default placements
    CountryDefault,
}

impl PositionOrigin {
    /// A derived position is fallback-rooted when every source is.
    fn derived(kind: PositionOrigin, sources: &[PositionOrigin]) -> PositionOrigin {
        if !sources.is_empty() && sources.iter().all(|o| *o == PositionOrigin::CountryDefault) {
            PositionOrigin::CountryDefault
        } else {
            kind
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedSubstation {
    pub geo: SubstationGeoData,
    pub origin: PositionOrigin,
}

/// Result of a propagation run, in request order.
#[derive(Debug, Clone, Default)]
pub struct Placements {
    order: Vec<String>,
    placed: HashMap<String, PlacedSubstation>,
}

impl Placements {
    pub fn get(&self, id: &str) -> Option<&PlacedSubstation> {
        self.placed.get(id)
    }

    pub fn coordinate(&self, id: &str) -> Option<Coordinate> {
        self.placed.get(id).map(|p| p.geo.coordinate)
    }

    /// Placed substations in request order.
    pub fn iter(&self) -> impl Iterator<Item = &PlacedSubstation> {
        self.order.iter().filter_map(|id| self.placed.get(id))
    }

    /// Requested substations left without a position.
    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .filter(|id| !self.placed.contains_key(*id))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    /// Move a fallback-rooted substation. Known and neighbor-derived positions never move.
    pub fn relocate(&mut self, id: &str, coordinate: Coordinate) -> bool {
        match self.placed.get_mut(id) {
            Some(p) if p.origin == PositionOrigin::CountryDefault => {
                p.geo.coordinate = coordinate;
                true
            }
            _ => false,
        }
    }

    pub fn stats(&self) -> ResolutionStats {
        let mut stats = ResolutionStats {
            requested: self.order.len(),
            ..ResolutionStats::default()
        };
        for placed in self.placed.values() {
            match placed.origin {
                PositionOrigin::Known => stats.known += 1,
                PositionOrigin::Neighbors | PositionOrigin::NeighborOffset => stats.derived += 1,
                PositionOrigin::CountryDefault => stats.fallback += 1,
            }
        }
        stats.unresolved = stats.requested - self.placed.len();
        stats
    }

    /// Placed substations in request order.
    pub fn into_geo_data(self) -> Vec<SubstationGeoData> {
        let Placements { order, mut placed } = self;
        order
            .into_iter()
            .filter_map(|id| placed.remove(&id).map(|p| p.geo))
            .collect()
    }

    fn insert(&mut self, placed: PlacedSubstation) {
        self.placed.insert(placed.geo.id.clone(), placed);
    }
}

/// Mean of `coordinates`, optionally nudged along the axis with the larger spread.
///
/// Latitude wins ties. `coordinates` must not be empty.
pub fn average_coordinate(coordinates: &[Coordinate], offset: f64) -> Coordinate {
    let n = coordinates.len() as f64;
    let lat = coordinates.iter().map(|c| c.latitude).sum::<f64>() / n;
    let lon = coordinates.iter().map(|c| c.longitude).sum::<f64>() / n;
    if offset == 0.0 {
        return Coordinate::new(lat, lon);
    }

    let spread = |values: &mut dyn Iterator<Item = f64>| {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        max - min
    };
    let lat_spread = spread(&mut coordinates.iter().map(|c| c.latitude));
    let lon_spread = spread(&mut coordinates.iter().map(|c| c.longitude));
    if lat_spread >= lon_spread {
        Coordinate::new(lat + offset, lon)
    } else {
        Coordinate::new(lat, lon + offset)
    }
}

/// Next jitter for a repeated neighbor set: 0, 0.01, -0.02, 0.03, ...
pub fn next_neighborhood_offset(current: f64) -> f64 {
    let magnitude = current.abs() + NEIGHBORHOOD_OFFSET_STEP;
    if current > 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Centroid,
    Fallback,
}

/// Working state of one `resolve` call.
struct PropagationState<'a> {
    to_resolve: Vec<&'a Substation>,
    neighborhood_offsets: HashMap<BTreeSet<String>, f64>,
    placements: Placements,
}

impl PropagationState<'_> {
    fn offset_for(&mut self, neighbors: &[&str]) -> f64 {
        let key: BTreeSet<String> = neighbors.iter().map(|id| id.to_string()).collect();
        match self.neighborhood_offsets.get_mut(&key) {
            Some(offset) => {
                *offset = next_neighborhood_offset(*offset);
                *offset
            }
            None => {
                self.neighborhood_offsets.insert(key, 0.0);
                0.0
            }
        }
    }
}

/// Derives positions for substations missing from the store.
#[derive(Debug, Clone)]
pub struct PropagationEngine {
    defaults: Arc<DefaultPositions>,
    max_iterations: usize,
}

impl PropagationEngine {
    pub fn new(defaults: Arc<DefaultPositions>) -> Self {
        Self {
            defaults,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Place every substation of `requested` that can be placed.
    ///
    /// `known` holds store positions; a substation found there keeps that
    /// position, with its country filled from the network when the store has none.
    pub fn resolve(
        &self,
        known: &HashMap<String, SubstationGeoData>,
        requested: &[&Substation],
        graph: &NeighborGraph,
    ) -> Placements {
        let by_id: HashMap<&str, &Substation> =
            requested.iter().map(|s| (s.id.as_str(), *s)).collect();

        let mut state = PropagationState {
            to_resolve: Vec::new(),
            neighborhood_offsets: HashMap::new(),
            placements: Placements {
                order: requested.iter().map(|s| s.id.clone()).collect(),
                placed: HashMap::new(),
            },
        };

        for substation in requested {
            match known.get(&substation.id) {
                Some(geo) if geo.coordinate.is_finite() => {
                    state.placements.insert(PlacedSubstation {
                        geo: SubstationGeoData {
                            id: substation.id.clone(),
                            country: geo.country.clone().or_else(|| substation.country.clone()),
                            coordinate: geo.coordinate,
                        },
                        origin: PositionOrigin::Known,
                    });
                }
                Some(geo) => {
                    warn!(substation = %substation.id, coordinate = %geo.coordinate, "ignoring non-finite stored position");
                    state.to_resolve.push(substation);
                }
                None => state.to_resolve.push(substation),
            }
        }

        // Most anchored first: neighbors carrying a network-declared position.
        // sort_by_key is stable, so ties keep request order.
        state.to_resolve.sort_by_key(|s| {
            let anchored = graph
                .neighbors(&s.id)
                .into_iter()
                .filter(|n| by_id.get(n).is_some_and(|ns| ns.position.is_some()))
                .count();
            std::cmp::Reverse(anchored)
        });

        let known_count = state.placements.len();
        self.run_phase(Phase::Centroid, &mut state, graph, &by_id);
        if !state.to_resolve.is_empty() {
            self.run_phase(Phase::Fallback, &mut state, graph, &by_id);
        }

        for id in state.placements.unresolved() {
            debug!(substation = id, "no position could be derived");
        }
        debug!(
            requested = requested.len(),
            known = known_count,
            placed = state.placements.len(),
            "substation propagation finished"
        );
        state.placements
    }

    fn run_phase(
        &self,
        phase: Phase,
        state: &mut PropagationState<'_>,
        graph: &NeighborGraph,
        by_id: &HashMap<&str, &Substation>,
    ) {
        for iteration in 0..self.max_iterations {
            if state.to_resolve.is_empty() {
                break;
            }
            let derived = self.run_pass(phase, state, graph, by_id);
            debug!(?phase, iteration, placed = derived.len(), "propagation pass");
            if derived.is_empty() {
                break;
            }
            state
                .to_resolve
                .retain(|s| !derived.iter().any(|p| p.geo.id == s.id));
            for placed in derived {
                state.placements.insert(placed);
            }
        }
    }

    fn run_pass(
        &self,
        phase: Phase,
        state: &mut PropagationState<'_>,
        graph: &NeighborGraph,
        by_id: &HashMap<&str, &Substation>,
    ) -> Vec<PlacedSubstation> {
        let mut derived = Vec::new();
        let pending = state.to_resolve.clone();

        for substation in pending {
            let neighbors: Vec<&str> = graph
                .neighbors(&substation.id)
                .into_iter()
                .filter(|n| state.placements.get(n).is_some())
                .collect();

            let placed = match (phase, neighbors.len()) {
                (_, n) if n >= 2 => Some(self.centroid(phase, state, substation, &neighbors)),
                (Phase::Fallback, 1) => state
                    .placements
                    .get(neighbors[0])
                    .map(|neighbor| self.beside(substation, neighbor, by_id)),
                (Phase::Fallback, 0) => self
                    .defaults
                    .get(substation.country.as_ref())
                    .map(|coordinate| self.fallback(substation, coordinate)),
                _ => None,
            };
            derived.extend(placed);
        }
        derived
    }

    fn centroid(
        &self,
        phase: Phase,
        state: &mut PropagationState<'_>,
        substation: &Substation,
        neighbors: &[&str],
    ) -> PlacedSubstation {
        let sources: Vec<&PlacedSubstation> = neighbors
            .iter()
            .filter_map(|id| state.placements.get(id))
            .collect();
        let coordinates: Vec<Coordinate> = sources.iter().map(|p| p.geo.coordinate).collect();
        let origins: Vec<PositionOrigin> = sources.iter().map(|p| p.origin).collect();
        // jitter only tracks repeats among the centroid passes
        let offset = match phase {
            Phase::Centroid => state.offset_for(neighbors),
            Phase::Fallback => 0.0,
        };
        PlacedSubstation {
            geo: SubstationGeoData::new(
                substation.id.clone(),
                substation.country.clone(),
                average_coordinate(&coordinates, offset),
            ),
            origin: PositionOrigin::derived(PositionOrigin::Neighbors, &origins),
        }
    }

    fn beside(
        &self,
        substation: &Substation,
        neighbor: &PlacedSubstation,
        by_id: &HashMap<&str, &Substation>,
    ) -> PlacedSubstation {
        let neighbor_country: Option<&Country> = by_id
            .get(neighbor.geo.id.as_str())
            .and_then(|s| s.country.as_ref())
            .or(neighbor.geo.country.as_ref());
        let cross_border = matches!(
            (substation.country.as_ref(), neighbor_country),
            (Some(own), Some(other)) if own != other
        );
        if cross_border {
            if let Some(coordinate) = self.defaults.get(substation.country.as_ref()) {
                return self.fallback(substation, coordinate);
            }
        }

        let coordinate = neighbor
            .geo
            .coordinate
            .offset(SINGLE_NEIGHBOR_OFFSET.0, SINGLE_NEIGHBOR_OFFSET.1);
        PlacedSubstation {
            geo: SubstationGeoData::new(substation.id.clone(), substation.country.clone(), coordinate),
            origin: PositionOrigin::derived(PositionOrigin::NeighborOffset, &[neighbor.origin]),
        }
    }

    fn fallback(&self, substation: &Substation, coordinate: Coordinate) -> PlacedSubstation {
        PlacedSubstation {
            geo: SubstationGeoData::new(substation.id.clone(), substation.country.clone(), coordinate),
            origin: PositionOrigin::CountryDefault,
        }
    }
}
