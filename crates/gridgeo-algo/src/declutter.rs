//! Spreads substations stacked on a country default position.
//!
//! When more than [`DEFAULT_DECLUTTER_THRESHOLD`] fallback-placed substations of
//! a country sit within [`CLUSTER_TOLERANCE_DEG`] of its default coordinate,
//! they are laid out along a spiral around that coordinate. The walk is depth
//! first over the neighbor graph, so substations joined by a line end up next
//! to each other on the spiral.

use std::collections::HashSet;
use std::sync::Arc;

use gridgeo_core::{Coordinate, DefaultPositions};
use tracing::debug;

use crate::neighbors::NeighborGraph;
use crate::propagation::{Placements, PositionOrigin};

pub const DEFAULT_DECLUTTER_THRESHOLD: usize = 5;
pub const CLUSTER_TOLERANCE_DEG: f64 = 1.0;
pub const SPIRAL_RADIUS_STEP: f64 = 0.0001;
pub const SPIRAL_ANGLE_STEP_DEG: f64 = 25.0;

/// Successive positions on a spiral around `center`.
///
/// The first position is the center itself; each following one grows the
/// radius by [`SPIRAL_RADIUS_STEP`] and turns by [`SPIRAL_ANGLE_STEP_DEG`].
#[derive(Debug, Clone)]
pub struct Spiral {
    center: Coordinate,
    radius: f64,
    angle_deg: f64,
}

impl Spiral {
    pub fn new(center: Coordinate) -> Self {
        Self {
            center,
            radius: 0.0,
            angle_deg: 0.0,
        }
    }
}

impl Iterator for Spiral {
    type Item = Coordinate;

    fn next(&mut self) -> Option<Coordinate> {
        let distance = self.radius.sqrt();
        let angle = self.angle_deg.to_radians();
        let point = self
            .center
            .offset(distance * angle.cos(), distance * angle.sin());
        self.radius += SPIRAL_RADIUS_STEP;
        self.angle_deg += SPIRAL_ANGLE_STEP_DEG;
        Some(point)
    }
}

#[derive(Debug, Clone)]
pub struct Declutterer {
    defaults: Arc<DefaultPositions>,
    threshold: usize,
}

impl Declutterer {
    pub fn new(defaults: Arc<DefaultPositions>) -> Self {
        Self {
            defaults,
            threshold: DEFAULT_DECLUTTER_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Spread every oversized default cluster; returns how many substations moved.
    pub fn declutter(&self, placements: &mut Placements, graph: &NeighborGraph) -> usize {
        let mut moved = 0;
        for entry in self.defaults.entries() {
            let cluster: Vec<String> = placements
                .iter()
                .filter(|p| {
                    p.origin == PositionOrigin::CountryDefault
                        && p.geo.country.as_ref() == Some(&entry.country)
                        && p.geo.coordinate.is_near(&entry.coordinate, CLUSTER_TOLERANCE_DEG)
                })
                .map(|p| p.geo.id.clone())
                .collect();

            if cluster.len() <= self.threshold {
                continue;
            }
            debug!(
                country = %entry.country,
                size = cluster.len(),
                "decluttering default position cluster"
            );
            moved += spread_cluster(placements, graph, &cluster, entry.coordinate);
        }
        moved
    }
}

fn spread_cluster(
    placements: &mut Placements,
    graph: &NeighborGraph,
    cluster: &[String],
    center: Coordinate,
) -> usize {
    let members: HashSet<&str> = cluster.iter().map(String::as_str).collect();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut spiral = Spiral::new(center);
    let mut moved = 0;

    for root in cluster {
        let mut stack: Vec<&str> = vec![root.as_str()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(coordinate) = spiral.next() {
                if placements.relocate(current, coordinate) {
                    moved += 1;
                }
            }
            let next: Vec<&str> = graph
                .neighbors(current)
                .into_iter()
                .filter(|n| members.contains(n) && !visited.contains(n))
                .collect();
            // reversed so the first neighbor is popped first
            stack.extend(next.into_iter().rev());
        }
    }
    moved
}
