//! Substation adjacency derived from line connections.
//!
//! Two substations are neighbors when at least one line joins them. Parallel
//! lines collapse into a single edge and a line looping back to its own
//! substation adds nothing. Only substations of the request take part: a line
//! whose far end lies outside the request contributes no edge.

use std::collections::{BTreeSet, HashMap, HashSet};

use gridgeo_core::{Diagnostics, Substation, TopologyProvider};
use petgraph::graphmap::UnGraphMap;
use petgraph::visit::Bfs;
use serde::Serialize;
use tracing::{debug, warn};

/// Undirected substation adjacency.
#[derive(Debug, Clone, Default)]
pub struct NeighborGraph {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    graph: UnGraphMap<usize, ()>,
}

/// Summary statistics (node/edge counts, degree spread, components).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborGraphStats {
    pub substation_count: usize,
    pub edge_count: usize,
    pub isolated_count: usize,
    pub max_degree: usize,
    pub avg_degree: f64,
    pub components: usize,
}

impl NeighborGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a substation with no neighbors yet; returns false if already present.
    pub fn add_substation(&mut self, id: &str) -> bool {
        if self.index.contains_key(id) {
            return false;
        }
        let idx = self.ids.len();
        self.ids.push(id.to_string());
        self.index.insert(id.to_string(), idx);
        self.graph.add_node(idx);
        true
    }

    /// Join two registered substations.
    ///
    /// Self-loops and unknown ids are ignored. Returns true for a new edge.
    pub fn connect(&mut self, a: &str, b: &str) -> bool {
        if a == b {
            return false;
        }
        match (self.index.get(a), self.index.get(b)) {
            (Some(&ia), Some(&ib)) => self.graph.add_edge(ia, ib, ()).is_none(),
            _ => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Neighbors of `id`, in registration order.
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut neighbors: Vec<usize> = self.graph.neighbors(idx).collect();
        neighbors.sort_unstable();
        neighbors.into_iter().map(|n| self.ids[n].as_str()).collect()
    }

    pub fn degree(&self, id: &str) -> usize {
        self.index
            .get(id)
            .map(|&idx| self.graph.neighbors(idx).count())
            .unwrap_or(0)
    }

    /// Substation ids in registration order.
    pub fn substation_ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Every substation connected to one of `seeds`, seeds included.
    pub fn reachable_from<'a>(&self, seeds: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        let mut visited: HashSet<usize> = HashSet::new();
        for seed in seeds {
            let Some(&start) = self.index.get(seed) else {
                continue;
            };
            if visited.contains(&start) {
                continue;
            }
            let mut bfs = Bfs::new(&self.graph, start);
            while let Some(node) = bfs.next(&self.graph) {
                visited.insert(node);
            }
        }
        visited.into_iter().map(|idx| self.ids[idx].clone()).collect()
    }

    pub fn stats(&self) -> NeighborGraphStats {
        let degrees: Vec<usize> = (0..self.ids.len())
            .map(|idx| self.graph.neighbors(idx).count())
            .collect();
        let substation_count = degrees.len();
        let avg_degree = if substation_count == 0 {
            0.0
        } else {
            degrees.iter().sum::<usize>() as f64 / substation_count as f64
        };

        let mut seen: HashSet<usize> = HashSet::new();
        let mut components = 0;
        for idx in 0..substation_count {
            if seen.contains(&idx) {
                continue;
            }
            components += 1;
            let mut bfs = Bfs::new(&self.graph, idx);
            while let Some(node) = bfs.next(&self.graph) {
                seen.insert(node);
            }
        }

        NeighborGraphStats {
            substation_count,
            edge_count: self.graph.edge_count(),
            isolated_count: degrees.iter().filter(|&&d| d == 0).count(),
            max_degree: degrees.iter().copied().max().unwrap_or(0),
            avg_degree,
            components,
        }
    }
}

/// Build the adjacency of `substations` from the lines attached to their voltage levels.
///
/// Lines with an unresolvable terminal are skipped and reported once in `diagnostics`.
pub fn build_neighbor_graph<T: TopologyProvider + ?Sized>(
    topology: &T,
    substations: &[&Substation],
    diagnostics: &mut Diagnostics,
) -> NeighborGraph {
    let mut graph = NeighborGraph::new();
    for substation in substations {
        graph.add_substation(&substation.id);
    }

    let mut reported: HashSet<String> = HashSet::new();
    for substation in substations {
        for line in topology.lines_at(&substation.id) {
            match topology.terminals(line) {
                Ok((side1, side2)) => {
                    for other in [side1, side2] {
                        if other.id != substation.id {
                            graph.connect(&substation.id, &other.id);
                        }
                    }
                }
                Err(err) => {
                    if reported.insert(line.id.clone()) {
                        warn!(line = %line.id, "skipping line in neighbor graph: {err}");
                        diagnostics.add_warning_with_entity(
                            "topology",
                            &err.to_string(),
                            &format!("Line {}", line.id),
                        );
                    }
                }
            }
        }
    }

    debug!(
        substations = graph.len(),
        edges = graph.edge_count(),
        "built neighbor graph"
    );
    graph
}
