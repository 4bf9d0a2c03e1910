//! Request-level orchestration: scope, load, infer, reconstruct, write back.
//!
//! Every request runs against its own network snapshot and store reads, so a
//! [`GeoDataService`] can be shared by any number of pool workers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use gridgeo_algo::{
    build_neighbor_graph, reconstruct, stitch, Declutterer, NeighborGraph, PathSource,
    Placements, PropagationEngine,
};
use gridgeo_core::{
    Country, Diagnostics, DefaultPositions, GeoError, GeoResult, Line, LineGeoData,
    ResolutionStats, Substation, SubstationGeoData, TopologyProvider,
};
use gridgeo_io::{GeoDataStore, StoreQuery, StoredLine};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineSettings;

/// Items of one request with what was dropped on the way.
#[derive(Debug, Clone, Serialize)]
pub struct GeoResponse<T> {
    pub items: Vec<T>,
    pub diagnostics: Diagnostics,
    pub stats: ResolutionStats,
    /// Share of substations placed from the store or from real neighbors
    pub accuracy: f64,
}

impl<T> GeoResponse<T> {
    fn new(items: Vec<T>, diagnostics: Diagnostics, stats: ResolutionStats) -> Self {
        Self {
            items,
            diagnostics,
            accuracy: stats.accuracy(),
            stats,
        }
    }
}

/// A line with both terminals resolved in the network.
#[derive(Debug, Clone, Copy)]
struct LineEnds<'n> {
    line: &'n Line,
    side1: &'n Substation,
    side2: &'n Substation,
}

struct Placed {
    placements: Placements,
    stats: ResolutionStats,
}

pub struct GeoDataService<S> {
    store: S,
    engine: PropagationEngine,
    declutterer: Declutterer,
}

impl<S: GeoDataStore> GeoDataService<S> {
    pub fn new(store: S, defaults: Arc<DefaultPositions>, settings: EngineSettings) -> Self {
        Self {
            store,
            engine: PropagationEngine::new(Arc::clone(&defaults))
                .with_max_iterations(settings.max_iterations),
            declutterer: Declutterer::new(defaults).with_threshold(settings.declutter_threshold),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Positions of every substation declared in `countries`.
    pub fn substations_by_countries<T: TopologyProvider + ?Sized>(
        &self,
        network: &T,
        countries: &[Country],
    ) -> GeoResult<GeoResponse<SubstationGeoData>> {
        require_countries(countries)?;
        let mut diagnostics = Diagnostics::new();

        let scope = network.substations(countries);
        let known = self.known_substations(&StoreQuery::Countries(countries.to_vec()), &[])?;
        let placed = self.place(network, &scope, &known, &mut diagnostics);

        let items = placed.placements.into_geo_data();
        info!(
            countries = %country_list(countries),
            substations = items.len(),
            "substation positions resolved"
        );
        Ok(GeoResponse::new(items, diagnostics, placed.stats))
    }

    /// Positions of the substations `ids`.
    ///
    /// Inference runs over the connected components of the requested
    /// substations, then the output is cut back to `ids` in request order.
    pub fn substations_by_ids<T: TopologyProvider + ?Sized>(
        &self,
        network: &T,
        ids: &[String],
    ) -> GeoResult<GeoResponse<SubstationGeoData>> {
        let ids = normalize_ids(ids)?;
        let mut diagnostics = Diagnostics::new();

        let seeds: Vec<&str> = ids
            .iter()
            .filter(|id| {
                let found = network.substation(id).is_some();
                if !found {
                    warn!(substation = %id, "requested substation not in network");
                    diagnostics.add_warning_with_entity(
                        "request",
                        "substation not found in network",
                        &format!("Substation {id}"),
                    );
                }
                found
            })
            .map(String::as_str)
            .collect();

        let scope = component_scope(network, seeds);
        let known = self.known_substations(&StoreQuery::ids(scope.iter().map(|s| s.id.clone())), &[])?;
        let placed = self.place(network, &scope, &known, &mut diagnostics);

        let mut by_id: HashMap<String, SubstationGeoData> = placed
            .placements
            .into_geo_data()
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        let items: Vec<SubstationGeoData> = ids.iter().filter_map(|id| by_id.remove(id)).collect();
        info!(
            requested = ids.len(),
            component = scope.len(),
            substations = items.len(),
            "substation positions resolved"
        );
        Ok(GeoResponse::new(items, diagnostics, placed.stats))
    }

    /// Paths of every line attached to a substation of `countries`.
    pub fn lines_by_countries<T: TopologyProvider + ?Sized>(
        &self,
        network: &T,
        countries: &[Country],
    ) -> GeoResult<GeoResponse<LineGeoData>> {
        require_countries(countries)?;
        let mut diagnostics = Diagnostics::new();

        let country_substations = network.substations(countries);
        let mut seen: HashSet<&str> = HashSet::new();
        let mut lines: Vec<&Line> = Vec::new();
        for substation in &country_substations {
            for line in network.lines_at(&substation.id) {
                if seen.insert(line.id.as_str()) {
                    lines.push(line);
                }
            }
        }
        let ends = line_ends(network, &lines, &mut diagnostics);

        // cross-border lines pull in their far-end terminals
        let mut scope = country_substations;
        let mut in_scope: HashSet<String> = scope.iter().map(|s| s.id.clone()).collect();
        let mut far_ends: Vec<String> = Vec::new();
        for end in &ends {
            for side in [end.side1, end.side2] {
                if in_scope.insert(side.id.clone()) {
                    scope.push(side);
                    far_ends.push(side.id.clone());
                }
            }
        }

        let query = StoreQuery::Countries(countries.to_vec());
        let known = self.known_substations(&query, &far_ends)?;
        let line_ids: Vec<String> = ends.iter().map(|e| e.line.id.clone()).collect();
        let stored = self.stored_lines(&query, &line_ids)?;
        let placed = self.place(network, &scope, &known, &mut diagnostics);

        let items = self.resolve_lines(&ends, &placed.placements, &stored, &mut diagnostics)?;
        info!(
            countries = %country_list(countries),
            lines = items.len(),
            "line paths resolved"
        );
        Ok(GeoResponse::new(items, diagnostics, placed.stats))
    }

    /// Paths of the lines `ids`, in request order.
    pub fn lines_by_ids<T: TopologyProvider + ?Sized>(
        &self,
        network: &T,
        ids: &[String],
    ) -> GeoResult<GeoResponse<LineGeoData>> {
        let ids = normalize_ids(ids)?;
        let mut diagnostics = Diagnostics::new();

        let lines: Vec<&Line> = ids
            .iter()
            .filter_map(|id| {
                let line = network.line(id);
                if line.is_none() {
                    warn!(line = %id, "requested line not in network");
                    diagnostics.add_warning_with_entity(
                        "request",
                        "line not found in network",
                        &format!("Line {id}"),
                    );
                }
                line
            })
            .collect();
        let ends = line_ends(network, &lines, &mut diagnostics);

        let seeds = ends
            .iter()
            .flat_map(|e| [e.side1.id.as_str(), e.side2.id.as_str()]);
        let scope = component_scope(network, seeds);
        let known = self.known_substations(&StoreQuery::ids(scope.iter().map(|s| s.id.clone())), &[])?;
        let line_ids: Vec<String> = ends.iter().map(|e| e.line.id.clone()).collect();
        let stored = self.stored_lines(&StoreQuery::Ids(line_ids), &[])?;
        let placed = self.place(network, &scope, &known, &mut diagnostics);

        let items = self.resolve_lines(&ends, &placed.placements, &stored, &mut diagnostics)?;
        info!(requested = ids.len(), lines = items.len(), "line paths resolved");
        Ok(GeoResponse::new(items, diagnostics, placed.stats))
    }

    /// Store substation positions as given.
    pub fn save_substations(&self, substations: &[SubstationGeoData]) -> GeoResult<usize> {
        for substation in substations {
            if substation.id.trim().is_empty() {
                return Err(GeoError::InvalidRequest("substation with empty id".to_string()));
            }
            if !substation.coordinate.is_finite() {
                return Err(GeoError::InvalidRequest(format!(
                    "substation {} has a non-finite coordinate",
                    substation.id
                )));
            }
        }
        self.store.write_substations(substations)?;
        info!(count = substations.len(), "saved substation positions");
        Ok(substations.len())
    }

    /// Store line pylons; they are ordered on first use.
    pub fn save_lines(&self, lines: &[LineGeoData]) -> GeoResult<usize> {
        for line in lines {
            if line.id.trim().is_empty() {
                return Err(GeoError::InvalidRequest("line with empty id".to_string()));
            }
            if let Some(bad) = line.coordinates.iter().find(|c| !c.is_finite()) {
                return Err(GeoError::InvalidRequest(format!(
                    "line {} has a non-finite coordinate {bad}",
                    line.id
                )));
            }
        }
        let stored: Vec<StoredLine> = lines.iter().cloned().map(StoredLine::unordered).collect();
        self.store.write_lines(&stored)?;
        info!(count = lines.len(), "saved line paths");
        Ok(lines.len())
    }

    /// Store positions matching `query`, plus those of `extra_ids`.
    fn known_substations(
        &self,
        query: &StoreQuery,
        extra_ids: &[String],
    ) -> GeoResult<HashMap<String, SubstationGeoData>> {
        let mut known: HashMap<String, SubstationGeoData> = self
            .store
            .read_substations(query)?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        let missing: Vec<String> = extra_ids
            .iter()
            .filter(|id| !known.contains_key(*id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            known.extend(
                self.store
                    .read_substations(&StoreQuery::Ids(missing))?
                    .into_iter()
                    .map(|s| (s.id.clone(), s)),
            );
        }
        Ok(known)
    }

    /// Stored lines matching `query`, plus any of `line_ids` it missed.
    fn stored_lines(
        &self,
        query: &StoreQuery,
        line_ids: &[String],
    ) -> GeoResult<HashMap<String, StoredLine>> {
        let mut stored: HashMap<String, StoredLine> = self
            .store
            .read_lines(query)?
            .into_iter()
            .map(|l| (l.line.id.clone(), l))
            .collect();
        let missing: Vec<String> = line_ids
            .iter()
            .filter(|id| !stored.contains_key(*id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            stored.extend(
                self.store
                    .read_lines(&StoreQuery::Ids(missing))?
                    .into_iter()
                    .map(|l| (l.line.id.clone(), l)),
            );
        }
        Ok(stored)
    }

    /// Build the neighbor graph of `scope`, propagate, then declutter.
    fn place<T: TopologyProvider + ?Sized>(
        &self,
        network: &T,
        scope: &[&Substation],
        known: &HashMap<String, SubstationGeoData>,
        diagnostics: &mut Diagnostics,
    ) -> Placed {
        let mut graph_diagnostics = Diagnostics::new();
        let graph: NeighborGraph = build_neighbor_graph(network, scope, &mut graph_diagnostics);
        merge_unique(diagnostics, graph_diagnostics);

        let mut placements = self.engine.resolve(known, scope, &graph);
        let decluttered = self.declutterer.declutter(&mut placements, &graph);

        for id in placements.unresolved() {
            let err = GeoError::UnresolvedSubstation(id.to_string());
            warn!(substation = id, "dropping substation without position");
            diagnostics.add_warning_with_entity(
                "propagation",
                &format!("{err}: no known neighbor and no country default"),
                &format!("Substation {id}"),
            );
        }

        let stats = ResolutionStats {
            decluttered,
            ..placements.stats()
        };
        if !stats.is_accurate() {
            warn!(
                accuracy = stats.accuracy(),
                known = stats.known,
                derived = stats.derived,
                fallback = stats.fallback,
                unresolved = stats.unresolved,
                "low position accuracy"
            );
        }
        Placed { placements, stats }
    }

    /// Order and stitch every line whose two ends were placed.
    ///
    /// Lines ordered here for the first time are written back once, in their
    /// stored orientation, flagged as ordered.
    fn resolve_lines(
        &self,
        ends: &[LineEnds<'_>],
        placements: &Placements,
        stored: &HashMap<String, StoredLine>,
        diagnostics: &mut Diagnostics,
    ) -> GeoResult<Vec<LineGeoData>> {
        let mut items = Vec::with_capacity(ends.len());
        let mut newly_ordered: Vec<StoredLine> = Vec::new();

        for end in ends {
            let (Some(start), Some(finish)) = (placements.get(&end.side1.id), placements.get(&end.side2.id))
            else {
                warn!(line = %end.line.id, "dropping line with an unplaced terminal");
                diagnostics.add_warning_with_entity(
                    "line",
                    "terminal substation has no position",
                    &format!("Line {}", end.line.id),
                );
                continue;
            };

            let reconstructed = match stored.get(&end.line.id) {
                Some(cached) if cached.ordered => {
                    reconstruct(&cached.line, &start.geo, &finish.geo, Some(&cached.line))
                }
                Some(bag) => reconstruct(&bag.line, &start.geo, &finish.geo, None),
                None => reconstruct(
                    &LineGeoData::new(end.line.id.clone(), end.side1.id.clone(), end.side2.id.clone()),
                    &start.geo,
                    &finish.geo,
                    None,
                ),
            };

            if let (PathSource::Ordered, Some(bag)) = (reconstructed.source, stored.get(&end.line.id)) {
                let mut coordinates = reconstructed.line.coordinates.clone();
                if bag.line.runs_from(&end.side1.id, &end.side2.id) == Some(false) {
                    coordinates.reverse();
                }
                newly_ordered.push(StoredLine::ordered(LineGeoData {
                    coordinates,
                    ..bag.line.clone()
                }));
            }

            items.push(stitch(&reconstructed.line, &start.geo, &finish.geo));
        }

        if !newly_ordered.is_empty() {
            debug!(count = newly_ordered.len(), "writing back newly ordered lines");
            self.store.write_lines(&newly_ordered)?;
        }
        Ok(items)
    }
}

fn require_countries(countries: &[Country]) -> GeoResult<()> {
    if countries.is_empty() {
        return Err(GeoError::InvalidRequest("no country requested".to_string()));
    }
    Ok(())
}

/// Trim and dedup `ids`, keeping request order.
fn normalize_ids(ids: &[String]) -> GeoResult<Vec<String>> {
    if ids.is_empty() {
        return Err(GeoError::InvalidRequest("empty id list".to_string()));
    }
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(ids.len());
    for id in ids {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(GeoError::InvalidRequest("blank id in id list".to_string()));
        }
        if seen.insert(trimmed.to_string()) {
            normalized.push(trimmed.to_string());
        }
    }
    Ok(normalized)
}

fn country_list(countries: &[Country]) -> String {
    countries
        .iter()
        .map(Country::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Substations connected to `seeds` over the whole network, in network order.
fn component_scope<'n, 's, T: TopologyProvider + ?Sized>(
    network: &'n T,
    seeds: impl IntoIterator<Item = &'s str>,
) -> Vec<&'n Substation> {
    let all = network.substations(&[]);
    // dangling lines are reported against the request scope, not here
    let full = build_neighbor_graph(network, &all, &mut Diagnostics::new());
    let reachable = full.reachable_from(seeds);
    all.into_iter()
        .filter(|s| reachable.contains(&s.id))
        .collect()
}

/// Resolve line terminals, dropping lines that point outside the network.
fn line_ends<'n, T: TopologyProvider + ?Sized>(
    network: &'n T,
    lines: &[&'n Line],
    diagnostics: &mut Diagnostics,
) -> Vec<LineEnds<'n>> {
    lines
        .iter()
        .filter_map(|line| match network.terminals(line) {
            Ok((side1, side2)) => Some(LineEnds { line, side1, side2 }),
            Err(err) => {
                warn!(line = %line.id, "dropping line: {err}");
                diagnostics.add_warning_with_entity(
                    "topology",
                    &err.to_string(),
                    &format!("Line {}", line.id),
                );
                None
            }
        })
        .collect()
}

/// Add issues from `other` not already reported for the same entity.
fn merge_unique(diagnostics: &mut Diagnostics, other: Diagnostics) {
    for issue in other.issues {
        let duplicate = diagnostics
            .issues
            .iter()
            .any(|i| i.category == issue.category && i.entity.is_some() && i.entity == issue.entity);
        if !duplicate {
            diagnostics.add(issue);
        }
    }
}
