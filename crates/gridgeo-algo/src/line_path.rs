//! Line path reconstruction.
//!
//! Stores may know the pylons of a line without knowing their order. The path
//! is rebuilt greedily: starting at one substation, always walk to the nearest
//! pylon not yet used, and stop as soon as the far substation is closer than
//! that pylon. Pylons left over at that point are dropped.
//!
//! A line is ordered from the stored `substation_start` so that the same line
//! requested from either of its countries yields the same path, reversed.

use gridgeo_core::{distance, Coordinate, LineGeoData, SubstationGeoData};

/// Where the intermediate coordinates of a reconstructed line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    /// A previously ordered path, reused as is
    Cached,
    /// Ordered during this call
    Ordered,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedLine {
    /// Intermediate coordinates oriented from `start` to `end`, without the substations.
    pub line: LineGeoData,
    pub source: PathSource,
}

/// Order `pylons` greedily from `start` towards `end`.
///
/// Ties on distance keep the first pylon in input order.
pub fn order_pylons(start: Coordinate, end: Coordinate, pylons: &[Coordinate]) -> Vec<Coordinate> {
    let mut remaining: Vec<Coordinate> = pylons.to_vec();
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut current = start;

    while !remaining.is_empty() {
        let mut nearest = 0;
        let mut nearest_distance = f64::INFINITY;
        for (idx, pylon) in remaining.iter().enumerate() {
            let d = distance(&current, pylon);
            if d < nearest_distance {
                nearest = idx;
                nearest_distance = d;
            }
        }
        if distance(&current, &end) < nearest_distance {
            break;
        }
        current = remaining.remove(nearest);
        ordered.push(current);
    }
    ordered
}

/// Order the pylons of `line` between `start` and `end`.
///
/// `cached` is a previously ordered version of the same line; its order is
/// reused and only flipped if it was stored the other way round.
pub fn reconstruct(
    line: &LineGeoData,
    start: &SubstationGeoData,
    end: &SubstationGeoData,
    cached: Option<&LineGeoData>,
) -> ReconstructedLine {
    let (coordinates, source) = match cached {
        Some(cached) => {
            let mut coordinates = cached.coordinates.clone();
            if cached.runs_from(&start.id, &end.id) == Some(false) {
                coordinates.reverse();
            }
            (coordinates, PathSource::Cached)
        }
        None => {
            let forward = line.runs_from(&start.id, &end.id).unwrap_or(true);
            let (from, to) = if forward { (start, end) } else { (end, start) };
            let mut coordinates = order_pylons(from.coordinate, to.coordinate, &line.coordinates);
            if !forward {
                coordinates.reverse();
            }
            (coordinates, PathSource::Ordered)
        }
    };

    ReconstructedLine {
        line: LineGeoData {
            id: line.id.clone(),
            country1: start.country.clone(),
            country2: end.country.clone(),
            substation_start: start.id.clone(),
            substation_end: end.id.clone(),
            coordinates,
        },
        source,
    }
}

/// Put the substation coordinates at both ends of `line`.
pub fn stitch(line: &LineGeoData, start: &SubstationGeoData, end: &SubstationGeoData) -> LineGeoData {
    let mut coordinates = Vec::with_capacity(line.coordinates.len() + 2);
    coordinates.push(start.coordinate);
    coordinates.extend_from_slice(&line.coordinates);
    coordinates.push(end.coordinate);
    LineGeoData {
        id: line.id.clone(),
        country1: start.country.clone(),
        country2: end.country.clone(),
        substation_start: start.id.clone(),
        substation_end: end.id.clone(),
        coordinates,
    }
}
