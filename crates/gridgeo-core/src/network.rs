//! Transmission network topology as seen by the geo-data engine.
//!
//! Only what position inference needs is modelled: substations (with their
//! optional declared country and position extension), the voltage levels they
//! host, and the lines joining two voltage levels. Lines may reference voltage
//! levels or substations that are missing from the snapshot; such lines fail
//! [`TopologyProvider::terminals`] and are dropped by consumers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GeoError, GeoResult};
use crate::geo::{Coordinate, Country};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Country>,
    /// Position declared by the network model itself, independent of any store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Coordinate>,
}

impl Substation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            country: None,
            position: None,
        }
    }

    pub fn with_country(mut self, country: Country) -> Self {
        self.country = Some(country);
        self
    }

    pub fn with_position(mut self, position: Coordinate) -> Self {
        self.position = Some(position);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageLevel {
    pub id: String,
    pub substation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: String,
    pub voltage_level1: String,
    pub voltage_level2: String,
}

/// Read-only view of a network snapshot.
pub trait TopologyProvider {
    /// Substations declared in any of `countries`; all substations when empty.
    fn substations(&self, countries: &[Country]) -> Vec<&Substation>;

    fn substation(&self, id: &str) -> Option<&Substation>;

    fn lines(&self) -> Vec<&Line>;

    fn line(&self, id: &str) -> Option<&Line>;

    /// Lines attached to any voltage level of the substation.
    fn lines_at(&self, substation_id: &str) -> Vec<&Line>;

    /// Substations at side 1 and side 2 of the line.
    fn terminals(&self, line: &Line) -> GeoResult<(&Substation, &Substation)>;
}

/// Serialized form of a [`GridNetwork`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkDocument {
    #[serde(default)]
    pub substations: Vec<Substation>,
    #[serde(default)]
    pub voltage_levels: Vec<VoltageLevel>,
    #[serde(default)]
    pub lines: Vec<Line>,
}

/// In-memory network snapshot with id indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "NetworkDocument", into = "NetworkDocument")]
pub struct GridNetwork {
    substations: Vec<Substation>,
    voltage_levels: Vec<VoltageLevel>,
    lines: Vec<Line>,
    substation_index: HashMap<String, usize>,
    voltage_level_index: HashMap<String, usize>,
    line_index: HashMap<String, usize>,
    lines_by_voltage_level: HashMap<String, Vec<usize>>,
    voltage_levels_by_substation: HashMap<String, Vec<usize>>,
}

impl GridNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_substation(&mut self, substation: Substation) -> GeoResult<()> {
        if self.substation_index.contains_key(&substation.id) {
            return Err(GeoError::Validation(format!(
                "duplicate substation '{}'",
                substation.id
            )));
        }
        self.substation_index
            .insert(substation.id.clone(), self.substations.len());
        self.substations.push(substation);
        Ok(())
    }

    pub fn add_voltage_level(
        &mut self,
        id: impl Into<String>,
        substation: impl Into<String>,
    ) -> GeoResult<()> {
        let level = VoltageLevel {
            id: id.into(),
            substation: substation.into(),
        };
        if self.voltage_level_index.contains_key(&level.id) {
            return Err(GeoError::Validation(format!(
                "duplicate voltage level '{}'",
                level.id
            )));
        }
        let idx = self.voltage_levels.len();
        self.voltage_level_index.insert(level.id.clone(), idx);
        self.voltage_levels_by_substation
            .entry(level.substation.clone())
            .or_default()
            .push(idx);
        self.voltage_levels.push(level);
        Ok(())
    }

    pub fn add_line(
        &mut self,
        id: impl Into<String>,
        voltage_level1: impl Into<String>,
        voltage_level2: impl Into<String>,
    ) -> GeoResult<()> {
        let line = Line {
            id: id.into(),
            voltage_level1: voltage_level1.into(),
            voltage_level2: voltage_level2.into(),
        };
        if self.line_index.contains_key(&line.id) {
            return Err(GeoError::Validation(format!("duplicate line '{}'", line.id)));
        }
        let idx = self.lines.len();
        self.line_index.insert(line.id.clone(), idx);
        self.lines_by_voltage_level
            .entry(line.voltage_level1.clone())
            .or_default()
            .push(idx);
        if line.voltage_level2 != line.voltage_level1 {
            self.lines_by_voltage_level
                .entry(line.voltage_level2.clone())
                .or_default()
                .push(idx);
        }
        self.lines.push(line);
        Ok(())
    }

    pub fn substation_count(&self) -> usize {
        self.substations.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn substation_of(&self, line: &Line, voltage_level: &str) -> GeoResult<&Substation> {
        let level = self
            .voltage_level_index
            .get(voltage_level)
            .map(|&idx| &self.voltage_levels[idx])
            .ok_or_else(|| {
                GeoError::topology(&line.id, format!("voltage level '{voltage_level}' not found"))
            })?;
        self.substation(&level.substation).ok_or_else(|| {
            GeoError::topology(
                &line.id,
                format!("substation '{}' not found", level.substation),
            )
        })
    }
}

impl TopologyProvider for GridNetwork {
    fn substations(&self, countries: &[Country]) -> Vec<&Substation> {
        self.substations
            .iter()
            .filter(|s| {
                countries.is_empty()
                    || s.country.as_ref().is_some_and(|c| countries.contains(c))
            })
            .collect()
    }

    fn substation(&self, id: &str) -> Option<&Substation> {
        self.substation_index.get(id).map(|&idx| &self.substations[idx])
    }

    fn lines(&self) -> Vec<&Line> {
        self.lines.iter().collect()
    }

    fn line(&self, id: &str) -> Option<&Line> {
        self.line_index.get(id).map(|&idx| &self.lines[idx])
    }

    fn lines_at(&self, substation_id: &str) -> Vec<&Line> {
        let mut indices: Vec<usize> = self
            .voltage_levels_by_substation
            .get(substation_id)
            .into_iter()
            .flatten()
            .flat_map(|&vl| {
                self.lines_by_voltage_level
                    .get(&self.voltage_levels[vl].id)
                    .into_iter()
                    .flatten()
                    .copied()
            })
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices.into_iter().map(|idx| &self.lines[idx]).collect()
    }

    fn terminals(&self, line: &Line) -> GeoResult<(&Substation, &Substation)> {
        let side1 = self.substation_of(line, &line.voltage_level1)?;
        let side2 = self.substation_of(line, &line.voltage_level2)?;
        Ok((side1, side2))
    }
}

impl TryFrom<NetworkDocument> for GridNetwork {
    type Error = GeoError;

    fn try_from(doc: NetworkDocument) -> GeoResult<Self> {
        let mut network = GridNetwork::new();
        for substation in doc.substations {
            network.add_substation(substation)?;
        }
        for level in doc.voltage_levels {
            network.add_voltage_level(level.id, level.substation)?;
        }
        for line in doc.lines {
            network.add_line(line.id, line.voltage_level1, line.voltage_level2)?;
        }
        Ok(network)
    }
}

impl From<GridNetwork> for NetworkDocument {
    fn from(network: GridNetwork) -> Self {
        NetworkDocument {
            substations: network.substations,
            voltage_levels: network.voltage_levels,
            lines: network.lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fr() -> Country {
        Country::parse("FR").unwrap()
    }

    fn two_substation_network() -> GridNetwork {
        let mut network = GridNetwork::new();
        network
            .add_substation(Substation::new("A").with_country(fr()))
            .unwrap();
        network
            .add_substation(Substation::new("B").with_country(Country::parse("BE").unwrap()))
            .unwrap();
        network.add_voltage_level("A_400", "A").unwrap();
        network.add_voltage_level("A_225", "A").unwrap();
        network.add_voltage_level("B_400", "B").unwrap();
        network.add_line("L1", "A_400", "B_400").unwrap();
        network.add_line("L2", "A_225", "B_400").unwrap();
        network.add_line("L3", "A_400", "MISSING").unwrap();
        network
    }

    #[test]
    fn country_filter_selects_declared_substations() {
        let network = two_substation_network();
        let ids: Vec<_> = network.substations(&[fr()]).iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec!["A".to_string()]);
        assert_eq!(network.substations(&[]).len(), 2);
    }

    #[test]
    fn lines_at_collects_every_voltage_level_once() {
        let network = two_substation_network();
        let ids: Vec<_> = network.lines_at("A").iter().map(|l| l.id.clone()).collect();
        assert_eq!(ids, vec!["L1", "L2", "L3"]);
        assert_eq!(network.lines_at("B").len(), 2);
        assert!(network.lines_at("Z").is_empty());
    }

    #[test]
    fn terminals_fail_on_dangling_voltage_level() {
        let network = two_substation_network();
        let (s1, s2) = network.terminals(network.line("L1").unwrap()).unwrap();
        assert_eq!((s1.id.as_str(), s2.id.as_str()), ("A", "B"));

        let err = network.terminals(network.line("L3").unwrap()).unwrap_err();
        assert!(matches!(err, GeoError::TopologyResolution { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut network = two_substation_network();
        assert!(network.add_substation(Substation::new("A")).is_err());
        assert!(network.add_line("L1", "A_400", "B_400").is_err());
    }

    #[test]
    fn document_round_trip_rebuilds_indices() {
        let json = r#"{
            "substations": [{"id": "A", "country": "fr", "position": {"lat": 1.0, "lon": 2.0}}, {"id": "B"}],
            "voltage_levels": [{"id": "VA", "substation": "A"}, {"id": "VB", "substation": "B"}],
            "lines": [{"id": "L", "voltage_level1": "VA", "voltage_level2": "VB"}]
        }"#;
        let network: GridNetwork = serde_json::from_str(json).unwrap();
        assert_eq!(network.substation("A").unwrap().country, Some(fr()));
        assert_eq!(network.lines_at("B").len(), 1);

        let text = serde_json::to_string(&network).unwrap();
        let again: GridNetwork = serde_json::from_str(&text).unwrap();
        assert_eq!(again.line_count(), 1);
    }
}
