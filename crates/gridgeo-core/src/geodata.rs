use serde::{Deserialize, Serialize};

use crate::geo::{Coordinate, Country};

/// Position of one substation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstationGeoData {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Country>,
    pub coordinate: Coordinate,
}

impl SubstationGeoData {
    pub fn new(id: impl Into<String>, country: Option<Country>, coordinate: Coordinate) -> Self {
        Self {
            id: id.into(),
            country,
            coordinate,
        }
    }
}

/// Path of one line.
///
/// `substation_start` / `substation_end` name the substations the stored
/// `coordinates` begin and end at, whatever side the network declares them on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineGeoData {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country1: Option<Country>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country2: Option<Country>,
    pub substation_start: String,
    pub substation_end: String,
    #[serde(default)]
    pub coordinates: Vec<Coordinate>,
}

impl LineGeoData {
    pub fn new(
        id: impl Into<String>,
        substation_start: impl Into<String>,
        substation_end: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            country1: None,
            country2: None,
            substation_start: substation_start.into(),
            substation_end: substation_end.into(),
            coordinates: Vec::new(),
        }
    }

    pub fn with_countries(mut self, country1: Option<Country>, country2: Option<Country>) -> Self {
        self.country1 = country1;
        self.country2 = country2;
        self
    }

    pub fn with_coordinates(mut self, coordinates: Vec<Coordinate>) -> Self {
        self.coordinates = coordinates;
        self
    }

    /// Whether the stored orientation runs from `from` to `to`.
    ///
    /// Both terminals matching decides first. Otherwise a single matching
    /// terminal decides, as long as it does not also match the other way round.
    /// Returns `None` when the stored terminals match neither orientation.
    pub fn runs_from(&self, from: &str, to: &str) -> Option<bool> {
        let start_is_from = self.substation_start == from;
        let end_is_to = self.substation_end == to;
        let start_is_to = self.substation_start == to;
        let end_is_from = self.substation_end == from;

        if start_is_from && end_is_to {
            return Some(true);
        }
        if start_is_to && end_is_from {
            return Some(false);
        }
        match (start_is_from || end_is_to, start_is_to || end_is_from) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            _ => None,
        }
    }

    pub fn touches_country(&self, country: &Country) -> bool {
        self.country1.as_ref() == Some(country) || self.country2.as_ref() == Some(country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_matches_either_terminal() {
        let line = LineGeoData::new("L1", "A", "B");
        assert_eq!(line.runs_from("A", "B"), Some(true));
        assert_eq!(line.runs_from("B", "A"), Some(false));
        assert_eq!(line.runs_from("X", "Y"), None);
    }

    #[test]
    fn single_terminal_decides_when_the_other_is_stale() {
        let line = LineGeoData::new("L1", "A", "B");
        assert_eq!(line.runs_from("A", "C"), Some(true));
        assert_eq!(line.runs_from("C", "B"), Some(true));
        assert_eq!(line.runs_from("C", "A"), Some(false));
        assert_eq!(line.runs_from("B", "C"), Some(false));
    }

    #[test]
    fn conflicting_terminal_matches_give_no_orientation() {
        // stored as a loop on A: A matches both ends of a request from A
        let looped = LineGeoData::new("L1", "A", "A");
        assert_eq!(looped.runs_from("A", "B"), None);
        assert_eq!(looped.runs_from("A", "A"), Some(true));
    }

    #[test]
    fn line_serializes_with_snake_case_terminals() {
        let line = LineGeoData::new("L1", "A", "B")
            .with_countries(Some(Country::parse("FR").unwrap()), None)
            .with_coordinates(vec![Coordinate::new(1.0, 2.0)]);
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["substation_start"], "A");
        assert_eq!(json["country1"], "FR");
        assert!(json.get("country2").is_none());
        assert_eq!(json["coordinates"][0]["lat"], 1.0);
    }
}
