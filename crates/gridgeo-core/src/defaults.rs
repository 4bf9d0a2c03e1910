use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geo::{Coordinate, Country};

/// Fallback coordinate for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultPositionEntry {
    pub country: Country,
    pub coordinate: Coordinate,
}

/// Read-only per-country fallback table.
///
/// Built once at startup and shared behind an `Arc`; nothing mutates it afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultPositions {
    entries: BTreeMap<Country, Coordinate>,
}

impl DefaultPositions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, country: Country, coordinate: Coordinate) -> Self {
        self.entries.insert(country, coordinate);
        self
    }

    /// Later entries for the same country replace earlier ones.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = DefaultPositionEntry>) {
        for entry in entries {
            self.entries.insert(entry.country, entry.coordinate);
        }
    }

    pub fn get(&self, country: Option<&Country>) -> Option<Coordinate> {
        country.and_then(|c| self.entries.get(c).copied())
    }

    pub fn entries(&self) -> impl Iterator<Item = DefaultPositionEntry> + '_ {
        self.entries.iter().map(|(country, coordinate)| DefaultPositionEntry {
            country: country.clone(),
            coordinate: *coordinate,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<DefaultPositionEntry> for DefaultPositions {
    fn from_iter<I: IntoIterator<Item = DefaultPositionEntry>>(iter: I) -> Self {
        let mut table = DefaultPositions::new();
        table.extend(iter);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_requires_a_country() {
        let fr = Country::parse("FR").unwrap();
        let table = DefaultPositions::new().with(fr.clone(), Coordinate::new(46.6, 1.9));
        assert_eq!(table.get(Some(&fr)), Some(Coordinate::new(46.6, 1.9)));
        assert_eq!(table.get(None), None);
        assert_eq!(table.get(Some(&Country::parse("BE").unwrap())), None);
    }

    #[test]
    fn later_entries_override() {
        let fr = Country::parse("FR").unwrap();
        let table: DefaultPositions = vec![
            DefaultPositionEntry {
                country: fr.clone(),
                coordinate: Coordinate::new(1.0, 1.0),
            },
            DefaultPositionEntry {
                country: fr.clone(),
                coordinate: Coordinate::new(2.0, 2.0),
            },
        ]
        .into_iter()
        .collect();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(Some(&fr)), Some(Coordinate::new(2.0, 2.0)));
    }
}
