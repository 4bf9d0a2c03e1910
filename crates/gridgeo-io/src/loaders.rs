//! File loaders for networks, default positions, and position imports.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use gridgeo_core::{Coordinate, Country, DefaultPositionEntry, GridNetwork, LineGeoData, SubstationGeoData};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening {what} file '{}'", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("parsing {what} file '{}'", path.display()))
}

/// Load a network snapshot from JSON.
///
/// Duplicate ids are rejected; lines pointing at unknown voltage levels are kept.
pub fn load_network(path: &Path) -> Result<GridNetwork> {
    let network: GridNetwork = read_json(path, "network")?;
    info!(
        path = %path.display(),
        substations = network.substation_count(),
        lines = network.line_count(),
        "loaded network"
    );
    Ok(network)
}

/// Load per-country default positions.
///
/// Expected format:
/// ```csv
/// country,latitude,longitude
/// FR,46.6,1.9
/// BE,50.6,4.6
/// ```
pub fn load_default_positions_csv(path: &Path) -> Result<Vec<DefaultPositionEntry>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening default positions CSV: {}", path.display()))?;

    let mut entries = Vec::new();
    for result in reader.records() {
        let record = result.with_context(|| "reading default positions CSV record")?;

        let code = record
            .get(0)
            .ok_or_else(|| anyhow!("missing country column"))?;
        let country = Country::parse(code)?;

        let latitude: f64 = record
            .get(1)
            .ok_or_else(|| anyhow!("missing latitude column"))?
            .trim()
            .parse()
            .with_context(|| format!("parsing latitude for {country}"))?;
        let longitude: f64 = record
            .get(2)
            .ok_or_else(|| anyhow!("missing longitude column"))?
            .trim()
            .parse()
            .with_context(|| format!("parsing longitude for {country}"))?;

        entries.push(DefaultPositionEntry {
            country,
            coordinate: Coordinate::new(latitude, longitude),
        });
    }

    Ok(entries)
}

/// Load substation positions to import, as a JSON array.
pub fn load_substations(path: &Path) -> Result<Vec<SubstationGeoData>> {
    read_json(path, "substation positions")
}

/// Load line paths to import, as a JSON array.
pub fn load_lines(path: &Path) -> Result<Vec<LineGeoData>> {
    read_json(path, "line paths")
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    fs::write(path, json).with_context(|| format!("writing '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridgeo_core::TopologyProvider;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_default_positions_csv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "country,latitude,longitude").unwrap();
        writeln!(file, "fr,46.6,1.9").unwrap();
        writeln!(file, "BE, 50.6, 4.6").unwrap();

        let entries = load_default_positions_csv(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].country.as_str(), "FR");
        assert_eq!(entries[1].coordinate, Coordinate::new(50.6, 4.6));
    }

    #[test]
    fn test_bad_country_in_defaults_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "country,latitude,longitude").unwrap();
        writeln!(file, "FRANCE,46.6,1.9").unwrap();
        assert!(load_default_positions_csv(file.path()).is_err());
    }

    #[test]
    fn test_load_network() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "substations": [
                    {{"id": "A", "country": "FR", "position": {{"lat": 45.0, "lon": 5.0}}}},
                    {{"id": "B", "country": "FR"}}
                ],
                "voltage_levels": [
                    {{"id": "A1", "substation": "A"}},
                    {{"id": "B1", "substation": "B"}}
                ],
                "lines": [{{"id": "AB", "voltage_level1": "A1", "voltage_level2": "B1"}}]
            }}"#
        )
        .unwrap();

        let network = load_network(file.path()).unwrap();
        assert_eq!(network.substation_count(), 2);
        let line = network.line("AB").unwrap();
        let (a, b) = network.terminals(line).unwrap();
        assert_eq!((a.id.as_str(), b.id.as_str()), ("A", "B"));
        assert_eq!(a.position, Some(Coordinate::new(45.0, 5.0)));
    }

    #[test]
    fn test_import_files_and_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("subs.json");
        let subs = vec![SubstationGeoData::new(
            "A",
            Some(Country::parse("FR").unwrap()),
            Coordinate::new(45.0, 5.0),
        )];
        write_json(&path, &subs).unwrap();
        assert_eq!(load_substations(&path).unwrap(), subs);

        let lines_path = dir.path().join("lines.json");
        fs::write(
            &lines_path,
            r#"[{"id": "AB", "substation_start": "A", "substation_end": "B",
                 "coordinates": [{"latitude": 45.5, "longitude": 5.1}]}]"#,
        )
        .unwrap();
        let lines = load_lines(&lines_path).unwrap();
        assert_eq!(lines[0].coordinates, vec![Coordinate::new(45.5, 5.1)]);
    }
}
