use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, to_string_pretty, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// A - B - C in France, plus a tie line from C to D in Belgium.
fn write_network(dir: &Path) -> PathBuf {
    let network = json!({
        "substations": [
            {"id": "A", "country": "FR"},
            {"id": "B", "country": "FR"},
            {"id": "C", "country": "FR"},
            {"id": "D", "country": "BE"}
        ],
        "voltage_levels": [
            {"id": "A1", "substation": "A"},
            {"id": "B1", "substation": "B"},
            {"id": "C1", "substation": "C"},
            {"id": "D1", "substation": "D"}
        ],
        "lines": [
            {"id": "AB", "voltage_level1": "A1", "voltage_level2": "B1"},
            {"id": "BC", "voltage_level1": "B1", "voltage_level2": "C1"},
            {"id": "CD", "voltage_level1": "C1", "voltage_level2": "D1"},
            {"id": "GHOST", "voltage_level1": "A1", "voltage_level2": "X1"}
        ]
    });
    let path = dir.join("network.json");
    fs::write(&path, to_string_pretty(&network).unwrap()).unwrap();
    path
}

fn import(store: &Path, kind: &str, file: &Path) {
    Command::cargo_bin("gridgeo")
        .unwrap()
        .args([
            "import",
            kind,
            "--store",
            store.to_str().unwrap(),
            file.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported"));
}

fn seed_store(dir: &Path) -> PathBuf {
    let store = dir.join("store.json");
    let subs = dir.join("subs.json");
    fs::write(
        &subs,
        to_string_pretty(&json!([
            {"id": "A", "country": "FR", "coordinate": {"lat": 45.0, "lon": 4.0}},
            {"id": "C", "country": "FR", "coordinate": {"lat": 47.0, "lon": 6.0}},
            {"id": "D", "country": "BE", "coordinate": {"lat": 50.0, "lon": 4.5}}
        ]))
        .unwrap(),
    )
    .unwrap();
    import(&store, "substations", &subs);

    let lines = dir.join("lines.json");
    fs::write(
        &lines,
        to_string_pretty(&json!([{
            "id": "AB",
            "country1": "FR",
            "country2": "FR",
            "substation_start": "A",
            "substation_end": "B",
            "coordinates": [{"lat": 45.8, "lon": 4.8}, {"lat": 45.3, "lon": 4.3}]
        }]))
        .unwrap(),
    )
    .unwrap();
    import(&store, "lines", &lines);
    store
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap()
}

#[test]
fn substations_by_country_prints_positions() {
    let dir = tempdir().unwrap();
    let network = write_network(dir.path());
    let store = seed_store(dir.path());

    let output = Command::cargo_bin("gridgeo")
        .unwrap()
        .args([
            "substations",
            "--network",
            network.to_str().unwrap(),
            "--store",
            store.to_str().unwrap(),
            "--country",
            "fr",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let items = stdout_json(&output);
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 3);
    let b = items.iter().find(|s| s["id"] == "B").unwrap();
    assert_eq!(b["coordinate"], json!({"lat": 46.0, "lon": 5.0}));
}

#[test]
fn lines_are_stitched_and_written_back() {
    let dir = tempdir().unwrap();
    let network = write_network(dir.path());
    let store = seed_store(dir.path());
    let out = dir.path().join("out").join("lines.json");

    Command::cargo_bin("gridgeo")
        .unwrap()
        .args([
            "lines",
            "--network",
            network.to_str().unwrap(),
            "--store",
            store.to_str().unwrap(),
            "--id",
            "AB,GHOST",
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let lines: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let lines = lines.as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["coordinates"].as_array().unwrap().len(), 4);
    assert_eq!(lines[0]["coordinates"][1], json!({"lat": 45.3, "lon": 4.3}));

    let snapshot: Value = serde_json::from_str(&fs::read_to_string(&store).unwrap()).unwrap();
    let record = snapshot["lines"]
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["id"] == "AB")
        .unwrap();
    assert_eq!(record["ordered"], json!(true));
}

#[test]
fn unknown_country_code_fails() {
    let dir = tempdir().unwrap();
    let network = write_network(dir.path());

    Command::cargo_bin("gridgeo")
        .unwrap()
        .args([
            "substations",
            "--network",
            network.to_str().unwrap(),
            "--country",
            "FRANCE",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("country code"));
}

#[test]
fn scope_is_required() {
    let dir = tempdir().unwrap();
    let network = write_network(dir.path());

    Command::cargo_bin("gridgeo")
        .unwrap()
        .args(["lines", "--network", network.to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn config_supplies_network_and_defaults() {
    let dir = tempdir().unwrap();
    write_network(dir.path());
    fs::write(
        dir.path().join("gridgeo.toml"),
        r#"
[data]
network = "network.json"

[default_positions]
FR = { latitude = 46.6, longitude = 1.9 }
BE = { latitude = 50.6, longitude = 4.6 }

[logging]
level = "warn"
"#,
    )
    .unwrap();

    let output = Command::cargo_bin("gridgeo")
        .unwrap()
        .args([
            "--config",
            dir.path().join("gridgeo.toml").to_str().unwrap(),
            "substations",
            "--country",
            "BE",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let items = stdout_json(&output);
    assert_eq!(
        items,
        json!([{"id": "D", "country": "BE", "coordinate": {"lat": 50.6, "lon": 4.6}}])
    );
}

#[test]
fn graph_reports_stats_and_dangling_lines() {
    let dir = tempdir().unwrap();
    let network = write_network(dir.path());

    Command::cargo_bin("gridgeo")
        .unwrap()
        .args(["graph", "--network", network.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Substations   : 4"))
        .stdout(predicate::str::contains("Edges         : 3"))
        .stdout(predicate::str::contains("GHOST"));
}
