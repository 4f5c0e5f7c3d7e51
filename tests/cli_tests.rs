// End-to-end tests of the machwatch binary
//
// Runs with --interval 0 and replayed or seeded readings so every session
// finishes immediately and deterministically.

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn replay_file(dir: &TempDir, rows: &[(f64, f64)]) -> std::path::PathBuf {
    let path = dir.path().join("replay.csv");
    let mut content = String::from("vibration,temperature\n");
    for (v, t) in rows {
        content.push_str(&format!("{},{}\n", v, t));
    }
    fs::write(&path, content).unwrap();
    path
}

fn varied_then_outlier() -> Vec<(f64, f64)> {
    let mut rows: Vec<(f64, f64)> = (0..12)
        .map(|i| if i % 2 == 0 { (1.0, 20.0) } else { (1.2, 21.0) })
        .collect();
    rows.push((100.0, 200.0));
    rows
}

#[test]
fn test_replay_session_persists_exports_and_alerts() {
    let tmp = TempDir::new().unwrap();
    let replay = replay_file(&tmp, &varied_then_outlier());
    let db = tmp.path().join("machine_health.jsonl");
    let csv = tmp.path().join("machine_data.csv");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("machwatch");
    cmd.arg("--replay")
        .arg(&replay)
        .arg("--db")
        .arg(&db)
        .arg("--csv")
        .arg(&csv)
        .arg("--interval")
        .arg("0");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("MAINTENANCE ALERT"))
        .stderr(predicate::str::contains("Readings taken:       13"));

    let stored = fs::read_to_string(&db).unwrap();
    assert_eq!(stored.lines().count(), 13);

    let exported = fs::read_to_string(&csv).unwrap();
    let lines: Vec<&str> = exported.lines().collect();
    assert_eq!(lines[0], "timestamp,vibration,temperature,anomaly_score");
    assert_eq!(lines.len(), 14);
    assert!(lines[13].ends_with(",100,200,-1"));
}

#[test]
fn test_replay_on_export_boundary_exports_once() {
    let tmp = TempDir::new().unwrap();
    let rows: Vec<(f64, f64)> = (0..10)
        .map(|i| if i % 2 == 0 { (1.0, 20.0) } else { (1.2, 21.0) })
        .collect();
    let replay = replay_file(&tmp, &rows);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("machwatch");
    cmd.arg("--replay")
        .arg(&replay)
        .arg("--db")
        .arg(tmp.path().join("db.jsonl"))
        .arg("--csv")
        .arg(tmp.path().join("out.csv"))
        .arg("--interval")
        .arg("0");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Exports written:      1"))
        .stderr(predicate::str::contains("Stopped by: end of readings"));
}

#[test]
fn test_max_readings_with_simulated_sensor() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("db.jsonl");
    let csv = tmp.path().join("out.csv");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("machwatch");
    cmd.arg("--db")
        .arg(&db)
        .arg("--csv")
        .arg(&csv)
        .arg("--interval")
        .arg("0")
        .arg("--seed")
        .arg("42")
        .arg("--max-readings")
        .arg("15");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Stopped by: reading limit"));

    assert_eq!(fs::read_to_string(&db).unwrap().lines().count(), 15);
    assert_eq!(fs::read_to_string(&csv).unwrap().lines().count(), 16);
}

#[test]
fn test_isolation_forest_scorer_session() {
    let tmp = TempDir::new().unwrap();
    let replay = replay_file(&tmp, &varied_then_outlier());
    let db = tmp.path().join("db.jsonl");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("machwatch");
    cmd.arg("--replay")
        .arg(&replay)
        .arg("--db")
        .arg(&db)
        .arg("--csv")
        .arg(tmp.path().join("out.csv"))
        .arg("--interval")
        .arg("0")
        .arg("--scorer")
        .arg("isolation-forest");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("isolation_forest"));

    let stored = fs::read_to_string(&db).unwrap();
    let last: serde_json::Value = serde_json::from_str(stored.lines().last().unwrap()).unwrap();
    assert_eq!(last["anomaly_score"], -1.0);
}

#[test]
fn test_export_only_writes_existing_history() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("db.jsonl");
    let csv = tmp.path().join("out.csv");
    fs::write(
        &db,
        concat!(
            r#"{"timestamp":"2024-01-01 00:01:00","vibration":2.0,"temperature":30.0,"anomaly_score":0.5}"#,
            "\n",
            r#"{"timestamp":"2024-01-01 00:00:00","vibration":1.0,"temperature":20.0,"anomaly_score":0.0}"#,
            "\n"
        ),
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("machwatch");
    cmd.arg("--export-only").arg("--db").arg(&db).arg("--csv").arg(&csv);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 readings"));

    let exported = fs::read_to_string(&csv).unwrap();
    assert_eq!(
        exported,
        "timestamp,vibration,temperature,anomaly_score\n\
         2024-01-01 00:00:00,1,20,0\n\
         2024-01-01 00:01:00,2,30,0.5\n"
    );
}

#[test]
fn test_config_file_is_applied() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("from_config.jsonl");
    let csv = tmp.path().join("from_config.csv");
    let config = tmp.path().join("machwatch.toml");
    fs::write(
        &config,
        format!(
            "[monitor]\ninterval_secs = 0\nexport_every = 5\n\n[sensor]\nseed = 1\n\n[storage]\ndatabase_path = {:?}\ncsv_path = {:?}\n",
            db.display().to_string(),
            csv.display().to_string()
        ),
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("machwatch");
    cmd.arg("--config").arg(&config).arg("-n").arg("5");

    cmd.assert().success();
    assert_eq!(fs::read_to_string(&db).unwrap().lines().count(), 5);
    assert_eq!(fs::read_to_string(&csv).unwrap().lines().count(), 6);
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("machwatch.toml");
    fs::write(&config, "[window]\ncapacity = 100\ndrop_oldest = 0\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("machwatch");
    cmd.arg("--config").arg(&config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("drop_oldest"));
}

#[test]
fn test_missing_replay_file_fails() {
    let tmp = TempDir::new().unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("machwatch");
    cmd.arg("--replay")
        .arg(tmp.path().join("nope.csv"))
        .arg("--db")
        .arg(tmp.path().join("db.jsonl"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load replay file"));
}
