//! Retention sweep and the watch loop, driven through the `od` binary.

use assert_cmd::Command;
use serde_json::{Value, json};
use std::path::Path;
use tempfile::TempDir;

fn od_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("od"));
    cmd.current_dir(dir);
    cmd.env("ORDERDESK_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    for var in ["FORMAT", "ORDERDESK_DATA_DIR", "ORDERDESK_TOKEN", "GITHUB_TOKEN"] {
        cmd.env_remove(var);
    }
    cmd
}

/// A flat array in the field names older replicas wrote.
fn seed_legacy_orders(dir: &Path) {
    let orders = json!([
        {
            "id": "1",
            "customerName": "Old",
            "phoneNumber": "1",
            "orderType": "Cake",
            "creationDate": "2020-01-01T10:00:00Z",
            "paid": true,
            "delivered": true,
            "deliveryDate": "2020-01-02T10:00:00Z"
        },
        {
            "id": "2",
            "customerName": "Pending",
            "phoneNumber": "2",
            "orderType": "Pie",
            "creationDate": "2020-01-01T10:00:00Z"
        },
        {
            "id": "3",
            "customerName": "Archived",
            "phoneNumber": "3",
            "orderType": "Tart",
            "creationDate": "2020-01-01T10:00:00Z",
            "delivered": true,
            "deliveryDate": "2020-01-02T10:00:00Z",
            "hidden": true
        }
    ]);
    let data = dir.join(".orderdesk/data");
    std::fs::create_dir_all(&data).expect("data dir");
    std::fs::write(data.join("orders.json"), orders.to_string()).expect("seed");
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = od_cmd(dir).args(args).output().expect("run");
    assert!(
        output.status.success(),
        "od {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("JSON")
}

#[test]
fn sweep_removes_long_delivered_visible_orders_only() {
    let dir = TempDir::new().expect("tempdir");
    od_cmd(dir.path()).args(["init"]).assert().success();
    seed_legacy_orders(dir.path());

    let report = run_json(dir.path(), &["sweep", "--json"]);
    assert_eq!(report["removed"], json!(["1"]));
    assert_eq!(report["window_days"], 10);

    let all = run_json(dir.path(), &["list", "--all", "--json"]);
    let ids: Vec<&str> = all
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|order| order["id"].as_str())
        .collect();
    assert_eq!(ids, ["2", "3"]);

    let again = run_json(dir.path(), &["sweep", "--json"]);
    assert_eq!(again["removed"], json!([]));
}

#[test]
fn hidden_orders_are_swept_when_configured() {
    let dir = TempDir::new().expect("tempdir");
    od_cmd(dir.path()).args(["init"]).assert().success();
    std::fs::write(
        dir.path().join(".orderdesk/config.toml"),
        "[retention]\nsweep_hidden = true\n",
    )
    .expect("config");
    seed_legacy_orders(dir.path());

    let report = run_json(dir.path(), &["sweep", "--json"]);
    assert_eq!(report["removed"], json!(["1", "3"]));
}

#[test]
fn legacy_fields_are_read() {
    let dir = TempDir::new().expect("tempdir");
    od_cmd(dir.path()).args(["init"]).assert().success();
    seed_legacy_orders(dir.path());

    let order = run_json(dir.path(), &["show", "2", "--json"]);
    assert_eq!(order["productType"], "Pie");
    assert_eq!(order["createdAt"], "2020-01-01T10:00:00Z");
}

#[test]
fn watch_stops_after_requested_ticks() {
    let dir = TempDir::new().expect("tempdir");
    od_cmd(dir.path()).args(["init"]).assert().success();
    seed_legacy_orders(dir.path());

    let output = od_cmd(dir.path())
        .args([
            "watch",
            "--interval-secs",
            "0",
            "--iterations",
            "2",
            "--no-sync",
            "--json",
        ])
        .output()
        .expect("run");
    assert!(output.status.success());

    let ticks: Vec<Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("tick JSON"))
        .collect();
    assert_eq!(ticks.len(), 2);
    assert_eq!(ticks[0]["removed"], 1);
    assert_eq!(ticks[1]["removed"], 0);
}
