//! End-to-end order lifecycle through the `od` binary.
//!
//! Each test runs in its own temp directory with logging silenced and no
//! inherited remote credentials.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
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

fn init_project(dir: &Path) {
    od_cmd(dir).args(["init"]).assert().success();
}

fn json_of(dir: &Path, args: &[&str]) -> Value {
    let output = od_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("od should not crash");
    assert!(
        output.status.success(),
        "od {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

fn create_order(dir: &Path, customer: &str) -> String {
    let order = json_of(
        dir,
        &["create", "--customer", customer, "--phone", "555", "--product", "Pizza"],
    );
    order["id"].as_str().expect("id field").to_string()
}

#[test]
fn create_then_list_shows_new_order() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());

    let order = json_of(
        dir.path(),
        &["create", "-c", "Ana", "-p", "555", "--product", "Pizza"],
    );
    assert_eq!(order["customerName"], "Ana");
    assert_eq!(order["paid"], false);
    assert_eq!(order["delivered"], false);
    assert_eq!(order["hidden"], false);
    assert_eq!(order["collection"], "visible");
    assert_eq!(order["createdAt"], order["lastModified"]);

    let list = json_of(dir.path(), &["list"]);
    let list = list.as_array().expect("array");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], order["id"]);
}

#[test]
fn toggles_hide_and_restore_round_trip() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());
    let id = create_order(dir.path(), "Ana");

    let paid = json_of(dir.path(), &["paid", &id]);
    assert_eq!(paid["paid"], true);

    let delivered = json_of(dir.path(), &["delivered", &id]);
    assert_eq!(delivered["delivered"], true);
    assert!(delivered["deliveredAt"].is_string());

    let undelivered = json_of(dir.path(), &["delivered", &id]);
    assert_eq!(undelivered["delivered"], false);
    assert!(undelivered["deliveredAt"].is_null());

    let hidden = json_of(dir.path(), &["hide", &id]);
    assert_eq!(hidden["collection"], "hidden");
    assert_eq!(json_of(dir.path(), &["list"]).as_array().map(Vec::len), Some(0));
    assert_eq!(
        json_of(dir.path(), &["list", "--hidden"]).as_array().map(Vec::len),
        Some(1)
    );

    let restored = json_of(dir.path(), &["restore", &id]);
    assert_eq!(restored["collection"], "visible");
    assert_eq!(restored["paid"], true);
    assert_ne!(restored["lastModified"], hidden["lastModified"]);
}

#[test]
fn ids_are_unique_across_quick_creates() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());
    let first = create_order(dir.path(), "Ana");
    let second = create_order(dir.path(), "Bo");
    assert_ne!(first, second);
}

#[test]
fn list_filters_unpaid() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());
    let paid = create_order(dir.path(), "Ana");
    create_order(dir.path(), "Bo");
    json_of(dir.path(), &["paid", &paid]);

    let unpaid = json_of(dir.path(), &["list", "--unpaid"]);
    let unpaid = unpaid.as_array().expect("array");
    assert_eq!(unpaid.len(), 1);
    assert_eq!(unpaid[0]["customerName"], "Bo");
}

#[test]
fn text_mode_prints_tab_separated_rows() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());
    create_order(dir.path(), "Ana");

    od_cmd(dir.path())
        .args(["list"])
        .env("FORMAT", "text")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ID\tSET\tCUSTOMER"))
        .stdout(predicate::str::contains("\tAna\t555\tPizza\tno\tno\t"));
}

#[test]
fn theme_defaults_to_light_and_persists() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());
    assert_eq!(json_of(dir.path(), &["theme"])["theme"], "light");
    assert_eq!(json_of(dir.path(), &["theme", "dark"])["theme"], "dark");
    assert_eq!(json_of(dir.path(), &["theme"])["theme"], "dark");
}

#[test]
fn second_init_is_refused() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());
    od_cmd(dir.path())
        .args(["init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn completions_mention_binary() {
    let dir = TempDir::new().expect("tempdir");
    od_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("od"));
}
