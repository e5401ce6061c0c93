#![forbid(unsafe_code)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

fn cli(workspace: &Path) -> Command {
    let mut cmd = Command::cargo_bin("garde-cli").unwrap();
    cmd.arg("--workspace").arg(workspace);
    cmd
}

fn write_staff(dir: &Path) -> std::path::PathBuf {
    let mut csv = String::from("id,name,tier,unit,specialty,room,quota,weekend_limit\n");
    for i in 0..8 {
        csv.push_str(&format!("n{i},Nurse {i},junior,medical,,,31,10\n"));
    }
    let path = dir.join("staff.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

#[test]
fn import_generate_check_list() {
    let dir = tempdir().unwrap();
    let ws = dir.path().join("garde.json");
    let staff = write_staff(dir.path());

    cli(&ws)
        .args(["import-staff", "--csv"])
        .arg(&staff)
        .assert()
        .success()
        .stdout(predicate::str::contains("8 staff member(s) imported"));

    cli(&ws)
        .args(["add-service", "--id", "ward", "--name", "Ward", "--min", "1", "--max", "1"])
        .assert()
        .success();

    let out_csv = dir.path().join("planning.csv");
    cli(&ws)
        .args(["generate", "--year", "2025", "--month", "10", "--seed", "1", "--attempts", "2"])
        .arg("--out-csv")
        .arg(&out_csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("2025-10: 0 unfilled position(s)"));
    let exported = std::fs::read_to_string(&out_csv).unwrap();
    // en-tête + une ligne par jour
    assert_eq!(exported.lines().count(), 32);

    cli(&ws)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("OK: no conflicts"));

    cli(&ws)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("ward:Nurse"));

    cli(&ws)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nurse 0 |"));
}

#[test]
fn generate_without_services_fails() {
    let dir = tempdir().unwrap();
    let ws = dir.path().join("garde.json");
    let staff = write_staff(dir.path());

    cli(&ws).args(["import-staff", "--csv"]).arg(&staff).assert().success();
    cli(&ws)
        .args(["generate", "--year", "2025", "--month", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("add-service"));
}

#[test]
fn add_constraint_needs_a_target() {
    let dir = tempdir().unwrap();
    let ws = dir.path().join("garde.json");

    cli(&ws)
        .args(["add-constraint", "--days", "2,5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--unit or --specialty"));

    cli(&ws)
        .args(["add-constraint", "--specialty", "wound", "--days", "2,9"])
        .assert()
        .failure();

    cli(&ws)
        .args(["add-constraint", "--specialty", "wound", "--days", "2,5"])
        .assert()
        .success();
    assert!(ws.exists());
}

#[test]
fn list_before_generate_fails() {
    let dir = tempdir().unwrap();
    let ws = dir.path().join("garde.json");
    cli(&ws)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no schedule generated yet"));
}
