// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end runs of the `stepwise` binary.

#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `stepwise --config-dir <tmp>`, so tests never touch the real config dir.
fn stepwise(config: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stepwise").unwrap();
    cmd.arg("--config-dir").arg(config.path());
    cmd
}

#[test]
fn run_narrates_a_sort() {
    let config = TempDir::new().unwrap();
    stepwise(&config)
        .args(["run", "bubble", "5", "3", "1"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[1/"))
        .stdout(predicate::str::contains("comparisons="));
}

#[test]
fn run_accepts_negative_numbers() {
    let config = TempDir::new().unwrap();
    let out = stepwise(&config)
        .args(["run", "--json", "insertion", "-4", "2", "-9"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let doc: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let last = doc["snapshots"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["state"]["values"], serde_json::json!([-9, -4, 2]));
    assert_eq!(doc["digest"].as_str().unwrap().len(), 64);
}

#[test]
fn invalid_input_prints_the_rejection_snapshot() {
    let config = TempDir::new().unwrap();
    stepwise(&config)
        .args(["run", "infix", "A+"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[1/1] Expression cannot end with an operator"));
}

#[test]
fn unknown_algorithm_fails() {
    let config = TempDir::new().unwrap();
    stepwise(&config)
        .args(["run", "bogosort", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown algorithm `bogosort`"));
}

#[test]
fn record_then_verify_round_trips() {
    let config = TempDir::new().unwrap();
    let golden = config.path().join("kmp.golden.json");
    stepwise(&config)
        .args(["record", "kmp", "ABABDABACDABABCABAB", "ABABCABAB", "--out"])
        .arg(&golden)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("recorded kmp"));

    stepwise(&config)
        .args(["verify", "kmp", "ABABDABACDABABCABAB", "ABABCABAB", "--golden"])
        .arg(&golden)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ok kmp"));

    stepwise(&config)
        .args(["verify", "kmp", "ABABDABACDABABCABAB", "ABAB", "--golden"])
        .arg(&golden)
        .assert()
        .failure()
        .stderr(predicate::str::contains("recorded for"));
}

#[test]
fn verify_reports_a_tampered_digest() {
    let config = TempDir::new().unwrap();
    let golden = config.path().join("lru.json");
    stepwise(&config)
        .args(["record", "lru", "2", "put A 1", "put B 2", "put C 3", "--out"])
        .arg(&golden)
        .assert()
        .success();

    let mut doc: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&golden).unwrap()).unwrap();
    doc["digest_hex"] = serde_json::Value::String("00".repeat(32));
    std::fs::write(&golden, serde_json::to_vec(&doc).unwrap()).unwrap();

    stepwise(&config)
        .args(["verify", "lru", "2", "put A 1", "put B 2", "put C 3", "--golden"])
        .arg(&golden)
        .assert()
        .failure()
        .stderr(predicate::str::contains("trace digest mismatch for lru-cache"));
}

#[test]
fn torture_agrees_across_runs() {
    let config = TempDir::new().unwrap();
    stepwise(&config)
        .args(["torture", "kruskal", "4", "0-1:1", "1-2:2", "0-2:3", "2-3:1", "--runs", "7"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("7 runs of kruskal agree on "));
}

#[test]
fn dijkstra_reports_shortest_distances() {
    let config = TempDir::new().unwrap();
    stepwise(&config)
        .args(["run", "dijkstra", "4", "0", "0-1:5", "0-2:1", "2-1:1", "1-3:2"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Shortest distances from node 0: 0:0, 1:2, 2:1, 3:4",
        ));
    stepwise(&config)
        .args(["run", "bfs", "3", "7", "0-1:1"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[1/1] start node 7 is out of range [0, 2]"));
}

#[test]
fn torture_refuses_zero_runs() {
    let config = TempDir::new().unwrap();
    stepwise(&config)
        .args(["torture", "heap", "1", "--runs", "0"])
        .assert()
        .failure();
}

#[test]
fn play_prints_every_step_once() {
    let config = TempDir::new().unwrap();
    let run = stepwise(&config)
        .args(["run", "polynomial", "2x^2 + 3x + 1", "x + 2"])
        .output()
        .unwrap();
    stepwise(&config)
        .args(["play", "--speed", "1", "polynomial", "2x^2 + 3x + 1", "x + 2"])
        .assert()
        .success()
        .stdout(run.stdout);
}

#[test]
fn stored_prefs_drive_later_commands() {
    let config = TempDir::new().unwrap();
    stepwise(&config)
        .args(["prefs", "--speed", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"speed_ms\": 5"));
    assert!(config.path().join("player.json").is_file());

    let mut doc: serde_json::Value =
        serde_json::from_slice(&std::fs::read(config.path().join("player.json")).unwrap())
            .unwrap();
    doc["show_metrics"] = serde_json::Value::Bool(false);
    doc["max_input_items"] = serde_json::json!(3);
    std::fs::write(config.path().join("player.json"), doc.to_string()).unwrap();

    stepwise(&config)
        .args(["run", "selection", "3", "1", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("comparisons=").not());
    stepwise(&config)
        .args(["run", "selection", "4", "3", "1", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at most 3 are allowed"));
}

#[test]
fn list_names_every_family() {
    let config = TempDir::new().unwrap();
    stepwise(&config)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("boyer-moore"))
        .stdout(predicate::str::contains("kruskal | prim"))
        .stdout(predicate::str::contains("dfs | bfs | dijkstra"))
        .stdout(predicate::str::contains("infix"));
}
