// SPDX-License-Identifier: Apache-2.0
//! End-to-end CLI runs over the textual model language.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

const SYNC_REACH: &str = "\
system:demo
event:a
clock:1:x
process:P1 location:P1:l0{initial:} location:P1:l1{labels:goal}
          edge:P1:l0:l1:a{provided: x>=2}
process:P2 location:P2:l0{initial:} location:P2:l1
          edge:P2:l0:l1:a
sync:P1@a:P2@a
";

const INVARIANT_BLOCKS: &str = "\
event:a
clock:1:x
process:P location:P:l0{initial:invariant:x<=1} location:P:l1{labels:bad}
        edge:P:l0:l1:a{provided: x>=2}
";

fn model_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn tempo() -> Command {
    Command::cargo_bin("tempo").unwrap()
}

#[test]
fn check_prints_a_model_summary() {
    let file = model_file(SYNC_REACH);
    tempo()
        .arg("check")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 processes"))
        .stdout(predicate::str::contains("1 clocks"));
}

#[test]
fn reach_finds_the_goal_through_the_synchronization() {
    let file = model_file(SYNC_REACH);
    tempo()
        .args(["reach", "-l", "goal"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("true"));
}

#[test]
fn reach_reports_unreachable_labels() {
    let file = model_file(INVARIANT_BLOCKS);
    tempo()
        .args(["reach", "-l", "bad", "--json"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reachable\":false"))
        .stdout(predicate::str::contains("\"visited\":1"));
}

#[test]
fn reach_json_counts_visited_states() {
    let file = model_file(SYNC_REACH);
    tempo()
        .args(["reach", "-l", "goal", "--json"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reachable\":true"))
        .stdout(predicate::str::contains("\"visited\":2"));
}

#[test]
fn dfs_order_is_accepted() {
    let file = model_file(SYNC_REACH);
    tempo()
        .args(["reach", "-l", "goal", "--order", "dfs", "--covering", "leaf"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("true"));
}

#[test]
fn concrete_counter_example_reports_rational_valuations() {
    let file = model_file(SYNC_REACH);
    tempo()
        .args(["reach", "-l", "goal", "--cex", "concrete"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("x=0"))
        .stdout(predicate::str::contains("x=2"))
        .stdout(predicate::str::contains("P1@a"));
}

#[test]
fn dot_dump_tags_subsumption_edges() {
    let model = "\
event:a event:b
clock:1:x
process:P location:P:l0{initial: : labels: loop}
        edge:P:l0:l0:a{do: x=0}
        edge:P:l0:l0:b
";
    let file = model_file(model);
    let out = NamedTempFile::new().unwrap();
    tempo()
        .args(["reach", "--extra", "none", "--dot"])
        .arg(out.path())
        .arg(file.path())
        .assert()
        .success();
    let dot = std::fs::read_to_string(out.path()).unwrap();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("style=\"dashed\""));
    assert!(dot.contains("{subsumption}"));
}

#[test]
fn parse_errors_exit_with_code_two() {
    let file = model_file("location:P:l0{initial:");
    tempo()
        .arg("check")
        .arg(file.path())
        .assert()
        .failure()
        .code(2);
}

#[test]
fn model_errors_exit_with_code_three() {
    // unknown event on the edge
    let file = model_file(
        "clock:1:x process:P location:P:l0{initial:} edge:P:l0:l0:a",
    );
    tempo()
        .arg("check")
        .arg(file.path())
        .assert()
        .failure()
        .code(3);
}

#[test]
fn missing_files_exit_with_code_one() {
    tempo()
        .args(["check", "/nonexistent/model.txt"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn unknown_labels_exit_with_code_three() {
    let file = model_file(SYNC_REACH);
    tempo()
        .args(["reach", "-l", "nope"])
        .arg(file.path())
        .assert()
        .failure()
        .code(3);
}
