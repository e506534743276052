//! CLI integration tests using assert_cmd.
//!
//! Problem files are written to temporary directories; every test runs the
//! real `sunit` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(deprecated)]
fn sunit() -> Command {
    Command::cargo_bin("sunit").unwrap()
}

const RATIONALS_TWO: &str = r#"
[field]
polynomial = [0, 1]

[units]
torsion = ["-1"]
torsion_order = 2
fundamental = [["2"]]

[[primes]]
p = 2
"#;

const EISENSTEIN: &str = r#"
[field]
polynomial = [1, 1, 1]
variable = "xi"

[units]
torsion = ["1", "1"]
torsion_order = 6
fundamental = [["-1", "-2"]]

[[primes]]
p = 3
"#;

fn problem(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

// --- Help and arg validation ---

#[test]
fn help_shows_all_subcommands() {
    sunit().arg("--help").assert().success().stdout(
        predicate::str::contains("solve")
            .and(predicate::str::contains("bound"))
            .and(predicate::str::contains("split-primes"))
            .and(predicate::str::contains("verify")),
    );
}

#[test]
fn help_solve_shows_args() {
    sunit()
        .args(["solve", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--problem")
                .and(predicate::str::contains("--precision"))
                .and(predicate::str::contains("--json")),
        );
}

#[test]
fn solve_requires_problem() {
    sunit()
        .arg("solve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--problem"));
}

#[test]
fn missing_problem_file_fails_with_context() {
    sunit()
        .args(["solve", "--problem", "/nonexistent/problem.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load problem file"));
}

#[test]
fn malformed_problem_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = problem(&dir, "bad.toml", "[field]\npolynomial = \"x^2\"\n");
    sunit()
        .args(["bound", "--problem"])
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn precision_below_minimum_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = problem(&dir, "q.toml", RATIONALS_TWO);
    sunit()
        .args(["bound", "--precision", "8", "--problem"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid solver settings"));
}

// --- Runs ---

#[test]
fn solve_rationals_prints_two_solutions() {
    let dir = TempDir::new().unwrap();
    let path = problem(&dir, "q.toml", RATIONALS_TWO);
    sunit()
        .args(["solve", "--problem"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 solution(s)"));
}

#[test]
fn solve_json_is_a_certificate() {
    let dir = TempDir::new().unwrap();
    let path = problem(&dir, "k.toml", EISENSTEIN);
    let out = sunit()
        .args(["--json", "solve", "--problem"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(out.status.success());
    let cert: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(cert["solutions"].as_array().unwrap().len(), 4);
    assert_eq!(cert["variable"], "xi");
    assert_eq!(cert["torsion_order"], 6);
}

#[test]
fn certificate_file_verifies() {
    let dir = TempDir::new().unwrap();
    let path = problem(&dir, "q.toml", RATIONALS_TWO);
    let cert = dir.path().join("cert.json");
    sunit()
        .args(["solve", "--problem"])
        .arg(&path)
        .arg("--certificate")
        .arg(&cert)
        .assert()
        .success();
    assert!(cert.exists());
    sunit()
        .args(["verify", "--problem"])
        .arg(&path)
        .arg("--certificate")
        .arg(&cert)
        .assert()
        .success()
        .stdout(predicate::str::contains("Certificate OK: 2 solution(s)"));
}

#[test]
fn tampered_certificate_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = problem(&dir, "q.toml", RATIONALS_TWO);
    let cert = dir.path().join("cert.json");
    sunit()
        .args(["solve", "--problem"])
        .arg(&path)
        .arg("--certificate")
        .arg(&cert)
        .assert()
        .success();
    let text = std::fs::read_to_string(&cert).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
    value["solutions"][0]["x"] = serde_json::json!(["5"]);
    std::fs::write(&cert, value.to_string()).unwrap();
    sunit()
        .args(["verify", "--problem"])
        .arg(&path)
        .arg("--certificate")
        .arg(&cert)
        .assert()
        .failure()
        .stderr(predicate::str::contains("certificate rejected"));
}

#[test]
fn bound_prints_final_bound() {
    let dir = TempDir::new().unwrap();
    let path = problem(&dir, "q.toml", RATIONALS_TWO);
    sunit()
        .args(["bound", "--problem"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("M = ").and(predicate::str::contains("K0 = ")));
}

#[test]
fn split_primes_skip_primes_below_s() {
    let dir = TempDir::new().unwrap();
    let path = problem(&dir, "k.toml", EISENSTEIN);
    // Split primes of Q(xi) are 1 mod 3; lcm(6, 12, 18) = 36 >= 21.
    sunit()
        .args(["--json", "split-primes", "--bound", "10", "--problem"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[7,13,19]"));
}

#[test]
fn split_primes_zero_factor_fails() {
    let dir = TempDir::new().unwrap();
    let path = problem(&dir, "k.toml", EISENSTEIN);
    sunit()
        .args(["split-primes", "--bound", "10", "--factor", "0", "--problem"])
        .arg(&path)
        .assert()
        .failure();
}
