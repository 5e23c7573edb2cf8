use std::process::{Command, Output};

// The binary with a clean environment: no config file, no FIXPOINT_* overrides.
fn fixpoint(args: &[&str], vars: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_fixpoint"));
    for (key, _) in std::env::vars() {
        if key.starts_with("FIXPOINT_") {
            command.env_remove(key);
        }
    }
    command
        .env("FIXPOINT_CONFIG", "no_such_fixpoint_config.toml")
        .env("RUST_LOG", "off")
        .args(args)
        .envs(vars.iter().copied());
    command.output().expect("run fixpoint")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn prints_the_successor_fixed_point() {
    let output = fixpoint(&["4"], &[]);
    assert!(output.status.success());
    let expected: String = (1..=9).map(|n| format!("{n}\n")).collect();
    assert_eq!(stdout(&output), expected);
}

#[test]
fn bad_thread_counts_fail() {
    for arg in ["0", "-2", "x"] {
        let output = fixpoint(&[arg], &[]);
        assert!(!output.status.success(), "accepted {arg}");
        assert!(output.stdout.is_empty());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("fixpoint:"), "{stderr}");
    }
}

#[test]
fn extra_arguments_fail() {
    let output = fixpoint(&["2", "3"], &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage"));
}

#[test]
fn failed_compute_prints_nothing() {
    let output = fixpoint(&["2"], &[("FIXPOINT_SOLVER__TIMEOUT_MS", "0")]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("cancelled").count(), 1, "{stderr}");
}

#[test]
fn environment_selects_json_output() {
    let output = fixpoint(&["3"], &[("FIXPOINT_OUTPUT", "json")]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["complete"], serde_json::json!(true));
    assert_eq!(report["stats"]["threads"], serde_json::json!(3));
    assert_eq!(report["facts"], serde_json::json!([1, 2, 3, 4, 5, 6, 7, 8, 9]));
}

#[test]
fn argument_overrides_environment_threads() {
    let output = fixpoint(
        &["2"],
        &[("FIXPOINT_SOLVER__THREADS", "7"), ("FIXPOINT_OUTPUT", "json")],
    );
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["stats"]["threads"], serde_json::json!(2));
}

#[test]
fn environment_selects_the_closure_program() {
    let dir = std::env::temp_dir().join(format!("fixpoint_cli_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("closure.toml");
    std::fs::write(&path, "[program]\nkind = \"closure\"\nedges = [[0, 1], [1, 2]]\n").unwrap();
    let output = fixpoint(&[], &[("FIXPOINT_CONFIG", path.to_str().unwrap())]);
    let _ = std::fs::remove_dir_all(&dir);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Reaches(0, 1).\nReaches(0, 2).\nReaches(1, 2).\n");
}
