use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

const FIXTURE: &str = "tests/fixtures/family.json";

fn run_layout(output: &Path, extra: &[&str]) -> std::process::ExitStatus {
    Command::new(env!("CARGO_BIN_EXE_constellation"))
        .args(["layout", "--input", FIXTURE, "--output", output.to_str().unwrap()])
        .args(extra)
        .status()
        .expect("Failed to execute constellation")
}

fn read_output(path: &Path) -> serde_json::Value {
    let json = fs::read_to_string(path).expect("Failed to read layout output");
    serde_json::from_str(&json).expect("Layout output is not valid JSON")
}

#[test]
fn lays_out_reference_family() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("layout.json");

    let status = run_layout(&output, &["--seed", "7", "--iterations", "60"]);
    assert!(status.success(), "constellation exited with error");

    let layout = read_output(&output);
    assert_eq!(layout["centeredId"], "p-elena");
    assert_eq!(layout["mode"], "direct");

    let nodes = layout["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 12, "every person should be positioned");

    let mut sum = [0.0_f64; 3];
    for node in nodes {
        let position = node["position"].as_array().unwrap();
        for (axis, value) in position.iter().enumerate() {
            let value = value.as_f64().unwrap();
            assert!(value.is_finite());
            sum[axis] += value;
        }
    }
    for total in sum {
        assert!((total / nodes.len() as f64).abs() < 1e-6, "layout is not centered");
    }

    let generation_of = |id: &str| {
        nodes
            .iter()
            .find(|n| n["id"] == id)
            .map(|n| n["generation"].as_i64().unwrap())
            .unwrap()
    };
    assert_eq!(generation_of("p-elena"), 0);
    assert_eq!(generation_of("p-walter"), -2);
    assert_eq!(generation_of("p-lucy"), 1);
    assert_eq!(generation_of("p-orphan"), -1);

    let elena = nodes.iter().find(|n| n["id"] == "p-elena").unwrap();
    assert_eq!(elena["name"], "Elena Hartwell");
}

#[test]
fn same_seed_gives_identical_output() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");

    assert!(run_layout(&first, &["--seed", "3", "--iterations", "40"]).success());
    assert!(run_layout(&second, &["--seed", "3", "--iterations", "40"]).success());

    assert_eq!(
        fs::read_to_string(first).unwrap(),
        fs::read_to_string(second).unwrap()
    );
}

#[test]
fn honors_config_file_and_centered_override() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("nested").join("layout.json");

    let status = run_layout(
        &output,
        &["--config", "tests/fixtures/layout.yaml", "--centered", "p-walter"],
    );
    assert!(status.success());

    let layout = read_output(&output);
    assert_eq!(layout["centeredId"], "p-walter");
    let walter = layout["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["id"] == "p-walter")
        .unwrap();
    assert_eq!(walter["generation"], 0);
}

#[test]
fn fails_on_missing_input() {
    let dir = TempDir::new().unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_constellation"))
        .args([
            "layout",
            "--input",
            dir.path().join("absent.json").to_str().unwrap(),
            "--output",
            dir.path().join("layout.json").to_str().unwrap(),
        ])
        .status()
        .expect("Failed to execute constellation");

    assert!(!status.success());
}

#[test]
fn prints_default_config() {
    let output = Command::new(env!("CARGO_BIN_EXE_constellation"))
        .arg("config")
        .output()
        .expect("Failed to execute constellation");

    assert!(output.status.success());
    let yaml = String::from_utf8(output.stdout).unwrap();
    assert!(yaml.contains("generationSpacing: 50.0"));
    assert!(yaml.contains("treeThreshold: 100"));
}
