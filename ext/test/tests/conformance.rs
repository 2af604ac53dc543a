//! Conformance tests that run YAML fixtures against waypoint
//!
//! Run with: cargo test -p waypoint-test --test conformance --features waypoint-test/fixtures
//!
//! Note: This test file requires the `fixtures` feature to be enabled.

#![cfg(feature = "fixtures")]

use std::fs;
use std::path::{Path, PathBuf};
use waypoint_test::fixture::Fixture;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Load and run every fixture document in one file
fn run_fixture_file(name: &str) {
    let path = fixtures_dir().join(name);
    let yaml = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));

    // Parse potentially multiple fixtures (separated by ---)
    let fixtures = Fixture::from_yaml_multi(&yaml).unwrap_or_else(|e| {
        panic!("Failed to parse {}: {}", path.display(), e);
    });
    assert!(!fixtures.is_empty(), "{} holds no fixtures", path.display());

    for fixture in fixtures {
        println!("  Running: {}", fixture.name);
        fixture.run_and_assert();
    }
}

#[test]
fn test_operators() {
    run_fixture_file("01_operators.yaml");
}

#[test]
fn test_strategies() {
    run_fixture_file("02_strategies.yaml");
}

#[test]
fn test_invalidation() {
    run_fixture_file("03_invalidation.yaml");
}

#[test]
fn test_routing() {
    run_fixture_file("04_routing.yaml");
}

#[test]
fn test_every_fixture_file_is_covered() {
    let mut files: Vec<_> = fs::read_dir(fixtures_dir())
        .expect("read fixtures dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".yaml") || n.ends_with(".yml"))
        .collect();
    files.sort();
    assert_eq!(
        files,
        [
            "01_operators.yaml",
            "02_strategies.yaml",
            "03_invalidation.yaml",
            "04_routing.yaml"
        ]
    );
}
