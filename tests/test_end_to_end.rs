// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Config file to projection, through the umbrella crate

use std::fs;

use neurobridge::config::{load_config, validate_config, BackendKind, MultapseSetting};
use neurobridge::prelude::*;
use neurobridge::{configured_backend, projection_options, synapse_matrix_backend};
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("neurobridge.toml");
    fs::write(&path, body).unwrap();
    path
}

fn pop(label: &str, size: usize) -> CellGroup {
    CellGroup::from(Population::new(label, size, CellType::if_curr_exp()))
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

#[test]
fn test_native_backend_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        [simulation]
        timestep = 0.05

        [backend]
        kind = "native-model"
        "#,
    );
    let config = load_config(Some(&path), None).unwrap();
    validate_config(&config).unwrap();
    assert_eq!(config.backend.kind, BackendKind::NativeModel);

    let mut backend = configured_backend(&config);
    assert_eq!(backend.name(), "native-model");
    let connector = FromListConnector::with_columns(
        &["weight", "delay"],
        vec![(0, 1, vec![0.5, 1.26]), (2, 0, vec![0.25, 0.3])],
    );
    let projection = Projection::new(
        &mut backend,
        pop("pre", 3),
        pop("post", 2),
        &connector,
        SynapseType::static_synapse(),
        "excitatory",
        projection_options(&config, Some("e2e".to_string())),
    )
    .unwrap();

    assert_eq!(projection.label(), "e2e");
    assert_eq!(projection.len(), 2);

    // pA in the backend
    let native = projection.connectivity(0, 0).unwrap();
    let weights = native.get_attribute("weight").unwrap();
    let mut sorted: Vec<f64> = weights.iter().copied().collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    assert!(close(sorted[0], 250.0));
    assert!(close(sorted[1], 500.0));

    let rows = projection
        .get_as_list(&[PRESYNAPTIC_INDEX, POSTSYNAPTIC_INDEX, "delay"])
        .unwrap();
    for row in rows {
        let expected = if row[0] == 0.0 { 1.25 } else { 0.3 };
        assert!(close(row[2], expected), "delay {} for pre {}", row[2], row[0]);
    }
}

#[test]
fn test_reject_multapses_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        [backend]
        kind = "synapse-matrix"

        [projection]
        multapses = "reject"
        "#,
    );
    let config = load_config(Some(&path), None).unwrap();
    assert_eq!(config.projection.multapses, MultapseSetting::Reject);

    let mut backend = synapse_matrix_backend(&config);
    let connector = FromListConnector::new(vec![(0, 0), (0, 0)]);
    let result = Projection::new(
        &mut backend,
        pop("pre", 1),
        pop("post", 1),
        &connector,
        SynapseType::static_synapse(),
        "excitatory",
        projection_options(&config, None),
    );
    assert!(matches!(
        result.err(),
        Some(ProjectionError::DuplicateConnection { pre: 0, post: 0 })
    ));
}

#[test]
fn test_cli_overrides_reach_the_backend() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[simulation]\ntimestep = 0.1\n");
    let cli = [("timestep".to_string(), "0.2".to_string())]
        .into_iter()
        .collect();
    let config = load_config(Some(&path), Some(&cli)).unwrap();
    assert_eq!(synapse_matrix_backend(&config).time_step(), 0.2);
}

#[test]
fn test_configured_delay_bounds_apply_to_connections() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        [simulation]
        timestep = 0.1
        min_delay = 0.5
        max_delay = 2.0

        [backend]
        kind = "synapse-matrix"
        "#,
    );
    let config = load_config(Some(&path), None).unwrap();
    validate_config(&config).unwrap();

    let mut backend = configured_backend(&config);
    assert_eq!(backend.name(), "synapse-matrix");
    let in_range = FromListConnector::with_columns(&["delay"], vec![(0, 0, vec![1.5])]);
    let projection = Projection::new(
        &mut backend,
        pop("pre", 2),
        pop("post", 2),
        &in_range,
        SynapseType::static_synapse(),
        "excitatory",
        projection_options(&config, None),
    )
    .unwrap();
    assert_eq!(projection.len(), 1);

    let too_short = FromListConnector::with_columns(&["delay"], vec![(1, 1, vec![0.2])]);
    let result = Projection::new(
        &mut backend,
        pop("pre", 2),
        pop("post", 2),
        &too_short,
        SynapseType::static_synapse(),
        "excitatory",
        projection_options(&config, None),
    );
    assert!(matches!(
        result.err(),
        Some(ProjectionError::DelayOutOfRange { .. })
    ));
}
