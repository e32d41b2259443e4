// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Both reference backends must behave the same through the traits

use ndarray::Array1;
use neurobridge_backend::*;
use neurobridge_populations::{CellType, Population};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn spec() -> ConnectivitySpec {
    ConnectivitySpec {
        model_name: "static_synapse".to_string(),
        equations: SynapseEquations {
            variables: vec![SynapseVariable {
                name: "weight".to_string(),
                unit: neurobridge_parameters::Unit::SIEMENS,
            }],
            on_pre: vec!["g_exc += weight".to_string()],
            on_post: Vec::new(),
        },
        defaults: BTreeMap::from([("weight".to_string(), 0.0)]),
    }
}

fn exercise<B: Backend>(mut backend: B) {
    let pre = Population::new("pre", 3, CellType::if_cond_exp());
    let post = Population::new("post", 8, CellType::if_cond_exp());
    let mut conn = backend.create_connectivity(&pre, &post, &spec()).unwrap();

    assert_eq!(conn.connect(&[0, 1, 2], 5).unwrap(), 0..3);
    assert_eq!(conn.connect(&[2], 7).unwrap(), 3..4);
    assert_eq!(conn.len(), 4);
    assert_eq!(conn.presynaptic_indices(), vec![0, 1, 2, 2]);
    assert_eq!(conn.postsynaptic_indices(), vec![5, 5, 5, 7]);

    conn.set_attribute("weight", &Array1::from(vec![1.0, 2.0, 3.0, 4.0]))
        .unwrap();
    conn.set_attribute_at("weight", 0, 9.0).unwrap();
    assert_eq!(conn.attribute_at("weight", 0).unwrap(), 9.0);
    assert_eq!(conn.get_attribute("weight").unwrap().to_vec(), vec![9.0, 2.0, 3.0, 4.0]);

    assert_eq!(conn.endpoints(3).unwrap(), (2, 7));
    assert!(conn.endpoints(4).is_err());
    assert!(conn.has_edge(2, 7));
    assert!(!conn.has_edge(0, 7));
    assert!(matches!(
        conn.get_attribute("nope"),
        Err(BackendError::UnknownAttribute(_))
    ));
    assert!(backend.time_step() > 0.0);
}

#[test]
fn test_synapse_matrix_backend_contract() {
    exercise(SynapseMatrixBackend::new(0.1));
}

#[test]
fn test_native_model_backend_contract() {
    exercise(NativeModelBackend::new(0.1));
}

proptest! {
    #[test]
    fn prop_edge_table_rows_are_contiguous(
        batches in proptest::collection::vec((proptest::collection::vec(0usize..3, 0..5), 0usize..8), 0..6)
    ) {
        let mut table = EdgeTable::new(["weight".to_string()], Default::default());
        let mut expected = 0;
        for (sources, target) in &batches {
            let rows = table.push_edges(sources, *target);
            prop_assert_eq!(rows, expected..expected + sources.len());
            expected += sources.len();
        }
        prop_assert_eq!(table.len(), expected);
        for (sources, target) in &batches {
            for &source in sources {
                prop_assert!(table.contains_pair(source, *target));
            }
        }
        prop_assert!(!table.contains_pair(3, 0));
        prop_assert_eq!(table.sources().len(), table.targets().len());
    }
}
