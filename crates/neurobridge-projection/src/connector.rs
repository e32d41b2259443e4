// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Connectors decide which cells are joined and hand the choice to
[`Projection::convergent_connect`], one postsynaptic cell at a time.
*/

use crate::error::{ProjectionError, ProjectionResult};
use crate::projection::Projection;
use ahash::AHashMap;
use neurobridge_backend::Backend;
use neurobridge_parameters::{ParameterSpace, ParameterValue};
use tracing::trace;

pub trait Connector {
    fn connect<B: Backend>(&self, projection: &mut Projection<B>) -> ProjectionResult<()>;
}

/// Explicit list of `(pre, post, values)` rows
///
/// Values follow `columns`; synapse parameters not named there take the
/// synapse type's value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FromListConnector {
    columns: Vec<String>,
    rows: Vec<(usize, usize, Vec<f64>)>,
}

impl FromListConnector {
    /// Pairs only; every parameter comes from the synapse type
    pub fn new(pairs: Vec<(usize, usize)>) -> Self {
        Self {
            columns: Vec::new(),
            rows: pairs.into_iter().map(|(i, j)| (i, j, Vec::new())).collect(),
        }
    }

    pub fn with_columns(columns: &[&str], rows: Vec<(usize, usize, Vec<f64>)>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows grouped by postsynaptic index, first appearance first
    fn grouped(&self) -> Vec<(usize, Vec<&(usize, usize, Vec<f64>)>)> {
        let mut groups: Vec<(usize, Vec<&(usize, usize, Vec<f64>)>)> = Vec::new();
        let mut slots: AHashMap<usize, usize> = AHashMap::new();
        for row in &self.rows {
            let slot = *slots.entry(row.1).or_insert_with(|| {
                groups.push((row.1, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(row);
        }
        groups
    }
}

impl Connector for FromListConnector {
    fn connect<B: Backend>(&self, projection: &mut Projection<B>) -> ProjectionResult<()> {
        for row in &self.rows {
            if row.2.len() != self.columns.len() {
                return Err(ProjectionError::ShapeMismatch {
                    name: format!("row ({}, {})", row.0, row.1),
                    expected: self.columns.len(),
                    actual: row.2.len(),
                });
            }
        }
        let groups = self.grouped();
        for (post, members) in &groups {
            let sources: Vec<usize> = members.iter().map(|r| r.0).collect();
            let mut parameters = ParameterSpace::new();
            for (name, value) in projection.synapse_type().parameter_space().iter() {
                match self.columns.iter().position(|c| c == name) {
                    Some(k) => {
                        let column: Vec<f64> = members.iter().map(|r| r.2[k]).collect();
                        parameters.insert(name, ParameterValue::from(column));
                    }
                    None => parameters.insert(name, value.clone()),
                }
            }
            for (k, name) in self.columns.iter().enumerate() {
                if !parameters.contains(name) {
                    let column: Vec<f64> = members.iter().map(|r| r.2[k]).collect();
                    parameters.insert(name.as_str(), ParameterValue::from(column));
                }
            }
            projection.convergent_connect(&sources, *post, parameters)?;
        }
        trace!(
            target: "neurobridge-projection",
            "[CONNECTOR] {} listed connections onto {} cells",
            self.rows.len(),
            groups.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping_keeps_first_appearance_order() {
        let connector = FromListConnector::new(vec![(0, 7), (1, 2), (2, 7), (3, 0), (4, 2)]);
        let groups: Vec<(usize, Vec<usize>)> = connector
            .grouped()
            .into_iter()
            .map(|(post, rows)| (post, rows.iter().map(|r| r.0).collect()))
            .collect();
        assert_eq!(groups, vec![(7, vec![0, 2]), (2, vec![1, 4]), (0, vec![3])]);
    }

    #[test]
    fn test_grouping_large_list() {
        let pairs: Vec<(usize, usize)> = (0..10_000).map(|i| (i, i % 100)).collect();
        let connector = FromListConnector::new(pairs);
        let groups = connector.grouped();
        assert_eq!(groups.len(), 100);
        assert!(groups.iter().enumerate().all(|(k, (post, rows))| *post == k && rows.len() == 100));
    }
}
