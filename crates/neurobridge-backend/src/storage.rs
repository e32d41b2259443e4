// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Column-oriented edge storage shared by the reference backends.

Edges are rows; every attribute is a column of `f64` with one entry per row.
Rows are only ever appended.
*/

use crate::error::{BackendError, BackendResult};
use ahash::{AHashMap, AHashSet};
use ndarray::Array1;
use std::ops::Range;

#[derive(Debug, Clone, Default)]
pub struct EdgeTable {
    sources: Vec<usize>,
    targets: Vec<usize>,
    /// Column names in declaration order
    names: Vec<String>,
    columns: AHashMap<String, Vec<f64>>,
    defaults: AHashMap<String, f64>,
    /// Every (source, target) pair with at least one edge
    pairs: AHashSet<(usize, usize)>,
}

impl EdgeTable {
    /// Table with the given columns; columns without a default start at 0
    pub fn new<I>(columns: I, defaults: AHashMap<String, f64>) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut table = Self {
            defaults,
            ..Self::default()
        };
        for name in columns {
            if !table.columns.contains_key(&name) {
                table.columns.insert(name.clone(), Vec::new());
                table.names.push(name);
            }
        }
        table
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn push_edges(&mut self, sources: &[usize], target: usize) -> Range<usize> {
        let start = self.len();
        self.sources.extend_from_slice(sources);
        self.targets.extend(std::iter::repeat(target).take(sources.len()));
        self.pairs.extend(sources.iter().map(|&source| (source, target)));
        for (name, column) in self.columns.iter_mut() {
            let default = self.defaults.get(name).copied().unwrap_or(0.0);
            column.resize(start + sources.len(), default);
        }
        start..self.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    fn column(&self, name: &str) -> BackendResult<&Vec<f64>> {
        self.columns
            .get(name)
            .ok_or_else(|| BackendError::UnknownAttribute(name.to_string()))
    }

    fn column_mut(&mut self, name: &str) -> BackendResult<&mut Vec<f64>> {
        self.columns
            .get_mut(name)
            .ok_or_else(|| BackendError::UnknownAttribute(name.to_string()))
    }

    pub fn get(&self, name: &str) -> BackendResult<Array1<f64>> {
        Ok(Array1::from(self.column(name)?.clone()))
    }

    pub fn set(&mut self, name: &str, values: &Array1<f64>) -> BackendResult<()> {
        let len = self.len();
        let column = self.column_mut(name)?;
        if values.len() != len {
            return Err(BackendError::LengthMismatch {
                name: name.to_string(),
                expected: len,
                actual: values.len(),
            });
        }
        column.clear();
        column.extend(values.iter().copied());
        Ok(())
    }

    pub fn get_at(&self, name: &str, edge: usize) -> BackendResult<f64> {
        let len = self.len();
        self.column(name)?
            .get(edge)
            .copied()
            .ok_or(BackendError::EdgeOutOfRange { edge, len })
    }

    pub fn set_at(&mut self, name: &str, edge: usize, value: f64) -> BackendResult<()> {
        let len = self.len();
        let slot = self
            .column_mut(name)?
            .get_mut(edge)
            .ok_or(BackendError::EdgeOutOfRange { edge, len })?;
        *slot = value;
        Ok(())
    }

    pub fn endpoints(&self, edge: usize) -> BackendResult<(usize, usize)> {
        match (self.sources.get(edge), self.targets.get(edge)) {
            (Some(&s), Some(&t)) => Ok((s, t)),
            _ => Err(BackendError::EdgeOutOfRange {
                edge,
                len: self.len(),
            }),
        }
    }

    pub fn contains_pair(&self, source: usize, target: usize) -> bool {
        self.pairs.contains(&(source, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> EdgeTable {
        let defaults = AHashMap::from_iter([("weight".to_string(), 0.5)]);
        EdgeTable::new(["weight".to_string(), "delay".to_string()], defaults)
    }

    #[test]
    fn test_push_fills_defaults() {
        let mut t = table();
        assert_eq!(t.push_edges(&[0, 1, 2], 5), 0..3);
        assert_eq!(t.push_edges(&[0], 5), 3..4);
        assert_eq!(t.get("weight").unwrap().to_vec(), vec![0.5; 4]);
        assert_eq!(t.get("delay").unwrap().to_vec(), vec![0.0; 4]);
        assert!(t.contains_pair(0, 5));
        assert!(!t.contains_pair(5, 0));
    }

    #[test]
    fn test_pair_lookup_tracks_every_push() {
        let mut t = table();
        for target in 0..200 {
            t.push_edges(&[target, target + 1], target);
        }
        assert!(t.contains_pair(199, 199));
        assert!(t.contains_pair(200, 199));
        assert!(!t.contains_pair(199, 200));
        assert_eq!(t.len(), 400);
    }

    #[test]
    fn test_set_checks_length_and_name() {
        let mut t = table();
        t.push_edges(&[0, 1], 0);
        assert!(matches!(
            t.set("weight", &Array1::from(vec![1.0])),
            Err(BackendError::LengthMismatch { expected: 2, actual: 1, .. })
        ));
        assert_eq!(
            t.get("tau"),
            Err(BackendError::UnknownAttribute("tau".to_string()))
        );
        assert_eq!(
            t.set_at("weight", 2, 1.0),
            Err(BackendError::EdgeOutOfRange { edge: 2, len: 2 })
        );
    }
}
