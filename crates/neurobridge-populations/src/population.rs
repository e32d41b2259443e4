// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Populations, Views and Assemblies
//!
//! Logical index spaces and their mapping onto physical storage.
//!
//! A [`CellGroup`] is either a base [`Population`] (a *leaf*), a
//! [`PopulationView`] selecting indices of another group, or an [`Assembly`]
//! concatenating several groups. Views and assemblies nest freely.
//!
//! ```text
//! Assembly [ P0 (size 3) | View(P1, [4, 0]) ]
//!
//! logical   0  1  2  3  4
//! leaf      0  0  0  1  1
//! base      0  1  2  4  0
//! ```
//!
//! Every logical index resolves to `(leaf ordinal, base index)`. Leaf
//! ordinals count leaves left to right, so an assembly listing the same
//! population twice has two distinct leaves.

use crate::cell_types::CellType;
use crate::error::{PartitionError, PartitionResult};
use neurobridge_parameters::{ParameterError, ParameterSpace, ParameterValue};
use std::sync::Arc;
use tracing::trace;

/// A named, ordered group of cells of one type
#[derive(Debug, Clone)]
pub struct Population {
    label: String,
    size: usize,
    cell_type: CellType,
    parameters: ParameterSpace,
}

impl Population {
    pub fn new(label: impl Into<String>, size: usize, cell_type: CellType) -> Self {
        let mut parameters = cell_type.default_parameters().clone();
        parameters.set_shape(size);
        Self {
            label: label.into(),
            size,
            cell_type,
            parameters,
        }
    }

    /// Override cell parameters; arrays must hold one value per cell
    pub fn with_parameter(mut self, name: &str, value: ParameterValue) -> Self {
        self.parameters.insert(name, value);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell_type(&self) -> &CellType {
        &self.cell_type
    }

    pub fn parameters(&self) -> &ParameterSpace {
        &self.parameters
    }

    /// Value of a cell parameter for the cell at `index`
    pub fn parameter_at(&self, name: &str, index: usize) -> PartitionResult<f64> {
        if index >= self.size {
            return Err(PartitionError::IndexOutOfBounds {
                index,
                size: self.size,
                group: self.label.clone(),
            });
        }
        let value = self
            .parameters
            .get(name)
            .ok_or_else(|| ParameterError::UnknownParameter(name.to_string()))?
            .evaluate(Some(self.size), name)?;
        value
            .at(index)
            .ok_or_else(|| PartitionError::IndexOutOfBounds {
                index,
                size: self.size,
                group: self.label.clone(),
            })
    }
}

/// Indices of one group, renumbered from zero
#[derive(Debug, Clone)]
pub struct PopulationView {
    parent: Box<CellGroup>,
    mask: Vec<usize>,
}

impl PopulationView {
    pub fn parent(&self) -> &CellGroup {
        &self.parent
    }

    /// View index → parent index
    pub fn mask(&self) -> &[usize] {
        &self.mask
    }
}

/// Concatenation of groups into one index space
#[derive(Debug, Clone)]
pub struct Assembly {
    label: String,
    members: Vec<CellGroup>,
    /// Cumulative sizes, `boundaries[0] == 0`, one more entry than members
    boundaries: Vec<usize>,
    /// Ordinal of each member's first leaf
    leaf_offsets: Vec<usize>,
}

impl Assembly {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn members(&self) -> &[CellGroup] {
        &self.members
    }

    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    fn member_containing(&self, index: usize) -> usize {
        self.boundaries.partition_point(|&b| b <= index) - 1
    }
}

/// Any addressable group of cells
#[derive(Debug, Clone)]
pub enum CellGroup {
    Population(Arc<Population>),
    View(PopulationView),
    Assembly(Assembly),
}

/// Indices of one leaf, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Base-population indices
    pub local: Vec<usize>,
    /// Position of each index in the partitioned input
    pub positions: Vec<usize>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }
}

impl From<Population> for CellGroup {
    fn from(population: Population) -> Self {
        CellGroup::Population(Arc::new(population))
    }
}

impl From<Arc<Population>> for CellGroup {
    fn from(population: Arc<Population>) -> Self {
        CellGroup::Population(population)
    }
}

impl CellGroup {
    /// Select `mask` (parent indices) from `parent`
    pub fn view(parent: impl Into<CellGroup>, mask: Vec<usize>) -> PartitionResult<Self> {
        let parent = parent.into();
        let parent_size = parent.size();
        if let Some(&index) = mask.iter().find(|&&i| i >= parent_size) {
            return Err(PartitionError::InvalidView { index, parent_size });
        }
        Ok(CellGroup::View(PopulationView {
            parent: Box::new(parent),
            mask,
        }))
    }

    pub fn assembly(label: impl Into<String>, members: Vec<CellGroup>) -> PartitionResult<Self> {
        if members.is_empty() {
            return Err(PartitionError::EmptyAssembly);
        }
        let mut boundaries = Vec::with_capacity(members.len() + 1);
        let mut leaf_offsets = Vec::with_capacity(members.len());
        boundaries.push(0);
        let (mut cells, mut leaves) = (0, 0);
        for member in &members {
            leaf_offsets.push(leaves);
            cells += member.size();
            leaves += member.leaf_count();
            boundaries.push(cells);
        }
        Ok(CellGroup::Assembly(Assembly {
            label: label.into(),
            members,
            boundaries,
            leaf_offsets,
        }))
    }

    pub fn size(&self) -> usize {
        match self {
            CellGroup::Population(p) => p.size(),
            CellGroup::View(v) => v.mask.len(),
            CellGroup::Assembly(a) => a.boundaries.last().copied().unwrap_or(0),
        }
    }

    pub fn label(&self) -> String {
        match self {
            CellGroup::Population(p) => p.label().to_string(),
            CellGroup::View(v) => format!("view of {}", v.parent.label()),
            CellGroup::Assembly(a) => a.label.clone(),
        }
    }

    pub fn is_assembly(&self) -> bool {
        matches!(self, CellGroup::Assembly(_))
    }

    /// Number of physical leaves reached through this group
    pub fn leaf_count(&self) -> usize {
        match self {
            CellGroup::Population(_) => 1,
            CellGroup::View(v) => v.parent.leaf_count(),
            CellGroup::Assembly(a) => a.members.iter().map(CellGroup::leaf_count).sum(),
        }
    }

    /// Physical leaves, ordered by ordinal
    pub fn sub_populations(&self) -> Vec<Arc<Population>> {
        let mut leaves = Vec::with_capacity(self.leaf_count());
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves(&self, leaves: &mut Vec<Arc<Population>>) {
        match self {
            CellGroup::Population(p) => leaves.push(Arc::clone(p)),
            CellGroup::View(v) => v.parent.collect_leaves(leaves),
            CellGroup::Assembly(a) => a.members.iter().for_each(|m| m.collect_leaves(leaves)),
        }
    }

    /// Logical index → `(leaf ordinal, base-population index)`
    pub fn resolve(&self, index: usize) -> PartitionResult<(usize, usize)> {
        if index >= self.size() {
            return Err(PartitionError::IndexOutOfBounds {
                index,
                size: self.size(),
                group: self.label(),
            });
        }
        match self {
            CellGroup::Population(_) => Ok((0, index)),
            CellGroup::View(v) => v.parent.resolve(v.mask[index]),
            CellGroup::Assembly(a) => {
                let member = a.member_containing(index);
                let (ordinal, base) = a.members[member].resolve(index - a.boundaries[member])?;
                Ok((a.leaf_offsets[member] + ordinal, base))
            }
        }
    }

    /// Where a single postsynaptic index lives
    pub fn localize(&self, index: usize) -> PartitionResult<(usize, usize)> {
        self.resolve(index)
    }

    /// Split logical indices into one [`Partition`] per leaf
    ///
    /// Input order is kept within each partition. Leaves that receive no
    /// index get an empty partition.
    ///
    /// # Example
    /// ```
    /// use neurobridge_populations::{CellGroup, CellType, Population};
    ///
    /// let a = CellGroup::from(Population::new("a", 3, CellType::if_curr_exp()));
    /// let b = CellGroup::from(Population::new("b", 2, CellType::if_curr_exp()));
    /// let both = CellGroup::assembly("ab", vec![a, b]).unwrap();
    ///
    /// let parts = both.partition(&[4, 0, 3]).unwrap();
    /// assert_eq!(parts[0].local, vec![0]);
    /// assert_eq!(parts[1].local, vec![1, 0]);
    /// assert_eq!(parts[1].positions, vec![0, 2]);
    /// ```
    pub fn partition(&self, indices: &[usize]) -> PartitionResult<Vec<Partition>> {
        let mut partitions = vec![Partition::default(); self.leaf_count()];
        for (position, &index) in indices.iter().enumerate() {
            let (ordinal, base) = self.resolve(index)?;
            partitions[ordinal].local.push(base);
            partitions[ordinal].positions.push(position);
        }
        trace!(
            target: "neurobridge-populations",
            "partitioned {} indices over {} leaves",
            indices.len(),
            partitions.len()
        );
        Ok(partitions)
    }

    /// Inverse of [`resolve`](Self::resolve); `None` if no logical index maps there
    pub fn logical_index(&self, ordinal: usize, base_index: usize) -> Option<usize> {
        match self {
            CellGroup::Population(p) => (ordinal == 0 && base_index < p.size()).then_some(base_index),
            CellGroup::View(v) => {
                let parent_index = v.parent.logical_index(ordinal, base_index)?;
                v.mask.iter().position(|&m| m == parent_index)
            }
            CellGroup::Assembly(a) => {
                let member = a.leaf_offsets.partition_point(|&o| o <= ordinal).checked_sub(1)?;
                let local = a.members[member]
                    .logical_index(ordinal - a.leaf_offsets[member], base_index)?;
                Some(a.boundaries[member] + local)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pop(label: &str, size: usize) -> CellGroup {
        CellGroup::from(Population::new(label, size, CellType::if_curr_exp()))
    }

    #[test]
    fn test_population_resolves_to_itself() {
        let p = pop("p", 5);
        assert_eq!(p.resolve(3).unwrap(), (0, 3));
        assert_eq!(p.leaf_count(), 1);
    }

    #[test]
    fn test_out_of_bounds_is_an_error() {
        let p = pop("p", 5);
        assert!(matches!(
            p.resolve(5),
            Err(PartitionError::IndexOutOfBounds { index: 5, size: 5, .. })
        ));
        assert!(p.partition(&[0, 7]).is_err());
    }

    #[test]
    fn test_view_maps_to_parent() {
        let view = CellGroup::view(pop("p", 10), vec![9, 2, 5]).unwrap();
        assert_eq!(view.size(), 3);
        assert_eq!(view.resolve(0).unwrap(), (0, 9));
        let parts = view.partition(&[2, 1]).unwrap();
        assert_eq!(parts[0].local, vec![5, 2]);
        assert_eq!(view.logical_index(0, 5), Some(2));
        assert_eq!(view.logical_index(0, 3), None);
    }

    #[test]
    fn test_invalid_view() {
        assert_eq!(
            CellGroup::view(pop("p", 3), vec![0, 3]).unwrap_err(),
            PartitionError::InvalidView {
                index: 3,
                parent_size: 3
            }
        );
    }

    #[test]
    fn test_assembly_with_view_member() {
        let view = CellGroup::view(pop("q", 6), vec![4, 0]).unwrap();
        let asm = CellGroup::assembly("asm", vec![pop("p", 3), view]).unwrap();
        assert_eq!(asm.size(), 5);
        assert_eq!(asm.resolve(3).unwrap(), (1, 4));
        assert_eq!(asm.resolve(4).unwrap(), (1, 0));
        assert_eq!(asm.logical_index(1, 0), Some(4));

        let parts = asm.partition(&[3, 1, 4]).unwrap();
        assert_eq!(parts[0].local, vec![1]);
        assert_eq!(parts[0].positions, vec![1]);
        assert_eq!(parts[1].local, vec![4, 0]);
        assert_eq!(parts[1].positions, vec![0, 2]);
    }

    #[test]
    fn test_nested_assemblies() {
        let inner = CellGroup::assembly("inner", vec![pop("a", 2), pop("b", 2)]).unwrap();
        let outer = CellGroup::assembly("outer", vec![pop("c", 1), inner]).unwrap();
        assert_eq!(outer.leaf_count(), 3);
        assert_eq!(outer.resolve(4).unwrap(), (2, 1));
        let labels: Vec<_> = outer.sub_populations().iter().map(|p| p.label().to_string()).collect();
        assert_eq!(labels, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_empty_partitions_are_kept() {
        let asm = CellGroup::assembly("asm", vec![pop("a", 2), pop("b", 2)]).unwrap();
        let parts = asm.partition(&[0, 1]).unwrap();
        assert_eq!(parts.len(), 2);
        assert!(parts[1].is_empty());
    }

    #[test]
    fn test_empty_assembly() {
        assert_eq!(
            CellGroup::assembly("none", Vec::new()).unwrap_err(),
            PartitionError::EmptyAssembly
        );
    }

    #[test]
    fn test_parameter_at() {
        let p = Population::new("p", 3, CellType::if_curr_exp())
            .with_parameter("tau_syn_E", ParameterValue::from(vec![1.0, 2.0, 3.0]));
        assert_eq!(p.parameter_at("tau_syn_E", 1).unwrap(), 2.0);
        assert_eq!(p.parameter_at("tau_m", 2).unwrap(), 20.0);
        assert!(p.parameter_at("tau_m", 3).is_err());
        assert!(p.parameter_at("nope", 0).is_err());
    }
}
