//! Topology with cells of several types
use crate::traits::Topology;
use crate::types::{Error, ReferenceCellType, Result};
use itertools::Itertools;
use std::collections::HashMap;

/// A topology whose cells may be of different types
///
/// Only the triangles are exposed as elements; mappings that support triangles only use
/// [Topology::cell_types] to reject the other cells.
#[derive(Debug, Clone)]
pub struct MixedTopology {
    cells: Vec<usize>,
    cell_offsets: Vec<usize>,
    cell_types: Vec<ReferenceCellType>,
    entity_types: Vec<ReferenceCellType>,
    entity_counts: HashMap<ReferenceCellType, usize>,
    triangles: Vec<[usize; 3]>,
    cell_indices_to_ids: Vec<usize>,
}

impl MixedTopology {
    /// The number of cells
    pub fn cell_count(&self) -> usize {
        self.cell_types.len()
    }

    /// The vertex indices of a cell
    pub fn cell(&self, index: usize) -> Option<&[usize]> {
        if index < self.cell_count() {
            Some(&self.cells[self.cell_offsets[index]..self.cell_offsets[index + 1]])
        } else {
            None
        }
    }

    /// The type of a cell
    pub fn cell_type(&self, index: usize) -> Option<ReferenceCellType> {
        self.cell_types.get(index).copied()
    }

    /// Get the id of a cell from its index
    pub fn cell_index_to_id(&self, index: usize) -> Option<usize> {
        self.cell_indices_to_ids.get(index).copied()
    }
}

impl Topology for MixedTopology {
    fn cell_types(&self) -> &[ReferenceCellType] {
        &self.entity_types
    }
    fn entity_count(&self, etype: ReferenceCellType) -> usize {
        self.entity_counts.get(&etype).copied().unwrap_or(0)
    }
    fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }
}

/// Builder for a mixed topology
#[derive(Debug)]
pub struct MixedTopologyBuilder {
    cells: Vec<usize>,
    cell_offsets: Vec<usize>,
    cell_types: Vec<ReferenceCellType>,
    cell_indices_to_ids: Vec<usize>,
}

impl Default for MixedTopologyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MixedTopologyBuilder {
    /// Create a builder
    pub fn new() -> Self {
        Self {
            cells: vec![],
            cell_offsets: vec![0],
            cell_types: vec![],
            cell_indices_to_ids: vec![],
        }
    }

    /// Add a cell with the given id
    pub fn add_cell(
        &mut self,
        id: usize,
        cell_data: (Vec<usize>, ReferenceCellType),
    ) -> Result<()> {
        let (vertices, cell_type) = cell_data;
        if vertices.len() != cell_type.vertex_count() {
            return Err(Error::DimensionMismatch {
                expected: cell_type.vertex_count(),
                found: vertices.len(),
            });
        }
        self.cells.extend(vertices);
        self.cell_offsets.push(self.cells.len());
        self.cell_types.push(cell_type);
        self.cell_indices_to_ids.push(id);
        Ok(())
    }

    /// Create the topology
    pub fn create_topology(self) -> MixedTopology {
        let mut entity_counts = HashMap::new();
        for cell_type in &self.cell_types {
            *entity_counts.entry(*cell_type).or_insert(0) += 1;
        }
        let entity_types = self
            .cell_types
            .iter()
            .copied()
            .unique()
            .collect::<Vec<_>>();
        let triangles = self
            .cell_types
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == ReferenceCellType::Triangle)
            .map(|(i, _)| {
                let start = self.cell_offsets[i];
                [
                    self.cells[start],
                    self.cells[start + 1],
                    self.cells[start + 2],
                ]
            })
            .collect();
        MixedTopology {
            cells: self.cells,
            cell_offsets: self.cell_offsets,
            cell_types: self.cell_types,
            entity_types,
            entity_counts,
            triangles,
            cell_indices_to_ids: self.cell_indices_to_ids,
        }
    }
}
