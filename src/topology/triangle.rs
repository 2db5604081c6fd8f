//! Triangle topology
use crate::traits::Topology;
use crate::types::ReferenceCellType;
use std::collections::HashMap;

/// A topology made only of triangles
#[derive(Debug, Clone)]
pub struct TriangleTopology {
    triangles: Vec<[usize; 3]>,
    cell_types: Vec<ReferenceCellType>,
    cell_indices_to_ids: Vec<usize>,
    cell_ids_to_indices: HashMap<usize, usize>,
}

impl TriangleTopology {
    /// Create a triangle topology
    ///
    /// The cells are numbered by their position in `triangles`.
    pub fn new(triangles: Vec<[usize; 3]>) -> Self {
        let ids = (0..triangles.len()).collect::<Vec<_>>();
        Self::new_with_ids(triangles, ids)
    }

    fn new_with_ids(triangles: Vec<[usize; 3]>, cell_ids: Vec<usize>) -> Self {
        let cell_ids_to_indices = cell_ids
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect();
        let cell_types = if triangles.is_empty() {
            vec![]
        } else {
            vec![ReferenceCellType::Triangle]
        };
        Self {
            triangles,
            cell_types,
            cell_indices_to_ids: cell_ids,
            cell_ids_to_indices,
        }
    }

    /// Replace the triangles
    ///
    /// The cells are renumbered by their position in `triangles`.
    pub fn set_triangles(&mut self, triangles: Vec<[usize; 3]>) {
        *self = Self::new(triangles);
    }

    /// The number of vertices referenced by the triangles
    pub fn vertex_count(&self) -> usize {
        self.triangles
            .iter()
            .flat_map(|t| t.iter())
            .max()
            .map_or(0, |m| m + 1)
    }

    /// Get the id of a cell from its index
    pub fn cell_index_to_id(&self, index: usize) -> Option<usize> {
        self.cell_indices_to_ids.get(index).copied()
    }

    /// Get the index of a cell from its id
    pub fn cell_id_to_index(&self, id: usize) -> Option<usize> {
        self.cell_ids_to_indices.get(&id).copied()
    }
}

impl Topology for TriangleTopology {
    fn cell_types(&self) -> &[ReferenceCellType] {
        &self.cell_types
    }
    fn entity_count(&self, etype: ReferenceCellType) -> usize {
        match etype {
            ReferenceCellType::Triangle => self.triangles.len(),
            _ => 0,
        }
    }
    fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }
}

/// Builder for a triangle topology
#[derive(Debug, Default)]
pub struct TriangleTopologyBuilder {
    cells: Vec<[usize; 3]>,
    cell_indices_to_ids: Vec<usize>,
}

impl TriangleTopologyBuilder {
    /// Create a builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with space for `ncells` cells
    pub fn new_with_capacity(ncells: usize) -> Self {
        Self {
            cells: Vec::with_capacity(ncells),
            cell_indices_to_ids: Vec::with_capacity(ncells),
        }
    }

    /// Add a cell with the given id
    pub fn add_cell(&mut self, id: usize, cell_data: [usize; 3]) {
        self.cell_indices_to_ids.push(id);
        self.cells.push(cell_data);
    }

    /// Create the topology
    pub fn create_topology(self) -> TriangleTopology {
        TriangleTopology::new_with_ids(self.cells, self.cell_indices_to_ids)
    }
}
