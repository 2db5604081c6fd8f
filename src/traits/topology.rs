//! Element topology
use crate::types::ReferenceCellType;

/// The topology that a mapping reads its elements from
///
/// This provides the ordered, read-only list of elements. Vertex indices refer to blocks of
/// the parent DOF space and must be valid indices into it.
pub trait Topology {
    /// The cell types included in the topology
    fn cell_types(&self) -> &[ReferenceCellType];

    /// The number of entities of type `etype`
    fn entity_count(&self, etype: ReferenceCellType) -> usize;

    /// The vertex indices of all triangles
    fn triangles(&self) -> &[[usize; 3]];
}
