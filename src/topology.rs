//! Element topologies

mod mixed;
mod triangle;

pub use mixed::{MixedTopology, MixedTopologyBuilder};
pub use triangle::{TriangleTopology, TriangleTopologyBuilder};
