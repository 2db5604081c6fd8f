//! Trait definitions

mod accumulator;
mod constraint;
mod mapping;
mod topology;

pub use accumulator::StiffnessAccumulator;
pub use constraint::ProjectiveConstraint;
pub use mapping::{GeometricStiffnessMapping, Mapping};
pub use topology::Topology;
