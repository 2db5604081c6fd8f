//! Projective constraints
pub mod indices;
pub mod line;

pub use indices::ConstraintIndices;
pub use line::{LineConstraintParams, LineProjectiveConstraint};
