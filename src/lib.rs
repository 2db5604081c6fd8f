//! Projmap
//!
//! Differentiable mappings between DOF spaces and projective constraints, with the block
//! sparse matrices they use to propagate velocities, forces and constraint rows.
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

pub mod constraint;
pub mod linalg;
pub mod mapping;
pub mod shapes;
pub mod sparse;
pub mod topology;
pub mod traits;
pub mod types;
