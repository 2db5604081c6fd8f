//! Mappings
pub mod area;
pub mod geometric_stiffness;

pub use area::{triangle_area_gradient, triangle_area_hessian, AreaMapping};
pub use geometric_stiffness::{ElementStiffness, GeometricStiffness, GeometricStiffnessMode};
