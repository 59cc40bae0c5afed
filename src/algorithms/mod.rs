//! The georeferencing algorithms
pub mod gcp;
pub mod geodesy;
pub mod normalize;
pub mod transform;
