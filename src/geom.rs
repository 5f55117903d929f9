pub mod plane;
pub mod point;
pub mod polyhedron;
pub mod tetrahedron;
pub mod vector;

/// Geometric precision
pub const EPS: f64 = 1e-13;
