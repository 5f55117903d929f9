use thiserror::Error;

/// Fatal errors of the VOF core.
///
/// Recoverable numerical irregularities (reconstruction non-convergence,
/// clamped stability-bound violations) are counted in
/// [`crate::sim::vof::AdvanceReport`] instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VofError {
    /// Input volume fraction outside [0, 1] or not finite.
    #[error("Volume fraction {value} in cell {cell} is outside [0, 1]")]
    InvalidFraction { cell: usize, value: f64 },

    #[error("Face flux {value} at face {face} is not finite")]
    InvalidFlux { face: usize, value: f64 },

    /// Cell with zero or negative volume.
    #[error("Cell {cell} has non-positive volume {volume:e}")]
    DegenerateGeometry { cell: usize, volume: f64 },

    /// Mesh topology cannot be used (bad vertex index, non-manifold face, ...).
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// A per-cell or per-face field does not match the mesh.
    #[error("{field} has {found} entries, mesh expects {expected}")]
    FieldSizeMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Too many cells needed clamping within one outer step.
    #[error(
        "{violations} of {cells} cells violated the stability bound; the flux field is likely not divergence-free"
    )]
    DataQuality { violations: usize, cells: usize },
}

pub type VofResult<T> = Result<T, VofError>;
