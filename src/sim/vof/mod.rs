//! Geometric Volume-of-Fluid (VOF) advection on unstructured meshes.
//!
//! Transports a per-cell volume fraction `alpha` of a reference fluid through
//! prescribed face fluxes. Interfaces are reconstructed as one plane per cell
//! and the fluid volume crossing each face is computed geometrically, which
//! keeps the interface sharp and the fraction bounded in `[0, 1]`.
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────── sub-cycle N times ────────────────┐
//! VolumeFractionField ─┼─► InterfaceReconstructor ──► compute_face_flux() ─┼─► AdvanceReport
//! FaceFluxField ───────┤      (plane per cell)          (volume per face)  │
//!   ▲                  │                         limit + accumulate ◄──────┘
//!   │                  └───────────────── AdvectionDriver::advance()
//! PrescribedFlowController (forward / reversed snapshot)
//! ```
//!
//! The mesh is read-only; cells are tagged by shape family and answer
//! half-space volume queries through [`CutVolume`].

pub mod advect;
pub mod config;
pub mod error;
pub mod field;
pub mod flux;
pub mod gradient;
pub mod init;
pub mod mesh;
pub mod mesh_3d;
pub mod prescribed;
pub mod reconstruct;
pub mod root;
pub mod shape;

pub use advect::{AdvanceReport, AdvectionDriver};
pub use config::VofConfig;
pub use error::{VofError, VofResult};
pub use field::{FaceFluxField, VolumeFractionField};
pub use flux::{Upwind, compute_face_flux};
pub use gradient::{GreenGaussGradient, LeastSquaresGradient, NormalEstimator};
pub use init::{
    cell_velocity_from_flux, flux_from_vector_potential, flux_from_velocity,
    fraction_from_level_set, velocity_from_vector_potential,
};
pub use mesh::{BOUNDARY, CellTopology, VofCell, VofFace, VofMesh};
pub use mesh_3d::{build_box_mesh, build_prism_box_mesh, build_tet_box_mesh};
pub use prescribed::{FlowFields, FlowPhase, FlowSnapshot, PrescribedFlowController};
pub use reconstruct::{CellReconstruction, InterfacePlane, InterfaceReconstructor, Reconstruction};
pub use shape::{CellShape, CutVolume};
