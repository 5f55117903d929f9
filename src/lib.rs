pub mod geom;
pub mod sim;

// Prelude
pub use geom::plane::Plane;
pub use geom::point::Point;
pub use geom::polyhedron::Polyhedron;
pub use geom::vector::Vector;
pub use sim::vof::{
    AdvanceReport, AdvectionDriver, FaceFluxField, PrescribedFlowController, VofConfig, VofError,
    VofMesh, VolumeFractionField,
};
