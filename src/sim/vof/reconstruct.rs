//! Piecewise-linear interface reconstruction.
//!
//! For every interface cell a plane with normal `-grad(alpha)` is placed so
//! that the cell volume on its fluid side matches `alpha * V`. Fully empty or
//! full cells are marked and never searched.

use rayon::prelude::*;

use crate::geom::plane::Plane;
use crate::sim::vof::gradient::{LeastSquaresGradient, NormalEstimator};
use crate::sim::vof::mesh::{VofCell, VofMesh};
use crate::sim::vof::root::illinois;
use crate::sim::vof::shape::CutVolume;
use crate::{Point, Vector};

/// Normal used when the field is flat and no earlier normal exists.
pub const FALLBACK_NORMAL: Vector = Vector {
    dx: 0.0,
    dy: 0.0,
    dz: 1.0,
};

/// Gradients shorter than this (times the cell size) count as flat.
const FLAT_GRADIENT: f64 = 1e-12;

/// Planar interface in one cell.
///
/// The fluid occupies `{x : normal . (x - centroid) <= offset}`, so `normal`
/// points out of the fluid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterfacePlane {
    pub normal: Vector,
    pub offset: f64,
}

impl InterfacePlane {
    /// The plane in absolute coordinates for a cell with the given centroid.
    pub fn to_plane(&self, centroid: Point) -> Plane {
        Plane {
            origin: centroid + self.normal * self.offset,
            normal: self.normal,
        }
    }
}

/// Interface state of a cell for one sub-step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reconstruction {
    /// No fluid (`alpha <= 0`).
    Empty,
    /// Only fluid (`alpha >= 1`).
    Full,
    Plane(InterfacePlane),
}

impl Reconstruction {
    pub fn is_degenerate(&self) -> bool {
        !matches!(self, Self::Plane(_))
    }

    pub fn plane(&self) -> Option<&InterfacePlane> {
        match self {
            Self::Plane(p) => Some(p),
            _ => None,
        }
    }
}

/// Reconstruction of one cell plus root-search bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellReconstruction {
    pub reconstruction: Reconstruction,
    pub iterations: usize,
    /// `false` when the search ran out of iterations; the plane is then the
    /// best bracket end found.
    pub converged: bool,
}

impl CellReconstruction {
    fn degenerate(reconstruction: Reconstruction) -> Self {
        Self {
            reconstruction,
            iterations: 0,
            converged: true,
        }
    }
}

/// Places the interface plane with a given unit `normal` in `cell`.
///
/// `tolerance` applies to `|V_below / V - fraction|`.
pub fn fit_plane(
    cell: &VofCell,
    fraction: f64,
    normal: Vector,
    tolerance: f64,
    max_iterations: usize,
) -> CellReconstruction {
    if fraction <= 0.0 {
        return CellReconstruction::degenerate(Reconstruction::Empty);
    }
    if fraction >= 1.0 {
        return CellReconstruction::degenerate(Reconstruction::Full);
    }

    let (lo, hi) = cell.shape.extent_along(cell.centroid, normal);
    let residual = |offset: f64| {
        let plane = InterfacePlane { normal, offset }.to_plane(cell.centroid);
        cell.shape.volume_below(&plane) / cell.volume - fraction
    };
    let search = illinois(
        residual,
        (lo, -fraction),
        (hi, 1.0 - fraction),
        tolerance,
        max_iterations,
    );

    CellReconstruction {
        reconstruction: Reconstruction::Plane(InterfacePlane {
            normal,
            offset: search.x.clamp(lo, hi),
        }),
        iterations: search.iterations,
        converged: search.converged,
    }
}

/// Reconstructs interfaces cell by cell with a pluggable normal estimator.
pub struct InterfaceReconstructor {
    estimator: Box<dyn NormalEstimator>,
    tolerance: f64,
    max_iterations: usize,
}

impl InterfaceReconstructor {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            estimator: Box::new(LeastSquaresGradient::new()),
            tolerance,
            max_iterations,
        }
    }

    pub fn with_estimator(mut self, estimator: impl NormalEstimator + 'static) -> Self {
        self.estimator = Box::new(estimator);
        self
    }

    pub fn estimator_name(&self) -> &'static str {
        self.estimator.name()
    }

    /// Interface normal `-grad / |grad|` at `cell`, or `None` for a flat field.
    pub fn normal(&self, mesh: &VofMesh, alpha: &[f64], cell: usize) -> Option<Vector> {
        let grad = self.estimator.cell_gradient(mesh, alpha, cell);
        let h = mesh.cells[cell].volume.cbrt();
        if !(grad.length() * h > FLAT_GRADIENT) {
            return None;
        }
        (-grad).normalize()
    }

    /// Reconstructs `cell`; `previous` is its normal from an earlier sub-step.
    pub fn reconstruct(
        &self,
        mesh: &VofMesh,
        alpha: &[f64],
        cell: usize,
        previous: Option<Vector>,
    ) -> CellReconstruction {
        let fraction = alpha[cell];
        if fraction <= 0.0 {
            return CellReconstruction::degenerate(Reconstruction::Empty);
        }
        if fraction >= 1.0 {
            return CellReconstruction::degenerate(Reconstruction::Full);
        }
        let normal = self
            .normal(mesh, alpha, cell)
            .or(previous)
            .unwrap_or(FALLBACK_NORMAL);
        fit_plane(
            &mesh.cells[cell],
            fraction,
            normal,
            self.tolerance,
            self.max_iterations,
        )
    }

    /// Reconstructs every cell in parallel, results in cell order.
    pub fn reconstruct_all(
        &self,
        mesh: &VofMesh,
        alpha: &[f64],
        previous: &[Option<Vector>],
    ) -> Vec<CellReconstruction> {
        (0..mesh.n_cells())
            .into_par_iter()
            .map(|c| self.reconstruct(mesh, alpha, c, previous.get(c).copied().flatten()))
            .collect()
    }
}

impl std::fmt::Debug for InterfaceReconstructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceReconstructor")
            .field("estimator", &self.estimator.name())
            .field("tolerance", &self.tolerance)
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}
