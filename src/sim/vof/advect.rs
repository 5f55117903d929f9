//! Sub-cycling geometric advection of the volume fraction.
//!
//! One call to [`AdvectionDriver::advance`] covers an outer timestep. It is
//! split into `N` equal sub-steps so that no cell's Courant number exceeds
//! the configured limit. Each sub-step runs four barrier-separated parallel
//! phases:
//!
//! 1. reconstruct: one interface plane per cell
//! 2. flux: one swept fluid volume per face
//! 3. limit: per cell, cap fluid and gas outflow by the cell content
//! 4. accumulate: per cell, `alpha -= net_outflow / V`, then clamp
//!
//! Each phase only reads the output of the previous one, so the result is
//! independent of the thread count.

use std::collections::BTreeSet;

use log::{debug, warn};
use rayon::prelude::*;

use crate::Vector;
use crate::sim::vof::config::VofConfig;
use crate::sim::vof::error::{VofError, VofResult};
use crate::sim::vof::field::{FaceFluxField, VolumeFractionField, fluid_volume};
use crate::sim::vof::flux::face_fluid_volumes;
use crate::sim::vof::gradient::NormalEstimator;
use crate::sim::vof::mesh::{BOUNDARY, VofMesh};
use crate::sim::vof::reconstruct::{InterfaceReconstructor, Reconstruction};

/// Diagnostics of one outer timestep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvanceReport {
    /// `(after - before - boundary_inflow) / before`; absolute when `before == 0`.
    pub conservation_error: f64,
    pub sub_cycles: usize,
    /// Largest cell Courant number of the outer step (before sub-cycling).
    pub max_courant: f64,
    /// Cell reconstructions that ran out of iterations, summed over sub-steps.
    pub reconstruction_warnings: usize,
    /// Cells flagged by those warnings, ascending and unique.
    pub flagged_cells: Vec<usize>,
    /// Clamps larger than the bound tolerance, summed over sub-steps.
    pub bound_violations: usize,
    /// Cells with at least one such clamp, ascending and unique.
    pub violating_cells: Vec<usize>,
    /// Largest clamp applied to any cell.
    pub max_clamp: f64,
    /// Faces whose swept fluid volume was reduced by the outflow limiter.
    pub limited_faces: usize,
    pub volume_before: f64,
    pub volume_after: f64,
    /// Net fluid volume that entered through boundary faces.
    pub boundary_inflow: f64,
}

/// Scale factors applied to the outgoing faces of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OutflowLimit {
    fluid: f64,
    gas: f64,
}

impl OutflowLimit {
    const NONE: Self = Self {
        fluid: 1.0,
        gas: 1.0,
    };

    fn is_active(&self) -> bool {
        self.fluid < 1.0 || self.gas < 1.0
    }
}

/// Per-cell result of the accumulate phase.
#[derive(Debug, Clone, Copy)]
struct Accumulated {
    alpha: f64,
    clamp: f64,
}

/// Advances a volume fraction field through prescribed face fluxes.
#[derive(Debug)]
pub struct AdvectionDriver {
    config: VofConfig,
    reconstructor: InterfaceReconstructor,
}

impl AdvectionDriver {
    pub fn new(config: VofConfig) -> VofResult<Self> {
        config.validate()?;
        let reconstructor = InterfaceReconstructor::new(
            config.reconstruction_tolerance,
            config.max_reconstruction_iterations,
        );
        Ok(Self {
            config,
            reconstructor,
        })
    }

    /// Replaces the least-squares normal estimator.
    pub fn with_estimator(mut self, estimator: impl NormalEstimator + 'static) -> Self {
        self.reconstructor = self.reconstructor.with_estimator(estimator);
        self
    }

    pub fn config(&self) -> &VofConfig {
        &self.config
    }

    pub fn reconstructor(&self) -> &InterfaceReconstructor {
        &self.reconstructor
    }

    /// Number of sub-steps for `dt` and the outer-step maximum Courant number.
    ///
    /// `N = max(1, ceil(max_courant / courant_limit))`, capped at
    /// `max_sub_cycles`.
    pub fn sub_cycles(&self, mesh: &VofMesh, flux: &FaceFluxField, dt: f64) -> (usize, f64) {
        let max_courant = flux.max_courant(mesh, dt);
        let wanted = (max_courant / self.config.courant_limit).ceil().max(1.0);
        if wanted > self.config.max_sub_cycles as f64 {
            warn!(
                "Courant number {max_courant:.3} needs {wanted} sub-cycles, capped at {}",
                self.config.max_sub_cycles
            );
            return (self.config.max_sub_cycles, max_courant);
        }
        (wanted as usize, max_courant)
    }

    /// Advances `fraction` over one outer timestep `dt`.
    ///
    /// The caller's field is only written when the step succeeds. Fatal
    /// input errors and rejected steps ([`VofError::DataQuality`]) leave it
    /// untouched.
    pub fn advance(
        &self,
        mesh: &VofMesh,
        fraction: &mut VolumeFractionField,
        flux: &FaceFluxField,
        dt: f64,
    ) -> VofResult<AdvanceReport> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(VofError::InvalidTimeStep(dt));
        }
        mesh.check_volumes()?;
        fraction.validate(mesh)?;
        flux.validate(mesh)?;

        let (n_sub, max_courant) = self.sub_cycles(mesh, flux, dt);
        let sub_dt = dt / n_sub as f64;

        let mut alpha = fraction.values().to_vec();
        let volume_before = fluid_volume(mesh, &alpha);
        let mut report = AdvanceReport {
            sub_cycles: n_sub,
            max_courant,
            volume_before,
            ..AdvanceReport::default()
        };

        let mut normals: Vec<Option<Vector>> = vec![None; mesh.n_cells()];
        let mut flagged = BTreeSet::new();
        let mut violating = BTreeSet::new();

        for _ in 0..n_sub {
            // Reconstruct
            let recs = self.reconstructor.reconstruct_all(mesh, &alpha, &normals);
            for (cell, rec) in recs.iter().enumerate() {
                if !rec.converged {
                    report.reconstruction_warnings += 1;
                    flagged.insert(cell);
                }
                if let Reconstruction::Plane(p) = rec.reconstruction {
                    normals[cell] = Some(p.normal);
                }
            }
            let states: Vec<Reconstruction> = recs.iter().map(|r| r.reconstruction).collect();

            // Flux
            let mut fluid = face_fluid_volumes(
                mesh,
                &states,
                flux.values(),
                sub_dt,
                self.config.boundary_inflow_fraction,
            );

            // Limit
            let limits: Vec<OutflowLimit> = (0..mesh.n_cells())
                .into_par_iter()
                .map(|c| outflow_limit(mesh, c, alpha[c], flux.values(), &fluid, sub_dt))
                .collect();
            report.limited_faces += apply_limits(mesh, &limits, flux.values(), &mut fluid, sub_dt);

            report.boundary_inflow -= mesh.boundary_faces().map(|f| fluid[f]).sum::<f64>();

            // Accumulate
            let next: Vec<Accumulated> = (0..mesh.n_cells())
                .into_par_iter()
                .map(|c| {
                    let a = alpha[c] - mesh.net_outflow(c, &fluid) / mesh.cells[c].volume;
                    let clamped = a.clamp(0.0, 1.0);
                    Accumulated {
                        alpha: clamped,
                        clamp: (a - clamped).abs(),
                    }
                })
                .collect();

            for (cell, acc) in next.iter().enumerate() {
                alpha[cell] = acc.alpha;
                report.max_clamp = report.max_clamp.max(acc.clamp);
                if acc.clamp > self.config.bound_tolerance {
                    report.bound_violations += 1;
                    violating.insert(cell);
                    debug!("Cell {cell} clamped by {:e}", acc.clamp);
                }
            }
        }

        report.flagged_cells = flagged.into_iter().collect();
        report.violating_cells = violating.into_iter().collect();
        report.volume_after = fluid_volume(mesh, &alpha);
        let change = report.volume_after - report.volume_before - report.boundary_inflow;
        report.conservation_error = if report.volume_before > 0.0 {
            change / report.volume_before
        } else {
            change.abs()
        };

        if report.reconstruction_warnings > 0 {
            warn!(
                "Interface reconstruction did not converge {} times ({} cells)",
                report.reconstruction_warnings,
                report.flagged_cells.len()
            );
        }
        if report.bound_violations > 0 {
            warn!(
                "{} stability-bound violations in {} cells, largest clamp {:e}",
                report.bound_violations,
                report.violating_cells.len(),
                report.max_clamp
            );
            let allowed = self.config.max_violation_fraction * mesh.n_cells() as f64;
            if report.violating_cells.len() as f64 > allowed {
                return Err(VofError::DataQuality {
                    violations: report.violating_cells.len(),
                    cells: mesh.n_cells(),
                });
            }
        }

        debug!(
            "Advected dt={dt} in {} sub-cycles (Co={:.3}), conservation error {:e}",
            report.sub_cycles, report.max_courant, report.conservation_error
        );
        fraction.overwrite(alpha);
        Ok(report)
    }
}

/// Scale factors keeping the outflow of `cell` within its content.
///
/// Fluid leaving the cell is capped at `alpha V`, gas leaving it at
/// `(1 - alpha) V`. With a Courant number `<= 1` at most one of the two
/// can be exceeded; otherwise the fluid cap wins.
fn outflow_limit(
    mesh: &VofMesh,
    cell: usize,
    alpha: f64,
    flux: &[f64],
    fluid: &[f64],
    dt: f64,
) -> OutflowLimit {
    let (mut total_out, mut fluid_out) = (0.0, 0.0);
    for &f in &mesh.cells[cell].faces {
        let outward = if mesh.faces[f].owner == cell { 1.0 } else { -1.0 };
        if outward * flux[f] > 0.0 {
            total_out += flux[f].abs() * dt;
            fluid_out += fluid[f].abs();
        }
    }
    let gas_out = (total_out - fluid_out).max(0.0);
    let volume = mesh.cells[cell].volume;
    let fluid_cap = alpha * volume;
    let gas_cap = (1.0 - alpha) * volume;

    let mut limit = OutflowLimit::NONE;
    if fluid_out > fluid_cap {
        limit.fluid = fluid_cap / fluid_out;
    } else if gas_out > gas_cap {
        limit.gas = gas_cap / gas_out;
    }
    limit
}

/// Applies the upwind cell's limits to every outgoing face; returns the
/// number of faces changed.
fn apply_limits(
    mesh: &VofMesh,
    limits: &[OutflowLimit],
    flux: &[f64],
    fluid: &mut [f64],
    dt: f64,
) -> usize {
    fluid
        .par_iter_mut()
        .enumerate()
        .map(|(f, v)| {
            let phi = flux[f];
            let face = &mesh.faces[f];
            let upwind = if phi > 0.0 { face.owner } else { face.neighbour };
            if phi == 0.0 || upwind == BOUNDARY {
                return 0;
            }
            let limit = limits[upwind];
            if !limit.is_active() {
                return 0;
            }
            let swept = phi.abs() * dt;
            let moved = v.abs().min(swept);
            let moved = if limit.fluid < 1.0 {
                moved * limit.fluid
            } else {
                swept - (swept - moved) * limit.gas
            };
            *v = phi.signum() * moved;
            1
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use crate::sim::vof::init::fraction_from_level_set;
    use crate::sim::vof::mesh_3d::{build_box_mesh, build_tet_box_mesh};

    fn cube() -> VofMesh {
        build_box_mesh([1, 1, 1], [1., 1., 1.], Point::new(0., 0., 0.)).unwrap()
    }

    fn two_cubes() -> VofMesh {
        build_box_mesh([2, 1, 1], [2., 1., 1.], Point::new(0., 0., 0.)).unwrap()
    }

    /// Flux `q` from cell 0 to cell 1 through their shared face.
    fn shared_face_flux(mesh: &VofMesh, q: f64) -> FaceFluxField {
        let mut values = vec![0.0; mesh.n_faces()];
        let f = mesh.faces.iter().position(|f| !f.is_boundary()).unwrap();
        values[f] = if mesh.faces[f].owner == 0 { q } else { -q };
        FaceFluxField::new(values)
    }

    fn driver() -> AdvectionDriver {
        AdvectionDriver::new(VofConfig::new()).unwrap()
    }

    #[test]
    fn test_still_cube_keeps_fraction() {
        let mesh = cube();
        let mut alpha = VolumeFractionField::new(vec![0.5]);
        let flux = FaceFluxField::zeros(mesh.n_faces());
        let report = driver().advance(&mesh, &mut alpha, &flux, 1.0).unwrap();
        assert_eq!(alpha.values(), &[0.5]);
        assert_eq!(report.conservation_error, 0.0);
        assert_eq!(report.sub_cycles, 1);
        assert_eq!(report.reconstruction_warnings, 0);
    }

    #[test]
    fn test_full_cell_pushes_into_empty_neighbour() {
        let mesh = two_cubes();
        let mut alpha = VolumeFractionField::new(vec![1.0, 0.0]);
        let flux = shared_face_flux(&mesh, 0.3);
        let report = driver().advance(&mesh, &mut alpha, &flux, 1.0).unwrap();
        assert!((alpha[0] - 0.7).abs() < 1e-15, "{:?}", alpha.values());
        assert!((alpha[1] - 0.3).abs() < 1e-15, "{:?}", alpha.values());
        assert!(report.conservation_error.abs() < 1e-15);
        assert_eq!(report.bound_violations, 0);
    }

    #[test]
    fn test_invalid_inputs_leave_field_untouched() {
        let mesh = two_cubes();
        let flux = shared_face_flux(&mesh, 0.3);

        let mut alpha = VolumeFractionField::new(vec![1.2, 0.0]);
        let err = driver().advance(&mesh, &mut alpha, &flux, 1.0).unwrap_err();
        assert_eq!(
            err,
            VofError::InvalidFraction {
                cell: 0,
                value: 1.2
            }
        );
        assert_eq!(alpha.values(), &[1.2, 0.0]);

        let mut alpha = VolumeFractionField::new(vec![1.0, 0.0]);
        let err = driver().advance(&mesh, &mut alpha, &flux, 0.0).unwrap_err();
        assert_eq!(err, VofError::InvalidTimeStep(0.0));
        let err = driver()
            .advance(&mesh, &mut alpha, &FaceFluxField::zeros(2), 1.0)
            .unwrap_err();
        assert!(matches!(err, VofError::FieldSizeMismatch { .. }));
        assert_eq!(alpha.values(), &[1.0, 0.0]);
    }

    #[test]
    fn test_sub_cycle_count() {
        let mesh = two_cubes();
        let flux = shared_face_flux(&mesh, 0.3);
        let d = driver();
        assert_eq!(d.sub_cycles(&mesh, &flux, 1.0).0, 1);
        assert_eq!(d.sub_cycles(&mesh, &flux, 10.0).0, 3);

        let capped = AdvectionDriver::new(VofConfig::new().with_max_sub_cycles(2)).unwrap();
        assert_eq!(capped.sub_cycles(&mesh, &flux, 10.0).0, 2);

        let strict = AdvectionDriver::new(VofConfig::new().with_courant_limit(0.1)).unwrap();
        let (n, co) = strict.sub_cycles(&mesh, &flux, 1.0);
        assert_eq!(n, 3);
        assert!((co - 0.3).abs() < 1e-15);
    }

    #[test]
    fn test_sub_cycling_splits_large_step() {
        // Courant 2.4 over one outer step; three sub-steps of 0.8 each
        let mesh = two_cubes();
        let mut alpha = VolumeFractionField::new(vec![1.0, 0.0]);
        let flux = shared_face_flux(&mesh, 0.3);
        let report = driver().advance(&mesh, &mut alpha, &flux, 8.0).unwrap();
        assert_eq!(report.sub_cycles, 3);
        // The second sub-step empties cell 0 without overshooting
        assert!(alpha.values().iter().all(|a| (0.0..=1.0).contains(a)));
        assert!(report.conservation_error.abs() < 1e-14);
        assert!(alpha[0] < 1e-7 && alpha[1] > 1.0 - 1e-7, "{:?}", alpha.values());
        assert_eq!(report.bound_violations, 0);
    }

    #[test]
    fn test_overflow_is_rejected_as_data_quality() {
        // Non-solenoidal flux that pours 0.3 into a full cell every step
        let mesh = two_cubes();
        let mut alpha = VolumeFractionField::new(vec![1.0, 1.0]);
        let mut values = vec![0.0; mesh.n_faces()];
        let inflow = mesh
            .boundary_faces()
            .find(|&f| mesh.faces[f].owner == 1)
            .unwrap();
        values[inflow] = -0.3;
        let flux = FaceFluxField::new(values);
        let config = VofConfig {
            boundary_inflow_fraction: 1.0,
            ..VofConfig::new()
        };
        let err = AdvectionDriver::new(config)
            .unwrap()
            .advance(&mesh, &mut alpha, &flux, 1.0)
            .unwrap_err();
        assert!(matches!(err, VofError::DataQuality { violations: 1, cells: 2 }));
        assert_eq!(alpha.values(), &[1.0, 1.0]);
    }

    #[test]
    fn test_boundary_inflow_is_accounted() {
        // Gas-filled pipe of two cells, fluid enters on the left, leaves on the right
        let mesh = two_cubes();
        let mut values = vec![0.0; mesh.n_faces()];
        for f in mesh.boundary_faces() {
            let face = &mesh.faces[f];
            if face.area.dx.abs() > 0.5 {
                // q = 0.25 in +x on both ends
                values[f] = 0.25 * face.area.dx.signum();
            }
        }
        let interior = mesh.faces.iter().position(|f| !f.is_boundary()).unwrap();
        values[interior] = 0.25 * mesh.faces[interior].area.dx.signum();
        let flux = FaceFluxField::new(values);
        assert!(flux.divergence(&mesh).iter().all(|d| d.abs() < 1e-15));

        let config = VofConfig {
            boundary_inflow_fraction: 1.0,
            ..VofConfig::new()
        };
        let mut alpha = VolumeFractionField::new(vec![0.0, 0.0]);
        let report = AdvectionDriver::new(config)
            .unwrap()
            .advance(&mesh, &mut alpha, &flux, 1.0)
            .unwrap();
        let left = if mesh.cells[0].centroid.x < 1.0 { 0 } else { 1 };
        assert!((alpha[left] - 0.25).abs() < 1e-15);
        assert!((report.boundary_inflow - 0.25).abs() < 1e-15);
        assert!(report.conservation_error.abs() < 1e-15);
    }

    #[test]
    fn test_degenerate_cell_is_fatal_and_field_is_kept() {
        let mut mesh = two_cubes();
        mesh.cells[1].volume = 0.0;
        let mut alpha = VolumeFractionField::new(vec![1.0, 0.5]);

        for flux in [FaceFluxField::zeros(mesh.n_faces()), shared_face_flux(&mesh, 0.3)] {
            let err = driver().advance(&mesh, &mut alpha, &flux, 1.0).unwrap_err();
            assert_eq!(
                err,
                VofError::DegenerateGeometry {
                    cell: 1,
                    volume: 0.0
                }
            );
            assert_eq!(alpha.values(), &[1.0, 0.5]);
        }

        mesh.cells[1].volume = f64::NAN;
        let err = driver()
            .advance(&mesh, &mut alpha, &FaceFluxField::zeros(mesh.n_faces()), 1.0)
            .unwrap_err();
        assert!(matches!(err, VofError::DegenerateGeometry { cell: 1, .. }));
    }

    #[test]
    fn test_single_violating_cell_is_tolerated() {
        // 20 x 2 cells; the upper row is a full pipe carrying q in +x, which
        // forces sub-cycling. The lower-left cell is full and also fed from
        // the boundary, so it overflows in every sub-step.
        let mesh = build_box_mesh([20, 2, 1], [20., 2., 1.], Point::new(0., 0., 0.)).unwrap();
        let q = 0.3;
        let in_pipe = |c: usize| mesh.cells[c].centroid.y > 1.0;
        let values = mesh
            .faces
            .iter()
            .map(|face| {
                if face.area.dx.abs() < 0.5 {
                    0.0
                } else if in_pipe(face.owner) {
                    q * face.area.dx
                } else if face.is_boundary() && face.centroid.x < 1e-12 {
                    q * face.area.dx
                } else {
                    0.0
                }
            })
            .collect();
        let flux = FaceFluxField::new(values);
        let corner = (0..mesh.n_cells())
            .find(|&c| !in_pipe(c) && mesh.cells[c].centroid.x < 1.0)
            .unwrap();
        let mut alpha = VolumeFractionField::new(
            (0..mesh.n_cells())
                .map(|c| if in_pipe(c) || c == corner { 1.0 } else { 0.0 })
                .collect(),
        );

        let config = VofConfig {
            boundary_inflow_fraction: 1.0,
            ..VofConfig::new()
        }
        .with_courant_limit(0.1);
        let report = AdvectionDriver::new(config)
            .unwrap()
            .advance(&mesh, &mut alpha, &flux, 1.0)
            .unwrap();

        // 40 cells allow 2 violating cells; one cell violating 3 times passes
        assert_eq!(report.sub_cycles, 3);
        assert_eq!(report.bound_violations, 3);
        assert_eq!(report.violating_cells, vec![corner]);
        assert!((report.max_clamp - 0.1).abs() < 1e-12);
        assert!(alpha.values().iter().all(|a| (0.0..=1.0).contains(a)));
        assert_eq!(alpha[corner], 1.0);
    }

    #[test]
    fn test_unconverged_reconstruction_is_recovered() {
        let mesh = build_tet_box_mesh([2, 2, 2], [1., 1., 1.], Point::new(0., 0., 0.)).unwrap();
        let mut alpha =
            fraction_from_level_set(&mesh, |p| p.x + 0.7 * p.y + 0.3 * p.z - 1.0, 0);
        let initial = alpha.clone();
        assert!(!alpha.interface_cells(1e-6).is_empty());

        let config = VofConfig {
            max_reconstruction_iterations: 1,
            ..VofConfig::new()
        }
        .with_reconstruction_tolerance(1e-14);
        let flux = FaceFluxField::zeros(mesh.n_faces());
        let report = AdvectionDriver::new(config)
            .unwrap()
            .advance(&mesh, &mut alpha, &flux, 1.0)
            .unwrap();

        assert!(report.reconstruction_warnings > 0);
        assert!(!report.flagged_cells.is_empty());
        assert!(report.flagged_cells.windows(2).all(|w| w[0] < w[1]));
        assert!(report.flagged_cells.iter().all(|&c| c < mesh.n_cells()));
        assert_eq!(alpha, initial);
        assert!(alpha.values().iter().all(|a| (0.0..=1.0).contains(a)));
    }
}
