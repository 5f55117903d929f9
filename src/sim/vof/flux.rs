//! Geometric fluid flux through a single face.

use crate::sim::vof::mesh::{VofFace, VofMesh};
use crate::sim::vof::reconstruct::Reconstruction;
use crate::sim::vof::shape::CutVolume;
use crate::{Point, Vector};

/// Fluid on the upwind side of a face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Upwind<'a> {
    /// An interior cell (or the owner of an outflow boundary face).
    Cell {
        centroid: Point,
        reconstruction: &'a Reconstruction,
    },
    /// Flow entering through a boundary face with a fixed volume fraction.
    Inflow(f64),
}

/// Triangular prisms sweeping `face` by `depth` along the unit `direction`,
/// one per face edge, fanned around the face centroid.
pub fn swept_prisms(face: &VofFace, direction: Vector, depth: f64) -> Vec<[Point; 6]> {
    let shift = direction * depth;
    let n = face.vertices.len();
    (0..n)
        .map(|i| {
            let a = face.vertices[i];
            let b = face.vertices[(i + 1) % n];
            let c = face.centroid;
            [c, a, b, c + shift, a + shift, b + shift]
        })
        .collect()
}

/// Signed fluid volume crossing `face` during `dt`, positive from owner to
/// neighbour like `face_flux`.
///
/// The swept space is the face extruded into the upwind cell by
/// `|face_flux| dt / |S|`; its volume is `|face_flux| dt`. The fluid share
/// is the fraction of that prism lying on the fluid side of the upwind
/// interface plane, so `|result| <= |face_flux| dt` always holds.
pub fn compute_face_flux(face: &VofFace, upwind: Upwind<'_>, face_flux: f64, dt: f64) -> f64 {
    let swept = face_flux.abs() * dt;
    if swept == 0.0 {
        return 0.0;
    }
    let fraction = match upwind {
        Upwind::Inflow(fraction) => fraction.clamp(0.0, 1.0),
        Upwind::Cell {
            reconstruction: Reconstruction::Empty,
            ..
        } => 0.0,
        Upwind::Cell {
            reconstruction: Reconstruction::Full,
            ..
        } => 1.0,
        Upwind::Cell {
            centroid,
            reconstruction: Reconstruction::Plane(interface),
        } => {
            let Some(n) = face.area.normalize() else {
                return 0.0;
            };
            // Positive flux leaves the owner, so the swept prism lies behind the face
            let into_upwind = if face_flux > 0.0 { -n } else { n };
            let depth = swept / face.area.length();
            let plane = interface.to_plane(centroid);

            let (mut total, mut below) = (0.0, 0.0);
            for prism in swept_prisms(face, into_upwind, depth) {
                total += prism.volume();
                below += prism.volume_below(&plane);
            }
            if !(total > 0.0) {
                return 0.0;
            }
            (below / total).clamp(0.0, 1.0)
        }
    };
    face_flux.signum() * swept * fraction
}

/// Swept fluid volume of every face of `mesh`, see [`compute_face_flux`].
pub(crate) fn face_fluid_volumes(
    mesh: &VofMesh,
    reconstructions: &[Reconstruction],
    flux: &[f64],
    dt: f64,
    inflow_fraction: f64,
) -> Vec<f64> {
    use rayon::prelude::*;

    mesh.faces
        .par_iter()
        .zip(flux.par_iter())
        .map(|(face, &phi)| {
            let upwind_cell = if phi >= 0.0 { face.owner } else { face.neighbour };
            let upwind = if face.is_boundary() && phi < 0.0 {
                Upwind::Inflow(inflow_fraction)
            } else {
                Upwind::Cell {
                    centroid: mesh.cells[upwind_cell].centroid,
                    reconstruction: &reconstructions[upwind_cell],
                }
            };
            compute_face_flux(face, upwind, phi, dt)
        })
        .collect()
}
