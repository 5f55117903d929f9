//! Initial fields for benchmark set-ups.

use rayon::prelude::*;

use crate::geom::tetrahedron::{tetrahedron_volume, tetrahedron_volume_where_negative};
use crate::sim::vof::field::{FaceFluxField, VolumeFractionField};
use crate::sim::vof::mesh::VofMesh;
use crate::{Point, Vector};

/// Volume fraction of the region `phi(x) < 0` in every cell.
///
/// Each cell tetrahedron is split recursively (1:8) up to `depth` levels
/// wherever the level set changes sign at its vertices; at the finest level
/// `phi` is treated as linear. Features smaller than the finest tetrahedra
/// that do not touch a vertex are missed.
pub fn fraction_from_level_set<F>(mesh: &VofMesh, phi: F, depth: usize) -> VolumeFractionField
where
    F: Fn(Point) -> f64 + Sync,
{
    let values = mesh
        .cells
        .par_iter()
        .map(|cell| {
            let inside: f64 = cell
                .shape
                .tetrahedra()
                .iter()
                .map(|t| volume_inside(t, &phi, depth))
                .sum();
            (inside / cell.volume).clamp(0.0, 1.0)
        })
        .collect();
    VolumeFractionField::new(values)
}

fn volume_inside<F>(tet: &[Point; 4], phi: &F, depth: usize) -> f64
where
    F: Fn(Point) -> f64,
{
    let d = tet.map(|p| phi(p));
    if d.iter().all(|&v| v < 0.0) {
        return tetrahedron_volume(tet[0], tet[1], tet[2], tet[3]);
    }
    if d.iter().all(|&v| v >= 0.0) {
        return 0.0;
    }
    if depth == 0 {
        return tetrahedron_volume_where_negative(tet, &d);
    }
    subdivide(tet)
        .iter()
        .map(|t| volume_inside(t, phi, depth - 1))
        .sum()
}

/// Splits a tetrahedron into four corner tetrahedra and four around the
/// inner octahedron's `m02-m13` diagonal.
fn subdivide(t: &[Point; 4]) -> [[Point; 4]; 8] {
    let mid = |i: usize, j: usize| Point::lerp(t[i], t[j], 0.5);
    let (m01, m02, m03) = (mid(0, 1), mid(0, 2), mid(0, 3));
    let (m12, m13, m23) = (mid(1, 2), mid(1, 3), mid(2, 3));
    [
        [t[0], m01, m02, m03],
        [m01, t[1], m12, m13],
        [m02, m12, t[2], m23],
        [m03, m13, m23, t[3]],
        [m02, m13, m01, m03],
        [m02, m13, m03, m23],
        [m02, m13, m23, m12],
        [m02, m13, m12, m01],
    ]
}

/// Face flux `u(face centroid) . S`.
pub fn flux_from_velocity<F>(mesh: &VofMesh, u: F) -> FaceFluxField
where
    F: Fn(Point) -> Vector + Sync,
{
    let values = mesh
        .faces
        .par_iter()
        .map(|face| u(face.centroid).dot(&face.area))
        .collect();
    FaceFluxField::new(values)
}

/// Face flux of `u = curl(a)`, taken as the circulation of the vector
/// potential `a` around each face loop (Stokes).
///
/// Every edge integral is shared with opposite sign by the faces around it,
/// so the net flux of any closed cell vanishes to round-off regardless of
/// the quadrature error. Edges use Simpson's rule.
pub fn flux_from_vector_potential<F>(mesh: &VofMesh, a: F) -> FaceFluxField
where
    F: Fn(Point) -> Vector + Sync,
{
    let values = mesh
        .faces
        .par_iter()
        .map(|face| {
            let n = face.vertices.len();
            (0..n)
                .map(|i| edge_circulation(&a, face.vertices[i], face.vertices[(i + 1) % n]))
                .sum()
        })
        .collect();
    FaceFluxField::new(values)
}

fn edge_circulation<F>(a: &F, p: Point, q: Point) -> f64
where
    F: Fn(Point) -> Vector,
{
    // Same arithmetic in both directions so shared edges cancel exactly
    if [q.x, q.y, q.z] < [p.x, p.y, p.z] {
        return -edge_circulation(a, q, p);
    }
    let m = Point::lerp(p, q, 0.5);
    let avg = (a(p) + a(m) * 4.0 + a(q)) * (1.0 / 6.0);
    avg.dot(&(q - p))
}

/// Cell-centre velocity consistent with the face fluxes,
/// `u_c = sum_f (x_f - x_c) phi_f / V` over outward fluxes.
///
/// Exact for uniform flow; for a divergence-free field it is the cell
/// average of `u` to second order.
pub fn cell_velocity_from_flux(mesh: &VofMesh, flux: &FaceFluxField) -> Vec<Vector> {
    (0..mesh.n_cells())
        .into_par_iter()
        .map(|c| {
            let cell = &mesh.cells[c];
            let mut acc = Vector::zero();
            for &f in &cell.faces {
                let face = &mesh.faces[f];
                let out = if face.owner == c { flux[f] } else { -flux[f] };
                acc += (face.centroid - cell.centroid) * out;
            }
            acc * (1.0 / cell.volume)
        })
        .collect()
}

/// Cell-centre velocity of `u = curl(a)`, for the prescribed-flow snapshot.
pub fn velocity_from_vector_potential<F>(mesh: &VofMesh, a: F) -> Vec<Vector>
where
    F: Fn(Point) -> Vector + Sync,
{
    cell_velocity_from_flux(mesh, &flux_from_vector_potential(mesh, a))
}
