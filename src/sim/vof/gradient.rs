//! Cell-centred gradient estimators for interface normals.
//!
//! The interface normal of a cell is `-grad(alpha) / |grad(alpha)|`. The
//! estimator is pluggable; [`LeastSquaresGradient`] is the default and falls
//! back to [`GreenGaussGradient`] when its normal equations are singular.

use crate::Vector;
use crate::sim::vof::mesh::VofMesh;

/// Estimates the gradient of a cell field at one cell centre.
pub trait NormalEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Gradient of `field` at `cell`. May be the zero vector for flat fields.
    fn cell_gradient(&self, mesh: &VofMesh, field: &[f64], cell: usize) -> Vector;
}

/// Distance-weighted least squares over face neighbours.
///
/// Minimises `sum w_k (grad . d_k - (phi_k - phi_c))^2` with `w_k = 1/|d_k|^2`.
/// When the neighbour set alone does not span 3D (a single cell layer, a
/// corner cell), boundary faces add mirror points carrying a zero difference.
#[derive(Debug, Clone, Copy)]
pub struct LeastSquaresGradient {
    /// Relative determinant threshold below which the system counts as singular.
    pub det_min: f64,
    /// Add boundary mirror points when the interior system is singular.
    pub boundary_mirrors: bool,
}

impl LeastSquaresGradient {
    pub fn new() -> Self {
        Self {
            det_min: 1e-12,
            boundary_mirrors: true,
        }
    }

    pub fn with_det_min(mut self, det_min: f64) -> Self {
        self.det_min = det_min;
        self
    }

    pub fn with_boundary_mirrors(mut self, enabled: bool) -> Self {
        self.boundary_mirrors = enabled;
        self
    }

    /// Least-squares gradient, `None` if the weighted system stays singular.
    pub fn try_gradient(&self, mesh: &VofMesh, field: &[f64], cell: usize) -> Option<Vector> {
        let c = &mesh.cells[cell];
        let mut sys = NormalEquations::default();

        for &f in &c.faces {
            let face = &mesh.faces[f];
            let other = face.other(cell);
            if face.is_boundary() {
                continue;
            }
            let d = mesh.cells[other].centroid - c.centroid;
            sys.add(d, field[other] - field[cell]);
        }
        if let Some(grad) = sys.solve(self.det_min) {
            return Some(grad);
        }
        if !self.boundary_mirrors {
            return None;
        }

        for &f in &c.faces {
            let face = &mesh.faces[f];
            if !face.is_boundary() {
                continue;
            }
            let Some(n) = face.area.normalize() else {
                continue;
            };
            // Mirror image of the centre across the face plane
            let dist = n.dot(&(face.centroid - c.centroid));
            sys.add(n * (2.0 * dist), 0.0);
        }
        sys.solve(self.det_min)
    }
}

impl Default for LeastSquaresGradient {
    fn default() -> Self {
        Self::new()
    }
}

impl NormalEstimator for LeastSquaresGradient {
    fn name(&self) -> &'static str {
        "least-squares"
    }

    fn cell_gradient(&self, mesh: &VofMesh, field: &[f64], cell: usize) -> Vector {
        self.try_gradient(mesh, field, cell)
            .unwrap_or_else(|| GreenGaussGradient.cell_gradient(mesh, field, cell))
    }
}

/// Green-Gauss gradient with linearly interpolated face values.
///
/// Boundary faces take the owner value (zero normal gradient).
#[derive(Debug, Clone, Copy, Default)]
pub struct GreenGaussGradient;

impl NormalEstimator for GreenGaussGradient {
    fn name(&self) -> &'static str {
        "green-gauss"
    }

    fn cell_gradient(&self, mesh: &VofMesh, field: &[f64], cell: usize) -> Vector {
        let c = &mesh.cells[cell];
        let mut acc = Vector::zero();
        for &f in &c.faces {
            let face = &mesh.faces[f];
            let other = face.other(cell);
            let phi_f = if face.is_boundary() {
                field[cell]
            } else {
                let d_own = (face.centroid - c.centroid).length();
                let d_nb = (face.centroid - mesh.cells[other].centroid).length();
                let w = if d_own + d_nb > 0.0 {
                    d_nb / (d_own + d_nb)
                } else {
                    0.5
                };
                w * field[cell] + (1.0 - w) * field[other]
            };
            acc += face.outward_area(cell) * phi_f;
        }
        acc * (1.0 / c.volume)
    }
}

/// Symmetric 3x3 weighted normal equations `A g = b`.
#[derive(Debug, Default)]
struct NormalEquations {
    a: [[f64; 3]; 3],
    b: [f64; 3],
}

impl NormalEquations {
    fn add(&mut self, d: Vector, dphi: f64) {
        let len2 = d.dot(&d);
        if len2 <= 0.0 {
            return;
        }
        let w = 1.0 / len2;
        let d = [d.dx, d.dy, d.dz];
        for i in 0..3 {
            for j in 0..3 {
                self.a[i][j] += w * d[i] * d[j];
            }
            self.b[i] += w * d[i] * dphi;
        }
    }

    /// Cramer's rule; `None` when `|det| < det_min * (trace / 3)^3`.
    fn solve(&self, det_min: f64) -> Option<Vector> {
        let a = &self.a;
        let det = det3(a);
        let scale = (a[0][0] + a[1][1] + a[2][2]) / 3.0;
        if !(scale > 0.0) || det.abs() < det_min * scale.powi(3) {
            return None;
        }
        let mut x = [0.0; 3];
        for (k, xk) in x.iter_mut().enumerate() {
            let mut m = *a;
            for (row, bi) in m.iter_mut().zip(self.b) {
                row[k] = bi;
            }
            *xk = det3(&m) / det;
        }
        Some(Vector::new(x[0], x[1], x[2]))
    }
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use crate::sim::vof::mesh_3d::{build_box_mesh, build_tet_box_mesh};

    fn linear_field(mesh: &VofMesh, g: Vector) -> Vec<f64> {
        mesh.cells
            .iter()
            .map(|c| 0.3 + g.dot(&c.centroid.to_vector()))
            .collect()
    }

    #[test]
    fn test_least_squares_exact_for_linear_field() {
        let mesh = build_tet_box_mesh([3, 3, 3], [1., 1., 1.], Point::new(0., 0., 0.)).unwrap();
        let g = Vector::new(0.2, -0.5, 0.7);
        let field = linear_field(&mesh, g);
        let ls = LeastSquaresGradient::new().with_boundary_mirrors(false);
        let interior: Vec<usize> = (0..mesh.n_cells())
            .filter(|&c| mesh.cells[c].faces.iter().all(|&f| !mesh.faces[f].is_boundary()))
            .collect();
        assert!(!interior.is_empty());
        for cell in interior {
            let grad = ls.try_gradient(&mesh, &field, cell).unwrap();
            assert!((grad - g).length() < 1e-10, "cell {cell}: {grad}");
        }
    }

    #[test]
    fn test_single_layer_uses_boundary_mirrors() {
        // One cell thick in z: interior neighbours only span the xy plane
        let mesh = build_box_mesh([4, 4, 1], [1., 1., 0.25], Point::new(0., 0., 0.)).unwrap();
        let g = Vector::new(1.0, 2.0, 0.0);
        let field = linear_field(&mesh, g);

        let interior_only = LeastSquaresGradient::new().with_boundary_mirrors(false);
        let cell = 5; // (1, 1, 0), four in-plane neighbours
        assert!(interior_only.try_gradient(&mesh, &field, cell).is_none());

        let grad = LeastSquaresGradient::new().cell_gradient(&mesh, &field, cell);
        assert!((grad - g).length() < 1e-10, "{grad}");
    }

    #[test]
    fn test_green_gauss_interior_linear_field() {
        let mesh = build_box_mesh([3, 3, 3], [1., 1., 1.], Point::new(0., 0., 0.)).unwrap();
        let g = Vector::new(-0.4, 0.1, 0.9);
        let field = linear_field(&mesh, g);
        // Centre cell has no boundary faces, so the estimate is exact
        let grad = GreenGaussGradient.cell_gradient(&mesh, &field, 13);
        assert!((grad - g).length() < 1e-12, "{grad}");
    }

    #[test]
    fn test_flat_field_gives_zero_gradient() {
        let mesh = build_box_mesh([2, 2, 2], [1., 1., 1.], Point::new(0., 0., 0.)).unwrap();
        let field = vec![0.5; mesh.n_cells()];
        for est in [
            &LeastSquaresGradient::new() as &dyn NormalEstimator,
            &GreenGaussGradient,
        ] {
            for cell in 0..mesh.n_cells() {
                assert!(est.cell_gradient(&mesh, &field, cell).length() < 1e-14, "{}", est.name());
            }
        }
    }
}
