use crate::sim::vof::error::{VofError, VofResult};
use crate::sim::vof::shape::CellShape;
use crate::{Point, Vector};

/// Sentinel index indicating a boundary (no neighbour cell).
pub const BOUNDARY: usize = usize::MAX;

/// Vertex-index description of one cell, indices into the mesh vertex list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellTopology {
    Tetrahedron([usize; 4]),
    /// Base `(0, 1, 2)`, top `(3, 4, 5)`, vertex `i + 3` above vertex `i`.
    Prism([usize; 6]),
    /// Bottom loop `(0, 1, 2, 3)`, top loop `(4, 5, 6, 7)`.
    Hexahedron([usize; 8]),
    /// Arbitrary convex cell given by its face loops.
    Polyhedron(Vec<Vec<usize>>),
}

/// A single finite-volume cell.
#[derive(Debug, Clone)]
pub struct VofCell {
    pub shape: CellShape,
    /// Cell volume, strictly positive.
    pub volume: f64,
    pub centroid: Point,
    /// Indices into [`VofMesh::faces`], ascending.
    pub faces: Vec<usize>,
}

/// A face shared between two cells (or between a cell and a boundary).
///
/// `area` points from `owner` to `neighbour`; positive face fluxes move
/// volume in that direction.
#[derive(Debug, Clone)]
pub struct VofFace {
    pub owner: usize,
    /// Neighbour cell index, or [`BOUNDARY`].
    pub neighbour: usize,
    /// Area vector, length equals the face area.
    pub area: Vector,
    pub centroid: Point,
    /// Face loop, wound so that its right-hand normal follows `area`.
    pub vertices: Vec<Point>,
}

impl VofFace {
    pub fn is_boundary(&self) -> bool {
        self.neighbour == BOUNDARY
    }

    /// Cell on the far side of the face as seen from `cell`.
    pub fn other(&self, cell: usize) -> usize {
        if cell == self.owner {
            self.neighbour
        } else {
            self.owner
        }
    }

    /// Area vector pointing out of `cell`.
    pub fn outward_area(&self, cell: usize) -> Vector {
        if cell == self.owner {
            self.area
        } else {
            -self.area
        }
    }
}

/// Unstructured polyhedral mesh, read-only to the advection core.
///
/// Build one with [`VofMesh::from_cells`] or one of the box builders in
/// [`crate::sim::vof::mesh_3d`].
#[derive(Debug, Clone)]
pub struct VofMesh {
    pub vertices: Vec<Point>,
    pub cells: Vec<VofCell>,
    pub faces: Vec<VofFace>,
}

impl VofMesh {
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    /// Face-neighbours of `cell` in face order (boundary faces skipped).
    pub fn cell_neighbours(&self, cell: usize) -> impl Iterator<Item = usize> + '_ {
        self.cells[cell]
            .faces
            .iter()
            .map(move |&f| self.faces[f].other(cell))
            .filter(|&n| n != BOUNDARY)
    }

    pub fn boundary_faces(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.faces.len()).filter(|&f| self.faces[f].is_boundary())
    }

    /// Checks that every cell volume is finite and positive.
    ///
    /// Meshes from [`VofMesh::from_cells`] always pass; this guards meshes
    /// assembled or edited by hand.
    pub fn check_volumes(&self) -> VofResult<()> {
        match self
            .cells
            .iter()
            .position(|c| !(c.volume.is_finite() && c.volume > 0.0))
        {
            Some(cell) => Err(VofError::DegenerateGeometry {
                cell,
                volume: self.cells[cell].volume,
            }),
            None => Ok(()),
        }
    }

    /// Sum of cell volumes.
    pub fn total_volume(&self) -> f64 {
        self.cells.iter().map(|c| c.volume).sum()
    }

    /// Net outward flux of `cell` for a per-face flux slice.
    pub(crate) fn net_outflow(&self, cell: usize, flux: &[f64]) -> f64 {
        self.cells[cell]
            .faces
            .iter()
            .map(|&f| {
                if self.faces[f].owner == cell {
                    flux[f]
                } else {
                    -flux[f]
                }
            })
            .sum()
    }

    /// Sum of outgoing flux magnitudes of `cell`.
    pub(crate) fn total_outflow(&self, cell: usize, flux: &[f64]) -> f64 {
        self.cells[cell]
            .faces
            .iter()
            .map(|&f| {
                let out = if self.faces[f].owner == cell {
                    flux[f]
                } else {
                    -flux[f]
                };
                out.max(0.0)
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::vof::mesh_3d::build_box_mesh;

    #[test]
    fn test_face_orientation_helpers() {
        let mesh = build_box_mesh([2, 1, 1], [2.0, 1.0, 1.0], Point::default()).unwrap();
        let shared = mesh
            .faces
            .iter()
            .find(|f| !f.is_boundary())
            .expect("expected one interior face");
        assert_eq!(shared.other(shared.owner), shared.neighbour);
        assert_eq!(shared.other(shared.neighbour), shared.owner);
        assert!(
            shared
                .outward_area(shared.neighbour)
                .is_close(&(-shared.area))
        );
        assert_eq!(mesh.boundary_faces().count(), 10);
    }

    #[test]
    fn test_neighbours_and_outflow() {
        let mesh = build_box_mesh([3, 1, 1], [3.0, 1.0, 1.0], Point::default()).unwrap();
        let middle: Vec<usize> = mesh.cell_neighbours(1).collect();
        assert_eq!(middle.len(), 2);
        assert!(middle.contains(&0) && middle.contains(&2));

        let mut flux = vec![0.0; mesh.n_faces()];
        for (fi, face) in mesh.faces.iter().enumerate() {
            if !face.is_boundary() {
                // Uniform flow in +x
                flux[fi] = face.area.dx.signum() * 0.5;
            }
        }
        assert!(mesh.net_outflow(1, &flux).abs() < 1e-15);
        assert!((mesh.total_outflow(1, &flux) - 0.5).abs() < 1e-15);
        assert!((mesh.total_outflow(0, &flux) - 0.5).abs() < 1e-15);
        assert!(mesh.total_outflow(2, &flux).abs() < 1e-15);
        assert!((mesh.total_volume() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_check_volumes() {
        let mut mesh = build_box_mesh([3, 1, 1], [3.0, 1.0, 1.0], Point::default()).unwrap();
        assert!(mesh.check_volumes().is_ok());

        mesh.cells[2].volume = f64::NAN;
        assert!(matches!(
            mesh.check_volumes(),
            Err(VofError::DegenerateGeometry { cell: 2, .. })
        ));
        mesh.cells[1].volume = 0.0;
        assert_eq!(
            mesh.check_volumes(),
            Err(VofError::DegenerateGeometry {
                cell: 1,
                volume: 0.0
            })
        );
    }
}
