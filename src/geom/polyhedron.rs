//! Convex polyhedra described by a vertex list and outward face loops.

use crate::geom::plane::Plane;
use crate::geom::tetrahedron::{
    tetrahedron_centroid, tetrahedron_volume, tetrahedron_volume_below,
};
use crate::{Point, Vector};
use anyhow::{Result, anyhow};

/// Local face loops of a tetrahedron `(0, 1, 2, 3)`.
pub const TETRAHEDRON_FACES: [[usize; 3]; 4] = [[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];

/// Triangular faces of a wedge with base `(0, 1, 2)` and top `(3, 4, 5)`.
pub const PRISM_TRI_FACES: [[usize; 3]; 2] = [[0, 2, 1], [3, 4, 5]];
/// Quadrilateral faces of a wedge with base `(0, 1, 2)` and top `(3, 4, 5)`.
pub const PRISM_QUAD_FACES: [[usize; 4]; 3] = [[0, 1, 4, 3], [1, 2, 5, 4], [2, 0, 3, 5]];

/// Faces of a hexahedron with bottom loop `(0, 1, 2, 3)` and top `(4, 5, 6, 7)`.
pub const HEXAHEDRON_FACES: [[usize; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
];

#[derive(Debug, Clone, PartialEq)]
pub struct Polyhedron {
    vertices: Vec<Point>,
    faces: Vec<Vec<usize>>,
}

impl Polyhedron {
    /// Creates a polyhedron from vertices and face loops.
    ///
    /// Face loops may be given in either winding; they are reoriented so that
    /// their right-hand normals point away from the vertex average.
    pub fn new(vertices: Vec<Point>, faces: Vec<Vec<usize>>) -> Result<Self> {
        if vertices.len() < 4 {
            return Err(anyhow!(
                "Polyhedron needs at least 4 vertices, got {}",
                vertices.len()
            ));
        }
        if faces.len() < 4 {
            return Err(anyhow!(
                "Polyhedron needs at least 4 faces, got {}",
                faces.len()
            ));
        }
        for (fi, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(anyhow!("Face {fi} has fewer than 3 vertices"));
            }
            if let Some(&bad) = face.iter().find(|&&v| v >= vertices.len()) {
                return Err(anyhow!(
                    "Face {fi} references vertex {bad}, but only {} vertices exist",
                    vertices.len()
                ));
            }
        }
        Ok(Self::oriented(vertices, faces))
    }

    fn oriented(vertices: Vec<Point>, mut faces: Vec<Vec<usize>>) -> Self {
        let apex = Point::average(&vertices);
        for face in faces.iter_mut() {
            let pts: Vec<Point> = face.iter().map(|&i| vertices[i]).collect();
            let outward = Point::average(&pts) - apex;
            if Vector::area_vector(&pts).dot(&outward) < 0.0 {
                face.reverse();
            }
        }
        Self { vertices, faces }
    }

    /// Triangular prism with base `(0, 1, 2)` and top `(3, 4, 5)`, where top
    /// vertex `i + 3` sits above base vertex `i`.
    pub fn prism(pts: [Point; 6]) -> Self {
        let faces = PRISM_TRI_FACES
            .iter()
            .map(|f| f.to_vec())
            .chain(PRISM_QUAD_FACES.iter().map(|f| f.to_vec()))
            .collect();
        Self::oriented(pts.to_vec(), faces)
    }

    /// Hexahedron with bottom loop `(0, 1, 2, 3)` and top loop `(4, 5, 6, 7)`.
    pub fn hexahedron(pts: [Point; 8]) -> Self {
        let faces = HEXAHEDRON_FACES.iter().map(|f| f.to_vec()).collect();
        Self::oriented(pts.to_vec(), faces)
    }

    /// Return a box with given dimensions.
    ///
    /// The corner `(min(x), min(y), min(z))` will be located at `origin`.
    pub fn from_box(x: f64, y: f64, z: f64, origin: Option<(f64, f64, f64)>) -> Self {
        let origin_vec = match origin {
            Some((dx, dy, dz)) => Vector::new(dx, dy, dz),
            None => Vector::zero(),
        };
        Self::hexahedron([
            Point::new(0., 0., 0.) + origin_vec,
            Point::new(x, 0., 0.) + origin_vec,
            Point::new(x, y, 0.) + origin_vec,
            Point::new(0., y, 0.) + origin_vec,
            Point::new(0., 0., z) + origin_vec,
            Point::new(x, 0., z) + origin_vec,
            Point::new(x, y, z) + origin_vec,
            Point::new(0., y, z) + origin_vec,
        ])
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    pub fn face_points(&self, face: usize) -> Vec<Point> {
        self.faces[face].iter().map(|&i| self.vertices[i]).collect()
    }

    /// Average of the vertices; an interior point for convex polyhedra.
    pub fn apex(&self) -> Point {
        Point::average(&self.vertices)
    }

    /// Decomposes the polyhedron into tetrahedra.
    ///
    /// Every tetrahedron has the apex as its first vertex. Triangular faces
    /// contribute one tetrahedron, larger faces are fanned around their
    /// vertex average so warped quadrilaterals are handled symmetrically.
    pub fn tetrahedra(&self) -> Vec<[Point; 4]> {
        let apex = self.apex();
        let mut tets = Vec::new();
        for face in &self.faces {
            let pts: Vec<Point> = face.iter().map(|&i| self.vertices[i]).collect();
            if pts.len() == 3 {
                tets.push([apex, pts[0], pts[1], pts[2]]);
                continue;
            }
            let fc = Point::average(&pts);
            for i in 0..pts.len() {
                tets.push([apex, fc, pts[i], pts[(i + 1) % pts.len()]]);
            }
        }
        tets
    }

    pub fn volume(&self) -> f64 {
        self.tetrahedra()
            .iter()
            .map(|t| tetrahedron_volume(t[0], t[1], t[2], t[3]))
            .sum()
    }

    /// Volume-weighted centroid.
    pub fn centroid(&self) -> Point {
        let mut total = 0.0;
        let mut acc = Vector::zero();
        for t in self.tetrahedra() {
            let vol = tetrahedron_volume(t[0], t[1], t[2], t[3]);
            let c = tetrahedron_centroid(t[0], t[1], t[2], t[3]);
            total += vol;
            acc += c.to_vector() * vol;
        }
        if total <= 0.0 {
            return self.apex();
        }
        Point::default() + acc * (1.0 / total)
    }

    /// Volume of the polyhedron on the "below" side of `plane`.
    pub fn volume_below(&self, plane: &Plane) -> f64 {
        self.tetrahedra()
            .iter()
            .map(|t| tetrahedron_volume_below(t, plane))
            .sum()
    }

    /// Range of signed distances of the vertices from `origin` along `normal`.
    pub fn extent_along(&self, origin: Point, normal: Vector) -> (f64, f64) {
        extent_along(&self.vertices, origin, normal)
    }
}

/// Range of `normal . (p - origin)` over `pts`.
pub fn extent_along(pts: &[Point], origin: Point, normal: Vector) -> (f64, f64) {
    pts.iter()
        .map(|&p| (p - origin).dot(&normal))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| {
            (lo.min(d), hi.max(d))
        })
}
