//! Cell shape families and their cut-volume capability.
//!
//! The reconstructor only needs "how much of this cell lies below a plane".
//! Each family answers that through [`CutVolume`]; [`CellShape`] selects the
//! family by tag.

use crate::geom::plane::Plane;
use crate::geom::polyhedron::extent_along;
use crate::geom::tetrahedron::{
    tetrahedron_centroid, tetrahedron_volume, tetrahedron_volume_below,
};
use crate::{Point, Polyhedron, Vector};

/// Volume queries of a convex cell against a half-space.
pub trait CutVolume {
    fn vertices(&self) -> &[Point];

    fn volume(&self) -> f64;

    fn centroid(&self) -> Point;

    /// Volume of the cell on the "below" side of `plane`.
    ///
    /// Monotone non-decreasing as the plane moves along its normal, from `0`
    /// to [`CutVolume::volume`].
    fn volume_below(&self, plane: &Plane) -> f64;

    /// Range of `normal . (v - origin)` over the cell vertices.
    fn extent_along(&self, origin: Point, normal: Vector) -> (f64, f64) {
        extent_along(self.vertices(), origin, normal)
    }
}

impl CutVolume for [Point; 4] {
    fn vertices(&self) -> &[Point] {
        self
    }

    fn volume(&self) -> f64 {
        tetrahedron_volume(self[0], self[1], self[2], self[3])
    }

    fn centroid(&self) -> Point {
        tetrahedron_centroid(self[0], self[1], self[2], self[3])
    }

    fn volume_below(&self, plane: &Plane) -> f64 {
        tetrahedron_volume_below(self, plane)
    }
}

/// Splits a wedge `(0, 1, 2) / (3, 4, 5)` into three tetrahedra.
fn prism_tetrahedra(p: &[Point; 6]) -> [[Point; 4]; 3] {
    [
        [p[0], p[1], p[2], p[3]],
        [p[1], p[2], p[3], p[4]],
        [p[2], p[3], p[4], p[5]],
    ]
}

impl CutVolume for [Point; 6] {
    fn vertices(&self) -> &[Point] {
        self
    }

    fn volume(&self) -> f64 {
        prism_tetrahedra(self).iter().map(|t| t.volume()).sum()
    }

    fn centroid(&self) -> Point {
        weighted_centroid(&prism_tetrahedra(self)).unwrap_or_else(|| Point::average(self))
    }

    fn volume_below(&self, plane: &Plane) -> f64 {
        prism_tetrahedra(self)
            .iter()
            .map(|t| t.volume_below(plane))
            .sum()
    }
}

/// General convex polyhedron with a cached tetrahedral decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposed {
    poly: Polyhedron,
    tets: Vec<[Point; 4]>,
}

impl Decomposed {
    pub fn new(poly: Polyhedron) -> Self {
        let tets = poly.tetrahedra();
        Self { poly, tets }
    }

    pub fn polyhedron(&self) -> &Polyhedron {
        &self.poly
    }
}

impl CutVolume for Decomposed {
    fn vertices(&self) -> &[Point] {
        self.poly.vertices()
    }

    fn volume(&self) -> f64 {
        self.tets.iter().map(|t| t.volume()).sum()
    }

    fn centroid(&self) -> Point {
        weighted_centroid(&self.tets).unwrap_or_else(|| self.poly.apex())
    }

    fn volume_below(&self, plane: &Plane) -> f64 {
        self.tets.iter().map(|t| t.volume_below(plane)).sum()
    }
}

fn weighted_centroid(tets: &[[Point; 4]]) -> Option<Point> {
    let mut total = 0.0;
    let mut acc = Vector::zero();
    for t in tets {
        let vol = t.volume();
        total += vol;
        acc += t.centroid().to_vector() * vol;
    }
    (total > 0.0).then(|| Point::default() + acc * (1.0 / total))
}

/// Shape of one mesh cell, tagged by family.
#[derive(Debug, Clone, PartialEq)]
pub enum CellShape {
    Tetrahedron([Point; 4]),
    /// Wedge with base `(0, 1, 2)` and top `(3, 4, 5)`.
    Prism([Point; 6]),
    /// Hexahedron, faces fanned around their centres (tolerates warped faces).
    Hexahedron(Decomposed),
    Polyhedron(Decomposed),
}

impl CellShape {
    pub fn hexahedron(pts: [Point; 8]) -> Self {
        Self::Hexahedron(Decomposed::new(Polyhedron::hexahedron(pts)))
    }

    pub fn polyhedron(poly: Polyhedron) -> Self {
        Self::Polyhedron(Decomposed::new(poly))
    }

    /// Axis-aligned box with its minimum corner at `origin`.
    pub fn from_box(x: f64, y: f64, z: f64, origin: Option<(f64, f64, f64)>) -> Self {
        Self::Hexahedron(Decomposed::new(Polyhedron::from_box(x, y, z, origin)))
    }

    /// Tetrahedral decomposition backing every volume query of the shape.
    pub fn tetrahedra(&self) -> Vec<[Point; 4]> {
        match self {
            Self::Tetrahedron(p) => vec![*p],
            Self::Prism(p) => prism_tetrahedra(p).to_vec(),
            Self::Hexahedron(d) | Self::Polyhedron(d) => d.tets.clone(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Tetrahedron(_) => "tetrahedron",
            Self::Prism(_) => "prism",
            Self::Hexahedron(_) => "hexahedron",
            Self::Polyhedron(_) => "polyhedron",
        }
    }

    fn family(&self) -> &dyn CutVolume {
        match self {
            Self::Tetrahedron(p) => p,
            Self::Prism(p) => p,
            Self::Hexahedron(d) | Self::Polyhedron(d) => d,
        }
    }
}

impl CutVolume for CellShape {
    fn vertices(&self) -> &[Point] {
        self.family().vertices()
    }

    fn volume(&self) -> f64 {
        self.family().volume()
    }

    fn centroid(&self) -> Point {
        self.family().centroid()
    }

    fn volume_below(&self, plane: &Plane) -> f64 {
        self.family().volume_below(plane)
    }
}
