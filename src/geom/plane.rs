use crate::{Point, Vector};

/// Oriented plane through `origin` with unit `normal`.
///
/// The "below" side is the closed half-space the normal points away from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub origin: Point,
    pub normal: Vector,
}

impl Plane {
    /// Creates a plane. Returns `None` if the normal has (almost) zero length.
    pub fn new(origin: Point, normal: Vector) -> Option<Self> {
        normal.normalize().map(|normal| Self { origin, normal })
    }

    /// Plane with normal `normal` shifted by `offset` along it from `origin`.
    pub fn with_offset(origin: Point, normal: Vector, offset: f64) -> Option<Self> {
        let n = normal.normalize()?;
        Some(Self {
            origin: origin + n * offset,
            normal: n,
        })
    }

    /// Signed distance of `pt` from the plane, positive on the normal side.
    pub fn signed_distance(&self, pt: Point) -> f64 {
        (pt - self.origin).dot(&self.normal)
    }

    pub fn is_below(&self, pt: Point) -> bool {
        self.signed_distance(pt) <= 0.0
    }
}
