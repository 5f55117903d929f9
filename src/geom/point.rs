use crate::Vector;
use std::fmt;
use std::ops::{Add, Sub};

/// Mesh vertex or sample location.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Coordinate-wise comparison within `EPS`.
    pub fn is_close(&self, other: &Self) -> bool {
        (*self - *other).is_close(&Vector::zero())
    }

    /// Point at `t` along `a -> b` (`t = 0` gives `a`, `t = 1` gives `b`).
    pub fn lerp(a: Self, b: Self, t: f64) -> Self {
        a + (b - a) * t
    }

    /// Vertex average. The origin for an empty slice.
    pub fn average(pts: &[Self]) -> Self {
        if pts.is_empty() {
            return Self::default();
        }
        let sum = pts.iter().fold(Vector::zero(), |acc, p| acc + p.to_vector());
        Self::default() + sum * (1.0 / pts.len() as f64)
    }

    /// Position vector from the origin.
    pub fn to_vector(self) -> Vector {
        Vector::new(self.x, self.y, self.z)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(3);
        write!(f, "({:.prec$}, {:.prec$}, {:.prec$})", self.x, self.y, self.z)
    }
}

impl Add<Vector> for Point {
    type Output = Point;
    fn add(self, v: Vector) -> Self {
        Self::new(self.x + v.dx, self.y + v.dy, self.z + v.dz)
    }
}

impl Sub<Vector> for Point {
    type Output = Point;
    fn sub(self, v: Vector) -> Self {
        self + (-v)
    }
}

/// `a - b` is the vector from `b` to `a`.
impl Sub for Point {
    type Output = Vector;
    fn sub(self, other: Self) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_along_edge() {
        let a = Point::new(0., 0., 0.);
        let b = Point::new(2., -4., 1.);
        assert!(Point::lerp(a, b, 0.25).is_close(&Point::new(0.5, -1., 0.25)));
        assert_eq!(Point::lerp(a, b, 0.0), a);
        assert_eq!(Point::lerp(a, b, 1.0), b);
    }

    #[test]
    fn test_face_vertex_average() {
        let quad = [
            Point::new(0., 0., 1.),
            Point::new(2., 0., 1.),
            Point::new(2., 2., 1.),
            Point::new(0., 2., 1.),
        ];
        assert!(Point::average(&quad).is_close(&Point::new(1., 1., 1.)));
        assert_eq!(Point::average(&[]), Point::default());
    }

    #[test]
    fn test_point_vector_arithmetic() {
        let a = Point::new(1., 2., 3.);
        let b = Point::new(0., 0., 1.);
        let v = a - b;
        assert_eq!(v, Vector::new(1., 2., 2.));
        assert_eq!(b + v, a);
        assert_eq!(a - v, b);
        assert_eq!(a.to_vector(), Vector::new(1., 2., 3.));
        assert!(!a.is_close(&Point::new(1., 2., 3.0001)));
        assert_eq!(format!("{:.1}", a), "(1.0, 2.0, 3.0)");
    }
}
