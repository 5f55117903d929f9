use crate::Point;
use crate::geom::EPS;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Displacement, normal, area vector or velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Vector {
    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            dx: self.dy * other.dz - self.dz * other.dy,
            dy: self.dz * other.dx - self.dx * other.dz,
            dz: self.dx * other.dy - self.dy * other.dx,
        }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.dx * other.dx + self.dy * other.dy + self.dz * other.dz
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn is_close(&self, other: &Self) -> bool {
        (self.dx - other.dx).abs() < EPS
            && (self.dy - other.dy).abs() < EPS
            && (self.dz - other.dz).abs() < EPS
    }

    /// Unit vector in the same direction, `None` for (near) zero length.
    pub fn normalize(&self) -> Option<Self> {
        let len = self.length();
        (len >= EPS).then(|| *self * (1.0 / len))
    }

    /// Area vector of a planar (or mildly warped) polygon.
    ///
    /// Right-handed over the vertex order, with length equal to the area.
    /// Fanned around the vertex average, so the starting vertex does not
    /// matter.
    pub fn area_vector(pts: &[Point]) -> Self {
        if pts.len() < 3 {
            return Self::zero();
        }
        let c = Point::average(pts);
        let n = pts.len();
        let twice: Self = (0..n)
            .map(|i| (pts[i] - c).cross(&(pts[(i + 1) % n] - c)))
            .fold(Self::zero(), |acc, v| acc + v);
        twice * 0.5
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(3);
        write!(f, "[{:.prec$}, {:.prec$}, {:.prec$}]", self.dx, self.dy, self.dz)
    }
}

impl Add for Vector {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self::new(self.dx + o.dx, self.dy + o.dy, self.dz + o.dz)
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}

impl Sub for Vector {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        self + (-o)
    }
}

impl Neg for Vector {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.dx, -self.dy, -self.dz)
    }
}

impl Mul<f64> for Vector {
    type Output = Self;
    fn mul(self, s: f64) -> Self {
        Self::new(self.dx * s, self.dy * s, self.dz * s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_is_right_handed() {
        let ex = Vector::new(1., 0., 0.);
        let ey = Vector::new(0., 1., 0.);
        assert_eq!(ex.cross(&ey), Vector::new(0., 0., 1.));
        assert_eq!(ey.cross(&ex), Vector::new(0., 0., -1.));
        assert_eq!(ex.dot(&ey), 0.0);
    }

    #[test]
    fn test_normalize() {
        let n = Vector::new(0., -3., 4.).normalize().unwrap();
        assert!(n.is_close(&Vector::new(0., -0.6, 0.8)));
        assert!(Vector::new(1e-14, 0., 0.).normalize().is_none());
    }

    #[test]
    fn test_area_vector_follows_vertex_order() {
        let pts = [
            Point::new(0., 0., 0.),
            Point::new(2., 0., 0.),
            Point::new(2., 3., 0.),
            Point::new(0., 3., 0.),
        ];
        assert!(Vector::area_vector(&pts).is_close(&Vector::new(0., 0., 6.)));
        let rev: Vec<Point> = pts.iter().rev().copied().collect();
        assert!(Vector::area_vector(&rev).is_close(&Vector::new(0., 0., -6.)));
        // Rotating the start vertex gives the same result
        let rot = [pts[2], pts[3], pts[0], pts[1]];
        assert!(Vector::area_vector(&rot).is_close(&Vector::new(0., 0., 6.)));
        assert_eq!(Vector::area_vector(&pts[..2]), Vector::zero());
    }

    #[test]
    fn test_triangle_area_vector() {
        let tri = [
            Point::new(0., 0., 0.),
            Point::new(0., 1., 0.),
            Point::new(0., 0., 1.),
        ];
        assert!(Vector::area_vector(&tri).is_close(&Vector::new(0.5, 0., 0.)));
    }
}
