use crate::Point;
use crate::geom::plane::Plane;

/// Signed volume, positive when `pt3` lies on the side of `(pt0, pt1, pt2)`
/// that their right-hand normal points to.
pub fn signed_tetrahedron_volume(pt0: Point, pt1: Point, pt2: Point, pt3: Point) -> f64 {
    let a = pt1 - pt0;
    let b = pt2 - pt0;
    let c = pt3 - pt0;
    a.cross(&b).dot(&c) / 6.
}

/// Calculates volume from the scalar triple product.
///
/// Edges are taken relative to `pt0`, so callers should pass the vertex
/// closest to the others (e.g. a cell centre) first for the best accuracy.
pub fn tetrahedron_volume(pt0: Point, pt1: Point, pt2: Point, pt3: Point) -> f64 {
    signed_tetrahedron_volume(pt0, pt1, pt2, pt3).abs()
}

/// Returns tetrahedron centroid (i.e. average of each vertices)
pub fn tetrahedron_centroid(pt0: Point, pt1: Point, pt2: Point, pt3: Point) -> Point {
    let x = (pt0.x + pt1.x + pt2.x + pt3.x) / 4.;
    let y = (pt0.y + pt1.y + pt2.y + pt3.y) / 4.;
    let z = (pt0.z + pt1.z + pt2.z + pt3.z) / 4.;
    Point::new(x, y, z)
}

/// Volume of the part of a tetrahedron on the "below" side of `plane`.
///
/// Closed form on the vertex distances: the single-vertex cases scale the
/// full volume by the three edge ratios, the two-two case is split into a
/// wedge of three tetrahedra. Vertices exactly on the plane count as below.
pub fn tetrahedron_volume_below(pts: &[Point; 4], plane: &Plane) -> f64 {
    let d = pts.map(|p| plane.signed_distance(p));
    tetrahedron_volume_where_negative(pts, &d)
}

/// Volume of the region where a field, linear over the tetrahedron and equal
/// to `d[i]` at vertex `i`, is `<= 0`.
pub fn tetrahedron_volume_where_negative(pts: &[Point; 4], d: &[f64; 4]) -> f64 {
    let mut below = [0usize; 4];
    let mut above = [0usize; 4];
    let (mut nb, mut na) = (0, 0);
    for (i, di) in d.iter().enumerate() {
        if *di <= 0.0 {
            below[nb] = i;
            nb += 1;
        } else {
            above[na] = i;
            na += 1;
        }
    }

    let full = tetrahedron_volume(pts[0], pts[1], pts[2], pts[3]);
    match nb {
        0 => 0.0,
        4 => full,
        1 => corner_volume(full, d, below[0]),
        3 => (full - corner_volume(full, d, above[0])).max(0.0),
        _ => {
            let (a, b) = (below[0], below[1]);
            let (c, e) = (above[0], above[1]);
            let p_ac = edge_point(pts, d, a, c);
            let p_ae = edge_point(pts, d, a, e);
            let p_bc = edge_point(pts, d, b, c);
            let p_be = edge_point(pts, d, b, e);
            // Wedge with ends (a, p_ac, p_ae) and (b, p_bc, p_be)
            let v = tetrahedron_volume(pts[a], p_ac, p_ae, pts[b])
                + tetrahedron_volume(p_ac, p_ae, pts[b], p_bc)
                + tetrahedron_volume(p_ae, pts[b], p_bc, p_be);
            v.min(full)
        }
    }
}

/// Volume of the corner tetrahedron cut off around vertex `k`, which is alone
/// on its side of the plane.
fn corner_volume(full: f64, d: &[f64; 4], k: usize) -> f64 {
    let mut scale = 1.0;
    for (i, di) in d.iter().enumerate() {
        if i != k {
            scale *= d[k] / (d[k] - di);
        }
    }
    full * scale
}

/// Intersection of edge `i -> j` with the plane; `d[i]` and `d[j]` straddle it.
fn edge_point(pts: &[Point; 4], d: &[f64; 4], i: usize, j: usize) -> Point {
    let t = d[i] / (d[i] - d[j]);
    Point::lerp(pts[i], pts[j], t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vector;

    fn unit_tet() -> [Point; 4] {
        [
            Point::new(0., 0., 0.),
            Point::new(1., 0., 0.),
            Point::new(0., 1., 0.),
            Point::new(0., 0., 1.),
        ]
    }

    #[test]
    fn test_volume_and_sign() {
        let [p0, p1, p2, p3] = unit_tet();
        assert!((tetrahedron_volume(p0, p1, p2, p3) - 1. / 6.).abs() < 1e-15);
        assert!(signed_tetrahedron_volume(p0, p1, p2, p3) > 0.0);
        assert!(signed_tetrahedron_volume(p0, p2, p1, p3) < 0.0);
    }

    #[test]
    fn test_centroid() {
        let [p0, p1, p2, p3] = unit_tet();
        let c = tetrahedron_centroid(p0, p1, p2, p3);
        assert!(c.is_close(&Point::new(0.25, 0.25, 0.25)));
    }

    #[test]
    fn test_volume_below_single_vertex() {
        // z <= 0.5 keeps everything except the top corner (scaled by 0.5^3)
        let tet = unit_tet();
        let plane = Plane::new(Point::new(0., 0., 0.5), Vector::new(0., 0., 1.)).unwrap();
        let v = tetrahedron_volume_below(&tet, &plane);
        assert!((v - (1. / 6.) * (1. - 0.125)).abs() < 1e-14, "v={v}");

        let flipped = Plane::new(Point::new(0., 0., 0.5), Vector::new(0., 0., -1.)).unwrap();
        let v_top = tetrahedron_volume_below(&tet, &flipped);
        assert!((v_top - (1. / 6.) * 0.125).abs() < 1e-14, "v_top={v_top}");
    }

    #[test]
    fn test_volume_below_two_two_split() {
        // {x + y <= 0.5} inside the unit tet: int_0^0.5 (1 - s) s ds = 1/12
        let tet = unit_tet();
        let plane = Plane::new(Point::new(0.25, 0.25, 0.), Vector::new(1., 1., 0.)).unwrap();
        let v = tetrahedron_volume_below(&tet, &plane);
        assert!((v - 1. / 12.).abs() < 1e-14, "v={v}");
    }

    #[test]
    fn test_volume_below_two_two_split_is_complementary() {
        let tet = unit_tet();
        let n = Vector::new(1., 1., -1.);
        for s in [-0.3, -0.1, 0.0, 0.2, 0.4] {
            let p = Plane::with_offset(Point::new(0.25, 0.25, 0.25), n, s).unwrap();
            let q = Plane::with_offset(Point::new(0.25, 0.25, 0.25), -n, -s).unwrap();
            let sum = tetrahedron_volume_below(&tet, &p) + tetrahedron_volume_below(&tet, &q);
            assert!((sum - 1. / 6.).abs() < 1e-14, "s={s}, sum={sum}");
        }
    }

    #[test]
    fn test_volume_where_negative_linear_field() {
        // f = x - 0.5 is linear, so the result equals the plane cut x <= 0.5
        let tet = unit_tet();
        let d = tet.map(|p| p.x - 0.5);
        let v = tetrahedron_volume_where_negative(&tet, &d);
        assert!((v - (1. / 6.) * (1. - 0.125)).abs() < 1e-14, "v={v}");
    }

    #[test]
    fn test_volume_below_extremes() {
        let tet = unit_tet();
        let n = Vector::new(0.3, -0.2, 0.9);
        let low = Plane::with_offset(Point::new(0., 0., 0.), n, -10.).unwrap();
        let high = Plane::with_offset(Point::new(0., 0., 0.), n, 10.).unwrap();
        assert_eq!(tetrahedron_volume_below(&tet, &low), 0.0);
        assert!((tetrahedron_volume_below(&tet, &high) - 1. / 6.).abs() < 1e-15);
    }
}
