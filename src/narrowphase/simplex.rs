//! Simplex storage and the closest-point primitives GJK reduces with.
//!
//! The closest-point routines only use dot products, so one implementation
//! serves both dimensions.

use arrayvec::ArrayVec;

use crate::math::Dim;
use crate::shape::SupportMap;

/// Minkowski-difference points of a boolean GJK run (at most 3 in 2D, 4 in 3D).
pub type Simplex<D> = ArrayVec<<D as Dim>::Vector, 4>;

/// Support point of `A - B` together with the shape points that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportPoint<D: Dim> {
    pub point: D::Vector,
    pub a: D::Vector,
    pub b: D::Vector,
}

impl<D: Dim> SupportPoint<D> {
    /// Support of the Minkowski difference along `direction`.
    #[inline]
    pub fn new<A, B>(a: &A, b: &B, direction: D::Vector) -> Self
    where
        A: SupportMap<D> + ?Sized,
        B: SupportMap<D> + ?Sized,
    {
        let pa = a.support(direction);
        let pb = b.support(-direction);
        Self {
            point: pa - pb,
            a: pa,
            b: pb,
        }
    }
}

/// Minkowski difference support function.
#[inline]
pub fn minkowski_support<D, A, B>(a: &A, b: &B, direction: D::Vector) -> D::Vector
where
    D: Dim,
    A: SupportMap<D> + ?Sized,
    B: SupportMap<D> + ?Sized,
{
    a.support(direction) - b.support(-direction)
}

/// Closest point to `p` on segment `ab`, with barycentric weights for `a` and `b`.
pub fn closest_point_on_segment<D: Dim>(
    p: D::Vector,
    a: D::Vector,
    b: D::Vector,
) -> (D::Vector, [f32; 2]) {
    let ab = b - a;
    let denom = D::dot(ab, ab);
    if denom <= f32::EPSILON {
        return (a, [1.0, 0.0]);
    }
    let t = (D::dot(p - a, ab) / denom).clamp(0.0, 1.0);
    (a + ab * t, [1.0 - t, t])
}

/// Closest point to `p` on triangle `abc`, with barycentric weights.
///
/// Walks the vertex, edge and face Voronoi regions in turn. In 2D an interior
/// point is returned unchanged with all three weights positive.
pub fn closest_point_on_triangle<D: Dim>(
    p: D::Vector,
    a: D::Vector,
    b: D::Vector,
    c: D::Vector,
) -> (D::Vector, [f32; 3]) {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = D::dot(ab, ap);
    let d2 = D::dot(ac, ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (a, [1.0, 0.0, 0.0]);
    }

    let bp = p - b;
    let d3 = D::dot(ab, bp);
    let d4 = D::dot(ac, bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (b, [0.0, 1.0, 0.0]);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (a + ab * v, [1.0 - v, v, 0.0]);
    }

    let cp = p - c;
    let d5 = D::dot(ab, cp);
    let d6 = D::dot(ac, cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (c, [0.0, 0.0, 1.0]);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (a + ac * w, [1.0 - w, 0.0, w]);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * w, [0.0, 1.0 - w, w]);
    }

    let denom = va + vb + vc;
    if denom.abs() <= f32::EPSILON {
        // Degenerate triangle: fall back to the closest edge.
        let (p_ab, w_ab) = closest_point_on_segment::<D>(p, a, b);
        let (p_ac, w_ac) = closest_point_on_segment::<D>(p, a, c);
        return if D::length_squared(p_ab - p) <= D::length_squared(p_ac - p) {
            (p_ab, [w_ab[0], w_ab[1], 0.0])
        } else {
            (p_ac, [w_ac[0], 0.0, w_ac[1]])
        };
    }
    let v = vb / denom;
    let w = vc / denom;
    (a + ab * v + ac * w, [1.0 - v - w, v, w])
}

/// Closest point to `p` on tetrahedron `abcd`, or `None` when `p` is inside.
pub fn closest_point_on_tetrahedron<D: Dim>(
    p: D::Vector,
    vertices: [D::Vector; 4],
) -> Option<(D::Vector, [f32; 4])> {
    const FACES: [([usize; 3], usize); 4] = [([0, 1, 2], 3), ([0, 3, 1], 2), ([0, 2, 3], 1), ([1, 3, 2], 0)];

    let flat = D::signed_volume(&vertices).abs() <= 1e-9;
    let mut best: Option<(D::Vector, [f32; 4], f32)> = None;
    for (face, opposite) in FACES {
        let [i, j, k] = face;
        let (a, b, c) = (vertices[i], vertices[j], vertices[k]);
        let outside = flat || {
            let side_p = D::signed_volume(&[a, b, c, p]);
            let side_d = D::signed_volume(&[a, b, c, vertices[opposite]]);
            side_p * side_d < 0.0
        };
        if !outside {
            continue;
        }
        let (q, w) = closest_point_on_triangle::<D>(p, a, b, c);
        let dist = D::length_squared(q - p);
        if best.map_or(true, |(_, _, d)| dist < d) {
            let mut weights = [0.0; 4];
            weights[i] = w[0];
            weights[j] = w[1];
            weights[k] = w[2];
            best = Some((q, weights, dist));
        }
    }
    best.map(|(q, w, _)| (q, w))
}
