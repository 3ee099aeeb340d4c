//! GJK: a dimension-generic overlap test and distance query sharing one
//! Johnson-style simplex reduction.

use arrayvec::ArrayVec;

use crate::contact::Separation;
use crate::math::{Dim, Dim2, Dim3, DIRECTION_EPSILON};
use crate::shape::{Ball, SupportMap};

use super::simplex::{
    closest_point_on_segment, closest_point_on_tetrahedron, closest_point_on_triangle, Simplex,
    SupportPoint,
};

/// Safety cap on simplex evolution; runs normally end after a handful of steps.
const MAX_ITERATIONS: usize = 64;
/// Relative progress below which the distance query stops.
const RELATIVE_TOLERANCE: f32 = 1e-6;
/// Gaps below this count as touching; the distance query cannot resolve them.
const TOUCH_TOLERANCE: f32 = 1e-5;

fn initial_direction<D: Dim>(a: D::Vector, b: D::Vector) -> D::Vector {
    let d = a - b;
    if D::length_squared(d) < DIRECTION_EPSILON {
        D::unit_x()
    } else {
        d
    }
}

/// GJK intersection test: the simplex enclosing the origin of `A - B`, or
/// `None` when the shapes are apart.
///
/// Each iteration adds the support point against the current closest point
/// and keeps only the simplex features that support it, the same reduction
/// [`distance`] uses. The simplex may hold fewer than `DIM + 1` points when
/// the origin lies on its boundary (touching shapes); EPA completes it.
pub fn intersect<D, A, B>(a: &A, b: &B) -> Option<Simplex<D>>
where
    D: Dim,
    A: SupportMap<D> + ?Sized,
    B: SupportMap<D> + ?Sized,
{
    let mut v = initial_direction::<D>(a.center(), b.center());
    let mut simplex: ArrayVec<SupportPoint<D>, 4> = ArrayVec::new();

    for _ in 0..MAX_ITERATIONS {
        let w = SupportPoint::<D>::new(a, b, -v);
        if D::dot(w.point, v) > TOUCH_TOLERANCE * D::length(v) {
            // `-v` separates the origin from the Minkowski difference.
            return None;
        }
        let stalled = simplex
            .iter()
            .any(|s| D::length_squared(s.point - w.point) < DIRECTION_EPSILON);
        if stalled || simplex.is_full() {
            return Some(points(&simplex));
        }
        simplex.push(w);

        match evolve::<D>(&mut simplex) {
            None => return Some(points(&simplex)),
            Some((closest, _)) => v = closest,
        }
        if D::length_squared(v) < DIRECTION_EPSILON {
            return Some(points(&simplex));
        }
    }
    None
}

fn points<D: Dim>(simplex: &[SupportPoint<D>]) -> Simplex<D> {
    simplex.iter().map(|s| s.point).collect()
}

/// [`intersect`] in 3D.
pub fn intersect_3d<A, B>(a: &A, b: &B) -> Option<Simplex<Dim3>>
where
    A: SupportMap<Dim3> + ?Sized,
    B: SupportMap<Dim3> + ?Sized,
{
    intersect::<Dim3, A, B>(a, b)
}

/// [`intersect`] in 2D.
pub fn intersect_2d<A, B>(a: &A, b: &B) -> Option<Simplex<Dim2>>
where
    A: SupportMap<Dim2> + ?Sized,
    B: SupportMap<Dim2> + ?Sized,
{
    intersect::<Dim2, A, B>(a, b)
}

/// Shrink `simplex` to the vertices supporting its closest point to the
/// origin. Returns that point and the surviving weights, or `None` when the
/// simplex encloses the origin.
fn evolve<D: Dim>(simplex: &mut ArrayVec<SupportPoint<D>, 4>) -> Option<(D::Vector, ArrayVec<f32, 4>)> {
    let (closest, lambdas) = reduce::<D>(simplex)?;
    let mut index = 0;
    simplex.retain(|_| {
        let keep = lambdas[index] > 0.0;
        index += 1;
        keep
    });
    let weights = lambdas.iter().copied().filter(|&l| l > 0.0).collect();
    Some((closest, weights))
}

/// Result of a GJK distance query between separated shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance<D: Dim> {
    /// Unit normal from A toward B, with `depth = -gap`.
    pub separation: Separation<D>,
    /// Closest point on A.
    pub point_a: D::Vector,
    /// Closest point on B.
    pub point_b: D::Vector,
}

impl<D: Dim> Distance<D> {
    pub fn gap(&self) -> f32 {
        -self.separation.depth
    }
}

/// Closest points between two convex shapes, or `None` if they overlap or touch.
///
/// Johnson-style sub-simplex reduction: each iteration adds the support point
/// of `A - B` against the current closest point and keeps only the simplex
/// features that support the new closest point.
pub fn distance<D, A, B>(a: &A, b: &B) -> Option<Distance<D>>
where
    D: Dim,
    A: SupportMap<D> + ?Sized,
    B: SupportMap<D> + ?Sized,
{
    let mut v = initial_direction::<D>(a.center(), b.center());
    let mut simplex: ArrayVec<SupportPoint<D>, 4> = ArrayVec::new();
    let mut weights: ArrayVec<f32, 4> = ArrayVec::new();

    for _ in 0..MAX_ITERATIONS {
        let w = SupportPoint::<D>::new(a, b, -v);
        if !simplex.is_empty() {
            let v2 = D::length_squared(v);
            let duplicate = simplex
                .iter()
                .any(|s| D::length_squared(s.point - w.point) < DIRECTION_EPSILON);
            if duplicate || v2 - D::dot(v, w.point) <= RELATIVE_TOLERANCE * v2 {
                break;
            }
        }
        if simplex.is_full() {
            break;
        }
        simplex.push(w);

        let (closest, surviving) = evolve::<D>(&mut simplex)?;
        v = closest;
        weights = surviving;

        if D::length_squared(v) < DIRECTION_EPSILON {
            return None;
        }
    }

    if simplex.is_empty() {
        return None;
    }
    let mut point_a = D::zero();
    let mut point_b = D::zero();
    for (s, &l) in simplex.iter().zip(weights.iter()) {
        point_a += s.a * l;
        point_b += s.b * l;
    }
    let gap = D::length(point_a - point_b);
    if gap < TOUCH_TOLERANCE {
        return None;
    }
    Some(Distance {
        separation: Separation::new((point_b - point_a) * (1.0 / gap), -gap),
        point_a,
        point_b,
    })
}

/// Closest point of the simplex to the origin and the weight of every vertex.
/// `None` means the simplex encloses the origin.
fn reduce<D: Dim>(simplex: &[SupportPoint<D>]) -> Option<(D::Vector, [f32; 4])> {
    let origin = D::zero();
    match simplex {
        [p] => Some((p.point, [1.0, 0.0, 0.0, 0.0])),
        [p, q] => {
            let (c, w) = closest_point_on_segment::<D>(origin, p.point, q.point);
            Some((c, [w[0], w[1], 0.0, 0.0]))
        }
        [p, q, r] => {
            let (c, w) = closest_point_on_triangle::<D>(origin, p.point, q.point, r.point);
            if D::DIM == 2 && w.iter().all(|&x| x > 0.0) {
                return None;
            }
            Some((c, [w[0], w[1], w[2], 0.0]))
        }
        [p, q, r, s] => closest_point_on_tetrahedron::<D>(
            origin,
            [p.point, q.point, r.point, s.point],
        ),
        _ => None,
    }
}

/// Closest point on `shape` to `point`, or `None` when the point is inside.
pub fn closest_point<D, S>(shape: &S, point: D::Vector) -> Option<D::Vector>
where
    D: Dim,
    S: SupportMap<D> + ?Sized,
{
    let probe = Ball::<D> {
        center: point,
        radius: 0.0,
    };
    distance::<D, S, Ball<D>>(shape, &probe).map(|d| d.point_a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Transform2, Transform3};
    use crate::shape::{ConvexPolygon, ConvexPolyhedron, WorldPolygon, WorldPolyhedron};
    use glam::{Vec2, Vec3};

    fn cube_at(hull: &ConvexPolyhedron, position: Vec3) -> WorldPolyhedron<'_> {
        WorldPolyhedron::new(hull, &Transform3::from_position(position))
    }

    #[test]
    fn test_gjk_overlapping_spheres() {
        let a = Ball::<Dim3> {
            center: Vec3::ZERO,
            radius: 1.0,
        };
        let b = Ball::<Dim3> {
            center: Vec3::new(1.5, 0.0, 0.0),
            radius: 1.0,
        };
        assert!(intersect_3d(&a, &b).is_some());
    }

    #[test]
    fn test_gjk_separated_spheres() {
        let a = Ball::<Dim3> {
            center: Vec3::ZERO,
            radius: 1.0,
        };
        let b = Ball::<Dim3> {
            center: Vec3::new(5.0, 0.0, 0.0),
            radius: 1.0,
        };
        assert!(intersect_3d(&a, &b).is_none());
    }

    #[test]
    fn test_gjk_boxes() {
        let hull = ConvexPolyhedron::cuboid(Vec3::splat(0.5));
        let a = cube_at(&hull, Vec3::ZERO);
        let overlapping = cube_at(&hull, Vec3::new(0.8, 0.3, 0.1));
        let apart = cube_at(&hull, Vec3::new(1.2, 0.0, 0.0));
        let simplex = intersect_3d(&a, &overlapping).unwrap();
        assert_eq!(simplex.len(), 4);
        assert!(intersect_3d(&a, &apart).is_none());
    }

    #[test]
    fn test_gjk_2d_polygons() {
        let rect = ConvexPolygon::rectangle(Vec2::splat(0.5));
        let a = WorldPolygon::new(&rect, &Transform2::identity());
        let b = WorldPolygon::new(
            &rect,
            &Transform2::from_position_rotation(Vec2::new(0.9, 0.2), 0.3),
        );
        let c = WorldPolygon::new(&rect, &Transform2::from_position(Vec2::new(3.0, 0.0)));
        assert_eq!(intersect_2d(&a, &b).map(|s| s.len()), Some(3));
        assert!(intersect_2d(&a, &c).is_none());
    }

    #[test]
    fn test_overlap_agrees_with_distance_along_sweep() {
        let hull = ConvexPolyhedron::cuboid(Vec3::splat(0.5));
        let a = cube_at(&hull, Vec3::ZERO);
        let rotation = glam::Quat::from_rotation_y(0.4) * glam::Quat::from_rotation_z(0.3);
        for i in 0..40 {
            let x = 0.5 + i as f32 * 0.05;
            let placement = Transform3::from_position_rotation(Vec3::new(x, 0.2, 0.1), rotation);
            let b = WorldPolyhedron::new(&hull, &placement);
            let overlaps = intersect_3d(&a, &b).is_some();
            let apart = distance::<Dim3, _, _>(&a, &b).is_some_and(|d| d.gap() > 1e-3);
            assert!(!(overlaps && apart), "x = {} reported both overlapping and apart", x);
        }
        // The sweep starts overlapping and ends apart.
        let near = cube_at(&hull, Vec3::new(0.5, 0.2, 0.1));
        let far = cube_at(&hull, Vec3::new(2.5, 0.2, 0.1));
        assert!(intersect_3d(&a, &near).is_some());
        assert!(intersect_3d(&a, &far).is_none());
    }

    #[test]
    fn test_hairline_gap_counts_as_touching() {
        let ground = ConvexPolyhedron::cuboid(Vec3::new(5.0, 0.5, 5.0));
        let cube = ConvexPolyhedron::cuboid(Vec3::splat(0.5));
        let a = cube_at(&ground, Vec3::new(0.0, -0.5, 0.0));
        // Too close for the distance query to give a reliable normal.
        let b = cube_at(&cube, Vec3::new(0.0, 0.5 + 2e-6, 0.0));
        assert!(intersect_3d(&a, &b).is_some());
        assert!(distance::<Dim3, _, _>(&a, &b).is_none());

        let apart = cube_at(&cube, Vec3::new(0.0, 0.5 + 1e-3, 0.0));
        assert!(intersect_3d(&a, &apart).is_none());
        let gap = distance::<Dim3, _, _>(&a, &apart).unwrap().gap();
        assert!((gap - 1e-3).abs() < 1e-5);
    }

    #[test]
    fn test_generic_overlap_in_both_dimensions() {
        let ball2 = |x: f32| Ball::<Dim2> {
            center: Vec2::new(x, 0.0),
            radius: 1.0,
        };
        let origin2 = ball2(0.0);
        assert!(intersect::<Dim2, _, _>(&origin2, &ball2(1.9)).is_some());
        assert!(intersect::<Dim2, _, _>(&origin2, &ball2(2.1)).is_none());

        let ball3 = |x: f32| Ball::<Dim3> {
            center: Vec3::new(x, 0.3, -0.2),
            radius: 1.0,
        };
        let origin3 = ball3(0.0);
        assert!(intersect::<Dim3, _, _>(&origin3, &ball3(1.9)).is_some());
        assert!(intersect::<Dim3, _, _>(&origin3, &ball3(2.1)).is_none());
    }

    #[test]
    fn test_distance_between_boxes() {
        let hull = ConvexPolyhedron::cuboid(Vec3::splat(0.5));
        let a = cube_at(&hull, Vec3::ZERO);
        let b = cube_at(&hull, Vec3::new(2.0, 0.0, 0.0));
        let result = distance::<Dim3, _, _>(&a, &b).unwrap();
        assert!((result.gap() - 1.0).abs() < 1e-4);
        assert!((result.separation.normal - Vec3::X).length() < 1e-4);
        assert!((result.point_a.x - 0.5).abs() < 1e-4);
        assert!((result.point_b.x - 1.5).abs() < 1e-4);
        assert!(distance::<Dim3, _, _>(&a, &cube_at(&hull, Vec3::new(0.5, 0.0, 0.0))).is_none());
    }

    #[test]
    fn test_distance_sphere_to_rotated_box_corner() {
        let hull = ConvexPolyhedron::cuboid(Vec3::splat(0.5));
        let cube = cube_at(&hull, Vec3::ZERO);
        let ball = Ball::<Dim3> {
            center: Vec3::splat(2.0),
            radius: 0.5,
        };
        let result = distance::<Dim3, _, _>(&cube, &ball).unwrap();
        let expected = (Vec3::splat(2.0) - Vec3::splat(0.5)).length() - 0.5;
        assert!((result.gap() - expected).abs() < 1e-3);
    }

    #[test]
    fn test_closest_point_on_polygon() {
        let rect = ConvexPolygon::rectangle(Vec2::ONE);
        let world = WorldPolygon::new(&rect, &Transform2::identity());
        let p = closest_point::<Dim2, _>(&world, Vec2::new(3.0, 0.5)).unwrap();
        assert!((p - Vec2::new(1.0, 0.5)).length() < 1e-4);
        assert!(closest_point::<Dim2, _>(&world, Vec2::ZERO).is_none());
    }
}
