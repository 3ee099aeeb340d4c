//! Per-pair contact generation.
//!
//! Every pair of world-space shapes is routed to the cheapest routine that
//! handles it: closed-form tests for balls and capsules, vertex scans against
//! half-spaces, and GJK/EPA or SAT followed by clipping for polytopes. All
//! manifolds use a normal pointing from the first shape to the second.

use glam::Vec3;
use tracing::debug;

use crate::config::{PhysicsConfig, PolytopeAlgorithm};
use crate::contact::{ContactPoint, FeatureId, Manifold, Separation};
use crate::error::Result;
use crate::math::{Dim, Dim2, Dim3, Plane, EPSILON};
use crate::shape::{Ball, SupportMap, WorldCapsule, WorldPolygon, WorldPolyhedron, WorldShape2, WorldShape3};

use super::clip;
use super::epa::{self, EpaSettings};
use super::gjk;
use super::simplex::closest_point_on_segment;

impl<D: Dim> From<&PhysicsConfig<D>> for EpaSettings {
    fn from(config: &PhysicsConfig<D>) -> Self {
        Self {
            max_iterations: config.epa_max_iterations,
            tolerance: config.epa_tolerance,
        }
    }
}

/// GJK overlap test plus EPA, per dimension.
pub trait Penetration: Dim {
    /// `None` when the shapes do not overlap, `Some(Err)` when EPA fails.
    fn penetration<A, B>(a: &A, b: &B, settings: EpaSettings) -> Option<Result<Separation<Self>>>
    where
        A: SupportMap<Self> + ?Sized,
        B: SupportMap<Self> + ?Sized;
}

impl Penetration for Dim2 {
    fn penetration<A, B>(a: &A, b: &B, settings: EpaSettings) -> Option<Result<Separation<Dim2>>>
    where
        A: SupportMap<Dim2> + ?Sized,
        B: SupportMap<Dim2> + ?Sized,
    {
        let simplex = gjk::intersect_2d(a, b)?;
        Some(epa::penetration_2d(&simplex, a, b, settings))
    }
}

impl Penetration for Dim3 {
    fn penetration<A, B>(a: &A, b: &B, settings: EpaSettings) -> Option<Result<Separation<Dim3>>>
    where
        A: SupportMap<Dim3> + ?Sized,
        B: SupportMap<Dim3> + ?Sized,
    {
        let simplex = gjk::intersect_3d(a, b)?;
        Some(epa::penetration_3d(&simplex, a, b, settings))
    }
}

/// Contacts between two 3D shapes.
pub fn detect_contacts_3d(
    a: &WorldShape3<'_>,
    b: &WorldShape3<'_>,
    config: &PhysicsConfig<Dim3>,
) -> Manifold<Dim3> {
    use WorldShape3::*;

    let margin = config.contact_margin;
    match (a, b) {
        (HalfSpace(_), HalfSpace(_)) => Manifold::new(),
        (HalfSpace(plane), other) => half_space(plane, other, margin),
        (other, HalfSpace(plane)) => flipped(half_space(plane, other, margin)),
        (Sphere(x), Sphere(y)) => balls(x, y, margin),
        (Sphere(ball), Capsule(capsule)) => ball_capsule(ball, capsule, margin),
        (Capsule(capsule), Sphere(ball)) => flipped(ball_capsule(ball, capsule, margin)),
        (Capsule(x), Capsule(y)) => capsules(x, y, margin),
        (Sphere(ball), Polyhedron(poly)) => ball_convex(ball, poly, config),
        (Polyhedron(poly), Sphere(ball)) => flipped(ball_convex(ball, poly, config)),
        (Polyhedron(poly), Capsule(capsule)) => polyhedron_capsule(poly, capsule, config),
        (Capsule(capsule), Polyhedron(poly)) => flipped(polyhedron_capsule(poly, capsule, config)),
        (Polyhedron(x), Polyhedron(y)) => polyhedra(x, y, config),
    }
}

/// Contacts between two 2D shapes.
pub fn detect_contacts_2d(
    a: &WorldShape2<'_>,
    b: &WorldShape2<'_>,
    config: &PhysicsConfig<Dim2>,
) -> Manifold<Dim2> {
    use WorldShape2::*;

    let margin = config.contact_margin;
    match (a, b) {
        (HalfPlane(_), HalfPlane(_)) => Manifold::new(),
        (HalfPlane(plane), other) => half_plane(plane, other, margin),
        (other, HalfPlane(plane)) => flipped(half_plane(plane, other, margin)),
        (Circle(x), Circle(y)) => balls(x, y, margin),
        (Circle(ball), Polygon(poly)) => ball_convex(ball, poly, config),
        (Polygon(poly), Circle(ball)) => flipped(ball_convex(ball, poly, config)),
        (Polygon(x), Polygon(y)) => polygons(x, y, config),
    }
}

fn flipped<D: Dim>(mut manifold: Manifold<D>) -> Manifold<D> {
    manifold.flip();
    manifold
}

/// Circle-circle or sphere-sphere. Coincident centers separate along +Y.
pub fn balls<D: Dim>(a: &Ball<D>, b: &Ball<D>, margin: f32) -> Manifold<D> {
    let delta = b.center - a.center;
    let distance = D::length(delta);
    let separation = distance - a.radius - b.radius;
    if separation > margin {
        return Manifold::new();
    }
    let normal = if distance > EPSILON {
        delta * (1.0 / distance)
    } else {
        D::up()
    };
    let on_a = a.center + normal * a.radius;
    let on_b = b.center - normal * b.radius;
    Manifold::single(ContactPoint::new(
        (on_a + on_b) * 0.5,
        normal,
        separation,
        FeatureId::SINGLE,
    ))
}

fn ball_capsule(ball: &Ball<Dim3>, capsule: &WorldCapsule, margin: f32) -> Manifold<Dim3> {
    let (closest, _) = closest_point_on_segment::<Dim3>(ball.center, capsule.a, capsule.b);
    let core = Ball::<Dim3> {
        center: closest,
        radius: capsule.radius,
    };
    balls(ball, &core, margin)
}

fn capsules(a: &WorldCapsule, b: &WorldCapsule, margin: f32) -> Manifold<Dim3> {
    let (p, q) = closest_points_between_segments(a.a, a.b, b.a, b.b);
    balls(
        &Ball::<Dim3> {
            center: p,
            radius: a.radius,
        },
        &Ball::<Dim3> {
            center: q,
            radius: b.radius,
        },
        margin,
    )
}

/// Closest points between segments `p1 q1` and `p2 q2`.
pub fn closest_points_between_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a <= f32::EPSILON && e <= f32::EPSILON {
        return (p1, p2);
    }
    let (s, t) = if a <= f32::EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= f32::EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s = if denom > f32::EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };
    (p1 + d1 * s, p2 + d2 * t)
}

/// Collect contacts of `points` (with per-point radius) against a plane and
/// keep the deepest ones.
fn against_plane<D: Dim>(
    plane: &Plane<D>,
    points: impl IntoIterator<Item = (D::Vector, f32)>,
    margin: f32,
) -> Manifold<D> {
    let contacts = points
        .into_iter()
        .enumerate()
        .filter_map(|(index, (point, radius))| {
            let separation = plane.signed_distance(point) - radius;
            (separation <= margin).then(|| {
                ContactPoint::new(
                    plane.project(point),
                    plane.normal,
                    separation,
                    FeatureId::new(0, index as u32),
                )
            })
        })
        .collect();
    Manifold::from_deepest(contacts)
}

fn half_space(plane: &Plane<Dim3>, other: &WorldShape3<'_>, margin: f32) -> Manifold<Dim3> {
    match other {
        WorldShape3::Sphere(ball) => against_plane(plane, [(ball.center, ball.radius)], margin),
        WorldShape3::Capsule(capsule) => against_plane(
            plane,
            [(capsule.a, capsule.radius), (capsule.b, capsule.radius)],
            margin,
        ),
        WorldShape3::Polyhedron(poly) => {
            against_plane(plane, poly.vertices.iter().map(|&v| (v, 0.0)), margin)
        }
        WorldShape3::HalfSpace(_) => Manifold::new(),
    }
}

fn half_plane(plane: &Plane<Dim2>, other: &WorldShape2<'_>, margin: f32) -> Manifold<Dim2> {
    match other {
        WorldShape2::Circle(ball) => against_plane(plane, [(ball.center, ball.radius)], margin),
        WorldShape2::Polygon(poly) => {
            against_plane(plane, poly.vertices.iter().map(|&v| (v, 0.0)), margin)
        }
        WorldShape2::HalfPlane(_) => Manifold::new(),
    }
}

/// Ball against a convex polytope, normal from the ball.
///
/// While the center is outside the polytope the closest point comes from GJK
/// distance; once it sinks inside, EPA against the bare center gives the exit.
fn ball_convex<D, S>(ball: &Ball<D>, shape: &S, config: &PhysicsConfig<D>) -> Manifold<D>
where
    D: Penetration,
    S: SupportMap<D> + ?Sized,
{
    let core = Ball::<D> {
        center: ball.center,
        radius: 0.0,
    };
    let (normal, separation) = match gjk::distance::<D, Ball<D>, S>(&core, shape) {
        Some(distance) => (distance.separation.normal, distance.gap() - ball.radius),
        None => match D::penetration(&core, shape, EpaSettings::from(config)) {
            Some(Ok(sep)) => (sep.normal, -sep.depth - ball.radius),
            Some(Err(err)) => {
                debug!(%err, "ball contact dropped");
                return Manifold::new();
            }
            None => return Manifold::new(),
        },
    };
    if separation > config.contact_margin {
        return Manifold::new();
    }
    let on_ball = ball.center + normal * ball.radius;
    let on_shape = on_ball + normal * separation;
    Manifold::single(ContactPoint::new(
        (on_ball + on_shape) * 0.5,
        normal,
        separation,
        FeatureId::SINGLE,
    ))
}

/// Separating axis of two overlapping shapes via GJK/EPA, or the closest-point
/// axis of shapes within `margin` of each other.
pub fn penetration_or_gap<D, A, B>(a: &A, b: &B, config: &PhysicsConfig<D>) -> Option<Separation<D>>
where
    D: Penetration,
    A: SupportMap<D> + ?Sized,
    B: SupportMap<D> + ?Sized,
{
    match D::penetration(a, b, EpaSettings::from(config)) {
        Some(Ok(sep)) => Some(sep),
        Some(Err(err)) => {
            debug!(%err, "EPA failed, pair skipped this step");
            None
        }
        None => speculative(a, b, config.contact_margin),
    }
}

/// Closest-point axis of separated shapes no farther apart than `margin`.
pub fn speculative<D, A, B>(a: &A, b: &B, margin: f32) -> Option<Separation<D>>
where
    D: Dim,
    A: SupportMap<D> + ?Sized,
    B: SupportMap<D> + ?Sized,
{
    gjk::distance::<D, A, B>(a, b)
        .filter(|d| d.gap() <= margin)
        .map(|d| d.separation)
}

fn polyhedra(
    a: &WorldPolyhedron<'_>,
    b: &WorldPolyhedron<'_>,
    config: &PhysicsConfig<Dim3>,
) -> Manifold<Dim3> {
    let separation = match config.polytope_algorithm {
        PolytopeAlgorithm::GjkEpa => penetration_or_gap(a, b, config),
        PolytopeAlgorithm::Sat => super::sat::polyhedra(a, b)
            .or_else(|| speculative::<Dim3, _, _>(a, b, config.contact_margin)),
    };
    match separation {
        Some(sep) => clip::polyhedra(a, b, &sep, config.contact_margin),
        None => Manifold::new(),
    }
}

fn polyhedron_capsule(
    poly: &WorldPolyhedron<'_>,
    capsule: &WorldCapsule,
    config: &PhysicsConfig<Dim3>,
) -> Manifold<Dim3> {
    let separation = super::sat::polyhedron_capsule(poly, capsule)
        .or_else(|| speculative::<Dim3, _, _>(poly, capsule, config.contact_margin));
    match separation {
        Some(sep) => clip::polyhedron_capsule(poly, capsule, &sep, config.contact_margin),
        None => Manifold::new(),
    }
}

fn polygons(
    a: &WorldPolygon<'_>,
    b: &WorldPolygon<'_>,
    config: &PhysicsConfig<Dim2>,
) -> Manifold<Dim2> {
    let separation = match config.polytope_algorithm {
        PolytopeAlgorithm::GjkEpa => penetration_or_gap(a, b, config),
        PolytopeAlgorithm::Sat => super::sat::polygons(a, b)
            .or_else(|| speculative::<Dim2, _, _>(a, b, config.contact_margin)),
    };
    match separation {
        Some(sep) => clip::polygons(a, b, &sep, config.contact_margin),
        None => Manifold::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Transform2, Transform3};
    use crate::shape::{Collider2, Collider3, ColliderShape};
    use glam::Vec2;

    fn config3() -> PhysicsConfig<Dim3> {
        PhysicsConfig::default()
    }

    #[test]
    fn test_sphere_sphere_contact() {
        let a = Ball::<Dim3> {
            center: Vec3::ZERO,
            radius: 1.0,
        };
        let b = Ball::<Dim3> {
            center: Vec3::new(1.8, 0.0, 0.0),
            radius: 1.0,
        };
        let m = balls(&a, &b, 0.02);
        assert_eq!(m.len(), 1);
        let p = &m.points()[0];
        assert!((p.normal - Vec3::X).length() < 1e-6);
        assert!((p.separation + 0.2).abs() < 1e-5);
        assert!((p.position - Vec3::new(0.9, 0.0, 0.0)).length() < 1e-5);

        let far = Ball::<Dim3> {
            center: Vec3::new(2.1, 0.0, 0.0),
            radius: 1.0,
        };
        assert!(balls(&a, &far, 0.02).is_empty());
    }

    #[test]
    fn test_coincident_balls_use_up() {
        let a = Ball::<Dim2> {
            center: Vec2::ZERO,
            radius: 0.5,
        };
        let m = balls(&a, &a, 0.0);
        assert_eq!(m.points()[0].normal, Vec2::Y);
        assert!((m.points()[0].separation + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_segment_segment_crossing() {
        let (p, q) = closest_points_between_segments(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, -1.0),
            Vec3::new(0.0, 1.0, 1.0),
        );
        assert!(p.length() < 1e-6);
        assert!((q - Vec3::Y).length() < 1e-6);

        let (p, q) = closest_points_between_segments(
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::new(3.0, 1.0, 0.0),
        );
        assert!((p - Vec3::X).length() < 1e-6);
        assert!((q - Vec3::new(2.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_box_resting_on_half_space() {
        let ground = Collider3::half_space(Vec3::Y, 0.0);
        let cube = Collider3::cuboid(Vec3::splat(0.5));
        let m = ground.detect_contacts(
            &Transform3::identity(),
            &cube,
            &Transform3::from_position(Vec3::new(0.0, 0.49, 0.0)),
            &config3(),
        );
        assert_eq!(m.len(), 4);
        for p in &m {
            assert_eq!(p.normal, Vec3::Y);
            assert!((p.separation + 0.01).abs() < 1e-5);
            assert!(p.position.y.abs() < 1e-5);
        }

        // Swapped order flips the normal.
        let m = cube.detect_contacts(
            &Transform3::from_position(Vec3::new(0.0, 0.49, 0.0)),
            &ground,
            &Transform3::identity(),
            &config3(),
        );
        assert_eq!(m.len(), 4);
        assert!(m.iter().all(|p| p.normal == Vec3::NEG_Y && p.id.flipped));
    }

    #[test]
    fn test_sphere_on_box_shallow_and_deep() {
        let cube = Collider3::cuboid(Vec3::ONE);
        let sphere = Collider3::sphere(0.5);
        let m = sphere.detect_contacts(
            &Transform3::from_position(Vec3::new(0.2, 1.4, 0.0)),
            &cube,
            &Transform3::identity(),
            &config3(),
        );
        assert_eq!(m.len(), 1);
        let p = &m.points()[0];
        assert!((p.normal - Vec3::NEG_Y).length() < 1e-4);
        assert!((p.separation + 0.1).abs() < 1e-4);

        // Center just inside the top face.
        let m = sphere.detect_contacts(
            &Transform3::from_position(Vec3::new(0.0, 0.9, 0.0)),
            &cube,
            &Transform3::identity(),
            &config3(),
        );
        assert_eq!(m.len(), 1);
        let p = &m.points()[0];
        assert!((p.normal - Vec3::NEG_Y).length() < 1e-3);
        assert!((p.separation + 0.6).abs() < 1e-3);
    }

    #[test]
    fn test_box_stack_gjk_and_sat_agree() {
        let cube = Collider3::cuboid(Vec3::splat(0.5));
        let lower = Transform3::identity();
        let upper = Transform3::from_position(Vec3::new(0.1, 0.95, 0.0));
        let mut config = config3();
        let gjk = cube.detect_contacts(&lower, &cube, &upper, &config);
        config.polytope_algorithm = PolytopeAlgorithm::Sat;
        let sat = cube.detect_contacts(&lower, &cube, &upper, &config);
        assert_eq!(gjk.len(), 4);
        assert_eq!(sat.len(), 4);
        for (g, s) in gjk.iter().zip(sat.iter()) {
            assert!((g.normal - s.normal).length() < 1e-3);
            assert!((g.separation - s.separation).abs() < 1e-3);
        }
    }

    #[test]
    fn test_speculative_contact_within_margin() {
        let cube = Collider3::cuboid(Vec3::splat(0.5));
        let m = cube.detect_contacts(
            &Transform3::identity(),
            &cube,
            &Transform3::from_position(Vec3::new(0.0, 1.01, 0.0)),
            &config3(),
        );
        assert_eq!(m.len(), 4);
        assert!(m.iter().all(|p| (p.separation - 0.01).abs() < 1e-4));

        let m = cube.detect_contacts(
            &Transform3::identity(),
            &cube,
            &Transform3::from_position(Vec3::new(0.0, 1.05, 0.0)),
            &config3(),
        );
        assert!(m.is_empty());
    }

    #[test]
    fn test_capsule_lying_on_box() {
        let cube = Collider3::cuboid(Vec3::ONE);
        let capsule = Collider3::capsule(0.5, 0.5);
        // Lay the capsule along X.
        let lying = Transform3::from_position_rotation(
            Vec3::new(0.0, 1.45, 0.0),
            glam::Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        );
        let m = cube.detect_contacts(&Transform3::identity(), &capsule, &lying, &config3());
        assert_eq!(m.len(), 2);
        for p in &m {
            assert!((p.normal - Vec3::Y).length() < 1e-4);
            assert!((p.separation + 0.05).abs() < 1e-4);
        }
    }

    #[test]
    fn test_polygon_on_half_plane_and_polygon() {
        let config = PhysicsConfig::<Dim2>::default();
        let ground = Collider2::half_plane(Vec2::Y, 0.0);
        let rect = Collider2::cuboid(Vec2::splat(0.5));
        let m = ground.detect_contacts(
            &Transform2::identity(),
            &rect,
            &Transform2::from_position(Vec2::new(0.0, 0.45)),
            &config,
        );
        assert_eq!(m.len(), 2);
        assert!(m.iter().all(|p| (p.separation + 0.05).abs() < 1e-5));

        let m = rect.detect_contacts(
            &Transform2::identity(),
            &rect,
            &Transform2::from_position(Vec2::new(0.3, 0.9)),
            &config,
        );
        assert_eq!(m.len(), 2);
        for p in &m {
            assert!((p.normal - Vec2::Y).length() < 1e-4);
            assert!((p.separation + 0.1).abs() < 1e-4);
        }
    }

    #[test]
    fn test_circle_against_polygon() {
        let config = PhysicsConfig::<Dim2>::default();
        let circle = Collider2::circle(0.5);
        let rect = Collider2::cuboid(Vec2::ONE);
        let m = rect.detect_contacts(
            &Transform2::identity(),
            &circle,
            &Transform2::from_position(Vec2::new(1.4, 0.0)),
            &config,
        );
        assert_eq!(m.len(), 1);
        let p = &m.points()[0];
        assert!((p.normal - Vec2::X).length() < 1e-4);
        assert!((p.separation + 0.1).abs() < 1e-4);
    }
}
