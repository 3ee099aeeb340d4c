//! Convex shapes: half-edge polyhedra, polygons, analytic primitives, and the
//! closed collider variants bodies carry.

pub mod collider;
pub mod mass;
pub mod polygon;
pub mod polyhedron;

use glam::Vec3;

use crate::math::{Dim, Dim3};

pub use collider::{Collider2, Collider3, ColliderShape, WorldShape2, WorldShape3};
pub use mass::MassProperties;
pub use polygon::{ConvexPolygon, WorldPolygon};
pub use polyhedron::{ConvexPolyhedron, HalfEdge, WorldPolyhedron};

/// GJK/EPA support function. Returns the farthest point in the given direction.
pub trait SupportMap<D: Dim> {
    fn support(&self, direction: D::Vector) -> D::Vector;
    /// A point inside the shape, used to seed searches and orient axes.
    fn center(&self) -> D::Vector;
}

/// A circle (2D) or sphere (3D) in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball<D: Dim> {
    pub center: D::Vector,
    pub radius: f32,
}

impl<D: Dim> SupportMap<D> for Ball<D> {
    #[inline]
    fn support(&self, direction: D::Vector) -> D::Vector {
        self.center + D::normalize_or_zero(direction) * self.radius
    }

    #[inline]
    fn center(&self) -> D::Vector {
        self.center
    }
}

/// A capsule in world space: a segment swept by a sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldCapsule {
    pub a: Vec3,
    pub b: Vec3,
    pub radius: f32,
}

impl WorldCapsule {
    /// Spine vector from `a` to `b`.
    pub fn spine(&self) -> Vec3 {
        self.b - self.a
    }
}

impl SupportMap<Dim3> for WorldCapsule {
    fn support(&self, direction: Vec3) -> Vec3 {
        let end = if self.a.dot(direction) >= self.b.dot(direction) {
            self.a
        } else {
            self.b
        };
        end + direction.normalize_or_zero() * self.radius
    }

    fn center(&self) -> Vec3 {
        (self.a + self.b) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Dim2;
    use glam::Vec2;

    #[test]
    fn test_ball_support() {
        let ball = Ball::<Dim3> {
            center: Vec3::new(0.0, 5.0, 0.0),
            radius: 2.0,
        };
        let support = ball.support(Vec3::Y * 3.0);
        assert!((support - Vec3::new(0.0, 7.0, 0.0)).length() < 1e-5);

        let circle = Ball::<Dim2> {
            center: Vec2::ZERO,
            radius: 1.0,
        };
        assert!((circle.support(Vec2::NEG_X) - Vec2::NEG_X).length() < 1e-6);
    }

    #[test]
    fn test_capsule_support() {
        let capsule = WorldCapsule {
            a: Vec3::new(0.0, -1.0, 0.0),
            b: Vec3::new(0.0, 1.0, 0.0),
            radius: 0.5,
        };
        assert!((capsule.support(Vec3::Y) - Vec3::new(0.0, 1.5, 0.0)).length() < 1e-6);
        assert!((capsule.support(Vec3::X) - Vec3::new(0.5, -1.0, 0.0)).length() < 1e-6);
        assert_eq!(capsule.center(), Vec3::ZERO);
    }
}
