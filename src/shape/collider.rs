//! The closed set of collider kinds a body can carry.
//!
//! Each collider holds local-space data and produces a world-space view
//! through `world_space`, which is what the narrowphase works on.

use std::fmt::Debug;
use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::config::PhysicsConfig;
use crate::contact::Manifold;
use crate::error::{PhysicsError, Result};
use crate::math::{Aabb, Dim, Dim2, Dim3, Plane, Transform, Transform2, Transform3};
use crate::narrowphase;

use super::mass::{self, MassProperties};
use super::polygon::{ConvexPolygon, WorldPolygon};
use super::polyhedron::{ConvexPolyhedron, WorldPolyhedron, CONVEXITY_EPSILON};
use super::{Ball, WorldCapsule};

/// Operations the pipeline needs from a collider, whatever the dimension.
pub trait ColliderShape<D: Dim>: Clone + Debug + Send + Sync + 'static {
    /// World-space bounds. Unbounded shapes return [`Aabb::everything`].
    fn aabb(&self, transform: &Transform<D>) -> Aabb<D>;

    /// Mass properties under the given scale, or `None` for shapes that
    /// cannot carry mass (half-spaces).
    fn mass_properties(&self, scale: D::Vector, density: f32) -> Option<MassProperties<D>>;

    /// Contacts between two placed colliders. Normals point from `self` to `other`.
    fn detect_contacts(
        &self,
        transform: &Transform<D>,
        other: &Self,
        other_transform: &Transform<D>,
        config: &PhysicsConfig<D>,
    ) -> Manifold<D>;
}

/// Spatial collider.
#[derive(Debug, Clone, PartialEq)]
pub enum Collider3 {
    Sphere {
        radius: f32,
    },
    /// Box backed by an eight-vertex half-edge hull.
    Cuboid {
        half_extents: Vec3,
        hull: Arc<ConvexPolyhedron>,
    },
    /// Capsule along the local Y axis. `half_height` excludes the caps.
    Capsule {
        radius: f32,
        half_height: f32,
    },
    /// Everything below the plane `dot(normal, p) = offset`. Static only.
    HalfSpace {
        normal: Vec3,
        offset: f32,
    },
    Polyhedron(Arc<ConvexPolyhedron>),
}

/// A [`Collider3`] placed in the world.
#[derive(Debug, Clone)]
pub enum WorldShape3<'a> {
    Sphere(Ball<Dim3>),
    Capsule(WorldCapsule),
    HalfSpace(Plane<Dim3>),
    Polyhedron(WorldPolyhedron<'a>),
}

impl Collider3 {
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::Cuboid {
            half_extents,
            hull: Arc::new(ConvexPolyhedron::cuboid(half_extents)),
        }
    }

    pub fn capsule(radius: f32, half_height: f32) -> Self {
        Self::Capsule {
            radius,
            half_height,
        }
    }

    /// A half-space with outward `normal`; a zero normal falls back to +Y.
    pub fn half_space(normal: Vec3, offset: f32) -> Self {
        let normal = normal.try_normalize().unwrap_or(Vec3::Y);
        Self::HalfSpace { normal, offset }
    }

    /// Wrap a finalized, convex hull.
    pub fn polyhedron(hull: impl Into<Arc<ConvexPolyhedron>>) -> Result<Self> {
        let hull = hull.into();
        if !hull.is_finalized() {
            return Err(PhysicsError::ShapeNotFinalized);
        }
        if !hull.is_convex(CONVEXITY_EPSILON) {
            return Err(PhysicsError::NotConvex);
        }
        Ok(Self::Polyhedron(hull))
    }

    /// False for shapes with infinite extent.
    pub fn is_bounded(&self) -> bool {
        !matches!(self, Self::HalfSpace { .. })
    }

    pub fn world_space(&self, transform: &Transform3) -> WorldShape3<'_> {
        match self {
            Self::Sphere { radius } => WorldShape3::Sphere(Ball {
                center: transform.position,
                radius: radius * transform.radius_scale(),
            }),
            Self::Cuboid { hull, .. } | Self::Polyhedron(hull) => {
                WorldShape3::Polyhedron(WorldPolyhedron::new(hull, transform))
            }
            Self::Capsule {
                radius,
                half_height,
            } => WorldShape3::Capsule(WorldCapsule {
                a: transform.transform_point(Vec3::new(0.0, -half_height, 0.0)),
                b: transform.transform_point(Vec3::new(0.0, *half_height, 0.0)),
                radius: radius * transform.radius_scale(),
            }),
            Self::HalfSpace { normal, offset } => {
                let point = transform.transform_point(*normal * *offset);
                let world_normal = transform.rotate_vector(*normal).normalize_or_zero();
                WorldShape3::HalfSpace(Plane::from_point_normal(point, world_normal))
            }
        }
    }
}

impl ColliderShape<Dim3> for Collider3 {
    fn aabb(&self, transform: &Transform3) -> Aabb<Dim3> {
        match self {
            Self::Sphere { radius } => {
                Aabb::from_center_radius(transform.position, radius * transform.radius_scale())
            }
            Self::Cuboid { hull, .. } | Self::Polyhedron(hull) => {
                Aabb::from_points(hull.vertices().iter().map(|&v| transform.transform_point(v)))
                    .unwrap_or_else(|| Aabb::from_center_radius(transform.position, 0.0))
            }
            Self::Capsule {
                radius,
                half_height,
            } => {
                let a = transform.transform_point(Vec3::new(0.0, -half_height, 0.0));
                let b = transform.transform_point(Vec3::new(0.0, *half_height, 0.0));
                Aabb {
                    min: a.min(b),
                    max: a.max(b),
                }
                .expanded(radius * transform.radius_scale())
            }
            Self::HalfSpace { .. } => Aabb::everything(),
        }
    }

    fn mass_properties(&self, scale: Vec3, density: f32) -> Option<MassProperties<Dim3>> {
        let scale = scale.abs();
        match self {
            Self::Sphere { radius } => Some(mass::sphere(radius * scale.x, density)),
            Self::Cuboid { hull, .. } | Self::Polyhedron(hull) => {
                let scaled: Vec<Vec3> = hull.vertices().iter().map(|&v| v * scale).collect();
                let faces = (0..hull.face_count() as u32).map(|f| hull.face_vertices(f));
                Some(mass::polyhedron(&scaled, faces, density))
            }
            Self::Capsule {
                radius,
                half_height,
            } => Some(mass::capsule(radius * scale.x, half_height * scale.y, density)),
            Self::HalfSpace { .. } => None,
        }
    }

    fn detect_contacts(
        &self,
        transform: &Transform3,
        other: &Self,
        other_transform: &Transform3,
        config: &PhysicsConfig<Dim3>,
    ) -> Manifold<Dim3> {
        let a = self.world_space(transform);
        let b = other.world_space(other_transform);
        narrowphase::detect_contacts_3d(&a, &b, config)
    }
}

/// Planar collider.
#[derive(Debug, Clone, PartialEq)]
pub enum Collider2 {
    Circle {
        radius: f32,
    },
    /// Rectangle backed by a four-vertex polygon.
    Cuboid {
        half_extents: Vec2,
        polygon: Arc<ConvexPolygon>,
    },
    /// Everything below the line `dot(normal, p) = offset`. Static only.
    HalfPlane {
        normal: Vec2,
        offset: f32,
    },
    Polygon(Arc<ConvexPolygon>),
}

/// A [`Collider2`] placed in the world.
#[derive(Debug, Clone)]
pub enum WorldShape2<'a> {
    Circle(Ball<Dim2>),
    HalfPlane(Plane<Dim2>),
    Polygon(WorldPolygon<'a>),
}

impl Collider2 {
    pub fn circle(radius: f32) -> Self {
        Self::Circle { radius }
    }

    pub fn cuboid(half_extents: Vec2) -> Self {
        Self::Cuboid {
            half_extents,
            polygon: Arc::new(ConvexPolygon::rectangle(half_extents)),
        }
    }

    /// A half-plane with outward `normal`; a zero normal falls back to +Y.
    pub fn half_plane(normal: Vec2, offset: f32) -> Self {
        let normal = normal.try_normalize().unwrap_or(Vec2::Y);
        Self::HalfPlane { normal, offset }
    }

    pub fn polygon(polygon: impl Into<Arc<ConvexPolygon>>) -> Self {
        Self::Polygon(polygon.into())
    }

    pub fn is_bounded(&self) -> bool {
        !matches!(self, Self::HalfPlane { .. })
    }

    pub fn world_space(&self, transform: &Transform2) -> WorldShape2<'_> {
        match self {
            Self::Circle { radius } => WorldShape2::Circle(Ball {
                center: transform.position,
                radius: radius * transform.radius_scale(),
            }),
            Self::Cuboid { polygon, .. } | Self::Polygon(polygon) => {
                WorldShape2::Polygon(WorldPolygon::new(polygon, transform))
            }
            Self::HalfPlane { normal, offset } => {
                let point = transform.transform_point(*normal * *offset);
                let world_normal = transform.rotate_vector(*normal).normalize_or_zero();
                WorldShape2::HalfPlane(Plane::from_point_normal(point, world_normal))
            }
        }
    }
}

impl ColliderShape<Dim2> for Collider2 {
    fn aabb(&self, transform: &Transform2) -> Aabb<Dim2> {
        match self {
            Self::Circle { radius } => {
                Aabb::from_center_radius(transform.position, radius * transform.radius_scale())
            }
            Self::Cuboid { polygon, .. } | Self::Polygon(polygon) => Aabb::from_points(
                polygon
                    .vertices()
                    .iter()
                    .map(|&v| transform.transform_point(v)),
            )
            .unwrap_or_else(|| Aabb::from_center_radius(transform.position, 0.0)),
            Self::HalfPlane { .. } => Aabb::everything(),
        }
    }

    fn mass_properties(&self, scale: Vec2, density: f32) -> Option<MassProperties<Dim2>> {
        let scale = scale.abs();
        match self {
            Self::Circle { radius } => Some(mass::circle(radius * scale.x, density)),
            Self::Cuboid { polygon, .. } | Self::Polygon(polygon) => {
                let scaled: Vec<Vec2> = polygon.vertices().iter().map(|&v| v * scale).collect();
                Some(mass::polygon(&scaled, density))
            }
            Self::HalfPlane { .. } => None,
        }
    }

    fn detect_contacts(
        &self,
        transform: &Transform2,
        other: &Self,
        other_transform: &Transform2,
        config: &PhysicsConfig<Dim2>,
    ) -> Manifold<Dim2> {
        let a = self.world_space(transform);
        let b = other.world_space(other_transform);
        narrowphase::detect_contacts_2d(&a, &b, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::SupportMap;
    use glam::Quat;

    #[test]
    fn test_sphere_aabb_uses_x_scale() {
        let collider = Collider3::sphere(1.0);
        let transform = Transform3::from_position(Vec3::new(1.0, 2.0, 3.0))
            .with_scale(Vec3::new(2.0, 5.0, 5.0));
        let aabb = collider.aabb(&transform);
        assert!((aabb.min - Vec3::new(-1.0, 0.0, 1.0)).length() < 1e-5);
        assert!((aabb.max - Vec3::new(3.0, 4.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn test_rotated_cuboid_aabb() {
        let collider = Collider3::cuboid(Vec3::new(1.0, 0.5, 0.5));
        let transform = Transform3::from_position_rotation(
            Vec3::ZERO,
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        );
        let aabb = collider.aabb(&transform);
        // Long axis now along Y.
        assert!((aabb.max.y - 1.0).abs() < 1e-5);
        assert!((aabb.max.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_half_space_is_unbounded_and_massless() {
        let ground = Collider3::half_space(Vec3::Y * 2.0, 0.0);
        assert!(!ground.is_bounded());
        assert!(ground.mass_properties(Vec3::ONE, 1.0).is_none());
        match ground.world_space(&Transform3::from_position(Vec3::new(0.0, -1.0, 0.0))) {
            WorldShape3::HalfSpace(plane) => {
                assert!((plane.normal - Vec3::Y).length() < 1e-6);
                assert!((plane.signed_distance(Vec3::ZERO) - 1.0).abs() < 1e-5);
            }
            other => panic!("expected half-space, got {other:?}"),
        }
    }

    #[test]
    fn test_capsule_world_endpoints() {
        let collider = Collider3::capsule(0.5, 1.0);
        let transform = Transform3::from_position_rotation(
            Vec3::new(0.0, 1.4, 0.0),
            Quat::from_rotation_z(-std::f32::consts::FRAC_PI_2),
        );
        match collider.world_space(&transform) {
            WorldShape3::Capsule(capsule) => {
                assert!((capsule.spine().normalize().abs() - Vec3::X).length() < 1e-5);
                assert!((capsule.center() - Vec3::new(0.0, 1.4, 0.0)).length() < 1e-5);
            }
            other => panic!("expected capsule, got {other:?}"),
        }
    }

    #[test]
    fn test_unfinalized_polyhedron_rejected() {
        let mut hull = ConvexPolyhedron::new();
        hull.add_vertex(Vec3::ZERO).unwrap();
        assert_eq!(
            Collider3::polyhedron(hull),
            Err(PhysicsError::ShapeNotFinalized)
        );
    }

    #[test]
    fn test_scaled_rectangle_mass() {
        let collider = Collider2::cuboid(Vec2::splat(0.5));
        let props = collider.mass_properties(Vec2::new(2.0, 1.0), 1.0).unwrap();
        assert!((props.mass - 2.0).abs() < 1e-5);
    }
}
