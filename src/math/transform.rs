//! World transforms, bounding boxes and planes.

use glam::{Mat4, Quat, Vec3};

use super::dim::{Dim, Dim2, Dim3};

/// Position, rotation, and scale of a body. Points map as `position + R * (scale * p)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform<D: Dim> {
    pub position: D::Vector,
    pub rotation: D::Rotation,
    pub scale: D::Vector,
}

impl<D: Dim> Transform<D> {
    /// Create an identity transform.
    pub fn identity() -> Self {
        Self {
            position: D::zero(),
            rotation: D::identity_rotation(),
            scale: D::splat(1.0),
        }
    }

    /// Create a transform from a position.
    pub fn from_position(position: D::Vector) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    /// Create a transform from a position and a rotation.
    pub fn from_position_rotation(position: D::Vector, rotation: D::Rotation) -> Self {
        Self {
            position,
            rotation,
            scale: D::splat(1.0),
        }
    }

    /// Builder-style scale override.
    pub fn with_scale(mut self, scale: D::Vector) -> Self {
        self.scale = scale;
        self
    }

    /// Map a local-space point into world space.
    #[inline]
    pub fn transform_point(&self, point: D::Vector) -> D::Vector {
        self.position + D::rotate(self.rotation, point * self.scale)
    }

    /// Map a world-space point into local space.
    #[inline]
    pub fn inverse_transform_point(&self, point: D::Vector) -> D::Vector {
        D::inverse_rotate(self.rotation, point - self.position) / self.scale
    }

    /// Rotate a direction without scaling or translating it.
    #[inline]
    pub fn rotate_vector(&self, v: D::Vector) -> D::Vector {
        D::rotate(self.rotation, v)
    }

    /// Scale factor applied to radius-based shapes (the X axis only).
    #[inline]
    pub fn radius_scale(&self) -> f32 {
        D::x(self.scale).abs()
    }
}

impl<D: Dim> Default for Transform<D> {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform<Dim3> {
    /// Convert to a 4x4 matrix (translation * rotation * scale) for rendering.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Decompose a 4x4 matrix into a transform.
    ///
    /// Note: assumes an affine matrix without shear.
    pub fn from_matrix(mat: Mat4) -> Self {
        let (scale, rotation, position) = mat.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Shorthand for a rotated and translated transform with unit scale.
    pub fn from_rotation_translation(rotation: Quat, position: Vec3) -> Self {
        Self::from_position_rotation(position, rotation)
    }
}

impl Transform<Dim2> {
    /// Rotation angle in radians.
    pub fn angle(&self) -> f32 {
        self.rotation
    }
}

/// Axis-aligned bounding box for broadphase rejection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb<D: Dim> {
    pub min: D::Vector,
    pub max: D::Vector,
}

impl<D: Dim> Aabb<D> {
    /// A box that overlaps everything; used for unbounded shapes.
    pub fn everything() -> Self {
        Self {
            min: D::splat(f32::MIN),
            max: D::splat(f32::MAX),
        }
    }

    /// Tight box around a set of points.
    pub fn from_points(points: impl IntoIterator<Item = D::Vector>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Self {
            min: first,
            max: first,
        };
        for p in iter {
            aabb.min = D::min(aabb.min, p);
            aabb.max = D::max(aabb.max, p);
        }
        Some(aabb)
    }

    /// Box around a center with the given half-extents on every axis.
    pub fn from_center_radius(center: D::Vector, radius: f32) -> Self {
        Self {
            min: center - D::splat(radius),
            max: center + D::splat(radius),
        }
    }

    /// Grow the box by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - D::splat(margin),
            max: self.max + D::splat(margin),
        }
    }

    /// Test whether two AABBs overlap.
    #[inline]
    pub fn overlaps(&self, other: &Aabb<D>) -> bool {
        D::all_le(self.min, other.max) && D::all_le(other.min, self.max)
    }
}

/// A plane `dot(normal, x) = offset` with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane<D: Dim> {
    pub normal: D::Vector,
    pub offset: f32,
}

impl<D: Dim> Plane<D> {
    /// Plane through `point` with the given unit normal.
    pub fn from_point_normal(point: D::Vector, normal: D::Vector) -> Self {
        Self {
            normal,
            offset: D::dot(normal, point),
        }
    }

    /// Positive in front of the plane, negative behind it.
    #[inline]
    pub fn signed_distance(&self, point: D::Vector) -> f32 {
        D::dot(self.normal, point) - self.offset
    }

    /// Orthogonal projection of `point` onto the plane.
    #[inline]
    pub fn project(&self, point: D::Vector) -> D::Vector {
        point - self.normal * self.signed_distance(point)
    }
}
