//! Dimension abstraction shared by the 2D and 3D pipelines.
//!
//! The solver, rigid bodies, arbiters and the scene are written once and
//! instantiated for [`Dim2`] and [`Dim3`]. Only the handful of operations that
//! differ between the two (cross products, rotation representation, inertia
//! representation) live here.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use glam::{Mat3, Quat, Vec2, Vec3};

use crate::shape::{Collider2, Collider3, ColliderShape};

/// A spatial dimension the physics pipeline can run in.
pub trait Dim: Copy + Clone + Debug + Default + PartialEq + Send + Sync + 'static {
    /// Position / direction vector.
    type Vector: Copy
        + Debug
        + Default
        + PartialEq
        + Send
        + Sync
        + 'static
        + Add<Output = Self::Vector>
        + Sub<Output = Self::Vector>
        + Mul<f32, Output = Self::Vector>
        + Mul<Self::Vector, Output = Self::Vector>
        + Div<Self::Vector, Output = Self::Vector>
        + Neg<Output = Self::Vector>
        + AddAssign
        + SubAssign;
    /// Angular velocity / torque (scalar in 2D, vector in 3D).
    type Angular: Copy
        + Debug
        + Default
        + PartialEq
        + Send
        + Sync
        + 'static
        + Add<Output = Self::Angular>
        + Sub<Output = Self::Angular>
        + Mul<f32, Output = Self::Angular>
        + Neg<Output = Self::Angular>
        + AddAssign
        + SubAssign;
    /// Orientation (angle in 2D, unit quaternion in 3D).
    type Rotation: Copy + Debug + PartialEq + Send + Sync + 'static;
    /// Inertia tensor (scalar in 2D, 3x3 matrix in 3D).
    type Inertia: Copy
        + Debug
        + PartialEq
        + Send
        + Sync
        + 'static
        + Mul<f32, Output = Self::Inertia>;
    /// The closed set of collider kinds available in this dimension.
    type Collider: ColliderShape<Self>;

    /// Number of spatial axes.
    const DIM: usize;
    /// Maximum number of contact points per manifold.
    const MAX_CONTACTS: usize;
    /// Number of friction directions per contact.
    const TANGENTS: usize;

    fn zero() -> Self::Vector;
    fn splat(value: f32) -> Self::Vector;
    /// Unit vector along the Y axis ("up").
    fn up() -> Self::Vector;
    /// Unit vector along the X axis.
    fn unit_x() -> Self::Vector;
    fn dot(a: Self::Vector, b: Self::Vector) -> f32;
    fn min(a: Self::Vector, b: Self::Vector) -> Self::Vector;
    fn max(a: Self::Vector, b: Self::Vector) -> Self::Vector;
    /// True when every component of `a` is `<=` the matching component of `b`.
    fn all_le(a: Self::Vector, b: Self::Vector) -> bool;
    /// First component; radius scaling uses this axis only.
    fn x(v: Self::Vector) -> f32;

    fn length_squared(v: Self::Vector) -> f32 {
        Self::dot(v, v)
    }

    fn length(v: Self::Vector) -> f32 {
        Self::length_squared(v).sqrt()
    }

    fn normalize_or_zero(v: Self::Vector) -> Self::Vector {
        let len = Self::length(v);
        if len > f32::EPSILON {
            v * (1.0 / len)
        } else {
            Self::zero()
        }
    }

    /// `r x v`.
    fn cross(r: Self::Vector, v: Self::Vector) -> Self::Angular;
    /// `w x r`.
    fn angular_cross(w: Self::Angular, r: Self::Vector) -> Self::Vector;
    fn angular_dot(a: Self::Angular, b: Self::Angular) -> f32;
    /// Signed measure of a full simplex (triangle area in 2D, tetrahedron volume in 3D).
    ///
    /// Only the sign and relative magnitude matter; the scale factor is unspecified.
    fn signed_volume(simplex: &[Self::Vector]) -> f32;

    fn identity_rotation() -> Self::Rotation;
    fn rotate(rotation: Self::Rotation, v: Self::Vector) -> Self::Vector;
    fn inverse_rotate(rotation: Self::Rotation, v: Self::Vector) -> Self::Vector;
    /// Advance `rotation` by angular velocity `w` over `dt`.
    fn integrate_rotation(rotation: Self::Rotation, w: Self::Angular, dt: f32) -> Self::Rotation;

    fn zero_inertia() -> Self::Inertia;
    /// Invert an inertia tensor, returning zero for singular input.
    fn invert_inertia(inertia: Self::Inertia) -> Self::Inertia;
    fn apply_inertia(inertia: Self::Inertia, w: Self::Angular) -> Self::Angular;
    /// Rotate a body-space inertia tensor into world space (`R I R^T`).
    fn world_inertia(local: Self::Inertia, rotation: Self::Rotation) -> Self::Inertia;
    /// Friction directions for a contact normal. Only the first [`Dim::TANGENTS`] are used.
    fn tangent_basis(normal: Self::Vector) -> [Self::Vector; 2];
}

/// Planar physics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Dim2;

/// Spatial physics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Dim3;

impl Dim for Dim2 {
    type Vector = Vec2;
    type Angular = f32;
    type Rotation = f32;
    type Inertia = f32;
    type Collider = Collider2;

    const DIM: usize = 2;
    const MAX_CONTACTS: usize = 2;
    const TANGENTS: usize = 1;

    #[inline]
    fn zero() -> Vec2 {
        Vec2::ZERO
    }

    #[inline]
    fn splat(value: f32) -> Vec2 {
        Vec2::splat(value)
    }

    #[inline]
    fn up() -> Vec2 {
        Vec2::Y
    }

    #[inline]
    fn unit_x() -> Vec2 {
        Vec2::X
    }

    #[inline]
    fn dot(a: Vec2, b: Vec2) -> f32 {
        a.dot(b)
    }

    #[inline]
    fn min(a: Vec2, b: Vec2) -> Vec2 {
        a.min(b)
    }

    #[inline]
    fn max(a: Vec2, b: Vec2) -> Vec2 {
        a.max(b)
    }

    #[inline]
    fn all_le(a: Vec2, b: Vec2) -> bool {
        a.x <= b.x && a.y <= b.y
    }

    #[inline]
    fn x(v: Vec2) -> f32 {
        v.x
    }

    #[inline]
    fn cross(r: Vec2, v: Vec2) -> f32 {
        r.perp_dot(v)
    }

    #[inline]
    fn angular_cross(w: f32, r: Vec2) -> Vec2 {
        r.perp() * w
    }

    #[inline]
    fn angular_dot(a: f32, b: f32) -> f32 {
        a * b
    }

    fn signed_volume(simplex: &[Vec2]) -> f32 {
        match simplex {
            [a, b, c] => (*b - *a).perp_dot(*c - *a),
            _ => 0.0,
        }
    }

    #[inline]
    fn identity_rotation() -> f32 {
        0.0
    }

    #[inline]
    fn rotate(rotation: f32, v: Vec2) -> Vec2 {
        Vec2::from_angle(rotation).rotate(v)
    }

    #[inline]
    fn inverse_rotate(rotation: f32, v: Vec2) -> Vec2 {
        Vec2::from_angle(-rotation).rotate(v)
    }

    #[inline]
    fn integrate_rotation(rotation: f32, w: f32, dt: f32) -> f32 {
        rotation + w * dt
    }

    #[inline]
    fn zero_inertia() -> f32 {
        0.0
    }

    #[inline]
    fn invert_inertia(inertia: f32) -> f32 {
        if inertia > 0.0 {
            1.0 / inertia
        } else {
            0.0
        }
    }

    #[inline]
    fn apply_inertia(inertia: f32, w: f32) -> f32 {
        inertia * w
    }

    #[inline]
    fn world_inertia(local: f32, _rotation: f32) -> f32 {
        local
    }

    #[inline]
    fn tangent_basis(normal: Vec2) -> [Vec2; 2] {
        [Vec2::new(normal.y, -normal.x), Vec2::ZERO]
    }
}

impl Dim for Dim3 {
    type Vector = Vec3;
    type Angular = Vec3;
    type Rotation = Quat;
    type Inertia = Mat3;
    type Collider = Collider3;

    const DIM: usize = 3;
    const MAX_CONTACTS: usize = 8;
    const TANGENTS: usize = 2;

    #[inline]
    fn zero() -> Vec3 {
        Vec3::ZERO
    }

    #[inline]
    fn splat(value: f32) -> Vec3 {
        Vec3::splat(value)
    }

    #[inline]
    fn up() -> Vec3 {
        Vec3::Y
    }

    #[inline]
    fn unit_x() -> Vec3 {
        Vec3::X
    }

    #[inline]
    fn dot(a: Vec3, b: Vec3) -> f32 {
        a.dot(b)
    }

    #[inline]
    fn min(a: Vec3, b: Vec3) -> Vec3 {
        a.min(b)
    }

    #[inline]
    fn max(a: Vec3, b: Vec3) -> Vec3 {
        a.max(b)
    }

    #[inline]
    fn all_le(a: Vec3, b: Vec3) -> bool {
        a.x <= b.x && a.y <= b.y && a.z <= b.z
    }

    #[inline]
    fn x(v: Vec3) -> f32 {
        v.x
    }

    #[inline]
    fn cross(r: Vec3, v: Vec3) -> Vec3 {
        r.cross(v)
    }

    #[inline]
    fn angular_cross(w: Vec3, r: Vec3) -> Vec3 {
        w.cross(r)
    }

    #[inline]
    fn angular_dot(a: Vec3, b: Vec3) -> f32 {
        a.dot(b)
    }

    fn signed_volume(simplex: &[Vec3]) -> f32 {
        match simplex {
            [a, b, c, d] => (*b - *a).cross(*c - *a).dot(*d - *a),
            _ => 0.0,
        }
    }

    #[inline]
    fn identity_rotation() -> Quat {
        Quat::IDENTITY
    }

    #[inline]
    fn rotate(rotation: Quat, v: Vec3) -> Vec3 {
        rotation * v
    }

    #[inline]
    fn inverse_rotate(rotation: Quat, v: Vec3) -> Vec3 {
        rotation.inverse() * v
    }

    /// Exact for constant `w`: the step is a rotation by `|w| dt` about `w`,
    /// matching the planar `angle + w dt`.
    fn integrate_rotation(rotation: Quat, w: Vec3, dt: f32) -> Quat {
        (Quat::from_scaled_axis(w * dt) * rotation).normalize()
    }

    #[inline]
    fn zero_inertia() -> Mat3 {
        Mat3::ZERO
    }

    fn invert_inertia(inertia: Mat3) -> Mat3 {
        let det = inertia.determinant();
        if det.abs() > 1e-12 && det.is_finite() {
            inertia.inverse()
        } else {
            Mat3::ZERO
        }
    }

    #[inline]
    fn apply_inertia(inertia: Mat3, w: Vec3) -> Vec3 {
        inertia * w
    }

    fn world_inertia(local: Mat3, rotation: Quat) -> Mat3 {
        let r = Mat3::from_quat(rotation);
        r * local * r.transpose()
    }

    #[inline]
    fn tangent_basis(normal: Vec3) -> [Vec3; 2] {
        let (t1, t2) = normal.any_orthonormal_pair();
        [t1, t2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_conventions_2d() {
        // r x v for r = X, v = Y is +1 (counter-clockwise).
        assert_eq!(Dim2::cross(Vec2::X, Vec2::Y), 1.0);
        // w x r for w = 1, r = X is +Y.
        let v = Dim2::angular_cross(1.0, Vec2::X);
        assert!((v - Vec2::Y).length() < 1e-6);
    }

    #[test]
    fn test_rotate_roundtrip_2d() {
        let v = Vec2::new(1.0, 2.0);
        let r = Dim2::rotate(0.7, v);
        let back = Dim2::inverse_rotate(0.7, r);
        assert!((back - v).length() < 1e-5);
    }

    #[test]
    fn test_integrate_rotation_3d_about_y() {
        let mut q = Quat::IDENTITY;
        let w = Vec3::new(0.0, 1.0, 0.0);
        for _ in 0..1000 {
            q = Dim3::integrate_rotation(q, w, 0.001);
        }
        // One radian about +Y.
        let expected = Quat::from_rotation_y(1.0);
        assert!(q.dot(expected).abs() > 0.9999);
    }

    #[test]
    fn test_integrate_rotation_large_step_is_exact() {
        let start = Quat::from_rotation_x(0.3);
        let w = Vec3::new(0.0, 0.0, std::f32::consts::PI);
        let q = Dim3::integrate_rotation(start, w, 1.0);
        let expected = Quat::from_rotation_z(std::f32::consts::PI) * start;
        assert!(q.dot(expected).abs() > 0.99999);
        assert!(Dim3::integrate_rotation(start, Vec3::ZERO, 1.0).dot(start) > 0.99999);
    }

    #[test]
    fn test_world_inertia_is_rotation_invariant_for_sphere() {
        let local = Mat3::from_diagonal(Vec3::splat(2.0));
        let world = Dim3::world_inertia(local, Quat::from_rotation_x(0.4));
        assert!((world.x_axis - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_invert_singular_inertia_is_zero() {
        assert_eq!(Dim3::invert_inertia(Mat3::ZERO), Mat3::ZERO);
        assert_eq!(Dim2::invert_inertia(0.0), 0.0);
    }

    #[test]
    fn test_tangent_basis_is_orthogonal() {
        let n = Vec3::new(0.0, 1.0, 0.0);
        let [t1, t2] = Dim3::tangent_basis(n);
        assert!(t1.dot(n).abs() < 1e-6);
        assert!(t2.dot(n).abs() < 1e-6);
        assert!(t1.dot(t2).abs() < 1e-6);
    }

    #[test]
    fn test_signed_volume_orientation() {
        let tri = [Vec2::ZERO, Vec2::X, Vec2::Y];
        assert!(Dim2::signed_volume(&tri) > 0.0);
        let tet = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        assert!(Dim3::signed_volume(&tet) > 0.0);
    }
}
