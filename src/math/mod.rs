//! Dimension abstraction and the small amount of geometry shared by both pipelines.

pub mod dim;
pub mod transform;

pub use dim::{Dim, Dim2, Dim3};
pub use transform::{Aabb, Plane, Transform};

/// Transform in the plane.
pub type Transform2 = Transform<Dim2>;
/// Transform in space.
pub type Transform3 = Transform<Dim3>;

/// General geometric tolerance.
pub const EPSILON: f32 = 1e-5;
/// Squared-length threshold below which a direction is treated as zero.
pub const DIRECTION_EPSILON: f32 = 1e-10;
