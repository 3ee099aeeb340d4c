//! Rein Physics
//!
//! Rigid-body physics core for the rein engine: convex shapes on a half-edge
//! structure, GJK/EPA and SAT narrowphase, clipped contact manifolds, and a
//! warm-started sequential impulse solver. The same pipeline runs in the
//! plane ([`Dim2`]) and in space ([`Dim3`]).
//!
//! # Architecture
//!
//! 1. **math** - Dimension abstraction, transforms, bounds
//! 2. **shape** - Half-edge polyhedra, polygons, primitives, mass properties
//! 3. **narrowphase** - GJK, EPA, SAT, contact clipping, pair dispatch
//! 4. **contact** - Manifolds and feature ids
//! 5. **arbiter** - Per-pair solver state with accumulated impulses
//! 6. **scene** - Bodies, broadphase, and the frame step
//! 7. **ecs** - hecs integration (feature = "ecs")
//!
//! ```no_run
//! use rein_physics::{BodyDesc, Collider3, PhysicsScene3};
//! use rein_physics::glam::Vec3;
//!
//! let mut scene = PhysicsScene3::default();
//! scene.add_body(BodyDesc::fixed(Collider3::half_space(Vec3::Y, 0.0)))?;
//! let ball = scene.add_body(
//!     BodyDesc::new(Collider3::sphere(0.5)).with_position(Vec3::new(0.0, 3.0, 0.0)),
//! )?;
//! scene.step(1.0 / 60.0);
//! println!("{:?}", scene.body(ball).map(|b| b.position()));
//! # Ok::<(), rein_physics::PhysicsError>(())
//! ```

pub mod arbiter;
pub mod broadphase;
pub mod config;
pub mod contact;
pub mod error;
pub mod math;
pub mod narrowphase;
pub mod rigid_body;
pub mod scene;
pub mod shape;

#[cfg(feature = "ecs")]
pub mod ecs;

// Re-export commonly used types
pub use arbiter::{Arbiter, ArbiterKey};
pub use config::{PhysicsConfig, PhysicsConfig2, PhysicsConfig3, PolytopeAlgorithm};
pub use contact::{ContactPoint, FeatureId, Manifold, Separation};
pub use error::{PhysicsError, Result};
pub use math::{Aabb, Dim, Dim2, Dim3, Plane, Transform, Transform2, Transform3};
pub use rigid_body::{BodyDesc, Mass, RigidBody};
pub use scene::{BodyHandle, PhysicsScene, PhysicsScene2, PhysicsScene3};
pub use shape::{
    Collider2, Collider3, ColliderShape, ConvexPolygon, ConvexPolyhedron, MassProperties,
};

#[cfg(feature = "ecs")]
pub use ecs::{attach_body, detach_body, sync_transforms, PhysicsBody};

// Re-export glam for convenience
pub use glam;
