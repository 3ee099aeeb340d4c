//! Narrowphase collision detection.
//!
//! GJK answers overlap and distance queries, EPA measures penetration, SAT
//! scans candidate axes, and the clipper turns a separating axis into a
//! contact manifold. [`detect_contacts_3d`] and [`detect_contacts_2d`] pick
//! the right combination for each shape pair.

pub mod clip;
pub mod dispatch;
pub mod epa;
pub mod gjk;
pub mod sat;
pub mod simplex;

pub use dispatch::{detect_contacts_2d, detect_contacts_3d, Penetration};
pub use epa::EpaSettings;
pub use gjk::Distance;
