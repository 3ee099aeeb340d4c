//! Simulation parameters.

use crate::math::{Dim, Dim2, Dim3};

/// How polytope-vs-polytope pairs find their separating axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PolytopeAlgorithm {
    /// GJK overlap test followed by EPA.
    #[default]
    GjkEpa,
    /// Exhaustive separating-axis scan over faces and edge pairs.
    Sat,
}

/// Configuration for the physics simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsConfig<D: Dim> {
    /// Gravity vector. Default: 9.81 down the Y axis.
    pub gravity: D::Vector,
    /// Fixed timestep for [`PhysicsScene::step`](crate::PhysicsScene::step) in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum number of sub-steps per frame. Default: 4.
    pub max_substeps: u32,
    /// Number of impulse iterations per step. Default: 10.
    pub solver_iterations: u32,
    /// Re-apply last frame's impulses before iterating. Default: true.
    pub warm_starting: bool,
    /// Clamp the running impulse total instead of each increment. Default: true.
    pub accumulate_impulses: bool,
    /// Resolve penetration with separate bias velocities that never feed
    /// back into momentum. Default: false (Baumgarte bias on the real velocity).
    pub split_impulse: bool,
    /// Baumgarte factor. Default: 0.2.
    pub bias_factor: f32,
    /// Penetration tolerated without correction. Default: 0.01.
    pub allowed_penetration: f32,
    /// Gap below which separated shapes still produce contacts. Default: 0.02.
    pub contact_margin: f32,
    /// EPA expansion cap. Default: 64.
    pub epa_max_iterations: u32,
    /// EPA convergence tolerance. Default: 1e-4.
    pub epa_tolerance: f32,
    /// Default: [`PolytopeAlgorithm::GjkEpa`].
    pub polytope_algorithm: PolytopeAlgorithm,
}

impl<D: Dim> Default for PhysicsConfig<D> {
    fn default() -> Self {
        Self {
            gravity: D::up() * -9.81,
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
            solver_iterations: 10,
            warm_starting: true,
            accumulate_impulses: true,
            split_impulse: false,
            bias_factor: 0.2,
            allowed_penetration: 0.01,
            contact_margin: 0.02,
            epa_max_iterations: 64,
            epa_tolerance: 1e-4,
            polytope_algorithm: PolytopeAlgorithm::GjkEpa,
        }
    }
}

pub type PhysicsConfig2 = PhysicsConfig<Dim2>;
pub type PhysicsConfig3 = PhysicsConfig<Dim3>;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    #[test]
    fn test_physics_config_default() {
        let config = PhysicsConfig3::default();
        assert_eq!(config.gravity, Vec3::new(0.0, -9.81, 0.0));
        assert!((config.fixed_timestep - 1.0 / 60.0).abs() < 1e-10);
        assert_eq!(config.max_substeps, 4);
        assert_eq!(config.solver_iterations, 10);
        assert!(config.warm_starting);
        assert!(config.accumulate_impulses);
        assert!(!config.split_impulse);
        assert_eq!(config.epa_max_iterations, 64);
        assert_eq!(config.polytope_algorithm, PolytopeAlgorithm::GjkEpa);

        let planar = PhysicsConfig2::default();
        assert_eq!(planar.gravity, Vec2::new(0.0, -9.81));
    }
}
