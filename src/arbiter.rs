//! Persistent contact state for one body pair and the sequential impulse solver.
//!
//! Each step the pair's manifold is rebuilt from scratch and merged with the
//! previous one by [`FeatureId`](crate::contact::FeatureId): matched points
//! keep their accumulated impulses so the solver can warm start. `pre_step`
//! computes effective masses and the velocity bias, then `apply_impulse` runs
//! once per solver iteration. Penetrating points get a Baumgarte push-out;
//! points still inside the contact margin are speculative and only stop the
//! approach that would carry the gap past zero within the step.

use crate::config::PhysicsConfig;
use crate::contact::{ContactPoint, Manifold};
use crate::math::Dim;
use crate::rigid_body::RigidBody;
use crate::scene::BodyHandle;

/// Unordered body pair. `a` is always the smaller handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArbiterKey {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

impl ArbiterKey {
    pub fn new(x: BodyHandle, y: BodyHandle) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    pub fn involves(&self, handle: BodyHandle) -> bool {
        self.a == handle || self.b == handle
    }
}

/// Combined friction of two surfaces.
pub fn mix_friction(a: f32, b: f32) -> f32 {
    (a * b).sqrt()
}

/// Contact state between two bodies; normals point from `key.a` to `key.b`.
#[derive(Debug, Clone)]
pub struct Arbiter<D: Dim> {
    key: ArbiterKey,
    manifold: Manifold<D>,
    friction: f32,
}

impl<D: Dim> Arbiter<D> {
    pub fn new(key: ArbiterKey, manifold: Manifold<D>, friction: f32) -> Self {
        Self {
            key,
            manifold,
            friction,
        }
    }

    pub fn key(&self) -> ArbiterKey {
        self.key
    }

    pub fn manifold(&self) -> &Manifold<D> {
        &self.manifold
    }

    pub fn contacts(&self) -> &[ContactPoint<D>] {
        self.manifold.points()
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Sum of the accumulated normal impulses.
    pub fn total_normal_impulse(&self) -> f32 {
        self.manifold.iter().map(|c| c.normal_impulse).sum()
    }

    /// Replace the manifold, carrying impulses over for matching feature pairs.
    pub fn update(&mut self, mut manifold: Manifold<D>, warm_starting: bool) {
        if warm_starting {
            for point in manifold.points_mut() {
                if let Some(previous) = self.manifold.find(point.id) {
                    point.inherit_impulses(previous);
                }
            }
        }
        self.manifold = manifold;
    }

    /// Effective masses, lever arms and bias; applies the warm-start impulse.
    pub fn pre_step(
        &mut self,
        a: &mut RigidBody<D>,
        b: &mut RigidBody<D>,
        inv_dt: f32,
        config: &PhysicsConfig<D>,
    ) {
        let center_a = a.world_center_of_mass();
        let center_b = b.world_center_of_mass();

        for c in self.manifold.points_mut() {
            c.r_a = c.position - center_a;
            c.r_b = c.position - center_b;
            c.normal_mass = effective_mass(a, b, c.r_a, c.r_b, c.normal);
            c.tangents = D::tangent_basis(c.normal);
            for i in 0..D::TANGENTS {
                c.tangent_mass[i] = effective_mass(a, b, c.r_a, c.r_b, c.tangents[i]);
            }
            c.bias = if c.separation > 0.0 {
                // Speculative: the gap may close within this step, no further.
                -c.separation * inv_dt
            } else {
                let penetration = (c.separation + config.allowed_penetration).min(0.0);
                -config.bias_factor * inv_dt * penetration
            };

            if config.warm_starting {
                let mut impulse = c.normal * c.normal_impulse;
                for i in 0..D::TANGENTS {
                    impulse += c.tangents[i] * c.tangent_impulse[i];
                }
                a.apply_impulse_at_offset(-impulse, c.r_a);
                b.apply_impulse_at_offset(impulse, c.r_b);
            } else {
                c.normal_impulse = 0.0;
                c.tangent_impulse = [0.0; 2];
            }
            c.bias_impulse = 0.0;
        }
    }

    /// One sequential-impulse pass over every contact.
    pub fn apply_impulse(
        &mut self,
        a: &mut RigidBody<D>,
        b: &mut RigidBody<D>,
        config: &PhysicsConfig<D>,
    ) {
        let friction = self.friction;
        for c in self.manifold.points_mut() {
            let dv = b.velocity_at_offset(c.r_b) - a.velocity_at_offset(c.r_a);
            let vn = D::dot(dv, c.normal);
            let target = if config.split_impulse {
                -vn + c.bias.min(0.0)
            } else {
                -vn + c.bias
            };
            let mut dpn = c.normal_mass * target;
            if config.accumulate_impulses {
                let old = c.normal_impulse;
                c.normal_impulse = (old + dpn).max(0.0);
                dpn = c.normal_impulse - old;
            } else {
                dpn = dpn.max(0.0);
            }
            let pn = c.normal * dpn;
            a.apply_impulse_at_offset(-pn, c.r_a);
            b.apply_impulse_at_offset(pn, c.r_b);

            if config.split_impulse {
                let dvb = b.bias_velocity_at_offset(c.r_b) - a.bias_velocity_at_offset(c.r_a);
                let vnb = D::dot(dvb, c.normal);
                let mut dpb = c.normal_mass * (-vnb + c.bias.max(0.0));
                let old = c.bias_impulse;
                c.bias_impulse = (old + dpb).max(0.0);
                dpb = c.bias_impulse - old;
                let pb = c.normal * dpb;
                a.apply_bias_impulse_at_offset(-pb, c.r_a);
                b.apply_bias_impulse_at_offset(pb, c.r_b);
            }

            for i in 0..D::TANGENTS {
                let tangent = c.tangents[i];
                let dv = b.velocity_at_offset(c.r_b) - a.velocity_at_offset(c.r_a);
                let vt = D::dot(dv, tangent);
                let mut dpt = -c.tangent_mass[i] * vt;
                if config.accumulate_impulses {
                    let max = friction * c.normal_impulse;
                    let old = c.tangent_impulse[i];
                    c.tangent_impulse[i] = (old + dpt).clamp(-max, max);
                    dpt = c.tangent_impulse[i] - old;
                } else {
                    let max = friction * dpn;
                    dpt = dpt.clamp(-max, max);
                }
                let pt = tangent * dpt;
                a.apply_impulse_at_offset(-pt, c.r_a);
                b.apply_impulse_at_offset(pt, c.r_b);
            }
        }
    }
}

/// `1 / (J M^-1 J^T)` along `direction`, or zero when both bodies are immovable.
fn effective_mass<D: Dim>(
    a: &RigidBody<D>,
    b: &RigidBody<D>,
    r_a: D::Vector,
    r_b: D::Vector,
    direction: D::Vector,
) -> f32 {
    let ra_x = D::cross(r_a, direction);
    let rb_x = D::cross(r_b, direction);
    let k = a.inv_mass()
        + b.inv_mass()
        + D::angular_dot(ra_x, D::apply_inertia(a.world_inv_inertia(), ra_x))
        + D::angular_dot(rb_x, D::apply_inertia(b.world_inv_inertia(), rb_x));
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}
