//! Rigid body state, mass setup and integration.

use crate::error::{PhysicsError, Result};
use crate::math::{Aabb, Dim, Transform};
use crate::shape::{ColliderShape, MassProperties};

/// How a body's mass is specified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mass {
    /// Mass from the collider's area or volume times this density.
    Density(f32),
    /// Fixed total mass, distributed like a uniform-density solid.
    Total(f32),
    /// Static: never integrated and never moved by impulses.
    Infinite,
}

impl Default for Mass {
    fn default() -> Self {
        Self::Density(1.0)
    }
}

/// Everything needed to create a body.
#[derive(Debug, Clone)]
pub struct BodyDesc<D: Dim> {
    pub collider: D::Collider,
    pub transform: Transform<D>,
    pub mass: Mass,
    /// Coulomb friction coefficient. Default: 0.5.
    pub friction: f32,
    /// Default: true.
    pub affected_by_gravity: bool,
    pub linear_velocity: D::Vector,
    pub angular_velocity: D::Angular,
}

impl<D: Dim> BodyDesc<D> {
    /// A dynamic body of unit density at the origin.
    pub fn new(collider: D::Collider) -> Self {
        Self {
            collider,
            transform: Transform::identity(),
            mass: Mass::default(),
            friction: 0.5,
            affected_by_gravity: true,
            linear_velocity: D::zero(),
            angular_velocity: D::Angular::default(),
        }
    }

    /// A static body.
    pub fn fixed(collider: D::Collider) -> Self {
        Self::new(collider).with_mass(Mass::Infinite)
    }

    pub fn with_transform(mut self, transform: Transform<D>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_position(mut self, position: D::Vector) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_mass(mut self, mass: Mass) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_gravity(mut self, affected: bool) -> Self {
        self.affected_by_gravity = affected;
        self
    }

    pub fn with_linear_velocity(mut self, velocity: D::Vector) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, velocity: D::Angular) -> Self {
        self.angular_velocity = velocity;
        self
    }
}

/// A simulated body.
///
/// `transform.position` is the body origin; the center of mass sits at
/// `local_center` (body axes, scale applied) from it. Static bodies have zero
/// inverse mass and zero inverse inertia.
#[derive(Debug, Clone)]
pub struct RigidBody<D: Dim> {
    collider: D::Collider,
    transform: Transform<D>,
    pub linear_velocity: D::Vector,
    pub angular_velocity: D::Angular,
    force: D::Vector,
    torque: D::Angular,
    mass: f32,
    inv_mass: f32,
    inertia: D::Inertia,
    inv_inertia: D::Inertia,
    world_inv_inertia: D::Inertia,
    density: f32,
    local_center: D::Vector,
    pub friction: f32,
    pub affected_by_gravity: bool,
    pub(crate) bias_linear_velocity: D::Vector,
    pub(crate) bias_angular_velocity: D::Angular,
}

impl<D: Dim> RigidBody<D> {
    pub fn new(desc: BodyDesc<D>) -> Result<Self> {
        let mut body = Self {
            collider: desc.collider,
            transform: desc.transform,
            linear_velocity: desc.linear_velocity,
            angular_velocity: desc.angular_velocity,
            force: D::zero(),
            torque: D::Angular::default(),
            mass: 0.0,
            inv_mass: 0.0,
            inertia: D::zero_inertia(),
            inv_inertia: D::zero_inertia(),
            world_inv_inertia: D::zero_inertia(),
            density: 0.0,
            local_center: D::zero(),
            friction: desc.friction,
            affected_by_gravity: desc.affected_by_gravity,
            bias_linear_velocity: D::zero(),
            bias_angular_velocity: D::Angular::default(),
        };
        body.set_mass(desc.mass)?;
        Ok(body)
    }

    /// Recompute mass, inertia and center of mass.
    ///
    /// On error the body keeps its previous mass.
    pub fn set_mass(&mut self, mass: Mass) -> Result<()> {
        let (props, density) = match mass {
            Mass::Infinite => {
                self.mass = f32::INFINITY;
                self.inv_mass = 0.0;
                self.inertia = D::zero_inertia();
                self.inv_inertia = D::zero_inertia();
                self.world_inv_inertia = D::zero_inertia();
                self.density = 0.0;
                self.linear_velocity = D::zero();
                self.angular_velocity = D::Angular::default();
                return Ok(());
            }
            Mass::Density(density) => {
                if !(density.is_finite() && density > 0.0) {
                    return Err(PhysicsError::InvalidBody {
                        reason: "density must be positive and finite",
                    });
                }
                (self.shape_mass(density)?, density)
            }
            Mass::Total(total) => {
                if !(total.is_finite() && total > 0.0) {
                    return Err(PhysicsError::InvalidBody {
                        reason: "mass must be positive and finite",
                    });
                }
                let props = self.shape_mass(1.0)?;
                let density = total / props.measure;
                (props.with_mass(total), density)
            }
        };

        self.mass = props.mass;
        self.inv_mass = 1.0 / props.mass;
        self.inertia = props.inertia;
        self.inv_inertia = D::invert_inertia(props.inertia);
        self.density = density;
        self.local_center = props.local_center;
        self.refresh_world_inertia();
        Ok(())
    }

    fn shape_mass(&self, density: f32) -> Result<MassProperties<D>> {
        let props = self
            .collider
            .mass_properties(self.transform.scale, density)
            .ok_or(PhysicsError::InvalidBody {
                reason: "unbounded colliders can only be static",
            })?;
        if !(props.mass.is_finite() && props.mass > 0.0) {
            return Err(PhysicsError::InvalidBody {
                reason: "collider has no area or volume",
            });
        }
        Ok(props)
    }

    fn refresh_world_inertia(&mut self) {
        self.world_inv_inertia = D::world_inertia(self.inv_inertia, self.transform.rotation);
    }

    pub fn collider(&self) -> &D::Collider {
        &self.collider
    }

    pub fn transform(&self) -> &Transform<D> {
        &self.transform
    }

    /// Teleport the body. Velocities are kept.
    pub fn set_transform(&mut self, transform: Transform<D>) {
        self.transform = transform;
        self.refresh_world_inertia();
    }

    pub fn position(&self) -> D::Vector {
        self.transform.position
    }

    pub fn rotation(&self) -> D::Rotation {
        self.transform.rotation
    }

    pub fn aabb(&self) -> Aabb<D> {
        self.collider.aabb(&self.transform)
    }

    pub fn is_static(&self) -> bool {
        self.inv_mass == 0.0
    }

    /// Total mass; infinite for static bodies.
    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Inertia about the center of mass, in body axes.
    pub fn inertia(&self) -> D::Inertia {
        self.inertia
    }

    pub fn inv_inertia(&self) -> D::Inertia {
        self.inv_inertia
    }

    /// Inverse inertia rotated into world axes.
    pub fn world_inv_inertia(&self) -> D::Inertia {
        self.world_inv_inertia
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn local_center(&self) -> D::Vector {
        self.local_center
    }

    pub fn force(&self) -> D::Vector {
        self.force
    }

    pub fn torque(&self) -> D::Angular {
        self.torque
    }

    pub fn world_center_of_mass(&self) -> D::Vector {
        self.transform.position + D::rotate(self.transform.rotation, self.local_center)
    }

    /// Velocity of the material point at world position `point`.
    pub fn velocity_at_point(&self, point: D::Vector) -> D::Vector {
        self.linear_velocity
            + D::angular_cross(self.angular_velocity, point - self.world_center_of_mass())
    }

    pub(crate) fn velocity_at_offset(&self, r: D::Vector) -> D::Vector {
        self.linear_velocity + D::angular_cross(self.angular_velocity, r)
    }

    pub(crate) fn bias_velocity_at_offset(&self, r: D::Vector) -> D::Vector {
        self.bias_linear_velocity + D::angular_cross(self.bias_angular_velocity, r)
    }

    /// Add a force through the center of mass for the next step.
    pub fn apply_force(&mut self, force: D::Vector) {
        if self.is_static() {
            return;
        }
        self.force += force;
    }

    /// Add a force acting at world position `point`; the offset from the
    /// center of mass adds torque.
    pub fn apply_force_at_point(&mut self, force: D::Vector, point: D::Vector) {
        if self.is_static() {
            return;
        }
        self.force += force;
        self.torque += D::cross(point - self.world_center_of_mass(), force);
    }

    pub fn apply_torque(&mut self, torque: D::Angular) {
        if self.is_static() {
            return;
        }
        self.torque += torque;
    }

    /// Instantly change momentum by `impulse` applied at world position `point`.
    pub fn apply_impulse(&mut self, impulse: D::Vector, point: D::Vector) {
        let r = point - self.world_center_of_mass();
        self.apply_impulse_at_offset(impulse, r);
    }

    /// Impulse at offset `r` from the center of mass.
    pub(crate) fn apply_impulse_at_offset(&mut self, impulse: D::Vector, r: D::Vector) {
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += D::apply_inertia(self.world_inv_inertia, D::cross(r, impulse));
    }

    /// Position-correction impulse; affects only the bias velocities.
    pub(crate) fn apply_bias_impulse_at_offset(&mut self, impulse: D::Vector, r: D::Vector) {
        self.bias_linear_velocity += impulse * self.inv_mass;
        self.bias_angular_velocity +=
            D::apply_inertia(self.world_inv_inertia, D::cross(r, impulse));
    }

    /// Semi-implicit Euler on velocities, then clear the force accumulators.
    pub fn integrate_forces(&mut self, gravity: D::Vector, dt: f32) {
        if !self.is_static() {
            if self.affected_by_gravity {
                self.linear_velocity += gravity * dt;
            }
            self.linear_velocity += self.force * (self.inv_mass * dt);
            self.angular_velocity += D::apply_inertia(self.world_inv_inertia, self.torque) * dt;
        }
        self.force = D::zero();
        self.torque = D::Angular::default();
    }

    /// Move the center of mass by the linear velocity, spin the orientation
    /// about it, and place the origin back relative to the new orientation.
    pub fn integrate_velocities(&mut self, dt: f32) {
        if self.is_static() {
            return;
        }
        let linear = self.linear_velocity + self.bias_linear_velocity;
        let angular = self.angular_velocity + self.bias_angular_velocity;
        self.bias_linear_velocity = D::zero();
        self.bias_angular_velocity = D::Angular::default();

        let center = self.world_center_of_mass() + linear * dt;
        let rotation = D::integrate_rotation(self.transform.rotation, angular, dt);
        self.transform.rotation = rotation;
        self.transform.position = center - D::rotate(rotation, self.local_center);
        self.refresh_world_inertia();
    }
}
