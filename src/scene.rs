//! The physics scene: body storage, arbiters, and the per-frame pipeline.
//!
//! # Pipeline
//!
//! Each [`PhysicsScene::frame_step`] runs, in order:
//!
//! 1. Broadphase and narrowphase: create, update or drop arbiters
//! 2. Apply forces (gravity, accumulated force and torque) to velocities
//! 3. Pre-step every arbiter (effective masses, bias, warm start)
//! 4. Sequential impulse iterations
//! 5. Integrate positions and orientations about the center of mass

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace, warn};

use crate::arbiter::{mix_friction, Arbiter, ArbiterKey};
use crate::broadphase::{AllPairs, Proxy};
use crate::config::PhysicsConfig;
use crate::error::{PhysicsError, Result};
use crate::math::{Dim, Dim2, Dim3};
use crate::rigid_body::{BodyDesc, RigidBody};
use crate::shape::ColliderShape;

/// Generational index of a body in a [`PhysicsScene`].
///
/// A handle stays invalid after its body is removed, even once the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    pub const fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub const fn index(self) -> u32 {
        self.index
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone)]
struct Slot<D: Dim> {
    generation: u32,
    body: Option<RigidBody<D>>,
}

/// Unsimulated wall time carried between [`PhysicsScene::step`] calls.
#[derive(Debug, Clone, Copy, Default)]
struct StepClock {
    pending: f64,
}

impl StepClock {
    /// Bank `elapsed` and return the number of `period` steps now due, at most
    /// `cap`. A backlog beyond `cap` is dropped, keeping only the fraction of a
    /// step, so a long stall never snowballs into ever longer frames.
    fn advance(&mut self, elapsed: f64, period: f64, cap: u32) -> u32 {
        if !(period > 0.0) {
            return 0;
        }
        self.pending += elapsed.max(0.0);
        let due = (self.pending / period).floor();
        if due > f64::from(cap) {
            self.pending %= period;
            return cap;
        }
        self.pending -= due * period;
        due as u32
    }
}

/// Owns all bodies and active arbiters.
#[derive(Debug, Clone)]
pub struct PhysicsScene<D: Dim> {
    config: PhysicsConfig<D>,
    slots: Vec<Slot<D>>,
    free: Vec<u32>,
    arbiters: BTreeMap<ArbiterKey, Arbiter<D>>,
    broadphase: AllPairs,
    clock: StepClock,
}

pub type PhysicsScene2 = PhysicsScene<Dim2>;
pub type PhysicsScene3 = PhysicsScene<Dim3>;

impl<D: Dim> Default for PhysicsScene<D> {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

impl<D: Dim> PhysicsScene<D> {
    /// Create a new scene with the given configuration.
    pub fn new(config: PhysicsConfig<D>) -> Self {
        Self {
            config,
            slots: Vec::new(),
            free: Vec::new(),
            arbiters: BTreeMap::new(),
            broadphase: AllPairs::new(),
            clock: StepClock::default(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig<D> {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PhysicsConfig<D> {
        &mut self.config
    }

    /// Build a body from `desc` and add it.
    pub fn add_body(&mut self, desc: BodyDesc<D>) -> Result<BodyHandle> {
        let body = RigidBody::new(desc)?;
        Ok(self.insert_body(body))
    }

    /// Add an already constructed body.
    pub fn insert_body(&mut self, body: RigidBody<D>) -> BodyHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            return BodyHandle::from_raw_parts(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            body: Some(body),
        });
        BodyHandle::from_raw_parts(index, 0)
    }

    /// Remove a body and every arbiter that references it.
    ///
    /// Unknown or stale handles are logged and reported as
    /// [`PhysicsError::UnknownBody`].
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<RigidBody<D>> {
        let Some(body) = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.take())
        else {
            warn!(?handle, "remove_body called with an unknown handle");
            return Err(PhysicsError::UnknownBody {
                index: handle.index,
                generation: handle.generation,
            });
        };

        let slot = &mut self.slots[handle.index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);

        let before = self.arbiters.len();
        self.arbiters.retain(|key, _| !key.involves(handle));
        debug!(
            ?handle,
            dropped = before - self.arbiters.len(),
            "body removed"
        );
        Ok(body)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.body(handle).is_some()
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody<D>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_ref())
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody<D>> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_mut())
    }

    /// Live bodies in slot order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody<D>)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.body
                .as_ref()
                .map(|body| (BodyHandle::from_raw_parts(index as u32, slot.generation), body))
        })
    }

    pub fn body_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.body.is_some()).count()
    }

    /// Active arbiters, ordered by key.
    pub fn arbiters(&self) -> impl Iterator<Item = &Arbiter<D>> {
        self.arbiters.values()
    }

    /// The arbiter between two bodies, in either order.
    pub fn arbiter(&self, a: BodyHandle, b: BodyHandle) -> Option<&Arbiter<D>> {
        self.arbiters.get(&ArbiterKey::new(a, b))
    }

    /// Number of contact points across all arbiters.
    pub fn contact_count(&self) -> usize {
        self.arbiters.values().map(|arbiter| arbiter.contacts().len()).sum()
    }

    /// Advance by `delta_time` seconds of wall time in whole `fixed_timestep`
    /// steps and return how many were run.
    pub fn step(&mut self, delta_time: f64) -> u32 {
        let steps = self.clock.advance(
            delta_time,
            self.config.fixed_timestep,
            self.config.max_substeps,
        );
        let dt = self.config.fixed_timestep as f32;
        for _ in 0..steps {
            self.frame_step(dt);
        }
        steps
    }

    /// Run the whole pipeline once with timestep `dt`.
    pub fn frame_step(&mut self, dt: f32) {
        if !(dt > 0.0) {
            warn!(dt, "frame_step skipped: timestep must be positive");
            return;
        }
        trace!(
            dt,
            bodies = self.body_count(),
            arbiters = self.arbiters.len(),
            "frame step"
        );
        let inv_dt = 1.0 / dt;

        // 1. Broadphase + narrowphase
        self.update_arbiters();

        // 2. Apply forces
        let gravity = self.config.gravity;
        for body in self.slots.iter_mut().filter_map(|slot| slot.body.as_mut()) {
            body.integrate_forces(gravity, dt);
        }

        // 3. Pre-step
        for (key, arbiter) in self.arbiters.iter_mut() {
            if let Some((a, b)) = pair_mut(&mut self.slots, *key) {
                arbiter.pre_step(a, b, inv_dt, &self.config);
            }
        }

        // 4. Impulse iterations
        for _ in 0..self.config.solver_iterations {
            for (key, arbiter) in self.arbiters.iter_mut() {
                if let Some((a, b)) = pair_mut(&mut self.slots, *key) {
                    arbiter.apply_impulse(a, b, &self.config);
                }
            }
        }

        // 5. Integrate positions
        for body in self.slots.iter_mut().filter_map(|slot| slot.body.as_mut()) {
            body.integrate_velocities(dt);
        }
    }

    fn update_arbiters(&mut self) {
        let margin = self.config.contact_margin;
        let proxies: Vec<Proxy<D>> = self
            .bodies()
            .map(|(handle, body)| Proxy {
                handle,
                aabb: body.aabb().expanded(margin),
                is_static: body.is_static(),
            })
            .collect();

        let mut touching = BTreeSet::new();
        for key in self.broadphase.find_pairs(&proxies) {
            let (Some(a), Some(b)) = (self.body(key.a), self.body(key.b)) else {
                continue;
            };
            let manifold =
                a.collider()
                    .detect_contacts(a.transform(), b.collider(), b.transform(), &self.config);
            if manifold.is_empty() {
                continue;
            }
            let friction = mix_friction(a.friction, b.friction);
            touching.insert(key);

            match self.arbiters.entry(key) {
                Entry::Occupied(mut entry) => {
                    entry.get_mut().update(manifold, self.config.warm_starting);
                }
                Entry::Vacant(entry) => {
                    debug!(?key, contacts = manifold.len(), "arbiter created");
                    entry.insert(Arbiter::new(key, manifold, friction));
                }
            }
        }

        self.arbiters.retain(|key, _| {
            let keep = touching.contains(key);
            if !keep {
                debug!(?key, "arbiter removed");
            }
            keep
        });
    }
}

/// Mutable references to both bodies of a pair.
fn pair_mut<D: Dim>(
    slots: &mut [Slot<D>],
    key: ArbiterKey,
) -> Option<(&mut RigidBody<D>, &mut RigidBody<D>)> {
    let (ia, ib) = (key.a.index as usize, key.b.index as usize);
    if ia >= ib || ib >= slots.len() {
        return None;
    }
    let (left, right) = slots.split_at_mut(ib);
    let slot_a = &mut left[ia];
    let slot_b = &mut right[0];
    if slot_a.generation != key.a.generation || slot_b.generation != key.b.generation {
        return None;
    }
    Some((slot_a.body.as_mut()?, slot_b.body.as_mut()?))
}
