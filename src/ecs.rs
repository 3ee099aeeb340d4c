//! hecs integration: entities that own a body in a [`PhysicsScene`].
//!
//! The scene stays the source of truth. Entities carry a [`PhysicsBody`]
//! handle plus a [`Transform`] component that [`sync_transforms`] refreshes
//! after each step.

use hecs::{Entity, World};
use tracing::debug;

use crate::error::{PhysicsError, Result};
use crate::math::{Dim, Transform};
use crate::rigid_body::{BodyDesc, RigidBody};
use crate::scene::{BodyHandle, PhysicsScene};

/// Component linking an entity to its body in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicsBody(pub BodyHandle);

/// Create a body for `entity` and attach the handle to it.
///
/// If the entity already has a `Transform<D>`, it overrides the transform in
/// `desc` so the body starts where the entity is.
pub fn attach_body<D: Dim>(
    scene: &mut PhysicsScene<D>,
    world: &mut World,
    entity: Entity,
    desc: BodyDesc<D>,
) -> Result<BodyHandle> {
    if !world.contains(entity) {
        return Err(PhysicsError::NoSuchEntity);
    }

    let desc = match world.get::<&Transform<D>>(entity) {
        Ok(transform) => desc.with_transform(*transform),
        Err(_) => desc,
    };

    let handle = scene.add_body(desc)?;
    let transform = scene
        .body(handle)
        .map(|body| *body.transform())
        .unwrap_or_else(Transform::identity);

    if world
        .insert(entity, (PhysicsBody(handle), transform))
        .is_err()
    {
        scene.remove_body(handle)?;
        return Err(PhysicsError::NoSuchEntity);
    }

    debug!(?entity, ?handle, "Attached body to entity");
    Ok(handle)
}

/// Detach the body from `entity` and remove it from the scene.
///
/// The entity keeps its last `Transform<D>`.
pub fn detach_body<D: Dim>(
    scene: &mut PhysicsScene<D>,
    world: &mut World,
    entity: Entity,
) -> Result<RigidBody<D>> {
    let PhysicsBody(handle) = world
        .remove_one::<PhysicsBody>(entity)
        .map_err(|_| PhysicsError::NoSuchEntity)?;
    scene.remove_body(handle)
}

/// Copy every body's transform into its entity's `Transform<D>` component.
///
/// Entities whose handle went stale are skipped. Returns the number of
/// transforms written.
pub fn sync_transforms<D: Dim>(scene: &PhysicsScene<D>, world: &mut World) -> usize {
    let mut synced = 0;
    for (_entity, (body, transform)) in
        world.query_mut::<(&PhysicsBody, &mut Transform<D>)>()
    {
        if let Some(rigid_body) = scene.body(body.0) {
            *transform = *rigid_body.transform();
            synced += 1;
        }
    }
    synced
}
