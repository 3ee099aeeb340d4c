//! Contact data structures for collision response.

use arrayvec::ArrayVec;
use tracing::error;

use crate::error::{PhysicsError, Result};
use crate::math::Dim;

/// Storage capacity of a manifold. The logical cap is [`Dim::MAX_CONTACTS`].
pub const MANIFOLD_CAPACITY: usize = 8;

/// Axis and depth between two shapes.
///
/// `normal` is a unit vector pointing from the first shape toward the second.
/// A positive `depth` is a penetration; zero or negative is a gap of `-depth`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation<D: Dim> {
    pub normal: D::Vector,
    pub depth: f32,
}

impl<D: Dim> Separation<D> {
    pub fn new(normal: D::Vector, depth: f32) -> Self {
        Self { normal, depth }
    }

    pub fn is_penetrating(&self) -> bool {
        self.depth > 0.0
    }

    /// The same separation seen from the other shape.
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            depth: self.depth,
        }
    }
}

/// Identifies which pair of features produced a contact, so impulses can be
/// carried across frames.
///
/// `reference` is the face (3D) or edge (2D) the incident points were clipped
/// against, `incident` the vertex of the other shape, and `flipped` records
/// that the second shape supplied the reference feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId {
    pub flipped: bool,
    pub reference: u32,
    pub incident: u32,
}

impl FeatureId {
    /// Single-point contacts between curved shapes.
    pub const SINGLE: Self = Self {
        flipped: false,
        reference: u32::MAX,
        incident: u32::MAX,
    };

    pub const fn new(reference: u32, incident: u32) -> Self {
        Self {
            flipped: false,
            reference,
            incident,
        }
    }

    /// Toggle `flipped`, used when a pair routine ran with its arguments swapped.
    pub const fn flip(self) -> Self {
        Self {
            flipped: !self.flipped,
            ..self
        }
    }
}

/// A single contact point with accumulated impulse data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint<D: Dim> {
    /// Contact position in world space.
    pub position: D::Vector,
    /// Contact normal (from body A to body B).
    pub normal: D::Vector,
    /// Signed distance along the normal; negative means penetrating.
    pub separation: f32,
    pub id: FeatureId,
    /// Offset from body A's center of mass.
    pub r_a: D::Vector,
    /// Offset from body B's center of mass.
    pub r_b: D::Vector,
    /// Accumulated normal impulse.
    pub normal_impulse: f32,
    /// Accumulated tangent impulses (one friction direction in 2D, two in 3D).
    pub tangent_impulse: [f32; 2],
    /// Accumulated position-correction impulse (split impulse only).
    pub bias_impulse: f32,
    pub normal_mass: f32,
    pub tangent_mass: [f32; 2],
    pub tangents: [D::Vector; 2],
    /// Target normal velocity: Baumgarte push-out when penetrating, negative
    /// (allowed approach) when still separated.
    pub bias: f32,
}

impl<D: Dim> ContactPoint<D> {
    pub fn new(position: D::Vector, normal: D::Vector, separation: f32, id: FeatureId) -> Self {
        Self {
            position,
            normal,
            separation,
            id,
            r_a: D::zero(),
            r_b: D::zero(),
            normal_impulse: 0.0,
            tangent_impulse: [0.0; 2],
            bias_impulse: 0.0,
            normal_mass: 0.0,
            tangent_mass: [0.0; 2],
            tangents: [D::zero(); 2],
            bias: 0.0,
        }
    }

    /// Copy the accumulated impulses of a matched contact from the previous frame.
    pub fn inherit_impulses(&mut self, previous: &ContactPoint<D>) {
        self.normal_impulse = previous.normal_impulse;
        self.tangent_impulse = previous.tangent_impulse;
        self.bias_impulse = previous.bias_impulse;
    }
}

/// Contact points between two bodies, capped at [`Dim::MAX_CONTACTS`].
#[derive(Debug, Clone, PartialEq)]
pub struct Manifold<D: Dim> {
    points: ArrayVec<ContactPoint<D>, MANIFOLD_CAPACITY>,
}

impl<D: Dim> Default for Manifold<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Dim> Manifold<D> {
    pub fn new() -> Self {
        Self {
            points: ArrayVec::new(),
        }
    }

    /// A manifold holding one point.
    pub fn single(point: ContactPoint<D>) -> Self {
        let mut manifold = Self::new();
        manifold.points.push(point);
        manifold
    }

    /// Build from clipped points.
    ///
    /// More than [`Dim::MAX_CONTACTS`] points means a non-convex shape slipped
    /// through or the clipper is broken: debug builds panic, release builds
    /// log and keep the deepest points.
    pub fn from_clipped(points: Vec<ContactPoint<D>>) -> Self {
        debug_assert!(
            points.len() <= D::MAX_CONTACTS,
            "contact capacity exceeded: {} > {}",
            points.len(),
            D::MAX_CONTACTS
        );
        if points.len() > D::MAX_CONTACTS {
            error!(
                count = points.len(),
                cap = D::MAX_CONTACTS,
                "contact capacity exceeded, keeping deepest points"
            );
        }
        Self::from_deepest(points)
    }

    /// Build from candidate points, keeping the deepest when over the cap.
    pub fn from_deepest(mut points: Vec<ContactPoint<D>>) -> Self {
        if points.len() > D::MAX_CONTACTS {
            points.sort_by(|a, b| a.separation.total_cmp(&b.separation));
            points.truncate(D::MAX_CONTACTS);
        }
        Self {
            points: points.into_iter().take(MANIFOLD_CAPACITY).collect(),
        }
    }

    /// Append a point, failing once [`Dim::MAX_CONTACTS`] is reached.
    pub fn push(&mut self, point: ContactPoint<D>) -> Result<()> {
        if self.points.len() >= D::MAX_CONTACTS {
            return Err(PhysicsError::ContactCapacityExceeded {
                count: self.points.len() + 1,
                cap: D::MAX_CONTACTS,
            });
        }
        self.points.push(point);
        Ok(())
    }

    pub fn points(&self) -> &[ContactPoint<D>] {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut [ContactPoint<D>] {
        &mut self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContactPoint<D>> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Find the point with the given feature pair.
    pub fn find(&self, id: FeatureId) -> Option<&ContactPoint<D>> {
        self.points.iter().find(|p| p.id == id)
    }

    /// Deepest (most negative) separation, if any.
    pub fn min_separation(&self) -> Option<f32> {
        self.points
            .iter()
            .map(|p| p.separation)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Swap the roles of the two bodies.
    pub fn flip(&mut self) {
        for point in &mut self.points {
            point.normal = -point.normal;
            point.id = point.id.flip();
        }
    }
}

impl<'a, D: Dim> IntoIterator for &'a Manifold<D> {
    type Item = &'a ContactPoint<D>;
    type IntoIter = std::slice::Iter<'a, ContactPoint<D>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
