//! Broadphase collision detection using AABB overlap tests.

use crate::arbiter::ArbiterKey;
use crate::math::{Aabb, Dim};
use crate::scene::BodyHandle;

/// A body as seen by the broadphase.
#[derive(Debug, Clone, Copy)]
pub struct Proxy<D: Dim> {
    pub handle: BodyHandle,
    pub aabb: Aabb<D>,
    pub is_static: bool,
}

/// All-pairs broadphase (O(n^2) pair-wise AABB test).
#[derive(Debug, Default, Clone, Copy)]
pub struct AllPairs;

impl AllPairs {
    pub fn new() -> Self {
        Self
    }

    /// Find all pairs of bodies whose AABBs overlap.
    ///
    /// Only returns pairs where at least one body is dynamic. Pairs come out
    /// in proxy order, each key canonicalized.
    pub fn find_pairs<D: Dim>(&self, proxies: &[Proxy<D>]) -> Vec<ArbiterKey> {
        let mut pairs = Vec::new();

        for (i, a) in proxies.iter().enumerate() {
            for b in &proxies[i + 1..] {
                // Skip static-static pairs
                if a.is_static && b.is_static {
                    continue;
                }

                if a.aabb.overlaps(&b.aabb) {
                    pairs.push(ArbiterKey::new(a.handle, b.handle));
                }
            }
        }

        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Dim3;
    use glam::Vec3;

    fn sphere(index: u32, center: Vec3, radius: f32, is_static: bool) -> Proxy<Dim3> {
        Proxy {
            handle: BodyHandle::from_raw_parts(index, 0),
            aabb: Aabb::from_center_radius(center, radius),
            is_static,
        }
    }

    #[test]
    fn test_broadphase_overlapping() {
        let proxies = [
            sphere(0, Vec3::ZERO, 1.0, false),
            sphere(1, Vec3::new(1.0, 0.0, 0.0), 1.0, false),
        ];
        let pairs = AllPairs::new().find_pairs(&proxies);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].a.index(), 0);
        assert_eq!(pairs[0].b.index(), 1);
    }

    #[test]
    fn test_broadphase_no_overlap() {
        let proxies = [
            sphere(0, Vec3::ZERO, 0.5, false),
            sphere(1, Vec3::new(10.0, 0.0, 0.0), 0.5, false),
        ];
        assert!(AllPairs::new().find_pairs(&proxies).is_empty());
    }

    #[test]
    fn test_broadphase_static_static_skipped() {
        let proxies = [
            sphere(0, Vec3::ZERO, 1.0, true),
            sphere(1, Vec3::ZERO, 1.0, true),
            sphere(2, Vec3::new(0.5, 0.0, 0.0), 1.0, false),
        ];
        let pairs = AllPairs::new().find_pairs(&proxies);
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|k| k.involves(BodyHandle::from_raw_parts(2, 0))));
    }

    #[test]
    fn test_unbounded_proxy_pairs_with_everything_dynamic() {
        let ground = Proxy::<Dim3> {
            handle: BodyHandle::from_raw_parts(0, 0),
            aabb: Aabb::everything(),
            is_static: true,
        };
        let proxies = [
            ground,
            sphere(1, Vec3::new(100.0, 5.0, 0.0), 1.0, false),
            sphere(2, Vec3::new(-40.0, 0.0, 3.0), 1.0, false),
        ];
        assert_eq!(AllPairs::new().find_pairs(&proxies).len(), 2);
    }
}
