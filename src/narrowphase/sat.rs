//! Separating-axis tests.
//!
//! Every candidate axis is oriented from the first shape's center toward the
//! second's, both shapes are projected onto it, and the overlap is the sum of
//! their half-extents minus the projected center offset. A negative overlap
//! proves separation and ends the scan; otherwise the axis of least overlap wins.

use glam::{Vec2, Vec3};

use crate::contact::Separation;
use crate::math::{Dim, Dim2, Dim3, DIRECTION_EPSILON};
use crate::shape::{SupportMap, WorldCapsule, WorldPolygon, WorldPolyhedron};

/// Overlap of two shapes along `axis`, with the axis oriented from A toward B.
///
/// Returns `None` for near-zero axes.
pub fn axis_overlap<D, A, B>(a: &A, b: &B, axis: D::Vector) -> Option<(D::Vector, f32)>
where
    D: Dim,
    A: SupportMap<D> + ?Sized,
    B: SupportMap<D> + ?Sized,
{
    if D::length_squared(axis) < DIRECTION_EPSILON {
        return None;
    }
    let offset = b.center() - a.center();
    let mut u = D::normalize_or_zero(axis);
    if D::dot(u, offset) < 0.0 {
        u = -u;
    }
    let extent_a = D::dot(a.support(u), u) - D::dot(a.center(), u);
    let extent_b = D::dot(b.center(), u) - D::dot(b.support(-u), u);
    Some((u, extent_a + extent_b - D::dot(offset, u)))
}

/// Running minimum over candidate axes with early exit on separation.
struct AxisScan<D: Dim> {
    best: Option<Separation<D>>,
}

impl<D: Dim> AxisScan<D> {
    fn new() -> Self {
        Self { best: None }
    }

    /// Returns false once a separating axis has been found.
    fn test<A, B>(&mut self, a: &A, b: &B, axis: D::Vector) -> bool
    where
        A: SupportMap<D> + ?Sized,
        B: SupportMap<D> + ?Sized,
    {
        let Some((normal, depth)) = axis_overlap::<D, A, B>(a, b, axis) else {
            return true;
        };
        if depth < 0.0 {
            return false;
        }
        if self.best.map_or(true, |best| depth < best.depth) {
            self.best = Some(Separation::new(normal, depth));
        }
        true
    }
}

/// SAT between two polyhedra: face normals of both, then every edge pair.
pub fn polyhedra(a: &WorldPolyhedron<'_>, b: &WorldPolyhedron<'_>) -> Option<Separation<Dim3>> {
    let mut scan = AxisScan::<Dim3>::new();
    for &normal in a.normals.iter().chain(b.normals.iter()) {
        if !scan.test(a, b, normal) {
            return None;
        }
    }
    for edge_a in a.hull.unique_edges() {
        let dir_a = edge_direction(a, edge_a);
        for edge_b in b.hull.unique_edges() {
            let axis = dir_a.cross(edge_direction(b, edge_b));
            if !scan.test(a, b, axis) {
                return None;
            }
        }
    }
    scan.best
}

/// SAT between a polyhedron and a capsule: polyhedron face normals, then the
/// capsule spine crossed with every polyhedron edge.
///
/// The normal points from the polyhedron toward the capsule.
pub fn polyhedron_capsule(
    polyhedron: &WorldPolyhedron<'_>,
    capsule: &WorldCapsule,
) -> Option<Separation<Dim3>> {
    let mut scan = AxisScan::<Dim3>::new();
    for &normal in &polyhedron.normals {
        if !scan.test(polyhedron, capsule, normal) {
            return None;
        }
    }
    let spine = capsule.spine();
    for edge in polyhedron.hull.unique_edges() {
        let axis = spine.cross(edge_direction(polyhedron, edge));
        if !scan.test(polyhedron, capsule, axis) {
            return None;
        }
    }
    scan.best
}

/// SAT between two polygons using every edge normal of both.
pub fn polygons(a: &WorldPolygon<'_>, b: &WorldPolygon<'_>) -> Option<Separation<Dim2>> {
    let mut scan = AxisScan::<Dim2>::new();
    for &normal in a.normals.iter().chain(b.normals.iter()) {
        if !scan.test(a, b, normal) {
            return None;
        }
    }
    scan.best
}

fn edge_direction(shape: &WorldPolyhedron<'_>, edge: u32) -> Vec3 {
    let origin = shape.hull.half_edge(edge).origin;
    let dest = shape.hull.edge_destination(edge);
    shape.vertices[dest as usize] - shape.vertices[origin as usize]
}

/// Separating-axis overlap along an explicit axis; handy for tests and debugging.
pub fn overlap_along_2d<A, B>(a: &A, b: &B, axis: Vec2) -> Option<f32>
where
    A: SupportMap<Dim2> + ?Sized,
    B: SupportMap<Dim2> + ?Sized,
{
    axis_overlap::<Dim2, A, B>(a, b, axis).map(|(_, depth)| depth)
}
