//! Error type for shape construction and scene management.

use thiserror::Error;

/// Errors reported by the physics core.
///
/// Shape-construction errors are programmer errors surfaced through `Result`
/// so authoring code can propagate them with `?`. Narrowphase degeneracy is
/// never returned from a frame step; it is downgraded to "no contact".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// The shape's half-edge structure was already generated; topology is frozen.
    #[error("shape is finalized; topology can no longer be edited")]
    ShapeFinalized,
    /// The shape has not been finalized yet.
    #[error("shape has no half-edge structure; call generate_half_edges first")]
    ShapeNotFinalized,
    /// A face references fewer than three vertices.
    #[error("face {face} has {count} vertices; at least 3 are required")]
    DegenerateFace { face: usize, count: usize },
    /// A face references a vertex that does not exist.
    #[error("face {face} references vertex {vertex}, but the shape has {count} vertices")]
    VertexOutOfRange {
        face: usize,
        vertex: u32,
        count: usize,
    },
    /// The same directed edge appears twice (inconsistent winding or non-manifold input).
    #[error("directed edge {origin}->{dest} appears more than once")]
    DuplicateEdge { origin: u32, dest: u32 },
    /// A directed edge has no opposite-winding twin.
    #[error("edge {origin}->{dest} has no mirror; the mesh is not closed")]
    OpenMesh { origin: u32, dest: u32 },
    /// The half-edge count does not match Euler's formula for a closed convex polyhedron.
    #[error("half-edge count {found} violates Euler's formula (expected {expected})")]
    EulerViolation { expected: usize, found: usize },
    /// An edge of zero length was found in a polygon.
    #[error("edge {edge} has zero length")]
    DegenerateEdge { edge: usize },
    /// A shape failed the convexity check.
    #[error("shape is not convex")]
    NotConvex,
    /// The body handle does not refer to a live body.
    #[error("unknown body handle {index}:{generation}")]
    UnknownBody { index: u32, generation: u32 },
    /// The body description is inconsistent.
    #[error("invalid body: {reason}")]
    InvalidBody { reason: &'static str },
    /// EPA exhausted its iteration budget without converging.
    #[error("EPA did not converge after {iterations} iterations")]
    EpaNoConvergence { iterations: usize },
    /// EPA could not build a non-degenerate starting polytope.
    #[error("EPA polytope is degenerate")]
    DegeneratePolytope,
    /// More contact points were produced than the manifold can hold.
    #[error("contact manifold overflow: {count} points exceed the cap of {cap}")]
    ContactCapacityExceeded { count: usize, cap: usize },
    /// The ECS entity does not exist.
    #[error("entity does not exist")]
    NoSuchEntity,
}

/// Convenience alias used across the crate.
pub type Result<T, E = PhysicsError> = std::result::Result<T, E>;
