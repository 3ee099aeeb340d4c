//! Convex polyhedron with a half-edge adjacency structure.
//!
//! Half-edges live in a flat table and refer to each other by index, so the
//! cyclic `next`/`prev`/`mirror` graph needs no pointers. Topology can be
//! edited until [`ConvexPolyhedron::generate_half_edges`] runs; afterwards the
//! shape is read-only.

use std::collections::HashMap;

use glam::Vec3;

use crate::error::{PhysicsError, Result};
use crate::math::{Dim3, Plane, Transform3};

use super::SupportMap;

/// Sentinel for an unresolved half-edge link.
pub const INVALID_EDGE: u32 = u32::MAX;

/// Tolerance used by [`ConvexPolyhedron::is_convex`] callers that have no better value.
pub const CONVEXITY_EPSILON: f32 = 1e-4;

/// One directed edge of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfEdge {
    /// Face this half-edge bounds.
    pub face: u32,
    /// Vertex the half-edge starts at.
    pub origin: u32,
    /// Next half-edge around the same face.
    pub next: u32,
    /// Previous half-edge around the same face.
    pub prev: u32,
    /// Opposite-winding twin on the neighbouring face.
    pub mirror: u32,
}

impl HalfEdge {
    fn unresolved(face: u32, origin: u32) -> Self {
        Self {
            face,
            origin,
            next: INVALID_EDGE,
            prev: INVALID_EDGE,
            mirror: INVALID_EDGE,
        }
    }
}

/// A closed convex polyhedron in local space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvexPolyhedron {
    vertices: Vec<Vec3>,
    faces: Vec<Vec<u32>>,
    half_edges: Vec<HalfEdge>,
    /// First half-edge of each face.
    face_edges: Vec<u32>,
    /// One outgoing half-edge per vertex.
    vertex_edges: Vec<u32>,
    finalized: bool,
}

impl ConvexPolyhedron {
    /// Create an empty, editable polyhedron.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and finalize a polyhedron from vertices and counter-clockwise (seen
    /// from outside) face loops.
    pub fn from_faces<F>(vertices: &[Vec3], faces: impl IntoIterator<Item = F>) -> Result<Self>
    where
        F: AsRef<[u32]>,
    {
        let mut poly = Self::new();
        for v in vertices {
            poly.add_vertex(*v)?;
        }
        for face in faces {
            poly.add_face(face.as_ref())?;
        }
        poly.generate_half_edges()?;
        Ok(poly)
    }

    /// An axis-aligned box centred on the origin.
    pub fn cuboid(half_extents: Vec3) -> Self {
        const FACES: [[u32; 4]; 6] = [
            [0, 3, 2, 1], // -Z
            [4, 5, 6, 7], // +Z
            [0, 1, 5, 4], // -Y
            [3, 7, 6, 2], // +Y
            [0, 4, 7, 3], // -X
            [1, 2, 6, 5], // +X
        ];
        let h = half_extents;
        let corners = [
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        match Self::from_faces(&corners, FACES) {
            Ok(poly) => poly,
            Err(err) => unreachable!("box topology is closed: {err}"),
        }
    }

    /// Append a vertex. Fails once the half-edge structure exists.
    pub fn add_vertex(&mut self, position: Vec3) -> Result<u32> {
        if self.finalized {
            return Err(PhysicsError::ShapeFinalized);
        }
        self.vertices.push(position);
        Ok((self.vertices.len() - 1) as u32)
    }

    /// Append a face given as a cyclic list of vertex indices. Fails once the
    /// half-edge structure exists or if an index is out of range.
    pub fn add_face(&mut self, indices: &[u32]) -> Result<u32> {
        if self.finalized {
            return Err(PhysicsError::ShapeFinalized);
        }
        let face = self.faces.len();
        if let Some(&vertex) = indices
            .iter()
            .find(|&&i| i as usize >= self.vertices.len())
        {
            return Err(PhysicsError::VertexOutOfRange {
                face,
                vertex,
                count: self.vertices.len(),
            });
        }
        self.faces.push(indices.to_vec());
        Ok(face as u32)
    }

    /// Build the half-edge table and freeze the topology.
    ///
    /// One half-edge is allocated per consecutive vertex pair of every face;
    /// `next`/`prev` are resolved within the face and `mirror` by looking up
    /// the reversed vertex pair.
    pub fn generate_half_edges(&mut self) -> Result<()> {
        if self.finalized {
            return Err(PhysicsError::ShapeFinalized);
        }

        for (face, indices) in self.faces.iter().enumerate() {
            if indices.len() <= 2 {
                return Err(PhysicsError::DegenerateFace {
                    face,
                    count: indices.len(),
                });
            }
        }

        let total: usize = self.faces.iter().map(Vec::len).sum();
        let mut half_edges = Vec::with_capacity(total);
        let mut face_edges = Vec::with_capacity(self.faces.len());
        let mut by_vertices: HashMap<(u32, u32), u32> = HashMap::with_capacity(total);

        for (face, indices) in self.faces.iter().enumerate() {
            let first = half_edges.len() as u32;
            let n = indices.len() as u32;
            face_edges.push(first);
            for (i, &origin) in indices.iter().enumerate() {
                let dest = indices[(i + 1) % indices.len()];
                let index = half_edges.len() as u32;
                if by_vertices.insert((origin, dest), index).is_some() {
                    return Err(PhysicsError::DuplicateEdge { origin, dest });
                }
                let mut edge = HalfEdge::unresolved(face as u32, origin);
                let local = i as u32;
                edge.next = first + (local + 1) % n;
                edge.prev = first + (local + n - 1) % n;
                half_edges.push(edge);
            }
        }

        for i in 0..half_edges.len() {
            let origin = half_edges[i].origin;
            let dest = half_edges[half_edges[i].next as usize].origin;
            match by_vertices.get(&(dest, origin)) {
                Some(&mirror) => half_edges[i].mirror = mirror,
                None => return Err(PhysicsError::OpenMesh { origin, dest }),
            }
        }

        let expected = 2 * (self.vertices.len() + self.faces.len()).saturating_sub(2);
        if half_edges.len() != expected {
            return Err(PhysicsError::EulerViolation {
                expected,
                found: half_edges.len(),
            });
        }

        let mut vertex_edges = vec![INVALID_EDGE; self.vertices.len()];
        for (i, edge) in half_edges.iter().enumerate() {
            let slot = &mut vertex_edges[edge.origin as usize];
            if *slot == INVALID_EDGE {
                *slot = i as u32;
            }
        }

        self.half_edges = half_edges;
        self.face_edges = face_edges;
        self.vertex_edges = vertex_edges;
        self.finalized = true;
        Ok(())
    }

    /// Whether the half-edge structure has been generated.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn vertex(&self, index: u32) -> Vec3 {
        self.vertices[index as usize]
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Vertex loop of a face.
    pub fn face_vertices(&self, face: u32) -> &[u32] {
        &self.faces[face as usize]
    }

    pub fn half_edges(&self) -> &[HalfEdge] {
        &self.half_edges
    }

    pub fn half_edge(&self, index: u32) -> &HalfEdge {
        &self.half_edges[index as usize]
    }

    /// Vertex a half-edge points at.
    pub fn edge_destination(&self, edge: u32) -> u32 {
        let next = self.half_edges[edge as usize].next;
        self.half_edges[next as usize].origin
    }

    /// Half-edges bounding `face`, in winding order.
    pub fn face_half_edges(&self, face: u32) -> FaceEdges<'_> {
        let start = self
            .face_edges
            .get(face as usize)
            .copied()
            .unwrap_or(INVALID_EDGE);
        FaceEdges {
            edges: &self.half_edges,
            start,
            current: (start != INVALID_EDGE).then_some(start),
        }
    }

    /// Faces sharing an edge with `face`, found by following each bounding half-edge's mirror.
    pub fn adjacent_faces(&self, face: u32) -> Vec<u32> {
        self.face_half_edges(face)
            .map(|e| {
                let mirror = self.half_edges[e as usize].mirror;
                self.half_edges[mirror as usize].face
            })
            .collect()
    }

    /// Faces incident to a vertex, walking outgoing half-edges around it.
    pub fn faces_around_vertex(&self, vertex: u32) -> Vec<u32> {
        let mut faces = Vec::new();
        let Some(&start) = self.vertex_edges.get(vertex as usize) else {
            return faces;
        };
        if start == INVALID_EDGE {
            return faces;
        }
        let mut edge = start;
        for _ in 0..self.half_edges.len() {
            let he = self.half_edges[edge as usize];
            faces.push(he.face);
            // The mirror of the previous half-edge leaves the same vertex on the neighbouring face.
            edge = self.half_edges[he.prev as usize].mirror;
            if edge == start {
                break;
            }
        }
        faces
    }

    /// Outward face normal, from two edge vectors of the face.
    pub fn face_normal(&self, face: u32) -> Vec3 {
        face_normal_of(&self.vertices, &self.faces[face as usize])
    }

    /// Supporting plane of a face: outward normal plus signed distance from the origin.
    pub fn face_plane(&self, face: u32) -> Plane<Dim3> {
        let normal = self.face_normal(face);
        let anchor = self.vertices[self.faces[face as usize][0] as usize];
        Plane::from_point_normal(anchor, normal)
    }

    /// Index of the vertex farthest along `direction`; ties keep the first found.
    pub fn support_index(&self, direction: Vec3) -> u32 {
        support_index_of(&self.vertices, direction)
    }

    /// The vertex farthest along `direction`.
    pub fn support_point(&self, direction: Vec3) -> Vec3 {
        self.vertices
            .get(self.support_index(direction) as usize)
            .copied()
            .unwrap_or(Vec3::ZERO)
    }

    /// True when no vertex lies more than `epsilon` in front of any face plane.
    pub fn is_convex(&self, epsilon: f32) -> bool {
        (0..self.faces.len() as u32).all(|face| {
            let plane = self.face_plane(face);
            plane.normal != Vec3::ZERO
                && self
                    .vertices
                    .iter()
                    .all(|&v| plane.signed_distance(v) <= epsilon)
        })
    }

    /// One half-edge per undirected edge (the lower index of each mirror pair).
    pub fn unique_edges(&self) -> impl Iterator<Item = u32> + '_ {
        self.half_edges
            .iter()
            .enumerate()
            .filter(|(i, e)| (*i as u32) < e.mirror)
            .map(|(i, _)| i as u32)
    }

    /// Average of the vertex positions.
    pub fn vertex_centroid(&self) -> Vec3 {
        if self.vertices.is_empty() {
            return Vec3::ZERO;
        }
        self.vertices.iter().copied().sum::<Vec3>() / self.vertices.len() as f32
    }
}

/// Iterator over the half-edges of one face.
pub struct FaceEdges<'a> {
    edges: &'a [HalfEdge],
    start: u32,
    current: Option<u32>,
}

impl Iterator for FaceEdges<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let edge = self.current?;
        let next = self.edges[edge as usize].next;
        self.current = (next != self.start).then_some(next);
        Some(edge)
    }
}

pub(crate) fn face_normal_of(vertices: &[Vec3], face: &[u32]) -> Vec3 {
    if face.len() < 3 {
        return Vec3::ZERO;
    }
    let a = vertices[face[0] as usize];
    let b = vertices[face[1] as usize];
    let c = vertices[face[2] as usize];
    (b - a).cross(c - a).normalize_or_zero()
}

pub(crate) fn support_index_of(vertices: &[Vec3], direction: Vec3) -> u32 {
    let mut best = 0;
    let mut best_dot = f32::NEG_INFINITY;
    for (i, v) in vertices.iter().enumerate() {
        let d = v.dot(direction);
        if d > best_dot {
            best_dot = d;
            best = i;
        }
    }
    best as u32
}

/// A polyhedron placed in the world: transformed vertices and face normals,
/// topology borrowed from the local shape.
#[derive(Debug, Clone)]
pub struct WorldPolyhedron<'a> {
    pub hull: &'a ConvexPolyhedron,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub center: Vec3,
}

impl<'a> WorldPolyhedron<'a> {
    pub fn new(hull: &'a ConvexPolyhedron, transform: &Transform3) -> Self {
        let vertices: Vec<Vec3> = hull
            .vertices()
            .iter()
            .map(|&v| transform.transform_point(v))
            .collect();
        let normals = hull
            .faces
            .iter()
            .map(|face| face_normal_of(&vertices, face))
            .collect();
        let center = transform.transform_point(hull.vertex_centroid());
        Self {
            hull,
            vertices,
            normals,
            center,
        }
    }

    pub fn face_plane(&self, face: u32) -> Plane<Dim3> {
        let anchor = self.vertices[self.hull.face_vertices(face)[0] as usize];
        Plane::from_point_normal(anchor, self.normals[face as usize])
    }

    pub fn support_index(&self, direction: Vec3) -> u32 {
        support_index_of(&self.vertices, direction)
    }

    /// Face around the extremal vertex along `direction` whose normal is most
    /// parallel to it, together with that alignment.
    pub fn best_face(&self, direction: Vec3) -> (u32, f32) {
        let vertex = self.support_index(direction);
        let mut best = (0, f32::NEG_INFINITY);
        for face in self.hull.faces_around_vertex(vertex) {
            let d = self.normals[face as usize].dot(direction);
            if d > best.1 {
                best = (face, d);
            }
        }
        best
    }
}

impl SupportMap<Dim3> for WorldPolyhedron<'_> {
    fn support(&self, direction: Vec3) -> Vec3 {
        self.vertices
            .get(self.support_index(direction) as usize)
            .copied()
            .unwrap_or(self.center)
    }

    fn center(&self) -> Vec3 {
        self.center
    }
}
