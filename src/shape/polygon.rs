//! Convex polygon for the planar pipeline.
//!
//! A polygon is a single counter-clockwise vertex loop. Edge `i` runs from
//! vertex `i` to vertex `i + 1`; its neighbours are the implicit previous and
//! next edges, so no explicit half-edge table is needed in 2D.

use glam::Vec2;

use crate::error::{PhysicsError, Result};
use crate::math::{Dim2, Plane, Transform2};

use super::SupportMap;

/// A convex polygon in local space.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolygon {
    vertices: Vec<Vec2>,
    normals: Vec<Vec2>,
}

impl ConvexPolygon {
    /// Build a polygon from a vertex loop. Clockwise input is reversed.
    pub fn new(points: &[Vec2]) -> Result<Self> {
        if points.len() < 3 {
            return Err(PhysicsError::DegenerateFace {
                face: 0,
                count: points.len(),
            });
        }
        let mut vertices = points.to_vec();
        if signed_area(&vertices) < 0.0 {
            vertices.reverse();
        }
        let normals = edge_normals(&vertices)?;
        let polygon = Self { vertices, normals };
        if !polygon.is_convex(1e-5) {
            return Err(PhysicsError::NotConvex);
        }
        Ok(polygon)
    }

    /// An axis-aligned rectangle centred on the origin.
    pub fn rectangle(half_extents: Vec2) -> Self {
        let h = half_extents;
        let vertices = vec![
            Vec2::new(-h.x, -h.y),
            Vec2::new(h.x, -h.y),
            Vec2::new(h.x, h.y),
            Vec2::new(-h.x, h.y),
        ];
        let normals = vec![Vec2::NEG_Y, Vec2::X, Vec2::Y, Vec2::NEG_X];
        Self { vertices, normals }
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn vertex(&self, index: usize) -> Vec2 {
        self.vertices[index]
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Outward unit normal of edge `index`.
    pub fn edge_normal(&self, index: usize) -> Vec2 {
        self.normals[index]
    }

    pub fn normals(&self) -> &[Vec2] {
        &self.normals
    }

    #[inline]
    pub fn next(&self, index: usize) -> usize {
        (index + 1) % self.vertices.len()
    }

    #[inline]
    pub fn prev(&self, index: usize) -> usize {
        (index + self.vertices.len() - 1) % self.vertices.len()
    }

    /// Index of the vertex farthest along `direction`; ties keep the first found.
    pub fn support_index(&self, direction: Vec2) -> usize {
        support_index_of(&self.vertices, direction)
    }

    /// True when no vertex lies more than `epsilon` in front of any edge line.
    pub fn is_convex(&self, epsilon: f32) -> bool {
        (0..self.vertices.len()).all(|edge| {
            let plane = Plane::<Dim2>::from_point_normal(self.vertices[edge], self.normals[edge]);
            self.vertices
                .iter()
                .all(|&v| plane.signed_distance(v) <= epsilon)
        })
    }

    pub fn vertex_centroid(&self) -> Vec2 {
        if self.vertices.is_empty() {
            return Vec2::ZERO;
        }
        self.vertices.iter().copied().sum::<Vec2>() / self.vertices.len() as f32
    }
}

/// Twice the signed area; positive for counter-clockwise loops.
pub(crate) fn signed_area(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    (0..n)
        .map(|i| vertices[i].perp_dot(vertices[(i + 1) % n]))
        .sum()
}

fn edge_normals(vertices: &[Vec2]) -> Result<Vec<Vec2>> {
    let n = vertices.len();
    (0..n)
        .map(|i| {
            let edge = vertices[(i + 1) % n] - vertices[i];
            // Right-hand perpendicular points out of a counter-clockwise loop.
            Vec2::new(edge.y, -edge.x)
                .try_normalize()
                .ok_or(PhysicsError::DegenerateEdge { edge: i })
        })
        .collect()
}

fn support_index_of(vertices: &[Vec2], direction: Vec2) -> usize {
    let mut best = 0;
    let mut best_dot = f32::NEG_INFINITY;
    for (i, v) in vertices.iter().enumerate() {
        let d = v.dot(direction);
        if d > best_dot {
            best_dot = d;
            best = i;
        }
    }
    best
}

/// A polygon placed in the world.
#[derive(Debug, Clone)]
pub struct WorldPolygon<'a> {
    pub polygon: &'a ConvexPolygon,
    pub vertices: Vec<Vec2>,
    pub normals: Vec<Vec2>,
    pub center: Vec2,
}

impl<'a> WorldPolygon<'a> {
    pub fn new(polygon: &'a ConvexPolygon, transform: &Transform2) -> Self {
        let vertices: Vec<Vec2> = polygon
            .vertices
            .iter()
            .map(|&v| transform.transform_point(v))
            .collect();
        let n = vertices.len();
        let normals = (0..n)
            .map(|i| {
                let edge = vertices[(i + 1) % n] - vertices[i];
                Vec2::new(edge.y, -edge.x).normalize_or_zero()
            })
            .collect();
        let center = transform.transform_point(polygon.vertex_centroid());
        Self {
            polygon,
            vertices,
            normals,
            center,
        }
    }

    pub fn edge_plane(&self, edge: usize) -> Plane<Dim2> {
        Plane::from_point_normal(self.vertices[edge], self.normals[edge])
    }

    pub fn support_index(&self, direction: Vec2) -> usize {
        support_index_of(&self.vertices, direction)
    }

    /// Of the two edges meeting at the extremal vertex along `direction`, the
    /// one whose normal is more parallel to it, together with that alignment.
    pub fn best_edge(&self, direction: Vec2) -> (usize, f32) {
        let vertex = self.support_index(direction);
        let prev = self.polygon.prev(vertex);
        let incoming = self.normals[prev].dot(direction);
        let outgoing = self.normals[vertex].dot(direction);
        if incoming > outgoing {
            (prev, incoming)
        } else {
            (vertex, outgoing)
        }
    }
}

impl SupportMap<Dim2> for WorldPolygon<'_> {
    fn support(&self, direction: Vec2) -> Vec2 {
        self.vertices
            .get(self.support_index(direction))
            .copied()
            .unwrap_or(self.center)
    }

    fn center(&self) -> Vec2 {
        self.center
    }
}
