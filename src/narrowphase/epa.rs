//! EPA (Expanding Polytope Algorithm) to compute penetration depth and contact normal.
//!
//! Input is the enclosing simplex from GJK. The returned normal points from A
//! toward B (the polytope approximates `A - B`), and the depth is the distance
//! B must move along it to separate.

use glam::{Vec2, Vec3};

use crate::contact::Separation;
use crate::error::{PhysicsError, Result};
use crate::math::{Dim, Dim2, Dim3, DIRECTION_EPSILON};
use crate::shape::SupportMap;

use super::simplex::{minkowski_support, Simplex};

/// Iteration cap and convergence tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpaSettings {
    pub max_iterations: u32,
    pub tolerance: f32,
}

impl Default for EpaSettings {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Face {
    indices: [usize; 3],
    normal: Vec3,
    distance: f32,
}

impl Face {
    fn new(vertices: &[Vec3], indices: [usize; 3]) -> Option<Self> {
        let [a, b, c] = indices.map(|i| vertices[i]);
        let normal = (b - a).cross(c - a).try_normalize()?;
        Some(Self {
            indices,
            normal,
            distance: normal.dot(a),
        })
    }
}

/// Penetration between two overlapping 3D shapes.
pub fn penetration_3d<A, B>(
    simplex: &Simplex<Dim3>,
    a: &A,
    b: &B,
    settings: EpaSettings,
) -> Result<Separation<Dim3>>
where
    A: SupportMap<Dim3> + ?Sized,
    B: SupportMap<Dim3> + ?Sized,
{
    let support = |d: Vec3| minkowski_support::<Dim3, _, _>(a, b, d);
    let mut vertices = complete_tetrahedron(simplex, support)?;

    let centroid = vertices.iter().copied().sum::<Vec3>() * 0.25;
    let mut faces: Vec<Face> = Vec::with_capacity(32);
    for indices in [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]] {
        let mut face = Face::new(&vertices, indices).ok_or(PhysicsError::DegeneratePolytope)?;
        if face.normal.dot(vertices[indices[0]] - centroid) < 0.0 {
            face = Face::new(&vertices, [indices[0], indices[2], indices[1]])
                .ok_or(PhysicsError::DegeneratePolytope)?;
        }
        faces.push(face);
    }

    let mut horizon: Vec<(usize, usize)> = Vec::with_capacity(16);
    for _ in 0..settings.max_iterations {
        let closest = faces
            .iter()
            .min_by(|x, y| x.distance.total_cmp(&y.distance))
            .copied()
            .ok_or(PhysicsError::DegeneratePolytope)?;

        let point = support(closest.normal);
        let reach = point.dot(closest.normal);
        if reach - closest.distance < settings.tolerance {
            return Ok(Separation::new(closest.normal, closest.distance.max(0.0)));
        }

        // Remove every face the new point can see and stitch the horizon.
        horizon.clear();
        faces.retain(|face| {
            if face.normal.dot(point - vertices[face.indices[0]]) <= 0.0 {
                return true;
            }
            let [i, j, k] = face.indices;
            for edge in [(i, j), (j, k), (k, i)] {
                if let Some(pos) = horizon.iter().position(|&(s, e)| s == edge.1 && e == edge.0) {
                    horizon.swap_remove(pos);
                } else {
                    horizon.push(edge);
                }
            }
            false
        });

        let new_index = vertices.len();
        vertices.push(point);
        for &(start, end) in &horizon {
            if let Some(face) = Face::new(&vertices, [start, end, new_index]) {
                faces.push(face);
            }
        }
        if faces.is_empty() {
            return Err(PhysicsError::DegeneratePolytope);
        }
    }

    Err(PhysicsError::EpaNoConvergence {
        iterations: settings.max_iterations as usize,
    })
}

/// Grow a touching-contact simplex into a tetrahedron with extra support queries.
fn complete_tetrahedron(simplex: &Simplex<Dim3>, support: impl Fn(Vec3) -> Vec3) -> Result<Vec<Vec3>> {
    const AXES: [Vec3; 6] = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];

    let mut points: Vec<Vec3> = simplex.iter().copied().collect();
    if points.is_empty() {
        points.push(support(Vec3::X));
    }
    if points.len() == 1 {
        if let Some(p) = AXES
            .iter()
            .map(|&axis| support(axis))
            .find(|p| (*p - points[0]).length_squared() > DIRECTION_EPSILON)
        {
            points.push(p);
        }
    }
    if points.len() == 2 {
        let edge = points[1] - points[0];
        let (u, w) = edge.normalize_or_zero().any_orthonormal_pair();
        if let Some(p) = [u, -u, w, -w]
            .into_iter()
            .map(&support)
            .find(|p| (*p - points[0]).cross(edge).length_squared() > DIRECTION_EPSILON)
        {
            points.push(p);
        }
    }
    if points.len() == 3 {
        let normal = (points[1] - points[0])
            .cross(points[2] - points[0])
            .try_normalize()
            .ok_or(PhysicsError::DegeneratePolytope)?;
        if let Some(p) = [normal, -normal]
            .into_iter()
            .map(&support)
            .find(|p| (*p - points[0]).dot(normal).abs() > 1e-6)
        {
            points.push(p);
        }
    }
    if points.len() < 4 || Dim3::signed_volume(&points).abs() <= 1e-9 {
        return Err(PhysicsError::DegeneratePolytope);
    }
    Ok(points)
}

/// Penetration between two overlapping 2D shapes.
pub fn penetration_2d<A, B>(
    simplex: &Simplex<Dim2>,
    a: &A,
    b: &B,
    settings: EpaSettings,
) -> Result<Separation<Dim2>>
where
    A: SupportMap<Dim2> + ?Sized,
    B: SupportMap<Dim2> + ?Sized,
{
    let support = |d: Vec2| minkowski_support::<Dim2, _, _>(a, b, d);
    let mut polygon = complete_triangle(simplex, support)?;
    if Dim2::signed_volume(&polygon) < 0.0 {
        polygon.swap(1, 2);
    }

    for _ in 0..settings.max_iterations {
        let mut closest: Option<(usize, Vec2, f32)> = None;
        for i in 0..polygon.len() {
            let edge = polygon[(i + 1) % polygon.len()] - polygon[i];
            let Some(normal) = Vec2::new(edge.y, -edge.x).try_normalize() else {
                continue;
            };
            let distance = normal.dot(polygon[i]);
            if closest.map_or(true, |(_, _, d)| distance < d) {
                closest = Some((i, normal, distance));
            }
        }
        let (index, normal, distance) = closest.ok_or(PhysicsError::DegeneratePolytope)?;

        let point = support(normal);
        if point.dot(normal) - distance < settings.tolerance {
            return Ok(Separation::new(normal, distance.max(0.0)));
        }
        polygon.insert(index + 1, point);
    }

    Err(PhysicsError::EpaNoConvergence {
        iterations: settings.max_iterations as usize,
    })
}

fn complete_triangle(simplex: &Simplex<Dim2>, support: impl Fn(Vec2) -> Vec2) -> Result<Vec<Vec2>> {
    const AXES: [Vec2; 4] = [Vec2::X, Vec2::NEG_X, Vec2::Y, Vec2::NEG_Y];

    let mut points: Vec<Vec2> = simplex.iter().copied().collect();
    if points.is_empty() {
        points.push(support(Vec2::X));
    }
    if points.len() == 1 {
        if let Some(p) = AXES
            .iter()
            .map(|&axis| support(axis))
            .find(|p| (*p - points[0]).length_squared() > DIRECTION_EPSILON)
        {
            points.push(p);
        }
    }
    if points.len() == 2 {
        let edge = points[1] - points[0];
        let perp = edge.perp();
        if let Some(p) = [perp, -perp]
            .into_iter()
            .map(&support)
            .find(|p| edge.perp_dot(*p - points[0]).abs() > DIRECTION_EPSILON)
        {
            points.push(p);
        }
    }
    if points.len() < 3 || Dim2::signed_volume(&points).abs() <= 1e-9 {
        return Err(PhysicsError::DegeneratePolytope);
    }
    Ok(points)
}
