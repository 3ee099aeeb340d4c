//! Contact manifold builder.
//!
//! Given a separating axis, each polytope offers the feature (face in 3D, edge
//! in 2D) around its extremal vertex that best faces the other shape. The one
//! more parallel to the axis becomes the reference feature. The incident
//! feature is clipped against each side plane of the reference feature in turn
//! (Sutherland-Hodgman; a two-point feature is treated as an open segment), so
//! edges crossing a side plane contribute their crossing point. Points in front
//! of the reference plane by more than the contact margin are dropped,
//! survivors are projected onto it, and a polygon with more points than a
//! manifold holds is reduced to the deepest point plus the widest spread.

use glam::{Vec2, Vec3};

use crate::contact::{ContactPoint, FeatureId, Manifold, Separation};
use crate::math::{Dim, Dim2, Dim3, Plane};
use crate::shape::{SupportMap, WorldCapsule, WorldPolygon, WorldPolyhedron};

/// Bias toward keeping the first shape as reference on near-ties.
pub const REFERENCE_BIAS: f32 = 1e-3;
/// Minimum face alignment for a capsule to rest on a face with two contacts.
pub const FACE_CONTACT_ALIGNMENT: f32 = 0.7;
const DUPLICATE_EPSILON: f32 = 1e-8;

/// A face or edge taking part in clipping.
#[derive(Debug, Clone)]
pub struct Feature<D: Dim> {
    /// Face or edge index in the owning shape.
    pub index: u32,
    /// Outward unit normal.
    pub normal: D::Vector,
    /// World-space vertices with their indices in the owning shape.
    pub vertices: Vec<(D::Vector, u32)>,
    /// Vertex reaching farthest against the normal.
    pub deepest: D::Vector,
}

impl<D: Dim> Feature<D> {
    fn new(index: u32, normal: D::Vector, vertices: Vec<(D::Vector, u32)>) -> Self {
        let deepest = vertices
            .iter()
            .map(|&(v, _)| v)
            .min_by(|x, y| D::dot(*x, normal).total_cmp(&D::dot(*y, normal)))
            .unwrap_or_else(D::zero);
        Self {
            index,
            normal,
            vertices,
            deepest,
        }
    }
}

/// Face `face` of a placed polyhedron as a clipping feature.
pub fn face_feature(shape: &WorldPolyhedron<'_>, face: u32) -> Feature<Dim3> {
    let vertices = shape
        .hull
        .face_vertices(face)
        .iter()
        .map(|&v| (shape.vertices[v as usize], v))
        .collect();
    Feature::new(face, shape.normals[face as usize], vertices)
}

/// Edge `edge` of a placed polygon as a clipping feature.
pub fn edge_feature(shape: &WorldPolygon<'_>, edge: usize) -> Feature<Dim2> {
    let next = shape.polygon.next(edge);
    let vertices = vec![
        (shape.vertices[edge], edge as u32),
        (shape.vertices[next], next as u32),
    ];
    Feature::new(edge as u32, shape.normals[edge], vertices)
}

/// Marks an incident id as a side-plane crossing rather than a shape vertex.
const CROSSING_BIT: u32 = 1 << 31;

/// Stable id for the point where the edge leaving `from` crosses side plane `plane`.
fn crossing_id(plane: usize, from: u32) -> u32 {
    CROSSING_BIT | ((plane as u32 & 0x7fff) << 16) | (from & 0xffff)
}

/// Keep the part of `polygon` behind `plane`. A closed polygon also clips its
/// wrap-around edge.
fn clip_against_plane<D: Dim>(
    polygon: &[(D::Vector, u32)],
    plane: &Plane<D>,
    plane_index: usize,
    closed: bool,
) -> Vec<(D::Vector, u32)> {
    let mut out = Vec::with_capacity(polygon.len() + 1);
    for (i, &(current, id)) in polygon.iter().enumerate() {
        let d_current = plane.signed_distance(current);
        if d_current <= 0.0 {
            out.push((current, id));
        }
        let next = match polygon.get(i + 1) {
            Some(&(next, _)) => next,
            None if closed && polygon.len() > 2 => polygon[0].0,
            None => continue,
        };
        let d_next = plane.signed_distance(next);
        if (d_current <= 0.0) != (d_next <= 0.0) {
            let t = d_current / (d_current - d_next);
            out.push((current + (next - current) * t, crossing_id(plane_index, id)));
        }
    }
    out
}

/// Clip the incident feature against the reference feature and its side planes.
fn clip_feature<D: Dim>(
    reference: &Feature<D>,
    side_planes: &[Plane<D>],
    incident: &Feature<D>,
    flipped: bool,
    margin: f32,
) -> Vec<ContactPoint<D>> {
    let reference_plane = Plane::<D>::from_point_normal(reference.deepest, reference.normal);
    let normal = if flipped {
        -reference.normal
    } else {
        reference.normal
    };

    let closed = incident.vertices.len() > 2;
    let mut polygon = incident.vertices.clone();
    for (plane_index, plane) in side_planes.iter().enumerate() {
        if polygon.is_empty() {
            break;
        }
        polygon = clip_against_plane(&polygon, plane, plane_index, closed);
    }

    let mut points: Vec<ContactPoint<D>> = Vec::with_capacity(polygon.len());
    for (clipped, incident_id) in polygon {
        let separation = reference_plane.signed_distance(clipped);
        if separation > margin {
            continue;
        }
        let position = clipped - reference.normal * separation;
        if points
            .iter()
            .any(|p| D::length_squared(p.position - position) < DUPLICATE_EPSILON)
        {
            continue;
        }
        let id = FeatureId {
            flipped,
            reference: reference.index,
            incident: incident_id,
        };
        points.push(ContactPoint::new(position, normal, separation, id));
    }
    reduce_to_capacity(points)
}

/// Index of the point scoring highest under `score`.
fn best_by<D: Dim>(points: &[ContactPoint<D>], score: impl Fn(&ContactPoint<D>) -> f32) -> usize {
    points
        .iter()
        .enumerate()
        .max_by(|(_, x), (_, y)| score(*x).total_cmp(&score(*y)))
        .map_or(0, |(i, _)| i)
}

/// Cut `points` down to `D::MAX_CONTACTS`: the deepest point, the point
/// farthest from it, the one spanning the largest triangle with those two,
/// then whichever lies farthest from everything already kept.
fn reduce_to_capacity<D: Dim>(mut points: Vec<ContactPoint<D>>) -> Vec<ContactPoint<D>> {
    if points.len() <= D::MAX_CONTACTS {
        return points;
    }
    let mut kept: Vec<ContactPoint<D>> = Vec::with_capacity(D::MAX_CONTACTS);

    let deepest = best_by(&points, |p| -p.separation);
    kept.push(points.swap_remove(deepest));

    let origin = kept[0].position;
    let farthest = best_by(&points, |p| D::length_squared(p.position - origin));
    kept.push(points.swap_remove(farthest));

    if kept.len() < D::MAX_CONTACTS {
        let edge = kept[1].position - origin;
        let widest = best_by(&points, |p| {
            let area = D::cross(edge, p.position - origin);
            D::angular_dot(area, area)
        });
        kept.push(points.swap_remove(widest));
    }

    while kept.len() < D::MAX_CONTACTS && !points.is_empty() {
        let spread = best_by(&points, |p| {
            kept.iter()
                .map(|k| D::length_squared(p.position - k.position))
                .fold(f32::INFINITY, f32::min)
        });
        kept.push(points.swap_remove(spread));
    }
    kept
}

/// Manifold between two polyhedra along `separation` (normal from `a` to `b`).
pub fn polyhedra(
    a: &WorldPolyhedron<'_>,
    b: &WorldPolyhedron<'_>,
    separation: &Separation<Dim3>,
    margin: f32,
) -> Manifold<Dim3> {
    let n = separation.normal;
    let (face_a, align_a) = a.best_face(n);
    let (face_b, align_b) = b.best_face(-n);
    let flipped = align_b > align_a + REFERENCE_BIAS;
    let (reference_shape, reference_face, incident_shape) = if flipped {
        (b, face_b, a)
    } else {
        (a, face_a, b)
    };

    let reference = face_feature(reference_shape, reference_face);
    let (incident_face, _) = incident_shape.best_face(-reference.normal);
    let incident = face_feature(incident_shape, incident_face);
    let side_planes: Vec<Plane<Dim3>> = reference_shape
        .hull
        .adjacent_faces(reference_face)
        .into_iter()
        .map(|f| reference_shape.face_plane(f))
        .collect();

    Manifold::from_clipped(clip_feature(
        &reference,
        &side_planes,
        &incident,
        flipped,
        margin,
    ))
}

/// Manifold between two polygons along `separation` (normal from `a` to `b`).
pub fn polygons(
    a: &WorldPolygon<'_>,
    b: &WorldPolygon<'_>,
    separation: &Separation<Dim2>,
    margin: f32,
) -> Manifold<Dim2> {
    let n = separation.normal;
    let (edge_a, align_a) = a.best_edge(n);
    let (edge_b, align_b) = b.best_edge(-n);
    let flipped = align_b > align_a + REFERENCE_BIAS;
    let (reference_shape, reference_edge, incident_shape) = if flipped {
        (b, edge_b, a)
    } else {
        (a, edge_a, b)
    };

    let reference = edge_feature(reference_shape, reference_edge);
    let (incident_edge, _) = incident_shape.best_edge(-reference.normal);
    let incident = edge_feature(incident_shape, incident_edge);

    let start = reference.vertices[0].0;
    let end = reference.vertices[1].0;
    let tangent: Vec2 = (end - start).normalize_or_zero();
    let side_planes = [
        Plane::<Dim2>::from_point_normal(start, -tangent),
        Plane::<Dim2>::from_point_normal(end, tangent),
    ];

    Manifold::from_clipped(clip_feature(
        &reference,
        &side_planes,
        &incident,
        flipped,
        margin,
    ))
}

/// Manifold between a polyhedron and a capsule (normal from the polyhedron).
///
/// A capsule lying on a face gets one contact per spine end; otherwise the
/// deepest capsule point is the single contact.
pub fn polyhedron_capsule(
    polyhedron: &WorldPolyhedron<'_>,
    capsule: &WorldCapsule,
    separation: &Separation<Dim3>,
    margin: f32,
) -> Manifold<Dim3> {
    let n = separation.normal;
    let (face, alignment) = polyhedron.best_face(n);
    if alignment >= FACE_CONTACT_ALIGNMENT {
        let reference = face_feature(polyhedron, face);
        let side_planes: Vec<Plane<Dim3>> = polyhedron
            .hull
            .adjacent_faces(face)
            .into_iter()
            .map(|f| polyhedron.face_plane(f))
            .collect();
        let ends = Feature::<Dim3>::new(
            0,
            -reference.normal,
            vec![
                (capsule.a - reference.normal * capsule.radius, 0),
                (capsule.b - reference.normal * capsule.radius, 1),
            ],
        );
        let points = clip_feature(&reference, &side_planes, &ends, false, margin);
        if !points.is_empty() {
            return Manifold::from_clipped(points);
        }
    }
    single_contact(capsule, separation, margin)
}

/// One contact at the deepest point of `shape` (the second shape) against `separation`.
pub fn single_contact<D, S>(shape: &S, separation: &Separation<D>, margin: f32) -> Manifold<D>
where
    D: Dim,
    S: SupportMap<D> + ?Sized,
{
    if -separation.depth > margin {
        return Manifold::new();
    }
    let n = separation.normal;
    let deepest = shape.support(-n);
    let position = deepest + n * (separation.depth * 0.5);
    Manifold::single(ContactPoint::new(
        position,
        n,
        -separation.depth,
        FeatureId::SINGLE,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Transform2, Transform3};
    use crate::shape::{ConvexPolygon, ConvexPolyhedron};
    use glam::Quat;

    #[test]
    fn test_box_on_box_gives_four_points() {
        let ground = ConvexPolyhedron::cuboid(Vec3::new(5.0, 0.5, 5.0));
        let cube = ConvexPolyhedron::cuboid(Vec3::splat(0.5));
        let a = WorldPolyhedron::new(&ground, &Transform3::identity());
        let b = WorldPolyhedron::new(&cube, &Transform3::from_position(Vec3::new(0.0, 0.95, 0.0)));
        let sep = Separation::new(Vec3::Y, 0.05);
        let manifold = polyhedra(&a, &b, &sep, 0.02);
        assert_eq!(manifold.len(), 4);
        for p in &manifold {
            assert!((p.separation + 0.05).abs() < 1e-5);
            assert!((p.position.y - 0.5).abs() < 1e-5);
            assert_eq!(p.normal, Vec3::Y);
            assert!(!p.id.flipped);
            assert_eq!(p.id.reference, 3);
        }
    }

    #[test]
    fn test_flipped_reference_keeps_normal_from_a_to_b() {
        let big = ConvexPolyhedron::cuboid(Vec3::new(5.0, 0.5, 5.0));
        let small = ConvexPolyhedron::cuboid(Vec3::splat(0.5));
        // A is a tilted small box; B is flat ground below it.
        let a = WorldPolyhedron::new(
            &small,
            &Transform3::from_position_rotation(Vec3::new(0.0, 1.0, 0.0), Quat::from_rotation_z(0.3)),
        );
        let b = WorldPolyhedron::new(&big, &Transform3::identity());
        let sep = Separation::new(Vec3::NEG_Y, 0.1);
        let manifold = polyhedra(&a, &b, &sep, 0.02);
        assert!(!manifold.is_empty());
        for p in &manifold {
            assert!(p.id.flipped);
            assert!((p.normal - Vec3::NEG_Y).length() < 1e-5);
            assert!(p.separation <= 0.02);
        }
    }

    #[test]
    fn test_offset_box_clipped_to_reference_face() {
        let cube = ConvexPolyhedron::cuboid(Vec3::splat(0.5));
        let a = WorldPolyhedron::new(&cube, &Transform3::identity());
        let b = WorldPolyhedron::new(&cube, &Transform3::from_position(Vec3::new(0.7, 0.95, 0.0)));
        let sep = Separation::new(Vec3::Y, 0.05);
        let manifold = polyhedra(&a, &b, &sep, 0.0);
        assert_eq!(manifold.len(), 4);
        // Edges crossing A's +X face are cut where they cross it.
        assert!(manifold.iter().all(|p| p.position.x <= 0.5 + 1e-5));
        assert!(manifold.iter().any(|p| (p.position.x - 0.2).abs() < 1e-5));
    }

    /// Upright ten-sided prism of circumradius `radius`.
    fn decagonal_prism(radius: f32, half_height: f32) -> ConvexPolyhedron {
        let mut vertices = Vec::with_capacity(20);
        for y in [-half_height, half_height] {
            for i in 0..10 {
                let angle = i as f32 * std::f32::consts::TAU / 10.0;
                vertices.push(Vec3::new(radius * angle.cos(), y, radius * angle.sin()));
            }
        }
        let mut faces: Vec<Vec<u32>> = vec![(0..10).collect(), (10..20).rev().collect()];
        for i in 0..10 {
            let j = (i + 1) % 10;
            faces.push(vec![i, 10 + i, 10 + j, j]);
        }
        ConvexPolyhedron::from_faces(&vertices, faces).unwrap()
    }

    #[test]
    fn test_large_incident_face_is_reduced_to_capacity() {
        let ground = ConvexPolyhedron::cuboid(Vec3::new(5.0, 0.5, 5.0));
        let prism = decagonal_prism(1.0, 0.5);
        let a = WorldPolyhedron::new(&ground, &Transform3::identity());
        let placement = Transform3::from_position_rotation(
            Vec3::new(0.0, 0.995, 0.0),
            Quat::from_rotation_x(0.02),
        );
        let b = WorldPolyhedron::new(&prism, &placement);
        let manifold = polyhedra(&a, &b, &Separation::new(Vec3::Y, 0.025), 0.02);

        assert_eq!(manifold.len(), 8);
        // The deepest bottom vertex survives the reduction.
        let deepest = b.vertices[..10]
            .iter()
            .map(|v| v.y - 0.5)
            .fold(f32::INFINITY, f32::min);
        let kept = manifold.min_separation().unwrap();
        assert!((kept - deepest).abs() < 1e-5, "kept {} deepest {}", kept, deepest);
        for (i, p) in manifold.iter().enumerate() {
            assert!((p.position.y - 0.5).abs() < 1e-5);
            for q in manifold.iter().skip(i + 1) {
                assert!((p.position - q.position).length() > 0.1);
                assert_ne!(p.id, q.id);
            }
        }
    }

    #[test]
    fn test_crossing_points_lie_on_both_planes() {
        // Incident square rotated 45 degrees: every corner pokes past a side plane.
        let cube = ConvexPolyhedron::cuboid(Vec3::splat(0.5));
        let a = WorldPolyhedron::new(&cube, &Transform3::identity());
        let b = WorldPolyhedron::new(
            &cube,
            &Transform3::from_position_rotation(
                Vec3::new(0.0, 0.99, 0.0),
                Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
            ),
        );
        let manifold = polyhedra(&a, &b, &Separation::new(Vec3::Y, 0.01), 0.02);

        // The clipped octagon exactly fills a manifold.
        assert_eq!(manifold.len(), 8);
        for p in &manifold {
            assert!(p.position.x.abs() <= 0.5 + 1e-5 && p.position.z.abs() <= 0.5 + 1e-5);
            assert!((p.position.y - 0.5).abs() < 1e-5);
            assert!(p.id.incident & CROSSING_BIT != 0);
            // Each lies on a face edge of the square reference face.
            let on_x = (p.position.x.abs() - 0.5).abs() < 1e-5;
            let on_z = (p.position.z.abs() - 0.5).abs() < 1e-5;
            assert!(on_x || on_z, "{:?}", p.position);
        }
    }

    #[test]
    fn test_segment_clipped_at_side_plane() {
        let cube = ConvexPolyhedron::cuboid(Vec3::ONE);
        let a = WorldPolyhedron::new(&cube, &Transform3::identity());
        // One spine end hangs past the +X face.
        let capsule = WorldCapsule {
            a: Vec3::new(0.0, 1.4, 0.0),
            b: Vec3::new(2.0, 1.4, 0.0),
            radius: 0.5,
        };
        let manifold = polyhedron_capsule(&a, &capsule, &Separation::new(Vec3::Y, 0.1), 0.02);
        assert_eq!(manifold.len(), 2);
        assert!(manifold.iter().any(|p| p.position.x.abs() < 1e-5));
        assert!(manifold.iter().any(|p| (p.position.x - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_separated_beyond_margin_is_empty() {
        let cube = ConvexPolyhedron::cuboid(Vec3::splat(0.5));
        let a = WorldPolyhedron::new(&cube, &Transform3::identity());
        let b = WorldPolyhedron::new(&cube, &Transform3::from_position(Vec3::new(0.0, 1.1, 0.0)));
        let sep = Separation::new(Vec3::Y, -0.1);
        assert!(polyhedra(&a, &b, &sep, 0.02).is_empty());
        assert_eq!(polyhedra(&a, &b, &sep, 0.2).len(), 4);
    }

    #[test]
    fn test_polygon_clip_two_points() {
        let ground = ConvexPolygon::rectangle(Vec2::new(5.0, 0.5));
        let rect = ConvexPolygon::rectangle(Vec2::splat(0.5));
        let a = WorldPolygon::new(&ground, &Transform2::identity());
        let b = WorldPolygon::new(&rect, &Transform2::from_position(Vec2::new(1.0, 0.98)));
        let sep = Separation::new(Vec2::Y, 0.02);
        let manifold = polygons(&a, &b, &sep, 0.0);
        assert_eq!(manifold.len(), 2);
        let ids: Vec<u32> = manifold.iter().map(|p| p.id.incident).collect();
        assert!(ids.contains(&0) && ids.contains(&1));
        for p in &manifold {
            assert!((p.separation + 0.02).abs() < 1e-5);
            assert_eq!(p.id.reference, 2);
        }
    }

    #[test]
    fn test_capsule_on_face_gets_two_points() {
        let cube = ConvexPolyhedron::cuboid(Vec3::ONE);
        let a = WorldPolyhedron::new(&cube, &Transform3::identity());
        let capsule = WorldCapsule {
            a: Vec3::new(-0.5, 1.4, 0.0),
            b: Vec3::new(0.5, 1.4, 0.0),
            radius: 0.5,
        };
        let manifold = polyhedron_capsule(&a, &capsule, &Separation::new(Vec3::Y, 0.1), 0.02);
        assert_eq!(manifold.len(), 2);
        for p in &manifold {
            assert!((p.separation + 0.1).abs() < 1e-5);
            assert!((p.position.y - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_feature_deepest_vertex() {
        let rect = ConvexPolygon::rectangle(Vec2::ONE);
        let world = WorldPolygon::new(&rect, &Transform2::from_position_rotation(Vec2::ZERO, 0.1));
        let feature = edge_feature(&world, 0);
        assert_eq!(feature.vertices.len(), 2);
        let other = feature.vertices.iter().map(|&(v, _)| v).find(|&v| v != feature.deepest).unwrap();
        assert!(feature.deepest.dot(feature.normal) <= other.dot(feature.normal));
    }
}
