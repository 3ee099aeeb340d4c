//! Mass, center of mass, and inertia from geometry.
//!
//! Polygons are split into origin-anchored triangles (shoelace / cross-product
//! areas) and polyhedra into origin-anchored tetrahedra. Each piece contributes
//! signed area or volume, a weighted centroid, and its second moment about the
//! origin; the parallel-axis theorem then moves the inertia to the computed
//! center of mass.

use std::f32::consts::PI;

use glam::{Mat3, Vec2, Vec3};

use crate::math::{Dim, Dim2, Dim3};

/// Mass properties of a solid shape in its local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties<D: Dim> {
    /// Total mass.
    pub mass: f32,
    /// Center of mass in local coordinates.
    pub local_center: D::Vector,
    /// Inertia about the center of mass, in body axes.
    pub inertia: D::Inertia,
    /// Area (2D) or volume (3D).
    pub measure: f32,
}

impl<D: Dim> MassProperties<D> {
    /// Rescale to a target total mass, keeping the shape's distribution.
    pub fn with_mass(self, mass: f32) -> Self {
        if self.mass <= 0.0 {
            return self;
        }
        let ratio = mass / self.mass;
        Self {
            mass,
            inertia: self.inertia * ratio,
            ..self
        }
    }
}

/// Solid convex polygon with counter-clockwise vertices.
pub fn polygon(vertices: &[Vec2], density: f32) -> MassProperties<Dim2> {
    let n = vertices.len();
    let mut area = 0.0;
    let mut weighted_center = Vec2::ZERO;
    let mut origin_inertia = 0.0;

    for i in 0..n {
        let e1 = vertices[i];
        let e2 = vertices[(i + 1) % n];
        let d = e1.perp_dot(e2);
        let triangle_area = 0.5 * d;
        area += triangle_area;
        weighted_center += (e1 + e2) * (triangle_area / 3.0);

        let int_x2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
        let int_y2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
        origin_inertia += (0.25 / 3.0 * d) * (int_x2 + int_y2);
    }

    if area.abs() <= f32::EPSILON {
        return MassProperties {
            mass: 0.0,
            local_center: Vec2::ZERO,
            inertia: 0.0,
            measure: 0.0,
        };
    }

    let mass = density * area;
    let center = weighted_center / area;
    let inertia = density * origin_inertia - mass * center.length_squared();
    MassProperties {
        mass,
        local_center: center,
        inertia,
        measure: area,
    }
}

/// Solid convex polyhedron given as vertices and counter-clockwise face loops.
pub fn polyhedron<'a>(
    vertices: &[Vec3],
    faces: impl IntoIterator<Item = &'a [u32]>,
    density: f32,
) -> MassProperties<Dim3> {
    // Second moment of the canonical tetrahedron (0, e_x, e_y, e_z).
    let canonical = Mat3::from_cols_array(&[2.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 2.0]) * (1.0 / 120.0);

    let mut volume = 0.0;
    let mut weighted_center = Vec3::ZERO;
    let mut covariance = Mat3::ZERO;

    for face in faces {
        if face.len() < 3 {
            continue;
        }
        let a = vertices[face[0] as usize];
        for k in 1..face.len() - 1 {
            let b = vertices[face[k] as usize];
            let c = vertices[face[k + 1] as usize];
            let basis = Mat3::from_cols(a, b, c);
            let det = basis.determinant();
            let tet_volume = det / 6.0;
            volume += tet_volume;
            weighted_center += (a + b + c) * (tet_volume / 4.0);
            covariance += basis * canonical * basis.transpose() * det;
        }
    }

    if volume.abs() <= f32::EPSILON {
        return MassProperties {
            mass: 0.0,
            local_center: Vec3::ZERO,
            inertia: Mat3::ZERO,
            measure: 0.0,
        };
    }

    let mass = density * volume;
    let center = weighted_center / volume;
    let covariance = covariance * density - outer(center, center) * mass;
    let trace = covariance.x_axis.x + covariance.y_axis.y + covariance.z_axis.z;
    let inertia = Mat3::IDENTITY * trace - covariance;
    MassProperties {
        mass,
        local_center: center,
        inertia,
        measure: volume,
    }
}

/// Solid disc.
pub fn circle(radius: f32, density: f32) -> MassProperties<Dim2> {
    let area = PI * radius * radius;
    let mass = density * area;
    MassProperties {
        mass,
        local_center: Vec2::ZERO,
        inertia: 0.5 * mass * radius * radius,
        measure: area,
    }
}

/// Solid sphere. `I = 2/5 m r^2` on every axis.
pub fn sphere(radius: f32, density: f32) -> MassProperties<Dim3> {
    let volume = 4.0 / 3.0 * PI * radius.powi(3);
    let mass = density * volume;
    let i = 0.4 * mass * radius * radius;
    MassProperties {
        mass,
        local_center: Vec3::ZERO,
        inertia: Mat3::from_diagonal(Vec3::splat(i)),
        measure: volume,
    }
}

/// Solid capsule with its spine along Y; `half_height` is half the cylinder length.
pub fn capsule(radius: f32, half_height: f32, density: f32) -> MassProperties<Dim3> {
    let r2 = radius * radius;
    let height = 2.0 * half_height;
    let cylinder_volume = PI * r2 * height;
    let caps_volume = 4.0 / 3.0 * PI * r2 * radius;
    let cylinder_mass = density * cylinder_volume;
    let caps_mass = density * caps_volume;

    let axial = cylinder_mass * r2 * 0.5 + caps_mass * 0.4 * r2;

    // Each hemisphere: 83/320 m r^2 about its own center, offset by h + 3r/8.
    let hemisphere_mass = caps_mass * 0.5;
    let offset = half_height + 0.375 * radius;
    let hemisphere = hemisphere_mass * (83.0 / 320.0 * r2 + offset * offset);
    let transverse = cylinder_mass * (r2 / 4.0 + height * height / 12.0) + 2.0 * hemisphere;

    MassProperties {
        mass: cylinder_mass + caps_mass,
        local_center: Vec3::ZERO,
        inertia: Mat3::from_diagonal(Vec3::new(transverse, axial, transverse)),
        measure: cylinder_volume + caps_volume,
    }
}

/// `a * b^T`.
fn outer(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(a * b.x, a * b.y, a * b.z)
}
