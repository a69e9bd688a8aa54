//! Procedural meshes used by the scene.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};
use orrery_types::{Mesh, ModelVertex};

/// Latitude/longitude sphere of radius one.
///
/// `precision` is the number of segments along both latitude and longitude.
/// Produces `(precision + 1)^2` vertices; the seam column is duplicated so the
/// texture coordinates wrap cleanly.
pub fn uv_sphere(precision: u32) -> Mesh {
    profiling::scope!("uv_sphere");

    let precision = precision.max(3);
    let row = precision + 1;

    let mut vertices = Vec::with_capacity((row * row) as usize);
    for i in 0..=precision {
        let y = (PI - i as f32 * PI / precision as f32).cos();
        let ring = (1.0 - y * y).max(0.0).sqrt();
        for j in 0..=precision {
            let angle = j as f32 * TAU / precision as f32;
            let position = Vec3::new(-angle.cos() * ring, y, angle.sin() * ring);
            let uv = Vec2::new(j as f32 / precision as f32, i as f32 / precision as f32);
            vertices.push(ModelVertex::new(position, position, uv));
        }
    }

    let mut indices = Vec::with_capacity((precision * precision * 6) as usize);
    for i in 0..precision {
        for j in 0..precision {
            let current = i * row + j;
            let next = (i + 1) * row + j;
            indices.extend_from_slice(&[current, current + 1, next, current + 1, next + 1, next]);
        }
    }

    Mesh { vertices, indices }
}

/// Small flat-shaded arrowhead pointing down -Z, roughly one unit across.
pub fn ship() -> Mesh {
    profiling::scope!("ship");

    let nose = Vec3::new(0.0, 0.0, -1.2);
    let left = Vec3::new(-0.8, 0.0, 0.6);
    let right = Vec3::new(0.8, 0.0, 0.6);
    let top = Vec3::new(0.0, 0.3, 0.4);
    let bottom = Vec3::new(0.0, -0.15, 0.4);

    let faces = [
        [nose, top, left],
        [nose, right, top],
        [nose, left, bottom],
        [nose, bottom, right],
        [left, top, right],
        [left, right, bottom],
    ];

    let mut vertices = Vec::with_capacity(faces.len() * 3);
    for [a, b, c] in faces {
        let normal = (b - a).cross(c - a).normalize_or_zero();
        vertices.push(ModelVertex::new(a, normal, Vec2::new(0.5, 0.0)));
        vertices.push(ModelVertex::new(b, normal, Vec2::new(0.0, 1.0)));
        vertices.push(ModelVertex::new(c, normal, Vec2::new(1.0, 1.0)));
    }
    let indices = (0..vertices.len() as u32).collect();

    Mesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_counts_and_validity() {
        let mesh = uv_sphere(20);
        assert_eq!(mesh.vertices.len(), 21 * 21);
        assert_eq!(mesh.indices.len(), 20 * 20 * 6);
        mesh.validate().unwrap();
    }

    #[test]
    fn sphere_vertices_are_on_unit_sphere() {
        for vertex in uv_sphere(12).vertices {
            assert!((vertex.position.length() - 1.0).abs() < 1e-4);
            assert_eq!(vertex.position, vertex.normal);
        }
    }

    #[test]
    fn sphere_poles() {
        let mesh = uv_sphere(8);
        assert!((mesh.vertices[0].position.y + 1.0).abs() < 1e-6);
        assert!((mesh.vertices.last().unwrap().position.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ship_is_valid() {
        let mesh = ship();
        mesh.validate().unwrap();
        assert!(mesh.vertices.iter().all(|v| v.normal.is_normalized()));
    }
}
