// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures
//!
//! Indexed triangle meshes, the composed-mesh tree produced by the
//! resolver, and the flat placed-geometry output.

use nalgebra::{Matrix4, Point3, Vector3};
use std::fmt::Write as _;

/// Indexed triangle mesh with double-precision buffers
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f64>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f64>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(index_count),
        }
    }

    /// Add a vertex with normal
    pub fn add_point(&mut self, position: Point3<f64>, normal: Vector3<f64>) {
        self.positions.push(position.x);
        self.positions.push(position.y);
        self.positions.push(position.z);

        self.normals.push(normal.x);
        self.normals.push(normal.y);
        self.normals.push(normal.z);
    }

    /// Add a triangle by vertex indices
    pub fn add_face(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Add a standalone triangle from three points, with its face normal
    pub fn add_face_points(&mut self, a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) {
        let normal = crate::boolean::compute_normal(a, b, c);
        let offset = self.vertex_count() as u32;
        self.add_point(a, normal);
        self.add_point(b, normal);
        self.add_point(c, normal);
        self.add_face(offset, offset + 1, offset + 2);
    }

    /// Read back a vertex position
    pub fn point(&self, index: u32) -> Point3<f64> {
        let i = index as usize * 3;
        Point3::new(self.positions[i], self.positions[i + 1], self.positions[i + 2])
    }

    /// Vertex count
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Triangle count
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Merge another mesh into this one
    #[inline]
    pub fn merge(&mut self, other: &Mesh) {
        let vertex_offset = self.vertex_count() as u32;

        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
    }

    /// Transform positions and normals in place
    pub fn transform_by(&mut self, transform: &Matrix4<f64>) {
        for i in (0..self.positions.len()).step_by(3) {
            let point = Point3::new(self.positions[i], self.positions[i + 1], self.positions[i + 2]);
            let transformed = transform.transform_point(&point);
            self.positions[i] = transformed.x;
            self.positions[i + 1] = transformed.y;
            self.positions[i + 2] = transformed.z;
        }

        let rotation = transform.fixed_view::<3, 3>(0, 0);
        for i in (0..self.normals.len()).step_by(3) {
            let normal = Vector3::new(self.normals[i], self.normals[i + 1], self.normals[i + 2]);
            let transformed = rotation * normal;
            let len = transformed.norm();
            let transformed = if len > 1e-12 {
                transformed / len
            } else {
                transformed
            };
            self.normals[i] = transformed.x;
            self.normals[i + 1] = transformed.y;
            self.normals[i + 2] = transformed.z;
        }
    }

    /// Calculate bounds (min, max)
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        if self.positions.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = Point3::new(f64::MAX, f64::MAX, f64::MAX);
        let mut max = Point3::new(f64::MIN, f64::MIN, f64::MIN);

        for i in (0..self.positions.len()).step_by(3) {
            let x = self.positions[i];
            let y = self.positions[i + 1];
            let z = self.positions[i + 2];

            min.x = min.x.min(x);
            min.y = min.y.min(y);
            min.z = min.z.min(z);

            max.x = max.x.max(x);
            max.y = max.y.max(y);
            max.z = max.z.max(z);
        }

        (min, max)
    }

    /// Signed volume via the divergence theorem; magnitude is the enclosed
    /// volume for a closed mesh, sign follows the winding
    pub fn volume(&self) -> f64 {
        let mut total = 0.0;
        for i in (0..self.indices.len()).step_by(3) {
            let a = self.point(self.indices[i]);
            let b = self.point(self.indices[i + 1]);
            let c = self.point(self.indices[i + 2]);
            total += a.coords.dot(&b.coords.cross(&c.coords));
        }
        total / 6.0
    }

    /// Serialize as Wavefront OBJ, indices offset by `index_offset` so
    /// several meshes can share one file
    pub fn to_obj(&self, name: &str, index_offset: &mut usize) -> String {
        let mut obj = String::new();
        let _ = writeln!(obj, "o {}", name);
        for i in (0..self.positions.len()).step_by(3) {
            let _ = writeln!(
                obj,
                "v {} {} {}",
                self.positions[i],
                self.positions[i + 1],
                self.positions[i + 2]
            );
        }
        for i in (0..self.indices.len()).step_by(3) {
            let _ = writeln!(
                obj,
                "f {} {} {}",
                *index_offset + self.indices[i] as usize + 1,
                *index_offset + self.indices[i + 1] as usize + 1,
                *index_offset + self.indices[i + 2] as usize + 1
            );
        }
        *index_offset += self.vertex_count();
        obj
    }
}

/// RGBA color with components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

/// A node of the hierarchical mesh representation
///
/// Carries a local transform, an optional color, and a flag telling
/// whether a geometry is cached under this node's express id. Children
/// appear in the order their references occur in the entity's arguments.
#[derive(Debug, Clone)]
pub struct ComposedMesh {
    pub express_id: u32,
    pub transformation: Matrix4<f64>,
    pub color: Option<Rgba>,
    pub has_geometry: bool,
    pub children: Vec<ComposedMesh>,
}

impl ComposedMesh {
    /// Empty node with identity transform
    pub fn empty(express_id: u32) -> Self {
        Self {
            express_id,
            transformation: Matrix4::identity(),
            color: None,
            has_geometry: false,
            children: Vec::new(),
        }
    }
}

/// One geometry instance in world space
#[derive(Debug, Clone)]
pub struct PlacedGeometry {
    pub geometry_express_id: u32,
    pub color: Rgba,
    pub transformation: Matrix4<f64>,
}

/// Flattened list of placed geometries, in depth-first pre-order
#[derive(Debug, Clone, Default)]
pub struct FlatMesh {
    pub geometries: Vec<PlacedGeometry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mesh_creation() {
        let mesh = Mesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn test_add_point() {
        let mut mesh = Mesh::new();
        mesh.add_point(Point3::new(1.0, 2.0, 3.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(mesh.vertex_count(), 1);
        assert_eq!(mesh.positions, vec![1.0, 2.0, 3.0]);
        assert_eq!(mesh.normals, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_merge_offsets_indices() {
        let mut mesh1 = Mesh::new();
        mesh1.add_face_points(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );

        let mut mesh2 = Mesh::new();
        mesh2.add_face_points(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        );

        mesh1.merge(&mesh2);
        assert_eq!(mesh1.vertex_count(), 6);
        assert_eq!(mesh1.triangle_count(), 2);
        assert_eq!(&mesh1.indices, &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_transform_by_translation() {
        let mut mesh = Mesh::new();
        mesh.add_point(Point3::new(1.0, 0.0, 0.0), Vector3::z());
        mesh.transform_by(&Matrix4::new_translation(&Vector3::new(10.0, 20.0, 30.0)));
        assert_relative_eq!(mesh.positions[0], 11.0);
        assert_relative_eq!(mesh.positions[1], 20.0);
        assert_relative_eq!(mesh.positions[2], 30.0);
        // Normals unaffected by translation
        assert_relative_eq!(mesh.normals[2], 1.0);
    }

    #[test]
    fn test_index_invariants() {
        let mut mesh = Mesh::new();
        mesh.add_face_points(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert_eq!(mesh.indices.len(), 3 * mesh.triangle_count());
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn test_obj_output() {
        let mut mesh = Mesh::new();
        mesh.add_face_points(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let mut offset = 0;
        let obj = mesh.to_obj("tri", &mut offset);
        assert!(obj.starts_with("o tri\n"));
        assert!(obj.contains("f 1 2 3"));
        assert_eq!(offset, 3);
    }
}
