// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh/mesh boolean primitives
//!
//! `intersect_mesh_mesh` mutually subdivides two meshes along each
//! other's cut planes so that every triangle of the result is fully
//! inside, fully outside, or on the surface of the other mesh.
//! `bool_subtract` then classifies triangles by ray parity and keeps the
//! outside of the first mesh plus the inward-facing inside of the second.

use crate::mesh::Mesh;
use nalgebra::{Point3, Vector3};

const EPS: f64 = 1e-9;
const AREA_EPS: f64 = 1e-12;

/// Normal of the triangle (a, b, c); zero for degenerate triangles
pub fn compute_normal(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Vector3<f64> {
    let normal = (b - a).cross(&(c - a));
    let len = normal.norm();
    if len > 1e-12 {
        normal / len
    } else {
        Vector3::zeros()
    }
}

/// Plane through a point with a unit normal
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub point: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Plane {
    pub fn new(point: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            point,
            normal: normal.normalize(),
        }
    }

    /// Signed distance from point to plane; positive is in front
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        (point - self.point).dot(&self.normal)
    }
}

/// Triangle in 3D
#[derive(Debug, Clone)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    pub fn normal(&self) -> Vector3<f64> {
        compute_normal(self.v0, self.v1, self.v2)
    }

    pub fn area(&self) -> f64 {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0)).norm() * 0.5
    }

    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    pub fn aabb(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        aabb.grow(self.v0);
        aabb.grow(self.v1);
        aabb.grow(self.v2);
        aabb
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    pub fn grow(&mut self, p: Point3<f64>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Overlap test with a tolerance so zero-thickness boxes still touch
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x + EPS
            && other.min.x <= self.max.x + EPS
            && self.min.y <= other.max.y + EPS
            && other.min.y <= self.max.y + EPS
            && self.min.z <= other.max.z + EPS
            && other.min.z <= self.max.z + EPS
    }
}

/// Split a triangle by a plane into front and back pieces.
///
/// A triangle entirely on one side (within tolerance) stays whole on
/// that side; a straddling triangle is clipped into up to three pieces.
pub fn split_triangle(tri: &Triangle, plane: &Plane) -> (Vec<Triangle>, Vec<Triangle>) {
    let verts = [tri.v0, tri.v1, tri.v2];
    let dists = [
        plane.signed_distance(&verts[0]),
        plane.signed_distance(&verts[1]),
        plane.signed_distance(&verts[2]),
    ];

    if dists.iter().all(|&d| d >= -EPS) {
        return (vec![tri.clone()], Vec::new());
    }
    if dists.iter().all(|&d| d <= EPS) {
        return (Vec::new(), vec![tri.clone()]);
    }

    let mut front_poly: Vec<Point3<f64>> = Vec::with_capacity(4);
    let mut back_poly: Vec<Point3<f64>> = Vec::with_capacity(4);

    for i in 0..3 {
        let j = (i + 1) % 3;
        let (vi, di) = (verts[i], dists[i]);
        let (vj, dj) = (verts[j], dists[j]);

        if di >= -EPS {
            front_poly.push(vi);
        }
        if di <= EPS {
            back_poly.push(vi);
        }
        if (di > EPS && dj < -EPS) || (di < -EPS && dj > EPS) {
            let t = di / (di - dj);
            let crossing = vi + (vj - vi) * t;
            front_poly.push(crossing);
            back_poly.push(crossing);
        }
    }

    (fan_triangles(&front_poly), fan_triangles(&back_poly))
}

fn fan_triangles(poly: &[Point3<f64>]) -> Vec<Triangle> {
    let mut triangles = Vec::new();
    for i in 1..poly.len().saturating_sub(1) {
        let tri = Triangle::new(poly[0], poly[i], poly[i + 1]);
        if tri.area() > AREA_EPS {
            triangles.push(tri);
        }
    }
    triangles
}

/// Collect the triangles of a mesh
pub fn triangles_of(mesh: &Mesh) -> Vec<Triangle> {
    let mut triangles = Vec::with_capacity(mesh.triangle_count());
    for i in (0..mesh.indices.len()).step_by(3) {
        triangles.push(Triangle::new(
            mesh.point(mesh.indices[i]),
            mesh.point(mesh.indices[i + 1]),
            mesh.point(mesh.indices[i + 2]),
        ));
    }
    triangles
}

/// Mutually subdivide two meshes along each other's surfaces.
///
/// Each output triangle is either fully inside, fully outside, or on the
/// surface of the other mesh, which is the precondition for
/// [`bool_subtract`].
pub fn intersect_mesh_mesh(a: &Mesh, b: &Mesh) -> (Mesh, Mesh) {
    (subdivide_against(a, b), subdivide_against(b, a))
}

fn subdivide_against(source: &Mesh, cutter: &Mesh) -> Mesh {
    let cutters: Vec<(Aabb, Plane)> = triangles_of(cutter)
        .into_iter()
        .filter(|t| t.area() > AREA_EPS)
        .map(|t| {
            let normal = t.normal();
            (t.aabb(), Plane::new(t.v0, normal))
        })
        .collect();

    let mut out = Mesh::with_capacity(source.vertex_count() * 2, source.indices.len() * 2);

    for tri in triangles_of(source) {
        let mut pieces = vec![tri];

        for (cutter_aabb, cutter_plane) in &cutters {
            let mut next = Vec::with_capacity(pieces.len());
            for piece in &pieces {
                if piece.aabb().intersects(cutter_aabb) {
                    let (front, back) = split_triangle(piece, cutter_plane);
                    next.extend(front);
                    next.extend(back);
                } else {
                    next.push(piece.clone());
                }
            }
            pieces = next;
        }

        for piece in pieces {
            if piece.area() > AREA_EPS {
                out.add_face_points(piece.v0, piece.v1, piece.v2);
            }
        }
    }

    out
}

/// Ray-parity containment test.
///
/// The ray direction is irrational-ish to dodge exact edge and vertex
/// hits on axis-aligned geometry.
pub fn point_in_mesh(mesh: &Mesh, point: &Point3<f64>) -> bool {
    let dir = Vector3::new(0.285714285714, 0.530612244898, 0.795918367347).normalize();
    let mut crossings = 0usize;

    for tri in triangles_of(mesh) {
        if ray_hits_triangle(point, &dir, &tri) {
            crossings += 1;
        }
    }

    crossings % 2 == 1
}

/// Moeller-Trumbore ray/triangle intersection, forward hits only
fn ray_hits_triangle(origin: &Point3<f64>, dir: &Vector3<f64>, tri: &Triangle) -> bool {
    let edge1 = tri.v1 - tri.v0;
    let edge2 = tri.v2 - tri.v0;
    let h = dir.cross(&edge2);
    let det = edge1.dot(&h);
    if det.abs() < 1e-14 {
        return false;
    }
    let inv_det = 1.0 / det;
    let s = origin - tri.v0;
    let u = s.dot(&h) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return false;
    }
    let q = s.cross(&edge1);
    let v = dir.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return false;
    }
    let t = edge2.dot(&q) * inv_det;
    t > EPS
}

/// Boolean difference of pre-subdivided meshes.
///
/// Keeps the triangles of `a` classified outside `b`, plus the triangles
/// of `b` inside `a` with flipped winding, forming a closed oriented mesh
/// equal to a minus b.
pub fn bool_subtract(a: &Mesh, b: &Mesh) -> Mesh {
    let mut out = Mesh::new();

    for tri in triangles_of(a) {
        if !point_in_mesh(b, &tri.centroid()) {
            out.add_face_points(tri.v0, tri.v1, tri.v2);
        }
    }

    for tri in triangles_of(b) {
        if point_in_mesh(a, &tri.centroid()) {
            out.add_face_points(tri.v0, tri.v2, tri.v1);
        }
    }

    out
}

/// Build a box mesh from min/max corners: 12 triangles, outward winding
#[cfg(test)]
pub fn box_mesh(min: Point3<f64>, max: Point3<f64>) -> Mesh {
    let mut mesh = Mesh::with_capacity(36, 36);

    let v0 = Point3::new(min.x, min.y, min.z);
    let v1 = Point3::new(max.x, min.y, min.z);
    let v2 = Point3::new(max.x, max.y, min.z);
    let v3 = Point3::new(min.x, max.y, min.z);
    let v4 = Point3::new(min.x, min.y, max.z);
    let v5 = Point3::new(max.x, min.y, max.z);
    let v6 = Point3::new(max.x, max.y, max.z);
    let v7 = Point3::new(min.x, max.y, max.z);

    // Bottom (z = min)
    mesh.add_face_points(v0, v2, v1);
    mesh.add_face_points(v0, v3, v2);
    // Top (z = max)
    mesh.add_face_points(v4, v5, v6);
    mesh.add_face_points(v4, v6, v7);
    // Left (x = min)
    mesh.add_face_points(v0, v4, v7);
    mesh.add_face_points(v0, v7, v3);
    // Right (x = max)
    mesh.add_face_points(v1, v2, v6);
    mesh.add_face_points(v1, v6, v5);
    // Front (y = min)
    mesh.add_face_points(v0, v1, v5);
    mesh.add_face_points(v0, v5, v4);
    // Back (y = max)
    mesh.add_face_points(v3, v7, v6);
    mesh.add_face_points(v3, v6, v2);

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_split_triangle_straddling() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, -1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        );
        let plane = Plane::new(Point3::origin(), Vector3::z());

        let (front, back) = split_triangle(&tri, &plane);
        assert_eq!(front.len(), 2);
        assert_eq!(back.len(), 1);

        let total: f64 = front.iter().chain(back.iter()).map(|t| t.area()).sum();
        assert_relative_eq!(total, tri.area(), epsilon = 1e-9);
    }

    #[test]
    fn test_split_triangle_one_sided() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 2.0),
        );
        let plane = Plane::new(Point3::origin(), Vector3::z());

        let (front, back) = split_triangle(&tri, &plane);
        assert_eq!(front.len(), 1);
        assert!(back.is_empty());
    }

    #[test]
    fn test_point_in_mesh_box() {
        let mesh = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));

        assert!(point_in_mesh(&mesh, &Point3::new(0.5, 0.5, 0.5)));
        assert!(point_in_mesh(&mesh, &Point3::new(0.1, 0.2, 0.9)));
        assert!(!point_in_mesh(&mesh, &Point3::new(1.5, 0.5, 0.5)));
        assert!(!point_in_mesh(&mesh, &Point3::new(-0.1, 0.5, 0.5)));
    }

    #[test]
    fn test_box_volume() {
        let mesh = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 3.0, 4.0));
        assert_relative_eq!(mesh.volume().abs(), 24.0, epsilon = 1e-9);
    }

    #[test]
    fn test_intersect_introduces_cut_edges() {
        let a = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0));
        let b = box_mesh(Point3::new(1.0, 1.0, 1.0), Point3::new(3.0, 3.0, 3.0));

        let (a_cut, b_cut) = intersect_mesh_mesh(&a, &b);

        assert!(a_cut.triangle_count() > a.triangle_count());
        assert!(b_cut.triangle_count() > b.triangle_count());
        // Subdivision preserves the surface
        assert_relative_eq!(a_cut.volume().abs(), 8.0, epsilon = 1e-9);
        assert_relative_eq!(b_cut.volume().abs(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_subtract_corner_overlap() {
        let a = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0));
        let b = box_mesh(Point3::new(1.0, 1.0, 1.0), Point3::new(3.0, 3.0, 3.0));

        let (a_cut, b_cut) = intersect_mesh_mesh(&a, &b);
        let result = bool_subtract(&a_cut, &b_cut);

        // 2^3 minus the shared 1^3 corner
        assert_relative_eq!(result.volume().abs(), 7.0, epsilon = 1e-6);
    }

    #[test]
    fn test_subtract_through_hole() {
        // Wall-like slab with a tunnel punched through its thin axis
        let a = box_mesh(Point3::new(-1.0, -0.1, 0.0), Point3::new(1.0, 0.1, 3.0));
        let b = box_mesh(Point3::new(-0.5, -0.5, 1.0), Point3::new(0.5, 0.5, 2.0));

        let (a_cut, b_cut) = intersect_mesh_mesh(&a, &b);
        let result = bool_subtract(&a_cut, &b_cut);

        // 2*0.2*3 minus 1*0.2*1
        assert_relative_eq!(result.volume().abs(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_subtract_disjoint_is_identity_volume() {
        let a = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = box_mesh(Point3::new(5.0, 5.0, 5.0), Point3::new(6.0, 6.0, 6.0));

        let (a_cut, b_cut) = intersect_mesh_mesh(&a, &b);
        let result = bool_subtract(&a_cut, &b_cut);

        assert_relative_eq!(result.volume().abs(), 1.0, epsilon = 1e-9);
    }
}
