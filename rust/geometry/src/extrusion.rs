// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Profile extrusion
//!
//! Sweeps a closed 2D profile along a direction: two earcut-triangulated
//! caps plus a quad strip of side walls, consistently outward-oriented.

use crate::boolean::compute_normal;
use crate::mesh::Mesh;
use crate::profile::Profile;
use crate::triangulation::{earcut_polygon, polygon_normal};
use nalgebra::{Matrix4, Point2, Point3, Vector3};
use tracing::warn;

/// Extrude a profile under a placement, along `dir` for `distance`.
///
/// The profile is normalized to counter-clockwise order first so that
/// caps and side walls agree on the outward orientation. The duplicated
/// closing point is dropped for the cap fan only; the closed curve still
/// drives the side walls.
pub fn extrude(
    profile: &Profile,
    placement: &Matrix4<f64>,
    dir: Vector3<f64>,
    distance: f64,
) -> Mesh {
    if profile.curve.points.len() < 3 {
        warn!("extrusion profile has fewer than 3 points");
        return Mesh::new();
    }

    let mut points = profile.curve.points.clone();
    if signed_area(&points) < 0.0 {
        points.reverse();
    }

    let offset = dir * distance;

    // Cap polygon without the duplicated closing point
    let mut cap_2d: &[Point2<f64>] = &points;
    if points.len() > 3 && closes(&points) {
        cap_2d = &points[..points.len() - 1];
    }

    let cap_indices = match earcut_polygon(cap_2d) {
        Ok(indices) => indices,
        Err(e) => {
            warn!("extrusion cap triangulation failed: {}", e);
            return Mesh::new();
        }
    };

    let bottom: Vec<Point3<f64>> = cap_2d
        .iter()
        .map(|p| placement.transform_point(&Point3::new(p.x, p.y, 0.0)))
        .collect();
    let top: Vec<Point3<f64>> = cap_2d
        .iter()
        .map(|p| placement.transform_point(&Point3::from(Vector3::new(p.x, p.y, 0.0) + offset)))
        .collect();

    let normal = polygon_normal(&top);

    let mut mesh = Mesh::with_capacity(
        cap_2d.len() * 2 + (points.len() - 1) * 4,
        cap_indices.len() * 2 + (points.len() - 1) * 6,
    );

    // Bottom cap, reversed winding so both caps face away from the solid
    for p in &bottom {
        mesh.add_point(*p, -normal);
    }
    for i in (0..cap_indices.len()).step_by(3) {
        mesh.add_face(cap_indices[i], cap_indices[i + 2], cap_indices[i + 1]);
    }

    // Top cap
    let top_offset = mesh.vertex_count() as u32;
    for p in &top {
        mesh.add_point(*p, normal);
    }
    for i in (0..cap_indices.len()).step_by(3) {
        mesh.add_face(
            top_offset + cap_indices[i],
            top_offset + cap_indices[i + 1],
            top_offset + cap_indices[i + 2],
        );
    }

    // Side walls, one quad per consecutive profile pair
    for i in 1..points.len() {
        let start = points[i - 1];
        let end = points[i];

        let sb = placement.transform_point(&Point3::new(start.x, start.y, 0.0));
        let eb = placement.transform_point(&Point3::new(end.x, end.y, 0.0));
        let st =
            placement.transform_point(&Point3::from(Vector3::new(start.x, start.y, 0.0) + offset));
        let et = placement.transform_point(&Point3::from(Vector3::new(end.x, end.y, 0.0) + offset));

        let n = compute_normal(sb, eb, st);

        let quad = mesh.vertex_count() as u32;
        mesh.add_point(sb, n);
        mesh.add_point(eb, n);
        mesh.add_point(st, n);
        mesh.add_point(et, n);

        mesh.add_face(quad, quad + 1, quad + 2);
        mesh.add_face(quad + 2, quad + 1, quad + 3);
    }

    mesh
}

/// Swap the first two indices of every face, reversing orientation.
/// Applied to extrusions whose direction points against +Z.
pub fn flip_winding(mesh: &mut Mesh) {
    for i in (0..mesh.indices.len()).step_by(3) {
        mesh.indices.swap(i, i + 1);
    }
}

fn closes(points: &[Point2<f64>]) -> bool {
    let first = points[0];
    let last = points[points.len() - 1];
    (first - last).norm() < 1e-9
}

/// Shoelace area; positive for counter-clockwise order
fn signed_area(points: &[Point2<f64>]) -> f64 {
    let mut area = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        area += a.x * b.y - b.x * a.y;
    }
    area / 2.0
}
