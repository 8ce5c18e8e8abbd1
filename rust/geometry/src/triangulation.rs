// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Wrapper around earcutr for 2D polygon triangulation.

use crate::{Error, Result};
use nalgebra::{Point2, Point3, Vector3};

/// Triangulate a simple polygon (no holes)
/// Returns triangle indices into the input points
pub fn earcut_polygon(points: &[Point2<f64>]) -> Result<Vec<u32>> {
    if points.len() < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points to triangulate".to_string(),
        ));
    }

    let mut vertices = Vec::with_capacity(points.len() * 2);
    for p in points {
        vertices.push(p.x);
        vertices.push(p.y);
    }

    let indices = earcutr::earcut(&vertices, &[], 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

    Ok(indices.into_iter().map(|i| i as u32).collect())
}

/// Triangulate a polygon with holes, given as a list of rings with the
/// outer ring first. Returns triangle indices into the concatenated
/// vertex sequence of all rings.
pub fn earcut_rings(rings: &[Vec<Point2<f64>>]) -> Result<Vec<u32>> {
    let outer = rings
        .first()
        .ok_or_else(|| Error::TriangulationError("No rings given".to_string()))?;
    if outer.len() < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points in outer ring".to_string(),
        ));
    }

    let total: usize = rings.iter().map(|r| r.len()).sum();
    let mut vertices = Vec::with_capacity(total * 2);
    let mut hole_indices = Vec::with_capacity(rings.len().saturating_sub(1));

    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            hole_indices.push(vertices.len() / 2);
        }
        for p in ring {
            vertices.push(p.x);
            vertices.push(p.y);
        }
    }

    let indices = earcutr::earcut(&vertices, &hole_indices, 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

    Ok(indices.into_iter().map(|i| i as u32).collect())
}

/// Polygon normal by Newell's method; robust against colinear triples
pub fn polygon_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal: Vector3<f64> = Vector3::zeros();

    for i in 0..points.len() {
        let current = &points[i];
        let next = &points[(i + 1) % points.len()];

        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    let len = normal.norm();
    if len > 1e-10 {
        normal / len
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    }
}
