// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary-representation shells
//!
//! Builds triangle meshes from closed or open shells by triangulating
//! each face over its 3D bounds, projecting into the face plane for the
//! general polygon-with-holes case.

use crate::curve::{loop_points_3d, Curve3D};
use crate::mesh::Mesh;
use crate::triangulation::earcut_rings;
use crate::Result;
use ifc_mesh_core::{IfcLoader, IfcType};
use nalgebra::Point2;
use tracing::warn;

/// Bound classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    Outer,
    Inner,
}

/// One face bound: a 3D loop with orientation and kind
#[derive(Debug, Clone)]
pub struct Bound3D {
    pub curve: Curve3D,
    pub orientation: bool,
    pub kind: BoundKind,
}

/// Build the mesh for a shell reference (closed or open)
pub fn brep_geometry(loader: &IfcLoader, express_id: u32) -> Mesh {
    let mut geometry = Mesh::new();
    if let Err(e) = try_brep_geometry(loader, express_id, &mut geometry) {
        warn!("failed to build brep at #{}: {}", express_id, e);
    }
    geometry
}

fn try_brep_geometry(loader: &IfcLoader, express_id: u32, geometry: &mut Mesh) -> Result<()> {
    let line = *loader.expect_line(express_id)?;
    match line.ifc_type {
        IfcType::IfcClosedShell | IfcType::IfcOpenShell => {
            // CfsFaces
            let mut cur = loader.argument(&line, 0)?;
            let faces = loader.set_arg(&mut cur)?;

            let mut face_ids = Vec::with_capacity(faces.len());
            for token in faces {
                let mut c = token;
                face_ids.push(loader.ref_arg(&mut c)?);
            }
            for face_id in face_ids {
                add_face(loader, face_id, geometry);
            }
        }
        other => {
            warn!("unexpected shell type {} at #{}", other, express_id);
        }
    }
    Ok(())
}

/// Triangulate one face into the geometry
fn add_face(loader: &IfcLoader, express_id: u32, geometry: &mut Mesh) {
    if let Err(e) = try_add_face(loader, express_id, geometry) {
        warn!("failed to add face at #{}: {}", express_id, e);
    }
}

fn try_add_face(loader: &IfcLoader, express_id: u32, geometry: &mut Mesh) -> Result<()> {
    let line = *loader.expect_line(express_id)?;
    match line.ifc_type {
        IfcType::IfcFace => {
            // Bounds
            let mut cur = loader.argument(&line, 0)?;
            let bound_tokens = loader.set_arg(&mut cur)?;

            let mut bound_ids = Vec::with_capacity(bound_tokens.len());
            for token in bound_tokens {
                let mut c = token;
                bound_ids.push(loader.ref_arg(&mut c)?);
            }

            let mut bounds = Vec::with_capacity(bound_ids.len());
            for bound_id in bound_ids {
                bounds.push(bound_for(loader, bound_id));
            }

            triangulate_bounds(geometry, &bounds);
        }
        other => {
            warn!("unexpected face type {} at #{}", other, express_id);
        }
    }
    Ok(())
}

/// Read one face bound; a reversed loop is put back into face order
fn bound_for(loader: &IfcLoader, express_id: u32) -> Bound3D {
    match try_bound_for(loader, express_id) {
        Ok(bound) => bound,
        Err(e) => {
            warn!("failed to read bound at #{}: {}", express_id, e);
            Bound3D {
                curve: Curve3D::default(),
                orientation: true,
                kind: BoundKind::Inner,
            }
        }
    }
}

fn try_bound_for(loader: &IfcLoader, express_id: u32) -> Result<Bound3D> {
    let line = *loader.expect_line(express_id)?;
    match line.ifc_type {
        IfcType::IfcFaceOuterBound | IfcType::IfcFaceBound => {
            // Bound, Orientation
            let mut cur = loader.argument(&line, 0)?;
            let loop_id = loader.ref_arg(&mut cur)?;
            let orientation = loader.string_arg(&mut cur).map(|s| s != "F").unwrap_or(true);

            let mut curve = loop_points_3d(loader, loop_id);
            if !orientation {
                curve.points.reverse();
            }

            Ok(Bound3D {
                curve,
                orientation,
                kind: if line.ifc_type == IfcType::IfcFaceOuterBound {
                    BoundKind::Outer
                } else {
                    BoundKind::Inner
                },
            })
        }
        other => {
            warn!("unexpected bound type {} at #{}", other, express_id);
            Ok(Bound3D {
                curve: Curve3D::default(),
                orientation: true,
                kind: BoundKind::Inner,
            })
        }
    }
}

/// Triangulate the bounds of one face into the geometry.
///
/// Single 3- and 4-point bounds take fast paths; the general case
/// projects every bound into the plane of the first bound (outer first)
/// and runs ear clipping over the resulting rings.
pub fn triangulate_bounds(geometry: &mut Mesh, bounds: &[Bound3D]) {
    if bounds.is_empty() || bounds[0].curve.points.len() < 3 {
        return;
    }

    if bounds.len() == 1 && bounds[0].curve.points.len() == 3 {
        let c = &bounds[0].curve;
        geometry.add_face_points(c.points[0], c.points[1], c.points[2]);
        return;
    }

    if bounds.len() == 1 && bounds[0].curve.points.len() == 4 {
        let c = &bounds[0].curve;
        let normal = crate::boolean::compute_normal(c.points[0], c.points[1], c.points[2]);

        let offset = geometry.vertex_count() as u32;
        for p in &c.points {
            geometry.add_point(*p, normal);
        }
        geometry.add_face(offset, offset + 1, offset + 2);
        geometry.add_face(offset, offset + 2, offset + 3);
        return;
    }

    // General polygon, possibly with holes: build an orthonormal basis on
    // the plane of the first bound and project all rings into it.
    let p0 = bounds[0].curve.points[0];
    let p1 = bounds[0].curve.points[1];
    let p2 = bounds[0].curve.points[2];

    let v12 = (p1 - p0).normalize();
    let v13 = (p2 - p0).normalize();
    let n = v12.cross(&v13).normalize();
    let v12 = v13.cross(&n);

    let offset = geometry.vertex_count() as u32;
    let mut rings: Vec<Vec<Point2<f64>>> = Vec::with_capacity(bounds.len());

    for bound in bounds {
        let mut ring = Vec::with_capacity(bound.curve.points.len());
        for pt in &bound.curve.points {
            geometry.add_point(*pt, n);

            let d = pt - p0;
            ring.push(Point2::new(d.dot(&v12), d.dot(&v13)));
        }
        rings.push(ring);
    }

    match earcut_rings(&rings) {
        Ok(indices) => {
            for i in (0..indices.len()).step_by(3) {
                geometry.add_face(
                    offset + indices[i],
                    offset + indices[i + 1],
                    offset + indices[i + 2],
                );
            }
        }
        Err(e) => warn!("face triangulation failed: {}", e),
    }
}
