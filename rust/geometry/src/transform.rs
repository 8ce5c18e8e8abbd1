// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement algebra
//!
//! Resolves 2D and 3D axis placements, local-placement chains, and
//! cartesian transformation operators into affine transforms. An
//! unexpected entity where a placement is expected yields the identity
//! plus a diagnostic, never an error.

use crate::Result;
use ifc_mesh_core::{IfcLoader, IfcType, TokenKind};
use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector2, Vector3};
use rustc_hash::FxHashSet;
use tracing::warn;

/// Read a 2D cartesian point (or direction; same argument shape)
pub fn cartesian_point_2d(loader: &IfcLoader, express_id: u32) -> Result<Point2<f64>> {
    let line = *loader.expect_line(express_id)?;
    let mut cur = loader.argument(&line, 0)?;
    let coords = loader.set_arg(&mut cur)?;

    let mut values = [0.0; 2];
    for (slot, c) in values.iter_mut().zip(coords.iter()) {
        let mut c = *c;
        *slot = loader.real_arg(&mut c)?;
    }
    Ok(Point2::new(values[0], values[1]))
}

/// Read a 3D cartesian point (or direction); missing components default to 0
pub fn cartesian_point_3d(loader: &IfcLoader, express_id: u32) -> Result<Point3<f64>> {
    let line = *loader.expect_line(express_id)?;
    let mut cur = loader.argument(&line, 0)?;
    let coords = loader.set_arg(&mut cur)?;

    let mut values = [0.0; 3];
    for (slot, c) in values.iter_mut().zip(coords.iter()) {
        let mut c = *c;
        *slot = loader.real_arg(&mut c)?;
    }
    Ok(Point3::new(values[0], values[1], values[2]))
}

/// Resolve an axis2placement2d into a 3x3 affine transform.
///
/// The y-axis is the x-axis rotated +90 degrees; columns are
/// {x-axis, y-axis, (location, 1)}.
pub fn axis2_placement_2d(loader: &IfcLoader, express_id: u32) -> Matrix3<f64> {
    match try_axis2_placement_2d(loader, express_id) {
        Ok(m) => m,
        Err(e) => {
            warn!("unexpected 2D placement at #{}: {}", express_id, e);
            Matrix3::identity()
        }
    }
}

fn try_axis2_placement_2d(loader: &IfcLoader, express_id: u32) -> Result<Matrix3<f64>> {
    let line = *loader.expect_line(express_id)?;

    let mut cur = loader.argument(&line, 0)?;
    let location_id = loader.ref_arg(&mut cur)?;

    let mut x_axis = Vector2::new(1.0, 0.0);
    if loader.token_kind(cur) == TokenKind::Ref {
        let dir_id = loader.ref_arg(&mut cur)?;
        x_axis = cartesian_point_2d(loader, dir_id)?.coords;
    }

    let pos = cartesian_point_2d(loader, location_id)?;
    let y_axis = Vector2::new(x_axis.y, -x_axis.x);

    Ok(Matrix3::from_columns(&[
        Vector3::new(x_axis.x, x_axis.y, 0.0),
        Vector3::new(y_axis.x, y_axis.y, 0.0),
        Vector3::new(pos.x, pos.y, 1.0),
    ]))
}

/// Resolve a 3D placement of any supported kind into a 4x4 affine
/// transform: axis2placement3d, local-placement chains (parent · local),
/// and cartesian transformation operators. Unexpected kinds yield the
/// identity with a diagnostic.
pub fn placement_3d(loader: &IfcLoader, express_id: u32) -> Matrix4<f64> {
    let line = match loader.expect_line(express_id) {
        Ok(line) => *line,
        Err(e) => {
            warn!("unresolvable placement #{}: {}", express_id, e);
            return Matrix4::identity();
        }
    };

    match line.ifc_type {
        IfcType::IfcLocalPlacement => local_placement_chain(loader, express_id),
        _ => single_placement(loader, express_id),
    }
}

/// Fold a local-placement chain iteratively: collect relative placements
/// walking up to the root, then multiply outermost-first. A cycle in the
/// chain is reported and broken.
fn local_placement_chain(loader: &IfcLoader, express_id: u32) -> Matrix4<f64> {
    let mut relative_ids = Vec::new();
    let mut seen = FxHashSet::default();
    let mut current = express_id;

    loop {
        if !seen.insert(current) {
            warn!("local placement cycle at #{}", current);
            break;
        }
        let line = match loader.expect_line(current) {
            Ok(line) => *line,
            Err(e) => {
                warn!("unresolvable placement #{}: {}", current, e);
                break;
            }
        };
        if line.ifc_type != IfcType::IfcLocalPlacement {
            relative_ids.push(current);
            break;
        }

        // IfcLocalPlacement: PlacementRelTo, RelativePlacement
        let parent = loader.ref_at(&line, 0).unwrap_or(None);
        if let Ok(Some(relative)) = loader.ref_at(&line, 1) {
            relative_ids.push(relative);
        }
        match parent {
            Some(parent_id) => current = parent_id,
            None => break,
        }
    }

    let mut result = Matrix4::identity();
    for &id in relative_ids.iter().rev() {
        result *= single_placement(loader, id);
    }
    result
}

/// Resolve one non-chained placement entity
fn single_placement(loader: &IfcLoader, express_id: u32) -> Matrix4<f64> {
    match try_single_placement(loader, express_id) {
        Ok(m) => m,
        Err(e) => {
            warn!("unexpected placement at #{}: {}", express_id, e);
            Matrix4::identity()
        }
    }
}

fn try_single_placement(loader: &IfcLoader, express_id: u32) -> Result<Matrix4<f64>> {
    let line = *loader.expect_line(express_id)?;
    match line.ifc_type {
        IfcType::IfcAxis2Placement3D => {
            // IfcAxis2Placement3D: Location, Axis, RefDirection
            let mut z_axis = Vector3::new(0.0, 0.0, 1.0);
            let mut x_axis = Vector3::new(1.0, 0.0, 0.0);

            let mut cur = loader.argument(&line, 0)?;
            let pos_id = loader.ref_arg(&mut cur)?;
            if loader.token_kind(cur) == TokenKind::Ref {
                let z_id = loader.ref_arg(&mut cur)?;
                z_axis = cartesian_point_3d(loader, z_id)?.coords;
            }

            if let Some(x_id) = loader.ref_at(&line, 2)? {
                x_axis = cartesian_point_3d(loader, x_id)?.coords;
            }

            let pos = cartesian_point_3d(loader, pos_id)?;
            let y_axis = z_axis.cross(&x_axis);

            Ok(columns_to_matrix(x_axis, y_axis, z_axis, pos))
        }
        IfcType::IfcCartesianTransformationOperator3D
        | IfcType::IfcCartesianTransformationOperator3DnonUniform => {
            // Axis1, Axis2, LocalOrigin, Scale, Axis3 [, Scale2, Scale3]
            let mut axis1 = Vector3::new(1.0, 0.0, 0.0);
            let mut axis2 = Vector3::new(0.0, 1.0, 0.0);
            let mut axis3 = Vector3::new(0.0, 0.0, 1.0);
            let mut scale1 = 1.0;
            let mut scale2 = 1.0;
            let mut scale3 = 1.0;

            if let Some(id) = loader.ref_at(&line, 0)? {
                axis1 = cartesian_point_3d(loader, id)?.coords;
            }
            if let Some(id) = loader.ref_at(&line, 1)? {
                axis2 = cartesian_point_3d(loader, id)?.coords;
            }

            let mut cur = loader.argument(&line, 2)?;
            let origin_id = loader.ref_arg(&mut cur)?;
            let pos = cartesian_point_3d(loader, origin_id)?;

            let mut cur = loader.argument(&line, 3)?;
            if matches!(loader.token_kind(cur), TokenKind::Real | TokenKind::Integer) {
                scale1 = loader.real_arg(&mut cur)?;
            }
            if let Some(id) = loader.ref_at(&line, 4)? {
                axis3 = cartesian_point_3d(loader, id)?.coords;
            }

            if line.ifc_type == IfcType::IfcCartesianTransformationOperator3DnonUniform {
                let mut cur = loader.argument(&line, 5)?;
                if matches!(loader.token_kind(cur), TokenKind::Real | TokenKind::Integer) {
                    scale2 = loader.real_arg(&mut cur)?;
                }
                let mut cur = loader.argument(&line, 6)?;
                if matches!(loader.token_kind(cur), TokenKind::Real | TokenKind::Integer) {
                    scale3 = loader.real_arg(&mut cur)?;
                }
            } else {
                scale2 = scale1;
                scale3 = scale1;
            }

            Ok(columns_to_matrix(
                axis1 * scale1,
                axis2 * scale2,
                axis3 * scale3,
                pos,
            ))
        }
        IfcType::IfcLocalPlacement => Ok(local_placement_chain(loader, express_id)),
        other => {
            warn!("unexpected placement type {} at #{}", other, express_id);
            Ok(Matrix4::identity())
        }
    }
}

fn columns_to_matrix(
    x: Vector3<f64>,
    y: Vector3<f64>,
    z: Vector3<f64>,
    pos: Point3<f64>,
) -> Matrix4<f64> {
    let mut m = Matrix4::identity();
    m[(0, 0)] = x.x;
    m[(1, 0)] = x.y;
    m[(2, 0)] = x.z;
    m[(0, 1)] = y.x;
    m[(1, 1)] = y.y;
    m[(2, 1)] = y.z;
    m[(0, 2)] = z.x;
    m[(1, 2)] = z.y;
    m[(2, 2)] = z.z;
    m[(0, 3)] = pos.x;
    m[(1, 3)] = pos.y;
    m[(2, 3)] = pos.z;
    m
}
