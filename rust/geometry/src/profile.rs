// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Profile builder
//!
//! Produces closed 2D profiles for arbitrary-closed, rectangle, and
//! circle profile definitions, marking convexity.

use crate::curve::{curve_2d, Curve2D};
use crate::transform::axis2_placement_2d;
use crate::Result;
use ifc_mesh_core::{IfcLoader, IfcType, TokenKind};
use nalgebra::{Matrix3, Point2, Vector3};
use std::f64::consts::PI;
use tracing::warn;

/// A closed 2D cross-section
///
/// The curve repeats its first point at the tail and holds at least three
/// distinct points when the source entity was well formed.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub kind: String,
    pub curve: Curve2D,
    pub is_convex: bool,
}

/// Build the profile for an express id; unknown kinds yield an empty
/// profile with a diagnostic
pub fn profile_for(loader: &IfcLoader, express_id: u32) -> Profile {
    match try_profile_for(loader, express_id) {
        Ok(profile) => profile,
        Err(e) => {
            warn!("failed to build profile at #{}: {}", express_id, e);
            Profile::default()
        }
    }
}

fn try_profile_for(loader: &IfcLoader, express_id: u32) -> Result<Profile> {
    let line = *loader.expect_line(express_id)?;
    match line.ifc_type {
        IfcType::IfcArbitraryClosedProfileDef => {
            // IfcArbitraryClosedProfileDef: ProfileType, ProfileName, OuterCurve
            let mut profile = Profile::default();

            let mut cur = loader.argument(&line, 0)?;
            profile.kind = loader.string_arg(&mut cur)?.to_string();

            let mut cur = loader.argument(&line, 2)?;
            let curve_id = loader.ref_arg(&mut cur)?;
            profile.curve = curve_2d(loader, curve_id);
            profile.is_convex = is_curve_convex(&profile.curve);

            Ok(profile)
        }
        IfcType::IfcRectangleProfileDef => {
            // IfcRectangleProfileDef: ProfileType, ProfileName, Position, XDim, YDim
            let mut profile = Profile::default();

            let mut cur = loader.argument(&line, 0)?;
            profile.kind = loader.string_arg(&mut cur)?.to_string();
            profile.is_convex = true;

            let mut cur = loader.argument(&line, 2)?;
            let placement = if loader.token_kind(cur) == TokenKind::Ref {
                let placement_id = loader.ref_arg(&mut cur)?;
                axis2_placement_2d(loader, placement_id)
            } else {
                cur = loader.argument(&line, 3)?;
                Matrix3::identity()
            };
            let xdim = loader.real_arg(&mut cur)?;
            let ydim = loader.real_arg(&mut cur)?;

            let half_x = xdim / 2.0;
            let half_y = ydim / 2.0;

            let bl = place_2d(&placement, -half_x, -half_y);
            let br = place_2d(&placement, half_x, -half_y);
            let tl = place_2d(&placement, -half_x, half_y);
            let tr = place_2d(&placement, half_x, half_y);

            profile.curve.add(bl);
            profile.curve.add(tl);
            profile.curve.add(tr);
            profile.curve.add(br);
            profile.curve.add(bl);

            Ok(profile)
        }
        IfcType::IfcCircleProfileDef => {
            // IfcCircleProfileDef: ProfileType, ProfileName, Position, Radius
            const PROFILE_CIRCLE_SEGMENTS: usize = 5;

            let mut profile = Profile::default();

            let mut cur = loader.argument(&line, 0)?;
            profile.kind = loader.string_arg(&mut cur)?.to_string();
            profile.is_convex = true;

            let mut cur = loader.argument(&line, 2)?;
            let placement = if loader.token_kind(cur) == TokenKind::Ref {
                let placement_id = loader.ref_arg(&mut cur)?;
                axis2_placement_2d(loader, placement_id)
            } else {
                cur = loader.argument(&line, 3)?;
                Matrix3::identity()
            };
            let radius = loader.real_arg(&mut cur)?;

            for i in 0..PROFILE_CIRCLE_SEGMENTS {
                let ratio = i as f64 / PROFILE_CIRCLE_SEGMENTS as f64;
                let angle = ratio * 2.0 * PI;
                let pos = place_2d(&placement, radius * angle.sin(), radius * angle.cos());
                profile.curve.add(pos);
            }
            let first = profile.curve.points[0];
            profile.curve.add(first);

            Ok(profile)
        }
        other => {
            warn!("unexpected profile type {} at #{}", other, express_id);
            Ok(Profile::default())
        }
    }
}

fn place_2d(placement: &Matrix3<f64>, x: f64, y: f64) -> Point2<f64> {
    let v = placement * Vector3::new(x, y, 1.0);
    Point2::new(v.x, v.y)
}

/// A 2D curve is convex iff every consecutive point triple turns the same
/// way; colinear triples are tolerated
pub fn is_curve_convex(curve: &Curve2D) -> bool {
    const EPS: f64 = 1e-12;
    let points = &curve.points;
    let mut sign = 0.0f64;

    for i in 2..points.len() {
        let a = points[i - 2];
        let b = points[i - 1];
        let c = points[i];

        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross.abs() < EPS {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if sign != cross.signum() {
            return false;
        }
    }

    true
}
