// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Curve builder
//!
//! Produces 2D polylines for profile curves and 3D polylines for face
//! loops. Supports trimming by parameter value; cartesian-point trims are
//! reported and treated as unset.

use crate::transform::{axis2_placement_2d, cartesian_point_2d, cartesian_point_3d};
use crate::Result;
use ifc_mesh_core::{Cursor, IfcLoader, IfcType, TokenKind};
use nalgebra::{Point2, Point3, Vector3};
use std::f64::consts::PI;
use tracing::warn;

/// Sample count for circle tessellation
const CIRCLE_SEGMENTS: usize = 10;

/// Ordered 2D point sequence; a closed curve repeats its first point
#[derive(Debug, Clone, Default)]
pub struct Curve2D {
    pub points: Vec<Point2<f64>>,
}

impl Curve2D {
    pub fn add(&mut self, point: Point2<f64>) {
        self.points.push(point);
    }
}

/// Ordered 3D point sequence
#[derive(Debug, Clone, Default)]
pub struct Curve3D {
    pub points: Vec<Point3<f64>>,
}

impl Curve3D {
    pub fn add(&mut self, point: Point3<f64>) {
        self.points.push(point);
    }
}

/// One side of a trimming: either a parameter value or nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimmingSelect {
    pub has_param: bool,
    pub param: f64,
}

/// Trimming state threaded through curve computation
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimmingArguments {
    pub exist: bool,
    pub start: TrimmingSelect,
    pub end: TrimmingSelect,
}

/// Build the 2D curve for an express id
pub fn curve_2d(loader: &IfcLoader, express_id: u32) -> Curve2D {
    let mut curve = Curve2D::default();
    compute_curve(loader, express_id, &mut curve, TrimmingArguments::default());
    curve
}

/// Append the points of a curve entity to the accumulator.
///
/// Dispatches on entity kind; unknown kinds are reported and skipped.
pub fn compute_curve(
    loader: &IfcLoader,
    express_id: u32,
    curve: &mut Curve2D,
    trim: TrimmingArguments,
) {
    if let Err(e) = try_compute_curve(loader, express_id, curve, trim) {
        warn!("failed to compute curve at #{}: {}", express_id, e);
    }
}

fn try_compute_curve(
    loader: &IfcLoader,
    express_id: u32,
    curve: &mut Curve2D,
    trim: TrimmingArguments,
) -> Result<()> {
    let line = *loader.expect_line(express_id)?;
    match line.ifc_type {
        IfcType::IfcPolyline => {
            // IfcPolyline: Points
            let mut cur = loader.argument(&line, 0)?;
            let points = loader.set_arg(&mut cur)?;

            for token in points {
                let mut c = token;
                let point_id = loader.ref_arg(&mut c)?;
                curve.add(cartesian_point_2d(loader, point_id)?);
            }
        }
        IfcType::IfcCompositeCurve => {
            // IfcCompositeCurve: Segments, SelfIntersect
            let mut cur = loader.argument(&line, 0)?;
            let segments = loader.set_arg(&mut cur)?;

            if loader.token_kind(cur) == TokenKind::Enum && loader.string_arg(&mut cur)? == "T" {
                warn!("self intersecting composite curve at #{}", express_id);
            }

            let mut segment_ids = Vec::with_capacity(segments.len());
            for token in segments {
                let mut c = token;
                segment_ids.push(loader.ref_arg(&mut c)?);
            }
            for segment_id in segment_ids {
                compute_curve(loader, segment_id, curve, TrimmingArguments::default());
            }
        }
        IfcType::IfcCompositeCurveSegment => {
            // IfcCompositeCurveSegment: Transition, SameSense, ParentCurve
            // Transition and same-sense flags are not consumed here.
            let mut cur = loader.argument(&line, 2)?;
            let parent_id = loader.ref_arg(&mut cur)?;
            compute_curve(loader, parent_id, curve, TrimmingArguments::default());
        }
        IfcType::IfcTrimmedCurve => {
            // IfcTrimmedCurve: BasisCurve, Trim1, Trim2, SenseAgreement, MasterRepresentation
            // Sense agreement and master representation are not consumed.
            let mut cur = loader.argument(&line, 0)?;
            let basis_id = loader.ref_arg(&mut cur)?;
            let trim1_set = loader.set_arg(&mut cur)?;
            let trim2_set = loader.set_arg(&mut cur)?;

            let trim = TrimmingArguments {
                exist: true,
                start: parse_trim_select(loader, &trim1_set),
                end: parse_trim_select(loader, &trim2_set),
            };

            compute_curve(loader, basis_id, curve, trim);
        }
        IfcType::IfcCircle => {
            // IfcCircle: Position, Radius
            let mut cur = loader.argument(&line, 0)?;
            let position_id = loader.ref_arg(&mut cur)?;
            let radius = loader.real_arg(&mut cur)?;

            let placement = axis2_placement_2d(loader, position_id);

            // Trim parameters are degrees
            let mut start_degrees = 0.0;
            let mut end_degrees = 360.0;
            if trim.exist {
                if trim.start.has_param {
                    start_degrees = trim.start.param;
                }
                if trim.end.has_param {
                    end_degrees = trim.end.param;
                }
            }
            if end_degrees < start_degrees {
                end_degrees += 360.0;
            }

            let start_rad = start_degrees / 180.0 * PI;
            let end_rad = end_degrees / 180.0 * PI;
            let length_rad = end_rad - start_rad;

            let start_index = curve.points.len();

            for i in 0..CIRCLE_SEGMENTS {
                let ratio = i as f64 / (CIRCLE_SEGMENTS - 1) as f64;
                let angle = start_rad + ratio * length_rad;
                let coordinate = Vector3::new(
                    radius * angle.cos(),
                    -radius * angle.sin(),
                    1.0,
                );
                let pos = placement * coordinate;
                curve.add(Point2::new(pos.x, pos.y));
            }

            // without a trim, we close the circle
            if !trim.exist {
                let first = curve.points[start_index];
                curve.add(first);
            }
        }
        other => {
            warn!("unexpected curve type {} at #{}", other, express_id);
        }
    }
    Ok(())
}

/// Parse a trimming select from the cursors of its set.
///
/// Only the parameter branch is supported; anything else (cartesian
/// points in particular) is reported and left unset.
pub fn parse_trim_select(loader: &IfcLoader, elements: &[Cursor]) -> TrimmingSelect {
    let mut select = TrimmingSelect::default();

    if elements.len() == 2 {
        let mut c0 = elements[0];
        match loader.string_arg(&mut c0) {
            Ok("IFCPARAMETERVALUE") => {
                let mut c1 = elements[1];
                if let Ok(param) = loader.real_arg(&mut c1) {
                    select.has_param = true;
                    select.param = param;
                }
            }
            Ok(other) => warn!("unsupported trimming select type: {}", other),
            Err(_) => warn!("unsupported trimming select"),
        }
    } else {
        warn!("unsupported trimming select: IfcCartesianPoint");
    }

    select
}

/// Read the 3D points of a face loop (polyloop)
pub fn loop_points_3d(loader: &IfcLoader, express_id: u32) -> Curve3D {
    let mut curve = Curve3D::default();
    if let Err(e) = try_loop_points_3d(loader, express_id, &mut curve) {
        warn!("failed to read loop at #{}: {}", express_id, e);
    }
    curve
}

fn try_loop_points_3d(loader: &IfcLoader, express_id: u32, curve: &mut Curve3D) -> Result<()> {
    let line = *loader.expect_line(express_id)?;
    match line.ifc_type {
        IfcType::IfcPolyLoop => {
            // IfcPolyLoop: Polygon
            let mut cur = loader.argument(&line, 0)?;
            let points = loader.set_arg(&mut cur)?;

            curve.points.reserve(points.len());
            for token in points {
                let mut c = token;
                let point_id = loader.ref_arg(&mut c)?;
                curve.add(cartesian_point_3d(loader, point_id)?);
            }
        }
        other => {
            warn!("unexpected loop type {} at #{}", other, express_id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_polyline() {
        let content = r#"
#1=IFCCARTESIANPOINT((0.,0.));
#2=IFCCARTESIANPOINT((2.,0.));
#3=IFCCARTESIANPOINT((2.,1.));
#4=IFCPOLYLINE((#1,#2,#3,#1));
"#;
        let loader = IfcLoader::parse(content).unwrap();
        let curve = curve_2d(&loader, 4);

        assert_eq!(curve.points.len(), 4);
        assert_relative_eq!(curve.points[1].x, 2.0);
        assert_eq!(curve.points[0], curve.points[3]);
    }

    #[test]
    fn test_untrimmed_circle_closes() {
        let content = r#"
#1=IFCCARTESIANPOINT((0.,0.));
#2=IFCAXIS2PLACEMENT2D(#1,$);
#3=IFCCIRCLE(#2,2.);
"#;
        let loader = IfcLoader::parse(content).unwrap();
        let curve = curve_2d(&loader, 3);

        assert_eq!(curve.points.len(), CIRCLE_SEGMENTS + 1);
        assert_eq!(curve.points[0], curve.points[CIRCLE_SEGMENTS]);
        for p in &curve.points {
            assert_relative_eq!(p.coords.norm(), 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_trimmed_circle_quarter() {
        let content = r#"
#1=IFCCARTESIANPOINT((0.,0.));
#2=IFCAXIS2PLACEMENT2D(#1,$);
#3=IFCCIRCLE(#2,1.);
#4=IFCTRIMMEDCURVE(#3,(IFCPARAMETERVALUE(0.)),(IFCPARAMETERVALUE(90.)),.T.,.PARAMETER.);
"#;
        let loader = IfcLoader::parse(content).unwrap();
        let curve = curve_2d(&loader, 4);

        assert_eq!(curve.points.len(), 10);
        let first = curve.points[0];
        let last = curve.points[9];
        assert_relative_eq!(first.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(first.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(last.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(last.y, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_trim_wraps_past_zero() {
        let content = r#"
#1=IFCCARTESIANPOINT((0.,0.));
#2=IFCAXIS2PLACEMENT2D(#1,$);
#3=IFCCIRCLE(#2,1.);
#4=IFCTRIMMEDCURVE(#3,(IFCPARAMETERVALUE(270.)),(IFCPARAMETERVALUE(0.)),.T.,.PARAMETER.);
"#;
        let loader = IfcLoader::parse(content).unwrap();
        let curve = curve_2d(&loader, 4);

        // end < start gains a full turn: 270 -> 360
        assert_eq!(curve.points.len(), 10);
        assert_relative_eq!(curve.points[0].x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(curve.points[0].y, 1.0, epsilon = 1e-9);
        assert_relative_eq!(curve.points[9].x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(curve.points[9].y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_composite_curve_order() {
        let content = r#"
#1=IFCCARTESIANPOINT((0.,0.));
#2=IFCCARTESIANPOINT((1.,0.));
#3=IFCCARTESIANPOINT((1.,1.));
#4=IFCPOLYLINE((#1,#2));
#5=IFCPOLYLINE((#2,#3));
#6=IFCCOMPOSITECURVESEGMENT(.CONTINUOUS.,.T.,#4);
#7=IFCCOMPOSITECURVESEGMENT(.CONTINUOUS.,.T.,#5);
#8=IFCCOMPOSITECURVE((#6,#7),.F.);
"#;
        let loader = IfcLoader::parse(content).unwrap();
        let curve = curve_2d(&loader, 8);

        // Segments appended in reference order
        assert_eq!(curve.points.len(), 4);
        assert_relative_eq!(curve.points[3].y, 1.0);
    }

    #[test]
    fn test_cartesian_point_trim_left_unset() {
        let content = r#"
#1=IFCCARTESIANPOINT((0.,0.));
#2=IFCAXIS2PLACEMENT2D(#1,$);
#3=IFCCIRCLE(#2,1.);
#4=IFCCARTESIANPOINT((1.,0.));
#5=IFCTRIMMEDCURVE(#3,(#4),(IFCPARAMETERVALUE(90.)),.T.,.CARTESIAN.);
"#;
        let loader = IfcLoader::parse(content).unwrap();
        let curve = curve_2d(&loader, 5);

        // Unset start falls back to 0 degrees; trim exists so no closing point
        assert_eq!(curve.points.len(), 10);
        assert_relative_eq!(curve.points[0].x, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_polyloop_points() {
        let content = r#"
#1=IFCCARTESIANPOINT((0.,0.,0.));
#2=IFCCARTESIANPOINT((1.,0.,0.));
#3=IFCCARTESIANPOINT((1.,1.,0.));
#4=IFCPOLYLOOP((#1,#2,#3));
"#;
        let loader = IfcLoader::parse(content).unwrap();
        let curve = loop_points_3d(&loader, 4);

        assert_eq!(curve.points.len(), 3);
        assert_relative_eq!(curve.points[2].y, 1.0);
    }

    #[test]
    fn test_unknown_curve_kind_is_empty() {
        let content = r#"
#1=IFCCARTESIANPOINT((0.,0.));
"#;
        let loader = IfcLoader::parse(content).unwrap();
        let curve = curve_2d(&loader, 1);
        assert!(curve.points.is_empty());
    }
}
