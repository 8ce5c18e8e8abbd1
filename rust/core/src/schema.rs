// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Schema Types
//!
//! Fast type checking using an enum instead of string comparison.

use std::fmt;

/// IFC Entity Types
/// The entity kinds the geometry resolver dispatches on, plus the
/// building-product family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IfcType {
    // Structural Elements
    IfcWall,
    IfcWallStandardCase,
    IfcSlab,
    IfcBeam,
    IfcColumn,
    IfcRoof,
    IfcStair,
    IfcRailing,
    IfcCurtainWall,
    IfcPlate,
    IfcMember,
    IfcFooting,
    IfcPile,
    IfcCovering,
    IfcBuildingElementProxy,
    IfcBuildingElementPart,
    IfcElementAssembly,

    // Openings
    IfcDoor,
    IfcWindow,
    IfcOpeningElement,

    // Spaces
    IfcSpace,
    IfcBuildingStorey,
    IfcBuilding,
    IfcSite,
    IfcProject,

    // Relationships
    IfcRelAggregates,
    IfcRelContainedInSpatialStructure,
    IfcRelVoidsElement,
    IfcRelFillsElement,

    // Geometry
    IfcShapeRepresentation,
    IfcProductDefinitionShape,
    IfcExtrudedAreaSolid,
    IfcFacetedBrep,
    IfcShellBasedSurfaceModel,
    IfcClosedShell,
    IfcOpenShell,
    IfcFace,
    IfcFaceBound,
    IfcFaceOuterBound,
    IfcPolyLoop,
    IfcAxis2Placement3D,
    IfcAxis2Placement2D,
    IfcLocalPlacement,
    IfcCartesianTransformationOperator3D,
    IfcCartesianTransformationOperator3DnonUniform,
    IfcCartesianPoint,
    IfcDirection,
    IfcPolyline,
    IfcArbitraryClosedProfileDef,
    IfcRectangleProfileDef,
    IfcCircleProfileDef,

    // Curve types
    IfcCompositeCurve,
    IfcCompositeCurveSegment,
    IfcTrimmedCurve,
    IfcCircle,
    IfcEllipse,
    IfcLine,

    // Mapped geometry
    IfcMappedItem,
    IfcRepresentationMap,

    // Style and presentation types
    IfcStyledItem,
    IfcPresentationStyleAssignment,
    IfcSurfaceStyle,
    IfcSurfaceStyleRendering,
    IfcSurfaceStyleShading,
    IfcColourRgb,

    // Fallback for unknown types
    Unknown(u16), // Store hash for unknown types
}

impl IfcType {
    /// Parse IFC type from string
    pub fn from_str(s: &str) -> Self {
        match s {
            "IFCWALL" => Self::IfcWall,
            "IFCWALLSTANDARDCASE" => Self::IfcWallStandardCase,
            "IFCSLAB" => Self::IfcSlab,
            "IFCBEAM" => Self::IfcBeam,
            "IFCCOLUMN" => Self::IfcColumn,
            "IFCROOF" => Self::IfcRoof,
            "IFCSTAIR" => Self::IfcStair,
            "IFCRAILING" => Self::IfcRailing,
            "IFCCURTAINWALL" => Self::IfcCurtainWall,
            "IFCPLATE" => Self::IfcPlate,
            "IFCMEMBER" => Self::IfcMember,
            "IFCFOOTING" => Self::IfcFooting,
            "IFCPILE" => Self::IfcPile,
            "IFCCOVERING" => Self::IfcCovering,
            "IFCBUILDINGELEMENTPROXY" => Self::IfcBuildingElementProxy,
            "IFCBUILDINGELEMENTPART" => Self::IfcBuildingElementPart,
            "IFCELEMENTASSEMBLY" => Self::IfcElementAssembly,

            "IFCDOOR" => Self::IfcDoor,
            "IFCWINDOW" => Self::IfcWindow,
            "IFCOPENINGELEMENT" => Self::IfcOpeningElement,

            "IFCSPACE" => Self::IfcSpace,
            "IFCBUILDINGSTOREY" => Self::IfcBuildingStorey,
            "IFCBUILDING" => Self::IfcBuilding,
            "IFCSITE" => Self::IfcSite,
            "IFCPROJECT" => Self::IfcProject,

            "IFCRELAGGREGATES" => Self::IfcRelAggregates,
            "IFCRELCONTAINEDINSPATIALSTRUCTURE" => Self::IfcRelContainedInSpatialStructure,
            "IFCRELVOIDSELEMENT" => Self::IfcRelVoidsElement,
            "IFCRELFILLSELEMENT" => Self::IfcRelFillsElement,

            "IFCSHAPEREPRESENTATION" => Self::IfcShapeRepresentation,
            "IFCPRODUCTDEFINITIONSHAPE" => Self::IfcProductDefinitionShape,
            "IFCEXTRUDEDAREASOLID" => Self::IfcExtrudedAreaSolid,
            "IFCFACETEDBREP" => Self::IfcFacetedBrep,
            "IFCSHELLBASEDSURFACEMODEL" => Self::IfcShellBasedSurfaceModel,
            "IFCCLOSEDSHELL" => Self::IfcClosedShell,
            "IFCOPENSHELL" => Self::IfcOpenShell,
            "IFCFACE" => Self::IfcFace,
            "IFCFACEBOUND" => Self::IfcFaceBound,
            "IFCFACEOUTERBOUND" => Self::IfcFaceOuterBound,
            "IFCPOLYLOOP" => Self::IfcPolyLoop,
            "IFCAXIS2PLACEMENT3D" => Self::IfcAxis2Placement3D,
            "IFCAXIS2PLACEMENT2D" => Self::IfcAxis2Placement2D,
            "IFCLOCALPLACEMENT" => Self::IfcLocalPlacement,
            "IFCCARTESIANTRANSFORMATIONOPERATOR3D" => Self::IfcCartesianTransformationOperator3D,
            "IFCCARTESIANTRANSFORMATIONOPERATOR3DNONUNIFORM" => {
                Self::IfcCartesianTransformationOperator3DnonUniform
            }
            "IFCCARTESIANPOINT" => Self::IfcCartesianPoint,
            "IFCDIRECTION" => Self::IfcDirection,
            "IFCPOLYLINE" => Self::IfcPolyline,
            "IFCARBITRARYCLOSEDPROFILEDEF" => Self::IfcArbitraryClosedProfileDef,
            "IFCRECTANGLEPROFILEDEF" => Self::IfcRectangleProfileDef,
            "IFCCIRCLEPROFILEDEF" => Self::IfcCircleProfileDef,

            "IFCCOMPOSITECURVE" => Self::IfcCompositeCurve,
            "IFCCOMPOSITECURVESEGMENT" => Self::IfcCompositeCurveSegment,
            "IFCTRIMMEDCURVE" => Self::IfcTrimmedCurve,
            "IFCCIRCLE" => Self::IfcCircle,
            "IFCELLIPSE" => Self::IfcEllipse,
            "IFCLINE" => Self::IfcLine,

            "IFCMAPPEDITEM" => Self::IfcMappedItem,
            "IFCREPRESENTATIONMAP" => Self::IfcRepresentationMap,

            "IFCSTYLEDITEM" => Self::IfcStyledItem,
            "IFCPRESENTATIONSTYLEASSIGNMENT" => Self::IfcPresentationStyleAssignment,
            "IFCSURFACESTYLE" => Self::IfcSurfaceStyle,
            "IFCSURFACESTYLERENDERING" => Self::IfcSurfaceStyleRendering,
            "IFCSURFACESTYLESHADING" => Self::IfcSurfaceStyleShading,
            "IFCCOLOURRGB" => Self::IfcColourRgb,

            _ => Self::Unknown(simple_hash(s)),
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IfcWall => "IFCWALL",
            Self::IfcWallStandardCase => "IFCWALLSTANDARDCASE",
            Self::IfcSlab => "IFCSLAB",
            Self::IfcBeam => "IFCBEAM",
            Self::IfcColumn => "IFCCOLUMN",
            Self::IfcRoof => "IFCROOF",
            Self::IfcStair => "IFCSTAIR",
            Self::IfcRailing => "IFCRAILING",
            Self::IfcCurtainWall => "IFCCURTAINWALL",
            Self::IfcPlate => "IFCPLATE",
            Self::IfcMember => "IFCMEMBER",
            Self::IfcFooting => "IFCFOOTING",
            Self::IfcPile => "IFCPILE",
            Self::IfcCovering => "IFCCOVERING",
            Self::IfcBuildingElementProxy => "IFCBUILDINGELEMENTPROXY",
            Self::IfcBuildingElementPart => "IFCBUILDINGELEMENTPART",
            Self::IfcElementAssembly => "IFCELEMENTASSEMBLY",

            Self::IfcDoor => "IFCDOOR",
            Self::IfcWindow => "IFCWINDOW",
            Self::IfcOpeningElement => "IFCOPENINGELEMENT",

            Self::IfcSpace => "IFCSPACE",
            Self::IfcBuildingStorey => "IFCBUILDINGSTOREY",
            Self::IfcBuilding => "IFCBUILDING",
            Self::IfcSite => "IFCSITE",
            Self::IfcProject => "IFCPROJECT",

            Self::IfcRelAggregates => "IFCRELAGGREGATES",
            Self::IfcRelContainedInSpatialStructure => "IFCRELCONTAINEDINSPATIALSTRUCTURE",
            Self::IfcRelVoidsElement => "IFCRELVOIDSELEMENT",
            Self::IfcRelFillsElement => "IFCRELFILLSELEMENT",

            Self::IfcShapeRepresentation => "IFCSHAPEREPRESENTATION",
            Self::IfcProductDefinitionShape => "IFCPRODUCTDEFINITIONSHAPE",
            Self::IfcExtrudedAreaSolid => "IFCEXTRUDEDAREASOLID",
            Self::IfcFacetedBrep => "IFCFACETEDBREP",
            Self::IfcShellBasedSurfaceModel => "IFCSHELLBASEDSURFACEMODEL",
            Self::IfcClosedShell => "IFCCLOSEDSHELL",
            Self::IfcOpenShell => "IFCOPENSHELL",
            Self::IfcFace => "IFCFACE",
            Self::IfcFaceBound => "IFCFACEBOUND",
            Self::IfcFaceOuterBound => "IFCFACEOUTERBOUND",
            Self::IfcPolyLoop => "IFCPOLYLOOP",
            Self::IfcAxis2Placement3D => "IFCAXIS2PLACEMENT3D",
            Self::IfcAxis2Placement2D => "IFCAXIS2PLACEMENT2D",
            Self::IfcLocalPlacement => "IFCLOCALPLACEMENT",
            Self::IfcCartesianTransformationOperator3D => "IFCCARTESIANTRANSFORMATIONOPERATOR3D",
            Self::IfcCartesianTransformationOperator3DnonUniform => {
                "IFCCARTESIANTRANSFORMATIONOPERATOR3DNONUNIFORM"
            }
            Self::IfcCartesianPoint => "IFCCARTESIANPOINT",
            Self::IfcDirection => "IFCDIRECTION",
            Self::IfcPolyline => "IFCPOLYLINE",
            Self::IfcArbitraryClosedProfileDef => "IFCARBITRARYCLOSEDPROFILEDEF",
            Self::IfcRectangleProfileDef => "IFCRECTANGLEPROFILEDEF",
            Self::IfcCircleProfileDef => "IFCCIRCLEPROFILEDEF",

            Self::IfcCompositeCurve => "IFCCOMPOSITECURVE",
            Self::IfcCompositeCurveSegment => "IFCCOMPOSITECURVESEGMENT",
            Self::IfcTrimmedCurve => "IFCTRIMMEDCURVE",
            Self::IfcCircle => "IFCCIRCLE",
            Self::IfcEllipse => "IFCELLIPSE",
            Self::IfcLine => "IFCLINE",

            Self::IfcMappedItem => "IFCMAPPEDITEM",
            Self::IfcRepresentationMap => "IFCREPRESENTATIONMAP",

            Self::IfcStyledItem => "IFCSTYLEDITEM",
            Self::IfcPresentationStyleAssignment => "IFCPRESENTATIONSTYLEASSIGNMENT",
            Self::IfcSurfaceStyle => "IFCSURFACESTYLE",
            Self::IfcSurfaceStyleRendering => "IFCSURFACESTYLERENDERING",
            Self::IfcSurfaceStyleShading => "IFCSURFACESTYLESHADING",
            Self::IfcColourRgb => "IFCCOLOURRGB",

            Self::Unknown(_) => "UNKNOWN",
        }
    }

    /// Check if this is a spatial structure element
    pub fn is_spatial(&self) -> bool {
        matches!(
            self,
            Self::IfcProject
                | Self::IfcSite
                | Self::IfcBuilding
                | Self::IfcBuildingStorey
                | Self::IfcSpace
        )
    }

    /// Check if this is a building product whose mesh is resolved through
    /// placement + product definition shape
    pub fn is_ifc_element(&self) -> bool {
        matches!(
            self,
            // Walls
            Self::IfcWall
                | Self::IfcWallStandardCase
                // Slabs & Floors
                | Self::IfcSlab
                | Self::IfcPlate
                // Structural
                | Self::IfcBeam
                | Self::IfcColumn
                | Self::IfcMember
                | Self::IfcFooting
                | Self::IfcPile
                // Roofs & Stairs
                | Self::IfcRoof
                | Self::IfcStair
                | Self::IfcRailing
                // Facades
                | Self::IfcCurtainWall
                // Openings
                | Self::IfcDoor
                | Self::IfcWindow
                | Self::IfcOpeningElement
                // Generic
                | Self::IfcBuildingElementProxy
                | Self::IfcBuildingElementPart
                | Self::IfcElementAssembly
                // Coverings
                | Self::IfcCovering
        )
    }
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Simple hash function for unknown IFC types
fn simple_hash(s: &str) -> u16 {
    let mut hash: u32 = 5381;
    for byte in s.bytes() {
        hash = ((hash << 5).wrapping_add(hash)).wrapping_add(byte as u32);
    }
    (hash & 0xFFFF) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(IfcType::from_str("IFCWALL"), IfcType::IfcWall);
        assert_eq!(
            IfcType::from_str("IFCEXTRUDEDAREASOLID"),
            IfcType::IfcExtrudedAreaSolid
        );
        assert_eq!(IfcType::from_str("IFCPROJECT"), IfcType::IfcProject);
    }

    #[test]
    fn test_as_str_roundtrip() {
        assert_eq!(IfcType::IfcWall.as_str(), "IFCWALL");
        assert_eq!(IfcType::IfcPolyLoop.as_str(), "IFCPOLYLOOP");
    }

    #[test]
    fn test_is_ifc_element() {
        assert!(IfcType::IfcWall.is_ifc_element());
        assert!(IfcType::IfcOpeningElement.is_ifc_element());
        assert!(!IfcType::IfcProject.is_ifc_element());
        assert!(!IfcType::IfcExtrudedAreaSolid.is_ifc_element());
    }

    #[test]
    fn test_is_spatial() {
        assert!(IfcType::IfcProject.is_spatial());
        assert!(!IfcType::IfcWall.is_spatial());
    }

    #[test]
    fn test_unknown_type() {
        let unknown = IfcType::from_str("IFCCUSTOMTYPE");
        assert!(matches!(unknown, IfcType::Unknown(_)));
        // Same string hashes to the same fallback
        assert_eq!(unknown, IfcType::from_str("IFCCUSTOMTYPE"));
    }
}
