// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Style resolver
//!
//! Walks styled-item style assignments down to an RGBA color:
//! presentation-style-assignment -> surface-style -> surface-style-rendering
//! -> colour-rgb, with transparency mapped to alpha.

use crate::mesh::Rgba;
use crate::Result;
use ifc_mesh_core::{IfcLoader, IfcType, TokenKind};
use tracing::warn;

/// Resolve a style select to a color, if the walk reaches one
pub fn color_for(loader: &IfcLoader, express_id: u32) -> Option<Rgba> {
    match try_color_for(loader, express_id) {
        Ok(color) => color,
        Err(e) => {
            warn!("failed to resolve style at #{}: {}", express_id, e);
            None
        }
    }
}

fn try_color_for(loader: &IfcLoader, express_id: u32) -> Result<Option<Rgba>> {
    let line = *loader.expect_line(express_id)?;
    match line.ifc_type {
        IfcType::IfcPresentationStyleAssignment => {
            // IfcPresentationStyleAssignment: Styles
            let mut cur = loader.argument(&line, 0)?;
            let selects = loader.set_arg(&mut cur)?;

            for select in selects {
                let mut c = select;
                if loader.token_kind(c) != TokenKind::Ref {
                    continue;
                }
                let select_id = loader.ref_arg(&mut c)?;
                if let Some(color) = color_for(loader, select_id) {
                    return Ok(Some(color));
                }
            }
            Ok(None)
        }
        IfcType::IfcSurfaceStyle => {
            // IfcSurfaceStyle: Name, Side, Styles
            let mut cur = loader.argument(&line, 2)?;
            let selects = loader.set_arg(&mut cur)?;

            for select in selects {
                let mut c = select;
                if loader.token_kind(c) != TokenKind::Ref {
                    continue;
                }
                let select_id = loader.ref_arg(&mut c)?;
                if let Some(color) = color_for(loader, select_id) {
                    return Ok(Some(color));
                }
            }
            Ok(None)
        }
        IfcType::IfcSurfaceStyleRendering => {
            // IfcSurfaceStyleRendering: SurfaceColour, Transparency, ...
            let mut cur = loader.argument(&line, 0)?;
            let colour_id = loader.ref_arg(&mut cur)?;
            let mut color = color_for(loader, colour_id).unwrap_or(Rgba::new(1.0, 1.0, 1.0, 1.0));

            let mut cur = loader.argument(&line, 1)?;
            if matches!(loader.token_kind(cur), TokenKind::Real | TokenKind::Integer) {
                let transparency = loader.real_arg(&mut cur)?;
                color.a = 1.0 - transparency;
            }

            Ok(Some(color))
        }
        IfcType::IfcColourRgb => {
            // IfcColourRgb: Name, Red, Green, Blue
            let mut cur = loader.argument(&line, 1)?;
            let r = loader.real_arg(&mut cur)?;
            let g = loader.real_arg(&mut cur)?;
            let b = loader.real_arg(&mut cur)?;

            Ok(Some(Rgba::new(r, g, b, 1.0)))
        }
        other => {
            warn!("unexpected style type {} at #{}", other, express_id);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_colour_rgb() {
        let content = r#"
#1=IFCCOLOURRGB($,0.5,0.25,0.75);
"#;
        let loader = IfcLoader::parse(content).unwrap();
        let color = color_for(&loader, 1).unwrap();

        assert_relative_eq!(color.r, 0.5);
        assert_relative_eq!(color.g, 0.25);
        assert_relative_eq!(color.b, 0.75);
        assert_relative_eq!(color.a, 1.0);
    }

    #[test]
    fn test_rendering_transparency_becomes_alpha() {
        let content = r#"
#1=IFCCOLOURRGB($,0.5,0.25,0.75);
#2=IFCSURFACESTYLERENDERING(#1,0.2,$,$,$,$,$,$,.NOTDEFINED.);
"#;
        let loader = IfcLoader::parse(content).unwrap();
        let color = color_for(&loader, 2).unwrap();

        assert_relative_eq!(color.r, 0.5);
        assert_relative_eq!(color.g, 0.25);
        assert_relative_eq!(color.b, 0.75);
        assert_relative_eq!(color.a, 0.8);
    }

    #[test]
    fn test_full_style_chain() {
        let content = r#"
#1=IFCCOLOURRGB($,0.1,0.2,0.3);
#2=IFCSURFACESTYLERENDERING(#1,$,$,$,$,$,$,$,.NOTDEFINED.);
#3=IFCSURFACESTYLE('steel',.BOTH.,(#2));
#4=IFCPRESENTATIONSTYLEASSIGNMENT((#3));
"#;
        let loader = IfcLoader::parse(content).unwrap();
        let color = color_for(&loader, 4).unwrap();

        assert_relative_eq!(color.r, 0.1);
        assert_relative_eq!(color.b, 0.3);
        // Null transparency leaves alpha opaque
        assert_relative_eq!(color.a, 1.0);
    }

    #[test]
    fn test_unknown_style_kind() {
        let content = r#"
#1=IFCCARTESIANPOINT((0.,0.));
"#;
        let loader = IfcLoader::parse(content).unwrap();
        assert!(color_for(&loader, 1).is_none());
    }
}
