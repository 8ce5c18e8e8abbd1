// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end resolution tests over inline STEP models.

use approx::assert_relative_eq;
use ifc_mesh_core::IfcLoader;
use ifc_mesh_geometry::{
    ComposedMesh, GeometryResolver, Matrix4, ResolverSettings, Vector3,
};

/// A single wall carrying an extruded 2 x 0.2 x 3 rectangle solid
const WALL_MODEL: &str = r#"
#1=IFCCARTESIANPOINT((0.,0.,0.));
#2=IFCAXIS2PLACEMENT3D(#1,$,$);
#3=IFCLOCALPLACEMENT($,#2);
#4=IFCDIRECTION((0.,0.,1.));
#5=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,2.,0.2);
#6=IFCEXTRUDEDAREASOLID(#5,$,#4,3.);
#7=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#6));
#8=IFCPRODUCTDEFINITIONSHAPE($,$,(#7));
#9=IFCWALL('guid',$,$,$,$,#3,#8,$);
"#;

fn tree_equals(a: &ComposedMesh, b: &ComposedMesh) -> bool {
    a.express_id == b.express_id
        && a.has_geometry == b.has_geometry
        && a.transformation == b.transformation
        && a.color == b.color
        && a.children.len() == b.children.len()
        && a.children
            .iter()
            .zip(b.children.iter())
            .all(|(x, y)| tree_equals(x, y))
}

#[test]
fn wall_produces_one_placed_box() {
    let loader = IfcLoader::parse(WALL_MODEL).unwrap();
    let mut resolver = GeometryResolver::new(&loader);

    let flat = resolver.get_flat_mesh(9);
    assert_eq!(flat.geometries.len(), 1);

    let placed = &flat.geometries[0];
    assert_eq!(placed.geometry_express_id, 6);
    assert_eq!(placed.transformation, Matrix4::identity());

    let geometry = resolver.cached_geometry(6).unwrap();
    assert_eq!(geometry.triangle_count(), 12);

    // Eight distinct corners at the expected coordinates
    let mut corners: Vec<(i64, i64, i64)> = (0..geometry.vertex_count())
        .map(|i| {
            let p = geometry.point(i as u32);
            (
                (p.x * 1e6).round() as i64,
                (p.y * 1e6).round() as i64,
                (p.z * 1e6).round() as i64,
            )
        })
        .collect();
    corners.sort_unstable();
    corners.dedup();
    assert_eq!(corners.len(), 8);
    assert!(corners.contains(&(1_000_000, 100_000, 3_000_000)));
    assert!(corners.contains(&(-1_000_000, -100_000, 0)));
}

#[test]
fn every_placed_geometry_is_cached() {
    let loader = IfcLoader::parse(WALL_MODEL).unwrap();
    let mut resolver = GeometryResolver::new(&loader);

    let flat = resolver.get_flat_mesh(9);
    for placed in &flat.geometries {
        assert!(resolver.has_cached_geometry(placed.geometry_express_id));
    }
}

#[test]
fn resolution_is_idempotent() {
    let loader = IfcLoader::parse(WALL_MODEL).unwrap();
    let mut resolver = GeometryResolver::new(&loader);

    let first = resolver.get_mesh(9);
    let second = resolver.get_mesh(9);
    assert!(tree_equals(&first, &second));

    let flat_a = resolver.get_flat_mesh(9);
    let flat_b = resolver.get_flat_mesh(9);
    assert_eq!(flat_a.geometries.len(), flat_b.geometries.len());
    for (a, b) in flat_a.geometries.iter().zip(flat_b.geometries.iter()) {
        assert_eq!(a.geometry_express_id, b.geometry_express_id);
        assert_eq!(a.transformation, b.transformation);
    }
}

#[test]
fn flattened_geometry_is_world_space() {
    let loader = IfcLoader::parse(WALL_MODEL).unwrap();
    let mut resolver = GeometryResolver::new(&loader);

    let mesh = resolver.get_flattened_geometry(9);
    assert_eq!(mesh.triangle_count(), 12);
    assert_relative_eq!(mesh.volume(), 1.2, epsilon = 1e-9);

    let (min, max) = mesh.bounds();
    assert_relative_eq!(max.x - min.x, 2.0, epsilon = 1e-9);
    assert_relative_eq!(max.y - min.y, 0.2, epsilon = 1e-9);
    assert_relative_eq!(max.z - min.z, 3.0, epsilon = 1e-9);
}

#[test]
fn normalize_is_applied_at_the_root() {
    let loader = IfcLoader::parse(WALL_MODEL).unwrap();
    let settings = ResolverSettings {
        normalize: Matrix4::new_translation(&Vector3::new(0.0, 0.0, 100.0)),
    };
    let mut resolver = GeometryResolver::with_settings(&loader, settings);

    let flat = resolver.get_flat_mesh(9);
    assert_relative_eq!(flat.geometries[0].transformation[(2, 3)], 100.0);

    let mesh = resolver.get_flattened_geometry(9);
    let (min, _) = mesh.bounds();
    assert_relative_eq!(min.z, 100.0, epsilon = 1e-9);
}

#[test]
fn opening_subtracts_void_volume() {
    // The wall model plus a 1 x 1 x 1 opening centered at the wall midpoint
    let model = format!(
        "{}{}",
        WALL_MODEL,
        r#"
#20=IFCCARTESIANPOINT((0.,0.,1.));
#21=IFCAXIS2PLACEMENT3D(#20,$,$);
#22=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,1.,1.);
#23=IFCEXTRUDEDAREASOLID(#22,#21,#4,1.);
#24=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#23));
#25=IFCPRODUCTDEFINITIONSHAPE($,$,(#24));
#26=IFCOPENINGELEMENT('op',$,$,$,$,#3,#25,$);
#27=IFCRELVOIDSELEMENT('rv',$,$,$,#9,#26);
"#
    );
    let loader = IfcLoader::parse(&model).unwrap();
    let mut resolver = GeometryResolver::new(&loader);

    let flat = resolver.get_flat_mesh(9);
    assert_eq!(flat.geometries.len(), 1);
    assert_eq!(flat.geometries[0].geometry_express_id, 9);

    // wall 2*0.2*3 minus the 1*0.2*1 overlap with the opening box
    let geometry = resolver.cached_geometry(9).unwrap();
    assert_relative_eq!(geometry.volume().abs(), 1.0, epsilon = 1e-6);

    // The opening pierces the wall: bounds are unchanged
    let (min, max) = geometry.bounds();
    assert_relative_eq!(max.x - min.x, 2.0, epsilon = 1e-9);
    assert_relative_eq!(max.z - min.z, 3.0, epsilon = 1e-9);
}

#[test]
fn styled_wall_carries_rgba() {
    let model = format!(
        "{}{}",
        WALL_MODEL,
        r#"
#30=IFCCOLOURRGB($,0.5,0.25,0.75);
#31=IFCSURFACESTYLERENDERING(#30,0.2,$,$,$,$,$,$,.NOTDEFINED.);
#32=IFCSURFACESTYLE($,.BOTH.,(#31));
#33=IFCPRESENTATIONSTYLEASSIGNMENT((#32));
#34=IFCSTYLEDITEM(#6,(#33),$);
"#
    );
    let loader = IfcLoader::parse(&model).unwrap();
    let mut resolver = GeometryResolver::new(&loader);

    let flat = resolver.get_flat_mesh(9);
    let color = flat.geometries[0].color;
    assert_relative_eq!(color.r, 0.5);
    assert_relative_eq!(color.g, 0.25);
    assert_relative_eq!(color.b, 0.75);
    assert_relative_eq!(color.a, 0.8);
}

#[test]
fn mapped_item_composes_target_and_origin() {
    let model = format!(
        "{}{}",
        WALL_MODEL,
        r#"
#40=IFCCARTESIANPOINT((0.,7.,0.));
#41=IFCAXIS2PLACEMENT3D(#40,$,$);
#42=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#6));
#43=IFCREPRESENTATIONMAP(#41,#42);
#44=IFCCARTESIANPOINT((5.,0.,0.));
#45=IFCCARTESIANTRANSFORMATIONOPERATOR3D($,$,#44,$,$);
#46=IFCMAPPEDITEM(#43,#45);
"#
    );
    let loader = IfcLoader::parse(&model).unwrap();
    let settings = ResolverSettings {
        normalize: Matrix4::new_translation(&Vector3::new(0.0, 0.0, 9.0)),
    };
    let mut resolver = GeometryResolver::with_settings(&loader, settings);

    let flat = resolver.get_flat_mesh(46);
    assert_eq!(flat.geometries.len(), 1);

    // world = normalize * target * origin
    let world = flat.geometries[0].transformation;
    assert_relative_eq!(world[(0, 3)], 5.0, epsilon = 1e-9);
    assert_relative_eq!(world[(1, 3)], 7.0, epsilon = 1e-9);
    assert_relative_eq!(world[(2, 3)], 9.0, epsilon = 1e-9);
}

#[test]
fn faceted_brep_element_resolves() {
    let model = r#"
#1=IFCCARTESIANPOINT((0.,0.,0.));
#2=IFCCARTESIANPOINT((1.,0.,0.));
#3=IFCCARTESIANPOINT((1.,1.,0.));
#4=IFCCARTESIANPOINT((0.,1.,0.));
#5=IFCCARTESIANPOINT((0.,0.,1.));
#6=IFCCARTESIANPOINT((1.,0.,1.));
#7=IFCCARTESIANPOINT((1.,1.,1.));
#8=IFCCARTESIANPOINT((0.,1.,1.));
#11=IFCPOLYLOOP((#1,#4,#3,#2));
#12=IFCPOLYLOOP((#5,#6,#7,#8));
#13=IFCPOLYLOOP((#1,#2,#6,#5));
#14=IFCPOLYLOOP((#2,#3,#7,#6));
#15=IFCPOLYLOOP((#3,#4,#8,#7));
#16=IFCPOLYLOOP((#4,#1,#5,#8));
#21=IFCFACEOUTERBOUND(#11,.T.);
#22=IFCFACEOUTERBOUND(#12,.T.);
#23=IFCFACEOUTERBOUND(#13,.T.);
#24=IFCFACEOUTERBOUND(#14,.T.);
#25=IFCFACEOUTERBOUND(#15,.T.);
#26=IFCFACEOUTERBOUND(#16,.T.);
#31=IFCFACE((#21));
#32=IFCFACE((#22));
#33=IFCFACE((#23));
#34=IFCFACE((#24));
#35=IFCFACE((#25));
#36=IFCFACE((#26));
#40=IFCCLOSEDSHELL((#31,#32,#33,#34,#35,#36));
#41=IFCFACETEDBREP(#40);
#42=IFCSHAPEREPRESENTATION($,'Body','Brep',(#41));
#43=IFCPRODUCTDEFINITIONSHAPE($,$,(#42));
#44=IFCCOLUMN('guid',$,$,$,$,$,#43,$);
"#;
    let loader = IfcLoader::parse(model).unwrap();
    let mut resolver = GeometryResolver::new(&loader);

    let flat = resolver.get_flat_mesh(44);
    assert_eq!(flat.geometries.len(), 1);
    assert_eq!(flat.geometries[0].geometry_express_id, 41);

    let geometry = resolver.cached_geometry(41).unwrap();
    assert_eq!(geometry.triangle_count(), 12);
    assert_relative_eq!(geometry.volume().abs(), 1.0, epsilon = 1e-9);
}

#[test]
fn flat_mesh_order_is_preorder() {
    // Two solids under one shape representation keep argument order
    let model = r#"
#1=IFCDIRECTION((0.,0.,1.));
#2=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,1.,1.);
#3=IFCEXTRUDEDAREASOLID(#2,$,#1,1.);
#4=IFCEXTRUDEDAREASOLID(#2,$,#1,2.);
#5=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#3,#4));
"#;
    let loader = IfcLoader::parse(model).unwrap();
    let mut resolver = GeometryResolver::new(&loader);

    let flat = resolver.get_flat_mesh(5);
    let ids: Vec<u32> = flat.geometries.iter().map(|g| g.geometry_express_id).collect();
    assert_eq!(ids, vec![3, 4]);
}
