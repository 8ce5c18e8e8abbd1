// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh resolver
//!
//! Walks typed entity references into a composed-mesh tree, caching
//! built geometries by express id, punching openings through boolean
//! subtraction, and flattening the tree into placed world-space
//! geometries.

use crate::boolean::{bool_subtract, intersect_mesh_mesh};
use crate::brep::brep_geometry;
use crate::extrusion::{extrude, flip_winding};
use crate::mesh::{ComposedMesh, FlatMesh, Mesh, PlacedGeometry, Rgba};
use crate::profile::{profile_for, Profile};
use crate::style::color_for;
use crate::transform::{cartesian_point_3d, placement_3d};
use crate::Result;
use ifc_mesh_core::{IfcLoader, IfcType, LineRecord, TokenKind};
use nalgebra::{Matrix4, Vector3};
use rustc_hash::{FxHashMap, FxHashSet};
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Placed geometries default to red when no style resolves
const DEFAULT_COLOR: Rgba = Rgba::new(1.0, 0.0, 0.0, 1.0);

/// Resolver configuration
///
/// `normalize` is the host-provided basis change applied as the
/// outer-most parent when flattening; it maps the file's Z-up meters to
/// the target frame.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub normalize: Matrix4<f64>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            normalize: Matrix4::identity(),
        }
    }
}

/// Resolves express ids into composed meshes and flat placed geometry.
///
/// A resolver owns its caches for the lifetime of a resolution session
/// and must not be shared across threads; run one resolver per file for
/// parallelism.
pub struct GeometryResolver<'a> {
    loader: &'a IfcLoader,
    settings: ResolverSettings,
    geometry_cache: FxHashMap<u32, Mesh>,
    rel_voids: Option<FxHashMap<u32, Vec<u32>>>,
    styled_items: Option<FxHashMap<u32, Vec<u32>>>,
    visiting: FxHashSet<u32>,
}

impl<'a> GeometryResolver<'a> {
    pub fn new(loader: &'a IfcLoader) -> Self {
        Self::with_settings(loader, ResolverSettings::default())
    }

    pub fn with_settings(loader: &'a IfcLoader, settings: ResolverSettings) -> Self {
        Self {
            loader,
            settings,
            geometry_cache: FxHashMap::default(),
            rel_voids: None,
            styled_items: None,
            visiting: FxHashSet::default(),
        }
    }

    /// Resolve the composed-mesh tree for an express id
    pub fn get_mesh(&mut self, express_id: u32) -> ComposedMesh {
        match self.loader.line_id(express_id) {
            Some(line_id) => self.mesh_by_line(line_id),
            None => {
                warn!("unknown express id #{}", express_id);
                ComposedMesh::empty(express_id)
            }
        }
    }

    /// Resolve the profile for an express id
    pub fn get_profile(&self, express_id: u32) -> Profile {
        profile_for(self.loader, express_id)
    }

    /// Flatten the composed tree into placed geometries, pre-order, with
    /// the normalize transform as the root parent
    pub fn get_flat_mesh(&mut self, express_id: u32) -> FlatMesh {
        let composed = self.get_mesh(express_id);
        let mut flat = FlatMesh::default();
        self.add_composed_mesh(
            &composed,
            self.settings.normalize,
            DEFAULT_COLOR,
            false,
            &mut flat,
        );
        flat
    }

    /// Resolve and concatenate everything under an express id into one
    /// world-space mesh
    pub fn get_flattened_geometry(&mut self, express_id: u32) -> Mesh {
        let composed = self.get_mesh(express_id);
        let normalize = self.settings.normalize;
        self.flatten(&composed, &normalize)
    }

    /// Geometry cached under an express id, if any
    pub fn cached_geometry(&self, express_id: u32) -> Option<&Mesh> {
        self.geometry_cache.get(&express_id)
    }

    pub fn has_cached_geometry(&self, express_id: u32) -> bool {
        self.geometry_cache.contains_key(&express_id)
    }

    /// Debug utility: write a composed mesh as an OBJ file, one object
    /// group per placed geometry
    pub fn dump_mesh(&self, mesh: &ComposedMesh, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut flat = FlatMesh::default();
        self.add_composed_mesh(mesh, self.settings.normalize, DEFAULT_COLOR, false, &mut flat);

        let mut file = std::fs::File::create(path)?;
        let mut index_offset = 0usize;
        for placed in &flat.geometries {
            if let Some(geometry) = self.geometry_cache.get(&placed.geometry_express_id) {
                let mut world = geometry.clone();
                world.transform_by(&placed.transformation);
                let name = format!("mesh_{}", placed.geometry_express_id);
                file.write_all(world.to_obj(&name, &mut index_offset).as_bytes())?;
            }
        }
        Ok(())
    }

    fn mesh_by_line(&mut self, line_id: u32) -> ComposedMesh {
        self.populate_rel_voids_if_needed();
        self.populate_styled_items_if_needed();

        let line = *self.loader.line(line_id);
        let express_id = line.express_id;

        if !self.visiting.insert(express_id) {
            warn!("cyclic entity reference at #{}", express_id);
            return ComposedMesh::empty(express_id);
        }

        let resolved = self.resolve_line(&line);
        self.visiting.remove(&express_id);

        match resolved {
            Ok(mesh) => mesh,
            Err(e) => {
                warn!("failed to resolve mesh at #{}: {}", express_id, e);
                ComposedMesh::empty(express_id)
            }
        }
    }

    fn resolve_line(&mut self, line: &LineRecord) -> Result<ComposedMesh> {
        let styled_color = self.styled_item_color(line.express_id);

        if line.ifc_type.is_ifc_element() {
            return self.resolve_element(line, styled_color);
        }

        match line.ifc_type {
            IfcType::IfcMappedItem => {
                // MappingSource, MappingTarget
                let mut cur = self.loader.argument(line, 0)?;
                let source_id = self.loader.ref_arg(&mut cur)?;
                let target_id = self.loader.ref_arg(&mut cur)?;

                let mut mesh = ComposedMesh::empty(line.express_id);
                mesh.transformation = placement_3d(self.loader, target_id);
                mesh.children.push(self.get_mesh(source_id));
                mesh.color = styled_color;
                Ok(mesh)
            }
            IfcType::IfcRepresentationMap => {
                // MappingOrigin, MappedRepresentation
                let mut cur = self.loader.argument(line, 0)?;
                let origin_id = self.loader.ref_arg(&mut cur)?;
                let representation_id = self.loader.ref_arg(&mut cur)?;

                let mut mesh = ComposedMesh::empty(line.express_id);
                mesh.transformation = placement_3d(self.loader, origin_id);
                mesh.children.push(self.get_mesh(representation_id));
                mesh.color = styled_color;
                Ok(mesh)
            }
            IfcType::IfcShellBasedSurfaceModel => {
                // SbsmBoundary
                let mut cur = self.loader.argument(line, 0)?;
                let shells = self.loader.set_arg(&mut cur)?;

                let mut mesh = ComposedMesh::empty(line.express_id);
                mesh.color = styled_color;

                for token in shells {
                    let mut c = token;
                    let shell_id = self.loader.ref_arg(&mut c)?;
                    self.geometry_cache
                        .insert(shell_id, brep_geometry(self.loader, shell_id));

                    let mut child = ComposedMesh::empty(shell_id);
                    child.has_geometry = true;
                    mesh.children.push(child);
                }
                Ok(mesh)
            }
            IfcType::IfcFacetedBrep => {
                // Outer shell
                let mut cur = self.loader.argument(line, 0)?;
                let shell_id = self.loader.ref_arg(&mut cur)?;

                self.geometry_cache
                    .insert(line.express_id, brep_geometry(self.loader, shell_id));

                let mut mesh = ComposedMesh::empty(line.express_id);
                mesh.has_geometry = true;
                mesh.color = styled_color;
                Ok(mesh)
            }
            IfcType::IfcProductDefinitionShape => {
                // Name, Description, Representations
                let mut cur = self.loader.argument(line, 2)?;
                let representations = self.loader.set_arg(&mut cur)?;

                let mut representation_ids = Vec::with_capacity(representations.len());
                for token in representations {
                    let mut c = token;
                    representation_ids.push(self.loader.ref_arg(&mut c)?);
                }

                let mut mesh = ComposedMesh::empty(line.express_id);
                for representation_id in representation_ids {
                    mesh.children.push(self.get_mesh(representation_id));
                }
                mesh.color = styled_color;
                Ok(mesh)
            }
            IfcType::IfcShapeRepresentation => {
                // ContextOfItems, RepresentationIdentifier, RepresentationType, Items
                let mut mesh = ComposedMesh::empty(line.express_id);

                let mut cur = self.loader.argument(line, 1)?;
                if self.loader.token_kind(cur) != TokenKind::String
                    || self.loader.string_arg(&mut cur)? != "Body"
                {
                    return Ok(mesh);
                }

                let mut cur = self.loader.argument(line, 3)?;
                let items = self.loader.set_arg(&mut cur)?;

                let mut item_ids = Vec::with_capacity(items.len());
                for token in items {
                    let mut c = token;
                    item_ids.push(self.loader.ref_arg(&mut c)?);
                }

                for item_id in item_ids {
                    mesh.children.push(self.get_mesh(item_id));
                }
                mesh.color = styled_color;
                Ok(mesh)
            }
            IfcType::IfcExtrudedAreaSolid => {
                // SweptArea, Position, ExtrudedDirection, Depth
                let mut cur = self.loader.argument(line, 0)?;
                let profile_id = self.loader.ref_arg(&mut cur)?;
                let placement_id = self.loader.ref_at(line, 1)?;
                let mut cur = self.loader.argument(line, 2)?;
                let direction_id = self.loader.ref_arg(&mut cur)?;
                let depth = self.loader.real_arg(&mut cur)?;

                let profile = profile_for(self.loader, profile_id);
                let placement = placement_id
                    .map(|id| placement_3d(self.loader, id))
                    .unwrap_or_else(Matrix4::identity);
                let dir = cartesian_point_3d(self.loader, direction_id)?.coords;

                // Direction cannot be perpendicular to +Z for a valid solid
                let flip = dir.dot(&Vector3::z()) < 0.0;

                let mut geometry = extrude(&profile, &placement, dir, depth);
                if flip {
                    flip_winding(&mut geometry);
                }

                self.geometry_cache.insert(line.express_id, geometry);

                let mut mesh = ComposedMesh::empty(line.express_id);
                mesh.has_geometry = true;
                mesh.color = styled_color;
                Ok(mesh)
            }
            other => {
                warn!("unexpected mesh type {} at #{}", other, line.express_id);
                Ok(ComposedMesh::empty(line.express_id))
            }
        }
    }

    /// Resolve a building product: local placement, representation, and
    /// any associated opening subtraction
    fn resolve_element(
        &mut self,
        line: &LineRecord,
        styled_color: Option<Rgba>,
    ) -> Result<ComposedMesh> {
        let mut mesh = ComposedMesh::empty(line.express_id);
        mesh.color = styled_color;

        // IfcProduct: ..., ObjectPlacement (5), Representation (6)
        let placement_id = self.loader.ref_at(line, 5).unwrap_or(None);
        let representation_id = self.loader.ref_at(line, 6).unwrap_or(None);

        if let Some(id) = placement_id {
            mesh.transformation = placement_3d(self.loader, id);
        }
        if let Some(id) = representation_id {
            mesh.children.push(self.get_mesh(id));
        }

        let voids = self
            .rel_voids
            .as_ref()
            .and_then(|map| map.get(&line.express_id))
            .cloned()
            .unwrap_or_default();

        if voids.is_empty() {
            return Ok(mesh);
        }

        // Flatten element and voids into world space, cut, then subtract
        let identity = Matrix4::identity();
        let mut element_geometry = self.flatten(&mesh, &identity);

        for void_id in voids {
            let void_mesh = self.get_mesh(void_id);
            let void_geometry = self.flatten(&void_mesh, &identity);

            let (element_cut, void_cut) = intersect_mesh_mesh(&element_geometry, &void_geometry);
            element_geometry = bool_subtract(&element_cut, &void_cut);
        }

        self.geometry_cache.insert(line.express_id, element_geometry);

        let mut result = ComposedMesh::empty(line.express_id);
        result.has_geometry = true;
        result.color = styled_color;
        Ok(result)
    }

    /// First style assignment mapped to this express id that resolves
    fn styled_item_color(&self, express_id: u32) -> Option<Rgba> {
        let assignments = self.styled_items.as_ref()?.get(&express_id)?;
        assignments
            .iter()
            .find_map(|&assignment| color_for(self.loader, assignment))
    }

    /// Pre-order accumulation of placed geometries.
    ///
    /// The first colored ancestor wins; nodes below inherit it.
    fn add_composed_mesh(
        &self,
        mesh: &ComposedMesh,
        parent_matrix: Matrix4<f64>,
        color: Rgba,
        has_color: bool,
        flat: &mut FlatMesh,
    ) {
        let new_matrix = parent_matrix * mesh.transformation;

        let mut new_color = color;
        let mut new_has_color = has_color;
        if let (Some(own), false) = (mesh.color, has_color) {
            new_color = own;
            new_has_color = true;
        }

        if mesh.has_geometry {
            flat.geometries.push(PlacedGeometry {
                geometry_express_id: mesh.express_id,
                color: new_color,
                transformation: new_matrix,
            });
        }

        for child in &mesh.children {
            self.add_composed_mesh(child, new_matrix, new_color, new_has_color, flat);
        }
    }

    /// Concatenate all cached geometries under a composed tree into one
    /// mesh with the given root transform
    fn flatten(&self, mesh: &ComposedMesh, root: &Matrix4<f64>) -> Mesh {
        let mut flat = FlatMesh::default();
        self.add_composed_mesh(mesh, *root, DEFAULT_COLOR, false, &mut flat);

        let mut out = Mesh::new();
        for placed in &flat.geometries {
            if let Some(geometry) = self.geometry_cache.get(&placed.geometry_express_id) {
                let mut world = geometry.clone();
                world.transform_by(&placed.transformation);
                out.merge(&world);
            }
        }
        out
    }

    fn populate_rel_voids_if_needed(&mut self) {
        if self.rel_voids.is_some() {
            return;
        }

        let mut map: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        for &rel_id in self.loader.ids_with_type(IfcType::IfcRelVoidsElement) {
            if let Err(e) = self.read_rel_voids(rel_id, &mut map) {
                warn!("skipping rel-voids at #{}: {}", rel_id, e);
            }
        }
        self.rel_voids = Some(map);
    }

    fn read_rel_voids(&self, rel_id: u32, map: &mut FxHashMap<u32, Vec<u32>>) -> Result<()> {
        // IfcRelVoidsElement: ..., RelatingBuildingElement (4), RelatedOpeningElement (5)
        let line = *self.loader.expect_line(rel_id)?;
        let mut cur = self.loader.argument(&line, 4)?;
        let relating_element = self.loader.ref_arg(&mut cur)?;
        let related_opening = self.loader.ref_arg(&mut cur)?;
        map.entry(relating_element).or_default().push(related_opening);
        Ok(())
    }

    fn populate_styled_items_if_needed(&mut self) {
        if self.styled_items.is_some() {
            return;
        }

        let mut map: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        for &styled_id in self.loader.ids_with_type(IfcType::IfcStyledItem) {
            if let Err(e) = self.read_styled_item(styled_id, &mut map) {
                warn!("skipping styled item at #{}: {}", styled_id, e);
            }
        }
        self.styled_items = Some(map);
    }

    fn read_styled_item(&self, styled_id: u32, map: &mut FxHashMap<u32, Vec<u32>>) -> Result<()> {
        // IfcStyledItem: Item, Styles, Name
        let line = *self.loader.expect_line(styled_id)?;
        let mut cur = self.loader.argument(&line, 0)?;
        if self.loader.token_kind(cur) != TokenKind::Ref {
            return Ok(()); // style without a representation item
        }
        let representation_item = self.loader.ref_arg(&mut cur)?;

        let assignments = self.loader.set_arg(&mut cur)?;
        for token in assignments {
            let mut c = token;
            if self.loader.token_kind(c) == TokenKind::Ref {
                let assignment_id = self.loader.ref_arg(&mut c)?;
                map.entry(representation_item).or_default().push(assignment_id);
            }
        }
        Ok(())
    }
}
