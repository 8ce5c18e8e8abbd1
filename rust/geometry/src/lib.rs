// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Mesh Geometry Resolution
//!
//! Turns a loaded STEP entity graph into indexed triangle meshes using
//! [earcutr](https://docs.rs/earcutr) triangulation and
//! [nalgebra](https://docs.rs/nalgebra) transforms.
//!
//! ## Overview
//!
//! - **Placement algebra**: 2D/3D axis placements, local-placement
//!   chains, transformation operators
//! - **Curves & profiles**: polylines, composite and trimmed curves,
//!   circles; rectangle, circle, and arbitrary closed profiles
//! - **Mesh construction**: profile extrusion and brep face triangulation
//! - **Openings**: mesh/mesh boolean subtraction of void elements
//! - **Styles**: styled-item colors with transparency
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ifc_mesh_core::IfcLoader;
//! use ifc_mesh_geometry::GeometryResolver;
//!
//! let loader = IfcLoader::parse(step_content)?;
//! let mut resolver = GeometryResolver::new(&loader);
//!
//! let flat = resolver.get_flat_mesh(wall_id);
//! for placed in &flat.geometries {
//!     let geometry = resolver.cached_geometry(placed.geometry_express_id).unwrap();
//!     println!("#{}: {} triangles", placed.geometry_express_id, geometry.triangle_count());
//! }
//! ```
//!
//! A resolver instance is single-threaded; run one resolver per file to
//! process models in parallel.

pub mod boolean;
pub mod brep;
pub mod curve;
pub mod error;
pub mod extrusion;
pub mod mesh;
pub mod profile;
pub mod resolver;
pub mod style;
pub mod transform;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector2, Vector3};

pub use boolean::{bool_subtract, compute_normal, intersect_mesh_mesh, Plane, Triangle};
pub use brep::{brep_geometry, Bound3D, BoundKind};
pub use curve::{compute_curve, curve_2d, Curve2D, Curve3D, TrimmingArguments, TrimmingSelect};
pub use error::{Error, Result};
pub use extrusion::{extrude, flip_winding};
pub use mesh::{ComposedMesh, FlatMesh, Mesh, PlacedGeometry, Rgba};
pub use profile::{is_curve_convex, profile_for, Profile};
pub use resolver::{GeometryResolver, ResolverSettings};
pub use style::color_for;
pub use transform::{axis2_placement_2d, placement_3d};
pub use triangulation::{earcut_polygon, earcut_rings};
