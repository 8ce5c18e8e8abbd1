// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Mesh Core Loader
//!
//! STEP tape loader built with [nom](https://docs.rs/nom). Parses an IFC
//! payload once into a flat token tape plus a per-line index, then serves
//! random-access argument reads for the geometry resolver.
//!
//! ## Overview
//!
//! - **Tokenization**: nom atom parsers with [lexical-core](https://docs.rs/lexical-core)
//!   number parsing
//! - **Line scanning**: SIMD-accelerated entity discovery using
//!   [memchr](https://docs.rs/memchr)
//! - **Random access**: express-id → line and type → ids maps, explicit
//!   [`Cursor`] values for argument reads
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ifc_mesh_core::{IfcLoader, IfcType};
//!
//! let loader = IfcLoader::parse(step_content)?;
//! for &id in loader.ids_with_type(IfcType::IfcWall) {
//!     let line = loader.expect_line(id)?;
//!     println!("wall #{} on tape [{}..{}]", id, line.tape_start, line.tape_end);
//! }
//! ```
//!
//! Cursors are plain values: a sub-read advances its own cursor copy and
//! can never corrupt an outer parse.

pub mod error;
pub mod loader;
pub mod schema;
pub mod tokenizer;

pub use error::{Error, Result};
pub use loader::{Cursor, IfcLoader, LineRecord};
pub use schema::IfcType;
pub use tokenizer::{Token, TokenKind};
