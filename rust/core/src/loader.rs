// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP tape loader
//!
//! Parses a STEP payload once into a flat token tape plus a per-line
//! index, then serves random-access argument reads. Cursors are explicit
//! values passed down the call stack; the loader itself is immutable
//! after parsing, so a sub-read can never corrupt an outer parse.

use crate::error::{Error, Result};
use crate::schema::IfcType;
use crate::tokenizer::{skip_ws, tokenize_arguments, Token, TokenKind};
use rustc_hash::FxHashMap;
use tracing::warn;

/// One parsed entity line
#[derive(Debug, Clone, Copy)]
pub struct LineRecord {
    pub express_id: u32,
    pub ifc_type: IfcType,
    /// First token of the argument region on the tape
    pub tape_start: usize,
    /// One past the last argument token
    pub tape_end: usize,
}

/// An explicit tape position
///
/// Reads take `&mut Cursor` and advance it; copies are cheap, so callers
/// read all scalar arguments into locals before recursing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(usize);

impl Cursor {
    /// Absolute tape offset
    pub fn offset(&self) -> usize {
        self.0
    }
}

/// Tape-backed random-access loader for one STEP file
pub struct IfcLoader {
    tape: Vec<Token>,
    lines: Vec<LineRecord>,
    express_to_line: FxHashMap<u32, u32>,
    ids_by_type: FxHashMap<IfcType, Vec<u32>>,
}

impl IfcLoader {
    /// Parse STEP content into a tape and line index.
    ///
    /// Malformed lines are skipped with a diagnostic; a file with no
    /// parseable entities yields an empty loader rather than an error.
    pub fn parse(content: &str) -> Result<Self> {
        let bytes = content.as_bytes();
        let len = bytes.len();

        // Roughly 1 entity per 50 bytes
        let estimated = len / 50;
        let mut loader = Self {
            tape: Vec::with_capacity(estimated * 8),
            lines: Vec::with_capacity(estimated),
            express_to_line: FxHashMap::with_capacity_and_hasher(estimated, Default::default()),
            ids_by_type: FxHashMap::default(),
        };

        let mut pos = 0usize;
        while pos < len {
            // Find next '#' using SIMD-accelerated search
            let hash_offset = match memchr::memchr(b'#', &bytes[pos..]) {
                Some(offset) => offset,
                None => break,
            };
            pos += hash_offset + 1;

            // Entity id digits
            let id_start = pos;
            while pos < len && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos == id_start {
                continue;
            }
            let express_id = parse_u32_inline(bytes, id_start, pos);

            pos = skip_ws(bytes, pos);
            if pos >= len || bytes[pos] != b'=' {
                continue; // not an entity line (e.g. '#' inside a header string)
            }
            pos = skip_ws(bytes, pos + 1);

            // Entity type name
            let type_start = pos;
            while pos < len {
                let b = bytes[pos];
                if !(b.is_ascii_alphanumeric() || b == b'_') {
                    break;
                }
                pos += 1;
            }
            let type_name = &content[type_start..pos];

            pos = skip_ws(bytes, pos);
            if pos >= len || bytes[pos] != b'(' {
                continue;
            }
            pos += 1;

            let tape_start = loader.tape.len();
            match tokenize_arguments(&content[pos..], &mut loader.tape) {
                Ok(used) => pos += used,
                Err(e) => {
                    warn!("skipping malformed line #{}: {}", express_id, e);
                    loader.tape.truncate(tape_start);
                    // Resync at the statement terminator
                    match memchr::memchr(b';', &bytes[pos..]) {
                        Some(offset) => pos += offset + 1,
                        None => break,
                    }
                    continue;
                }
            }

            let ifc_type = IfcType::from_str(type_name);
            let line_id = loader.lines.len() as u32;
            loader.lines.push(LineRecord {
                express_id,
                ifc_type,
                tape_start,
                tape_end: loader.tape.len(),
            });
            loader.express_to_line.insert(express_id, line_id);
            loader.ids_by_type.entry(ifc_type).or_default().push(express_id);
        }

        Ok(loader)
    }

    /// Map an express id to its line id
    pub fn line_id(&self, express_id: u32) -> Option<u32> {
        self.express_to_line.get(&express_id).copied()
    }

    /// Get a line record by line id
    pub fn line(&self, line_id: u32) -> &LineRecord {
        &self.lines[line_id as usize]
    }

    /// Resolve an express id directly to its line record
    pub fn expect_line(&self, express_id: u32) -> Result<&LineRecord> {
        self.line_id(express_id)
            .map(|id| self.line(id))
            .ok_or(Error::UnknownExpressId(express_id))
    }

    /// All express ids of a given type, in file order
    pub fn ids_with_type(&self, ifc_type: IfcType) -> &[u32] {
        self.ids_by_type
            .get(&ifc_type)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Number of parsed entity lines
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Position a cursor at the n-th top-level argument of a line
    pub fn argument(&self, line: &LineRecord, index: usize) -> Result<Cursor> {
        let mut pos = line.tape_start;
        for _ in 0..index {
            pos = self.skip_item(pos, line.tape_end)?;
        }
        if pos >= line.tape_end {
            return Err(Error::ArgumentOutOfRange {
                express_id: line.express_id,
                index,
            });
        }
        Ok(Cursor(pos))
    }

    /// Peek the token kind at a cursor without advancing
    pub fn token_kind(&self, cur: Cursor) -> TokenKind {
        self.tape
            .get(cur.0)
            .map(Token::kind)
            .unwrap_or(TokenKind::SetEnd)
    }

    fn token_at(&self, pos: usize, expected: &str) -> Result<&Token> {
        self.tape
            .get(pos)
            .ok_or_else(|| Error::unexpected(pos, expected, "end of tape"))
    }

    /// Read an entity reference and advance
    pub fn ref_arg(&self, cur: &mut Cursor) -> Result<u32> {
        match self.token_at(cur.0, "REF")? {
            Token::Ref(id) => {
                let id = *id;
                cur.0 += 1;
                Ok(id)
            }
            other => Err(Error::unexpected(cur.0, "REF", format!("{:?}", other))),
        }
    }

    /// Read a real (or integer widened to real) and advance
    pub fn real_arg(&self, cur: &mut Cursor) -> Result<f64> {
        match self.token_at(cur.0, "REAL")? {
            Token::Real(v) => {
                let v = *v;
                cur.0 += 1;
                Ok(v)
            }
            Token::Integer(v) => {
                let v = *v as f64;
                cur.0 += 1;
                Ok(v)
            }
            other => Err(Error::unexpected(cur.0, "REAL", format!("{:?}", other))),
        }
    }

    /// Read a string-like token (string, enum, or typed-value label) and advance
    pub fn string_arg(&self, cur: &mut Cursor) -> Result<&str> {
        let pos = cur.0;
        match self.token_at(pos, "STRING")? {
            Token::Str(s) | Token::Enum(s) | Token::Label(s) => {
                cur.0 += 1;
                Ok(s)
            }
            other => Err(Error::unexpected(pos, "STRING", format!("{:?}", other))),
        }
    }

    /// Read a set, returning one cursor per atomic token inside it
    /// (structure tokens are skipped), and advance past the set.
    ///
    /// A trimming select `(IFCPARAMETERVALUE(90.))` therefore yields
    /// exactly two cursors: the label and the parameter.
    pub fn set_arg(&self, cur: &mut Cursor) -> Result<Vec<Cursor>> {
        match self.token_at(cur.0, "SET")? {
            Token::SetOpen => {}
            other => return Err(Error::unexpected(cur.0, "SET", format!("{:?}", other))),
        }
        let mut elements = Vec::new();
        let mut pos = cur.0 + 1;
        let mut depth = 1usize;
        while depth > 0 {
            match self.token_at(pos, "SET element")? {
                Token::SetOpen => depth += 1,
                Token::SetClose => depth -= 1,
                _ => elements.push(Cursor(pos)),
            }
            pos += 1;
        }
        cur.0 = pos;
        Ok(elements)
    }

    /// Optional reference at argument `index`: `Some(id)` for a REF token,
    /// `None` for anything else (null, derived, inline values)
    pub fn ref_at(&self, line: &LineRecord, index: usize) -> Result<Option<u32>> {
        let mut cur = self.argument(line, index)?;
        match self.token_kind(cur) {
            TokenKind::Ref => Ok(Some(self.ref_arg(&mut cur)?)),
            _ => Ok(None),
        }
    }

    /// Skip a single argument item (atomic token or balanced set)
    fn skip_item(&self, pos: usize, end: usize) -> Result<usize> {
        if pos >= end {
            return Ok(pos);
        }
        match self.tape[pos] {
            Token::SetOpen => {
                let mut depth = 1usize;
                let mut p = pos + 1;
                while depth > 0 {
                    match self.tape[p] {
                        Token::SetOpen => depth += 1,
                        Token::SetClose => depth -= 1,
                        _ => {}
                    }
                    p += 1;
                }
                Ok(p)
            }
            // A typed value is a label followed by its parenthesized value
            Token::Label(_) => self.skip_item(pos + 1, end),
            _ => Ok(pos + 1),
        }
    }
}

/// Fast u32 parsing without string allocation
#[inline]
fn parse_u32_inline(bytes: &[u8], start: usize, end: usize) -> u32 {
    let mut result: u32 = 0;
    for i in start..end {
        let digit = bytes[i].wrapping_sub(b'0');
        result = result.wrapping_mul(10).wrapping_add(digit as u32);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = r#"
#1=IFCCARTESIANPOINT((1.5,2.5,3.5));
#2=IFCWALL('guid',$,$,$,'Wall-001',#3,#4,$);
#3=IFCLOCALPLACEMENT($,#4);
#4=IFCAXIS2PLACEMENT3D(#1,$,$);
#5=IFCTRIMMEDCURVE(#6,(IFCPARAMETERVALUE(0.)),(IFCPARAMETERVALUE(90.)),.T.,.PARAMETER.);
#6=IFCCIRCLE(#4,1.);
"#;

    #[test]
    fn test_parse_line_index() {
        let loader = IfcLoader::parse(CONTENT).unwrap();
        assert_eq!(loader.line_count(), 6);

        let line = loader.expect_line(2).unwrap();
        assert_eq!(line.express_id, 2);
        assert_eq!(line.ifc_type, IfcType::IfcWall);
    }

    #[test]
    fn test_ids_with_type() {
        let loader = IfcLoader::parse(CONTENT).unwrap();
        assert_eq!(loader.ids_with_type(IfcType::IfcWall), &[2]);
        assert_eq!(loader.ids_with_type(IfcType::IfcDoor), &[] as &[u32]);
    }

    #[test]
    fn test_argument_reads() {
        let loader = IfcLoader::parse(CONTENT).unwrap();
        let wall = *loader.expect_line(2).unwrap();

        let mut cur = loader.argument(&wall, 4).unwrap();
        assert_eq!(loader.string_arg(&mut cur).unwrap(), "Wall-001");

        let mut cur = loader.argument(&wall, 5).unwrap();
        assert_eq!(loader.ref_arg(&mut cur).unwrap(), 3);

        // Null argument peeks as Null
        let cur = loader.argument(&wall, 7).unwrap();
        assert_eq!(loader.token_kind(cur), TokenKind::Null);
    }

    #[test]
    fn test_set_of_reals() {
        let loader = IfcLoader::parse(CONTENT).unwrap();
        let point = *loader.expect_line(1).unwrap();

        let mut cur = loader.argument(&point, 0).unwrap();
        let coords = loader.set_arg(&mut cur).unwrap();
        assert_eq!(coords.len(), 3);

        let mut c0 = coords[0];
        assert_eq!(loader.real_arg(&mut c0).unwrap(), 1.5);
        let mut c2 = coords[2];
        assert_eq!(loader.real_arg(&mut c2).unwrap(), 3.5);
    }

    #[test]
    fn test_trim_select_shape() {
        let loader = IfcLoader::parse(CONTENT).unwrap();
        let trimmed = *loader.expect_line(5).unwrap();

        // Trim set yields exactly [label, value]
        let mut cur = loader.argument(&trimmed, 2).unwrap();
        let elements = loader.set_arg(&mut cur).unwrap();
        assert_eq!(elements.len(), 2);

        let mut c0 = elements[0];
        assert_eq!(loader.string_arg(&mut c0).unwrap(), "IFCPARAMETERVALUE");
        let mut c1 = elements[1];
        assert_eq!(loader.real_arg(&mut c1).unwrap(), 90.0);

        // Sense agreement reads as a string-like enum
        let mut cur = loader.argument(&trimmed, 3).unwrap();
        assert_eq!(loader.string_arg(&mut cur).unwrap(), "T");
    }

    #[test]
    fn test_ref_at_optional() {
        let loader = IfcLoader::parse(CONTENT).unwrap();
        let placement = *loader.expect_line(3).unwrap();

        assert_eq!(loader.ref_at(&placement, 0).unwrap(), None);
        assert_eq!(loader.ref_at(&placement, 1).unwrap(), Some(4));
    }

    #[test]
    fn test_unknown_express_id() {
        let loader = IfcLoader::parse(CONTENT).unwrap();
        assert!(loader.expect_line(99).is_err());
    }

    #[test]
    fn test_header_noise_skipped() {
        let content = "FILE_NAME('a#1=b');\n#7=IFCCARTESIANPOINT((0.,0.));\n";
        let loader = IfcLoader::parse(content).unwrap();
        assert_eq!(loader.line_count(), 1);
        assert!(loader.expect_line(7).is_ok());
    }
}
