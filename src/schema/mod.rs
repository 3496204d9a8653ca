// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema model and text parsers.
//!
//! A [`Schema`] is a named, ordered list of entries; each entry is a field
//! (type + optional default) or a constant (primitive type + literal).
//! Text parsers for ROS1 and ROS2 `.msg` definitions produce a
//! [`ParsedSchema`]: the root schema plus the sibling schemas its complex
//! fields reference. Block structure (root block, `=` separators, `MSG:`
//! dependency headers) is parsed with Pest; the per-line field/constant
//! grammar is handled by the per-dialect modules.

pub mod compiler;
pub mod ros1msg;
pub mod ros2msg;

pub use compiler::{compile_schema, CompiledSchema, SchemaCodec, WireKind};
pub use ros1msg::{compute_md5sum, parse_ros1msg};
pub use ros2msg::parse_ros2msg;

use std::collections::HashMap;

use pest::Parser;
use pest_derive::Parser;

use crate::core::{Result, SchemaError, Value};

/// Pest parser for ROS `.msg` schema text.
#[derive(Parser)]
#[grammar = "schema/msg.pest"] // Path relative to src/ directory
pub(crate) struct MsgParser;

/// Split a definition into (root lines, raw dependency name -> lines).
///
/// Lines come back comment-stripped and trimmed, blank lines removed;
/// dependency names are as written after `MSG:`, unresolved.
pub(crate) fn split_schema_text(
    definition: &str,
) -> Result<(Vec<&str>, Vec<(String, Vec<&str>)>)> {
    let pairs = MsgParser::parse(Rule::schema, definition).map_err(|e| SchemaError::Parse {
        line: "schema".to_string(),
        reason: e.to_string(),
    })?;

    let mut root: Vec<&str> = Vec::new();
    let mut dependencies: Vec<(String, Vec<&str>)> = Vec::new();

    for pair in pairs {
        // schema = SOI ~ root_msg ~ (separator ~ dependency_msg?)* ~ EOI
        for item in pair.into_inner() {
            match item.as_rule() {
                Rule::EOI => {}
                Rule::root_msg => {
                    root = collect_msg_lines(item);
                }
                Rule::dependency_msg => {
                    // First pair is dependency_header: "MSG: pkg/Type"
                    let mut inner = item.into_inner();
                    let Some(header) = inner.next() else {
                        continue;
                    };
                    let name = header
                        .as_str()
                        .trim()
                        .strip_prefix("MSG:")
                        .unwrap_or_default()
                        .trim()
                        .to_string();
                    if name.is_empty() {
                        return Err(SchemaError::Parse {
                            line: header.as_str().trim().to_string(),
                            reason: "dependency block must start with 'MSG: <type>'".to_string(),
                        }
                        .into());
                    }
                    let lines = inner
                        .filter(|line| line.as_rule() == Rule::msg_line)
                        .filter_map(clean_msg_line)
                        .collect();
                    dependencies.push((name, lines));
                }
                _ => {}
            }
        }
    }
    Ok((root, dependencies))
}

/// The comment-stripped, trimmed lines of a root block.
fn collect_msg_lines(pair: pest::iterators::Pair<'_, Rule>) -> Vec<&str> {
    pair.into_inner()
        .filter(|line| line.as_rule() == Rule::msg_line)
        .filter_map(clean_msg_line)
        .collect()
}

/// Strip the inline comment and surrounding whitespace from one msg_line.
fn clean_msg_line(pair: pest::iterators::Pair<'_, Rule>) -> Option<&str> {
    let line = strip_inline_comment(pair.as_str().trim_start()).trim();
    (!line.is_empty()).then_some(line)
}

/// Primitive type kinds.
///
/// `time` and `duration` are ROS1-specific composites of two 32-bit
/// fields, carried here so the ROS1 parser can express them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Boolean
    Bool,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Byte (alias for uint8)
    Byte,
    /// Char (int8 in ROS1, uint8 in ROS2)
    Char,
    /// ROS1 time (sec: int32, nsec: uint32)
    Time,
    /// ROS1 duration (sec: int32, nsec: int32)
    Duration,
}

impl PrimitiveKind {
    /// Natural width in bytes.
    pub const fn width(self) -> usize {
        match self {
            PrimitiveKind::Bool
            | PrimitiveKind::Int8
            | PrimitiveKind::UInt8
            | PrimitiveKind::Byte
            | PrimitiveKind::Char => 1,
            PrimitiveKind::Int16 | PrimitiveKind::UInt16 => 2,
            PrimitiveKind::Int32 | PrimitiveKind::UInt32 | PrimitiveKind::Float32 => 4,
            PrimitiveKind::Int64 | PrimitiveKind::UInt64 | PrimitiveKind::Float64 => 8,
            PrimitiveKind::Time | PrimitiveKind::Duration => 8,
        }
    }

    /// Alignment requirement in bytes (CDR).
    pub const fn alignment(self) -> usize {
        match self {
            // time/duration are two 4-byte fields
            PrimitiveKind::Time | PrimitiveKind::Duration => 4,
            other => other.width(),
        }
    }

    /// Parse a primitive type token.
    pub fn try_from_str(s: &str) -> Option<Self> {
        match s {
            "bool" => Some(PrimitiveKind::Bool),
            "int8" => Some(PrimitiveKind::Int8),
            "int16" => Some(PrimitiveKind::Int16),
            "int32" => Some(PrimitiveKind::Int32),
            "int64" => Some(PrimitiveKind::Int64),
            "uint8" => Some(PrimitiveKind::UInt8),
            "uint16" => Some(PrimitiveKind::UInt16),
            "uint32" => Some(PrimitiveKind::UInt32),
            "uint64" => Some(PrimitiveKind::UInt64),
            "float32" => Some(PrimitiveKind::Float32),
            "float64" => Some(PrimitiveKind::Float64),
            "byte" => Some(PrimitiveKind::Byte),
            "char" => Some(PrimitiveKind::Char),
            "time" => Some(PrimitiveKind::Time),
            "duration" => Some(PrimitiveKind::Duration),
            _ => None,
        }
    }

    /// The type token as it appears in `.msg` text.
    pub const fn as_str(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int8 => "int8",
            PrimitiveKind::Int16 => "int16",
            PrimitiveKind::Int32 => "int32",
            PrimitiveKind::Int64 => "int64",
            PrimitiveKind::UInt8 => "uint8",
            PrimitiveKind::UInt16 => "uint16",
            PrimitiveKind::UInt32 => "uint32",
            PrimitiveKind::UInt64 => "uint64",
            PrimitiveKind::Float32 => "float32",
            PrimitiveKind::Float64 => "float64",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Time => "time",
            PrimitiveKind::Duration => "duration",
        }
    }

    /// Whether an integer literal fits this kind.
    ///
    /// `byte` accepts integers in `[0, 255]`; `char` is signed in ROS1.
    pub fn fits(self, value: i128) -> bool {
        match self {
            PrimitiveKind::Bool => value == 0 || value == 1,
            PrimitiveKind::Int8 | PrimitiveKind::Char => {
                value >= i8::MIN as i128 && value <= i8::MAX as i128
            }
            PrimitiveKind::UInt8 | PrimitiveKind::Byte => value >= 0 && value <= u8::MAX as i128,
            PrimitiveKind::Int16 => value >= i16::MIN as i128 && value <= i16::MAX as i128,
            PrimitiveKind::UInt16 => value >= 0 && value <= u16::MAX as i128,
            PrimitiveKind::Int32 => value >= i32::MIN as i128 && value <= i32::MAX as i128,
            PrimitiveKind::UInt32 => value >= 0 && value <= u32::MAX as i128,
            PrimitiveKind::Int64 | PrimitiveKind::Time | PrimitiveKind::Duration => {
                value >= i64::MIN as i128 && value <= i64::MAX as i128
            }
            PrimitiveKind::UInt64 => value >= 0 && value <= u64::MAX as i128,
            PrimitiveKind::Float32 | PrimitiveKind::Float64 => true,
        }
    }
}

/// String kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    /// UTF-8 string
    String,
    /// UTF-16 wstring (ROS2 only)
    WString,
}

/// A field's type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Primitive type
    Primitive(PrimitiveKind),
    /// String with an optional upper bound (`string<=N`)
    String {
        /// UTF-8 or UTF-16
        kind: StringKind,
        /// Upper bound on the encoded byte/code-unit count, if bounded
        max_len: Option<usize>,
    },
    /// Fixed-length array (`T[N]`)
    Array {
        /// Element type
        element: Box<FieldType>,
        /// Declared length
        length: usize,
    },
    /// Variable-length sequence (`T[]`), length-prefixed on the wire.
    ///
    /// Upper-bounded sequences (`T[<=N]`) carry the bound.
    Sequence {
        /// Element type
        element: Box<FieldType>,
        /// Upper bound, if bounded
        bound: Option<usize>,
    },
    /// Reference by name into the sibling-schemas dictionary
    Complex(String),
}

/// A schema entry: a field or a constant.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaEntry {
    /// A wire field with an optional default literal
    Field {
        /// Field type
        ty: FieldType,
        /// Default value, if the definition carries one
        default: Option<Value>,
    },
    /// A named constant; occupies no wire space
    Constant {
        /// Declared (primitive or string) type
        ty: FieldType,
        /// The literal value
        value: Value,
    },
}

/// A named message schema: ordered fields and constants.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Fully qualified type name
    pub name: String,
    /// Entries in file order
    pub entries: Vec<(String, SchemaEntry)>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Append an entry, rejecting duplicate names.
    pub fn push(&mut self, name: String, entry: SchemaEntry) -> crate::core::Result<()> {
        if self.entries.iter().any(|(existing, _)| *existing == name) {
            return Err(SchemaError::DuplicateField { name }.into());
        }
        self.entries.push((name, entry));
        Ok(())
    }

    /// Iterate wire fields (constants excluded) in order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldType)> {
        self.entries.iter().filter_map(|(name, entry)| match entry {
            SchemaEntry::Field { ty, .. } => Some((name.as_str(), ty)),
            SchemaEntry::Constant { .. } => None,
        })
    }
}

/// A parsed schema: the root type plus its named dependencies.
#[derive(Debug, Clone)]
pub struct ParsedSchema {
    /// The root schema
    pub root: Schema,
    /// Sibling schemas keyed by fully qualified name
    pub dependencies: HashMap<String, Schema>,
}

impl ParsedSchema {
    /// Look up a complex reference.
    pub fn resolve(&self, name: &str) -> Option<&Schema> {
        if self.root.name == name {
            Some(&self.root)
        } else {
            self.dependencies.get(name)
        }
    }
}

/// Strip an inline `#` comment, honouring single and double quotes.
pub(crate) fn strip_inline_comment(line: &str) -> &str {
    let mut in_single = false;
    let mut in_double = false;
    for (i, ch) in line.char_indices() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if !in_single && !in_double => return line[..i].trim_end(),
            _ => {}
        }
    }
    line.trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_width_alignment() {
        assert_eq!(PrimitiveKind::Bool.width(), 1);
        assert_eq!(PrimitiveKind::Int16.alignment(), 2);
        assert_eq!(PrimitiveKind::Float64.alignment(), 8);
        assert_eq!(PrimitiveKind::Time.width(), 8);
        assert_eq!(PrimitiveKind::Time.alignment(), 4);
    }

    #[test]
    fn test_fits() {
        assert!(PrimitiveKind::Byte.fits(255));
        assert!(!PrimitiveKind::Byte.fits(256));
        assert!(!PrimitiveKind::Byte.fits(-1));
        assert!(PrimitiveKind::Int8.fits(-128));
        assert!(!PrimitiveKind::Int8.fits(128));
        assert!(PrimitiveKind::UInt64.fits(u64::MAX as i128));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut schema = Schema::new("pkg/Thing");
        schema
            .push(
                "x".to_string(),
                SchemaEntry::Field {
                    ty: FieldType::Primitive(PrimitiveKind::Int32),
                    default: None,
                },
            )
            .unwrap();
        let err = schema
            .push(
                "x".to_string(),
                SchemaEntry::Field {
                    ty: FieldType::Primitive(PrimitiveKind::Int32),
                    default: None,
                },
            )
            .unwrap_err();
        match err {
            crate::core::Error::Schema(SchemaError::DuplicateField { name }) => {
                assert_eq!(name, "x")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_strip_inline_comment() {
        assert_eq!(strip_inline_comment("int32 x # count"), "int32 x");
        assert_eq!(strip_inline_comment("string s \"#\" rest"), "string s \"#\" rest");
        assert_eq!(strip_inline_comment("plain"), "plain");
    }
}
