// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 `.msg` schema parser and MD5 computation.
//!
//! A schema text is one primary block plus zero or more dependency blocks
//! separated by a line of `=` characters; each dependency block starts
//! with `MSG: <type>` (block structure comes from the shared Pest
//! grammar). Bare type names resolve against the schema's own package,
//! except `Header` which resolves to `std_msgs/Header`.
//!
//! The MD5 text is `<constants in file order>\n<fields in file order>`
//! with nested complex types replaced by their own MD5; array brackets
//! are preserved for builtin element types and dropped for complex ones,
//! matching `rosmsg md5`.

use std::collections::HashMap;

use crate::core::{Result, SchemaError, Value};
use crate::schema::{
    split_schema_text, FieldType, ParsedSchema, PrimitiveKind, Schema, SchemaEntry, StringKind,
};

/// Builtin type tokens that never resolve to a complex reference.
fn is_builtin(token: &str) -> bool {
    token == "string" || token.starts_with("string<=") || PrimitiveKind::try_from_str(token).is_some()
}

/// Split a definition into (root lines, name -> dependency lines), with
/// dependency names resolved against `package`.
fn split_blocks<'a>(
    definition: &'a str,
    package: &str,
) -> Result<(Vec<&'a str>, Vec<(String, Vec<&'a str>)>)> {
    let (root, raw_deps) = split_schema_text(definition)?;
    let deps = raw_deps
        .into_iter()
        .map(|(name, lines)| (resolve_type_name(&name, package), lines))
        .collect();
    Ok((root, deps))
}

/// Resolve a possibly-bare type reference against `package`.
fn resolve_type_name(name: &str, package: &str) -> String {
    if name == "Header" {
        "std_msgs/Header".to_string()
    } else if name.contains('/') {
        name.to_string()
    } else {
        format!("{package}/{name}")
    }
}

/// Parse a field type token.
fn parse_field_type(token: &str, package: &str) -> Result<FieldType> {
    if let Some(open) = token.rfind('[') {
        let close = token.len() - 1;
        if !token.ends_with(']') || open + 1 > close {
            return Err(SchemaError::Parse {
                line: token.to_string(),
                reason: "malformed array suffix".to_string(),
            }
            .into());
        }
        let element = Box::new(parse_field_type(&token[..open], package)?);
        let suffix = &token[open + 1..close];
        return if suffix.is_empty() {
            Ok(FieldType::Sequence {
                element,
                bound: None,
            })
        } else if let Some(bound) = suffix.strip_prefix("<=") {
            let bound = bound.parse().map_err(|_| SchemaError::Parse {
                line: token.to_string(),
                reason: "malformed sequence bound".to_string(),
            })?;
            Ok(FieldType::Sequence {
                element,
                bound: Some(bound),
            })
        } else {
            let length = suffix.parse().map_err(|_| SchemaError::Parse {
                line: token.to_string(),
                reason: "malformed array length".to_string(),
            })?;
            Ok(FieldType::Array { element, length })
        };
    }

    if token == "string" {
        return Ok(FieldType::String {
            kind: StringKind::String,
            max_len: None,
        });
    }
    if let Some(bound) = token.strip_prefix("string<=") {
        let max_len = bound.parse().map_err(|_| SchemaError::Parse {
            line: token.to_string(),
            reason: "malformed string bound".to_string(),
        })?;
        return Ok(FieldType::String {
            kind: StringKind::String,
            max_len: Some(max_len),
        });
    }
    if let Some(kind) = PrimitiveKind::try_from_str(token) {
        return Ok(FieldType::Primitive(kind));
    }
    Ok(FieldType::Complex(resolve_type_name(token, package)))
}

/// Convert a constant literal into a typed [`Value`].
pub(crate) fn literal_to_value(ty: &FieldType, name: &str, raw: &str) -> Result<Value> {
    let invalid = |reason: &str| SchemaError::InvalidConstant {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    match ty {
        FieldType::String { .. } => {
            let trimmed = raw.trim();
            let unquoted = trimmed
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
                .unwrap_or(trimmed);
            Ok(Value::String(unquoted.to_string()))
        }
        FieldType::Primitive(kind) => match kind {
            PrimitiveKind::Float32 => raw
                .trim()
                .parse::<f32>()
                .map(Value::Float32)
                .map_err(|_| invalid("not a float32 literal").into()),
            PrimitiveKind::Float64 => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float64)
                .map_err(|_| invalid("not a float64 literal").into()),
            PrimitiveKind::Bool => match raw.trim() {
                "true" | "True" | "1" => Ok(Value::Bool(true)),
                "false" | "False" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid("not a bool literal").into()),
            },
            kind => {
                let value: i128 = raw
                    .trim()
                    .parse()
                    .map_err(|_| invalid("not an integer literal"))?;
                if !kind.fits(value) {
                    return Err(invalid("literal out of range for declared type").into());
                }
                Ok(int_value(*kind, value))
            }
        },
        _ => Err(invalid("constants must be primitive or string typed").into()),
    }
}

/// Build the typed integer value for a primitive kind.
fn int_value(kind: PrimitiveKind, value: i128) -> Value {
    match kind {
        PrimitiveKind::Int8 | PrimitiveKind::Char => Value::Int8(value as i8),
        PrimitiveKind::UInt8 | PrimitiveKind::Byte => Value::UInt8(value as u8),
        PrimitiveKind::Int16 => Value::Int16(value as i16),
        PrimitiveKind::UInt16 => Value::UInt16(value as u16),
        PrimitiveKind::Int32 => Value::Int32(value as i32),
        PrimitiveKind::UInt32 => Value::UInt32(value as u32),
        PrimitiveKind::Int64 => Value::Int64(value as i64),
        PrimitiveKind::UInt64 => Value::UInt64(value as u64),
        PrimitiveKind::Time => Value::Time(value as i64),
        PrimitiveKind::Duration => Value::Duration(value as i64),
        PrimitiveKind::Bool => Value::Bool(value != 0),
        PrimitiveKind::Float32 => Value::Float32(value as f32),
        PrimitiveKind::Float64 => Value::Float64(value as f64),
    }
}

/// Split a line into `(type_token, rest)`.
fn split_type(line: &str) -> Result<(&str, &str)> {
    let mut parts = line.splitn(2, char::is_whitespace);
    let ty = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();
    if ty.is_empty() || rest.is_empty() {
        return Err(SchemaError::Parse {
            line: line.to_string(),
            reason: "expected '<type> <name>'".to_string(),
        }
        .into());
    }
    Ok((ty, rest))
}

fn is_constant_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn validate_field_name(line: &str, name: &str) -> Result<()> {
    let ok = {
        let mut chars = name.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    };
    if !ok || name.contains("__") || name.ends_with('_') {
        return Err(SchemaError::Parse {
            line: line.to_string(),
            reason: format!("invalid field name '{name}'"),
        }
        .into());
    }
    Ok(())
}

/// Parse one schema line into an entry.
fn parse_entry(line: &str, package: &str) -> Result<(String, SchemaEntry)> {
    let (ty_token, rest) = split_type(line)?;

    if let Some(eq) = rest.find('=') {
        let name = rest[..eq].trim();
        let raw_value = rest[eq + 1..].trim();
        if !is_constant_name(name) {
            return Err(SchemaError::Parse {
                line: line.to_string(),
                reason: format!("invalid constant name '{name}'"),
            }
            .into());
        }
        let ty = parse_field_type(ty_token, package)?;
        let value = literal_to_value(&ty, name, raw_value)?;
        return Ok((name.to_string(), SchemaEntry::Constant { ty, value }));
    }

    validate_field_name(line, rest)?;
    let ty = parse_field_type(ty_token, package)?;
    Ok((
        rest.to_string(),
        SchemaEntry::Field { ty, default: None },
    ))
}

/// Parse a ROS1 `.msg` definition into a schema and its dependencies.
pub fn parse_ros1msg(name: &str, definition: &str) -> Result<ParsedSchema> {
    let package = name.split('/').next().unwrap_or_default().to_string();
    let (root_lines, dep_blocks) = split_blocks(definition, &package)?;

    let mut root = Schema::new(name);
    for line in root_lines {
        let (field_name, entry) = parse_entry(line, &package)?;
        root.push(field_name, entry)?;
    }

    let mut dependencies = HashMap::new();
    for (dep_name, lines) in dep_blocks {
        let mut schema = Schema::new(dep_name.clone());
        for line in lines {
            let (field_name, entry) = parse_entry(line, &package)?;
            schema.push(field_name, entry)?;
        }
        dependencies.insert(dep_name, schema);
    }

    Ok(ParsedSchema { root, dependencies })
}

// ============================================================================
// MD5
// ============================================================================

/// Compute the ROS1 MD5 sum of a message definition.
///
/// `name` is the fully qualified type of the primary block; dependency
/// blocks are used to resolve nested complex types. Matches the official
/// `rosmsg md5` output.
pub fn compute_md5sum(definition: &str, name: &str) -> Result<String> {
    let package = name.split('/').next().unwrap_or_default().to_string();
    let (root_lines, dep_blocks) = split_blocks(definition, &package)?;

    let deps: HashMap<String, Vec<&str>> = dep_blocks.into_iter().collect();
    let mut memo: HashMap<String, String> = HashMap::new();
    md5_of_lines(&root_lines, name, &package, &deps, &mut memo, &mut Vec::new())
}

fn md5_of_lines(
    lines: &[&str],
    type_name: &str,
    package: &str,
    deps: &HashMap<String, Vec<&str>>,
    memo: &mut HashMap<String, String>,
    in_progress: &mut Vec<String>,
) -> Result<String> {
    if in_progress.iter().any(|n| n == type_name) {
        return Err(SchemaError::Cycle {
            type_name: type_name.to_string(),
        }
        .into());
    }
    in_progress.push(type_name.to_string());

    let mut constants = Vec::new();
    let mut fields = Vec::new();

    for line in lines {
        let (ty_token, rest) = split_type(line)?;

        if let Some(eq) = rest.find('=') {
            let const_name = rest[..eq].trim();
            let value = rest[eq + 1..].trim();
            constants.push(format!("{ty_token} {const_name}={value}"));
            continue;
        }

        let field_name = rest;
        let base = ty_token.split('[').next().unwrap_or(ty_token);
        if is_builtin(base) {
            // Builtin fields keep their declared text, brackets included
            fields.push(format!("{ty_token} {field_name}"));
        } else {
            // Complex fields are replaced by the referenced type's MD5;
            // brackets are dropped
            let full = resolve_type_name(base, package);
            let sub_md5 = if let Some(cached) = memo.get(&full) {
                cached.clone()
            } else {
                let sub_lines = deps.get(&full).ok_or_else(|| SchemaError::Unresolved {
                    type_name: full.clone(),
                })?;
                let sub_package = full.split('/').next().unwrap_or_default().to_string();
                let digest =
                    md5_of_lines(sub_lines, &full, &sub_package, deps, memo, in_progress)?;
                memo.insert(full.clone(), digest.clone());
                digest
            };
            fields.push(format!("{sub_md5} {field_name}"));
        }
    }

    in_progress.pop();

    let text = constants
        .into_iter()
        .chain(fields)
        .collect::<Vec<_>>()
        .join("\n");
    Ok(hex::encode(md5::compute(text.as_bytes()).0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_simple_int() {
        let md5 = compute_md5sum("int32 data", "std_msgs/Int32").unwrap();
        assert_eq!(md5, "da5909fbe378aeaf85e547e830cc1bb7");
    }

    #[test]
    fn test_md5_string() {
        let md5 = compute_md5sum("string data", "std_msgs/String").unwrap();
        assert_eq!(md5, "992ce8a1687cec8c8bd883ec73ca41d1");
    }

    #[test]
    fn test_md5_vector3() {
        let md5 = compute_md5sum(
            "float64 x\nfloat64 y\nfloat64 z",
            "geometry_msgs/Vector3",
        )
        .unwrap();
        assert_eq!(md5, "4a842b65f413084dc2b10fb484ea7f17");
    }

    #[test]
    fn test_md5_header() {
        let md5 = compute_md5sum(
            "uint32 seq\ntime stamp\nstring frame_id",
            "std_msgs/Header",
        )
        .unwrap();
        assert_eq!(md5, "2176decaecbce78abc3b96ef049fabed");
    }

    #[test]
    fn test_md5_constants_come_first() {
        let md5 = compute_md5sum(
            "uint8 type\nuint8 TYPE_A=1\nuint8 TYPE_B=2",
            "test_msgs/ConstantMsg",
        )
        .unwrap();
        let expected = hex::encode(md5::compute(b"uint8 TYPE_A=1\nuint8 TYPE_B=2\nuint8 type").0);
        assert_eq!(md5, expected);
    }

    #[test]
    fn test_md5_nested_type_replaced() {
        let definition = "std_msgs/Header header\n\
            ================================================================================\n\
            MSG: std_msgs/Header\n\
            uint32 seq\n\
            time stamp\n\
            string frame_id";
        let md5 = compute_md5sum(definition, "test_msgs/WithHeader").unwrap();
        let expected =
            hex::encode(md5::compute(b"2176decaecbce78abc3b96ef049fabed header").0);
        assert_eq!(md5, expected);
    }

    #[test]
    fn test_md5_array_brackets_preserved() {
        let md5 = compute_md5sum("float64[] data", "test_msgs/Float64Array").unwrap();
        assert_eq!(md5, hex::encode(md5::compute(b"float64[] data").0));

        let md5 = compute_md5sum("float64[3] position", "test_msgs/FixedArray").unwrap();
        assert_eq!(md5, hex::encode(md5::compute(b"float64[3] position").0));
    }

    #[test]
    fn test_md5_comments_stripped() {
        let md5 = compute_md5sum("int32 data  # a comment", "test_msgs/WithComment").unwrap();
        assert_eq!(md5, hex::encode(md5::compute(b"int32 data").0));
    }

    #[test]
    fn test_md5_unresolved_dependency() {
        let err = compute_md5sum("other_msgs/Missing field", "test_msgs/Broken").unwrap_err();
        match err {
            crate::core::Error::Schema(SchemaError::Unresolved { type_name }) => {
                assert_eq!(type_name, "other_msgs/Missing");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_basic_schema() {
        let parsed = parse_ros1msg(
            "geometry_msgs/Vector3",
            "float64 x\nfloat64 y\nfloat64 z",
        )
        .unwrap();
        assert_eq!(parsed.root.name, "geometry_msgs/Vector3");
        assert_eq!(parsed.root.entries.len(), 3);
        assert!(parsed.dependencies.is_empty());
    }

    #[test]
    fn test_parse_header_resolution() {
        let parsed = parse_ros1msg(
            "nav_msgs/Odometry",
            "Header header\n\
             ================================================================================\n\
             MSG: std_msgs/Header\n\
             uint32 seq\n\
             time stamp\n\
             string frame_id",
        )
        .unwrap();
        let (_, entry) = &parsed.root.entries[0];
        match entry {
            SchemaEntry::Field {
                ty: FieldType::Complex(name),
                ..
            } => assert_eq!(name, "std_msgs/Header"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(parsed.dependencies.contains_key("std_msgs/Header"));
    }

    #[test]
    fn test_parse_bare_name_uses_package() {
        let parsed = parse_ros1msg("my_msgs/Outer", "Inner child\n").unwrap();
        match &parsed.root.entries[0].1 {
            SchemaEntry::Field {
                ty: FieldType::Complex(name),
                ..
            } => assert_eq!(name, "my_msgs/Inner"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_array_types() {
        let parsed = parse_ros1msg(
            "test_msgs/Arrays",
            "int32[5] fixed\nfloat32[] dynamic\nuint8[] blob",
        )
        .unwrap();
        match &parsed.root.entries[0].1 {
            SchemaEntry::Field {
                ty: FieldType::Array { length, .. },
                ..
            } => assert_eq!(*length, 5),
            other => panic!("unexpected: {other:?}"),
        }
        match &parsed.root.entries[1].1 {
            SchemaEntry::Field {
                ty: FieldType::Sequence { bound: None, .. },
                ..
            } => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_constant_range_checked() {
        let err = parse_ros1msg("test_msgs/Bad", "uint8 BIG=300").unwrap_err();
        match err {
            crate::core::Error::Schema(SchemaError::InvalidConstant { name, .. }) => {
                assert_eq!(name, "BIG");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_byte_constant_accepts_255() {
        let parsed = parse_ros1msg("test_msgs/Byte", "byte MAX=255").unwrap();
        match &parsed.root.entries[0].1 {
            SchemaEntry::Constant { value, .. } => assert_eq!(*value, Value::UInt8(255)),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_field_names() {
        assert!(parse_ros1msg("t/T", "int32 double__underscore").is_err());
        assert!(parse_ros1msg("t/T", "int32 trailing_").is_err());
    }
}
