// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS2 `.msg` schema parser.
//!
//! Same block structure as ROS1 (`=` x 80 separators, `MSG:` headers),
//! with ROS2 extensions: `wstring`, bounded strings (`string<=N`),
//! bounded sequences (`T[<=N]`) and field default literals. Type
//! references use `pkg/msg/Name`; text written as `pkg/Name` is
//! normalised to `pkg/msg/Name`.

use std::collections::HashMap;

use crate::core::{Result, SchemaError, Value};
use crate::schema::ros1msg::literal_to_value;
use crate::schema::{
    split_schema_text, FieldType, ParsedSchema, PrimitiveKind, Schema, SchemaEntry, StringKind,
};

/// Normalise a ROS2 type reference to `pkg/msg/Name`.
pub(crate) fn normalize_type_name(name: &str, package: &str) -> String {
    let parts: Vec<&str> = name.split('/').collect();
    match parts.as_slice() {
        [bare] => format!("{package}/msg/{bare}"),
        [pkg, name] => format!("{pkg}/msg/{name}"),
        _ => name.to_string(),
    }
}

/// Parse a ROS2 field type token.
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

    for (prefix, kind) in [("string", StringKind::String), ("wstring", StringKind::WString)] {
        if token == prefix {
            return Ok(FieldType::String {
                kind,
                max_len: None,
            });
        }
        if let Some(bound) = token.strip_prefix(prefix).and_then(|s| s.strip_prefix("<=")) {
            let max_len = bound.parse().map_err(|_| SchemaError::Parse {
                line: token.to_string(),
                reason: "malformed string bound".to_string(),
            })?;
            return Ok(FieldType::String {
                kind,
                max_len: Some(max_len),
            });
        }
    }

    if let Some(kind) = PrimitiveKind::try_from_str(token) {
        return Ok(FieldType::Primitive(kind));
    }
    Ok(FieldType::Complex(normalize_type_name(token, package)))
}

/// Parse a default literal for a field type.
fn parse_default(ty: &FieldType, name: &str, raw: &str) -> Result<Value> {
    match ty {
        FieldType::Array { element, .. } | FieldType::Sequence { element, .. } => {
            let inner = raw
                .trim()
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .ok_or_else(|| SchemaError::Parse {
                    line: raw.to_string(),
                    reason: format!("malformed array default for '{name}'"),
                })?;
            let mut values = Vec::new();
            for item in inner.split(',') {
                let item = item.trim();
                if item.is_empty() {
                    continue;
                }
                values.push(literal_to_value(element, name, item)?);
            }
            Ok(Value::Array(values))
        }
        other => literal_to_value(other, name, raw),
    }
}

fn is_constant_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Parse one schema line into an entry.
fn parse_entry(line: &str, package: &str) -> Result<(String, SchemaEntry)> {
    let mut parts = line.splitn(2, char::is_whitespace);
    let ty_token = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();
    if ty_token.is_empty() || rest.is_empty() {
        return Err(SchemaError::Parse {
            line: line.to_string(),
            reason: "expected '<type> <name>'".to_string(),
        }
        .into());
    }

    // Constant: NAME=value with an upper-snake name
    if let Some(eq) = rest.find('=') {
        let name = rest[..eq].trim();
        if is_constant_name(name) {
            let ty = parse_field_type(ty_token, package)?;
            let value = literal_to_value(&ty, name, rest[eq + 1..].trim())?;
            return Ok((name.to_string(), SchemaEntry::Constant { ty, value }));
        }
    }

    // Field, optionally followed by a default literal
    let mut field_parts = rest.splitn(2, char::is_whitespace);
    let name = field_parts.next().unwrap_or_default().to_string();
    let default_raw = field_parts.next().map(str::trim).filter(|s| !s.is_empty());

    let ty = parse_field_type(ty_token, package)?;
    let default = default_raw
        .map(|raw| parse_default(&ty, &name, raw))
        .transpose()?;
    Ok((name, SchemaEntry::Field { ty, default }))
}

/// Parse a ROS2 `.msg` definition into a schema and its dependencies.
pub fn parse_ros2msg(name: &str, definition: &str) -> Result<ParsedSchema> {
    let package = name.split('/').next().unwrap_or_default().to_string();
    let root_name = normalize_type_name(name, &package);
    let (root_lines, dep_blocks) = split_schema_text(definition)?;

    let mut root = Schema::new(root_name);
    for line in root_lines {
        let (field_name, entry) = parse_entry(line, &package)?;
        root.push(field_name, entry)?;
    }

    let mut dependencies = HashMap::new();
    for (dep_name, lines) in dep_blocks {
        // Bare dependency names resolve against the root package
        let dep_package = if dep_name.contains('/') {
            dep_name.split('/').next().unwrap_or(&package).to_string()
        } else {
            package.clone()
        };
        let full = normalize_type_name(&dep_name, &dep_package);

        let mut schema = Schema::new(full.clone());
        for line in lines {
            let (field_name, entry) = parse_entry(line, &dep_package)?;
            schema.push(field_name, entry)?;
        }
        dependencies.insert(full, schema);
    }

    Ok(ParsedSchema { root, dependencies })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_type_name() {
        assert_eq!(
            normalize_type_name("std_msgs/Header", "x"),
            "std_msgs/msg/Header"
        );
        assert_eq!(
            normalize_type_name("std_msgs/msg/Header", "x"),
            "std_msgs/msg/Header"
        );
        assert_eq!(normalize_type_name("Inner", "my_msgs"), "my_msgs/msg/Inner");
    }

    #[test]
    fn test_parse_basic() {
        let parsed = parse_ros2msg(
            "geometry_msgs/msg/Vector3",
            "float64 x\nfloat64 y\nfloat64 z",
        )
        .unwrap();
        assert_eq!(parsed.root.name, "geometry_msgs/msg/Vector3");
        assert_eq!(parsed.root.entries.len(), 3);
    }

    #[test]
    fn test_parse_defaults() {
        let parsed = parse_ros2msg(
            "test_msgs/msg/Defaults",
            "uint8 battery 100\nstring label \"base\"\nint32[] samples [1, 2, 3]",
        )
        .unwrap();
        match &parsed.root.entries[0].1 {
            SchemaEntry::Field { default, .. } => {
                assert_eq!(default.as_ref(), Some(&Value::UInt8(100)))
            }
            other => panic!("unexpected: {other:?}"),
        }
        match &parsed.root.entries[1].1 {
            SchemaEntry::Field { default, .. } => {
                assert_eq!(default.as_ref(), Some(&Value::String("base".to_string())))
            }
            other => panic!("unexpected: {other:?}"),
        }
        match &parsed.root.entries[2].1 {
            SchemaEntry::Field { default, .. } => assert_eq!(
                default.as_ref(),
                Some(&Value::Array(vec![
                    Value::Int32(1),
                    Value::Int32(2),
                    Value::Int32(3)
                ]))
            ),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_bounded_types() {
        let parsed = parse_ros2msg(
            "test_msgs/msg/Bounded",
            "string<=10 name\nint32[<=5] window\nwstring note",
        )
        .unwrap();
        match &parsed.root.entries[0].1 {
            SchemaEntry::Field {
                ty: FieldType::String { max_len, .. },
                ..
            } => assert_eq!(*max_len, Some(10)),
            other => panic!("unexpected: {other:?}"),
        }
        match &parsed.root.entries[1].1 {
            SchemaEntry::Field {
                ty: FieldType::Sequence { bound, .. },
                ..
            } => assert_eq!(*bound, Some(5)),
            other => panic!("unexpected: {other:?}"),
        }
        match &parsed.root.entries[2].1 {
            SchemaEntry::Field {
                ty:
                    FieldType::String {
                        kind: StringKind::WString,
                        ..
                    },
                ..
            } => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_dependency_normalised() {
        let parsed = parse_ros2msg(
            "nav_msgs/msg/Odometry",
            "std_msgs/Header header\n\
             ================================================================================\n\
             MSG: std_msgs/Header\n\
             builtin_interfaces/Time stamp\n\
             string frame_id\n\
             ================================================================================\n\
             MSG: builtin_interfaces/Time\n\
             int32 sec\n\
             uint32 nanosec",
        )
        .unwrap();
        match &parsed.root.entries[0].1 {
            SchemaEntry::Field {
                ty: FieldType::Complex(name),
                ..
            } => assert_eq!(name, "std_msgs/msg/Header"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(parsed.dependencies.contains_key("std_msgs/msg/Header"));
        assert!(parsed
            .dependencies
            .contains_key("builtin_interfaces/msg/Time"));
    }

    #[test]
    fn test_constant_still_parses() {
        let parsed = parse_ros2msg("test_msgs/msg/C", "uint8 KIND_A=1\nuint8 kind").unwrap();
        match &parsed.root.entries[0].1 {
            SchemaEntry::Constant { value, .. } => assert_eq!(*value, Value::UInt8(1)),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
