// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decoder registry.
//!
//! Maps a channel's `(message_encoding, schema_encoding)` pair to a
//! decoder. The table is fixed at construction; unknown pairs surface
//! [`ContainerError::UnknownEncoding`] when the decoder is requested,
//! before any message is touched. `protobuf`, `json` and `ros2idl`
//! payloads pass through undecoded.

use std::sync::Arc;

use crate::core::{ContainerError, Result};
use crate::schema::{compile_schema, parse_ros1msg, parse_ros2msg, CompiledSchema, WireKind};

/// Known message encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageEncoding {
    /// CDR (ROS2)
    Cdr,
    /// ROS1 wire format
    Ros1,
    /// Protobuf (pass-through)
    Protobuf,
    /// JSON (pass-through)
    Json,
}

impl MessageEncoding {
    /// Parse a channel's message encoding string.
    pub fn try_from_str(s: &str) -> Option<Self> {
        match s {
            "cdr" => Some(MessageEncoding::Cdr),
            "ros1" => Some(MessageEncoding::Ros1),
            "protobuf" => Some(MessageEncoding::Protobuf),
            "json" => Some(MessageEncoding::Json),
            _ => None,
        }
    }
}

/// A decoder bound to one channel.
#[derive(Clone, Debug)]
pub enum DecoderKind {
    /// Compiled schema routine (CDR or ROS1)
    Compiled(Arc<CompiledSchema>),
    /// Identity: the payload is exposed as raw bytes
    Passthrough,
}

/// Registry of decoder factories, fixed at construction.
#[derive(Default)]
pub struct DecoderRegistry {
    _private: (),
}

impl DecoderRegistry {
    /// Create the registry with the builtin encoding table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an encoding pair is known.
    pub fn supports(&self, message_encoding: &str, schema_encoding: &str) -> bool {
        matches!(
            (message_encoding, schema_encoding),
            ("cdr", "ros2msg")
                | ("cdr", "ros2idl")
                | ("ros1", "ros1msg")
                | ("protobuf", "protobuf")
                | ("json", "jsonschema")
                | (_, "")
        )
    }

    /// Build the decoder for a channel.
    ///
    /// `schema_name` and `schema_text` come from the channel's Schema
    /// record; channels without a schema get a pass-through decoder.
    pub fn build(
        &self,
        message_encoding: &str,
        schema_encoding: &str,
        schema_name: &str,
        schema_text: &[u8],
    ) -> Result<DecoderKind> {
        match (message_encoding, schema_encoding) {
            ("cdr", "ros2msg") => {
                let text = String::from_utf8_lossy(schema_text);
                let parsed = parse_ros2msg(schema_name, &text)?;
                Ok(DecoderKind::Compiled(Arc::new(compile_schema(
                    &parsed,
                    WireKind::Cdr,
                )?)))
            }
            ("ros1", "ros1msg") => {
                let text = String::from_utf8_lossy(schema_text);
                let parsed = parse_ros1msg(schema_name, &text)?;
                Ok(DecoderKind::Compiled(Arc::new(compile_schema(
                    &parsed,
                    WireKind::Ros1,
                )?)))
            }
            // IDL, protobuf and JSON schemas are not compiled; payloads
            // pass through as raw bytes.
            ("cdr", "ros2idl") | ("protobuf", "protobuf") | ("json", "jsonschema") | (_, "") => {
                Ok(DecoderKind::Passthrough)
            }
            (message_encoding, schema_encoding) => Err(ContainerError::UnknownEncoding {
                message_encoding: message_encoding.to_string(),
                schema_encoding: schema_encoding.to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_pairs() {
        let registry = DecoderRegistry::new();
        assert!(registry.supports("cdr", "ros2msg"));
        assert!(registry.supports("ros1", "ros1msg"));
        assert!(registry.supports("protobuf", "protobuf"));
        assert!(registry.supports("json", "jsonschema"));
        assert!(!registry.supports("cdr", "ros1msg"));
    }

    #[test]
    fn test_build_compiled_cdr() {
        let registry = DecoderRegistry::new();
        let decoder = registry
            .build(
                "cdr",
                "ros2msg",
                "geometry_msgs/msg/Vector3",
                b"float64 x\nfloat64 y\nfloat64 z",
            )
            .unwrap();
        match decoder {
            DecoderKind::Compiled(compiled) => {
                assert_eq!(compiled.wire(), WireKind::Cdr);
            }
            DecoderKind::Passthrough => panic!("expected a compiled decoder"),
        }
    }

    #[test]
    fn test_unknown_pair_surfaces_eagerly() {
        let registry = DecoderRegistry::new();
        match registry.build("flatbuffer", "flatbuffer", "X", b"") {
            Err(crate::core::Error::Container(ContainerError::UnknownEncoding {
                message_encoding,
                ..
            })) => assert_eq!(message_encoding, "flatbuffer"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_passthrough_pairs() {
        let registry = DecoderRegistry::new();
        for (msg, schema) in [
            ("protobuf", "protobuf"),
            ("json", "jsonschema"),
            ("cdr", "ros2idl"),
        ] {
            match registry.build(msg, schema, "X", b"ignored").unwrap() {
                DecoderKind::Passthrough => {}
                DecoderKind::Compiled(_) => panic!("expected pass-through for {msg}/{schema}"),
            }
        }
    }
}
