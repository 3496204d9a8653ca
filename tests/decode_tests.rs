// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! End-to-end encode/decode tests through the container layer.

mod common;

use std::collections::BTreeMap;

use robolog::core::{DecodedMessage, Value};
use robolog::mcap::{McapReader, McapWriteOptions, McapWriter, MessageFilter};
use robolog::schema::{compile_schema, parse_ros2msg, SchemaCodec, WireKind};

use common::temp_path;

const VECTOR3_SCHEMA: &str = "float64 x\nfloat64 y\nfloat64 z";

fn vector3(x: f64, y: f64, z: f64) -> DecodedMessage {
    let mut fields = DecodedMessage::new();
    fields.insert("x".to_string(), Value::Float64(x));
    fields.insert("y".to_string(), Value::Float64(y));
    fields.insert("z".to_string(), Value::Float64(z));
    fields
}

#[test]
fn test_cdr_messages_decode_through_reader() {
    let (path, _guard) = temp_path("decode", "vectors.mcap");

    // The write-side cache compiles once per message type
    let parsed = parse_ros2msg("geometry_msgs/msg/Vector3", VECTOR3_SCHEMA).unwrap();
    let mut codec = SchemaCodec::new(WireKind::Cdr);
    let compiled = codec.get_or_compile(&parsed).unwrap();
    assert_eq!(codec.len(), 1);

    let options = McapWriteOptions::default().with_profile("ros2");
    let mut writer = McapWriter::create_with_options(&path, options).unwrap();
    let schema = writer
        .add_schema("geometry_msgs/msg/Vector3", "ros2msg", VECTOR3_SCHEMA.as_bytes())
        .unwrap();
    let channel = writer
        .add_channel("/velocity", "cdr", schema, BTreeMap::new())
        .unwrap();

    let inputs = [
        vector3(1.0, 2.0, 3.0),
        vector3(-0.5, 0.25, 1e9),
        vector3(0.0, 0.0, 0.0),
    ];
    for (t, message) in inputs.iter().enumerate() {
        let payload = compiled.encode(message).unwrap();
        // 4-byte header plus three unpadded doubles
        assert_eq!(payload.len(), 28);
        writer
            .write_message(channel, None, t as u64, None, &payload)
            .unwrap();
    }
    writer.finish().unwrap();

    let mut reader = McapReader::open(&path).unwrap();
    assert_eq!(reader.profile(), "ros2");
    let decoded: Vec<_> = reader
        .decoded_messages(MessageFilter::default())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(decoded.len(), 3);
    for ((value, _message), expected) in decoded.iter().zip(&inputs) {
        assert_eq!(value, &Value::Struct(expected.clone()));
    }
}

#[test]
fn test_passthrough_channels_yield_raw_bytes() {
    let (path, _guard) = temp_path("decode", "passthrough.mcap");

    let mut writer = McapWriter::create(&path).unwrap();
    let schema = writer
        .add_schema("foo.Bar", "protobuf", b"\x0a\x03Bar")
        .unwrap();
    let channel = writer
        .add_channel("/proto", "protobuf", schema, BTreeMap::new())
        .unwrap();
    writer
        .write_message(channel, None, 1, None, b"\x08\x2a")
        .unwrap();
    writer.finish().unwrap();

    let mut reader = McapReader::open(&path).unwrap();
    let decoded: Vec<_> = reader
        .decoded_messages(MessageFilter::default())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].0, Value::Bytes(b"\x08\x2a".to_vec()));
}

#[test]
fn test_unknown_encoding_pair_fails_eagerly() {
    let (path, _guard) = temp_path("decode", "badenc.mcap");

    let mut writer = McapWriter::create(&path).unwrap();
    let schema = writer.add_schema("X", "flatzebra", b"???").unwrap();
    let channel = writer
        .add_channel("/weird", "flatzebra", schema, BTreeMap::new())
        .unwrap();
    writer.write_message(channel, None, 1, None, b"x").unwrap();
    writer.finish().unwrap();

    let mut reader = McapReader::open(&path).unwrap();
    // The decoder registry rejects the pair before any message is read
    match reader.decoded_messages(MessageFilter::default()) {
        Err(robolog::Error::Container(robolog::ContainerError::UnknownEncoding {
            message_encoding,
            ..
        })) => assert_eq!(message_encoding, "flatzebra"),
        other => {
            let _ = other.map(|_| ());
            panic!("expected UnknownEncoding");
        }
    }
}

#[test]
fn test_fixed_array_length_enforced_on_encode() {
    let parsed = parse_ros2msg("test_msgs/msg/Fixed", "int32[5] data").unwrap();
    let compiled = compile_schema(&parsed, WireKind::Cdr).unwrap();

    let mut message = DecodedMessage::new();
    message.insert(
        "data".to_string(),
        Value::Array(vec![Value::Int32(1), Value::Int32(2)]),
    );
    match compiled.encode(&message) {
        Err(robolog::Error::Schema(robolog::SchemaError::ArraySize { expected, actual })) => {
            assert_eq!((expected, actual), (5, 2));
        }
        other => {
            let _ = other.map(|_| ());
            panic!("expected ArraySize");
        }
    }
}

#[test]
fn test_schemaless_channel_passes_through() {
    let (path, _guard) = temp_path("decode", "schemaless.mcap");

    let mut writer = McapWriter::create(&path).unwrap();
    // Schema id 0 means "no schema"
    let channel = writer
        .add_channel("/raw", "json", 0, BTreeMap::new())
        .unwrap();
    writer
        .write_message(channel, None, 1, None, b"{\"v\":1}")
        .unwrap();
    writer.finish().unwrap();

    let mut reader = McapReader::open(&path).unwrap();
    let decoded: Vec<_> = reader
        .decoded_messages(MessageFilter::default())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].0, Value::Bytes(b"{\"v\":1}".to_vec()));
}
