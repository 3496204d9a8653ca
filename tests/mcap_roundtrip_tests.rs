// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP write/read round-trip integration tests.
//!
//! Covers summary-backed reading, filter windows, log-time ordering,
//! attachments/metadata, compression codecs and append mode.

mod common;

use std::collections::BTreeMap;

use robolog::io::Compression;
use robolog::mcap::records::{AttachmentRecord, MetadataRecord};
use robolog::mcap::{McapReader, McapWriteOptions, McapWriter, MessageFilter};

use common::temp_path;

fn write_two_channel_file(
    path: &std::path::Path,
    options: McapWriteOptions,
) -> (u16, u16) {
    let mut writer = McapWriter::create_with_options(path, options).unwrap();
    let schema = writer
        .add_schema("std_msgs/msg/String", "ros2msg", b"string data")
        .unwrap();
    let a = writer
        .add_channel("/a", "cdr", schema, BTreeMap::new())
        .unwrap();
    let b = writer
        .add_channel("/b", "cdr", schema, BTreeMap::new())
        .unwrap();
    writer.write_message(a, None, 1, None, b"a-1").unwrap();
    writer.write_message(b, None, 2, None, b"b-2").unwrap();
    writer.write_message(a, None, 3, None, b"a-3").unwrap();
    writer.finish().unwrap();
    (a, b)
}

#[test]
fn test_summary_backed_round_trip() {
    let (path, _guard) = temp_path("roundtrip", "basic.mcap");
    write_two_channel_file(&path, McapWriteOptions::default());

    let mut reader = McapReader::open(&path).unwrap();
    assert!(reader.has_summary());
    assert_eq!(reader.channels().len(), 2);
    assert_eq!(reader.schemas().len(), 1);
    assert_eq!(reader.message_count(), 3);
    assert_eq!(reader.start_time(), Some(1));
    assert_eq!(reader.end_time(), Some(3));

    let messages: Vec<_> = reader
        .messages(MessageFilter::default())
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].message.data, b"a-1");
    assert_eq!(messages[1].message.data, b"b-2");
    assert_eq!(messages[2].message.data, b"a-3");
}

#[test]
fn test_topic_filter_and_time_window() {
    let (path, _guard) = temp_path("roundtrip", "filtered.mcap");
    write_two_channel_file(&path, McapWriteOptions::default());

    let mut reader = McapReader::open(&path).unwrap();
    let filter = MessageFilter {
        topics: Some(vec!["/a".to_string()]),
        ..Default::default()
    };
    let messages: Vec<_> = reader.messages(filter).collect::<Result<_, _>>().unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.topic == "/a"));

    // Upper bound is exclusive
    let filter = MessageFilter {
        start_time: Some(1),
        end_time: Some(3),
        ..Default::default()
    };
    let messages: Vec<_> = reader.messages(filter).collect::<Result<_, _>>().unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.message.log_time < 3));

    // Unknown topic yields an empty sequence
    let filter = MessageFilter {
        topics: Some(vec!["/missing".to_string()]),
        ..Default::default()
    };
    assert_eq!(reader.messages(filter).count(), 0);
}

#[test]
fn test_log_time_order_across_single_message_chunks() {
    let (path, _guard) = temp_path("roundtrip", "ordered.mcap");
    // One-byte threshold: every message gets its own chunk
    let options = McapWriteOptions::default().with_chunk_size(1);
    write_two_channel_file(&path, options);

    let mut reader = McapReader::open(&path).unwrap();
    assert_eq!(reader.statistics().chunk_count, 3);

    let filter = MessageFilter {
        in_log_time_order: true,
        ..Default::default()
    };
    let messages: Vec<_> = reader.messages(filter).collect::<Result<_, _>>().unwrap();
    let sequence: Vec<(String, u64)> = messages
        .iter()
        .map(|m| (m.topic.clone(), m.message.log_time))
        .collect();
    assert_eq!(
        sequence,
        vec![
            ("/a".to_string(), 1),
            ("/b".to_string(), 2),
            ("/a".to_string(), 3),
        ]
    );

    // Monotonic non-decreasing log times
    for pair in messages.windows(2) {
        assert!(pair[0].message.log_time <= pair[1].message.log_time);
    }
}

#[test]
fn test_all_compression_codecs_round_trip() {
    for compression in [Compression::None, Compression::Lz4, Compression::Zstd] {
        let (path, _guard) = temp_path("roundtrip", "compressed.mcap");
        let options = McapWriteOptions::default().with_compression(compression);
        write_two_channel_file(&path, options);

        let mut reader = McapReader::open(&path).unwrap();
        let messages: Vec<_> = reader
            .messages(MessageFilter::default())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(messages.len(), 3, "{compression:?}");
        assert_eq!(messages[0].message.data, b"a-1");
    }
}

#[test]
fn test_attachments_and_metadata_round_trip() {
    let (path, _guard) = temp_path("roundtrip", "extras.mcap");
    let mut writer = McapWriter::create(&path).unwrap();
    let schema = writer
        .add_schema("std_msgs/msg/String", "ros2msg", b"string data")
        .unwrap();
    let channel = writer
        .add_channel("/a", "cdr", schema, BTreeMap::new())
        .unwrap();
    writer.write_message(channel, None, 1, None, b"x").unwrap();
    writer
        .write_attachment(AttachmentRecord {
            log_time: 10,
            create_time: 9,
            name: "calib.yaml".to_string(),
            media_type: "text/yaml".to_string(),
            data: b"fx: 1.0".to_vec(),
            crc: 0,
        })
        .unwrap();
    writer
        .write_metadata(MetadataRecord {
            name: "robot".to_string(),
            metadata: BTreeMap::from([("serial".to_string(), "A1".to_string())]),
        })
        .unwrap();
    writer.write_message(channel, None, 2, None, b"y").unwrap();
    writer.finish().unwrap();

    let mut reader = McapReader::open(&path).unwrap();
    assert_eq!(reader.statistics().attachment_count, 1);
    assert_eq!(reader.statistics().metadata_count, 1);
    // Chunks never cross attachment or metadata records
    assert_eq!(reader.statistics().chunk_count, 2);

    let attachments = reader.attachments().unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].name, "calib.yaml");
    assert_eq!(attachments[0].data, b"fx: 1.0");
    assert_ne!(attachments[0].crc, 0);

    let metadata = reader.metadata().unwrap();
    assert_eq!(metadata.len(), 1);
    assert_eq!(metadata[0].metadata.get("serial"), Some(&"A1".to_string()));

    let messages: Vec<_> = reader
        .messages(MessageFilter::default())
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(messages.len(), 2);
}

#[test]
fn test_append_mode_continues_file() {
    let (path, _guard) = temp_path("roundtrip", "append.mcap");
    write_two_channel_file(&path, McapWriteOptions::default());

    let mut writer =
        McapWriter::append(&path, McapWriteOptions::default()).unwrap();
    // Existing registrations survive: same content yields the same ids
    let schema = writer
        .add_schema("std_msgs/msg/String", "ros2msg", b"string data")
        .unwrap();
    assert_eq!(schema, 1);
    let a = writer
        .add_channel("/a", "cdr", schema, BTreeMap::new())
        .unwrap();
    assert_eq!(a, 0);
    writer.write_message(a, None, 4, None, b"a-4").unwrap();
    writer.finish().unwrap();

    let mut reader = McapReader::open(&path).unwrap();
    assert_eq!(reader.message_count(), 4);
    assert_eq!(reader.end_time(), Some(4));
    let messages: Vec<_> = reader
        .messages(MessageFilter::default())
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(messages.last().unwrap().message.data, b"a-4");
    // Per-channel sequence numbering continued from the prior counts
    assert_eq!(messages.last().unwrap().message.sequence, 2);

    // The re-seeded data-section CRC still verifies
    assert!(robolog::mcap::validate_crc(&path).unwrap());
}

#[test]
fn test_channel_metadata_preserved() {
    let (path, _guard) = temp_path("roundtrip", "chanmeta.mcap");
    let mut writer = McapWriter::create(&path).unwrap();
    let schema = writer
        .add_schema("std_msgs/msg/String", "ros2msg", b"string data")
        .unwrap();
    writer
        .add_channel(
            "/a",
            "cdr",
            schema,
            BTreeMap::from([("qos".to_string(), "reliable".to_string())]),
        )
        .unwrap();
    writer.finish().unwrap();

    let reader = McapReader::open(&path).unwrap();
    let channel = reader.channel_by_topic("/a").unwrap();
    assert_eq!(channel.metadata.get("qos"), Some(&"reliable".to_string()));
    assert_eq!(channel.schema_id, schema);
}
