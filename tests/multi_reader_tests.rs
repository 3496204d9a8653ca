// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Multi-file reader integration tests.
//!
//! Several MCAP files read as one virtual log: aggregated statistics and
//! a log-time merge across the per-file streams, with no output file.

mod common;

use std::collections::BTreeMap;
use std::path::Path;

use robolog::mcap::{McapReader, McapWriteOptions, McapWriter, MessageFilter, MultiMcapReader};

use common::temp_path;

fn write_chatter_file(path: &Path, entries: &[(u64, &[u8])]) {
    // One-byte threshold: every message gets its own chunk
    let options = McapWriteOptions::default().with_chunk_size(1);
    let mut writer = McapWriter::create_with_options(path, options).unwrap();
    let schema = writer
        .add_schema("std_msgs/msg/String", "ros2msg", b"string data")
        .unwrap();
    let channel = writer
        .add_channel("/chatter", "cdr", schema, BTreeMap::new())
        .unwrap();
    for (log_time, payload) in entries {
        writer
            .write_message(channel, None, *log_time, None, payload)
            .unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn test_read_multiple_files_as_one() {
    let (file1, guard) = temp_path("multi", "one.mcap");
    let file2 = guard.path("two.mcap");

    write_chatter_file(&file1, &[(1, b"hello"), (3, b"again")]);
    write_chatter_file(&file2, &[(2, b"world"), (4, b"!!")]);

    let mut reader = McapReader::open_many(&[&file1, &file2]).unwrap();
    assert_eq!(reader.message_count(), 4);
    assert_eq!(reader.topic_message_count("/chatter"), 4);
    assert_eq!(reader.topics(), vec!["/chatter".to_string()]);
    assert_eq!(reader.start_time(), Some(1));
    assert_eq!(reader.end_time(), Some(4));
    assert_eq!(reader.duration(), 3);

    // The per-file streams interleave into log-time order
    let payloads: Vec<Vec<u8>> = reader
        .messages(MessageFilter::default())
        .map(|m| m.unwrap().message.data)
        .collect();
    assert_eq!(payloads, vec![b"hello".to_vec(), b"world".to_vec(), b"again".to_vec(), b"!!".to_vec()]);
}

#[test]
fn test_merge_is_monotonic_and_filters_apply() {
    let (file1, guard) = temp_path("multi", "a.mcap");
    let file2 = guard.path("b.mcap");

    write_chatter_file(&file1, &[(10, b"m10"), (30, b"m30"), (50, b"m50")]);
    write_chatter_file(&file2, &[(20, b"m20"), (40, b"m40"), (60, b"m60")]);

    let mut reader = MultiMcapReader::open(&[&file1, &file2]).unwrap();

    // Upper bound stays exclusive across the merge
    let filter = MessageFilter {
        start_time: Some(20),
        end_time: Some(60),
        ..Default::default()
    };
    let times: Vec<u64> = reader
        .messages(filter)
        .map(|m| m.unwrap().message.log_time)
        .collect();
    assert_eq!(times, vec![20, 30, 40, 50]);
    for pair in times.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
}

#[test]
fn test_equal_timestamps_keep_file_order() {
    let (file1, guard) = temp_path("multi", "first.mcap");
    let file2 = guard.path("second.mcap");

    write_chatter_file(&file1, &[(5, b"first")]);
    write_chatter_file(&file2, &[(5, b"second")]);

    let mut reader = MultiMcapReader::open(&[&file1, &file2]).unwrap();
    let payloads: Vec<Vec<u8>> = reader
        .messages(MessageFilter::default())
        .map(|m| m.unwrap().message.data)
        .collect();
    assert_eq!(payloads, vec![b"first".to_vec(), b"second".to_vec()]);
}

#[test]
fn test_unknown_topic_is_empty_across_files() {
    let (file1, guard) = temp_path("multi", "x.mcap");
    let file2 = guard.path("y.mcap");

    write_chatter_file(&file1, &[(1, b"a")]);
    write_chatter_file(&file2, &[(2, b"b")]);

    let mut reader = MultiMcapReader::open(&[&file1, &file2]).unwrap();
    let filter = MessageFilter {
        topics: Some(vec!["/missing".to_string()]),
        ..Default::default()
    };
    assert_eq!(reader.messages(filter).count(), 0);
    assert_eq!(reader.topic_message_count("/missing"), 0);
}
