// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Chunk assembly and the decompressed-chunk cache.
//!
//! The writer owns one active [`ChunkBuilder`]: message records are
//! serialized into its buffer and indexed per channel as
//! `(log_time, local_offset)` pairs. On flush the buffer is compressed
//! into a Chunk record. Readers keep a small LRU of decompressed chunks
//! keyed by `chunk_start_offset`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::{ContainerError, Result};
use crate::io::{ByteWriter, BytesWriter, Compression};
use crate::mcap::records::{write_record, ChunkRecord, MessageRecord, Record};

/// Accumulates message records for the active chunk.
pub struct ChunkBuilder {
    buffer: BytesWriter,
    message_start_time: u64,
    message_end_time: u64,
    per_channel_index: BTreeMap<u16, Vec<(u64, u64)>>,
    message_count: u64,
    last_channel: Option<u16>,
}

impl Default for ChunkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            buffer: BytesWriter::new(),
            message_start_time: u64::MAX,
            message_end_time: 0,
            per_channel_index: BTreeMap::new(),
            message_count: 0,
            last_channel: None,
        }
    }

    /// Whether any message has been buffered.
    pub fn is_empty(&self) -> bool {
        self.message_count == 0
    }

    /// Uncompressed size of the buffered records.
    pub fn size(&self) -> usize {
        self.buffer.size()
    }

    /// Number of buffered messages.
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Channel of the most recently buffered message.
    pub fn last_channel(&self) -> Option<u16> {
        self.last_channel
    }

    /// Serialize a message record into the chunk and index it.
    pub fn add_message(&mut self, message: &MessageRecord) -> Result<()> {
        let local_offset = self.buffer.tell();
        write_record(&mut self.buffer, &Record::Message(message.clone()))?;

        self.message_start_time = self.message_start_time.min(message.log_time);
        self.message_end_time = self.message_end_time.max(message.log_time);
        self.per_channel_index
            .entry(message.channel_id)
            .or_default()
            .push((message.log_time, local_offset));
        self.message_count += 1;
        self.last_channel = Some(message.channel_id);
        Ok(())
    }

    /// Compress the buffered records into a Chunk record and reset.
    ///
    /// Returns the record, the per-channel message index and the message
    /// count. `uncompressed_crc` is 0 when `crc_enabled` is false.
    pub fn finish(
        &mut self,
        compression: Compression,
        crc_enabled: bool,
    ) -> Result<(ChunkRecord, BTreeMap<u16, Vec<(u64, u64)>>, u64)> {
        let uncompressed = std::mem::take(&mut self.buffer).into_bytes();
        let uncompressed_crc = if crc_enabled {
            crc32fast::hash(&uncompressed)
        } else {
            0
        };
        let records = compression.compress(&uncompressed)?;

        let chunk = ChunkRecord {
            message_start_time: self.message_start_time,
            message_end_time: self.message_end_time,
            uncompressed_size: uncompressed.len() as u64,
            uncompressed_crc,
            compression: compression.as_mcap_str()?.to_string(),
            records,
        };
        let index = std::mem::take(&mut self.per_channel_index);
        let count = self.message_count;

        self.message_start_time = u64::MAX;
        self.message_end_time = 0;
        self.message_count = 0;
        self.last_channel = None;

        Ok((chunk, index, count))
    }
}

/// Decompress a chunk's record stream, optionally verifying its CRC.
///
/// `uncompressed_crc == 0` means "not computed" and is always skipped.
pub fn decompress_chunk(
    chunk: &ChunkRecord,
    chunk_start_offset: u64,
    verify_crc: bool,
) -> Result<Vec<u8>> {
    let compression = Compression::from_mcap_str(&chunk.compression)?;
    let records = compression.decompress(&chunk.records, chunk.uncompressed_size as usize)?;
    if verify_crc && chunk.uncompressed_crc != 0 {
        let actual = crc32fast::hash(&records);
        if actual != chunk.uncompressed_crc {
            return Err(ContainerError::ChunkCrc { chunk_start_offset }.into());
        }
    }
    Ok(records)
}

/// LRU cache of decompressed chunks keyed by `chunk_start_offset`.
pub struct ChunkCache {
    capacity: usize,
    entries: Vec<(u64, Arc<Vec<u8>>)>,
}

impl ChunkCache {
    /// Create a cache holding up to `capacity` decompressed chunks.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
        }
    }

    /// Fetch a cached chunk and mark it most recently used.
    pub fn get(&mut self, chunk_start_offset: u64) -> Option<Arc<Vec<u8>>> {
        let index = self
            .entries
            .iter()
            .position(|(offset, _)| *offset == chunk_start_offset)?;
        let entry = self.entries.remove(index);
        let data = Arc::clone(&entry.1);
        self.entries.insert(0, entry);
        Some(data)
    }

    /// Insert a decompressed chunk, evicting the least recently used.
    pub fn insert(&mut self, chunk_start_offset: u64, data: Arc<Vec<u8>>) {
        if self.capacity == 0 {
            return;
        }
        self.entries
            .retain(|(offset, _)| *offset != chunk_start_offset);
        self.entries.insert(0, (chunk_start_offset, data));
        if self.entries.len() > self.capacity {
            let evicted = self.entries.pop();
            if let Some((offset, _)) = evicted {
                tracing::debug!(chunk_start_offset = offset, "chunk cache eviction");
            }
        }
    }

    /// Number of cached chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(channel_id: u16, log_time: u64) -> MessageRecord {
        MessageRecord {
            channel_id,
            sequence: 0,
            log_time,
            publish_time: log_time,
            data: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_builder_indexes_per_channel() {
        let mut builder = ChunkBuilder::new();
        builder.add_message(&message(0, 10)).unwrap();
        builder.add_message(&message(1, 20)).unwrap();
        builder.add_message(&message(0, 30)).unwrap();
        assert_eq!(builder.message_count(), 3);
        assert_eq!(builder.last_channel(), Some(0));

        let (chunk, index, count) = builder
            .finish(Compression::None, true)
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(chunk.message_start_time, 10);
        assert_eq!(chunk.message_end_time, 30);
        assert_eq!(index[&0].len(), 2);
        assert_eq!(index[&1].len(), 1);
        // Offsets point at record starts inside the uncompressed stream
        assert_eq!(index[&0][0].1, 0);
        assert!(index[&1][0].1 > 0);
        assert!(builder.is_empty());
    }

    #[test]
    fn test_chunk_crc_round_trip() {
        let mut builder = ChunkBuilder::new();
        builder.add_message(&message(0, 1)).unwrap();
        let (chunk, _, _) = builder.finish(Compression::Lz4, true).unwrap();
        assert_ne!(chunk.uncompressed_crc, 0);

        let records = decompress_chunk(&chunk, 0, true).unwrap();
        assert_eq!(crc32fast::hash(&records), chunk.uncompressed_crc);
    }

    #[test]
    fn test_corrupt_chunk_detected() {
        let mut builder = ChunkBuilder::new();
        builder.add_message(&message(0, 1)).unwrap();
        let (mut chunk, _, _) = builder.finish(Compression::None, true).unwrap();
        chunk.records[0] ^= 0xFF;

        match decompress_chunk(&chunk, 42, true) {
            Err(crate::core::Error::Container(ContainerError::ChunkCrc {
                chunk_start_offset,
            })) => assert_eq!(chunk_start_offset, 42),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_zero_crc_skipped_on_verify() {
        let mut builder = ChunkBuilder::new();
        builder.add_message(&message(0, 1)).unwrap();
        let (mut chunk, _, _) = builder.finish(Compression::None, false).unwrap();
        assert_eq!(chunk.uncompressed_crc, 0);
        chunk.records[0] ^= 0xFF;
        // CRC sentinel 0 means no verification
        assert!(decompress_chunk(&chunk, 0, true).is_ok());
    }

    #[test]
    fn test_cache_lru_eviction() {
        let mut cache = ChunkCache::new(2);
        cache.insert(1, Arc::new(vec![1]));
        cache.insert(2, Arc::new(vec![2]));
        // Touch 1 so 2 becomes the eviction candidate
        assert!(cache.get(1).is_some());
        cache.insert(3, Arc::new(vec![3]));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(2).is_none());
        assert!(cache.get(1).is_some());
        assert!(cache.get(3).is_some());
    }
}
