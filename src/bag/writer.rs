// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 bag writer.
//!
//! Connections and messages are buffered into an active chunk;
//! IndexData records follow each chunk. Finalization writes the index
//! section (connections, then chunk infos) and rewrites the bag header
//! record in place with the real index position.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::core::{ContainerError, Result};
use crate::io::{AppendFileWriter, ByteWriter, BytesWriter, Compression, FileWriter};
use crate::bag::records::{
    write_bag_record, BagChunkRecord, BagHeaderRecord, BagRecord, ChunkInfoRecord,
    ConnectionHeader, ConnectionRecord, IndexDataRecord, MessageDataRecord, BAG_MAGIC,
};
use crate::schema::compute_md5sum;

/// Default uncompressed chunk size threshold (768 KiB, the classic
/// rosbag default).
pub const DEFAULT_BAG_CHUNK_SIZE: usize = 768 * 1024;

/// Bag writer configuration.
#[derive(Debug, Clone)]
pub struct BagWriteOptions {
    /// Chunk compression (`none`, `bz2` or `lz4`)
    pub compression: Compression,
    /// Uncompressed chunk size threshold in bytes
    pub chunk_size: usize,
}

impl Default for BagWriteOptions {
    fn default() -> Self {
        Self {
            compression: Compression::None,
            chunk_size: DEFAULT_BAG_CHUNK_SIZE,
        }
    }
}

impl BagWriteOptions {
    /// Set the chunk compression; zstd is rejected for bag files.
    pub fn with_compression(mut self, compression: Compression) -> Result<Self> {
        compression.as_bag_str()?;
        self.compression = compression;
        Ok(self)
    }

    /// Set the chunk size threshold.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// ROS1 bag writer.
pub struct BagWriter {
    path: PathBuf,
    out: FileWriter,
    options: BagWriteOptions,

    connections: Vec<ConnectionRecord>,
    conn_ids: HashMap<(String, String), u32>,

    chunk: BytesWriter,
    chunk_index: BTreeMap<u32, Vec<(u64, u32)>>,
    chunk_start_time: u64,
    chunk_end_time: u64,
    chunk_infos: Vec<ChunkInfoRecord>,
    message_count: u64,
    finished: bool,
}

impl BagWriter {
    /// Create a bag at `path` with default options.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with_options(path, BagWriteOptions::default())
    }

    /// Create a bag at `path`.
    pub fn create_with_options<P: AsRef<Path>>(
        path: P,
        options: BagWriteOptions,
    ) -> Result<Self> {
        // Reject MCAP-only codecs at the boundary
        options.compression.as_bag_str()?;

        let mut out = FileWriter::create(path.as_ref())?;
        out.write(BAG_MAGIC)?;
        // Placeholder header; rewritten in place at finish
        write_bag_record(&mut out, &BagRecord::BagHeader(BagHeaderRecord::default()))?;

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            out,
            options,
            connections: Vec::new(),
            conn_ids: HashMap::new(),
            chunk: BytesWriter::new(),
            chunk_index: BTreeMap::new(),
            chunk_start_time: u64::MAX,
            chunk_end_time: 0,
            chunk_infos: Vec::new(),
            message_count: 0,
            finished: false,
        })
    }

    /// Register a connection, returning its id.
    ///
    /// Idempotent by `(topic, message_type)`. The definition's MD5 is
    /// computed when not supplied.
    pub fn add_connection(
        &mut self,
        topic: &str,
        message_type: &str,
        message_definition: &str,
        md5sum: Option<String>,
    ) -> Result<u32> {
        let key = (topic.to_string(), message_type.to_string());
        if let Some(&conn) = self.conn_ids.get(&key) {
            return Ok(conn);
        }

        let md5sum = match md5sum {
            Some(md5sum) => md5sum,
            None => compute_md5sum(message_definition, message_type)?,
        };
        let conn = self.connections.len() as u32;
        let record = ConnectionRecord {
            conn,
            topic: topic.to_string(),
            header: ConnectionHeader {
                topic: topic.to_string(),
                message_type: message_type.to_string(),
                md5sum,
                message_definition: message_definition.to_string(),
                caller_id: None,
                latching: None,
            },
        };
        // Connections live in the chunk stream too, so scan recovery can
        // rebuild them without the index section
        write_bag_record(&mut self.chunk, &BagRecord::Connection(record.clone()))?;
        self.connections.push(record);
        self.conn_ids.insert(key, conn);
        Ok(conn)
    }

    /// Append a message to the active chunk.
    pub fn write_message(&mut self, conn: u32, time: u64, data: &[u8]) -> Result<()> {
        if conn as usize >= self.connections.len() {
            return Err(ContainerError::UnknownChannel {
                channel_id: conn as u16,
            }
            .into());
        }

        let offset = self.chunk.tell() as u32;
        write_bag_record(
            &mut self.chunk,
            &BagRecord::MessageData(MessageDataRecord {
                conn,
                time,
                data: data.to_vec(),
            }),
        )?;
        self.chunk_index.entry(conn).or_default().push((time, offset));
        self.chunk_start_time = self.chunk_start_time.min(time);
        self.chunk_end_time = self.chunk_end_time.max(time);
        self.message_count += 1;

        if self.chunk.size() >= self.options.chunk_size {
            self.flush_chunk()?;
        }
        Ok(())
    }

    /// Flush the active chunk, if non-empty.
    ///
    /// Emits the chunk record followed by one IndexData record per
    /// connection, and records the chunk info for the index section.
    pub fn flush_chunk(&mut self) -> Result<()> {
        if self.chunk.size() == 0 {
            return Ok(());
        }

        let uncompressed = std::mem::take(&mut self.chunk).into_bytes();
        let compressed = self.options.compression.compress(&uncompressed)?;
        let chunk_pos = self.out.tell();
        write_bag_record(
            &mut self.out,
            &BagRecord::Chunk(BagChunkRecord {
                compression: self.options.compression.as_bag_str()?.to_string(),
                size: uncompressed.len() as u32,
                data: compressed,
            }),
        )?;

        let index = std::mem::take(&mut self.chunk_index);
        let mut counts = Vec::with_capacity(index.len());
        for (conn, entries) in index {
            counts.push((conn, entries.len() as u32));
            write_bag_record(
                &mut self.out,
                &BagRecord::IndexData(IndexDataRecord {
                    ver: 1,
                    conn,
                    entries,
                }),
            )?;
        }

        self.chunk_infos.push(ChunkInfoRecord {
            ver: 1,
            chunk_pos,
            start_time: if self.chunk_start_time == u64::MAX {
                0
            } else {
                self.chunk_start_time
            },
            end_time: self.chunk_end_time,
            counts,
        });
        self.chunk_start_time = u64::MAX;
        self.chunk_end_time = 0;
        Ok(())
    }

    /// Number of messages written so far.
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Number of connections registered so far.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Finalize the bag: index section, then the in-place header rewrite.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.flush_chunk()?;

        let index_pos = self.out.tell();
        for connection in &self.connections.clone() {
            write_bag_record(&mut self.out, &BagRecord::Connection(connection.clone()))?;
        }
        for chunk_info in &self.chunk_infos.clone() {
            write_bag_record(&mut self.out, &BagRecord::ChunkInfo(chunk_info.clone()))?;
        }
        self.out.flush()?;

        // Rewrite the fixed-size bag header with the real index position
        let mut header_writer = AppendFileWriter::open(&self.path)?;
        header_writer.seek(BAG_MAGIC.len() as u64)?;
        write_bag_record(
            &mut header_writer,
            &BagRecord::BagHeader(BagHeaderRecord {
                index_pos,
                conn_count: self.connections.len() as u32,
                chunk_count: self.chunk_infos.len() as u32,
            }),
        )?;
        header_writer.flush()?;
        self.finished = true;

        tracing::debug!(
            connections = self.connections.len(),
            chunks = self.chunk_infos.len(),
            messages = self.message_count,
            "bag index written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zstd_rejected_for_bags() {
        let result = BagWriteOptions::default().with_compression(Compression::Zstd);
        match result {
            Err(crate::core::Error::Container(
                ContainerError::CompressionNotSupportedHere { container, .. },
            )) => assert_eq!(container, "bag"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_connection_rejected() {
        let dir = std::env::temp_dir().join(format!(
            "robolog_bagw_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .subsec_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.bag");
        let mut writer = BagWriter::create(&path).unwrap();
        assert!(writer.write_message(0, 1, b"x").is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
