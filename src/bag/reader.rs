// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 bag reader.
//!
//! Indexed bags are opened through the index section (connections and
//! chunk infos); unindexed or truncated bags fall back to a forward scan
//! that rebuilds both from the chunk stream, ending at the last intact
//! record. Message iteration mirrors the MCAP reader: chunks in
//! ascending start-time order, filtered by topic/connection and time
//! window, optionally merged into time order.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use crate::core::{ContainerError, Result, SchemaError, Value};
use crate::io::{open_reader_with, ByteReader, BytesReader, Compression};
use crate::mcap::chunk::ChunkCache;
use crate::bag::records::{
    parse_bag_magic, read_bag_record, BagHeaderRecord, BagRecord, ChunkInfoRecord,
    ConnectionRecord,
};
use crate::schema::{compile_schema, compute_md5sum, parse_ros1msg, CompiledSchema, WireKind};

/// Bag reader configuration.
#[derive(Debug, Clone)]
pub struct BagReadOptions {
    /// Memory-map preference; `None` selects by file size
    pub use_mmap: Option<bool>,
    /// Number of decompressed chunks kept in the LRU cache
    pub chunk_cache_size: usize,
    /// Verify connection MD5s against their message definitions
    pub verify_md5: bool,
}

impl Default for BagReadOptions {
    fn default() -> Self {
        Self {
            use_mmap: None,
            chunk_cache_size: 4,
            verify_md5: false,
        }
    }
}

/// Message selection for [`BagReader::messages`].
#[derive(Debug, Clone, Default)]
pub struct BagMessageFilter {
    /// Keep only these topics
    pub topics: Option<Vec<String>>,
    /// Keep only this connection
    pub conn: Option<u32>,
    /// Inclusive lower bound on receipt time
    pub start_time: Option<u64>,
    /// Exclusive upper bound on receipt time
    pub end_time: Option<u64>,
    /// Merge messages into non-decreasing time order
    pub in_log_time_order: bool,
}

impl BagMessageFilter {
    fn contains(&self, time: u64) -> bool {
        if let Some(start) = self.start_time {
            if time < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if time >= end {
                return false;
            }
        }
        true
    }

    fn intersects_chunk(&self, info: &ChunkInfoRecord) -> bool {
        if let Some(start) = self.start_time {
            if info.end_time < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if info.start_time >= end {
                return false;
            }
        }
        true
    }
}

/// A message together with its connection context.
#[derive(Debug, Clone)]
pub struct BagMessage {
    /// The connection's topic
    pub topic: String,
    /// Connection id
    pub conn: u32,
    /// Receipt time in nanoseconds
    pub time: u64,
    /// Serialized ROS1 payload
    pub data: Vec<u8>,
}

/// ROS1 bag reader.
pub struct BagReader {
    path: String,
    reader: Box<dyn ByteReader>,
    file_size: u64,

    header: BagHeaderRecord,
    connections: BTreeMap<u32, ConnectionRecord>,
    chunk_infos: Vec<ChunkInfoRecord>,
    from_index: bool,

    cache: ChunkCache,
    decoders: HashMap<u32, Arc<CompiledSchema>>,
    options: BagReadOptions,
}

impl BagReader {
    /// Open a bag file with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, BagReadOptions::default())
    }

    /// Open a bag file.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: BagReadOptions) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let mut reader = open_reader_with(path.as_ref(), options.use_mmap)?;
        let file_size = reader.len();

        parse_bag_magic(reader.as_mut())?;
        let header = match read_bag_record(reader.as_mut())? {
            BagRecord::BagHeader(header) => header,
            other => {
                return Err(ContainerError::MalformedRecord {
                    record: "bag",
                    reason: format!("expected bag header record, found op 0x{:02x}", other.op()),
                }
                .into())
            }
        };

        let mut this = Self {
            path: path_str,
            reader,
            file_size,
            header,
            connections: BTreeMap::new(),
            chunk_infos: Vec::new(),
            from_index: false,
            cache: ChunkCache::new(options.chunk_cache_size),
            decoders: HashMap::new(),
            options,
        };

        if this.header.index_pos > 0 && this.load_index()? {
            this.from_index = true;
        } else {
            this.linear_scan()?;
        }
        this.chunk_infos
            .sort_by_key(|info| (info.start_time, info.chunk_pos));

        if this.options.verify_md5 {
            this.verify_md5s()?;
        }
        Ok(this)
    }

    /// Read the index section: connections, then chunk infos.
    fn load_index(&mut self) -> Result<bool> {
        self.reader.seek_from_start(self.header.index_pos)?;
        while self.reader.remaining() > 0 {
            match read_bag_record(self.reader.as_mut()) {
                Ok(BagRecord::Connection(connection)) => {
                    self.connections.insert(connection.conn, connection);
                }
                Ok(BagRecord::ChunkInfo(info)) => self.chunk_infos.push(info),
                Ok(_) => {}
                Err(_) => return Ok(false),
            }
        }
        Ok(!self.chunk_infos.is_empty() || self.connections.len() as u32 == self.header.conn_count)
    }

    /// Forward scan rebuilding connections and chunk infos from chunks.
    fn linear_scan(&mut self) -> Result<()> {
        tracing::debug!(path = %self.path, "rebuilding bag index by linear scan");
        self.connections.clear();
        self.chunk_infos.clear();
        self.reader
            .seek_from_start(crate::bag::records::BAG_MAGIC.len() as u64)?;
        // Skip the (possibly stale) bag header record
        let _ = read_bag_record(self.reader.as_mut())?;

        loop {
            let offset = self.reader.tell();
            if self.reader.remaining() == 0 {
                break;
            }
            let record = match read_bag_record(self.reader.as_mut()) {
                Ok(record) => record,
                Err(error) => {
                    tracing::warn!(offset, %error, "discarding partial bag record tail");
                    break;
                }
            };
            match record {
                BagRecord::Chunk(chunk) => {
                    let stream = match decompress_bag_chunk(&chunk) {
                        Ok(stream) => stream,
                        Err(error) => {
                            tracing::warn!(offset, %error, "unreadable chunk during scan");
                            break;
                        }
                    };
                    let mut start_time = u64::MAX;
                    let mut end_time = 0u64;
                    let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
                    let mut inner = BytesReader::new(stream);
                    while inner.remaining() > 0 {
                        match read_bag_record(&mut inner) {
                            Ok(BagRecord::Connection(connection)) => {
                                self.connections.insert(connection.conn, connection);
                            }
                            Ok(BagRecord::MessageData(message)) => {
                                start_time = start_time.min(message.time);
                                end_time = end_time.max(message.time);
                                *counts.entry(message.conn).or_insert(0) += 1;
                            }
                            Ok(_) => {}
                            Err(_) => break,
                        }
                    }
                    self.chunk_infos.push(ChunkInfoRecord {
                        ver: 1,
                        chunk_pos: offset,
                        start_time: if start_time == u64::MAX { 0 } else { start_time },
                        end_time,
                        counts: counts.into_iter().collect(),
                    });
                }
                BagRecord::Connection(connection) => {
                    self.connections.insert(connection.conn, connection);
                }
                BagRecord::BagHeader(_)
                | BagRecord::IndexData(_)
                | BagRecord::ChunkInfo(_)
                | BagRecord::MessageData(_) => {}
            }
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The file path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// File size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Connections by id.
    pub fn connections(&self) -> &BTreeMap<u32, ConnectionRecord> {
        &self.connections
    }

    /// All distinct topics.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .connections
            .values()
            .map(|connection| connection.topic.clone())
            .collect();
        topics.sort();
        topics.dedup();
        topics
    }

    /// Chunk infos in ascending start-time order.
    pub fn chunk_infos(&self) -> &[ChunkInfoRecord] {
        &self.chunk_infos
    }

    /// Whether metadata came from the index section (vs a rebuild scan).
    pub fn has_index(&self) -> bool {
        self.from_index
    }

    /// Total message count across all chunks.
    pub fn message_count(&self) -> u64 {
        self.chunk_infos
            .iter()
            .flat_map(|info| info.counts.iter())
            .map(|(_, count)| *count as u64)
            .sum()
    }

    /// Earliest message time.
    pub fn start_time(&self) -> Option<u64> {
        self.chunk_infos
            .iter()
            .filter(|info| !info.counts.is_empty())
            .map(|info| info.start_time)
            .min()
    }

    /// Latest message time.
    pub fn end_time(&self) -> Option<u64> {
        self.chunk_infos
            .iter()
            .filter(|info| !info.counts.is_empty())
            .map(|info| info.end_time)
            .max()
    }

    /// Duration in nanoseconds.
    pub fn duration(&self) -> u64 {
        match (self.start_time(), self.end_time()) {
            (Some(start), Some(end)) if end > start => end - start,
            _ => 0,
        }
    }

    /// Per-connection message counts.
    pub fn connection_message_counts(&self) -> BTreeMap<u32, u64> {
        let mut counts: BTreeMap<u32, u64> = BTreeMap::new();
        for info in &self.chunk_infos {
            for (conn, count) in &info.counts {
                *counts.entry(*conn).or_insert(0) += *count as u64;
            }
        }
        counts
    }

    /// Check every connection's MD5 against its message definition.
    pub fn verify_md5s(&self) -> Result<()> {
        for connection in self.connections.values() {
            let computed = compute_md5sum(
                &connection.header.message_definition,
                &connection.header.message_type,
            )?;
            if computed != connection.header.md5sum {
                return Err(SchemaError::BadMd5 {
                    expected: connection.header.md5sum.clone(),
                    actual: computed,
                }
                .into());
            }
        }
        Ok(())
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    fn chunk_stream(&mut self, info: &ChunkInfoRecord) -> Result<Arc<Vec<u8>>> {
        if let Some(cached) = self.cache.get(info.chunk_pos) {
            return Ok(cached);
        }
        self.reader.seek_from_start(info.chunk_pos)?;
        let chunk = match read_bag_record(self.reader.as_mut())? {
            BagRecord::Chunk(chunk) => chunk,
            other => {
                return Err(ContainerError::MalformedRecord {
                    record: "bag",
                    reason: format!("chunk info points at op 0x{:02x}", other.op()),
                }
                .into())
            }
        };
        let stream = Arc::new(decompress_bag_chunk(&chunk)?);
        self.cache.insert(info.chunk_pos, Arc::clone(&stream));
        Ok(stream)
    }

    fn candidate_connections(&self, filter: &BagMessageFilter) -> Vec<u32> {
        self.connections
            .values()
            .filter(|connection| {
                if let Some(conn) = filter.conn {
                    if connection.conn != conn {
                        return false;
                    }
                }
                if let Some(topics) = &filter.topics {
                    if !topics.iter().any(|t| *t == connection.topic) {
                        return false;
                    }
                }
                true
            })
            .map(|connection| connection.conn)
            .collect()
    }

    fn chunk_messages(
        &mut self,
        info: &ChunkInfoRecord,
        filter: &BagMessageFilter,
        conns: &[u32],
    ) -> Result<Vec<BagMessage>> {
        let stream = self.chunk_stream(info)?;
        let mut inner = BytesReader::new(stream.as_ref().clone());
        let mut selected = Vec::new();
        while inner.remaining() > 0 {
            match read_bag_record(&mut inner) {
                Ok(BagRecord::MessageData(message)) => {
                    if conns.contains(&message.conn) && filter.contains(message.time) {
                        let topic = self
                            .connections
                            .get(&message.conn)
                            .map(|c| c.topic.clone())
                            .unwrap_or_default();
                        selected.push(BagMessage {
                            topic,
                            conn: message.conn,
                            time: message.time,
                            data: message.data,
                        });
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
        if filter.in_log_time_order {
            // Stable: equal times keep writer order
            selected.sort_by_key(|message| message.time);
        }
        Ok(selected)
    }

    /// Iterate messages matching `filter`.
    pub fn messages(&mut self, filter: BagMessageFilter) -> BagMessageIter<'_> {
        let conns = self.candidate_connections(&filter);
        let chunks: Vec<ChunkInfoRecord> = if conns.is_empty() {
            Vec::new()
        } else {
            self.chunk_infos
                .iter()
                .filter(|info| filter.intersects_chunk(info))
                .cloned()
                .collect()
        };
        BagMessageIter {
            reader: self,
            chunks,
            next_chunk: 0,
            pending: Vec::new().into_iter(),
            filter,
            conns,
            done: false,
        }
    }

    /// Iterate decoded messages matching `filter`.
    pub fn decoded_messages(
        &mut self,
        filter: BagMessageFilter,
    ) -> Result<BagDecodedMessageIter<'_>> {
        for conn in self.candidate_connections(&filter) {
            self.decoder_for(conn)?;
        }
        let decoders = self.decoders.clone();
        Ok(BagDecodedMessageIter {
            inner: self.messages(filter),
            decoders,
        })
    }

    /// Compile (or fetch) the decoder for one connection.
    fn decoder_for(&mut self, conn: u32) -> Result<Arc<CompiledSchema>> {
        if let Some(compiled) = self.decoders.get(&conn) {
            return Ok(Arc::clone(compiled));
        }
        let connection = self.connections.get(&conn).ok_or(ContainerError::UnknownChannel {
            channel_id: conn as u16,
        })?;
        let parsed = parse_ros1msg(
            &connection.header.message_type,
            &connection.header.message_definition,
        )?;
        let compiled = Arc::new(compile_schema(&parsed, WireKind::Ros1)?);
        self.decoders.insert(conn, Arc::clone(&compiled));
        Ok(compiled)
    }
}

fn decompress_bag_chunk(chunk: &crate::bag::records::BagChunkRecord) -> Result<Vec<u8>> {
    let compression = Compression::from_bag_str(&chunk.compression)?;
    compression.decompress(&chunk.data, chunk.size as usize)
}

/// Iterator over filtered raw bag messages.
pub struct BagMessageIter<'a> {
    reader: &'a mut BagReader,
    chunks: Vec<ChunkInfoRecord>,
    next_chunk: usize,
    pending: std::vec::IntoIter<BagMessage>,
    filter: BagMessageFilter,
    conns: Vec<u32>,
    done: bool,
}

impl Iterator for BagMessageIter<'_> {
    type Item = Result<BagMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(message) = self.pending.next() {
                return Some(Ok(message));
            }
            if self.next_chunk >= self.chunks.len() {
                return None;
            }
            let info = self.chunks[self.next_chunk].clone();
            self.next_chunk += 1;
            match self.reader.chunk_messages(&info, &self.filter, &self.conns) {
                Ok(messages) => self.pending = messages.into_iter(),
                Err(error) => {
                    self.done = true;
                    return Some(Err(error));
                }
            }
        }
    }
}

/// Iterator over filtered, decoded bag messages.
pub struct BagDecodedMessageIter<'a> {
    inner: BagMessageIter<'a>,
    decoders: HashMap<u32, Arc<CompiledSchema>>,
}

impl Iterator for BagDecodedMessageIter<'_> {
    type Item = Result<(Value, BagMessage)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let message = match self.inner.next()? {
                Ok(message) => message,
                Err(error) => return Some(Err(error)),
            };
            let Some(compiled) = self.decoders.get(&message.conn) else {
                continue;
            };
            return Some(
                compiled
                    .decode(&message.data)
                    .map(|decoded| (Value::Struct(decoded), message)),
            );
        }
    }
}
