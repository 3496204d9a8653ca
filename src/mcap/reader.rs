// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP container reader.
//!
//! Two shapes share one interface: summary-backed random access (footer
//! declares a summary start) and a linear-scan fallback that rebuilds
//! schemas, channels, statistics and a synthetic chunk index in one
//! forward pass. The scan path doubles as recovery: a truncated or
//! malformed tail ends iteration after the last intact record.
//!
//! Message iteration filters by topic/channel and a `[start, end)` time
//! window, optionally k-way merged into log-time order. Decompressed
//! chunks live in a small LRU keyed by `chunk_start_offset`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use crate::core::{ContainerError, Error, Result, Value};
use crate::encoding::{DecoderKind, DecoderRegistry};
use crate::io::{open_reader_with, ByteReader, BytesReader};
use crate::mcap::chunk::{decompress_chunk, ChunkCache};
use crate::mcap::records::{
    parse_magic, read_record, AttachmentIndexRecord, AttachmentRecord, ChannelRecord,
    ChunkIndexRecord, FooterRecord, HeaderRecord, MetadataIndexRecord, MetadataRecord, Record,
    SchemaRecord, StatisticsRecord, FOOTER_RECORD_LEN, MCAP_MAGIC, OP_DATA_END, OP_MESSAGE,
};
use crate::mcap::records::MessageRecord;

/// Reader configuration.
#[derive(Debug, Clone)]
pub struct McapReadOptions {
    /// Memory-map preference; `None` selects by file size
    pub use_mmap: Option<bool>,
    /// Number of decompressed chunks kept in the LRU cache
    pub chunk_cache_size: usize,
    /// Verify chunk and summary CRCs while reading
    pub verify_crc: bool,
    /// Downgrade per-message failures (unknown schema, bad summary) to
    /// warnings and keep going
    pub best_effort: bool,
    /// Ignore any summary section and rebuild metadata by linear scan
    /// (the recovery path)
    pub ignore_summary: bool,
}

impl Default for McapReadOptions {
    fn default() -> Self {
        Self {
            use_mmap: None,
            chunk_cache_size: 4,
            verify_crc: true,
            best_effort: false,
            ignore_summary: false,
        }
    }
}

/// Message selection for [`McapReader::messages`].
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    /// Keep only these topics (any channel with a matching topic)
    pub topics: Option<Vec<String>>,
    /// Keep only this channel
    pub channel_id: Option<u16>,
    /// Inclusive lower bound on `log_time`
    pub start_time: Option<u64>,
    /// Exclusive upper bound on `log_time`
    pub end_time: Option<u64>,
    /// Merge messages into non-decreasing `log_time` order
    pub in_log_time_order: bool,
}

impl MessageFilter {
    fn contains(&self, log_time: u64) -> bool {
        if let Some(start) = self.start_time {
            if log_time < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if log_time >= end {
                return false;
            }
        }
        true
    }

    fn intersects_chunk(&self, index: &ChunkIndexRecord) -> bool {
        if let Some(start) = self.start_time {
            if index.message_end_time < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if index.message_start_time >= end {
                return false;
            }
        }
        true
    }
}

/// A message together with its channel context.
#[derive(Debug, Clone)]
pub struct McapMessage {
    /// The channel's topic
    pub topic: String,
    /// The channel's schema id
    pub schema_id: u16,
    /// The message record
    pub message: MessageRecord,
}

/// MCAP container reader.
pub struct McapReader {
    path: String,
    reader: Box<dyn ByteReader>,
    file_size: u64,

    header: HeaderRecord,
    footer: Option<FooterRecord>,
    schemas: BTreeMap<u16, SchemaRecord>,
    channels: BTreeMap<u16, ChannelRecord>,
    statistics: StatisticsRecord,
    chunk_indexes: Vec<ChunkIndexRecord>,
    attachment_indexes: Vec<AttachmentIndexRecord>,
    metadata_indexes: Vec<MetadataIndexRecord>,
    data_end_offset: Option<u64>,
    from_summary: bool,

    cache: ChunkCache,
    registry: DecoderRegistry,
    decoders: HashMap<u16, Option<DecoderKind>>,
    options: McapReadOptions,
}

impl McapReader {
    /// Open an MCAP file with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, McapReadOptions::default())
    }

    /// Open several MCAP files as one virtual log.
    ///
    /// Iteration over the result merges the per-file message streams in
    /// log-time order; see [`MultiMcapReader`](crate::mcap::MultiMcapReader).
    pub fn open_many<P: AsRef<Path>>(paths: &[P]) -> Result<crate::mcap::MultiMcapReader> {
        crate::mcap::MultiMcapReader::open(paths)
    }

    /// Open an MCAP file.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: McapReadOptions) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let mut reader = open_reader_with(path.as_ref(), options.use_mmap)?;
        let file_size = reader.len();

        parse_magic(reader.as_mut())?;
        let header = match read_record(reader.as_mut())? {
            Record::Header(header) => header,
            other => {
                return Err(ContainerError::MalformedRecord {
                    record: "Header",
                    reason: format!("expected Header record, found opcode 0x{:02x}", other.opcode()),
                }
                .into())
            }
        };

        let mut this = Self {
            path: path_str,
            reader,
            file_size,
            header,
            footer: None,
            schemas: BTreeMap::new(),
            channels: BTreeMap::new(),
            statistics: StatisticsRecord::default(),
            chunk_indexes: Vec::new(),
            attachment_indexes: Vec::new(),
            metadata_indexes: Vec::new(),
            data_end_offset: None,
            from_summary: false,
            cache: ChunkCache::new(options.chunk_cache_size),
            registry: DecoderRegistry::new(),
            decoders: HashMap::new(),
            options,
        };

        match this.load_summary() {
            Ok(true) => {}
            Ok(false) => this.linear_scan()?,
            Err(error) => {
                if this.options.best_effort {
                    tracing::warn!(%error, "summary unreadable, falling back to linear scan");
                    this.linear_scan()?;
                } else {
                    return Err(error);
                }
            }
        }

        this.chunk_indexes
            .sort_by_key(|index| (index.message_start_time, index.chunk_start_offset));
        Ok(this)
    }

    /// Read the footer and, if it declares one, the summary section.
    ///
    /// Returns `Ok(false)` when the file has no usable summary and a
    /// linear scan is required.
    fn load_summary(&mut self) -> Result<bool> {
        if self.options.ignore_summary {
            return Ok(false);
        }
        let tail = MCAP_MAGIC.len() as u64 + FOOTER_RECORD_LEN;
        if self.file_size < tail {
            return Ok(false);
        }

        self.reader.seek_from_end(MCAP_MAGIC.len() as u64)?;
        if self.reader.read(MCAP_MAGIC.len())? != MCAP_MAGIC {
            // No trailing magic: unfinalized or truncated file
            return Ok(false);
        }

        let footer_offset = self.file_size - tail;
        self.reader.seek_from_start(footer_offset)?;
        let footer = match read_record(self.reader.as_mut())? {
            Record::Footer(footer) => footer,
            _ => return Ok(false),
        };
        let summary_start = footer.summary_start;
        let summary_crc = footer.summary_crc;
        self.footer = Some(footer);

        if summary_start == 0 {
            return Ok(false);
        }

        // The summary CRC covers from summary_start through the footer's
        // summary_offset_start field
        self.reader.seek_from_start(summary_start)?;
        let crc_len = (footer_offset + 1 + 8 + 8 + 8 - summary_start) as usize;
        let crc_region = self.reader.read(crc_len)?;
        if self.options.verify_crc && summary_crc != 0 {
            let actual = crc32fast::hash(&crc_region);
            if actual != summary_crc {
                return Err(ContainerError::SummaryCrc {
                    expected: summary_crc,
                    actual,
                }
                .into());
            }
        }

        let summary_len = (footer_offset - summary_start) as usize;
        let mut summary = BytesReader::new(crc_region[..summary_len].to_vec());
        while summary.remaining() > 0 {
            match read_record(&mut summary)? {
                Record::Schema(schema) => {
                    self.schemas.insert(schema.id, schema);
                }
                Record::Channel(channel) => {
                    self.channels.insert(channel.id, channel);
                }
                Record::ChunkIndex(index) => self.chunk_indexes.push(index),
                Record::AttachmentIndex(index) => self.attachment_indexes.push(index),
                Record::MetadataIndex(index) => self.metadata_indexes.push(index),
                Record::Statistics(statistics) => self.statistics = statistics,
                Record::SummaryOffset(_) => break,
                _ => {}
            }
        }

        // The DataEnd record sits immediately before the summary
        let data_end_offset = summary_start.saturating_sub(13);
        self.reader.seek_from_start(data_end_offset)?;
        if self.reader.peek(1)? == [OP_DATA_END] {
            self.data_end_offset = Some(data_end_offset);
        }

        self.from_summary = true;
        Ok(true)
    }

    /// One forward pass over the data section, rebuilding all summary
    /// structures. Truncated or malformed tails end the scan.
    fn linear_scan(&mut self) -> Result<()> {
        tracing::debug!(path = %self.path, "rebuilding summary by linear scan");
        self.schemas.clear();
        self.channels.clear();
        self.chunk_indexes.clear();
        self.attachment_indexes.clear();
        self.metadata_indexes.clear();
        let mut stats = StatisticsRecord::default();
        let mut message_start_time = u64::MAX;
        let mut message_end_time = 0u64;

        self.reader.seek_from_start(MCAP_MAGIC.len() as u64)?;
        // Skip the header record
        let _ = read_record(self.reader.as_mut())?;

        loop {
            let offset = self.reader.tell();
            if self.reader.remaining() == 0 {
                break;
            }
            let record = match read_record(self.reader.as_mut()) {
                Ok(record) => record,
                Err(error) => {
                    // Recovery: discard the partial tail record
                    tracing::warn!(offset, %error, "discarding partial record tail");
                    break;
                }
            };
            let length = self.reader.tell() - offset;

            match record {
                Record::Schema(schema) => {
                    self.schemas.insert(schema.id, schema);
                }
                Record::Channel(channel) => {
                    self.channels.insert(channel.id, channel);
                }
                Record::Chunk(chunk) => {
                    let counted = self.count_chunk_messages(&chunk, offset);
                    match counted {
                        Ok((count, per_channel)) => {
                            stats.message_count += count;
                            for (channel_id, channel_count) in per_channel {
                                *stats
                                    .channel_message_counts
                                    .entry(channel_id)
                                    .or_insert(0) += channel_count;
                            }
                        }
                        Err(error) => {
                            tracing::warn!(offset, %error, "unreadable chunk during scan");
                            if !self.options.best_effort {
                                return Err(error);
                            }
                        }
                    }
                    if chunk.message_end_time > 0 || chunk.message_start_time < u64::MAX {
                        message_start_time = message_start_time.min(chunk.message_start_time);
                        message_end_time = message_end_time.max(chunk.message_end_time);
                    }
                    self.chunk_indexes.push(ChunkIndexRecord {
                        message_start_time: chunk.message_start_time,
                        message_end_time: chunk.message_end_time,
                        chunk_start_offset: offset,
                        chunk_length: length,
                        message_index_offsets: BTreeMap::new(),
                        message_index_length: 0,
                        compression: chunk.compression.clone(),
                        compressed_size: chunk.records.len() as u64,
                        uncompressed_size: chunk.uncompressed_size,
                    });
                }
                Record::Message(message) => {
                    // Unchunked message: expose it as a synthetic
                    // single-record chunk
                    stats.message_count += 1;
                    *stats
                        .channel_message_counts
                        .entry(message.channel_id)
                        .or_insert(0) += 1;
                    message_start_time = message_start_time.min(message.log_time);
                    message_end_time = message_end_time.max(message.log_time);
                    self.chunk_indexes.push(ChunkIndexRecord {
                        message_start_time: message.log_time,
                        message_end_time: message.log_time,
                        chunk_start_offset: offset,
                        chunk_length: length,
                        message_index_offsets: BTreeMap::new(),
                        message_index_length: 0,
                        compression: String::new(),
                        compressed_size: length,
                        uncompressed_size: length,
                    });
                }
                Record::Attachment(attachment) => {
                    self.attachment_indexes.push(AttachmentIndexRecord {
                        offset,
                        length,
                        log_time: attachment.log_time,
                        create_time: attachment.create_time,
                        data_size: attachment.data.len() as u64,
                        name: attachment.name,
                        media_type: attachment.media_type,
                    });
                }
                Record::Metadata(metadata) => {
                    self.metadata_indexes.push(MetadataIndexRecord {
                        offset,
                        length,
                        name: metadata.name,
                    });
                }
                Record::DataEnd(_) => {
                    self.data_end_offset = Some(offset);
                    break;
                }
                Record::Footer(_) => break,
                _ => {}
            }
        }

        stats.schema_count = self.schemas.len() as u16;
        stats.channel_count = self.channels.len() as u32;
        stats.chunk_count = self.chunk_indexes.len() as u32;
        stats.attachment_count = self.attachment_indexes.len() as u32;
        stats.metadata_count = self.metadata_indexes.len() as u32;
        stats.message_start_time = if stats.message_count > 0 {
            message_start_time
        } else {
            0
        };
        stats.message_end_time = if stats.message_count > 0 {
            message_end_time
        } else {
            0
        };
        self.statistics = stats;
        self.from_summary = false;
        Ok(())
    }

    fn count_chunk_messages(
        &mut self,
        chunk: &crate::mcap::records::ChunkRecord,
        offset: u64,
    ) -> Result<(u64, BTreeMap<u16, u64>)> {
        let stream = decompress_chunk(chunk, offset, self.options.verify_crc)?;
        let mut reader = BytesReader::new(stream);
        let mut count = 0u64;
        let mut per_channel: BTreeMap<u16, u64> = BTreeMap::new();
        while reader.remaining() > 0 {
            match read_record(&mut reader) {
                Ok(Record::Message(message)) => {
                    count += 1;
                    *per_channel.entry(message.channel_id).or_insert(0) += 1;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
        Ok((count, per_channel))
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

    /// The header record.
    pub fn header(&self) -> &HeaderRecord {
        &self.header
    }

    /// The file profile ("ros1", "ros2", ...).
    pub fn profile(&self) -> &str {
        &self.header.profile
    }

    /// The footer record, if the file carries one.
    pub fn footer(&self) -> Option<&FooterRecord> {
        self.footer.as_ref()
    }

    /// Schemas by id.
    pub fn schemas(&self) -> &BTreeMap<u16, SchemaRecord> {
        &self.schemas
    }

    /// Channels by id.
    pub fn channels(&self) -> &BTreeMap<u16, ChannelRecord> {
        &self.channels
    }

    /// All distinct topics.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .channels
            .values()
            .map(|channel| channel.topic.clone())
            .collect();
        topics.sort();
        topics.dedup();
        topics
    }

    /// The first channel with a given topic.
    pub fn channel_by_topic(&self, topic: &str) -> Option<&ChannelRecord> {
        self.channels.values().find(|c| c.topic == topic)
    }

    /// File statistics (from the summary, or rebuilt by scan).
    pub fn statistics(&self) -> &StatisticsRecord {
        &self.statistics
    }

    /// Total message count.
    pub fn message_count(&self) -> u64 {
        self.statistics.message_count
    }

    /// Earliest message log time.
    pub fn start_time(&self) -> Option<u64> {
        (self.statistics.message_count > 0).then_some(self.statistics.message_start_time)
    }

    /// Latest message log time.
    pub fn end_time(&self) -> Option<u64> {
        (self.statistics.message_count > 0).then_some(self.statistics.message_end_time)
    }

    /// Duration in nanoseconds.
    pub fn duration(&self) -> u64 {
        match (self.start_time(), self.end_time()) {
            (Some(start), Some(end)) if end > start => end - start,
            _ => 0,
        }
    }

    /// Chunk indexes in ascending start-time order.
    pub fn chunk_indexes(&self) -> &[ChunkIndexRecord] {
        &self.chunk_indexes
    }

    /// Attachment indexes.
    pub fn attachment_indexes(&self) -> &[AttachmentIndexRecord] {
        &self.attachment_indexes
    }

    /// Metadata indexes.
    pub fn metadata_indexes(&self) -> &[MetadataIndexRecord] {
        &self.metadata_indexes
    }

    /// Offset of the DataEnd record, if one was found.
    pub fn data_end_offset(&self) -> Option<u64> {
        self.data_end_offset
    }

    /// Whether metadata came from the summary (vs a rebuild scan).
    pub fn has_summary(&self) -> bool {
        self.from_summary
    }

    /// Read all attachment records.
    pub fn attachments(&mut self) -> Result<Vec<AttachmentRecord>> {
        let offsets: Vec<u64> = self.attachment_indexes.iter().map(|i| i.offset).collect();
        let mut attachments = Vec::with_capacity(offsets.len());
        for offset in offsets {
            self.reader.seek_from_start(offset)?;
            match read_record(self.reader.as_mut())? {
                Record::Attachment(attachment) => {
                    if self.options.verify_crc && attachment.crc != 0 {
                        let body = crate::mcap::records::record_body(&Record::Attachment(
                            attachment.clone(),
                        ));
                        if crc32fast::hash(&body[..body.len() - 4]) != attachment.crc {
                            return Err(ContainerError::AttachmentCrc {
                                name: attachment.name,
                            }
                            .into());
                        }
                    }
                    attachments.push(attachment);
                }
                other => {
                    return Err(ContainerError::MalformedRecord {
                        record: "Attachment",
                        reason: format!("index points at opcode 0x{:02x}", other.opcode()),
                    }
                    .into())
                }
            }
        }
        Ok(attachments)
    }

    /// Read all metadata records.
    pub fn metadata(&mut self) -> Result<Vec<MetadataRecord>> {
        let offsets: Vec<u64> = self.metadata_indexes.iter().map(|i| i.offset).collect();
        let mut records = Vec::with_capacity(offsets.len());
        for offset in offsets {
            self.reader.seek_from_start(offset)?;
            match read_record(self.reader.as_mut())? {
                Record::Metadata(metadata) => records.push(metadata),
                other => {
                    return Err(ContainerError::MalformedRecord {
                        record: "Metadata",
                        reason: format!("index points at opcode 0x{:02x}", other.opcode()),
                    }
                    .into())
                }
            }
        }
        Ok(records)
    }

    // ========================================================================
    // Chunk access
    // ========================================================================

    /// Fetch a chunk's decompressed record stream through the LRU cache.
    fn chunk_stream(&mut self, index: &ChunkIndexRecord) -> Result<Arc<Vec<u8>>> {
        if let Some(cached) = self.cache.get(index.chunk_start_offset) {
            return Ok(cached);
        }

        self.reader.seek_from_start(index.chunk_start_offset)?;
        let stream = if self.reader.peek(1)? == [OP_MESSAGE] {
            // Synthetic chunk wrapping a bare top-level message record
            Arc::new(self.reader.read(index.chunk_length as usize)?)
        } else {
            match read_record(self.reader.as_mut())? {
                Record::Chunk(chunk) => Arc::new(decompress_chunk(
                    &chunk,
                    index.chunk_start_offset,
                    self.options.verify_crc,
                )?),
                other => {
                    return Err(ContainerError::MalformedRecord {
                        record: "Chunk",
                        reason: format!(
                            "chunk index points at opcode 0x{:02x}",
                            other.opcode()
                        ),
                    }
                    .into())
                }
            }
        };
        self.cache.insert(index.chunk_start_offset, Arc::clone(&stream));
        Ok(stream)
    }

    /// Resolve the candidate channel ids for a filter.
    fn candidate_channels(&self, filter: &MessageFilter) -> Vec<u16> {
        self.channels
            .values()
            .filter(|channel| {
                if let Some(channel_id) = filter.channel_id {
                    if channel.id != channel_id {
                        return false;
                    }
                }
                if let Some(topics) = &filter.topics {
                    if !topics.iter().any(|t| *t == channel.topic) {
                        return false;
                    }
                }
                true
            })
            .map(|channel| channel.id)
            .collect()
    }

    /// Collect the filtered messages of one chunk, in delivery order.
    fn chunk_messages(
        &mut self,
        index: &ChunkIndexRecord,
        filter: &MessageFilter,
        channels: &[u16],
    ) -> Result<Vec<MessageRecord>> {
        let stream = self.chunk_stream(index)?;
        let mut selected: Vec<(u64, MessageRecord)> = Vec::new();

        if !index.message_index_offsets.is_empty() {
            // Precise per-channel offsets from the MessageIndex records
            let mut offsets: Vec<u64> = Vec::new();
            for channel_id in channels {
                let Some(&index_offset) = index.message_index_offsets.get(channel_id) else {
                    continue;
                };
                self.reader.seek_from_start(index_offset)?;
                match read_record(self.reader.as_mut())? {
                    Record::MessageIndex(message_index) => {
                        offsets.extend(
                            message_index
                                .records
                                .iter()
                                .filter(|(log_time, _)| filter.contains(*log_time))
                                .map(|(_, offset)| *offset),
                        );
                    }
                    other => {
                        return Err(ContainerError::MalformedRecord {
                            record: "MessageIndex",
                            reason: format!("index points at opcode 0x{:02x}", other.opcode()),
                        }
                        .into())
                    }
                }
            }
            // Writer emission order inside the chunk is offset order
            offsets.sort_unstable();
            offsets.dedup();
            for offset in offsets {
                let mut record_reader = BytesReader::new(stream[offset as usize..].to_vec());
                match read_record(&mut record_reader)? {
                    Record::Message(message) => selected.push((offset, message)),
                    other => {
                        return Err(ContainerError::MalformedRecord {
                            record: "Message",
                            reason: format!(
                                "message index points at opcode 0x{:02x}",
                                other.opcode()
                            ),
                        }
                        .into())
                    }
                }
            }
        } else {
            // No index: walk the chunk's records in order
            let mut record_reader = BytesReader::new(stream.as_ref().clone());
            while record_reader.remaining() > 0 {
                let offset = record_reader.tell();
                match read_record(&mut record_reader) {
                    Ok(Record::Message(message)) => {
                        if channels.contains(&message.channel_id)
                            && filter.contains(message.log_time)
                        {
                            selected.push((offset, message));
                        }
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        }

        if filter.in_log_time_order {
            // Stable on equal timestamps: earlier writer offset first
            selected.sort_by_key(|(offset, message)| (message.log_time, *offset));
        }
        Ok(selected.into_iter().map(|(_, message)| message).collect())
    }

    /// Iterate messages matching `filter`.
    pub fn messages(&mut self, filter: MessageFilter) -> MessageIter<'_> {
        let channels = self.candidate_channels(&filter);
        let chunks: Vec<ChunkIndexRecord> = if channels.is_empty() {
            Vec::new()
        } else {
            self.chunk_indexes
                .iter()
                .filter(|index| filter.intersects_chunk(index))
                .cloned()
                .collect()
        };
        MessageIter {
            reader: self,
            chunks,
            next_chunk: 0,
            pending: Vec::new().into_iter(),
            filter,
            channels,
            done: false,
        }
    }

    /// Iterate decoded messages matching `filter`.
    ///
    /// Channels with compiled decoders yield [`Value::Struct`]; protobuf,
    /// JSON and IDL channels pass their payloads through as
    /// [`Value::Bytes`]. Unknown encoding pairs fail here, before any
    /// message is read; unknown schema ids fail per message unless
    /// best-effort is set, in which case they are skipped.
    pub fn decoded_messages(&mut self, filter: MessageFilter) -> Result<DecodedMessageIter<'_>> {
        let channels = self.candidate_channels(&filter);
        for channel_id in &channels {
            self.decoder_for(*channel_id)?;
        }
        let decoders = self.decoders.clone();
        let best_effort = self.options.best_effort;
        Ok(DecodedMessageIter {
            inner: self.messages(filter),
            decoders,
            best_effort,
        })
    }

    /// Build (or fetch) the decoder for one channel.
    ///
    /// Compiled routines are cached by channel for the reader's lifetime.
    fn decoder_for(&mut self, channel_id: u16) -> Result<Option<DecoderKind>> {
        if let Some(cached) = self.decoders.get(&channel_id) {
            return Ok(cached.clone());
        }
        let channel = self
            .channels
            .get(&channel_id)
            .ok_or(ContainerError::UnknownChannel { channel_id })?;

        let decoder = if channel.schema_id == 0 {
            Some(self.registry.build(&channel.message_encoding, "", "", &[])?)
        } else {
            match self.schemas.get(&channel.schema_id) {
                Some(schema) => Some(self.registry.build(
                    &channel.message_encoding,
                    &schema.encoding,
                    &schema.name,
                    &schema.data,
                )?),
                None if self.options.best_effort => {
                    tracing::warn!(
                        channel_id,
                        schema_id = channel.schema_id,
                        "skipping channel with unknown schema"
                    );
                    None
                }
                None => {
                    return Err(ContainerError::UnknownSchema {
                        schema_id: channel.schema_id,
                    }
                    .into())
                }
            }
        };
        self.decoders.insert(channel_id, decoder.clone());
        Ok(decoder)
    }
}

/// Iterator over filtered raw messages.
///
/// Each `next()` is a blocking call that may perform disk I/O and
/// decompression. Delivery follows chunk-index order; inside a chunk,
/// writer emission order, or a k-way merge when log-time order was
/// requested.
pub struct MessageIter<'a> {
    reader: &'a mut McapReader,
    chunks: Vec<ChunkIndexRecord>,
    next_chunk: usize,
    pending: std::vec::IntoIter<MessageRecord>,
    filter: MessageFilter,
    channels: Vec<u16>,
    done: bool,
}

impl Iterator for MessageIter<'_> {
    type Item = Result<McapMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(message) = self.pending.next() {
                let channel = self.reader.channels.get(&message.channel_id);
                let (topic, schema_id) = channel
                    .map(|c| (c.topic.clone(), c.schema_id))
                    .unwrap_or_default();
                return Some(Ok(McapMessage {
                    topic,
                    schema_id,
                    message,
                }));
            }
            if self.next_chunk >= self.chunks.len() {
                return None;
            }
            let index = self.chunks[self.next_chunk].clone();
            self.next_chunk += 1;
            match self
                .reader
                .chunk_messages(&index, &self.filter, &self.channels)
            {
                Ok(messages) => self.pending = messages.into_iter(),
                Err(error) => {
                    self.done = true;
                    return Some(Err(error));
                }
            }
        }
    }
}

/// Iterator over filtered, decoded messages.
pub struct DecodedMessageIter<'a> {
    inner: MessageIter<'a>,
    decoders: HashMap<u16, Option<DecoderKind>>,
    best_effort: bool,
}

impl Iterator for DecodedMessageIter<'_> {
    type Item = Result<(Value, McapMessage)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let message = match self.inner.next()? {
                Ok(message) => message,
                Err(error) => return Some(Err(error)),
            };
            let Some(decoder) = self.decoders.get(&message.message.channel_id) else {
                continue;
            };
            match decoder {
                None => continue, // best-effort skip: schema unknown
                Some(DecoderKind::Passthrough) => {
                    return Some(Ok((
                        Value::Bytes(message.message.data.clone()),
                        message,
                    )))
                }
                Some(DecoderKind::Compiled(compiled)) => {
                    match compiled.decode(&message.message.data) {
                        Ok(decoded) => return Some(Ok((Value::Struct(decoded), message))),
                        Err(error) if self.best_effort => {
                            tracing::warn!(%error, topic = %message.topic, "skipping undecodable message");
                            continue;
                        }
                        Err(error) => return Some(Err(error)),
                    }
                }
            }
        }
    }
}

/// Iterate all top-level records of a file (for structure dumps).
pub struct RecordScan {
    reader: Box<dyn ByteReader>,
    done: bool,
}

impl RecordScan {
    /// Open a file for raw record scanning.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = open_reader_with(path.as_ref(), None)?;
        parse_magic(reader.as_mut())?;
        Ok(Self {
            reader,
            done: false,
        })
    }
}

impl Iterator for RecordScan {
    type Item = Result<(u64, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.reader.remaining() == 0 {
            return None;
        }
        let offset = self.reader.tell();
        // Trailing magic after the footer
        if self.reader.remaining() == MCAP_MAGIC.len() as u64 {
            if let Ok(tail) = self.reader.peek(MCAP_MAGIC.len()) {
                if tail == MCAP_MAGIC {
                    return None;
                }
            }
        }
        match read_record(self.reader.as_mut()) {
            Ok(record) => {
                if matches!(record, Record::Footer(_)) {
                    self.done = true;
                }
                Some(Ok((offset, record)))
            }
            Err(error) => {
                self.done = true;
                match error {
                    Error::Codec(_) => None, // truncated tail
                    other => Some(Err(other)),
                }
            }
        }
    }
}
