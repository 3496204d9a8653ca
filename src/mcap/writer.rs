// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP container writer.
//!
//! Messages are buffered into an active chunk and flushed when the
//! uncompressed size crosses the configured threshold, when the target
//! channel changes in topic-sorted mode, before attachments and metadata,
//! and on finish. The summary section carries deduplicated Schema and
//! Channel records, chunk/attachment/metadata indexes, statistics and one
//! SummaryOffset per group, followed by the footer and trailing magic.
//!
//! The data-section CRC covers every byte after the opening magic up to
//! and including the DataEnd record's opcode and length header; the
//! summary CRC covers the summary section up to and including the
//! footer's `summary_offset_start` field.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::core::{ContainerError, Result};
use crate::io::{
    AppendFileWriter, ByteWriter, Compression, CrcWriter, FileReader, FileWriter, WriteLe,
};
use crate::mcap::chunk::ChunkBuilder;
use crate::mcap::reader::McapReader;
use crate::mcap::records::{
    write_record, AttachmentIndexRecord, AttachmentRecord, ChannelRecord, ChunkIndexRecord,
    HeaderRecord, MessageIndexRecord, MessageRecord, MetadataIndexRecord, MetadataRecord, Record,
    SchemaRecord, StatisticsRecord, SummaryOffsetRecord, MCAP_MAGIC, OP_ATTACHMENT_INDEX,
    OP_CHANNEL, OP_CHUNK_INDEX, OP_DATA_END, OP_FOOTER, OP_METADATA_INDEX, OP_SCHEMA,
    OP_STATISTICS,
};

/// Default uncompressed chunk size threshold (4 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Read granularity when re-seeding the data-section CRC in append mode.
const CRC_RESEED_CHUNK: usize = 8 * 1024 * 1024;

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct McapWriteOptions {
    /// Header profile ("ros1", "ros2" or "")
    pub profile: String,
    /// Header library identifier
    pub library: String,
    /// Uncompressed chunk size threshold in bytes
    pub chunk_size: usize,
    /// Chunk compression
    pub compression: Compression,
    /// Whether data-section, chunk and summary CRCs are computed
    pub crc_enabled: bool,
    /// Flush the active chunk whenever the target channel changes, so
    /// each chunk holds exactly one channel
    pub topic_sorted: bool,
}

impl Default for McapWriteOptions {
    fn default() -> Self {
        Self {
            profile: String::new(),
            library: format!("robolog {}", env!("CARGO_PKG_VERSION")),
            chunk_size: DEFAULT_CHUNK_SIZE,
            compression: Compression::Zstd,
            crc_enabled: true,
            topic_sorted: false,
        }
    }
}

impl McapWriteOptions {
    /// Set the header profile.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the chunk size threshold.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the chunk compression.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Enable or disable CRC computation.
    pub fn with_crc(mut self, enabled: bool) -> Self {
        self.crc_enabled = enabled;
        self
    }

    /// Enable topic-sorted chunking.
    pub fn with_topic_sorted(mut self, enabled: bool) -> Self {
        self.topic_sorted = enabled;
        self
    }
}

/// MCAP container writer over any byte sink.
pub struct McapWriter<W: ByteWriter> {
    out: CrcWriter<W>,
    options: McapWriteOptions,
    chunk: ChunkBuilder,

    schema_ids: HashMap<(String, String, Vec<u8>), u16>,
    schemas: Vec<SchemaRecord>,
    channel_ids: HashMap<(String, u16), u16>,
    channels: Vec<ChannelRecord>,
    sequences: HashMap<u16, u32>,

    chunk_indexes: Vec<ChunkIndexRecord>,
    attachment_indexes: Vec<AttachmentIndexRecord>,
    metadata_indexes: Vec<MetadataIndexRecord>,
    statistics: StatisticsRecord,
    message_start_time: u64,
    message_end_time: u64,

    finished: bool,
}

impl McapWriter<FileWriter> {
    /// Create a writer over a new file with default options.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with_options(path, McapWriteOptions::default())
    }

    /// Create a writer over a new file.
    pub fn create_with_options<P: AsRef<Path>>(
        path: P,
        options: McapWriteOptions,
    ) -> Result<Self> {
        Self::new(FileWriter::create(path)?, options)
    }
}

impl McapWriter<AppendFileWriter> {
    /// Reopen a finalized MCAP file and continue writing.
    ///
    /// The file is positioned at its pre-existing DataEnd record, the
    /// summary and trailing magic are truncated, writer state is rebuilt
    /// from the prior summary (or a rescan), and the running data-section
    /// CRC is re-seeded by re-reading the data section.
    pub fn append<P: AsRef<Path>>(path: P, options: McapWriteOptions) -> Result<Self> {
        let path = path.as_ref();
        let reader = McapReader::open(path)?;
        let data_end_offset = reader.data_end_offset().ok_or(ContainerError::Truncated {
            offset: reader.file_size(),
        })?;

        let schemas: Vec<SchemaRecord> = reader.schemas().values().cloned().collect();
        let channels: Vec<ChannelRecord> = reader.channels().values().cloned().collect();
        let statistics = reader.statistics().clone();
        let chunk_indexes = reader.chunk_indexes().to_vec();
        let attachment_indexes = reader.attachment_indexes().to_vec();
        let metadata_indexes = reader.metadata_indexes().to_vec();
        drop(reader);

        let mut file = AppendFileWriter::open(path)?;
        file.seek(data_end_offset)?;
        file.truncate()?;
        let mut out = CrcWriter::new(file);

        // Continue the data-section CRC from the existing bytes
        if options.crc_enabled {
            let mut existing = FileReader::open(path)?;
            use crate::io::ByteReader;
            existing.seek_from_start(MCAP_MAGIC.len() as u64)?;
            let mut remaining = data_end_offset - MCAP_MAGIC.len() as u64;
            while remaining > 0 {
                let step = (remaining as usize).min(CRC_RESEED_CHUNK);
                let data = existing.read(step)?;
                out.seed(&data);
                remaining -= step as u64;
            }
        }

        let mut schema_ids = HashMap::new();
        for schema in &schemas {
            schema_ids.insert(
                (schema.name.clone(), schema.encoding.clone(), schema.data.clone()),
                schema.id,
            );
        }
        let mut channel_ids = HashMap::new();
        let mut sequences = HashMap::new();
        for channel in &channels {
            channel_ids.insert((channel.topic.clone(), channel.schema_id), channel.id);
            // Sequences continue monotonically from the prior counts
            let count = statistics
                .channel_message_counts
                .get(&channel.id)
                .copied()
                .unwrap_or(0);
            sequences.insert(channel.id, count as u32);
        }

        let message_start_time = if statistics.message_count > 0 {
            statistics.message_start_time
        } else {
            u64::MAX
        };
        let message_end_time = statistics.message_end_time;

        tracing::debug!(
            schemas = schemas.len(),
            channels = channels.len(),
            messages = statistics.message_count,
            "appending to existing file"
        );

        Ok(Self {
            out,
            options,
            chunk: ChunkBuilder::new(),
            schema_ids,
            schemas,
            channel_ids,
            channels,
            sequences,
            chunk_indexes,
            attachment_indexes,
            metadata_indexes,
            statistics,
            message_start_time,
            message_end_time,
            finished: false,
        })
    }
}

impl<W: ByteWriter> McapWriter<W> {
    /// Create a writer over an arbitrary sink.
    pub fn new(writer: W, options: McapWriteOptions) -> Result<Self> {
        let mut out = CrcWriter::new(writer);
        out.write(&MCAP_MAGIC)?;
        // The data-section CRC starts at the first byte after the magic
        out.clear_crc();
        write_record(
            &mut out,
            &Record::Header(HeaderRecord {
                profile: options.profile.clone(),
                library: options.library.clone(),
            }),
        )?;

        Ok(Self {
            out,
            options,
            chunk: ChunkBuilder::new(),
            schema_ids: HashMap::new(),
            schemas: Vec::new(),
            channel_ids: HashMap::new(),
            channels: Vec::new(),
            sequences: HashMap::new(),
            chunk_indexes: Vec::new(),
            attachment_indexes: Vec::new(),
            metadata_indexes: Vec::new(),
            statistics: StatisticsRecord::default(),
            message_start_time: u64::MAX,
            message_end_time: 0,
            finished: false,
        })
    }

    /// Register a schema, returning its id.
    ///
    /// Idempotent by content: registering identical (name, encoding, data)
    /// returns the existing id. Id 0 stays reserved for "no schema".
    pub fn add_schema(&mut self, name: &str, encoding: &str, data: &[u8]) -> Result<u16> {
        let key = (name.to_string(), encoding.to_string(), data.to_vec());
        if let Some(&id) = self.schema_ids.get(&key) {
            return Ok(id);
        }

        let id = self.schemas.iter().map(|s| s.id).max().map_or(1, |m| m + 1);
        let record = SchemaRecord {
            id,
            name: name.to_string(),
            encoding: encoding.to_string(),
            data: data.to_vec(),
        };
        write_record(&mut self.out, &Record::Schema(record.clone()))?;
        self.schemas.push(record);
        self.schema_ids.insert(key, id);
        self.statistics.schema_count = self.schemas.len() as u16;
        Ok(id)
    }

    /// Register a channel, returning its id.
    ///
    /// Idempotent by `(topic, schema_id)`. Channel ids are unique and
    /// monotonic within the file.
    pub fn add_channel(
        &mut self,
        topic: &str,
        message_encoding: &str,
        schema_id: u16,
        metadata: BTreeMap<String, String>,
    ) -> Result<u16> {
        if schema_id != 0 && !self.schemas.iter().any(|s| s.id == schema_id) {
            return Err(ContainerError::UnknownSchema { schema_id }.into());
        }
        let key = (topic.to_string(), schema_id);
        if let Some(&id) = self.channel_ids.get(&key) {
            return Ok(id);
        }

        let id = self
            .channels
            .iter()
            .map(|c| c.id + 1)
            .max()
            .unwrap_or(0);
        let record = ChannelRecord {
            id,
            schema_id,
            topic: topic.to_string(),
            message_encoding: message_encoding.to_string(),
            metadata,
        };
        write_record(&mut self.out, &Record::Channel(record.clone()))?;
        self.channels.push(record);
        self.channel_ids.insert(key, id);
        self.sequences.entry(id).or_insert(0);
        self.statistics.channel_count = self.channels.len() as u32;
        self.statistics.channel_message_counts.entry(id).or_insert(0);
        Ok(id)
    }

    /// Append a message to the active chunk.
    ///
    /// `sequence` defaults to the channel's own monotonic counter;
    /// `publish_time` defaults to `log_time`.
    pub fn write_message(
        &mut self,
        channel_id: u16,
        sequence: Option<u32>,
        log_time: u64,
        publish_time: Option<u64>,
        data: &[u8],
    ) -> Result<()> {
        if !self.channels.iter().any(|c| c.id == channel_id) {
            return Err(ContainerError::UnknownChannel { channel_id }.into());
        }

        // One channel per chunk in topic-sorted mode
        if self.options.topic_sorted
            && !self.chunk.is_empty()
            && self.chunk.last_channel() != Some(channel_id)
        {
            self.flush_chunk()?;
        }

        let counter = self.sequences.entry(channel_id).or_insert(0);
        let sequence = sequence.unwrap_or(*counter);
        *counter = sequence.wrapping_add(1);

        let message = MessageRecord {
            channel_id,
            sequence,
            log_time,
            publish_time: publish_time.unwrap_or(log_time),
            data: data.to_vec(),
        };
        self.chunk.add_message(&message)?;

        self.statistics.message_count += 1;
        *self
            .statistics
            .channel_message_counts
            .entry(channel_id)
            .or_insert(0) += 1;
        self.message_start_time = self.message_start_time.min(log_time);
        self.message_end_time = self.message_end_time.max(log_time);

        if self.chunk.size() >= self.options.chunk_size {
            self.flush_chunk()?;
        }
        Ok(())
    }

    /// Write an attachment into the data section.
    ///
    /// The pending chunk is flushed first; chunks never cross attachment
    /// records. A zero `crc` is filled in when CRCs are enabled.
    pub fn write_attachment(&mut self, mut attachment: AttachmentRecord) -> Result<()> {
        self.flush_chunk()?;

        if self.options.crc_enabled && attachment.crc == 0 {
            // The attachment CRC covers every body field before it
            let body = crate::mcap::records::record_body(&Record::Attachment(attachment.clone()));
            attachment.crc = crc32fast::hash(&body[..body.len() - 4]);
        }

        let offset = self.out.tell();
        write_record(&mut self.out, &Record::Attachment(attachment.clone()))?;
        self.attachment_indexes.push(AttachmentIndexRecord {
            offset,
            length: self.out.tell() - offset,
            log_time: attachment.log_time,
            create_time: attachment.create_time,
            data_size: attachment.data.len() as u64,
            name: attachment.name,
            media_type: attachment.media_type,
        });
        self.statistics.attachment_count += 1;
        Ok(())
    }

    /// Write a metadata record into the data section.
    pub fn write_metadata(&mut self, metadata: MetadataRecord) -> Result<()> {
        self.flush_chunk()?;

        let offset = self.out.tell();
        write_record(&mut self.out, &Record::Metadata(metadata.clone()))?;
        self.metadata_indexes.push(MetadataIndexRecord {
            offset,
            length: self.out.tell() - offset,
            name: metadata.name,
        });
        self.statistics.metadata_count += 1;
        Ok(())
    }

    /// Flush the active chunk, if non-empty.
    ///
    /// Emits the Chunk record, one MessageIndex per channel in channel-id
    /// order, and appends the derived ChunkIndex.
    pub fn flush_chunk(&mut self) -> Result<()> {
        if self.chunk.is_empty() {
            return Ok(());
        }

        let (chunk, per_channel_index, _count) = self
            .chunk
            .finish(self.options.compression, self.options.crc_enabled)?;

        let chunk_start_offset = self.out.tell();
        let compressed_size = chunk.records.len() as u64;
        let uncompressed_size = chunk.uncompressed_size;
        let message_start_time = chunk.message_start_time;
        let message_end_time = chunk.message_end_time;
        let compression = chunk.compression.clone();
        write_record(&mut self.out, &Record::Chunk(chunk))?;
        let chunk_length = self.out.tell() - chunk_start_offset;

        let message_index_start = self.out.tell();
        let mut message_index_offsets = BTreeMap::new();
        for (channel_id, records) in per_channel_index {
            message_index_offsets.insert(channel_id, self.out.tell());
            write_record(
                &mut self.out,
                &Record::MessageIndex(MessageIndexRecord {
                    channel_id,
                    records,
                }),
            )?;
        }
        let message_index_length = self.out.tell() - message_index_start;

        self.chunk_indexes.push(ChunkIndexRecord {
            message_start_time,
            message_end_time,
            chunk_start_offset,
            chunk_length,
            message_index_offsets,
            message_index_length,
            compression,
            compressed_size,
            uncompressed_size,
        });
        self.statistics.chunk_count = self.chunk_indexes.len() as u32;
        Ok(())
    }

    /// Number of messages written so far.
    pub fn message_count(&self) -> u64 {
        self.statistics.message_count
    }

    /// Number of channels registered so far.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of chunks emitted so far.
    pub fn chunk_count(&self) -> usize {
        self.chunk_indexes.len()
    }

    /// Finalize the file: DataEnd, summary section, footer, magic.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.flush_chunk()?;

        self.statistics.message_start_time = if self.statistics.message_count > 0 {
            self.message_start_time
        } else {
            0
        };
        self.statistics.message_end_time = if self.statistics.message_count > 0 {
            self.message_end_time
        } else {
            0
        };

        // DataEnd: the data-section CRC includes this record's opcode and
        // length header but not its CRC field
        self.out.write_u8(OP_DATA_END)?;
        self.out.write_u64_le(4)?;
        let data_section_crc = if self.options.crc_enabled {
            self.out.take_crc()
        } else {
            0
        };
        self.out.write_u32_le(data_section_crc)?;

        // Summary section; its CRC runs from here through the footer's
        // summary_offset_start field
        self.out.clear_crc();
        let summary_start = self.out.tell();
        let mut summary_offsets: Vec<SummaryOffsetRecord> = Vec::new();

        {
            let group_start = self.out.tell();
            for schema in &self.schemas.clone() {
                write_record(&mut self.out, &Record::Schema(schema.clone()))?;
            }
            push_group(&mut summary_offsets, OP_SCHEMA, group_start, self.out.tell());
        }
        {
            let group_start = self.out.tell();
            for channel in &self.channels.clone() {
                write_record(&mut self.out, &Record::Channel(channel.clone()))?;
            }
            push_group(&mut summary_offsets, OP_CHANNEL, group_start, self.out.tell());
        }
        {
            let group_start = self.out.tell();
            for chunk_index in &self.chunk_indexes.clone() {
                write_record(&mut self.out, &Record::ChunkIndex(chunk_index.clone()))?;
            }
            push_group(
                &mut summary_offsets,
                OP_CHUNK_INDEX,
                group_start,
                self.out.tell(),
            );
        }
        {
            let group_start = self.out.tell();
            for index in &self.attachment_indexes.clone() {
                write_record(&mut self.out, &Record::AttachmentIndex(index.clone()))?;
            }
            push_group(
                &mut summary_offsets,
                OP_ATTACHMENT_INDEX,
                group_start,
                self.out.tell(),
            );
        }
        {
            let group_start = self.out.tell();
            for index in &self.metadata_indexes.clone() {
                write_record(&mut self.out, &Record::MetadataIndex(index.clone()))?;
            }
            push_group(
                &mut summary_offsets,
                OP_METADATA_INDEX,
                group_start,
                self.out.tell(),
            );
        }
        {
            let group_start = self.out.tell();
            write_record(&mut self.out, &Record::Statistics(self.statistics.clone()))?;
            push_group(
                &mut summary_offsets,
                OP_STATISTICS,
                group_start,
                self.out.tell(),
            );
        }

        let summary_offset_start = self.out.tell();
        for offset in summary_offsets {
            write_record(&mut self.out, &Record::SummaryOffset(offset))?;
        }

        // Footer, with the summary CRC computed over everything from the
        // summary start through the summary_offset_start field
        self.out.write_u8(OP_FOOTER)?;
        self.out.write_u64_le(20)?;
        self.out.write_u64_le(summary_start)?;
        self.out.write_u64_le(summary_offset_start)?;
        let summary_crc = if self.options.crc_enabled {
            self.out.take_crc()
        } else {
            0
        };
        self.out.write_u32_le(summary_crc)?;
        self.out.write(&MCAP_MAGIC)?;
        self.out.flush()?;
        self.finished = true;

        tracing::debug!(
            schemas = self.schemas.len(),
            channels = self.channels.len(),
            chunks = self.chunk_indexes.len(),
            messages = self.statistics.message_count,
            "summary section written"
        );
        Ok(())
    }

    /// Unwrap the underlying sink after [`finish`](Self::finish).
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

fn push_group(groups: &mut Vec<SummaryOffsetRecord>, opcode: u8, start: u64, end: u64) {
    if end > start {
        groups.push(SummaryOffsetRecord {
            group_opcode: opcode,
            group_start: start,
            group_length: end - start,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BytesWriter;

    fn memory_writer(options: McapWriteOptions) -> McapWriter<BytesWriter> {
        McapWriter::new(BytesWriter::new(), options).unwrap()
    }

    #[test]
    fn test_magic_at_both_ends() {
        let mut writer = memory_writer(McapWriteOptions::default());
        writer.finish().unwrap();
        let bytes = writer.into_inner().into_bytes();
        assert_eq!(&bytes[..8], &MCAP_MAGIC);
        assert_eq!(&bytes[bytes.len() - 8..], &MCAP_MAGIC);
    }

    #[test]
    fn test_add_schema_idempotent_by_content() {
        let mut writer = memory_writer(McapWriteOptions::default());
        let a = writer.add_schema("t/A", "ros2msg", b"int32 x").unwrap();
        let same = writer.add_schema("t/A", "ros2msg", b"int32 x").unwrap();
        let different = writer.add_schema("t/A", "ros2msg", b"int64 x").unwrap();
        assert_eq!(a, 1);
        assert_eq!(same, a);
        assert_eq!(different, 2);
    }

    #[test]
    fn test_add_channel_idempotent_by_topic_and_schema() {
        let mut writer = memory_writer(McapWriteOptions::default());
        let schema = writer.add_schema("t/A", "ros2msg", b"int32 x").unwrap();
        let a = writer
            .add_channel("/a", "cdr", schema, BTreeMap::new())
            .unwrap();
        let same = writer
            .add_channel("/a", "cdr", schema, BTreeMap::new())
            .unwrap();
        let b = writer
            .add_channel("/b", "cdr", schema, BTreeMap::new())
            .unwrap();
        assert_eq!(a, 0);
        assert_eq!(same, a);
        assert_eq!(b, 1);
    }

    #[test]
    fn test_unknown_channel_rejected() {
        let mut writer = memory_writer(McapWriteOptions::default());
        match writer.write_message(9, None, 0, None, b"x") {
            Err(crate::core::Error::Container(ContainerError::UnknownChannel {
                channel_id,
            })) => assert_eq!(channel_id, 9),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_sequences_monotonic_per_channel() {
        let mut writer = memory_writer(McapWriteOptions::default());
        let schema = writer.add_schema("t/A", "ros2msg", b"int32 x").unwrap();
        let a = writer
            .add_channel("/a", "cdr", schema, BTreeMap::new())
            .unwrap();
        let b = writer
            .add_channel("/b", "cdr", schema, BTreeMap::new())
            .unwrap();
        for t in 0..3 {
            writer.write_message(a, None, t, None, b"x").unwrap();
            writer.write_message(b, None, t, None, b"x").unwrap();
        }
        assert_eq!(writer.sequences[&a], 3);
        assert_eq!(writer.sequences[&b], 3);
    }

    #[test]
    fn test_chunk_flush_on_threshold() {
        let options = McapWriteOptions::default()
            .with_chunk_size(1)
            .with_compression(Compression::None);
        let mut writer = memory_writer(options);
        let schema = writer.add_schema("t/A", "ros2msg", b"int32 x").unwrap();
        let channel = writer
            .add_channel("/a", "cdr", schema, BTreeMap::new())
            .unwrap();
        writer.write_message(channel, None, 1, None, b"x").unwrap();
        writer.write_message(channel, None, 2, None, b"x").unwrap();
        // Threshold of one byte: every message gets its own chunk
        assert_eq!(writer.chunk_count(), 2);
    }

    #[test]
    fn test_topic_sorted_flushes_on_channel_switch() {
        let options = McapWriteOptions::default().with_topic_sorted(true);
        let mut writer = memory_writer(options);
        let schema = writer.add_schema("t/A", "ros2msg", b"int32 x").unwrap();
        let a = writer
            .add_channel("/a", "cdr", schema, BTreeMap::new())
            .unwrap();
        let b = writer
            .add_channel("/b", "cdr", schema, BTreeMap::new())
            .unwrap();
        writer.write_message(a, None, 1, None, b"x").unwrap();
        writer.write_message(a, None, 2, None, b"x").unwrap();
        writer.write_message(b, None, 3, None, b"x").unwrap();
        assert_eq!(writer.chunk_count(), 1);
        writer.finish().unwrap();
        assert_eq!(writer.chunk_count(), 2);
    }

    #[test]
    fn test_statistics_counts_sum() {
        let mut writer = memory_writer(McapWriteOptions::default());
        let schema = writer.add_schema("t/A", "ros2msg", b"int32 x").unwrap();
        let a = writer
            .add_channel("/a", "cdr", schema, BTreeMap::new())
            .unwrap();
        let b = writer
            .add_channel("/b", "cdr", schema, BTreeMap::new())
            .unwrap();
        writer.write_message(a, None, 1, None, b"x").unwrap();
        writer.write_message(b, None, 2, None, b"x").unwrap();
        writer.write_message(a, None, 3, None, b"x").unwrap();
        writer.finish().unwrap();

        let sum: u64 = writer.statistics.channel_message_counts.values().sum();
        assert_eq!(sum, writer.statistics.message_count);
        assert_eq!(writer.statistics.message_start_time, 1);
        assert_eq!(writer.statistics.message_end_time, 3);
    }
}
