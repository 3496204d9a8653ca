// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP record codec.
//!
//! Every record is `opcode (1) | body_length (8, LE u64) | body`. Parsers
//! consume exactly the declared body and leave the reader positioned at
//! the end of it; writers emit opcode, length and body in one pass.
//! Strings use u32 length prefixes; maps use a u32 byte-length prefix
//! followed by key/value pairs.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{ContainerError, Result};
use crate::io::{ByteReader, ByteWriter, BytesWriter, WriteLe};

/// MCAP magic bytes, present at file start and end.
pub const MCAP_MAGIC: [u8; 8] = [0x89, b'M', b'C', b'A', b'P', 0x30, b'\r', b'\n'];

/// Record opcodes.
pub const OP_HEADER: u8 = 0x01;
pub const OP_FOOTER: u8 = 0x02;
pub const OP_SCHEMA: u8 = 0x03;
pub const OP_CHANNEL: u8 = 0x04;
pub const OP_MESSAGE: u8 = 0x05;
pub const OP_CHUNK: u8 = 0x06;
pub const OP_MESSAGE_INDEX: u8 = 0x07;
pub const OP_CHUNK_INDEX: u8 = 0x08;
pub const OP_ATTACHMENT: u8 = 0x09;
pub const OP_ATTACHMENT_INDEX: u8 = 0x0A;
pub const OP_STATISTICS: u8 = 0x0B;
pub const OP_METADATA: u8 = 0x0C;
pub const OP_METADATA_INDEX: u8 = 0x0D;
pub const OP_SUMMARY_OFFSET: u8 = 0x0E;
pub const OP_DATA_END: u8 = 0x0F;

/// Byte length of the footer record including opcode and length header.
pub const FOOTER_RECORD_LEN: u64 = 1 + 8 + 20;

// ============================================================================
// Record types
// ============================================================================

/// Header record (op 0x01).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeaderRecord {
    /// Profile, e.g. "ros1" or "ros2"
    pub profile: String,
    /// Writing library identifier
    pub library: String,
}

/// Footer record (op 0x02).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FooterRecord {
    /// Offset of the summary section, 0 if absent
    pub summary_start: u64,
    /// Offset of the summary-offset group, 0 if absent
    pub summary_offset_start: u64,
    /// CRC32 of the summary section, 0 if not computed
    pub summary_crc: u32,
}

/// Schema record (op 0x03). Id 0 is reserved for "no schema".
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRecord {
    /// Schema id, unique within the file
    pub id: u16,
    /// Fully qualified type name
    pub name: String,
    /// Schema encoding ("ros1msg", "ros2msg", ...)
    pub encoding: String,
    /// Schema text or descriptor bytes
    pub data: Vec<u8>,
}

/// Channel record (op 0x04).
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRecord {
    /// Channel id, unique and monotonic within the file
    pub id: u16,
    /// Referenced schema id, 0 for schemaless channels
    pub schema_id: u16,
    /// Topic name
    pub topic: String,
    /// Message encoding ("cdr", "ros1", ...)
    pub message_encoding: String,
    /// Free-form channel metadata
    pub metadata: BTreeMap<String, String>,
}

/// Message record (op 0x05).
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    /// Referencing channel id
    pub channel_id: u16,
    /// Per-channel sequence number
    pub sequence: u32,
    /// Log time in nanoseconds
    pub log_time: u64,
    /// Publish time in nanoseconds
    pub publish_time: u64,
    /// Serialized payload
    pub data: Vec<u8>,
}

/// Chunk record (op 0x06).
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    /// Earliest message log time in the chunk
    pub message_start_time: u64,
    /// Latest message log time in the chunk
    pub message_end_time: u64,
    /// Byte length of `records` before compression
    pub uncompressed_size: u64,
    /// CRC32 of the uncompressed records; 0 means "not computed"
    pub uncompressed_crc: u32,
    /// Compression identifier ("", "lz4", "zstd")
    pub compression: String,
    /// The (possibly compressed) record stream
    pub records: Vec<u8>,
}

/// MessageIndex record (op 0x07); belongs to exactly one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageIndexRecord {
    /// The indexed channel
    pub channel_id: u16,
    /// `(log_time, offset)` pairs; offsets are into the uncompressed chunk
    pub records: Vec<(u64, u64)>,
}

/// ChunkIndex record (op 0x08).
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkIndexRecord {
    /// Earliest message log time in the chunk
    pub message_start_time: u64,
    /// Latest message log time in the chunk
    pub message_end_time: u64,
    /// Offset of the chunk record's opcode byte
    pub chunk_start_offset: u64,
    /// Total chunk record length (opcode and length header included)
    pub chunk_length: u64,
    /// Per-channel MessageIndex record offsets
    pub message_index_offsets: BTreeMap<u16, u64>,
    /// Total byte length of the chunk's MessageIndex records
    pub message_index_length: u64,
    /// Compression identifier of the chunk
    pub compression: String,
    /// Compressed size of the chunk records field
    pub compressed_size: u64,
    /// Uncompressed size of the chunk records field
    pub uncompressed_size: u64,
}

/// Attachment record (op 0x09).
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentRecord {
    /// Attachment log time
    pub log_time: u64,
    /// Attachment creation time
    pub create_time: u64,
    /// Attachment name
    pub name: String,
    /// Media type, e.g. "image/png"
    pub media_type: String,
    /// Attachment payload
    pub data: Vec<u8>,
    /// CRC32 of the preceding body fields; 0 means "not computed"
    pub crc: u32,
}

/// AttachmentIndex record (op 0x0A).
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentIndexRecord {
    /// Offset of the attachment record
    pub offset: u64,
    /// Total attachment record length
    pub length: u64,
    /// Attachment log time
    pub log_time: u64,
    /// Attachment creation time
    pub create_time: u64,
    /// Payload size
    pub data_size: u64,
    /// Attachment name
    pub name: String,
    /// Media type
    pub media_type: String,
}

/// Statistics record (op 0x0B).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatisticsRecord {
    /// Total message count
    pub message_count: u64,
    /// Number of schemas
    pub schema_count: u16,
    /// Number of channels
    pub channel_count: u32,
    /// Number of attachments
    pub attachment_count: u32,
    /// Number of metadata records
    pub metadata_count: u32,
    /// Number of chunks
    pub chunk_count: u32,
    /// Earliest message log time
    pub message_start_time: u64,
    /// Latest message log time
    pub message_end_time: u64,
    /// Per-channel message counts; sums to `message_count`
    pub channel_message_counts: BTreeMap<u16, u64>,
}

/// Metadata record (op 0x0C).
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    /// Metadata name
    pub name: String,
    /// Key/value pairs
    pub metadata: BTreeMap<String, String>,
}

/// MetadataIndex record (op 0x0D).
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataIndexRecord {
    /// Offset of the metadata record
    pub offset: u64,
    /// Total metadata record length
    pub length: u64,
    /// Metadata name
    pub name: String,
}

/// SummaryOffset record (op 0x0E), one per summary record kind.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOffsetRecord {
    /// Opcode of the summarised group
    pub group_opcode: u8,
    /// Offset of the group's first record
    pub group_start: u64,
    /// Byte length of the group
    pub group_length: u64,
}

/// DataEnd record (op 0x0F).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataEndRecord {
    /// CRC32 of the data section; 0 means "not computed"
    pub data_section_crc: u32,
}

/// Any MCAP record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Header(HeaderRecord),
    Footer(FooterRecord),
    Schema(SchemaRecord),
    Channel(ChannelRecord),
    Message(MessageRecord),
    Chunk(ChunkRecord),
    MessageIndex(MessageIndexRecord),
    ChunkIndex(ChunkIndexRecord),
    Attachment(AttachmentRecord),
    AttachmentIndex(AttachmentIndexRecord),
    Statistics(StatisticsRecord),
    Metadata(MetadataRecord),
    MetadataIndex(MetadataIndexRecord),
    SummaryOffset(SummaryOffsetRecord),
    DataEnd(DataEndRecord),
    /// Opcode outside the known range; body preserved for round trips
    Unknown { opcode: u8, data: Vec<u8> },
}

impl Record {
    /// The record's opcode.
    pub fn opcode(&self) -> u8 {
        match self {
            Record::Header(_) => OP_HEADER,
            Record::Footer(_) => OP_FOOTER,
            Record::Schema(_) => OP_SCHEMA,
            Record::Channel(_) => OP_CHANNEL,
            Record::Message(_) => OP_MESSAGE,
            Record::Chunk(_) => OP_CHUNK,
            Record::MessageIndex(_) => OP_MESSAGE_INDEX,
            Record::ChunkIndex(_) => OP_CHUNK_INDEX,
            Record::Attachment(_) => OP_ATTACHMENT,
            Record::AttachmentIndex(_) => OP_ATTACHMENT_INDEX,
            Record::Statistics(_) => OP_STATISTICS,
            Record::Metadata(_) => OP_METADATA,
            Record::MetadataIndex(_) => OP_METADATA_INDEX,
            Record::SummaryOffset(_) => OP_SUMMARY_OFFSET,
            Record::DataEnd(_) => OP_DATA_END,
            Record::Unknown { opcode, .. } => *opcode,
        }
    }
}

// ============================================================================
// Body cursor
// ============================================================================

/// Cursor over one record body with malformed-record error context.
struct Body<'a> {
    record: &'static str,
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Body<'a> {
    fn new(record: &'static str, data: &'a [u8]) -> Self {
        Self {
            record,
            cursor: Cursor::new(data),
        }
    }

    fn err(&self, reason: impl Into<String>) -> crate::core::Error {
        ContainerError::MalformedRecord {
            record: self.record,
            reason: reason.into(),
        }
        .into()
    }

    fn u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(|e| self.err(e.to_string()))
    }

    fn u16(&mut self) -> Result<u16> {
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|e| self.err(e.to_string()))
    }

    fn u32(&mut self) -> Result<u32> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| self.err(e.to_string()))
    }

    fn u64(&mut self) -> Result<u64> {
        self.cursor
            .read_u64::<LittleEndian>()
            .map_err(|e| self.err(e.to_string()))
    }

    fn bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.cursor
            .read_exact(&mut buf)
            .map_err(|e| self.err(e.to_string()))?;
        Ok(buf)
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let raw = self.bytes(len)?;
        String::from_utf8(raw).map_err(|_| self.err("string is not valid UTF-8"))
    }

    fn str_map(&mut self) -> Result<BTreeMap<String, String>> {
        let byte_len = self.u32()? as u64;
        let end = self.cursor.position() + byte_len;
        let mut map = BTreeMap::new();
        while self.cursor.position() < end {
            let key = self.string()?;
            let value = self.string()?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn rest(&mut self) -> Vec<u8> {
        let pos = self.cursor.position() as usize;
        self.cursor.get_ref()[pos..].to_vec()
    }
}

fn str_map_bytes(map: &BTreeMap<String, String>) -> Vec<u8> {
    let mut body = BytesWriter::new();
    let byte_len: usize = map
        .iter()
        .map(|(k, v)| 4 + k.len() + 4 + v.len())
        .sum();
    body.write_u32_le(byte_len as u32).expect("in-memory write");
    for (key, value) in map {
        body.write_str(key).expect("in-memory write");
        body.write_str(value).expect("in-memory write");
    }
    body.into_bytes()
}

// ============================================================================
// Parsing
// ============================================================================

/// Verify and consume the 8-byte magic at the reader's position.
pub fn parse_magic(reader: &mut dyn ByteReader) -> Result<()> {
    let found = reader.read(MCAP_MAGIC.len())?;
    if found != MCAP_MAGIC {
        return Err(ContainerError::BadMagic {
            expected: hex::encode(MCAP_MAGIC),
            found: hex::encode(&found),
        }
        .into());
    }
    Ok(())
}

/// Read one full record, leaving the reader at the end of its body.
pub fn read_record(reader: &mut dyn ByteReader) -> Result<Record> {
    let offset = reader.tell();
    let header = reader.read(9)?;
    let opcode = header[0];
    let length = u64::from_le_bytes(header[1..9].try_into().expect("9-byte header"));
    if opcode == 0 {
        return Err(ContainerError::UnknownOpcode { opcode, offset }.into());
    }
    let body = reader.read(length as usize)?;
    parse_record_body(opcode, &body)
}

/// Parse a record body for a known opcode.
pub fn parse_record_body(opcode: u8, body: &[u8]) -> Result<Record> {
    Ok(match opcode {
        OP_HEADER => {
            let mut b = Body::new("Header", body);
            Record::Header(HeaderRecord {
                profile: b.string()?,
                library: b.string()?,
            })
        }
        OP_FOOTER => {
            let mut b = Body::new("Footer", body);
            Record::Footer(FooterRecord {
                summary_start: b.u64()?,
                summary_offset_start: b.u64()?,
                summary_crc: b.u32()?,
            })
        }
        OP_SCHEMA => {
            let mut b = Body::new("Schema", body);
            let id = b.u16()?;
            let name = b.string()?;
            let encoding = b.string()?;
            let data_len = b.u32()? as usize;
            let data = b.bytes(data_len)?;
            Record::Schema(SchemaRecord {
                id,
                name,
                encoding,
                data,
            })
        }
        OP_CHANNEL => {
            let mut b = Body::new("Channel", body);
            Record::Channel(ChannelRecord {
                id: b.u16()?,
                schema_id: b.u16()?,
                topic: b.string()?,
                message_encoding: b.string()?,
                metadata: b.str_map()?,
            })
        }
        OP_MESSAGE => {
            let mut b = Body::new("Message", body);
            Record::Message(MessageRecord {
                channel_id: b.u16()?,
                sequence: b.u32()?,
                log_time: b.u64()?,
                publish_time: b.u64()?,
                data: b.rest(),
            })
        }
        OP_CHUNK => {
            let mut b = Body::new("Chunk", body);
            let message_start_time = b.u64()?;
            let message_end_time = b.u64()?;
            let uncompressed_size = b.u64()?;
            let uncompressed_crc = b.u32()?;
            let compression = b.string()?;
            let records_len = b.u64()? as usize;
            let records = b.bytes(records_len)?;
            Record::Chunk(ChunkRecord {
                message_start_time,
                message_end_time,
                uncompressed_size,
                uncompressed_crc,
                compression,
                records,
            })
        }
        OP_MESSAGE_INDEX => {
            let mut b = Body::new("MessageIndex", body);
            let channel_id = b.u16()?;
            let byte_len = b.u32()? as usize;
            let mut records = Vec::with_capacity(byte_len / 16);
            for _ in 0..byte_len / 16 {
                records.push((b.u64()?, b.u64()?));
            }
            Record::MessageIndex(MessageIndexRecord {
                channel_id,
                records,
            })
        }
        OP_CHUNK_INDEX => {
            let mut b = Body::new("ChunkIndex", body);
            let message_start_time = b.u64()?;
            let message_end_time = b.u64()?;
            let chunk_start_offset = b.u64()?;
            let chunk_length = b.u64()?;
            let map_len = b.u32()? as usize;
            let mut message_index_offsets = BTreeMap::new();
            for _ in 0..map_len / 10 {
                let channel_id = b.u16()?;
                let offset = b.u64()?;
                message_index_offsets.insert(channel_id, offset);
            }
            Record::ChunkIndex(ChunkIndexRecord {
                message_start_time,
                message_end_time,
                chunk_start_offset,
                chunk_length,
                message_index_offsets,
                message_index_length: b.u64()?,
                compression: b.string()?,
                compressed_size: b.u64()?,
                uncompressed_size: b.u64()?,
            })
        }
        OP_ATTACHMENT => {
            let mut b = Body::new("Attachment", body);
            let log_time = b.u64()?;
            let create_time = b.u64()?;
            let name = b.string()?;
            let media_type = b.string()?;
            let data_len = b.u64()? as usize;
            let data = b.bytes(data_len)?;
            let crc = b.u32()?;
            Record::Attachment(AttachmentRecord {
                log_time,
                create_time,
                name,
                media_type,
                data,
                crc,
            })
        }
        OP_ATTACHMENT_INDEX => {
            let mut b = Body::new("AttachmentIndex", body);
            Record::AttachmentIndex(AttachmentIndexRecord {
                offset: b.u64()?,
                length: b.u64()?,
                log_time: b.u64()?,
                create_time: b.u64()?,
                data_size: b.u64()?,
                name: b.string()?,
                media_type: b.string()?,
            })
        }
        OP_STATISTICS => {
            let mut b = Body::new("Statistics", body);
            let message_count = b.u64()?;
            let schema_count = b.u16()?;
            let channel_count = b.u32()?;
            let attachment_count = b.u32()?;
            let metadata_count = b.u32()?;
            let chunk_count = b.u32()?;
            let message_start_time = b.u64()?;
            let message_end_time = b.u64()?;
            let map_len = b.u32()? as usize;
            let mut channel_message_counts = BTreeMap::new();
            for _ in 0..map_len / 10 {
                let channel_id = b.u16()?;
                let count = b.u64()?;
                channel_message_counts.insert(channel_id, count);
            }
            Record::Statistics(StatisticsRecord {
                message_count,
                schema_count,
                channel_count,
                attachment_count,
                metadata_count,
                chunk_count,
                message_start_time,
                message_end_time,
                channel_message_counts,
            })
        }
        OP_METADATA => {
            let mut b = Body::new("Metadata", body);
            Record::Metadata(MetadataRecord {
                name: b.string()?,
                metadata: b.str_map()?,
            })
        }
        OP_METADATA_INDEX => {
            let mut b = Body::new("MetadataIndex", body);
            Record::MetadataIndex(MetadataIndexRecord {
                offset: b.u64()?,
                length: b.u64()?,
                name: b.string()?,
            })
        }
        OP_SUMMARY_OFFSET => {
            let mut b = Body::new("SummaryOffset", body);
            Record::SummaryOffset(SummaryOffsetRecord {
                group_opcode: b.u8()?,
                group_start: b.u64()?,
                group_length: b.u64()?,
            })
        }
        OP_DATA_END => {
            let mut b = Body::new("DataEnd", body);
            Record::DataEnd(DataEndRecord {
                data_section_crc: b.u32()?,
            })
        }
        opcode => Record::Unknown {
            opcode,
            data: body.to_vec(),
        },
    })
}

// ============================================================================
// Writing
// ============================================================================

fn emit(writer: &mut dyn ByteWriter, opcode: u8, body: &[u8]) -> Result<()> {
    writer.write_u8(opcode)?;
    writer.write_u64_le(body.len() as u64)?;
    writer.write(body)
}

/// Serialize a record body (opcode and length header excluded).
pub fn record_body(record: &Record) -> Vec<u8> {
    let mut b = BytesWriter::new();
    let w: &mut dyn ByteWriter = &mut b;
    // In-memory writes cannot fail
    let result: Result<()> = (|| {
        match record {
            Record::Header(r) => {
                w.write_str(&r.profile)?;
                w.write_str(&r.library)?;
            }
            Record::Footer(r) => {
                w.write_u64_le(r.summary_start)?;
                w.write_u64_le(r.summary_offset_start)?;
                w.write_u32_le(r.summary_crc)?;
            }
            Record::Schema(r) => {
                w.write_u16_le(r.id)?;
                w.write_str(&r.name)?;
                w.write_str(&r.encoding)?;
                w.write_u32_le(r.data.len() as u32)?;
                w.write(&r.data)?;
            }
            Record::Channel(r) => {
                w.write_u16_le(r.id)?;
                w.write_u16_le(r.schema_id)?;
                w.write_str(&r.topic)?;
                w.write_str(&r.message_encoding)?;
                w.write(&str_map_bytes(&r.metadata))?;
            }
            Record::Message(r) => {
                w.write_u16_le(r.channel_id)?;
                w.write_u32_le(r.sequence)?;
                w.write_u64_le(r.log_time)?;
                w.write_u64_le(r.publish_time)?;
                w.write(&r.data)?;
            }
            Record::Chunk(r) => {
                w.write_u64_le(r.message_start_time)?;
                w.write_u64_le(r.message_end_time)?;
                w.write_u64_le(r.uncompressed_size)?;
                w.write_u32_le(r.uncompressed_crc)?;
                w.write_str(&r.compression)?;
                w.write_u64_le(r.records.len() as u64)?;
                w.write(&r.records)?;
            }
            Record::MessageIndex(r) => {
                w.write_u16_le(r.channel_id)?;
                w.write_u32_le((r.records.len() * 16) as u32)?;
                for (log_time, offset) in &r.records {
                    w.write_u64_le(*log_time)?;
                    w.write_u64_le(*offset)?;
                }
            }
            Record::ChunkIndex(r) => {
                w.write_u64_le(r.message_start_time)?;
                w.write_u64_le(r.message_end_time)?;
                w.write_u64_le(r.chunk_start_offset)?;
                w.write_u64_le(r.chunk_length)?;
                w.write_u32_le((r.message_index_offsets.len() * 10) as u32)?;
                for (channel_id, offset) in &r.message_index_offsets {
                    w.write_u16_le(*channel_id)?;
                    w.write_u64_le(*offset)?;
                }
                w.write_u64_le(r.message_index_length)?;
                w.write_str(&r.compression)?;
                w.write_u64_le(r.compressed_size)?;
                w.write_u64_le(r.uncompressed_size)?;
            }
            Record::Attachment(r) => {
                w.write_u64_le(r.log_time)?;
                w.write_u64_le(r.create_time)?;
                w.write_str(&r.name)?;
                w.write_str(&r.media_type)?;
                w.write_u64_le(r.data.len() as u64)?;
                w.write(&r.data)?;
                w.write_u32_le(r.crc)?;
            }
            Record::AttachmentIndex(r) => {
                w.write_u64_le(r.offset)?;
                w.write_u64_le(r.length)?;
                w.write_u64_le(r.log_time)?;
                w.write_u64_le(r.create_time)?;
                w.write_u64_le(r.data_size)?;
                w.write_str(&r.name)?;
                w.write_str(&r.media_type)?;
            }
            Record::Statistics(r) => {
                w.write_u64_le(r.message_count)?;
                w.write_u16_le(r.schema_count)?;
                w.write_u32_le(r.channel_count)?;
                w.write_u32_le(r.attachment_count)?;
                w.write_u32_le(r.metadata_count)?;
                w.write_u32_le(r.chunk_count)?;
                w.write_u64_le(r.message_start_time)?;
                w.write_u64_le(r.message_end_time)?;
                w.write_u32_le((r.channel_message_counts.len() * 10) as u32)?;
                for (channel_id, count) in &r.channel_message_counts {
                    w.write_u16_le(*channel_id)?;
                    w.write_u64_le(*count)?;
                }
            }
            Record::Metadata(r) => {
                w.write_str(&r.name)?;
                w.write(&str_map_bytes(&r.metadata))?;
            }
            Record::MetadataIndex(r) => {
                w.write_u64_le(r.offset)?;
                w.write_u64_le(r.length)?;
                w.write_str(&r.name)?;
            }
            Record::SummaryOffset(r) => {
                w.write_u8(r.group_opcode)?;
                w.write_u64_le(r.group_start)?;
                w.write_u64_le(r.group_length)?;
            }
            Record::DataEnd(r) => {
                w.write_u32_le(r.data_section_crc)?;
            }
            Record::Unknown { data, .. } => {
                w.write(data)?;
            }
        }
        Ok(())
    })();
    result.expect("in-memory write");
    b.into_bytes()
}

/// Write a full record: opcode, body length, body.
pub fn write_record(writer: &mut dyn ByteWriter, record: &Record) -> Result<()> {
    emit(writer, record.opcode(), &record_body(record))
}

/// Total serialized length of a record including opcode and length header.
pub fn record_len(record: &Record) -> u64 {
    1 + 8 + record_body(record).len() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BytesReader;

    fn round_trip(record: Record) {
        let mut writer = BytesWriter::new();
        write_record(&mut writer, &record).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = BytesReader::new(bytes);
        let parsed = read_record(&mut reader).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(reader.remaining(), 0, "parser must consume the whole body");
    }

    #[test]
    fn test_round_trip_all_record_types() {
        round_trip(Record::Header(HeaderRecord {
            profile: "ros2".to_string(),
            library: "robolog 0.1.0".to_string(),
        }));
        round_trip(Record::Footer(FooterRecord {
            summary_start: 1234,
            summary_offset_start: 5678,
            summary_crc: 0xDEADBEEF,
        }));
        round_trip(Record::Schema(SchemaRecord {
            id: 1,
            name: "std_msgs/msg/String".to_string(),
            encoding: "ros2msg".to_string(),
            data: b"string data".to_vec(),
        }));
        round_trip(Record::Channel(ChannelRecord {
            id: 0,
            schema_id: 1,
            topic: "/chatter".to_string(),
            message_encoding: "cdr".to_string(),
            metadata: BTreeMap::from([("k".to_string(), "v".to_string())]),
        }));
        round_trip(Record::Message(MessageRecord {
            channel_id: 0,
            sequence: 7,
            log_time: 1_000,
            publish_time: 999,
            data: vec![1, 2, 3],
        }));
        round_trip(Record::Chunk(ChunkRecord {
            message_start_time: 1,
            message_end_time: 2,
            uncompressed_size: 64,
            uncompressed_crc: 42,
            compression: "zstd".to_string(),
            records: vec![9; 16],
        }));
        round_trip(Record::MessageIndex(MessageIndexRecord {
            channel_id: 3,
            records: vec![(1, 0), (2, 48)],
        }));
        round_trip(Record::ChunkIndex(ChunkIndexRecord {
            message_start_time: 1,
            message_end_time: 2,
            chunk_start_offset: 100,
            chunk_length: 200,
            message_index_offsets: BTreeMap::from([(0, 300), (1, 340)]),
            message_index_length: 80,
            compression: "lz4".to_string(),
            compressed_size: 128,
            uncompressed_size: 256,
        }));
        round_trip(Record::Attachment(AttachmentRecord {
            log_time: 5,
            create_time: 4,
            name: "calib.yaml".to_string(),
            media_type: "text/yaml".to_string(),
            data: b"k: v".to_vec(),
            crc: 0,
        }));
        round_trip(Record::AttachmentIndex(AttachmentIndexRecord {
            offset: 10,
            length: 50,
            log_time: 5,
            create_time: 4,
            data_size: 4,
            name: "calib.yaml".to_string(),
            media_type: "text/yaml".to_string(),
        }));
        round_trip(Record::Statistics(StatisticsRecord {
            message_count: 3,
            schema_count: 1,
            channel_count: 2,
            attachment_count: 0,
            metadata_count: 0,
            chunk_count: 1,
            message_start_time: 1,
            message_end_time: 3,
            channel_message_counts: BTreeMap::from([(0, 2), (1, 1)]),
        }));
        round_trip(Record::Metadata(MetadataRecord {
            name: "robot".to_string(),
            metadata: BTreeMap::from([("serial".to_string(), "A1".to_string())]),
        }));
        round_trip(Record::MetadataIndex(MetadataIndexRecord {
            offset: 77,
            length: 30,
            name: "robot".to_string(),
        }));
        round_trip(Record::SummaryOffset(SummaryOffsetRecord {
            group_opcode: OP_SCHEMA,
            group_start: 900,
            group_length: 120,
        }));
        round_trip(Record::DataEnd(DataEndRecord {
            data_section_crc: 0x1234,
        }));
    }

    #[test]
    fn test_unknown_opcode_preserved() {
        round_trip(Record::Unknown {
            opcode: 0x42,
            data: vec![1, 2, 3],
        });
    }

    #[test]
    fn test_zero_opcode_rejected() {
        let mut reader = BytesReader::new(vec![0u8; 9]);
        match read_record(&mut reader) {
            Err(crate::core::Error::Container(ContainerError::UnknownOpcode {
                opcode, ..
            })) => assert_eq!(opcode, 0),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_magic_round_trip() {
        let mut reader = BytesReader::new(MCAP_MAGIC.to_vec());
        parse_magic(&mut reader).unwrap();
        assert_eq!(reader.remaining(), 0);

        let mut reader = BytesReader::new(vec![0; 8]);
        assert!(parse_magic(&mut reader).is_err());
    }

    #[test]
    fn test_message_data_is_body_remainder() {
        // No length prefix on message data: body length bounds it
        let record = Record::Message(MessageRecord {
            channel_id: 1,
            sequence: 0,
            log_time: 10,
            publish_time: 10,
            data: vec![0xAB; 5],
        });
        let body = record_body(&record);
        assert_eq!(body.len(), 2 + 4 + 8 + 8 + 5);
    }
}
