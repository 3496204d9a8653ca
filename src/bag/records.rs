// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 bag record codec (format version 2.0).
//!
//! Every record is `header_len (u32) | header | data_len (u32) | data`,
//! where the header is a sequence of `field_len (u32) | name=value`
//! pairs with typed values. Times are two little-endian u32s (seconds,
//! nanoseconds) and cross the API boundary as one u64 nanosecond count.
//!
//! Op codes: 0x02 message data, 0x03 bag header, 0x04 index data,
//! 0x05 chunk, 0x06 chunk info, 0x07 connection.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{ContainerError, Result};
use crate::io::{ByteReader, ByteWriter, BytesWriter, WriteLe};

/// Magic line at the start of every bag file.
pub const BAG_MAGIC: &[u8] = b"#ROSBAG V2.0\n";

/// Record op codes.
pub const OP_MESSAGE_DATA: u8 = 0x02;
pub const OP_BAG_HEADER: u8 = 0x03;
pub const OP_INDEX_DATA: u8 = 0x04;
pub const OP_CHUNK: u8 = 0x05;
pub const OP_CHUNK_INFO: u8 = 0x06;
pub const OP_CONNECTION: u8 = 0x07;

/// The bag header record is padded to this many bytes so it can be
/// rewritten in place once the index position is known.
pub const BAG_HEADER_RECORD_LEN: usize = 4096;

/// Bag header record (op 0x03).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BagHeaderRecord {
    /// Offset of the index section; 0 while the bag is unindexed
    pub index_pos: u64,
    /// Number of unique connections
    pub conn_count: u32,
    /// Number of chunk records
    pub chunk_count: u32,
}

/// Chunk record (op 0x05).
#[derive(Debug, Clone, PartialEq)]
pub struct BagChunkRecord {
    /// Compression identifier ("none", "bz2", "lz4")
    pub compression: String,
    /// Uncompressed size of `data`
    pub size: u32,
    /// The (possibly compressed) inner record stream
    pub data: Vec<u8>,
}

/// Connection metadata carried in a connection record's data section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectionHeader {
    /// Topic as published (may differ from the record topic)
    pub topic: String,
    /// Message type, e.g. "std_msgs/String"
    pub message_type: String,
    /// MD5 of the message definition
    pub md5sum: String,
    /// Full message definition text
    pub message_definition: String,
    /// Publishing node, if recorded
    pub caller_id: Option<String>,
    /// Latching flag, if recorded
    pub latching: Option<String>,
}

/// Connection record (op 0x07).
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRecord {
    /// Connection id
    pub conn: u32,
    /// Topic the connection was recorded under
    pub topic: String,
    /// Connection metadata
    pub header: ConnectionHeader,
}

/// Message data record (op 0x02).
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDataRecord {
    /// Connection id
    pub conn: u32,
    /// Receipt time in nanoseconds
    pub time: u64,
    /// Serialized message payload
    pub data: Vec<u8>,
}

/// Index data record (op 0x04), version 1.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDataRecord {
    /// Index format version (1)
    pub ver: u32,
    /// Connection id
    pub conn: u32,
    /// `(time, offset)` pairs; offsets are into the uncompressed chunk
    pub entries: Vec<(u64, u32)>,
}

/// Chunk info record (op 0x06), version 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkInfoRecord {
    /// Chunk info format version (1)
    pub ver: u32,
    /// Offset of the chunk record
    pub chunk_pos: u64,
    /// Earliest message time in the chunk
    pub start_time: u64,
    /// Latest message time in the chunk
    pub end_time: u64,
    /// `(connection id, message count)` pairs
    pub counts: Vec<(u32, u32)>,
}

/// Any bag record.
#[derive(Debug, Clone, PartialEq)]
pub enum BagRecord {
    BagHeader(BagHeaderRecord),
    Chunk(BagChunkRecord),
    Connection(ConnectionRecord),
    MessageData(MessageDataRecord),
    IndexData(IndexDataRecord),
    ChunkInfo(ChunkInfoRecord),
}

impl BagRecord {
    /// The record's op code.
    pub fn op(&self) -> u8 {
        match self {
            BagRecord::MessageData(_) => OP_MESSAGE_DATA,
            BagRecord::BagHeader(_) => OP_BAG_HEADER,
            BagRecord::IndexData(_) => OP_INDEX_DATA,
            BagRecord::Chunk(_) => OP_CHUNK,
            BagRecord::ChunkInfo(_) => OP_CHUNK_INFO,
            BagRecord::Connection(_) => OP_CONNECTION,
        }
    }
}

// ============================================================================
// Header field helpers
// ============================================================================

fn malformed(reason: impl Into<String>) -> crate::core::Error {
    ContainerError::MalformedRecord {
        record: "bag",
        reason: reason.into(),
    }
    .into()
}

/// Parsed `name=value` header fields.
struct Fields(HashMap<String, Vec<u8>>);

impl Fields {
    fn parse(header: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(header);
        let mut fields = HashMap::new();
        while (cursor.position() as usize) < header.len() {
            let field_len = cursor
                .read_u32::<LittleEndian>()
                .map_err(|e| malformed(e.to_string()))? as usize;
            let mut field = vec![0u8; field_len];
            cursor
                .read_exact(&mut field)
                .map_err(|e| malformed(e.to_string()))?;
            let eq = field
                .iter()
                .position(|&b| b == b'=')
                .ok_or_else(|| malformed("header field without '='"))?;
            let name = String::from_utf8_lossy(&field[..eq]).to_string();
            fields.insert(name, field[eq + 1..].to_vec());
        }
        Ok(Self(fields))
    }

    fn u8(&self, name: &str) -> Result<u8> {
        match self.0.get(name) {
            Some(value) if value.len() == 1 => Ok(value[0]),
            Some(_) => Err(malformed(format!("field '{name}' is not one byte"))),
            None => Err(malformed(format!("missing field '{name}'"))),
        }
    }

    fn u32(&self, name: &str) -> Result<u32> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| malformed(format!("missing field '{name}'")))?;
        let bytes: [u8; 4] = value
            .as_slice()
            .try_into()
            .map_err(|_| malformed(format!("field '{name}' is not four bytes")))?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn u64(&self, name: &str) -> Result<u64> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| malformed(format!("missing field '{name}'")))?;
        let bytes: [u8; 8] = value
            .as_slice()
            .try_into()
            .map_err(|_| malformed(format!("field '{name}' is not eight bytes")))?;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Time field: two u32s (seconds, nanoseconds) as one nanosecond count.
    fn time(&self, name: &str) -> Result<u64> {
        let packed = self.u64(name)?;
        let secs = packed & 0xFFFF_FFFF;
        let nsecs = packed >> 32;
        Ok(secs * 1_000_000_000 + nsecs)
    }

    fn string(&self, name: &str) -> Result<String> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| malformed(format!("missing field '{name}'")))?;
        Ok(String::from_utf8_lossy(value).to_string())
    }

    fn opt_string(&self, name: &str) -> Option<String> {
        self.0
            .get(name)
            .map(|value| String::from_utf8_lossy(value).to_string())
    }
}

/// Pack a nanosecond count into the bag time layout.
fn pack_time(nanos: u64) -> [u8; 8] {
    let secs = (nanos / 1_000_000_000) as u32;
    let nsecs = (nanos % 1_000_000_000) as u32;
    let mut packed = [0u8; 8];
    packed[..4].copy_from_slice(&secs.to_le_bytes());
    packed[4..].copy_from_slice(&nsecs.to_le_bytes());
    packed
}

/// Serialize header fields into the bag header layout.
fn header_bytes(fields: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut out = BytesWriter::new();
    for (name, value) in fields {
        out.write_u32_le((name.len() + 1 + value.len()) as u32)
            .expect("in-memory write");
        out.write(name.as_bytes()).expect("in-memory write");
        out.write(b"=").expect("in-memory write");
        out.write(value).expect("in-memory write");
    }
    out.into_bytes()
}

// ============================================================================
// Parsing
// ============================================================================

/// Verify and consume the bag magic line.
pub fn parse_bag_magic(reader: &mut dyn ByteReader) -> Result<()> {
    let found = reader.read(BAG_MAGIC.len())?;
    if found != BAG_MAGIC {
        return Err(ContainerError::BadMagic {
            expected: hex::encode(BAG_MAGIC),
            found: hex::encode(&found),
        }
        .into());
    }
    Ok(())
}

/// Read one full bag record, leaving the reader at the end of its data.
pub fn read_bag_record(reader: &mut dyn ByteReader) -> Result<BagRecord> {
    use crate::io::ReadLe;

    let header_len = reader.read_u32_le()? as usize;
    let header = reader.read(header_len)?;
    let data_len = reader.read_u32_le()? as usize;
    let data = reader.read(data_len)?;

    let fields = Fields::parse(&header)?;
    let op = fields.u8("op")?;
    Ok(match op {
        OP_BAG_HEADER => BagRecord::BagHeader(BagHeaderRecord {
            index_pos: fields.u64("index_pos")?,
            conn_count: fields.u32("conn_count")?,
            chunk_count: fields.u32("chunk_count")?,
        }),
        OP_CHUNK => BagRecord::Chunk(BagChunkRecord {
            compression: fields.string("compression")?,
            size: fields.u32("size")?,
            data,
        }),
        OP_CONNECTION => {
            let conn_fields = Fields::parse(&data)?;
            BagRecord::Connection(ConnectionRecord {
                conn: fields.u32("conn")?,
                topic: fields.string("topic")?,
                header: ConnectionHeader {
                    topic: conn_fields.opt_string("topic").unwrap_or_default(),
                    message_type: conn_fields.string("type")?,
                    md5sum: conn_fields.string("md5sum")?,
                    message_definition: conn_fields.string("message_definition")?,
                    caller_id: conn_fields.opt_string("callerid"),
                    latching: conn_fields.opt_string("latching"),
                },
            })
        }
        OP_MESSAGE_DATA => BagRecord::MessageData(MessageDataRecord {
            conn: fields.u32("conn")?,
            time: fields.time("time")?,
            data,
        }),
        OP_INDEX_DATA => {
            let ver = fields.u32("ver")?;
            let count = fields.u32("count")? as usize;
            let mut cursor = Cursor::new(data.as_slice());
            let mut entries = Vec::with_capacity(count);
            for _ in 0..count {
                let secs = cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|e| malformed(e.to_string()))? as u64;
                let nsecs = cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|e| malformed(e.to_string()))? as u64;
                let offset = cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|e| malformed(e.to_string()))?;
                entries.push((secs * 1_000_000_000 + nsecs, offset));
            }
            BagRecord::IndexData(IndexDataRecord {
                ver,
                conn: fields.u32("conn")?,
                entries,
            })
        }
        OP_CHUNK_INFO => {
            let ver = fields.u32("ver")?;
            let count = fields.u32("count")? as usize;
            let mut cursor = Cursor::new(data.as_slice());
            let mut counts = Vec::with_capacity(count);
            for _ in 0..count {
                let conn = cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|e| malformed(e.to_string()))?;
                let message_count = cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|e| malformed(e.to_string()))?;
                counts.push((conn, message_count));
            }
            BagRecord::ChunkInfo(ChunkInfoRecord {
                ver,
                chunk_pos: fields.u64("chunk_pos")?,
                start_time: fields.time("start_time")?,
                end_time: fields.time("end_time")?,
                counts,
            })
        }
        op => {
            return Err(ContainerError::UnknownOpcode {
                opcode: op,
                offset: reader.tell(),
            }
            .into())
        }
    })
}

// ============================================================================
// Writing
// ============================================================================

fn emit(writer: &mut dyn ByteWriter, header: &[u8], data: &[u8]) -> Result<()> {
    writer.write_u32_le(header.len() as u32)?;
    writer.write(header)?;
    writer.write_u32_le(data.len() as u32)?;
    writer.write(data)
}

/// Write a full bag record: header length, header, data length, data.
///
/// The bag header record is space-padded to [`BAG_HEADER_RECORD_LEN`]
/// bytes so it can be rewritten in place at finalization.
pub fn write_bag_record(writer: &mut dyn ByteWriter, record: &BagRecord) -> Result<()> {
    match record {
        BagRecord::BagHeader(r) => {
            let header = header_bytes(&[
                ("op", vec![OP_BAG_HEADER]),
                ("index_pos", r.index_pos.to_le_bytes().to_vec()),
                ("conn_count", r.conn_count.to_le_bytes().to_vec()),
                ("chunk_count", r.chunk_count.to_le_bytes().to_vec()),
            ]);
            let padding = BAG_HEADER_RECORD_LEN.saturating_sub(8 + header.len());
            emit(writer, &header, &vec![b' '; padding])
        }
        BagRecord::Chunk(r) => {
            let header = header_bytes(&[
                ("op", vec![OP_CHUNK]),
                ("compression", r.compression.as_bytes().to_vec()),
                ("size", r.size.to_le_bytes().to_vec()),
            ]);
            emit(writer, &header, &r.data)
        }
        BagRecord::Connection(r) => {
            let header = header_bytes(&[
                ("op", vec![OP_CONNECTION]),
                ("conn", r.conn.to_le_bytes().to_vec()),
                ("topic", r.topic.as_bytes().to_vec()),
            ]);
            let mut conn_fields: Vec<(&str, Vec<u8>)> = vec![
                ("topic", r.header.topic.as_bytes().to_vec()),
                ("type", r.header.message_type.as_bytes().to_vec()),
                ("md5sum", r.header.md5sum.as_bytes().to_vec()),
                (
                    "message_definition",
                    r.header.message_definition.as_bytes().to_vec(),
                ),
            ];
            if let Some(caller_id) = &r.header.caller_id {
                conn_fields.push(("callerid", caller_id.as_bytes().to_vec()));
            }
            if let Some(latching) = &r.header.latching {
                conn_fields.push(("latching", latching.as_bytes().to_vec()));
            }
            emit(writer, &header, &header_bytes(&conn_fields))
        }
        BagRecord::MessageData(r) => {
            let header = header_bytes(&[
                ("op", vec![OP_MESSAGE_DATA]),
                ("conn", r.conn.to_le_bytes().to_vec()),
                ("time", pack_time(r.time).to_vec()),
            ]);
            emit(writer, &header, &r.data)
        }
        BagRecord::IndexData(r) => {
            let header = header_bytes(&[
                ("op", vec![OP_INDEX_DATA]),
                ("ver", r.ver.to_le_bytes().to_vec()),
                ("conn", r.conn.to_le_bytes().to_vec()),
                ("count", (r.entries.len() as u32).to_le_bytes().to_vec()),
            ]);
            let mut data = BytesWriter::new();
            for (time, offset) in &r.entries {
                data.write(&pack_time(*time))?;
                data.write_u32_le(*offset)?;
            }
            emit(writer, &header, data.as_bytes())
        }
        BagRecord::ChunkInfo(r) => {
            let header = header_bytes(&[
                ("op", vec![OP_CHUNK_INFO]),
                ("ver", r.ver.to_le_bytes().to_vec()),
                ("chunk_pos", r.chunk_pos.to_le_bytes().to_vec()),
                ("start_time", pack_time(r.start_time).to_vec()),
                ("end_time", pack_time(r.end_time).to_vec()),
                ("count", (r.counts.len() as u32).to_le_bytes().to_vec()),
            ]);
            let mut data = BytesWriter::new();
            for (conn, message_count) in &r.counts {
                data.write_u32_le(*conn)?;
                data.write_u32_le(*message_count)?;
            }
            emit(writer, &header, data.as_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BytesReader;

    fn round_trip(record: BagRecord) -> BagRecord {
        let mut writer = BytesWriter::new();
        write_bag_record(&mut writer, &record).unwrap();
        let mut reader = BytesReader::new(writer.into_bytes());
        let parsed = read_bag_record(&mut reader).unwrap();
        assert_eq!(reader.remaining(), 0);
        parsed
    }

    #[test]
    fn test_bag_header_round_trip_and_padding() {
        let record = BagRecord::BagHeader(BagHeaderRecord {
            index_pos: 4096 + 13,
            conn_count: 2,
            chunk_count: 3,
        });
        let mut writer = BytesWriter::new();
        write_bag_record(&mut writer, &record).unwrap();
        // Fixed-size region so the header can be rewritten in place
        assert_eq!(writer.size(), BAG_HEADER_RECORD_LEN);

        let mut reader = BytesReader::new(writer.into_bytes());
        assert_eq!(read_bag_record(&mut reader).unwrap(), record);
    }

    #[test]
    fn test_connection_round_trip() {
        let record = BagRecord::Connection(ConnectionRecord {
            conn: 0,
            topic: "/chatter".to_string(),
            header: ConnectionHeader {
                topic: "/chatter".to_string(),
                message_type: "std_msgs/String".to_string(),
                md5sum: "992ce8a1687cec8c8bd883ec73ca41d1".to_string(),
                message_definition: "string data".to_string(),
                caller_id: Some("/talker".to_string()),
                latching: None,
            },
        });
        assert_eq!(round_trip(record.clone()), record);
    }

    #[test]
    fn test_message_data_time_packing() {
        let record = BagRecord::MessageData(MessageDataRecord {
            conn: 1,
            time: 1_500_000_007,
            data: vec![6, 0, 0, 0, b'h', b'i'],
        });
        assert_eq!(round_trip(record.clone()), record);
    }

    #[test]
    fn test_index_data_round_trip() {
        let record = BagRecord::IndexData(IndexDataRecord {
            ver: 1,
            conn: 0,
            entries: vec![(1_000_000_000, 0), (2_500_000_000, 64)],
        });
        assert_eq!(round_trip(record.clone()), record);
    }

    #[test]
    fn test_chunk_info_round_trip() {
        let record = BagRecord::ChunkInfo(ChunkInfoRecord {
            ver: 1,
            chunk_pos: 4109,
            start_time: 1_000_000_000,
            end_time: 3_000_000_000,
            counts: vec![(0, 5), (1, 2)],
        });
        assert_eq!(round_trip(record.clone()), record);
    }

    #[test]
    fn test_magic() {
        let mut reader = BytesReader::new(BAG_MAGIC.to_vec());
        parse_bag_magic(&mut reader).unwrap();

        let mut reader = BytesReader::new(b"#ROSBAG V1.2\n".to_vec());
        assert!(parse_bag_magic(&mut reader).is_err());
    }
}
