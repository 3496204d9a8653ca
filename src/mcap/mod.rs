// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP container engine: record codec, chunked writer, indexed reader,
//! multi-file merged reader, CRC validation and the encryption interface.

pub mod chunk;
pub mod crc;
pub mod encryption;
pub mod multi;
pub mod reader;
pub mod records;
pub mod writer;

pub use chunk::{ChunkBuilder, ChunkCache};
pub use crc::validate_crc;
pub use encryption::EncryptionProvider;
pub use multi::{MultiDecodedMessageIter, MultiMcapReader, MultiMessageIter};
pub use reader::{
    DecodedMessageIter, McapMessage, McapReadOptions, McapReader, MessageFilter, MessageIter,
    RecordScan,
};
pub use records::{Record, MCAP_MAGIC};
pub use writer::{McapWriteOptions, McapWriter, DEFAULT_CHUNK_SIZE};
