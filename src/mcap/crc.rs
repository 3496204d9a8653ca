// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Whole-file CRC validation.
//!
//! Checks, in order: the data-section CRC recorded in DataEnd, every
//! attachment CRC, and every chunk's uncompressed CRC. A recorded CRC of
//! 0 means "not computed" and is skipped.

use std::path::Path;

use crate::core::Result;
use crate::io::{open_reader, ByteReader, CrcReader, ReadLe};
use crate::mcap::chunk::decompress_chunk;
use crate::mcap::records::{parse_magic, parse_record_body, Record, OP_DATA_END};

/// Validate every CRC an MCAP file carries.
///
/// Returns `Ok(false)` on the first mismatch. A data section whose record
/// framing no longer parses also fails validation: corruption that breaks
/// a length header is corruption all the same.
pub fn validate_crc<P: AsRef<Path>>(path: P) -> Result<bool> {
    let mut reader = CrcReader::new(open_reader(path.as_ref())?);
    parse_magic(&mut reader)?;
    // The data-section CRC starts at the first byte after the magic
    reader.clear_crc();

    let mut attachments = Vec::new();
    let mut chunks = Vec::new();
    let mut recorded_data_crc = None;

    loop {
        if reader.remaining() == 0 {
            break;
        }
        if reader.peek(1)? == [OP_DATA_END] {
            // The CRC covers the DataEnd opcode and length header but not
            // its CRC field
            let _opcode = reader.read_u8()?;
            let _length = reader.read_u64_le()?;
            let computed = reader.take_crc();
            let recorded = reader.read_u32_le()?;
            recorded_data_crc = Some((recorded, computed));
            break;
        }
        let offset = reader.tell();
        let opcode = match reader.read_u8() {
            Ok(opcode) => opcode,
            Err(_) => return Ok(false),
        };
        let length = match reader.read_u64_le() {
            Ok(length) => length,
            Err(_) => return Ok(false),
        };
        let body = match reader.read(length as usize) {
            Ok(body) => body,
            Err(_) => return Ok(false),
        };
        match parse_record_body(opcode, &body) {
            Ok(Record::Attachment(attachment)) => attachments.push(attachment),
            Ok(Record::Chunk(chunk)) => chunks.push((offset, chunk)),
            Ok(_) => {}
            Err(_) => return Ok(false),
        }
    }

    if let Some((recorded, computed)) = recorded_data_crc {
        if recorded != 0 && recorded != computed {
            tracing::debug!(recorded, computed, "data section CRC mismatch");
            return Ok(false);
        }
    }

    for attachment in attachments {
        if attachment.crc == 0 {
            continue;
        }
        let body = crate::mcap::records::record_body(&Record::Attachment(attachment.clone()));
        if crc32fast::hash(&body[..body.len() - 4]) != attachment.crc {
            tracing::debug!(name = %attachment.name, "attachment CRC mismatch");
            return Ok(false);
        }
    }

    for (offset, chunk) in chunks {
        if chunk.uncompressed_crc == 0 {
            continue;
        }
        if decompress_chunk(&chunk, offset, true).is_err() {
            return Ok(false);
        }
    }

    Ok(true)
}
