// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CDR codec.
//!
//! CDR payloads start with a 4-byte encapsulation header:
//! - Byte 0: unused (always 0)
//! - Byte 1: endianness flag (1 = little-endian, 0 = big-endian)
//! - Bytes 2-3: options (unused, 0)
//!
//! Every primitive is aligned to its natural width, with alignment
//! computed relative to the payload start (the byte after the header):
//! `(offset - origin) % size`. Strings carry a uint32 length that
//! includes the trailing NUL; wstrings carry a uint32 UTF-16 code-unit
//! count followed by UTF-16LE bytes.

use crate::core::{CodecError, Result};
use crate::encoding::{WireDecoder, WireEncoder};

/// Size of the CDR encapsulation header.
pub const CDR_HEADER_SIZE: usize = 4;

// ============================================================================
// Decoder
// ============================================================================

/// Cursor over CDR-encoded data with alignment tracking.
pub struct CdrDecoder<'a> {
    data: &'a [u8],
    offset: usize,
    origin: usize,
    little_endian: bool,
}

impl<'a> CdrDecoder<'a> {
    /// Create a decoder over data that includes the 4-byte CDR header.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() < CDR_HEADER_SIZE {
            return Err(CodecError::Truncated {
                requested: CDR_HEADER_SIZE,
                available: data.len(),
                position: 0,
            }
            .into());
        }
        Ok(Self {
            data,
            offset: CDR_HEADER_SIZE,
            origin: CDR_HEADER_SIZE,
            little_endian: data[1] == 1,
        })
    }

    /// Create a decoder over headerless data with explicit endianness.
    pub fn new_headerless(data: &'a [u8], little_endian: bool) -> Self {
        Self {
            data,
            offset: 0,
            origin: 0,
            little_endian,
        }
    }

    /// Whether the payload is little-endian.
    pub fn is_little_endian(&self) -> bool {
        self.little_endian
    }

    fn check(&self, n: usize) -> Result<()> {
        if self.offset + n > self.data.len() {
            return Err(CodecError::Truncated {
                requested: n,
                available: self.data.len() - self.offset,
                position: self.offset as u64,
            }
            .into());
        }
        Ok(())
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.check(N)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.data[self.offset..self.offset + N]);
        self.offset += N;
        Ok(buf)
    }
}

macro_rules! cdr_read {
    ($name:ident, $ty:ty, $width:expr) => {
        fn $name(&mut self) -> Result<$ty> {
            self.align($width)?;
            let bytes = self.take::<$width>()?;
            Ok(if self.little_endian {
                <$ty>::from_le_bytes(bytes)
            } else {
                <$ty>::from_be_bytes(bytes)
            })
        }
    };
}

impl WireDecoder for CdrDecoder<'_> {
    fn align(&mut self, size: usize) -> Result<()> {
        let misalign = (self.offset - self.origin) % size;
        if misalign > 0 {
            let padding = size - misalign;
            self.check(padding)?;
            self.offset += padding;
        }
        Ok(())
    }

    fn position(&self) -> u64 {
        self.offset as u64
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.take::<1>()?[0] != 0)
    }

    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take::<1>()?[0] as i8)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    cdr_read!(read_i16, i16, 2);
    cdr_read!(read_u16, u16, 2);
    cdr_read!(read_i32, i32, 4);
    cdr_read!(read_u32, u32, 4);
    cdr_read!(read_i64, i64, 8);
    cdr_read!(read_u64, u64, 8);
    cdr_read!(read_f32, f32, 4);
    cdr_read!(read_f64, f64, 8);

    fn read_bytes(&mut self, n: usize) -> Result<&[u8]> {
        self.check(n)?;
        let start = self.offset;
        self.offset += n;
        Ok(&self.data[start..self.offset])
    }

    fn read_string(&mut self) -> Result<String> {
        let length = self.read_u32()? as usize;
        let position = self.offset as u64;
        let raw = self.read_bytes(length)?;
        // Length includes the trailing NUL
        let payload = raw.strip_suffix(&[0]).unwrap_or(raw);
        std::str::from_utf8(payload)
            .map(str::to_owned)
            .map_err(|_| CodecError::BadUtf8 { position }.into())
    }

    fn read_wstring(&mut self) -> Result<String> {
        let count = self.read_u32()? as usize;
        let position = self.offset as u64;
        let raw = self.read_bytes(count * 2)?;
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        char::decode_utf16(units)
            .collect::<std::result::Result<String, _>>()
            .map_err(|_| CodecError::BadUtf16 { position }.into())
    }

    fn read_time(&mut self) -> Result<i64> {
        let secs = self.read_i32()? as i64;
        let nsecs = self.read_u32()? as i64;
        Ok(secs * 1_000_000_000 + nsecs)
    }

    fn read_duration(&mut self) -> Result<i64> {
        let secs = self.read_i32()? as i64;
        let nsecs = self.read_i32()? as i64;
        Ok(secs * 1_000_000_000 + nsecs)
    }
}

// ============================================================================
// Encoder
// ============================================================================

/// Builder for CDR-encoded payloads.
///
/// The 4-byte encapsulation header is written at construction; alignment
/// is relative to the byte after it.
pub struct CdrEncoder {
    buffer: Vec<u8>,
    origin: usize,
    little_endian: bool,
}

impl CdrEncoder {
    /// Create a little-endian encoder.
    pub fn new() -> Self {
        Self::with_endianness(true)
    }

    /// Create an encoder with explicit endianness.
    pub fn with_endianness(little_endian: bool) -> Self {
        Self {
            buffer: vec![0x00, little_endian as u8, 0x00, 0x00],
            origin: CDR_HEADER_SIZE,
            little_endian,
        }
    }

    /// Create an encoder that emits no encapsulation header.
    pub fn headerless() -> Self {
        Self {
            buffer: Vec::new(),
            origin: 0,
            little_endian: true,
        }
    }

    /// Bytes written so far (header included).
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    fn put(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }
}

impl Default for CdrEncoder {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! cdr_write {
    ($name:ident, $ty:ty, $width:expr) => {
        fn $name(&mut self, value: $ty) {
            self.align($width);
            let bytes = if self.little_endian {
                value.to_le_bytes()
            } else {
                value.to_be_bytes()
            };
            self.put(&bytes);
        }
    };
}

impl WireEncoder for CdrEncoder {
    fn align(&mut self, size: usize) {
        let misalign = (self.buffer.len() - self.origin) % size;
        if misalign > 0 {
            self.buffer.resize(self.buffer.len() + size - misalign, 0);
        }
    }

    fn write_bool(&mut self, value: bool) {
        self.put(&[value as u8]);
    }

    fn write_i8(&mut self, value: i8) {
        self.put(&[value as u8]);
    }

    fn write_u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    cdr_write!(write_i16, i16, 2);
    cdr_write!(write_u16, u16, 2);
    cdr_write!(write_i32, i32, 4);
    cdr_write!(write_u32, u32, 4);
    cdr_write!(write_i64, i64, 8);
    cdr_write!(write_u64, u64, 8);
    cdr_write!(write_f32, f32, 4);
    cdr_write!(write_f64, f64, 8);

    fn write_bytes(&mut self, data: &[u8]) {
        self.put(data);
    }

    fn write_string(&mut self, value: &str) {
        // Length includes the trailing NUL
        self.write_u32(value.len() as u32 + 1);
        self.put(value.as_bytes());
        self.put(&[0]);
    }

    fn write_wstring(&mut self, value: &str) {
        let units: Vec<u16> = value.encode_utf16().collect();
        self.write_u32(units.len() as u32);
        for unit in units {
            self.put(&unit.to_le_bytes());
        }
    }

    fn write_time(&mut self, nanos: i64) {
        self.write_i32(nanos.div_euclid(1_000_000_000) as i32);
        self.write_u32(nanos.rem_euclid(1_000_000_000) as u32);
    }

    fn write_duration(&mut self, nanos: i64) {
        self.write_i32(nanos.div_euclid(1_000_000_000) as i32);
        self.write_i32(nanos.rem_euclid(1_000_000_000) as i32);
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_endianness() {
        let le = CdrEncoder::new().into_bytes();
        assert_eq!(&le, &[0x00, 0x01, 0x00, 0x00]);

        let be = CdrEncoder::with_endianness(false).into_bytes();
        assert_eq!(&be, &[0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_primitive_round_trip() {
        let mut encoder = CdrEncoder::new();
        encoder.write_u8(7);
        encoder.write_u16(0x0302);
        encoder.write_u32(0x07060504);
        encoder.write_f64(1.5);
        let bytes = encoder.into_bytes();

        let mut decoder = CdrDecoder::new(&bytes).unwrap();
        assert!(decoder.is_little_endian());
        assert_eq!(decoder.read_u8().unwrap(), 7);
        assert_eq!(decoder.read_u16().unwrap(), 0x0302);
        assert_eq!(decoder.read_u32().unwrap(), 0x07060504);
        assert_eq!(decoder.read_f64().unwrap(), 1.5);
        assert_eq!(decoder.remaining(), 0);
    }

    #[test]
    fn test_alignment_relative_to_payload() {
        let mut encoder = CdrEncoder::new();
        encoder.write_u8(1);
        encoder.write_u32(2);
        let bytes = encoder.into_bytes();
        // header(4) + u8(1) + padding(3) + u32(4)
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[5..8], &[0, 0, 0]);

        let mut decoder = CdrDecoder::new(&bytes).unwrap();
        assert_eq!(decoder.read_u8().unwrap(), 1);
        assert_eq!(decoder.read_u32().unwrap(), 2);
    }

    #[test]
    fn test_first_u64_needs_no_padding() {
        let mut encoder = CdrEncoder::new();
        encoder.write_u64(42);
        let bytes = encoder.into_bytes();
        assert_eq!(bytes.len(), 12);

        let mut decoder = CdrDecoder::new(&bytes).unwrap();
        assert_eq!(decoder.read_u64().unwrap(), 42);
    }

    #[test]
    fn test_string_carries_nul() {
        let mut encoder = CdrEncoder::new();
        encoder.write_string("hi");
        let bytes = encoder.into_bytes();
        assert_eq!(&bytes[4..8], &3u32.to_le_bytes());
        assert_eq!(&bytes[8..11], b"hi\0");

        let mut decoder = CdrDecoder::new(&bytes).unwrap();
        assert_eq!(decoder.read_string().unwrap(), "hi");
    }

    #[test]
    fn test_wstring_round_trip() {
        let mut encoder = CdrEncoder::new();
        encoder.write_wstring("héllo");
        let bytes = encoder.into_bytes();

        let mut decoder = CdrDecoder::new(&bytes).unwrap();
        assert_eq!(decoder.read_wstring().unwrap(), "héllo");
    }

    #[test]
    fn test_big_endian_decode() {
        let mut data = vec![0x00, 0x00, 0x00, 0x00];
        data.extend_from_slice(&0x12345678u32.to_be_bytes());
        let mut decoder = CdrDecoder::new(&data).unwrap();
        assert_eq!(decoder.read_u32().unwrap(), 0x12345678);
    }

    #[test]
    fn test_truncated_read() {
        let data = vec![0x00, 0x01, 0x00, 0x00, 0x01, 0x02];
        let mut decoder = CdrDecoder::new(&data).unwrap();
        assert!(decoder.read_u32().is_err());
    }

    #[test]
    fn test_short_header_rejected() {
        assert!(CdrDecoder::new(&[0x00, 0x01]).is_err());
    }

    #[test]
    fn test_bad_utf8() {
        let mut data = vec![0x00, 0x01, 0x00, 0x00];
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&[0xFF, 0xFE, 0x00]);
        let mut decoder = CdrDecoder::new(&data).unwrap();
        match decoder.read_string() {
            Err(crate::core::Error::Codec(CodecError::BadUtf8 { .. })) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_time_round_trip() {
        let mut encoder = CdrEncoder::new();
        encoder.write_time(1_500_000_000);
        let bytes = encoder.into_bytes();
        let mut decoder = CdrDecoder::new(&bytes).unwrap();
        assert_eq!(decoder.read_time().unwrap(), 1_500_000_000);
    }
}
