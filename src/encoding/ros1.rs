// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 wire codec.
//!
//! ROS1 serialization is little-endian with no alignment padding and no
//! encapsulation header. Strings carry a uint32 byte length and no NUL
//! terminator. `time` and `duration` encode as two 32-bit fields
//! (seconds, nanoseconds) and cross the API boundary as a single i64
//! nanosecond count. `char` aliases int8 and `byte` aliases uint8.

use crate::core::{CodecError, Result};
use crate::encoding::{WireDecoder, WireEncoder};

// ============================================================================
// Decoder
// ============================================================================

/// Cursor over ROS1-encoded data.
pub struct Ros1Decoder<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Ros1Decoder<'a> {
    /// Create a decoder over a ROS1 payload.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
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

macro_rules! ros1_read {
    ($name:ident, $ty:ty, $width:expr) => {
        fn $name(&mut self) -> Result<$ty> {
            Ok(<$ty>::from_le_bytes(self.take::<$width>()?))
        }
    };
}

impl WireDecoder for Ros1Decoder<'_> {
    fn align(&mut self, _size: usize) -> Result<()> {
        // ROS1 streams are packed
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

    ros1_read!(read_i16, i16, 2);
    ros1_read!(read_u16, u16, 2);
    ros1_read!(read_i32, i32, 4);
    ros1_read!(read_u32, u32, 4);
    ros1_read!(read_i64, i64, 8);
    ros1_read!(read_u64, u64, 8);
    ros1_read!(read_f32, f32, 4);
    ros1_read!(read_f64, f64, 8);

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
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| CodecError::BadUtf8 { position }.into())
    }

    fn read_wstring(&mut self) -> Result<String> {
        // ROS1 has no wstring; treat as a plain string
        self.read_string()
    }

    fn read_time(&mut self) -> Result<i64> {
        let secs = self.read_i32()? as i64;
        let nsecs = self.read_i32()? as i64;
        Ok(secs * 1_000_000_000 + nsecs)
    }

    fn read_duration(&mut self) -> Result<i64> {
        self.read_time()
    }
}

// ============================================================================
// Encoder
// ============================================================================

/// Builder for ROS1-encoded payloads.
#[derive(Default)]
pub struct Ros1Encoder {
    buffer: Vec<u8>,
}

impl Ros1Encoder {
    /// Create an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    pub fn size(&self) -> usize {
        self.buffer.len()
    }
}

macro_rules! ros1_write {
    ($name:ident, $ty:ty) => {
        fn $name(&mut self, value: $ty) {
            self.buffer.extend_from_slice(&value.to_le_bytes());
        }
    };
}

impl WireEncoder for Ros1Encoder {
    fn align(&mut self, _size: usize) {
        // ROS1 streams are packed
    }

    fn write_bool(&mut self, value: bool) {
        self.buffer.push(value as u8);
    }

    fn write_i8(&mut self, value: i8) {
        self.buffer.push(value as u8);
    }

    fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    ros1_write!(write_i16, i16);
    ros1_write!(write_u16, u16);
    ros1_write!(write_i32, i32);
    ros1_write!(write_u32, u32);
    ros1_write!(write_i64, i64);
    ros1_write!(write_u64, u64);
    ros1_write!(write_f32, f32);
    ros1_write!(write_f64, f64);

    fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    fn write_string(&mut self, value: &str) {
        // Byte length, no NUL terminator
        self.write_u32(value.len() as u32);
        self.buffer.extend_from_slice(value.as_bytes());
    }

    fn write_wstring(&mut self, value: &str) {
        self.write_string(value);
    }

    fn write_time(&mut self, nanos: i64) {
        self.write_i32(nanos.div_euclid(1_000_000_000) as i32);
        self.write_i32(nanos.rem_euclid(1_000_000_000) as i32);
    }

    fn write_duration(&mut self, nanos: i64) {
        self.write_time(nanos);
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_alignment_padding() {
        let mut encoder = Ros1Encoder::new();
        encoder.write_u8(1);
        encoder.write_u32(2);
        let bytes = encoder.into_bytes();
        assert_eq!(bytes, vec![1, 2, 0, 0, 0]);
    }

    #[test]
    fn test_string_has_no_nul() {
        let mut encoder = Ros1Encoder::new();
        encoder.write_string("hi");
        let bytes = encoder.into_bytes();
        assert_eq!(bytes, vec![2, 0, 0, 0, b'h', b'i']);

        let mut decoder = Ros1Decoder::new(&bytes);
        assert_eq!(decoder.read_string().unwrap(), "hi");
        assert_eq!(decoder.remaining(), 0);
    }

    #[test]
    fn test_time_is_two_int32() {
        let mut encoder = Ros1Encoder::new();
        encoder.write_time(1_500_000_000);
        let bytes = encoder.into_bytes();
        assert_eq!(&bytes[0..4], &1i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &500_000_000i32.to_le_bytes());

        let mut decoder = Ros1Decoder::new(&bytes);
        assert_eq!(decoder.read_time().unwrap(), 1_500_000_000);
    }

    #[test]
    fn test_primitive_round_trip() {
        let mut encoder = Ros1Encoder::new();
        encoder.write_i16(-5);
        encoder.write_f64(2.25);
        encoder.write_bool(true);
        let bytes = encoder.into_bytes();
        assert_eq!(bytes.len(), 2 + 8 + 1);

        let mut decoder = Ros1Decoder::new(&bytes);
        assert_eq!(decoder.read_i16().unwrap(), -5);
        assert_eq!(decoder.read_f64().unwrap(), 2.25);
        assert!(decoder.read_bool().unwrap());
    }

    #[test]
    fn test_truncated() {
        let mut decoder = Ros1Decoder::new(&[1, 2]);
        match decoder.read_u32() {
            Err(crate::core::Error::Codec(CodecError::Truncated {
                requested,
                available,
                ..
            })) => {
                assert_eq!(requested, 4);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
