// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Wire codecs for message payloads.
//!
//! Two codecs share the [`WireDecoder`]/[`WireEncoder`] traits:
//! - [`cdr`] - OMG CDR, aligned, little- or big-endian, 4-byte header
//! - [`ros1`] - ROS1 serialization, unaligned, little-endian only
//!
//! The schema compiler drives either codec through the traits; the decoder
//! [`registry`] picks the right pairing for a channel's encodings.

pub mod cdr;
pub mod registry;
pub mod ros1;

pub use cdr::{CdrDecoder, CdrEncoder};
pub use registry::{DecoderKind, DecoderRegistry, MessageEncoding};
pub use ros1::{Ros1Decoder, Ros1Encoder};

use crate::core::Result;

/// Primitive stream reader driven by compiled schema routines.
///
/// CDR implementations align before multi-byte reads; the ROS1
/// implementation's [`align`](WireDecoder::align) is a no-op.
pub trait WireDecoder {
    /// Advance to the next multiple of `size` relative to the payload start.
    fn align(&mut self, size: usize) -> Result<()>;

    /// Current position in the buffer (header included).
    fn position(&self) -> u64;

    /// Bytes remaining.
    fn remaining(&self) -> usize;

    /// Read a boolean byte.
    fn read_bool(&mut self) -> Result<bool>;
    /// Read an i8.
    fn read_i8(&mut self) -> Result<i8>;
    /// Read a u8.
    fn read_u8(&mut self) -> Result<u8>;
    /// Read an i16, aligned to 2 where the codec aligns.
    fn read_i16(&mut self) -> Result<i16>;
    /// Read a u16, aligned to 2 where the codec aligns.
    fn read_u16(&mut self) -> Result<u16>;
    /// Read an i32, aligned to 4 where the codec aligns.
    fn read_i32(&mut self) -> Result<i32>;
    /// Read a u32, aligned to 4 where the codec aligns.
    fn read_u32(&mut self) -> Result<u32>;
    /// Read an i64, aligned to 8 where the codec aligns.
    fn read_i64(&mut self) -> Result<i64>;
    /// Read a u64, aligned to 8 where the codec aligns.
    fn read_u64(&mut self) -> Result<u64>;
    /// Read an f32, aligned to 4 where the codec aligns.
    fn read_f32(&mut self) -> Result<f32>;
    /// Read an f64, aligned to 8 where the codec aligns.
    fn read_f64(&mut self) -> Result<f64>;

    /// Read `n` raw bytes.
    fn read_bytes(&mut self, n: usize) -> Result<&[u8]>;

    /// Read a length-prefixed UTF-8 string.
    fn read_string(&mut self) -> Result<String>;

    /// Read a length-prefixed UTF-16 wstring.
    fn read_wstring(&mut self) -> Result<String>;

    /// Read a ROS time (two 32-bit fields) as nanoseconds.
    fn read_time(&mut self) -> Result<i64>;

    /// Read a ROS duration (two 32-bit fields) as nanoseconds.
    fn read_duration(&mut self) -> Result<i64>;
}

/// Primitive stream writer driven by compiled schema routines.
pub trait WireEncoder {
    /// Pad with zeros to the next multiple of `size` relative to the
    /// payload start.
    fn align(&mut self, size: usize);

    /// Write a boolean byte.
    fn write_bool(&mut self, value: bool);
    /// Write an i8.
    fn write_i8(&mut self, value: i8);
    /// Write a u8.
    fn write_u8(&mut self, value: u8);
    /// Write an i16, aligned where the codec aligns.
    fn write_i16(&mut self, value: i16);
    /// Write a u16, aligned where the codec aligns.
    fn write_u16(&mut self, value: u16);
    /// Write an i32, aligned where the codec aligns.
    fn write_i32(&mut self, value: i32);
    /// Write a u32, aligned where the codec aligns.
    fn write_u32(&mut self, value: u32);
    /// Write an i64, aligned where the codec aligns.
    fn write_i64(&mut self, value: i64);
    /// Write a u64, aligned where the codec aligns.
    fn write_u64(&mut self, value: u64);
    /// Write an f32, aligned where the codec aligns.
    fn write_f32(&mut self, value: f32);
    /// Write an f64, aligned where the codec aligns.
    fn write_f64(&mut self, value: f64);

    /// Write raw bytes.
    fn write_bytes(&mut self, data: &[u8]);

    /// Write a length-prefixed UTF-8 string.
    fn write_string(&mut self, value: &str);

    /// Write a length-prefixed UTF-16 wstring.
    fn write_wstring(&mut self, value: &str);

    /// Write a ROS time (two 32-bit fields) from nanoseconds.
    fn write_time(&mut self, nanos: i64);

    /// Write a ROS duration (two 32-bit fields) from nanoseconds.
    fn write_duration(&mut self, nanos: i64);

    /// Finish and take the encoded payload.
    fn into_bytes(self) -> Vec<u8>;
}
