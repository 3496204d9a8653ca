// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Byte writers.
//!
//! Three writers share the [`ByteWriter`] trait:
//! - [`FileWriter`] - buffered forward-only file output
//! - [`AppendFileWriter`] - read+write file output with seek and truncate,
//!   used to continue a previously finalized MCAP file
//! - [`BytesWriter`] - in-memory buffer
//!
//! [`CrcWriter`] wraps any of them and maintains a CRC32 of everything
//! written through it.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::core::Result;

/// Uniform byte sink over files and buffers.
pub trait ByteWriter: Send {
    /// Append bytes at the current position.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Current write position.
    fn tell(&self) -> u64;

    /// Flush buffered output to the underlying sink.
    fn flush(&mut self) -> Result<()>;
}

/// Little-endian primitive writes over any [`ByteWriter`].
pub trait WriteLe: ByteWriter {
    /// Write one byte.
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write(&[value])
    }

    /// Write a little-endian u16.
    fn write_u16_le(&mut self, value: u16) -> Result<()> {
        self.write(&value.to_le_bytes())
    }

    /// Write a little-endian u32.
    fn write_u32_le(&mut self, value: u32) -> Result<()> {
        self.write(&value.to_le_bytes())
    }

    /// Write a little-endian u64.
    fn write_u64_le(&mut self, value: u64) -> Result<()> {
        self.write(&value.to_le_bytes())
    }

    /// Write a u32-length-prefixed string.
    fn write_str(&mut self, value: &str) -> Result<()> {
        self.write_u32_le(value.len() as u32)?;
        self.write(value.as_bytes())
    }
}

impl<W: ByteWriter + ?Sized> WriteLe for W {}

// ============================================================================
// FileWriter
// ============================================================================

/// Buffered forward-only file writer.
pub struct FileWriter {
    file: BufWriter<File>,
    bytes_written: u64,
}

impl FileWriter {
    /// Create (or truncate) a file for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self {
            file: BufWriter::new(file),
            bytes_written: 0,
        })
    }
}

impl ByteWriter for FileWriter {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data)?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.bytes_written
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

// ============================================================================
// AppendFileWriter
// ============================================================================

/// Read+write file writer supporting seek and truncate.
///
/// Used for MCAP append mode: the file is positioned at the pre-existing
/// `DataEnd` record, truncated there, and writing continues in place.
pub struct AppendFileWriter {
    file: File,
    position: u64,
}

impl AppendFileWriter {
    /// Open an existing file for in-place writing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        Ok(Self { file, position: 0 })
    }

    /// Seek to an absolute position.
    pub fn seek(&mut self, offset: u64) -> Result<u64> {
        self.position = self.file.seek(SeekFrom::Start(offset))?;
        Ok(self.position)
    }

    /// Truncate the file at the current position.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(self.position)?;
        Ok(())
    }
}

impl ByteWriter for AppendFileWriter {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data)?;
        self.position += data.len() as u64;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

// ============================================================================
// BytesWriter
// ============================================================================

/// In-memory byte buffer writer.
#[derive(Default)]
pub struct BytesWriter {
    buffer: Vec<u8>,
}

impl BytesWriter {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with reserved capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Pad with zero bytes to the next multiple of `size`.
    ///
    /// `size` must be a power of two.
    pub fn align(&mut self, size: usize) {
        let remainder = self.buffer.len() & (size - 1);
        if remainder != 0 {
            self.buffer.resize(self.buffer.len() + size - remainder, 0);
        }
    }

    /// Current buffer size in bytes.
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// View the buffered bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Take ownership of the buffered bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Discard the buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl ByteWriter for BytesWriter {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.buffer.len() as u64
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// CrcWriter
// ============================================================================

/// Delegating writer that maintains a CRC32 of every byte written.
pub struct CrcWriter<W: ByteWriter> {
    inner: W,
    hasher: crc32fast::Hasher,
}

impl<W: ByteWriter> CrcWriter<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// Current CRC32 of all bytes written since the last clear.
    pub fn take_crc(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Reset the running CRC32.
    pub fn clear_crc(&mut self) {
        self.hasher = crc32fast::Hasher::new();
    }

    /// Seed the running CRC32 with previously written bytes.
    ///
    /// Append mode re-reads the existing data section and feeds it here so
    /// the continued data-section CRC stays valid.
    pub fn seed(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Access the wrapped writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: ByteWriter> ByteWriter for CrcWriter<W> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.hasher.update(data);
        self.inner.write(data)
    }

    fn tell(&self) -> u64 {
        self.inner.tell()
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}
