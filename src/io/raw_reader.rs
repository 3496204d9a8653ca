// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Positioned byte readers.
//!
//! Four readers share the [`ByteReader`] trait:
//! - [`FileReader`] - buffered file descriptor reads
//! - [`MmapReader`] - memory-mapped random access
//! - [`BytesReader`] - in-memory slice
//! - [`CrcReader`] - delegate that tracks a running CRC32 of everything read
//!
//! The [`open_reader`] factory selects [`MmapReader`] automatically for
//! files of 512 MiB or more; callers can override the choice.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::core::{CodecError, Result};

/// File size at or above which [`open_reader`] memory-maps the input.
pub const MMAP_THRESHOLD: u64 = 512 * 1024 * 1024;

/// Uniform positioned read access over files, buffers and mappings.
pub trait ByteReader: Send {
    /// Fill `buf` exactly, advancing the position.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Read exactly `n` bytes, advancing the position.
    fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Read up to `n` bytes without advancing the position.
    ///
    /// Returns fewer than `n` bytes at end of input.
    fn peek(&mut self, n: usize) -> Result<Vec<u8>>;

    /// Seek to an absolute offset from the start.
    fn seek_from_start(&mut self, offset: u64) -> Result<u64>;

    /// Seek relative to the current position.
    fn seek_from_current(&mut self, offset: i64) -> Result<u64>;

    /// Seek to `offset` bytes back from the end.
    fn seek_from_end(&mut self, offset: u64) -> Result<u64>;

    /// Current position.
    fn tell(&self) -> u64;

    /// Total length of the underlying source.
    fn len(&self) -> u64;

    /// Whether the source is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes remaining after the current position.
    fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.tell())
    }

    /// Release underlying resources. Mappings are dropped here.
    fn close(&mut self) -> Result<()>;
}

impl<R: ByteReader + ?Sized> ByteReader for Box<R> {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_into(buf)
    }

    fn peek(&mut self, n: usize) -> Result<Vec<u8>> {
        (**self).peek(n)
    }

    fn seek_from_start(&mut self, offset: u64) -> Result<u64> {
        (**self).seek_from_start(offset)
    }

    fn seek_from_current(&mut self, offset: i64) -> Result<u64> {
        (**self).seek_from_current(offset)
    }

    fn seek_from_end(&mut self, offset: u64) -> Result<u64> {
        (**self).seek_from_end(offset)
    }

    fn tell(&self) -> u64 {
        (**self).tell()
    }

    fn len(&self) -> u64 {
        (**self).len()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Little-endian primitive reads over any [`ByteReader`].
pub trait ReadLe: ByteReader {
    /// Read one byte.
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a little-endian u16.
    fn read_u16_le(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_into(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Read a little-endian u32.
    fn read_u32_le(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Read a little-endian u64.
    fn read_u64_le(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}

impl<R: ByteReader + ?Sized> ReadLe for R {}

fn truncated(requested: usize, available: u64, position: u64) -> crate::core::Error {
    CodecError::Truncated {
        requested,
        available: available as usize,
        position,
    }
    .into()
}

// ============================================================================
// FileReader
// ============================================================================

/// Buffered reader over a file descriptor.
pub struct FileReader {
    file: BufReader<File>,
    position: u64,
    length: u64,
}

impl FileReader {
    /// Open a file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let length = file.metadata()?.len();
        Ok(Self {
            file: BufReader::new(file),
            position: 0,
            length,
        })
    }
}

impl ByteReader for FileReader {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.remaining() < buf.len() as u64 {
            return Err(truncated(buf.len(), self.remaining(), self.position));
        }
        self.file.read_exact(buf)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    fn peek(&mut self, n: usize) -> Result<Vec<u8>> {
        let available = (self.remaining() as usize).min(n);
        let mut buf = vec![0u8; available];
        self.file.read_exact(&mut buf)?;
        self.file.seek(SeekFrom::Start(self.position))?;
        Ok(buf)
    }

    fn seek_from_start(&mut self, offset: u64) -> Result<u64> {
        self.position = self.file.seek(SeekFrom::Start(offset))?;
        Ok(self.position)
    }

    fn seek_from_current(&mut self, offset: i64) -> Result<u64> {
        self.position = self.file.seek(SeekFrom::Current(offset))?;
        Ok(self.position)
    }

    fn seek_from_end(&mut self, offset: u64) -> Result<u64> {
        self.position = self.file.seek(SeekFrom::End(-(offset as i64)))?;
        Ok(self.position)
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn len(&self) -> u64 {
        self.length
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// MmapReader
// ============================================================================

/// Memory-mapped reader for random access over large files.
///
/// The mapping is released on [`ByteReader::close`] (and on drop); the file
/// handle is not held beyond the mapping's creation.
pub struct MmapReader {
    mmap: Option<memmap2::Mmap>,
    position: u64,
}

impl MmapReader {
    /// Map a file into memory for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Ok(Self {
            mmap: Some(mmap),
            position: 0,
        })
    }

    fn data(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

impl ByteReader for MmapReader {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let start = self.position as usize;
        let data = self.data();
        if start + buf.len() > data.len() {
            return Err(truncated(buf.len(), self.remaining(), self.position));
        }
        buf.copy_from_slice(&data[start..start + buf.len()]);
        self.position += buf.len() as u64;
        Ok(())
    }

    fn peek(&mut self, n: usize) -> Result<Vec<u8>> {
        let start = self.position as usize;
        let data = self.data();
        let end = (start + n).min(data.len());
        Ok(data[start.min(data.len())..end].to_vec())
    }

    fn seek_from_start(&mut self, offset: u64) -> Result<u64> {
        self.position = offset;
        Ok(self.position)
    }

    fn seek_from_current(&mut self, offset: i64) -> Result<u64> {
        self.position = self.position.saturating_add_signed(offset);
        Ok(self.position)
    }

    fn seek_from_end(&mut self, offset: u64) -> Result<u64> {
        self.position = self.len().saturating_sub(offset);
        Ok(self.position)
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn len(&self) -> u64 {
        self.data().len() as u64
    }

    fn close(&mut self) -> Result<()> {
        self.mmap = None;
        Ok(())
    }
}

// ============================================================================
// BytesReader
// ============================================================================

/// Reader over an in-memory byte buffer.
pub struct BytesReader {
    data: Vec<u8>,
    position: u64,
}

impl BytesReader {
    /// Create a reader over owned bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }
}

impl From<Vec<u8>> for BytesReader {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl ByteReader for BytesReader {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let start = self.position as usize;
        if start + buf.len() > self.data.len() {
            return Err(truncated(buf.len(), self.remaining(), self.position));
        }
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        self.position += buf.len() as u64;
        Ok(())
    }

    fn peek(&mut self, n: usize) -> Result<Vec<u8>> {
        let start = (self.position as usize).min(self.data.len());
        let end = (start + n).min(self.data.len());
        Ok(self.data[start..end].to_vec())
    }

    fn seek_from_start(&mut self, offset: u64) -> Result<u64> {
        self.position = offset;
        Ok(self.position)
    }

    fn seek_from_current(&mut self, offset: i64) -> Result<u64> {
        self.position = self.position.saturating_add_signed(offset);
        Ok(self.position)
    }

    fn seek_from_end(&mut self, offset: u64) -> Result<u64> {
        self.position = (self.data.len() as u64).saturating_sub(offset);
        Ok(self.position)
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// CrcReader
// ============================================================================

/// Delegating reader that maintains a CRC32 of every byte read through it.
///
/// Seeks do not feed the CRC; callers re-position and then read the ranges
/// they want checksummed.
pub struct CrcReader<R: ByteReader> {
    inner: R,
    hasher: crc32fast::Hasher,
}

impl<R: ByteReader> CrcReader<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// Current CRC32 of all bytes read since the last clear.
    pub fn take_crc(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Reset the running CRC32.
    pub fn clear_crc(&mut self) {
        self.hasher = crc32fast::Hasher::new();
    }

    /// Access the wrapped reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: ByteReader> ByteReader for CrcReader<R> {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_into(buf)?;
        self.hasher.update(buf);
        Ok(())
    }

    fn peek(&mut self, n: usize) -> Result<Vec<u8>> {
        self.inner.peek(n)
    }

    fn seek_from_start(&mut self, offset: u64) -> Result<u64> {
        self.inner.seek_from_start(offset)
    }

    fn seek_from_current(&mut self, offset: i64) -> Result<u64> {
        self.inner.seek_from_current(offset)
    }

    fn seek_from_end(&mut self, offset: u64) -> Result<u64> {
        self.inner.seek_from_end(offset)
    }

    fn tell(&self) -> u64 {
        self.inner.tell()
    }

    fn len(&self) -> u64 {
        self.inner.len()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Open a reader for `path`, memory-mapping files of [`MMAP_THRESHOLD`]
/// bytes or more.
pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn ByteReader>> {
    open_reader_with(path, None)
}

/// Open a reader with an explicit mmap preference.
///
/// `use_mmap = Some(true)` forces a mapping, `Some(false)` forces buffered
/// file reads, `None` selects by file size.
pub fn open_reader_with<P: AsRef<Path>>(
    path: P,
    use_mmap: Option<bool>,
) -> Result<Box<dyn ByteReader>> {
    let path = path.as_ref();
    let mmap = match use_mmap {
        Some(choice) => choice,
        None => std::fs::metadata(path)?.len() >= MMAP_THRESHOLD,
    };
    if mmap {
        Ok(Box::new(MmapReader::open(path)?))
    } else {
        Ok(Box::new(FileReader::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_reader_read_and_tell() {
        let mut reader = BytesReader::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(reader.read(2).unwrap(), vec![1, 2]);
        assert_eq!(reader.tell(), 2);
        assert_eq!(reader.remaining(), 3);
    }

    #[test]
    fn test_bytes_reader_truncated() {
        let mut reader = BytesReader::new(vec![1, 2]);
        let err = reader.read(5).unwrap_err();
        match err {
            crate::core::Error::Codec(CodecError::Truncated {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, 5);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_bytes_reader_peek_does_not_advance() {
        let mut reader = BytesReader::new(vec![1, 2, 3]);
        assert_eq!(reader.peek(2).unwrap(), vec![1, 2]);
        assert_eq!(reader.tell(), 0);
        // Peek past end returns what is there
        assert_eq!(reader.peek(10).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_bytes_reader_seeks() {
        let mut reader = BytesReader::new(vec![0, 1, 2, 3, 4, 5, 6, 7]);
        reader.seek_from_start(4).unwrap();
        assert_eq!(reader.read(1).unwrap(), vec![4]);
        reader.seek_from_current(-2).unwrap();
        assert_eq!(reader.read(1).unwrap(), vec![3]);
        reader.seek_from_end(2).unwrap();
        assert_eq!(reader.read(2).unwrap(), vec![6, 7]);
    }

    #[test]
    fn test_read_le_helpers() {
        let mut reader = BytesReader::new(vec![0x2A, 0x00, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(reader.read_u16_le().unwrap(), 42);
        assert_eq!(reader.read_u32_le().unwrap(), 1);
    }

    #[test]
    fn test_crc_reader_tracks_reads_only() {
        let data = vec![1u8, 2, 3, 4];
        let expected = crc32fast::hash(&data);

        let mut reader = CrcReader::new(BytesReader::new(data));
        reader.peek(2).unwrap();
        reader.read(4).unwrap();
        assert_eq!(reader.take_crc(), expected);

        reader.clear_crc();
        assert_eq!(reader.take_crc(), crc32fast::hash(&[]));
    }
}
