// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Byte I/O layer: positioned readers and writers, compression glue and
//! container format detection.

pub mod compression;
pub mod detection;
pub mod raw_reader;
pub mod raw_writer;

pub use compression::Compression;
pub use detection::{detect_format, FileFormat};
pub use raw_reader::{
    open_reader, open_reader_with, ByteReader, BytesReader, CrcReader, FileReader, MmapReader,
    ReadLe, MMAP_THRESHOLD,
};
pub use raw_writer::{
    AppendFileWriter, ByteWriter, BytesWriter, CrcWriter, FileWriter, WriteLe,
};
