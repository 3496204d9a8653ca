// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 bag engine: record codec, chunked writer and indexed reader.

pub mod reader;
pub mod records;
pub mod writer;

pub use reader::{BagMessage, BagMessageFilter, BagReadOptions, BagReader};
pub use records::{BagRecord, ConnectionHeader, ConnectionRecord, BAG_MAGIC};
pub use writer::{BagWriteOptions, BagWriter, DEFAULT_BAG_CHUNK_SIZE};
