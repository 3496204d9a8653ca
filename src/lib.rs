// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Robolog
//!
//! Robotics log container library for MCAP and ROS1 bag files.
//!
//! Two engines carry the format work:
//! - **[`mcap`]** - chunked MCAP reading/writing with CRC validation,
//!   summary indexes, recovery from summary-less or truncated files, and
//!   append mode
//! - **[`bag`]** - the legacy ROS1 bag container with the same
//!   decomposition
//!
//! Payloads are decoded through the **[`schema`]** compiler: a parsed
//! ROS1/ROS2 `.msg` definition compiles into a routine bound to the
//! **[`encoding`]** layer's CDR or ROS1 codec, cached per schema.
//!
//! ## Example: writing and reading an MCAP file
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::collections::BTreeMap;
//! use robolog::mcap::{McapReader, McapWriter, MessageFilter};
//!
//! let mut writer = McapWriter::create("out.mcap")?;
//! let schema = writer.add_schema(
//!     "std_msgs/msg/String", "ros2msg", b"string data",
//! )?;
//! let channel = writer.add_channel("/chatter", "cdr", schema, BTreeMap::new())?;
//! writer.write_message(channel, None, 1_000, None, b"...payload...")?;
//! writer.finish()?;
//!
//! let mut reader = McapReader::open("out.mcap")?;
//! for message in reader.messages(MessageFilter::default()) {
//!     let message = message?;
//!     println!("{} @ {}", message.topic, message.message.log_time);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: decoding messages
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use robolog::mcap::{McapReader, MessageFilter};
//!
//! let mut reader = McapReader::open("out.mcap")?;
//! let mut decoded = reader.decoded_messages(MessageFilter {
//!     topics: Some(vec!["/chatter".to_string()]),
//!     ..Default::default()
//! })?;
//! for item in &mut decoded {
//!     let (value, message) = item?;
//!     println!("{}: {value}", message.topic);
//! }
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

pub use crate::core::{
    CodecError, ContainerError, DecodedMessage, EncryptionError, Error, Result, SchemaError,
    Value,
};

// Byte I/O, compression and format detection
pub mod io;

pub use io::{Compression, FileFormat};

// Wire codecs
pub mod encoding;

// Schema model, parsers and compiler
pub mod schema;

// Container engines
pub mod bag;
pub mod mcap;

pub use bag::{BagReader, BagWriter};
pub use mcap::{McapReader, McapWriter};
