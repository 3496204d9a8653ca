// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Recover command - rebuild a damaged container.
//!
//! Reads the input through the summary-less scan path, keeping every
//! intact record before the first truncation, and rewrites a clean
//! container with a fresh summary.

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;

use robolog::io::{detect_format, Compression, FileFormat};
use robolog::mcap::{McapReadOptions, McapReader, McapWriteOptions, McapWriter, MessageFilter};
use robolog::bag::{BagMessageFilter, BagReadOptions, BagReader, BagWriteOptions, BagWriter};

use crate::common::Result;

/// Re-write a clean container from a truncated or summary-less file.
#[derive(Args, Clone, Debug)]
pub struct RecoverCmd {
    /// Input file (MCAP or bag)
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Output path
    #[arg(short, long, value_name = "FILE", required = true)]
    pub output: PathBuf,

    /// Overwrite the output if it exists
    #[arg(long)]
    pub overwrite: bool,

    /// Chunk size threshold in bytes for the rewritten file
    #[arg(long = "chunk-size", value_name = "N")]
    pub chunk_size: Option<usize>,

    /// Chunk compression for the rewritten file
    #[arg(long = "chunk-compression", value_name = "lz4|zstd|bz2")]
    pub chunk_compression: Option<String>,
}

impl RecoverCmd {
    pub fn run(&self) -> Result<()> {
        if !self.overwrite && self.output.exists() {
            bail!("{}: output exists (use --overwrite)", self.output.display());
        }
        match detect_format(&self.input)? {
            FileFormat::Mcap => self.recover_mcap(),
            FileFormat::Bag => self.recover_bag(),
            FileFormat::Unknown => bail!("{}: not an MCAP or bag file", self.input.display()),
        }
    }

    fn compression(&self) -> Result<Option<Compression>> {
        Ok(match &self.chunk_compression {
            Some(name) => Some(Compression::from_cli_str(name)?),
            None => None,
        })
    }

    fn recover_mcap(&self) -> Result<()> {
        // Force the summary-less reader path; a stale summary on a
        // damaged file cannot be trusted
        let read_options = McapReadOptions {
            ignore_summary: true,
            best_effort: true,
            ..Default::default()
        };
        let mut reader = McapReader::open_with_options(&self.input, read_options)?;

        let mut options = McapWriteOptions::default().with_profile(reader.profile());
        if let Some(chunk_size) = self.chunk_size {
            options = options.with_chunk_size(chunk_size);
        }
        if let Some(compression) = self.compression()? {
            options = options.with_compression(compression);
        }
        let mut writer = McapWriter::create_with_options(&self.output, options)?;

        let mut channel_map = std::collections::HashMap::new();
        for channel in reader.channels().clone().values() {
            let schema_id = match reader.schemas().get(&channel.schema_id) {
                Some(schema) => writer.add_schema(&schema.name, &schema.encoding, &schema.data)?,
                None => 0,
            };
            let new_id = writer.add_channel(
                &channel.topic,
                &channel.message_encoding,
                schema_id,
                channel.metadata.clone(),
            )?;
            channel_map.insert(channel.id, new_id);
        }

        let mut recovered = 0u64;
        let mut pending = Vec::new();
        for message in reader.messages(MessageFilter::default()) {
            match message {
                Ok(message) => pending.push(message),
                // Damaged chunks end recovery for that region
                Err(error) => {
                    tracing::warn!(%error, "stopping at unreadable chunk");
                    break;
                }
            }
        }
        for message in pending {
            let Some(&channel_id) = channel_map.get(&message.message.channel_id) else {
                continue;
            };
            writer.write_message(
                channel_id,
                Some(message.message.sequence),
                message.message.log_time,
                Some(message.message.publish_time),
                &message.message.data,
            )?;
            recovered += 1;
        }
        for attachment in reader.attachments()? {
            writer.write_attachment(attachment)?;
        }
        for metadata in reader.metadata()? {
            writer.write_metadata(metadata)?;
        }
        writer.finish()?;
        println!("{}: recovered {recovered} messages", self.output.display());
        Ok(())
    }

    fn recover_bag(&self) -> Result<()> {
        let mut reader = BagReader::open_with_options(&self.input, BagReadOptions::default())?;

        let mut options = BagWriteOptions::default();
        if let Some(chunk_size) = self.chunk_size {
            options = options.with_chunk_size(chunk_size);
        }
        if let Some(compression) = self.compression()? {
            options = options.with_compression(compression)?;
        }
        let mut writer = BagWriter::create_with_options(&self.output, options)?;

        let mut conn_map = std::collections::HashMap::new();
        for connection in reader.connections().clone().values() {
            let new_conn = writer.add_connection(
                &connection.topic,
                &connection.header.message_type,
                &connection.header.message_definition,
                Some(connection.header.md5sum.clone()),
            )?;
            conn_map.insert(connection.conn, new_conn);
        }

        let mut recovered = 0u64;
        let mut pending = Vec::new();
        for message in reader.messages(BagMessageFilter::default()) {
            match message {
                Ok(message) => pending.push(message),
                Err(error) => {
                    tracing::warn!(%error, "stopping at unreadable chunk");
                    break;
                }
            }
        }
        for message in pending {
            writer.write_message(conn_map[&message.conn], message.time, &message.data)?;
            recovered += 1;
        }
        writer.finish()?;
        println!("{}: recovered {recovered} messages", self.output.display());
        Ok(())
    }
}
