// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Sort command - group MCAP messages by topic and/or log time.
//!
//! With no flags the command is a no-op. `--by-topic` groups messages so
//! each chunk holds one channel; `--log-time` sorts by log time (within
//! each topic when combined with `--by-topic`).

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;

use robolog::io::{detect_format, FileFormat};
use robolog::mcap::{McapReader, McapWriteOptions, McapWriter, MessageFilter};

use crate::cmd::filter::resolve_output;
use crate::common::Result;

/// Rewrite an MCAP file sorted by topic and/or log time.
#[derive(Args, Clone, Debug)]
pub struct SortCmd {
    /// Input MCAP file
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Group messages by topic (one channel per chunk)
    #[arg(long = "by-topic")]
    pub by_topic: bool,

    /// Sort messages by log time
    #[arg(long = "log-time")]
    pub log_time: bool,

    /// Output path (default: <input>_sorted.mcap)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Overwrite the output if it exists
    #[arg(long)]
    pub overwrite: bool,
}

impl SortCmd {
    pub fn run(&self) -> Result<()> {
        if !self.by_topic && !self.log_time {
            println!("no sorting flags given; nothing to do");
            return Ok(());
        }
        if detect_format(&self.input)? != FileFormat::Mcap {
            bail!("sort requires an MCAP input");
        }
        let output = resolve_output(&self.input, self.output.clone(), "sorted", "mcap")?;
        if !self.overwrite && output.exists() {
            bail!("{}: output exists (use --overwrite)", output.display());
        }

        let mut reader = McapReader::open(&self.input)?;
        let options = McapWriteOptions::default()
            .with_profile(reader.profile())
            .with_topic_sorted(self.by_topic);
        let mut writer = McapWriter::create_with_options(&output, options)?;

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

        if self.by_topic {
            // One pass per channel; sequence numbers restart per channel
            let channel_ids: Vec<u16> = reader.channels().keys().copied().collect();
            for old_id in channel_ids {
                let filter = MessageFilter {
                    channel_id: Some(old_id),
                    in_log_time_order: self.log_time,
                    ..Default::default()
                };
                let mut pending = Vec::new();
                for message in reader.messages(filter) {
                    pending.push(message?);
                }
                for message in pending {
                    writer.write_message(
                        channel_map[&old_id],
                        None,
                        message.message.log_time,
                        Some(message.message.publish_time),
                        &message.message.data,
                    )?;
                }
                writer.flush_chunk()?;
            }
        } else {
            let filter = MessageFilter {
                in_log_time_order: true,
                ..Default::default()
            };
            let mut pending = Vec::new();
            for message in reader.messages(filter) {
                pending.push(message?);
            }
            for message in pending {
                writer.write_message(
                    channel_map[&message.message.channel_id],
                    None,
                    message.message.log_time,
                    Some(message.message.publish_time),
                    &message.message.data,
                )?;
            }
        }

        for attachment in reader.attachments()? {
            writer.write_attachment(attachment)?;
        }
        for metadata in reader.metadata()? {
            writer.write_metadata(metadata)?;
        }
        writer.finish()?;
        println!("{}: {} messages", output.display(), writer.message_count());
        Ok(())
    }
}
