// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Convert command - translate between bag and MCAP containers.
//!
//! Bag to MCAP carries connections over as `ros1`/`ros1msg` channels.
//! MCAP to bag requires `ros1`-encoded channels with `ros1msg` schemas;
//! other encodings have no bag representation.

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;

use robolog::bag::{BagMessageFilter, BagReader, BagWriter};
use robolog::io::{detect_format, FileFormat};
use robolog::mcap::{McapReader, McapWriteOptions, McapWriter, MessageFilter};

use crate::common::Result;

/// Convert between `.bag` and `.mcap`.
#[derive(Args, Clone, Debug)]
pub struct ConvertCmd {
    /// Input file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file; the target format follows its extension
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Overwrite the output if it exists
    #[arg(long)]
    pub overwrite: bool,
}

impl ConvertCmd {
    pub fn run(&self) -> Result<()> {
        if !self.overwrite && self.output.exists() {
            bail!("{}: output exists (use --overwrite)", self.output.display());
        }
        let source = detect_format(&self.input)?;
        let target = match self
            .output
            .extension()
            .and_then(|extension| extension.to_str())
        {
            Some("mcap") => FileFormat::Mcap,
            Some("bag") => FileFormat::Bag,
            _ => bail!("output extension must be .mcap or .bag"),
        };

        match (source, target) {
            (FileFormat::Bag, FileFormat::Mcap) => self.bag_to_mcap(),
            (FileFormat::Mcap, FileFormat::Bag) => self.mcap_to_bag(),
            (FileFormat::Unknown, _) => {
                bail!("{}: not an MCAP or bag file", self.input.display())
            }
            (source, target) => bail!("cannot convert {source} to {target}"),
        }
    }

    fn bag_to_mcap(&self) -> Result<()> {
        let mut reader = BagReader::open(&self.input)?;
        let options = McapWriteOptions::default().with_profile("ros1");
        let mut writer = McapWriter::create_with_options(&self.output, options)?;

        let mut channel_map = std::collections::HashMap::new();
        for connection in reader.connections().clone().values() {
            let schema_id = writer.add_schema(
                &connection.header.message_type,
                "ros1msg",
                connection.header.message_definition.as_bytes(),
            )?;
            let channel_id = writer.add_channel(
                &connection.topic,
                "ros1",
                schema_id,
                std::collections::BTreeMap::from([(
                    "md5sum".to_string(),
                    connection.header.md5sum.clone(),
                )]),
            )?;
            channel_map.insert(connection.conn, channel_id);
        }

        let mut pending = Vec::new();
        for message in reader.messages(BagMessageFilter::default()) {
            pending.push(message?);
        }
        for message in pending {
            writer.write_message(
                channel_map[&message.conn],
                None,
                message.time,
                None,
                &message.data,
            )?;
        }
        writer.finish()?;
        println!(
            "{}: converted {} messages",
            self.output.display(),
            writer.message_count()
        );
        Ok(())
    }

    fn mcap_to_bag(&self) -> Result<()> {
        let mut reader = McapReader::open(&self.input)?;
        let mut writer = BagWriter::create(&self.output)?;

        let mut conn_map = std::collections::HashMap::new();
        for channel in reader.channels().clone().values() {
            if channel.message_encoding != "ros1" {
                bail!(
                    "channel '{}' uses encoding '{}'; only ros1 channels convert to bag",
                    channel.topic,
                    channel.message_encoding
                );
            }
            let schema = reader
                .schemas()
                .get(&channel.schema_id)
                .ok_or_else(|| anyhow::anyhow!("channel '{}' has no schema", channel.topic))?;
            if schema.encoding != "ros1msg" {
                bail!(
                    "schema '{}' uses encoding '{}'; only ros1msg schemas convert to bag",
                    schema.name,
                    schema.encoding
                );
            }
            let definition = String::from_utf8_lossy(&schema.data).to_string();
            let conn = writer.add_connection(
                &channel.topic,
                &schema.name,
                &definition,
                channel.metadata.get("md5sum").cloned(),
            )?;
            conn_map.insert(channel.id, conn);
        }

        let mut pending = Vec::new();
        for message in reader.messages(MessageFilter::default()) {
            pending.push(message?);
        }
        for message in pending {
            writer.write_message(
                conn_map[&message.message.channel_id],
                message.message.log_time,
                &message.message.data,
            )?;
        }
        writer.finish()?;
        println!(
            "{}: converted {} messages",
            self.output.display(),
            writer.message_count()
        );
        Ok(())
    }
}
