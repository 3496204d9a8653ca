// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Merge command - combine several containers of the same format.

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;

use robolog::bag::{BagMessageFilter, BagReader, BagWriter};
use robolog::io::{detect_format, FileFormat};
use robolog::mcap::{McapReader, McapWriteOptions, McapWriter, MessageFilter};

use crate::common::Result;

/// Merge input files into one container.
#[derive(Args, Clone, Debug)]
pub struct MergeCmd {
    /// Input files (all of the same format)
    #[arg(value_name = "FILE", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Output path
    #[arg(short, long, value_name = "FILE", required = true)]
    pub output: PathBuf,

    /// Overwrite the output if it exists
    #[arg(long)]
    pub overwrite: bool,
}

impl MergeCmd {
    pub fn run(&self) -> Result<()> {
        if !self.overwrite && self.output.exists() {
            bail!("{}: output exists (use --overwrite)", self.output.display());
        }

        let mut formats = Vec::new();
        for input in &self.inputs {
            formats.push(detect_format(input)?);
        }
        let format = formats[0];
        if format == FileFormat::Unknown {
            bail!("{}: not an MCAP or bag file", self.inputs[0].display());
        }
        if formats.iter().any(|f| *f != format) {
            bail!("all inputs must share one container format");
        }

        match format {
            FileFormat::Mcap => self.merge_mcap(),
            FileFormat::Bag => self.merge_bag(),
            FileFormat::Unknown => unreachable!(),
        }
    }

    fn merge_mcap(&self) -> Result<()> {
        let profile = McapReader::open(&self.inputs[0])?.profile().to_string();
        let options = McapWriteOptions::default().with_profile(profile);
        let mut writer = McapWriter::create_with_options(&self.output, options)?;

        for input in &self.inputs {
            let mut reader = McapReader::open(input)?;
            let mut channel_map = std::collections::HashMap::new();
            for channel in reader.channels().clone().values() {
                let schema_id = match reader.schemas().get(&channel.schema_id) {
                    Some(schema) => {
                        writer.add_schema(&schema.name, &schema.encoding, &schema.data)?
                    }
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

            let mut pending = Vec::new();
            for message in reader.messages(MessageFilter::default()) {
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
            for attachment in reader.attachments()? {
                writer.write_attachment(attachment)?;
            }
            for metadata in reader.metadata()? {
                writer.write_metadata(metadata)?;
            }
        }

        writer.finish()?;
        println!(
            "{}: merged {} inputs, {} messages",
            self.output.display(),
            self.inputs.len(),
            writer.message_count()
        );
        Ok(())
    }

    fn merge_bag(&self) -> Result<()> {
        let mut writer = BagWriter::create(&self.output)?;
        for input in &self.inputs {
            let mut reader = BagReader::open(input)?;
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
            let mut pending = Vec::new();
            for message in reader.messages(BagMessageFilter::default()) {
                pending.push(message?);
            }
            for message in pending {
                writer.write_message(conn_map[&message.conn], message.time, &message.data)?;
            }
        }
        writer.finish()?;
        println!(
            "{}: merged {} inputs, {} messages",
            self.output.display(),
            self.inputs.len(),
            writer.message_count()
        );
        Ok(())
    }
}
