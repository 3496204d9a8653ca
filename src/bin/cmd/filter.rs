// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Filter command - keep messages by topic and time window.
//!
//! Keeps `include - exclude`; the time window is inclusive on the lower
//! bound and exclusive on the upper bound.

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;

use robolog::bag::{BagMessageFilter, BagReader, BagWriter};
use robolog::io::{detect_format, FileFormat};
use robolog::mcap::{McapReader, McapWriteOptions, McapWriter, MessageFilter};

use crate::common::{seconds_to_nanos, Result};

/// Write a new container keeping only matching messages.
#[derive(Args, Clone, Debug)]
pub struct FilterCmd {
    /// Input file (MCAP or bag)
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Topic to include (repeatable; default: all topics)
    #[arg(long = "include-topic", value_name = "TOPIC")]
    pub include_topic: Vec<String>,

    /// Topic to exclude (repeatable)
    #[arg(long = "exclude-topic", value_name = "TOPIC")]
    pub exclude_topic: Vec<String>,

    /// Keep messages at or after this time (seconds)
    #[arg(long = "start-time", value_name = "SECONDS")]
    pub start_time: Option<f64>,

    /// Keep messages strictly before this time (seconds)
    #[arg(long = "end-time", value_name = "SECONDS")]
    pub end_time: Option<f64>,

    /// Output path (default: <input>_filtered.<ext>)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Overwrite the output if it exists
    #[arg(long)]
    pub overwrite: bool,
}

impl FilterCmd {
    pub fn run(&self) -> Result<()> {
        let format = detect_format(&self.input)?;
        let extension = match format {
            FileFormat::Mcap => "mcap",
            FileFormat::Bag => "bag",
            FileFormat::Unknown => {
                bail!("{}: not an MCAP or bag file", self.input.display())
            }
        };
        let output = resolve_output(&self.input, self.output.clone(), "filtered", extension)?;
        if !self.overwrite && output.exists() {
            bail!("{}: output exists (use --overwrite)", output.display());
        }

        match format {
            FileFormat::Mcap => self.filter_mcap(&output),
            FileFormat::Bag => self.filter_bag(&output),
            FileFormat::Unknown => unreachable!(),
        }
    }

    fn selected_topics(&self, all: Vec<String>) -> Vec<String> {
        let mut topics = if self.include_topic.is_empty() {
            all
        } else {
            self.include_topic.clone()
        };
        topics.retain(|topic| !self.exclude_topic.contains(topic));
        topics
    }

    fn filter_mcap(&self, output: &PathBuf) -> Result<()> {
        let mut reader = McapReader::open(&self.input)?;
        let topics = self.selected_topics(reader.topics());

        let options = McapWriteOptions::default().with_profile(reader.profile());
        let mut writer = McapWriter::create_with_options(output, options)?;

        // Re-register schemas and channels for the kept topics
        let mut channel_map = std::collections::HashMap::new();
        for channel in reader.channels().clone().values() {
            if !topics.contains(&channel.topic) {
                continue;
            }
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

        let filter = MessageFilter {
            topics: Some(topics),
            start_time: self.start_time.map(seconds_to_nanos),
            end_time: self.end_time.map(seconds_to_nanos),
            ..Default::default()
        };
        let mut kept = 0u64;
        let mut pending = Vec::new();
        for message in reader.messages(filter) {
            let message = message?;
            pending.push(message);
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
            kept += 1;
        }

        // Preserve attachments and metadata
        for attachment in reader.attachments()? {
            writer.write_attachment(attachment)?;
        }
        for metadata in reader.metadata()? {
            writer.write_metadata(metadata)?;
        }
        writer.finish()?;
        println!("{}: kept {kept} messages", output.display());
        Ok(())
    }

    fn filter_bag(&self, output: &PathBuf) -> Result<()> {
        let mut reader = BagReader::open(&self.input)?;
        let topics = self.selected_topics(reader.topics());

        let mut writer = BagWriter::create(output)?;
        let mut conn_map = std::collections::HashMap::new();
        for connection in reader.connections().clone().values() {
            if !topics.contains(&connection.topic) {
                continue;
            }
            let new_conn = writer.add_connection(
                &connection.topic,
                &connection.header.message_type,
                &connection.header.message_definition,
                Some(connection.header.md5sum.clone()),
            )?;
            conn_map.insert(connection.conn, new_conn);
        }

        let filter = BagMessageFilter {
            topics: Some(topics),
            start_time: self.start_time.map(seconds_to_nanos),
            end_time: self.end_time.map(seconds_to_nanos),
            ..Default::default()
        };
        let mut kept = 0u64;
        let mut pending = Vec::new();
        for message in reader.messages(filter) {
            pending.push(message?);
        }
        for message in pending {
            let Some(&conn) = conn_map.get(&message.conn) else {
                continue;
            };
            writer.write_message(conn, message.time, &message.data)?;
            kept += 1;
        }
        writer.finish()?;
        println!("{}: kept {kept} messages", output.display());
        Ok(())
    }
}

/// Default output path: `<stem>_<suffix>.<extension>` next to the input.
pub fn resolve_output(
    input: &PathBuf,
    output: Option<PathBuf>,
    suffix: &str,
    extension: &str,
) -> Result<PathBuf> {
    let output = match output {
        Some(output) => output,
        None => {
            let stem = input
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| "output".to_string());
            input.with_file_name(format!("{stem}_{suffix}.{extension}"))
        }
    };
    if output == *input {
        bail!("output path equals the input path");
    }
    Ok(output)
}
