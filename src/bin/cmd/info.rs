// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Info command - statistics, duration and per-topic frequency.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::bail;
use clap::Args;

use robolog::bag::BagReader;
use robolog::io::{detect_format, FileFormat};
use robolog::mcap::McapReader;

use crate::common::{format_duration, format_size, format_timestamp, Result};

/// Show file statistics, duration and per-topic frequency.
#[derive(Args, Clone, Debug)]
pub struct InfoCmd {
    /// Input file (MCAP or bag)
    #[arg(value_name = "FILE")]
    pub input: PathBuf,
}

impl InfoCmd {
    pub fn run(&self) -> Result<()> {
        match detect_format(&self.input)? {
            FileFormat::Mcap => self.mcap_info(),
            FileFormat::Bag => self.bag_info(),
            FileFormat::Unknown => bail!("{}: not an MCAP or bag file", self.input.display()),
        }
    }

    fn mcap_info(&self) -> Result<()> {
        let reader = McapReader::open(&self.input)?;
        let stats = reader.statistics();

        println!("file:       {}", reader.path());
        println!("format:     mcap (profile '{}')", reader.profile());
        println!("size:       {}", format_size(reader.file_size()));
        println!("messages:   {}", stats.message_count);
        println!("chunks:     {}", stats.chunk_count);
        println!("schemas:    {}", stats.schema_count);
        println!("channels:   {}", stats.channel_count);
        if stats.attachment_count > 0 {
            println!("attachments: {}", stats.attachment_count);
        }
        if stats.metadata_count > 0 {
            println!("metadata:   {}", stats.metadata_count);
        }
        if let (Some(start), Some(end)) = (reader.start_time(), reader.end_time()) {
            println!("start:      {}", format_timestamp(start));
            println!("end:        {}", format_timestamp(end));
            println!("duration:   {}", format_duration(reader.duration()));
        }

        let duration_secs = reader.duration() as f64 / 1e9;
        println!("topics:");
        // Channels sharing one topic aggregate their counts
        let mut per_topic: BTreeMap<&str, u64> = BTreeMap::new();
        for channel in reader.channels().values() {
            let count = stats
                .channel_message_counts
                .get(&channel.id)
                .copied()
                .unwrap_or(0);
            *per_topic.entry(channel.topic.as_str()).or_insert(0) += count;
        }
        for (topic, count) in per_topic {
            if duration_secs > 0.0 {
                println!(
                    "  {topic}: {count} msgs ({:.2} Hz)",
                    count as f64 / duration_secs
                );
            } else {
                println!("  {topic}: {count} msgs");
            }
        }
        Ok(())
    }

    fn bag_info(&self) -> Result<()> {
        let reader = BagReader::open(&self.input)?;

        println!("file:       {}", reader.path());
        println!("format:     bag (2.0)");
        println!("size:       {}", format_size(reader.file_size()));
        println!("messages:   {}", reader.message_count());
        println!("chunks:     {}", reader.chunk_infos().len());
        println!("connections: {}", reader.connections().len());
        if let (Some(start), Some(end)) = (reader.start_time(), reader.end_time()) {
            println!("start:      {}", format_timestamp(start));
            println!("end:        {}", format_timestamp(end));
            println!("duration:   {}", format_duration(reader.duration()));
        }

        let duration_secs = reader.duration() as f64 / 1e9;
        let counts = reader.connection_message_counts();
        println!("topics:");
        let mut per_topic: BTreeMap<String, u64> = BTreeMap::new();
        for connection in reader.connections().values() {
            let count = counts.get(&connection.conn).copied().unwrap_or(0);
            *per_topic.entry(connection.topic.clone()).or_insert(0) += count;
        }
        for (topic, count) in per_topic {
            if duration_secs > 0.0 {
                println!(
                    "  {topic}: {count} msgs ({:.2} Hz)",
                    count as f64 / duration_secs
                );
            } else {
                println!("  {topic}: {count} msgs");
            }
        }
        Ok(())
    }
}
