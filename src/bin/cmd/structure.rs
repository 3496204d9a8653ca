// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Structure and inspect commands - human-readable record dumps.

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;

use robolog::io::{detect_format, open_reader, ByteReader, FileFormat};
use robolog::bag::records::{parse_bag_magic, read_bag_record, BagRecord};
use robolog::mcap::{Record, RecordScan};

use crate::common::{format_size, format_timestamp, Result};

/// Dump the record structure of a file.
#[derive(Args, Clone, Debug)]
pub struct StructureCmd {
    /// Input file (MCAP or bag)
    #[arg(value_name = "FILE")]
    pub input: PathBuf,
}

impl StructureCmd {
    pub fn run(&self) -> Result<()> {
        dump(&self.input, false)
    }
}

/// Dump the record structure with chunk and summary details.
#[derive(Args, Clone, Debug)]
pub struct InspectCmd {
    /// Input file (MCAP or bag)
    #[arg(value_name = "FILE")]
    pub input: PathBuf,
}

impl InspectCmd {
    pub fn run(&self) -> Result<()> {
        dump(&self.input, true)
    }
}

fn dump(input: &PathBuf, detailed: bool) -> Result<()> {
    match detect_format(input)? {
        FileFormat::Mcap => dump_mcap(input, detailed),
        FileFormat::Bag => dump_bag(input, detailed),
        FileFormat::Unknown => bail!("{}: not an MCAP or bag file", input.display()),
    }
}

fn dump_mcap(input: &PathBuf, detailed: bool) -> Result<()> {
    for item in RecordScan::open(input)? {
        let (offset, record) = item?;
        match &record {
            Record::Header(r) => {
                println!("{offset:>10}  Header profile='{}' library='{}'", r.profile, r.library)
            }
            Record::Schema(r) => println!(
                "{offset:>10}  Schema id={} name='{}' encoding='{}' ({})",
                r.id,
                r.name,
                r.encoding,
                format_size(r.data.len() as u64)
            ),
            Record::Channel(r) => println!(
                "{offset:>10}  Channel id={} topic='{}' encoding='{}' schema={}",
                r.id, r.topic, r.message_encoding, r.schema_id
            ),
            Record::Message(r) => println!(
                "{offset:>10}  Message channel={} seq={} log_time={}",
                r.channel_id, r.sequence, r.log_time
            ),
            Record::Chunk(r) => {
                println!(
                    "{offset:>10}  Chunk [{} .. {}] compression='{}' {} -> {}",
                    r.message_start_time,
                    r.message_end_time,
                    r.compression,
                    format_size(r.uncompressed_size),
                    format_size(r.records.len() as u64)
                );
                if detailed {
                    println!(
                        "              start={} end={} crc={:#010x}",
                        format_timestamp(r.message_start_time),
                        format_timestamp(r.message_end_time),
                        r.uncompressed_crc
                    );
                }
            }
            Record::MessageIndex(r) => {
                if detailed {
                    println!(
                        "{offset:>10}  MessageIndex channel={} entries={}",
                        r.channel_id,
                        r.records.len()
                    )
                }
            }
            Record::ChunkIndex(r) => {
                if detailed {
                    println!(
                        "{offset:>10}  ChunkIndex chunk@{} len={} compression='{}' channels={}",
                        r.chunk_start_offset,
                        r.chunk_length,
                        r.compression,
                        r.message_index_offsets.len()
                    )
                }
            }
            Record::Attachment(r) => println!(
                "{offset:>10}  Attachment '{}' ({}, {})",
                r.name,
                r.media_type,
                format_size(r.data.len() as u64)
            ),
            Record::AttachmentIndex(r) => {
                if detailed {
                    println!("{offset:>10}  AttachmentIndex '{}' @{}", r.name, r.offset)
                }
            }
            Record::Statistics(r) => println!(
                "{offset:>10}  Statistics messages={} chunks={} channels={}",
                r.message_count, r.chunk_count, r.channel_count
            ),
            Record::Metadata(r) => {
                println!("{offset:>10}  Metadata '{}' ({} keys)", r.name, r.metadata.len())
            }
            Record::MetadataIndex(r) => {
                if detailed {
                    println!("{offset:>10}  MetadataIndex '{}' @{}", r.name, r.offset)
                }
            }
            Record::SummaryOffset(r) => {
                if detailed {
                    println!(
                        "{offset:>10}  SummaryOffset group=0x{:02x} @{} len={}",
                        r.group_opcode, r.group_start, r.group_length
                    )
                }
            }
            Record::DataEnd(r) => {
                println!("{offset:>10}  DataEnd crc={:#010x}", r.data_section_crc)
            }
            Record::Footer(r) => println!(
                "{offset:>10}  Footer summary@{} offsets@{} crc={:#010x}",
                r.summary_start, r.summary_offset_start, r.summary_crc
            ),
            Record::Unknown { opcode, data } => println!(
                "{offset:>10}  Unknown opcode=0x{opcode:02x} ({})",
                format_size(data.len() as u64)
            ),
        }
    }
    Ok(())
}

fn dump_bag(input: &PathBuf, detailed: bool) -> Result<()> {
    let mut reader = open_reader(input)?;
    parse_bag_magic(reader.as_mut())?;
    while reader.remaining() > 0 {
        let offset = reader.tell();
        let record = match read_bag_record(reader.as_mut()) {
            Ok(record) => record,
            Err(_) => {
                println!("{offset:>10}  <truncated tail>");
                break;
            }
        };
        match record {
            BagRecord::BagHeader(r) => println!(
                "{offset:>10}  BagHeader index@{} conns={} chunks={}",
                r.index_pos, r.conn_count, r.chunk_count
            ),
            BagRecord::Chunk(r) => println!(
                "{offset:>10}  Chunk compression='{}' {} -> {}",
                r.compression,
                format_size(r.size as u64),
                format_size(r.data.len() as u64)
            ),
            BagRecord::Connection(r) => println!(
                "{offset:>10}  Connection conn={} topic='{}' type='{}'",
                r.conn, r.topic, r.header.message_type
            ),
            BagRecord::MessageData(r) => println!(
                "{offset:>10}  MessageData conn={} time={}",
                r.conn, r.time
            ),
            BagRecord::IndexData(r) => {
                if detailed {
                    println!(
                        "{offset:>10}  IndexData conn={} entries={}",
                        r.conn,
                        r.entries.len()
                    )
                }
            }
            BagRecord::ChunkInfo(r) => {
                if detailed {
                    println!(
                        "{offset:>10}  ChunkInfo chunk@{} [{} .. {}] conns={}",
                        r.chunk_pos,
                        format_timestamp(r.start_time),
                        format_timestamp(r.end_time),
                        r.counts.len()
                    )
                }
            }
        }
    }
    Ok(())
}
