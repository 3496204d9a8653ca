// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Multi-file MCAP reader.
//!
//! Presents several MCAP files as one virtual log: statistics aggregate
//! across the files and message iteration k-way merges the per-file
//! streams into log-time order, without writing anything to disk. Ties
//! on equal timestamps go to the earlier file in the open order.

use std::iter::Peekable;
use std::path::Path;

use crate::core::{Result, Value};
use crate::mcap::reader::{
    DecodedMessageIter, McapMessage, McapReadOptions, McapReader, MessageFilter, MessageIter,
};

/// Reader over a list of MCAP files merged in log-time order.
pub struct MultiMcapReader {
    readers: Vec<McapReader>,
}

impl MultiMcapReader {
    /// Open several MCAP files with default options.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        Self::open_with_options(paths, McapReadOptions::default())
    }

    /// Open several MCAP files.
    pub fn open_with_options<P: AsRef<Path>>(
        paths: &[P],
        options: McapReadOptions,
    ) -> Result<Self> {
        let readers = paths
            .iter()
            .map(|path| McapReader::open_with_options(path, options.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { readers })
    }

    /// The per-file readers, in open order.
    pub fn readers(&self) -> &[McapReader] {
        &self.readers
    }

    /// Total message count across all files.
    pub fn message_count(&self) -> u64 {
        self.readers.iter().map(|reader| reader.message_count()).sum()
    }

    /// Message count for one topic across all files.
    pub fn topic_message_count(&self, topic: &str) -> u64 {
        self.readers
            .iter()
            .map(|reader| {
                reader
                    .channels()
                    .values()
                    .filter(|channel| channel.topic == topic)
                    .map(|channel| {
                        reader
                            .statistics()
                            .channel_message_counts
                            .get(&channel.id)
                            .copied()
                            .unwrap_or(0)
                    })
                    .sum::<u64>()
            })
            .sum()
    }

    /// All distinct topics across all files.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .readers
            .iter()
            .flat_map(|reader| reader.topics())
            .collect();
        topics.sort();
        topics.dedup();
        topics
    }

    /// Earliest message log time across all files.
    pub fn start_time(&self) -> Option<u64> {
        self.readers.iter().filter_map(|reader| reader.start_time()).min()
    }

    /// Latest message log time across all files.
    pub fn end_time(&self) -> Option<u64> {
        self.readers.iter().filter_map(|reader| reader.end_time()).max()
    }

    /// Duration in nanoseconds across all files.
    pub fn duration(&self) -> u64 {
        match (self.start_time(), self.end_time()) {
            (Some(start), Some(end)) if end > start => end - start,
            _ => 0,
        }
    }

    /// Iterate messages matching `filter`, merged across files.
    ///
    /// Delivery is always in non-decreasing log-time order; the filter's
    /// own `in_log_time_order` flag is implied.
    pub fn messages(&mut self, filter: MessageFilter) -> MultiMessageIter<'_> {
        let mut per_file = filter;
        // Each stream must be sorted for the merge to be monotonic
        per_file.in_log_time_order = true;
        let streams = self
            .readers
            .iter_mut()
            .map(|reader| reader.messages(per_file.clone()).peekable())
            .collect();
        MultiMessageIter {
            streams,
            done: false,
        }
    }

    /// Iterate decoded messages matching `filter`, merged across files.
    pub fn decoded_messages(
        &mut self,
        filter: MessageFilter,
    ) -> Result<MultiDecodedMessageIter<'_>> {
        let mut per_file = filter;
        per_file.in_log_time_order = true;
        let mut streams = Vec::with_capacity(self.readers.len());
        for reader in self.readers.iter_mut() {
            streams.push(reader.decoded_messages(per_file.clone())?.peekable());
        }
        Ok(MultiDecodedMessageIter {
            streams,
            done: false,
        })
    }
}

/// K-way merged iterator over the raw messages of several files.
pub struct MultiMessageIter<'a> {
    streams: Vec<Peekable<MessageIter<'a>>>,
    done: bool,
}

impl Iterator for MultiMessageIter<'_> {
    type Item = Result<McapMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut best: Option<(usize, u64)> = None;
        for (index, stream) in self.streams.iter_mut().enumerate() {
            match stream.peek() {
                None => {}
                Some(Err(_)) => {
                    self.done = true;
                    return stream.next();
                }
                Some(Ok(message)) => {
                    let log_time = message.message.log_time;
                    if best.map_or(true, |(_, earliest)| log_time < earliest) {
                        best = Some((index, log_time));
                    }
                }
            }
        }
        let (index, _) = best?;
        self.streams[index].next()
    }
}

/// K-way merged iterator over the decoded messages of several files.
pub struct MultiDecodedMessageIter<'a> {
    streams: Vec<Peekable<DecodedMessageIter<'a>>>,
    done: bool,
}

impl Iterator for MultiDecodedMessageIter<'_> {
    type Item = Result<(Value, McapMessage)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut best: Option<(usize, u64)> = None;
        for (index, stream) in self.streams.iter_mut().enumerate() {
            match stream.peek() {
                None => {}
                Some(Err(_)) => {
                    self.done = true;
                    return stream.next();
                }
                Some(Ok((_, message))) => {
                    let log_time = message.message.log_time;
                    if best.map_or(true, |(_, earliest)| log_time < earliest) {
                        best = Some((index, log_time));
                    }
                }
            }
        }
        let (index, _) = best?;
        self.streams[index].next()
    }
}
