// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Chunk compression codecs.
//!
//! MCAP chunks use `zstd`, `lz4` or no compression (empty identifier);
//! bag chunks use `none`, `bz2` or `lz4`. Codecs that a container format
//! does not define are rejected at the boundary.

use std::io::Read;

use crate::core::{ContainerError, Result};

/// Chunk compression selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// No compression
    #[default]
    None,
    /// LZ4 block compression
    Lz4,
    /// Zstandard
    Zstd,
    /// Bzip2 (bag files only)
    Bz2,
}

impl Compression {
    /// Parse an MCAP chunk compression identifier.
    ///
    /// MCAP uses the empty string for uncompressed chunks.
    pub fn from_mcap_str(s: &str) -> Result<Self> {
        match s {
            "" => Ok(Compression::None),
            "lz4" => Ok(Compression::Lz4),
            "zstd" => Ok(Compression::Zstd),
            "bz2" => Err(ContainerError::CompressionNotSupportedHere {
                compression: s.to_string(),
                container: "mcap",
            }
            .into()),
            other => Err(ContainerError::UnknownCompression {
                compression: other.to_string(),
            }
            .into()),
        }
    }

    /// The MCAP chunk compression identifier.
    pub fn as_mcap_str(&self) -> Result<&'static str> {
        match self {
            Compression::None => Ok(""),
            Compression::Lz4 => Ok("lz4"),
            Compression::Zstd => Ok("zstd"),
            Compression::Bz2 => Err(ContainerError::CompressionNotSupportedHere {
                compression: "bz2".to_string(),
                container: "mcap",
            }
            .into()),
        }
    }

    /// Parse a bag chunk compression identifier.
    pub fn from_bag_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Compression::None),
            "bz2" => Ok(Compression::Bz2),
            "lz4" => Ok(Compression::Lz4),
            "zstd" => Err(ContainerError::CompressionNotSupportedHere {
                compression: s.to_string(),
                container: "bag",
            }
            .into()),
            other => Err(ContainerError::UnknownCompression {
                compression: other.to_string(),
            }
            .into()),
        }
    }

    /// The bag chunk compression identifier.
    pub fn as_bag_str(&self) -> Result<&'static str> {
        match self {
            Compression::None => Ok("none"),
            Compression::Bz2 => Ok("bz2"),
            Compression::Lz4 => Ok("lz4"),
            Compression::Zstd => Err(ContainerError::CompressionNotSupportedHere {
                compression: "zstd".to_string(),
                container: "bag",
            }
            .into()),
        }
    }

    /// Parse a user-facing compression name (CLI flags).
    pub fn from_cli_str(s: &str) -> Result<Self> {
        match s {
            "none" | "" => Ok(Compression::None),
            "lz4" => Ok(Compression::Lz4),
            "zstd" => Ok(Compression::Zstd),
            "bz2" => Ok(Compression::Bz2),
            other => Err(ContainerError::UnknownCompression {
                compression: other.to_string(),
            }
            .into()),
        }
    }

    /// Compress a buffer.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Lz4 => Ok(lz4_flex::compress(data)),
            Compression::Zstd => zstd::bulk::compress(data, 3).map_err(|e| {
                ContainerError::Decompression {
                    reason: format!("zstd compression failed: {e}"),
                }
                .into()
            }),
            Compression::Bz2 => {
                let mut encoder =
                    bzip2::read::BzEncoder::new(data, bzip2::Compression::default());
                let mut out = Vec::new();
                encoder.read_to_end(&mut out).map_err(|e| {
                    ContainerError::Decompression {
                        reason: format!("bz2 compression failed: {e}"),
                    }
                })?;
                Ok(out)
            }
        }
    }

    /// Decompress a buffer whose uncompressed size is known.
    pub fn decompress(&self, data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Lz4 => {
                lz4_flex::decompress(data, uncompressed_size).map_err(|e| {
                    ContainerError::Decompression {
                        reason: format!("lz4 decompression failed: {e}"),
                    }
                    .into()
                })
            }
            Compression::Zstd => {
                zstd::bulk::decompress(data, uncompressed_size).map_err(|e| {
                    ContainerError::Decompression {
                        reason: format!("zstd decompression failed: {e}"),
                    }
                    .into()
                })
            }
            Compression::Bz2 => {
                let mut decoder = bzip2::read::BzDecoder::new(data);
                let mut out = Vec::with_capacity(uncompressed_size);
                decoder.read_to_end(&mut out).map_err(|e| {
                    ContainerError::Decompression {
                        reason: format!("bz2 decompression failed: {e}"),
                    }
                })?;
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut data = Vec::new();
        for i in 0..4096u32 {
            data.extend_from_slice(&(i % 16).to_le_bytes());
        }
        data
    }

    #[test]
    fn test_round_trip_all_codecs() {
        let data = sample();
        for codec in [
            Compression::None,
            Compression::Lz4,
            Compression::Zstd,
            Compression::Bz2,
        ] {
            let compressed = codec.compress(&data).unwrap();
            let restored = codec.decompress(&compressed, data.len()).unwrap();
            assert_eq!(restored, data, "{codec:?} round trip");
        }
    }

    #[test]
    fn test_mcap_identifiers() {
        assert_eq!(Compression::from_mcap_str("").unwrap(), Compression::None);
        assert_eq!(
            Compression::from_mcap_str("zstd").unwrap(),
            Compression::Zstd
        );
        assert!(Compression::from_mcap_str("bz2").is_err());
        assert!(Compression::from_mcap_str("snappy").is_err());
        assert_eq!(Compression::Lz4.as_mcap_str().unwrap(), "lz4");
        assert!(Compression::Bz2.as_mcap_str().is_err());
    }

    #[test]
    fn test_bag_identifiers() {
        assert_eq!(Compression::from_bag_str("none").unwrap(), Compression::None);
        assert_eq!(Compression::from_bag_str("bz2").unwrap(), Compression::Bz2);
        assert!(Compression::from_bag_str("zstd").is_err());
        assert_eq!(Compression::Bz2.as_bag_str().unwrap(), "bz2");
        assert!(Compression::Zstd.as_bag_str().is_err());
    }
}
