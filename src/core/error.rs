// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Error types for robolog.
//!
//! Errors are grouped by effect:
//! - [`CodecError`] - wire-level decode/encode failures (CDR, ROS1)
//! - [`SchemaError`] - schema parsing, validation and compilation failures
//! - [`ContainerError`] - MCAP/bag container-level failures
//! - [`EncryptionError`] - encryption adapter failures
//!
//! All buckets convert into the top-level [`Error`] used by `Result<T>`.

use thiserror::Error;

/// Wire-level codec errors (primitive streams).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// A read would pass the end of the buffer.
    #[error("truncated read: requested {requested} bytes at position {position}, {available} available")]
    Truncated {
        /// Requested byte count
        requested: usize,
        /// Bytes remaining in the buffer
        available: usize,
        /// Position at which the read was attempted
        position: u64,
    },

    /// An encoded integer does not fit its declared width.
    #[error("integer overflow: value {value} does not fit {target}")]
    Overflow {
        /// The value that was being encoded
        value: i128,
        /// Target primitive name
        target: &'static str,
    },

    /// Malformed UTF-8 in a decoded string.
    #[error("malformed UTF-8 string at position {position}")]
    BadUtf8 {
        /// Position of the string payload
        position: u64,
    },

    /// Malformed UTF-16 payload in a decoded wstring.
    #[error("malformed UTF-16 wstring at position {position}")]
    BadUtf16 {
        /// Position of the wstring payload
        position: u64,
    },

    /// A value of the wrong kind was supplied to an encoder.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected value kind
        expected: &'static str,
        /// Supplied value kind
        actual: &'static str,
    },
}

/// Schema parsing, validation and compilation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A complex type reference could not be resolved.
    #[error("unresolved type reference '{type_name}'")]
    Unresolved {
        /// The referenced type name
        type_name: String,
    },

    /// A field name appears more than once within one schema.
    #[error("duplicate field '{name}'")]
    DuplicateField {
        /// The duplicated field name
        name: String,
    },

    /// A constant's literal is not representable in its declared type.
    #[error("invalid constant '{name}': {reason}")]
    InvalidConstant {
        /// The constant name
        name: String,
        /// Why the literal was rejected
        reason: String,
    },

    /// A cycle was detected while resolving complex references.
    #[error("schema cycle through '{type_name}'")]
    Cycle {
        /// A type on the cycle
        type_name: String,
    },

    /// A primitive type name is not recognised.
    #[error("unsupported primitive '{name}'")]
    UnsupportedPrimitive {
        /// The rejected type token
        name: String,
    },

    /// A connection's declared MD5 does not match the schema text.
    #[error("MD5 mismatch: expected {expected}, computed {actual}")]
    BadMd5 {
        /// Declared checksum
        expected: String,
        /// Checksum computed from the schema text
        actual: String,
    },

    /// A fixed array was encoded with the wrong number of elements.
    #[error("array size mismatch: expected {expected}, got {actual}")]
    ArraySize {
        /// Declared array length
        expected: usize,
        /// Supplied element count
        actual: usize,
    },

    /// A bounded sequence was encoded past its bound.
    #[error("sequence of {actual} elements exceeds bound {bound}")]
    SequenceBound {
        /// Declared upper bound
        bound: usize,
        /// Supplied element count
        actual: usize,
    },

    /// A bounded string was encoded past its bound.
    #[error("string of {actual} bytes exceeds bound {bound}")]
    StringBound {
        /// Declared upper bound
        bound: usize,
        /// Supplied byte length
        actual: usize,
    },

    /// A schema definition line could not be parsed.
    #[error("cannot parse schema line '{line}': {reason}")]
    Parse {
        /// The offending line
        line: String,
        /// Why it was rejected
        reason: String,
    },

    /// A field was missing from a message being encoded.
    #[error("message is missing field '{name}'")]
    MissingField {
        /// The missing field name
        name: String,
    },
}

/// Container-level errors for MCAP and bag files.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContainerError {
    /// File does not start (or end) with the expected magic bytes.
    #[error("bad magic: expected {expected}, found {found}")]
    BadMagic {
        /// Expected magic, hex-encoded
        expected: String,
        /// Found bytes, hex-encoded
        found: String,
    },

    /// A record carries an opcode outside the known range.
    #[error("unknown record opcode 0x{opcode:02x} at offset {offset}")]
    UnknownOpcode {
        /// The unknown opcode byte
        opcode: u8,
        /// File offset of the opcode byte
        offset: u64,
    },

    /// The data-section CRC did not verify.
    #[error("data section CRC mismatch: recorded {expected:#010x}, computed {actual:#010x}")]
    DataSectionCrc {
        /// CRC recorded in the DataEnd record
        expected: u32,
        /// CRC computed over the data section
        actual: u32,
    },

    /// A chunk's uncompressed CRC did not verify.
    #[error("chunk CRC mismatch for chunk at offset {chunk_start_offset}")]
    ChunkCrc {
        /// Offset of the chunk record's opcode byte
        chunk_start_offset: u64,
    },

    /// An attachment's CRC did not verify.
    #[error("attachment CRC mismatch for '{name}'")]
    AttachmentCrc {
        /// Attachment name
        name: String,
    },

    /// The summary-section CRC did not verify.
    #[error("summary CRC mismatch: recorded {expected:#010x}, computed {actual:#010x}")]
    SummaryCrc {
        /// CRC recorded in the footer
        expected: u32,
        /// CRC computed over the summary section
        actual: u32,
    },

    /// A chunk declares a compression this library does not know.
    #[error("unknown compression '{compression}'")]
    UnknownCompression {
        /// The compression identifier from the chunk
        compression: String,
    },

    /// A compression is known but not valid for this container format.
    #[error("compression '{compression}' is not supported by {container} files")]
    CompressionNotSupportedHere {
        /// The rejected compression identifier
        compression: String,
        /// Container name ("mcap" or "bag")
        container: &'static str,
    },

    /// No decoder exists for a channel's encoding pair.
    #[error("no decoder for message encoding '{message_encoding}' with schema encoding '{schema_encoding}'")]
    UnknownEncoding {
        /// Channel message encoding
        message_encoding: String,
        /// Schema encoding
        schema_encoding: String,
    },

    /// The file ends mid-record and cannot be recovered further.
    #[error("file truncated at offset {offset}")]
    Truncated {
        /// Offset of the first incomplete byte
        offset: u64,
    },

    /// A message references a schema id with no Schema record.
    #[error("unknown schema id {schema_id}")]
    UnknownSchema {
        /// The dangling schema id
        schema_id: u16,
    },

    /// A message references a channel id with no Channel record.
    #[error("unknown channel id {channel_id}")]
    UnknownChannel {
        /// The dangling channel id
        channel_id: u16,
    },

    /// Chunk decompression failed.
    #[error("chunk decompression failed: {reason}")]
    Decompression {
        /// Decoder error text
        reason: String,
    },

    /// A record body is malformed.
    #[error("malformed {record} record: {reason}")]
    MalformedRecord {
        /// Record type name
        record: &'static str,
        /// Why the body was rejected
        reason: String,
    },
}

/// Encryption adapter errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncryptionError {
    /// Key length does not match the algorithm.
    #[error("bad key size: expected {expected} bytes, got {actual}")]
    KeySize {
        /// Required key length
        expected: usize,
        /// Supplied key length
        actual: usize,
    },

    /// Authentication tag verification failed on decrypt.
    #[error("authentication failed")]
    AuthFailed,
}

/// Top-level error type for robolog operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Wire-level codec error
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Schema error
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Container error
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Encryption error
    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for robolog operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_display() {
        let err = CodecError::Truncated {
            requested: 8,
            available: 3,
            position: 42,
        };
        let text = err.to_string();
        assert!(text.contains("requested 8"));
        assert!(text.contains("position 42"));
    }

    #[test]
    fn test_array_size_display() {
        let err = SchemaError::ArraySize {
            expected: 5,
            actual: 2,
        };
        assert_eq!(err.to_string(), "array size mismatch: expected 5, got 2");
    }

    #[test]
    fn test_error_conversion() {
        fn fails() -> Result<()> {
            Err(ContainerError::UnknownCompression {
                compression: "snappy".to_string(),
            }
            .into())
        }
        match fails() {
            Err(Error::Container(ContainerError::UnknownCompression { compression })) => {
                assert_eq!(compression, "snappy");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
