// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types: error taxonomy and the runtime value model.

pub mod error;
pub mod value;

pub use error::{
    CodecError, ContainerError, EncryptionError, Error, Result, SchemaError,
};
pub use value::{DecodedMessage, Value};
