// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Message/chunk encryption interface.
//!
//! Providers handle both directions; the container layer stores the
//! provider's algorithm identifier alongside the encrypted payload. The
//! reference AES-256-GCM layout is `nonce(12) | ciphertext | tag(16)`
//! with a fresh random nonce per encryption; a concrete provider lives
//! outside this crate and plugs in through this trait.

use crate::core::Result;

/// Nonce length of the AES-256-GCM wire layout.
pub const AES_GCM_NONCE_SIZE: usize = 12;

/// Authentication tag length of the AES-256-GCM wire layout.
pub const AES_GCM_TAG_SIZE: usize = 16;

/// Key length for AES-256.
pub const AES_256_KEY_SIZE: usize = 32;

/// Encrypts and decrypts chunk or message payloads.
pub trait EncryptionProvider: Send + Sync {
    /// Algorithm identifier stored in the container (e.g. "aes-256-gcm").
    fn algorithm(&self) -> &str;

    /// Encrypt a payload, returning ciphertext plus whatever metadata
    /// (nonce, tag) decryption needs.
    ///
    /// Fails with [`crate::core::EncryptionError`] variants.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt a payload produced by [`encrypt`](Self::encrypt).
    ///
    /// Fails with [`crate::core::EncryptionError::AuthFailed`] when the
    /// authentication tag does not verify.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}
