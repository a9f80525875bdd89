//! Sealed envelopes.
//!
//! A value is CBOR-encoded, encrypted with ChaCha20-Poly1305 under a fresh
//! nonce, and wrapped in a [`Sealed`] envelope that carries everything
//! needed to open it (given the key). The envelope itself serializes to
//! CBOR bytes, or to a hex token for text transports.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SealError};
use crate::key::{SealKey, SealNonce};

/// Format identifier for sealed envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SealFormat {
    /// CBOR payload, ChaCha20-Poly1305 with 256-bit key.
    CborChaCha20Poly1305 = 1,
}

/// An encrypted, serialized value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sealed {
    pub format: SealFormat,
    pub nonce: SealNonce,
    /// Ciphertext including the authentication tag.
    pub ciphertext: Bytes,
}

impl Sealed {
    /// Serialize `value` and encrypt it under `key`.
    pub fn seal<T: Serialize + ?Sized>(value: &T, key: &SealKey) -> Result<Self> {
        let mut plaintext = Vec::new();
        ciborium::into_writer(value, &mut plaintext)
            .map_err(|e| SealError::Serialization(e.to_string()))?;

        let nonce = SealNonce::generate();
        let ciphertext = key.encrypt(&plaintext, &nonce)?;

        Ok(Self {
            format: SealFormat::CborChaCha20Poly1305,
            nonce,
            ciphertext: Bytes::from(ciphertext),
        })
    }

    /// Decrypt and deserialize.
    pub fn open<T: DeserializeOwned>(&self, key: &SealKey) -> Result<T> {
        let plaintext = match self.format {
            SealFormat::CborChaCha20Poly1305 => key.decrypt(&self.ciphertext, &self.nonce)?,
        };
        ciborium::from_reader(plaintext.as_slice())
            .map_err(|e| SealError::Serialization(e.to_string()))
    }

    /// Serialize the envelope to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| SealError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize an envelope from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| SealError::Serialization(e.to_string()))
    }

    /// The envelope as a lowercase hex token.
    pub fn to_token(&self) -> Result<String> {
        Ok(hex::encode(self.to_bytes()?))
    }

    pub fn from_token(token: &str) -> Result<Self> {
        Self::from_bytes(&hex::decode(token)?)
    }
}

/// Seal a value straight to a token string.
pub fn seal_token<T: Serialize + ?Sized>(value: &T, key: &SealKey) -> Result<String> {
    Sealed::seal(value, key)?.to_token()
}

/// Open a token produced by [`seal_token`].
pub fn open_token<T: DeserializeOwned>(token: &str, key: &SealKey) -> Result<T> {
    Sealed::from_token(token)?.open(key)
}
