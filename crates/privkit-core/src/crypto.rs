//! Symmetric envelope codec.
//!
//! Documents are encrypted with AES-256-CBC (PKCS#7 padding) under a single
//! process-wide key. Each call to [`SymmetricCodec::encrypt`] draws a fresh
//! random IV, so rewriting the same document never repeats a ciphertext.

use std::fmt;
use std::str::FromStr;

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use crate::error::CoreError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// IV length in bytes (one AES block).
pub const IV_LEN: usize = 16;

/// Byte used to pad short secrets up to [`KEY_LEN`].
const KEY_PAD: u8 = b'0';

/// A 256-bit symmetric key.
///
/// The key is never persisted; it is derived from configuration at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive a key from a configured secret.
    ///
    /// The UTF-8 bytes of `secret` are truncated to 32 bytes, or padded on
    /// the right with ASCII `'0'`. This keeps envelopes written by earlier
    /// deployments readable with the same secret.
    pub fn from_secret(secret: &str) -> Self {
        let mut bytes = [KEY_PAD; KEY_LEN];
        let raw = secret.as_bytes();
        let n = raw.len().min(KEY_LEN);
        bytes[..n].copy_from_slice(&raw[..n]);
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// An encrypted payload: the IV and the CBC ciphertext.
///
/// The textual form is `hex(iv):hex(ciphertext)`.
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope {
    pub iv: [u8; IV_LEN],
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Parse the `hex(iv):hex(ciphertext)` form.
    ///
    /// Splits on the first `:` only.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let (iv_hex, cipher_hex) = text
            .trim()
            .split_once(':')
            .ok_or_else(|| CoreError::MalformedEnvelope("missing ':' separator".into()))?;

        let iv_bytes = hex::decode(iv_hex)
            .map_err(|e| CoreError::MalformedEnvelope(format!("iv: {}", e)))?;
        let iv: [u8; IV_LEN] = iv_bytes.try_into().map_err(|v: Vec<u8>| {
            CoreError::MalformedEnvelope(format!("iv must be {} bytes, got {}", IV_LEN, v.len()))
        })?;

        let ciphertext = hex::decode(cipher_hex)
            .map_err(|e| CoreError::MalformedEnvelope(format!("ciphertext: {}", e)))?;

        Ok(Self { iv, ciphertext })
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.iv), hex::encode(&self.ciphertext))
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Envelope(iv={}, {} bytes)",
            hex::encode(self.iv),
            self.ciphertext.len()
        )
    }
}

impl FromStr for Envelope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Encrypts and decrypts byte payloads under a fixed key.
#[derive(Debug, Clone)]
pub struct SymmetricCodec {
    key: EncryptionKey,
}

impl SymmetricCodec {
    /// Create a codec for the given key.
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }

    /// Encrypt `plaintext` with a fresh random IV.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Envelope, CoreError> {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let cipher = Aes256CbcEnc::new_from_slices(self.key.as_bytes(), &iv)
            .map_err(|e| CoreError::Encryption(e.to_string()))?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        Ok(Envelope { iv, ciphertext })
    }

    /// Decrypt an envelope.
    ///
    /// Fails with [`CoreError::Decryption`] on a wrong key or invalid padding.
    pub fn decrypt(&self, envelope: &Envelope) -> Result<Vec<u8>, CoreError> {
        let cipher = Aes256CbcDec::new_from_slices(self.key.as_bytes(), &envelope.iv)
            .map_err(|e| CoreError::Decryption(e.to_string()))?;

        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&envelope.ciphertext)
            .map_err(|_| CoreError::Decryption("invalid padding or wrong key".into()))
    }

    /// Encrypt and render in the textual envelope form.
    pub fn encrypt_str(&self, plaintext: &[u8]) -> Result<String, CoreError> {
        Ok(self.encrypt(plaintext)?.to_string())
    }

    /// Parse the textual envelope form and decrypt it.
    pub fn decrypt_str(&self, envelope: &str) -> Result<Vec<u8>, CoreError> {
        let envelope = Envelope::parse(envelope)?;
        self.decrypt(&envelope)
    }
}
