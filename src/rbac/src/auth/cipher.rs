//! Authenticated encryption for session tokens
//!
//! Token layout, base64 encoded with the standard alphabet:
//!
//! ```text
//! nonce (12 bytes) || AES-256-GCM( '1' || payload )
//! ```
//!
//! A fresh nonce is drawn for every token, so enciphering the same
//! credentials twice never yields the same token.
//!
//! A credential payload is `escaped-username:password`. The username is
//! percent-encoded so that the first `:` always ends it.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::fmt;

use crate::error::{RbacError, Result};
use crate::identity::UserPass;

/// Leading plaintext byte identifying the token format
pub const TOKEN_VERSION: u8 = b'1';

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HASH_CONTEXT: &str = "htrbac 2024-06-01 password digest v1";

/// Symmetric cipher keyed from a configured secret
#[derive(Clone)]
pub struct Cipher {
    key: [u8; KEY_LEN],
    hash_key: [u8; KEY_LEN],
}

impl Cipher {
    /// Build a cipher from a secret of any length.
    ///
    /// The secret is repeated and truncated to 32 bytes; an empty secret
    /// gives an all-zero key.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let key = pad_key(secret.as_ref());
        Self {
            hash_key: blake3::derive_key(HASH_CONTEXT, &key),
            key,
        }
    }

    /// Encrypt `data` into a base64 token.
    pub fn encipher(&self, data: &[u8]) -> Result<String> {
        let mut plaintext = Vec::with_capacity(data.len() + 1);
        plaintext.push(TOKEN_VERSION);
        plaintext.extend_from_slice(data);

        let nonce = generate_nonce();
        let cipher = Aes256Gcm::new((&self.key).into());
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|e| RbacError::Cipher(format!("encryption failed: {}", e)))?;

        let mut token = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(token))
    }

    /// Decrypt a token produced by [`Cipher::encipher`].
    pub fn decipher(&self, token: &str) -> Result<Vec<u8>> {
        let raw = BASE64
            .decode(token.trim())
            .map_err(|e| RbacError::Cipher(format!("invalid base64: {}", e)))?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(RbacError::Cipher("token too short".to_string()));
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new((&self.key).into());
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| RbacError::Cipher(format!("decryption failed: {}", e)))?;

        match plaintext.split_first() {
            Some((&TOKEN_VERSION, data)) => Ok(data.to_vec()),
            Some((version, _)) => Err(RbacError::Cipher(format!(
                "unsupported token version {:?}",
                *version as char
            ))),
            None => Err(RbacError::Cipher("empty token".to_string())),
        }
    }

    /// Token carrying the escaped username and the password
    pub fn encipher_userpass(&self, userpass: &UserPass) -> Result<String> {
        let username = urlencoding::encode(&userpass.username);
        self.encipher(format!("{}:{}", username, userpass.password).as_bytes())
    }

    pub fn decipher_userpass(&self, token: &str) -> Result<UserPass> {
        let data = String::from_utf8(self.decipher(token)?)
            .map_err(|_| RbacError::Cipher("token payload is not UTF-8".to_string()))?;
        let (username, password) = data
            .split_once(':')
            .ok_or_else(|| RbacError::Cipher("token payload has no ':'".to_string()))?;
        let username = urlencoding::decode(username)
            .map_err(|_| RbacError::Cipher("token username is not UTF-8".to_string()))?;
        Ok(UserPass::new(username, password))
    }

    /// Keyed BLAKE3 digest of `data`, base64 encoded. Deterministic for a
    /// given secret and different across secrets.
    pub fn hash(&self, data: impl AsRef<[u8]>) -> String {
        BASE64.encode(blake3::keyed_hash(&self.hash_key, data.as_ref()).as_bytes())
    }

    /// Compare two secrets in constant time via their keyed digests.
    pub fn secrets_equal(&self, a: impl AsRef<[u8]>, b: impl AsRef<[u8]>) -> bool {
        blake3::keyed_hash(&self.hash_key, a.as_ref()) == blake3::keyed_hash(&self.hash_key, b.as_ref())
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher").field("key", &"<redacted>").finish()
    }
}

fn pad_key(secret: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    if !secret.is_empty() {
        for (slot, byte) in key.iter_mut().zip(secret.iter().cycle()) {
            *slot = *byte;
        }
    }
    key
}

fn generate_nonce() -> [u8; NONCE_LEN] {
    use rand::RngCore;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}
