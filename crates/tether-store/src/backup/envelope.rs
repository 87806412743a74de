//! Passphrase-protected backup envelope
//!
//! Current format: `{alg, salt, iv, data, hmac}` with every field but `alg`
//! hex-encoded. A 64-byte Argon2id output is split into an AES-256-GCM key
//! and an HMAC-SHA256 key; `data` is the GCM ciphertext under nonce `iv`,
//! and `hmac` covers `salt || iv || data`.
//!
//! Envelopes without `alg` come from older exports and are read with the
//! legacy scheme: key = hex(SHA-256(passphrase + salt_hex)), data XORed
//! with the key's hex text, tag = hex(SHA-256(key + plaintext)) or, for the
//! oldest files, hex(SHA-256(key + data_hex)). New envelopes are never
//! written in the legacy format.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::Argon2;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Result, StoreError};

/// Algorithm marker of the current envelope format
pub const ENVELOPE_ALG: &str = "argon2id-aes256gcm-hmacsha256";

const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Encrypted wrapper around a serialized snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Scheme marker; absent on legacy envelopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key-derivation salt (hex)
    pub salt: String,

    /// Cipher nonce (hex)
    pub iv: String,

    /// Ciphertext (hex)
    pub data: String,

    /// Integrity tag (hex)
    pub hmac: String,
}

impl Envelope {
    /// Whether a parsed JSON document has the shape of an envelope
    pub fn is_envelope(value: &serde_json::Value) -> bool {
        ["salt", "iv", "data", "hmac"]
            .iter()
            .all(|k| value.get(k).is_some_and(|v| v.is_string()))
    }

    /// Encrypt plaintext under a passphrase
    pub fn seal(plaintext: &[u8], passphrase: &str) -> Result<Self> {
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let keys = derive_keys(passphrase, &salt)?;
        let cipher = Aes256Gcm::new_from_slice(&keys[..KEY_SIZE])
            .map_err(|e| StoreError::Crypto(format!("cipher init: {e}")))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| StoreError::Crypto(format!("encrypt: {e}")))?;

        let tag = mac_tag(&keys[KEY_SIZE..], &salt, &nonce_bytes, &ciphertext)?;

        Ok(Self {
            alg: Some(ENVELOPE_ALG.to_string()),
            salt: hex::encode(salt),
            iv: hex::encode(nonce_bytes),
            data: hex::encode(ciphertext),
            hmac: hex::encode(tag),
        })
    }

    /// Decrypt and verify
    ///
    /// A wrong passphrase and a tampered envelope both yield
    /// [`StoreError::Integrity`].
    pub fn open(&self, passphrase: &str) -> Result<Vec<u8>> {
        match self.alg.as_deref() {
            Some(ENVELOPE_ALG) => self.open_current(passphrase),
            Some(other) => Err(StoreError::InvalidEnvelope(format!(
                "unsupported algorithm: {other}"
            ))),
            None => self.open_legacy(passphrase),
        }
    }

    fn open_current(&self, passphrase: &str) -> Result<Vec<u8>> {
        let salt = decode_field("salt", &self.salt)?;
        let nonce_bytes = decode_field("iv", &self.iv)?;
        let ciphertext = decode_field("data", &self.data)?;
        let stored_tag = decode_field("hmac", &self.hmac)?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(StoreError::InvalidEnvelope(format!(
                "iv must be {NONCE_SIZE} bytes, got {}",
                nonce_bytes.len()
            )));
        }

        let keys = derive_keys(passphrase, &salt)?;

        let mut mac = <HmacSha256 as Mac>::new_from_slice(&keys[KEY_SIZE..])
            .map_err(|e| StoreError::Crypto(format!("hmac init: {e}")))?;
        mac.update(&salt);
        mac.update(&nonce_bytes);
        mac.update(&ciphertext);
        mac.verify_slice(&stored_tag)
            .map_err(|_| StoreError::Integrity)?;

        let cipher = Aes256Gcm::new_from_slice(&keys[..KEY_SIZE])
            .map_err(|e| StoreError::Crypto(format!("cipher init: {e}")))?;
        cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| StoreError::Integrity)
    }

    fn open_legacy(&self, passphrase: &str) -> Result<Vec<u8>> {
        let key = legacy_key(passphrase, &self.salt);
        let ciphertext = decode_field("data", &self.data)?;
        let plaintext = xor_with_key(&ciphertext, key.as_bytes());

        let stored = self.hmac.trim().to_ascii_lowercase();
        let over_plaintext = sha256_hex(&[key.as_bytes(), plaintext.as_slice()]);
        let over_ciphertext = sha256_hex(&[key.as_bytes(), self.data.as_bytes()]);
        if constant_time_eq(stored.as_bytes(), over_plaintext.as_bytes())
            || constant_time_eq(stored.as_bytes(), over_ciphertext.as_bytes())
        {
            Ok(plaintext)
        } else {
            Err(StoreError::Integrity)
        }
    }

    /// Build a legacy envelope, for exercising the read path
    #[cfg(test)]
    pub(crate) fn seal_legacy(plaintext: &[u8], passphrase: &str) -> Self {
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        let mut iv = [0u8; 16];
        OsRng.fill_bytes(&mut iv);
        let salt_hex = hex::encode(salt);
        let key = legacy_key(passphrase, &salt_hex);

        Self {
            alg: None,
            hmac: sha256_hex(&[key.as_bytes(), plaintext]),
            data: hex::encode(xor_with_key(plaintext, key.as_bytes())),
            salt: salt_hex,
            iv: hex::encode(iv),
        }
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim())
        .map_err(|e| StoreError::InvalidEnvelope(format!("{name} is not valid hex: {e}")))
}

fn derive_keys(passphrase: &str, salt: &[u8]) -> Result<Zeroizing<[u8; 2 * KEY_SIZE]>> {
    let params = argon2::Params::new(19_456, 2, 1, Some(2 * KEY_SIZE))
        .map_err(|e| StoreError::Crypto(format!("argon2 params: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
    let mut keys = Zeroizing::new([0u8; 2 * KEY_SIZE]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, keys.as_mut())
        .map_err(|e| StoreError::Crypto(format!("key derivation: {e}")))?;
    Ok(keys)
}

fn mac_tag(key: &[u8], salt: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| StoreError::Crypto(format!("hmac init: {e}")))?;
    mac.update(salt);
    mac.update(nonce);
    mac.update(ciphertext);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

fn legacy_key(passphrase: &str, salt_hex: &str) -> Zeroizing<String> {
    Zeroizing::new(sha256_hex(&[passphrase.as_bytes(), salt_hex.as_bytes()]))
}

fn xor_with_key(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSPHRASE: &str = "one two three four five six";

    fn flip_hex_char(s: &str, index: usize) -> String {
        let mut chars: Vec<char> = s.chars().collect();
        chars[index] = if chars[index] == '0' { '1' } else { '0' };
        chars.into_iter().collect()
    }

    #[test]
    fn test_seal_open_round_trip() {
        let envelope = Envelope::seal(b"{\"version\":1}", PASSPHRASE).unwrap();
        assert_eq!(envelope.alg.as_deref(), Some(ENVELOPE_ALG));
        assert_eq!(envelope.salt.len(), SALT_SIZE * 2);
        assert_eq!(envelope.iv.len(), NONCE_SIZE * 2);
        assert_eq!(envelope.open(PASSPHRASE).unwrap(), b"{\"version\":1}");
    }

    #[test]
    fn test_wrong_passphrase_is_integrity_error() {
        let envelope = Envelope::seal(b"secret", PASSPHRASE).unwrap();
        let err = envelope.open("six five four three two one").unwrap_err();
        assert!(matches!(err, StoreError::Integrity));
    }

    #[test]
    fn test_flipped_data_is_integrity_error() {
        let mut envelope = Envelope::seal(b"some snapshot bytes", PASSPHRASE).unwrap();
        envelope.data = flip_hex_char(&envelope.data, 3);
        assert!(matches!(envelope.open(PASSPHRASE), Err(StoreError::Integrity)));
    }

    #[test]
    fn test_bad_hex_is_invalid_envelope() {
        let mut envelope = Envelope::seal(b"x", PASSPHRASE).unwrap();
        envelope.salt = "zz".to_string();
        assert!(matches!(envelope.open(PASSPHRASE), Err(StoreError::InvalidEnvelope(_))));
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let mut envelope = Envelope::seal(b"x", PASSPHRASE).unwrap();
        envelope.alg = Some("rot13".to_string());
        assert!(matches!(envelope.open(PASSPHRASE), Err(StoreError::InvalidEnvelope(_))));
    }

    #[test]
    fn test_legacy_envelope_readable() {
        let envelope = Envelope::seal_legacy(b"{\"entities\":[]}", PASSPHRASE);
        assert!(envelope.alg.is_none());
        assert_eq!(envelope.open(PASSPHRASE).unwrap(), b"{\"entities\":[]}");

        let mut tampered = envelope.clone();
        tampered.data = flip_hex_char(&tampered.data, 0);
        assert!(matches!(tampered.open(PASSPHRASE), Err(StoreError::Integrity)));
    }

    #[test]
    fn test_legacy_ciphertext_tag_accepted() {
        let mut envelope = Envelope::seal_legacy(b"old export", PASSPHRASE);
        let key = legacy_key(PASSPHRASE, &envelope.salt);
        envelope.hmac = sha256_hex(&[key.as_bytes(), envelope.data.as_bytes()]);
        assert_eq!(envelope.open(PASSPHRASE).unwrap(), b"old export");
    }

    #[test]
    fn test_envelope_shape_detection() {
        let envelope = Envelope::seal(b"x", PASSPHRASE).unwrap();
        let value = serde_json::to_value(&envelope).unwrap();
        assert!(Envelope::is_envelope(&value));
        assert!(!Envelope::is_envelope(&serde_json::json!({"version": 1, "entities": []})));
    }
}
