//! `CredentialVault`: AES-256-CBC symmetric encryption of provider
//! credentials at rest, with a process-wide key.
//!
//! Encrypt/decrypt are the only exported operations; plaintext never leaves
//! the vault except into a `ProviderDriver` instance. The stored format is
//! exactly `hex(iv):hex(ct)` — no header, no version byte — and the IV is
//! random per encryption so two encryptions of the same plaintext never
//! collide on ciphertext.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const MIN_KEY_LEN: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("vault key too short: need at least {MIN_KEY_LEN} bytes, got {0}")]
    KeyTooShort(usize),

    #[error("malformed ciphertext: expected `hex(iv):hex(ct)`")]
    MalformedCiphertext,

    #[error("invalid hex in ciphertext: {0}")]
    InvalidHex(String),

    #[error("decryption failed: corrupt ciphertext or wrong key")]
    DecryptionFailed,
}

/// Stateless once constructed: the key is loaded once at startup and never
/// mutated. Safe to share across calls and providers via `Arc`.
#[derive(Clone)]
pub struct CredentialVault {
    key: [u8; KEY_LEN],
}

impl CredentialVault {
    /// Refuses to start if `key` is shorter than 32 bytes (spec §4.10,
    /// §7). Longer keys are accepted and truncated to the first 32 bytes,
    /// matching AES-256's fixed key size.
    pub fn new(key: &[u8]) -> Result<Self, VaultError> {
        tracing::info!(key_len = key.len(), "initializing credential vault");
        if key.len() < MIN_KEY_LEN {
            return Err(VaultError::KeyTooShort(key.len()));
        }
        let mut fixed = [0u8; KEY_LEN];
        fixed.copy_from_slice(&key[..KEY_LEN]);
        Ok(Self { key: fixed })
    }

    pub fn from_str_key(key: &str) -> Result<Self, VaultError> {
        Self::new(key.as_bytes())
    }

    /// Encrypt `plaintext`, returning `hex(iv):hex(ct)`. A fresh random IV
    /// is generated on every call.
    pub fn encrypt(&self, plaintext: &[u8]) -> String {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        format!("{}:{}", hex::encode(iv), hex::encode(ciphertext))
    }

    /// Decrypt a value produced by `encrypt`. Fails closed: any malformed
    /// input, bad hex, or padding mismatch returns an error rather than
    /// partial plaintext.
    pub fn decrypt(&self, stored: &str) -> Result<Vec<u8>, VaultError> {
        let (iv_hex, ct_hex) = stored.split_once(':').ok_or(VaultError::MalformedCiphertext)?;

        let iv = hex::decode(iv_hex).map_err(|e| VaultError::InvalidHex(e.to_string()))?;
        let ciphertext = hex::decode(ct_hex).map_err(|e| VaultError::InvalidHex(e.to_string()))?;

        if iv.len() != IV_LEN {
            return Err(VaultError::MalformedCiphertext);
        }

        let mut iv_fixed = [0u8; IV_LEN];
        iv_fixed.copy_from_slice(&iv);

        Aes256CbcDec::new(&self.key.into(), &iv_fixed.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| VaultError::DecryptionFailed)
    }

    pub fn encrypt_str(&self, plaintext: &str) -> String {
        self.encrypt(plaintext.as_bytes())
    }

    pub fn decrypt_str(&self, stored: &str) -> Result<String, VaultError> {
        let bytes = self.decrypt(stored)?;
        String::from_utf8(bytes).map_err(|_| VaultError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> CredentialVault {
        CredentialVault::new(&[7u8; 32]).unwrap()
    }

    #[test]
    fn round_trips_arbitrary_bytes() {
        let v = vault();
        for plaintext in [&b""[..], b"x", b"a credential blob", &[0u8; 1000]] {
            let stored = v.encrypt(plaintext);
            assert_eq!(v.decrypt(&stored).unwrap(), plaintext);
        }
    }

    #[test]
    fn ciphertext_differs_across_encryptions() {
        let v = vault();
        let a = v.encrypt(b"same plaintext");
        let b = v.encrypt(b"same plaintext");
        assert_ne!(a, b, "IV randomness must make ciphertexts differ");
        assert_eq!(v.decrypt(&a).unwrap(), v.decrypt(&b).unwrap());
    }

    #[test]
    fn stored_format_is_hex_iv_colon_hex_ct() {
        let v = vault();
        let stored = v.encrypt(b"hello");
        let (iv_hex, ct_hex) = stored.split_once(':').unwrap();
        assert_eq!(iv_hex.len(), IV_LEN * 2);
        assert!(hex::decode(iv_hex).is_ok());
        assert!(hex::decode(ct_hex).is_ok());
    }

    #[test]
    fn rejects_key_shorter_than_32_bytes() {
        assert_eq!(CredentialVault::new(&[1u8; 31]).unwrap_err(), VaultError::KeyTooShort(31));
    }

    #[test]
    fn longer_keys_are_accepted_and_truncated() {
        let short = CredentialVault::new(&[3u8; 32]).unwrap();
        let long = CredentialVault::new(&[3u8; 64]).unwrap();
        let stored = short.encrypt(b"payload");
        assert_eq!(long.decrypt(&stored).unwrap(), b"payload");
    }

    #[test]
    fn malformed_ciphertext_is_rejected() {
        let v = vault();
        assert!(v.decrypt("not-a-valid-stored-value").is_err());
        assert!(v.decrypt("zz:zz").is_err());
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let a = CredentialVault::new(&[1u8; 32]).unwrap();
        let b = CredentialVault::new(&[2u8; 32]).unwrap();
        let stored = a.encrypt(b"secret");
        assert!(b.decrypt(&stored).is_err());
    }
}
