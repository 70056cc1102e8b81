use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::keys::{ENCRYPTION_LABEL, NONCE_LABEL, derive_key};

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Not base64, too short, or not UTF-8 after decryption.
    #[error("malformed ciphertext: {0}")]
    Malformed(String),

    /// Authentication tag mismatch: wrong key or modified data.
    #[error("ciphertext failed authentication")]
    Tampered,
}

/// Reversible encryption for stored SMTP passwords.
///
/// AES-256-GCM with a synthetic nonce (HMAC-SHA256 of the plaintext), so the
/// same secret and plaintext always yield the same text. Output is
/// `base64(nonce || ciphertext || tag)`.
#[derive(Clone)]
pub struct CredentialCipher {
    enc_key: [u8; 32],
    nonce_key: [u8; 32],
}

impl CredentialCipher {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            enc_key: derive_key(secret, ENCRYPTION_LABEL),
            nonce_key: derive_key(secret, NONCE_LABEL),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce_bytes = self.synthetic_nonce(plaintext.as_bytes())?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.enc_key));

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| CipherError::Encryption(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(blob))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let blob = BASE64
            .decode(encoded.trim())
            .map_err(|e| CipherError::Malformed(e.to_string()))?;
        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::Malformed(format!(
                "expected at least {} bytes, got {}",
                NONCE_LEN + TAG_LEN,
                blob.len()
            )));
        }

        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.enc_key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::Tampered)?;

        String::from_utf8(plaintext).map_err(|e| CipherError::Malformed(e.to_string()))
    }

    fn synthetic_nonce(&self, plaintext: &[u8]) -> Result<[u8; NONCE_LEN], CipherError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.nonce_key)
            .map_err(|e| CipherError::Encryption(e.to_string()))?;
        mac.update(plaintext);
        let digest = mac.finalize().into_bytes();

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&digest[..NONCE_LEN]);
        Ok(nonce)
    }
}
