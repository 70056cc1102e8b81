use sha2::{Digest, Sha256};

/// Label for the AES-256-GCM key.
pub const ENCRYPTION_LABEL: &[u8] = b"mailblaster/credential-encryption";

/// Label for the HMAC key that derives per-plaintext nonces.
pub const NONCE_LABEL: &[u8] = b"mailblaster/credential-nonce";

/// Derive a 256-bit key from the process secret, domain-separated by `label`.
pub fn derive_key(secret: &str, label: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(label);
    hasher.update([0u8]);
    hasher.update(secret.as_bytes());

    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}
