/// Mailblaster credential encryption
///
/// One process-wide secret protects every stored SMTP password. Keys are
/// derived from that secret in `keys`, so a per-guild scheme later only has
/// to change how `CredentialCipher` is constructed.
pub mod cipher;
pub mod keys;

pub use cipher::{CipherError, CredentialCipher};
