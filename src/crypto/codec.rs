use aes_gcm::{aead::Aead, aead::KeyInit, Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand_core::{OsRng, RngCore};

use crate::crypto::passphrase::derive_key;
use crate::crypto::CodecError;

pub const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Encrypt a serialized graph under a passphrase
///
/// Output is `base64(salt || nonce || ciphertext)`. A fresh salt and nonce are
/// drawn for every call.
pub fn protect(plaintext: &str, passphrase: &str) -> Result<String, CodecError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CodecError::Encrypt)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|_| CodecError::Encrypt)?;

    let mut combined = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    combined.extend_from_slice(&salt);
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    Ok(STANDARD.encode(combined))
}

/// Decrypt a graph produced by [`protect`]
pub fn unprotect(encoded: &str, passphrase: &str) -> Result<String, CodecError> {
    let data = STANDARD
        .decode(encoded.trim())
        .map_err(|_| CodecError::InvalidEncoding)?;
    if data.len() <= SALT_LEN + NONCE_LEN {
        return Err(CodecError::InvalidEncoding);
    }

    let (salt, rest) = data.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let key = derive_key(passphrase, salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CodecError::Decrypt)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CodecError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|_| CodecError::Decrypt)
}
