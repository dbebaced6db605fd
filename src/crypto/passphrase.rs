use argon2::Argon2;

use crate::collaborators::SecretSource;
use crate::crypto::CodecError;

pub const KEY_LEN: usize = 32;

/// Pick the passphrase for a protected workflow
///
/// A non-empty explicit `pass` always wins. Only when it is empty does the
/// process-wide secret source get asked for the implicit passphrase.
pub fn resolve_passphrase(pass: &str, secrets: &dyn SecretSource) -> Result<String, CodecError> {
    if !pass.is_empty() {
        return Ok(pass.to_string());
    }

    let implicit = secrets
        .implicit_passphrase()
        .map_err(|e| CodecError::NoPassphrase(e.to_string()))?;
    if implicit.is_empty() {
        return Err(CodecError::NoPassphrase("implicit passphrase is empty".to_string()));
    }
    Ok(implicit)
}

/// Derive a 256-bit key from a passphrase and salt with Argon2id
///
/// Deterministic for the same passphrase and salt.
pub fn derive_key(passphrase: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], CodecError> {
    let mut key = [0u8; KEY_LEN];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| CodecError::KeyDerivation(e.to_string()))?;
    Ok(key)
}
