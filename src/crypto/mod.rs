/// Protected workflow content
///
/// Protected workflows arrive with their graph encrypted under a passphrase.
/// The passphrase is resolved (explicit `pass` first, implicit secret second),
/// stretched into an AES-256 key with Argon2id, and used once to open the
/// graph at ingestion time.

pub mod codec;
pub mod passphrase;

use crate::collaborators::SecretSource;
use crate::workflow::types::Workflow;

pub use codec::{protect, unprotect};
pub use passphrase::{derive_key, resolve_passphrase};

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("no passphrase available: {0}")]
    NoPassphrase(String),
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("invalid ciphertext encoding")]
    InvalidEncoding,
    #[error("failed to decrypt workflow content")]
    Decrypt,
    #[error("failed to encrypt workflow content")]
    Encrypt,
}

/// Decrypt a protected workflow's graph and clear its protection flag
///
/// Unprotected workflows pass through unchanged. On any failure the input is
/// dropped and the error returned, so a half-decrypted record never escapes.
pub fn resolve_protection(
    mut workflow: Workflow,
    secrets: &dyn SecretSource,
) -> Result<Workflow, CodecError> {
    if !workflow.is_protected {
        return Ok(workflow);
    }

    let passphrase = resolve_passphrase(&workflow.pass, secrets)?;
    let plaintext = unprotect(&workflow.graph_data, &passphrase)?;

    workflow.graph_data = plaintext;
    workflow.is_protected = false;

    tracing::debug!(workflow_id = %workflow.id, "Decrypted protected workflow");
    Ok(workflow)
}
