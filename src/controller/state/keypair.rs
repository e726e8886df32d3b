//! Key pair import state machine: `"" -> provisioned`.

use crate::crd::{ImportKeyPairSpec, ImportKeyPairStatus, KeyPairPhase};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPairStep {
    Import,
    Idle,
}

/// Spec content that can never be provisioned as written
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("spec.publicKey is empty")]
    EmptyPublicKey,
}

/// Decide the next call for a key pair.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyPublicKey`] when an import is due but
/// there is no key material to import.
pub fn plan(phase: KeyPairPhase, spec: &ImportKeyPairSpec) -> Result<KeyPairStep, ValidationError> {
    match phase {
        KeyPairPhase::Unsubmitted if spec.public_key.trim().is_empty() => {
            Err(ValidationError::EmptyPublicKey)
        }
        KeyPairPhase::Unsubmitted => Ok(KeyPairStep::Import),
        KeyPairPhase::Provisioned => Ok(KeyPairStep::Idle),
    }
}

/// Status after a successful import
#[must_use]
pub fn imported(key_pair_id: String) -> ImportKeyPairStatus {
    ImportKeyPairStatus {
        status: KeyPairPhase::Provisioned.as_str().to_string(),
        key_pair_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_public_key_is_rejected() {
        let spec = ImportKeyPairSpec {
            public_key: "   ".to_string(),
            credential_secret: "aws".to_string(),
            region: "us-east-1".to_string(),
            ..ImportKeyPairSpec::default()
        };
        assert_eq!(
            plan(KeyPairPhase::Unsubmitted, &spec),
            Err(ValidationError::EmptyPublicKey)
        );
    }

    #[test]
    fn test_provisioned_is_idle() {
        let spec = ImportKeyPairSpec {
            public_key: "ssh-ed25519 AAAA".to_string(),
            ..ImportKeyPairSpec::default()
        };
        assert_eq!(plan(KeyPairPhase::Provisioned, &spec), Ok(KeyPairStep::Idle));
        assert_eq!(plan(KeyPairPhase::Unsubmitted, &spec), Ok(KeyPairStep::Import));
    }

    #[test]
    fn test_imported_sets_terminal_status() {
        let status = imported("key-0abc".to_string());
        assert_eq!(status.phase(), Ok(KeyPairPhase::Provisioned));
        assert_eq!(status.key_pair_id, "key-0abc");
    }
}
