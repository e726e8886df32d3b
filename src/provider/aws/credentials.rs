//! Static AWS keys read from a credential secret.

use crate::provider::CredentialError;
use crate::store::SecretPayload;
use aws_credential_types::Credentials;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const ACCESS_KEY_FIELD: &str = "aws_access_key";
pub const SECRET_KEY_FIELD: &str = "aws_secret_key";

/// Provider name reported by the SDK for these credentials
const PROVIDER_NAME: &str = "ec2-operator-secret";

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct StaticKeys {
    access_key: String,
    secret_key: String,
}

impl StaticKeys {
    /// # Errors
    ///
    /// Returns [`CredentialError`] when either field is absent, empty or not UTF-8.
    pub fn from_payload(payload: &SecretPayload) -> Result<Self, CredentialError> {
        Ok(Self {
            access_key: field(payload, ACCESS_KEY_FIELD)?,
            secret_key: field(payload, SECRET_KEY_FIELD)?,
        })
    }

    #[must_use]
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    #[must_use]
    pub fn to_sdk_credentials(&self) -> Credentials {
        Credentials::new(
            self.access_key.clone(),
            self.secret_key.clone(),
            None,
            None,
            PROVIDER_NAME,
        )
    }
}

fn field(payload: &SecretPayload, name: &'static str) -> Result<String, CredentialError> {
    let raw = payload.get(name).ok_or(CredentialError::MissingField(name))?;
    let value = std::str::from_utf8(raw)
        .map_err(|_utf8| CredentialError::InvalidField(name))?
        .trim();
    if value.is_empty() {
        return Err(CredentialError::InvalidField(name));
    }
    Ok(value.to_string())
}

impl fmt::Debug for StaticKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeys")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_both_fields() {
        let payload: SecretPayload = [
            (ACCESS_KEY_FIELD, "AKIAEXAMPLE"),
            (SECRET_KEY_FIELD, "wJalrXUtnFEMI\n"),
        ]
        .into_iter()
        .collect();
        let keys = StaticKeys::from_payload(&payload).unwrap();
        assert_eq!(keys.access_key(), "AKIAEXAMPLE");
        assert_eq!(keys.to_sdk_credentials().secret_access_key(), "wJalrXUtnFEMI");
    }

    #[test]
    fn test_missing_secret_key() {
        let payload: SecretPayload = [(ACCESS_KEY_FIELD, "AKIAEXAMPLE")].into_iter().collect();
        assert_eq!(
            StaticKeys::from_payload(&payload).unwrap_err(),
            CredentialError::MissingField(SECRET_KEY_FIELD)
        );
    }

    #[test]
    fn test_empty_and_non_utf8_fields_are_invalid() {
        let payload: SecretPayload = [(ACCESS_KEY_FIELD, "  "), (SECRET_KEY_FIELD, "x")]
            .into_iter()
            .collect();
        assert_eq!(
            StaticKeys::from_payload(&payload).unwrap_err(),
            CredentialError::InvalidField(ACCESS_KEY_FIELD)
        );

        let payload: SecretPayload = [
            (ACCESS_KEY_FIELD, vec![b'A']),
            (SECRET_KEY_FIELD, vec![0xff, 0xfe]),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            StaticKeys::from_payload(&payload).unwrap_err(),
            CredentialError::InvalidField(SECRET_KEY_FIELD)
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let payload: SecretPayload = [(ACCESS_KEY_FIELD, "AKIA"), (SECRET_KEY_FIELD, "topsecret")]
            .into_iter()
            .collect();
        let keys = StaticKeys::from_payload(&payload).unwrap();
        assert!(!format!("{keys:?}").contains("topsecret"));
    }
}
