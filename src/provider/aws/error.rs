//! EC2 error code classification
//!
//! Uses the SDK's `.code()` metadata rather than matching on message text.

use crate::provider::ProviderError;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

/// Codes meaning the target resource is already gone
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidInstanceID.NotFound",
    "InvalidKeyPair.NotFound",
    "InvalidKeyPairId.NotFound",
];

const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

#[must_use]
pub fn is_not_found_code(code: &str) -> bool {
    NOT_FOUND_CODES.contains(&code)
}

#[must_use]
pub fn is_throttling_code(code: &str) -> bool {
    THROTTLING_CODES.contains(&code)
}

/// Wrap an SDK failure, keeping the service error code when there is one.
pub(crate) fn from_sdk<E, R>(operation: &'static str, err: &SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(err).to_string(), str::to_string);
    ProviderError::new(operation, code, message)
}
