//! Identifier and secret generation.
//!
//! Identifiers are opaque, non-empty strings. The empty string is reserved to
//! mean "missing", so every generator must return a non-empty value.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use uuid::Uuid;

/// Number of random bytes behind email verification and invitation tokens.
pub const SECRET_BYTE_LENGTH: usize = 32;

/// Produces fresh row identifiers.
#[cfg_attr(test, mockall::automock)]
pub trait IdGenerator: Send + Sync {
    /// Return a new identifier that has never been handed out before.
    fn new_id(&self) -> String;
}

/// Random UUIDv4 identifiers rendered in hyphenated form.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Produces opaque secrets such as verification and invitation tokens.
#[cfg_attr(test, mockall::automock)]
pub trait SecretGenerator: Send + Sync {
    /// Return `byte_length` random bytes encoded as URL-safe base64.
    fn generate_base64_secret(&self, byte_length: usize) -> String;
}

/// Secrets drawn from the thread-local CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSecretGenerator;

impl SecretGenerator for RandomSecretGenerator {
    fn generate_base64_secret(&self, byte_length: usize) -> String {
        let mut bytes = vec![0_u8; byte_length];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn uuid_ids_are_unique_and_non_empty() {
        let ids = UuidIdGenerator;
        let first = ids.new_id();
        let second = ids.new_id();

        assert!(!first.is_empty());
        assert_ne!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[rstest]
    fn secrets_encode_requested_byte_count() {
        let secret = RandomSecretGenerator.generate_base64_secret(SECRET_BYTE_LENGTH);
        let decoded = URL_SAFE_NO_PAD
            .decode(secret.as_bytes())
            .expect("secret is valid base64");

        assert_eq!(decoded.len(), SECRET_BYTE_LENGTH);
    }

    #[rstest]
    fn secrets_differ_between_calls() {
        let secrets = RandomSecretGenerator;

        assert_ne!(
            secrets.generate_base64_secret(SECRET_BYTE_LENGTH),
            secrets.generate_base64_secret(SECRET_BYTE_LENGTH)
        );
    }
}
