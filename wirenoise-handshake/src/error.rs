use thiserror::Error;

/// Errors that can occur during the handshake or transport phase.
///
/// Out-of-order use of a [`Handshake`](crate::Handshake) is a programming
/// error and panics instead of producing one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// AEAD tag verification failed.
    #[error("authentication failed")]
    AuthenticationFailure,
    /// Encryption or decryption was attempted before any key was mixed in.
    #[error("no key has been mixed into the symmetric state")]
    MissingKey,
    /// A public key produced an all-zero shared secret (low-order point).
    #[error("invalid public key")]
    BadKey,
    /// The message is malformed, truncated, or missing its tag.
    #[error("malformed message")]
    BadMessage,
    /// A TAI64N timestamp carries an out-of-range nanosecond field.
    #[error("malformed timestamp")]
    BadTimestamp,
    /// The nonce counter has been exhausted (2^64 - 1 messages).
    #[error("nonce counter exhausted")]
    NonceExhausted,
    /// The secure random source could not provide entropy.
    #[error("secure random source failed")]
    RandomSource,
}
