//! Cryptographic primitives for the Noise IKpsk2 handshake.
//!
//! - [`aead`]: ChaCha20-Poly1305 with detached tags
//! - [`hash`]: BLAKE2s hashing, HMAC, and HKDF
//! - [`x25519`]: X25519 Diffie-Hellman with low-order point rejection

pub mod aead;
pub mod hash;
pub mod x25519;
