#![deny(unsafe_code)]

//! # wirenoise-handshake
//!
//! A pure, sans-IO implementation of the WireGuard-style Noise IKpsk2
//! handshake with a fixed ciphersuite:
//! `Noise_IKpsk2_25519_ChaChaPoly_BLAKE2s`.
//!
//! The initiator sends a 108-byte message 1 carrying its encrypted static
//! key and a TAI64N timestamp; the responder answers with a 48-byte
//! message 2. Both sides then [`split`](Handshake::split) into a
//! [`TransportState`] holding independent send and receive ciphers.
//!
//! ```
//! use wirenoise_handshake::{Handshake, KeyPair};
//!
//! let client = KeyPair::generate()?;
//! let server = KeyPair::generate()?;
//!
//! let mut initiator = Handshake::new_initiator(&client, server.public, None);
//! let mut responder = Handshake::new_responder(&server, None);
//!
//! let msg1 = initiator.write_message1()?;
//! let _timestamp = responder.read_message1(&msg1)?;
//! let msg2 = responder.write_message2()?;
//! initiator.read_message2(&msg2)?;
//!
//! let mut client_transport = initiator.split();
//! let mut server_transport = responder.split();
//!
//! let record = client_transport.encrypt(b"ping")?;
//! let tag = record.tag.expect("transport records are tagged");
//! let plaintext = server_transport.decrypt(&record.ciphertext, &tag)?;
//! assert_eq!(plaintext.as_slice(), b"ping");
//! # Ok::<(), wirenoise_handshake::Error>(())
//! ```
//!
//! ## Security Properties
//!
//! - X25519 low-order point rejection
//! - All key material zeroized on drop
//! - Constant-time tag and shared-secret comparisons
//! - Exact-length message parsing, no panics on network input
//! - Fixed ciphersuite (no algorithm negotiation)

pub mod crypto;
pub mod error;
pub mod keys;
pub mod messages;
pub mod timestamp;

mod cipher_state;
mod handshake;
mod symmetric_state;
mod transport;

// Re-export the primary public API
pub use cipher_state::{CipherState, Sealed};
pub use crypto::aead::AEAD_TAG_LEN;
pub use error::Error;
pub use handshake::{Handshake, PROLOGUE, Phase, Role};
pub use keys::{KeyPair, PresharedKey, PrivateKey, PublicKey};
pub use messages::{MESSAGE1_LEN, MESSAGE2_LEN};
pub use symmetric_state::{PROTOCOL_NAME, SymmetricState};
pub use timestamp::{TIMESTAMP_LEN, Timestamp};
pub use transport::TransportState;
