//! Fixed wire layouts of the two handshake messages.
//!
//! ```text
//! message 1 (108 bytes)
//!   [0..32)    ephemeral public key
//!   [32..64)   encrypted static public key
//!   [64..80)   tag over the static key
//!   [80..92)   encrypted TAI64N timestamp
//!   [92..108)  tag over the timestamp
//!
//! message 2 (48 bytes)
//!   [0..32)    ephemeral public key
//!   [32..48)   tag over the empty payload
//! ```

use crate::crypto::aead::{AEAD_TAG_LEN, Tag};
use crate::crypto::x25519::DH_LEN;
use crate::error::Error;
use crate::timestamp::TIMESTAMP_LEN;

/// Length of handshake message 1.
pub const MESSAGE1_LEN: usize = DH_LEN + (DH_LEN + AEAD_TAG_LEN) + (TIMESTAMP_LEN + AEAD_TAG_LEN);
/// Length of handshake message 2.
pub const MESSAGE2_LEN: usize = DH_LEN + AEAD_TAG_LEN;

/// Handshake message 1 (initiator to responder), split into its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message1 {
    pub ephemeral: [u8; DH_LEN],
    pub encrypted_static: [u8; DH_LEN],
    pub static_tag: Tag,
    pub encrypted_timestamp: [u8; TIMESTAMP_LEN],
    pub timestamp_tag: Tag,
}

impl Message1 {
    /// Parse an exactly [`MESSAGE1_LEN`]-byte message.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != MESSAGE1_LEN {
            return Err(Error::BadMessage);
        }
        let mut reader = Reader::new(bytes);
        Ok(Self {
            ephemeral: reader.take(),
            encrypted_static: reader.take(),
            static_tag: reader.take(),
            encrypted_timestamp: reader.take(),
            timestamp_tag: reader.take(),
        })
    }

    /// Serialize into the fixed wire layout.
    pub fn to_bytes(&self) -> [u8; MESSAGE1_LEN] {
        let mut out = [0u8; MESSAGE1_LEN];
        let mut writer = Writer::new(&mut out);
        writer.put(&self.ephemeral);
        writer.put(&self.encrypted_static);
        writer.put(&self.static_tag);
        writer.put(&self.encrypted_timestamp);
        writer.put(&self.timestamp_tag);
        out
    }
}

/// Handshake message 2 (responder to initiator), split into its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message2 {
    pub ephemeral: [u8; DH_LEN],
    pub empty_tag: Tag,
}

impl Message2 {
    /// Parse an exactly [`MESSAGE2_LEN`]-byte message.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != MESSAGE2_LEN {
            return Err(Error::BadMessage);
        }
        let mut reader = Reader::new(bytes);
        Ok(Self {
            ephemeral: reader.take(),
            empty_tag: reader.take(),
        })
    }

    /// Serialize into the fixed wire layout.
    pub fn to_bytes(&self) -> [u8; MESSAGE2_LEN] {
        let mut out = [0u8; MESSAGE2_LEN];
        let mut writer = Writer::new(&mut out);
        writer.put(&self.ephemeral);
        writer.put(&self.empty_tag);
        out
    }
}

/// Sequential fixed-width field reader. Callers check the total length first.
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut field = [0u8; N];
        field.copy_from_slice(&self.bytes[self.offset..self.offset + N]);
        self.offset += N;
        field
    }
}

struct Writer<'a> {
    out: &'a mut [u8],
    offset: usize,
}

impl<'a> Writer<'a> {
    fn new(out: &'a mut [u8]) -> Self {
        Self { out, offset: 0 }
    }

    fn put(&mut self, field: &[u8]) {
        self.out[self.offset..self.offset + field.len()].copy_from_slice(field);
        self.offset += field.len();
    }
}
