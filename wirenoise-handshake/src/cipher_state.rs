use tracing::trace;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::aead::{self, AEAD_KEY_LEN, AEAD_TAG_LEN, Tag};
use crate::error::Error;

/// Output of [`CipherState::encrypt`]: ciphertext plus detached tag.
///
/// `tag` is `None` only when the cipher had no key and passed the
/// plaintext through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub tag: Option<Tag>,
}

impl Sealed {
    /// Total length on the wire (ciphertext plus tag, if any).
    pub fn len(&self) -> usize {
        self.ciphertext.len() + self.tag.map_or(0, |t| t.len())
    }

    /// Whether there is nothing to put on the wire.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `ciphertext || tag` to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.ciphertext);
        if let Some(tag) = &self.tag {
            out.extend_from_slice(tag);
        }
    }
}

/// Noise CipherState: manages an AEAD key and a nonce counter.
///
/// Per the Noise Protocol Framework Section 5.1. The nonce advances by one after every
/// encryption and after every decryption attempt while a key is set, so a
/// nonce is never reused under one key.
///
/// Not safe for concurrent use; callers sharing a transport cipher across
/// threads must serialize access.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CipherState {
    /// The AEAD key, or `None` if uninitialized.
    key: Option<[u8; AEAD_KEY_LEN]>,
    /// Nonce counter, incremented after each encryption/decryption.
    #[zeroize(skip)]
    nonce: u64,
}

impl CipherState {
    /// Create a CipherState, optionally keyed, with the nonce at zero.
    pub fn new(key: Option<[u8; AEAD_KEY_LEN]>) -> Self {
        Self { key, nonce: 0 }
    }

    /// Whether this CipherState has a key set.
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// The nonce the next encrypt or decrypt will use.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The overhead added by encryption (0 if no key, AEAD_TAG_LEN otherwise).
    pub fn overhead(&self) -> usize {
        if self.has_key() { AEAD_TAG_LEN } else { 0 }
    }

    /// Encrypt plaintext with associated data.
    ///
    /// If no key is set, returns the plaintext unchanged with no tag.
    pub fn encrypt(&mut self, plaintext: &[u8], ad: &[u8]) -> Result<Sealed, Error> {
        let Some(key) = &self.key else {
            return Ok(Sealed {
                ciphertext: plaintext.to_vec(),
                tag: None,
            });
        };
        if self.nonce == u64::MAX {
            // Nonce 2^64-1 is reserved (Noise Protocol Framework §5.1)
            return Err(Error::NonceExhausted);
        }

        trace!(nonce = self.nonce, len = plaintext.len(), "encrypt");
        let (ciphertext, tag) = aead::seal(key, self.nonce, ad, plaintext)?;
        self.nonce += 1;
        Ok(Sealed {
            ciphertext,
            tag: Some(tag),
        })
    }

    /// Decrypt ciphertext and verify its detached tag.
    ///
    /// If no key is set, returns the ciphertext unchanged; a tag must not be
    /// supplied in that case. With a key, the nonce advances whether or not
    /// the tag verifies, keeping both sides' counters in step.
    pub fn decrypt(
        &mut self,
        ciphertext: &[u8],
        tag: Option<&Tag>,
        ad: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        let Some(key) = &self.key else {
            return match tag {
                None => Ok(Zeroizing::new(ciphertext.to_vec())),
                Some(_) => Err(Error::BadMessage),
            };
        };
        let tag = tag.ok_or(Error::BadMessage)?;
        if self.nonce == u64::MAX {
            return Err(Error::NonceExhausted);
        }

        trace!(nonce = self.nonce, len = ciphertext.len(), "decrypt");
        let result = aead::open(key, self.nonce, ad, ciphertext, tag);
        self.nonce += 1;
        result
    }

    /// Replace the key with `key` and reset the nonce to zero.
    ///
    /// The handshake never calls this; it exists for transport-phase rekeying.
    pub fn rekey(&mut self, key: [u8; AEAD_KEY_LEN]) {
        if let Some(old) = self.key.as_mut() {
            old.zeroize();
        }
        self.key = Some(key);
        self.nonce = 0;
    }
}

impl core::fmt::Debug for CipherState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CipherState")
            .field("has_key", &self.has_key())
            .field("nonce", &self.nonce)
            .finish()
    }
}
