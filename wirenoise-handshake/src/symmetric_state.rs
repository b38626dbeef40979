use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::cipher_state::{CipherState, Sealed};
use crate::crypto::aead::{AEAD_KEY_LEN, Tag};
use crate::crypto::hash::{self, HASH_LEN};
use crate::error::Error;

/// The Noise protocol name, which seeds the chaining key and handshake hash.
pub const PROTOCOL_NAME: &str = "Noise_IKpsk2_25519_ChaChaPoly_BLAKE2s";

/// Noise SymmetricState: manages the chaining key and handshake hash.
///
/// Per the Noise Protocol Framework Section 5.2. The cipher is absent until the first
/// [`mix_key`](Self::mix_key); until then encryption is refused with
/// [`Error::MissingKey`].
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricState {
    cipher: Option<CipherState>,
    /// Chaining key (ck), mixed with DH outputs via HKDF.
    ck: [u8; HASH_LEN],
    /// Handshake hash (h), accumulates all handshake data.
    h: [u8; HASH_LEN],
}

impl SymmetricState {
    /// Initialize the SymmetricState with a protocol name.
    ///
    /// Per the Noise Protocol Framework Section 5.2:
    /// - If protocol_name.len() <= HASH_LEN, pad with zeros
    /// - Otherwise, hash the protocol name
    ///
    /// The chaining key starts equal to the hash.
    pub fn initialize(protocol_name: &str) -> Self {
        let name_bytes = protocol_name.as_bytes();
        let h = if name_bytes.len() <= HASH_LEN {
            let mut h = [0u8; HASH_LEN];
            h[..name_bytes.len()].copy_from_slice(name_bytes);
            h
        } else {
            hash::hash(&[name_bytes])
        };

        Self {
            cipher: None,
            ck: h,
            h,
        }
    }

    /// Mix a key into the chaining key via HKDF.
    ///
    /// Per the Noise Protocol Framework: (ck, temp_k) = HKDF(ck, input_key_material, 2)
    /// Then the cipher is replaced by a fresh one keyed with temp_k.
    pub fn mix_key(&mut self, input_key_material: &[u8]) {
        let (new_ck, temp_k) = hash::hkdf2(&self.ck, input_key_material);
        self.ck.copy_from_slice(&*new_ck);

        let mut key = Zeroizing::new([0u8; AEAD_KEY_LEN]);
        key.copy_from_slice(&*temp_k);
        self.cipher = Some(CipherState::new(Some(*key)));
    }

    /// Mix data into the handshake hash.
    ///
    /// Per the Noise Protocol Framework: h = HASH(h || data), with `parts` hashed in order.
    pub fn mix_hash(&mut self, parts: &[&[u8]]) {
        let next = {
            let mut input: Vec<&[u8]> = Vec::with_capacity(parts.len() + 1);
            input.push(&self.h);
            input.extend_from_slice(parts);
            hash::hash(&input)
        };
        self.h = next;
    }

    /// Encrypt plaintext with `h` as associated data, then mix
    /// `ciphertext || tag` into the hash.
    pub fn encrypt_and_hash(&mut self, plaintext: &[u8]) -> Result<Sealed, Error> {
        let cipher = self.cipher.as_mut().ok_or(Error::MissingKey)?;
        let sealed = cipher.encrypt(plaintext, &self.h)?;
        match &sealed.tag {
            Some(tag) => self.mix_hash(&[&sealed.ciphertext, tag]),
            None => self.mix_hash(&[&sealed.ciphertext]),
        }
        Ok(sealed)
    }

    /// Decrypt `ciphertext` and its `tag` with `h` as associated data.
    ///
    /// The received `ciphertext || tag` is mixed into the hash whether or not
    /// decryption succeeds, so the transcript matches the sender's; a failed
    /// tag check is still returned as an error.
    pub fn decrypt_and_hash(
        &mut self,
        ciphertext: &[u8],
        tag: &Tag,
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        let cipher = self.cipher.as_mut().ok_or(Error::MissingKey)?;
        let result = cipher.decrypt(ciphertext, Some(tag), &self.h);
        self.mix_hash(&[ciphertext, tag]);
        result
    }

    /// Split into two CipherStates for transport mode.
    ///
    /// Per the Noise Protocol Framework Section 5.2:
    /// (temp_k1, temp_k2) = HKDF(ck, "", 2)
    pub fn split(self) -> (CipherState, CipherState) {
        let (temp_k1, temp_k2) = hash::hkdf2(&self.ck, &[]);
        (CipherState::new(Some(*temp_k1)), CipherState::new(Some(*temp_k2)))
    }

    /// Get the current handshake hash.
    pub fn handshake_hash(&self) -> &[u8; HASH_LEN] {
        &self.h
    }

    /// Whether a key has been mixed in.
    pub fn has_key(&self) -> bool {
        self.cipher.is_some()
    }
}
