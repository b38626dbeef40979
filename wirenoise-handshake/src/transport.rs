use zeroize::{Zeroize, Zeroizing};

use crate::cipher_state::{CipherState, Sealed};
use crate::crypto::aead::{AEAD_KEY_LEN, AEAD_TAG_LEN, Tag};
use crate::crypto::hash::HASH_LEN;
use crate::error::Error;

/// Post-handshake transport encryption state.
///
/// Contains two `CipherState`s: one for sending, one for receiving.
/// The assignment depends on which side (initiator/responder) this is:
/// - Initiator: c1 = send, c2 = recv
/// - Responder: c1 = recv, c2 = send
///
/// Records carry no associated data. Framing the ciphertext, tag and
/// counter on the wire is left to the session layer.
pub struct TransportState {
    send: CipherState,
    recv: CipherState,
    handshake_hash: [u8; HASH_LEN],
}

impl Drop for TransportState {
    fn drop(&mut self) {
        self.handshake_hash.zeroize();
    }
}

impl TransportState {
    pub(crate) fn new(
        handshake_hash: [u8; HASH_LEN],
        c1: CipherState,
        c2: CipherState,
        is_initiator: bool,
    ) -> Self {
        if is_initiator {
            Self {
                send: c1,
                recv: c2,
                handshake_hash,
            }
        } else {
            Self {
                send: c2,
                recv: c1,
                handshake_hash,
            }
        }
    }

    /// Encrypt a payload for sending to the peer.
    ///
    /// The ciphertext is as long as `payload`; the tag is always present.
    pub fn encrypt(&mut self, payload: &[u8]) -> Result<Sealed, Error> {
        self.send.encrypt(payload, &[])
    }

    /// Decrypt a record received from the peer.
    ///
    /// The receive nonce advances even when the tag does not verify, so a
    /// dropped forgery desynchronizes the counter; session layers that need
    /// "advance on success only" track the counter themselves.
    pub fn decrypt(&mut self, ciphertext: &[u8], tag: &Tag) -> Result<Zeroizing<Vec<u8>>, Error> {
        self.recv.decrypt(ciphertext, Some(tag), &[])
    }

    /// The nonce the next [`encrypt`](Self::encrypt) will use.
    pub fn send_nonce(&self) -> u64 {
        self.send.nonce()
    }

    /// The nonce the next [`decrypt`](Self::decrypt) will use.
    pub fn recv_nonce(&self) -> u64 {
        self.recv.nonce()
    }

    /// The final handshake hash, used as a channel binding value.
    ///
    /// Both sides will have the same value after a successful handshake.
    pub fn handshake_hash(&self) -> &[u8; HASH_LEN] {
        &self.handshake_hash
    }

    /// The AEAD tag overhead per transport record.
    pub fn overhead(&self) -> usize {
        AEAD_TAG_LEN
    }

    /// Replace the sending key and reset its nonce.
    pub fn rekey_send(&mut self, key: [u8; AEAD_KEY_LEN]) {
        self.send.rekey(key);
    }

    /// Replace the receiving key and reset its nonce.
    pub fn rekey_recv(&mut self, key: [u8; AEAD_KEY_LEN]) {
        self.recv.rekey(key);
    }

    /// Hand the two ciphers to the caller as `(send, receive)`.
    pub fn into_ciphers(mut self) -> (CipherState, CipherState) {
        let send = core::mem::replace(&mut self.send, CipherState::new(None));
        let recv = core::mem::replace(&mut self.recv, CipherState::new(None));
        (send, recv)
    }
}

impl core::fmt::Debug for TransportState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransportState")
            .field("send", &self.send)
            .field("recv", &self.recv)
            .finish_non_exhaustive()
    }
}
