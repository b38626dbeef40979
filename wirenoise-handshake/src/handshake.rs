use rand_core::{CryptoRngCore, OsRng};
use tracing::{debug, warn};

use crate::cipher_state::Sealed;
use crate::crypto::aead::Tag;
use crate::crypto::hash::HASH_LEN;
use crate::crypto::x25519::{self, DH_LEN};
use crate::error::Error;
use crate::keys::{KeyPair, PresharedKey, PrivateKey, PublicKey};
use crate::messages::{MESSAGE1_LEN, MESSAGE2_LEN, Message1, Message2};
use crate::symmetric_state::{PROTOCOL_NAME, SymmetricState};
use crate::timestamp::Timestamp;
use crate::transport::TransportState;

/// Prologue mixed into the handshake hash before any message.
///
/// Both sides must use the same value; it identifies this protocol build.
pub const PROLOGUE: &[u8] = b"wirenoise v1";

/// Which side of the handshake this instance plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Knows the responder's static key and sends message 1.
    Initiator,
    /// Learns the initiator's static key from message 1 and sends message 2.
    Responder,
}

/// Progress of a [`Handshake`].
///
/// Each role takes its transitions at most once, in order:
///
/// ```text
/// Initiator: Created -> Message1Sent     -> Message2Received
/// Responder: Created -> Message1Received -> Message2Sent
/// ```
///
/// Any failed step moves to `Failed`, from which nothing further is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Initialized with the prologue and responder static key; no message yet.
    Created,
    /// Initiator wrote message 1 and awaits message 2.
    Message1Sent,
    /// Responder read message 1; the initiator's identity is known.
    Message1Received,
    /// Responder wrote message 2. Ready to split.
    Message2Sent,
    /// Initiator read message 2. Ready to split.
    Message2Received,
    /// A step failed. The handshake must be discarded.
    Failed,
}

/// A Noise IKpsk2 handshake state machine.
///
/// Implements the fixed ciphersuite `Noise_IKpsk2_25519_ChaChaPoly_BLAKE2s`.
///
/// ## Pattern
///
/// ```text
/// IKpsk2:
///   <- s
///   ...
///   -> e, es, s, ss         (payload: TAI64N timestamp)
///   <- e, ee, se, psk       (payload: empty)
/// ```
///
/// Static keys are borrowed from the caller and never modified; the
/// ephemeral key and pre-shared key are owned and zeroized on drop.
///
/// Driving a handshake out of order (the wrong role, a repeated step, or any
/// use after a failure) is a programming error and panics.
pub struct Handshake<'k> {
    symmetric: SymmetricState,
    role: Role,
    phase: Phase,
    local: &'k KeyPair,
    remote_static: Option<PublicKey>,
    ephemeral: Option<PrivateKey>,
    remote_ephemeral: Option<[u8; DH_LEN]>,
    psk: PresharedKey,
}

impl<'k> Handshake<'k> {
    /// Create an initiator handshake.
    ///
    /// The initiator must know the responder's static public key beforehand.
    /// `psk` defaults to the all-zero key.
    pub fn new_initiator(
        local: &'k KeyPair,
        remote_static: PublicKey,
        psk: Option<PresharedKey>,
    ) -> Self {
        // IK pre-message: <- s (responder's static key is known)
        let symmetric = Self::initial_state(&remote_static);
        debug!(role = ?Role::Initiator, remote = ?remote_static, "handshake created");

        Self {
            symmetric,
            role: Role::Initiator,
            phase: Phase::Created,
            local,
            remote_static: Some(remote_static),
            ephemeral: None,
            remote_ephemeral: None,
            psk: psk.unwrap_or_default(),
        }
    }

    /// Create a responder handshake.
    ///
    /// The responder learns the initiator's identity from message 1; a
    /// per-peer `psk` can still be installed afterwards with
    /// [`set_preshared_key`](Self::set_preshared_key).
    pub fn new_responder(local: &'k KeyPair, psk: Option<PresharedKey>) -> Self {
        // IK pre-message: <- s (our own static key)
        let symmetric = Self::initial_state(&local.public);
        debug!(role = ?Role::Responder, local = ?local.public, "handshake created");

        Self {
            symmetric,
            role: Role::Responder,
            phase: Phase::Created,
            local,
            remote_static: None,
            ephemeral: None,
            remote_ephemeral: None,
            psk: psk.unwrap_or_default(),
        }
    }

    fn initial_state(responder_static: &PublicKey) -> SymmetricState {
        let mut symmetric = SymmetricState::initialize(PROTOCOL_NAME);
        symmetric.mix_hash(&[PROLOGUE]);
        symmetric.mix_hash(&[responder_static.as_bytes()]);
        symmetric
    }

    /// Which side this handshake plays.
    pub fn role(&self) -> Role {
        self.role
    }

    /// How far the handshake has progressed.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The peer's static public key.
    ///
    /// Always known to the initiator; known to the responder once message 1
    /// has been read successfully.
    pub fn remote_static(&self) -> Option<PublicKey> {
        self.remote_static
    }

    /// The current handshake hash. After the last message this is the
    /// channel binding value both sides agree on.
    pub fn handshake_hash(&self) -> &[u8; HASH_LEN] {
        self.symmetric.handshake_hash()
    }

    /// Replace the pre-shared key mixed into message 2.
    ///
    /// # Panics
    ///
    /// If message 2 has already been written or read, or the handshake failed.
    pub fn set_preshared_key(&mut self, psk: PresharedKey) {
        assert!(
            matches!(
                self.phase,
                Phase::Created | Phase::Message1Sent | Phase::Message1Received
            ),
            "set_preshared_key called in phase {:?}",
            self.phase
        );
        self.psk = psk;
    }

    /// Write message 1 with a fresh ephemeral key and the current time.
    ///
    /// # Panics
    ///
    /// Unless this is an initiator in [`Phase::Created`].
    pub fn write_message1(&mut self) -> Result<[u8; MESSAGE1_LEN], Error> {
        self.write_message1_with(&mut OsRng, Timestamp::now())
    }

    /// Write message 1 with a specific RNG and the current time.
    ///
    /// # Panics
    ///
    /// Unless this is an initiator in [`Phase::Created`].
    pub fn write_message1_with_rng(
        &mut self,
        rng: &mut impl CryptoRngCore,
    ) -> Result<[u8; MESSAGE1_LEN], Error> {
        self.write_message1_with(rng, Timestamp::now())
    }

    /// Write message 1 with a specific RNG and timestamp.
    ///
    /// # Panics
    ///
    /// Unless this is an initiator in [`Phase::Created`].
    pub fn write_message1_with(
        &mut self,
        rng: &mut impl CryptoRngCore,
        timestamp: Timestamp,
    ) -> Result<[u8; MESSAGE1_LEN], Error> {
        self.expect_state(Role::Initiator, Phase::Created, "write_message1");
        let result = self.write_msg1(rng, timestamp);
        self.advance(result, Phase::Message1Sent, MESSAGE1_LEN)
    }

    /// Read message 1 from an initiator.
    ///
    /// On success the initiator's static key is available from
    /// [`remote_static`](Self::remote_static), and its timestamp is returned
    /// for the caller's replay check.
    ///
    /// # Panics
    ///
    /// Unless this is a responder in [`Phase::Created`].
    pub fn read_message1(&mut self, message: &[u8]) -> Result<Timestamp, Error> {
        self.expect_state(Role::Responder, Phase::Created, "read_message1");
        let result = self.read_msg1(message);
        self.advance(result, Phase::Message1Received, message.len())
    }

    /// Write message 2 with a fresh ephemeral key.
    ///
    /// # Panics
    ///
    /// Unless this is a responder in [`Phase::Message1Received`].
    pub fn write_message2(&mut self) -> Result<[u8; MESSAGE2_LEN], Error> {
        self.write_message2_with_rng(&mut OsRng)
    }

    /// Write message 2 with a specific RNG.
    ///
    /// # Panics
    ///
    /// Unless this is a responder in [`Phase::Message1Received`].
    pub fn write_message2_with_rng(
        &mut self,
        rng: &mut impl CryptoRngCore,
    ) -> Result<[u8; MESSAGE2_LEN], Error> {
        self.expect_state(Role::Responder, Phase::Message1Received, "write_message2");
        let result = self.write_msg2(rng);
        self.advance(result, Phase::Message2Sent, MESSAGE2_LEN)
    }

    /// Read message 2 from the responder.
    ///
    /// # Panics
    ///
    /// Unless this is an initiator in [`Phase::Message1Sent`].
    pub fn read_message2(&mut self, message: &[u8]) -> Result<(), Error> {
        self.expect_state(Role::Initiator, Phase::Message1Sent, "read_message2");
        let result = self.read_msg2(message);
        self.advance(result, Phase::Message2Received, message.len())
    }

    /// Convert the completed handshake into a transport state.
    ///
    /// Initiator gets (c1=send, c2=recv), responder gets (c1=recv, c2=send).
    ///
    /// # Panics
    ///
    /// Unless both messages have been processed.
    pub fn split(self) -> TransportState {
        assert!(
            matches!(self.phase, Phase::Message2Sent | Phase::Message2Received),
            "split called by {:?} in phase {:?}",
            self.role,
            self.phase
        );
        let handshake_hash = *self.symmetric.handshake_hash();
        let (c1, c2) = self.symmetric.split();
        debug!(role = ?self.role, "handshake split into transport keys");
        TransportState::new(handshake_hash, c1, c2, self.role == Role::Initiator)
    }

    fn expect_state(&self, role: Role, phase: Phase, operation: &str) {
        assert!(
            self.role == role && self.phase == phase,
            "{operation} called by {:?} in phase {:?}",
            self.role,
            self.phase
        );
    }

    /// Record the outcome of a step. Any error abandons the handshake.
    fn advance<T>(&mut self, result: Result<T, Error>, next: Phase, len: usize) -> Result<T, Error> {
        match result {
            Ok(value) => {
                debug!(role = ?self.role, phase = ?next, len, "handshake advanced");
                self.phase = next;
                Ok(value)
            }
            Err(err) => {
                if err == Error::AuthenticationFailure {
                    warn!(role = ?self.role, phase = ?self.phase, len, "handshake message failed authentication");
                } else {
                    debug!(role = ?self.role, phase = ?self.phase, len, error = %err, "handshake step failed");
                }
                self.phase = Phase::Failed;
                self.ephemeral = None;
                Err(err)
            }
        }
    }

    fn ephemeral(&self) -> &PrivateKey {
        match &self.ephemeral {
            Some(e) => e,
            None => panic!("no ephemeral key in phase {:?}", self.phase),
        }
    }

    fn remote_static_bytes(&self) -> [u8; DH_LEN] {
        match &self.remote_static {
            Some(rs) => *rs.as_bytes(),
            None => panic!("no remote static key in phase {:?}", self.phase),
        }
    }

    // ===== Message 1: initiator writes -> e, es, s, ss, {timestamp} =====

    fn write_msg1(
        &mut self,
        rng: &mut impl CryptoRngCore,
        timestamp: Timestamp,
    ) -> Result<[u8; MESSAGE1_LEN], Error> {
        let rs = self.remote_static_bytes();

        // -> e
        let (e_secret, e_pub) = x25519::generate_keypair(rng)?;
        let ephemeral = PrivateKey::from_dalek(e_secret);
        self.symmetric.mix_hash(&[&e_pub]);

        // -> es: DH(e, rs)
        let shared_es = x25519::dh(ephemeral.inner(), &rs)?;
        self.symmetric.mix_key(shared_es.as_bytes());

        // -> s
        let sealed_static = self.symmetric.encrypt_and_hash(self.local.public.as_bytes())?;
        let (encrypted_static, static_tag) = fixed_fields(sealed_static)?;

        // -> ss: DH(s, rs)
        let shared_ss = x25519::dh(self.local.private.inner(), &rs)?;
        self.symmetric.mix_key(shared_ss.as_bytes());

        let sealed_timestamp = self.symmetric.encrypt_and_hash(&timestamp.encode())?;
        let (encrypted_timestamp, timestamp_tag) = fixed_fields(sealed_timestamp)?;

        self.ephemeral = Some(ephemeral);
        Ok(Message1 {
            ephemeral: e_pub,
            encrypted_static,
            static_tag,
            encrypted_timestamp,
            timestamp_tag,
        }
        .to_bytes())
    }

    // ===== Message 1: responder reads -> e, es, s, ss, {timestamp} =====

    fn read_msg1(&mut self, message: &[u8]) -> Result<Timestamp, Error> {
        let msg = Message1::parse(message)?;

        // -> e
        self.symmetric.mix_hash(&[&msg.ephemeral]);

        // -> es: DH(s, re)
        let shared_es = x25519::dh(self.local.private.inner(), &msg.ephemeral)?;
        self.symmetric.mix_key(shared_es.as_bytes());

        // -> s
        let static_bytes = self
            .symmetric
            .decrypt_and_hash(&msg.encrypted_static, &msg.static_tag)?;
        let rs: [u8; DH_LEN] = static_bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::BadMessage)?;

        // -> ss: DH(s, rs)
        let shared_ss = x25519::dh(self.local.private.inner(), &rs)?;
        self.symmetric.mix_key(shared_ss.as_bytes());

        let timestamp_bytes = self
            .symmetric
            .decrypt_and_hash(&msg.encrypted_timestamp, &msg.timestamp_tag)?;
        let timestamp = Timestamp::decode(&timestamp_bytes)?;

        let remote_static = PublicKey::from_bytes(rs);
        debug!(remote = ?remote_static, "initiator identified");
        self.remote_static = Some(remote_static);
        self.remote_ephemeral = Some(msg.ephemeral);
        Ok(timestamp)
    }

    // ===== Message 2: responder writes <- e, ee, se, psk, {} =====

    fn write_msg2(&mut self, rng: &mut impl CryptoRngCore) -> Result<[u8; MESSAGE2_LEN], Error> {
        let rs = self.remote_static_bytes();
        let re = match self.remote_ephemeral {
            Some(re) => re,
            None => panic!("no remote ephemeral key in phase {:?}", self.phase),
        };

        // <- e
        let (e_secret, e_pub) = x25519::generate_keypair(rng)?;
        let ephemeral = PrivateKey::from_dalek(e_secret);
        self.symmetric.mix_hash(&[&e_pub]);

        // <- ee: DH(e, re)
        let shared_ee = x25519::dh(ephemeral.inner(), &re)?;
        self.symmetric.mix_key(shared_ee.as_bytes());

        // <- se: DH(e, rs)
        let shared_se = x25519::dh(ephemeral.inner(), &rs)?;
        self.symmetric.mix_key(shared_se.as_bytes());

        // <- psk
        self.symmetric.mix_key(self.psk.as_bytes());
        let sealed = self.symmetric.encrypt_and_hash(&[])?;
        let (_, empty_tag) = fixed_fields::<0>(sealed)?;

        self.ephemeral = Some(ephemeral);
        Ok(Message2 {
            ephemeral: e_pub,
            empty_tag,
        }
        .to_bytes())
    }

    // ===== Message 2: initiator reads <- e, ee, se, psk, {} =====

    fn read_msg2(&mut self, message: &[u8]) -> Result<(), Error> {
        let msg = Message2::parse(message)?;

        // <- e
        self.symmetric.mix_hash(&[&msg.ephemeral]);

        // <- ee: DH(e, re)
        let shared_ee = x25519::dh(self.ephemeral().inner(), &msg.ephemeral)?;
        self.symmetric.mix_key(shared_ee.as_bytes());

        // <- se: DH(s, re)
        let shared_se = x25519::dh(self.local.private.inner(), &msg.ephemeral)?;
        self.symmetric.mix_key(shared_se.as_bytes());

        // <- psk
        self.symmetric.mix_key(self.psk.as_bytes());
        self.symmetric.decrypt_and_hash(&[], &msg.empty_tag)?;

        self.remote_ephemeral = Some(msg.ephemeral);
        Ok(())
    }
}

impl core::fmt::Debug for Handshake<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Handshake")
            .field("role", &self.role)
            .field("phase", &self.phase)
            .field("local", &self.local.public)
            .field("remote_static", &self.remote_static)
            .finish_non_exhaustive()
    }
}

/// Split keyed `encrypt_and_hash` output into fixed-width wire fields.
fn fixed_fields<const N: usize>(sealed: Sealed) -> Result<([u8; N], Tag), Error> {
    let ciphertext: [u8; N] = sealed
        .ciphertext
        .as_slice()
        .try_into()
        .map_err(|_| Error::BadMessage)?;
    let tag = sealed.tag.ok_or(Error::MissingKey)?;
    Ok((ciphertext, tag))
}
