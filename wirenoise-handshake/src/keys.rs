use rand_core::{CryptoRngCore, OsRng};
use tracing::error;
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret as DalekStaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::x25519;
use crate::error::Error;

/// An X25519 private key.
///
/// The scalar is clamped when the key is created, so [`to_bytes`](Self::to_bytes)
/// always returns clamped bytes. Zeroized from memory when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(DalekStaticSecret);

impl PrivateKey {
    /// The length of a private key in bytes.
    pub const LEN: usize = 32;

    /// Create from raw 32-byte secret key material, clamping it.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        let (secret, _) = x25519::keypair_from_seed(bytes);
        Self(secret)
    }

    pub(crate) fn from_dalek(secret: DalekStaticSecret) -> Self {
        Self(secret)
    }

    /// Export the raw (clamped) 32-byte secret key material.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// The public key matching this private key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(DalekPublicKey::from(&self.0).to_bytes())
    }

    pub(crate) fn inner(&self) -> &DalekStaticSecret {
        &self.0
    }
}

impl core::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

/// An X25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// The length of a public key in bytes.
    pub const LEN: usize = 32;

    /// Create from raw 32-byte public key.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Access the raw bytes of this public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PublicKey({:02x?})", &self.0[..4])
    }
}

/// A keypair consisting of a private key and its corresponding public key.
///
/// Static keypairs outlive any single handshake; a
/// [`Handshake`](crate::Handshake) only borrows one.
#[derive(Clone)]
pub struct KeyPair {
    pub private: PrivateKey,
    pub public: PublicKey,
}

impl KeyPair {
    /// Generate a new random keypair from the operating system's secure RNG.
    pub fn generate() -> Result<Self, Error> {
        Self::generate_with_rng(&mut OsRng)
    }

    /// Generate a new random keypair using the provided RNG.
    pub fn generate_with_rng(rng: &mut impl CryptoRngCore) -> Result<Self, Error> {
        let (secret, public) = x25519::generate_keypair(rng)?;
        Ok(Self {
            private: PrivateKey::from_dalek(secret),
            public: PublicKey(public),
        })
    }

    /// Create a keypair from an existing private key.
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    /// Create a keypair from raw 32-byte secret key material.
    ///
    /// The bytes are clamped and the public key derived automatically.
    pub fn from_private_bytes(bytes: [u8; 32]) -> Self {
        Self::from_private(PrivateKey::from_bytes(bytes))
    }
}

impl core::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// A 32-byte symmetric pre-shared key mixed into message 2.
///
/// The all-zero key is the "no PSK" value.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct PresharedKey([u8; 32]);

impl PresharedKey {
    /// The length of a pre-shared key in bytes.
    pub const LEN: usize = 32;

    /// Create from raw 32-byte key material.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a random pre-shared key.
    pub fn generate_with_rng(rng: &mut impl CryptoRngCore) -> Result<Self, Error> {
        let mut psk = Self::default();
        rng.try_fill_bytes(&mut psk.0).map_err(|e| {
            error!(error = %e, "secure random source failed during pre-shared key generation");
            Error::RandomSource
        })?;
        Ok(psk)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl core::fmt::Debug for PresharedKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PresharedKey([REDACTED])")
    }
}
