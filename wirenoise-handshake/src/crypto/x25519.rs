use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;
use tracing::error;
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret as DalekStaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::Error;

/// DH output length in bytes (X25519 = 32).
pub const DH_LEN: usize = 32;

/// A shared secret resulting from a Diffie-Hellman operation.
///
/// Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; 32]);

impl core::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

impl SharedSecret {
    /// Access the raw 32-byte shared secret.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Clamp raw scalar bytes for X25519: clear the low 3 bits, clear bit 255,
/// set bit 254 (RFC 7748 Section 5).
pub fn clamp(bytes: &mut [u8; 32]) {
    bytes[0] &= 248;
    bytes[31] &= 127;
    bytes[31] |= 64;
}

/// Generate a new random X25519 keypair (usable as ephemeral or static).
///
/// Returns (secret, public_key_bytes). The secret is clamped before use.
/// Fails with [`Error::RandomSource`] if `rng` cannot produce entropy.
pub fn generate_keypair(
    rng: &mut impl CryptoRngCore,
) -> Result<(DalekStaticSecret, [u8; DH_LEN]), Error> {
    let mut seed = Zeroizing::new([0u8; 32]);
    rng.try_fill_bytes(seed.as_mut_slice()).map_err(|e| {
        error!(error = %e, "secure random source failed during key generation");
        Error::RandomSource
    })?;
    Ok(keypair_from_seed(*seed))
}

/// Derive a keypair from fixed seed bytes. The seed is clamped first.
pub fn keypair_from_seed(seed: [u8; 32]) -> (DalekStaticSecret, [u8; DH_LEN]) {
    let mut scalar = Zeroizing::new(seed);
    clamp(&mut scalar);
    let secret = DalekStaticSecret::from(*scalar);
    let public = DalekPublicKey::from(&secret);
    (secret, public.to_bytes())
}

/// Perform DH with a static/ephemeral secret and a remote public key.
///
/// Returns the 32-byte shared secret, or `Error::BadKey` if the
/// result is the all-zeros point (low-order input).
///
/// This check is required by RFC 7748 Section 6.1 and recommended
/// by the Noise Protocol Framework Section 12.1.
pub fn dh(local: &DalekStaticSecret, remote: &[u8; DH_LEN]) -> Result<SharedSecret, Error> {
    let shared = local.diffie_hellman(&DalekPublicKey::from(*remote));
    validate_shared_secret(shared.as_bytes())
}

/// Reject the all-zeros shared secret, which indicates a low-order public key.
fn validate_shared_secret(bytes: &[u8; 32]) -> Result<SharedSecret, Error> {
    let is_zero = bytes.ct_eq(&[0u8; 32]);
    if bool::from(is_zero) {
        Err(Error::BadKey)
    } else {
        Ok(SharedSecret(*bytes))
    }
}
