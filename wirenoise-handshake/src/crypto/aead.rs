use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{AeadInPlace, KeyInit},
};
use zeroize::Zeroizing;

use crate::error::Error;

/// AEAD key length in bytes.
pub const AEAD_KEY_LEN: usize = 32;
/// AEAD tag length in bytes.
pub const AEAD_TAG_LEN: usize = 16;
/// AEAD nonce length in bytes.
pub const AEAD_NONCE_LEN: usize = 12;

/// A detached Poly1305 authentication tag.
pub type Tag = [u8; AEAD_TAG_LEN];

/// The fixed 4-byte nonce prefix used by the protocol.
const ZERO_PREFIX: [u8; 4] = [0u8; 4];

/// Encrypt `plaintext` under `key` and the 64-bit counter `nonce`.
///
/// Returns the ciphertext (same length as `plaintext`) and the detached tag.
/// Poly1305 authenticates `ad`, then the ciphertext, then the
/// little-endian lengths of both, per RFC 7539 Section 2.8.
pub fn seal(
    key: &[u8; AEAD_KEY_LEN],
    nonce: u64,
    ad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Tag), Error> {
    seal_with_prefix(key, ZERO_PREFIX, nonce, ad, plaintext)
}

/// [`seal`] with an explicit 4-byte nonce prefix in place of the zero prefix.
///
/// Only test vectors need a non-zero prefix.
pub fn seal_with_prefix(
    key: &[u8; AEAD_KEY_LEN],
    prefix: [u8; 4],
    nonce: u64,
    ad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Tag), Error> {
    let cipher = ChaCha20Poly1305::new(key.into());
    let mut buffer = plaintext.to_vec();

    let tag = cipher
        .encrypt_in_place_detached(&Nonce::from(make_nonce(prefix, nonce)), ad, &mut buffer)
        .map_err(|_| Error::BadMessage)?;

    let mut out_tag = [0u8; AEAD_TAG_LEN];
    out_tag.copy_from_slice(&tag);
    Ok((buffer, out_tag))
}

/// Decrypt `ciphertext` and verify `tag`.
///
/// The tag comparison is constant-time; any mismatch yields
/// [`Error::AuthenticationFailure`] and no plaintext.
pub fn open(
    key: &[u8; AEAD_KEY_LEN],
    nonce: u64,
    ad: &[u8],
    ciphertext: &[u8],
    tag: &Tag,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    open_with_prefix(key, ZERO_PREFIX, nonce, ad, ciphertext, tag)
}

/// [`open`] with an explicit 4-byte nonce prefix.
pub fn open_with_prefix(
    key: &[u8; AEAD_KEY_LEN],
    prefix: [u8; 4],
    nonce: u64,
    ad: &[u8],
    ciphertext: &[u8],
    tag: &Tag,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let cipher = ChaCha20Poly1305::new(key.into());
    let mut buffer = Zeroizing::new(ciphertext.to_vec());

    cipher
        .decrypt_in_place_detached(
            &Nonce::from(make_nonce(prefix, nonce)),
            ad,
            buffer.as_mut_slice(),
            chacha20poly1305::Tag::from_slice(tag),
        )
        .map_err(|_| Error::AuthenticationFailure)?;

    Ok(buffer)
}

/// Build the 12-byte nonce: the 4-byte prefix followed by the 64-bit
/// little-endian counter, per the Noise Protocol Framework Section 5.1 for ChaChaPoly.
fn make_nonce(prefix: [u8; 4], n: u64) -> [u8; AEAD_NONCE_LEN] {
    let mut nonce = [0u8; AEAD_NONCE_LEN];
    nonce[..4].copy_from_slice(&prefix);
    nonce[4..].copy_from_slice(&n.to_le_bytes());
    nonce
}
