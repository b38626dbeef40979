use blake2::Blake2s256;
use blake2::digest::core_api::BlockSizeUser;
use blake2::digest::{Digest, Output};
use zeroize::{Zeroize, Zeroizing};

/// Hash output length (BLAKE2s = 32 bytes).
pub const HASH_LEN: usize = 32;
/// BLAKE2s block length, which is also the HMAC block length.
pub const BLOCK_LEN: usize = 64;

/// A zeroized 32-byte HMAC/HKDF output.
pub type Key = Zeroizing<[u8; HASH_LEN]>;

/// Number of HKDF output blocks to derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HkdfOutputs {
    Two,
    Three,
}

/// Compute BLAKE2s-256 over the concatenation of `parts`.
///
/// Each part is fed to the hasher in turn, so
/// `hash(&[a, b]) == hash(&[&[a, b].concat()])` without ever building the
/// concatenation.
pub fn hash(parts: &[&[u8]]) -> [u8; HASH_LEN] {
    let mut hasher = Blake2s256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&result);
    out
}

/// Compute HMAC-BLAKE2s per [RFC 2104](https://datatracker.ietf.org/doc/html/rfc2104).
///
/// Uses the standard HMAC construction, not BLAKE2's built-in keyed mode.
pub fn hmac(key: &[u8], data: &[u8]) -> Key {
    to_key(hmac_with::<Blake2s256>(key, &[data]))
}

/// RFC 2104 HMAC over any block-based digest, with `parts` fed sequentially.
///
/// Keys longer than the digest's block length are hashed down first; shorter
/// keys are zero-padded to the block length.
pub fn hmac_with<D>(key: &[u8], parts: &[&[u8]]) -> Output<D>
where
    D: Digest + BlockSizeUser,
{
    const IPAD: u8 = 0x36;
    const OPAD: u8 = 0x5c;

    let block_len = D::block_size();
    let mut block_key = Zeroizing::new(vec![0u8; block_len]);
    if key.len() > block_len {
        let mut digested = <D as Digest>::digest(key);
        block_key[..digested.len()].copy_from_slice(&digested);
        digested.as_mut_slice().zeroize();
    } else {
        block_key[..key.len()].copy_from_slice(key);
    }

    let ipad_key = Zeroizing::new(block_key.iter().map(|b| b ^ IPAD).collect::<Vec<u8>>());
    let opad_key = Zeroizing::new(block_key.iter().map(|b| b ^ OPAD).collect::<Vec<u8>>());

    let mut inner_hasher = <D as Digest>::new();
    Digest::update(&mut inner_hasher, ipad_key.as_slice());
    for part in parts {
        Digest::update(&mut inner_hasher, part);
    }
    let mut inner_hash = inner_hasher.finalize();

    let mut outer_hasher = <D as Digest>::new();
    Digest::update(&mut outer_hasher, opad_key.as_slice());
    Digest::update(&mut outer_hasher, inner_hash.as_slice());
    inner_hash.as_mut_slice().zeroize();

    outer_hasher.finalize()
}

/// HKDF-Extract-then-Expand per [RFC 5869](https://datatracker.ietf.org/doc/html/rfc5869),
/// producing two or three digest-sized blocks.
///
/// - `prk = HMAC(salt, ikm)`
/// - `T(1) = HMAC(prk, info || 0x01)`
/// - `T(n) = HMAC(prk, T(n-1) || info || n)`
pub fn hkdf_with<D>(
    salt: &[u8],
    ikm: &[u8],
    info: &[u8],
    outputs: HkdfOutputs,
) -> (Output<D>, Output<D>, Option<Output<D>>)
where
    D: Digest + BlockSizeUser,
{
    let mut prk = hmac_with::<D>(salt, &[ikm]);

    let output1 = hmac_with::<D>(&prk, &[info, [0x01u8].as_slice()]);
    let output2 = hmac_with::<D>(&prk, &[output1.as_slice(), info, [0x02u8].as_slice()]);
    let output3 = match outputs {
        HkdfOutputs::Two => None,
        HkdfOutputs::Three => Some(hmac_with::<D>(
            &prk,
            &[output2.as_slice(), info, [0x03u8].as_slice()],
        )),
    };

    prk.as_mut_slice().zeroize();
    (output1, output2, output3)
}

/// HKDF-BLAKE2s. In the handshake `info` is always empty.
pub fn hkdf(
    salt: &[u8],
    ikm: &[u8],
    info: &[u8],
    outputs: HkdfOutputs,
) -> (Key, Key, Option<Key>) {
    let (o1, o2, o3) = hkdf_with::<Blake2s256>(salt, ikm, info, outputs);
    (to_key(o1), to_key(o2), o3.map(to_key))
}

/// HKDF with 2 output blocks and empty `info`, per the Noise Protocol Framework Section 4.3.
///
/// Returns `(output1, output2)`.
pub fn hkdf2(chaining_key: &[u8; HASH_LEN], input_key_material: &[u8]) -> (Key, Key) {
    let (o1, o2, _) = hkdf(chaining_key, input_key_material, &[], HkdfOutputs::Two);
    (o1, o2)
}

fn to_key(mut output: Output<Blake2s256>) -> Key {
    let mut key = Zeroizing::new([0u8; HASH_LEN]);
    key.copy_from_slice(&output);
    output.as_mut_slice().zeroize();
    key
}
