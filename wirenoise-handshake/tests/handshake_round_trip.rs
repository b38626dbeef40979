//! End-to-end tests of the IKpsk2 handshake through the public API.

use rand::SeedableRng;
use rand::rngs::StdRng;
use wirenoise_handshake::crypto::{aead, hash, x25519};
use wirenoise_handshake::{
    AEAD_TAG_LEN, Error, Handshake, KeyPair, MESSAGE1_LEN, MESSAGE2_LEN, PROLOGUE, PROTOCOL_NAME,
    Phase, PresharedKey, Timestamp, TransportState,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Drive a full handshake and return (initiator_transport, responder_transport).
fn handshake_pair(
    initiator_kp: &KeyPair,
    responder_kp: &KeyPair,
    psk: Option<[u8; 32]>,
) -> (TransportState, TransportState) {
    let mut initiator = Handshake::new_initiator(
        initiator_kp,
        responder_kp.public,
        psk.map(PresharedKey::from_bytes),
    );
    let mut responder = Handshake::new_responder(responder_kp, psk.map(PresharedKey::from_bytes));

    let msg1 = initiator.write_message1().unwrap();
    assert_eq!(initiator.phase(), Phase::Message1Sent);
    responder.read_message1(&msg1).unwrap();
    assert_eq!(responder.phase(), Phase::Message1Received);

    let msg2 = responder.write_message2().unwrap();
    initiator.read_message2(&msg2).unwrap();

    (initiator.split(), responder.split())
}

fn send(from: &mut TransportState, to: &mut TransportState, payload: &[u8]) -> Vec<u8> {
    let sealed = from.encrypt(payload).unwrap();
    assert_eq!(sealed.ciphertext.len(), payload.len());
    let tag = sealed.tag.unwrap();
    to.decrypt(&sealed.ciphertext, &tag).unwrap().to_vec()
}

// ===========================================================================
// 1. round_trip -- both sides derive matching transport keys
// ===========================================================================

#[test]
fn round_trip() {
    let i_kp = KeyPair::generate().unwrap();
    let r_kp = KeyPair::generate().unwrap();

    let (mut i_transport, mut r_transport) = handshake_pair(&i_kp, &r_kp, None);

    assert_eq!(send(&mut i_transport, &mut r_transport, b"ping"), b"ping");
    assert_eq!(send(&mut r_transport, &mut i_transport, b"pong"), b"pong");
}

// ===========================================================================
// 2. split_keys_cross -- initiator send == responder receive and vice versa
// ===========================================================================

#[test]
fn split_keys_cross() {
    let i_kp = KeyPair::generate().unwrap();
    let r_kp = KeyPair::generate().unwrap();

    let (i_transport, r_transport) = handshake_pair(&i_kp, &r_kp, None);
    let (mut i_send, mut i_recv) = i_transport.into_ciphers();
    let (mut r_send, mut r_recv) = r_transport.into_ciphers();

    let sealed = i_send.encrypt(b"c1", &[]).unwrap();
    let pt = r_recv
        .decrypt(&sealed.ciphertext, sealed.tag.as_ref(), &[])
        .unwrap();
    assert_eq!(pt.as_slice(), b"c1");

    let sealed = r_send.encrypt(b"c2", &[]).unwrap();
    let pt = i_recv
        .decrypt(&sealed.ciphertext, sealed.tag.as_ref(), &[])
        .unwrap();
    assert_eq!(pt.as_slice(), b"c2");
}

// ===========================================================================
// 3. transport_bidirectional -- many records in both directions
// ===========================================================================

#[test]
fn transport_bidirectional() {
    let i_kp = KeyPair::generate().unwrap();
    let r_kp = KeyPair::generate().unwrap();

    let (mut i_transport, mut r_transport) = handshake_pair(&i_kp, &r_kp, None);

    for i in 0..20 {
        let msg_i = format!("init-to-resp-{}", i);
        assert_eq!(
            send(&mut i_transport, &mut r_transport, msg_i.as_bytes()),
            msg_i.as_bytes()
        );

        let msg_r = format!("resp-to-init-{}", i);
        assert_eq!(
            send(&mut r_transport, &mut i_transport, msg_r.as_bytes()),
            msg_r.as_bytes()
        );
    }
    assert_eq!(i_transport.send_nonce(), 20);
    assert_eq!(r_transport.recv_nonce(), 20);

    // Empty payload transport record
    assert!(send(&mut i_transport, &mut r_transport, &[]).is_empty());
    assert_eq!(i_transport.overhead(), AEAD_TAG_LEN);
}

// ===========================================================================
// 4. transport_rekey -- rekey each direction independently
// ===========================================================================

#[test]
fn transport_rekey() {
    let i_kp = KeyPair::generate().unwrap();
    let r_kp = KeyPair::generate().unwrap();

    let (mut i_transport, mut r_transport) = handshake_pair(&i_kp, &r_kp, None);
    send(&mut i_transport, &mut r_transport, b"before rekey");

    // Rekey initiator's send and responder's recv (they must match)
    i_transport.rekey_send([0xa1; 32]);
    r_transport.rekey_recv([0xa1; 32]);
    assert_eq!(i_transport.send_nonce(), 0);
    assert_eq!(
        send(&mut i_transport, &mut r_transport, b"after rekey"),
        b"after rekey"
    );

    // The other direction is untouched
    assert_eq!(
        send(&mut r_transport, &mut i_transport, b"still old key"),
        b"still old key"
    );

    // Mismatched rekey breaks decryption
    i_transport.rekey_send([0xb2; 32]);
    let sealed = i_transport.encrypt(b"this should fail").unwrap();
    assert_eq!(
        r_transport
            .decrypt(&sealed.ciphertext, &sealed.tag.unwrap())
            .unwrap_err(),
        Error::AuthenticationFailure
    );
}

// ===========================================================================
// 5. failed_record_advances_nonce -- receive counter moves on rejection
// ===========================================================================

#[test]
fn failed_record_advances_nonce() {
    let i_kp = KeyPair::generate().unwrap();
    let r_kp = KeyPair::generate().unwrap();

    let (mut i_transport, mut r_transport) = handshake_pair(&i_kp, &r_kp, None);

    let sealed = i_transport.encrypt(b"tampered").unwrap();
    let mut ciphertext = sealed.ciphertext.clone();
    ciphertext[0] ^= 0x80;
    assert_eq!(
        r_transport
            .decrypt(&ciphertext, &sealed.tag.unwrap())
            .unwrap_err(),
        Error::AuthenticationFailure
    );
    assert_eq!(r_transport.recv_nonce(), 1);

    // Next record lines up with the advanced counter
    assert_eq!(send(&mut i_transport, &mut r_transport, b"next"), b"next");
}

// ===========================================================================
// 6. handshake_hash_matches -- both sides bind the same transcript
// ===========================================================================

#[test]
fn handshake_hash_matches() {
    let i_kp = KeyPair::generate().unwrap();
    let r_kp = KeyPair::generate().unwrap();

    let mut initiator = Handshake::new_initiator(&i_kp, r_kp.public, None);
    let mut responder = Handshake::new_responder(&r_kp, None);

    let msg1 = initiator.write_message1().unwrap();
    responder.read_message1(&msg1).unwrap();
    let msg2 = responder.write_message2().unwrap();
    initiator.read_message2(&msg2).unwrap();

    let i_hash = *initiator.handshake_hash();
    assert_eq!(i_hash, *responder.handshake_hash());

    let i_transport = initiator.split();
    let r_transport = responder.split();
    assert_eq!(i_transport.handshake_hash(), r_transport.handshake_hash());
    assert_eq!(*i_transport.handshake_hash(), i_hash);
}

// ===========================================================================
// 7. timestamp_and_identity -- responder learns who and when
// ===========================================================================

#[test]
fn timestamp_and_identity() {
    let i_kp = KeyPair::generate().unwrap();
    let r_kp = KeyPair::generate().unwrap();
    let mut rng = StdRng::seed_from_u64(7);

    let earlier = Timestamp::from_unix(1_700_000_000, 0);
    let later = Timestamp::from_unix(1_700_000_000, 1);

    let mut first = Handshake::new_initiator(&i_kp, r_kp.public, None);
    let mut responder = Handshake::new_responder(&r_kp, None);
    let msg1 = first.write_message1_with(&mut rng, earlier).unwrap();
    let seen = responder.read_message1(&msg1).unwrap();
    assert_eq!(seen, earlier);
    assert_eq!(responder.remote_static(), Some(i_kp.public));

    let mut second = Handshake::new_initiator(&i_kp, r_kp.public, None);
    let mut responder = Handshake::new_responder(&r_kp, None);
    let msg1 = second.write_message1_with(&mut rng, later).unwrap();
    let replayed_or_fresh = responder.read_message1(&msg1).unwrap();
    assert!(replayed_or_fresh.is_after(&seen));
}

// ===========================================================================
// 8. preshared_key -- matching keys succeed, mismatched keys fail
// ===========================================================================

#[test]
fn preshared_key() {
    let i_kp = KeyPair::generate().unwrap();
    let r_kp = KeyPair::generate().unwrap();

    let (mut i_transport, mut r_transport) = handshake_pair(&i_kp, &r_kp, Some([0x5a; 32]));
    assert_eq!(send(&mut i_transport, &mut r_transport, b"psk"), b"psk");

    let mut initiator =
        Handshake::new_initiator(&i_kp, r_kp.public, Some(PresharedKey::from_bytes([1; 32])));
    let mut responder = Handshake::new_responder(&r_kp, None);

    let msg1 = initiator.write_message1().unwrap();
    responder.read_message1(&msg1).unwrap();
    let msg2 = responder.write_message2().unwrap();
    assert_eq!(
        initiator.read_message2(&msg2).unwrap_err(),
        Error::AuthenticationFailure
    );
    assert_eq!(initiator.phase(), Phase::Failed);
}

// ===========================================================================
// 9. zero_psk_is_default -- an explicit all-zero key equals no key
// ===========================================================================

#[test]
fn zero_psk_is_default() {
    let i_kp = KeyPair::generate().unwrap();
    let r_kp = KeyPair::generate().unwrap();

    let mut initiator =
        Handshake::new_initiator(&i_kp, r_kp.public, Some(PresharedKey::from_bytes([0; 32])));
    let mut responder = Handshake::new_responder(&r_kp, None);

    let msg1 = initiator.write_message1().unwrap();
    responder.read_message1(&msg1).unwrap();
    let msg2 = responder.write_message2().unwrap();
    initiator.read_message2(&msg2).unwrap();
}

// ===========================================================================
// 10. wrong_server_key_fails -- initiator uses wrong remote public key
// ===========================================================================

#[test]
fn wrong_server_key_fails() {
    let i_kp = KeyPair::generate().unwrap();
    let r_kp = KeyPair::generate().unwrap();
    let wrong_kp = KeyPair::generate().unwrap();

    let mut initiator = Handshake::new_initiator(&i_kp, wrong_kp.public, None);
    let mut responder = Handshake::new_responder(&r_kp, None);

    let msg1 = initiator.write_message1().unwrap();
    assert_eq!(
        responder.read_message1(&msg1).unwrap_err(),
        Error::AuthenticationFailure
    );
    assert_eq!(responder.phase(), Phase::Failed);
    assert_eq!(responder.remote_static(), None);
}

// ===========================================================================
// 11. tampered_fields_fail -- every message 1 field is authenticated
// ===========================================================================

#[test]
fn tampered_fields_fail() {
    let i_kp = KeyPair::generate().unwrap();
    let r_kp = KeyPair::generate().unwrap();

    let mut initiator = Handshake::new_initiator(&i_kp, r_kp.public, None);
    let msg1 = initiator.write_message1().unwrap();

    for offset in [0, 31, 32, 63, 64, 79, 80, 91, 92, MESSAGE1_LEN - 1] {
        let mut tampered = msg1;
        tampered[offset] ^= 0x04;
        let mut responder = Handshake::new_responder(&r_kp, None);
        let err = responder.read_message1(&tampered).unwrap_err();
        // A flipped ephemeral bit can land on a low-order point
        assert!(
            matches!(err, Error::AuthenticationFailure | Error::BadKey),
            "offset {offset}: {err:?}"
        );
        assert_eq!(responder.phase(), Phase::Failed);
    }

    // The untouched message is still accepted
    let mut responder = Handshake::new_responder(&r_kp, None);
    responder.read_message1(&msg1).unwrap();
}

// ===========================================================================
// 12. truncated_message_fails -- wrong-length messages are rejected
// ===========================================================================

#[test]
fn truncated_message_fails() {
    let i_kp = KeyPair::generate().unwrap();
    let r_kp = KeyPair::generate().unwrap();

    // Truncated msg1
    {
        let mut initiator = Handshake::new_initiator(&i_kp, r_kp.public, None);
        let mut responder = Handshake::new_responder(&r_kp, None);
        let msg1 = initiator.write_message1().unwrap();
        assert_eq!(
            responder.read_message1(&msg1[..MESSAGE1_LEN / 2]).unwrap_err(),
            Error::BadMessage
        );
    }

    // Truncated msg2
    {
        let mut initiator = Handshake::new_initiator(&i_kp, r_kp.public, None);
        let mut responder = Handshake::new_responder(&r_kp, None);
        let msg1 = initiator.write_message1().unwrap();
        responder.read_message1(&msg1).unwrap();
        let msg2 = responder.write_message2().unwrap();
        assert_eq!(
            initiator.read_message2(&msg2[..MESSAGE2_LEN - 1]).unwrap_err(),
            Error::BadMessage
        );
    }

    // Oversized msg2
    {
        let mut initiator = Handshake::new_initiator(&i_kp, r_kp.public, None);
        let mut responder = Handshake::new_responder(&r_kp, None);
        let msg1 = initiator.write_message1().unwrap();
        responder.read_message1(&msg1).unwrap();
        let msg2 = responder.write_message2().unwrap();
        let mut padded = msg2.to_vec();
        padded.push(0);
        assert_eq!(
            initiator.read_message2(&padded).unwrap_err(),
            Error::BadMessage
        );
    }
}

// ===========================================================================
// 13. out_of_order_use_panics -- ordering violations are programming errors
// ===========================================================================

#[test]
#[should_panic(expected = "read_message2 called by Initiator in phase Created")]
fn out_of_order_use_panics() {
    let i_kp = KeyPair::generate().unwrap();
    let r_kp = KeyPair::generate().unwrap();

    let mut initiator = Handshake::new_initiator(&i_kp, r_kp.public, None);
    let _ = initiator.read_message2(&[0u8; MESSAGE2_LEN]);
}

#[test]
#[should_panic(expected = "read_message1 called by Initiator")]
fn initiator_cannot_read_message1() {
    let i_kp = KeyPair::generate().unwrap();
    let r_kp = KeyPair::generate().unwrap();

    let mut initiator = Handshake::new_initiator(&i_kp, r_kp.public, None);
    let _ = initiator.read_message1(&[0u8; MESSAGE1_LEN]);
}

// ===========================================================================
// 14. transcript_known_answer -- fixed inputs reproduce every derived value
// ===========================================================================

/// Recompute the exchange from the primitives and compare the wire bytes,
/// the final handshake hash and the transport keys.
#[test]
fn transcript_known_answer() {
    const INITIATOR_SEED: u64 = 0x1111;
    const RESPONDER_SEED: u64 = 0x2222;
    let psk = [0x33u8; 32];
    let timestamp = Timestamp::from_unix(1_700_000_000, 42);

    let i_kp = KeyPair::from_private_bytes([0x11; 32]);
    let r_kp = KeyPair::from_private_bytes([0x22; 32]);

    // Engine side
    let mut initiator =
        Handshake::new_initiator(&i_kp, r_kp.public, Some(PresharedKey::from_bytes(psk)));
    let mut responder = Handshake::new_responder(&r_kp, Some(PresharedKey::from_bytes(psk)));

    let msg1 = initiator
        .write_message1_with(&mut StdRng::seed_from_u64(INITIATOR_SEED), timestamp)
        .unwrap();
    assert_eq!(responder.read_message1(&msg1).unwrap(), timestamp);
    let msg2 = responder
        .write_message2_with_rng(&mut StdRng::seed_from_u64(RESPONDER_SEED))
        .unwrap();
    initiator.read_message2(&msg2).unwrap();

    // Reference side, one token at a time
    let (s_i, s_i_pub) = x25519::keypair_from_seed([0x11; 32]);
    let (_, s_r_pub) = x25519::keypair_from_seed([0x22; 32]);
    assert_eq!(&s_i_pub, i_kp.public.as_bytes());
    assert_eq!(&s_r_pub, r_kp.public.as_bytes());
    let (e_i, e_i_pub) =
        x25519::generate_keypair(&mut StdRng::seed_from_u64(INITIATOR_SEED)).unwrap();
    let (e_r, e_r_pub) =
        x25519::generate_keypair(&mut StdRng::seed_from_u64(RESPONDER_SEED)).unwrap();

    let mut h = hash::hash(&[PROTOCOL_NAME.as_bytes()]);
    let mut ck = h;
    h = hash::hash(&[&h, PROLOGUE]);
    h = hash::hash(&[&h, &s_r_pub]);

    // -> e, es, s, ss, {timestamp}
    h = hash::hash(&[&h, &e_i_pub]);
    let (next, k) = hash::hkdf2(&ck, x25519::dh(&e_i, &s_r_pub).unwrap().as_bytes());
    ck = *next;
    let (static_ct, static_tag) = aead::seal(&k, 0, &h, &s_i_pub).unwrap();
    h = hash::hash(&[&h, &static_ct, &static_tag]);
    let (next, k) = hash::hkdf2(&ck, x25519::dh(&s_i, &s_r_pub).unwrap().as_bytes());
    ck = *next;
    let (ts_ct, ts_tag) = aead::seal(&k, 0, &h, &timestamp.encode()).unwrap();
    h = hash::hash(&[&h, &ts_ct, &ts_tag]);

    assert_eq!(&msg1[..32], &e_i_pub);
    assert_eq!(&msg1[32..64], static_ct.as_slice());
    assert_eq!(&msg1[64..80], &static_tag);
    assert_eq!(&msg1[80..92], ts_ct.as_slice());
    assert_eq!(&msg1[92..108], &ts_tag);

    // <- e, ee, se, psk, {}
    h = hash::hash(&[&h, &e_r_pub]);
    ck = *hash::hkdf2(&ck, x25519::dh(&e_r, &e_i_pub).unwrap().as_bytes()).0;
    ck = *hash::hkdf2(&ck, x25519::dh(&e_r, &s_i_pub).unwrap().as_bytes()).0;
    let (next, k) = hash::hkdf2(&ck, &psk);
    ck = *next;
    let (empty_ct, empty_tag) = aead::seal(&k, 0, &h, &[]).unwrap();
    assert!(empty_ct.is_empty());
    h = hash::hash(&[&h, &empty_tag]);

    assert_eq!(&msg2[..32], &e_r_pub);
    assert_eq!(&msg2[32..48], &empty_tag);
    assert_eq!(initiator.handshake_hash(), &h);
    assert_eq!(responder.handshake_hash(), &h);

    // Split: initiator sends under k1, responder under k2
    let (k1, k2) = hash::hkdf2(&ck, &[]);
    let mut i_transport = initiator.split();
    let mut r_transport = responder.split();
    assert_eq!(i_transport.handshake_hash(), &h);

    let sealed = i_transport.encrypt(b"first record").unwrap();
    let (expected_ct, expected_tag) = aead::seal(&k1, 0, &[], b"first record").unwrap();
    assert_eq!(sealed.ciphertext, expected_ct);
    assert_eq!(sealed.tag, Some(expected_tag));

    let sealed = r_transport.encrypt(b"reply").unwrap();
    let (expected_ct, expected_tag) = aead::seal(&k2, 0, &[], b"reply").unwrap();
    assert_eq!(sealed.ciphertext, expected_ct);
    assert_eq!(sealed.tag, Some(expected_tag));
}
