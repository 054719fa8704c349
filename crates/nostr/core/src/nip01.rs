//! NIP-01: Basic protocol flow description.
//!
//! This module implements the core Nostr event structure and operations:
//! - Event structure (id, pubkey, created_at, kind, tags, content, sig)
//! - Event id computation over the canonical serialization
//! - Event signing with BIP-340 Schnorr signatures
//! - Event verification

use crate::canonical::canonical_payload;
use crate::trust::PublishableEvent;
use bitcoin::hashes::{Hash, sha256};
use bitcoin::key::Secp256k1;
use bitcoin::secp256k1::{Message, SecretKey, XOnlyPublicKey, schnorr};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during NIP-01 operations.
#[derive(Debug, Error)]
pub enum Nip01Error {
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// A locally signed event failed to verify after a wire round-trip.
    #[error("self-check failed for event {id}: {reason}")]
    SelfCheckFailed { id: String, reason: String },
}

/// A signed Nostr event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// 32-bytes lowercase hex-encoded sha256 of the serialized event data
    pub id: String,
    /// 32-bytes lowercase hex-encoded public key of the event creator
    pub pubkey: String,
    /// Unix timestamp in seconds
    pub created_at: i64,
    /// Event kind (integer between 0 and 65535)
    pub kind: u16,
    /// Array of arrays of strings (tags)
    pub tags: Vec<Vec<String>>,
    /// Arbitrary string content
    pub content: String,
    /// 64-bytes lowercase hex signature
    pub sig: String,
}

impl Event {
    /// The unsigned fields of this event, as hashed for its id.
    pub fn unsigned(&self) -> UnsignedEvent {
        UnsignedEvent {
            pubkey: self.pubkey.clone(),
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags.clone(),
            content: self.content.clone(),
        }
    }

    /// First value of the first tag named `name`.
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.first().map(String::as_str) == Some(name))
            .and_then(|t| t.get(1))
            .map(String::as_str)
    }
}

/// An unsigned event (before signing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedEvent {
    /// 32-bytes lowercase hex-encoded public key of the event creator
    pub pubkey: String,
    /// Unix timestamp in seconds
    pub created_at: i64,
    /// Event kind
    pub kind: u16,
    /// Array of arrays of strings (tags)
    pub tags: Vec<Vec<String>>,
    /// Arbitrary string content
    pub content: String,
}

/// A template for creating events (without pubkey, which comes from the signing key).
///
/// # Examples
///
/// ```
/// use nostr::nip01::{EventTemplate, Keypair, finalize_event};
///
/// let keys = Keypair::generate();
/// let template = EventTemplate {
///     created_at: 1700000000,
///     kind: 1,
///     tags: vec![vec!["t".to_string(), "nostr".to_string()]],
///     content: "Hello Nostr!".to_string(),
/// };
///
/// let event = finalize_event(&template, &keys).unwrap();
/// assert_eq!(event.as_event().pubkey, keys.public_key_hex());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTemplate {
    /// Unix timestamp in seconds
    pub created_at: i64,
    /// Event kind
    pub kind: u16,
    /// Array of arrays of strings (tags)
    pub tags: Vec<Vec<String>>,
    /// Arbitrary string content
    pub content: String,
}

/// A secp256k1 signing key with its x-only public key.
///
/// The secret never appears in `Debug` output.
#[derive(Clone)]
pub struct Keypair {
    inner: bitcoin::secp256k1::Keypair,
    public_key: [u8; 32],
}

impl Keypair {
    /// Build a keypair from 32 raw secret bytes.
    pub fn from_secret_bytes(secret_key: &[u8; 32]) -> Result<Self, Nip01Error> {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(secret_key)
            .map_err(|e| Nip01Error::InvalidSecretKey(e.to_string()))?;
        let inner = bitcoin::secp256k1::Keypair::from_secret_key(&secp, &sk);
        let (xonly, _parity) = inner.x_only_public_key();
        Ok(Self {
            inner,
            public_key: xonly.serialize(),
        })
    }

    /// Build a keypair from a 64-char hex secret. Surrounding whitespace is ignored.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, Nip01Error> {
        let bytes = decode_hex_array::<32>(secret_hex.trim(), "secret key")?;
        Self::from_secret_bytes(&bytes)
    }

    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        loop {
            let sk = generate_secret_key();
            // Out-of-range scalars are astronomically rare; draw again.
            if let Ok(keys) = Self::from_secret_bytes(&sk) {
                return keys;
            }
        }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.public_key
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key_hex())
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Generate a random 32-byte secret key.
pub fn generate_secret_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    rand::rng().fill_bytes(&mut key);
    key
}

/// Get the public key (x-only, 32 bytes) from a secret key.
pub fn get_public_key(secret_key: &[u8; 32]) -> Result<[u8; 32], Nip01Error> {
    Ok(Keypair::from_secret_bytes(secret_key)?.public_key())
}

/// Get the public key as a hex string from a secret key.
pub fn get_public_key_hex(secret_key: &[u8; 32]) -> Result<String, Nip01Error> {
    Ok(hex::encode(get_public_key(secret_key)?))
}

/// Serialize an unsigned event for hashing.
///
/// Format: `[0,pubkey,created_at,kind,tags,content]`, see [`crate::canonical`].
pub fn serialize_event(event: &UnsignedEvent) -> Result<String, Nip01Error> {
    if !validate_unsigned_event(event) {
        return Err(Nip01Error::InvalidEvent(
            "can't serialize event with wrong or missing properties".to_string(),
        ));
    }

    Ok(canonical_payload(
        &event.pubkey,
        event.created_at,
        event.kind,
        &event.tags,
        &event.content,
    ))
}

/// SHA-256 of the canonical serialization.
pub fn compute_event_id(event: &UnsignedEvent) -> Result<[u8; 32], Nip01Error> {
    let serialized = serialize_event(event)?;
    Ok(sha256::Hash::hash(serialized.as_bytes()).to_byte_array())
}

/// Get the event hash (id) from an unsigned event, as lowercase hex.
pub fn get_event_hash(event: &UnsignedEvent) -> Result<String, Nip01Error> {
    Ok(hex::encode(compute_event_id(event)?))
}

/// Validate an unsigned event structure.
pub fn validate_unsigned_event(event: &UnsignedEvent) -> bool {
    is_lower_hex(&event.pubkey, 64)
}

/// Validate a signed event structure (not including signature verification).
pub fn validate_event(event: &Event) -> bool {
    is_lower_hex(&event.id, 64) && is_lower_hex(&event.pubkey, 64) && is_lower_hex(&event.sig, 128)
}

/// BIP-340 signature over the raw 32 id bytes.
///
/// Signs without auxiliary randomness so the same key and id always produce
/// the same signature.
pub fn sign_event_id(keys: &Keypair, id: &[u8; 32]) -> Result<[u8; 64], Nip01Error> {
    let secp = Secp256k1::signing_only();
    let message = Message::from_digest(*id);
    let sig = secp.sign_schnorr_no_aux_rand(&message, &keys.inner);
    Ok(sig.serialize())
}

/// Verify a BIP-340 signature given hex pubkey, id and signature.
///
/// Malformed hex is an error; a well-formed signature that does not verify is `Ok(false)`.
pub fn verify_signature(pubkey_hex: &str, id_hex: &str, sig_hex: &str) -> Result<bool, Nip01Error> {
    let id = decode_hex_array::<32>(id_hex, "id")?;
    let sig_bytes = decode_hex_array::<64>(sig_hex, "sig")?;
    let pubkey_bytes = decode_hex_array::<32>(pubkey_hex, "pubkey")?;

    let sig = schnorr::Signature::from_slice(&sig_bytes)
        .map_err(|e| Nip01Error::InvalidSignature(e.to_string()))?;
    let pubkey = match XOnlyPublicKey::from_slice(&pubkey_bytes) {
        Ok(pk) => pk,
        // Not a point on the curve: nothing can verify against it.
        Err(_) => return Ok(false),
    };

    let secp = Secp256k1::verification_only();
    let message = Message::from_digest(id);
    Ok(secp.verify_schnorr(&sig, &message, &pubkey).is_ok())
}

/// Sign an event template, producing an event that passed its self-check.
///
/// The event's id is computed, signed, then the event is encoded to wire
/// JSON, decoded again and verified from scratch. Failing that check means
/// the serializer disagrees with itself and the event must not be sent.
pub fn finalize_event(
    template: &EventTemplate,
    keys: &Keypair,
) -> Result<PublishableEvent, Nip01Error> {
    let unsigned = UnsignedEvent {
        pubkey: keys.public_key_hex(),
        created_at: template.created_at,
        kind: template.kind,
        tags: template.tags.clone(),
        content: template.content.clone(),
    };

    let id = compute_event_id(&unsigned)?;
    let sig = sign_event_id(keys, &id)?;

    let event = Event {
        id: hex::encode(id),
        pubkey: unsigned.pubkey,
        created_at: unsigned.created_at,
        kind: unsigned.kind,
        tags: unsigned.tags,
        content: unsigned.content,
        sig: hex::encode(sig),
    };

    self_check(&event)?;
    Ok(PublishableEvent::new(event))
}

fn self_check(event: &Event) -> Result<(), Nip01Error> {
    let fail = |reason: String| Nip01Error::SelfCheckFailed {
        id: event.id.clone(),
        reason,
    };

    let wire = serde_json::to_string(event).map_err(|e| fail(e.to_string()))?;
    let decoded: Event = serde_json::from_str(&wire).map_err(|e| fail(e.to_string()))?;
    if &decoded != event {
        return Err(fail("event changed across a JSON round-trip".to_string()));
    }

    match verify_event(&decoded) {
        Ok(true) => Ok(()),
        Ok(false) => Err(fail("recomputed id or signature does not match".to_string())),
        Err(e) => Err(fail(e.to_string())),
    }
}

/// Verify an event's signature and id.
pub fn verify_event(event: &Event) -> Result<bool, Nip01Error> {
    if !validate_event(event) {
        return Ok(false);
    }

    let computed_id = get_event_hash(&event.unsigned())?;
    if computed_id != event.id {
        return Ok(false);
    }

    verify_signature(&event.pubkey, &event.id, &event.sig)
}

pub(crate) fn is_lower_hex(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn decode_hex_array<const N: usize>(value: &str, what: &str) -> Result<[u8; N], Nip01Error> {
    let bytes = hex::decode(value).map_err(|e| Nip01Error::InvalidHex(format!("{what}: {e}")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        Nip01Error::InvalidHex(format!("{what}: expected {N} bytes, got {}", b.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Test private key used in nostr-tools tests
    const TEST_PRIVATE_KEY: &str =
        "d217c1ff2f8a65c3e3a1740db3b9f58b8c848bb45e26d00ed4714e4a0f4ceecf";
    const TEST_PUBLIC_KEY: &str =
        "6af0f9de588f2c53cedcba26c5e2402e0d0aa64ec7b47c9f8d97b5bc562bab5f";

    const KAT_PUBKEY: &str = "bbde6a0e8847e1cdb2ba5ec021cc949eb3cef125b8304a748fe11c0407990eec";

    fn test_keys() -> Keypair {
        Keypair::from_secret_hex(TEST_PRIVATE_KEY).unwrap()
    }

    fn note(content: &str, tags: Vec<Vec<String>>) -> EventTemplate {
        EventTemplate {
            kind: 1,
            tags,
            content: content.to_string(),
            created_at: 1617932115,
        }
    }

    fn kat_event(kind: u16, tags: Vec<Vec<String>>, content: &str) -> UnsignedEvent {
        UnsignedEvent {
            pubkey: KAT_PUBKEY.to_string(),
            created_at: 1700000000,
            kind,
            tags,
            content: content.to_string(),
        }
    }

    // =========================================================================
    // Key handling
    // =========================================================================

    #[test]
    fn test_public_key_from_known_secret() {
        assert_eq!(test_keys().public_key_hex(), TEST_PUBLIC_KEY);
    }

    #[test]
    fn test_generated_keys_are_usable() {
        let keys = Keypair::generate();
        let pk = keys.public_key_hex();
        assert!(is_lower_hex(&pk, 64));

        let event = finalize_event(&note("hi", vec![]), &keys).unwrap();
        assert_eq!(event.as_event().pubkey, pk);
    }

    #[test]
    fn test_secret_hex_rejects_garbage() {
        assert!(matches!(
            Keypair::from_secret_hex("zz"),
            Err(Nip01Error::InvalidHex(_))
        ));
        assert!(matches!(
            Keypair::from_secret_hex("abcd"),
            Err(Nip01Error::InvalidHex(_))
        ));
        assert!(matches!(
            Keypair::from_secret_hex(&"00".repeat(32)),
            Err(Nip01Error::InvalidSecretKey(_))
        ));
    }

    #[test]
    fn test_secret_hex_trims_whitespace() {
        let keys = Keypair::from_secret_hex(&format!("  {TEST_PRIVATE_KEY}\n")).unwrap();
        assert_eq!(keys.public_key_hex(), TEST_PUBLIC_KEY);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", test_keys());
        assert!(!rendered.contains(TEST_PRIVATE_KEY));
        assert!(rendered.contains("redacted"));
        assert!(rendered.contains(TEST_PUBLIC_KEY));
    }

    // =========================================================================
    // Known-answer ids (reference digests from an independent JSON encoder)
    // =========================================================================

    #[test]
    fn test_known_answer_id() {
        let unsigned = kat_event(1, vec![], "hello");
        assert_eq!(
            serialize_event(&unsigned).unwrap(),
            format!("[0,\"{KAT_PUBKEY}\",1700000000,1,[],\"hello\"]")
        );
        assert_eq!(
            get_event_hash(&unsigned).unwrap(),
            "7b3e3c855486c0483791b55157b096ebcd3271b1dbc66514725256abea63bdbb"
        );
    }

    #[test]
    fn test_emoji_id_matches_reference() {
        let unsigned = kat_event(
            1,
            vec![vec!["t".to_string(), "🤙".to_string()]],
            "gm 🤙 ☕ über 世界",
        );
        assert_eq!(
            serialize_event(&unsigned).unwrap(),
            format!("[0,\"{KAT_PUBKEY}\",1700000000,1,[[\"t\",\"🤙\"]],\"gm 🤙 ☕ über 世界\"]")
        );
        assert_eq!(
            get_event_hash(&unsigned).unwrap(),
            "92deccee4f9f6a27a00d8b80988375c20bbedcab81a796a2a480505298981400"
        );
    }

    #[test]
    fn test_control_characters_id_matches_reference() {
        let unsigned = kat_event(1, vec![], "a\u{00}b\u{1f}c\u{7f}\"\\/\u{08}\u{0c}\n\r\t");
        let serialized = serialize_event(&unsigned).unwrap();
        assert!(serialized.ends_with("\"a\\u0000b\\u001fc\u{7f}\\\"\\\\/\\b\\f\\n\\r\\t\"]"));
        assert_eq!(
            get_event_hash(&unsigned).unwrap(),
            "f8182727d802cbd50cc75164eb5c0632c716b3580d58af2ab31dcb4447278e79"
        );
    }

    #[test]
    fn test_embedded_json_id_matches_reference() {
        let request = r#"{"id":"abc","kind":5050,"content":"line1\nline2 \"q\" 😀","tags":[["i","hi","text"]]}"#;
        let unsigned = kat_event(
            6050,
            vec![
                vec!["request".to_string(), request.to_string()],
                vec!["e".to_string(), "abc".to_string()],
            ],
            r#"{"answer":"42"}"#,
        );
        assert_eq!(
            get_event_hash(&unsigned).unwrap(),
            "a57c23220769de705b2fb1c5c5d79ddf4198c9d362a17ae405c82212d01fa0f0"
        );
    }

    // =========================================================================
    // Signing and verification
    // =========================================================================

    #[test]
    fn test_bip340_vector_zero() {
        let mut secret = [0u8; 32];
        secret[31] = 3;
        let keys = Keypair::from_secret_bytes(&secret).unwrap();
        assert_eq!(
            keys.public_key_hex(),
            "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9"
        );

        let sig = sign_event_id(&keys, &[0u8; 32]).unwrap();
        assert_eq!(
            hex::encode(sig),
            "e907831f80848d1069a5371b402410364bdf1c5f8307b0084c55f1ce2dca8215\
             25f66a4a85ea8b71e482a74f382d2ce5ebeee8fdb2172f477df4900d310536c0"
        );
        assert!(
            verify_signature(&keys.public_key_hex(), &"00".repeat(32), &hex::encode(sig)).unwrap()
        );
    }

    #[test]
    fn test_signing_is_deterministic() {
        let keys = test_keys();
        let id = [7u8; 32];
        assert_eq!(
            sign_event_id(&keys, &id).unwrap(),
            sign_event_id(&keys, &id).unwrap()
        );
    }

    #[test]
    fn test_verify_signature_is_idempotent() {
        let event = finalize_event(&note("same", vec![]), &test_keys()).unwrap();
        let event = event.as_event();
        let first = verify_signature(&event.pubkey, &event.id, &event.sig).unwrap();
        let second = verify_signature(&event.pubkey, &event.id, &event.sig).unwrap();
        assert!(first);
        assert_eq!(first, second);
    }

    #[test]
    fn test_verify_signature_malformed_hex_is_error() {
        let pk = TEST_PUBLIC_KEY;
        let id = "00".repeat(32);
        let sig = "00".repeat(64);
        assert!(matches!(
            verify_signature("xyz", &id, &sig),
            Err(Nip01Error::InvalidHex(_))
        ));
        assert!(matches!(
            verify_signature(pk, "1234", &sig),
            Err(Nip01Error::InvalidHex(_))
        ));
        assert!(matches!(
            verify_signature(pk, &id, "not-hex"),
            Err(Nip01Error::InvalidHex(_))
        ));
    }

    // =========================================================================
    // finalize_event tests (mirrors nostr-tools)
    // =========================================================================

    #[test]
    fn test_finalize_event_creates_signed_event() {
        let keys = test_keys();
        let template = note("Hello, world!", vec![]);

        let published = finalize_event(&template, &keys).unwrap();
        let event = published.as_event();

        assert_eq!(event.kind, template.kind);
        assert_eq!(event.tags, template.tags);
        assert_eq!(event.content, template.content);
        assert_eq!(event.created_at, template.created_at);
        assert_eq!(event.pubkey, TEST_PUBLIC_KEY);
        assert!(is_lower_hex(&event.id, 64));
        assert!(is_lower_hex(&event.sig, 128));
        assert!(verify_event(event).unwrap());
    }

    #[test]
    fn test_event_with_special_characters_in_content() {
        let event = finalize_event(
            &note("Hello\nWorld\t\"quotes\" and \\backslash \u{01}", vec![]),
            &test_keys(),
        )
        .unwrap();
        assert!(verify_event(event.as_event()).unwrap());
    }

    #[test]
    fn test_event_with_unicode_content() {
        let event = finalize_event(&note("Hello 世界 🌍 مرحبا", vec![]), &test_keys()).unwrap();
        assert!(verify_event(event.as_event()).unwrap());
    }

    // =========================================================================
    // serialize_event tests (mirrors nostr-tools)
    // =========================================================================

    #[test]
    fn test_serialize_event_valid() {
        let unsigned = UnsignedEvent {
            pubkey: TEST_PUBLIC_KEY.to_string(),
            created_at: 1617932115,
            kind: 1,
            tags: vec![],
            content: "Hello, world!".to_string(),
        };

        let serialized = serialize_event(&unsigned).unwrap();
        let expected = format!("[0,\"{}\",1617932115,1,[],\"Hello, world!\"]", TEST_PUBLIC_KEY);
        assert_eq!(serialized, expected);
    }

    #[test]
    fn test_serialize_event_invalid_pubkey() {
        let mut unsigned = kat_event(1, vec![], "x");
        unsigned.pubkey = "invalid".to_string();
        assert!(serialize_event(&unsigned).is_err());

        unsigned.pubkey = KAT_PUBKEY.to_uppercase();
        assert!(serialize_event(&unsigned).is_err());
    }

    // =========================================================================
    // verify_event tests (mirrors nostr-tools)
    // =========================================================================

    #[test]
    fn test_verify_event_invalid_signature() {
        let mut event = finalize_event(&note("Hello, world!", vec![]), &test_keys())
            .unwrap()
            .into_event();

        event.sig.replace_range(0..3, "666");
        assert!(!verify_event(&event).unwrap());
    }

    #[test]
    fn test_verify_event_wrong_pubkey() {
        let other = Keypair::from_secret_hex(
            "5b4a34f4e4b23c63ad55a35e3f84a3b53d96dbf266edf521a8358f71d19cbf67",
        )
        .unwrap();

        let mut event = finalize_event(&note("Hello, world!", vec![]), &test_keys())
            .unwrap()
            .into_event();
        event.pubkey = other.public_key_hex();

        assert!(!verify_event(&event).unwrap());
    }

    #[test]
    fn test_verify_event_invalid_id() {
        let mut event = finalize_event(&note("Hello, world!", vec![]), &test_keys())
            .unwrap()
            .into_event();

        event.id.replace_range(0..3, "666");
        assert!(!verify_event(&event).unwrap());
    }

    #[test]
    fn test_verify_event_tampered_content() {
        let mut event = finalize_event(&note("Hello, world!", vec![]), &test_keys())
            .unwrap()
            .into_event();

        event.content.push('!');
        assert!(!verify_event(&event).unwrap());
    }

    #[test]
    fn test_event_roundtrip_json_keeps_id() {
        let request = r#"{"kind":5050,"content":"a\nb"}"#;
        let template = note(
            "Testing JSON roundtrip",
            vec![
                vec!["request".to_string(), request.to_string()],
                vec!["t".to_string(), "nostr".to_string()],
            ],
        );

        let event = finalize_event(&template, &test_keys()).unwrap().into_event();
        let json = serde_json::to_string(&event).unwrap();
        let event2: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(event, event2);
        assert_eq!(get_event_hash(&event2.unsigned()).unwrap(), event.id);
        assert_eq!(event2.tag_value("request"), Some(request));
    }

    // =========================================================================
    // Self-check
    // =========================================================================

    fn signed(content: &str) -> Event {
        finalize_event(&note(content, vec![]), &test_keys())
            .unwrap()
            .into_event()
    }

    fn assert_self_check_fails(event: &Event) {
        match self_check(event) {
            Err(Nip01Error::SelfCheckFailed { id, reason }) => {
                assert_eq!(id, event.id);
                assert!(!reason.is_empty());
            }
            other => panic!("expected SelfCheckFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_self_check_accepts_finalized_event() {
        assert!(self_check(&signed("fine")).is_ok());
    }

    #[test]
    fn test_self_check_rejects_altered_content() {
        let mut event = signed("original");
        event.content = "altered after signing".to_string();
        assert!(!verify_event(&event).unwrap());
        assert_self_check_fails(&event);
    }

    #[test]
    fn test_self_check_rejects_altered_signature() {
        let mut event = signed("original");
        let last = if event.sig.ends_with('0') { "1" } else { "0" };
        event.sig.replace_range(127..128, last);
        assert!(!verify_event(&event).unwrap());
        assert_self_check_fails(&event);
    }

    #[test]
    fn test_self_check_rejects_altered_id() {
        let mut event = signed("original");
        event.id = "0".repeat(64);
        assert_self_check_fails(&event);

        // Uppercase hex fails structural validation before any hashing.
        let mut event = signed("original");
        event.id = event.id.to_uppercase();
        assert!(!verify_event(&event).unwrap());
        assert_self_check_fails(&event);
    }
}
