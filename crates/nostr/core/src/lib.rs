//! Nostr protocol primitives for the DVM service.
//!
//! This crate provides:
//! - Canonical event serialization (the bytes an event id is hashed over)
//! - NIP-01: Basic protocol (events, ids, BIP-340 signing, verification)
//! - Trust states for inbound and outbound events
//! - NIP-90: Data Vending Machine (DVM) job requests/results/feedback

pub mod canonical;
pub mod nip01;
pub mod nip90;
mod trust;

// Canonical serialization
pub use canonical::{canonical_payload, escape_json_string};

// NIP-01: Basic protocol
pub use nip01::{
    Event, EventTemplate, Keypair, Nip01Error, UnsignedEvent, compute_event_id, finalize_event,
    generate_secret_key, get_event_hash, get_public_key, get_public_key_hex, serialize_event,
    sign_event_id, validate_event, validate_unsigned_event, verify_event, verify_signature,
};

// Trust states
pub use trust::{
    IdentityVerified, InboundStage, PublishableEvent, TrustedEvent, UntrustedEvent,
    VerificationError, validate_structure,
};

// NIP-90: Data Vending Machine
pub use nip90::{
    InputType, JOB_REQUEST_KIND_MAX, JOB_REQUEST_KIND_MIN, JobFeedback, JobInput, JobParam,
    JobRequest, JobResult, JobStatus, KIND_JOB_FEEDBACK, KIND_JOB_TEXT_GENERATION, Nip90Error,
    get_result_kind, is_job_request_kind,
};
