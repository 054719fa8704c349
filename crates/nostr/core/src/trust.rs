//! Trust states for events crossing the network boundary.
//!
//! Inbound events move `UntrustedEvent -> IdentityVerified -> TrustedEvent`;
//! each step consumes the previous value, so a handler that accepts a
//! [`TrustedEvent`] can only ever see an event whose id was recomputed and
//! whose signature verified. Outbound events are only publishable once
//! [`crate::finalize_event`] hands back a [`PublishableEvent`].

use crate::nip01::{Event, Nip01Error, get_event_hash, is_lower_hex, verify_signature};
use serde::Serialize;
use std::ops::Deref;
use thiserror::Error;

/// Where an inbound event failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundStage {
    Parse,
    Structure,
    Identity,
    Signature,
}

impl std::fmt::Display for InboundStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InboundStage::Parse => "parse",
            InboundStage::Structure => "structure",
            InboundStage::Identity => "identity",
            InboundStage::Signature => "signature",
        };
        f.write_str(s)
    }
}

/// An inbound event was rejected.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("malformed event: {0}")]
    Parse(String),

    #[error("structure: {0}")]
    Structure(String),

    #[error("id mismatch: claimed {claimed}, computed {computed}")]
    Identity { claimed: String, computed: String },

    #[error("signature does not verify for event {0}")]
    Signature(String),

    #[error(transparent)]
    Nip01(#[from] Nip01Error),
}

impl VerificationError {
    pub fn stage(&self) -> InboundStage {
        match self {
            VerificationError::Parse(_) => InboundStage::Parse,
            VerificationError::Structure(_) => InboundStage::Structure,
            VerificationError::Identity { .. } => InboundStage::Identity,
            VerificationError::Signature(_) | VerificationError::Nip01(_) => {
                InboundStage::Signature
            }
        }
    }
}

/// Structural checks that do not need any cryptography.
///
/// Hex fields must be lowercase and of the right length, and every tag
/// must at least carry its name. Kind range and UTF-8 content are
/// guaranteed by the types.
pub fn validate_structure(event: &Event) -> Result<(), VerificationError> {
    if !is_lower_hex(&event.id, 64) {
        return Err(VerificationError::Structure(
            "id must be 64 lowercase hex chars".to_string(),
        ));
    }
    if !is_lower_hex(&event.pubkey, 64) {
        return Err(VerificationError::Structure(
            "pubkey must be 64 lowercase hex chars".to_string(),
        ));
    }
    if !is_lower_hex(&event.sig, 128) {
        return Err(VerificationError::Structure(
            "sig must be 128 lowercase hex chars".to_string(),
        ));
    }
    if let Some(pos) = event.tags.iter().position(|t| t.is_empty()) {
        return Err(VerificationError::Structure(format!("tag {pos} is empty")));
    }
    Ok(())
}

/// An event as received from a relay. Nothing about it is trusted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntrustedEvent(Event);

impl UntrustedEvent {
    pub fn new(event: Event) -> Self {
        Self(event)
    }

    /// Parse an event object from JSON text.
    pub fn parse(json: &str) -> Result<Self, VerificationError> {
        serde_json::from_str(json)
            .map(Self)
            .map_err(|e| VerificationError::Parse(e.to_string()))
    }

    /// Parse an event object already decoded from a relay frame.
    pub fn from_value(value: serde_json::Value) -> Result<Self, VerificationError> {
        serde_json::from_value(value)
            .map(Self)
            .map_err(|e| VerificationError::Parse(e.to_string()))
    }

    /// The id the author claims. Only useful for logging.
    pub fn claimed_id(&self) -> &str {
        &self.0.id
    }

    /// Check structure, then recompute the id and compare it to the claimed one.
    pub fn verify_identity(self) -> Result<IdentityVerified, VerificationError> {
        validate_structure(&self.0)?;
        let computed = get_event_hash(&self.0.unsigned())?;
        if computed != self.0.id {
            return Err(VerificationError::Identity {
                claimed: self.0.id,
                computed,
            });
        }
        Ok(IdentityVerified(self.0))
    }

    /// Run the whole inbound pipeline.
    pub fn verify(self) -> Result<TrustedEvent, VerificationError> {
        self.verify_identity()?.verify_signature()
    }
}

/// An event whose id matches its content. The signature is still unchecked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityVerified(Event);

impl IdentityVerified {
    pub fn verify_signature(self) -> Result<TrustedEvent, VerificationError> {
        if verify_signature(&self.0.pubkey, &self.0.id, &self.0.sig)? {
            Ok(TrustedEvent(self.0))
        } else {
            Err(VerificationError::Signature(self.0.id))
        }
    }
}

/// An inbound event whose id and signature both verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrustedEvent(Event);

impl TrustedEvent {
    pub fn event(&self) -> &Event {
        &self.0
    }

    pub fn into_inner(self) -> Event {
        self.0
    }
}

impl Deref for TrustedEvent {
    type Target = Event;

    fn deref(&self) -> &Event {
        &self.0
    }
}

/// A locally authored event that was signed and passed its self-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PublishableEvent(Event);

impl PublishableEvent {
    pub(crate) fn new(event: Event) -> Self {
        Self(event)
    }

    pub fn as_event(&self) -> &Event {
        &self.0
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn into_event(self) -> Event {
        self.0
    }
}
