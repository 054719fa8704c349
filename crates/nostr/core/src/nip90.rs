//! NIP-90: Data Vending Machine
//!
//! Customers publish job requests, service providers answer with results
//! and optional feedback.
//!
//! ## Kinds
//! - 5000-5999: Job request kinds
//! - 6000-6999: Job result kinds (request kind + 1000)
//! - 7000: Job feedback

use crate::nip01::Event;
use std::str::FromStr;
use thiserror::Error;

/// Kind range for job requests
pub const JOB_REQUEST_KIND_MIN: u16 = 5000;
pub const JOB_REQUEST_KIND_MAX: u16 = 5999;

/// Kind for job feedback
pub const KIND_JOB_FEEDBACK: u16 = 7000;

/// Text generation / Chat
pub const KIND_JOB_TEXT_GENERATION: u16 = 5050;

/// Errors that can occur during NIP-90 operations.
#[derive(Debug, Error)]
pub enum Nip90Error {
    #[error("invalid kind: {0} (expected {1})")]
    InvalidKind(u16, String),

    #[error("missing required tag: {0}")]
    MissingTag(String),

    #[error("invalid input type: {0}")]
    InvalidInputType(String),
}

/// Input type for job request `i` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputType {
    /// A URL to fetch data from
    Url,
    /// A Nostr event ID
    Event,
    /// Output of a previous job
    Job,
    /// Direct text input
    Text,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Url => "url",
            InputType::Event => "event",
            InputType::Job => "job",
            InputType::Text => "text",
        }
    }
}

impl FromStr for InputType {
    type Err = Nip90Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "url" => Ok(InputType::Url),
            "event" => Ok(InputType::Event),
            "job" => Ok(InputType::Job),
            "text" => Ok(InputType::Text),
            _ => Err(Nip90Error::InvalidInputType(s.to_string())),
        }
    }
}

/// Job feedback status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Service Provider is processing the job
    Processing,
    /// Service Provider was unable to process the job
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Error => "error",
        }
    }
}

/// An input for a job request (`i` tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInput {
    /// The input data/argument
    pub data: String,
    /// How to interpret the input
    pub input_type: InputType,
    /// Relay hint (for event/job types)
    pub relay: Option<String>,
    /// Optional marker for how input should be used
    pub marker: Option<String>,
}

impl JobInput {
    /// Create a new text input.
    pub fn text(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            input_type: InputType::Text,
            relay: None,
            marker: None,
        }
    }

    /// Convert to tag array.
    pub fn to_tag(&self) -> Vec<String> {
        let mut tag = vec![
            "i".to_string(),
            self.data.clone(),
            self.input_type.as_str().to_string(),
        ];

        // Relay slot is positional, keep it (empty) when a marker follows
        if self.relay.is_some() || self.marker.is_some() {
            tag.push(self.relay.clone().unwrap_or_default());
        }

        if let Some(marker) = &self.marker {
            tag.push(marker.clone());
        }

        tag
    }

    /// Parse from tag array.
    pub fn from_tag(tag: &[String]) -> Result<Self, Nip90Error> {
        if tag.len() < 3 || tag[0] != "i" {
            return Err(Nip90Error::MissingTag("i tag requires at least 3 elements".to_string()));
        }

        Ok(Self {
            data: tag[1].clone(),
            input_type: tag[2].parse()?,
            relay: tag.get(3).filter(|s| !s.is_empty()).cloned(),
            marker: tag.get(4).cloned(),
        })
    }
}

/// A parameter for a job request (`param` tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobParam {
    /// Parameter key
    pub key: String,
    /// Parameter value
    pub value: String,
}

impl JobParam {
    /// Parse from tag array.
    pub fn from_tag(tag: &[String]) -> Result<Self, Nip90Error> {
        if tag.len() < 3 || tag[0] != "param" {
            return Err(Nip90Error::MissingTag("param tag requires 3 elements".to_string()));
        }

        Ok(Self {
            key: tag[1].clone(),
            value: tag[2].clone(),
        })
    }
}

/// A job request (kind 5000-5999) as read from tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// The specific job kind (5000-5999)
    pub kind: u16,
    /// Input data for the job
    pub inputs: Vec<JobInput>,
    /// Parameters for the job
    pub params: Vec<JobParam>,
    /// Free-form content
    pub content: String,
}

impl JobRequest {
    /// Read a job request out of an event.
    ///
    /// Unknown tags are ignored. An `i` tag with an unknown input type is
    /// skipped rather than failing the whole request.
    pub fn from_event(event: &Event) -> Result<Self, Nip90Error> {
        if !is_job_request_kind(event.kind) {
            return Err(Nip90Error::InvalidKind(event.kind, "5000-5999".to_string()));
        }

        let mut request = Self {
            kind: event.kind,
            inputs: Vec::new(),
            params: Vec::new(),
            content: event.content.clone(),
        };

        for tag in &event.tags {
            match tag.first().map(String::as_str) {
                Some("i") => {
                    if let Ok(input) = JobInput::from_tag(tag) {
                        request.inputs.push(input);
                    }
                }
                Some("param") => {
                    if let Ok(param) = JobParam::from_tag(tag) {
                        request.params.push(param);
                    }
                }
                _ => {}
            }
        }

        Ok(request)
    }

    /// Value of the first `param` with this key.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    /// First text input, if any.
    pub fn text_input(&self) -> Option<&str> {
        self.inputs
            .iter()
            .find(|i| i.input_type == InputType::Text)
            .map(|i| i.data.as_str())
    }
}

/// A job result event data (kind 6000-6999).
#[derive(Debug, Clone)]
pub struct JobResult {
    /// The result kind (6000-6999, = request kind + 1000)
    pub kind: u16,
    /// The result payload
    pub content: String,
    /// The original job request (stringified JSON)
    pub request: Option<String>,
    /// The job request event ID
    pub request_id: String,
    /// Relay hint for the request
    pub request_relay: Option<String>,
    /// Original inputs from the request
    pub inputs: Vec<JobInput>,
    /// Customer's pubkey
    pub customer_pubkey: String,
}

impl JobResult {
    /// Create a new job result.
    pub fn new(
        request_kind: u16,
        request_id: impl Into<String>,
        customer_pubkey: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self, Nip90Error> {
        let kind = get_result_kind(request_kind)
            .ok_or_else(|| Nip90Error::InvalidKind(request_kind, "5000-5999".to_string()))?;

        Ok(Self {
            kind,
            content: content.into(),
            request: None,
            request_id: request_id.into(),
            request_relay: None,
            inputs: Vec::new(),
            customer_pubkey: customer_pubkey.into(),
        })
    }

    /// Set the original request JSON.
    pub fn with_request(mut self, request_json: impl Into<String>) -> Self {
        self.request = Some(request_json.into());
        self
    }

    /// Set the request relay hint.
    pub fn with_request_relay(mut self, relay: impl Into<String>) -> Self {
        self.request_relay = Some(relay.into());
        self
    }

    /// Add an original input.
    pub fn add_input(mut self, input: JobInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Convert to tags for event creation.
    pub fn to_tags(&self) -> Vec<Vec<String>> {
        let mut tags = Vec::new();

        if let Some(request) = &self.request {
            tags.push(vec!["request".to_string(), request.clone()]);
        }

        let mut e_tag = vec!["e".to_string(), self.request_id.clone()];
        if let Some(relay) = &self.request_relay {
            e_tag.push(relay.clone());
        }
        tags.push(e_tag);

        for input in &self.inputs {
            tags.push(input.to_tag());
        }

        tags.push(vec!["p".to_string(), self.customer_pubkey.clone()]);

        tags
    }
}

/// A job feedback event data (kind 7000).
#[derive(Debug, Clone)]
pub struct JobFeedback {
    /// The feedback status
    pub status: JobStatus,
    /// Extra info about the status
    pub status_extra: Option<String>,
    /// The job request event ID
    pub request_id: String,
    /// Relay hint for the request
    pub request_relay: Option<String>,
    /// Customer's pubkey
    pub customer_pubkey: String,
}

impl JobFeedback {
    /// Create a new job feedback.
    pub fn new(
        status: JobStatus,
        request_id: impl Into<String>,
        customer_pubkey: impl Into<String>,
    ) -> Self {
        Self {
            status,
            status_extra: None,
            request_id: request_id.into(),
            request_relay: None,
            customer_pubkey: customer_pubkey.into(),
        }
    }

    /// Set extra status info.
    pub fn with_status_extra(mut self, extra: impl Into<String>) -> Self {
        self.status_extra = Some(extra.into());
        self
    }

    /// Set the request relay hint.
    pub fn with_request_relay(mut self, relay: impl Into<String>) -> Self {
        self.request_relay = Some(relay.into());
        self
    }

    /// Convert to tags for event creation.
    pub fn to_tags(&self) -> Vec<Vec<String>> {
        let mut status_tag = vec!["status".to_string(), self.status.as_str().to_string()];
        if let Some(extra) = &self.status_extra {
            status_tag.push(extra.clone());
        }

        let mut e_tag = vec!["e".to_string(), self.request_id.clone()];
        if let Some(relay) = &self.request_relay {
            e_tag.push(relay.clone());
        }

        vec![
            status_tag,
            e_tag,
            vec!["p".to_string(), self.customer_pubkey.clone()],
        ]
    }
}

/// Check if a kind is a job request kind (5000-5999).
pub fn is_job_request_kind(kind: u16) -> bool {
    (JOB_REQUEST_KIND_MIN..=JOB_REQUEST_KIND_MAX).contains(&kind)
}

/// Get the result kind for a given request kind.
pub fn get_result_kind(request_kind: u16) -> Option<u16> {
    if is_job_request_kind(request_kind) {
        Some(request_kind + 1000)
    } else {
        None
    }
}
