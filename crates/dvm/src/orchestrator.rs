//! NIP-90 job handling: request in, signed result (or error feedback) out.

use crate::generation::{GenerationRequest, TextGenerator};
use async_trait::async_trait;
use nostr::{
    EventTemplate, JobFeedback, JobRequest, JobResult, JobStatus, KIND_JOB_FEEDBACK, Keypair,
    Nip01Error, Nip90Error, PublishableEvent, TrustedEvent, finalize_event, is_job_request_kind,
};
use nostr_client::{EventHandler, Publisher};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that stop a job before anything is published.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid job request: {0}")]
    InvalidRequest(#[from] Nip90Error),

    #[error("failed to encode request: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to finalize event: {0}")]
    Finalize(#[from] Nip01Error),
}

/// Job handling settings, derived from config.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Request kinds this service answers
    pub request_kinds: Vec<u16>,
    /// Model used unless the request carries `param model`
    pub model: String,
    /// Upper bound on one generation call
    pub generation_timeout: Duration,
    /// Publish a `processing` status before generating
    pub send_processing_feedback: bool,
}

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Received,
    InputExtracted,
    GenerationComplete,
    GenerationFailed,
    ResultBuilt,
    Signed,
    Submitted,
}

/// Why a request was not worked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Authored by this service
    OwnEvent,
    /// Not a request kind this service answers
    UnsupportedKind(u16),
    /// No text in the input tag or the content
    BlankInput,
}

/// An event handed to the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub event_id: String,
    pub kind: u16,
    /// Relays the event was handed to
    pub relays: Vec<String>,
}

/// How a request ended.
#[derive(Debug)]
pub enum JobOutcome {
    Skipped(SkipReason),
    /// A result event was published
    Completed(Submission),
    /// Generation failed; an error feedback event was published
    Failed {
        reason: String,
        submission: Submission,
    },
    /// Nothing was published
    Aborted(JobError),
}

struct Job {
    id: String,
    state: JobState,
}

impl Job {
    fn advance(&mut self, state: JobState) {
        debug!(request_id = %self.id, from = ?self.state, to = ?state, "job state");
        self.state = state;
    }
}

/// Answers job requests with generated text.
pub struct JobOrchestrator {
    keys: Keypair,
    pubkey: String,
    settings: OrchestratorSettings,
    generator: Arc<dyn TextGenerator>,
    publisher: Arc<dyn Publisher>,
}

impl JobOrchestrator {
    pub fn new(
        keys: Keypair,
        settings: OrchestratorSettings,
        generator: Arc<dyn TextGenerator>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let pubkey = keys.public_key_hex();
        Self {
            keys,
            pubkey,
            settings,
            generator,
            publisher,
        }
    }

    /// Public key results are signed with.
    pub fn pubkey(&self) -> &str {
        &self.pubkey
    }

    /// Handle one verified request.
    pub async fn handle_request(&self, request: TrustedEvent) -> JobOutcome {
        self.process(request, None).await
    }

    async fn process(&self, request: TrustedEvent, relay_hint: Option<&str>) -> JobOutcome {
        let event = request.event();

        if event.pubkey == self.pubkey {
            debug!(event_id = %event.id, "ignoring own event");
            return JobOutcome::Skipped(SkipReason::OwnEvent);
        }
        if !is_job_request_kind(event.kind) || !self.settings.request_kinds.contains(&event.kind) {
            debug!(event_id = %event.id, kind = event.kind, "ignoring unsupported kind");
            return JobOutcome::Skipped(SkipReason::UnsupportedKind(event.kind));
        }

        let mut job = Job {
            id: event.id.clone(),
            state: JobState::Received,
        };

        let parsed = match JobRequest::from_event(event) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(request_id = %job.id, error = %e, "invalid job request");
                return JobOutcome::Aborted(e.into());
            }
        };

        let Some(prompt) = extract_input(&parsed) else {
            info!(request_id = %job.id, "request has no input, skipping");
            return JobOutcome::Skipped(SkipReason::BlankInput);
        };
        job.advance(JobState::InputExtracted);

        if self.settings.send_processing_feedback {
            let mut feedback = JobFeedback::new(JobStatus::Processing, &event.id, &event.pubkey);
            if let Some(relay) = relay_hint {
                feedback = feedback.with_request_relay(relay);
            }
            if let Err(e) = self.submit(KIND_JOB_FEEDBACK, feedback.to_tags(), String::new()).await
            {
                warn!(request_id = %job.id, error = %e, "failed to send processing feedback");
            }
        }

        let model = parsed
            .param("model")
            .unwrap_or(&self.settings.model)
            .to_string();
        info!(request_id = %job.id, kind = event.kind, model = %model, "generating");

        let generation = tokio::time::timeout(
            self.settings.generation_timeout,
            self.generator
                .generate(GenerationRequest::new(prompt).with_model(model)),
        )
        .await;

        let generated = match generation {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "generation timed out after {}s",
                self.settings.generation_timeout.as_secs()
            )),
        };

        match generated {
            Ok(text) => {
                job.advance(JobState::GenerationComplete);
                match self.publish_result(&mut job, &request, &parsed, relay_hint, text).await {
                    Ok(submission) => JobOutcome::Completed(submission),
                    Err(e) => JobOutcome::Aborted(e),
                }
            }
            Err(reason) => {
                job.advance(JobState::GenerationFailed);
                warn!(request_id = %job.id, reason = %reason, "generation failed");
                match self.publish_error(&mut job, &request, relay_hint, &reason).await {
                    Ok(submission) => JobOutcome::Failed { reason, submission },
                    Err(e) => JobOutcome::Aborted(e),
                }
            }
        }
    }

    async fn publish_result(
        &self,
        job: &mut Job,
        request: &TrustedEvent,
        parsed: &JobRequest,
        relay_hint: Option<&str>,
        content: String,
    ) -> Result<Submission, JobError> {
        let mut result = JobResult::new(request.kind, &request.id, &request.pubkey, content)?
            .with_request(serde_json::to_string(request.event())?);
        if let Some(relay) = relay_hint {
            result = result.with_request_relay(relay);
        }
        for input in &parsed.inputs {
            result = result.add_input(input.clone());
        }
        job.advance(JobState::ResultBuilt);

        let tags = result.to_tags();
        self.submit_job(job, result.kind, tags, result.content).await
    }

    async fn publish_error(
        &self,
        job: &mut Job,
        request: &TrustedEvent,
        relay_hint: Option<&str>,
        reason: &str,
    ) -> Result<Submission, JobError> {
        let mut feedback = JobFeedback::new(JobStatus::Error, &request.id, &request.pubkey)
            .with_status_extra(reason);
        if let Some(relay) = relay_hint {
            feedback = feedback.with_request_relay(relay);
        }
        job.advance(JobState::ResultBuilt);

        self.submit_job(job, KIND_JOB_FEEDBACK, feedback.to_tags(), String::new())
            .await
    }

    async fn submit_job(
        &self,
        job: &mut Job,
        kind: u16,
        tags: Vec<Vec<String>>,
        content: String,
    ) -> Result<Submission, JobError> {
        let event = self.finalize(kind, tags, content)?;
        job.advance(JobState::Signed);

        let submission = self.publish(&event).await;
        job.advance(JobState::Submitted);
        info!(
            request_id = %job.id,
            event_id = %submission.event_id,
            kind,
            relays = submission.relays.len(),
            "job answered"
        );
        Ok(submission)
    }

    async fn submit(
        &self,
        kind: u16,
        tags: Vec<Vec<String>>,
        content: String,
    ) -> Result<Submission, JobError> {
        let event = self.finalize(kind, tags, content)?;
        Ok(self.publish(&event).await)
    }

    fn finalize(
        &self,
        kind: u16,
        tags: Vec<Vec<String>>,
        content: String,
    ) -> Result<PublishableEvent, JobError> {
        let template = EventTemplate {
            created_at: unix_now(),
            kind,
            tags,
            content,
        };
        finalize_event(&template, &self.keys).map_err(|e| {
            if matches!(e, Nip01Error::SelfCheckFailed { .. }) {
                error!(kind, error = %e, "outbound event failed self-check, not publishing");
            }
            JobError::from(e)
        })
    }

    async fn publish(&self, event: &PublishableEvent) -> Submission {
        let relays = self.publisher.publish(event).await;
        Submission {
            event_id: event.id().to_string(),
            kind: event.as_event().kind,
            relays,
        }
    }
}

#[async_trait]
impl EventHandler for JobOrchestrator {
    async fn handle_event(&self, relay_url: &str, event: TrustedEvent) {
        if let JobOutcome::Aborted(e) = self.process(event, Some(relay_url)).await {
            warn!(relay = %relay_url, error = %e, "job aborted");
        }
    }
}

/// Text input from the first text `i` tag, else the content. `None` when blank.
fn extract_input(request: &JobRequest) -> Option<String> {
    request
        .text_input()
        .filter(|text| !text.trim().is_empty())
        .or_else(|| Some(request.content.as_str()).filter(|c| !c.trim().is_empty()))
        .map(str::to_string)
}

/// Seconds since the Unix epoch, 0 if the clock is before it.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
