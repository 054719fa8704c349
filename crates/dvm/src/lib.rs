//! NIP-90 Data Vending Machine that answers text generation requests.
//!
//! - [`DvmConfig`]: TOML configuration and key loading
//! - [`TextGenerator`]: generation backends ([`OllamaGenerator`])
//! - [`JobOrchestrator`]: turns verified requests into signed results

pub mod config;
pub mod generation;
pub mod orchestrator;

pub use config::{ConfigError, DvmConfig, GenerationConfig, SECRET_KEY_ENV};
pub use generation::{GenerationError, GenerationRequest, OllamaGenerator, TextGenerator};
pub use orchestrator::{
    JobError, JobOrchestrator, JobOutcome, JobState, OrchestratorSettings, SkipReason, Submission,
    unix_now,
};
