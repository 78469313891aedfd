//! tally-extract: schema-constrained LLM extraction and the statement pipeline

pub mod client;
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod schema;
pub mod service;

pub use client::ExtractionClient;
pub use openai::{ClientConfig, OpenAiService};
pub use pipeline::{ContentMode, PipelineError, RunOutput, run};
pub use service::{Completion, StructuredRequest, StructuredService, UsageEnvelope};
