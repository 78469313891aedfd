//! The LLM service boundary.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tally_core::ExtractionError;

pub use tally_core::UsageEnvelope;

/// One schema-bound request.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub schema_name: String,
    /// Strict JSON schema of the expected reply
    pub schema: Value,
}

/// A validated reply plus whatever usage the service reported.
#[derive(Debug, Clone)]
pub struct Completion<T> {
    pub value: T,
    pub usage: Option<UsageEnvelope>,
}

/// A chat model that returns replies conforming to a JSON schema.
///
/// Implementations own any repair/retry policy: a call either yields a value
/// that deserializes into `T` or fails with `SchemaValidation`. Errors carry
/// the usage already billed by earlier attempts, when any was reported.
#[async_trait]
pub trait StructuredService: Send + Sync {
    async fn complete<T>(&self, request: &StructuredRequest) -> Result<Completion<T>, ExtractionError>
    where
        T: DeserializeOwned + Send + 'static;
}
