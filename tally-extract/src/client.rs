//! Structured extraction client: one schema-bound LLM call per statement.

use tally_core::{ExtractionError, ExtractionResult, UsageRecorder};
use tracing::{error, info, warn};

use crate::prompt::{SCHEMA_NAME, SYSTEM_PROMPT, user_prompt};
use crate::schema::strict_schema_for;
use crate::service::{Completion, StructuredRequest, StructuredService, UsageEnvelope};

pub struct ExtractionClient<S> {
    service: S,
    model: String,
}

impl<S: StructuredService> ExtractionClient<S> {
    pub fn new(service: S, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Categorize `content` into statements.
    ///
    /// Usage is forwarded to `usage_sink` when the service reports it; a reply
    /// without usage only logs a warning. Every failure is logged and returned
    /// unchanged, there is no retry at this level.
    pub async fn extract_structured(
        &self,
        content: &str,
        statement_kind: &str,
        usage_sink: Option<&mut (dyn UsageRecorder + Send)>,
    ) -> Result<ExtractionResult, ExtractionError> {
        info!(prefix = "openai", model = %self.model, "Starting OpenAI API call for data extraction");

        match self.call(content, statement_kind, usage_sink).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!(prefix = "openai", kind = %e.kind, "Error in OpenAI API call: {}", e.message);
                Err(e)
            }
        }
    }

    fn build_request(&self, content: &str, statement_kind: &str) -> Result<StructuredRequest, ExtractionError> {
        let schema = strict_schema_for::<ExtractionResult>()
            .map_err(|e| ExtractionError::unknown(format!("build output schema: {e}")))?;

        Ok(StructuredRequest {
            model: self.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            user: user_prompt(statement_kind, content),
            schema_name: SCHEMA_NAME.to_string(),
            schema,
        })
    }

    async fn call(
        &self,
        content: &str,
        statement_kind: &str,
        usage_sink: Option<&mut (dyn UsageRecorder + Send)>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let request = self.build_request(content, statement_kind)?;
        let completion: Completion<ExtractionResult> = match self.service.complete(&request).await {
            Ok(completion) => completion,
            Err(e) => {
                // Tokens billed before the failure still count toward the session cost
                if let Some(envelope) = e.usage {
                    match token_counts(envelope) {
                        Ok((input, output)) => {
                            if let Some(sink) = usage_sink {
                                sink.record_usage(input, output);
                            }
                            info!(
                                prefix = "openai",
                                prompt_tokens = input,
                                completion_tokens = output,
                                "Failed API call consumed {input} prompt and {output} completion tokens"
                            );
                        }
                        Err(bad) => {
                            warn!(prefix = "openai", "ignoring usage of failed call: {}", bad.message);
                        }
                    }
                }
                return Err(e);
            }
        };

        match completion.usage {
            Some(envelope) => {
                let (input, output) = token_counts(envelope)?;
                if let Some(sink) = usage_sink {
                    sink.record_usage(input, output);
                }
                info!(
                    prefix = "openai",
                    prompt_tokens = input,
                    completion_tokens = output,
                    "API call completed. Prompt tokens: {input}, Completion tokens: {output}"
                );
            }
            None => {
                warn!(prefix = "openai", "Could not access token usage information from the API response");
            }
        }

        Ok(completion.value)
    }
}

/// Validate reported usage. Both counts must be present and non-negative.
fn token_counts(envelope: UsageEnvelope) -> Result<(u64, u64), ExtractionError> {
    let count = |name: &str, v: Option<i64>| -> Result<u64, ExtractionError> {
        let v = v.ok_or_else(|| ExtractionError::malformed_usage(format!("{name} missing")))?;
        u64::try_from(v).map_err(|_| ExtractionError::malformed_usage(format!("{name} is negative: {v}")))
    };

    Ok((
        count("prompt_tokens", envelope.prompt_tokens)?,
        count("completion_tokens", envelope.completion_tokens)?,
    ))
}
