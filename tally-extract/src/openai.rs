//! OpenAI chat completions with strict structured outputs.
//!
//! Replies that fail to deserialize into the target type are sent back to the
//! model with the validation error, up to `repair_attempts` extra times.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tally_core::ExtractionError;
use tracing::{debug, warn};

use crate::prompt::repair_prompt;
use crate::service::{Completion, StructuredRequest, StructuredService, UsageEnvelope};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub temperature: f32,
    pub timeout: Duration,
    /// Extra attempts after a reply fails schema validation
    pub repair_attempts: u32,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(120),
            repair_attempts: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct OaiMsg {
    role: String,
    content: String,
}

impl OaiMsg {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct OaiReq<'a> {
    model: &'a str,
    messages: &'a [OaiMsg],
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    t: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct Resp {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MsgOut,
}

#[derive(Debug, Deserialize)]
struct MsgOut {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

pub struct OpenAiService {
    client: reqwest::Client,
    config: ClientConfig,
}

impl OpenAiService {
    pub fn new(config: ClientConfig) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExtractionError::unknown(format!("build http client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn send(&self, request: &StructuredRequest, messages: &[OaiMsg]) -> Result<Resp, ExtractionError> {
        let body = OaiReq {
            model: &request.model,
            messages,
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                t: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: &request.schema_name,
                    strict: true,
                    schema: &request.schema,
                },
            },
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
                .map_err(|_| ExtractionError::auth("API key contains invalid header characters"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let url = format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = resp.status();
        let txt = resp.text().await.map_err(|e| classify_transport(&e))?;
        if !status.is_success() {
            return Err(classify_status(status, &txt));
        }

        parse_envelope(&txt)
    }
}

#[async_trait]
impl StructuredService for OpenAiService {
    async fn complete<T>(&self, request: &StructuredRequest) -> Result<Completion<T>, ExtractionError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut messages = vec![
            OaiMsg::new("system", request.system.as_str()),
            OaiMsg::new("user", request.user.as_str()),
        ];
        let mut usage: Option<UsageEnvelope> = None;
        let mut last_error = String::new();
        let attempts = self.config.repair_attempts + 1;

        for attempt in 1..=attempts {
            let resp = match self.send(request, &messages).await {
                Ok(resp) => resp,
                Err(e) => return Err(e.with_usage(usage)),
            };
            let reported = match parse_usage(resp.usage) {
                Ok(reported) => reported,
                Err(e) => return Err(e.with_usage(usage)),
            };
            usage = UsageEnvelope::merge(usage, reported);

            let content = match reply_content(resp.choices) {
                Ok(content) => content,
                Err(e) => return Err(e.with_usage(usage)),
            };
            match serde_json::from_str::<T>(&content) {
                Ok(value) => {
                    debug!(prefix = "openai", attempt, "reply passed schema validation");
                    return Ok(Completion { value, usage });
                }
                Err(e) => {
                    warn!(prefix = "openai", attempt, error = %e, "reply failed schema validation");
                    last_error = e.to_string();
                    messages.push(OaiMsg::new("assistant", content));
                    messages.push(OaiMsg::new("user", repair_prompt(&last_error)));
                }
            }
        }

        Err(ExtractionError::schema(format!(
            "no schema-conformant reply after {attempts} attempt(s): {last_error}"
        ))
        .with_usage(usage))
    }
}

fn classify_transport(e: &reqwest::Error) -> ExtractionError {
    if e.is_timeout() {
        ExtractionError::timeout(e.to_string())
    } else if e.is_decode() {
        ExtractionError::unknown(format!("read response body: {e}"))
    } else {
        ExtractionError::network(e.to_string())
    }
}

fn classify_status(status: StatusCode, body: &str) -> ExtractionError {
    let message = format!("openai error: {status} {body}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ExtractionError::auth(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ExtractionError::timeout(message),
        StatusCode::TOO_MANY_REQUESTS => ExtractionError::network(message),
        s if s.is_server_error() => ExtractionError::network(message),
        _ => ExtractionError::unknown(message),
    }
}

fn parse_envelope(body: &str) -> Result<Resp, ExtractionError> {
    serde_json::from_str(body)
        .map_err(|e| ExtractionError::unknown(format!("parse openai response: {e}")))
}

fn parse_usage(raw: Option<Value>) -> Result<Option<UsageEnvelope>, ExtractionError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v)
            .map(Some)
            .map_err(|e| ExtractionError::malformed_usage(format!("usage block: {e}"))),
    }
}

fn reply_content(choices: Vec<Choice>) -> Result<String, ExtractionError> {
    let message = choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| ExtractionError::unknown("openai response had no choices"))?;

    if let Some(refusal) = message.refusal {
        return Err(ExtractionError::schema(format!("model refused: {refusal}")));
    }
    message
        .content
        .ok_or_else(|| ExtractionError::schema("model returned no content"))
}
