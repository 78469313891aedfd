#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tally_core::{
    CostReport, ExtractionError, RateTable, RecorderError, SessionRecorder, UsageLedger, UsageRecorder,
};
use tally_extract::{Completion, StructuredRequest, StructuredService, UsageEnvelope};

type Scripted = Result<(Value, Option<UsageEnvelope>), ExtractionError>;

/// Replays canned replies in order and keeps every request it saw.
#[derive(Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<Scripted>>,
    pub requests: Mutex<Vec<StructuredRequest>>,
}

impl ScriptedService {
    pub fn new(replies: Vec<Scripted>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> StructuredRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl StructuredService for ScriptedService {
    async fn complete<T>(&self, request: &StructuredRequest) -> Result<Completion<T>, ExtractionError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.requests.lock().unwrap().push(request.clone());
        let (value, usage) = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left")?;
        let value = serde_json::from_value(value).map_err(|e| ExtractionError::schema(e.to_string()))?;
        Ok(Completion { value, usage })
    }
}

pub fn usage(prompt: i64, completion: i64) -> Option<UsageEnvelope> {
    Some(UsageEnvelope {
        prompt_tokens: Some(prompt),
        completion_tokens: Some(completion),
    })
}

pub fn statement(date: &str, description: &str, amount: f64, category: &str) -> Value {
    json!({
        "Date": date,
        "Description": description,
        "Amount": amount,
        "Category": category,
        "Subcategory": "Misc",
        "Analysis": "General"
    })
}

pub fn three_statements() -> Value {
    json!({
        "data": [
            statement("01/02/22", "INSTACART HTTPSINSTACAR CA", 183.53, "Debit"),
            statement("12/28/21", "Payment Thank You - Web", -15925.89, "Credit"),
            statement("01/10/22", "DOORDASH*TROPICAL SMOO WWW.DOORDASH. CA", 72.19, "Debit"),
        ]
    })
}

/// Recorder that counts finalize calls.
#[derive(Default)]
pub struct CountingRecorder {
    pub ledger: UsageLedger,
    pub finalized: usize,
    pub fail_finalize: bool,
}

impl UsageRecorder for CountingRecorder {
    fn record_usage(&mut self, input_tokens: u64, output_tokens: u64) {
        self.ledger.record_usage(input_tokens, output_tokens);
    }
}

impl SessionRecorder for CountingRecorder {
    fn finalize(&mut self) -> Result<CostReport, RecorderError> {
        self.finalized += 1;
        if self.fail_finalize {
            return Err(RecorderError::Serialization("disk full".to_string()));
        }
        Ok(self.ledger.cost_report("gpt-4o-mini", &RateTable::default()))
    }
}
