//! Token usage accounting and cost reporting

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RecorderError;

/// Model used when a rate lookup misses
pub const DEFAULT_PRICED_MODEL: &str = "gpt-4-0125-preview";

/// Token counts of one successful LLM call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub timestamp: DateTime<Utc>,
}

/// Token counts as reported by the service.
///
/// Kept signed and optional so that odd values reach the client, which
/// decides whether they are usable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEnvelope {
    #[serde(default)]
    pub prompt_tokens: Option<i64>,
    #[serde(default)]
    pub completion_tokens: Option<i64>,
}

impl UsageEnvelope {
    /// Combine the usage of two calls; a missing side leaves the other intact.
    pub fn merge(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (None, x) | (x, None) => x,
            (Some(a), Some(b)) => Some(Self {
                prompt_tokens: add_opt(a.prompt_tokens, b.prompt_tokens),
                completion_tokens: add_opt(a.completion_tokens, b.completion_tokens),
            }),
        }
    }
}

fn add_opt(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.saturating_add(b)),
        (x, None) | (None, x) => x,
    }
}

/// Sink for token usage reported by the extraction client.
pub trait UsageRecorder {
    fn record_usage(&mut self, input_tokens: u64, output_tokens: u64);
}

/// A run-scoped recorder. `finalize` is called once when the run ends,
/// whether or not it succeeded.
pub trait SessionRecorder: UsageRecorder {
    fn finalize(&mut self) -> Result<CostReport, RecorderError>;
}

/// USD per million tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Rate {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    pub fn input_cost(&self, tokens: u64) -> f64 {
        tokens as f64 * self.input_per_million / 1_000_000.0
    }

    pub fn output_cost(&self, tokens: u64) -> f64 {
        tokens as f64 * self.output_per_million / 1_000_000.0
    }
}

/// Per-model pricing with an optional override that wins over every entry.
#[derive(Debug, Clone)]
pub struct RateTable {
    rates: HashMap<String, Rate>,
    override_rate: Option<Rate>,
}

impl Default for RateTable {
    fn default() -> Self {
        let mut rates = HashMap::new();
        rates.insert(DEFAULT_PRICED_MODEL.to_string(), Rate::new(10.0, 30.0));
        rates.insert("gpt-4-turbo".to_string(), Rate::new(10.0, 30.0));
        rates.insert("gpt-4o".to_string(), Rate::new(2.50, 10.0));
        rates.insert("gpt-4o-mini".to_string(), Rate::new(0.15, 0.60));
        Self {
            rates,
            override_rate: None,
        }
    }
}

impl RateTable {
    pub fn with_override(mut self, rate: Rate) -> Self {
        self.override_rate = Some(rate);
        self
    }

    pub fn insert(&mut self, model: impl Into<String>, rate: Rate) {
        self.rates.insert(model.into(), rate);
    }

    pub fn rate_for(&self, model: &str) -> Rate {
        if let Some(r) = self.override_rate {
            return r;
        }
        self.rates
            .get(model)
            .or_else(|| self.rates.get(DEFAULT_PRICED_MODEL))
            .copied()
            .unwrap_or(Rate::new(10.0, 30.0))
    }
}

/// Total cost of a session, emitted once at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub model: String,
    pub calls: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_cost_usd: f64,
    pub output_cost_usd: f64,
    pub total_cost_usd: f64,
}

impl CostReport {
    pub fn summary(&self) -> String {
        format!(
            "{} call(s) on {} | input={} output={} tokens | total=${:.4}",
            self.calls, self.model, self.input_tokens, self.output_tokens, self.total_cost_usd
        )
    }
}

/// In-memory accumulator of usage records.
#[derive(Debug, Clone, Default)]
pub struct UsageLedger {
    records: Vec<UsageRecord>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    pub fn total_input_tokens(&self) -> u64 {
        self.records.iter().map(|r| r.input_tokens).sum()
    }

    pub fn total_output_tokens(&self) -> u64 {
        self.records.iter().map(|r| r.output_tokens).sum()
    }

    pub fn cost_report(&self, model: &str, rates: &RateTable) -> CostReport {
        let rate = rates.rate_for(model);
        let input_tokens = self.total_input_tokens();
        let output_tokens = self.total_output_tokens();
        let input_cost_usd = rate.input_cost(input_tokens);
        let output_cost_usd = rate.output_cost(output_tokens);

        CostReport {
            model: model.to_string(),
            calls: self.records.len(),
            input_tokens,
            output_tokens,
            input_cost_usd,
            output_cost_usd,
            total_cost_usd: input_cost_usd + output_cost_usd,
        }
    }
}

impl UsageRecorder for UsageLedger {
    fn record_usage(&mut self, input_tokens: u64, output_tokens: u64) {
        self.records.push(UsageRecord {
            input_tokens,
            output_tokens,
            timestamp: Utc::now(),
        });
    }
}
