//! Per-run session: id, log file location and cost accounting.
//!
//! Files land in the sessions directory as `<id>.log` (tracing output) and
//! `<id>.json` (cost report plus every usage record), written on finalize.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_core::{
    CostReport, RateTable, RecorderError, SessionRecorder, UsageLedger, UsageRecord, UsageRecorder,
};
use tracing::{debug, info};

pub struct Session {
    id: String,
    dir: PathBuf,
    model: String,
    rates: RateTable,
    started_at: DateTime<Utc>,
    ledger: UsageLedger,
    report: Option<CostReport>,
}

#[derive(Serialize)]
struct SessionSummary<'a> {
    session_id: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    cost: &'a CostReport,
    usage: &'a [UsageRecord],
}

/// `session_<YYYYmmdd_HHMMSS>_<8 hex chars>`
pub fn new_session_id(now: DateTime<Utc>) -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", now.format("%Y%m%d_%H%M%S"), &uuid[..8])
}

impl Session {
    pub fn create(dir: &Path, model: impl Into<String>, rates: RateTable) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        let started_at = Utc::now();
        Ok(Self {
            id: new_session_id(started_at),
            dir: dir.to_path_buf(),
            model: model.into(),
            rates,
            started_at,
            ledger: UsageLedger::new(),
            report: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.id))
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.id))
    }

    pub fn open_log(&self) -> Result<File> {
        let p = self.log_path();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&p)
            .with_context(|| format!("open {}", p.display()))
    }

    /// The report from `finalize`, if it has run.
    pub fn report(&self) -> Option<&CostReport> {
        self.report.as_ref()
    }

    fn write_summary(&self, report: &CostReport) -> Result<(), RecorderError> {
        let summary = SessionSummary {
            session_id: &self.id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            cost: report,
            usage: self.ledger.records(),
        };
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| RecorderError::Serialization(e.to_string()))?;
        fs::write(self.report_path(), json)?;
        Ok(())
    }
}

impl UsageRecorder for Session {
    fn record_usage(&mut self, input_tokens: u64, output_tokens: u64) {
        self.ledger.record_usage(input_tokens, output_tokens);
        debug!(prefix = "cost", input_tokens, output_tokens, "usage recorded");
    }
}

impl SessionRecorder for Session {
    fn finalize(&mut self) -> Result<CostReport, RecorderError> {
        if let Some(report) = &self.report {
            return Ok(report.clone());
        }

        let report = self.ledger.cost_report(&self.model, &self.rates);
        info!(
            prefix = "cost",
            session = %self.id,
            calls = report.calls,
            input_tokens = report.input_tokens,
            output_tokens = report.output_tokens,
            total_cost_usd = report.total_cost_usd,
            "Total cost: ${:.4}",
            report.total_cost_usd
        );

        self.write_summary(&report)?;
        self.report = Some(report.clone());
        Ok(report)
    }
}
