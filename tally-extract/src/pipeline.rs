//! End-to-end run: document text -> candidate rows -> structured extraction.
//!
//! The session recorder is finalized exactly once per run, also when a stage
//! fails, so the cost of tokens already spent is always reported.

use std::path::Path;

use tally_core::{
    CostReport, ExtractionError, ExtractionResult, RawTransaction, SessionRecorder, UsageRecorder,
};
use tally_ingest::{SourceError, TextSource, extract};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::client::ExtractionClient;
use crate::prompt::render_candidates;
use crate::service::StructuredService;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("render candidate rows: {0}")]
    Render(#[from] serde_json::Error),
}

/// What the model is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentMode {
    /// Only the rows matched by the line extractor
    #[default]
    Candidates,
    /// The full document text
    Raw,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub candidates: Vec<RawTransaction>,
    pub result: ExtractionResult,
    /// `None` when the session could not be finalized
    pub cost: Option<CostReport>,
}

pub async fn run<T, S, R>(
    source: &T,
    client: &ExtractionClient<S>,
    recorder: &mut R,
    path: &Path,
    statement_kind: &str,
    mode: ContentMode,
) -> Result<RunOutput, PipelineError>
where
    T: TextSource + ?Sized,
    S: StructuredService,
    R: SessionRecorder + Send,
{
    info!(prefix = "start", path = %path.display(), kind = statement_kind, "Starting statement processing");

    let outcome = process(source, client, &mut *recorder, path, statement_kind, mode).await;
    if let Err(e) = &outcome {
        error!(prefix = "error", "Error during processing: {e}");
    }

    let cost = match recorder.finalize() {
        Ok(report) => Some(report),
        Err(e) => {
            error!(prefix = "cost", "could not finalize session: {e}");
            None
        }
    };

    let (candidates, result) = outcome?;
    info!(prefix = "success", statements = result.len(), "Processing completed successfully");

    Ok(RunOutput {
        candidates,
        result,
        cost,
    })
}

async fn process<T, S, R>(
    source: &T,
    client: &ExtractionClient<S>,
    recorder: &mut R,
    path: &Path,
    statement_kind: &str,
    mode: ContentMode,
) -> Result<(Vec<RawTransaction>, ExtractionResult), PipelineError>
where
    T: TextSource + ?Sized,
    S: StructuredService,
    R: SessionRecorder + Send,
{
    info!(prefix = "pdf", "Processing PDF file");
    let text = source.read_text(path)?;

    let candidates = extract(&text);
    info!(prefix = "pdf", candidates = candidates.len(), "PDF conversion completed");
    if candidates.is_empty() {
        warn!(prefix = "extract", "no transaction lines matched the statement layout");
    }

    let content = match mode {
        ContentMode::Candidates => render_candidates(&candidates)?,
        ContentMode::Raw => text,
    };

    let result = client
        .extract_structured(&content, statement_kind, Some(recorder as &mut (dyn UsageRecorder + Send)))
        .await?;

    Ok((candidates, result))
}
