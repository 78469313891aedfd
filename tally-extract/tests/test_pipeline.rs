mod common;

use std::io::Write;
use std::path::Path;

use common::{CountingRecorder, ScriptedService, three_statements, usage};
use tally_core::{ExtractionError, ExtractionErrorKind};
use tally_extract::{ContentMode, ExtractionClient, PipelineError, run};
use tally_ingest::PdfTextSource;

const STATEMENT_TEXT: &str = "\
ACCOUNT ACTIVITY
Transaction Merchant Name or Transaction Description $ Amount
01/02 INSTACART HTTPSINSTACAR CA 183.53
12/28 Payment Thank You - Web 15925.89
01/10 DOORDASH*TROPICAL SMOO WWW.DOORDASH. CA 72.19
Totals Year-to-Date
";

fn statement_file() -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    write!(f, "{STATEMENT_TEXT}").unwrap();
    f
}

#[tokio::test]
async fn test_three_lines_three_statements_one_call() {
    let file = statement_file();
    let client = ExtractionClient::new(
        ScriptedService::new(vec![Ok((three_statements(), usage(100, 50)))]),
        "gpt-4o-mini",
    );
    let mut recorder = CountingRecorder::default();

    let out = run(
        &PdfTextSource::default(),
        &client,
        &mut recorder,
        file.path(),
        "Credit Card",
        ContentMode::Candidates,
    )
    .await
    .unwrap();

    assert_eq!(out.candidates.len(), 3);
    assert_eq!(out.result.len(), 3);
    assert_eq!(recorder.finalized, 1);

    let cost = out.cost.unwrap();
    assert_eq!(cost.calls, 1);
    assert_eq!(cost.input_tokens, 100);
    assert_eq!(cost.output_tokens, 50);
    assert!(cost.total_cost_usd > 0.0);
}

#[tokio::test]
async fn test_candidates_mode_sends_rows_not_raw_text() {
    let file = statement_file();
    let client = ExtractionClient::new(
        ScriptedService::new(vec![Ok((three_statements(), None))]),
        "gpt-4o-mini",
    );
    let mut recorder = CountingRecorder::default();

    run(
        &PdfTextSource::default(),
        &client,
        &mut recorder,
        file.path(),
        "Credit Card",
        ContentMode::Candidates,
    )
    .await
    .unwrap();

    let req = client.service().last_request();
    assert!(req.user.contains("\"Description\": \"Payment Thank You - Web\""));
    assert!(!req.user.contains("Totals Year-to-Date"));
}

#[tokio::test]
async fn test_raw_mode_sends_document_text() {
    let file = statement_file();
    let client = ExtractionClient::new(
        ScriptedService::new(vec![Ok((three_statements(), None))]),
        "gpt-4o-mini",
    );
    let mut recorder = CountingRecorder::default();

    run(
        &PdfTextSource::default(),
        &client,
        &mut recorder,
        file.path(),
        "bank",
        ContentMode::Raw,
    )
    .await
    .unwrap();

    assert!(client.service().last_request().user.contains("Totals Year-to-Date"));
}

#[tokio::test]
async fn test_finalize_runs_once_when_extraction_fails() {
    let file = statement_file();
    let client = ExtractionClient::new(
        ScriptedService::new(vec![Err(ExtractionError::network("connection reset"))]),
        "gpt-4o-mini",
    );
    let mut recorder = CountingRecorder::default();

    let err = run(
        &PdfTextSource::default(),
        &client,
        &mut recorder,
        file.path(),
        "Credit Card",
        ContentMode::Candidates,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Extraction(ExtractionError { kind: ExtractionErrorKind::Network, .. })
    ));
    assert_eq!(recorder.finalized, 1);
}

#[tokio::test]
async fn test_failed_run_reports_tokens_already_spent() {
    let file = statement_file();
    let client = ExtractionClient::new(
        ScriptedService::new(vec![Err(
            ExtractionError::schema("no schema-conformant reply after 2 attempt(s)").with_usage(usage(2000, 1000)),
        )]),
        "gpt-4o-mini",
    );
    let mut recorder = CountingRecorder::default();

    let err = run(
        &PdfTextSource::default(),
        &client,
        &mut recorder,
        file.path(),
        "Credit Card",
        ContentMode::Candidates,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Extraction(ExtractionError { kind: ExtractionErrorKind::SchemaValidation, .. })
    ));
    assert_eq!(recorder.finalized, 1);
    assert_eq!(recorder.ledger.total_input_tokens(), 2000);
    assert_eq!(recorder.ledger.total_output_tokens(), 1000);
}

#[tokio::test]
async fn test_finalize_runs_once_when_document_missing() {
    let client = ExtractionClient::new(ScriptedService::new(vec![]), "gpt-4o-mini");
    let mut recorder = CountingRecorder::default();

    let err = run(
        &PdfTextSource::default(),
        &client,
        &mut recorder,
        Path::new("/no/such/statement.pdf"),
        "Credit Card",
        ContentMode::Candidates,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::Source(_)));
    assert_eq!(recorder.finalized, 1);
    assert_eq!(client.service().calls(), 0);
}

#[tokio::test]
async fn test_finalize_failure_keeps_successful_result() {
    let file = statement_file();
    let client = ExtractionClient::new(
        ScriptedService::new(vec![Ok((three_statements(), usage(1, 1)))]),
        "gpt-4o-mini",
    );
    let mut recorder = CountingRecorder {
        fail_finalize: true,
        ..Default::default()
    };

    let out = run(
        &PdfTextSource::default(),
        &client,
        &mut recorder,
        file.path(),
        "Credit Card",
        ContentMode::Candidates,
    )
    .await
    .unwrap();

    assert_eq!(out.result.len(), 3);
    assert!(out.cost.is_none());
    assert_eq!(recorder.finalized, 1);
}

#[tokio::test]
async fn test_unmatched_layout_still_calls_service() {
    let mut f = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    write!(f, "Account Summary\nPage 1 of 2\n").unwrap();

    let client = ExtractionClient::new(
        ScriptedService::new(vec![Ok((serde_json::json!({"data": []}), usage(20, 2)))]),
        "gpt-4o-mini",
    );
    let mut recorder = CountingRecorder::default();

    let out = run(
        &PdfTextSource::default(),
        &client,
        &mut recorder,
        f.path(),
        "bank",
        ContentMode::Candidates,
    )
    .await
    .unwrap();

    assert!(out.candidates.is_empty());
    assert!(out.result.is_empty());
    assert!(client.service().last_request().user.contains("Text:\n[]"));
}
