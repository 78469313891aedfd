use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tally_extract::{ContentMode, ExtractionClient, OpenAiService, run};
use tally_ingest::{PdfTextSource, SourceConfig, TextSource, extract};

mod config;
mod logging;
mod output;
mod session;
mod state;

use session::Session;

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TALLY_BUILD_SHA"), ")"),
    about = "Turn statement PDFs into categorized transactions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract, categorize and cost a statement (calls the LLM)
    Process {
        /// Statement PDF (or pre-extracted .txt)
        path: PathBuf,

        /// Statement label used in the prompt, e.g. "bank" or "Credit Card"
        #[arg(long, default_value = "Credit Card")]
        kind: String,

        /// Send the full document text instead of the matched rows
        #[arg(long)]
        raw: bool,

        /// Print statements as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run only the deterministic line extractor (no API key needed)
    Parse {
        path: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Manage ~/.tally/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config file if none exists
    Init,

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Process {
            path,
            kind,
            raw,
            json,
        } => {
            let mode = if raw { ContentMode::Raw } else { ContentMode::Candidates };
            process(&path, &kind, mode, json).await?;
        }

        Command::Parse { path, json } => {
            logging::init(None);
            let text = PdfTextSource::new(SourceConfig::default())
                .read_text(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let rows = extract(&text);
            if json {
                output::print_json(&rows)?;
            } else {
                output::print_candidates(&rows);
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg = config::load_config()?;
                println!("# {}", config::config_path()?.display());
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
                println!("# sessions: {}", cfg.sessions_dir()?.display());
            }
        },
    }

    Ok(())
}

async fn process(path: &Path, kind: &str, mode: ContentMode, json: bool) -> Result<()> {
    // Nothing is created on disk and no request is sent before the key is known
    let api_key = config::load_api_key()?;
    let cfg = config::load_config()?;

    let mut session = Session::create(&cfg.sessions_dir()?, cfg.llm.model.clone(), cfg.rate_table())?;
    logging::init(Some(session.open_log()?));
    tracing::info!(prefix = "start", session = session.id(), log = %session.log_path().display(), "session started");

    let source = PdfTextSource::new(SourceConfig::default());
    let service = OpenAiService::new(cfg.client_config(api_key))?;
    let client = ExtractionClient::new(service, cfg.llm.model.clone());

    let outcome = run(&source, &client, &mut session, path, kind, mode).await;

    if let Some(report) = session.report() {
        output::print_cost(report);
    }
    let out = outcome.with_context(|| format!("processing {}", path.display()))?;

    if json {
        output::print_json(out.result.statements())?;
    } else {
        output::print_statements(&out.result);
    }
    eprintln!("Session report: {}", session.report_path().display());

    Ok(())
}
