//! Document text sources.
//!
//! PDFs go through `pdf-extract`; configured plain-text extensions are read
//! as-is so pre-extracted statements can be fed through the same pipeline.

use std::fs;
use std::panic;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("could not read {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },
}

/// Produces the full text of a document.
pub trait TextSource {
    fn read_text(&self, path: &Path) -> Result<String, SourceError>;
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Extensions (lowercase, no dot) read directly instead of parsed as PDF
    pub plain_text_extensions: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            plain_text_extensions: vec!["txt".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PdfTextSource {
    config: SourceConfig,
}

impl PdfTextSource {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    fn is_plain_text(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| self.config.plain_text_extensions.contains(&e))
    }
}

impl TextSource for PdfTextSource {
    fn read_text(&self, path: &Path) -> Result<String, SourceError> {
        if !path.is_file() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }

        let unreadable = |reason: String| SourceError::Unreadable {
            path: path.to_path_buf(),
            reason,
        };

        let text = if self.is_plain_text(path) {
            fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?
        } else {
            extract_pdf_text(path).map_err(unreadable)?
        };

        debug!(prefix = "pdf", path = %path.display(), chars = text.len(), "document text extracted");
        Ok(text)
    }
}

/// `pdf-extract` panics on some malformed documents (unknown encodings,
/// broken font tables) instead of returning an error.
fn extract_pdf_text(path: &Path) -> Result<String, String> {
    match panic::catch_unwind(|| pdf_extract::extract_text(path)) {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(prefix = "pdf", path = %path.display(), %reason, "pdf parser panicked");
            Err(format!("pdf parser failed: {reason}"))
        }
    }
}
