//! tally-ingest: document text sources and line-pattern statement parsers.

pub mod parsers;
pub mod source;

pub use parsers::chase_card::extract;
pub use source::{PdfTextSource, SourceConfig, SourceError, TextSource};
