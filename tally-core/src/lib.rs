//! tally-core: transaction types, error taxonomy and token usage accounting

pub mod error;
pub mod transaction;
pub mod usage;

pub use error::{ExtractionError, ExtractionErrorKind, RecorderError};
pub use transaction::{ExtractionResult, RawTransaction, Statement};
pub use usage::{
    CostReport, Rate, RateTable, SessionRecorder, UsageEnvelope, UsageLedger, UsageRecord,
    UsageRecorder,
};
