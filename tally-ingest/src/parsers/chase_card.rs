//! Chase card statement line extractor (text)
//!
//! Expected extracted-text rows, one transaction per line:
//!   01/02 INSTACART HTTPSINSTACAR CA 183.53
//!   01/10 DOORDASH*TROPICAL SMOO WWW.DOORDASH. CA 72.19
//!
//! Anything else (headers, totals, wrapped descriptions) is skipped.

use std::sync::OnceLock;

use regex::Regex;
use tally_core::RawTransaction;

fn txn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // DATE DESCRIPTION AMOUNT; description is lazy so the amount is the last token.
        // ASCII digits only, `\d` also matches other scripts' digits.
        Regex::new(concat!(
            r"^(?P<date>[0-9]{2}/[0-9]{2})\s+",
            r"(?P<desc>.+?)\s+",
            r"(?P<amount>[0-9]+\.[0-9]{2})$"
        ))
        .expect("transaction line regex")
    })
}

/// Parse a single statement line. Returns `None` for non-transaction lines.
pub fn parse_line(line: &str) -> Option<RawTransaction> {
    let caps = txn_re().captures(line)?;
    let amount: f64 = caps["amount"].parse().ok()?;

    Some(RawTransaction {
        date: caps["date"].to_string(),
        description: caps["desc"].trim().to_string(),
        amount,
    })
}

/// Extract candidate transactions from full statement text.
///
/// Best effort: lines that don't match are dropped silently, so an
/// unfamiliar layout yields an empty list rather than an error.
pub fn extract(text: &str) -> Vec<RawTransaction> {
    text.lines().filter_map(parse_line).collect()
}
