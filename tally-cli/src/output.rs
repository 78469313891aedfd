//! Terminal rendering of candidates, statements and cost.

use anyhow::Result;
use serde::Serialize;
use tally_core::{CostReport, ExtractionResult, RawTransaction};

const DESC_WIDTH: usize = 42;

fn clip(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_candidates(rows: &[RawTransaction]) {
    println!("{:<6} {:<DESC_WIDTH$} {:>12}", "DATE", "DESCRIPTION", "AMOUNT");
    for r in rows {
        println!(
            "{:<6} {:<DESC_WIDTH$} {:>12.2}",
            r.date,
            clip(&r.description, DESC_WIDTH),
            r.amount
        );
    }
    println!("\n{} candidate transaction(s)", rows.len());
}

pub fn print_statements(result: &ExtractionResult) {
    println!(
        "{:<10} {:<DESC_WIDTH$} {:>12}  {:<8} {:<16} {}",
        "DATE", "DESCRIPTION", "AMOUNT", "CATEGORY", "SUBCATEGORY", "ANALYSIS"
    );
    for s in result {
        println!(
            "{:<10} {:<DESC_WIDTH$} {:>12.2}  {:<8} {:<16} {}",
            clip(&s.date, 10),
            clip(&s.description, DESC_WIDTH),
            s.amount,
            clip(&s.category, 8),
            clip(&s.subcategory, 16),
            s.analysis
        );
    }
    println!("\n{} statement(s), net {:.2}", result.len(), result.net_amount());
}

pub fn print_cost(report: &CostReport) {
    eprintln!("Cost: {}", report.summary());
}
