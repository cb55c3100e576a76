//! Formatting and display utilities for query results.

use std::fmt::Write;

use fedra_core::{Row, RowSchema};
use fedra_engine::QueryResult;

const CELL_WIDTH: usize = 15;
const MAX_ROWS: usize = 100;

/// Print a query result as a table, or its error.
pub fn print_results(result: &QueryResult) {
    println!("\n{}", "=".repeat(60));
    match result.error() {
        Some(error) => println!("Query failed: {}", error),
        None => {
            print!("{}", format_rows(result.columns(), result.rows()));
            println!("Total rows: {}", result.row_count());
        }
    }
    println!("{}", "=".repeat(60));
}

/// Format rows as a fixed-width table, showing at most the first 100.
pub fn format_rows(columns: &RowSchema, rows: &[Row]) -> String {
    let mut output = String::new();
    if rows.is_empty() {
        output.push_str("(empty result set)\n");
        return output;
    }

    output.push_str("| ");
    for name in columns.names() {
        let _ = write!(output, "{:CELL_WIDTH$} | ", truncate(name, CELL_WIDTH));
    }
    output.push('\n');

    output.push('|');
    for _ in columns.names() {
        let _ = write!(output, "{:-<width$}|", "", width = CELL_WIDTH + 2);
    }
    output.push('\n');

    for row in rows.iter().take(MAX_ROWS) {
        output.push_str("| ");
        for value in row.values() {
            let _ = write!(output, "{:CELL_WIDTH$} | ", truncate(&value.to_string(), CELL_WIDTH));
        }
        output.push('\n');
    }
    if rows.len() > MAX_ROWS {
        let _ = writeln!(output, "... ({} more rows)", rows.len() - MAX_ROWS);
    }
    output
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "-".repeat(60));
}

/// Print a section header.
pub fn print_header(title: &str) {
    println!();
    println!("{}", "=".repeat(60));
    println!("  {}", title);
    println!("{}", "=".repeat(60));
}
