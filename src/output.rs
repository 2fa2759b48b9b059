//! Output formatting for command results.
//!
//! Text output renders aligned tables; JSON output serializes the result
//! object as-is.

use crate::cli::OutputFormat;
use odps_review::review::{QueryCheck, ResultSet, ReviewSet};
use serde::Serialize;

/// Formats result objects for stdout.
pub struct Renderer {
    format: OutputFormat,
}

impl Renderer {
    /// Creates a new output formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn result_set(&self, result: &ResultSet) -> String {
        match self.format {
            OutputFormat::Json => to_json(result),
            OutputFormat::Text => {
                if let Some(error) = result.error.as_deref().filter(|e| !e.is_empty()) {
                    return format!("Error: {error}\n");
                }
                let rows: Vec<Vec<String>> = result
                    .rows
                    .iter()
                    .map(|row| row.iter().map(|v| v.to_display_string()).collect())
                    .collect();
                format!(
                    "{}({} rows)\n",
                    render_table(&result.column_list, &rows),
                    result.affected_rows
                )
            }
        }
    }

    pub fn review_set(&self, review: &ReviewSet) -> String {
        match self.format {
            OutputFormat::Json => to_json(review),
            OutputFormat::Text => {
                let headers = ["id", "errlevel", "stage", "message", "rows", "time", "sql"]
                    .map(String::from);
                let rows: Vec<Vec<String>> = review
                    .rows
                    .iter()
                    .map(|r| {
                        vec![
                            r.id.to_string(),
                            r.errlevel.as_u8().to_string(),
                            r.stagestatus.to_string(),
                            r.errormessage.clone(),
                            r.affected_rows.to_string(),
                            format!("{:.3}s", r.execute_time.as_secs_f64()),
                            single_line(&r.sql),
                        ]
                    })
                    .collect();

                let mut out = String::new();
                if !rows.is_empty() {
                    out.push_str(&render_table(&headers, &rows));
                }
                if let Some(error) = review.error.as_deref().filter(|e| !e.is_empty()) {
                    out.push_str(&format!("Error: {error}\n"));
                }
                if review.error_count > 0 {
                    out.push_str(&format!("{} statement(s) rejected\n", review.error_count));
                }
                out
            }
        }
    }

    pub fn query_check(&self, check: &QueryCheck) -> String {
        match self.format {
            OutputFormat::Json => to_json(check),
            OutputFormat::Text => {
                let mut out = if check.bad_query {
                    format!("Rejected: {}\n", check.msg)
                } else {
                    format!("OK: {}\n", single_line(&check.filtered_sql))
                };
                if check.has_star {
                    out.push_str("Warning: query selects *\n");
                }
                out
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .map(|json| json + "\n")
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize: {}\"}}\n", e))
}

fn single_line(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Renders headers and rows as a left-aligned table.
fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
    }

    let format_line = |cells: &[String]| {
        let line = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" | ");
        format!("{}\n", line.trim_end())
    };

    let mut out = format_line(headers);
    let separator = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("-+-");
    out.push_str(&separator);
    out.push('\n');
    for row in rows {
        out.push_str(&format_line(row));
    }
    out
}
