use crate::types::{BatchItem, ItemStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Solved batch ready for download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    pub reg_number: String,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub solved: usize,
    pub generation_failed: usize,
    pub execution_failed: usize,
    pub no_output: usize,
}

impl ReportSummary {
    pub fn from_items(items: &[BatchItem]) -> Self {
        let mut summary = ReportSummary {
            total: items.len(),
            ..Default::default()
        };
        for item in items {
            match item.status {
                ItemStatus::Solved => summary.solved += 1,
                ItemStatus::GenerationFailed => summary.generation_failed += 1,
                ItemStatus::ExecutionFailed => summary.execution_failed += 1,
                ItemStatus::NoOutput => summary.no_output += 1,
            }
        }
        summary
    }
}

impl Report {
    pub fn new(name: impl Into<String>, reg_number: impl Into<String>, items: Vec<BatchItem>) -> Self {
        Self {
            name: name.into(),
            reg_number: reg_number.into(),
            generated_at: Utc::now(),
            summary: ReportSummary::from_items(&items),
            items,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Markdown rendering: question, code solution and captured output per item
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Name: {}", heading_text(&self.name));
        let _ = writeln!(out, "# Register Number: {}", heading_text(&self.reg_number));
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "_Generated {} · {} of {} solved_",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.summary.solved,
            self.summary.total
        );

        for item in &self.items {
            let _ = writeln!(out);
            let _ = writeln!(out, "## Question {}:", item.index + 1);
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", item.question.trim());
            let _ = writeln!(out);
            let _ = writeln!(out, "### Code Solution:");
            let _ = writeln!(out);
            push_fenced(&mut out, item.code.trim());
            let _ = writeln!(out);
            let _ = writeln!(out, "### Final Output:");
            let _ = writeln!(out);
            push_fenced(&mut out, item.output.trim_end());
            let _ = writeln!(out);
            let _ = writeln!(out, "---");
        }

        out
    }
}

// Headings are single-line: collapse every whitespace run, newlines included
fn heading_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Fence one backtick longer than any run inside the body
fn push_fenced(out: &mut String, body: &str) {
    let mut longest = 0;
    let mut run = 0;
    for c in body.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    let fence = "`".repeat((longest + 1).max(3));
    let _ = writeln!(out, "{}", fence);
    let _ = writeln!(out, "{}", body);
    let _ = writeln!(out, "{}", fence);
}
