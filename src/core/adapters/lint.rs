use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Result, TriageError};
use super::super::issue::{Issue, IssueCategory, IssueIdGenerator, IssueStatus, Severity};
use super::super::paths;
use super::run_tool;

/// One file entry in the lint tool's JSON report
#[derive(Debug, Deserialize)]
struct FileReport {
    #[serde(rename = "filePath")]
    file_path: String,
    messages: Vec<LintMessage>,
}

/// One diagnostic inside a file entry. The tool marks severity numerically:
/// 2 is an error, anything else is treated as a warning.
#[derive(Debug, Deserialize)]
struct LintMessage {
    #[serde(rename = "ruleId")]
    rule_id: Option<String>,
    severity: u8,
    message: String,
    #[serde(default = "default_position")]
    line: u32,
    #[serde(default = "default_position")]
    column: u32,
    #[serde(rename = "endLine")]
    end_line: Option<u32>,
    #[serde(rename = "endColumn")]
    end_column: Option<u32>,
}

fn default_position() -> u32 {
    1
}

/// Producer that invokes the lint tool and flattens its per-file JSON report
pub struct LintAdapter {
    command: Vec<String>,
    source_root: PathBuf,
    max_output_bytes: usize,
    id_gen: Arc<IssueIdGenerator>,
}

impl LintAdapter {
    pub fn new(
        command: Vec<String>,
        source_root: PathBuf,
        max_output_bytes: usize,
        id_gen: Arc<IssueIdGenerator>,
    ) -> Self {
        Self {
            command,
            source_root,
            max_output_bytes,
            id_gen,
        }
    }

    /// Run the lint tool and import its report
    pub async fn run(&self) -> Result<Vec<Issue>> {
        let output = run_tool(&self.command, &self.source_root, self.max_output_bytes).await?;
        self.parse_report(&output)
    }

    /// Parse the machine-readable report. A report that is not valid JSON is
    /// a producer failure; an empty report contributes zero issues.
    pub fn parse_report(&self, output: &str) -> Result<Vec<Issue>> {
        let trimmed = output.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let reports: Vec<FileReport> = serde_json::from_str(trimmed)
            .map_err(|e| TriageError::Producer(format!("unparseable lint report: {}", e)))?;

        let mut issues = Vec::new();
        for report in reports {
            let file_path = PathBuf::from(&report.file_path);
            let relative_path = paths::normalize(&file_path)
                .strip_prefix(paths::normalize(&self.source_root))
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|_| report.file_path.clone());

            for msg in report.messages {
                let severity = if msg.severity == 2 {
                    Severity::Error
                } else {
                    Severity::Warning
                };

                issues.push(Issue {
                    id: self.id_gen.next_id(),
                    file_path: file_path.clone(),
                    relative_path: relative_path.clone(),
                    line: msg.line,
                    column: msg.column,
                    end_line: msg.end_line,
                    end_column: msg.end_column,
                    message: msg.message,
                    category: IssueCategory::Lint,
                    severity,
                    rule: msg.rule_id,
                    code_snippet: String::new(),
                    status: IssueStatus::Open,
                    detected_at: chrono::Utc::now(),
                });
            }
        }

        Ok(issues)
    }
}
