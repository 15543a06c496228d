use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;

use crate::error::Result;
use super::super::issue::{Issue, IssueCategory, IssueIdGenerator, IssueStatus, Severity};
use super::super::paths;
use super::run_tool;

/// Producer that invokes the project's type-checker and parses its
/// line-oriented diagnostics, e.g.
/// `src/app.ts(12,5): error TS2322: Type 'string' is not assignable ...`
pub struct TypecheckAdapter {
    command: Vec<String>,
    source_root: PathBuf,
    max_output_bytes: usize,
    id_gen: Arc<IssueIdGenerator>,
}

impl TypecheckAdapter {
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

    /// Run the type-checker and import its diagnostics
    pub async fn run(&self) -> Result<Vec<Issue>> {
        let output = run_tool(&self.command, &self.source_root, self.max_output_bytes).await?;
        Ok(self.parse_output(&output))
    }

    /// Parse the tool's full output. All text-format assumptions live here so
    /// a format change from the tool is a one-function fix. Lines that do not
    /// match the diagnostic shape, and diagnostics outside the source root
    /// (dependency code), are silently dropped.
    pub fn parse_output(&self, output: &str) -> Vec<Issue> {
        let line_re = diagnostic_regex();
        let mut issues = Vec::new();

        for raw_line in output.lines() {
            let Some(caps) = line_re.captures(raw_line.trim_end()) else {
                continue;
            };

            let path = Path::new(&caps[1]);
            let resolved = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.source_root.join(path)
            };
            if !paths::is_within(&resolved, &self.source_root) {
                continue;
            }

            let line: u32 = caps[2].parse().unwrap_or(1);
            let column: u32 = caps[3].parse().unwrap_or(1);
            let severity = match &caps[4] {
                "error" => Severity::Error,
                "warning" => Severity::Warning,
                _ => Severity::Info,
            };
            let code = caps[5].to_string();
            let message = caps[6].to_string();

            let relative_path = paths::normalize(&resolved)
                .strip_prefix(paths::normalize(&self.source_root))
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|_| resolved.to_string_lossy().to_string());

            issues.push(Issue {
                id: self.id_gen.next_id(),
                file_path: resolved,
                relative_path,
                line,
                column,
                end_line: None,
                end_column: None,
                message,
                category: IssueCategory::TypeSystem,
                severity,
                rule: Some(code),
                code_snippet: String::new(),
                status: IssueStatus::Open,
                detected_at: chrono::Utc::now(),
            });
        }

        issues
    }
}

fn diagnostic_regex() -> Regex {
    // path(line,col): severity code: message
    Regex::new(r"^(.+?)\((\d+),(\d+)\): (error|warning|info) ([A-Za-z0-9]+): (.+)$")
        .expect("diagnostic line regex must compile")
}
