use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a finding. The derived ordering ranks `Error` first so that
/// sorting a result set surfaces the most important findings at the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Rank used for result ordering: error < warning < info
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        }
    }
}

/// Closed set of issue categories shared by all producers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    TypeSystem,
    Lint,
    Structural,
    Security,
    Style,
    Other,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::TypeSystem => "type-system",
            IssueCategory::Lint => "lint",
            IssueCategory::Structural => "structural",
            IssueCategory::Security => "security",
            IssueCategory::Style => "style",
            IssueCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "type-system" => Some(IssueCategory::TypeSystem),
            "lint" => Some(IssueCategory::Lint),
            "structural" => Some(IssueCategory::Structural),
            "security" => Some(IssueCategory::Security),
            "style" => Some(IssueCategory::Style),
            "other" => Some(IssueCategory::Other),
            _ => None,
        }
    }
}

/// Lifecycle state of an issue. The analysis pipeline always emits `Open`;
/// only the consumer moves an issue to `Ignored` or `Fixed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    Ignored,
    Fixed,
}

/// One normalized finding from any producer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Opaque session-scoped identifier. Not stable across analysis runs;
    /// consumers must not persist it.
    pub id: String,

    /// Absolute path of the file containing the finding
    pub file_path: PathBuf,

    /// Path relative to the analyzed source root
    pub relative_path: String,

    /// 1-based position of the finding
    pub line: u32,
    pub column: u32,
    pub end_line: Option<u32>,
    pub end_column: Option<u32>,

    /// Human-readable description
    pub message: String,

    pub category: IssueCategory,
    pub severity: Severity,

    /// Identifier of the originating rule or diagnostic code
    pub rule: Option<String>,

    /// Surrounding source text captured at discovery time; may go stale
    pub code_snippet: String,

    pub status: IssueStatus,

    /// Timestamp of discovery
    pub detected_at: DateTime<Utc>,
}

impl Issue {
    /// Identity used to collapse duplicate findings across producers
    pub fn dedup_key(&self) -> (String, u32, String) {
        (self.relative_path.clone(), self.line, self.message.clone())
    }
}

/// Generates session-scoped issue identifiers: a per-run nonce plus a
/// monotonically incrementing counter. Deliberately not a content hash.
#[derive(Debug)]
pub struct IssueIdGenerator {
    nonce: String,
    counter: AtomicU64,
}

impl IssueIdGenerator {
    pub fn new() -> Self {
        Self {
            nonce: format!("{:x}", Utc::now().timestamp_millis()),
            counter: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.nonce, n)
    }
}

impl Default for IssueIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate output of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Deduplicated, sorted findings
    pub issues: Vec<Issue>,

    /// Size of the enumerated source corpus, independent of issue counts
    pub files_analyzed: usize,

    /// Wall-clock duration of the parallel producer fan-out
    pub analysis_time_ms: u64,

    pub last_analysis: DateTime<Utc>,

    /// Producer-level failures; a failed producer degrades the result set
    /// instead of failing the run
    pub errors: Vec<String>,
}

impl AnalysisResult {
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// A proposed fix from the external suggestion collaborator. Ephemeral and
/// untrusted: held only for one review-and-apply cycle, never auto-applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixSuggestion {
    pub original_code: String,
    pub fixed_code: String,
    pub explanation: String,

    /// Provider confidence, 0-100
    pub confidence: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_rank_order() {
        assert!(Severity::Error.rank() < Severity::Warning.rank());
        assert!(Severity::Warning.rank() < Severity::Info.rank());
        assert!(Severity::Error < Severity::Warning);
    }

    #[test]
    fn test_category_parse_roundtrip() {
        for cat in [
            IssueCategory::TypeSystem,
            IssueCategory::Lint,
            IssueCategory::Structural,
            IssueCategory::Security,
            IssueCategory::Style,
            IssueCategory::Other,
        ] {
            assert_eq!(IssueCategory::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(IssueCategory::parse("bogus"), None);
    }

    #[test]
    fn test_id_generator_unique() {
        let gen = IssueIdGenerator::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert_ne!(a, b);
        assert!(a.starts_with(&gen.nonce));
    }
}
