use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TriageError};
use super::issue::{Issue, IssueCategory, IssueIdGenerator, IssueStatus, Severity};

/// Declarative rule definition as authored in configuration. Patterns are
/// plain regular expressions; the engine always applies them with multi-match
/// semantics, so authors never need a "global" marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: String,
    pub category: IssueCategory,
    pub severity: Severity,
    pub pattern: String,
    pub message: String,

    /// Extensions (without the dot) this rule applies to; absent means all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extensions: Option<Vec<String>>,

    /// Path substrings that exempt a file from this rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_paths: Option<Vec<String>>,
}

/// TOML document shape for a rule override file
#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<RuleSpec>,
}

/// A rule with its pattern compiled. Compilation happens once at load time so
/// a malformed pattern aborts startup instead of surfacing per-file.
#[derive(Debug, Clone)]
pub struct Rule {
    pub spec: RuleSpec,
    pub regex: Regex,
}

impl Rule {
    fn compile(spec: RuleSpec) -> Result<Self> {
        let regex = Regex::new(&spec.pattern).map_err(|e| TriageError::RuleConfig {
            rule_id: spec.id.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { spec, regex })
    }

    /// Whether this rule applies to the given file
    fn applies_to(&self, path: &str, extension: &str) -> bool {
        if let Some(ref exts) = self.spec.file_extensions {
            if !exts.iter().any(|e| e == extension) {
                return false;
            }
        }
        if let Some(ref excludes) = self.spec.exclude_paths {
            if excludes.iter().any(|sub| path.contains(sub.as_str())) {
                return false;
            }
        }
        true
    }
}

/// The validated, immutable rule set loaded once at engine construction
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Compile a set of specs, failing fast on the first invalid pattern
    pub fn from_specs(specs: Vec<RuleSpec>) -> Result<Self> {
        let rules = specs
            .into_iter()
            .map(Rule::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Load rules from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: RuleFile =
            toml::from_str(&content).map_err(|e| TriageError::Config(e.to_string()))?;
        Self::from_specs(file.rules)
    }

    /// The built-in default rule set
    pub fn builtin() -> Self {
        Self::from_specs(builtin_specs()).expect("built-in rules must compile")
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn builtin_specs() -> Vec<RuleSpec> {
    vec![
        RuleSpec {
            id: "quality-debugger".to_string(),
            category: IssueCategory::Style,
            severity: Severity::Error,
            pattern: r"\bdebugger\b".to_string(),
            message: "debugger statement left in source".to_string(),
            file_extensions: None,
            exclude_paths: None,
        },
        RuleSpec {
            id: "quality-console-log".to_string(),
            category: IssueCategory::Style,
            severity: Severity::Warning,
            pattern: r"console\.(log|debug)\s*\(".to_string(),
            message: "console logging left in source".to_string(),
            file_extensions: None,
            exclude_paths: Some(vec![".test.".to_string(), ".spec.".to_string()]),
        },
        RuleSpec {
            id: "security-eval".to_string(),
            category: IssueCategory::Security,
            severity: Severity::Error,
            pattern: r"\beval\s*\(".to_string(),
            message: "eval() on dynamic input".to_string(),
            file_extensions: None,
            exclude_paths: None,
        },
        RuleSpec {
            id: "security-inner-html".to_string(),
            category: IssueCategory::Security,
            severity: Severity::Warning,
            pattern: r"dangerouslySetInnerHTML|\.innerHTML\s*=".to_string(),
            message: "raw HTML injection point".to_string(),
            file_extensions: None,
            exclude_paths: None,
        },
        RuleSpec {
            id: "structural-ts-ignore".to_string(),
            category: IssueCategory::Structural,
            severity: Severity::Warning,
            pattern: r"@ts-ignore".to_string(),
            message: "@ts-ignore suppresses type checking".to_string(),
            file_extensions: Some(vec!["ts".to_string(), "tsx".to_string()]),
            exclude_paths: None,
        },
        RuleSpec {
            id: "structural-explicit-any".to_string(),
            category: IssueCategory::Structural,
            severity: Severity::Info,
            pattern: r":\s*any\b".to_string(),
            message: "explicit any defeats the type system".to_string(),
            file_extensions: Some(vec!["ts".to_string(), "tsx".to_string()]),
            exclude_paths: None,
        },
    ]
}

/// Scans file contents against the validated rule set
pub struct PatternRuleEngine {
    rule_set: RuleSet,
    id_gen: Arc<IssueIdGenerator>,
}

impl PatternRuleEngine {
    pub fn new(rule_set: RuleSet, id_gen: Arc<IssueIdGenerator>) -> Self {
        Self { rule_set, id_gen }
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    /// Run every applicable rule against one file's content. A filter limits
    /// which rule categories participate; `None` means all.
    pub fn run_rules(
        &self,
        file_path: &Path,
        relative_path: &str,
        content: &str,
        categories: Option<&[IssueCategory]>,
    ) -> Vec<Issue> {
        let extension = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let mut issues = Vec::new();

        // Split once per file; every match slices its snippet out of this
        // table instead of rescanning the content.
        let lines: Vec<&str> = content.lines().collect();

        for rule in self.rule_set.rules() {
            if let Some(filter) = categories {
                if !filter.contains(&rule.spec.category) {
                    continue;
                }
            }
            if !rule.applies_to(relative_path, extension) {
                continue;
            }

            // Matches arrive in ascending offset order, so line accounting
            // advances incrementally instead of rescanning the prefix per match.
            let mut line = 1u32;
            let mut line_start = 0usize;
            let mut scanned = 0usize;

            for m in rule.regex.find_iter(content) {
                for (i, b) in content[scanned..m.start()].bytes().enumerate() {
                    if b == b'\n' {
                        line += 1;
                        line_start = scanned + i + 1;
                    }
                }
                scanned = m.start();

                let column = (m.start() - line_start + 1) as u32;

                issues.push(Issue {
                    id: self.id_gen.next_id(),
                    file_path: file_path.to_path_buf(),
                    relative_path: relative_path.to_string(),
                    line,
                    column,
                    end_line: None,
                    end_column: None,
                    message: rule.spec.message.clone(),
                    category: rule.spec.category,
                    severity: rule.spec.severity,
                    rule: Some(rule.spec.id.clone()),
                    code_snippet: snippet_around(&lines, line),
                    status: IssueStatus::Open,
                    detected_at: chrono::Utc::now(),
                });
            }
        }

        issues
    }
}

/// Capture a window of up to three lines either side of `line` (1-based)
fn snippet_around(lines: &[&str], line: u32) -> String {
    let idx = (line as usize).saturating_sub(1);
    let start = idx.saturating_sub(3);
    let end = (idx + 4).min(lines.len());
    lines[start..end].join("\n")
}
