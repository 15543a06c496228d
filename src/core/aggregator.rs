use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, TriageError};
use super::adapters::{LintAdapter, TypecheckAdapter};
use super::enumerator::SourceEnumerator;
use super::issue::{AnalysisResult, Issue, IssueCategory, IssueIdGenerator};
use super::rules::{PatternRuleEngine, RuleSet};

/// Fans out to the three issue producers, fans their results back in,
/// deduplicates, and imposes the final ordering.
///
/// Producers share a read-only view of the filesystem and no mutable state,
/// so they run concurrently without locking. A producer failing turns into
/// one entry in `AnalysisResult::errors` and never aborts the run.
pub struct Analyzer {
    source_root: PathBuf,
    enumerator: SourceEnumerator,
    rule_engine: Arc<PatternRuleEngine>,
    typecheck: TypecheckAdapter,
    lint: LintAdapter,
}

impl Analyzer {
    pub fn new(config: &Config, rule_set: RuleSet) -> Self {
        let id_gen = Arc::new(IssueIdGenerator::new());
        let source_root = config.project.source_root.clone();

        Self {
            enumerator: SourceEnumerator::new(
                config.analysis.file_extensions.clone(),
                config.analysis.exclude_dirs.clone(),
            ),
            rule_engine: Arc::new(PatternRuleEngine::new(rule_set, Arc::clone(&id_gen))),
            typecheck: TypecheckAdapter::new(
                config.tools.typecheck_command.clone(),
                source_root.clone(),
                config.analysis.max_tool_output_bytes,
                Arc::clone(&id_gen),
            ),
            lint: LintAdapter::new(
                config.tools.lint_command.clone(),
                source_root.clone(),
                config.analysis.max_tool_output_bytes,
                id_gen,
            ),
            source_root,
        }
    }

    pub fn rule_engine(&self) -> &PatternRuleEngine {
        &self.rule_engine
    }

    /// Run a full or category-filtered analysis. An empty filter means all
    /// producers run.
    pub async fn analyze(&self, categories: Option<&[IssueCategory]>) -> AnalysisResult {
        let started = Instant::now();
        let files = self.enumerator.enumerate(&self.source_root);
        info!("Analyzing {} source files under {}", files.len(), self.source_root.display());

        let filter = categories.filter(|c| !c.is_empty());
        let run_typecheck = filter.map_or(true, |c| c.contains(&IssueCategory::TypeSystem));
        let run_lint = filter.map_or(true, |c| c.contains(&IssueCategory::Lint));

        let (rule_result, typecheck_result, lint_result) = tokio::join!(
            self.run_rule_producer(&files, filter),
            self.run_adapter(run_typecheck, self.typecheck.run()),
            self.run_adapter(run_lint, self.lint.run()),
        );

        let mut errors = Vec::new();
        // Fixed producer order makes the dedup winner deterministic
        // regardless of which task finished first.
        let mut merged = Vec::new();
        for (name, result) in [
            ("pattern-rules", rule_result),
            ("typecheck", typecheck_result),
            ("lint", lint_result),
        ] {
            match result {
                Ok(issues) => {
                    debug!("Producer {} contributed {} issues", name, issues.len());
                    merged.extend(issues);
                }
                Err(e) => {
                    warn!("Producer {} failed: {}", name, e);
                    errors.push(format!("{}: {}", name, e));
                }
            }
        }

        let mut issues = dedup_issues(merged);
        sort_issues(&mut issues);

        AnalysisResult {
            issues,
            files_analyzed: files.len(),
            analysis_time_ms: started.elapsed().as_millis() as u64,
            last_analysis: chrono::Utc::now(),
            errors,
        }
    }

    /// Run only the pattern rule engine against one already-resolved file,
    /// used when re-checking a just-edited file without a full-project pass.
    pub fn analyze_file(&self, resolved: &Path) -> Result<Vec<Issue>> {
        let content = std::fs::read_to_string(resolved)?;
        let relative = relative_path(&self.source_root, resolved);
        Ok(self
            .rule_engine
            .run_rules(resolved, &relative, &content, None))
    }

    /// Scan the corpus on a blocking task so the synchronous file reads
    /// neither stall the runtime worker nor run to completion before the
    /// adapter futures get their first poll.
    async fn run_rule_producer(
        &self,
        files: &[PathBuf],
        categories: Option<&[IssueCategory]>,
    ) -> Result<Vec<Issue>> {
        let engine = Arc::clone(&self.rule_engine);
        let source_root = self.source_root.clone();
        let files = files.to_vec();
        let categories = categories.map(|c| c.to_vec());

        tokio::task::spawn_blocking(move || {
            let mut issues = Vec::new();
            for file in &files {
                let content = match std::fs::read_to_string(file) {
                    Ok(c) => c,
                    Err(e) => {
                        // One unreadable file degrades coverage, not the producer
                        warn!("Skipping unreadable file {}: {}", file.display(), e);
                        continue;
                    }
                };
                let relative = relative_path(&source_root, file);
                issues.extend(engine.run_rules(file, &relative, &content, categories.as_deref()));
            }
            issues
        })
        .await
        .map_err(|e| TriageError::Producer(format!("rule scan task failed: {}", e)))
    }

    async fn run_adapter(
        &self,
        enabled: bool,
        run: impl std::future::Future<Output = Result<Vec<Issue>>>,
    ) -> Result<Vec<Issue>> {
        if !enabled {
            return Ok(Vec::new());
        }
        run.await.map_err(|e| match e {
            already @ TriageError::Producer(_) => already,
            other => TriageError::Producer(other.to_string()),
        })
    }
}

fn relative_path(source_root: &Path, path: &Path) -> String {
    path.strip_prefix(source_root)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.to_string_lossy().to_string())
}

/// Collapse duplicates on `(relative_path, line, message)`; first seen wins
fn dedup_issues(issues: Vec<Issue>) -> Vec<Issue> {
    let mut seen: HashSet<(String, u32, String)> = HashSet::new();
    issues
        .into_iter()
        .filter(|issue| seen.insert(issue.dedup_key()))
        .collect()
}

/// Stable sort by (severity rank, relative path, line)
fn sort_issues(issues: &mut [Issue]) {
    issues.sort_by(|a, b| {
        a.severity
            .rank()
            .cmp(&b.severity.rank())
            .then_with(|| a.relative_path.cmp(&b.relative_path))
            .then_with(|| a.line.cmp(&b.line))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::issue::Severity;
    use assert_fs::prelude::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    fn test_config(root: &Path) -> Config {
        let mut config = Config::default();
        config.project.source_root = root.to_path_buf();
        // Quiet producers by default; individual tests override
        config.tools.typecheck_command = sh("true");
        config.tools.lint_command = sh("echo '[]'");
        config
    }

    fn analyzer(config: &Config) -> Analyzer {
        Analyzer::new(config, RuleSet::builtin())
    }

    #[tokio::test]
    async fn test_rule_engine_scenario_line_seven() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("app.ts")
            .write_str("line one\nline two\nline three\nline four\nline five\nline six\ndebugger;\nline eight\nline nine\nline ten\n")
            .unwrap();

        let config = test_config(temp.path());
        let result = analyzer(&config)
            .analyze(Some(&[IssueCategory::Style]))
            .await;

        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        assert_eq!(result.issues.len(), 1);
        let issue = &result.issues[0];
        assert_eq!(issue.line, 7);
        assert_eq!(issue.severity, Severity::Error);
        assert_eq!(issue.rule.as_deref(), Some("quality-debugger"));
        assert_eq!(result.files_analyzed, 1);
    }

    #[tokio::test]
    async fn test_dedup_across_producers() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("app.ts").write_str("debugger;\n").unwrap();

        let mut config = test_config(temp.path());
        // The type-checker reports the same (path, line, message) key the
        // debugger rule produces
        config.tools.typecheck_command = sh(
            "printf 'app.ts(1,1): error TS0000: debugger statement left in source\\n'",
        );

        let result = analyzer(&config).analyze(None).await;

        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        let matching: Vec<_> = result
            .issues
            .iter()
            .filter(|i| i.message == "debugger statement left in source")
            .collect();
        assert_eq!(matching.len(), 1, "exactly one issue survives per key");
        assert_eq!(matching[0].line, 1);
    }

    #[tokio::test]
    async fn test_ordering_invariant() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("b.ts")
            .write_str("console.log('x');\ndebugger;\n")
            .unwrap();
        temp.child("a.ts")
            .write_str("let v: any = eval('1');\n")
            .unwrap();

        let config = test_config(temp.path());
        let result = analyzer(&config).analyze(None).await;

        assert!(result.issues.len() >= 3);
        for pair in result.issues.windows(2) {
            let a = (
                pair[0].severity.rank(),
                pair[0].relative_path.clone(),
                pair[0].line,
            );
            let b = (
                pair[1].severity.rank(),
                pair[1].relative_path.clone(),
                pair[1].line,
            );
            assert!(a <= b, "out of order: {a:?} then {b:?}");
        }
    }

    #[tokio::test]
    async fn test_producer_isolation_on_lint_failure() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("app.ts").write_str("debugger;\n").unwrap();

        let mut config = test_config(temp.path());
        config.tools.lint_command = vec!["definitely-not-a-real-binary-xyz".to_string()];

        let result = analyzer(&config).analyze(None).await;

        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("lint:"));
        assert!(result.files_analyzed > 0);
        // The rule engine still contributed its issue
        assert!(result
            .issues
            .iter()
            .any(|i| i.rule.as_deref() == Some("quality-debugger")));
    }

    #[tokio::test]
    async fn test_category_filter_skips_adapters() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("app.ts").write_str("debugger;\n").unwrap();

        let mut config = test_config(temp.path());
        // Both adapters would fail if they ran
        config.tools.typecheck_command = vec!["definitely-not-a-real-binary-xyz".to_string()];
        config.tools.lint_command = vec!["definitely-not-a-real-binary-xyz".to_string()];

        let result = analyzer(&config)
            .analyze(Some(&[IssueCategory::Style]))
            .await;

        assert!(result.errors.is_empty());
        assert_eq!(result.issues.len(), 1);
    }

    #[tokio::test]
    async fn test_lint_issues_imported() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("app.ts").write_str("let x = 1;\n").unwrap();

        let report = format!(
            r#"[{{"filePath": "{}/app.ts", "messages": [{{"ruleId": "no-unused-vars", "severity": 2, "message": "x is defined but never used.", "line": 1, "column": 5}}]}}]"#,
            temp.path().display()
        );
        let mut config = test_config(temp.path());
        config.tools.lint_command = sh(&format!("printf '%s' '{}'", report));

        let result = analyzer(&config)
            .analyze(Some(&[IssueCategory::Lint]))
            .await;

        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].category, IssueCategory::Lint);
        assert_eq!(result.issues[0].relative_path, "app.ts");
    }

    #[tokio::test]
    async fn test_wall_clock_reflects_parallel_critical_path() {
        let temp = assert_fs::TempDir::new().unwrap();
        for i in 0..50 {
            temp.child(format!("file{i}.ts"))
                .write_str(&"debugger;\n".repeat(50))
                .unwrap();
        }

        let mut config = test_config(temp.path());
        // Each adapter holds its subprocess open for half a second; run
        // serially the producers would need at least a full second.
        config.tools.typecheck_command = sh("sleep 0.5; true");
        config.tools.lint_command = sh("sleep 0.5; echo '[]'");

        let result = analyzer(&config).analyze(None).await;

        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        assert_eq!(result.files_analyzed, 50);
        assert!(
            result.analysis_time_ms < 900,
            "producers did not overlap: {} ms",
            result.analysis_time_ms
        );
    }

    #[tokio::test]
    async fn test_analyze_file_runs_rules_only() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("one.ts");
        file.write_str("debugger;\n").unwrap();

        let config = test_config(temp.path());
        let issues = analyzer(&config).analyze_file(file.path()).unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].relative_path, "one.ts");
    }
}
