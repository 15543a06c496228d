use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::TriageError;
use super::aggregator::Analyzer;
use super::issue::{FixSuggestion, Issue, IssueCategory, Severity};
use super::rules::RuleSet;
use super::suggest::{create_suggester, FixSuggester};
use super::workspace::{BackupRef, ScopedWorkspace};

/// Main orchestration engine wiring the analysis pipeline, the scoped
/// fix-application workflow, and the optional suggestion collaborator
pub struct Engine {
    config: Config,
    analyzer: Analyzer,
    workspace: ScopedWorkspace,
    suggester: Option<Box<dyn FixSuggester>>,
}

impl Engine {
    /// Create a new engine instance
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;

        debug!("Loaded configuration: {:?}", config);

        // Rule patterns compile eagerly here; a malformed rule aborts startup
        let rule_set = match &config.analysis.rules_file {
            Some(path) => RuleSet::from_file(path)?,
            None => RuleSet::builtin(),
        };
        info!("Loaded {} analysis rules", rule_set.len());

        let analyzer = Analyzer::new(&config, rule_set);
        let workspace = ScopedWorkspace::new(
            config.project.source_root.clone(),
            config.project.backup_dir.clone(),
        );

        let suggester = if config.llm.enabled {
            match create_suggester(&config.llm) {
                Ok(s) => {
                    info!("✅ Fix suggestions enabled: {}", s.provider_name());
                    Some(s)
                }
                Err(e) => {
                    warn!("⚠️ Failed to initialize suggestion provider: {}", e);
                    warn!("Continuing without fix suggestions");
                    None
                }
            }
        } else {
            debug!("Fix suggestions disabled");
            None
        };

        Ok(Self {
            config,
            analyzer,
            workspace,
            suggester,
        })
    }

    /// Run a full or category-filtered analysis and print the result
    pub async fn analyze(&self, categories: Vec<String>, json: bool) -> Result<()> {
        let filter = parse_categories(&categories)?;

        info!("🔍 Analyzing {}", self.config.project.source_root.display());
        let result = self.analyzer.analyze(filter.as_deref()).await;

        if json {
            println!("{}", serde_json::to_string_pretty(&result)?);
            return Ok(());
        }

        for issue in &result.issues {
            println!(
                "{:7} {}:{}:{}  {}{}",
                format!("{:?}", issue.severity).to_lowercase(),
                issue.relative_path,
                issue.line,
                issue.column,
                issue.message,
                issue
                    .rule
                    .as_deref()
                    .map(|r| format!("  [{}]", r))
                    .unwrap_or_default()
            );
        }

        println!(
            "\n{} errors, {} warnings, {} infos across {} files ({} ms)",
            result.count_by_severity(Severity::Error),
            result.count_by_severity(Severity::Warning),
            result.count_by_severity(Severity::Info),
            result.files_analyzed,
            result.analysis_time_ms
        );

        for error in &result.errors {
            warn!("Producer failure: {}", error);
        }

        Ok(())
    }

    /// Re-check a single scoped file with the pattern rule engine only
    pub async fn check(&self, file: PathBuf, json: bool) -> Result<()> {
        let resolved = self.workspace.resolve(&file)?;
        let issues = self.analyzer.analyze_file(&resolved)?;

        if json {
            println!("{}", serde_json::to_string_pretty(&issues)?);
            return Ok(());
        }

        if issues.is_empty() {
            println!("No issues found in {}", file.display());
        } else {
            for issue in &issues {
                println!(
                    "{:7} line {}: {}",
                    format!("{:?}", issue.severity).to_lowercase(),
                    issue.line,
                    issue.message
                );
            }
        }

        Ok(())
    }

    /// List the validated rule set
    pub fn rules(&self) -> Result<()> {
        for rule in self.analyzer.rule_engine().rule_set().rules() {
            println!(
                "{:28} {:12} {:8} {}",
                rule.spec.id,
                rule.spec.category.as_str(),
                format!("{:?}", rule.spec.severity).to_lowercase(),
                rule.spec.message
            );
        }
        Ok(())
    }

    /// Ask the suggestion collaborator for a fix, optionally applying it.
    /// A suggestion is never applied without `apply` being set explicitly.
    pub async fn fix(&self, file: PathBuf, line: u32, apply: bool) -> Result<()> {
        let resolved = self.workspace.resolve(&file)?;
        let issues = self.analyzer.analyze_file(&resolved)?;

        let issue = issues.iter().find(|i| i.line == line).ok_or_else(|| {
            TriageError::Config(format!("no rule-engine issue at {}:{}", file.display(), line))
        })?;

        let suggestion = self.suggest_fix(issue).await?;

        println!("Suggested fix ({}% confidence):", suggestion.confidence);
        println!("--- original\n{}", suggestion.original_code);
        println!("+++ fixed\n{}", suggestion.fixed_code);
        println!("\n{}", suggestion.explanation);

        if apply {
            let backup = self.apply_suggestion(&resolved, &suggestion)?;
            match &backup.backup_path {
                Some(p) => println!("Applied. Backup at {}", p.display()),
                None => println!("Applied. No backup was made"),
            }
        }

        Ok(())
    }

    /// Request a fix proposal for one issue from the configured collaborator
    pub async fn suggest_fix(&self, issue: &Issue) -> Result<FixSuggestion> {
        let suggester = self.suggester.as_ref().ok_or_else(|| {
            TriageError::Config("no suggestion provider configured".to_string())
        })?;

        let content = self.workspace.read_scoped(&issue.file_path)?;
        let suggestion = suggester.suggest(issue, &content).await?;
        Ok(suggestion)
    }

    /// Apply a reviewed suggestion to its file through the scoped, backed-up
    /// write path. If the suggested original text is not present the file is
    /// left byte-for-byte unchanged.
    pub fn apply_suggestion(
        &self,
        path: &Path,
        suggestion: &FixSuggestion,
    ) -> Result<BackupRef> {
        let content = self.workspace.read_scoped(path)?;

        if !content.contains(&suggestion.original_code) {
            return Err(TriageError::Suggestion(
                "suggested original code no longer matches the file".to_string(),
            )
            .into());
        }

        let updated = content.replacen(&suggestion.original_code, &suggestion.fixed_code, 1);
        Ok(self.workspace.write_scoped(path, &updated)?)
    }

    /// Write a default configuration file
    pub fn init(&self, path: Option<PathBuf>) -> Result<()> {
        let target = path.unwrap_or_else(|| PathBuf::from("Codetriage.toml"));
        if target.exists() {
            return Err(TriageError::Config(format!(
                "{} already exists",
                target.display()
            ))
            .into());
        }
        Config::default().save(&target)?;
        info!("Wrote default configuration to {}", target.display());
        Ok(())
    }

    pub fn workspace(&self) -> &ScopedWorkspace {
        &self.workspace
    }
}

fn parse_categories(raw: &[String]) -> Result<Option<Vec<IssueCategory>>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let mut parsed = Vec::new();
    for s in raw {
        let cat = IssueCategory::parse(s).ok_or_else(|| {
            TriageError::Config(format!(
                "unknown category '{}' (expected one of type-system, lint, structural, security, style, other)",
                s
            ))
        })?;
        parsed.push(cat);
    }
    Ok(Some(parsed))
}
