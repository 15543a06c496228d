mod adapters;
mod aggregator;
mod engine;
mod enumerator;
mod issue;
mod paths;
mod rules;
mod suggest;
mod workspace;

pub use adapters::{LintAdapter, TypecheckAdapter};
pub use aggregator::Analyzer;
pub use enumerator::SourceEnumerator;
pub use issue::{
    AnalysisResult, FixSuggestion, Issue, IssueCategory, IssueIdGenerator, IssueStatus, Severity,
};
pub use rules::{PatternRuleEngine, Rule, RuleSet, RuleSpec};
pub use suggest::{create_suggester, FixSuggester, HttpSuggester};
pub use workspace::{BackupRef, ScopedWorkspace};

// Export the main engine
pub use engine::Engine;
