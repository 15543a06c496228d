use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TriageError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether the fix-suggestion collaborator is available
    pub enabled: bool,

    /// Suggestion provider (openai, custom)
    pub provider: String,

    /// Model name (e.g., "gpt-4", "claude-3-sonnet")
    pub model: String,

    /// API key (for external providers)
    pub api_key: Option<String>,

    /// Base URL (for custom endpoints)
    pub base_url: Option<String>,

    /// Maximum tokens for suggestion responses
    pub max_tokens: Option<u32>,

    /// Temperature for suggestion responses (0.0 to 1.0)
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Analysis pipeline configuration
    pub analysis: AnalysisConfig,

    /// External diagnostic tool configuration
    pub tools: ToolsConfig,

    /// LLM suggestion settings
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Root directory containing the analyzed sources
    pub source_root: PathBuf,

    /// Directory where pre-apply backups are written
    pub backup_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// File extensions considered source files (without the dot)
    pub file_extensions: Vec<String>,

    /// Directory names skipped during enumeration
    pub exclude_dirs: Vec<String>,

    /// Hard cap on bytes captured from one diagnostic subprocess
    pub max_tool_output_bytes: usize,

    /// Optional TOML file overriding the built-in rule set
    pub rules_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Type-checker invocation, program first then arguments
    pub typecheck_command: Vec<String>,

    /// Lint tool invocation, expected to emit a JSON report on stdout
    pub lint_command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                name: "Unnamed Project".to_string(),
                source_root: PathBuf::from("src"),
                backup_dir: PathBuf::from(".codetriage/backups"),
            },
            analysis: AnalysisConfig {
                file_extensions: vec![
                    "ts".to_string(),
                    "tsx".to_string(),
                    "js".to_string(),
                    "jsx".to_string(),
                ],
                exclude_dirs: vec![
                    "node_modules".to_string(),
                    "target".to_string(),
                    "dist".to_string(),
                    "build".to_string(),
                    ".git".to_string(),
                    ".next".to_string(),
                ],
                max_tool_output_bytes: 10 * 1024 * 1024, // 10 MiB
                rules_file: None,
            },
            tools: ToolsConfig {
                typecheck_command: vec![
                    "npx".to_string(),
                    "tsc".to_string(),
                    "--noEmit".to_string(),
                    "--pretty".to_string(),
                    "false".to_string(),
                ],
                lint_command: vec![
                    "npx".to_string(),
                    "eslint".to_string(),
                    ".".to_string(),
                    "--format".to_string(),
                    "json".to_string(),
                ],
            },
            llm: LlmConfig {
                enabled: false,
                provider: "openai".to_string(),
                model: "gpt-4".to_string(),
                api_key: None,
                base_url: None,
                max_tokens: Some(2000),
                temperature: Some(0.2),
            },
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| TriageError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| TriageError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Try common config file locations
                let candidates = [
                    "Codetriage.toml",
                    "codetriage.toml",
                    ".codetriage.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.project.name, config.project.name);
        assert_eq!(parsed.analysis.file_extensions, config.analysis.file_extensions);
        assert_eq!(parsed.analysis.max_tool_output_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Some("/nonexistent/Codetriage.toml")).unwrap();
        assert_eq!(config.project.name, "Unnamed Project");
        assert!(!config.llm.enabled);
    }
}
