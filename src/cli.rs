use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::Engine;

#[derive(Parser)]
#[command(name = "codetriage")]
#[command(about = "Multi-source code issue aggregation with safe fix application")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Target path (defaults to Codetriage.toml)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Run all producers over the source root
    Analyze {
        /// Restrict to one or more categories (repeatable)
        #[arg(short = 'c', long = "category")]
        categories: Vec<String>,

        /// Emit the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-check one file with the pattern rule engine only
    Check {
        /// File to check, relative to the source root
        file: PathBuf,

        /// Emit issues as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the loaded rule set
    Rules,

    /// Request a fix suggestion for one finding
    Fix {
        /// File containing the finding
        file: PathBuf,

        /// Line of the finding (1-based)
        #[arg(short, long)]
        line: u32,

        /// Apply the suggestion after printing it
        #[arg(long)]
        apply: bool,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Init { path } => engine.init(path),
            Commands::Analyze { categories, json } => engine.analyze(categories, json).await,
            Commands::Check { file, json } => engine.check(file, json).await,
            Commands::Rules => engine.rules(),
            Commands::Fix { file, line, apply } => engine.fix(file, line, apply).await,
        }
    }
}
