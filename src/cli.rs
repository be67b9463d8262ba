//! CLI interface for the resume relevance checker

use crate::config::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "resume-relevance")]
#[command(about = "Score how well a resume matches a job description")]
#[command(long_about = "Combine skill keyword matching with semantic embeddings to score a resume against a job description, with generated coaching feedback and a stored history of results")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a resume against a job description
    Analyze {
        /// Path to resume file (PDF, DOCX, TXT, MD)
        #[arg(short, long)]
        resume: PathBuf,

        /// Path to job description file (PDF, DOCX, TXT, MD)
        #[arg(short, long)]
        job: PathBuf,

        /// Output format: console, json, markdown
        #[arg(short, long)]
        output: Option<String>,

        /// Save the rendered report to a file
        #[arg(short, long)]
        save: Option<PathBuf>,

        /// Skip generated feedback
        #[arg(long)]
        no_feedback: bool,

        /// API key for the feedback service
        #[arg(long)]
        api_key: Option<String>,

        /// Do not store the result in the history database
        #[arg(long)]
        no_store: bool,

        /// Embedding model to use
        #[arg(short, long)]
        embedding: Option<String>,
    },

    /// Show stored analyses
    History {
        /// Show at most this many entries
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show the full report for one stored analysis
        #[arg(long)]
        id: Option<i64>,
    },

    /// List the skill vocabulary, or the skills found in a document
    Skills {
        /// Document to extract skills from
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Embedding model management
    Models {
        #[command(subcommand)]
        action: ModelAction,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ModelAction {
    /// List catalog models and their download status
    List,

    /// Download an embedding model
    Download {
        /// Catalog id, repo id, or model name
        model: String,
    },

    /// Show model information
    Info {
        /// Catalog id, repo id, or model name
        model: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Print the configuration file path
    Path,
}

pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "console" => Ok(OutputFormat::Console),
        "json" => Ok(OutputFormat::Json),
        "markdown" | "md" => Ok(OutputFormat::Markdown),
        _ => Err(format!(
            "Invalid output format: {}. Supported: console, json, markdown",
            format
        )),
    }
}

pub fn validate_file_extension(path: &Path, allowed_extensions: &[&str]) -> Result<(), String> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            if allowed_extensions.contains(&ext.to_lowercase().as_str()) {
                Ok(())
            } else {
                Err(format!(
                    "Unsupported file extension: .{}. Allowed: {}",
                    ext,
                    allowed_extensions.join(", ")
                ))
            }
        }
        None => Err("File has no extension".to_string()),
    }
}
