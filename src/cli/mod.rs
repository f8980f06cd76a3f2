//! Command line administration of the analysis cache
//!
//! Every subcommand prints a JSON document on stdout; logs go to stderr.

pub mod admin;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CI analysis cache - inspect and maintain cached model results
#[derive(Debug, Parser)]
#[command(name = "ci-analysis-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Result kind whose cache is addressed (a subdirectory of the storage root)
    #[arg(long, global = true)]
    pub kind: Option<String>,

    /// Overrides the configured storage root
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show entry counts, disk usage and the configured options
    Stats,

    /// Remove every cached entry
    Clear,

    /// Remove one entry by its key hash
    Delete { hash: String },

    /// Print one entry with its metadata
    Show { hash: String },

    /// Compute the key hash for a request without touching the cache
    Hash(HashArgs),

    /// Load the most recently used entries into memory
    Warmup {
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[derive(Debug, Args)]
pub struct HashArgs {
    #[arg(long)]
    pub namespace: String,

    #[arg(long)]
    pub model: String,

    #[arg(long)]
    pub system_prompt_version: String,

    #[arg(long, requires_all = ["safety_margin", "tail_count"])]
    pub max_tokens: Option<u32>,

    #[arg(long, requires = "max_tokens")]
    pub safety_margin: Option<u32>,

    #[arg(long, requires = "max_tokens")]
    pub tail_count: Option<u32>,

    #[arg(long, conflicts_with = "prompt_file", required_unless_present = "prompt_file")]
    pub prompt: Option<String>,

    /// Reads the prompt from a file instead of the command line
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,
}
