//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};
use dreamdx_core::{DEFAULT_SESSION_ID, LogFormat};
use std::path::PathBuf;

/// Interactive dream narratives.
#[derive(Parser, Debug)]
#[command(name = "dreamdx")]
#[command(about = "Dream narratives generated by a hosted language model")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: ./dreamdx.toml when present)
    #[arg(short, long, global = true, env = "DREAMDX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Print raw JSON replies instead of narrative text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Dreamer and dream a command acts on.
#[derive(Args, Debug, Clone)]
pub struct DreamTarget {
    /// Dreamer (usually the login email)
    #[arg(short, long, env = "DREAMDX_USER")]
    pub user: String,

    /// Dream name
    #[arg(short, long, default_value = DEFAULT_SESSION_ID)]
    pub session: String,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the narrative endpoint
    Serve {
        /// Listen address, overriding the configuration
        #[arg(long)]
        bind: Option<String>,

        /// Route prefix, overriding the configuration
        #[arg(long)]
        stage: Option<String>,
    },

    /// Start a dream
    Start {
        #[command(flatten)]
        target: DreamTarget,

        /// What the dream is about
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },

    /// Act inside a dream
    Continue {
        #[command(flatten)]
        target: DreamTarget,

        /// What you do next
        #[arg(required = true, num_args = 1..)]
        action: Vec<String>,
    },

    /// End the dream
    WakeUp,

    /// List your dreams
    List {
        /// Dreamer
        #[arg(short, long, env = "DREAMDX_USER")]
        user: String,
    },

    /// Delete a dream
    Delete {
        #[command(flatten)]
        target: DreamTarget,
    },

    /// Show a dream with its full history
    Show {
        #[command(flatten)]
        target: DreamTarget,
    },

    /// Dream interactively until you type "wake up"
    Dream {
        /// Dreamer
        #[arg(short, long, env = "DREAMDX_USER")]
        user: String,
    },
}
