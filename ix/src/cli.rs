//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// IX Studio - creative idea generation with LLMs
#[derive(Parser)]
#[command(
    name = "ix",
    about = "Build creative-brief prompts, parse model replies and curate ideas",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Store directory (overrides config)
    #[arg(short, long, global = true)]
    pub store: Option<PathBuf>,

    /// Subcommand to execute (defaults to the studio)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive studio session
    Studio,

    /// Print the prompt for a brief
    Prompt {
        /// Creative brief text
        brief: String,

        /// Creativity level (none, microdose, buzzed, tripping)
        #[arg(short = 'L', long)]
        level: Option<String>,

        /// Prompt mode (initial, refine, new-ideas)
        #[arg(short, long, default_value = "initial")]
        mode: String,

        /// Extra guidance for a new-ideas prompt
        #[arg(short, long)]
        guidance: Option<String>,

        /// Title of the idea to refine
        #[arg(long)]
        title: Option<String>,

        /// Description of the idea to refine
        #[arg(long)]
        description: Option<String>,

        /// Rationale of the idea to refine
        #[arg(long)]
        rationale: Option<String>,
    },

    /// Parse a model reply and print the ideas
    Parse {
        /// File holding the reply ("-" reads stdin)
        file: PathBuf,

        /// Number of ideas already approved; new ideas are numbered after it
        #[arg(short, long, default_value = "0")]
        approved_count: usize,
    },

    /// Generate ideas for a brief through the configured LLM
    Generate {
        /// Creative brief text
        brief: String,

        /// Creativity level (none, microdose, buzzed, tripping)
        #[arg(short = 'L', long)]
        level: Option<String>,
    },

    /// List the durable approved ideas
    Approved,

    /// Write approved ideas to a Markdown file
    Export {
        /// Output path
        path: Option<PathBuf>,
    },

    /// Manage saved jobs
    Jobs {
        #[command(subcommand)]
        command: JobsCommand,
    },

    /// Delete approved ideas and feedback from durable storage
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Job management subcommands
#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    /// List jobs, newest first
    List {
        /// Include archived jobs
        #[arg(short, long)]
        all: bool,
    },

    /// Show a job's brief and ideas
    Show {
        /// Job name
        name: String,
    },

    /// Archive a job
    Archive {
        /// Job name
        name: String,
    },

    /// Restore an archived job
    Unarchive {
        /// Job name
        name: String,
    },

    /// Delete a job
    Delete {
        /// Job name
        name: String,
    },
}

/// Where the log file is written
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ixstudio")
        .join("logs")
        .join("ixstudio.log")
}
