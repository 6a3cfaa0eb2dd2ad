use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use vibe_core::models::VoteType;

#[derive(Parser)]
#[command(name = "vibe")]
#[command(about = "Inspect and drive the Vibe Working offline write queue")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the client config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Optional path to the local queue database
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect or flush the offline queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Save today's check-in
    Checkin {
        /// Answer as QUESTION_ID=VALUE (1-5); repeatable
        #[arg(short, long = "answer", value_name = "QUESTION=VALUE")]
        answers: Vec<String>,
        /// Overall score (1-5); derived from the answers when omitted
        #[arg(long)]
        score: Option<f64>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// Check-in date as YYYY-MM-DD (defaults to today)
        #[arg(long, value_name = "DATE")]
        date: Option<String>,
    },
    /// Toggle a vote on an anonymous question
    Vote {
        /// Question id
        question_id: String,
        /// Vote direction
        #[arg(value_enum)]
        vote: VoteArg,
    },
    /// Flush the queue whenever connectivity returns, until Ctrl-C
    Watch {
        /// URL polled for reachability (defaults to the Supabase URL)
        #[arg(long, value_name = "URL")]
        probe_url: Option<String>,
    },
    /// Authenticate with Supabase
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Manage the client config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum VoteArg {
    Up,
    Down,
}

impl From<VoteArg> for VoteType {
    fn from(value: VoteArg) -> Self {
        match value {
            VoteArg::Up => Self::Up,
            VoteArg::Down => Self::Down,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// List pending mutations, oldest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay pending mutations now
    Flush,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Login with Supabase email/password and store session in keychain
    Login {
        /// Supabase account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Supabase account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show the stored session
    Status,
    /// Logout and clear the stored session
    Logout,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Local queue database path
        #[arg(long, value_name = "PATH")]
        queue_db_path: Option<PathBuf>,
    },
    /// Print the effective config (file plus environment)
    Show,
}
