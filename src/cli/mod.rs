pub mod onboard;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "shiplog",
    about = "Log what you shipped. Keep your streak alive. Share the journey."
)]
pub struct Cli {
    /// Evaluate streaks and weekly buckets as of this RFC 3339 instant instead of now.
    #[arg(long, global = true)]
    pub as_of: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Onboard,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Record an update. Prompts for the text when it is omitted.
    Log {
        text: Option<String>,
        #[arg(long, short)]
        category: Option<String>,
        #[arg(long, short)]
        project: Option<String>,
        #[arg(long, default_value_t = false)]
        private: bool,
        /// RFC 3339 timestamp, e.g. 2026-02-17T21:00:00+09:00
        #[arg(long)]
        at: Option<String>,
    },
    List {
        #[arg(long, short)]
        category: Option<String>,
        #[arg(long, short)]
        project: Option<String>,
        #[arg(long, default_value_t = false)]
        public: bool,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    Delete {
        id: String,
    },
    Stats {
        #[arg(long, default_value_t = false)]
        public: bool,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    Profile,
    Share,
    Status,
    Doctor,
    Serve,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommands {
    Add {
        name: String,
        #[arg(long, default_value_t = false)]
        private: bool,
    },
    List,
    /// Show the project's public entries on the profile and journey card.
    Publish { name: String },
    /// Keep the project's entries off every public surface.
    Hide { name: String },
}
