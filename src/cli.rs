use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "llm-monitor", version, about = "AI monitoring adapter for LLM gateway requests")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = llm_monitor::config::DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Console log format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Replay a recorded gateway request through the adapter
    Replay {
        /// JSON fixture: {"kwargs": {...}, "response": {...}, "start_time": ..., "end_time": ...}
        #[arg(short, long)]
        input: PathBuf,

        /// Treat the request as failed (only the error counter is emitted)
        #[arg(long)]
        failure: bool,

        /// Send records to the metrics recorder and print the Prometheus rendering
        #[arg(long)]
        prometheus: bool,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display current configuration (with secrets masked)
    Show,

    /// Validate configuration file
    Validate,
}
