use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "triage",
    about = "Turn raw application logs into a Markdown incident report",
    version,
    author = "Triage Team"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sanitize, parse and analyze logs, then write the incident report
    Analyze {
        /// Log file to analyze (defaults to stdin)
        #[arg(short, long, conflicts_with = "payload")]
        file: Option<PathBuf>,

        /// JSON payload of the form {"logs": "..."}
        #[arg(long)]
        payload: Option<String>,

        /// Config file (defaults to ./.triage.toml, then ~/.config/triage/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory the report is written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Write <name>-<run id>.md instead of overwriting one report file
        #[arg(long)]
        per_run: bool,

        /// Skip the LLM and build the heuristic report
        #[arg(long)]
        no_llm: bool,

        /// LLM provider (openai, openrouter, claude)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model name for the provider
        #[arg(short, long)]
        model: Option<String>,

        /// API key for the provider (overrides <PROVIDER>_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Print the run outcome as JSON instead of the report path
        #[arg(long)]
        json: bool,
    },
}
