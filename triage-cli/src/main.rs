mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use triage_core::{Config, LogPayload, Pipeline, PipelineOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; --verbose only raises the default.
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Analyze {
            file,
            payload,
            config,
            output_dir,
            per_run,
            no_llm,
            provider,
            model,
            api_key,
            json,
        } => {
            let mut config = Config::load(config.as_deref()).context("failed to load configuration")?;
            apply_overrides(&mut config, output_dir, per_run, no_llm, provider, model);

            let api_key = api_key.or_else(|| config.get_api_key());
            let pipeline = Pipeline::with_api_key(&config, api_key);

            let outcome = match run(&pipeline, file, payload).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Analysis failed: {:#}", e);
                    return Err(e);
                }
            };
            print_outcome(&outcome, json)?;
        }
    }

    Ok(())
}

fn apply_overrides(
    config: &mut Config,
    output_dir: Option<PathBuf>,
    per_run: bool,
    no_llm: bool,
    provider: Option<String>,
    model: Option<String>,
) {
    if let Some(dir) = output_dir {
        config.report.output_dir = dir;
    }
    if per_run {
        config.report.per_run_file = true;
    }
    if no_llm {
        config.llm.enabled = false;
    }
    if let Some(provider) = provider {
        config.llm.provider = provider;
    }
    if let Some(model) = model {
        config.llm.model = model;
    }
}

async fn run(
    pipeline: &Pipeline,
    file: Option<PathBuf>,
    payload: Option<String>,
) -> Result<PipelineOutcome> {
    if let Some(body) = payload {
        info!("Reading logs from JSON payload");
        let payload = LogPayload::from_json(&body)?;
        return Ok(pipeline.run_payload(payload).await?);
    }

    let raw = match file {
        Some(path) => {
            info!("Reading log file: {}", path.display());
            std::fs::read(&path)
                .with_context(|| format!("failed to read log file {}", path.display()))?
        }
        None => {
            info!("Reading logs from stdin");
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .context("failed to read logs from stdin")?;
            buffer
        }
    };
    debug!("Read {} bytes of raw logs", raw.len());

    let outcome = match String::from_utf8(raw) {
        Ok(logs) => pipeline.run_payload(LogPayload::new(logs)).await?,
        Err(e) => pipeline.run_bytes(e.as_bytes()).await?,
    };
    Ok(outcome)
}

fn print_outcome(outcome: &PipelineOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        println!("{}", outcome.location.display());
        if let Some(reason) = &outcome.fallback_reason {
            eprintln!("Report built without LLM analysis ({})", reason);
        }
    }
    Ok(())
}
