//! # guardlink
//!
//! Command-line front end for the GuardLink prompt flows. Each subcommand
//! runs one flow against Gemini and prints the output record as JSON on
//! stdout. Logs go to stderr.

#![deny(unsafe_code)]

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use guardlink_core::FlowError;
use guardlink_flows::{
    ComplianceInput, Flows, InvokeOptions, MessageInput, RetryPolicy, SummarizeCallInput,
    with_retry,
};
use guardlink_llm::{GeminiClient, GeminiConfig};
use guardlink_settings::{ModelSettings, RetrySettings, load_settings, load_settings_from_path};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Run GuardLink prompt flows.
#[derive(Parser, Debug)]
#[command(name = "guardlink", version, about = "Run GuardLink prompt flows against Gemini")]
struct Cli {
    /// Settings file (default: ~/.guardlink/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Abandon the model call after this many milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Retry transient failures (connection errors, 408/429/5xx, timeouts).
    #[arg(long, global = true)]
    retry: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize an emergency call.
    Summarize {
        /// Call transcript and caller details. Read from stdin when omitted.
        #[arg(long)]
        call_details: Option<String>,
    },
    /// Analyze a guard's selfie-check compliance.
    Compliance {
        /// Guard identifier, e.g. GL003.
        #[arg(long)]
        guard_id: String,
        /// Selfie requests missed.
        #[arg(long)]
        missed: u32,
        /// Selfie requests sent.
        #[arg(long)]
        total: u32,
    },
    /// Generate a selfie-request message for a guard.
    Message {
        /// Guard's name.
        #[arg(long)]
        guard_name: String,
        /// Site the guard is posted at.
        #[arg(long)]
        site_name: String,
        /// Time the selfie is due.
        #[arg(long)]
        time: String,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Summarize { .. } => "summarize",
            Self::Compliance { .. } => "compliance",
            Self::Message { .. } => "message",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "command failed");
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.settings {
        Some(path) => load_settings_from_path(path),
        None => load_settings(),
    }
    .context("failed to load settings")?;

    if let Err(e) = guardlink_telemetry::init_logging(&settings.logging) {
        eprintln!("warning: logging not initialised: {e}");
    }

    let client = GeminiClient::new(gemini_config(&settings.model))
        .context("failed to configure Gemini client")?;
    let flows = Flows::new(Arc::new(client))?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    let _watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut options = InvokeOptions::new().with_cancel(cancel);
    if let Some(ms) = cli.timeout_ms {
        options = options.with_timeout(Duration::from_millis(ms));
    }
    let policy = if cli.retry || settings.retry.enabled {
        retry_policy(&settings.retry)
    } else {
        RetryPolicy::none()
    };

    info!(
        command = cli.command.name(),
        max_retries = policy.max_retries,
        timeout_ms = ?cli.timeout_ms,
        "running flow"
    );

    let output = match cli.command {
        Command::Summarize { call_details } => {
            let input = SummarizeCallInput {
                call_details: read_call_details(call_details)?,
            };
            let out = with_retry(&policy, || {
                flows.summarize_call_with(input.clone(), &options)
            })
            .await?;
            to_json(&out)?
        }
        Command::Compliance {
            guard_id,
            missed,
            total,
        } => {
            if missed > total {
                bail!("--missed ({missed}) cannot exceed --total ({total})");
            }
            let input = ComplianceInput {
                guard_id,
                missed_selfie_count: missed,
                total_selfie_requests: total,
            };
            let out = with_retry(&policy, || {
                flows.analyze_compliance_with(input.clone(), &options)
            })
            .await?;
            to_json(&out)?
        }
        Command::Message {
            guard_name,
            site_name,
            time,
        } => {
            let input = MessageInput {
                guard_name,
                site_name,
                time,
            };
            let out = with_retry(&policy, || {
                flows.generate_selfie_message_with(input.clone(), &options)
            })
            .await?;
            to_json(&out)?
        }
    };

    println!("{output}");
    Ok(())
}

fn read_call_details(arg: Option<String>) -> Result<String> {
    let text = match arg {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            let _ = std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read call details from stdin")?;
            buf
        }
    };
    if text.trim().is_empty() {
        bail!("call details are empty");
    }
    Ok(text)
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialise output")
}

fn gemini_config(model: &ModelSettings) -> GeminiConfig {
    GeminiConfig {
        api_key: model.api_key.clone().unwrap_or_default(),
        model: model.model.clone(),
        base_url: model.base_url.clone(),
        request_timeout: model.request_timeout(),
        connect_timeout: model.connect_timeout(),
        temperature: model.temperature,
        max_output_tokens: model.max_output_tokens,
    }
}

fn retry_policy(retry: &RetrySettings) -> RetryPolicy {
    RetryPolicy {
        max_retries: retry.max_retries,
        base_delay: Duration::from_millis(retry.base_delay_ms),
        max_delay: Duration::from_millis(retry.max_delay_ms),
        jitter_factor: retry.jitter_factor,
    }
}

/// sysexits-style codes per failure kind.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<FlowError>() {
        Some(FlowError::SchemaViolation { .. }) => 65,
        Some(FlowError::Transport { .. }) => 69,
        Some(FlowError::Timeout(_)) => 75,
        Some(FlowError::Configuration(_)) => 78,
        Some(FlowError::Cancelled) => 130,
        None => 1,
    }
}
