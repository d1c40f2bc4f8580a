//! jit: containerize a standalone script and verify the image against an example.
//!
//! Usage:
//!   jit <SCRIPT> <DOCS>
//!   jit --non-interactive --report-dir reports/ reverse.py README.md

mod operator;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};

use jit_core::{
    write_report, JitConfig, JitError, LogFormat, OperatorPort, Orchestrator, PipelineReport, ScriptUnit,
};
use jit_llm::{LlmConfig, OpenAiModel};
use jit_oci::DockerCli;

use crate::operator::{DecliningOperator, StdinOperator};

/// Exit code for a pipeline that completed but whose test never passed.
const EXIT_TEST_FAILED: u8 = 3;

#[derive(Debug, Parser)]
#[command(
    name = "jit",
    version = env!("CARGO_PKG_VERSION"),
    about = "Just-in-time containerization for standalone scripts"
)]
struct Cli {
    /// Script to containerize
    script: PathBuf,

    /// Documentation file describing how the script is used
    docs: PathBuf,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    /// Log line format: text, compact or json
    #[arg(long, value_name = "FORMAT", env = "JIT_LOG_FORMAT", default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Shorthand for `--log-format json`
    #[arg(long)]
    json: bool,

    /// Load environment variables from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Write report.json and its digest under this directory
    #[arg(long, value_name = "PATH", env = "JIT_REPORT_DIR")]
    report_dir: Option<PathBuf>,

    /// Never prompt for manual test data
    #[arg(long)]
    non_interactive: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    load_env(cli.env_file.as_deref())?;

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let format = if cli.json { LogFormat::Json } else { cli.log_format };
    jit_core::init_tracing(format, level);

    let script = ScriptUnit::load(&cli.script).await?;
    if !cli.docs.is_file() {
        return Err(JitError::UserInput(format!(
            "documentation file not found: {}",
            cli.docs.display()
        ))
        .into());
    }

    let config = JitConfig::from_env();
    let llm_config = LlmConfig::from_env().context("model provider is not configured")?;
    let model = OpenAiModel::new(llm_config).context("failed to create model client")?;
    info!(model = %model.model_name(), "model client ready");

    let docker = DockerCli::new();
    match docker.server_version().await {
        Ok(version) => info!(docker_version = %version, "docker daemon reachable"),
        Err(e) => warn!(error = %e, "docker daemon check failed; builds will likely fail"),
    }

    let operator: Arc<dyn OperatorPort> = if cli.non_interactive {
        Arc::new(DecliningOperator)
    } else {
        Arc::new(StdinOperator::stdio())
    };

    let orchestrator = Orchestrator::for_readme(
        &config,
        Arc::new(model),
        Arc::new(docker),
        cli.docs.clone(),
        operator,
    );

    let report = orchestrator.run(&script).await?;
    persist(&report, cli.report_dir.as_deref())?;

    println!("{}", report.summary());
    if report.passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_TEST_FAILED))
    }
}

/// An explicit env file must exist; the implicit ./.env is optional.
fn load_env(env_file: Option<&Path>) -> Result<()> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}

fn persist(report: &PipelineReport, report_dir: Option<&Path>) -> Result<()> {
    let Some(dir) = report_dir else {
        return Ok(());
    };
    let path = write_report(report, dir)
        .with_context(|| format!("failed to write report under {}", dir.display()))?;
    info!(path = %path.display(), "report written");
    Ok(())
}
