use domain::error::{Error, InternalErrorKind};
use domain::gateway::gemini::GeminiClient;
use domain::media::{ExternalTools, ToolPaths};
use domain::processor::{Processor, RunOptions};
use domain::{BackoffSchedule, Generator, Registry};
use log::*;
use secrecy::SecretString;
use service::config::Config;
use service::logging::{Logger, RunLog};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Placeholder credential for dry runs, which never reach the network.
const DRY_RUN_API_KEY: &str = "dry-run";

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::new();
    let run_log = match Logger::init_logger(&config) {
        Ok(run_log) => run_log,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let result = run(&config, run_log.clone(), cancel).await;
    if let Err(e) = run_log.close() {
        eprintln!("Failed to close process log: {e}");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancelled() => {
            warn!("Processing interrupted");
            ExitCode::from(130)
        }
        Err(e) => {
            error!("Meeting processing failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    config: &Config,
    run_log: RunLog,
    cancel: CancellationToken,
) -> Result<(), Error> {
    let registry = Registry::load_or_builtin(config.model_limits_file())?;
    registry.resolve(config.gemini_model())?;
    info!("Using Gemini model: {}", config.gemini_model());

    let api_key = match config.gemini_api_key() {
        Some(key) if !key.trim().is_empty() => key,
        _ if config.dry_run => DRY_RUN_API_KEY.to_string(),
        _ => {
            return Err(Error::internal(
                InternalErrorKind::Config,
                "GEMINI_API_KEY is not set",
            ))
        }
    };

    let client = GeminiClient::new(
        SecretString::from(api_key),
        config.gemini_base_url(),
        config.request_timeout(),
    )?;

    if !config.dry_run {
        match client.verify_api_key().await {
            Ok(true) => debug!("Gemini API key verified"),
            Ok(false) => {
                return Err(Error::internal(
                    InternalErrorKind::Config,
                    "GEMINI_API_KEY was rejected by the Gemini API",
                ))
            }
            Err(e) => warn!("Could not verify Gemini API key: {e}"),
        }
    }

    let generator = Generator::new(Arc::new(registry), client)
        .with_schedule(BackoffSchedule::exponential(
            config.retry_base_delay(),
            config.max_retries,
        ))
        .with_cancellation(cancel.clone());

    let tools = ExternalTools::new(ToolPaths::from_config(config), config.dry_run);

    Processor::new(RunOptions::from_config(config)?, tools, generator)
        .with_run_log(run_log)
        .with_cancellation(cancel)
        .run()
        .await
        .map(|_| ())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Interrupt received, stopping after the current step...");
        cancel.cancel();
    }
}
