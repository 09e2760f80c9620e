//! Conduit E2E runner
//!
//! Run with no arguments against `http://localhost:4100/`, or point it
//! elsewhere with flags, environment variables or a TOML file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use conduit_e2e::playwright::Browser;
use conduit_e2e::{HarnessConfig, HarnessRunner};

#[derive(Parser, Debug)]
#[command(name = "conduit-e2e")]
#[command(about = "Browser journey test for the Conduit demo app")]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "CONDUIT_E2E_CONFIG")]
    config: Option<PathBuf>,

    /// Root URL of the running frontend
    #[arg(long, env = "CONDUIT_BASE_URL")]
    base_url: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, env = "CONDUIT_E2E_BROWSER")]
    browser: Option<Browser>,

    /// Run without a visible window
    #[arg(long, env = "CONDUIT_E2E_HEADLESS", num_args = 0..=1, default_missing_value = "true")]
    headless: Option<bool>,

    /// Screenshot directory
    #[arg(long, env = "CONDUIT_E2E_SCREENSHOTS")]
    screenshots: Option<PathBuf>,

    /// Output directory for results
    #[arg(short, long, env = "CONDUIT_E2E_OUTPUT")]
    output: Option<PathBuf>,

    /// Seconds to wait for the app to answer before starting (0 = don't probe)
    #[arg(long, env = "CONDUIT_E2E_STARTUP_WAIT")]
    startup_wait: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => HarnessConfig::default(),
        };

        if let Some(url) = self.base_url {
            config.base_url = url;
        }
        if let Some(browser) = self.browser {
            config.browser = browser;
        }
        if let Some(headless) = self.headless {
            config.headless = headless;
        }
        if let Some(dir) = self.screenshots {
            config.screenshot_dir = dir;
        }
        if let Some(dir) = self.output {
            config.results_dir = dir;
        }
        if let Some(secs) = self.startup_wait {
            config.startup_wait_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let runner = match args.into_config().and_then(|c| Ok(HarnessRunner::new(c)?)) {
        Ok(runner) => runner,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            std::process::exit(2);
        }
    };

    info!("Starting Conduit E2E run");

    match runner.run().await {
        Ok(outcome) => {
            let warnings = outcome.report.warnings().count();
            match &outcome.result {
                Ok(()) => info!("All stages passed ({} warning(s))", warnings),
                Err(e) => error!("Run failed: {}", e),
            }
            std::process::exit(conduit_e2e::runner::exit_code(&outcome));
        }
        Err(e) => {
            error!("Harness error: {}", e);
            std::process::exit(2);
        }
    }
}
