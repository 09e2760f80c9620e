//! Harness bootstrap: owns the browser for one journey and always tears it down

use std::time::Instant;

use tracing::{error, info, warn};

use crate::actions::PageActions;
use crate::config::HarnessConfig;
use crate::error::E2eResult;
use crate::page::Page;
use crate::playwright::PlaywrightHandle;
use crate::report::ScenarioReport;
use crate::scenario::{Scenario, Stage};
use crate::selectors::SelectorCatalog;
use crate::target;

/// What one journey produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: ScenarioReport,

    /// `Err` when a gating stage failed
    pub result: E2eResult<()>,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct HarnessRunner {
    config: HarnessConfig,
    catalog: SelectorCatalog,
}

impl HarnessRunner {
    pub fn new(config: HarnessConfig) -> E2eResult<Self> {
        config.validate()?;
        let catalog = config.catalog()?;
        Ok(Self { config, catalog })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Launch a browser, drive the journey, close the browser.
    ///
    /// `Err` means the harness itself could not run; a failed journey is
    /// reported through [`RunOutcome::result`].
    pub async fn run(&self) -> E2eResult<RunOutcome> {
        std::fs::create_dir_all(&self.config.screenshot_dir)?;

        let page = PlaywrightHandle::launch(&self.config.playwright()).await?;
        info!("Browser started");

        let outcome = self.drive(&page).await;

        if let Err(e) = page.close().await {
            warn!("Browser teardown failed: {}", e);
        }
        outcome
    }

    /// Drive the journey against an already open page.
    pub async fn drive<P: Page + ?Sized>(&self, page: &P) -> E2eResult<RunOutcome> {
        std::fs::create_dir_all(&self.config.screenshot_dir)?;

        let started = Instant::now();
        let actions = PageActions::new(
            page,
            self.config.timeouts.clone(),
            &self.config.screenshot_dir,
        );
        let mut scenario = Scenario::new(actions, &self.catalog, &self.config);

        info!("Running the Conduit journey against {}", self.config.base_url);

        let result = match self.probe_target().await {
            Ok(()) => scenario.run().await,
            Err(e) => Err(scenario.abort(Stage::Init, e)),
        };

        if let Err(e) = &result {
            error!("Journey failed: {}", e);
            scenario.capture_error().await;
        }

        let mut report = scenario.into_report();
        report.duration_ms = started.elapsed().as_millis() as u64;
        report.hash_screenshots();

        if let Err(e) = report.write(&self.config.results_dir) {
            warn!("Could not write results: {}", e);
        }

        Ok(RunOutcome { report, result })
    }

    async fn probe_target(&self) -> E2eResult<()> {
        if self.config.startup_wait_secs == 0 {
            return Ok(());
        }
        target::wait_until_reachable(&self.config.home_url(), self.config.startup_wait()).await
    }
}

/// Exit code for a finished run: 0 on success, 1 when a gating stage failed.
pub fn exit_code(outcome: &RunOutcome) -> i32 {
    if outcome.success() {
        0
    } else {
        1
    }
}
