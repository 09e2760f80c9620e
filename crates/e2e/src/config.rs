//! Harness configuration
//!
//! Defaults, then an optional TOML file, then CLI/env overrides applied by
//! the binary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::playwright::{Browser, PlaywrightConfig};
use crate::selectors::{Role, SelectorCatalog};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root URL of the running Conduit frontend
    pub base_url: String,

    /// Where checkpoint screenshots are written
    pub screenshot_dir: PathBuf,

    /// Where the JSON run report is written
    pub results_dir: PathBuf,

    pub browser: Browser,
    pub headless: bool,

    /// Delay Playwright inserts between operations
    pub slow_mo_ms: u64,

    pub viewport: Viewport,
    pub timeouts: Timeouts,
    pub pacing: Pacing,

    /// How long to poll the base URL before giving up (0 = skip the probe)
    pub startup_wait_secs: u64,

    /// Password used for the generated account
    pub password: String,

    /// Tag attached to the generated article
    pub post_tag: String,

    /// Per-role locator replacements
    pub selectors: HashMap<Role, Vec<String>>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4100/".to_string(),
            screenshot_dir: PathBuf::from("screenshots"),
            results_dir: PathBuf::from("test-results"),
            browser: Browser::Chromium,
            headless: false,
            slow_mo_ms: 50,
            viewport: Viewport::default(),
            timeouts: Timeouts::default(),
            pacing: Pacing::default(),
            startup_wait_secs: 10,
            password: "Password123!".to_string(),
            post_tag: "automation".to_string(),
            selectors: HashMap::new(),
        }
    }
}

impl HarnessConfig {
    pub fn from_toml(toml: &str) -> E2eResult<Self> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> E2eResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(E2eError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.password.is_empty() {
            return Err(E2eError::Config("password must not be empty".into()));
        }
        if self.post_tag.trim().is_empty() {
            return Err(E2eError::Config("post_tag must not be empty".into()));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(E2eError::Config("viewport dimensions must be non-zero".into()));
        }
        self.timeouts.validate()
    }

    /// Absolute URL for an app route, e.g. `route("register")`.
    pub fn route(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// The home page URL, always with a trailing slash.
    pub fn home_url(&self) -> String {
        self.route("")
    }

    pub fn catalog(&self) -> E2eResult<SelectorCatalog> {
        SelectorCatalog::with_overrides(&self.selectors)
    }

    pub fn startup_wait(&self) -> Duration {
        Duration::from_secs(self.startup_wait_secs)
    }

    pub fn playwright(&self) -> PlaywrightConfig {
        PlaywrightConfig {
            browser: self.browser,
            headless: self.headless,
            slow_mo_ms: self.slow_mo_ms,
            viewport_width: self.viewport.width,
            viewport_height: self.viewport.height,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

/// Per-operation timeouts, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Default budget for click and wait-for
    pub element_ms: u64,

    /// Budget per candidate when filling a field
    pub fill_probe_ms: u64,

    /// Smallest slice a click gives any single candidate
    pub probe_floor_ms: u64,

    /// Upper bound for a settled navigation
    pub navigation_ms: u64,

    /// Fixed pause after every navigation for client-side rendering
    pub settle_ms: u64,

    /// Logout click before falling back to the route
    pub logout_click_ms: u64,

    /// Logged-out marker after logout
    pub logout_check_ms: u64,

    /// Logged-in marker after token login
    pub login_check_ms: u64,

    /// Article heading after publishing
    pub publish_check_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element_ms: 10_000,
            fill_probe_ms: 1_000,
            probe_floor_ms: 250,
            navigation_ms: 30_000,
            settle_ms: 1_000,
            logout_click_ms: 2_000,
            logout_check_ms: 3_000,
            login_check_ms: 5_000,
            publish_check_ms: 5_000,
        }
    }
}

impl Timeouts {
    pub fn element(&self) -> Duration {
        Duration::from_millis(self.element_ms)
    }

    pub fn fill_probe(&self) -> Duration {
        Duration::from_millis(self.fill_probe_ms)
    }

    pub fn probe_floor(&self) -> Duration {
        Duration::from_millis(self.probe_floor_ms)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn logout_click(&self) -> Duration {
        Duration::from_millis(self.logout_click_ms)
    }

    pub fn logout_check(&self) -> Duration {
        Duration::from_millis(self.logout_check_ms)
    }

    pub fn login_check(&self) -> Duration {
        Duration::from_millis(self.login_check_ms)
    }

    pub fn publish_check(&self) -> Duration {
        Duration::from_millis(self.publish_check_ms)
    }

    /// Every budget except the settle pause must be non-zero.
    pub fn validate(&self) -> E2eResult<()> {
        let budgets = [
            ("element_ms", self.element_ms),
            ("fill_probe_ms", self.fill_probe_ms),
            ("probe_floor_ms", self.probe_floor_ms),
            ("navigation_ms", self.navigation_ms),
            ("logout_click_ms", self.logout_click_ms),
            ("logout_check_ms", self.logout_check_ms),
            ("login_check_ms", self.login_check_ms),
            ("publish_check_ms", self.publish_check_ms),
        ];
        match budgets.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(E2eError::Config(format!(
                "timeouts.{} must be greater than zero",
                name
            ))),
            None => Ok(()),
        }
    }

    /// No waiting at all. Used by tests driving an in-memory page.
    pub fn instant() -> Self {
        Self {
            element_ms: 50,
            fill_probe_ms: 10,
            probe_floor_ms: 1,
            navigation_ms: 50,
            settle_ms: 0,
            logout_click_ms: 20,
            logout_check_ms: 20,
            login_check_ms: 20,
            publish_check_ms: 20,
        }
    }
}

/// Fixed pauses inside the scenario, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Between filling consecutive registration fields
    pub field_ms: u64,

    /// Between filling consecutive editor fields
    pub editor_field_ms: u64,

    /// After submitting a form
    pub submit_ms: u64,

    /// After clicking logout
    pub logout_ms: u64,

    /// After landing on a feed, before reading it
    pub feed_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            field_ms: 500,
            editor_field_ms: 300,
            submit_ms: 3_000,
            logout_ms: 2_000,
            feed_ms: 2_000,
        }
    }
}

impl Pacing {
    pub fn instant() -> Self {
        Self {
            field_ms: 0,
            editor_field_ms: 0,
            submit_ms: 0,
            logout_ms: 0,
            feed_ms: 0,
        }
    }
}

pub(crate) fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}
