//! Conduit E2E journey
//!
//! Drives a real browser through the Conduit demo app the way a returning
//! user would:
//! - Opens the home page and registers a fresh account
//! - Captures the session token, logs out, and logs back in by replaying it
//! - Publishes an article and finds it again through the tag feed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HarnessRunner                            │
//! │    ├── launch()   -> PlaywrightHandle (impl Page)           │
//! │    ├── drive(page) -> RunOutcome { report, result }         │
//! │    └── close()    (every path)                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (strictly sequential)                             │
//! │    init → register → logout → login_with_token              │
//! │         → create_post → find_post_by_tag                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageActions (LocatorSet in, first hit wins)                │
//! │    click | fill | wait_for | navigate | take_screenshot     │
//! │    auth_token | set_auth_token | collect | click_text       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SelectorCatalog: Role -> LocatorSet                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod actions;
pub mod config;
pub mod data;
pub mod error;
pub mod page;
pub mod playwright;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod selectors;
pub mod target;

pub use actions::{Hit, PageActions};
pub use config::HarnessConfig;
pub use error::{E2eError, E2eResult};
pub use page::{Page, WaitUntil};
pub use runner::{HarnessRunner, RunOutcome};
pub use scenario::{Scenario, ScenarioState, Stage};
pub use selectors::{LocatorSet, Role, SelectorCatalog};
