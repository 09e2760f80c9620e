//! Resilient page actions
//!
//! Every element operation takes a [`LocatorSet`] and walks it in order; the
//! first candidate that resolves wins. Only [`PageActions::click`] turns an
//! exhausted set into an error. The probing primitives report absence as
//! `None` and leave the decision to the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::Timeouts;
use crate::error::{E2eError, E2eResult};
use crate::page::{Page, WaitUntil};
use crate::selectors::{Locator, LocatorSet};

/// `localStorage` key the Conduit frontend keeps its session token under.
pub const AUTH_TOKEN_KEY: &str = "jwt";

/// The candidate that resolved, and its position in the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub index: usize,
    pub locator: Locator,
}

/// Texts of every element matched by the winning candidate.
#[derive(Debug, Clone)]
pub struct Collected {
    pub hit: Hit,
    pub texts: Vec<String>,
}

pub struct PageActions<'p, P: Page + ?Sized> {
    page: &'p P,
    timeouts: Timeouts,
    screenshot_dir: PathBuf,
}

impl<'p, P: Page + ?Sized> PageActions<'p, P> {
    pub fn new(page: &'p P, timeouts: Timeouts, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            page,
            timeouts,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    pub fn page(&self) -> &'p P {
        self.page
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir
    }

    /// Click the first visible candidate.
    ///
    /// `timeout` is shared by the whole set: each candidate gets an equal
    /// slice (never below the probe floor), clipped to what is left.
    pub async fn click(&self, set: &LocatorSet, timeout: Duration) -> E2eResult<Hit> {
        let deadline = Instant::now() + timeout;
        let share = (timeout / set.len().max(1) as u32).max(self.timeouts.probe_floor());

        for (index, locator) in set.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match self.page.wait_for_selector(locator.as_str(), share.min(remaining)).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    debug!("Probe of {} failed: {}", locator, e);
                    continue;
                }
            }

            match self.page.click(locator.as_str()).await {
                Ok(()) => {
                    info!("Clicked: {}", locator);
                    return Ok(Hit {
                        index,
                        locator: locator.clone(),
                    });
                }
                Err(e) => debug!("Click on {} failed: {}", locator, e),
            }
        }

        Err(E2eError::ElementNotFound {
            locators: set.to_string(),
        })
    }

    /// Type `value` into the first visible candidate, clearing it first if asked.
    pub async fn fill(&self, set: &LocatorSet, value: &str, clear_first: bool) -> Option<Hit> {
        for (index, locator) in set.iter().enumerate() {
            match self
                .page
                .wait_for_selector(locator.as_str(), self.timeouts.fill_probe())
                .await
            {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    debug!("Probe of {} failed: {}", locator, e);
                    continue;
                }
            }

            if clear_first {
                if let Err(e) = self.page.clear(locator.as_str()).await {
                    debug!("Clearing {} failed: {}", locator, e);
                    continue;
                }
            }

            match self.page.type_text(locator.as_str(), value).await {
                Ok(()) => {
                    debug!("Filled {} ({} chars)", locator, value.chars().count());
                    return Some(Hit {
                        index,
                        locator: locator.clone(),
                    });
                }
                Err(e) => debug!("Typing into {} failed: {}", locator, e),
            }
        }

        None
    }

    /// First candidate that becomes visible, each probed with its own `timeout`.
    pub async fn wait_for(&self, set: &LocatorSet, timeout: Duration) -> Option<Hit> {
        for (index, locator) in set.iter().enumerate() {
            match self.page.wait_for_selector(locator.as_str(), timeout).await {
                Ok(true) => {
                    debug!("Element found: {}", locator);
                    return Some(Hit {
                        index,
                        locator: locator.clone(),
                    });
                }
                Ok(false) => {}
                Err(e) => debug!("Probe of {} failed: {}", locator, e),
            }
        }
        None
    }

    /// Load `url`. With `wait_for_settle` the call blocks until the network is
    /// idle; otherwise it returns once navigation commits. Either way a fixed
    /// settle pause follows.
    pub async fn navigate(&self, url: &str, wait_for_settle: bool) -> E2eResult<()> {
        info!("Navigating: {}", url);

        let wait_until = if wait_for_settle {
            WaitUntil::NetworkIdle
        } else {
            WaitUntil::Commit
        };
        self.page
            .goto(url, wait_until, self.timeouts.navigation())
            .await?;

        sleep(self.timeouts.settle()).await;
        Ok(())
    }

    /// Capture the page to `<screenshot_dir>/<name>.png`. Failures are logged, not raised.
    pub async fn take_screenshot(&self, name: &str, full_page: bool) -> Option<PathBuf> {
        let path = self.screenshot_dir.join(format!("{}.png", name));

        match self.page.screenshot(&path, full_page).await {
            Ok(()) => {
                info!("Screenshot saved: {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Screenshot {} failed: {}", path.display(), e);
                None
            }
        }
    }

    /// The persisted session token, if the app stored a non-empty one.
    pub async fn auth_token(&self) -> E2eResult<Option<String>> {
        let token = self.page.storage_get(AUTH_TOKEN_KEY).await?;
        Ok(token.filter(|t| !t.is_empty()))
    }

    pub async fn set_auth_token(&self, token: &str) -> E2eResult<()> {
        self.page.storage_set(AUTH_TOKEN_KEY, token).await?;
        info!("Auth token installed");
        Ok(())
    }

    pub async fn press_key(&self, key: &str) -> E2eResult<()> {
        self.page.press_key(key).await
    }

    /// Texts of every element matched by the first candidate that matches anything.
    pub async fn collect(&self, set: &LocatorSet) -> Option<Collected> {
        for (index, locator) in set.iter().enumerate() {
            match self.page.texts(locator.as_str()).await {
                Ok(texts) if !texts.is_empty() => {
                    return Some(Collected {
                        hit: Hit {
                            index,
                            locator: locator.clone(),
                        },
                        texts,
                    });
                }
                Ok(_) => {}
                Err(e) => debug!("Query of {} failed: {}", locator, e),
            }
        }
        None
    }

    /// Click the `index`-th element matched by a previously collected candidate.
    pub async fn click_nth(&self, hit: &Hit, index: usize) -> E2eResult<()> {
        self.page.click_nth(hit.locator.as_str(), index).await
    }

    /// Click the first element whose text contains `needle`, ignoring case.
    pub async fn click_text(&self, set: &LocatorSet, needle: &str) -> E2eResult<Option<Hit>> {
        let needle = needle.to_lowercase();

        for (index, locator) in set.iter().enumerate() {
            let texts = match self.page.texts(locator.as_str()).await {
                Ok(texts) => texts,
                Err(e) => {
                    debug!("Query of {} failed: {}", locator, e);
                    continue;
                }
            };

            if let Some(pos) = texts
                .iter()
                .position(|t| t.trim().to_lowercase().contains(&needle))
            {
                self.page.click_nth(locator.as_str(), pos).await?;
                info!("Clicked '{}' via {}", texts[pos].trim(), locator);
                return Ok(Some(Hit {
                    index,
                    locator: locator.clone(),
                }));
            }
        }

        Ok(None)
    }
}
