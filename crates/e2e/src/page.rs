//! Browser page abstraction
//!
//! The journey only ever talks to a single tab. [`Page`] is the narrow set of
//! primitives the action layer needs from it; [`crate::playwright`] provides
//! the real implementation. Callers hold a shared reference and never close
//! or recreate the page themselves.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;

/// When a navigation is considered finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    /// Return once the navigation has been committed.
    Commit,
    /// Return once `load` fires.
    #[default]
    Load,
    /// Return once the network has been idle for a while.
    NetworkIdle,
}

impl WaitUntil {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitUntil::Commit => "commit",
            WaitUntil::Load => "load",
            WaitUntil::NetworkIdle => "networkidle",
        }
    }
}

#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate the tab to an absolute URL.
    async fn goto(&self, url: &str, wait_until: WaitUntil, timeout: Duration) -> E2eResult<()>;

    /// Wait until `selector` is visible. Resolves to `false` on timeout.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> E2eResult<bool>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> E2eResult<()>;

    /// Select all existing content of an input and delete it.
    async fn clear(&self, selector: &str) -> E2eResult<()>;

    /// Type `text` key by key into the first element matching `selector`.
    async fn type_text(&self, selector: &str, text: &str) -> E2eResult<()>;

    /// Press a key on whatever element has focus.
    async fn press_key(&self, key: &str) -> E2eResult<()>;

    async fn screenshot(&self, path: &Path, full_page: bool) -> E2eResult<()>;

    /// Read a key from the page's `localStorage`.
    async fn storage_get(&self, key: &str) -> E2eResult<Option<String>>;

    /// Write a key into the page's `localStorage`.
    async fn storage_set(&self, key: &str, value: &str) -> E2eResult<()>;

    /// Trimmed text content of every element matching `selector`, in document order.
    async fn texts(&self, selector: &str) -> E2eResult<Vec<String>>;

    /// Click the `index`-th element matching `selector`.
    async fn click_nth(&self, selector: &str, index: usize) -> E2eResult<()>;
}
