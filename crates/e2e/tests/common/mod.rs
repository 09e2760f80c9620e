//! In-memory `Page` doubles for driving the journey without a browser.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use conduit_e2e::config::{Pacing, Timeouts};
use conduit_e2e::{E2eError, E2eResult, HarnessConfig, Page, WaitUntil};

/// A page with a fixed set of visible selectors.
#[derive(Default)]
pub struct StaticPage {
    pub visible: HashSet<String>,
    pub texts: HashMap<String, Vec<String>>,
    pub broken_clicks: HashSet<String>,

    /// Block for the full probe timeout when a selector is missing
    pub sleep_on_miss: bool,

    pub log: Mutex<Vec<String>>,
    pub storage: Mutex<HashMap<String, String>>,
}

impl StaticPage {
    pub fn with_visible(selectors: &[&str]) -> Self {
        Self {
            visible: selectors.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl Page for StaticPage {
    async fn goto(&self, url: &str, wait_until: WaitUntil, _timeout: Duration) -> E2eResult<()> {
        self.push(format!("goto:{}:{}", url, wait_until.as_str()));
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> E2eResult<bool> {
        self.push(format!("probe:{}", selector));
        let hit = self.visible.contains(selector);
        if !hit && self.sleep_on_miss {
            tokio::time::sleep(timeout).await;
        }
        Ok(hit)
    }

    async fn click(&self, selector: &str) -> E2eResult<()> {
        if self.broken_clicks.contains(selector) {
            return Err(E2eError::Playwright(format!("element detached: {}", selector)));
        }
        self.push(format!("click:{}", selector));
        Ok(())
    }

    async fn clear(&self, selector: &str) -> E2eResult<()> {
        self.push(format!("clear:{}", selector));
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> E2eResult<()> {
        self.push(format!("type:{}:{}", selector, text));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> E2eResult<()> {
        self.push(format!("press:{}", key));
        Ok(())
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> E2eResult<()> {
        self.push(format!("screenshot:{}", path.display()));
        Ok(())
    }

    async fn storage_get(&self, key: &str) -> E2eResult<Option<String>> {
        Ok(self.storage.lock().unwrap().get(key).cloned())
    }

    async fn storage_set(&self, key: &str, value: &str) -> E2eResult<()> {
        self.storage
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn texts(&self, selector: &str) -> E2eResult<Vec<String>> {
        Ok(self.texts.get(selector).cloned().unwrap_or_default())
    }

    async fn click_nth(&self, selector: &str, index: usize) -> E2eResult<()> {
        self.push(format!("click_nth:{}#{}", selector, index));
        Ok(())
    }
}

/// How the simulated app misbehaves.
#[derive(Debug, Clone)]
pub struct AppBehaviour {
    pub reachable: bool,
    pub registration_succeeds: bool,
    pub persists_token: bool,
    pub accepts_token: bool,
    pub shows_heading_after_publish: bool,
    pub lists_tags: bool,
    pub screenshots_fail: bool,
    /// Logged-in pages show a logout link
    pub shows_logout_control: bool,
    /// The editor has a tag input
    pub has_tag_input: bool,
}

impl Default for AppBehaviour {
    fn default() -> Self {
        Self {
            reachable: true,
            registration_succeeds: true,
            persists_token: true,
            accepts_token: true,
            shows_heading_after_publish: true,
            lists_tags: true,
            screenshots_fail: false,
            shows_logout_control: false,
            has_tag_input: true,
        }
    }
}

pub const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.test.sig";

const USERNAME: &str = r#"input[placeholder*="Username"]"#;
const EMAIL: &str = r#"input[placeholder*="Email"]"#;
const PASSWORD: &str = r#"input[placeholder*="Password"]"#;
const SUBMIT: &str = r#"button[type="submit"]"#;
const TITLE: &str = r#"input[placeholder*="Title"]"#;
const ABOUT: &str = r#"input[placeholder*="about"]"#;
const BODY: &str = r#"textarea[placeholder*="article"]"#;
const TAGS_INPUT: &str = r#"input[placeholder*="tags"]"#;
const LOGIN_LINK: &str = r#"a[href="/login"]"#;
const LOGOUT_LINK: &str = r#"a[href*="logout"]"#;
const TAG_PILL: &str = ".tag-list .tag-pill";
const PREVIEW: &str = "div.article-preview";

#[derive(Debug, Default)]
struct AppState {
    route: Option<String>,
    session: bool,
    storage: HashMap<String, String>,
    typed: HashMap<String, String>,
    pending_tags: Vec<String>,
    articles: Vec<(String, Vec<String>)>,
    feed_tag: Option<String>,
    log: Vec<String>,
    screenshots: Vec<PathBuf>,
}

/// A tiny model of the Conduit frontend: routes, a session, and a feed.
pub struct FakeConduit {
    base_url: String,
    behaviour: AppBehaviour,
    state: Mutex<AppState>,
}

impl FakeConduit {
    pub fn new(base_url: &str, behaviour: AppBehaviour) -> Self {
        let mut state = AppState::default();
        state
            .articles
            .push(("Welcome to Conduit".to_string(), vec!["welcome".to_string()]));
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            behaviour,
            state: Mutex::new(state),
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().screenshots.clone()
    }

    pub fn published_titles(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .articles
            .iter()
            .skip(1)
            .map(|(title, _)| title.clone())
            .collect()
    }

    pub fn visited(&self, path: &str) -> bool {
        let url = format!("{}/{}", self.base_url, path);
        self.log().iter().any(|l| l == &format!("goto:{}", url))
    }

    fn logged_in(&self, state: &AppState) -> bool {
        state.session
            || (self.behaviour.accepts_token
                && state.storage.get("jwt").map(String::as_str) == Some(TOKEN))
    }

    fn visible(&self, state: &AppState, selector: &str) -> bool {
        let Some(route) = state.route.as_deref() else {
            return false;
        };

        let common = match selector {
            "nav" => Some(true),
            ".user-pic" => Some(self.logged_in(state)),
            LOGIN_LINK => Some(!self.logged_in(state)),
            LOGOUT_LINK => Some(self.behaviour.shows_logout_control && self.logged_in(state)),
            TAGS_INPUT => Some(route == "editor" && self.behaviour.has_tag_input),
            _ => None,
        };
        if let Some(v) = common {
            return v;
        }

        match route {
            "register" => matches!(selector, "form" | USERNAME | EMAIL | PASSWORD | SUBMIT),
            "editor" => matches!(selector, "form" | TITLE | ABOUT | BODY | SUBMIT),
            "article" => selector == "h1" && self.behaviour.shows_heading_after_publish,
            _ => false,
        }
    }

    fn tag_list(&self, state: &AppState) -> Vec<String> {
        if !self.behaviour.lists_tags {
            return Vec::new();
        }
        let mut tags: Vec<String> = Vec::new();
        for (_, article_tags) in &state.articles {
            for tag in article_tags {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
        }
        tags
    }
}

#[async_trait]
impl Page for FakeConduit {
    async fn goto(&self, url: &str, _wait_until: WaitUntil, _timeout: Duration) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("goto:{}", url));

        if !self.behaviour.reachable {
            return Err(E2eError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_REFUSED".into(),
            });
        }

        let path = url
            .strip_prefix(&self.base_url)
            .unwrap_or(url)
            .trim_matches('/')
            .to_string();
        state.typed.clear();
        state.feed_tag = None;

        match path.as_str() {
            "logout" => {
                state.session = false;
                state.storage.remove("jwt");
                state.route = Some("home".into());
            }
            "" => state.route = Some("home".into()),
            other => state.route = Some(other.to_string()),
        }
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> E2eResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(self.visible(&state, selector))
    }

    async fn click(&self, selector: &str) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        if !self.visible(&state, selector) {
            return Err(E2eError::Playwright(format!("not visible: {}", selector)));
        }
        state.log.push(format!("click:{}", selector));

        let route = state.route.clone();
        match (route.as_deref(), selector) {
            (_, LOGOUT_LINK) => {
                state.session = false;
                state.storage.remove("jwt");
                state.route = Some("home".into());
            }
            (Some("register"), SUBMIT) if self.behaviour.registration_succeeds => {
                state.session = true;
                if self.behaviour.persists_token {
                    state.storage.insert("jwt".into(), TOKEN.into());
                }
            }
            (Some("editor"), SUBMIT) => {
                let title = state.typed.get(TITLE).cloned().unwrap_or_default();
                let tags = std::mem::take(&mut state.pending_tags);
                state.articles.push((title, tags));
                state.route = Some("article".into());
            }
            _ => {}
        }
        Ok(())
    }

    async fn clear(&self, selector: &str) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.typed.remove(selector);
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("type:{}:{}", selector, text));
        state
            .typed
            .entry(selector.to_string())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn press_key(&self, key: &str) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("press:{}", key));
        if key == "Enter" {
            if let Some(tag) = state.typed.remove(TAGS_INPUT) {
                state.pending_tags.push(tag);
            }
        }
        Ok(())
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> E2eResult<()> {
        if self.behaviour.screenshots_fail {
            return Err(E2eError::Playwright("screenshot failed".into()));
        }
        std::fs::write(path, b"\x89PNG fake")?;
        self.state.lock().unwrap().screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn storage_get(&self, key: &str) -> E2eResult<Option<String>> {
        Ok(self.state.lock().unwrap().storage.get(key).cloned())
    }

    async fn storage_set(&self, key: &str, value: &str) -> E2eResult<()> {
        self.state
            .lock()
            .unwrap()
            .storage
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn texts(&self, selector: &str) -> E2eResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        if state.route.as_deref() != Some("home") {
            return Ok(Vec::new());
        }
        match selector {
            TAG_PILL => Ok(self.tag_list(&state)),
            PREVIEW => Ok(state
                .articles
                .iter()
                .filter(|(_, tags)| match &state.feed_tag {
                    Some(tag) => tags.contains(tag),
                    None => true,
                })
                .map(|(title, _)| format!("{} Read more...", title))
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    async fn click_nth(&self, selector: &str, index: usize) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("click_nth:{}#{}", selector, index));
        if selector == TAG_PILL {
            let tags = self.tag_list(&state);
            let tag = tags
                .get(index)
                .cloned()
                .ok_or_else(|| E2eError::Playwright(format!("no tag #{}", index)))?;
            state.feed_tag = Some(tag);
        }
        Ok(())
    }
}

/// Config tuned for in-memory pages: no pauses, no reachability probe.
pub fn fast_config(base_url: &str, dir: &Path) -> HarnessConfig {
    HarnessConfig {
        base_url: base_url.to_string(),
        screenshot_dir: dir.join("screenshots"),
        results_dir: dir.join("results"),
        timeouts: Timeouts::instant(),
        pacing: Pacing::instant(),
        startup_wait_secs: 0,
        ..Default::default()
    }
}
