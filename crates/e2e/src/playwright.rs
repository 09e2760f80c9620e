//! Playwright browser automation
//!
//! A single `node` process runs an embedded bridge script that owns the
//! browser, one context and one page. Requests and responses are exchanged
//! as newline-delimited JSON over the child's stdin/stdout, strictly one at
//! a time.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::page::{Page, WaitUntil};

/// Extra time granted to the bridge on top of a command's own timeout.
const RESPONSE_GRACE: Duration = Duration::from_secs(5);

const BRIDGE_SCRIPT: &str = r#"
const readline = require('readline');
const playwright = require('playwright');

const config = JSON.parse(process.argv[2]);

function reply(msg) {
  process.stdout.write(JSON.stringify(msg) + '\n');
}

(async () => {
  const browser = await playwright[config.browser].launch({
    headless: config.headless,
    slowMo: config.slowMo,
    args: config.browser === 'chromium' ? ['--no-sandbox', '--disable-setuid-sandbox'] : [],
  });
  const context = await browser.newContext({
    viewport: { width: config.width, height: config.height },
  });
  const page = await context.newPage();

  const handlers = {
    goto: async (c) => {
      await page.goto(c.url, { waitUntil: c.waitUntil, timeout: c.timeoutMs });
      return null;
    },
    waitForSelector: async (c) => {
      try {
        await page.waitForSelector(c.selector, { state: 'visible', timeout: c.timeoutMs });
        return true;
      } catch (e) {
        if (e instanceof playwright.errors.TimeoutError) return false;
        throw e;
      }
    },
    click: async (c) => {
      await page.click(c.selector);
      return null;
    },
    clear: async (c) => {
      const el = await page.$(c.selector);
      if (!el) throw new Error('no element for ' + c.selector);
      await el.click({ clickCount: 3 });
      await el.press('Backspace');
      return null;
    },
    type: async (c) => {
      await page.type(c.selector, c.text, { delay: c.delayMs });
      return null;
    },
    press: async (c) => {
      await page.keyboard.press(c.key);
      return null;
    },
    screenshot: async (c) => {
      await page.screenshot({ path: c.path, fullPage: c.fullPage });
      return null;
    },
    storageGet: async (c) => page.evaluate((k) => localStorage.getItem(k), c.key),
    storageSet: async (c) => {
      await page.evaluate(([k, v]) => localStorage.setItem(k, v), [c.key, c.value]);
      return null;
    },
    texts: async (c) =>
      page.$$eval(c.selector, (els) => els.map((e) => (e.textContent || '').trim())),
    clickNth: async (c) => {
      const els = await page.$$(c.selector);
      if (c.index >= els.length) throw new Error('no element #' + c.index + ' for ' + c.selector);
      await els[c.index].click();
      return null;
    },
    close: async () => {
      await browser.close();
      return null;
    },
  };

  reply({ ready: true });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    const c = JSON.parse(line);
    try {
      const value = await handlers[c.cmd](c);
      reply({ id: c.id, ok: true, value });
    } catch (e) {
      reply({ id: c.id, ok: false, error: String(e && e.message ? e.message : e) });
    }
    if (c.cmd === 'close') break;
  }
  process.exit(0);
})().catch((e) => {
  reply({ ready: false, error: String(e && e.message ? e.message : e) });
  process.exit(1);
});
"#;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{}'", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub slow_mo_ms: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Per-key delay when typing
    pub type_delay_ms: u64,

    /// How long to wait for the browser to come up
    pub launch_timeout: Duration,

    /// Node executable
    pub node_binary: String,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            slow_mo_ms: 0,
            viewport_width: 1280,
            viewport_height: 800,
            type_delay_ms: 20,
            launch_timeout: Duration::from_secs(60),
            node_binary: "node".to_string(),
        }
    }
}

/// Launch parameters handed to the bridge on its command line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LaunchArgs<'a> {
    browser: &'a str,
    headless: bool,
    slow_mo: u64,
    width: u32,
    height: u32,
}

/// One request to the bridge.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub(crate) enum BridgeCommand {
    #[serde(rename_all = "camelCase")]
    Goto {
        url: String,
        wait_until: &'static str,
        timeout_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    WaitForSelector { selector: String, timeout_ms: u64 },
    Click { selector: String },
    Clear { selector: String },
    #[serde(rename_all = "camelCase")]
    Type {
        selector: String,
        text: String,
        delay_ms: u64,
    },
    Press { key: String },
    #[serde(rename_all = "camelCase")]
    Screenshot { path: String, full_page: bool },
    StorageGet { key: String },
    StorageSet { key: String, value: String },
    Texts { selector: String },
    ClickNth { selector: String, index: usize },
    Close,
}

impl BridgeCommand {
    /// How long to wait for the bridge's answer.
    fn deadline(&self) -> Duration {
        let own = match self {
            BridgeCommand::Goto { timeout_ms, .. }
            | BridgeCommand::WaitForSelector { timeout_ms, .. } => {
                Duration::from_millis(*timeout_ms)
            }
            BridgeCommand::Type { text, delay_ms, .. } => {
                Duration::from_millis(delay_ms.saturating_mul(text.chars().count() as u64))
            }
            _ => Duration::from_secs(30),
        };
        own + RESPONSE_GRACE
    }

    fn name(&self) -> String {
        match self {
            BridgeCommand::Goto { url, .. } => format!("goto:{}", url),
            BridgeCommand::WaitForSelector { selector, .. } => format!("wait:{}", selector),
            BridgeCommand::Click { selector } => format!("click:{}", selector),
            BridgeCommand::Clear { selector } => format!("clear:{}", selector),
            BridgeCommand::Type { selector, .. } => format!("type:{}", selector),
            BridgeCommand::Press { key } => format!("press:{}", key),
            BridgeCommand::Screenshot { path, .. } => format!("screenshot:{}", path),
            BridgeCommand::StorageGet { key } => format!("storage-get:{}", key),
            BridgeCommand::StorageSet { key, .. } => format!("storage-set:{}", key),
            BridgeCommand::Texts { selector } => format!("texts:{}", selector),
            BridgeCommand::ClickNth { selector, index } => format!("click-nth:{}#{}", selector, index),
            BridgeCommand::Close => "close".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    command: &'a BridgeCommand,
}

/// One line written by the bridge.
#[derive(Debug, Deserialize)]
pub(crate) struct BridgeReply {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
}

struct Channel {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

/// Handle to a running browser tab driven through Playwright.
pub struct PlaywrightHandle {
    child: Child,
    channel: Mutex<Channel>,
    type_delay_ms: u64,

    // The bridge script lives here until the handle is dropped.
    _script_dir: tempfile::TempDir,
}

impl PlaywrightHandle {
    /// Check if Playwright is installed
    pub fn check_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Start the bridge and wait until the page is open.
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        Self::check_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let args = serde_json::to_string(&LaunchArgs {
            browser: config.browser.as_str(),
            headless: config.headless,
            slow_mo: config.slow_mo_ms,
            width: config.viewport_width,
            height: config.viewport_height,
        })?;

        info!(
            "Launching {} (headless: {}, viewport: {}x{})",
            config.browser.as_str(),
            config.headless,
            config.viewport_width,
            config.viewport_height
        );

        // Resolve `playwright` from the caller's node_modules, not the temp dir.
        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .arg(args)
            .env("NODE_PATH", node_path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Playwright(format!("Failed to spawn {}: {}", config.node_binary, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".into()))?;

        let mut channel = Channel {
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
        };

        let ready = read_reply(&mut channel.stdout, config.launch_timeout, "browser launch").await?;
        if ready.ready != Some(true) {
            return Err(E2eError::Playwright(format!(
                "Browser failed to launch: {}",
                ready.error.unwrap_or_else(|| "unknown error".into())
            )));
        }

        debug!("Playwright bridge ready (pid: {:?})", child.id());

        Ok(Self {
            child,
            channel: Mutex::new(channel),
            type_delay_ms: config.type_delay_ms,
            _script_dir: script_dir,
        })
    }

    /// Send one command and wait for its reply.
    async fn request(&self, command: BridgeCommand) -> E2eResult<serde_json::Value> {
        let mut channel = self.channel.lock().await;
        let id = channel.next_id;
        channel.next_id += 1;

        let mut line = serde_json::to_string(&Envelope {
            id,
            command: &command,
        })?;
        line.push('\n');

        debug!("→ {}", command.name());
        channel.stdin.write_all(line.as_bytes()).await?;
        channel.stdin.flush().await?;

        loop {
            let reply = read_reply(&mut channel.stdout, command.deadline(), &command.name()).await?;
            match reply.id {
                Some(reply_id) if reply_id == id => {
                    return if reply.ok {
                        Ok(reply.value)
                    } else {
                        Err(E2eError::Playwright(format!(
                            "{}: {}",
                            command.name(),
                            reply.error.unwrap_or_else(|| "unknown error".into())
                        )))
                    };
                }
                other => warn!("Discarding stale bridge reply {:?}", other),
            }
        }
    }

    /// Close the browser and stop the bridge.
    pub async fn close(mut self) -> E2eResult<()> {
        info!("Closing browser (pid: {:?})", self.child.id());

        if let Err(e) = self.request(BridgeCommand::Close).await {
            warn!("Browser did not close cleanly: {}", e);
        }

        // Give it a moment to exit on its own before signalling.
        if tokio::time::timeout(Duration::from_secs(2), self.child.wait())
            .await
            .is_ok()
        {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                    && tokio::time::timeout(Duration::from_millis(500), self.child.wait())
                        .await
                        .is_ok()
                {
                    return Ok(());
                }
            }
        }

        let _ = self.child.kill().await;
        Ok(())
    }
}

/// Read the next reply line, bounded by `limit`.
async fn read_reply(
    stdout: &mut Lines<BufReader<ChildStdout>>,
    limit: Duration,
    what: &str,
) -> E2eResult<BridgeReply> {
    let line = tokio::time::timeout(limit, stdout.next_line())
        .await
        .map_err(|_| E2eError::Timeout(what.to_string()))??
        .ok_or_else(|| E2eError::Playwright(format!("bridge exited during {}", what)))?;

    parse_reply(&line)
}

pub(crate) fn parse_reply(line: &str) -> E2eResult<BridgeReply> {
    serde_json::from_str(line.trim()).map_err(E2eError::from)
}

/// `NODE_PATH` pointing at the working directory's `node_modules`, followed by
/// whatever the environment already had.
fn node_path() -> String {
    let local = std::env::current_dir()
        .map(|d| d.join("node_modules").display().to_string())
        .unwrap_or_else(|_| "node_modules".to_string());

    match std::env::var("NODE_PATH") {
        Ok(existing) if !existing.is_empty() => format!("{}:{}", local, existing),
        _ => local,
    }
}

/// Playwright reads `0` as "wait forever", so sub-millisecond budgets round up.
fn bridge_timeout_ms(timeout: Duration) -> u64 {
    (timeout.as_millis() as u64).max(1)
}

fn as_bool(value: serde_json::Value, what: &str) -> E2eResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| E2eError::Playwright(format!("{}: expected boolean, got {}", what, value)))
}

#[async_trait]
impl Page for PlaywrightHandle {
    async fn goto(&self, url: &str, wait_until: WaitUntil, timeout: Duration) -> E2eResult<()> {
        self.request(BridgeCommand::Goto {
            url: url.to_string(),
            wait_until: wait_until.as_str(),
            timeout_ms: bridge_timeout_ms(timeout),
        })
        .await
        .map(|_| ())
        .map_err(|e| E2eError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> E2eResult<bool> {
        let value = self
            .request(BridgeCommand::WaitForSelector {
                selector: selector.to_string(),
                timeout_ms: bridge_timeout_ms(timeout),
            })
            .await?;
        as_bool(value, selector)
    }

    async fn click(&self, selector: &str) -> E2eResult<()> {
        self.request(BridgeCommand::Click {
            selector: selector.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn clear(&self, selector: &str) -> E2eResult<()> {
        self.request(BridgeCommand::Clear {
            selector: selector.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn type_text(&self, selector: &str, text: &str) -> E2eResult<()> {
        self.request(BridgeCommand::Type {
            selector: selector.to_string(),
            text: text.to_string(),
            delay_ms: self.type_delay_ms,
        })
        .await
        .map(|_| ())
    }

    async fn press_key(&self, key: &str) -> E2eResult<()> {
        self.request(BridgeCommand::Press {
            key: key.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> E2eResult<()> {
        let absolute = std::env::current_dir()?.join(path);
        self.request(BridgeCommand::Screenshot {
            path: absolute.to_string_lossy().into_owned(),
            full_page,
        })
        .await
        .map(|_| ())
    }

    async fn storage_get(&self, key: &str) -> E2eResult<Option<String>> {
        let value = self
            .request(BridgeCommand::StorageGet {
                key: key.to_string(),
            })
            .await?;
        Ok(value.as_str().map(str::to_owned))
    }

    async fn storage_set(&self, key: &str, value: &str) -> E2eResult<()> {
        self.request(BridgeCommand::StorageSet {
            key: key.to_string(),
            value: value.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn texts(&self, selector: &str) -> E2eResult<Vec<String>> {
        let value = self
            .request(BridgeCommand::Texts {
                selector: selector.to_string(),
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn click_nth(&self, selector: &str, index: usize) -> E2eResult<()> {
        self.request(BridgeCommand::ClickNth {
            selector: selector.to_string(),
            index,
        })
        .await
        .map(|_| ())
    }
}
