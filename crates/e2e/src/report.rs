//! Run report written after every journey

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::E2eResult;
use crate::scenario::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Passed,
    /// An observational check did not hold; the run continued.
    Warned,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub duration_ms: u64,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotRecord {
    pub name: String,
    pub path: PathBuf,

    /// sha256 of the file, if it could be read back
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub success: bool,
    pub duration_ms: u64,
    pub username: Option<String>,
    pub email: Option<String>,
    pub post_title: Option<String>,
    pub post_tag: Option<String>,

    /// Whether the published article showed up in the tag feed
    pub post_found: Option<bool>,

    pub stages: Vec<StageRecord>,
    pub screenshots: Vec<ScreenshotRecord>,
    pub error: Option<String>,
}

impl ScenarioReport {
    pub fn record(&mut self, stage: Stage, outcome: StageOutcome, duration_ms: u64, message: Option<String>) {
        self.stages.push(StageRecord {
            stage,
            outcome,
            duration_ms,
            message,
        });
    }

    pub fn add_screenshot(&mut self, name: &str, path: PathBuf) {
        self.screenshots.push(ScreenshotRecord {
            name: name.to_string(),
            path,
            sha256: None,
        });
    }

    pub fn warnings(&self) -> impl Iterator<Item = &StageRecord> {
        self.stages
            .iter()
            .filter(|r| r.outcome == StageOutcome::Warned)
    }

    /// Fill in checksums for screenshots that exist on disk.
    pub fn hash_screenshots(&mut self) {
        for shot in &mut self.screenshots {
            shot.sha256 = std::fs::read(&shot.path)
                .ok()
                .map(|bytes| hex::encode(Sha256::digest(&bytes)));
        }
    }

    /// Write the report as pretty JSON into `dir`.
    pub fn write(&self, dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join("scenario-results.json");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
