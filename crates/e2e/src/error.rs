//! Error types for the Conduit journey

use thiserror::Error;

use crate::scenario::Stage;

#[derive(Error, Debug)]
pub enum E2eError {
    /// Every candidate in a locator set failed to resolve in time.
    #[error("No element matched any of: {locators}")]
    ElementNotFound { locators: String },

    /// Scenario state needed by a later stage is absent.
    #[error("Precondition missing: {0}")]
    PreconditionMissing(String),

    /// A post-action check did not observe its marker.
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Playwright not found. Install with: npm i playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Target {url} unreachable after {attempts} attempts")]
    TargetUnreachable { url: String, attempts: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stage {stage} failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<E2eError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Wraps an error with the stage it aborted. Already-wrapped errors pass through.
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            E2eError::StageFailed { .. } => self,
            other => E2eError::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage that aborted the run, if this error came out of the scenario.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            E2eError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
