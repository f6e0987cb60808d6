//! Capture flow - photo in, logged entry out
//!
//! Reads the provider and key from settings, runs the analyzer as a
//! cancellable task and hands the result to the accounting engine. The
//! engine lock is only taken for the final insert, so settings can change
//! while a long analysis is in flight.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use calorie_types::{Error, FoodAnalysis, FoodEntry, Result, VisionError};
use calorie_vision::FoodAnalyzer;

use super::accounting::AccountingEngine;
use crate::config::env_api_key;

/// URL scheme the app registers for inbound triggers
pub const DEEP_LINK_SCHEME: &str = "countingworms";

/// Recognized inbound trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepLink {
    /// `countingworms://camera`: open the capture flow
    Camera,
}

impl DeepLink {
    /// Parse a trigger URL; scheme and host are case-insensitive
    pub fn parse(url: &str) -> Option<Self> {
        let (scheme, rest) = url.trim().split_once("://")?;
        if !scheme.eq_ignore_ascii_case(DEEP_LINK_SCHEME) {
            return None;
        }

        let host = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        if host.eq_ignore_ascii_case("camera") {
            Some(DeepLink::Camera)
        } else {
            None
        }
    }
}

/// Analysis-to-entry pipeline
pub struct CaptureFlow {
    engine: Arc<AccountingEngine>,
    analyzer: Arc<dyn FoodAnalyzer>,
    env_key_fallback: bool,
}

impl CaptureFlow {
    pub fn new(engine: Arc<AccountingEngine>, analyzer: Arc<dyn FoodAnalyzer>) -> Self {
        Self {
            engine,
            analyzer,
            env_key_fallback: false,
        }
    }

    /// Use `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` when no key is stored
    pub fn with_env_key_fallback(mut self, enabled: bool) -> Self {
        self.env_key_fallback = enabled;
        self
    }

    pub fn engine(&self) -> &Arc<AccountingEngine> {
        &self.engine
    }

    /// Analyze without logging anything
    pub async fn analyze(&self, image: &[u8], cancel: &CancellationToken) -> Result<FoodAnalysis> {
        let settings = self.engine.settings().await?;
        let provider = settings.provider;

        let api_key = if settings.has_api_key() {
            settings.api_key
        } else if let Some(key) = self.env_key_fallback.then(|| env_api_key(provider)).flatten() {
            key
        } else {
            return Err(VisionError::MissingCredential.into());
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(%provider, "analysis cancelled");
                Err(Error::Cancelled)
            }
            result = self.analyzer.analyze(image, provider, &api_key) => {
                result.map_err(|e| {
                    warn!(%provider, error = %e, "analysis failed");
                    Error::from(e)
                })
            }
        }
    }

    /// Analyze `image` and log it as a one-serving entry with the photo kept
    pub async fn capture(&self, image: Vec<u8>, cancel: &CancellationToken) -> Result<FoodEntry> {
        let analysis = self.analyze(&image, cancel).await?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        self.engine
            .add_entry(
                Some(image),
                &analysis.description,
                analysis.calories_per_serving,
            )
            .await
    }

    /// Route an inbound trigger into the capture path
    pub async fn dispatch(
        &self,
        link: DeepLink,
        image: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<FoodEntry> {
        match link {
            DeepLink::Camera => self.capture(image, cancel).await,
        }
    }
}
