//! Vision module - AI-powered food photo analysis for calorie estimation
//!
//! [`VisionService::analyze`] sends one photo to the configured provider and
//! turns the reply into a description plus single-serving calorie estimate.
//! The call has no local side effects and may be retried freely; the model
//! is not deterministic, so retries can return different guesses.

pub mod ai;
pub mod image_data;
pub mod parse;

pub use ai::prompts::FOOD_ANALYSIS_PROMPT;
pub use ai::{ClaudeBackend, OpenAiBackend, ProviderBackend};
pub use image_data::{normalize_to_jpeg, sample_meal_image};
pub use parse::{parse_food_reply, parse_plain_text, strip_code_fences};

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use calorie_types::{FoodAnalysis, Provider, VisionError};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

/// Analyzer configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub timeout: Duration,
    pub openai_model: Option<String>,
    pub claude_model: Option<String>,
    pub openai_url: Option<String>,
    pub claude_url: Option<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            openai_model: None,
            claude_model: None,
            openai_url: None,
            claude_url: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_openai_model(mut self, model: Option<String>) -> Self {
        self.openai_model = model;
        self
    }

    pub fn with_claude_model(mut self, model: Option<String>) -> Self {
        self.claude_model = model;
        self
    }

    pub fn with_openai_url(mut self, url: Option<String>) -> Self {
        self.openai_url = url;
        self
    }

    pub fn with_claude_url(mut self, url: Option<String>) -> Self {
        self.claude_url = url;
        self
    }
}

/// Anything that can turn a food photo into a calorie estimate
#[async_trait]
pub trait FoodAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        image: &[u8],
        provider: Provider,
        api_key: &str,
    ) -> Result<FoodAnalysis, VisionError>;
}

/// Result of a credential check that got a successful reply
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionCheck {
    pub provider: Provider,
    /// Estimate for the test photo, if the reply contained one
    pub analysis: Option<FoodAnalysis>,
    /// Why the reply was not usable as an estimate
    pub note: Option<String>,
}

/// HTTP client for the supported providers
#[derive(Debug, Clone)]
pub struct VisionService {
    client: Client,
    openai: OpenAiBackend,
    claude: ClaudeBackend,
}

impl VisionService {
    pub fn new(config: AnalyzerConfig) -> Result<Self, VisionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(VisionError::network)?;

        let mut openai = OpenAiBackend::default();
        if let Some(model) = config.openai_model {
            openai = openai.with_model(model);
        }
        if let Some(url) = config.openai_url {
            openai = openai.with_endpoint(url);
        }

        let mut claude = ClaudeBackend::default();
        if let Some(model) = config.claude_model {
            claude = claude.with_model(model);
        }
        if let Some(url) = config.claude_url {
            claude = claude.with_endpoint(url);
        }

        Ok(Self {
            client,
            openai,
            claude,
        })
    }

    /// Analyze a food photo with `provider`
    pub async fn analyze(
        &self,
        image: &[u8],
        provider: Provider,
        api_key: &str,
    ) -> Result<FoodAnalysis, VisionError> {
        let reply = self.fetch_reply(image, provider, api_key).await?;
        let analysis = parse_food_reply(&reply)?;
        info!(
            %provider,
            calories = analysis.calories_per_serving,
            "food photo analyzed"
        );
        Ok(analysis)
    }

    /// Send the sample meal photo to check that `api_key` is accepted.
    ///
    /// Any successful reply means the credentials work, even when the model
    /// declines to estimate the photo.
    pub async fn test_connection(
        &self,
        provider: Provider,
        api_key: &str,
    ) -> Result<ConnectionCheck, VisionError> {
        let photo = sample_meal_image()?;
        let reply = self.fetch_reply(&photo, provider, api_key).await?;
        info!(%provider, "provider accepted credentials");

        Ok(match parse_food_reply(&reply) {
            Ok(analysis) => ConnectionCheck {
                provider,
                analysis: Some(analysis),
                note: None,
            },
            Err(e) => {
                debug!(%provider, error = %e, "test reply had no estimate");
                ConnectionCheck {
                    provider,
                    analysis: None,
                    note: Some(e.to_string()),
                }
            }
        })
    }

    /// Upload `image` and return the model's free-text reply
    async fn fetch_reply(
        &self,
        image: &[u8],
        provider: Provider,
        api_key: &str,
    ) -> Result<String, VisionError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(VisionError::MissingCredential);
        }

        let jpeg = normalize_to_jpeg(image)?;
        let encoded = BASE64_STANDARD.encode(&jpeg);

        info!(%provider, image_bytes = jpeg.len(), "analyzing food photo");
        let reply = match provider {
            Provider::OpenAi => self.complete(&self.openai, encoded, api_key).await?,
            Provider::Claude => self.complete(&self.claude, encoded, api_key).await?,
        };
        debug!(%provider, reply = %reply, "model reply");
        Ok(reply)
    }

    async fn complete<B: ProviderBackend>(
        &self,
        backend: &B,
        image_base64: String,
        api_key: &str,
    ) -> Result<String, VisionError> {
        let body = backend.request_body(image_base64, FOOD_ANALYSIS_PROMPT);
        let request = backend.authorize(self.client.post(backend.endpoint()), api_key);

        let response = request.json(&body).send().await.map_err(|e| {
            warn!(provider = %backend.provider(), error = %e, "provider request failed");
            VisionError::network(e)
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(VisionError::network)?;

        if !status.is_success() {
            let err = parse::api_error_from_body(status.as_u16(), &bytes);
            warn!(provider = %backend.provider(), %status, "provider returned an error");
            return Err(err);
        }

        backend.reply_text(&bytes)
    }
}

#[async_trait]
impl FoodAnalyzer for VisionService {
    async fn analyze(
        &self,
        image: &[u8],
        provider: Provider,
        api_key: &str,
    ) -> Result<FoodAnalysis, VisionError> {
        VisionService::analyze(self, image, provider, api_key).await
    }
}
