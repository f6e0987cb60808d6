//! Anthropic messages API backend

use calorie_types::{Provider, VisionError};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};

use super::prompts::MAX_REPLY_TOKENS;
use super::ProviderBackend;

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const CLAUDE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct ClaudeBackend {
    endpoint: String,
    model: String,
}

impl Default for ClaudeBackend {
    fn default() -> Self {
        Self {
            endpoint: CLAUDE_URL.to_string(),
            model: DEFAULT_CLAUDE_MODEL.to_string(),
        }
    }
}

impl ClaudeBackend {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ProviderBackend for ClaudeBackend {
    type Request = CreateMessageRequest;

    fn provider(&self) -> Provider {
        Provider::Claude
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorize(&self, request: RequestBuilder, api_key: &str) -> RequestBuilder {
        request
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
    }

    fn request_body(&self, image_base64: String, prompt: &str) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: MAX_REPLY_TOKENS,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            r#type: "base64",
                            media_type: "image/jpeg",
                            data: image_base64,
                        },
                    },
                    ContentBlock::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
        }
    }

    fn reply_text(&self, body: &[u8]) -> Result<String, VisionError> {
        let parsed: CreateMessageResponse = serde_json::from_slice(body).map_err(|e| {
            VisionError::InvalidResponse(format!("undecodable Claude envelope: {e}"))
        })?;

        parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| VisionError::InvalidResponse("Claude reply had no text content".into()))
    }
}

#[derive(Debug, Serialize)]
pub struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    r#type: &'static str,
    media_type: &'static str,
    data: String,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Deserialize)]
struct ContentBlockResponse {
    #[serde(default)]
    text: Option<String>,
}
