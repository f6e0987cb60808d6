//! OpenAI chat completions backend

use calorie_types::{Provider, VisionError};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};

use super::prompts::MAX_REPLY_TOKENS;
use super::ProviderBackend;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    endpoint: String,
    model: String,
}

impl Default for OpenAiBackend {
    fn default() -> Self {
        Self {
            endpoint: OPENAI_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

impl OpenAiBackend {
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

impl ProviderBackend for OpenAiBackend {
    type Request = ChatRequest;

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorize(&self, request: RequestBuilder, api_key: &str) -> RequestBuilder {
        request.bearer_auth(api_key)
    }

    fn request_body(&self, image_base64: String, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/jpeg;base64,{image_base64}"),
                        },
                    },
                ],
            }],
            max_tokens: MAX_REPLY_TOKENS,
        }
    }

    fn reply_text(&self, body: &[u8]) -> Result<String, VisionError> {
        let parsed: ChatResponse = serde_json::from_slice(body).map_err(|e| {
            VisionError::InvalidResponse(format!("undecodable OpenAI envelope: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| VisionError::InvalidResponse("OpenAI reply had no message content".into()))
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}
