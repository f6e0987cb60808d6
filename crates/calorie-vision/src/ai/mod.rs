//! Provider backends
//!
//! Each remote API is a [`ProviderBackend`]: it knows its endpoint, how to
//! authenticate, how to shape the request body and where the model's text
//! lives in the reply envelope. The HTTP round trip itself is shared.

pub mod claude;
pub mod openai;
pub mod prompts;

use calorie_types::{Provider, VisionError};
use reqwest::RequestBuilder;
use serde::Serialize;

pub use claude::ClaudeBackend;
pub use openai::OpenAiBackend;

/// Wire-format adapter for one AI provider
pub trait ProviderBackend: Send + Sync {
    type Request: Serialize + Send;

    fn provider(&self) -> Provider;

    fn endpoint(&self) -> &str;

    /// Attach provider-specific auth headers
    fn authorize(&self, request: RequestBuilder, api_key: &str) -> RequestBuilder;

    /// Build the multimodal request for a base64 JPEG and instruction
    fn request_body(&self, image_base64: String, prompt: &str) -> Self::Request;

    /// Pull the model's free-text reply out of a 2xx response body
    fn reply_text(&self, body: &[u8]) -> Result<String, VisionError>;
}
