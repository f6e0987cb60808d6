//! Parsing of the model's free-text reply into a calorie estimate
//!
//! Order of attempts:
//! 1. refusal phrases ("cannot see" etc.) fail fast with a no-food error
//! 2. strict JSON `{"description", "calories"}` after stripping code fences
//! 3. regex extraction from plain prose

use std::sync::LazyLock;

use calorie_types::{FoodAnalysis, VisionError};
use regex::Regex;
use serde::Deserialize;

/// Description used when the reply has no usable text line
pub const DEFAULT_DESCRIPTION: &str = "Food item";

pub const NO_FOOD_MESSAGE: &str =
    "The AI couldn't identify food in the image. Please take a clearer photo of food items.";

const UNKNOWN_API_ERROR: &str = "Unknown error from API";

const REFUSAL_PHRASES: [&str; 4] = ["unable to access", "cannot see", "can't see", "can’t see"];

/// Tried in order; the first pattern that matches anywhere wins
static CALORIE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(\d+)\s*(?:cal|kcal|calories)",
        r"(?i)calories:\s*(\d+)",
        r"(?i)estimated\s+calories:\s*(\d+)",
        r"(?i)approximately\s+(\d+)\s*calories",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("calorie pattern must compile"))
    .collect()
});

#[derive(Deserialize)]
struct JsonReply {
    description: String,
    calories: i64,
}

/// Turn the model's reply text into a [`FoodAnalysis`]
pub fn parse_food_reply(text: &str) -> Result<FoodAnalysis, VisionError> {
    if is_refusal(text) {
        return Err(VisionError::Api {
            status_code: 0,
            message: NO_FOOD_MESSAGE.to_string(),
        });
    }

    let stripped = strip_code_fences(text);
    if let Some(analysis) = parse_json_reply(&stripped) {
        return Ok(analysis);
    }

    tracing::debug!("reply is not JSON, falling back to plain-text extraction");
    parse_plain_text(text)
}

/// True when the model says it could not see the image
pub fn is_refusal(text: &str) -> bool {
    let lower = text.to_lowercase();
    REFUSAL_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Remove ```json / ``` fences and surrounding whitespace
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Strict JSON parse; also tries the outermost `{...}` slice when prose
/// surrounds the object
fn parse_json_reply(text: &str) -> Option<FoodAnalysis> {
    let candidates = [Some(text), outer_braces(text)];
    candidates
        .into_iter()
        .flatten()
        .find_map(|candidate| serde_json::from_str::<JsonReply>(candidate).ok())
        .and_then(|reply| {
            let calories = u32::try_from(reply.calories).ok().filter(|c| *c > 0)?;
            Some(FoodAnalysis {
                description: reply.description.trim().to_string(),
                calories_per_serving: calories,
            })
        })
}

fn outer_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Regex fallback for replies that ignored the JSON instruction
pub fn parse_plain_text(text: &str) -> Result<FoodAnalysis, VisionError> {
    let calories = CALORIE_PATTERNS
        .iter()
        .find_map(|pattern| {
            pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
        })
        .unwrap_or(0);

    if calories == 0 {
        return Err(VisionError::InvalidResponse(
            "could not parse calorie information from the AI response".to_string(),
        ));
    }

    let description = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(DEFAULT_DESCRIPTION)
        .to_string();

    Ok(FoodAnalysis {
        description,
        calories_per_serving: calories,
    })
}

/// Map a non-2xx response to an API error, reading `{"error":{"message"}}`
pub fn api_error_from_body(status_code: u16, body: &[u8]) -> VisionError {
    #[derive(Deserialize)]
    struct Envelope {
        error: ErrorBody,
    }

    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    let message = serde_json::from_slice::<Envelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| UNKNOWN_API_ERROR.to_string());

    VisionError::Api {
        status_code,
        message,
    }
}
