//! AI prompts for food photo analysis
//!
//! Both providers receive the same instruction. The model is told to treat
//! the photo as exactly one serving; portion scaling happens later through
//! the entry's serving count.

/// Instruction sent alongside every food photo
pub const FOOD_ANALYSIS_PROMPT: &str = r#"Analyze this food image and provide:
1. A brief description of the food items
2. An estimated calorie count for ONE SERVING of the food shown

IMPORTANT: Assume this is one serving. Estimate calories for a single serving of what you see.

Respond in JSON format:
{
  "description": "Brief food description",
  "calories": estimated_number
}"#;

/// Token budget for the model reply
pub const MAX_REPLY_TOKENS: u32 = 300;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_requests_json_keys() {
        assert!(FOOD_ANALYSIS_PROMPT.contains("\"description\""));
        assert!(FOOD_ANALYSIS_PROMPT.contains("\"calories\""));
        assert!(FOOD_ANALYSIS_PROMPT.contains("ONE SERVING"));
    }
}
