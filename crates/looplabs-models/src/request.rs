//! Generation request body.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// Prompt used when the caller supplies neither `prompt` nor `text`.
pub const DEFAULT_PROMPT: &str = "Default text";

/// Theme used when the caller does not pick one.
pub const DEFAULT_THEME: &str = "dark";

/// Clip length in seconds when the caller does not pick one.
pub const DEFAULT_DURATION_SECS: u32 = 5;

/// A request to render a video.
///
/// Every field is optional. Fields the gateway does not know about are kept in
/// `extra` so the full payload can be echoed into the job metadata and handed
/// to the render engine untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct GenerateRequest {
    /// Creative prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Legacy alias for `prompt`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Visual theme
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,

    /// Clip length in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 600))]
    pub duration: Option<u32>,

    /// Media references (URLs or engine-specific objects)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<Vec<String>>,

    /// Whether background audio is wanted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<bool>,

    /// Brand kit: a flag, a name, or an object understood by the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<Value>,

    /// Unknown fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GenerateRequest {
    /// Prompt supplied by the caller: `prompt`, else `text`, ignoring blanks.
    pub fn supplied_prompt(&self) -> Option<&str> {
        [self.prompt.as_deref(), self.text.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
    }

    /// Prompt handed to the engine, falling back to [`DEFAULT_PROMPT`].
    pub fn effective_prompt(&self) -> &str {
        self.supplied_prompt().unwrap_or(DEFAULT_PROMPT)
    }

    pub fn theme_or_default(&self) -> &str {
        self.theme.as_deref().unwrap_or(DEFAULT_THEME)
    }

    pub fn duration_or_default(&self) -> u32 {
        self.duration.unwrap_or(DEFAULT_DURATION_SECS)
    }

    pub fn has_media(&self) -> bool {
        self.media.as_ref().is_some_and(|m| !m.is_empty())
    }

    pub fn has_keywords(&self) -> bool {
        self.keywords.as_ref().is_some_and(|k| !k.is_empty())
    }

    pub fn has_hashtags(&self) -> bool {
        self.hashtags.as_ref().is_some_and(|h| !h.is_empty())
    }

    pub fn wants_audio(&self) -> bool {
        self.audio == Some(true)
    }

    pub fn has_brand(&self) -> bool {
        self.brand.as_ref().is_some_and(is_truthy)
    }
}

/// JSON truthiness for loosely typed flags.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_resolution_order() {
        let req: GenerateRequest =
            serde_json::from_value(json!({"prompt": "neon city", "text": "ignored"})).unwrap();
        assert_eq!(req.effective_prompt(), "neon city");

        let req: GenerateRequest = serde_json::from_value(json!({"text": "ocean"})).unwrap();
        assert_eq!(req.effective_prompt(), "ocean");

        let req: GenerateRequest = serde_json::from_value(json!({"prompt": "  "})).unwrap();
        assert_eq!(req.supplied_prompt(), None);
        assert_eq!(req.effective_prompt(), DEFAULT_PROMPT);
    }

    #[test]
    fn test_defaults() {
        let req = GenerateRequest::default();
        assert_eq!(req.theme_or_default(), "dark");
        assert_eq!(req.duration_or_default(), 5);
        assert!(!req.has_media());
        assert!(!req.wants_audio());
        assert!(!req.has_brand());
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let body = json!({"prompt": "x", "aspect": "9:16", "fps": 24});
        let req: GenerateRequest = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(req.extra.get("aspect"), Some(&json!("9:16")));
        assert_eq!(serde_json::to_value(&req).unwrap(), body);
    }

    #[test]
    fn test_brand_truthiness() {
        for (brand, expected) in [
            (json!(true), true),
            (json!(false), false),
            (json!("acme"), true),
            (json!(""), false),
            (json!(0), false),
            (json!(1), true),
            (json!({"name": "acme"}), true),
            (json!({}), false),
            (json!(null), false),
        ] {
            let req: GenerateRequest = serde_json::from_value(json!({"brand": brand})).unwrap();
            assert_eq!(req.has_brand(), expected, "brand = {}", brand);
        }
    }

    #[test]
    fn test_duration_validation() {
        let ok: GenerateRequest = serde_json::from_value(json!({"duration": 10})).unwrap();
        assert!(ok.validate().is_ok());

        let zero: GenerateRequest = serde_json::from_value(json!({"duration": 0})).unwrap();
        assert!(zero.validate().is_err());

        let long: GenerateRequest = serde_json::from_value(json!({"duration": 601})).unwrap();
        assert!(long.validate().is_err());
    }
}
