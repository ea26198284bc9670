//! Readiness heuristic.
//!
//! A rough 0-100 measure of how much creative direction a request carries.
//! Six optional fields each contribute a fixed weight when present.

use crate::GenerateRequest;

/// Upper bound of the readiness score.
pub const MAX_READINESS: u8 = 100;

/// Per-field weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessWeights {
    pub prompt: u8,
    pub media: u8,
    pub keywords: u8,
    pub hashtags: u8,
    pub audio: u8,
    pub brand: u8,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        Self {
            prompt: 25,
            media: 25,
            keywords: 20,
            hashtags: 15,
            audio: 10,
            brand: 5,
        }
    }
}

impl ReadinessWeights {
    /// Score a request with these weights, capped at [`MAX_READINESS`].
    pub fn score(&self, request: &GenerateRequest) -> u8 {
        let parts = [
            (request.supplied_prompt().is_some(), self.prompt),
            (request.has_media(), self.media),
            (request.has_keywords(), self.keywords),
            (request.has_hashtags(), self.hashtags),
            (request.wants_audio(), self.audio),
            (request.has_brand(), self.brand),
        ];

        let total: u32 = parts
            .iter()
            .filter(|(present, _)| *present)
            .map(|(_, weight)| u32::from(*weight))
            .sum();

        total.min(u32::from(MAX_READINESS)) as u8
    }
}

/// Score a request with the default weights.
pub fn readiness_score(request: &GenerateRequest) -> u8 {
    ReadinessWeights::default().score(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn req(body: serde_json::Value) -> GenerateRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_empty_request_scores_zero() {
        assert_eq!(readiness_score(&GenerateRequest::default()), 0);
    }

    #[test]
    fn test_full_request_scores_hundred() {
        let r = req(json!({
            "prompt": "sunset loop",
            "media": ["https://cdn.example.com/a.png"],
            "keywords": ["calm"],
            "hashtags": ["#loop"],
            "audio": true,
            "brand": "acme"
        }));
        assert_eq!(readiness_score(&r), 100);
    }

    #[test]
    fn test_individual_weights() {
        assert_eq!(readiness_score(&req(json!({"text": "hi"}))), 25);
        assert_eq!(readiness_score(&req(json!({"media": [{"url": "x"}]}))), 25);
        assert_eq!(readiness_score(&req(json!({"keywords": ["a", "b"]}))), 20);
        assert_eq!(readiness_score(&req(json!({"hashtags": ["#a"]}))), 15);
        assert_eq!(readiness_score(&req(json!({"audio": true}))), 10);
        assert_eq!(readiness_score(&req(json!({"brand": true}))), 5);
    }

    #[test]
    fn test_empty_and_false_fields_do_not_count() {
        let r = req(json!({
            "prompt": "",
            "media": [],
            "keywords": [],
            "hashtags": [],
            "audio": false,
            "brand": false
        }));
        assert_eq!(readiness_score(&r), 0);
    }

    #[test]
    fn test_unrelated_fields_are_ignored() {
        let r = req(json!({"theme": "light", "duration": 30, "fps": 60}));
        assert_eq!(readiness_score(&r), 0);
    }

    #[test]
    fn test_score_is_capped() {
        let heavy = ReadinessWeights {
            prompt: 90,
            media: 90,
            ..Default::default()
        };
        let r = req(json!({"prompt": "x", "media": ["y"]}));
        assert_eq!(heavy.score(&r), MAX_READINESS);
    }
}
