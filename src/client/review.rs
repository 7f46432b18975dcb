//! Prompt assembly and response parsing for the generation/review cycle.
//!
//! Prompts here are deliberately structural (what fields to produce, what
//! format to reply in); editorial voice and domain content belong to the
//! caller's input, not this crate.

use serde::Deserialize;

use crate::types::{ContentResult, Message};
use crate::{Error, Result};

/// Evaluator verdict for one generated draft.
#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    pub pass: bool,
    #[serde(default)]
    pub feedback: String,
}

pub fn generation_messages(raw_content: &str, feedback: Option<&str>) -> Vec<Message> {
    let mut messages = vec![Message::system(
        "You turn raw source material into social media post content. \
         Reply with a single JSON object with exactly these fields: \
         \"titles\" (array of 3 candidate titles), \"body\" (post text), \
         \"tags\" (array of topic tags), \"image_prompts\" (array of 1-3 \
         text-to-image prompts illustrating the post). Reply with JSON only.",
    )];
    messages.push(Message::user(raw_content.to_string()));
    if let Some(feedback) = feedback {
        messages.push(Message::user(format!(
            "The previous draft was reviewed and found lacking: {}. \
             Produce an improved version, same JSON format.",
            feedback
        )));
    }
    messages
}

pub fn review_messages(result: &ContentResult) -> Vec<Message> {
    vec![
        Message::system(
            "You review generated social media content for completeness and \
             coherence. Reply with a single JSON object: {\"pass\": bool, \
             \"feedback\": string}. Fail only for concrete defects (empty \
             body, titles unrelated to the body, missing tags).",
        ),
        Message::user(serde_json::to_string(result).unwrap_or_default()),
    ]
}

/// Strip a Markdown code fence if the model wrapped its JSON in one.
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim_start().strip_suffix("```").unwrap_or(inner).trim()
}

pub fn parse_content(text: &str) -> Result<ContentResult> {
    let result: ContentResult = serde_json::from_str(strip_fence(text)).map_err(|e| {
        Error::validation(format!("generation response is not valid content JSON: {}", e))
    })?;
    if result.body.trim().is_empty() {
        return Err(Error::validation("generation response has an empty body"));
    }
    Ok(result)
}

/// Parse the evaluator's verdict. Unparseable output counts as a pass:
/// evaluator noise must not consume generation attempts or fail a request
/// that already has a usable draft.
pub fn parse_review(text: &str) -> Review {
    serde_json::from_str(strip_fence(text)).unwrap_or(Review {
        pass: true,
        feedback: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ContentResult {
        ContentResult {
            titles: vec!["t1".into()],
            body: "body text".into(),
            tags: vec!["tag".into()],
            image_prompts: vec!["a scene".into()],
        }
    }

    #[test]
    fn test_parse_content_plain_json() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(parse_content(&json).unwrap(), sample());
    }

    #[test]
    fn test_parse_content_fenced_json() {
        let fenced = format!("```json\n{}\n```", serde_json::to_string(&sample()).unwrap());
        assert_eq!(parse_content(&fenced).unwrap(), sample());
    }

    #[test]
    fn test_parse_content_rejects_empty_body() {
        let err = parse_content(
            r#"{"titles": ["t"], "body": "  ", "tags": [], "image_prompts": []}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn test_parse_review_verdicts() {
        let fail = parse_review(r#"{"pass": false, "feedback": "body too short"}"#);
        assert!(!fail.pass);
        assert_eq!(fail.feedback, "body too short");

        let pass = parse_review(r#"{"pass": true}"#);
        assert!(pass.pass);
    }

    #[test]
    fn test_unparseable_review_counts_as_pass() {
        assert!(parse_review("looks good to me!").pass);
    }

    #[test]
    fn test_feedback_is_folded_into_regeneration_prompt() {
        let messages = generation_messages("raw", Some("titles off-topic"));
        assert_eq!(messages.len(), 3);
        assert!(messages[2].content.contains("titles off-topic"));
    }
}
