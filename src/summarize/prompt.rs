use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

use super::{ResponseFormat, SummaryError};
use crate::utils::format_timestamp;
use crate::youtube::TranscriptResult;

pub const TRANSCRIPT_SLOT: &str = "{{transcript}}";

pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
You are summarizing the transcript of the YouTube video \"{{title}}\" by {{author}} ({{url}}).

Write a concise summary in the transcript's language ({{language}}). Start with a short \
overview paragraph, then list the key points as bullet points. Do not invent facts that \
are not in the transcript.

Transcript:
{{transcript}}";

const STRUCTURED_INSTRUCTIONS: &str = "\n\nRespond with JSON only, no prose, in exactly this shape: \
{\"summary\": \"<overview paragraph>\", \"keyPoints\": [\"<point>\", \"...\"]}";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder pattern is a valid regex"));

/// A validated model answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    pub key_points: Vec<String>,
}

/// Fill the template slots from a transcript in a single pass.
///
/// Values are not rescanned, so a title containing `{{transcript}}` stays
/// literal. Unknown slots are left untouched.
pub fn render_prompt(
    template: &str,
    transcript: &TranscriptResult,
    format: ResponseFormat,
    timestamps: bool,
) -> String {
    let body = transcript_body(transcript, timestamps);

    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| match &caps[1] {
        "title" => transcript.title.clone(),
        "author" => transcript.author.clone(),
        "url" => transcript.url.clone(),
        "language" => transcript.language_code.clone(),
        "transcript" => body.clone(),
        _ => caps[0].to_string(),
    });

    match format {
        ResponseFormat::Markdown => rendered.into_owned(),
        ResponseFormat::Structured => format!("{}{}", rendered, STRUCTURED_INSTRUCTIONS),
    }
}

fn transcript_body(transcript: &TranscriptResult, timestamps: bool) -> String {
    if !timestamps {
        return transcript.text();
    }

    transcript
        .lines
        .iter()
        .map(|line| format!("[{}] {}", format_timestamp(line.offset_ms), line.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validate raw model output for the requested format
pub fn parse_response(raw: &str, format: ResponseFormat) -> Result<Summary, SummaryError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(SummaryError::InvalidResponse("empty response".to_string()));
    }

    match format {
        ResponseFormat::Markdown => Ok(Summary {
            text: trimmed.to_string(),
            key_points: Vec::new(),
        }),
        ResponseFormat::Structured => parse_structured(trimmed),
    }
}

/// Accept `{"summary": string, "keyPoints": [string]}`, bare or in a code fence
pub fn parse_structured(raw: &str) -> Result<Summary, SummaryError> {
    let json = strip_code_fence(raw.trim());

    let value: Value = serde_json::from_str(json)
        .map_err(|e| SummaryError::InvalidResponse(format!("not JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| SummaryError::InvalidResponse("expected a JSON object".to_string()))?;

    let text = object
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SummaryError::InvalidResponse("missing or empty 'summary'".to_string()))?;

    let key_points = match object.get("keyPoints") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| SummaryError::InvalidResponse("'keyPoints' must hold strings".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(SummaryError::InvalidResponse(
                "'keyPoints' must be an array".to_string(),
            ))
        }
    };

    Ok(Summary {
        text: text.to_string(),
        key_points,
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };

    // Drop the info string (e.g. `json`) on the opening fence line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::{TrackKind, TranscriptLine};

    fn transcript(title: &str) -> TranscriptResult {
        TranscriptResult {
            url: "https://www.youtube.com/watch?v=abc12345678".to_string(),
            video_id: "abc12345678".to_string(),
            title: title.to_string(),
            author: "Author".to_string(),
            channel_url: String::new(),
            language_code: "en".to_string(),
            track_kind: TrackKind::Asr,
            lines: vec![
                TranscriptLine { text: "hello".to_string(), offset_ms: 0, duration_ms: 1000 },
                TranscriptLine { text: "world".to_string(), offset_ms: 65_000, duration_ms: 1000 },
            ],
        }
    }

    #[test]
    fn test_render_fills_slots() {
        let prompt = render_prompt(
            "{{title}} / {{ author }} / {{url}} / {{language}} / {{transcript}}",
            &transcript("Talk"),
            ResponseFormat::Markdown,
            false,
        );
        assert_eq!(
            prompt,
            "Talk / Author / https://www.youtube.com/watch?v=abc12345678 / en / hello world"
        );
    }

    #[test]
    fn test_render_with_timestamps() {
        let prompt = render_prompt("{{transcript}}", &transcript("Talk"), ResponseFormat::Markdown, true);
        assert_eq!(prompt, "[00:00] hello\n[01:05] world");
    }

    #[test]
    fn test_render_does_not_expand_values() {
        let prompt = render_prompt(
            "{{title}}|{{unknown}}",
            &transcript("{{transcript}}"),
            ResponseFormat::Markdown,
            false,
        );
        assert_eq!(prompt, "{{transcript}}|{{unknown}}");
    }

    #[test]
    fn test_render_structured_appends_instructions() {
        let prompt = render_prompt(DEFAULT_PROMPT_TEMPLATE, &transcript("Talk"), ResponseFormat::Structured, false);
        assert!(prompt.contains("\"Talk\""));
        assert!(prompt.ends_with("\"keyPoints\": [\"<point>\", \"...\"]}"));
    }

    #[test]
    fn test_parse_structured_bare_and_fenced() {
        let bare = parse_structured(r#"{"summary": " Overview. ", "keyPoints": ["one", "two"]}"#).unwrap();
        assert_eq!(bare.text, "Overview.");
        assert_eq!(bare.key_points, vec!["one", "two"]);

        let fenced = parse_structured("```json\n{\"summary\": \"Fenced\", \"keyPoints\": []}\n```").unwrap();
        assert_eq!(fenced.text, "Fenced");
        assert!(fenced.key_points.is_empty());

        let no_points = parse_structured(r#"{"summary": "Only a summary"}"#).unwrap();
        assert!(no_points.key_points.is_empty());
    }

    #[test]
    fn test_parse_structured_rejects_bad_shapes() {
        let cases = [
            "plain prose",
            "[]",
            r#"{"summary": ""}"#,
            r#"{"summary": 42}"#,
            r#"{"summary": "ok", "keyPoints": "not a list"}"#,
            r#"{"summary": "ok", "keyPoints": [1, 2]}"#,
        ];

        for case in cases {
            assert!(
                matches!(parse_structured(case), Err(SummaryError::InvalidResponse(_))),
                "case: {}",
                case
            );
        }
    }

    #[test]
    fn test_parse_response_markdown() {
        let summary = parse_response("\n## Summary\n\n- point\n", ResponseFormat::Markdown).unwrap();
        assert_eq!(summary.text, "## Summary\n\n- point");
        assert!(parse_response("   ", ResponseFormat::Markdown).is_err());
    }
}
