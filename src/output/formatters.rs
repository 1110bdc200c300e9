use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::OutputConfig;
use crate::summarize::Summary;
use crate::utils::{format_duration, format_subtitle_timestamp, format_timestamp, timestamp_link};
use crate::youtube::{get_thumbnail_url, ThumbnailQuality, TranscriptResult};

/// Plain text, optionally one `[mm:ss] line` per caption
pub fn format_as_text(result: &TranscriptResult, include_timestamps: bool) -> String {
    if !include_timestamps {
        return result.text();
    }

    result
        .lines
        .iter()
        .map(|line| format!("[{}] {}", format_timestamp(line.offset_ms), line.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full result as pretty JSON
pub fn format_as_json(result: &TranscriptResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

pub fn format_as_srt(result: &TranscriptResult) -> String {
    let mut out = String::new();

    for (index, line) in result.lines.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_subtitle_timestamp(line.offset_ms, ','),
            format_subtitle_timestamp(line.end_ms(), ','),
            line.text
        ));
    }

    out
}

pub fn format_as_vtt(result: &TranscriptResult) -> String {
    let mut out = String::from("WEBVTT\n\n");

    for line in &result.lines {
        out.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_subtitle_timestamp(line.offset_ms, '.'),
            format_subtitle_timestamp(line.end_ms(), '.'),
            line.text
        ));
    }

    out
}

/// Transcript section with each line linked to its position in the video
pub fn format_as_markdown(result: &TranscriptResult, include_timestamps: bool) -> String {
    let mut out = format!("# {}\n\n", heading_title(result));
    out.push_str(&byline(result));
    out.push_str("\n\n## Transcript\n\n");
    out.push_str(&transcript_section(result, include_timestamps));
    out
}

/// A complete note: front matter, thumbnail, summary and optional transcript
pub fn format_note(
    result: &TranscriptResult,
    summary: &Summary,
    options: &OutputConfig,
    thumbnail_quality: ThumbnailQuality,
    created: DateTime<Utc>,
) -> String {
    let mut out = String::new();

    out.push_str("---\n");
    out.push_str(&format!("title: {}\n", yaml_string(&result.title)));
    out.push_str(&format!("channel: {}\n", yaml_string(&result.author)));
    out.push_str(&format!("url: {}\n", yaml_string(&result.url)));
    out.push_str(&format!("video_id: {}\n", result.video_id));
    out.push_str(&format!("created: {}\n", created.format("%Y-%m-%dT%H:%M:%SZ")));
    out.push_str("---\n\n");

    out.push_str(&format!("# {}\n\n", heading_title(result)));

    if options.include_thumbnail {
        out.push_str(&format!(
            "![{}]({})\n\n",
            heading_title(result),
            get_thumbnail_url(&result.video_id, thumbnail_quality)
        ));
    }

    out.push_str(&byline(result));
    out.push_str("\n\n## Summary\n\n");
    out.push_str(summary.text.trim());
    out.push('\n');

    if !summary.key_points.is_empty() {
        out.push_str("\n### Key Points\n\n");
        for point in &summary.key_points {
            out.push_str(&format!("- {}\n", point));
        }
    }

    if options.include_transcript {
        out.push_str("\n## Transcript\n\n");
        out.push_str(&transcript_section(result, options.timestamps));
    }

    out
}

fn heading_title(result: &TranscriptResult) -> &str {
    if result.title.is_empty() {
        &result.video_id
    } else {
        &result.title
    }
}

fn byline(result: &TranscriptResult) -> String {
    let channel = match (result.author.is_empty(), result.channel_url.is_empty()) {
        (true, _) => "unknown channel".to_string(),
        (false, true) => result.author.clone(),
        (false, false) => format!("[{}]({})", result.author, result.channel_url),
    };

    let captions = if result.is_auto_generated() {
        format!("{} (auto-generated)", result.language_code)
    } else {
        result.language_code.clone()
    };

    format!(
        "**Channel:** {} · **Length:** {} · **Captions:** {} · [Watch]({})",
        channel,
        format_duration(result.duration_ms()),
        captions,
        result.url
    )
}

fn transcript_section(result: &TranscriptResult, include_timestamps: bool) -> String {
    if !include_timestamps {
        return format!("{}\n", result.text());
    }

    result
        .lines
        .iter()
        .map(|line| {
            format!(
                "- [{}]({}) {}\n",
                format_timestamp(line.offset_ms),
                timestamp_link(&result.video_id, line.offset_ms),
                line.text
            )
        })
        .collect()
}

/// Quote a value for YAML front matter. JSON strings are valid YAML scalars.
fn yaml_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
