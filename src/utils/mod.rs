/// Clock-style timestamp for a caption offset: `mm:ss`, or `h:mm:ss` past the hour
pub fn format_timestamp(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Subtitle timestamp `HH:MM:SS<sep>mmm`; SRT uses `,`, WebVTT uses `.`
pub fn format_subtitle_timestamp(ms: u64, separator: char) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1000;
    let millis = ms % 1000;

    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, secs, separator, millis)
}

/// Format duration in human-readable format
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Sanitize filename for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            match c {
                // Keep alphanumeric characters, spaces, hyphens, underscores, and dots
                c if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' || c == '.' => c,
                // Replace everything else with underscore
                _ => '_',
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Deep link into a video at a caption offset
pub fn timestamp_link(video_id: &str, ms: u64) -> String {
    format!("https://www.youtube.com/watch?v={}&t={}s", video_id, ms / 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "00:00");
        assert_eq!(format_timestamp(65_999), "01:05");
        assert_eq!(format_timestamp(3_661_000), "1:01:01");
    }

    #[test]
    fn test_format_subtitle_timestamp() {
        assert_eq!(format_subtitle_timestamp(0, ','), "00:00:00,000");
        assert_eq!(format_subtitle_timestamp(3_723_045, ','), "01:02:03,045");
        assert_eq!(format_subtitle_timestamp(1_500, '.'), "00:00:01.500");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30_000), "30s");
        assert_eq!(format_duration(90_000), "1m 30s");
        assert_eq!(format_duration(3_661_000), "1h 1m 1s");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Hello World!"), "Hello World_");
        assert_eq!(sanitize_filename("test/file?name"), "test_file_name");
        assert_eq!(sanitize_filename("  spaced  "), "spaced");
    }

    #[test]
    fn test_timestamp_link() {
        assert_eq!(
            timestamp_link("abc12345678", 61_900),
            "https://www.youtube.com/watch?v=abc12345678&t=61s"
        );
    }
}
