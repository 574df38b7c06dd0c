//! Caption (SRT) parsing and formatting.
//!
//! Captions ride along with the timeline; the chunked pipeline never touches
//! the pixel stream with them unless the subtitle-burn pass is enabled, but
//! the parsed form is normalized back to SRT before FFmpeg sees it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single timed caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Caption {
    pub text: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// Parse SRT content into ordered captions.
///
/// Lenient: blank cues and unparsable blocks are skipped rather than failing
/// the whole document, since subtitle data is advisory to the pipeline.
pub fn parse_srt(content: &str) -> Vec<Caption> {
    let mut captions = Vec::new();

    for block in content.replace("\r\n", "\n").split("\n\n") {
        let mut lines = block.lines().filter(|l| !l.trim().is_empty()).peekable();

        // Optional numeric index line
        if let Some(first) = lines.peek() {
            if first.trim().parse::<u64>().is_ok() {
                lines.next();
            }
        }

        let Some(timing) = lines.next() else { continue };
        let Some((start, end)) = parse_timing_line(timing) else {
            continue;
        };

        let text = lines.collect::<Vec<_>>().join("\n");
        if text.is_empty() {
            continue;
        }

        captions.push(Caption {
            text,
            start_seconds: start,
            end_seconds: end,
        });
    }

    captions
}

/// Format captions back into SRT.
pub fn format_srt(captions: &[Caption]) -> String {
    let mut out = String::new();
    for (i, c) in captions.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_timestamp(c.start_seconds),
            format_srt_timestamp(c.end_seconds),
            c.text
        ));
    }
    out
}

/// Parse "HH:MM:SS,mmm --> HH:MM:SS,mmm".
fn parse_timing_line(line: &str) -> Option<(f64, f64)> {
    let (start, end) = line.split_once("-->")?;
    Some((
        parse_srt_timestamp(start.trim())?,
        parse_srt_timestamp(end.trim())?,
    ))
}

fn parse_srt_timestamp(s: &str) -> Option<f64> {
    // Accept both "," and "." as the millisecond separator
    let s = s.replace(',', ".");
    let mut parts = s.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let secs = (total_ms / 1000) % 60;
    let mins = (total_ms / 60_000) % 60;
    let hours = total_ms / 3_600_000;
    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:00,000 --> 00:00:02,500\nHello there\n\n2\n00:00:02,500 --> 00:00:05,000\nSecond line\nwith a wrap\n";

    #[test]
    fn test_parse_srt() {
        let caps = parse_srt(SAMPLE);
        assert_eq!(caps.len(), 2);
        assert_eq!(caps[0].text, "Hello there");
        assert!((caps[0].end_seconds - 2.5).abs() < 1e-9);
        assert_eq!(caps[1].text, "Second line\nwith a wrap");
    }

    #[test]
    fn test_parse_skips_malformed_blocks() {
        let caps = parse_srt("garbage\n\n1\n00:00:00,000 --> 00:00:01,000\nok\n");
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].text, "ok");
    }

    #[test]
    fn test_round_trip() {
        let caps = parse_srt(SAMPLE);
        let formatted = format_srt(&caps);
        assert_eq!(parse_srt(&formatted), caps);
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(format_srt_timestamp(3661.25), "01:01:01,250");
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
    }
}
