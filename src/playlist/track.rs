use regex::Regex;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::sync::LazyLock;

/// Placeholder for artist and title when a line cannot be parsed.
pub const UNKNOWN_TEXT: &str = "unbekannt";

/// Placeholder duration when a line cannot be parsed.
pub const UNKNOWN_DURATION: &str = "??:??";

/// `Artist - Title (M:SS)`; minutes may have one to three digits.
static TRACK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(.+) *- *(.+) \((\d{1,3}:\d{2})\)").expect("track pattern is a valid regex")
});

/// One playlist entry.
///
/// Field names on the wire are kept short for the web client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// 1-based position in extraction order
    #[serde(rename = "n")]
    pub position: usize,
    #[serde(rename = "a")]
    pub artist: String,
    #[serde(rename = "tt")]
    pub title: String,
    #[serde(rename = "t")]
    pub duration: String,
    /// Trimmed source text of the list item
    #[serde(rename = "r")]
    pub raw: String,
    /// Identity hash, see [`track_hash`]
    #[serde(rename = "h")]
    pub hash: String,
}

impl Track {
    /// Build a record for the item at `position` with source text `raw`.
    pub fn from_line(position: usize, raw: &str) -> Self {
        let raw = raw.trim();
        let (artist, title, duration) = match parse_line(raw) {
            TrackLine::Matched {
                artist,
                title,
                duration,
            } => (artist, title, duration),
            TrackLine::Fallback => (
                UNKNOWN_TEXT.to_string(),
                UNKNOWN_TEXT.to_string(),
                UNKNOWN_DURATION.to_string(),
            ),
        };
        let hash = track_hash(position, &artist, &title, &duration, raw);

        Track {
            position,
            artist,
            title,
            duration,
            raw: raw.to_string(),
            hash,
        }
    }
}

/// Result of matching a list item against the track pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackLine {
    Matched {
        artist: String,
        title: String,
        duration: String,
    },
    /// Text did not look like a track; sentinels are used instead.
    Fallback,
}

/// Match `text` against the track pattern. Captured groups are trimmed.
pub fn parse_line(text: &str) -> TrackLine {
    match TRACK_PATTERN.captures(text) {
        Some(caps) => TrackLine::Matched {
            artist: caps[1].trim().to_string(),
            title: caps[2].trim().to_string(),
            duration: caps[3].trim().to_string(),
        },
        None => TrackLine::Fallback,
    }
}

/// SHA-1 over position, artist, title, duration and raw text, concatenated
/// in that order. Lowercase hex.
pub fn track_hash(position: usize, artist: &str, title: &str, duration: &str, raw: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(position.to_string().as_bytes());
    hasher.update(artist.as_bytes());
    hasher.update(title.as_bytes());
    hasher.update(duration.as_bytes());
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_artist_title_duration() {
        assert_eq!(
            parse_line("Abba - Waterloo (3:45)"),
            TrackLine::Matched {
                artist: "Abba".to_string(),
                title: "Waterloo".to_string(),
                duration: "3:45".to_string(),
            }
        );
    }

    #[test]
    fn splits_on_last_separator() {
        // Greedy artist group splits on the last hyphen
        let TrackLine::Matched { artist, title, .. } = parse_line("AC-DC - Thunderstruck (4:52)")
        else {
            panic!("expected a match");
        };
        assert_eq!(artist, "AC-DC");
        assert_eq!(title, "Thunderstruck");
    }

    #[test]
    fn accepts_three_digit_minutes() {
        let TrackLine::Matched { duration, .. } = parse_line("Yes - Close to the Edge (118:05)")
        else {
            panic!("expected a match");
        };
        assert_eq!(duration, "118:05");
    }

    #[test]
    fn rejects_text_without_duration() {
        assert_eq!(parse_line("???"), TrackLine::Fallback);
        assert_eq!(parse_line("Abba - Waterloo"), TrackLine::Fallback);
        assert_eq!(parse_line("Abba - Waterloo (3:4)"), TrackLine::Fallback);
        assert_eq!(parse_line(""), TrackLine::Fallback);
    }

    #[test]
    fn worked_example_match() {
        let track = Track::from_line(3, "Abba - Waterloo (3:45)");

        assert_eq!(track.position, 3);
        assert_eq!(track.artist, "Abba");
        assert_eq!(track.title, "Waterloo");
        assert_eq!(track.duration, "3:45");
        assert_eq!(track.raw, "Abba - Waterloo (3:45)");

        let expected = hex::encode(Sha1::digest(
            "3AbbaWaterloo3:45Abba - Waterloo (3:45)".as_bytes(),
        ));
        assert_eq!(track.hash, expected);
    }

    #[test]
    fn worked_example_fallback() {
        let track = Track::from_line(5, "???");

        assert_eq!(track.position, 5);
        assert_eq!(track.artist, UNKNOWN_TEXT);
        assert_eq!(track.title, UNKNOWN_TEXT);
        assert_eq!(track.duration, UNKNOWN_DURATION);
        assert_eq!(track.raw, "???");
        assert_eq!(
            track.hash,
            track_hash(5, "unbekannt", "unbekannt", "??:??", "???")
        );
    }

    #[test]
    fn raw_text_is_trimmed() {
        let track = Track::from_line(1, "\n   Abba - Waterloo (3:45)  \n");
        assert_eq!(track.raw, "Abba - Waterloo (3:45)");
    }

    #[test]
    fn hash_is_deterministic_and_lowercase_hex() {
        let a = track_hash(1, "Abba", "Waterloo", "3:45", "Abba - Waterloo (3:45)");
        let b = track_hash(1, "Abba", "Waterloo", "3:45", "Abba - Waterloo (3:45)");

        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn hash_depends_on_position() {
        let a = track_hash(1, "Abba", "Waterloo", "3:45", "Abba - Waterloo (3:45)");
        let b = track_hash(2, "Abba", "Waterloo", "3:45", "Abba - Waterloo (3:45)");
        assert_ne!(a, b);
    }

    #[test]
    fn serializes_with_short_keys() {
        let track = Track::from_line(1, "Abba - Waterloo (3:45)");
        let json = serde_json::to_value(&track).unwrap();

        assert_eq!(json["n"], 1);
        assert_eq!(json["a"], "Abba");
        assert_eq!(json["tt"], "Waterloo");
        assert_eq!(json["t"], "3:45");
        assert_eq!(json["r"], "Abba - Waterloo (3:45)");
        assert_eq!(json["h"], track.hash.as_str());
    }
}
