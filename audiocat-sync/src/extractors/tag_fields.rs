//! Tag field lookup and value normalization shared by every container reader

use lofty::tag::{ItemKey, Tag};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_GENRE: &str = "Unknown Genre";

/// Separators that end the primary artist credit (matched case-insensitively)
const ARTIST_SEPARATORS: [&str; 6] = [" feat. ", " feat ", " ft. ", " featuring ", " with ", " & "];

/// First non-blank text value for `key` across `tags`, in tag priority order
pub fn first_text(tags: &[&Tag], key: &ItemKey) -> Option<String> {
    tags.iter()
        .filter_map(|tag| tag.get_string(key))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// First non-blank value among several keys, tried in order
pub fn first_text_of(tags: &[&Tag], keys: &[ItemKey]) -> Option<String> {
    keys.iter().find_map(|key| first_text(tags, key))
}

/// Lookup by free-form tag names the generic key mapping does not cover
pub fn first_unknown(tags: &[&Tag], names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| first_text(tags, &ItemKey::Unknown((*name).to_string())))
}

/// Leading integer of a track-number value (`"3/12"` → 3); anything else → 0
pub fn parse_track_number(raw: Option<&str>) -> u32 {
    let Some(raw) = raw else { return 0 };
    let head = raw.split('/').next().unwrap_or("").trim();
    let digits: String = head.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Replay-gain value with any `dB` unit suffix removed
///
/// `None` when absent or unparseable. `0.0` is a real value.
pub fn parse_gain(raw: Option<&str>) -> Option<f64> {
    let value = raw?.trim();
    let value = value
        .strip_suffix("dB")
        .or_else(|| value.strip_suffix("db"))
        .or_else(|| value.strip_suffix("DB"))
        .unwrap_or(value)
        .trim();
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Four-digit year at the start of a date-ish value (`"1999-04-01"` → 1999)
pub fn parse_year(raw: Option<&str>) -> Option<i32> {
    let raw = raw?.trim();
    let digits: String = raw.chars().take(4).collect();
    if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

/// Strip featuring/collaboration suffixes from an artist credit
///
/// `"Alice feat. Bob"` → `"Alice"`. A credit that would become empty is
/// returned trimmed but otherwise untouched.
pub fn normalize_artist(artist: &str) -> String {
    let head = match find_separator(artist) {
        Some(idx) => &artist[..idx],
        None => artist,
    };

    let trimmed = head.trim();
    if trimmed.is_empty() {
        artist.trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Byte offset of the earliest separator. Separators are ASCII, so every
/// match starts on a char boundary.
fn find_separator(artist: &str) -> Option<usize> {
    let bytes = artist.as_bytes();
    (0..bytes.len()).find(|&start| {
        ARTIST_SEPARATORS.iter().any(|sep| {
            bytes
                .get(start..start + sep.len())
                .is_some_and(|window| window.eq_ignore_ascii_case(sep.as_bytes()))
        })
    })
}

/// Text value or the given sentinel
pub fn or_sentinel(value: Option<String>, sentinel: &str) -> String {
    value.unwrap_or_else(|| sentinel.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lofty::tag::{ItemValue, TagItem, TagType};

    fn tag_with(items: &[(ItemKey, &str)]) -> Tag {
        let mut tag = Tag::new(TagType::VorbisComments);
        for (key, value) in items {
            tag.push_unchecked(TagItem::new(key.clone(), ItemValue::Text(value.to_string())));
        }
        tag
    }

    #[test]
    fn test_track_number_parsing() {
        assert_eq!(parse_track_number(Some("3")), 3);
        assert_eq!(parse_track_number(Some("07/12")), 7);
        assert_eq!(parse_track_number(Some(" 4 / 10")), 4);
        assert_eq!(parse_track_number(Some("12a")), 12);
        assert_eq!(parse_track_number(Some("side A")), 0);
        assert_eq!(parse_track_number(Some("")), 0);
        assert_eq!(parse_track_number(None), 0);
    }

    #[test]
    fn test_gain_parsing() {
        assert_eq!(parse_gain(Some("-6.54 dB")), Some(-6.54));
        assert_eq!(parse_gain(Some("+1.20dB")), Some(1.2));
        assert_eq!(parse_gain(Some("0.988547")), Some(0.988547));
        assert_eq!(parse_gain(Some("0.00 dB")), Some(0.0));
        assert_eq!(parse_gain(Some("loud")), None);
        assert_eq!(parse_gain(Some("")), None);
        assert_eq!(parse_gain(None), None);
    }

    #[test]
    fn test_year_parsing() {
        assert_eq!(parse_year(Some("1999")), Some(1999));
        assert_eq!(parse_year(Some("2004-05-17")), Some(2004));
        assert_eq!(parse_year(Some("'99")), None);
        assert_eq!(parse_year(None), None);
    }

    #[test]
    fn test_normalize_artist_strips_features() {
        assert_eq!(normalize_artist("Alice feat. Bob"), "Alice");
        assert_eq!(normalize_artist("Alice FEAT Bob"), "Alice");
        assert_eq!(normalize_artist("Alice ft. Bob"), "Alice");
        assert_eq!(normalize_artist("Alice Featuring Bob"), "Alice");
        assert_eq!(normalize_artist("Alice with The Band"), "Alice");
        assert_eq!(normalize_artist("Alice & Bob"), "Alice");
        assert_eq!(normalize_artist("  Alice  "), "Alice");
    }

    #[test]
    fn test_normalize_artist_earliest_separator_wins() {
        assert_eq!(normalize_artist("A & B feat. C"), "A");
    }

    #[test]
    fn test_normalize_artist_keeps_plain_names() {
        assert_eq!(normalize_artist("Featherweight"), "Featherweight");
        assert_eq!(normalize_artist("Withered Hand"), "Withered Hand");
        assert_eq!(normalize_artist("Björk feat. Thom"), "Björk");
    }

    #[test]
    fn test_normalize_artist_never_empties() {
        assert_eq!(normalize_artist(" & Friends"), "& Friends");
    }

    #[test]
    fn test_first_text_skips_blank_values() {
        let primary = tag_with(&[(ItemKey::TrackTitle, "   ")]);
        let secondary = tag_with(&[(ItemKey::TrackTitle, "Real Title")]);

        let found = first_text(&[&primary, &secondary], &ItemKey::TrackTitle);
        assert_eq!(found.as_deref(), Some("Real Title"));
    }

    #[test]
    fn test_first_unknown_by_name() {
        let tag = tag_with(&[(ItemKey::Unknown("ALBUM ARTIST".into()), "Various")]);
        assert_eq!(
            first_unknown(&[&tag], &["ALBUMARTIST", "ALBUM ARTIST"]).as_deref(),
            Some("Various")
        );
        assert_eq!(first_unknown(&[&tag], &["ALBUMARTIST"]), None);
    }
}
