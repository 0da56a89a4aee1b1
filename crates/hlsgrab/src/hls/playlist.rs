//! Line-level scanning of M3U8 text.
//!
//! Only the handful of tags needed to pick a rendition and list its fragments
//! are understood. Everything else is treated as an opaque tag line.

use std::sync::LazyLock;

use regex::Regex;

const TAG_KEY: &str = "#EXT-X-KEY";
const TAG_SESSION_KEY: &str = "#EXT-X-SESSION-KEY";
const TAG_STREAM_INF: &str = "#EXT-X-STREAM-INF";
const TAG_MAP: &str = "#EXT-X-MAP";

/// `NAME=value` pairs of an attribute list. Quoted values may contain commas.
static ATTRIBUTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|,)\s*([A-Za-z0-9-]+)=("[^"]*"|[^,]*)"#)
        .expect("attribute regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    /// A `#` prefixed line: a comment or a tag.
    Tag(&'a str),
    Uri(&'a str),
}

impl<'a> Line<'a> {
    pub fn classify(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            Line::Blank
        } else if line.starts_with('#') {
            Line::Tag(line)
        } else {
            Line::Uri(line)
        }
    }
}

fn lines(text: &str) -> impl Iterator<Item = Line<'_>> {
    text.lines().map(Line::classify)
}

/// Attribute list of a tag line, `#EXT-X-FOO:<attributes>`, if the line is that tag.
fn tag_attributes<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(tag)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix(':')
}

/// Looks up `name` in an attribute list, stripping surrounding quotes.
pub fn attribute<'a>(attributes: &'a str, name: &str) -> Option<&'a str> {
    ATTRIBUTE_REGEX
        .captures_iter(attributes)
        .find(|captures| &captures[1] == name)
        .and_then(|captures| captures.get(2))
        .map(|value| value.as_str().trim().trim_matches('"'))
}

/// Whether the playlist declares a key for its media or session.
///
/// `METHOD=NONE` explicitly disables encryption and does not count.
pub fn is_encrypted(text: &str) -> bool {
    lines(text).any(|line| {
        let Line::Tag(tag) = line else {
            return false;
        };
        let attributes =
            tag_attributes(tag, TAG_KEY).or_else(|| tag_attributes(tag, TAG_SESSION_KEY));
        match attributes {
            Some(attributes) => attribute(attributes, "METHOD") != Some("NONE"),
            None => false,
        }
    })
}

pub fn is_master(text: &str) -> bool {
    lines(text).any(|line| match line {
        Line::Tag(tag) => tag_attributes(tag, TAG_STREAM_INF).is_some(),
        _ => false,
    })
}

/// One rendition entry of a master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// As written in the playlist, possibly relative.
    pub uri: String,
    pub bandwidth: u64,
}

/// Reads every `#EXT-X-STREAM-INF` with the URI line following it.
///
/// Directives without a following URI are skipped.
pub fn parse_variants(text: &str) -> Vec<Variant> {
    let mut variants = Vec::new();
    let mut pending: Option<u64> = None;

    for line in lines(text) {
        match line {
            Line::Blank => {}
            Line::Tag(tag) => {
                if let Some(attributes) = tag_attributes(tag, TAG_STREAM_INF) {
                    if pending.is_some() {
                        tracing::warn!("Variant directive without URI, skipping.");
                    }
                    let bandwidth = attribute(attributes, "BANDWIDTH")
                        .and_then(|b| b.parse().ok())
                        .unwrap_or(0);
                    pending = Some(bandwidth);
                }
            }
            Line::Uri(uri) => {
                if let Some(bandwidth) = pending.take() {
                    variants.push(Variant {
                        uri: uri.to_string(),
                        bandwidth,
                    });
                }
            }
        }
    }

    variants
}

/// Picks the highest bandwidth. Among equal maxima the earliest declared wins.
pub fn select_variant(variants: &[Variant]) -> Option<&Variant> {
    variants.iter().fold(None, |best: Option<&Variant>, variant| match best {
        Some(best) if best.bandwidth >= variant.bandwidth => Some(best),
        _ => Some(variant),
    })
}

/// URI of the first `#EXT-X-MAP` directive.
pub fn init_segment_uri(text: &str) -> Option<String> {
    lines(text).find_map(|line| match line {
        Line::Tag(tag) => tag_attributes(tag, TAG_MAP)
            .and_then(|attributes| attribute(attributes, "URI"))
            .filter(|uri| !uri.is_empty())
            .map(str::to_string),
        _ => None,
    })
}

/// Every content line, in playlist order.
pub fn segment_uris(text: &str) -> Vec<String> {
    lines(text)
        .filter_map(|line| match line {
            Line::Uri(uri) => Some(uri.to_string()),
            _ => None,
        })
        .collect()
}
