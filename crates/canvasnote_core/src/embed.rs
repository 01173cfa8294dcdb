//! Embed URL derivation for video content.
//!
//! # Responsibility
//! - Turn user-pasted YouTube links into iframe-ready embed URLs.
//!
//! # Invariants
//! - Unrecognized URLs return `None`; callers render the raw link instead.
//! - The `t` timestamp is normalized to whole seconds in `start`.

use once_cell::sync::Lazy;
use regex::Regex;

const EMBED_BASE: &str = "https://www.youtube.com/embed/";

static WATCH_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.|m\.)?youtube\.com/watch\?(?P<query>[^#]+)")
        .expect("valid watch url regex")
});
static SHORT_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?youtu\.be/(?P<id>[A-Za-z0-9_-]{6,})(?:\?(?P<query>[^#]*))?")
        .expect("valid short url regex")
});
static EMBED_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/embed/(?P<id>[A-Za-z0-9_-]{6,})")
        .expect("valid embed url regex")
});
static VIDEO_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{6,}$").expect("valid video id regex"));
static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<h>\d+)h)?(?:(?P<m>\d+)m)?(?:(?P<s>\d+)s?)?$").expect("valid time regex")
});

/// Returns the embed URL for a YouTube watch, short or embed link.
pub fn get_embed_url(url: &str) -> Option<String> {
    let url = url.trim();

    if let Some(captures) = WATCH_URL_RE.captures(url) {
        let query = captures.name("query")?.as_str();
        let id = query_param(query, "v").filter(|id| VIDEO_ID_RE.is_match(id))?;
        let start = query_param(query, "t").and_then(parse_timestamp);
        return Some(build_embed_url(id, start));
    }

    if let Some(captures) = SHORT_URL_RE.captures(url) {
        let id = captures.name("id")?.as_str();
        let start = captures
            .name("query")
            .and_then(|query| query_param(query.as_str(), "t"))
            .and_then(parse_timestamp);
        return Some(build_embed_url(id, start));
    }

    if let Some(captures) = EMBED_URL_RE.captures(url) {
        let id = captures.name("id")?.as_str();
        return Some(build_embed_url(id, None));
    }

    None
}

fn build_embed_url(id: &str, start: Option<u64>) -> String {
    match start {
        Some(seconds) => format!("{EMBED_BASE}{id}?start={seconds}"),
        None => format!("{EMBED_BASE}{id}"),
    }
}

fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name && !value.is_empty()).then_some(value)
    })
}

/// Parses `133`, `133s`, `2m13s` or `1h2m3s` into seconds.
fn parse_timestamp(value: &str) -> Option<u64> {
    let captures = TIMESTAMP_RE.captures(value)?;
    let part = |name: &str| -> Option<u64> {
        match captures.name(name) {
            Some(found) => found.as_str().parse().ok(),
            None => Some(0),
        }
    };
    if captures.name("h").is_none() && captures.name("m").is_none() && captures.name("s").is_none()
    {
        return None;
    }
    // Out-of-range values drop the start parameter.
    part("h")?
        .checked_mul(3600)?
        .checked_add(part("m")?.checked_mul(60)?)?
        .checked_add(part("s")?)
}
