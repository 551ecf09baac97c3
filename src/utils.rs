use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;

use crate::types::Art;

const THOR_IMAGE_BASE: &str = "https://content-images.p-cdn.com/images/";

/// Firefox only: the device record always describes a Firefox browser.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.5; rv:128.0) Gecko/20100101 Firefox/128.0",
];

/// Picks one browser user agent; callers keep it for the whole process.
pub fn pick_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Browser version advertised by a Firefox user agent, e.g. `128.0`.
pub fn firefox_version(user_agent: &str) -> Option<&str> {
    user_agent
        .rsplit_once("Firefox/")
        .map(|(_, version)| version.split_whitespace().next().unwrap_or(version))
        .filter(|version| !version.is_empty())
}

/// Parses the "thor layers" string of a playlist into artwork urls.
///
/// Thor layers look like `_,:grid(images/aa/bb/cc@1...,images/dd/ee@1...)`.
/// Each fragment after `images/` that carries an `@1` marker is a partial art
/// path; the CDN origin and the `_500W_500H.jpg` suffix are added here.
pub fn parse_thor(thor: &str) -> Vec<String> {
    thor.split("images/")
        .filter(|fragment| fragment.contains("@1"))
        .filter_map(|fragment| fragment.split("@1").next())
        .map(|path| format!("{}{}_500W_500H.jpg", THOR_IMAGE_BASE, path))
        .collect()
}

/// Maps each art size (in pixels) to its url.
pub fn parse_art(art: &[Art]) -> BTreeMap<u32, String> {
    art.iter().map(|a| (a.size, a.url.clone())).collect()
}

/// Returns the largest artwork of a station, if any.
pub fn largest_art(art: &[Art]) -> Option<String> {
    parse_art(art).into_iter().next_back().map(|(_, url)| url)
}

/// Normalizes a hex color to `#rrggbb` form.
///
/// Accepts 3, 6 or 8 hex digits with or without the leading `#`. Anything else
/// yields `None`.
pub fn normalize_color(color: Option<&str>) -> Option<String> {
    let raw = color?.trim();
    let hex = raw.strip_prefix('#').unwrap_or(raw);
    let valid_len = matches!(hex.len(), 3 | 6 | 8);
    if !valid_len || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("#{}", hex))
}

/// Formats a number of seconds as `m:ss`.
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn datetime_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Parses the RFC 3339 dates the station endpoints return.
pub fn parse_date(date: Option<&str>) -> Option<DateTime<Utc>> {
    date.and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc))
}
