use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::error::{MediaError, Result};

const FETCH_TIMEOUT_SECS: u64 = 30;

fn playlist_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"https?://[^\s"'<>]*playlist\.m3u8"#).expect("static regex is valid")
    })
}

/// Whether `url` already points at an HLS playlist and needs no resolution.
pub fn is_playlist_url(url: &str) -> bool {
    url.split(['?', '#'])
        .next()
        .is_some_and(|path| path.ends_with(".m3u8"))
}

/// Find the first playlist URL in a broadcast page, upgraded to https.
pub fn extract_playlist_url(html: &str) -> Option<String> {
    playlist_pattern()
        .find(html)
        .map(|m| m.as_str().replacen("http://", "https://", 1))
}

/// Fetch `page_url` and extract its playlist URL.
///
/// Blocking; call from an in-process job (which runs on a blocking thread).
pub fn resolve_playlist(page_url: &str) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()?;
    let body = client.get(page_url).send()?.error_for_status()?.text()?;
    let url = extract_playlist_url(&body).ok_or_else(|| MediaError::PlaylistNotFound {
        url: page_url.to_string(),
    })?;
    debug!(page = %page_url, playlist = %url, "resolved playlist");
    Ok(url)
}
