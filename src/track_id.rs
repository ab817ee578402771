use crate::config::TRACK_ID_LEN;
use crate::errors::ValidationError;

/// A validated 11-character track identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackId(String);

impl TrackId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_raw_id(s: &str) -> bool {
    s.len() == TRACK_ID_LEN
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Cuts an identifier-length token out of `rest`, stopping at the first
/// character that cannot appear in an identifier.
fn leading_token(rest: &str) -> &str {
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Parses user input into a [`TrackId`].
///
/// Accepts the bare 11-character identifier or any recognized URL shape:
/// a `v=` query parameter, an `/embed/<id>` or `/shorts/<id>` path, or the
/// short-host form `youtu.be/<id>`.
pub fn parse_track_id(input: &str) -> Result<TrackId, ValidationError> {
    let trimmed = input.trim();

    if is_raw_id(trimmed) {
        return Ok(TrackId(trimmed.to_string()));
    }

    let candidate = extract_from_url(trimmed);
    match candidate {
        Some(token) if is_raw_id(token) => Ok(TrackId(token.to_string())),
        _ => Err(ValidationError::InvalidTrackId(trimmed.to_string())),
    }
}

fn extract_from_url(url: &str) -> Option<&str> {
    // Watch URLs carry the identifier in the `v` query parameter.
    if let Some(query_start) = url.find('?') {
        let query = &url[query_start + 1..];
        for pair in query.split('&') {
            if let Some(value) = pair.strip_prefix("v=") {
                return Some(leading_token(value));
            }
        }
    }

    // Path-style embeds and the short share host put it in the path.
    for marker in ["/embed/", "/shorts/", "youtu.be/"] {
        if let Some(idx) = url.find(marker) {
            return Some(leading_token(&url[idx + marker.len()..]));
        }
    }

    None
}
