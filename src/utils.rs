use rand::{Rng, distr::Alphanumeric};

use crate::types::SimpleArtist;

/// Random correlation value sent as `state` with every authorize request.
pub fn generate_state_key() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Splits a space separated scope string, dropping empty entries and repeats.
pub fn parse_scopes(scopes: &str) -> Vec<String> {
    let mut parsed: Vec<String> = Vec::new();
    for scope in scopes.split_whitespace() {
        if !parsed.iter().any(|s| s == scope) {
            parsed.push(scope.to_string());
        }
    }
    parsed
}

/// Ordered union of granted and additional scopes.
///
/// Granted scopes keep their position, new ones are appended in request
/// order, and nothing appears twice.
pub fn merge_scopes<S: AsRef<str>>(granted: &[String], additional: &[S]) -> Vec<String> {
    let mut merged = parse_scopes(&granted.join(" "));
    for item in additional {
        for scope in item.as_ref().split_whitespace() {
            if !merged.iter().any(|s| s == scope) {
                merged.push(scope.to_string());
            }
        }
    }
    merged
}

pub fn format_duration(duration_ms: u64) -> String {
    let total_secs = duration_ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

pub fn join_artist_names(artists: &[SimpleArtist]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
