//! Marker protocol parser.
//!
//! Agents signal workflow milestones by embedding bracketed control tokens
//! in otherwise free-form output: a response ending in `[PLAN_GENERATED]`
//! followed by a fenced json block carries both the milestone and its
//! structured payload.
//!
//! Detection is purely lexical: `[` name `]` with whitespace tolerated
//! inside the brackets and ASCII-case-insensitive comparison against the
//! caller's expected set. No natural-language understanding happens here;
//! text with no expected token is [`ParsedEvent::NoMarker`] and the caller's
//! retry policy decides what that means.
//!
//! When an agent restates a marker while narrating ("I emitted
//! [PLAN_GENERATED] above..."), several expected markers can appear in one
//! response. The last occurrence in text order wins; all candidates are
//! reported for observability.
//!
//! A fenced code block immediately following the winning marker is treated
//! as its payload and parsed as JSON best-effort. Parse failures degrade to
//! [`Payload::Raw`] rather than erroring, so the caller can re-prompt the
//! agent to fix its formatting.

#[cfg(test)]
mod tests;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::warn;

/// Marker emitted when a planning outline is complete.
pub const PLAN_GENERATED: &str = "PLAN_GENERATED";
/// Marker emitted when a full specification is complete.
pub const SPEC_GENERATED: &str = "SPEC_GENERATED";
/// Marker emitted when a single task is complete.
pub const TASK_COMPLETE: &str = "TASK_COMPLETE";
/// Marker emitted when an entire feature is complete.
pub const FEATURE_COMPLETE: &str = "FEATURE_COMPLETE";
/// Marker emitted when learning extraction is complete.
pub const LEARNINGS_EXTRACTED: &str = "LEARNINGS_EXTRACTED";

/// Bracketed token: `[` name `]`, whitespace tolerated inside the brackets.
static MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*([A-Za-z0-9_]+)\s*\]").expect("invalid marker regex"));

/// Structured payload associated with a marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// The fenced block parsed as JSON.
    Json(serde_json::Value),
    /// The fenced block's raw text, kept when JSON parsing failed.
    Raw(String),
}

impl Payload {
    /// The parsed JSON value, if parsing succeeded.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(v) => Some(v),
            Payload::Raw(_) => None,
        }
    }
}

/// The normalized result of scanning one agent response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParsedEvent {
    /// Exactly one expected marker appeared.
    MarkerFound {
        /// The marker, under its expected (canonical) spelling.
        marker: String,
        /// Fenced block immediately following the marker, if any.
        payload: Option<Payload>,
    },
    /// More than one distinct expected marker appeared.
    ///
    /// Resolution policy: the last-occurring marker in text order wins.
    AmbiguousMarkers {
        /// All distinct markers seen, in first-occurrence text order.
        markers: Vec<String>,
        /// The winning (last-occurring) marker.
        winner: String,
        /// Fenced block immediately following the winning occurrence.
        payload: Option<Payload>,
    },
    /// None of the expected markers appeared.
    NoMarker,
}

impl ParsedEvent {
    /// The effective marker: the found marker, or the ambiguity winner.
    pub fn marker(&self) -> Option<&str> {
        match self {
            ParsedEvent::MarkerFound { marker, .. } => Some(marker),
            ParsedEvent::AmbiguousMarkers { winner, .. } => Some(winner),
            ParsedEvent::NoMarker => None,
        }
    }

    /// The payload attached to the effective marker, if any.
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            ParsedEvent::MarkerFound { payload, .. }
            | ParsedEvent::AmbiguousMarkers { payload, .. } => payload.as_ref(),
            ParsedEvent::NoMarker => None,
        }
    }
}

/// Scan a response for the expected control markers.
///
/// Bracketed tokens whose name is not in `expected` are ignored; markdown
/// link syntax and checklists pass through harmlessly because they never
/// spell an expected name. Repeated occurrences of a single marker collapse
/// to one [`ParsedEvent::MarkerFound`] at the last occurrence.
pub fn parse(response_text: &str, expected: &BTreeSet<String>) -> ParsedEvent {
    // (canonical name, byte offset just past the token) per occurrence.
    let mut hits: Vec<(&str, usize)> = Vec::new();

    for caps in MARKER_REGEX.captures_iter(response_text) {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if let Some(canonical) = expected
            .iter()
            .find(|e| e.eq_ignore_ascii_case(name))
        {
            let end = caps.get(0).map(|m| m.end()).unwrap_or_default();
            hits.push((canonical.as_str(), end));
        }
    }

    let Some(&(last_marker, last_end)) = hits.last() else {
        return ParsedEvent::NoMarker;
    };

    let payload = extract_payload(&response_text[last_end..]);

    let mut distinct: Vec<String> = Vec::new();
    for (name, _) in &hits {
        if !distinct.iter().any(|d| d == name) {
            distinct.push((*name).to_string());
        }
    }

    if distinct.len() > 1 {
        warn!(
            markers = ?distinct,
            winner = last_marker,
            "multiple workflow markers in one response, last occurrence wins"
        );
        ParsedEvent::AmbiguousMarkers {
            markers: distinct,
            winner: last_marker.to_string(),
            payload,
        }
    } else {
        ParsedEvent::MarkerFound {
            marker: last_marker.to_string(),
            payload,
        }
    }
}

/// Extract a fenced code block sitting immediately after a marker.
///
/// Grammar kept deliberately narrow: optional whitespace, then a ``` fence
/// with an optional language tag on the fence line, then content up to the
/// closing ```. Anything else means no payload.
fn extract_payload(after_marker: &str) -> Option<Payload> {
    let rest = after_marker.trim_start();
    let rest = rest.strip_prefix("```")?;

    // Skip the language tag (e.g. "json") up to the end of the fence line.
    let body_start = rest.find('\n')?;
    let fence_line = rest[..body_start].trim();
    if !fence_line.is_empty() && !fence_line.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let body = &rest[body_start + 1..];
    let body_end = body.find("```")?;
    let content = body[..body_end].trim();

    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(value) => Some(Payload::Json(value)),
        Err(err) => {
            warn!(%err, "marker payload is not valid JSON, keeping raw text");
            Some(Payload::Raw(content.to_string()))
        }
    }
}

/// Convenience constructor for an expected-marker set.
pub fn expecting<I, S>(markers: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    markers.into_iter().map(Into::into).collect()
}
