// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON-lines feed format: one [`FeedEvent`] per line.
//!
//! Blank lines and lines starting with `#` are ignored so fixtures can carry
//! comments.

use thiserror::Error;

use crate::event::FeedEvent;

/// Parse failure with the offending (1-based) line number.
#[derive(Debug, Error)]
#[error("line {line}: {source}")]
pub struct JsonLinesError {
    /// 1-based line number.
    pub line: usize,
    /// Underlying parse error.
    #[source]
    pub source: serde_json::Error,
}

/// Parses every event in `input`.
pub fn parse(input: &str) -> Result<Vec<FeedEvent>, JsonLinesError> {
    let mut events = Vec::new();
    for (idx, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(line).map_err(|source| JsonLinesError {
            line: idx + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Renders events as JSON lines (each terminated by `\n`).
pub fn render<'a, I>(events: I) -> Result<String, serde_json::Error>
where
    I: IntoIterator<Item = &'a FeedEvent>,
{
    let mut out = String::new();
    for event in events {
        out.push_str(&serde_json::to_string(event)?);
        out.push('\n');
    }
    Ok(out)
}
