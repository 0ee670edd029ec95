// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reading and writing feed logs on disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ripple_feed::{jsonl, wire, FeedEvent};
use tracing::debug;

/// On-disk encoding of a feed log, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON event per line (`.jsonl`, `.json`).
    JsonLines,
    /// Checksummed CBOR packets (anything else).
    Packets,
}

impl LogFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("json") => {
                Self::JsonLines
            }
            _ => Self::Packets,
        }
    }
}

/// Loads every event in a log.
pub fn load(path: &Path) -> Result<Vec<FeedEvent>> {
    let format = LogFormat::for_path(path);
    let events = match format {
        LogFormat::JsonLines => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            jsonl::parse(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        LogFormat::Packets => {
            let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            wire::decode_all(&bytes).with_context(|| format!("decoding {}", path.display()))?
        }
    };
    debug!(path = %path.display(), ?format, events = events.len(), "feed log loaded");
    Ok(events)
}

/// Writes `events` to `path` in the encoding its extension selects.
pub fn save(path: &Path, events: &[FeedEvent]) -> Result<()> {
    let bytes = match LogFormat::for_path(path) {
        LogFormat::JsonLines => jsonl::render(events)?.into_bytes(),
        LogFormat::Packets => wire::encode_all(events)?,
    };
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}
