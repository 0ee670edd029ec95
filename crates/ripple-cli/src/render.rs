// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Text and JSON rendering of events, changes, and view rows.

use clap::ValueEnum;
use comfy_table::{presets, Table};
use ripple_core::{Change, ViewEntry};
use ripple_feed::{FeedEvent, Fields, Key, SubscriptionState, ID_FIELD};
use serde::Serialize;

/// Output style for `replay` and `inspect`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable lines and tables.
    #[default]
    Text,
    /// One JSON document per line.
    Json,
}

/// What a change did to its view.
pub fn change_kind(change: &Change) -> &'static str {
    match (change.old_position, change.new_position) {
        (None, Some(_)) => "insert",
        (Some(_), None) => "remove",
        (Some(old), Some(new)) if old == new => "update",
        (Some(_), Some(_)) => "move",
        (None, None) => "noop",
    }
}

#[derive(Serialize)]
struct ChangeRecord<'a> {
    view: u64,
    kind: &'static str,
    key: &'a Key,
    old: i64,
    new: i64,
    object: &'a Fields,
}

/// One line describing a change.
pub fn change_line(change: &Change, format: Format) -> serde_json::Result<String> {
    let (old, new) = change.as_diff();
    let object = change.object.fields();
    match format {
        Format::Text => Ok(format!(
            "{:<6} {} ({old},{new}) {}",
            change_kind(change),
            change.key,
            serde_json::to_string(object)?
        )),
        Format::Json => serde_json::to_string(&ChangeRecord {
            view: change.view.0,
            kind: change_kind(change),
            key: &change.key,
            old,
            new,
            object,
        }),
    }
}

/// One line describing a feed event, prefixed with its index in the log.
pub fn event_line(index: usize, event: &FeedEvent, format: Format) -> serde_json::Result<String> {
    match format {
        Format::Json => serde_json::to_string(event),
        Format::Text => Ok(match event {
            FeedEvent::ItemUpdate(update) => format!(
                "#{index} update slot={} {}",
                update.slot,
                serde_json::to_string(&update.fields)?
            ),
            FeedEvent::EndOfSnapshot => format!("#{index} end_of_snapshot"),
            FeedEvent::SubscriptionState(SubscriptionState::Started) => {
                format!("#{index} state started")
            }
            FeedEvent::SubscriptionState(SubscriptionState::Stopped) => {
                format!("#{index} state stopped")
            }
        }),
    }
}

/// Column names for a set of rows: `id` first, then every other field name
/// in name order.
pub fn columns(rows: &[ViewEntry]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for row in rows {
        for name in row.object.fields().keys() {
            if name != ID_FIELD && !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names.sort();
    names.insert(0, ID_FIELD.to_owned());
    names
}

/// Rows as a table; missing fields render as empty cells.
pub fn view_table(rows: &[ViewEntry]) -> Table {
    let header = columns(rows);
    let mut table = Table::new();
    table.load_preset(presets::ASCII_FULL);
    table.set_header(header.clone());
    for row in rows {
        let cells: Vec<String> = header
            .iter()
            .map(|name| {
                row.object
                    .get(name)
                    .map_or_else(String::new, ToString::to_string)
            })
            .collect();
        table.add_row(cells);
    }
    table
}
