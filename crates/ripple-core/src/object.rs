// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical object state held by the cache.

use ripple_feed::{Fields, Key, Value, COMMAND_FIELD, DELETE_COMMAND, ID_FIELD};
use tracing::warn;

/// Latest merged state of one keyed object.
///
/// `fields["id"]` always mirrors [`StoredObject::id`], so filters and sort
/// rules can address the identity like any other field.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoredObject {
    id: Key,
    fields: Fields,
}

impl StoredObject {
    /// Creates an object carrying only its identity.
    pub fn new(id: Key) -> Self {
        let mut fields = Fields::new();
        fields.insert(ID_FIELD.to_owned(), id.to_value());
        Self { id, fields }
    }

    /// Minimal `{id: key}` stand-in used when the real data no longer exists.
    pub fn placeholder(id: Key) -> Self {
        Self::new(id)
    }

    /// Public identity (equal to the cache key).
    pub fn id(&self) -> &Key {
        &self.id
    }

    /// Returns a field by name (`"id"` included).
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// All fields, `id` included, in name order.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// True when the object carries `command = "DELETE"`.
    pub fn is_delete_marker(&self) -> bool {
        self.get(COMMAND_FIELD).and_then(Value::as_str) == Some(DELETE_COMMAND)
    }

    /// Overwrites every patched field; unmentioned fields are kept.
    ///
    /// `id` is reserved: a patch cannot rename an object, so a patched `id`
    /// is dropped. Returns the number of fields written.
    pub(crate) fn merge(&mut self, patch: Fields) -> usize {
        let mut written = 0;
        for (name, value) in patch {
            if name == ID_FIELD {
                if value != self.id.to_value() {
                    warn!(key = %self.id, patched = %value, "ignoring patch to reserved id field");
                }
                continue;
            }
            self.fields.insert(name, value);
            written += 1;
        }
        written
    }
}
