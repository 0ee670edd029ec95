// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Membership predicates for views and queries.

use std::fmt;

use ripple_feed::{Fields, Value};

use crate::object::StoredObject;

/// Predicate deciding whether an object belongs to a view or query result.
///
/// Implemented for every `Fn(&StoredObject) -> bool` closure, so ad-hoc
/// predicates need no wrapper type.
pub trait Filter: Send + Sync {
    /// Returns true if `object` belongs to the result set.
    fn matches(&self, object: &StoredObject) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&StoredObject) -> bool + Send + Sync,
{
    fn matches(&self, object: &StoredObject) -> bool {
        self(object)
    }
}

/// Accepts every object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchAll;

impl Filter for MatchAll {
    fn matches(&self, _object: &StoredObject) -> bool {
        true
    }
}

/// Object-style query: every listed field must equal the given value.
///
/// An expected `null` also matches a missing field. An empty query matches
/// everything.
#[derive(Clone, Default, PartialEq)]
pub struct FieldQuery {
    expected: Fields,
}

impl FieldQuery {
    /// Creates an empty (match-all) query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality constraint.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.expected.insert(field.into(), value.into());
        self
    }

    /// The constraints, in field order.
    pub fn constraints(&self) -> &Fields {
        &self.expected
    }
}

impl fmt::Debug for FieldQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.expected.iter()).finish()
    }
}

impl From<Fields> for FieldQuery {
    fn from(expected: Fields) -> Self {
        Self { expected }
    }
}

impl Filter for FieldQuery {
    fn matches(&self, object: &StoredObject) -> bool {
        self.expected
            .iter()
            .all(|(name, want)| match (object.get(name), want) {
                (None, Value::Null) => true,
                (Some(have), want) => have == want,
                (None, _) => false,
            })
    }
}
