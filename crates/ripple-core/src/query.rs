// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! One-shot snapshot queries over the cache.
use std::sync::Arc;

use crate::cache::ObjectCache;
use crate::filter::Filter;
use crate::identity::IdentityPolicy;
use crate::object::StoredObject;
use crate::sort::{SortError, SortSpec};

/// Ordering and paging of a one-shot query.
///
/// Without a sort the result follows cache key order. `start` past the end
/// yields an empty result; `count: None` takes everything after `start`.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Optional ordering, applied before paging.
    pub sort: Option<SortSpec>,
    /// Number of leading matches to skip.
    pub start: usize,
    /// Maximum number of results.
    pub count: Option<usize>,
}

impl QueryOptions {
    /// No ordering, no paging.
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders the result.
    pub fn sorted(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Skips the first `start` matches.
    pub fn start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    /// Limits the result to `count` matches.
    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

pub(crate) fn run(
    cache: &ObjectCache,
    filter: &dyn Filter,
    options: &QueryOptions,
    policy: IdentityPolicy,
) -> Result<Vec<Arc<StoredObject>>, SortError> {
    let mut hits: Vec<Arc<StoredObject>> = cache
        .iter()
        .filter(|(_, object)| {
            !(policy == IdentityPolicy::ExplicitKeyed && object.is_delete_marker())
                && filter.matches(object)
        })
        .map(|(_, object)| Arc::clone(object))
        .collect();
    if let Some(sort) = &options.sort {
        sort.sort_stable(&mut hits, |o| o.as_ref())?;
    }
    let page = hits
        .into_iter()
        .skip(options.start)
        .take(options.count.unwrap_or(usize::MAX))
        .collect();
    Ok(page)
}
