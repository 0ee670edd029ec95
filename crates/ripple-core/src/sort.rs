// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Orderings for sorted views and queries.
//!
//! A [`SortSpec`] is either a caller-supplied total order or a chain of
//! [`SortRule`]s. Rule chains compare attribute by attribute; the first
//! attribute whose values differ decides. Missing and `null` values sort after
//! every defined value in ascending order (and therefore first when
//! descending).
//!
//! Comparison is fallible: two defined values of different kinds (a number
//! against a string, say) have no order, and a caller-supplied comparator may
//! fail on its own terms. Both surface as [`SortError`].

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use ripple_feed::{Value, ValueKind};
use thiserror::Error;

use crate::object::StoredObject;

/// Comparator failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SortError {
    /// Two defined values of different kinds met on the same attribute.
    #[error("cannot order {left} against {right} on `{attribute}`")]
    Incomparable {
        /// Attribute being compared.
        attribute: String,
        /// Kind of the left operand.
        left: ValueKind,
        /// Kind of the right operand.
        right: ValueKind,
    },
    /// A caller-supplied comparator reported a failure.
    #[error("comparator failed: {0}")]
    Custom(String),
}

/// Caller-supplied total order.
pub type CompareFn =
    dyn Fn(&StoredObject, &StoredObject) -> Result<Ordering, SortError> + Send + Sync;

/// One link of a rule chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SortRule {
    /// Field name to compare.
    pub attribute: String,
    /// Reverse the order for this attribute.
    #[cfg_attr(feature = "serde", serde(default))]
    pub descending: bool,
}

impl SortRule {
    /// Ascending rule on `attribute`.
    pub fn asc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            descending: false,
        }
    }

    /// Descending rule on `attribute`.
    pub fn desc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            descending: true,
        }
    }
}

/// Ordering of a sorted view or query.
#[derive(Clone)]
pub enum SortSpec {
    /// Caller-supplied total order.
    Function(Arc<CompareFn>),
    /// Attribute rule chain; first unequal attribute wins.
    Rules(Vec<SortRule>),
}

impl fmt::Debug for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Function(..)"),
            Self::Rules(rules) => f.debug_tuple("Rules").field(rules).finish(),
        }
    }
}

impl SortSpec {
    /// Builds a rule chain.
    pub fn rules<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = SortRule>,
    {
        Self::Rules(rules.into_iter().collect())
    }

    /// Wraps a fallible comparator.
    pub fn by<F>(compare: F) -> Self
    where
        F: Fn(&StoredObject, &StoredObject) -> Result<Ordering, SortError> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(compare))
    }

    /// Wraps an infallible comparator.
    pub fn by_total<F>(compare: F) -> Self
    where
        F: Fn(&StoredObject, &StoredObject) -> Ordering + Send + Sync + 'static,
    {
        Self::Function(Arc::new(move |a: &StoredObject, b: &StoredObject| {
            Ok::<_, SortError>(compare(a, b))
        }))
    }

    /// Compares two objects.
    ///
    /// # Errors
    ///
    /// [`SortError`] if the comparator fails or two values have no order.
    pub fn compare(&self, a: &StoredObject, b: &StoredObject) -> Result<Ordering, SortError> {
        match self {
            Self::Function(f) => f(a, b),
            Self::Rules(rules) => {
                for rule in rules {
                    let ord = compare_values(
                        &rule.attribute,
                        a.get(&rule.attribute),
                        b.get(&rule.attribute),
                    )?;
                    if ord != Ordering::Equal {
                        return Ok(if rule.descending { ord.reverse() } else { ord });
                    }
                }
                Ok(Ordering::Equal)
            }
        }
    }

    /// Stable sort of `items` under this ordering.
    ///
    /// Merge sort so a failing comparison aborts cleanly; `items` is left
    /// untouched on error.
    pub(crate) fn sort_stable<T, K>(&self, items: &mut Vec<T>, key: K) -> Result<(), SortError>
    where
        T: Clone,
        K: Fn(&T) -> &StoredObject + Copy,
    {
        let sorted = self.merge_sort(items, key)?;
        *items = sorted;
        Ok(())
    }

    fn merge_sort<T, K>(&self, items: &[T], key: K) -> Result<Vec<T>, SortError>
    where
        T: Clone,
        K: Fn(&T) -> &StoredObject + Copy,
    {
        if items.len() <= 1 {
            return Ok(items.to_vec());
        }
        let (left, right) = items.split_at(items.len() / 2);
        let left = self.merge_sort(left, key)?;
        let right = self.merge_sort(right, key)?;

        let mut out = Vec::with_capacity(items.len());
        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() {
            // Take from the right only when strictly smaller: keeps equal
            // elements in input order.
            if self.compare(key(&right[j]), key(&left[i]))? == Ordering::Less {
                out.push(right[j].clone());
                j += 1;
            } else {
                out.push(left[i].clone());
                i += 1;
            }
        }
        out.extend_from_slice(&left[i..]);
        out.extend_from_slice(&right[j..]);
        Ok(out)
    }
}

/// Ascending comparison of two attribute values, nulls last.
///
/// `None` (missing) and `Some(Value::Null)` are the same null. Integers and
/// floats compare numerically with each other, exactly even past 2^53.
///
/// # Errors
///
/// [`SortError::Incomparable`] for two defined values of different kinds.
pub fn compare_values(
    attribute: &str,
    a: Option<&Value>,
    b: Option<&Value>,
) -> Result<Ordering, SortError> {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    let (a, b) = match (a, b) {
        (None, None) => return Ok(Ordering::Equal),
        (None, Some(_)) => return Ok(Ordering::Greater),
        (Some(_), None) => return Ok(Ordering::Less),
        (Some(a), Some(b)) => (a, b),
    };
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Ok(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => {
            Ok(x.partial_cmp(y).unwrap_or_else(|| x.total_cmp(y)))
        }
        (Value::Int(x), Value::Float(y)) => Ok(cmp_int_float(*x, *y)),
        (Value::Float(x), Value::Int(y)) => Ok(cmp_int_float(*y, *x).reverse()),
        _ => Err(SortError::Incomparable {
            attribute: attribute.to_owned(),
            left: a.kind(),
            right: b.kind(),
        }),
    }
}

/// Exact `i` against `f`, without rounding `i` to the nearest double.
///
/// NaNs sit where [`f64::total_cmp`] puts them: positive above every
/// integer, negative below.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    // 2^63; the smallest double above every i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    // In range after the checks above, so the cast is exact.
    #[allow(clippy::cast_possible_truncation)]
    let whole_int = whole as i64;
    match i.cmp(&whole_int) {
        Ordering::Equal => (f - whole)
            .partial_cmp(&0.0)
            .map_or(Ordering::Equal, Ordering::reverse),
        unequal => unequal,
    }
}
