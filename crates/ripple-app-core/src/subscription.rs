// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Subscription configuration: what to subscribe to and how its updates are
//! keyed.
//!
//! A [`SubscriptionConfig`] is plain data. It is checked once, by
//! [`SubscriptionConfig::validate`], before a session is built from it; the
//! resolved [`IdentityPolicy`] then stays fixed for the life of the session.

use std::fmt;
use std::str::FromStr;

use ripple_core::IdentityPolicy;
use ripple_feed::{COMMAND_FIELD, KEY_FIELD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Delivery mode of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionMode {
    /// One row per item, fields merged over time.
    #[default]
    Merge,
    /// One row per item, every update delivered unfiltered.
    Raw,
    /// Every update is a distinct event.
    Distinct,
    /// Rows added, updated, and deleted through `key`/`command` fields.
    Command,
}

impl SubscriptionMode {
    /// Identity policy used when the config does not override it.
    pub fn default_identity(self) -> IdentityPolicy {
        match self {
            Self::Merge | Self::Raw => IdentityPolicy::PositionKeyed,
            Self::Distinct => IdentityPolicy::SequenceKeyed,
            Self::Command => IdentityPolicy::ExplicitKeyed,
        }
    }

    /// Lowercase name, as used in config files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Raw => "raw",
            Self::Distinct => "distinct",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for SubscriptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized mode name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown subscription mode `{0}` (expected merge, raw, distinct or command)")]
pub struct UnknownMode(pub String);

impl FromStr for SubscriptionMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "raw" => Ok(Self::Raw),
            "distinct" => Ok(Self::Distinct),
            "command" => Ok(Self::Command),
            _ => Err(UnknownMode(s.to_owned())),
        }
    }
}

/// Initial snapshot request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotRequest {
    /// Full snapshot.
    Yes,
    /// No snapshot; live updates only.
    No,
    /// At most this many past events (distinct mode only).
    Length(u32),
}

/// Requested update frequency cap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFrequency {
    /// No cap, updates may still be conflated.
    Unlimited,
    /// No cap and no conflation.
    Unfiltered,
    /// Updates per second.
    PerSecond(f64),
}

/// Requested server-side buffer size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferSize {
    /// Unbounded buffer.
    Unlimited,
    /// Buffer of this many updates.
    Size(u32),
}

/// Rejected subscription configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Neither `items` nor `item_group` was given.
    #[error("no items: set `items` or `item_group`")]
    NoItems,
    /// Both `items` and `item_group` were given.
    #[error("`items` and `item_group` are mutually exclusive")]
    ItemsAndGroup,
    /// Neither `fields` nor `field_schema` was given.
    #[error("no fields: set `fields` or `field_schema`")]
    NoFields,
    /// Both `fields` and `field_schema` were given.
    #[error("`fields` and `field_schema` are mutually exclusive")]
    FieldsAndSchema,
    /// An item, field, group, or schema name is empty or whitespace.
    #[error("empty name in `{0}`")]
    EmptyName(&'static str),
    /// A command-mode field list lacks a required field.
    #[error("command mode requires the `{0}` field")]
    MissingCommandField(&'static str),
    /// A snapshot other than `no` was requested in raw mode.
    #[error("raw mode does not deliver a snapshot")]
    SnapshotInRawMode,
    /// A snapshot length was requested outside distinct mode.
    #[error("snapshot length is only available in distinct mode, not {0}")]
    SnapshotLengthOutsideDistinct(SubscriptionMode),
    /// A snapshot length of zero.
    #[error("snapshot length must be positive")]
    ZeroSnapshotLength,
    /// A frequency cap was requested in raw mode.
    #[error("raw mode does not accept a max frequency")]
    FrequencyInRawMode,
    /// A frequency that is not a positive finite number.
    #[error("max frequency must be positive and finite, got {0}")]
    InvalidFrequency(f64),
    /// A buffer size of zero.
    #[error("buffer size must be positive")]
    ZeroBufferSize,
}

/// What to subscribe to and how to key its updates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubscriptionConfig {
    /// Delivery mode.
    pub mode: SubscriptionMode,
    /// Overrides the mode's default identity policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityPolicy>,
    /// Item names; exclusive with `item_group`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
    /// Server-side item group name; exclusive with `items`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_group: Option<String>,
    /// Field names; exclusive with `field_schema`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    /// Server-side field schema name; exclusive with `fields`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_schema: Option<String>,
    /// Data adapter serving the items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_adapter: Option<String>,
    /// Server-side selector name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Snapshot request; `None` leaves the server default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_snapshot: Option<SnapshotRequest>,
    /// Frequency cap; `None` leaves the server default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_max_frequency: Option<MaxFrequency>,
    /// Buffer size; `None` leaves the server default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_buffer_size: Option<BufferSize>,
}

impl SubscriptionConfig {
    /// Empty config in `mode`. Needs items and fields before it validates.
    pub fn new(mode: SubscriptionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Sets the item list.
    pub fn with_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items = items.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the item group.
    pub fn with_item_group(mut self, group: impl Into<String>) -> Self {
        self.item_group = Some(group.into());
        self
    }

    /// Sets the field list.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the field schema.
    pub fn with_field_schema(mut self, schema: impl Into<String>) -> Self {
        self.field_schema = Some(schema.into());
        self
    }

    /// Overrides the identity policy.
    pub fn with_identity(mut self, identity: IdentityPolicy) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Sets the data adapter.
    pub fn with_data_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.data_adapter = Some(adapter.into());
        self
    }

    /// Sets the selector.
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Sets the snapshot request.
    pub fn with_snapshot(mut self, snapshot: SnapshotRequest) -> Self {
        self.requested_snapshot = Some(snapshot);
        self
    }

    /// Sets the frequency cap.
    pub fn with_max_frequency(mut self, frequency: MaxFrequency) -> Self {
        self.requested_max_frequency = Some(frequency);
        self
    }

    /// Sets the buffer size.
    pub fn with_buffer_size(mut self, size: BufferSize) -> Self {
        self.requested_buffer_size = Some(size);
        self
    }

    /// Identity policy of stores built from this config.
    pub fn resolved_identity(&self) -> IdentityPolicy {
        self.identity.unwrap_or_else(|| self.mode.default_identity())
    }

    /// Checks the config for contradictions. Returns the first one found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_items()?;
        self.validate_fields()?;
        self.validate_snapshot()?;
        self.validate_frequency()?;
        if self.requested_buffer_size == Some(BufferSize::Size(0)) {
            return Err(ValidationError::ZeroBufferSize);
        }
        for (what, name) in [
            ("data_adapter", &self.data_adapter),
            ("selector", &self.selector),
        ] {
            if name.as_deref().is_some_and(is_blank) {
                return Err(ValidationError::EmptyName(what));
            }
        }
        Ok(())
    }

    fn validate_items(&self) -> Result<(), ValidationError> {
        match (self.items.is_empty(), &self.item_group) {
            (true, None) => Err(ValidationError::NoItems),
            (false, Some(_)) => Err(ValidationError::ItemsAndGroup),
            (true, Some(group)) if is_blank(group) => Err(ValidationError::EmptyName("item_group")),
            _ if self.items.iter().any(|i| is_blank(i)) => Err(ValidationError::EmptyName("items")),
            _ => Ok(()),
        }
    }

    fn validate_fields(&self) -> Result<(), ValidationError> {
        match (self.fields.is_empty(), &self.field_schema) {
            (true, None) => return Err(ValidationError::NoFields),
            (false, Some(_)) => return Err(ValidationError::FieldsAndSchema),
            (true, Some(schema)) if is_blank(schema) => {
                return Err(ValidationError::EmptyName("field_schema"))
            }
            _ => {}
        }
        if self.fields.iter().any(|f| is_blank(f)) {
            return Err(ValidationError::EmptyName("fields"));
        }
        if self.mode == SubscriptionMode::Command && !self.fields.is_empty() {
            for required in [KEY_FIELD, COMMAND_FIELD] {
                if !self.fields.iter().any(|f| f == required) {
                    return Err(ValidationError::MissingCommandField(required));
                }
            }
        }
        Ok(())
    }

    fn validate_snapshot(&self) -> Result<(), ValidationError> {
        match self.requested_snapshot {
            None | Some(SnapshotRequest::No) => Ok(()),
            Some(_) if self.mode == SubscriptionMode::Raw => {
                Err(ValidationError::SnapshotInRawMode)
            }
            Some(SnapshotRequest::Length(_)) if self.mode != SubscriptionMode::Distinct => {
                Err(ValidationError::SnapshotLengthOutsideDistinct(self.mode))
            }
            Some(SnapshotRequest::Length(0)) => Err(ValidationError::ZeroSnapshotLength),
            Some(_) => Ok(()),
        }
    }

    fn validate_frequency(&self) -> Result<(), ValidationError> {
        match self.requested_max_frequency {
            None => Ok(()),
            Some(_) if self.mode == SubscriptionMode::Raw => {
                Err(ValidationError::FrequencyInRawMode)
            }
            Some(MaxFrequency::PerSecond(f)) if !(f.is_finite() && f > 0.0) => {
                Err(ValidationError::InvalidFrequency(f))
            }
            Some(_) => Ok(()),
        }
    }
}

fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn merge() -> SubscriptionConfig {
        SubscriptionConfig::new(SubscriptionMode::Merge)
            .with_items(["item1", "item2"])
            .with_fields(["last_price", "time"])
    }

    #[test]
    fn identity_follows_mode_unless_overridden() {
        assert_eq!(merge().resolved_identity(), IdentityPolicy::PositionKeyed);
        let distinct = SubscriptionConfig::new(SubscriptionMode::Distinct);
        assert_eq!(distinct.resolved_identity(), IdentityPolicy::SequenceKeyed);
        let command = SubscriptionConfig::new(SubscriptionMode::Command);
        assert_eq!(command.resolved_identity(), IdentityPolicy::ExplicitKeyed);
        let overridden = merge().with_identity(IdentityPolicy::SequenceKeyed);
        assert_eq!(overridden.resolved_identity(), IdentityPolicy::SequenceKeyed);
    }

    #[test]
    fn items_and_fields_are_exclusive_and_required() {
        assert_eq!(merge().validate(), Ok(()));
        let no_items = SubscriptionConfig::new(SubscriptionMode::Merge).with_fields(["a"]);
        assert_eq!(no_items.validate(), Err(ValidationError::NoItems));
        assert_eq!(
            merge().with_item_group("g").validate(),
            Err(ValidationError::ItemsAndGroup)
        );
        let no_fields = SubscriptionConfig::new(SubscriptionMode::Merge).with_items(["a"]);
        assert_eq!(no_fields.validate(), Err(ValidationError::NoFields));
        assert_eq!(
            merge().with_field_schema("s").validate(),
            Err(ValidationError::FieldsAndSchema)
        );
        assert_eq!(
            merge().with_items(["ok", " "]).validate(),
            Err(ValidationError::EmptyName("items"))
        );
    }

    #[test]
    fn command_mode_needs_key_and_command_fields() {
        let cfg = SubscriptionConfig::new(SubscriptionMode::Command)
            .with_item_group("portfolio")
            .with_fields(["key", "qty"]);
        assert_eq!(
            cfg.validate(),
            Err(ValidationError::MissingCommandField("command"))
        );
        let with_schema = SubscriptionConfig::new(SubscriptionMode::Command)
            .with_item_group("portfolio")
            .with_field_schema("portfolio_fields");
        assert_eq!(with_schema.validate(), Ok(()));
    }

    #[test]
    fn snapshot_rules() {
        let raw = SubscriptionConfig::new(SubscriptionMode::Raw)
            .with_items(["i"])
            .with_fields(["f"]);
        assert_eq!(
            raw.clone().with_snapshot(SnapshotRequest::Yes).validate(),
            Err(ValidationError::SnapshotInRawMode)
        );
        assert_eq!(raw.with_snapshot(SnapshotRequest::No).validate(), Ok(()));
        assert_eq!(
            merge().with_snapshot(SnapshotRequest::Length(5)).validate(),
            Err(ValidationError::SnapshotLengthOutsideDistinct(SubscriptionMode::Merge))
        );
        let distinct = SubscriptionConfig::new(SubscriptionMode::Distinct)
            .with_items(["news"])
            .with_fields(["headline"]);
        assert_eq!(
            distinct.clone().with_snapshot(SnapshotRequest::Length(0)).validate(),
            Err(ValidationError::ZeroSnapshotLength)
        );
        assert_eq!(distinct.with_snapshot(SnapshotRequest::Length(10)).validate(), Ok(()));
    }

    #[test]
    fn frequency_and_buffer_rules() {
        assert_eq!(
            merge().with_max_frequency(MaxFrequency::PerSecond(0.0)).validate(),
            Err(ValidationError::InvalidFrequency(0.0))
        );
        assert!(merge()
            .with_max_frequency(MaxFrequency::PerSecond(f64::NAN))
            .validate()
            .is_err());
        assert_eq!(
            merge().with_max_frequency(MaxFrequency::PerSecond(2.5)).validate(),
            Ok(())
        );
        let raw = SubscriptionConfig::new(SubscriptionMode::Raw)
            .with_items(["i"])
            .with_fields(["f"])
            .with_max_frequency(MaxFrequency::Unlimited);
        assert_eq!(raw.validate(), Err(ValidationError::FrequencyInRawMode));
        assert_eq!(
            merge().with_buffer_size(BufferSize::Size(0)).validate(),
            Err(ValidationError::ZeroBufferSize)
        );
        assert_eq!(
            merge().with_selector("").validate(),
            Err(ValidationError::EmptyName("selector"))
        );
    }

    #[test]
    fn json_shape() {
        let cfg = SubscriptionConfig::new(SubscriptionMode::Distinct)
            .with_items(["news"])
            .with_fields(["headline"])
            .with_snapshot(SnapshotRequest::Length(3))
            .with_max_frequency(MaxFrequency::PerSecond(1.5));
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "mode": "distinct",
                "items": ["news"],
                "fields": ["headline"],
                "requested_snapshot": {"length": 3},
                "requested_max_frequency": {"per_second": 1.5},
            })
        );
        let parsed: SubscriptionConfig =
            serde_json::from_str(r#"{"mode":"command","identity":"position_keyed","item_group":"g","field_schema":"s"}"#)
                .unwrap();
        assert_eq!(parsed.resolved_identity(), IdentityPolicy::PositionKeyed);
        assert!(serde_json::from_str::<SubscriptionConfig>(r#"{"bogus":1}"#).is_err());
    }

    #[test]
    fn modes_parse_case_insensitively() {
        assert_eq!("COMMAND".parse::<SubscriptionMode>(), Ok(SubscriptionMode::Command));
        assert_eq!("merge".parse::<SubscriptionMode>().map(|m| m.to_string()), Ok("merge".into()));
        assert!("fast".parse::<SubscriptionMode>().is_err());
    }
}
