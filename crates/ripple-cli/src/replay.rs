// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `ripple replay`: drive a recorded feed through a session with one view.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use ripple_app_core::config::ConfigService;
use ripple_app_core::{SubscriptionConfig, SubscriptionMode};
use ripple_config_fs::FsConfigStore;
use ripple_core::{Change, FieldQuery, ObserverError, SortRule, SortSpec, ViewSpec};
use ripple_feed::Value;
use ripple_session::Session;
use tracing::{info, warn};

use crate::feed;
use crate::render::{change_line, view_table, Format};

/// Options for `ripple replay`.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Feed log to replay (`.jsonl`/`.json` for JSON lines, anything else for packets)
    pub log: PathBuf,
    /// Subscription mode; selects how update keys are derived
    #[arg(long, default_value = "merge", conflicts_with = "config")]
    pub mode: SubscriptionMode,
    /// Subscription config (JSON) to load instead of `--mode`
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Keep only objects whose field equals the value (repeatable)
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    pub filters: Vec<String>,
    /// Sort by a field; prefix with `-` for descending (repeatable)
    #[arg(long = "sort", value_name = "FIELD", allow_hyphen_values = true)]
    pub sort: Vec<String>,
    /// Output style
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
    /// Exit non-zero if any event was dropped or any view failed
    #[arg(long)]
    pub strict: bool,
}

/// Runs a replay and prints every change followed by the final view.
pub async fn run(args: ReplayArgs) -> Result<()> {
    let events = feed::load(&args.log)?;
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => default_config(args.mode),
    };
    let spec = view_spec(&args.filters, &args.sort)?;

    let (session, driver, mut errors) = Session::spawn(config)?;
    let format = args.format;
    let printer = move |change: &Change| -> Result<(), ObserverError> {
        let line = change_line(change, format).map_err(|err| ObserverError::new(err.to_string()))?;
        println!("{line}");
        Ok(())
    };
    let (view, _cancel) = session.register_view(spec, printer).await?;

    let total = events.len();
    for event in events {
        session.push(event)?;
    }
    let rows = session.view_entries(view).await?;
    let snapshot_complete = session.is_snapshot_ready();
    session.shutdown()?;
    driver.await.context("session driver panicked")?;

    let mut failures = 0usize;
    while let Ok(err) = errors.try_recv() {
        warn!(%err, "replay error");
        eprintln!("warning: {err}");
        failures += 1;
    }
    info!(events = total, rows = rows.len(), failures, "replay finished");

    match format {
        Format::Text => {
            println!("{}", view_table(&rows));
            println!(
                "{} rows, snapshot {}",
                rows.len(),
                if snapshot_complete { "complete" } else { "incomplete" }
            );
        }
        Format::Json => {
            let objects: Vec<_> = rows.iter().map(|row| row.object.fields()).collect();
            println!(
                "{}",
                serde_json::to_string(&serde_json::json!({
                    "rows": objects,
                    "snapshot_complete": snapshot_complete,
                }))?
            );
        }
    }

    if args.strict && failures > 0 {
        bail!("{failures} event(s) failed during replay");
    }
    Ok(())
}

/// Subscription used when no config file is given: the whole log is one
/// anonymous group with an anonymous schema.
pub fn default_config(mode: SubscriptionMode) -> SubscriptionConfig {
    SubscriptionConfig::new(mode)
        .with_item_group("replay")
        .with_field_schema("replay")
}

/// Loads a subscription config file through the filesystem config store:
/// the file's directory is the store, its stem the key.
pub fn load_config(path: &Path) -> Result<SubscriptionConfig> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        bail!("config file {} must have a .json extension", path.display());
    }
    let key = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| anyhow!("config file {} has no usable name", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let service = ConfigService::new(FsConfigStore::at(dir)?);
    service
        .load_subscription(key)
        .with_context(|| format!("loading {}", path.display()))?
        .ok_or_else(|| anyhow!("config file {} not found", path.display()))
}

/// Builds the replay view from `--where` and `--sort` arguments.
pub fn view_spec(filters: &[String], sort: &[String]) -> Result<ViewSpec> {
    let mut query = FieldQuery::new();
    for raw in filters {
        let (field, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("--where expects FIELD=VALUE, got {raw:?}"))?;
        if field.is_empty() {
            bail!("--where has an empty field name in {raw:?}");
        }
        query = query.eq(field, parse_value(value));
    }
    let mut spec = ViewSpec::new(query);
    if !sort.is_empty() {
        let rules = sort
            .iter()
            .map(String::as_str)
            .map(parse_rule)
            .collect::<Result<Vec<_>>>()?;
        spec = spec.sorted(SortSpec::rules(rules));
    }
    Ok(spec)
}

/// JSON scalars (`10`, `2.5`, `true`, `null`, `"x"`) keep their type; any
/// other text is a string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::Str(raw.to_owned()))
}

fn parse_rule(raw: &str) -> Result<SortRule> {
    let rule = match raw.strip_prefix('-') {
        Some(attr) => SortRule::desc(attr),
        None => SortRule::asc(raw.strip_prefix('+').unwrap_or(raw)),
    };
    if rule.attribute.is_empty() {
        bail!("--sort has an empty field name");
    }
    Ok(rule)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use ripple_app_core::config::ConfigStore;

    #[test]
    fn where_values_keep_json_scalar_types() {
        assert_eq!(parse_value("10"), Value::Int(10));
        assert_eq!(parse_value("2.5"), Value::Float(2.5));
        assert_eq!(parse_value("true"), Value::Bool(true));
        assert_eq!(parse_value("\"10\""), Value::Str("10".into()));
        assert_eq!(parse_value("AAPL"), Value::Str("AAPL".into()));
    }

    #[test]
    fn sort_rules_parse_direction() {
        assert_eq!(parse_rule("-price").unwrap(), SortRule::desc("price"));
        assert_eq!(parse_rule("+price").unwrap(), SortRule::asc("price"));
        assert_eq!(parse_rule("sym").unwrap(), SortRule::asc("sym"));
        assert!(parse_rule("-").is_err());
    }

    #[test]
    fn malformed_where_is_rejected() {
        assert!(view_spec(&["price".into()], &[]).is_err());
        assert!(view_spec(&["=3".into()], &[]).is_err());
        let spec = view_spec(&["sym=AAPL".into()], &["-price".into()]).unwrap();
        assert!(spec.sort.is_some());
    }

    #[test]
    fn default_config_is_valid_for_every_mode() {
        for mode in [
            SubscriptionMode::Merge,
            SubscriptionMode::Raw,
            SubscriptionMode::Distinct,
            SubscriptionMode::Command,
        ] {
            default_config(mode).validate().unwrap();
        }
    }

    #[test]
    fn config_file_is_loaded_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::at(dir.path()).unwrap();
        let config = SubscriptionConfig::new(SubscriptionMode::Distinct)
            .with_items(["news"])
            .with_fields(["headline"]);
        store
            .save_raw("desk", &serde_json::to_vec(&config).unwrap())
            .unwrap();

        let loaded = load_config(&dir.path().join("desk.json")).unwrap();
        assert_eq!(loaded, config);
        assert!(load_config(&dir.path().join("missing.json")).is_err());
        assert!(load_config(&dir.path().join("desk.toml")).is_err());
    }
}
