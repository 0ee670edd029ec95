// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed `ConfigStore` for Ripple tools (uses platform config dir).

use directories::ProjectDirs;
use ripple_app_core::config::{ConfigError, ConfigStore};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Store configs as JSON files, one `<key>.json` per logical name.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Create a store rooted at the user config directory (e.g., `~/.config/ripple`).
    pub fn new() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "Ripple")
            .ok_or_else(|| ConfigError::Other("could not resolve config dir".into()))?;
        Self::at(proj.config_dir())
    }

    /// Create a store rooted at `base`, creating the directory if needed.
    pub fn at(base: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        debug!(base = %base.display(), "config store ready");
        Ok(Self { base })
    }

    /// Directory holding the config files.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Keys are plain file stems; anything that could escape `base` is refused.
    fn path_for(&self, key: &str) -> Result<PathBuf, ConfigError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(ConfigError::Other(format!("invalid config key `{key}`")));
        }
        Ok(self.base.join(format!("{key}.json")))
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key)?;
        fs::write(&path, data)?;
        debug!(path = %path.display(), bytes = data.len(), "config saved");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use ripple_app_core::config::ConfigService;
    use ripple_app_core::{SubscriptionConfig, SubscriptionMode};

    #[test]
    fn saves_json_files_under_base() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::at(dir.path().join("nested")).unwrap();
        store.save_raw("feed", b"{}").unwrap();
        assert!(dir.path().join("nested/feed.json").is_file());
        assert_eq!(store.load_raw("feed").unwrap(), b"{}");
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::at(dir.path()).unwrap();
        assert!(matches!(store.load_raw("nope"), Err(ConfigError::NotFound)));
    }

    #[test]
    fn keys_cannot_escape_base() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::at(dir.path()).unwrap();
        for key in ["", "../up", "a/b", ".hidden"] {
            assert!(
                matches!(store.save_raw(key, b"x"), Err(ConfigError::Other(_))),
                "{key:?}"
            );
        }
    }

    #[test]
    fn subscription_round_trips_through_service() {
        let dir = tempfile::tempdir().unwrap();
        let service = ConfigService::new(FsConfigStore::at(dir.path()).unwrap());
        let cfg = SubscriptionConfig::new(SubscriptionMode::Distinct)
            .with_items(["news"])
            .with_fields(["headline", "time"]);
        service.save_subscription("news", &cfg).unwrap();
        assert_eq!(service.load_subscription("news").unwrap(), Some(cfg));
    }
}
