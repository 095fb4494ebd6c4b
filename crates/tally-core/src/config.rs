use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-data-directory configuration, loaded from `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Per-game debounce window for outbound share summaries.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            enabled: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file name, relative to the data directory.
    #[serde(default = "default_db_file")]
    pub db_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_file: default_db_file(),
        }
    }
}

/// User-level configuration (`<config_dir>/tally/config.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    /// Overrides the default data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Load the data-directory config; absent file means defaults.
pub fn load_tracker_config(data_dir: &Path) -> Result<TrackerConfig> {
    let path = data_dir.join("config.toml");
    if !path.exists() {
        return Ok(TrackerConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<TrackerConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load the user config; absent file (or no config dir) means defaults.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("tally/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve the data directory: explicit flag, then user config, then the
/// platform data dir.
#[must_use]
pub fn resolve_data_dir(flag: Option<PathBuf>, user: &UserConfig) -> PathBuf {
    flag.or_else(|| user.data_dir.clone())
        .or_else(|| dirs::data_dir().map(|d| d.join("tally")))
        .unwrap_or_else(|| PathBuf::from(".tally"))
}

const fn default_true() -> bool {
    true
}

const fn default_cooldown_secs() -> u64 {
    10
}

fn default_db_file() -> String {
    "tally.db".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let cfg = load_tracker_config(dir.path()).expect("load");
        assert_eq!(cfg.publish.cooldown_secs, 10);
        assert!(cfg.publish.enabled);
        assert_eq!(cfg.store.db_file, "tally.db");
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join("config.toml"),
            "[publish]\ncooldown_secs = 30\n",
        )
        .expect("write");

        let cfg = load_tracker_config(dir.path()).expect("load");
        assert_eq!(cfg.publish.cooldown_secs, 30);
        assert!(cfg.publish.enabled);
        assert_eq!(cfg.store.db_file, "tally.db");
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("config.toml"), "publish = \"nope").expect("write");
        assert!(load_tracker_config(dir.path()).is_err());
    }

    #[test]
    fn data_dir_flag_wins() {
        let user = UserConfig {
            data_dir: Some(PathBuf::from("/from-user")),
        };
        assert_eq!(
            resolve_data_dir(Some(PathBuf::from("/from-flag")), &user),
            PathBuf::from("/from-flag")
        );
        assert_eq!(resolve_data_dir(None, &user), PathBuf::from("/from-user"));
    }
}
