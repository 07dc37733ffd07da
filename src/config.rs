use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "SKILLHUB";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_id: String::new(),
            auth_token: String::new(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    crate::api::DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!(
        "skillhub-tui/{} (+https://github.com/skillhub-app/skillhub-tui)",
        crate::VERSION
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
        }
    }
}

fn default_theme() -> String {
    "default".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    #[serde(default = "default_video_command")]
    pub video_command: Vec<String>,
    #[serde(default = "default_video_detach")]
    pub video_detach: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            video_command: default_video_command(),
            video_detach: default_video_detach(),
        }
    }
}

fn default_video_command() -> Vec<String> {
    vec!["mpv".into(), "--fs".into(), "%URL%".into()]
}

fn default_video_detach() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationConfig {
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(default = "default_polling_enabled")]
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            enabled: default_polling_enabled(),
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_polling_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env_overrides(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Overlays a parsed config file onto the defaults. `base` is always
/// `Config::default()` here; fields without an "unset" sentinel (booleans,
/// durations) are copied through as-is, which is only sound against defaults.
fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.api.base_url.is_empty() {
        base.api.base_url = other.api.base_url;
    }
    if !other.api.user_id.is_empty() {
        base.api.user_id = other.api.user_id;
    }
    if !other.api.auth_token.is_empty() {
        base.api.auth_token = other.api.auth_token;
    }
    if !other.api.user_agent.is_empty() {
        base.api.user_agent = other.api.user_agent;
    }

    if other.feed.page_size != 0 {
        base.feed.page_size = other.feed.page_size;
    }

    if !other.ui.theme.is_empty() {
        base.ui.theme = other.ui.theme;
    }

    if !other.player.video_command.is_empty() {
        base.player.video_command = other.player.video_command;
    }
    base.player.video_detach = other.player.video_detach;

    base.notifications.poll_interval = other.notifications.poll_interval;
    base.notifications.enabled = other.notifications.enabled;

    base
}

/// Applies only the env keys actually present, so file-configured values the
/// merge cannot distinguish from defaults (booleans, durations) survive when
/// the environment is silent about them.
fn apply_env_overrides(cfg: &mut Config, prefix: &str) {
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            apply_env_value(cfg, &normalized, value);
        }
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.user_id" => cfg.api.user_id = value,
        "api.auth_token" => cfg.api.auth_token = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "feed.page_size" => {
            if let Ok(parsed) = value.parse::<u32>() {
                cfg.feed.page_size = parsed;
            }
        }
        "ui.theme" => cfg.ui.theme = value,
        "player.video_command" => {
            cfg.player.video_command = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        "player.video_detach" => {
            cfg.player.video_detach = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        "notifications.poll_interval" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.notifications.poll_interval = duration;
            }
        }
        "notifications.enabled" => {
            cfg.notifications.enabled = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("skillhub-tui").join("config.yaml"))
}

pub fn save_credentials(
    path: Option<PathBuf>,
    user_id: &str,
    auth_token: &str,
    base_url: &str,
) -> Result<PathBuf> {
    let user_id = user_id.trim();
    let auth_token = auth_token.trim();
    let base_url = base_url.trim();

    anyhow::ensure!(!user_id.is_empty(), "config: api.user_id is required");

    let path = if let Some(path) = path {
        path
    } else {
        default_config_path().context("config: unable to determine default config path")?
    };

    let mut cfg = if path.exists() {
        read_config_file(&path)?
    } else {
        Config::default()
    };

    cfg.api.user_id = user_id.to_string();
    cfg.api.auth_token = auth_token.to_string();
    if !base_url.is_empty() {
        cfg.api.base_url = base_url.to_string();
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("config: failed to create directory {}", parent.display()))?;
    }

    let contents = serde_yaml::to_string(&cfg).context("config: failed to serialize config")?;
    fs::write(&path, contents)
        .with_context(|| format!("config: failed to write file {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/skillhub.yaml")),
            env_prefix: Some("SKILLHUB_TEST_NONE".into()),
        })
        .unwrap();
        assert_eq!(cfg.ui.theme, "default");
        assert_eq!(cfg.api.base_url, default_base_url());
        assert_eq!(cfg.feed.page_size, 20);
        assert!(cfg.notifications.enabled);
    }

    #[test]
    fn save_credentials_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        save_credentials(
            Some(path.clone()),
            "user-42",
            "token",
            "https://api.example.test/",
        )
        .unwrap();
        let saved = read_config_file(&path).unwrap();
        assert_eq!(saved.api.user_id, "user-42");
        assert_eq!(saved.api.base_url, "https://api.example.test/");
    }

    #[test]
    fn env_overrides() {
        env::set_var("SKILLHUB_UI__THEME", "dracula");
        env::set_var("SKILLHUB_FEED__PAGE_SIZE", "7");
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/skillhub.yaml")),
            env_prefix: None,
        })
        .unwrap();
        assert_eq!(cfg.ui.theme, "dracula");
        assert_eq!(cfg.feed.page_size, 7);
        env::remove_var("SKILLHUB_UI__THEME");
        env::remove_var("SKILLHUB_FEED__PAGE_SIZE");
    }

    #[test]
    fn file_values_survive_when_env_is_silent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "notifications:\n  enabled: false\n  poll_interval: 5m\nplayer:\n  video_detach: false\n",
        )
        .unwrap();

        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("SKILLHUB_TEST_SILENT".into()),
        })
        .unwrap();

        assert!(!cfg.notifications.enabled, "file disabled polling");
        assert_eq!(cfg.notifications.poll_interval, Duration::from_secs(300));
        assert!(!cfg.player.video_detach);
        // Fields the file never mentions still get their defaults.
        assert_eq!(cfg.feed.page_size, 20);
    }

    #[test]
    fn env_still_overrides_file_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "notifications:\n  enabled: false\n").unwrap();

        env::set_var("SKILLHUB_TEST_LOUD_NOTIFICATIONS__ENABLED", "true");
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("SKILLHUB_TEST_LOUD".into()),
        })
        .unwrap();
        env::remove_var("SKILLHUB_TEST_LOUD_NOTIFICATIONS__ENABLED");

        assert!(cfg.notifications.enabled);
    }

    #[test]
    fn parses_poll_interval_from_env() {
        env::set_var("SKILLHUB_NOTIFICATIONS__POLL_INTERVAL", "2m");
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/skillhub.yaml")),
            env_prefix: None,
        })
        .unwrap();
        assert_eq!(cfg.notifications.poll_interval, Duration::from_secs(120));
        env::remove_var("SKILLHUB_NOTIFICATIONS__POLL_INTERVAL");
    }
}
