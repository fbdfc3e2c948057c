//! Configuration loading and resolution.
//!
//! Every setting resolves once at startup: explicit flag first, then the
//! environment, then the built-in default.

use std::path::PathBuf;
use std::time::Duration;

use rollout_watch::DEFAULT_WAVE_THRESHOLD;

pub const DEFAULT_SOURCE_URL: &str = "https://www.teslafi.com/firmware.php";
pub const DEFAULT_STATE_FILE: &str = "memory.json";
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Desktop browser identity; the rollout page rejects obvious bots.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                              AppleWebKit/537.36 (KHTML, like Gecko) \
                              Chrome/91.0.4472.114 Safari/537.36";

pub const ENV_SOURCE_URL: &str = "ROLLOUT_WATCH_URL";
pub const ENV_STATE_FILE: &str = "ROLLOUT_WATCH_STATE";
pub const ENV_THRESHOLD: &str = "ROLLOUT_WATCH_THRESHOLD";
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_TOKEN";
pub const ENV_CHAT_ID: &str = "CHAT_ID";
pub const ENV_API_BASE: &str = "TELEGRAM_API_BASE";

/// Bot token and destination chat. Only built when both are present.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_url: Option<String>,
    pub state_file: Option<PathBuf>,
    pub wave_threshold: Option<u64>,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub source_url: String,
    pub state_file_path: PathBuf,
    pub wave_threshold: u64,
    /// `None` means notifications are skipped.
    pub credentials: Option<Credentials>,
    pub api_base: String,
    pub timeout: Duration,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ROLLOUT_WATCH_THRESHOLD must be a whole number, got {0:?}")]
    InvalidThreshold(String),

    #[error("wave threshold must be at least 1")]
    ZeroThreshold,

    #[error("timeout must be at least 1 second")]
    ZeroTimeout,
}

impl WatchConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve with a custom environment lookup.
    pub fn resolve_with<F>(overrides: &ConfigOverrides, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values in CI secrets are as good as unset.
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let source_url = overrides
            .source_url
            .clone()
            .or_else(|| lookup(ENV_SOURCE_URL))
            .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string());

        let state_file_path = overrides
            .state_file
            .clone()
            .or_else(|| lookup(ENV_STATE_FILE).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE));

        let wave_threshold = match overrides.wave_threshold {
            Some(t) => t,
            None => match lookup(ENV_THRESHOLD) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidThreshold(raw.clone()))?,
                None => DEFAULT_WAVE_THRESHOLD,
            },
        };
        if wave_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }

        let timeout_secs = overrides.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let bot_token = overrides
            .bot_token
            .clone()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| lookup(ENV_BOT_TOKEN));
        let chat_id = overrides
            .chat_id
            .clone()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| lookup(ENV_CHAT_ID));
        let credentials = match (bot_token, chat_id) {
            (Some(bot_token), Some(chat_id)) => Some(Credentials { bot_token, chat_id }),
            _ => None,
        };

        let api_base = overrides
            .api_base
            .clone()
            .or_else(|| lookup(ENV_API_BASE))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            source_url,
            state_file_path,
            wave_threshold,
            credentials,
            api_base,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = WatchConfig::resolve_with(&ConfigOverrides::default(), env_of(&[])).unwrap();
        assert_eq!(cfg.source_url, DEFAULT_SOURCE_URL);
        assert_eq!(cfg.state_file_path, PathBuf::from("memory.json"));
        assert_eq!(cfg.wave_threshold, 5);
        assert_eq!(cfg.timeout, Duration::from_secs(20));
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert!(!cfg.has_credentials());
    }

    #[test]
    fn test_env_credentials() {
        let cfg = WatchConfig::resolve_with(
            &ConfigOverrides::default(),
            env_of(&[(ENV_BOT_TOKEN, "123:abc"), (ENV_CHAT_ID, "-100200")]),
        )
        .unwrap();
        let creds = cfg.credentials.unwrap();
        assert_eq!(creds.bot_token, "123:abc");
        assert_eq!(creds.chat_id, "-100200");
    }

    #[test]
    fn test_half_credentials_are_none() {
        let cfg = WatchConfig::resolve_with(
            &ConfigOverrides::default(),
            env_of(&[(ENV_BOT_TOKEN, "123:abc")]),
        )
        .unwrap();
        assert!(!cfg.has_credentials());

        let cfg = WatchConfig::resolve_with(
            &ConfigOverrides::default(),
            env_of(&[(ENV_BOT_TOKEN, "123:abc"), (ENV_CHAT_ID, "  ")]),
        )
        .unwrap();
        assert!(!cfg.has_credentials());
    }

    #[test]
    fn test_flags_beat_env() {
        let overrides = ConfigOverrides {
            source_url: Some("http://localhost/fw".to_string()),
            state_file: Some(PathBuf::from("/tmp/state.json")),
            wave_threshold: Some(20),
            chat_id: Some("999".to_string()),
            ..Default::default()
        };
        let cfg = WatchConfig::resolve_with(
            &overrides,
            env_of(&[
                (ENV_SOURCE_URL, "http://env/fw"),
                (ENV_STATE_FILE, "env.json"),
                (ENV_THRESHOLD, "7"),
                (ENV_BOT_TOKEN, "t"),
                (ENV_CHAT_ID, "1"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.source_url, "http://localhost/fw");
        assert_eq!(cfg.state_file_path, PathBuf::from("/tmp/state.json"));
        assert_eq!(cfg.wave_threshold, 20);
        assert_eq!(cfg.credentials.unwrap().chat_id, "999");
    }

    #[test]
    fn test_env_threshold() {
        let cfg =
            WatchConfig::resolve_with(&ConfigOverrides::default(), env_of(&[(ENV_THRESHOLD, " 12 ")]))
                .unwrap();
        assert_eq!(cfg.wave_threshold, 12);
    }

    #[test]
    fn test_bad_threshold_is_error() {
        let err =
            WatchConfig::resolve_with(&ConfigOverrides::default(), env_of(&[(ENV_THRESHOLD, "five")]))
                .unwrap_err();
        assert_eq!(err, ConfigError::InvalidThreshold("five".to_string()));

        let overrides = ConfigOverrides {
            wave_threshold: Some(0),
            ..Default::default()
        };
        assert_eq!(
            WatchConfig::resolve_with(&overrides, env_of(&[])).unwrap_err(),
            ConfigError::ZeroThreshold
        );
    }

    #[test]
    fn test_api_base_trailing_slash() {
        let overrides = ConfigOverrides {
            api_base: Some("http://127.0.0.1:9000/".to_string()),
            ..Default::default()
        };
        let cfg = WatchConfig::resolve_with(&overrides, env_of(&[])).unwrap();
        assert_eq!(cfg.api_base, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = Credentials {
            bot_token: "secret-token".to_string(),
            chat_id: "1".to_string(),
        };
        assert!(!format!("{creds:?}").contains("secret-token"));
    }
}
