use std::collections::HashMap;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

pub const DEFAULT_FALLBACK_RATE: f64 = 150.0;
pub const DEFAULT_RATE_TTL_SECS: i64 = 3600;
pub const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";

/// Settings read from `~/.bao/rc`
///
/// The rc file holds `key=value` lines; blank lines and `#` comments are skipped.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, String>,
    base_dir: Option<PathBuf>,
}

/// Transactional email settings; present only when endpoint, key and sender are all set
#[derive(Debug, Clone, PartialEq)]
pub struct EmailSettings {
    pub endpoint: String,
    pub api_key: String,
    pub from: String,
    pub notify: Vec<String>,
}

impl Config {
    /// Directory holding the rc file and the default database
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".bao")
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        Self::home_dir().join("rc")
    }

    /// Load the rc file, or an empty config if it does not exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Ok(Self::parse(&content, path.parent()))
    }

    /// Parse rc content; `base_dir` anchors relative paths
    pub fn parse(content: &str, base_dir: Option<&Path>) -> Self {
        let mut values = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                values.insert(key.trim().to_string(), value.trim().to_string());
            } else {
                log::warn!("Ignoring malformed config line: {}", line);
            }
        }
        Self {
            values,
            base_dir: base_dir.map(Path::to_path_buf),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Database location: `data.location`, else `~/.bao/flow.db`
    pub fn data_location(&self) -> PathBuf {
        match self.get("data.location") {
            Some(raw) => {
                let path = PathBuf::from(raw);
                match (&self.base_dir, path.is_relative()) {
                    (Some(base), true) => base.join(path),
                    _ => path,
                }
            }
            None => Self::home_dir().join("flow.db"),
        }
    }

    /// Email of the acting user, recorded on status history
    pub fn user_email(&self) -> Option<&str> {
        self.get("user.email")
    }

    pub fn rates_url(&self) -> &str {
        self.get("rates.url").unwrap_or(DEFAULT_RATES_URL)
    }

    pub fn fallback_rate(&self) -> f64 {
        self.parse_number("rates.fallback", DEFAULT_FALLBACK_RATE, |v: f64| v.is_finite() && v > 0.0)
    }

    pub fn rate_ttl_secs(&self) -> i64 {
        self.parse_number("rates.ttl_secs", DEFAULT_RATE_TTL_SECS, |v: i64| v >= 0)
    }

    pub fn email(&self) -> Option<EmailSettings> {
        let endpoint = self.get("email.endpoint")?;
        let api_key = self.get("email.api_key")?;
        let from = self.get("email.from")?;
        let notify = self
            .get("email.notify")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Some(EmailSettings {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
            notify,
        })
    }

    fn parse_number<T>(&self, key: &str, default: T, valid: impl Fn(T) -> bool) -> T
    where
        T: std::str::FromStr + Copy + std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => match raw.parse::<T>() {
                Ok(v) if valid(v) => v,
                _ => {
                    log::warn!("Invalid value for {}: '{}', using {}", key, raw, default);
                    default
                }
            },
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let config = Config::parse("# comment\n\nuser.email = a@b.jp\nbroken line\n", None);
        assert_eq!(config.user_email(), Some("a@b.jp"));
        assert_eq!(config.get("broken line"), None);
    }

    #[test]
    fn test_relative_data_location() {
        let config = Config::parse("data.location=./custom.db\n", Some(Path::new("/tmp/bao")));
        assert_eq!(config.data_location(), PathBuf::from("/tmp/bao/./custom.db"));

        let config = Config::parse("data.location=/var/db/flow.db\n", Some(Path::new("/tmp/bao")));
        assert_eq!(config.data_location(), PathBuf::from("/var/db/flow.db"));
    }

    #[test]
    fn test_rate_defaults_and_invalid_values() {
        let config = Config::parse("", None);
        assert_eq!(config.fallback_rate(), DEFAULT_FALLBACK_RATE);
        assert_eq!(config.rate_ttl_secs(), DEFAULT_RATE_TTL_SECS);
        assert_eq!(config.rates_url(), DEFAULT_RATES_URL);

        let config = Config::parse("rates.fallback=abc\nrates.ttl_secs=-5\n", None);
        assert_eq!(config.fallback_rate(), DEFAULT_FALLBACK_RATE);
        assert_eq!(config.rate_ttl_secs(), DEFAULT_RATE_TTL_SECS);

        let config = Config::parse("rates.fallback=142.5\nrates.ttl_secs=60\n", None);
        assert_eq!(config.fallback_rate(), 142.5);
        assert_eq!(config.rate_ttl_secs(), 60);
    }

    #[test]
    fn test_email_requires_all_fields() {
        let config = Config::parse("email.endpoint=https://mail.example/send\nemail.api_key=k\n", None);
        assert!(config.email().is_none());

        let config = Config::parse(
            "email.endpoint=https://mail.example/send\nemail.api_key=k\nemail.from=flow@bao.jp\nemail.notify=a@bao.jp, b@bao.jp,\n",
            None,
        );
        let email = config.email().unwrap();
        assert_eq!(email.notify, vec!["a@bao.jp".to_string(), "b@bao.jp".to_string()]);
    }
}
