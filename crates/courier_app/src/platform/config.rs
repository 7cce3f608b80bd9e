//! Environment configuration, with `.env` loaded first when present.
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use courier_engine::{FetchSettings, SmtpSettings};

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_STATE_DIR: &str = "./data";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub telegram_token: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub state_dir: PathBuf,
    pub log_file: Option<PathBuf>,
    pub fetch_timeout: Duration,
    /// Default recipient for the CLI.
    pub kindle_email: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let fetch_timeout = match get("FETCH_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| anyhow!("FETCH_TIMEOUT_SECS must be a positive integer, got {raw:?}"))?,
            None => DEFAULT_FETCH_TIMEOUT_SECS,
        };

        Ok(Self {
            telegram_token: get("TELEGRAM_TOKEN").or_else(|| get("BOT_TOKEN")),
            smtp: smtp_from(&get)?,
            state_dir: get("COURIER_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
            log_file: get("LOG_FILE").map(PathBuf::from),
            fetch_timeout: Duration::from_secs(fetch_timeout),
            kindle_email: get("KINDLE_EMAIL"),
        })
    }

    pub fn require_telegram_token(&self) -> Result<&str> {
        self.telegram_token
            .as_deref()
            .context("TELEGRAM_TOKEN (or BOT_TOKEN) is not set")
    }

    pub fn require_smtp(&self) -> Result<&SmtpConfig> {
        self.smtp
            .as_ref()
            .context("SMTP_HOST, EMAIL_FROM and EMAIL_PASSWORD must be set to send email")
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            request_timeout: self.fetch_timeout,
            ..FetchSettings::default()
        }
    }
}

impl SmtpConfig {
    pub fn settings(&self, timeout: Duration) -> SmtpSettings {
        SmtpSettings {
            host: self.host.clone(),
            port: self.port,
            username: self.from.clone(),
            password: self.password.clone(),
            from: self.from.clone(),
            timeout,
        }
    }
}

/// `None` when no SMTP variable is set; an error when only some are.
fn smtp_from(get: &impl Fn(&str) -> Option<String>) -> Result<Option<SmtpConfig>> {
    let host = get("SMTP_HOST");
    let from = get("EMAIL_FROM");
    let password = get("EMAIL_PASSWORD");

    let (host, from, password) = match (host, from, password) {
        (None, None, None) => return Ok(None),
        (Some(host), Some(from), Some(password)) => (host, from, password),
        (host, from, password) => {
            let missing: Vec<&str> = [
                ("SMTP_HOST", host.is_none()),
                ("EMAIL_FROM", from.is_none()),
                ("EMAIL_PASSWORD", password.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            bail!("incomplete SMTP configuration, missing {}", missing.join(", "));
        }
    };

    let port = match get("SMTP_PORT") {
        Some(raw) => raw
            .parse::<u16>()
            .with_context(|| format!("SMTP_PORT must be a port number, got {raw:?}"))?,
        None => DEFAULT_SMTP_PORT,
    };

    Ok(Some(SmtpConfig {
        host,
        port,
        from,
        password,
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.telegram_token, None);
        assert_eq!(cfg.smtp, None);
        assert_eq!(cfg.state_dir, PathBuf::from("./data"));
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(30));
        assert!(cfg.require_smtp().is_err());
    }

    #[test]
    fn bot_token_is_a_fallback_name() {
        let cfg = config(&[("BOT_TOKEN", "abc")]).unwrap();
        assert_eq!(cfg.require_telegram_token().unwrap(), "abc");
        let cfg = config(&[("BOT_TOKEN", "abc"), ("TELEGRAM_TOKEN", "xyz")]).unwrap();
        assert_eq!(cfg.require_telegram_token().unwrap(), "xyz");
    }

    #[test]
    fn smtp_needs_all_three_values() {
        let err = config(&[("SMTP_HOST", "smtp.example.com")]).unwrap_err();
        assert!(err.to_string().contains("EMAIL_FROM, EMAIL_PASSWORD"));

        let cfg = config(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("EMAIL_FROM", "bot@example.com"),
            ("EMAIL_PASSWORD", "secret"),
        ])
        .unwrap();
        assert_eq!(cfg.require_smtp().unwrap().port, 587);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(config(&[("FETCH_TIMEOUT_SECS", "soon")]).is_err());
        assert!(config(&[("FETCH_TIMEOUT_SECS", "0")]).is_err());
        assert!(config(&[
            ("SMTP_HOST", "h"),
            ("EMAIL_FROM", "f"),
            ("EMAIL_PASSWORD", "p"),
            ("SMTP_PORT", "99999"),
        ])
        .is_err());
    }
}
