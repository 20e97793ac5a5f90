use crate::normalization::DEFAULT_COUNTRY_CODE;
use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};
use url::Url;

pub const TOKEN_ENV_VAR: &str = "PHONEBLOCK_API_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    pub api_base: String,
    pub bearer_token: String,
    pub min_votes: u32,
    pub negative_ratings: Vec<String>,
    pub rich_webhook: Option<String>,    // Discord-style, leave empty to disable
    pub compact_webhook: Option<String>, // Generic JSON receiver
    pub http_timeout_seconds: u64,
    pub webhook_username: String,
    pub country_code: String,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        ScreenerConfig {
            api_base: "https://phoneblock.net/phoneblock/api".to_string(),
            bearer_token: String::new(),
            min_votes: 4,
            // B_MISSED=missed spam attempt, C_PING=ping call, D_POLL=poll,
            // E_ADVERTISING, F_GAMBLE=gambling, G_FRAUD
            negative_ratings: vec![
                "B_MISSED".to_string(),
                "C_PING".to_string(),
                "D_POLL".to_string(),
                "E_ADVERTISING".to_string(),
                "F_GAMBLE".to_string(),
                "G_FRAUD".to_string(),
            ],
            rich_webhook: None,
            compact_webhook: None,
            http_timeout_seconds: 6,
            webhook_username: "PhoneBlock".to_string(),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
        }
    }
}

impl ScreenerConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let mut config: ScreenerConfig = serde_yaml::from_str(content)?;
        config.rich_webhook = non_blank(config.rich_webhook);
        config.compact_webhook = non_blank(config.compact_webhook);
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Replace the bearer token from the environment, if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            if !token.trim().is_empty() {
                self.bearer_token = token.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        check_http_url("api_base", &self.api_base)?;

        if let Some(url) = &self.rich_webhook {
            check_http_url("rich_webhook", url)?;
        }
        if let Some(url) = &self.compact_webhook {
            check_http_url("compact_webhook", url)?;
        }

        if self.http_timeout_seconds == 0 {
            bail!("http_timeout_seconds must be greater than zero");
        }

        if self.country_code.is_empty() || !self.country_code.chars().all(|c| c.is_ascii_digit())
        {
            bail!(
                "country_code must be digits only, got '{}'",
                self.country_code
            );
        }

        if self.bearer_token.trim().is_empty() {
            log::warn!("No bearer token configured; lookups will most likely be refused");
        }

        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn check_http_url(field: &str, value: &str) -> anyhow::Result<()> {
    let url = Url::parse(value).map_err(|e| anyhow!("{field} is not a valid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => bail!("{field} must use http or https, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScreenerConfig::default();
        assert_eq!(config.min_votes, 4);
        assert_eq!(config.http_timeout_seconds, 6);
        assert_eq!(config.negative_ratings.len(), 6);
        assert!(config.rich_webhook.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ScreenerConfig::from_yaml(
            r#"
bearer_token: "abc"
min_votes: 7
compact_webhook: "https://hooks.test/in"
rich_webhook: "   "
"#,
        )
        .unwrap();

        assert_eq!(config.bearer_token, "abc");
        assert_eq!(config.min_votes, 7);
        assert_eq!(config.compact_webhook.as_deref(), Some("https://hooks.test/in"));
        assert!(config.rich_webhook.is_none());
        assert_eq!(config.api_base, "https://phoneblock.net/phoneblock/api");
        assert_eq!(config.country_code, "49");
    }

    #[test]
    fn test_validation_failures() {
        let mut config = ScreenerConfig::default();
        config.api_base = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = ScreenerConfig::default();
        config.compact_webhook = Some("ftp://hooks.test".to_string());
        assert!(config.validate().is_err());

        let mut config = ScreenerConfig::default();
        config.http_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = ScreenerConfig::default();
        config.country_code = "+49".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_roundtrip_via_file() {
        let path = std::env::temp_dir().join(format!(
            "phoneblock-screen-config-{}.yaml",
            std::process::id()
        ));
        let path = path.to_string_lossy().to_string();

        let mut config = ScreenerConfig::default();
        config.rich_webhook = Some("https://chat.test/hook".to_string());
        config.to_file(&path).unwrap();

        let loaded = ScreenerConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.rich_webhook, config.rich_webhook);
        assert_eq!(loaded.negative_ratings, config.negative_ratings);
    }
}
