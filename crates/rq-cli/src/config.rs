use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use rq_providers::DEFAULT_BASE_URL;

pub const DEFAULT_MODEL: &str = "codestral-latest";
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Connection settings for the chat-completions endpoint behind the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub model_name: String,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gateway: GatewayConfig,

    /// Where generated .docx reports are written (supports ~)
    pub reports_dir: PathBuf,

    /// Where the save_to_txt tool appends notes (supports ~)
    pub notes_dir: PathBuf,

    /// Address for `rq serve`
    pub bind: String,

    /// Ask the endpoint for a JSON object response (`response_format`)
    pub json_mode: bool,

    /// Tool-calling rounds allowed per gateway invocation
    pub max_tool_iterations: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            reports_dir: PathBuf::from("reports"),
            notes_dir: PathBuf::from("."),
            bind: DEFAULT_BIND.to_string(),
            json_mode: false,
            max_tool_iterations: 20,
        }
    }
}

/// Values given on the command line; unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "GatewayOverrides::is_empty")]
    pub gateway: GatewayOverrides,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GatewayOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl GatewayOverrides {
    fn is_empty(&self) -> bool {
        self.model_name.is_none() && self.base_url.is_none()
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

impl AppConfig {
    /// Load the effective configuration.
    ///
    /// Priority (highest to lowest):
    /// 1. CLI overrides
    /// 2. `MISTRAL_API_KEY`, `MISTRAL_BASE_URL`, `MISTRAL_MODEL`
    /// 3. `RQ_`-prefixed environment variables (`RQ_GATEWAY__MODEL_NAME`, `RQ_BIND`, ...)
    /// 4. `~/.config/rq/config.toml`
    /// 5. Built-in defaults
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let config_file = Self::config_path().ok().filter(|p| p.exists());
        let mut config: AppConfig = Self::figment(config_file.as_deref(), overrides)
            .extract()
            .context("Invalid configuration")?;

        config.reports_dir = expand_home(&config.reports_dir);
        config.notes_dir = expand_home(&config.notes_dir);
        Ok(config)
    }

    pub fn figment(config_file: Option<&Path>, overrides: &ConfigOverrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed("RQ_").split("__"))
            .merge(
                Env::raw()
                    .only(&["MISTRAL_API_KEY", "MISTRAL_BASE_URL", "MISTRAL_MODEL"])
                    .map(|key| {
                        if key == "MISTRAL_API_KEY" {
                            "gateway.api_key".into()
                        } else if key == "MISTRAL_BASE_URL" {
                            "gateway.base_url".into()
                        } else {
                            "gateway.model_name".into()
                        }
                    }),
            )
            .merge(Serialized::defaults(overrides))
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("rq").join("config.toml"))
    }

    pub fn api_key(&self) -> Result<&str> {
        self.gateway.api_key.as_deref().with_context(|| {
            format!(
                "API key not found. Set MISTRAL_API_KEY or gateway.api_key in {}",
                Self::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "~/.config/rq/config.toml".to_string())
            )
        })
    }

    /// Copy safe to print: the API key is replaced by a marker.
    pub fn redacted(&self) -> AppConfig {
        let mut config = self.clone();
        if config.gateway.api_key.is_some() {
            config.gateway.api_key = Some("(configured)".to_string());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config: AppConfig =
                AppConfig::figment(None, &ConfigOverrides::default()).extract()?;
            assert_eq!(config.gateway.model_name, "codestral-latest");
            assert_eq!(config.gateway.base_url, DEFAULT_BASE_URL);
            assert_eq!(config.bind, "127.0.0.1:5000");
            assert_eq!(config.reports_dir, PathBuf::from("reports"));
            assert_eq!(config.max_tool_iterations, 20);
            Ok(())
        });
    }

    #[test]
    fn test_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    bind = "0.0.0.0:8080"
                    json_mode = true

                    [gateway]
                    model_name = "mistral-large-latest"
                    api_key = "from-file"
                "#,
            )?;
            jail.set_env("MISTRAL_API_KEY", "from-env");
            jail.set_env("RQ_MAX_TOOL_ITERATIONS", "5");

            let overrides = ConfigOverrides {
                gateway: GatewayOverrides {
                    base_url: Some("http://localhost:8000/v1".into()),
                    ..Default::default()
                },
                ..Default::default()
            };
            let config: AppConfig =
                AppConfig::figment(Some(Path::new("config.toml")), &overrides).extract()?;

            assert_eq!(config.bind, "0.0.0.0:8080");
            assert!(config.json_mode);
            assert_eq!(config.gateway.model_name, "mistral-large-latest");
            assert_eq!(config.gateway.api_key.as_deref(), Some("from-env"));
            assert_eq!(config.gateway.base_url, "http://localhost:8000/v1");
            assert_eq!(config.max_tool_iterations, 5);
            Ok(())
        });
    }

    #[test]
    fn test_mistral_model_env() {
        Jail::expect_with(|jail| {
            jail.set_env("MISTRAL_MODEL", "open-mistral-nemo");
            jail.set_env("RQ_GATEWAY__MODEL_NAME", "ignored");
            let config: AppConfig =
                AppConfig::figment(None, &ConfigOverrides::default()).extract()?;
            assert_eq!(config.gateway.model_name, "open-mistral-nemo");
            Ok(())
        });
    }

    #[test]
    fn test_redacted() {
        let mut config = AppConfig::default();
        assert!(config.api_key().is_err());

        config.gateway.api_key = Some("secret".into());
        assert_eq!(config.api_key().unwrap(), "secret");

        let printed = toml::to_string(&config.redacted()).unwrap();
        assert!(!printed.contains("secret"));
        assert!(printed.contains("(configured)"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(Path::new("reports")), PathBuf::from("reports"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/reports")), home.join("reports"));
        }
    }
}
