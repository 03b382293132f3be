use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use tome::config::ModelConfig;

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::MissingEnvVar {
                env_var: to_env_var("server.host"),
            })
    }
}

/// Settings for the OpenAI-compatible completion endpoint. The API key is
/// optional at startup so the server can come up unconfigured and report
/// service-unavailable per request instead of refusing to boot.
#[derive(Debug, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_host")]
    pub host: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            host: default_llm_host(),
            api_key: None,
            model: default_model(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl LlmSettings {
    pub fn into_model_config(self) -> ModelConfig {
        let mut config = ModelConfig::new(self.host, self.api_key.unwrap_or_default(), self.model);
        config.temperature = self.temperature;
        config.max_tokens = self.max_tokens;
        config
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub llm: LlmSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("llm.host", default_llm_host())?
            .set_default("llm.model", default_model())?
            .add_source(
                Environment::with_prefix("TOME")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("configuration error: {:?}", &err);
                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_llm_host() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("TOME_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.llm.host, "https://api.openai.com");
        assert_eq!(settings.llm.model, "gpt-4o");
        assert_eq!(settings.llm.api_key, None);
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("TOME_SERVER__PORT", "8080");
        env::set_var("TOME_LLM__API_KEY", "test-key");
        env::set_var("TOME_LLM__MODEL", "gpt-4o-mini");
        env::set_var("TOME_LLM__TEMPERATURE", "0.7");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.llm.api_key.as_deref(), Some("test-key"));
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.llm.temperature, Some(0.7));

        env::remove_var("TOME_SERVER__PORT");
        env::remove_var("TOME_LLM__API_KEY");
        env::remove_var("TOME_LLM__MODEL");
        env::remove_var("TOME_LLM__TEMPERATURE");
    }

    #[test]
    #[serial]
    fn test_into_model_config_with_missing_key() {
        clean_env();

        let settings = Settings::new().unwrap();
        let model = settings.llm.into_model_config();
        // An unset key becomes an empty string, which the provider rejects
        // at construction time.
        assert_eq!(model.api_key, "");
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");
    }
}
