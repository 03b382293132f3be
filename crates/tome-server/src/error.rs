use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Map a dotted settings path back to the environment variable a user would
/// set, e.g. `llm.api_key` -> `TOME_LLM__API_KEY`.
pub fn to_env_var(field: &str) -> String {
    format!("TOME_{}", field.replace('.', "__").to_uppercase())
}
