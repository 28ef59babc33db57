use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::session::AVAILABLE_MODELS;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_STATE_PATH: &str = "app_state.json";
const DEFAULT_VECTOR_STORE_NAME: &str = "tr_pdf_rag_demo";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the PDF assistant.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secret used to authenticate against the hosted API.
    pub openai_api_key: String,
    /// Base URL of the hosted API, including the version prefix.
    pub openai_base_url: String,
    /// Directory scanned for PDF documents.
    pub data_dir: PathBuf,
    /// Location of the persisted application state record.
    pub state_path: PathBuf,
    /// Name assigned to the remote vector store when it is first created.
    pub vector_store_name: String,
    /// Model selected when the session starts.
    pub default_model: String,
    /// Delay between two polls of an in-progress upload batch.
    pub poll_interval: Duration,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Read the configuration and log the resolved values.
    ///
    /// `.env` is not read here; the binary loads it with `dotenvy` before tracing starts.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::from_env()?;
        tracing::debug!(
            base_url = %config.openai_base_url,
            data_dir = %config.data_dir.display(),
            state_path = %config.state_path.display(),
            default_model = %config.default_model,
            server_port = ?config.server_port,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Read configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let openai_base_url = load_env_optional("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        reqwest::Url::parse(&openai_base_url)
            .map_err(|_| ConfigError::InvalidValue("OPENAI_BASE_URL".into()))?;

        let default_model = load_env_optional("PDF_RAG_DEFAULT_MODEL")
            .unwrap_or_else(|| AVAILABLE_MODELS[0].to_string());
        if !AVAILABLE_MODELS.contains(&default_model.as_str()) {
            return Err(ConfigError::InvalidValue("PDF_RAG_DEFAULT_MODEL".into()));
        }

        let poll_interval_ms = load_env_optional("PDF_RAG_POLL_INTERVAL_MS")
            .map(|value| match value.parse::<u64>() {
                Ok(ms) if ms > 0 => Ok(ms),
                _ => Err(ConfigError::InvalidValue("PDF_RAG_POLL_INTERVAL_MS".into())),
            })
            .transpose()?
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        Ok(Self {
            openai_api_key: load_env("OPENAI_API_KEY")?,
            openai_base_url,
            data_dir: load_env_optional("PDF_RAG_DATA_DIR")
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            state_path: load_env_optional("PDF_RAG_STATE_PATH")
                .unwrap_or_else(|| DEFAULT_STATE_PATH.to_string())
                .into(),
            vector_store_name: load_env_optional("PDF_RAG_VECTOR_STORE_NAME")
                .unwrap_or_else(|| DEFAULT_VECTOR_STORE_NAME.to_string()),
            default_model,
            poll_interval: Duration::from_millis(poll_interval_ms),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const KEYS: [&str; 8] = [
        "OPENAI_API_KEY",
        "OPENAI_BASE_URL",
        "PDF_RAG_DATA_DIR",
        "PDF_RAG_STATE_PATH",
        "PDF_RAG_VECTOR_STORE_NAME",
        "PDF_RAG_DEFAULT_MODEL",
        "PDF_RAG_POLL_INTERVAL_MS",
        "SERVER_PORT",
    ];

    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // SAFETY: access to the process environment is serialized through ENV_LOCK.
        unsafe {
            for key in KEYS {
                env::remove_var(key);
            }
            for (key, value) in vars {
                env::set_var(key, value);
            }
        }
        f()
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let error = with_env(&[], Config::from_env).expect_err("missing key");
        assert!(matches!(error, ConfigError::MissingVariable(key) if key == "OPENAI_API_KEY"));

        let error = with_env(&[("OPENAI_API_KEY", "   ")], Config::from_env).expect_err("blank key");
        assert!(matches!(error, ConfigError::MissingVariable(_)));
    }

    #[test]
    fn defaults_apply_when_optional_values_absent() {
        let config = with_env(&[("OPENAI_API_KEY", "sk-test")], Config::from_env).expect("config");
        assert_eq!(config.openai_api_key, "sk-test");
        assert_eq!(config.openai_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.state_path, PathBuf::from("app_state.json"));
        assert_eq!(config.vector_store_name, "tr_pdf_rag_demo");
        assert_eq!(config.default_model, "gpt-5-mini");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert!(config.server_port.is_none());
    }

    #[test]
    fn rejects_invalid_values() {
        let error = with_env(
            &[("OPENAI_API_KEY", "sk"), ("PDF_RAG_POLL_INTERVAL_MS", "0")],
            Config::from_env,
        )
        .expect_err("zero interval");
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "PDF_RAG_POLL_INTERVAL_MS"));

        let error = with_env(
            &[("OPENAI_API_KEY", "sk"), ("PDF_RAG_DEFAULT_MODEL", "gpt-2")],
            Config::from_env,
        )
        .expect_err("unknown model");
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "PDF_RAG_DEFAULT_MODEL"));

        let error = with_env(
            &[("OPENAI_API_KEY", "sk"), ("OPENAI_BASE_URL", "not a url")],
            Config::from_env,
        )
        .expect_err("bad url");
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "OPENAI_BASE_URL"));
    }
}
