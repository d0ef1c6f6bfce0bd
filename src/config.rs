//! Configuration management for WebMemory
//!
//! Loads configuration from environment variables (with optional .env file).

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;

/// Model provider (OpenAI-compatible chat completions) configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API key for the provider
    pub api_key: SecretString,
    /// Model to use
    pub model: String,
    /// Base URL for the chat completions API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries for transient provider failures
    pub max_retries: u32,
}

/// PostgreSQL database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: SecretString,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

/// History retrieval configuration
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Number of records returned per query
    pub top_k: usize,
    /// Maximum cached search results
    pub cache_capacity: u64,
    /// Cache time-to-live in seconds
    pub cache_ttl_secs: u64,
}

/// Agent loop limits
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum model round-trips per question
    pub max_steps: u32,
    /// Maximum tool calls per question
    pub max_tool_calls: u32,
    /// Timeout for a single tool execution in seconds
    pub tool_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level filter
    pub level: String,
    /// Log format (pretty, json)
    pub format: String,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Model provider settings
    pub provider: ProviderConfig,
    /// PostgreSQL database settings
    pub database: DatabaseConfig,
    /// History retrieval settings
    pub retrieval: RetrievalConfig,
    /// Agent loop settings
    pub agent: AgentConfig,
    /// Path to the user profile text file
    pub profile_path: PathBuf,
    /// Logging settings
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Ok(Config {
            provider: ProviderConfig {
                api_key: SecretString::from(std::env::var("OPENAI_API_KEY")?),
                model: std::env::var("WEBMEMORY_MODEL")
                    .unwrap_or_else(|_| "gpt-4o".to_string()),
                base_url: std::env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                timeout_secs: env_parse("PROVIDER_TIMEOUT_SECS", 120),
                max_retries: env_parse("PROVIDER_MAX_RETRIES", 3),
            },
            database: DatabaseConfig {
                url: SecretString::from(std::env::var("DATABASE_URL")?),
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 5),
                connect_timeout_secs: env_parse("DATABASE_CONNECT_TIMEOUT", 30),
            },
            retrieval: RetrievalConfig {
                top_k: env_parse("RETRIEVAL_TOP_K", crate::history::DEFAULT_TOP_K),
                cache_capacity: env_parse("RETRIEVAL_CACHE_CAPACITY", 500),
                cache_ttl_secs: env_parse("RETRIEVAL_CACHE_TTL_SECS", 300),
            },
            agent: AgentConfig {
                max_steps: env_parse("AGENT_MAX_STEPS", 10),
                max_tool_calls: env_parse("AGENT_MAX_TOOL_CALLS", 6),
                tool_timeout_secs: env_parse("AGENT_TOOL_TIMEOUT_SECS", 30),
            },
            profile_path: PathBuf::from(
                std::env::var("USER_PROFILE_PATH")
                    .unwrap_or_else(|_| "data/user_profile.txt".to_string()),
            ),
            log: LogConfig {
                level: std::env::var("RUST_LOG")
                    .unwrap_or_else(|_| "info,webmemory=debug".to_string()),
                format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            },
        })
    }

    /// Create a minimal config for testing or CLI commands that don't need full config
    pub fn minimal() -> Self {
        Config {
            provider: ProviderConfig {
                api_key: SecretString::from(""),
                model: "gpt-4o".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                timeout_secs: 30,
                max_retries: 3,
            },
            database: DatabaseConfig {
                url: SecretString::from(""),
                max_connections: 5,
                connect_timeout_secs: 30,
            },
            retrieval: RetrievalConfig {
                top_k: crate::history::DEFAULT_TOP_K,
                cache_capacity: 500,
                cache_ttl_secs: 300,
            },
            agent: AgentConfig {
                max_steps: 10,
                max_tool_calls: 6,
                tool_timeout_secs: 30,
            },
            profile_path: PathBuf::from("data/user_profile.txt"),
            log: LogConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    /// Validate that all required configuration is present
    pub fn validate(&self) -> Result<()> {
        if self.provider.api_key.expose_secret().is_empty() {
            return Err(Error::Config("OPENAI_API_KEY is required".to_string()));
        }
        if self.database.url.expose_secret().is_empty() {
            return Err(Error::Config("DATABASE_URL is required".to_string()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("RETRIEVAL_TOP_K must be at least 1".to_string()));
        }
        if self.agent.max_steps == 0 {
            return Err(Error::Config("AGENT_MAX_STEPS must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Parse an environment variable with a default fallback
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fails_validation() {
        let config = Config::minimal();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::minimal();
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.agent.max_steps, 10);
        assert_eq!(config.provider.model, "gpt-4o");
    }
}
