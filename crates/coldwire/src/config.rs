//! Environment-based configuration.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use coldwire_core::{DispatchConfig, SendWindow, SmtpDefaults};

/// Settings for the drafting client.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// Bearer token for it.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// One-line description of what is being sold, woven into prompts.
    pub product_context: String,
}

/// Everything the server reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the admin API listens on.
    pub bind_addr: SocketAddr,
    /// SQLite database path.
    pub database_path: String,
    /// Shared bearer token protecting the admin API.
    pub admin_token: String,
    /// Process-wide SMTP defaults; accounts may override per-mailbox.
    pub smtp: SmtpDefaults,
    /// Drafting client settings.
    pub llm: LlmConfig,
    /// Dispatch engine tunables.
    pub dispatch: DispatchConfig,
    /// Jobs picked up per processing tick.
    pub job_batch: u32,
    /// Time between dispatch ticks.
    pub dispatch_interval: Duration,
    /// Time between job-processing ticks.
    pub jobs_interval: Duration,
}

impl Config {
    /// Read configuration from the environment.
    ///
    /// Only `COLDWIRE_ADMIN_TOKEN` is required; everything else has a
    /// default sensible for a single-operator deployment.
    ///
    /// # Errors
    ///
    /// Returns an error when the token is missing or a variable fails to
    /// parse.
    pub fn from_env() -> anyhow::Result<Self> {
        let admin_token = std::env::var("COLDWIRE_ADMIN_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .context("COLDWIRE_ADMIN_TOKEN is required")?;

        let bind_addr: SocketAddr = env_or("COLDWIRE_BIND", "127.0.0.1:8080")
            .parse()
            .context("COLDWIRE_BIND is not a valid socket address")?;

        let smtp = SmtpDefaults {
            host: env_opt("SMTP_HOST"),
            port: parse_opt("SMTP_PORT")?,
            username: env_opt("SMTP_USER"),
            password: env_opt("SMTP_PASS"),
        };
        if smtp.host.is_none() || smtp.username.is_none() || smtp.password.is_none() {
            tracing::warn!(
                "SMTP_* defaults are incomplete; accounts without full overrides will fail to send"
            );
        }

        let api_key = env_opt("COLDWIRE_LLM_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("COLDWIRE_LLM_API_KEY is unset; draft generation will fail");
        }
        let llm = LlmConfig {
            base_url: env_or("COLDWIRE_LLM_BASE_URL", "https://api.openai.com/v1"),
            api_key,
            model: env_or("COLDWIRE_LLM_MODEL", "gpt-4.1-mini"),
            product_context: env_or("COLDWIRE_PRODUCT_PITCH", "our product"),
        };

        let window = match (
            parse_opt::<u32>("COLDWIRE_SEND_WINDOW_START")?,
            parse_opt::<u32>("COLDWIRE_SEND_WINDOW_END")?,
        ) {
            (Some(start_hour), Some(end_hour)) => Some(SendWindow {
                start_hour,
                end_hour,
            }),
            (None, None) => None,
            _ => anyhow::bail!(
                "COLDWIRE_SEND_WINDOW_START and COLDWIRE_SEND_WINDOW_END must be set together"
            ),
        };

        let dispatch = DispatchConfig {
            per_run_cap: parse_opt("COLDWIRE_PER_RUN_CAP")?.unwrap_or(10),
            max_batch: parse_opt("COLDWIRE_MAX_BATCH")?.unwrap_or(50),
            window,
        };

        Ok(Self {
            bind_addr,
            database_path: env_or("COLDWIRE_DB", "coldwire.db"),
            admin_token,
            smtp,
            llm,
            dispatch,
            job_batch: parse_opt("COLDWIRE_JOB_BATCH")?.unwrap_or(20),
            dispatch_interval: Duration::from_secs(
                parse_opt("COLDWIRE_DISPATCH_INTERVAL_SECS")?.unwrap_or(300),
            ),
            jobs_interval: Duration::from_secs(
                parse_opt("COLDWIRE_JOBS_INTERVAL_SECS")?.unwrap_or(60),
            ),
        })
    }
}

/// Non-empty environment variable, if present.
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Environment variable or a default.
fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

/// Parsed environment variable, if present.
fn parse_opt<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_opt(name)
        .map(|v| v.parse().with_context(|| format!("{name} is not valid")))
        .transpose()
}
