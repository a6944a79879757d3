use std::path::PathBuf;
use std::time::Duration;

use redis::{ConnectionAddr, ConnectionInfo, IntoConnectionInfo, RedisConnectionInfo};

/// Server configuration loaded from environment variables.
pub struct Config {
    pub port: u16,
    pub sentry_dsn: Option<String>,
    pub environment: String,
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,
    /// Directory for the JSON file store, used when `MONGODB_URI` is unset.
    pub data_dir: PathBuf,
    pub redis: Option<RedisConfig>,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub groq_base_url: String,
    pub llm_timeout: Duration,
    /// `None` unless `JWT_SECRET` is set.
    pub jwt_secret: Option<String>,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
    allow_dev_secret: bool,
}

/// Connection settings for the Redis cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// A full `redis://` URL takes precedence over the discrete fields.
    pub url: Option<String>,
}

impl RedisConfig {
    /// Connection settings for the Redis client. Credentials are passed as
    /// discrete fields so reserved URL characters in them need no escaping.
    pub fn connection_info(&self) -> redis::RedisResult<ConnectionInfo> {
        if let Some(url) = &self.url {
            return url.as_str().into_connection_info();
        }
        Ok(ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                username: self.username.clone(),
                password: self.password.clone(),
                ..Default::default()
            },
        })
    }
}

pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_JWT_SECRET: &str = "promptly-dev-secret";

/// Raw environment values, one field per variable.
#[derive(Default)]
pub struct RawConfig<'a> {
    pub port: Option<&'a str>,
    pub sentry_dsn: Option<&'a str>,
    pub environment: Option<&'a str>,
    pub mongodb_uri: Option<&'a str>,
    pub mongodb_database: Option<&'a str>,
    pub data_dir: Option<&'a str>,
    pub redis_url: Option<&'a str>,
    pub redis_host: Option<&'a str>,
    pub redis_port: Option<&'a str>,
    pub redis_username: Option<&'a str>,
    pub redis_password: Option<&'a str>,
    pub groq_api_key: Option<&'a str>,
    pub groq_model: Option<&'a str>,
    pub groq_base_url: Option<&'a str>,
    pub llm_timeout_secs: Option<&'a str>,
    pub jwt_secret: Option<&'a str>,
    pub cors_origins: Option<&'a str>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

impl Config {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        let port = var("PORT");
        let sentry_dsn = var("SENTRY_DSN");
        let environment = var("ENVIRONMENT");
        let mongodb_uri = var("MONGODB_URI");
        let mongodb_database = var("MONGODB_DATABASE");
        let data_dir = var("DATA_DIR");
        let redis_url = var("REDIS_URL");
        let redis_host = var("REDIS_HOST");
        let redis_port = var("REDIS_PORT");
        let redis_username = var("REDIS_USERNAME");
        let redis_password = var("REDIS_PASSWORD");
        let groq_api_key = var("GROQ_API_KEY");
        let groq_model = var("GROQ_MODEL");
        let groq_base_url = var("GROQ_BASE_URL");
        let llm_timeout_secs = var("LLM_TIMEOUT_SECS");
        let jwt_secret = var("JWT_SECRET");
        let cors_origins = var("CORS_ORIGINS");

        Self::from_raw_values(RawConfig {
            port: port.as_deref(),
            sentry_dsn: sentry_dsn.as_deref(),
            environment: environment.as_deref(),
            mongodb_uri: mongodb_uri.as_deref(),
            mongodb_database: mongodb_database.as_deref(),
            data_dir: data_dir.as_deref(),
            redis_url: redis_url.as_deref(),
            redis_host: redis_host.as_deref(),
            redis_port: redis_port.as_deref(),
            redis_username: redis_username.as_deref(),
            redis_password: redis_password.as_deref(),
            groq_api_key: groq_api_key.as_deref(),
            groq_model: groq_model.as_deref(),
            groq_base_url: groq_base_url.as_deref(),
            llm_timeout_secs: llm_timeout_secs.as_deref(),
            jwt_secret: jwt_secret.as_deref(),
            cors_origins: cors_origins.as_deref(),
        })
    }

    /// Build a Config from raw string values (as they would come from env vars).
    /// Used directly in tests to avoid mutating process-global environment.
    pub fn from_raw_values(raw: RawConfig<'_>) -> Self {
        let port = raw.port.and_then(|v| v.parse().ok()).unwrap_or(5000);

        let environment_set = non_empty(raw.environment);
        let allow_dev_secret = environment_set.as_deref() == Some("local");
        let environment = environment_set.unwrap_or_else(|| "local".to_string());

        let data_dir = non_empty(raw.data_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".promptly")
            });

        // Redis is opt-in: any of URL or HOST turns it on.
        let redis_url = non_empty(raw.redis_url);
        let redis_host = non_empty(raw.redis_host);
        let redis = if redis_url.is_some() || redis_host.is_some() {
            Some(RedisConfig {
                host: redis_host.unwrap_or_else(|| "127.0.0.1".to_string()),
                port: raw.redis_port.and_then(|v| v.parse().ok()).unwrap_or(6379),
                username: non_empty(raw.redis_username),
                password: non_empty(raw.redis_password),
                url: redis_url,
            })
        } else {
            None
        };

        let llm_timeout = raw
            .llm_timeout_secs
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(60));

        let cors_origins = raw
            .cors_origins
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Config {
            port,
            sentry_dsn: non_empty(raw.sentry_dsn),
            environment,
            mongodb_uri: non_empty(raw.mongodb_uri),
            mongodb_database: non_empty(raw.mongodb_database)
                .unwrap_or_else(|| "promptly".to_string()),
            data_dir,
            redis,
            groq_api_key: non_empty(raw.groq_api_key),
            groq_model: non_empty(raw.groq_model)
                .unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
            groq_base_url: non_empty(raw.groq_base_url)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string()),
            llm_timeout,
            jwt_secret: non_empty(raw.jwt_secret),
            cors_origins,
            allow_dev_secret,
        }
    }

    /// The HS256 secret for bearer tokens. Without `JWT_SECRET` only an
    /// explicit `ENVIRONMENT=local` falls back to the development secret.
    pub fn signing_secret(&self) -> anyhow::Result<String> {
        if let Some(secret) = &self.jwt_secret {
            return Ok(secret.clone());
        }
        if self.allow_dev_secret {
            tracing::warn!("JWT_SECRET not set, using the development secret");
            return Ok(DEFAULT_JWT_SECRET.to_string());
        }
        anyhow::bail!("JWT_SECRET must be set (or ENVIRONMENT=local to use the development secret)")
    }
}
