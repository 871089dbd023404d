use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use cloudrender_queue::QueueKeys;

use crate::auth::jwt::JwtConfig;

/// A configuration variable is missing or malformed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Requeue sweep settings.
#[derive(Debug, Clone)]
pub struct RequeueConfig {
    /// Time between sweeps; `None` disables the sweep.
    pub interval: Option<Duration>,
    /// A queued job whose envelope was pushed longer ago than this is republished.
    pub stale_after: Duration,
    /// Maximum jobs republished per sweep.
    pub batch_size: i64,
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// How long background tasks get to stop after the listener closes.
    pub shutdown_timeout_secs: u64,
    pub database_url: String,
    pub redis_url: String,
    pub queue_keys: QueueKeys,
    /// Bounded wait applied to each lane when a worker polls.
    pub dispatch_pop_timeout: Duration,
    /// Externally reachable base URL used for retrieval and result links.
    pub public_base_url: String,
    pub files_input_path: PathBuf,
    pub files_output_path: PathBuf,
    pub max_upload_bytes: usize,
    /// Mount point for the client routes; empty mounts them at the root.
    pub api_prefix: String,
    pub jwt: JwtConfig,
    pub requeue: RequeueConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                    | Default                  |
    /// |----------------------------|--------------------------|
    /// | `HOST`                     | `0.0.0.0`                |
    /// | `PORT`                     | `8080`                   |
    /// | `CORS_ORIGINS`             | `http://localhost:3000`  |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                     |
    /// | `SHUTDOWN_TIMEOUT_SECS`    | `10`                     |
    /// | `DATABASE_URL`             | required                 |
    /// | `REDIS_URL`                | `redis://127.0.0.1:6379` |
    /// | `QUEUE_NAME`               | `render-list`            |
    /// | `PRIORITY_QUEUE_NAME`      | `render-list-priority`   |
    /// | `DISPATCH_POP_TIMEOUT_MS`  | `1000`                   |
    /// | `PUBLIC_BASE_URL`          | `http://localhost:8080`  |
    /// | `FILES_INPUT_PATH`         | `storage/input`          |
    /// | `FILES_OUTPUT_PATH`        | `storage/output`         |
    /// | `MAX_UPLOAD_BYTES`         | `33554432`               |
    /// | `API_PREFIX`               | empty                    |
    /// | `JWT_SECRET`               | required                 |
    /// | `REQUEUE_INTERVAL_SECS`    | `60` (`0` disables)      |
    /// | `REQUEUE_STALE_AFTER_SECS` | `900`                    |
    /// | `REQUEUE_BATCH_SIZE`       | `100`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let cors_origins = env
            .string("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let jwt_secret = env.required("JWT_SECRET")?;

        let requeue_interval_secs: u64 = env.parsed("REQUEUE_INTERVAL_SECS", 60)?;
        let requeue = RequeueConfig {
            interval: (requeue_interval_secs > 0).then(|| Duration::from_secs(requeue_interval_secs)),
            stale_after: Duration::from_secs(env.parsed("REQUEUE_STALE_AFTER_SECS", 900)?),
            batch_size: env.parsed("REQUEUE_BATCH_SIZE", 100)?,
        };
        if requeue.batch_size <= 0 {
            return Err(ConfigError::Invalid {
                var: "REQUEUE_BATCH_SIZE",
                value: requeue.batch_size.to_string(),
                reason: "must be positive".into(),
            });
        }

        Ok(Self {
            host: env.string("HOST", "0.0.0.0"),
            port: env.parsed("PORT", 8080)?,
            cors_origins,
            request_timeout_secs: env.parsed("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: env.parsed("SHUTDOWN_TIMEOUT_SECS", 10)?,
            database_url: env.required("DATABASE_URL")?,
            redis_url: env.string("REDIS_URL", "redis://127.0.0.1:6379"),
            queue_keys: QueueKeys {
                priority: env.string("PRIORITY_QUEUE_NAME", "render-list-priority"),
                normal: env.string("QUEUE_NAME", "render-list"),
            },
            dispatch_pop_timeout: Duration::from_millis(env.parsed("DISPATCH_POP_TIMEOUT_MS", 1000)?),
            public_base_url: env
                .string("PUBLIC_BASE_URL", "http://localhost:8080")
                .trim_end_matches('/')
                .to_string(),
            files_input_path: PathBuf::from(env.string("FILES_INPUT_PATH", "storage/input")),
            files_output_path: PathBuf::from(env.string("FILES_OUTPUT_PATH", "storage/output")),
            max_upload_bytes: env.parsed("MAX_UPLOAD_BYTES", 32 << 20)?,
            api_prefix: normalize_prefix(&env.string("API_PREFIX", "")),
            jwt: JwtConfig { secret: jwt_secret },
            requeue,
        })
    }
}

/// `"api/"` -> `"/api"`, `"/"` -> `""`.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, var: &str, default: &str) -> String {
        (self.0)(var).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        (self.0)(var)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing(var))
    }

    fn parsed<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match (self.0)(var) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            }),
        }
    }
}
