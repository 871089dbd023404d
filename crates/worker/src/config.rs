use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::render::RenderCommand;

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

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of the render API, without a trailing slash.
    pub api_url: String,
    /// Sleep between polls while the queues are empty.
    pub poll_interval: Duration,
    /// Scratch space; each job gets its own subdirectory.
    pub work_dir: PathBuf,
    pub render_command: RenderCommand,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                     | Default       |
    /// |-----------------------------|---------------|
    /// | `RENDER_API_URL`            | required      |
    /// | `WORKER_POLL_INTERVAL_SECS` | `5`           |
    /// | `WORKER_WORK_DIR`           | `worker-work` |
    /// | `RENDER_COMMAND`            | required      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = required(&lookup, "RENDER_API_URL")?
            .trim_end_matches('/')
            .to_string();

        let poll_secs: u64 = parsed(&lookup, "WORKER_POLL_INTERVAL_SECS", 5)?;
        if poll_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "WORKER_POLL_INTERVAL_SECS",
                value: poll_secs.to_string(),
                reason: "must be positive".into(),
            });
        }

        let raw_command = required(&lookup, "RENDER_COMMAND")?;
        let render_command = RenderCommand::parse(&raw_command).map_err(|e| ConfigError::Invalid {
            var: "RENDER_COMMAND",
            value: raw_command.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            api_url,
            poll_interval: Duration::from_secs(poll_secs),
            work_dir: PathBuf::from(lookup("WORKER_WORK_DIR").unwrap_or_else(|| "worker-work".into())),
            render_command,
        })
    }
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn parsed<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<WorkerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[
            ("RENDER_API_URL", "http://render.local:8080/"),
            ("RENDER_COMMAND", "blender -b {input} -o {output}"),
        ])
        .unwrap();
        assert_eq!(config.api_url, "http://render.local:8080");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.work_dir, PathBuf::from("worker-work"));
        assert_eq!(config.render_command.program(), "blender");
    }

    #[test]
    fn missing_api_url_is_reported() {
        let err = load(&[("RENDER_COMMAND", "blender")]).unwrap_err();
        assert_matches!(err, ConfigError::Missing("RENDER_API_URL"));
    }

    #[test]
    fn blank_command_is_missing() {
        let err = load(&[("RENDER_API_URL", "http://x"), ("RENDER_COMMAND", "  ")]).unwrap_err();
        assert_matches!(err, ConfigError::Missing("RENDER_COMMAND"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = load(&[
            ("RENDER_API_URL", "http://x"),
            ("RENDER_COMMAND", "blender"),
            ("WORKER_POLL_INTERVAL_SECS", "0"),
        ])
        .unwrap_err();
        assert_matches!(err, ConfigError::Invalid { var: "WORKER_POLL_INTERVAL_SECS", .. });
    }
}
