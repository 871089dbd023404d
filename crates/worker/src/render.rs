//! External render command.
//!
//! `RENDER_COMMAND` is a program followed by arguments, split on
//! whitespace. Arguments may contain the placeholders `{input}`,
//! `{output}`, `{format}`, `{width}` and `{height}`, which are substituted
//! per job. No shell is involved.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use cloudrender_core::render::Resolution;

const PLACEHOLDERS: [&str; 5] = ["input", "output", "format", "width", "height"];

/// Lines of stderr kept in a failure report.
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("render command is empty")]
    EmptyCommand,

    #[error("unknown placeholder '{{{0}}}'")]
    UnknownPlaceholder(String),

    #[error("failed to start render command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("render command exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("render command succeeded but wrote no output at {0}")]
    MissingOutput(PathBuf),
}

/// A parsed render command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCommand {
    program: String,
    args: Vec<String>,
}

/// Per-job values substituted into the command template.
#[derive(Debug, Clone)]
pub struct RenderJob<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub format: &'a str,
    pub resolution: Resolution,
}

impl RenderCommand {
    pub fn parse(raw: &str) -> Result<Self, RenderError> {
        let mut parts = raw.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(RenderError::EmptyCommand)?;
        let args: Vec<String> = parts.collect();

        for arg in std::iter::once(&program).chain(&args) {
            check_placeholders(arg)?;
        }

        Ok(Self { program, args })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with placeholders filled in for `job`.
    pub fn args_for(&self, job: &RenderJob<'_>) -> Vec<String> {
        self.args.iter().map(|arg| substitute(arg, job)).collect()
    }

    /// Run the command for `job` and wait for it.
    ///
    /// Succeeds only if the process exits zero and `job.output` exists.
    pub async fn run(&self, job: &RenderJob<'_>) -> Result<(), RenderError> {
        let args = self.args_for(job);
        tracing::debug!(program = %self.program, ?args, "Starting render command");

        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(RenderError::Spawn)?;

        if !output.status.success() {
            return Err(RenderError::Failed {
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        if !tokio::fs::try_exists(job.output).await.unwrap_or(false) {
            return Err(RenderError::MissingOutput(job.output.to_path_buf()));
        }

        Ok(())
    }
}

fn substitute(arg: &str, job: &RenderJob<'_>) -> String {
    arg.replace("{input}", &job.input.to_string_lossy())
        .replace("{output}", &job.output.to_string_lossy())
        .replace("{format}", job.format)
        .replace("{width}", &job.resolution.width.to_string())
        .replace("{height}", &job.resolution.height.to_string())
}

fn check_placeholders(arg: &str) -> Result<(), RenderError> {
    let mut rest = arg;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else { break };
        let name = &after[..end];
        if !PLACEHOLDERS.contains(&name) {
            return Err(RenderError::UnknownPlaceholder(name.to_string()));
        }
        rest = &after[end + 1..];
    }
    Ok(())
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
