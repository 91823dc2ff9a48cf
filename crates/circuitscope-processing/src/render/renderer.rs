//! ExternalRenderer - runs the rendering executable under a wall-clock timeout.

use circuitscope_core::config::RendererConfig;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// How a render invocation can fail.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Render executable not found: {0}")]
    ExecutableNotFound(PathBuf),

    #[error("Render timed out after {0:?}")]
    Timeout(Duration),

    #[error("Render exited with {}: {stderr}", describe_exit(.code))]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("Failed to start render process: {0}")]
    Spawn(#[source] io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {}", c),
        None => "a signal".to_string(),
    }
}

/// Thin boundary around one external executable. Knows nothing about what the
/// arguments mean; see [`super::kicad`] for the command builders.
#[derive(Debug, Clone)]
pub struct ExternalRenderer {
    executable: PathBuf,
    timeout: Duration,
}

impl ExternalRenderer {
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            timeout,
        }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(config.executable.clone(), config.timeout)
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the executable with `args` and classify the outcome.
    ///
    /// The child is killed if the timeout elapses. stdout is discarded; stderr is
    /// captured for the error message.
    #[tracing::instrument(skip(self, args), fields(executable = %self.executable.display()))]
    pub async fn run<I, S>(&self, args: I) -> Result<(), RenderError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let start = Instant::now();

        let child = Command::new(&self.executable)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => RenderError::ExecutableNotFound(self.executable.clone()),
                _ => RenderError::Spawn(e),
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(RenderError::Spawn)?,
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Render process timed out and was killed"
                );
                return Err(RenderError::Timeout(self.timeout));
            }
        };

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(
                code = ?output.status.code(),
                duration_ms = duration_ms,
                "Render process failed"
            );
            return Err(RenderError::NonZeroExit {
                code: output.status.code(),
                stderr,
            });
        }

        tracing::debug!(duration_ms = duration_ms, "Render process finished");
        Ok(())
    }
}
