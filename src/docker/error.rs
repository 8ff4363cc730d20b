use std::fmt;
use std::time::Duration;

/// Structured error type for docker CLI invocations.
#[derive(Debug)]
pub enum DockerError {
    /// Command did not finish within its timeout.
    Timeout { command: String, timeout: Duration },

    /// Command ran but returned non-zero exit.
    CommandFailed {
        command: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// Docker binary couldn't be executed (not in PATH, permission denied).
    ExecFailed {
        command: String,
        source: std::io::Error,
    },
}

impl DockerError {
    pub fn timeout(cmd: impl Into<String>, dur: Duration) -> Self {
        DockerError::Timeout {
            command: cmd.into(),
            timeout: dur,
        }
    }

    /// Create a command-failed error from an `std::process::Output`.
    pub fn failed(cmd: impl Into<String>, output: &std::process::Output) -> Self {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        DockerError::CommandFailed {
            command: cmd.into(),
            stderr,
            exit_code: output.status.code(),
        }
    }

    pub fn exec_failed(cmd: impl Into<String>, err: std::io::Error) -> Self {
        DockerError::ExecFailed {
            command: cmd.into(),
            source: err,
        }
    }

    /// True when the docker binary itself could not be launched.
    pub fn is_missing_binary(&self) -> bool {
        matches!(
            self,
            DockerError::ExecFailed { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

impl fmt::Display for DockerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DockerError::Timeout { command, timeout } => {
                write!(
                    f,
                    "Timed out running '{}' (exceeded {} seconds)",
                    command,
                    timeout.as_secs()
                )
            }
            DockerError::CommandFailed {
                command,
                stderr,
                exit_code,
            } => {
                if let Some(code) = exit_code {
                    write!(f, "'{}' failed (exit code {}): {}", command, code, stderr)
                } else {
                    write!(f, "'{}' failed: {}", command, stderr)
                }
            }
            DockerError::ExecFailed { command, source } => {
                write!(f, "Failed to execute '{}': {}", command, source)
            }
        }
    }
}

impl std::error::Error for DockerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DockerError::ExecFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = DockerError::timeout("docker compose up -d", Duration::from_secs(300));
        assert_eq!(
            err.to_string(),
            "Timed out running 'docker compose up -d' (exceeded 300 seconds)"
        );
    }

    #[test]
    fn test_missing_binary_detection() {
        let err = DockerError::exec_failed(
            "docker ps",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.is_missing_binary());

        let err = DockerError::CommandFailed {
            command: "docker ps".into(),
            stderr: "boom".into(),
            exit_code: Some(1),
        };
        assert!(!err.is_missing_binary());
        assert_eq!(err.to_string(), "'docker ps' failed (exit code 1): boom");
    }
}
