//! Toggle action backed by an external command

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tenure_api::ToggleOutcome;
use tenure_host_api::{HostError, HostResult};
use tokio::process::Command;
use tracing::{debug, warn};

/// Interpret the first non-empty line of the command's stdout.
///
/// Recognized words: `enabled`, `already_enabled`, `not_ready` (or
/// `no_menubar`), and `error:<message>`. Anything else is `None`.
pub fn parse_toggle_output(stdout: &str) -> Option<ToggleOutcome> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;

    if let Some(message) = line.strip_prefix("error:") {
        let message = message.trim();
        return Some(ToggleOutcome::failed(if message.is_empty() {
            "unspecified error"
        } else {
            message
        }));
    }

    match line.to_ascii_lowercase().as_str() {
        "enabled" => Some(ToggleOutcome::Enabled),
        "already_enabled" => Some(ToggleOutcome::AlreadyEnabled),
        "not_ready" | "no_menubar" => Some(ToggleOutcome::NotReady),
        _ => None,
    }
}

/// Runs the configured toggle command
#[derive(Debug, Clone)]
pub struct CommandToggle {
    program: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    timeout: Duration,
}

impl CommandToggle {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        env: HashMap<String, String>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            env,
            timeout,
        }
    }

    /// Run the command once and classify its result
    pub async fn run(&self) -> ToggleOutcome {
        match self.execute().await {
            Ok(outcome) => outcome,
            Err(HostError::Timeout(after)) => {
                warn!(program = %self.program, timeout_secs = after.as_secs(), "Toggle command timed out");
                ToggleOutcome::failed("timed out")
            }
            Err(e) => {
                warn!(program = %self.program, error = %e, "Toggle command could not run");
                ToggleOutcome::failed(e.to_string())
            }
        }
    }

    async fn execute(&self) -> HostResult<ToggleOutcome> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            HostError::SpawnFailed(format!("Failed to spawn {}: {}", self.program, e))
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| HostError::Timeout(self.timeout))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(
            program = %self.program,
            status = ?output.status,
            stdout = %stdout.trim(),
            stderr = %stderr.trim(),
            "Toggle command finished"
        );

        if !output.status.success() {
            let detail = stderr.trim();
            let reason = if detail.is_empty() {
                format!("toggle command exited with {}", output.status)
            } else {
                format!("toggle command exited with {}: {}", output.status, detail)
            };
            return Ok(ToggleOutcome::Failed { reason });
        }

        Ok(parse_toggle_output(&stdout).unwrap_or_else(|| {
            ToggleOutcome::failed(format!("unrecognized toggle output: {:?}", stdout.trim()))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> CommandToggle {
        CommandToggle::new(
            "sh",
            vec!["-c".into(), script.into()],
            HashMap::new(),
            timeout,
        )
    }

    #[test]
    fn test_parse_toggle_output() {
        assert_eq!(parse_toggle_output("enabled\n"), Some(ToggleOutcome::Enabled));
        assert_eq!(
            parse_toggle_output("\n  already_enabled  \n"),
            Some(ToggleOutcome::AlreadyEnabled)
        );
        assert_eq!(parse_toggle_output("no_menubar"), Some(ToggleOutcome::NotReady));
        assert_eq!(parse_toggle_output("not_ready"), Some(ToggleOutcome::NotReady));
        assert_eq!(
            parse_toggle_output("error: window not found"),
            Some(ToggleOutcome::failed("window not found"))
        );
        assert_eq!(parse_toggle_output("banana"), None);
        assert_eq!(parse_toggle_output(""), None);
    }

    #[tokio::test]
    async fn test_command_success() {
        let toggle = sh("echo already_enabled", Duration::from_secs(5));
        assert_eq!(toggle.run().await, ToggleOutcome::AlreadyEnabled);
    }

    #[tokio::test]
    async fn test_command_env() {
        let mut env = HashMap::new();
        env.insert("TOGGLE_RESULT".to_string(), "enabled".to_string());
        let toggle = CommandToggle::new(
            "sh",
            vec!["-c".into(), "echo $TOGGLE_RESULT".into()],
            env,
            Duration::from_secs(5),
        );
        assert_eq!(toggle.run().await, ToggleOutcome::Enabled);
    }

    #[tokio::test]
    async fn test_command_nonzero_exit_fails() {
        let toggle = sh("echo enabled; exit 3", Duration::from_secs(5));
        assert!(matches!(toggle.run().await, ToggleOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_command_unknown_output_fails() {
        let toggle = sh("echo maybe", Duration::from_secs(5));
        assert!(matches!(toggle.run().await, ToggleOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_command_timeout() {
        let toggle = sh("sleep 5", Duration::from_millis(100));
        assert_eq!(toggle.run().await, ToggleOutcome::failed("timed out"));
    }

    #[tokio::test]
    async fn test_missing_program_fails() {
        let toggle = CommandToggle::new(
            "/nonexistent/toggle-private-mode",
            vec![],
            HashMap::new(),
            Duration::from_secs(1),
        );
        assert!(matches!(toggle.run().await, ToggleOutcome::Failed { .. }));
    }
}
