// ABOUTME: Exec handler for running shell commands and scripts
// ABOUTME: Captures stdout, stderr, and the exit code back into task parameters

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::{HandlerError, Result, TaskHandler};
use crate::model::Task;

pub struct ExecHandler;

/// Parameters for command execution.
///
/// Two modes: `command` + `args` for a single program, or `script` run
/// through the configured shell. Mutually exclusive; `command` wins.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecParameters {
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    script: Option<String>,
    #[serde(default = "default_shell")]
    shell: String,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    working_dir: Option<PathBuf>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

#[async_trait]
impl TaskHandler for ExecHandler {
    async fn handle(&self, workflow_id: &str, task_name: &str, task: &mut Task) -> Result<()> {
        let params: ExecParameters = serde_json::from_value(task.parameters.clone())
            .map_err(|e| HandlerError::InvalidParameters(e.to_string()))?;

        let mut command = if let Some(program) = &params.command {
            let mut c = Command::new(program);
            c.args(&params.args);
            c
        } else if let Some(script) = &params.script {
            let mut c = Command::new(&params.shell);
            c.arg("-c").arg(script);
            c
        } else {
            return Err(HandlerError::InvalidParameters(
                "exec requires either command or script".to_string(),
            ));
        };

        command.envs(&params.env);
        if let Some(dir) = &params.working_dir {
            command.current_dir(dir);
        }

        debug!(workflow = workflow_id, task = task_name, "running command");

        let output = match params.timeout_seconds {
            Some(secs) => timeout(Duration::from_secs(secs), command.output())
                .await
                .map_err(|_| {
                    HandlerError::Reported(format!("command timed out after {}s", secs))
                })??,
            None => command.output().await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        if let Some(map) = task.parameters.as_object_mut() {
            map.insert("stdout".to_string(), json!(stdout));
            map.insert("stderr".to_string(), json!(stderr));
            map.insert("exitCode".to_string(), json!(exit_code));
        } else {
            task.parameters = json!({
                "stdout": stdout,
                "stderr": stderr,
                "exitCode": exit_code,
            });
        }

        if !output.status.success() {
            let detail = if stderr.trim().is_empty() {
                stdout
            } else {
                stderr
            };
            return Err(HandlerError::Reported(format!(
                "command exited with code {}: {}",
                exit_code,
                detail.trim()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "exec"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_command_captures_output() {
        let mut task = Task {
            parameters: json!({"command": "echo", "args": ["hello"]}),
            ..Default::default()
        };

        ExecHandler.handle("wf", "t", &mut task).await.unwrap();

        let stdout = task.parameters.get("stdout").unwrap().as_str().unwrap();
        assert!(stdout.contains("hello"));
        assert_eq!(task.parameters.get("exitCode"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn test_script_mode() {
        let mut task = Task {
            parameters: json!({"script": "echo a; echo b"}),
            ..Default::default()
        };

        ExecHandler.handle("wf", "t", &mut task).await.unwrap();

        let stdout = task.parameters.get("stdout").unwrap().as_str().unwrap();
        assert!(stdout.contains('a'));
        assert!(stdout.contains('b'));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported() {
        let mut task = Task {
            parameters: json!({"command": "false"}),
            ..Default::default()
        };

        let err = ExecHandler.handle("wf", "t", &mut task).await.unwrap_err();
        assert!(matches!(err, HandlerError::Reported(_)));
        assert_ne!(task.parameters.get("exitCode"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn test_missing_command_and_script() {
        let mut task = Task {
            parameters: json!({}),
            ..Default::default()
        };

        let err = ExecHandler.handle("wf", "t", &mut task).await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidParameters(_)));
    }
}
