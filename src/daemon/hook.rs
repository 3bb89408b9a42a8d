//! The `on_change` hook: template substitution, environment, bounded run.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Hard ceiling on a hook child's lifetime.
const HOOK_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors from running a change hook. Always logged, never fatal.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("spawn hook: {source}")]
    Spawn { source: std::io::Error },

    #[error("hook exited with {status}")]
    Failed { status: std::process::ExitStatus },

    #[error("hook timed out after {:?}", HOOK_TIMEOUT)]
    Timeout,

    #[error("wait for hook: {source}")]
    Wait { source: std::io::Error },
}

/// Run the `on_change` command for a target that was just written.
///
/// `{target}`, `{output}`, and `{timestamp}` are substituted textually; the
/// child runs under `/bin/sh -c` with `CONFB_TARGET`, `CONFB_OUTPUT`, and
/// `CONFB_TIMESTAMP` added to the inherited environment. Child output is
/// forwarded to the daemon's stderr. On timeout the child is killed.
pub async fn run_on_change(target: &str, template: &str, output: &Path) -> Result<(), HookError> {
    let timestamp = chrono::Local::now().to_rfc3339();
    let output_str = output.display().to_string();

    let command = template
        .replace("{target}", target)
        .replace("{output}", &output_str)
        .replace("{timestamp}", &timestamp);

    tracing::info!("[{target}] running on_change: {command}");

    let child = Command::new("/bin/sh")
        .arg("-c")
        .arg(&command)
        .env("CONFB_TARGET", target)
        .env("CONFB_OUTPUT", &output_str)
        .env("CONFB_TIMESTAMP", &timestamp)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| HookError::Spawn { source })?;

    let result = tokio::time::timeout(HOOK_TIMEOUT, child.wait_with_output()).await;

    match result {
        // Timeout: dropping the in-flight wait kills the child.
        Err(_) => Err(HookError::Timeout),
        Ok(Err(source)) => Err(HookError::Wait { source }),
        Ok(Ok(out)) => {
            forward_to_stderr(&out.stdout).await;
            forward_to_stderr(&out.stderr).await;
            if out.status.success() {
                Ok(())
            } else {
                Err(HookError::Failed { status: out.status })
            }
        }
    }
}

async fn forward_to_stderr(bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    let mut stderr = tokio::io::stderr();
    let _ = stderr.write_all(bytes).await;
    let _ = stderr.flush().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn substitutes_variables_and_sets_environment() {
        let td = TempDir::new().unwrap();
        let marker = td.path().join("marker.txt");
        let output = td.path().join("out.conf");

        let template = format!(
            "echo \"{{target}} {{output}} $CONFB_TARGET $CONFB_OUTPUT\" > {}",
            marker.display()
        );
        run_on_change("web", &template, &output).await.unwrap();

        let content = fs::read_to_string(&marker).unwrap();
        let out_str = output.display().to_string();
        assert_eq!(content.trim(), format!("web {out_str} web {out_str}"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let td = TempDir::new().unwrap();
        let output = td.path().join("out.conf");

        let err = run_on_change("web", "exit 3", &output).await.unwrap_err();
        assert!(matches!(err, HookError::Failed { .. }), "{err}");
    }

    #[tokio::test]
    async fn timestamp_substitution_is_textual() {
        let td = TempDir::new().unwrap();
        let marker = td.path().join("ts.txt");
        let output = td.path().join("out.conf");

        let template = format!("echo '{{timestamp}}' > {}", marker.display());
        run_on_change("web", &template, &output).await.unwrap();

        let content = fs::read_to_string(&marker).unwrap();
        // RFC3339 local time, e.g. 2026-08-02T12:34:56.789+02:00
        assert!(content.trim().contains('T'), "{content}");
    }
}
