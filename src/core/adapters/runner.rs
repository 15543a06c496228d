use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, TriageError};

/// Run an external diagnostic tool in `cwd` and capture its stdout, bounded
/// by `max_output_bytes`. A non-zero exit status is not a failure here; these
/// tools exit non-zero whenever they find diagnostics. Exceeding the output
/// cap kills the child and fails the producer instead of hanging or
/// buffering without limit.
pub async fn run_tool(command: &[String], cwd: &Path, max_output_bytes: usize) -> Result<String> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| TriageError::Producer("empty tool command".to_string()))?;

    debug!("Running diagnostic tool: {} {}", program, args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| TriageError::Producer(format!("failed to launch '{}': {}", program, e)))?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| TriageError::Producer(format!("no stdout handle for '{}'", program)))?;

    // Read one byte past the cap so overflow is detectable
    let mut buf = Vec::new();
    let mut limited = (&mut stdout).take(max_output_bytes as u64 + 1);
    limited
        .read_to_end(&mut buf)
        .await
        .map_err(|e| TriageError::Producer(format!("reading '{}' output: {}", program, e)))?;

    if buf.len() > max_output_bytes {
        let _ = child.kill().await;
        return Err(TriageError::Producer(format!(
            "'{}' output exceeded the {} byte cap",
            program, max_output_bytes
        )));
    }

    let status = child
        .wait()
        .await
        .map_err(|e| TriageError::Producer(format!("waiting for '{}': {}", program, e)))?;

    debug!("Tool '{}' exited with {}", program, status);

    Ok(String::from_utf8_lossy(&buf).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_tool_captures_stdout() {
        let cmd = vec!["echo".to_string(), "hello".to_string()];
        let out = run_tool(&cmd, Path::new("."), 1024).await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_tool_nonzero_exit_is_not_failure() {
        let cmd = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo diagnostics; exit 2".to_string(),
        ];
        let out = run_tool(&cmd, Path::new("."), 1024).await.unwrap();
        assert_eq!(out.trim(), "diagnostics");
    }

    #[tokio::test]
    async fn test_run_tool_missing_binary_is_failure() {
        let cmd = vec!["definitely-not-a-real-binary-xyz".to_string()];
        let err = run_tool(&cmd, Path::new("."), 1024).await.unwrap_err();
        assert!(matches!(err, TriageError::Producer(_)));
    }

    #[tokio::test]
    async fn test_run_tool_output_cap() {
        let cmd = vec![
            "sh".to_string(),
            "-c".to_string(),
            "yes x | head -c 4096".to_string(),
        ];
        let err = run_tool(&cmd, Path::new("."), 128).await.unwrap_err();
        match err {
            TriageError::Producer(msg) => assert!(msg.contains("byte cap")),
            other => panic!("expected Producer, got {other:?}"),
        }
    }
}
