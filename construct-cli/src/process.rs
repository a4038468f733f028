//! Subprocess execution of the generator command with a timeout.

use crate::error::CliError;
use crate::types::{CommandSpec, RunResult};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

/// Runs the generator once for `prompt` and captures its output.
///
/// The prompt goes into the argument list when its arguments use the placeholder,
/// otherwise it is written to stdin (concurrently with output capture, so large
/// prompts cannot deadlock against a chatty child). The child is killed when
/// the timeout expires.
///
/// # Errors
///
/// Returns `CliError::Io` if the process cannot be spawned,
/// `CliError::Timeout` if it runs past `spec.timeout`, and
/// `CliError::NonZeroExit` if it exits unsuccessfully.
pub async fn run_command(spec: &CommandSpec, prompt: &str) -> Result<RunResult, CliError> {
    let args = crate::cmd::build_args(prompt, spec);
    let prompt_on_stdin = !spec.prompt_in_args();
    let start_time = Instant::now();

    let mut cmd = Command::new(&spec.program);
    cmd.args(args)
        .stdin(if prompt_on_stdin {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }

    for (k, v) in &spec.env {
        cmd.env(k, v);
    }

    let mut child = cmd.spawn()?;

    let stdin_task = child.stdin.take().map(|mut stdin| {
        let input = prompt.to_string();
        tokio::spawn(async move {
            // A child that exits without reading its input closes the pipe early.
            let _ = stdin.write_all(input.as_bytes()).await;
            let _ = stdin.shutdown().await;
        })
    });

    let output = match timeout(spec.timeout, child.wait_with_output()).await {
        Ok(res) => res?,
        Err(_) => return Err(CliError::Timeout(spec.timeout)),
    };

    if let Some(task) = stdin_task {
        let _ = task.await;
    }

    let duration = start_time.elapsed();
    let result = RunResult {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
    };

    tracing::debug!(
        program = %spec.program.display(),
        exit_code = result.exit_code,
        duration_ms = result.duration_ms,
        stdout_len = result.stdout.len(),
        "Generator process finished"
    );

    if !output.status.success() {
        return Err(CliError::NonZeroExit {
            exit_code: result.exit_code,
            stderr: result.stderr,
        });
    }

    Ok(result)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_prompt_is_written_to_stdin() {
        let result = run_command(&sh("cat"), "hello generator").await.unwrap();
        assert_eq!(result.stdout, "hello generator");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_prompt_placeholder_in_args() {
        let spec = CommandSpec::new(
            "sh",
            vec!["-c".to_string(), "printf '%s' \"$1\"".to_string(), "sh".to_string(), "{prompt}".to_string()],
        );
        let result = run_command(&spec, "from args").await.unwrap();
        assert_eq!(result.stdout, "from args");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_an_error() {
        let err = run_command(&sh("echo broken >&2; exit 3"), "p").await.unwrap_err();
        match err {
            CliError::NonZeroExit { exit_code, stderr } => {
                assert_eq!(exit_code, 3);
                assert!(stderr.contains("broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let spec = sh("sleep 5").with_timeout(Duration::from_millis(100));
        let start = Instant::now();
        let err = run_command(&spec, "p").await.unwrap_err();
        assert!(matches!(err, CliError::Timeout(_)));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_environment_is_passed() {
        let mut spec = sh("printf '%s' \"$CONSTRUCT_TEST_VAR\"");
        spec.env.push(("CONSTRUCT_TEST_VAR".to_string(), "set".to_string()));
        let result = run_command(&spec, "").await.unwrap();
        assert_eq!(result.stdout, "set");
    }
}
