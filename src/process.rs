use crate::error::CaseError;
use nix::sys::signal::Signal;
use std::fs::File;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Spawns the program under test with explicit stdin/stdout redirection.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    pub timeout: Option<Duration>,
    /// Discard the program's stderr instead of passing it through.
    pub quiet: bool,
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>, quiet: bool) -> Self {
        Self { timeout, quiet }
    }

    /// Runs `exe` with `input` on stdin and stdout truncated into `output`.
    ///
    /// A non-zero exit is returned as-is; only failing to start the program
    /// (or the timeout firing) is an error.
    pub fn run(&self, exe: &Path, input: &Path, output: &Path) -> Result<ExitStatus, CaseError> {
        let stdin = File::open(input).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CaseError::MissingFixture {
                    kind: "input",
                    path: input.to_path_buf(),
                }
            } else {
                CaseError::Io {
                    action: "opening",
                    path: input.to_path_buf(),
                    source,
                }
            }
        })?;
        let stdout = File::create(output).map_err(|source| CaseError::Io {
            action: "creating",
            path: output.to_path_buf(),
            source,
        })?;

        let mut command = Command::new(exe);
        command
            .stdin(stdin)
            .stdout(stdout)
            .stderr(if self.quiet {
                Stdio::null()
            } else {
                Stdio::inherit()
            });
        let mut child = command.spawn().map_err(|source| CaseError::Spawn {
            exe: exe.to_path_buf(),
            source,
        })?;

        let status = match self.timeout {
            Some(timeout) => match child.wait_timeout(timeout).map_err(|source| wait_error(exe, source))? {
                Some(status) => status,
                None => {
                    if let Err(e) = child.kill() {
                        warn!("killing {:?} after timeout failed: {e}", exe);
                    }
                    if let Err(e) = child.wait() {
                        warn!("reaping {:?} after timeout failed: {e}", exe);
                    }
                    return Err(CaseError::Timeout { timeout });
                }
            },
            None => child.wait().map_err(|source| wait_error(exe, source))?,
        };
        debug!(
            "{:?} < {:?} > {:?} -> status {:?}",
            exe,
            input,
            output,
            status.code()
        );
        Ok(status)
    }
}

fn wait_error(exe: &Path, source: std::io::Error) -> CaseError {
    CaseError::Io {
        action: "waiting for",
        path: exe.to_path_buf(),
        source,
    }
}

/// Human description of an unsuccessful status, `None` on success.
pub fn describe_status(status: ExitStatus) -> Option<String> {
    if status.success() {
        return None;
    }
    if let Some(code) = status.code() {
        return Some(code.to_string());
    }
    match status.signal() {
        Some(sig) => Some(match Signal::try_from(sig) {
            Ok(signal) => format!("killed by {}", signal.as_str()),
            Err(_) => format!("killed by signal {sig}"),
        }),
        None => Some(format!("{status}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn system(tool: &str) -> std::path::PathBuf {
        which::which(tool).unwrap_or_else(|_| panic!("system {tool} not found"))
    }

    #[test]
    fn stdin_and_stdout_are_redirected() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, b"hello\nworld\n").unwrap();
        fs::write(&output, b"stale contents that are longer\n").unwrap();

        let status = ProcessRunner::default()
            .run(&system("cat"), &input, &output)
            .unwrap();
        assert!(status.success());
        assert_eq!(describe_status(status), None);
        assert_eq!(fs::read(&output).unwrap(), b"hello\nworld\n");
    }

    #[test]
    fn non_zero_exit_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, b"echo partial\nexit 3\n").unwrap();

        let status = ProcessRunner::default()
            .run(&system("sh"), &input, &output)
            .unwrap();
        assert_eq!(status.code(), Some(3));
        assert_eq!(describe_status(status).as_deref(), Some("3"));
        assert_eq!(fs::read_to_string(&output).unwrap(), "partial\n");
    }

    #[test]
    fn signal_is_named() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, b"kill -TERM $$\n").unwrap();

        let status = ProcessRunner::default()
            .run(&system("sh"), &input, &dir.path().join("out.txt"))
            .unwrap();
        assert_eq!(describe_status(status).as_deref(), Some("killed by SIGTERM"));
    }

    #[test]
    fn missing_input_is_reported_before_spawn() {
        let dir = TempDir::new().unwrap();
        let err = ProcessRunner::default()
            .run(
                &system("cat"),
                &dir.path().join("0001_in.txt"),
                &dir.path().join("0001_tmp_out.txt"),
            )
            .unwrap_err();
        assert!(matches!(err, CaseError::MissingFixture { kind: "input", .. }));
        assert!(!dir.path().join("0001_tmp_out.txt").exists());
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, b"").unwrap();
        let err = ProcessRunner::default()
            .run(&dir.path().join("no-such-binary"), &input, &dir.path().join("out.txt"))
            .unwrap_err();
        assert!(matches!(err, CaseError::Spawn { .. }));
        assert!(err.to_string().contains("execution of"));
    }

    #[test]
    fn timeout_kills_the_child() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, b"exec sleep 10\n").unwrap();
        let runner = ProcessRunner::new(Some(Duration::from_millis(200)), true);
        let err = runner
            .run(&system("sh"), &input, &dir.path().join("out.txt"))
            .unwrap_err();
        assert!(matches!(err, CaseError::Timeout { .. }));
    }
}
