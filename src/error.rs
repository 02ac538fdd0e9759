use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Reasons a single test case could not be evaluated.
///
/// These never fail the run; the orchestrator turns them into an error
/// verdict for the case at hand and moves on.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error("{kind} file {} not found", path.display())]
    MissingFixture { kind: &'static str, path: PathBuf },

    #[error("execution of {} failed: {source}", exe.display())]
    Spawn {
        exe: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {}s", timeout.as_secs_f64())]
    Timeout { timeout: Duration },

    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
