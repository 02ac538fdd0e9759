use crate::archive;
use crate::diff;
use crate::fixtures::{self, TestCase};
use crate::log::{EventKind, LogEvent, LogSink};
use crate::process::{describe_status, ProcessRunner};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub use crate::diff::Verdict;

/// Test directories looked for next to the source file, in order.
pub const TEST_DIRS: &[&str] = &["CZE", "sample/CZE", "tests", "test-data"];
/// Test archives looked for next to the source file, in order.
pub const TEST_ARCHIVES: &[&str] = &["sample.tgz", "tests.tgz", "test-data.tgz"];

#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Program to test; defaults to the source path without its extension.
    pub executable: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct CaseResult {
    pub directory: PathBuf,
    pub case: TestCase,
    pub verdict: Verdict,
    /// Set when the program exited unsuccessfully.
    pub exit_warning: Option<String>,
}

/// Everything one run logged, plus the verdict of every executed case.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub events: Vec<LogEvent>,
    pub results: Vec<CaseResult>,
    pub found_data: bool,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Failed { .. }))
    }

    pub fn errors(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Error { .. }))
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.results.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "{}/{} tests passed ({} failed, {} errors).",
            self.passed(),
            self.results.len(),
            self.failed(),
            self.errors()
        )
    }

    fn count(&self, pred: impl Fn(&Verdict) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.verdict)).count()
    }
}

/// Source path with its extension stripped.
///
/// A bare file name is anchored to the current directory so it is never
/// looked up on `PATH`.
pub fn executable_for(source: &Path) -> PathBuf {
    let exe = source.with_extension("");
    if exe.is_relative() && exe.components().count() == 1 {
        return Path::new(".").join(exe);
    }
    exe
}

/// Existing candidates from `names`, resolved against `base`.
pub fn existing_candidates(base: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| base.join(name))
        .filter(|path| path.exists())
        .collect()
}

/// Drives discovery, execution and verdict reporting for one source file.
pub struct Orchestrator<S: LogSink> {
    sink: S,
    config: RunConfig,
    runner: ProcessRunner,
}

impl<S: LogSink> Orchestrator<S> {
    pub fn new(sink: S, config: RunConfig) -> Self {
        let runner = ProcessRunner::new(config.timeout, config.quiet);
        Self {
            sink,
            config,
            runner,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Runs every test found next to `source`. Events reach the sink as they
    /// happen; the returned report holds the same events plus verdicts.
    pub fn run(&mut self, source: &Path) -> RunReport {
        let mut report = RunReport::default();
        self.sink.clear();
        self.log(&mut report, LogEvent::new(EventKind::Info, "Testing started."));

        let exe = self
            .config
            .executable
            .clone()
            .unwrap_or_else(|| executable_for(source));
        let base = match source.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        info!("testing {:?} against fixtures under {:?}", exe, base);

        for archive in existing_candidates(&base, TEST_ARCHIVES) {
            report.found_data = true;
            self.test_archive(&mut report, &exe, &archive);
        }
        for dir in existing_candidates(&base, TEST_DIRS) {
            report.found_data = true;
            self.test_dir(&mut report, &exe, &dir);
        }

        if !report.found_data {
            self.log(&mut report, LogEvent::new(EventKind::Info, "No test data found."));
        }
        self.log(&mut report, LogEvent::new(EventKind::Info, "Testing ended."));
        report
    }

    fn log(&mut self, report: &mut RunReport, event: LogEvent) {
        self.sink.append(&event);
        report.events.push(event);
    }

    fn info(&mut self, report: &mut RunReport, message: String) {
        self.log(report, LogEvent::new(EventKind::Info, message));
    }

    fn test_archive(&mut self, report: &mut RunReport, exe: &Path, tgz: &Path) {
        self.info(report, format!("Testing archive: {}", tgz.display()));
        self.info(
            report,
            format!(
                "Extracting archive {} to {}",
                tgz.display(),
                archive::extraction_dir(tgz).display()
            ),
        );
        let extracted = match archive::expand(tgz) {
            Ok(extracted) => extracted,
            Err(e) => {
                self.log(
                    report,
                    LogEvent::new(EventKind::Failure, format!("Error: {e:#}")),
                );
                return;
            }
        };

        for dir in existing_candidates(extracted.path(), TEST_DIRS) {
            self.test_dir(report, exe, &dir);
        }

        self.info(report, "Cleaning up.".to_string());
        if let Err(e) = extracted.cleanup() {
            self.log(
                report,
                LogEvent::new(EventKind::Warning, format!("Warning: {e:#}")),
            );
        }
    }

    /// Runs the cases of one directory, stopping at the first mismatch.
    fn test_dir(&mut self, report: &mut RunReport, exe: &Path, dir: &Path) {
        self.info(report, format!("Testing directory: {}", dir.display()));
        self.log(report, LogEvent::rule('~'));

        let cases = match fixtures::discover(dir) {
            Ok(cases) => cases,
            Err(e) => {
                self.log(
                    report,
                    LogEvent::new(EventKind::Failure, format!("Error: {e:#}")),
                );
                return;
            }
        };
        debug!("{} case(s) in {:?}", cases.len(), dir);

        for case in cases {
            let result = self.test_case(report, exe, dir, case);
            let failed = matches!(result.verdict, Verdict::Failed { .. });
            report.results.push(result);
            if failed {
                self.info(
                    report,
                    "Skipping next tests in the same directory (if any).".to_string(),
                );
                return;
            }
        }
    }

    fn test_case(
        &mut self,
        report: &mut RunReport,
        exe: &Path,
        dir: &Path,
        case: TestCase,
    ) -> CaseResult {
        let id = case.id.clone();
        let mut exit_warning = None;
        let verdict = match self.runner.run(exe, &case.input, &case.actual) {
            Ok(status) => {
                if let Some(status) = describe_status(status) {
                    self.log(
                        report,
                        LogEvent::new(
                            EventKind::Warning,
                            format!("Test {id} has exit status: {status}"),
                        ),
                    );
                    exit_warning = Some(status);
                }
                diff::compare(&case.expected, &case.actual)
            }
            Err(e) => e.into(),
        };

        match &verdict {
            Verdict::Passed => {
                self.log(
                    report,
                    LogEvent::new(EventKind::Success, format!("Success: Test {id} passed.")),
                );
            }
            Verdict::Failed { diff } => {
                self.log(
                    report,
                    LogEvent::new(EventKind::Failure, format!("Error: Test {id} failed.")),
                );
                self.log(report, LogEvent::new(EventKind::Info, diff.clone()));
            }
            Verdict::Error { cause } => {
                self.log(
                    report,
                    LogEvent::new(
                        EventKind::Failure,
                        format!("Error: Test {id} could not be run: {cause}"),
                    ),
                );
            }
        }
        self.log(report, LogEvent::rule('-'));

        CaseResult {
            directory: dir.to_path_buf(),
            case,
            verdict,
            exit_warning,
        }
    }
}

/// Resolves an explicitly configured executable: bare names go through `PATH`.
pub fn resolve_executable(exe: &Path) -> Result<PathBuf> {
    if exe.components().count() > 1 || exe.is_absolute() {
        return Ok(exe.to_path_buf());
    }
    if exe.exists() {
        return Ok(Path::new(".").join(exe));
    }
    which::which(exe).with_context(|| format!("{} not found on PATH", exe.display()))
}
