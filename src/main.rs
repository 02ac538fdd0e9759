use anyhow::{bail, Result};
use clap::Parser;
use colored::control::set_override as set_color_override;
use ctest_runner::log::{ConsoleSink, EventKind, LogEvent, LogSink};
use ctest_runner::orchestrator::{resolve_executable, Orchestrator, RunConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const C_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "c++"];

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a compiled C/C++ program against its numbered test fixtures", long_about = None)]
struct Cli {
    /// C/C++ source file; fixtures are looked up next to it
    source: PathBuf,
    /// Program to test (defaults to the source path without extension)
    #[arg(long, value_name = "PATH")]
    exe: Option<PathBuf>,
    /// Kill a test program after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<f64>,
    /// Discard the test program's stderr
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
    /// Print diagnostic tracing to stderr
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
    /// Disable coloured output
    #[arg(long, default_value_t = false)]
    no_color: bool,
    /// Run even if the source does not look like C/C++
    #[arg(long, default_value_t = false)]
    force: bool,
    /// Exit with failure when any test failed or could not be run
    #[arg(long, default_value_t = false)]
    check: bool,
}

fn is_c_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| C_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// `-v` shows per-case debug tracing; otherwise only warnings.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "ctest_runner=debug"
    } else {
        "ctest_runner=warn"
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| default_filter(cli.verbose).to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    set_color_override(!cli.no_color);

    if !cli.force && !is_c_source(&cli.source) {
        println!(
            "{} is not a C/C++ source file, nothing to test (use --force to override).",
            cli.source.display()
        );
        return Ok(());
    }

    let timeout = match cli.timeout {
        Some(secs) if !(secs.is_finite() && secs > 0.0) => {
            bail!("--timeout must be a positive number of seconds, got {secs}")
        }
        Some(secs) => Some(Duration::from_secs_f64(secs)),
        None => None,
    };
    let executable = cli.exe.as_deref().map(resolve_executable).transpose()?;
    info!("config: exe={:?} timeout={:?}", executable, timeout);

    let config = RunConfig {
        executable,
        timeout,
        quiet: cli.quiet,
    };
    let mut orchestrator = Orchestrator::new(ConsoleSink, config);
    let report = orchestrator.run(&cli.source);

    let mut sink = orchestrator.into_sink();
    if !report.results.is_empty() {
        let kind = if report.all_passed() {
            EventKind::Success
        } else {
            EventKind::Failure
        };
        sink.append(&LogEvent::new(kind, report.summary()));
    }

    if cli.check && !report.all_passed() {
        bail!("failures encountered");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_like_extensions() {
        assert!(is_c_source(Path::new("task/main.c")));
        assert!(is_c_source(Path::new("task/main.CPP")));
        assert!(is_c_source(Path::new("solve.cc")));
        assert!(!is_c_source(Path::new("notes.txt")));
        assert!(!is_c_source(Path::new("Makefile")));
    }

    #[test]
    fn verbose_enables_debug_tracing() {
        assert_eq!(default_filter(true), "ctest_runner=debug");
        assert_eq!(default_filter(false), "ctest_runner=warn");
    }

    #[test]
    fn cli_parses_options() {
        let cli = Cli::try_parse_from([
            "ctest-runner",
            "--timeout",
            "2.5",
            "-q",
            "--check",
            "src/main.c",
        ])
        .unwrap();
        assert_eq!(cli.source, PathBuf::from("src/main.c"));
        assert_eq!(cli.timeout, Some(2.5));
        assert!(cli.quiet && cli.check && !cli.verbose);
    }
}
