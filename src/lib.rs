pub mod archive;
pub mod diff;
pub mod error;
pub mod fixtures;
pub mod log;
pub mod orchestrator;
pub mod process;

pub use crate::error::CaseError;
pub use crate::fixtures::TestCase;
pub use crate::log::{ConsoleSink, EventKind, LogEvent, LogSink, MemorySink};
pub use crate::orchestrator::{CaseResult, Orchestrator, RunConfig, RunReport, Verdict};
