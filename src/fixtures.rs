use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Number of leading characters of a fixture file name that form its id.
pub const ID_LEN: usize = 4;

/// One numbered input/expected-output pair inside a test directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub id: String,
    pub input: PathBuf,
    pub expected: PathBuf,
    /// Scratch file the program's stdout goes to, overwritten on every run.
    pub actual: PathBuf,
}

impl TestCase {
    pub fn new(dir: &Path, id: &str) -> Self {
        Self {
            id: id.to_string(),
            input: dir.join(format!("{id}_in.txt")),
            expected: dir.join(format!("{id}_out.txt")),
            actual: dir.join(format!("{id}_tmp_out.txt")),
        }
    }
}

/// Scratch outputs, editor backups and hidden files never form cases.
pub fn is_excluded(name: &str) -> bool {
    name.contains("win") || name.contains("tmp") || name.starts_with('.')
}

fn case_id(name: &str) -> &str {
    match name.char_indices().nth(ID_LEN) {
        Some((end, _)) => &name[..end],
        None => name,
    }
}

/// Lists the immediate files of `dir` and returns one case per distinct id,
/// in first-seen order.
///
/// Fixture existence is not checked here; a missing `_in`/`_out` file shows up
/// when the case is run.
pub fn discover(dir: &Path) -> Result<Vec<TestCase>> {
    let mut seen = HashSet::new();
    let mut cases = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        // Links are listed like the files they point at; dangling ones still
        // count so their case surfaces as a missing fixture.
        let file_type = entry.file_type();
        if file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir()) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if is_excluded(&name) {
            continue;
        }
        let id = case_id(&name);
        if !seen.insert(id.to_string()) {
            continue;
        }
        cases.push(TestCase::new(dir, id));
    }
    Ok(cases)
}
