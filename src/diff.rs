use crate::error::CaseError;
use similar::TextDiff;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed { diff: String },
    /// The case could not be evaluated at all.
    Error { cause: String },
}

impl Verdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }
}

impl From<CaseError> for Verdict {
    fn from(err: CaseError) -> Self {
        Verdict::Error {
            cause: err.to_string(),
        }
    }
}

fn read_fixture(kind: &'static str, path: &Path) -> Result<Vec<u8>, CaseError> {
    fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            CaseError::MissingFixture {
                kind,
                path: path.to_path_buf(),
            }
        } else {
            CaseError::Io {
                action: "reading",
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Exact comparison of the expected output against what the program wrote.
pub fn compare(expected: &Path, actual: &Path) -> Verdict {
    let expected_bytes = match read_fixture("expected output", expected) {
        Ok(bytes) => bytes,
        Err(e) => return e.into(),
    };
    let actual_bytes = match read_fixture("actual output", actual) {
        Ok(bytes) => bytes,
        Err(e) => return e.into(),
    };
    if expected_bytes == actual_bytes {
        return Verdict::Passed;
    }

    let old = String::from_utf8_lossy(&expected_bytes);
    let new = String::from_utf8_lossy(&actual_bytes);
    let mut diff = TextDiff::from_lines(&*old, &*new)
        .unified_diff()
        .context_radius(3)
        .header(&expected.display().to_string(), &actual.display().to_string())
        .to_string();
    if diff.is_empty() {
        // Lossy decoding can fold distinct invalid bytes into the same text.
        diff = format!(
            "binary contents differ ({}B expected vs {}B actual)",
            expected_bytes.len(),
            actual_bytes.len()
        );
    }
    Verdict::Failed {
        diff: diff.trim_end().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;
    use tempfile::TempDir;

    fn write_pair(dir: &TempDir, expected: &[u8], actual: &[u8]) -> (std::path::PathBuf, std::path::PathBuf) {
        let e = dir.path().join("0001_out.txt");
        let a = dir.path().join("0001_tmp_out.txt");
        fs::write(&e, expected).unwrap();
        fs::write(&a, actual).unwrap();
        (e, a)
    }

    #[test]
    fn identical_files_pass() {
        let dir = TempDir::new().unwrap();
        let mut payload = vec![0u8; 256];
        rand::thread_rng().fill_bytes(&mut payload);
        let (e, a) = write_pair(&dir, &payload, &payload);
        assert_eq!(compare(&e, &a), Verdict::Passed);
    }

    #[test]
    fn mismatch_carries_unified_diff() {
        let dir = TempDir::new().unwrap();
        let (e, a) = write_pair(&dir, b"1\n2\n3\n", b"1\n20\n3\n");
        match compare(&e, &a) {
            Verdict::Failed { diff } => {
                assert!(diff.contains("-2"), "{diff}");
                assert!(diff.contains("+20"), "{diff}");
                assert!(diff.contains("@@"), "{diff}");
                assert!(diff.contains("0001_out.txt"), "{diff}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_and_line_endings_matter() {
        let dir = TempDir::new().unwrap();
        let (e, a) = write_pair(&dir, b"42\n", b"42\r\n");
        assert!(matches!(compare(&e, &a), Verdict::Failed { .. }));
        let (e, a) = write_pair(&dir, b"42\n", b"42");
        assert!(matches!(compare(&e, &a), Verdict::Failed { .. }));
    }

    #[test]
    fn missing_files_are_errors_not_mismatches() {
        let dir = TempDir::new().unwrap();
        let actual = dir.path().join("0001_tmp_out.txt");
        fs::write(&actual, b"output\n").unwrap();
        match compare(&dir.path().join("0001_out.txt"), &actual) {
            Verdict::Error { cause } => assert!(cause.contains("expected output file"), "{cause}"),
            other => panic!("expected error, got {other:?}"),
        }

        let expected = dir.path().join("0002_out.txt");
        fs::write(&expected, b"").unwrap();
        assert!(matches!(
            compare(&expected, &dir.path().join("0002_tmp_out.txt")),
            Verdict::Error { .. }
        ));
    }
}
