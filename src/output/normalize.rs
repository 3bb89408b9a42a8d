//! Newline normalization over an ordered set of source files.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from reading and normalizing source fragments.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: not valid UTF-8", path.display())]
    InvalidUtf8 { path: PathBuf },
}

/// Concatenate `paths` in order with normalized line endings.
///
/// Every `\r\n` and lone `\r` becomes `\n`; a newline is inserted between
/// adjacent files when the previous one did not end with one; the result
/// carries exactly one trailing newline.
pub fn normalize_files(paths: &[PathBuf]) -> Result<String, NormalizeError> {
    let mut acc = String::new();

    for (idx, path) in paths.iter().enumerate() {
        let text = read_normalized(path)?;
        acc.push_str(&text);

        // Newline boundary between files.
        if idx + 1 < paths.len() && !acc.ends_with('\n') {
            acc.push('\n');
        }
    }

    // Exactly one trailing newline.
    while acc.ends_with("\n\n") {
        acc.pop();
    }
    if !acc.ends_with('\n') {
        acc.push('\n');
    }

    Ok(acc)
}

/// Read one file as UTF-8 with line endings normalized to `\n`.
pub(crate) fn read_normalized(path: &Path) -> Result<String, NormalizeError> {
    let bytes = fs::read(path).map_err(|source| NormalizeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| NormalizeError::InvalidUtf8 {
        path: path.to_path_buf(),
    })?;
    Ok(normalize_newlines(&text))
}

fn normalize_newlines(s: &str) -> String {
    // CRLF first, then any lone CR.
    s.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn crlf_and_cr_become_lf() {
        let td = TempDir::new().unwrap();
        let a = write(&td, "a.txt", "one\r\ntwo\rthree");

        let out = normalize_files(&[a]).unwrap();
        assert_eq!(out, "one\ntwo\nthree\n");
        assert!(!out.contains('\r'));
    }

    #[test]
    fn boundary_newline_inserted_between_files() {
        let td = TempDir::new().unwrap();
        let a = write(&td, "a.txt", "hello");
        let b = write(&td, "b.txt", "world");

        let out = normalize_files(&[a, b]).unwrap();
        assert_eq!(out, "hello\nworld\n");
    }

    #[test]
    fn trailing_newlines_collapse_to_one() {
        let td = TempDir::new().unwrap();
        let a = write(&td, "a.txt", "hello\n\n\n");

        let out = normalize_files(&[a]).unwrap();
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn empty_file_contributes_nothing_but_newline_guaranteed() {
        let td = TempDir::new().unwrap();
        let a = write(&td, "a.txt", "");

        let out = normalize_files(&[a]).unwrap();
        assert_eq!(out, "\n");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let td = TempDir::new().unwrap();
        let path = td.path().join("bad.txt");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let err = normalize_files(&[path]).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidUtf8 { .. }));
    }
}
