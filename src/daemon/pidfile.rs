//! Pidfile management so `confb reload` can find a running daemon.

use std::fs;
use std::path::{Path, PathBuf};

use nix::unistd::Uid;

/// Candidate pidfile locations, in search order.
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".cache/confb/confb.pid"));
    }
    candidates.push(
        PathBuf::from("/run/user")
            .join(Uid::current().as_raw().to_string())
            .join("confb/confb.pid"),
    );
    candidates.push(PathBuf::from("/var/run/confb.pid"));
    candidates
}

/// Write the current pid to the first writable candidate location.
///
/// Best effort: the daemon runs fine without a pidfile, `reload` just has
/// nothing to find.
pub fn write() -> Option<PathBuf> {
    for path in candidate_paths() {
        let Some(parent) = path.parent() else {
            continue;
        };
        if fs::create_dir_all(parent).is_err() {
            continue;
        }
        if fs::write(&path, format!("{}\n", std::process::id())).is_ok() {
            return Some(path);
        }
    }
    None
}

/// Remove a pidfile written earlier; errors are ignored.
pub fn remove(path: &Path) {
    let _ = fs::remove_file(path);
}

/// Locate an existing pidfile: an explicit override must exist, otherwise
/// the first candidate that does wins.
pub fn find(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.is_file().then(|| path.to_path_buf());
    }
    candidate_paths().into_iter().find(|p| p.is_file())
}

/// Parse the pid stored in a pidfile.
pub fn read_pid(path: &Path) -> Result<i32, String> {
    let content = fs::read_to_string(path).map_err(|e| format!("read pid file: {e}"))?;
    let trimmed = content.trim();
    match trimmed.parse::<i32>() {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(format!("invalid pid in {}: {trimmed:?}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn read_pid_parses_trimmed_integer() {
        let td = TempDir::new().unwrap();
        let path = td.path().join("confb.pid");
        fs::write(&path, "  4242\n").unwrap();
        assert_eq!(read_pid(&path).unwrap(), 4242);
    }

    #[test]
    fn read_pid_rejects_garbage_and_nonpositive() {
        let td = TempDir::new().unwrap();
        let path = td.path().join("confb.pid");

        fs::write(&path, "not-a-pid\n").unwrap();
        assert!(read_pid(&path).is_err());

        fs::write(&path, "-5\n").unwrap();
        assert!(read_pid(&path).is_err());
    }

    #[test]
    fn find_prefers_explicit_path() {
        let td = TempDir::new().unwrap();
        let path = td.path().join("mine.pid");
        fs::write(&path, "1\n").unwrap();

        assert_eq!(find(Some(&path)), Some(path));
        assert_eq!(find(Some(&td.path().join("missing.pid"))), None);
    }

    #[test]
    fn candidates_end_with_system_location() {
        let candidates = candidate_paths();
        assert_eq!(candidates.last().unwrap(), &PathBuf::from("/var/run/confb.pid"));
    }
}
