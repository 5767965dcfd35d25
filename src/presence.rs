//! Skip-if-present detection
//!
//! The download directory is the only record of what has been fetched: a
//! record counts as done when its base path exists, with or without an
//! extension appended by the classifier.

use std::path::{Path, PathBuf};

/// Find an entry satisfying the presence check for `base_path`
///
/// Returns `base_path` itself if it exists, otherwise the first sibling named
/// `<file_name>.<suffix>` with a non-empty suffix. A missing parent directory
/// simply yields `None`.
pub fn find_existing(base_path: &Path) -> Option<PathBuf> {
    if base_path.symlink_metadata().is_ok() {
        return Some(base_path.to_path_buf());
    }

    let file_name = base_path.file_name()?.to_str()?;
    let parent = match base_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let entries = std::fs::read_dir(parent).ok()?;
    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_prefix(file_name))
                .and_then(|rest| rest.strip_prefix('.'))
                .is_some_and(|suffix| !suffix.is_empty())
        })
        .map(|entry| entry.path())
        .collect();

    // read_dir order is platform dependent
    matches.sort();
    matches.into_iter().next()
}

/// Whether a file for `base_path` already exists (exact or any extension)
#[must_use]
pub fn already_present(base_path: &Path) -> bool {
    find_existing(base_path).is_some()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_directory_is_not_present() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("2021").join("report1");
        assert!(!already_present(&base));
    }

    #[test]
    fn empty_directory_is_not_present() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!already_present(&temp_dir.path().join("report1")));
    }

    #[test]
    fn exact_match_is_present() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("report1");
        fs::write(&base, b"x").unwrap();
        assert_eq!(find_existing(&base), Some(base));
    }

    #[test]
    fn any_extension_is_present() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("report1");
        fs::write(temp_dir.path().join("report1.xlsx"), b"x").unwrap();
        assert_eq!(
            find_existing(&base),
            Some(temp_dir.path().join("report1.xlsx"))
        );
    }

    #[test]
    fn bare_trailing_dot_does_not_count() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("report1."), b"x").unwrap();
        assert!(!already_present(&temp_dir.path().join("report1")));
    }

    #[test]
    fn longer_name_with_same_prefix_does_not_count() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("report10.pdf"), b"x").unwrap();
        fs::write(temp_dir.path().join("report1_v2"), b"x").unwrap();
        assert!(!already_present(&temp_dir.path().join("report1")));
    }

    #[test]
    fn glob_metacharacters_are_literal() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("reportA.pdf"), b"x").unwrap();
        assert!(!already_present(&temp_dir.path().join("report[A-Z]")));

        fs::write(temp_dir.path().join("report[A-Z].pdf"), b"x").unwrap();
        assert!(already_present(&temp_dir.path().join("report[A-Z]")));
    }

    #[test]
    fn filename_that_already_has_a_dot_matches_longer_suffixes() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("report.v1.pdf"), b"x").unwrap();
        assert!(already_present(&temp_dir.path().join("report.v1")));
    }
}
