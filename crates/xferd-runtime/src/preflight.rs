//! Pre-flight probe of destination paths.
//!
//! Before launching, the action reports whether each destination file,
//! and its dot-prefixed in-progress sibling, already exists. The report
//! is troubleshooting material only: it never blocks execution and never
//! errors, whatever the filesystem state.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Build an existence report for the destination paths.
///
/// For every path, two lines are emitted: one for the path itself and
/// one for the hidden sibling a writer would use for an incomplete file
/// (same directory, file name prefixed with a dot).
pub fn probe_dest_files(paths: &[PathBuf]) -> String {
    let mut out = String::new();
    for path in paths {
        let _ = writeln!(out, "    exists {:5}: {}", path.exists(), path.display());
        if let Some(dot_path) = dot_sibling(path) {
            let _ = writeln!(out, "    exists {:5}: {}", dot_path.exists(), dot_path.display());
        }
    }
    out
}

fn dot_sibling(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let dot_name = format!(".{}", name.to_string_lossy());
    Some(path.parent().unwrap_or_else(|| Path::new("")).join(dot_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reports_file_and_dot_sibling() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("out.dat");
        std::fs::write(&file, b"payload").unwrap();

        let report = probe_dest_files(&[file.clone()]);
        assert!(report.contains(&format!("exists true : {}", file.display())));
        assert!(report.contains(&format!(
            "exists false: {}",
            dir.path().join(".out.dat").display()
        )));
    }

    #[test]
    fn missing_paths_never_error() {
        let report = probe_dest_files(&[PathBuf::from("/nonexistent/dir/out.dat")]);
        assert_eq!(report.matches("exists false").count(), 2);
    }

    #[test]
    fn empty_input_gives_empty_report() {
        assert!(probe_dest_files(&[]).is_empty());
    }
}
