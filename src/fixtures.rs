//! Fixture locations and candidate file discovery.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Standard fixture locations under a project root.
#[derive(Debug, Clone)]
pub struct HarnessPaths {
    /// `<root>/fixtures`
    pub fixtures: PathBuf,
    /// The reference PDF the master snapshot is extracted from
    pub master_pdf: PathBuf,
    /// The master snapshot file
    pub master_json: PathBuf,
    /// Folder of candidate PDFs to check against the master
    pub for_testing: PathBuf,
}

impl HarnessPaths {
    /// Compute the fixture layout for a project root.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let fixtures = root.as_ref().join("fixtures");
        Self {
            master_pdf: fixtures.join("master.pdf"),
            master_json: fixtures.join("master_data.json"),
            for_testing: fixtures.join("for_testing"),
            fixtures,
        }
    }
}

/// List the candidate files in a folder, sorted by name.
///
/// Only regular files are returned; subdirectories are ignored. A missing
/// folder is a fatal setup error.
pub fn testing_file_paths<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Err(Error::FixturesNotFound(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_harness_paths_layout() {
        let paths = HarnessPaths::new("/tmp/project");
        assert_eq!(paths.fixtures, PathBuf::from("/tmp/project/fixtures"));
        assert_eq!(paths.master_pdf, PathBuf::from("/tmp/project/fixtures/master.pdf"));
        assert_eq!(
            paths.master_json,
            PathBuf::from("/tmp/project/fixtures/master_data.json")
        );
        assert_eq!(
            paths.for_testing,
            PathBuf::from("/tmp/project/fixtures/for_testing")
        );
    }

    #[test]
    fn test_missing_folder_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("for_testing");
        let err = testing_file_paths(&missing).unwrap_err();
        assert!(matches!(err, Error::FixturesNotFound(p) if p == missing));
    }

    #[test]
    fn test_lists_only_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("b.pdf")).unwrap();
        File::create(dir.path().join("a.pdf")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let files = testing_file_paths(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["a.pdf", "b.pdf"]);
    }
}
