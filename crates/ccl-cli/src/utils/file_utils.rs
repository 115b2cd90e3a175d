//! File and path utilities

use crate::{CliError, Result};
use ccl_core::is_build_script;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Utilities for working with files and paths
pub struct FileUtils;

impl FileUtils {
    /// Build scripts named by `paths`. Directories are searched recursively
    /// and filtered by the globs, relative to the directory; files are taken
    /// as given. The result is sorted and free of duplicates.
    pub fn find_build_scripts(
        paths: &[PathBuf],
        include_patterns: &[String],
        exclude_patterns: &[String],
    ) -> Result<Vec<PathBuf>> {
        let include_set = Self::build_glob_set(include_patterns)?;
        let exclude_set = Self::build_glob_set(exclude_patterns)?;

        let mut files = BTreeSet::new();
        for path in paths {
            if path.is_file() {
                if !is_build_script(path) {
                    warn!(path = %path.display(), "not a Gradle Kotlin build script, checking anyway");
                }
                files.insert(path.clone());
            } else if path.is_dir() {
                for file in Self::find_files(path, &include_set, &exclude_set)? {
                    files.insert(file);
                }
            } else {
                return Err(CliError::InvalidInput(format!(
                    "{} does not exist",
                    path.display()
                )));
            }
        }
        debug!(count = files.len(), "found build scripts");
        Ok(files.into_iter().collect())
    }

    fn find_files(dir: &Path, include_set: &GlobSet, exclude_set: &GlobSet) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = entry.map_err(|e| CliError::Io(e.into()))?;
            let path = entry.path();

            if !entry.file_type().is_file() || !is_build_script(path) {
                continue;
            }

            let relative_path = path
                .strip_prefix(dir)
                .map_err(|_| CliError::InvalidInput("Invalid path structure".to_string()))?;

            // Check include patterns (if any)
            if !include_set.is_empty() && !include_set.is_match(relative_path) {
                continue;
            }

            // Check exclude patterns
            if exclude_set.is_match(relative_path) {
                continue;
            }

            files.push(path.to_path_buf());
        }

        Ok(files)
    }

    /// Build a GlobSet from a list of patterns
    fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                CliError::InvalidInput(format!("Invalid glob pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }

        builder
            .build()
            .map_err(|e| CliError::InvalidInput(format!("Failed to build glob set: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "").unwrap();
        path
    }

    #[test]
    fn test_only_build_scripts_are_found() {
        let dir = TempDir::new().unwrap();
        let root = touch(dir.path(), "build.gradle.kts");
        let app = touch(dir.path(), "app/build.gradle.kts");
        touch(dir.path(), "settings.gradle.kts");
        touch(dir.path(), "app/src/Main.kt");
        touch(dir.path(), "gradle/init.gradle.kts");

        let files = FileUtils::find_build_scripts(&[dir.path().to_path_buf()], &[], &[]).unwrap();
        assert_eq!(files, vec![app, root]);
    }

    #[test]
    fn test_globs_are_relative_to_the_searched_directory() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "build.gradle.kts");
        let lib = touch(dir.path(), "lib/build.gradle.kts");
        touch(dir.path(), "lib/build/generated/build.gradle.kts");

        let files = FileUtils::find_build_scripts(
            &[dir.path().to_path_buf()],
            &["lib/**".to_string()],
            &["**/build/**".to_string()],
        )
        .unwrap();
        assert_eq!(files, vec![lib]);
    }

    #[test]
    fn test_explicit_files_are_kept_once() {
        let dir = TempDir::new().unwrap();
        let script = touch(dir.path(), "build.gradle.kts");

        let files = FileUtils::find_build_scripts(
            &[script.clone(), dir.path().to_path_buf()],
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(files, vec![script]);
    }

    #[test]
    fn test_missing_paths_and_bad_globs_are_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert!(FileUtils::find_build_scripts(&[missing], &[], &[]).is_err());

        let err = FileUtils::find_build_scripts(
            &[dir.path().to_path_buf()],
            &["[".to_string()],
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, CliError::InvalidInput(_)));
    }
}
