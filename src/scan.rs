//! Directory walking for bulk ingestion.
//!
//! Applies the built-in excludes (`.git`, `target`, `node_modules`), then
//! the configured exclude globs, then the include globs. Globs match paths
//! relative to the walk root.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::IngestConfig;

const DEFAULT_EXCLUDES: &[&str] = &["**/.git/**", "**/target/**", "**/node_modules/**"];

/// Files under `root` selected by `config`, sorted by relative path.
pub fn scan_dir(root: &Path, config: &IngestConfig) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("Not a directory: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;
    let mut excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    excludes.extend(config.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        files.push((rel_str, path.to_path_buf()));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "content").unwrap();
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn sorted_with_default_excludes() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b.txt");
        touch(tmp.path(), "a/notes.md");
        touch(tmp.path(), ".git/config");
        touch(tmp.path(), "node_modules/pkg/index.js");

        let files = scan_dir(tmp.path(), &IngestConfig::default()).unwrap();
        assert_eq!(names(tmp.path(), &files), vec!["a/notes.md", "b.txt"]);
    }

    #[test]
    fn include_and_exclude_globs() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "ch1.pdf");
        touch(tmp.path(), "ch2.pdf");
        touch(tmp.path(), "draft/ch3.pdf");
        touch(tmp.path(), "readme.txt");

        let config = IngestConfig {
            include_globs: vec!["**/*.pdf".into()],
            exclude_globs: vec!["draft/**".into()],
            follow_symlinks: false,
        };
        let files = scan_dir(tmp.path(), &config).unwrap();
        assert_eq!(names(tmp.path(), &files), vec!["ch1.pdf", "ch2.pdf"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(scan_dir(&tmp.path().join("nope"), &IngestConfig::default()).is_err());
    }
}
