//! Source provider boundary: where the analyzed files come from.
//!
//! Remote hosting providers live behind [`SourceProvider`] outside this
//! crate; [`LocalDirSource`] is the concrete default so the pipeline runs
//! end-to-end against a checked-out tree.

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, TutorialError};
use crate::types::SourceFile;

/// A capability that yields the file set for one source location.
///
/// Implementations honor glob-style include/exclude patterns against
/// relative paths and skip any file exceeding `max_file_size` bytes.
pub trait SourceProvider {
    fn fetch(
        &self,
        include: &[String],
        exclude: &[String],
        max_file_size: u64,
    ) -> impl Future<Output = Result<Vec<SourceFile>>> + Send;
}

/// Glob-style match: `*` spans any run of characters, `?` exactly one.
///
/// Patterns are matched against the full relative path, so `tests/*`
/// excludes the whole subtree and `*test*` matches anywhere in the path.
pub fn matches_pattern(path: &str, pattern: &str) -> bool {
    let p: Vec<char> = path.chars().collect();
    let q: Vec<char> = pattern.chars().collect();

    // Two-pointer wildcard match with backtracking to the last `*`.
    let (mut i, mut j) = (0usize, 0usize);
    let (mut star, mut mark) = (None, 0usize);

    while i < p.len() {
        if j < q.len() && (q[j] == '?' || q[j] == p[i]) {
            i += 1;
            j += 1;
        } else if j < q.len() && q[j] == '*' {
            star = Some(j);
            mark = i;
            j += 1;
        } else if let Some(s) = star {
            j = s + 1;
            mark += 1;
            i = mark;
        } else {
            return false;
        }
    }

    while j < q.len() && q[j] == '*' {
        j += 1;
    }
    j == q.len()
}

fn is_included(path: &str, include: &[String], exclude: &[String]) -> bool {
    // A file must match some include pattern (against the full path or just
    // the file name, so `*.rs` works at any depth) and no exclude pattern.
    let name = path.rsplit('/').next().unwrap_or(path);
    let included = include
        .iter()
        .any(|p| matches_pattern(path, p) || matches_pattern(name, p));
    included && !exclude.iter().any(|p| matches_pattern(path, p))
}

/// Reads the file tree under a local directory.
#[derive(Debug, Clone)]
pub struct LocalDirSource {
    root: PathBuf,
}

impl LocalDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derive a project name from the directory name.
    pub fn project_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    }

    fn walk(
        &self,
        dir: &Path,
        include: &[String],
        exclude: &[String],
        max_file_size: u64,
        out: &mut Vec<SourceFile>,
    ) -> Result<()> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| TutorialError::io(dir.display().to_string(), e))?;

        for entry in entries {
            let entry = entry.map_err(|e| TutorialError::io(dir.display().to_string(), e))?;
            let path = entry.path();
            let relative = path
                .strip_prefix(&self.root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");

            if path.is_dir() {
                // Prune excluded subtrees early.
                let as_dir = format!("{relative}/");
                if exclude.iter().any(|p| matches_pattern(&as_dir, p)) {
                    debug!(path = %relative, "skipping excluded directory");
                    continue;
                }
                self.walk(&path, include, exclude, max_file_size, out)?;
                continue;
            }

            if !is_included(&relative, include, exclude) {
                continue;
            }

            let size = entry
                .metadata()
                .map_err(|e| TutorialError::io(relative.clone(), e))?
                .len();
            if size > max_file_size {
                debug!(path = %relative, size, max_file_size, "skipping oversized file");
                continue;
            }

            match std::fs::read_to_string(&path) {
                Ok(content) => out.push(SourceFile::new(relative, content)),
                Err(e) => {
                    // Binary or unreadable files are not worth failing a run.
                    warn!(path = %relative, error = %e, "skipping unreadable file");
                }
            }
        }
        Ok(())
    }
}

impl SourceProvider for LocalDirSource {
    async fn fetch(
        &self,
        include: &[String],
        exclude: &[String],
        max_file_size: u64,
    ) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();
        self.walk(&self.root, include, exclude, max_file_size, &mut files)?;
        // Deterministic ordering keeps prompts, and thus cache keys, stable
        // across runs over the same tree.
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}
