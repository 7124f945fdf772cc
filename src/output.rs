//! Output materializer: turns the finished chapter sequence into files.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Result, TutorialError};

/// The artifact set produced by the combine stage, ready to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialArtifacts {
    /// Rendered index document (summary + table of contents).
    pub index: String,
    /// (file name, content) per chapter, in reading order.
    pub chapters: Vec<(String, String)>,
}

/// Stable, collision-free chapter file name: `NN_slug.md`.
///
/// The two-digit chapter number keeps names unique even when two
/// abstractions slugify identically, and keeps repeated runs over the same
/// input byte-identical.
pub fn chapter_filename(number: usize, name: &str) -> String {
    format!("{:02}_{}.md", number, slugify(name))
}

fn slugify(name: &str) -> String {
    let mut slug = String::new();
    let mut last_was_sep = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    let slug = slug.trim_end_matches('_').to_string();
    if slug.is_empty() {
        "chapter".to_string()
    } else {
        slug
    }
}

/// Write the index plus one file per chapter under
/// `<output_root>/<project_name>/` and return that directory.
pub fn materialize(
    output_root: &Path,
    project_name: &str,
    artifacts: &TutorialArtifacts,
) -> Result<PathBuf> {
    let dir = output_root.join(slugify(project_name));
    std::fs::create_dir_all(&dir)
        .map_err(|e| TutorialError::io(dir.display().to_string(), e))?;

    let index_path = dir.join("index.md");
    std::fs::write(&index_path, &artifacts.index)
        .map_err(|e| TutorialError::io(index_path.display().to_string(), e))?;

    for (file_name, content) in &artifacts.chapters {
        let path = dir.join(file_name);
        std::fs::write(&path, content)
            .map_err(|e| TutorialError::io(path.display().to_string(), e))?;
    }

    info!(
        dir = %dir.display(),
        chapters = artifacts.chapters.len(),
        "tutorial artifacts written"
    );
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn filenames_are_stable_and_unique() {
        assert_eq!(chapter_filename(1, "Query Engine"), "01_query_engine.md");
        assert_eq!(chapter_filename(12, "I/O & Buffers!"), "12_i_o_buffers.md");
        // identical names stay distinct through the chapter number
        assert_ne!(chapter_filename(1, "Cache"), chapter_filename(2, "Cache"));
        assert_eq!(chapter_filename(3, "???"), "03_chapter.md");
    }

    #[test]
    fn materialize_writes_all_artifacts() {
        let dir = tempdir().unwrap();
        let artifacts = TutorialArtifacts {
            index: "# Tutorial\n".to_string(),
            chapters: vec![
                ("01_first.md".to_string(), "chapter one".to_string()),
                ("02_second.md".to_string(), "chapter two".to_string()),
            ],
        };

        let out = materialize(dir.path(), "My Project", &artifacts).unwrap();
        assert_eq!(out, dir.path().join("my_project"));
        assert_eq!(
            std::fs::read_to_string(out.join("index.md")).unwrap(),
            "# Tutorial\n"
        );
        assert_eq!(
            std::fs::read_to_string(out.join("02_second.md")).unwrap(),
            "chapter two"
        );
    }

    #[test]
    fn repeated_materialize_is_idempotent() {
        let dir = tempdir().unwrap();
        let artifacts = TutorialArtifacts {
            index: "idx".to_string(),
            chapters: vec![("01_a.md".to_string(), "a".to_string())],
        };
        let first = materialize(dir.path(), "p", &artifacts).unwrap();
        let second = materialize(dir.path(), "p", &artifacts).unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(second.join("01_a.md")).unwrap(), "a");
    }
}
