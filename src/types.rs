use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::TutorialError;

/// One file from the analyzed codebase: path relative to the source root plus
/// its full text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A named conceptual unit identified in the source code.
///
/// `file_indices` reference positions in the run's `files` sequence; they are
/// validated against the known file set before being accepted into context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abstraction {
    pub name: String,
    pub description: String,
    pub file_indices: Vec<usize>,
}

/// A directed labeled edge between two abstractions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from_index: usize,
    pub to_index: usize,
    pub label: String,
}

/// Project summary plus the relationship edges between abstractions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipMap {
    pub summary: String,
    pub relations: Vec<Relationship>,
}

/// Result of drafting one chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterOutcome {
    /// The LLM produced chapter prose.
    Drafted(String),
    /// The item exhausted its retries; the message explains why.
    Failed(String),
}

/// One chapter slot, aligned with its position in `chapter_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDraft {
    /// Index into the run's `abstractions`.
    pub abstraction_index: usize,
    /// 1-based chapter number in reading order.
    pub number: usize,
    pub outcome: ChapterOutcome,
}

impl ChapterDraft {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ChapterOutcome::Failed(_))
    }
}

/// Final report of a pipeline run.
///
/// A run that lost chapters to exhausted retries still completes — the loss
/// is flagged here rather than aborting the run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Directory the artifacts were materialized into.
    pub output_dir: PathBuf,
    pub total_chapters: usize,
    /// 1-based chapter numbers that rendered as failure placeholders.
    pub failed_chapters: Vec<usize>,
}

impl RunSummary {
    /// Whether any chapter failed to generate.
    pub fn is_partial(&self) -> bool {
        !self.failed_chapters.is_empty()
    }

    /// Escalate a partial run into an error for callers that need every
    /// chapter present.
    pub fn ensure_complete(&self) -> Result<(), TutorialError> {
        if self.is_partial() {
            Err(TutorialError::PartialBatch {
                failed: self.failed_chapters.len(),
                total: self.total_chapters,
            })
        } else {
            Ok(())
        }
    }
}

/// Metadata for one repository returned by a search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub full_name: String,
    pub url: String,
    pub description: String,
    pub stars: u64,
    pub forks: u64,
    pub language: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_draft_failure_flag() {
        let ok = ChapterDraft {
            abstraction_index: 0,
            number: 1,
            outcome: ChapterOutcome::Drafted("text".into()),
        };
        assert!(!ok.is_failed());

        let bad = ChapterDraft {
            abstraction_index: 1,
            number: 2,
            outcome: ChapterOutcome::Failed("timeout".into()),
        };
        assert!(bad.is_failed());
    }

    #[test]
    fn summary_completeness() {
        let complete = RunSummary {
            output_dir: PathBuf::from("out"),
            total_chapters: 3,
            failed_chapters: vec![],
        };
        assert!(!complete.is_partial());
        assert!(complete.ensure_complete().is_ok());

        let partial = RunSummary {
            output_dir: PathBuf::from("out"),
            total_chapters: 3,
            failed_chapters: vec![2],
        };
        assert!(partial.is_partial());
        assert!(matches!(
            partial.ensure_complete(),
            Err(TutorialError::PartialBatch { failed: 1, total: 3 })
        ));
    }
}
