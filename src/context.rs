use std::path::PathBuf;

use crate::error::{Result, TutorialError};
use crate::types::{Abstraction, ChapterDraft, RelationshipMap, SourceFile};

/// State threaded through the pipeline, one field per derived value.
///
/// Created once per run and passed by reference to every stage. Inputs
/// (`project_name`, `files`) are set at construction; each derived field is
/// `None` until its producing stage's `finalize` runs. Accessors turn
/// "not yet produced" into [`TutorialError::MissingContext`], which is fatal
/// by contract — a stage can only read what an earlier stage wrote. Setters
/// overwrite silently (last writer wins).
#[derive(Debug, Default)]
pub struct RunContext {
    project_name: String,
    files: Vec<SourceFile>,
    abstractions: Option<Vec<Abstraction>>,
    relationships: Option<RelationshipMap>,
    chapter_order: Option<Vec<usize>>,
    chapters: Option<Vec<ChapterDraft>>,
    final_output_dir: Option<PathBuf>,
}

impl RunContext {
    pub fn new(project_name: impl Into<String>, files: Vec<SourceFile>) -> Self {
        Self {
            project_name: project_name.into(),
            files,
            ..Default::default()
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn abstractions(&self, stage: &'static str) -> Result<&[Abstraction]> {
        self.abstractions
            .as_deref()
            .ok_or(TutorialError::MissingContext { stage, key: "abstractions" })
    }

    pub fn set_abstractions(&mut self, abstractions: Vec<Abstraction>) {
        self.abstractions = Some(abstractions);
    }

    pub fn relationships(&self, stage: &'static str) -> Result<&RelationshipMap> {
        self.relationships
            .as_ref()
            .ok_or(TutorialError::MissingContext { stage, key: "relationships" })
    }

    pub fn has_relationships(&self) -> bool {
        self.relationships.is_some()
    }

    pub fn set_relationships(&mut self, relationships: RelationshipMap) {
        self.relationships = Some(relationships);
    }

    pub fn chapter_order(&self, stage: &'static str) -> Result<&[usize]> {
        self.chapter_order
            .as_deref()
            .ok_or(TutorialError::MissingContext { stage, key: "chapter_order" })
    }

    pub fn set_chapter_order(&mut self, order: Vec<usize>) {
        self.chapter_order = Some(order);
    }

    pub fn chapters(&self, stage: &'static str) -> Result<&[ChapterDraft]> {
        self.chapters
            .as_deref()
            .ok_or(TutorialError::MissingContext { stage, key: "chapters" })
    }

    pub fn set_chapters(&mut self, chapters: Vec<ChapterDraft>) {
        self.chapters = Some(chapters);
    }

    pub fn final_output_dir(&self) -> Option<&PathBuf> {
        self.final_output_dir.as_ref()
    }

    pub fn set_final_output_dir(&mut self, dir: PathBuf) {
        self.final_output_dir = Some(dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_is_reported_with_stage_and_key() {
        let ctx = RunContext::new("demo", vec![]);
        let err = ctx.abstractions("analyze_relationships").unwrap_err();
        match err {
            TutorialError::MissingContext { stage, key } => {
                assert_eq!(stage, "analyze_relationships");
                assert_eq!(key, "abstractions");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn setters_overwrite() {
        let mut ctx = RunContext::new("demo", vec![]);
        ctx.set_chapter_order(vec![0, 1]);
        ctx.set_chapter_order(vec![1, 0]);
        assert_eq!(ctx.chapter_order("combine_tutorial").unwrap(), &[1, 0]);
    }

    #[test]
    fn inputs_available_from_construction() {
        let ctx = RunContext::new(
            "demo",
            vec![SourceFile::new("a.rs", "fn a() {}")],
        );
        assert_eq!(ctx.project_name(), "demo");
        assert_eq!(ctx.files().len(), 1);
        assert!(!ctx.has_relationships());
        assert!(ctx.final_output_dir().is_none());
    }
}
