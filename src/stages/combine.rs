use std::path::PathBuf;

use crate::context::RunContext;
use crate::error::Result;
use crate::output::{self, chapter_filename, TutorialArtifacts};
use crate::stage::{Stage, StageOutcome};
use crate::types::ChapterOutcome;

const NAME: &str = "combine_tutorial";

/// Stage 5: assemble the index and chapter documents and hand them to the
/// output materializer. No model call.
pub struct CombineTutorial {
    output_root: PathBuf,
}

impl CombineTutorial {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }
}

#[derive(Debug)]
pub struct CombineInput {
    artifacts: TutorialArtifacts,
}

fn render_index(
    project_name: &str,
    summary: &str,
    entries: &[(String, String, bool)],
) -> String {
    let mut index = format!("# Tutorial: {project_name}\n\n{summary}\n\n## Chapters\n\n");
    for (title, file_name, failed) in entries {
        if *failed {
            index.push_str(&format!("- [{title}]({file_name}) *(generation failed)*\n"));
        } else {
            index.push_str(&format!("- [{title}]({file_name})\n"));
        }
    }
    index
}

fn render_failed_chapter(number: usize, title: &str, reason: &str) -> String {
    format!(
        "# Chapter {number}: {title}\n\n> This chapter could not be generated: {reason}\n"
    )
}

impl Stage for CombineTutorial {
    type Prepared = CombineInput;
    type Raw = TutorialArtifacts;

    fn name(&self) -> &'static str {
        NAME
    }

    fn prepare(&self, ctx: &RunContext) -> Result<CombineInput> {
        let abstractions = ctx.abstractions(NAME)?;
        let summary = ctx.relationships(NAME)?.summary.clone();
        let drafts = ctx.chapters(NAME)?;

        let mut entries = Vec::with_capacity(drafts.len());
        let mut chapters = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let title = abstractions[draft.abstraction_index].name.clone();
            let file_name = chapter_filename(draft.number, &title);
            let content = match &draft.outcome {
                ChapterOutcome::Drafted(text) => text.clone(),
                ChapterOutcome::Failed(reason) => {
                    render_failed_chapter(draft.number, &title, reason)
                }
            };
            entries.push((title, file_name.clone(), draft.is_failed()));
            chapters.push((file_name, content));
        }

        Ok(CombineInput {
            artifacts: TutorialArtifacts {
                index: render_index(ctx.project_name(), &summary, &entries),
                chapters,
            },
        })
    }

    async fn execute(&self, input: &CombineInput) -> StageOutcome<TutorialArtifacts> {
        StageOutcome::Success(input.artifacts.clone())
    }

    fn finalize(&self, artifacts: TutorialArtifacts, ctx: &mut RunContext) -> Result<()> {
        let dir = output::materialize(&self.output_root, ctx.project_name(), &artifacts)?;
        ctx.set_final_output_dir(dir);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{run_stage, RetryPolicy};
    use crate::types::{Abstraction, ChapterDraft, RelationshipMap};
    use std::time::Duration;
    use tempfile::tempdir;

    fn ready_ctx() -> RunContext {
        let mut ctx = RunContext::new("Demo App", vec![]);
        ctx.set_abstractions(vec![
            Abstraction {
                name: "Parser".into(),
                description: "Parses input.".into(),
                file_indices: vec![],
            },
            Abstraction {
                name: "Engine".into(),
                description: "Runs things.".into(),
                file_indices: vec![],
            },
        ]);
        ctx.set_relationships(RelationshipMap {
            summary: "A demo application.".into(),
            relations: vec![],
        });
        ctx.set_chapter_order(vec![1, 0]);
        ctx.set_chapters(vec![
            ChapterDraft {
                abstraction_index: 1,
                number: 1,
                outcome: ChapterOutcome::Drafted("# Chapter 1: Engine\n\nprose".into()),
            },
            ChapterDraft {
                abstraction_index: 0,
                number: 2,
                outcome: ChapterOutcome::Failed("retries exhausted".into()),
            },
        ]);
        ctx
    }

    #[tokio::test]
    async fn combines_and_materializes() {
        let dir = tempdir().unwrap();
        let stage = CombineTutorial::new(dir.path());
        let mut ctx = ready_ctx();

        run_stage(&stage, &mut ctx, &RetryPolicy::new(1, Duration::ZERO))
            .await
            .unwrap();

        let out = ctx.final_output_dir().expect("output dir recorded").clone();
        assert_eq!(out, dir.path().join("demo_app"));

        let index = std::fs::read_to_string(out.join("index.md")).unwrap();
        assert!(index.contains("# Tutorial: Demo App"));
        assert!(index.contains("A demo application."));
        assert!(index.contains("[Engine](01_engine.md)"));
        assert!(index.contains("[Parser](02_parser.md) *(generation failed)*"));

        let engine = std::fs::read_to_string(out.join("01_engine.md")).unwrap();
        assert!(engine.contains("prose"));

        let parser = std::fs::read_to_string(out.join("02_parser.md")).unwrap();
        assert!(parser.contains("could not be generated"));
        assert!(parser.contains("retries exhausted"));
    }

    #[test]
    fn prepare_requires_chapters() {
        let stage = CombineTutorial::new("out");
        let mut ctx = RunContext::new("Demo App", vec![]);
        ctx.set_abstractions(vec![Abstraction {
            name: "Parser".into(),
            description: String::new(),
            file_indices: vec![],
        }]);
        ctx.set_relationships(RelationshipMap {
            summary: "s".into(),
            relations: vec![],
        });
        ctx.set_chapter_order(vec![0]);

        assert!(stage.prepare(&ctx).is_err());
    }
}
