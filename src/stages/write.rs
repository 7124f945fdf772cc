use futures::StreamExt;
use tracing::{error, warn};

use crate::client::{CompletionBackend, LlmGateway};
use crate::context::RunContext;
use crate::error::Result;
use crate::prompt::{self, ChapterPromptInput};
use crate::stage::{RetryPolicy, Stage, StageOutcome};
use crate::stages::validation;
use crate::types::{ChapterDraft, ChapterOutcome};

const NAME: &str = "write_chapters";

/// Stage 4 (batch): one model call per ordered abstraction.
///
/// Items are drafted concurrently up to `max_parallel`, each with its own
/// retry budget. One item exhausting its retries becomes a
/// [`ChapterOutcome::Failed`] placeholder and never aborts its siblings —
/// the run continues and reports partial success. Results are re-sequenced
/// into chapter order after collection, whatever order they completed in.
pub struct WriteChapters<'a, B> {
    gateway: &'a LlmGateway<B>,
    use_cache: bool,
    policy: RetryPolicy,
    max_parallel: usize,
}

impl<'a, B> WriteChapters<'a, B> {
    pub fn new(
        gateway: &'a LlmGateway<B>,
        use_cache: bool,
        policy: RetryPolicy,
        max_parallel: usize,
    ) -> Self {
        Self {
            gateway,
            use_cache,
            policy,
            max_parallel,
        }
    }
}

/// One unit of batch work, fully rendered during `prepare`.
#[derive(Debug, Clone)]
pub struct ChapterItem {
    pub number: usize,
    pub abstraction_index: usize,
    pub prompt: String,
}

impl<B: CompletionBackend> WriteChapters<'_, B> {
    async fn draft_one(&self, item: &ChapterItem) -> ChapterDraft {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.gateway.invoke(&item.prompt, self.use_cache).await {
                Ok(text) => {
                    return ChapterDraft {
                        abstraction_index: item.abstraction_index,
                        number: item.number,
                        outcome: ChapterOutcome::Drafted(text),
                    }
                }
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    warn!(
                        stage = NAME,
                        chapter = item.number,
                        attempt,
                        error = %e,
                        "chapter draft failed, retrying"
                    );
                    tokio::time::sleep(self.policy.wait).await;
                }
                Err(e) => {
                    error!(
                        stage = NAME,
                        chapter = item.number,
                        attempt,
                        error = %e,
                        "chapter draft failed permanently"
                    );
                    return ChapterDraft {
                        abstraction_index: item.abstraction_index,
                        number: item.number,
                        outcome: ChapterOutcome::Failed(e.to_string()),
                    };
                }
            }
        }
    }
}

impl<B: CompletionBackend> Stage for WriteChapters<'_, B> {
    type Prepared = Vec<ChapterItem>;
    type Raw = Vec<ChapterDraft>;

    fn name(&self) -> &'static str {
        NAME
    }

    fn prepare(&self, ctx: &RunContext) -> Result<Vec<ChapterItem>> {
        let abstractions = ctx.abstractions(NAME)?;
        let relationships = ctx.relationships(NAME)?;
        let order = ctx.chapter_order(NAME)?;

        let outline: Vec<String> = order
            .iter()
            .map(|&idx| abstractions[idx].name.clone())
            .collect();

        let items = order
            .iter()
            .enumerate()
            .map(|(position, &idx)| {
                let abstraction = &abstractions[idx];
                let related: Vec<(&str, &str, bool)> = relationships
                    .relations
                    .iter()
                    .filter_map(|r| {
                        if r.from_index == idx {
                            Some((abstractions[r.to_index].name.as_str(), r.label.as_str(), true))
                        } else if r.to_index == idx {
                            Some((abstractions[r.from_index].name.as_str(), r.label.as_str(), false))
                        } else {
                            None
                        }
                    })
                    .collect();

                let number = position + 1;
                ChapterItem {
                    number,
                    abstraction_index: idx,
                    prompt: prompt::write_chapter(&ChapterPromptInput {
                        project_name: ctx.project_name(),
                        chapter_number: number,
                        abstraction,
                        related,
                        outline: &outline,
                    }),
                }
            })
            .collect();

        Ok(items)
    }

    async fn execute(&self, items: &Vec<ChapterItem>) -> StageOutcome<Vec<ChapterDraft>> {
        // Fan out across items, then re-sequence: completion order is
        // whatever the network gives us, `chapters` must follow chapter_order.
        let mut futs = Vec::new();
        for (position, item) in items.iter().enumerate() {
            futs.push(async move { (position, self.draft_one(item).await) });
        }
        let mut collected: Vec<(usize, ChapterDraft)> =
            futures::stream::iter(futs)
                .buffer_unordered(self.max_parallel.max(1))
                .collect()
                .await;

        collected.sort_by_key(|(position, _)| *position);
        StageOutcome::Success(collected.into_iter().map(|(_, draft)| draft).collect())
    }

    fn finalize(&self, drafts: Vec<ChapterDraft>, ctx: &mut RunContext) -> Result<()> {
        let expected = ctx.chapter_order(NAME)?.len();
        if drafts.len() != expected {
            return Err(validation(
                NAME,
                format!("{} drafts for {expected} ordered chapters", drafts.len()),
            ));
        }
        ctx.set_chapters(drafts);
        Ok(())
    }
}
