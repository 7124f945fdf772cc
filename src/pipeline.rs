use tracing::{info, warn};

use crate::client::{CallLog, CompletionBackend, LlmGateway};
use crate::cache::PromptCache;
use crate::config::RunConfig;
use crate::context::RunContext;
use crate::error::{Result, TutorialError};
use crate::source::SourceProvider;
use crate::stage::{run_stage, RetryPolicy};
use crate::stages::{
    AnalyzeRelationships, CombineTutorial, IdentifyAbstractions, OrderChapters, WriteChapters,
};
use crate::types::{RunSummary, SourceFile};

/// The fixed tutorial generation pipeline.
///
/// Drives the five stages strictly sequentially — each stage's `prepare`
/// depends on context the previous stage's `finalize` wrote, so stage N+1
/// never starts before stage N completes. Stages 1–3 and 5 are
/// all-or-nothing; chapter drafting (Stage 4) isolates failures per item and
/// surfaces them in the returned [`RunSummary`].
pub struct TutorialPipeline<B> {
    config: RunConfig,
    gateway: LlmGateway<B>,
}

impl<B: CompletionBackend> TutorialPipeline<B> {
    /// Compose a pipeline over `backend`, wiring the prompt cache and audit
    /// log from `config`.
    pub fn new(config: RunConfig, backend: B) -> Self {
        let cache = PromptCache::open(&config.cache_path);
        let log = match &config.llm_log_dir {
            Some(dir) => CallLog::in_dir(dir),
            None => CallLog::disabled(),
        };
        let gateway = LlmGateway::new(backend, cache, log);
        Self { config, gateway }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn gateway(&self) -> &LlmGateway<B> {
        &self.gateway
    }

    /// Fetch the file set through a source provider, then run.
    pub async fn run_from_source<S: SourceProvider>(&self, provider: &S) -> Result<RunSummary> {
        let files = provider
            .fetch(
                &self.config.include_patterns,
                &self.config.exclude_patterns,
                self.config.max_file_size,
            )
            .await?;
        self.run(files).await
    }

    /// Run the full pipeline over an already-fetched file set.
    pub async fn run(&self, files: Vec<SourceFile>) -> Result<RunSummary> {
        let policy = RetryPolicy::new(self.config.max_attempts, self.config.retry_wait);
        let use_cache = self.config.use_cache;
        let mut ctx = RunContext::new(self.config.project_name.clone(), files);

        info!(
            project = %self.config.project_name,
            files = ctx.files().len(),
            provider = %self.config.provider,
            "starting tutorial generation"
        );

        run_stage(
            &IdentifyAbstractions::new(&self.gateway, use_cache),
            &mut ctx,
            &policy,
        )
        .await?;

        run_stage(
            &AnalyzeRelationships::new(&self.gateway, use_cache),
            &mut ctx,
            &policy,
        )
        .await?;

        run_stage(
            &OrderChapters::new(&self.gateway, use_cache),
            &mut ctx,
            &policy,
        )
        .await?;

        // Retrying happens per chapter item inside the batch stage.
        run_stage(
            &WriteChapters::new(
                &self.gateway,
                use_cache,
                policy.clone(),
                self.config.max_parallel_chapters,
            ),
            &mut ctx,
            &policy,
        )
        .await?;

        run_stage(
            &CombineTutorial::new(&self.config.output_dir),
            &mut ctx,
            &policy,
        )
        .await?;

        let chapters = ctx.chapters("run")?;
        let failed_chapters: Vec<usize> = chapters
            .iter()
            .filter(|c| c.is_failed())
            .map(|c| c.number)
            .collect();
        let output_dir = ctx
            .final_output_dir()
            .cloned()
            .ok_or(TutorialError::MissingContext {
                stage: "run",
                key: "final_output_dir",
            })?;

        let summary = RunSummary {
            output_dir,
            total_chapters: chapters.len(),
            failed_chapters,
        };

        if summary.is_partial() {
            warn!(
                failed = summary.failed_chapters.len(),
                total = summary.total_chapters,
                "tutorial generated with failed chapters"
            );
        } else {
            info!(
                chapters = summary.total_chapters,
                dir = %summary.output_dir.display(),
                "tutorial generated"
            );
        }

        Ok(summary)
    }
}
