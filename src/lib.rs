//! # Tutorial Pipeline
//!
//! LLM-powered codebase tutorial generator with cached, retryable pipeline
//! stages.
//!
//! Point it at a source tree and it identifies the core abstractions, infers
//! the relationships between them, orders them into a teaching sequence,
//! drafts one Markdown chapter per abstraction, and writes the result as an
//! indexed chapter set.
//!
//! ## Features
//!
//! - **Fixed five-stage pipeline** — identify → relate → order → write →
//!   combine, each stage a `prepare`/`execute`/`finalize` triple driven by a
//!   shared retry state machine
//! - **Prompt cache** — every model call goes through an exact-match
//!   persistent cache, so re-runs over the same input are free and
//!   byte-identical
//! - **Provider selection** — Gemini, Claude and GPT behind one
//!   [`CompletionBackend`] seam, chosen once at configuration time
//! - **Batch chapter drafting** — bounded concurrent fan-out with per-item
//!   retry; a failed chapter becomes a placeholder instead of aborting the
//!   run
//! - **Audit log** — every prompt/response pair is appended to a dated log
//!   file
//! - **Source boundary** — bring your own [`SourceProvider`]; a local
//!   directory walker with glob include/exclude patterns is built in
//!
//! ## Quick Start
//!
//! ```no_run
//! use tutorial_pipeline::{
//!     HttpBackend, LocalDirSource, ProviderConfig, ProviderKind, RunConfig, TutorialPipeline,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = LocalDirSource::new("path/to/project");
//!     let config = RunConfig::builder()
//!         .with_project_name(source.project_name())
//!         .with_provider(ProviderKind::GoogleGemini)
//!         .build();
//!
//!     let backend = HttpBackend::new(
//!         reqwest::Client::new(),
//!         ProviderConfig::from_env(config.provider)?,
//!     );
//!
//!     let summary = TutorialPipeline::new(config, backend)
//!         .run_from_source(&source)
//!         .await?;
//!
//!     println!("tutorial written to {}", summary.output_dir.display());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod search;
pub mod source;
pub mod stage;
pub mod stages;
pub mod types;

pub use cache::PromptCache;
pub use client::{CallLog, CompletionBackend, HttpBackend, LlmGateway, ProviderConfig, ProviderKind};
pub use config::{RunConfig, RunConfigBuilder};
pub use context::RunContext;
pub use error::{GatewayError, Result, TutorialError};
pub use output::TutorialArtifacts;
pub use pipeline::TutorialPipeline;
pub use search::{RepoSearch, SearchFilters, SortBy};
pub use source::{LocalDirSource, SourceProvider};
pub use stage::{RetryPolicy, Stage, StageOutcome, StageState};
pub use types::{
    Abstraction, ChapterDraft, ChapterOutcome, Relationship, RelationshipMap, RepoMetadata,
    RunSummary, SourceFile,
};
