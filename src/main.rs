use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tutorial_pipeline::{
    HttpBackend, LocalDirSource, ProviderConfig, ProviderKind, RunConfig, TutorialPipeline,
};

/// Environment-driven entry point.
///
/// * `TUTORIAL_SOURCE_DIR` — directory to analyze (required)
/// * `TUTORIAL_OUTPUT_DIR` — artifact root (default `output`)
/// * `TUTORIAL_PROJECT_NAME` — display name (default: source dir name)
/// * `TUTORIAL_PROVIDER` — `google-gemini` | `anthropic-claude` | `openai-gpt`
/// * `TUTORIAL_MAX_FILE_SIZE` — per-file byte cap
/// * `TUTORIAL_CACHE_PATH` — prompt cache file
/// * `TUTORIAL_NO_CACHE` — set to any value to bypass the cache
///
/// Provider credentials come from the provider's own variables
/// (`GEMINI_API_KEY`, `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`).
fn config_from_env() -> Result<(RunConfig, LocalDirSource)> {
    let source_dir = std::env::var("TUTORIAL_SOURCE_DIR")
        .context("TUTORIAL_SOURCE_DIR must point at the directory to analyze")?;
    let source = LocalDirSource::new(&source_dir);

    let defaults = RunConfig::default();
    let mut builder = RunConfig::builder()
        .with_project_name(
            std::env::var("TUTORIAL_PROJECT_NAME").unwrap_or_else(|_| source.project_name()),
        )
        .with_output_dir(
            std::env::var("TUTORIAL_OUTPUT_DIR")
                .unwrap_or_else(|_| defaults.output_dir.display().to_string()),
        );

    if let Ok(provider) = std::env::var("TUTORIAL_PROVIDER") {
        builder = builder.with_provider(provider.parse::<ProviderKind>()?);
    }
    if let Ok(size) = std::env::var("TUTORIAL_MAX_FILE_SIZE") {
        builder = builder.with_max_file_size(
            size.parse()
                .context("TUTORIAL_MAX_FILE_SIZE must be a byte count")?,
        );
    }
    if let Ok(path) = std::env::var("TUTORIAL_CACHE_PATH") {
        builder = builder.with_cache_path(path);
    }
    if std::env::var("TUTORIAL_NO_CACHE").is_ok() {
        builder = builder.without_cache();
    }

    Ok((builder.build(), source))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let (config, source) = config_from_env()?;

    info!(
        source = %source.root().display(),
        provider = %config.provider,
        "generating tutorial"
    );

    let backend = HttpBackend::new(
        reqwest::Client::new(),
        ProviderConfig::from_env(config.provider)?,
    );
    let pipeline = TutorialPipeline::new(config, backend);

    match pipeline.run_from_source(&source).await {
        Ok(summary) => {
            if summary.is_partial() {
                println!(
                    "tutorial written to {} with {} of {} chapters failed: {:?}",
                    summary.output_dir.display(),
                    summary.failed_chapters.len(),
                    summary.total_chapters,
                    summary.failed_chapters,
                );
            } else {
                println!(
                    "tutorial written to {} ({} chapters)",
                    summary.output_dir.display(),
                    summary.total_chapters,
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("tutorial generation failed: {e}");
            std::process::exit(1);
        }
    }
}
