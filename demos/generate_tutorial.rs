//! Generate a tutorial for a local project directory.
//!
//! ```sh
//! export GEMINI_API_KEY=...
//! cargo run --example generate_tutorial -- path/to/project
//! ```

use tutorial_pipeline::{
    HttpBackend, LocalDirSource, ProviderConfig, ProviderKind, RunConfig, TutorialPipeline,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("tutorial_pipeline=info")
        .init();

    let root = std::env::args()
        .nth(1)
        .unwrap_or_else(|| ".".to_string());
    let source = LocalDirSource::new(&root);

    let config = RunConfig::builder()
        .with_project_name(source.project_name())
        .with_provider(ProviderKind::GoogleGemini)
        .with_output_dir("output")
        .build();

    let backend = HttpBackend::new(
        reqwest::Client::new(),
        ProviderConfig::from_env(config.provider)?,
    );

    let summary = TutorialPipeline::new(config, backend)
        .run_from_source(&source)
        .await?;

    println!(
        "tutorial written to {} ({} chapters, {} failed)",
        summary.output_dir.display(),
        summary.total_chapters,
        summary.failed_chapters.len(),
    );
    Ok(())
}
