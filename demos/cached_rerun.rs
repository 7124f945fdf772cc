//! Show the prompt cache making a second identical call free.
//!
//! Uses a stub backend so it runs without credentials:
//!
//! ```sh
//! cargo run --example cached_rerun
//! ```

use tutorial_pipeline::{CallLog, CompletionBackend, GatewayError, LlmGateway, PromptCache};

struct StubBackend;

impl CompletionBackend for StubBackend {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        println!("-> provider dispatched ({} chars)", prompt.len());
        Ok("stubbed response".to_string())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cache_path = std::env::temp_dir().join("tutorial_pipeline_demo_cache.json");
    let gateway = LlmGateway::new(StubBackend, PromptCache::open(&cache_path), CallLog::disabled());

    let prompt = "Summarize the role of a prompt cache in one sentence.";

    println!("first call (cache miss):");
    let first = gateway.invoke(prompt, true).await?;
    println!("   {first}");

    println!("second call (cache hit, no dispatch line above):");
    let second = gateway.invoke(prompt, true).await?;
    println!("   {second}");

    assert_eq!(first, second);
    println!("cache file: {} ({} entries)", cache_path.display(), gateway.cache().len());
    Ok(())
}
