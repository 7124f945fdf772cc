use std::path::PathBuf;
use std::time::Duration;

use crate::client::ProviderKind;

/// File patterns analyzed when the caller does not supply their own.
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &[
    "*.py", "*.js", "*.jsx", "*.ts", "*.tsx", "*.go", "*.java", "*.rs", "*.c", "*.cc", "*.cpp",
    "*.h", "*.md", "*.rst", "Dockerfile", "Makefile", "*.yaml", "*.yml", "*.toml", "*.html",
    "*.css", "*.json", "*.sql", "*.sh", "*.rb", "*.php", "*.swift", "*.kt", "*.dart", "*.proto",
];

/// Noise directories and generated files skipped by default.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "*test*",
    "tests/*",
    "docs/*",
    "examples/*",
    "dist/*",
    "build/*",
    "target/*",
    "deprecated/*",
    "legacy/*",
    ".git/*",
    ".github/*",
    ".vscode/*",
    "obj/*",
    "bin/*",
    "node_modules/*",
    "*.log",
];

/// Files larger than this (bytes) are never fed to the model.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 300_000;

/// Parameters for one tutorial generation run.
///
/// Use [`RunConfig::builder()`] for ergonomic construction, or
/// [`RunConfig::default()`] for the stock settings (Gemini provider, 300 KB
/// file cap, 3 attempts with a 10 s wait, 4 parallel chapter drafts).
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Display name of the analyzed project, used in prompts and output paths.
    pub project_name: String,

    /// Base directory artifacts are materialized under.
    pub output_dir: PathBuf,

    /// Glob-style patterns a file must match to be analyzed.
    pub include_patterns: Vec<String>,

    /// Glob-style patterns that exclude a file even when included above.
    pub exclude_patterns: Vec<String>,

    /// Per-file size cap in bytes.
    pub max_file_size: u64,

    /// Which LLM provider the gateway dispatches to.
    pub provider: ProviderKind,

    /// Whether gateway calls consult and update the prompt cache.
    pub use_cache: bool,

    /// Path of the on-disk prompt cache.
    pub cache_path: PathBuf,

    /// Directory for the dated prompt/response audit log; `None` disables it.
    pub llm_log_dir: Option<PathBuf>,

    /// Maximum attempts per stage execute (and per chapter item).
    pub max_attempts: u32,

    /// Fixed delay between attempts.
    pub retry_wait: Duration,

    /// Upper bound on concurrent chapter drafts in the batch stage.
    pub max_parallel_chapters: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            project_name: "project".to_string(),
            output_dir: PathBuf::from("output"),
            include_patterns: DEFAULT_INCLUDE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            provider: ProviderKind::GoogleGemini,
            use_cache: true,
            cache_path: PathBuf::from("llm_cache.json"),
            llm_log_dir: Some(PathBuf::from("logs")),
            max_attempts: 3,
            retry_wait: Duration::from_secs(10),
            max_parallel_chapters: 4,
        }
    }
}

impl RunConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug, Default)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.config.project_name = name.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Replace the default include pattern set.
    pub fn with_include_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.include_patterns = patterns;
        self
    }

    /// Replace the default exclude pattern set.
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.exclude_patterns = patterns;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.config.provider = provider;
        self
    }

    /// Disable the prompt cache (every call reaches the provider).
    pub fn without_cache(mut self) -> Self {
        self.config.use_cache = false;
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache_path = path.into();
        self
    }

    pub fn with_llm_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.llm_log_dir = Some(dir.into());
        self
    }

    /// Disable the prompt/response audit log.
    pub fn without_llm_log(mut self) -> Self {
        self.config.llm_log_dir = None;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn with_retry_wait(mut self, wait: Duration) -> Self {
        self.config.retry_wait = wait;
        self
    }

    pub fn with_max_parallel_chapters(mut self, n: usize) -> Self {
        self.config.max_parallel_chapters = n;
        self
    }

    /// Build the final [`RunConfig`].
    pub fn build(self) -> RunConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_stock_settings() {
        let config = RunConfig::default();
        assert_eq!(config.max_file_size, 300_000);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_wait, Duration::from_secs(10));
        assert_eq!(config.provider, ProviderKind::GoogleGemini);
        assert!(config.use_cache);
        assert!(config.include_patterns.iter().any(|p| p == "*.rs"));
        assert!(config.exclude_patterns.iter().any(|p| p == "node_modules/*"));
    }

    #[test]
    fn builder_chaining() {
        let config = RunConfig::builder()
            .with_project_name("demo")
            .with_output_dir("/tmp/out")
            .with_provider(ProviderKind::AnthropicClaude)
            .with_max_attempts(5)
            .with_retry_wait(Duration::from_millis(50))
            .with_max_parallel_chapters(2)
            .without_cache()
            .build();

        assert_eq!(config.project_name, "demo");
        assert_eq!(config.provider, ProviderKind::AnthropicClaude);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.max_parallel_chapters, 2);
        assert!(!config.use_cache);
    }
}
