use crate::client::{CompletionBackend, LlmGateway};
use crate::context::RunContext;
use crate::error::Result;
use crate::parser;
use crate::prompt;
use crate::stage::{Stage, StageOutcome};
use crate::stages::validation;

const NAME: &str = "identify_abstractions";

/// Stage 1: one model call that names the codebase's core abstractions.
pub struct IdentifyAbstractions<'a, B> {
    gateway: &'a LlmGateway<B>,
    use_cache: bool,
}

impl<'a, B> IdentifyAbstractions<'a, B> {
    pub fn new(gateway: &'a LlmGateway<B>, use_cache: bool) -> Self {
        Self { gateway, use_cache }
    }
}

#[derive(Debug)]
pub struct IdentifyInput {
    prompt: String,
}

impl<B: CompletionBackend> Stage for IdentifyAbstractions<'_, B> {
    type Prepared = IdentifyInput;
    type Raw = String;

    fn name(&self) -> &'static str {
        NAME
    }

    fn prepare(&self, ctx: &RunContext) -> Result<IdentifyInput> {
        if ctx.files().is_empty() {
            return Err(validation(NAME, "source file set is empty"));
        }
        Ok(IdentifyInput {
            prompt: prompt::identify_abstractions(ctx.project_name(), ctx.files()),
        })
    }

    async fn execute(&self, input: &IdentifyInput) -> StageOutcome<String> {
        StageOutcome::from_gateway(self.gateway.invoke(&input.prompt, self.use_cache).await)
    }

    fn finalize(&self, raw: String, ctx: &mut RunContext) -> Result<()> {
        let abstractions =
            parser::parse_abstractions(&raw).map_err(|e| validation(NAME, e))?;

        if abstractions.is_empty() {
            return Err(validation(NAME, "model returned no abstractions"));
        }

        let file_count = ctx.files().len();
        for (i, abstraction) in abstractions.iter().enumerate() {
            if abstraction.name.is_empty() {
                return Err(validation(NAME, format!("abstraction {i} has an empty name")));
            }
            if let Some(bad) = abstraction
                .file_indices
                .iter()
                .find(|&&idx| idx >= file_count)
            {
                return Err(validation(
                    NAME,
                    format!(
                        "abstraction '{}' references file index {bad} but only {file_count} files are known",
                        abstraction.name
                    ),
                ));
            }
        }

        ctx.set_abstractions(abstractions);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PromptCache;
    use crate::client::CallLog;
    use crate::error::{GatewayError, TutorialError};
    use crate::types::SourceFile;
    use tempfile::tempdir;

    struct CannedBackend(String);

    impl CompletionBackend for CannedBackend {
        async fn complete(&self, _prompt: &str) -> std::result::Result<String, GatewayError> {
            Ok(self.0.clone())
        }
    }

    fn gateway(dir: &std::path::Path, response: &str) -> LlmGateway<CannedBackend> {
        LlmGateway::new(
            CannedBackend(response.to_string()),
            PromptCache::open(dir.join("cache.json")),
            CallLog::disabled(),
        )
    }

    fn ctx_with_files(n: usize) -> RunContext {
        let files = (0..n)
            .map(|i| SourceFile::new(format!("src/f{i}.rs"), format!("// file {i}")))
            .collect();
        RunContext::new("demo", files)
    }

    #[test]
    fn prepare_rejects_empty_file_set() {
        let dir = tempdir().unwrap();
        let gw = gateway(dir.path(), "[]");
        let stage = IdentifyAbstractions::new(&gw, true);
        let err = stage.prepare(&RunContext::new("demo", vec![])).unwrap_err();
        assert!(matches!(err, TutorialError::Validation { .. }));
    }

    #[test]
    fn finalize_accepts_valid_abstractions() {
        let dir = tempdir().unwrap();
        let gw = gateway(dir.path(), "");
        let stage = IdentifyAbstractions::new(&gw, true);
        let mut ctx = ctx_with_files(3);

        let raw = r#"[{"name": "Core", "description": "The core.", "file_indices": [0, 2]}]"#;
        stage.finalize(raw.to_string(), &mut ctx).unwrap();

        let abstractions = ctx.abstractions("test").unwrap();
        assert_eq!(abstractions.len(), 1);
        assert_eq!(abstractions[0].name, "Core");
    }

    #[test]
    fn finalize_rejects_out_of_range_file_index() {
        let dir = tempdir().unwrap();
        let gw = gateway(dir.path(), "");
        let stage = IdentifyAbstractions::new(&gw, true);
        let mut ctx = ctx_with_files(2);

        let raw = r#"[{"name": "Core", "description": "d", "file_indices": [5]}]"#;
        let err = stage.finalize(raw.to_string(), &mut ctx).unwrap_err();
        assert!(matches!(err, TutorialError::Validation { .. }));
        assert!(ctx.abstractions("test").is_err());
    }

    #[test]
    fn finalize_rejects_empty_list() {
        let dir = tempdir().unwrap();
        let gw = gateway(dir.path(), "");
        let stage = IdentifyAbstractions::new(&gw, true);
        let mut ctx = ctx_with_files(1);
        assert!(stage.finalize("[]".to_string(), &mut ctx).is_err());
    }

    #[tokio::test]
    async fn execute_goes_through_gateway() {
        let dir = tempdir().unwrap();
        let response = r#"[{"name": "A", "description": "d", "file_indices": [0]}]"#;
        let gw = gateway(dir.path(), response);
        let stage = IdentifyAbstractions::new(&gw, true);
        let ctx = ctx_with_files(1);

        let input = stage.prepare(&ctx).unwrap();
        match stage.execute(&input).await {
            StageOutcome::Success(raw) => assert_eq!(raw, response),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
