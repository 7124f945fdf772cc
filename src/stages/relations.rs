use crate::client::{CompletionBackend, LlmGateway};
use crate::context::RunContext;
use crate::error::Result;
use crate::parser;
use crate::prompt;
use crate::stage::{Stage, StageOutcome};
use crate::stages::validation;

const NAME: &str = "analyze_relationships";

/// Stage 2: one model call that summarizes the project and derives labeled
/// edges between the abstractions from Stage 1.
pub struct AnalyzeRelationships<'a, B> {
    gateway: &'a LlmGateway<B>,
    use_cache: bool,
}

impl<'a, B> AnalyzeRelationships<'a, B> {
    pub fn new(gateway: &'a LlmGateway<B>, use_cache: bool) -> Self {
        Self { gateway, use_cache }
    }
}

#[derive(Debug)]
pub struct RelationsInput {
    prompt: String,
}

impl<B: CompletionBackend> Stage for AnalyzeRelationships<'_, B> {
    type Prepared = RelationsInput;
    type Raw = String;

    fn name(&self) -> &'static str {
        NAME
    }

    fn prepare(&self, ctx: &RunContext) -> Result<RelationsInput> {
        let abstractions = ctx.abstractions(NAME)?;
        Ok(RelationsInput {
            prompt: prompt::analyze_relationships(ctx.project_name(), abstractions),
        })
    }

    async fn execute(&self, input: &RelationsInput) -> StageOutcome<String> {
        StageOutcome::from_gateway(self.gateway.invoke(&input.prompt, self.use_cache).await)
    }

    fn finalize(&self, raw: String, ctx: &mut RunContext) -> Result<()> {
        let map = parser::parse_relationship_map(&raw).map_err(|e| validation(NAME, e))?;

        if map.summary.is_empty() {
            return Err(validation(NAME, "project summary is empty"));
        }

        let count = ctx.abstractions(NAME)?.len();
        for edge in &map.relations {
            if edge.from_index >= count || edge.to_index >= count {
                return Err(validation(
                    NAME,
                    format!(
                        "edge {} -> {} references an unknown abstraction (only {count} exist)",
                        edge.from_index, edge.to_index
                    ),
                ));
            }
            // A labeled self-relationship carries no tutorial value; treat it
            // as malformed output rather than rendering it.
            if edge.from_index == edge.to_index {
                return Err(validation(
                    NAME,
                    format!("self-referential edge on abstraction {}", edge.from_index),
                ));
            }
        }

        ctx.set_relationships(map);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PromptCache;
    use crate::client::CallLog;
    use crate::error::{GatewayError, TutorialError};
    use crate::types::Abstraction;
    use tempfile::tempdir;

    struct CannedBackend;

    impl CompletionBackend for CannedBackend {
        async fn complete(&self, _prompt: &str) -> std::result::Result<String, GatewayError> {
            Ok(String::new())
        }
    }

    fn gateway(dir: &std::path::Path) -> LlmGateway<CannedBackend> {
        LlmGateway::new(
            CannedBackend,
            PromptCache::open(dir.join("cache.json")),
            CallLog::disabled(),
        )
    }

    fn ctx_with_abstractions(n: usize) -> RunContext {
        let mut ctx = RunContext::new("demo", vec![]);
        ctx.set_abstractions(
            (0..n)
                .map(|i| Abstraction {
                    name: format!("A{i}"),
                    description: format!("abstraction {i}"),
                    file_indices: vec![],
                })
                .collect(),
        );
        ctx
    }

    #[test]
    fn prepare_requires_abstractions() {
        let dir = tempdir().unwrap();
        let gw = gateway(dir.path());
        let stage = AnalyzeRelationships::new(&gw, true);
        let err = stage.prepare(&RunContext::new("demo", vec![])).unwrap_err();
        assert!(matches!(
            err,
            TutorialError::MissingContext { key: "abstractions", .. }
        ));
    }

    #[test]
    fn finalize_accepts_valid_edges() {
        let dir = tempdir().unwrap();
        let gw = gateway(dir.path());
        let stage = AnalyzeRelationships::new(&gw, true);
        let mut ctx = ctx_with_abstractions(2);

        let raw = r#"{"summary": "s", "relations": [{"from_index": 0, "to_index": 1, "label": "uses"}]}"#;
        stage.finalize(raw.to_string(), &mut ctx).unwrap();
        assert_eq!(ctx.relationships("t").unwrap().relations.len(), 1);
    }

    #[test]
    fn finalize_rejects_out_of_range_edge() {
        let dir = tempdir().unwrap();
        let gw = gateway(dir.path());
        let stage = AnalyzeRelationships::new(&gw, true);
        let mut ctx = ctx_with_abstractions(2);

        let raw = r#"{"summary": "s", "relations": [{"from_index": 0, "to_index": 7, "label": "uses"}]}"#;
        let err = stage.finalize(raw.to_string(), &mut ctx).unwrap_err();
        assert!(matches!(err, TutorialError::Validation { .. }));
        // on rejection the relationships field stays unset
        assert!(!ctx.has_relationships());
    }

    #[test]
    fn finalize_rejects_self_loop() {
        let dir = tempdir().unwrap();
        let gw = gateway(dir.path());
        let stage = AnalyzeRelationships::new(&gw, true);
        let mut ctx = ctx_with_abstractions(2);

        let raw = r#"{"summary": "s", "relations": [{"from_index": 1, "to_index": 1, "label": "loops"}]}"#;
        let err = stage.finalize(raw.to_string(), &mut ctx).unwrap_err();
        assert!(matches!(err, TutorialError::Validation { .. }));
        assert!(!ctx.has_relationships());
    }
}
