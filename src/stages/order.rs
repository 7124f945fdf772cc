use crate::client::{CompletionBackend, LlmGateway};
use crate::context::RunContext;
use crate::error::Result;
use crate::parser;
use crate::prompt;
use crate::stage::{Stage, StageOutcome};
use crate::stages::validation;

const NAME: &str = "order_chapters";

/// Stage 3: one model call that totally orders the abstractions into a
/// teaching sequence.
pub struct OrderChapters<'a, B> {
    gateway: &'a LlmGateway<B>,
    use_cache: bool,
}

impl<'a, B> OrderChapters<'a, B> {
    pub fn new(gateway: &'a LlmGateway<B>, use_cache: bool) -> Self {
        Self { gateway, use_cache }
    }
}

#[derive(Debug)]
pub struct OrderInput {
    prompt: String,
}

impl<B: CompletionBackend> Stage for OrderChapters<'_, B> {
    type Prepared = OrderInput;
    type Raw = String;

    fn name(&self) -> &'static str {
        NAME
    }

    fn prepare(&self, ctx: &RunContext) -> Result<OrderInput> {
        let abstractions = ctx.abstractions(NAME)?;
        let relationships = ctx.relationships(NAME)?;
        Ok(OrderInput {
            prompt: prompt::order_chapters(ctx.project_name(), abstractions, relationships),
        })
    }

    async fn execute(&self, input: &OrderInput) -> StageOutcome<String> {
        StageOutcome::from_gateway(self.gateway.invoke(&input.prompt, self.use_cache).await)
    }

    fn finalize(&self, raw: String, ctx: &mut RunContext) -> Result<()> {
        let order = parser::parse_chapter_order(&raw).map_err(|e| validation(NAME, e))?;
        let count = ctx.abstractions(NAME)?.len();

        // The order must be a bijection over 0..count — a partial or
        // duplicated order is rejected, never repaired.
        if order.len() != count {
            return Err(validation(
                NAME,
                format!("order lists {} indices, expected {count}", order.len()),
            ));
        }
        let mut seen = vec![false; count];
        for &idx in &order {
            if idx >= count {
                return Err(validation(NAME, format!("index {idx} out of range 0..{count}")));
            }
            if seen[idx] {
                return Err(validation(NAME, format!("index {idx} appears more than once")));
            }
            seen[idx] = true;
        }

        ctx.set_chapter_order(order);
        Ok(())
    }
}
