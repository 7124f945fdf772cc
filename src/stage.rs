use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::context::RunContext;
use crate::error::{GatewayError, Result, TutorialError};

/// Outcome of one `execute` attempt. Consumed immediately by the retry
/// driver; never stored in context.
#[derive(Debug)]
pub enum StageOutcome<T> {
    Success(T),
    /// Worth another attempt (network, rate limit, server hiccup).
    Retryable(TutorialError),
    /// Retrying cannot help (auth, malformed output, broken invariant).
    Fatal(TutorialError),
}

impl<T> StageOutcome<T> {
    /// Classify a gateway result: transient provider failures are retryable,
    /// everything else is fatal.
    pub fn from_gateway(result: std::result::Result<T, GatewayError>) -> Self {
        match result {
            Ok(value) => StageOutcome::Success(value),
            Err(e) if e.is_transient() => StageOutcome::Retryable(e.into()),
            Err(e) => StageOutcome::Fatal(e.into()),
        }
    }
}

/// Lifecycle of a stage under the retry/fallback driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Pending,
    Running,
    /// A retryable failure occurred and another attempt is scheduled.
    Retrying,
    Succeeded,
    /// The primary exhausted its retries and the fallback succeeded.
    FailedOver,
    Fatal,
}

/// Retry settings for `execute` attempts. `prepare` and `finalize` are never
/// retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            wait: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, wait: Duration) -> Self {
        Self { max_attempts, wait }
    }
}

/// One step of the pipeline.
///
/// * `prepare` — pure projection from context; no I/O, no mutation; missing
///   or malformed inputs are fatal.
/// * `execute` — the only step that may call the gateway or an external
///   collaborator; must be idempotent for identical input so it can be
///   retried safely.
/// * `finalize` — validates the raw result against the stage's schema and
///   writes derived fields into context; a schema violation is fatal for the
///   stage and leaves context untouched.
pub trait Stage {
    type Prepared: Send + Sync;
    type Raw: Send;

    fn name(&self) -> &'static str;

    fn prepare(&self, ctx: &RunContext) -> Result<Self::Prepared>;

    fn execute(
        &self,
        input: &Self::Prepared,
    ) -> impl Future<Output = StageOutcome<Self::Raw>> + Send;

    fn finalize(&self, raw: Self::Raw, ctx: &mut RunContext) -> Result<()>;
}

/// Drive one stage to completion under `policy`.
///
/// The transitions are `Pending -> Running -> { Succeeded | Retrying |
/// Fatal }`, with `Retrying` looping back into `Running` until the attempt
/// budget is spent. Exhaustion surfaces as [`TutorialError::StageFailed`].
pub async fn run_stage<S: Stage>(
    stage: &S,
    ctx: &mut RunContext,
    policy: &RetryPolicy,
) -> Result<StageState> {
    let mut state = StageState::Pending;
    debug!(stage = stage.name(), ?state, "preparing stage");
    let prepared = stage.prepare(ctx)?;

    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        state = StageState::Running;
        debug!(stage = stage.name(), attempt, ?state, "executing stage");

        match stage.execute(&prepared).await {
            StageOutcome::Success(raw) => {
                stage.finalize(raw, ctx)?;
                debug!(stage = stage.name(), attempt, "stage succeeded");
                return Ok(StageState::Succeeded);
            }
            StageOutcome::Fatal(e) => {
                state = StageState::Fatal;
                error!(stage = stage.name(), attempt, ?state, error = %e, "stage failed fatally");
                return Err(e);
            }
            StageOutcome::Retryable(e) if attempt < policy.max_attempts => {
                state = StageState::Retrying;
                warn!(
                    stage = stage.name(),
                    attempt,
                    max_attempts = policy.max_attempts,
                    ?state,
                    error = %e,
                    "stage attempt failed, retrying"
                );
                tokio::time::sleep(policy.wait).await;
            }
            StageOutcome::Retryable(e) => {
                state = StageState::Fatal;
                error!(
                    stage = stage.name(),
                    attempt,
                    ?state,
                    error = %e,
                    "stage exhausted retries"
                );
                return Err(TutorialError::StageFailed {
                    stage: stage.name(),
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
        }
    }
}

/// Drive `primary`, escalating to its single alternate successor when the
/// primary exhausts its retries.
///
/// Only retry exhaustion fails over; fatal errors (validation, auth) abort
/// the run directly — a different stage cannot repair malformed output.
pub async fn run_stage_with_fallback<P, F>(
    primary: &P,
    fallback: &F,
    ctx: &mut RunContext,
    policy: &RetryPolicy,
) -> Result<StageState>
where
    P: Stage,
    F: Stage,
{
    match run_stage(primary, ctx, policy).await {
        Ok(state) => Ok(state),
        Err(TutorialError::StageFailed { stage, attempts, .. }) => {
            warn!(
                stage,
                attempts,
                fallback = fallback.name(),
                "stage exhausted retries, failing over"
            );
            run_stage(fallback, ctx, policy).await?;
            Ok(StageState::FailedOver)
        }
        Err(e) => Err(e),
    }
}
