use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::timeout;

use crate::adapter::Adapter;
use crate::config::TransactionConfig;
use crate::context::TransactionContext;
use crate::error::{BlockError, TxError};
use crate::hook::{Hook, HookRegistry, Phase};

tokio::task_local! {
    static CURRENT_TX: TransactionContext;
}

/// The currently active transaction context on this worker, if any. Used by
/// [`crate::tx_bus::TxAwareBus`] to decide whether a publish should queue
/// into the context or dispatch immediately.
pub fn current() -> Option<TransactionContext> {
    CURRENT_TX.try_with(|ctx| ctx.clone()).ok()
}

/// Drives the six commit-path phases (and the two rollback-path phases) of
/// a transaction against one [`Adapter`]
pub struct TransactionManager<A> {
    hooks: HookRegistry,
    adapter: A,
}

impl<A: Adapter> TransactionManager<A> {
    pub fn new(adapter: A) -> Self {
        Self { hooks: HookRegistry::new(), adapter }
    }

    pub fn register_hook(&mut self, hook: Hook) {
        self.hooks.register(hook);
    }

    /// Runs `block` inside a transaction. If a transaction is already active
    /// on this worker (the runtime's nesting case), `block` runs against the
    /// existing context instead of opening a new one; a failure there marks
    /// the outer context rollback-only and propagates, it does not retry or
    /// commit/rollback on its own.
    pub async fn execute<F, Fut, T, E>(&self, cfg: &TransactionConfig<E>, block: F) -> Result<T, TxError<E>>
    where
        F: Fn(TransactionContext) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, BlockError<E>>> + Send,
        T: Send,
        E: Send,
    {
        if let Some(outer) = current() {
            return self.execute_nested(outer, block).await;
        }
        let ctx = TransactionContext::new();
        CURRENT_TX.scope(ctx.clone(), self.execute_outermost(ctx, cfg, block)).await
    }

    async fn execute_nested<F, Fut, T, E>(&self, outer: TransactionContext, block: F) -> Result<T, TxError<E>>
    where
        F: Fn(TransactionContext) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, BlockError<E>>> + Send,
        T: Send,
        E: Send,
    {
        outer.enter_nested();
        let result = CURRENT_TX.scope(outer.clone(), block(outer.clone())).await;
        outer.exit();
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                outer.mark_rollback_only();
                Err(TxError::Block(err))
            }
        }
    }

    async fn execute_outermost<F, Fut, T, E>(
        &self,
        ctx: TransactionContext,
        cfg: &TransactionConfig<E>,
        block: F,
    ) -> Result<T, TxError<E>>
    where
        F: Fn(TransactionContext) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, BlockError<E>>> + Send,
        T: Send,
        E: Send,
    {
        let mut attempt: u32 = 1;
        loop {
            self.run_phase(Phase::BeforeBegin, &ctx).await?;
            self.adapter
                .begin(cfg.isolation)
                .await
                .map_err(|cause| TxError::AdapterFailed { operation: "begin", cause: cause.to_string() })?;
            self.run_phase(Phase::AfterBegin, &ctx).await?;

            let outcome = timeout(cfg.timeout, block(ctx.clone())).await;

            let block_result = match outcome {
                Ok(result) => result,
                Err(_elapsed) => {
                    self.roll_back(&ctx).await?;
                    return Err(TxError::Timeout);
                }
            };

            match block_result {
                Ok(_value) if ctx.is_rollback_only() => {
                    self.roll_back(&ctx).await?;
                    return Err(TxError::RollbackInitiated);
                }
                Ok(value) => {
                    self.run_phase(Phase::BeforeCommitValidation, &ctx).await?;
                    self.run_phase(Phase::BeforeCommit, &ctx).await?;
                    for queued in ctx.drain_pending() {
                        queued().await;
                    }
                    self.adapter
                        .commit()
                        .await
                        .map_err(|cause| TxError::AdapterFailed { operation: "commit", cause: cause.to_string() })?;
                    self.run_phase(Phase::AfterCommit, &ctx).await.ok();
                    return Ok(value);
                }
                Err(block_err) => {
                    if cfg.retry.should_retry(&block_err, attempt) {
                        self.roll_back(&ctx).await?;
                        let delay = cfg.retry.delay_for_attempt(attempt, sample_jitter());
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        attempt += 1;
                        continue;
                    }
                    self.roll_back(&ctx).await?;
                    if attempt >= cfg.retry.max_attempts && attempt > 1 {
                        return Err(TxError::RetriesExhausted { attempts: attempt, cause: block_err });
                    }
                    return Err(TxError::Block(block_err));
                }
            }
        }
    }

    async fn roll_back<E>(&self, ctx: &TransactionContext) -> Result<(), TxError<E>> {
        ctx.clear_pending();
        self.run_phase(Phase::OnRollback, ctx).await?;
        self.adapter
            .rollback()
            .await
            .map_err(|cause| TxError::AdapterFailed { operation: "rollback", cause: cause.to_string() })?;
        self.run_phase(Phase::AfterRollback, ctx).await.ok();
        Ok(())
    }

    async fn run_phase<E>(&self, phase: Phase, ctx: &TransactionContext) -> Result<(), TxError<E>> {
        for hook in self.hooks.for_phase(phase) {
            if let Err(cause) = hook.invoke(phase, ctx.clone()).await {
                if phase.failure_is_fatal() {
                    return Err(TxError::HookFailed { hook_id: hook.id.clone(), cause: cause.to_string() });
                }
                tracing::warn!(hook_id = %hook.id, ?phase, %cause, "hook failed in terminal phase, suppressing");
            }
        }
        if let Err(cause) = self.adapter.on_phase(phase, ctx).await {
            if phase.failure_is_fatal() {
                return Err(TxError::AdapterFailed { operation: "on_phase", cause: cause.to_string() });
            }
            tracing::warn!(?phase, %cause, "adapter on_phase failed in terminal phase, suppressing");
        }
        Ok(())
    }
}

/// A jitter sample in `[-1.0, 1.0]` drawn from the low bits of the system
/// clock. Good enough to spread out retry storms; not cryptographic and not
/// meant to be — the pack carries no `rand` dependency (see DESIGN.md).
fn sample_jitter() -> f64 {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().subsec_nanos();
    (nanos as f64 / 999_999_999.0) * 2.0 - 1.0
}
