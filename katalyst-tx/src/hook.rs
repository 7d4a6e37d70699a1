use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::TransactionContext;

/// A point in the transaction lifecycle a hook can attach to
///
/// The commit path runs `BeforeBegin -> AfterBegin -> BeforeCommitValidation
/// -> BeforeCommit -> AfterCommit`; the rollback path, taken instead of the
/// commit phases whenever the block fails, retries are exhausted, or the
/// context is marked rollback-only, runs `OnRollback -> AfterRollback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BeforeBegin,
    AfterBegin,
    BeforeCommitValidation,
    BeforeCommit,
    AfterCommit,
    OnRollback,
    AfterRollback,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::BeforeBegin,
        Phase::AfterBegin,
        Phase::BeforeCommitValidation,
        Phase::BeforeCommit,
        Phase::AfterCommit,
        Phase::OnRollback,
        Phase::AfterRollback,
    ];

    /// `AFTER_COMMIT` and `AFTER_ROLLBACK` hook failures are logged and
    /// suppressed rather than aborting the transaction, which has already
    /// committed or rolled back by the time they run (see DESIGN.md's Open
    /// Question decision on this point).
    pub fn failure_is_fatal(&self) -> bool {
        !matches!(self, Phase::AfterCommit | Phase::AfterRollback)
    }
}

pub type HookError = Box<dyn std::error::Error + Send + Sync>;

type HookFn = Arc<
    dyn Fn(Phase, TransactionContext) -> Pin<Box<dyn Future<Output = Result<(), HookError>> + Send>>
        + Send
        + Sync,
>;

/// A registered hook: the phases it runs on, its priority (higher runs
/// first), and the handler itself.
#[derive(Clone)]
pub struct Hook {
    pub id: String,
    phases: Vec<Phase>,
    priority: i32,
    handler: HookFn,
}

impl Hook {
    pub fn new<F, Fut>(id: impl Into<String>, phases: Vec<Phase>, priority: i32, handler: F) -> Self
    where
        F: Fn(Phase, TransactionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            phases,
            priority,
            handler: Arc::new(move |phase, ctx| Box::pin(handler(phase, ctx))),
        }
    }

    pub fn runs_on(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }

    pub async fn invoke(&self, phase: Phase, ctx: TransactionContext) -> Result<(), HookError> {
        (self.handler)(phase, ctx).await
    }
}

/// Hooks registered against a [`crate::manager::TransactionManager`],
/// ordered by descending priority within each phase ("hooks
/// within a phase dispatch through the HookRegistry in descending
/// priority"); ties are broken by registration order.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Hook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Hook) {
        self.hooks.push(hook);
    }

    /// Hooks for `phase`, stably sorted by descending priority (registration
    /// order preserved among equal priorities since the sort is stable and
    /// the source vector is already in registration order).
    pub fn for_phase(&self, phase: Phase) -> Vec<&Hook> {
        let mut matching: Vec<&Hook> = self.hooks.iter().filter(|h| h.runs_on(phase)).collect();
        matching.sort_by_key(|h| std::cmp::Reverse(h.priority));
        matching
    }
}
