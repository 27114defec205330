//! Per-record-type hook registry and chain execution.

use std::collections::HashMap;

use crate::event::{ChainOutcome, HookFlow, LifecycleEvent};

/// Continuation handed to an around hook.
///
/// Invoking it runs the remainder of the chain (any further around hooks,
/// then the core action). An around hook that returns without invoking it
/// leaves the core action unexecuted.
pub type Next<'a, R, E> = &'a mut dyn FnMut(&mut R) -> Result<ChainOutcome, E>;

type BeforeHook<R> = Box<dyn Fn(&mut R) -> HookFlow + Send + Sync>;
type AroundHook<R, E> = Box<dyn Fn(&mut R, Next<'_, R, E>) -> Result<ChainOutcome, E> + Send + Sync>;
type AfterHook<R> = Box<dyn Fn(&mut R) + Send + Sync>;

struct Chain<R, E> {
    before: Vec<BeforeHook<R>>,
    around: Vec<AroundHook<R, E>>,
    after: Vec<AfterHook<R>>,
}

impl<R, E> Default for Chain<R, E> {
    fn default() -> Self {
        Self {
            before: Vec::new(),
            around: Vec::new(),
            after: Vec::new(),
        }
    }
}

/// Ordered before/around/after hook chains, keyed by lifecycle event.
///
/// `R` is the record type the hooks observe; `E` is the error type an
/// around hook (or the core action) may propagate. Hooks run in
/// registration order. The registry never inspects hook bodies, only their
/// position and return signal.
pub struct HookRegistry<R, E> {
    chains: HashMap<LifecycleEvent, Chain<R, E>>,
}

impl<R, E> Default for HookRegistry<R, E> {
    fn default() -> Self {
        Self {
            chains: HashMap::new(),
        }
    }
}

impl<R, E> core::fmt::Debug for HookRegistry<R, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut dbg = f.debug_map();
        for (event, chain) in &self.chains {
            dbg.entry(
                &event.as_str(),
                &format_args!(
                    "before={} around={} after={}",
                    chain.before.len(),
                    chain.around.len(),
                    chain.after.len()
                ),
            );
        }
        dbg.finish()
    }
}

impl<R, E> HookRegistry<R, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a before hook to `event`'s chain. Returning `HookFlow::Abort`
    /// halts the chain.
    pub fn register_before(
        &mut self,
        event: LifecycleEvent,
        hook: impl Fn(&mut R) -> HookFlow + Send + Sync + 'static,
    ) {
        self.chains.entry(event).or_default().before.push(Box::new(hook));
    }

    /// Append an around hook to `event`'s chain. The hook wraps the rest of
    /// the chain and must invoke its continuation for the core action to run.
    pub fn register_around(
        &mut self,
        event: LifecycleEvent,
        hook: impl Fn(&mut R, Next<'_, R, E>) -> Result<ChainOutcome, E> + Send + Sync + 'static,
    ) {
        self.chains.entry(event).or_default().around.push(Box::new(hook));
    }

    /// Append an after hook to `event`'s chain. Runs only once the core
    /// action has completed.
    pub fn register_after(
        &mut self,
        event: LifecycleEvent,
        hook: impl Fn(&mut R) + Send + Sync + 'static,
    ) {
        self.chains.entry(event).or_default().after.push(Box::new(hook));
    }

    /// Run `event`'s chain around `action`.
    ///
    /// Execution order: before hooks, then around hooks each wrapping the
    /// remainder, the action innermost, after hooks last. A before-hook
    /// abort (or an around hook that never continues) yields
    /// `Ok(ChainOutcome::Aborted)`; errors from around hooks or the action
    /// propagate unchanged.
    pub fn run<F>(
        &self,
        event: LifecycleEvent,
        record: &mut R,
        mut action: F,
    ) -> Result<ChainOutcome, E>
    where
        F: FnMut(&mut R) -> Result<(), E>,
    {
        let Some(chain) = self.chains.get(&event) else {
            action(record)?;
            return Ok(ChainOutcome::Completed);
        };

        for before in &chain.before {
            if before(record) == HookFlow::Abort {
                tracing::debug!(event = event.as_str(), "before hook aborted the chain");
                return Ok(ChainOutcome::Aborted);
            }
        }

        let outcome = run_around(&chain.around, record, &mut action)?;

        if outcome.is_completed() {
            for after in &chain.after {
                after(record);
            }
        }

        Ok(outcome)
    }
}

fn run_around<R, E>(
    arounds: &[AroundHook<R, E>],
    record: &mut R,
    action: &mut dyn FnMut(&mut R) -> Result<(), E>,
) -> Result<ChainOutcome, E> {
    match arounds.split_first() {
        None => {
            action(record)?;
            Ok(ChainOutcome::Completed)
        }
        Some((head, rest)) => {
            let mut next = |r: &mut R| run_around(rest, r, action);
            head(record, &mut next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Doc {
        trail: Vec<&'static str>,
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ChainError(&'static str);

    fn registry() -> HookRegistry<Doc, ChainError> {
        HookRegistry::new()
    }

    #[test]
    fn hooks_run_in_registration_order_around_the_action() {
        let mut hooks = registry();
        hooks.register_before(LifecycleEvent::Restore, |d: &mut Doc| {
            d.trail.push("before-1");
            HookFlow::Continue
        });
        hooks.register_before(LifecycleEvent::Restore, |d: &mut Doc| {
            d.trail.push("before-2");
            HookFlow::Continue
        });
        hooks.register_around(LifecycleEvent::Restore, |d: &mut Doc, next: Next<'_, Doc, ChainError>| {
            d.trail.push("around-1:enter");
            let outcome = next(d)?;
            d.trail.push("around-1:exit");
            Ok(outcome)
        });
        hooks.register_around(LifecycleEvent::Restore, |d: &mut Doc, next: Next<'_, Doc, ChainError>| {
            d.trail.push("around-2:enter");
            let outcome = next(d)?;
            d.trail.push("around-2:exit");
            Ok(outcome)
        });
        hooks.register_after(LifecycleEvent::Restore, |d: &mut Doc| d.trail.push("after-1"));
        hooks.register_after(LifecycleEvent::Restore, |d: &mut Doc| d.trail.push("after-2"));

        let mut doc = Doc::default();
        let outcome = hooks
            .run(LifecycleEvent::Restore, &mut doc, |d| {
                d.trail.push("action");
                Ok(())
            })
            .unwrap();

        assert_eq!(outcome, ChainOutcome::Completed);
        assert_eq!(
            doc.trail,
            vec![
                "before-1",
                "before-2",
                "around-1:enter",
                "around-2:enter",
                "action",
                "around-2:exit",
                "around-1:exit",
                "after-1",
                "after-2",
            ]
        );
    }

    #[test]
    fn before_abort_skips_action_and_after_hooks() {
        let mut hooks = registry();
        hooks.register_before(LifecycleEvent::Destroy, |d: &mut Doc| {
            d.trail.push("veto");
            HookFlow::Abort
        });
        hooks.register_before(LifecycleEvent::Destroy, |d: &mut Doc| {
            d.trail.push("unreached");
            HookFlow::Continue
        });
        hooks.register_after(LifecycleEvent::Destroy, |d: &mut Doc| d.trail.push("after"));

        let mut doc = Doc::default();
        let outcome = hooks
            .run(LifecycleEvent::Destroy, &mut doc, |d| {
                d.trail.push("action");
                Ok(())
            })
            .unwrap();

        assert_eq!(outcome, ChainOutcome::Aborted);
        assert_eq!(doc.trail, vec!["veto"]);
    }

    #[test]
    fn around_hook_that_never_continues_aborts_the_chain() {
        let mut hooks = registry();
        hooks.register_around(
            LifecycleEvent::ForceDestroy,
            |d: &mut Doc, _next: Next<'_, Doc, ChainError>| {
                d.trail.push("swallowed");
                Ok(ChainOutcome::Aborted)
            },
        );
        hooks.register_after(LifecycleEvent::ForceDestroy, |d: &mut Doc| d.trail.push("after"));

        let mut doc = Doc::default();
        let outcome = hooks
            .run(LifecycleEvent::ForceDestroy, &mut doc, |d| {
                d.trail.push("action");
                Ok(())
            })
            .unwrap();

        assert_eq!(outcome, ChainOutcome::Aborted);
        assert_eq!(doc.trail, vec!["swallowed"]);
    }

    #[test]
    fn around_error_propagates_unchanged() {
        let mut hooks = registry();
        hooks.register_around(
            LifecycleEvent::Restore,
            |_d: &mut Doc, _next: Next<'_, Doc, ChainError>| Err(ChainError("boom")),
        );

        let mut doc = Doc::default();
        let err = hooks
            .run(LifecycleEvent::Restore, &mut doc, |_| Ok(()))
            .unwrap_err();
        assert_eq!(err, ChainError("boom"));
    }

    #[test]
    fn action_error_propagates_and_skips_after_hooks() {
        let mut hooks = registry();
        hooks.register_after(LifecycleEvent::Restore, |d: &mut Doc| d.trail.push("after"));

        let mut doc = Doc::default();
        let err = hooks
            .run(LifecycleEvent::Restore, &mut doc, |_| Err(ChainError("store down")))
            .unwrap_err();
        assert_eq!(err, ChainError("store down"));
        assert!(doc.trail.is_empty());
    }

    #[test]
    fn event_without_hooks_runs_the_action_directly() {
        let hooks = registry();
        let mut doc = Doc::default();
        let outcome = hooks
            .run(LifecycleEvent::Destroy, &mut doc, |d| {
                d.trail.push("action");
                Ok(())
            })
            .unwrap();

        assert_eq!(outcome, ChainOutcome::Completed);
        assert_eq!(doc.trail, vec!["action"]);
    }
}
