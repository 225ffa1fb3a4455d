//! Undo of known host mutations around a probe.
//!
//! The outcome resolver is a black box that may mutate host state as a side effect. Each
//! [`SideEffect`] knows how to snapshot and undo one category of such mutation; the
//! [`SideEffectRegistry`] opens a scope over all applicable effects before a probe and undoes
//! them afterwards. Mutations nobody registered for are not undone.

mod builtin;

pub use builtin::{CappedCounter, CounterCompensation, PoolOccupancy};

use anyhow::Result;
use tracing::debug;

use crate::host::ProbeSite;
use crate::logging::LogOnce;

/// A reversible category of host mutation.
pub trait SideEffect<H> {
    /// Stable name, used to rate-limit failure reports.
    fn name(&self) -> &str;

    /// Whether the effect can occur for this probe. Skipping saves work.
    fn applies(&self, host: &H, site: &ProbeSite) -> bool;

    /// Capture the state to restore. Must not have side effects of its own beyond any
    /// deliberate compensation.
    fn snapshot(&mut self, host: &mut H, site: &ProbeSite) -> Result<()>;

    /// Restore the state captured by the last snapshot.
    fn undo(&mut self, host: &mut H) -> Result<()>;
}

/// Ordered set of side effects for one host type.
pub struct SideEffectRegistry<H> {
    effects: Vec<Box<dyn SideEffect<H>>>,
    failures: LogOnce,
}

impl<H> Default for SideEffectRegistry<H> {
    fn default() -> Self {
        Self {
            effects: Vec::new(),
            failures: LogOnce::new(),
        }
    }
}

impl<H> SideEffectRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, effect: impl SideEffect<H> + 'static) {
        self.effects.push(Box::new(effect));
    }

    pub fn with_effect(mut self, effect: impl SideEffect<H> + 'static) -> Self {
        self.register(effect);
        self
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.effects.iter().map(|effect| effect.name()).collect()
    }

    /// Snapshot every applicable effect, in registration order.
    ///
    /// An effect whose snapshot fails is reported (once per effect) and left out of the scope;
    /// the others are still tracked.
    pub fn begin_scope(&mut self, host: &mut H, site: &ProbeSite) -> EffectScope {
        let mut members = Vec::with_capacity(self.effects.len());
        for (index, effect) in self.effects.iter_mut().enumerate() {
            if !effect.applies(host, site) {
                continue;
            }
            match effect.snapshot(host, site) {
                Ok(()) => members.push(index),
                Err(err) => {
                    let key = format!("{}:snapshot", effect.name());
                    self.failures.error(
                        &key,
                        &format!("failed to snapshot side effect {}: {err:#}", effect.name()),
                    );
                }
            }
        }
        EffectScope {
            members,
            ended: false,
        }
    }

    /// Undo every effect in the scope, in registration order. Idempotent.
    ///
    /// Each undo is attempted even if an earlier one failed.
    pub fn end_scope(&mut self, scope: &mut EffectScope, host: &mut H) {
        if scope.ended {
            return;
        }
        scope.ended = true;
        for &index in &scope.members {
            let Some(effect) = self.effects.get_mut(index) else {
                debug!(index, "side effect removed while its scope was open");
                continue;
            };
            if let Err(err) = effect.undo(host) {
                let key = format!("{}:undo", effect.name());
                self.failures.error(
                    &key,
                    &format!("failed to undo side effect {}: {err:#}", effect.name()),
                );
            }
        }
    }

    /// Run `probe` inside a scope. The scope is ended once `probe` returns, whatever it
    /// returned.
    pub fn with_scope<T>(
        &mut self,
        host: &mut H,
        site: &ProbeSite,
        probe: impl FnOnce(&mut H) -> T,
    ) -> T {
        let mut scope = self.begin_scope(host, site);
        let result = probe(host);
        self.end_scope(&mut scope, host);
        result
    }
}

/// Effects snapshotted for one probe; undone exactly once by [`EffectScope::end`].
#[must_use = "a scope must be ended to undo its side effects"]
#[derive(Debug)]
pub struct EffectScope {
    members: Vec<usize>,
    ended: bool,
}

impl EffectScope {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn end<H>(&mut self, registry: &mut SideEffectRegistry<H>, host: &mut H) {
        registry.end_scope(self, host);
    }
}
