use rand::RngCore;
use tracing::{debug, warn};

use super::{ExportState, ForkedRng, GeneratorState, ImportState};
use crate::error::ReplayError;

/// Generator forked from a live source that can rewind to its last snapshot.
///
/// After [`rewind`](Self::rewind) the forked generator is in exactly the state captured by the
/// most recent successful [`snapshot`](Self::snapshot). When the source's family changes, the
/// fork is recreated to match before the new state is applied.
#[derive(Debug, Clone, Default)]
pub struct ReplayableRng {
    fork: Option<ForkedRng>,
    snapshot: Option<GeneratorState>,
}

impl ReplayableRng {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fork of the same family as `source`. Its state is undefined until the first
    /// snapshot.
    pub fn fork<S: ExportState + ?Sized>(source: &S) -> Self {
        Self {
            fork: source
                .export_state()
                .map(|state| ForkedRng::blank(state.family())),
            snapshot: None,
        }
    }

    /// Copy the source's current state into the fork and remember it for later rewinds.
    ///
    /// Does not advance `source`. On failure the fork is discarded, so routing falls back to
    /// the live generator.
    pub fn snapshot<S: ExportState + ?Sized>(&mut self, source: &S) -> Result<(), ReplayError> {
        let result = self.try_snapshot(source);
        if let Err(err) = &result {
            warn!(error = %err, "replay unavailable; predictions will use live randomness");
            self.fork = None;
            self.snapshot = None;
        }
        result
    }

    fn try_snapshot<S: ExportState + ?Sized>(&mut self, source: &S) -> Result<(), ReplayError> {
        let state = source
            .export_state()
            .ok_or(ReplayError::UnsupportedFamily)?;
        state.check_version()?;
        let same_family = matches!(&self.fork, Some(fork) if fork.family() == state.family());
        if same_family {
            if let Some(fork) = self.fork.as_mut() {
                fork.import_state(&state)?;
            }
        } else {
            debug!(family = ?state.family(), "recreating replay fork for new source");
            self.fork = Some(ForkedRng::from_state(&state)?);
        }
        self.snapshot = Some(state);
        Ok(())
    }

    /// Restore the fork to the last snapshot.
    pub fn rewind(&mut self) -> Result<(), ReplayError> {
        match (self.snapshot.as_ref(), self.fork.as_mut()) {
            (Some(state), Some(fork)) => fork.import_state(state),
            _ => Err(ReplayError::NoSnapshot),
        }
    }

    pub fn last_snapshot(&self) -> Option<&GeneratorState> {
        self.snapshot.as_ref()
    }

    /// Whether draws can be served from the fork.
    pub fn is_ready(&self) -> bool {
        self.fork.is_some() && self.snapshot.is_some()
    }

    pub fn generator(&mut self) -> Option<&mut ForkedRng> {
        if self.snapshot.is_none() {
            return None;
        }
        self.fork.as_mut()
    }

    /// The fork as a plain generator, if ready.
    pub fn rng(&mut self) -> Option<&mut dyn RngCore> {
        self.generator().map(|fork| fork as &mut dyn RngCore)
    }
}
