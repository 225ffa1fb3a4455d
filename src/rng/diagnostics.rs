use rand::RngCore;
use tracing::trace;

use super::{ExportState, GeneratorState};

/// Debugging aid that traces every draw made from the wrapped generator.
///
/// Install it as the live generator while predictions are enabled to find draws that bypass
/// the router. Tracing is off until [`set_enabled`](Self::set_enabled) is called, since there
/// can be hundreds of draws per tick.
#[derive(Debug, Clone)]
pub struct LoggingRng<R> {
    inner: R,
    label: &'static str,
    enabled: bool,
    draws: u64,
}

impl<R> LoggingRng<R> {
    pub fn new(inner: R, label: &'static str) -> Self {
        Self {
            inner,
            label,
            enabled: false,
            draws: 0,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Number of draws served since construction, traced or not.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn record(&mut self, kind: &'static str) {
        self.draws += 1;
        if self.enabled {
            trace!(rng = self.label, draw = self.draws, kind, "random draw");
        }
    }
}

impl<R: RngCore> RngCore for LoggingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.record("u32");
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.record("u64");
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.record("bytes");
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.record("bytes");
        self.inner.try_fill_bytes(dest)
    }
}

impl<R: ExportState> ExportState for LoggingRng<R> {
    fn export_state(&self) -> Option<GeneratorState> {
        self.inner.export_state()
    }
}
