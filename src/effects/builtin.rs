use anyhow::{bail, Result};

use super::SideEffect;
use crate::host::ProbeSite;

/// Restores a counter the resolver touches.
///
/// With compensation enabled the snapshot also pre-increments the counter, for hosts that
/// normally bump it just before resolving (e.g. a cast counter incremented by the rod). A
/// direct probe bypasses that path, so it must see the value the real call would see.
pub struct CounterCompensation<H> {
    name: &'static str,
    counter: fn(&mut H) -> &mut u64,
    pre_increment: bool,
    saved: Option<u64>,
}

impl<H> CounterCompensation<H> {
    pub fn new(name: &'static str, counter: fn(&mut H) -> &mut u64) -> Self {
        Self {
            name,
            counter,
            pre_increment: true,
            saved: None,
        }
    }

    pub fn restore_only(name: &'static str, counter: fn(&mut H) -> &mut u64) -> Self {
        Self {
            pre_increment: false,
            ..Self::new(name, counter)
        }
    }
}

impl<H> SideEffect<H> for CounterCompensation<H> {
    fn name(&self) -> &str {
        self.name
    }

    fn applies(&self, _host: &H, _site: &ProbeSite) -> bool {
        true
    }

    fn snapshot(&mut self, host: &mut H, _site: &ProbeSite) -> Result<()> {
        let counter = (self.counter)(host);
        self.saved = Some(*counter);
        if self.pre_increment {
            *counter = counter.saturating_add(1);
        }
        Ok(())
    }

    fn undo(&mut self, host: &mut H) -> Result<()> {
        if let Some(saved) = self.saved.take() {
            *(self.counter)(host) = saved;
        }
        Ok(())
    }
}

/// Finds the occupancy of the pool a probe draws from, if there is one.
pub type PoolAccessor<H> = for<'a> fn(&'a mut H, &ProbeSite) -> Option<&'a mut u32>;

/// Restores the occupancy of a pool the probed tile draws from.
///
/// Checking for a pool costs as much as snapshotting it, so this always applies and the
/// lookup happens in the snapshot.
pub struct PoolOccupancy<H> {
    name: &'static str,
    pool_at: PoolAccessor<H>,
    saved: Option<(ProbeSite, u32)>,
}

impl<H> PoolOccupancy<H> {
    pub fn new(name: &'static str, pool_at: PoolAccessor<H>) -> Self {
        Self {
            name,
            pool_at,
            saved: None,
        }
    }
}

impl<H> SideEffect<H> for PoolOccupancy<H> {
    fn name(&self) -> &str {
        self.name
    }

    fn applies(&self, _host: &H, _site: &ProbeSite) -> bool {
        true
    }

    fn snapshot(&mut self, host: &mut H, site: &ProbeSite) -> Result<()> {
        self.saved = (self.pool_at)(host, site).map(|occupants| (site.clone(), *occupants));
        Ok(())
    }

    fn undo(&mut self, host: &mut H) -> Result<()> {
        // Forget the pool once undone; it may be removed before the next probe.
        let Some((site, occupants)) = self.saved.take() else {
            return Ok(());
        };
        match (self.pool_at)(host, &site) {
            Some(current) => {
                *current = occupants;
                Ok(())
            }
            None => bail!("pool at {} disappeared during probe", site.tile),
        }
    }
}

/// Lowers a capped drop counter back down if a probe raised it.
///
/// Only applies where `applies_at` holds (e.g. locations that can award the drop).
pub struct CappedCounter<H> {
    name: &'static str,
    applies_at: fn(&H, &ProbeSite) -> bool,
    counter: fn(&mut H) -> &mut u32,
    saved: Option<u32>,
}

impl<H> CappedCounter<H> {
    pub fn new(
        name: &'static str,
        applies_at: fn(&H, &ProbeSite) -> bool,
        counter: fn(&mut H) -> &mut u32,
    ) -> Self {
        Self {
            name,
            applies_at,
            counter,
            saved: None,
        }
    }
}

impl<H> SideEffect<H> for CappedCounter<H> {
    fn name(&self) -> &str {
        self.name
    }

    fn applies(&self, host: &H, site: &ProbeSite) -> bool {
        (self.applies_at)(host, site)
    }

    fn snapshot(&mut self, host: &mut H, _site: &ProbeSite) -> Result<()> {
        self.saved = Some(*(self.counter)(host));
        Ok(())
    }

    fn undo(&mut self, host: &mut H) -> Result<()> {
        if let Some(saved) = self.saved.take() {
            let current = (self.counter)(host);
            if *current > saved {
                *current = saved;
            }
        }
        Ok(())
    }
}
