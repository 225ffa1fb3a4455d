//! Per-session state tables.
//!
//! Every piece of mutable prediction state belongs to exactly one session (one per local
//! player in split-screen). Nothing is shared between sessions.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u32);

impl SessionId {
    pub const PRIMARY: SessionId = SessionId(0);
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Lazily-populated table with one `T` per session.
#[derive(Debug, Clone)]
pub struct PerSession<T> {
    entries: HashMap<SessionId, T>,
}

impl<T> Default for PerSession<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: Default> PerSession<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session's value, created with `T::default()` on first use.
    pub fn get_mut(&mut self, id: SessionId) -> &mut T {
        self.entries.entry(id).or_default()
    }

    pub fn get(&self, id: SessionId) -> Option<&T> {
        self.entries.get(&id)
    }

    /// Drop the session's state; the next access starts from defaults.
    pub fn reset(&mut self, id: SessionId) {
        self.entries.remove(&id);
    }

    pub fn reset_all(&mut self) {
        self.entries.clear();
    }

    pub fn sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_are_isolated() {
        let mut table: PerSession<u32> = PerSession::new();
        *table.get_mut(SessionId(0)) += 3;
        *table.get_mut(SessionId(1)) += 5;
        assert_eq!(table.get(SessionId(0)), Some(&3));
        assert_eq!(table.get(SessionId(1)), Some(&5));
        assert_eq!(table.sessions(), vec![SessionId(0), SessionId(1)]);
    }

    #[test]
    fn test_reset_restores_default() {
        let mut table: PerSession<Vec<u8>> = PerSession::new();
        table.get_mut(SessionId::PRIMARY).push(1);
        table.reset(SessionId::PRIMARY);
        assert!(table.get(SessionId::PRIMARY).is_none());
        assert!(table.get_mut(SessionId::PRIMARY).is_empty());
    }
}
