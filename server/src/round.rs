//! Round state: the lock flag and the ordered buzz list
//!
//! A round is OPEN until the first buzz is recorded, then LOCKED until an
//! explicit reset. Both the lock and the buzz list change together: locking
//! happens exactly when the list goes empty to non-empty, and only `clear`
//! reopens the round. Removing a disconnected player's entry never touches
//! the lock.

/// Result of a buzz attempt, decided by the game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuzzOutcome {
    /// Buzz recorded with its 1-based arrival rank.
    Accepted { position: u32 },
    /// Duplicate buzz from a connection already in the buzz list this round.
    /// Suppressed silently: the client double-sent before seeing its own
    /// lockout.
    AlreadyBuzzed,
    /// Round is locked and this connection has not buzzed; only that
    /// connection is told it is locked out.
    RejectedLocked,
    /// The connection never joined as a player.
    NotRegistered,
}

/// Lock flag plus buzzes in arrival-processing order
#[derive(Debug, Default)]
pub struct RoundState {
    locked: bool,
    /// (display name, connection id), unique by connection id
    buzz_order: Vec<(String, u32)>,
}

impl RoundState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the first buzz of the round has been recorded.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Returns true if this connection already buzzed this round.
    pub fn contains(&self, connection_id: u32) -> bool {
        self.buzz_order.iter().any(|(_, id)| *id == connection_id)
    }

    /// Appends a buzz and returns its 1-based position.
    ///
    /// The first buzz of the round locks it. Callers must have checked for
    /// duplicates via [`RoundState::contains`] first.
    pub fn record_buzz(&mut self, name: &str, connection_id: u32) -> u32 {
        self.buzz_order.push((name.to_string(), connection_id));
        let position = self.buzz_order.len() as u32;
        if position == 1 {
            self.locked = true;
        }
        position
    }

    /// Purges the entry for a disconnected connection, if present.
    ///
    /// The lock is deliberately left untouched: a winner dropping out does
    /// not re-open the round.
    pub fn remove(&mut self, connection_id: u32) -> bool {
        let before = self.buzz_order.len();
        self.buzz_order.retain(|(_, id)| *id != connection_id);
        self.buzz_order.len() != before
    }

    /// Re-opens the round: unlocks and clears the buzz list atomically.
    pub fn clear(&mut self) {
        self.locked = false;
        self.buzz_order.clear();
    }

    /// Display names in buzz-arrival order.
    pub fn buzz_names(&self) -> Vec<String> {
        self.buzz_order
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Returns the number of buzzes recorded this round.
    pub fn len(&self) -> usize {
        self.buzz_order.len()
    }

    /// Returns true if nobody has buzzed this round.
    pub fn is_empty(&self) -> bool {
        self.buzz_order.is_empty()
    }
}
