//! Authoritative game session: roster and round state under one owner
//!
//! The session is the single consistency boundary for game state. It is
//! created once at server start, owned by the server, and mutated only from
//! the main event loop, so every operation observes and produces a coherent
//! roster + round pair. Buzz arbitration, disconnect cleanup, and reset all
//! touch both structures here and nowhere else.

use crate::roster::{RegisterError, Roster};
use crate::round::{BuzzOutcome, RoundState};
use log::info;

/// Derived, read-only view of the session for broadcasting.
///
/// Recomputed on demand from the roster and round; never stored.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Display names in join order
    pub players: Vec<String>,
    /// Display names in buzz-arrival order
    pub buzz_order: Vec<String>,
}

/// The single game session for this process
#[derive(Debug, Default)]
pub struct GameSession {
    roster: Roster,
    round: RoundState,
}

impl GameSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a player for a connection. See [`Roster::register`].
    pub fn register(
        &mut self,
        connection_id: u32,
        raw_name: &str,
    ) -> Result<String, RegisterError> {
        self.roster.register(connection_id, raw_name)
    }

    /// Handles a disconnect: removes the player and purges any buzz entry.
    ///
    /// Returns true if observable state changed and a snapshot broadcast is
    /// due. The round lock is never altered by a disconnect.
    pub fn unregister(&mut self, connection_id: u32) -> bool {
        let removed = self.roster.unregister(connection_id);
        if removed {
            self.round.remove(connection_id);
        }
        removed
    }

    /// Arbitrates a buzz from the given connection.
    ///
    /// Duplicate detection is by membership in the buzz list, so a player who
    /// re-registered mid-round still cannot buzz twice. Arrival order is the
    /// order calls reach this method; client timestamps play no part.
    pub fn buzz(&mut self, connection_id: u32) -> BuzzOutcome {
        let name = match self.roster.name_of(connection_id) {
            Some(name) => name.to_string(),
            None => return BuzzOutcome::NotRegistered,
        };

        if self.round.contains(connection_id) {
            return BuzzOutcome::AlreadyBuzzed;
        }

        if self.round.is_locked() {
            return BuzzOutcome::RejectedLocked;
        }

        self.roster.set_buzzed(connection_id, true);
        let position = self.round.record_buzz(&name, connection_id);
        if position == 1 {
            info!("Round locked by '{}' (connection {})", name, connection_id);
        }

        BuzzOutcome::Accepted { position }
    }

    /// Connections that must be told they are locked out after a winning
    /// buzz: every registered, not-yet-buzzed player except the winner.
    pub fn locked_out_ids(&self, exclude: u32) -> Vec<u32> {
        self.roster
            .unbuzzed_ids()
            .into_iter()
            .filter(|id| *id != exclude)
            .collect()
    }

    /// Re-opens the round and re-arms every player, unconditionally.
    pub fn reset(&mut self) {
        self.round.clear();
        self.roster.clear_buzzed();
        info!("Round reset, buzzers re-armed");
    }

    /// Computes the current snapshot. Pure: no side effects.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            players: self.roster.names(),
            buzz_order: self.round.buzz_names(),
        }
    }

    /// Returns true while the round is locked.
    pub fn is_locked(&self) -> bool {
        self.round.is_locked()
    }

    /// Returns the number of registered players.
    pub fn player_count(&self) -> usize {
        self.roster.len()
    }
}
