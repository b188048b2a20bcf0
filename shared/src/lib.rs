//! Wire protocol shared between the buzzer server and its clients.
//!
//! Every datagram carries exactly one bincode-encoded [`Packet`]. The first
//! group of variants travels client-to-server, the second server-to-client;
//! [`Packet::Reset`] is used in both directions (the host's reset request and
//! the re-arm broadcast that follows it).

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    // Client -> server
    /// Register as a player under a display name.
    Join { name: String },
    /// Subscribe as a host observer; never registers a player.
    JoinHost,
    /// Attempt to buzz. The name field is informational only; the server
    /// derives identity from the sending connection, never from the payload.
    Buzz { name: String },
    /// Re-open the round and re-arm every buzzer.
    Reset,
    /// Liveness signal so an idle connection is not timed out.
    Heartbeat { timestamp: u64 },
    /// Explicit disconnect notice.
    Disconnect,

    // Server -> client
    /// Directed reply confirming registration, echoing the trimmed name.
    Joined { name: String },
    /// Directed reply with the 1-based arrival rank of an accepted buzz.
    BuzzResult { position: u32 },
    /// Directed notice that the round is locked for this connection.
    LockedOut,
    /// Broadcast snapshot: display names in join order and buzz-arrival order.
    StateUpdate {
        players: Vec<String>,
        buzz_order: Vec<String>,
    },
    /// Directed, human-readable failure description.
    Error { message: String },
}
