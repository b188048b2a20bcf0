//! # Buzzer Server Library
//!
//! This library provides the authoritative server implementation for a
//! real-time quiz buzzer. Many player clients race to buzz; the first buzz
//! the server processes wins and locks the round, and every later attempt is
//! rejected until a host resets. Host clients observe the live roster and
//! buzz order without participating.
//!
//! ## Core Responsibilities
//!
//! ### Buzz Arbitration
//! The server is the single authority on buzz ordering. Arrival order at the
//! event loop is the tie-break, never client-side timestamps, which keeps
//! clock skew between clients out of the picture entirely.
//!
//! ### Connection Management
//! Handles the complete lifecycle of connections including:
//! - Join handling and player registration
//! - Host subscriptions for observer-only views
//! - Disconnection and timeout cleanup
//!
//! ### State Broadcasting
//! After every observable mutation (join, accepted buzz, reset, disconnect)
//! the server derives a snapshot of the roster and buzz order and pushes it
//! to every connection, keeping players and hosts synchronized.
//!
//! ## Architecture Design
//!
//! ### Single Event Loop
//! Receiver and timeout tasks only enqueue events into one channel; the main
//! loop that drains it is the sole place game state is mutated. This makes
//! arbitration deterministic and snapshot reads consistent without any
//! fine-grained locking of the session itself.
//!
//! ### Decoupled Delivery
//! Directed replies and broadcasts are queued to a dedicated sender task, so
//! a slow or unreachable receiver never stalls event processing.
//!
//! ## Module Organization
//!
//! ### Connections Module (`connections`)
//! Transport-level connection records: id assignment, address resolution,
//! liveness tracking, and the observer set broadcasts fan out to.
//!
//! ### Roster Module (`roster`)
//! Player records keyed by connection id: name validation, join-order
//! enumeration, and per-round buzzed flags.
//!
//! ### Round Module (`round`)
//! The round state machine: OPEN until the first buzz, LOCKED until reset,
//! with the ordered buzz list.
//!
//! ### Game Module (`game`)
//! The owned, single-instance game session that composes roster and round
//! under one consistency boundary and derives snapshots.
//!
//! ### Network Module (`network`)
//! UDP socket management, packet serialization, event routing, and the main
//! server loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     // Create a new server bound to an address with room for 64 connections
//!     let mut server = Server::new("127.0.0.1:8080", 64).await?;
//!
//!     // Start the server - this runs the event loop which:
//!     // - Registers joining players and host observers
//!     // - Arbitrates buzzes in arrival order and enforces lockout
//!     // - Broadcasts state snapshots after every mutation
//!     // - Handles disconnects and connection timeouts
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod connections;
pub mod game;
pub mod network;
pub mod roster;
pub mod round;
