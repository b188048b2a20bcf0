//! Headless test client for poking a running buzzer server.
//!
//! Joins with a display name, buzzes once after a short delay, then watches
//! the round for ten seconds (heartbeating so the server keeps the
//! connection alive) before disconnecting.
//!
//! Usage: `buzz_client [name] [server_addr]`

use bincode::{deserialize, serialize};
use shared::Packet;
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::time::{sleep, sleep_until, Instant};

// Get current timestamp in milliseconds
fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let name = args.next().unwrap_or_else(|| "Tester".to_string());
    let server_addr: SocketAddr = args
        .next()
        .unwrap_or_else(|| "127.0.0.1:8080".to_string())
        .parse()?;

    // Create local socket
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    // Join the game
    println!("Joining {} as '{}'", server_addr, name);
    let join_data = serialize(&Packet::Join { name: name.clone() })?;
    socket.send_to(&join_data, server_addr).await?;

    // Buffer for receiving data
    let mut buf = [0u8; 2048];

    // Wait for the registration reply
    println!("Waiting for server response...");
    let (len, _) = socket.recv_from(&mut buf).await?;
    match deserialize::<Packet>(&buf[0..len])? {
        Packet::Joined { name } => println!("Joined as '{}'", name),
        Packet::Error { message } => {
            println!("Join rejected: {}", message);
            return Ok(());
        }
        other => println!("Unexpected reply to join: {:?}", other),
    }

    // Buzz after a moment, then watch the round for a while
    sleep(Duration::from_secs(1)).await;
    println!("Sending buzz");
    let buzz_data = serialize(&Packet::Buzz { name: name.clone() })?;
    socket.send_to(&buzz_data, server_addr).await?;

    let mut heartbeat = tokio::time::interval(Duration::from_secs(2));
    let deadline = Instant::now() + Duration::from_secs(10);

    loop {
        tokio::select! {
            _ = sleep_until(deadline) => break,

            _ = heartbeat.tick() => {
                let data = serialize(&Packet::Heartbeat { timestamp: get_timestamp() })?;
                socket.send_to(&data, server_addr).await?;
            }

            result = socket.recv_from(&mut buf) => {
                let (len, _) = result?;
                match deserialize::<Packet>(&buf[0..len]) {
                    Ok(Packet::BuzzResult { position }) => {
                        println!("Buzz accepted at position #{}", position);
                    }
                    Ok(Packet::LockedOut) => println!("Locked out: someone else buzzed first"),
                    Ok(Packet::Reset) => println!("Round reset, buzzer re-armed"),
                    Ok(Packet::StateUpdate { players, buzz_order }) => {
                        println!("State update - players: {:?}, buzz order: {:?}", players, buzz_order);
                    }
                    Ok(Packet::Error { message }) => println!("Server error: {}", message),
                    Ok(other) => println!("Unexpected packet: {:?}", other),
                    Err(e) => println!("Failed to deserialize packet: {}", e),
                }
            }
        }
    }

    // Leave cleanly when done
    println!("Sending disconnect");
    let disconnect_data = serialize(&Packet::Disconnect)?;
    socket.send_to(&disconnect_data, server_addr).await?;

    println!("Test client finished");
    Ok(())
}
