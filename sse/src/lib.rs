//! Server-Sent Events (SSE) broadcast core.
//!
//! This crate keeps long-lived SSE streams open, multiplexes a small catalog
//! of JSON-RPC framed events to them and polls watched repositories for
//! changes.
//!
//! # Architecture
//!
//! - **Channels**: a fan-out scope, either the global scope or one per watched
//!   repository. Created by the first subscriber, destroyed with the last.
//! - **Registry**: `DashMap` of channels plus a connection index for O(1)
//!   unsubscribe by connection id.
//! - **Connections**: one per subscriber, each with a bounded buffer. When a
//!   reader falls behind the oldest buffered frame is dropped; publishers
//!   never block and memory stays bounded.
//! - **Heartbeat**: every channel pings its subscribers on a fixed interval.
//! - **Poller**: repository channels fetch upstream state on a fixed interval
//!   and announce `repo_update` only when a tracked counter changes.
//! - **Ephemeral messages**: nothing is persisted or replayed. A client that
//!   reconnects gets a fresh `open`/`ready` and only events from then on.
//!
//! # Message Flow
//!
//! 1. The web layer calls `Manager::subscribe` with a `ChannelKey`
//! 2. The registry opens the channel if needed (starting heartbeat and poller)
//!    and queues `open` then `ready` on the new connection
//! 3. Background tasks publish into the channel; each event is encoded once
//!    and the frame is queued on every attached connection
//! 4. The web layer streams frames from `Subscription::into_stream`
//! 5. When the client goes away the stream (and the `Subscription`) is
//!    dropped, the connection detaches and an empty channel is torn down
//!
//! # Wire format
//!
//! ```text
//! event: message
//! data: {"jsonrpc":"2.0","method":"ping","id":"ping-...","params":{"counter":1,"time":1700000000000}}
//!
//! ```
//!
//! # Modules
//!
//! - `channel`: ChannelKey, per-channel membership and fan-out
//! - `connection`: ConnectionId and the bounded per-connection buffer
//! - `heartbeat`: ping loop
//! - `manager`: high-level entry point (delegates to the registry)
//! - `message`: event catalog and the envelope codec
//! - `poller`: fetch-compare-announce loop
//! - `registry`: channel table and lifecycle
//! - `settings`: intervals, timeout and buffer size
//! - `subscription`: drop-guarded handle returned to the transport

pub mod channel;
pub mod connection;
pub mod error;
mod heartbeat;
pub mod manager;
pub mod message;
mod poller;
pub mod registry;
pub mod settings;
pub mod subscription;

#[cfg(test)]
mod testing;

pub use channel::ChannelKey;
pub use error::{Error, ErrorKind};
pub use manager::Manager;
pub use message::{Event, Method};
pub use settings::Settings;
pub use subscription::Subscription;
