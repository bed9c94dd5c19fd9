use crate::connection::{Connection, ConnectionId};
use crate::error::{Error, ErrorKind};
use crate::message::{self, Event};
use crate::registry::ChannelRegistry;
use log::*;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;
use upstream::RepoKey;

/// Names a fan-out scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelKey {
    /// The process-wide scope served at `/api/events`.
    Global,
    /// One scope per watched repository.
    Repository(RepoKey),
}

impl ChannelKey {
    pub fn repository(owner: impl Into<String>, name: impl Into<String>) -> Self {
        ChannelKey::Repository(RepoKey::new(owner, name))
    }

    pub fn repo(&self) -> Option<&RepoKey> {
        match self {
            ChannelKey::Global => None,
            ChannelKey::Repository(repo) => Some(repo),
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChannelKey::Global => write!(f, "global"),
            ChannelKey::Repository(repo) => write!(f, "repo:{repo}"),
        }
    }
}

/// Result of one publish on a channel.
#[derive(Debug, Default)]
pub(crate) struct Fanout {
    pub delivered: usize,
    /// Connections whose stream refused the frame; the caller detaches them.
    pub failed: Vec<ConnectionId>,
}

/// Membership of a channel. Guarded by the channel's lock so that attach,
/// detach and teardown never interleave.
pub(crate) struct ChannelState {
    connections: HashMap<ConnectionId, Arc<Connection>>,
    closed: bool,
}

impl ChannelState {
    pub fn detach(&mut self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.remove(id)
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }
}

/// A fan-out scope: the set of attached connections plus the cancellation
/// handle shared by its heartbeat and poller tasks.
pub struct Channel {
    key: ChannelKey,
    state: Mutex<ChannelState>,
    tasks: CancellationToken,
}

impl Channel {
    pub(crate) fn new(key: ChannelKey) -> Self {
        Self {
            key,
            state: Mutex::new(ChannelState {
                connections: HashMap::new(),
                closed: false,
            }),
            tasks: CancellationToken::new(),
        }
    }

    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    pub fn connection_count(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock()
    }

    /// Token the background tasks select on; cancelled at teardown.
    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.tasks.child_token()
    }

    /// Attach a connection and greet it with `open` then `ready`.
    ///
    /// Both frames are queued under the channel lock, so nothing published
    /// concurrently can land ahead of them.
    pub(crate) fn attach(&self, connection: &Arc<Connection>) -> Result<(), Error> {
        debug_assert_eq!(connection.key(), &self.key);

        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::new(ErrorKind::ChannelClosed));
        }

        let (open, ready) = Event::open_pair(self.key.repo());
        connection.push_pinned(message::encode(&open)?)?;
        connection.push_pinned(message::encode(&ready)?)?;

        state
            .connections
            .insert(connection.id().clone(), connection.clone());

        debug!(
            "Attached connection {} to channel {} ({} connected)",
            connection.id(),
            self.key,
            state.len()
        );
        Ok(())
    }

    /// Write an event to every attached connection.
    ///
    /// Each connection is isolated: a closed stream is reported back in
    /// [`Fanout::failed`] and delivery continues with the rest.
    pub(crate) fn publish(&self, event: &Event) -> Fanout {
        let frame = match message::encode(event) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode {} event: {e}", event.method().as_str());
                return Fanout::default();
            }
        };

        let state = self.state.lock();
        if state.closed {
            trace!(
                "Discarding {} event for closed channel {}",
                event.method().as_str(),
                self.key
            );
            return Fanout::default();
        }

        let mut fanout = Fanout::default();
        for (id, connection) in state.connections.iter() {
            match connection.push(frame.clone()) {
                Ok(_) => fanout.delivered += 1,
                Err(e) => {
                    warn!(
                        "Failed to send event to connection {}: {}. Connection will be detached.",
                        id, e
                    );
                    fanout.failed.push(id.clone());
                }
            }
        }
        fanout
    }

    /// Close the channel: stop its tasks and close whatever is still attached.
    ///
    /// Idempotent. Returns the ids of the connections that were closed.
    pub(crate) fn teardown(&self, state: &mut ChannelState) -> Vec<ConnectionId> {
        if state.closed {
            return Vec::new();
        }
        state.closed = true;
        self.tasks.cancel();

        state
            .connections
            .drain()
            .map(|(id, connection)| {
                connection.close();
                id
            })
            .collect()
    }
}

/// Publishing handle held by a channel's background tasks.
///
/// Connections that fail during fan-out are handed back to the registry so
/// detaching them follows the same path as a client disconnect.
#[derive(Clone)]
pub(crate) struct Emitter {
    channel: Arc<Channel>,
    registry: Weak<ChannelRegistry>,
}

impl Emitter {
    pub fn new(channel: Arc<Channel>, registry: Weak<ChannelRegistry>) -> Self {
        Self { channel, registry }
    }

    pub fn key(&self) -> &ChannelKey {
        self.channel.key()
    }

    pub fn publish(&self, event: Event) -> usize {
        let fanout = self.channel.publish(&event);
        if !fanout.failed.is_empty() {
            if let Some(registry) = self.registry.upgrade() {
                registry.detach_all(&fanout.failed);
            }
        }
        fanout.delivered
    }
}
