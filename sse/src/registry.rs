use crate::channel::{Channel, ChannelKey, Emitter};
use crate::connection::{Connection, ConnectionId};
use crate::error::{Error, ErrorKind};
use crate::heartbeat;
use crate::message::Event;
use crate::poller::Poller;
use crate::settings::Settings;
use dashmap::DashMap;
use log::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio_util::task::TaskTracker;
use upstream::ResourceSource;

/// Process-wide table of channels with a secondary connection index.
///
/// Channels are created lazily by the first subscriber and removed by the
/// last unsubscribe. Membership changes on one channel are serialized by that
/// channel's lock; the teardown of an emptied channel and its removal from
/// the table happen under the same lock, so a concurrent subscriber either
/// attaches before teardown or finds the channel closed and opens a new one.
pub struct ChannelRegistry {
    /// Primary storage: one channel per key
    channels: DashMap<ChannelKey, Arc<Channel>>,

    /// Secondary index: connection -> channel key, for unsubscribe by id
    connections: DashMap<ConnectionId, ChannelKey>,

    settings: Settings,
    source: Arc<dyn ResourceSource>,
    tasks: TaskTracker,
    shutting_down: AtomicBool,
    this: Weak<ChannelRegistry>,
}

impl ChannelRegistry {
    pub fn new(settings: Settings, source: Arc<dyn ResourceSource>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            channels: DashMap::new(),
            connections: DashMap::new(),
            settings: settings.normalized(),
            source,
            tasks: TaskTracker::new(),
            shutting_down: AtomicBool::new(false),
            this: this.clone(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Create a connection and attach it to the channel for `key`, opening
    /// the channel and starting its background tasks if needed.
    pub fn subscribe(&self, key: ChannelKey) -> Result<Arc<Connection>, Error> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::ShuttingDown));
        }

        let connection = Arc::new(Connection::new(key.clone(), self.settings.buffer_capacity));
        self.connections
            .insert(connection.id().clone(), key.clone());

        loop {
            let channel = self
                .channels
                .entry(key.clone())
                .or_insert_with(|| self.open_channel(&key))
                .clone();

            match channel.attach(&connection) {
                Ok(()) => break,
                Err(e) if e.error_kind == ErrorKind::ChannelClosed => {
                    // Torn down between lookup and attach; its entry is gone or going.
                    self.channels
                        .remove_if(&key, |_, current| Arc::ptr_eq(current, &channel));
                    continue;
                }
                Err(e) => {
                    self.connections.remove(connection.id());
                    return Err(e);
                }
            }
        }

        // A shutdown that swept the table before this attach would miss it.
        if self.shutting_down.load(Ordering::SeqCst) {
            self.unsubscribe(connection.id());
            return Err(Error::new(ErrorKind::ShuttingDown));
        }

        info!("Registered SSE connection {} on {}", connection.id(), key);
        Ok(connection)
    }

    /// Detach a connection. The channel is torn down and removed when this
    /// was its last connection. Returns `false` if the id is unknown.
    pub fn unsubscribe(&self, connection_id: &ConnectionId) -> bool {
        let Some((_, key)) = self.connections.remove(connection_id) else {
            return false;
        };
        let Some(channel) = self.channels.get(&key).map(|entry| entry.value().clone()) else {
            return false;
        };

        let mut state = channel.lock();
        let Some(connection) = state.detach(connection_id) else {
            return false;
        };
        connection.close();
        info!("Unregistered SSE connection {} from {}", connection_id, key);

        if state.is_empty() {
            channel.teardown(&mut state);
            self.channels
                .remove_if(&key, |_, current| Arc::ptr_eq(current, &channel));
            info!("Closed channel {} after its last connection left", key);
        }
        true
    }

    pub(crate) fn detach_all(&self, connection_ids: &[ConnectionId]) {
        for connection_id in connection_ids {
            self.unsubscribe(connection_id);
        }
    }

    /// Publish an event to an existing channel and return how many
    /// connections it was queued for.
    ///
    /// Publishing to a key with no channel is a caller bug: callers are
    /// expected to check [`ChannelRegistry::has_channel`] first.
    pub fn publish(&self, key: &ChannelKey, event: Event) -> usize {
        let Some(channel) = self.channels.get(key).map(|entry| entry.value().clone()) else {
            error!(
                "Attempted to publish {} event to nonexistent channel {}",
                event.method().as_str(),
                key
            );
            debug_assert!(false, "publish to nonexistent channel {key}");
            return 0;
        };

        let fanout = channel.publish(&event);
        self.detach_all(&fanout.failed);
        fanout.delivered
    }

    /// Close every channel and connection and refuse new subscriptions.
    pub fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let channels: Vec<Arc<Channel>> = self
            .channels
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        for channel in channels {
            let mut state = channel.lock();
            for connection_id in channel.teardown(&mut state) {
                self.connections.remove(&connection_id);
            }
            self.channels
                .remove_if(channel.key(), |_, current| Arc::ptr_eq(current, &channel));
        }

        self.tasks.close();
        info!("SSE registry shut down");
    }

    /// Resolves once every heartbeat and poller task has exited.
    pub async fn wait_for_tasks(&self) {
        self.tasks.wait().await;
    }

    pub fn has_channel(&self, key: &ChannelKey) -> bool {
        self.channels.contains_key(key)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Background tasks still scheduled across all channels.
    pub fn active_tasks(&self) -> usize {
        self.tasks.len()
    }

    fn open_channel(&self, key: &ChannelKey) -> Arc<Channel> {
        let channel = Arc::new(Channel::new(key.clone()));
        let emitter = Emitter::new(channel.clone(), self.this.clone());

        self.tasks.spawn(heartbeat::run(
            emitter.clone(),
            self.settings.heartbeat_interval,
            channel.cancellation(),
        ));

        if let ChannelKey::Repository(repo) = key {
            let poller = Poller::new(
                repo.clone(),
                self.source.clone(),
                self.settings.poll_interval,
                self.settings.fetch_timeout,
            );
            self.tasks.spawn(poller.run(emitter, channel.cancellation()));
        }

        info!("Opened channel {}", key);
        channel
    }
}
