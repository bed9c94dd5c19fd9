use crate::channel::ChannelKey;
use crate::connection::ConnectionId;
use crate::error::Error;
use crate::message::Event;
use crate::registry::ChannelRegistry;
use crate::settings::Settings;
use crate::subscription::Subscription;
use log::*;
use std::sync::Arc;
use upstream::ResourceSource;

/// Entry point used by the web layer. Delegates to [`ChannelRegistry`].
pub struct Manager {
    registry: Arc<ChannelRegistry>,
}

impl Manager {
    pub fn new(settings: Settings, source: Arc<dyn ResourceSource>) -> Self {
        Self {
            registry: ChannelRegistry::new(settings, source),
        }
    }

    /// Subscribe to a channel. The returned subscription already holds the
    /// `open` and `ready` frames.
    pub fn subscribe(&self, key: ChannelKey) -> Result<Subscription, Error> {
        let connection = self.registry.subscribe(key)?;
        Ok(Subscription::new(connection, self.registry.clone()))
    }

    /// Detach a connection by ID
    pub fn unsubscribe(&self, connection_id: &ConnectionId) {
        self.registry.unsubscribe(connection_id);
    }

    /// Publish an event to every connection on an existing channel.
    pub fn publish(&self, key: &ChannelKey, event: Event) -> usize {
        self.registry.publish(key, event)
    }

    /// Close every stream, stop every background task and wait for them to exit.
    pub async fn shutdown(&self) {
        info!(
            "Shutting down SSE manager ({} channel(s), {} connection(s))",
            self.registry.channel_count(),
            self.registry.connection_count()
        );
        self.registry.shutdown();
        self.registry.wait_for_tasks().await;
    }

    pub fn settings(&self) -> &Settings {
        self.registry.settings()
    }

    pub fn has_channel(&self, key: &ChannelKey) -> bool {
        self.registry.has_channel(key)
    }

    pub fn channel_count(&self) -> usize {
        self.registry.channel_count()
    }

    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    /// Heartbeat and poller tasks still scheduled. Zero once every channel is gone.
    pub fn active_tasks(&self) -> usize {
        self.registry.active_tasks()
    }
}
