use crate::channel::ChannelKey;
use crate::connection::{Connection, ConnectionId};
use crate::registry::ChannelRegistry;
use async_stream::stream;
use bytes::Bytes;
use futures::Stream;
use log::*;
use std::convert::Infallible;
use std::sync::Arc;

/// A subscriber's handle on its connection.
///
/// Dropping the subscription detaches the connection, which is how a client
/// disconnect reaches the registry: the transport drops the response stream
/// and with it this value.
pub struct Subscription {
    connection: Arc<Connection>,
    registry: Arc<ChannelRegistry>,
}

impl Subscription {
    pub(crate) fn new(connection: Arc<Connection>, registry: Arc<ChannelRegistry>) -> Self {
        Self {
            connection,
            registry,
        }
    }

    pub fn id(&self) -> &ConnectionId {
        self.connection.id()
    }

    pub fn key(&self) -> &ChannelKey {
        self.connection.key()
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Next encoded frame, or `None` once the connection is closed.
    pub async fn recv(&self) -> Option<Bytes> {
        self.connection.recv().await
    }

    /// Mark the stream as failed. The connection is detached on the next
    /// publish to its channel, or when the subscription is dropped.
    pub fn close(&self) {
        self.connection.close();
    }

    /// Turn the subscription into a body stream of SSE frames.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        stream! {
            while let Some(frame) = self.recv().await {
                yield Ok(frame);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(
            "SSE stream for connection {} on {} ended, cleaning up",
            self.connection.id(),
            self.connection.key()
        );
        self.registry.unsubscribe(self.connection.id());
    }
}
