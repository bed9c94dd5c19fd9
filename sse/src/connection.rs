use crate::channel::ChannelKey;
use crate::error::{Error, ErrorKind};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::*;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What happened to a frame handed to [`Connection::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The buffer was full; the oldest frame was discarded to make room.
    DroppedOldest,
}

/// Queued frames. The first `pinned` frames are the greeting; they sit
/// outside the capacity and are never evicted.
#[derive(Default)]
struct Outbox {
    frames: VecDeque<Bytes>,
    pinned: usize,
}

impl Outbox {
    fn pop_front(&mut self) -> Option<Bytes> {
        let frame = self.frames.pop_front()?;
        self.pinned = self.pinned.saturating_sub(1);
        Some(frame)
    }

    fn clear(&mut self) {
        self.frames.clear();
        self.pinned = 0;
    }
}

/// One subscriber's open stream.
///
/// Frames are queued in a bounded buffer and drained by the transport through
/// [`Connection::recv`]. When the buffer is full the oldest frame is dropped,
/// so a slow reader never blocks the publisher and never grows memory. The
/// `open`/`ready` greeting is pinned until read and does not count against
/// the capacity.
pub struct Connection {
    id: ConnectionId,
    key: ChannelKey,
    created_at: DateTime<Utc>,
    alive: AtomicBool,
    capacity: usize,
    outbox: Mutex<Outbox>,
    ready: Notify,
    dropped: AtomicU64,
}

impl Connection {
    pub(crate) fn new(key: ChannelKey, capacity: usize) -> Self {
        Self {
            id: ConnectionId::new(),
            key,
            created_at: Utc::now(),
            alive: AtomicBool::new(true),
            capacity,
            outbox: Mutex::new(Outbox::default()),
            ready: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Number of frames discarded because the reader fell behind.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of frames waiting to be read.
    pub fn buffered(&self) -> usize {
        self.outbox.lock().frames.len()
    }

    /// Queue a greeting frame. Pinned frames are only removed by the reader.
    pub(crate) fn push_pinned(&self, frame: Bytes) -> Result<(), Error> {
        if !self.is_alive() {
            return Err(Error::new(ErrorKind::ConnectionClosed));
        }

        {
            let mut outbox = self.outbox.lock();
            // Greeting goes ahead of anything already queued.
            let at = outbox.pinned;
            outbox.frames.insert(at, frame);
            outbox.pinned += 1;
        }

        self.ready.notify_one();
        Ok(())
    }

    /// Queue a frame without blocking. Fails only when the stream is closed.
    pub(crate) fn push(&self, frame: Bytes) -> Result<Delivery, Error> {
        if !self.is_alive() {
            return Err(Error::new(ErrorKind::ConnectionClosed));
        }

        let delivery = {
            let mut outbox = self.outbox.lock();
            let unpinned = outbox.frames.len() - outbox.pinned;
            let delivery = if unpinned >= self.capacity {
                let oldest = outbox.pinned;
                outbox.frames.remove(oldest);
                Delivery::DroppedOldest
            } else {
                Delivery::Queued
            };
            outbox.frames.push_back(frame);
            delivery
        };

        if delivery == Delivery::DroppedOldest {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped == 1 {
                warn!(
                    "SSE connection {} is not keeping up, dropping oldest buffered events",
                    self.id
                );
            } else {
                debug!(
                    "Dropped buffered event for connection {} ({} total)",
                    self.id, dropped
                );
            }
        }

        self.ready.notify_one();
        Ok(delivery)
    }

    /// Wait for the next frame. Returns `None` once the connection is closed.
    pub async fn recv(&self) -> Option<Bytes> {
        loop {
            if !self.is_alive() {
                return None;
            }
            let next = self.outbox.lock().pop_front();
            if let Some(frame) = next {
                return Some(frame);
            }
            self.ready.notified().await;
        }
    }

    /// Mark the stream as closed by the client or failed by the transport.
    ///
    /// Buffered frames are discarded and any pending `recv` returns `None`.
    pub fn close(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            self.outbox.lock().clear();
            self.ready.notify_one();
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("created_at", &self.created_at)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn frame(n: u32) -> Bytes {
        Bytes::from(format!("frame-{n}"))
    }

    #[test]
    fn test_connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[tokio::test]
    async fn test_frames_are_received_in_push_order() {
        let connection = Connection::new(ChannelKey::Global, 8);
        for n in 0..3 {
            assert_eq!(connection.push(frame(n)).unwrap(), Delivery::Queued);
        }

        for n in 0..3 {
            assert_eq!(connection.recv().await, Some(frame(n)));
        }
    }

    #[tokio::test]
    async fn test_full_buffer_drops_oldest_frame() {
        let connection = Connection::new(ChannelKey::Global, 2);
        connection.push(frame(1)).unwrap();
        connection.push(frame(2)).unwrap();

        assert_eq!(connection.push(frame(3)).unwrap(), Delivery::DroppedOldest);
        assert_eq!(connection.dropped_count(), 1);
        assert_eq!(connection.buffered(), 2);
        assert_eq!(connection.recv().await, Some(frame(2)));
        assert_eq!(connection.recv().await, Some(frame(3)));
    }

    #[tokio::test]
    async fn test_pinned_frames_survive_overflow() {
        let connection = Connection::new(ChannelKey::Global, 2);
        connection.push_pinned(frame(1)).unwrap();
        connection.push_pinned(frame(2)).unwrap();

        for n in 3..=6 {
            connection.push(frame(n)).unwrap();
        }

        assert_eq!(connection.dropped_count(), 2);
        assert_eq!(connection.buffered(), 4);
        for n in [1, 2, 5, 6] {
            assert_eq!(connection.recv().await, Some(frame(n)));
        }
    }

    #[tokio::test]
    async fn test_read_greeting_no_longer_pinned() {
        let connection = Connection::new(ChannelKey::Global, 2);
        connection.push_pinned(frame(1)).unwrap();
        assert_eq!(connection.recv().await, Some(frame(1)));

        connection.push(frame(2)).unwrap();
        connection.push(frame(3)).unwrap();
        assert_eq!(connection.push(frame(4)).unwrap(), Delivery::DroppedOldest);

        assert_eq!(connection.recv().await, Some(frame(3)));
        assert_eq!(connection.recv().await, Some(frame(4)));
    }

    #[tokio::test]
    async fn test_push_after_close_fails() {
        let connection = Connection::new(ChannelKey::Global, 2);
        connection.close();

        let err = connection.push(frame(1)).unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::ConnectionClosed);
        assert!(!connection.is_alive());
    }

    #[tokio::test]
    async fn test_close_wakes_pending_reader() {
        let connection = Arc::new(Connection::new(ChannelKey::Global, 2));
        let reader = {
            let connection = connection.clone();
            tokio::spawn(async move { connection.recv().await })
        };

        tokio::task::yield_now().await;
        connection.close();

        let received = tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .expect("reader was not woken")
            .unwrap();
        assert_eq!(received, None);
    }

    #[tokio::test]
    async fn test_push_wakes_pending_reader() {
        let connection = Arc::new(Connection::new(ChannelKey::Global, 2));
        let reader = {
            let connection = connection.clone();
            tokio::spawn(async move { connection.recv().await })
        };

        tokio::task::yield_now().await;
        connection.push(frame(7)).unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .expect("reader was not woken")
            .unwrap();
        assert_eq!(received, Some(frame(7)));
    }
}
