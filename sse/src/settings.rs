use std::time::Duration;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_BUFFER_CAPACITY: usize = 64;

/// Smallest per-connection buffer for published events. The greeting is
/// held separately and does not use these slots.
pub const MIN_BUFFER_CAPACITY: usize = 2;

/// Shortest heartbeat or poll period; tokio intervals reject zero.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Timing and sizing knobs for the broadcast core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Time between `ping` events on every channel.
    pub heartbeat_interval: Duration,
    /// Time between upstream fetches on repository channels.
    pub poll_interval: Duration,
    /// Upper bound on a single upstream fetch; exceeding it counts as a failure.
    pub fetch_timeout: Duration,
    /// Frames buffered per connection before the oldest is dropped.
    pub buffer_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl Settings {
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Raise values below their floor so the scheduler and greeting stay valid.
    pub(crate) fn normalized(mut self) -> Self {
        self.heartbeat_interval = self.heartbeat_interval.max(MIN_INTERVAL);
        self.poll_interval = self.poll_interval.max(MIN_INTERVAL);
        self.buffer_capacity = self.buffer_capacity.max(MIN_BUFFER_CAPACITY);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(settings.poll_interval, Duration::from_secs(60));
        assert_eq!(settings.fetch_timeout, Duration::from_secs(10));
        assert_eq!(settings.buffer_capacity, 64);
    }

    #[test]
    fn test_normalized_raises_values_to_their_floor() {
        let settings = Settings::default()
            .with_heartbeat_interval(Duration::ZERO)
            .with_poll_interval(Duration::ZERO)
            .with_buffer_capacity(0)
            .normalized();

        assert_eq!(settings.heartbeat_interval, MIN_INTERVAL);
        assert_eq!(settings.poll_interval, MIN_INTERVAL);
        assert_eq!(settings.buffer_capacity, MIN_BUFFER_CAPACITY);
    }

    #[test]
    fn test_normalized_keeps_valid_values() {
        let settings = Settings::default().with_buffer_capacity(4);
        assert_eq!(settings.clone().normalized(), settings);
    }
}
