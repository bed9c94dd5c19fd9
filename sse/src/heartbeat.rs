//! Periodic `ping` emission for a live channel.

use crate::channel::Emitter;
use crate::message::Event;
use log::*;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Emit a ping every `period` until `cancel` fires.
///
/// The first ping is due one period after the channel opens; `open` and
/// `ready` already told the subscriber the stream is alive. Late ticks are
/// delayed rather than bursted, so a stalled publisher never builds a backlog.
pub(crate) async fn run(emitter: Emitter, period: Duration, cancel: CancellationToken) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(
        "Heartbeat started for channel {} every {:?}",
        emitter.key(),
        period
    );

    let mut counter: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        counter += 1;
        let delivered = emitter.publish(Event::ping(counter));
        trace!(
            "Sent ping {} on channel {} to {} connection(s)",
            counter,
            emitter.key(),
            delivered
        );
    }

    debug!(
        "Heartbeat stopped for channel {} after {} ping(s)",
        emitter.key(),
        counter
    );
}
