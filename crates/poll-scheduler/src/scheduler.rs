//! Poll Loop Implementation

use rt_protocol::{
    decode_words, hex_dump, words_le, ByteChannel, EcuError, TelemetrySample, RESPONSE_MAX,
    RT_REQUEST,
};
use sample_validator::ValidityPolicy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Configuration for the poll scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Delay between poll requests (milliseconds)
    pub poll_interval_ms: u64,
    /// Bounded read timeout per cycle (milliseconds)
    pub read_timeout_ms: u64,
    /// Engine-off invalidation policy
    pub validity_policy: ValidityPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            read_timeout_ms: 500,
            validity_policy: ValidityPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// One sink notification per completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// Decoded sample for a cycle that got a reply
    Sample(TelemetrySample),
    /// The ECU sent nothing back this cycle
    NoResponse,
}

/// Poll loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollState {
    #[default]
    Idle,
    Requesting,
    AwaitingResponse,
    Decoding,
    Stopped,
}

/// Cooperative cancellation handle for a running scheduler.
#[derive(Debug, Clone, Default)]
pub struct PollHandle {
    stop: Arc<AtomicBool>,
}

impl PollHandle {
    /// Request the loop to stop at the next cycle boundary.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Drives the realtime request/response cadence over one byte channel.
///
/// Single-threaded and cooperative: each cycle fully completes (request,
/// bounded read, decode, emit) before the next begins, so exactly one
/// request is ever in flight on the half-duplex link.
pub struct PollScheduler {
    config: SchedulerConfig,
    handle: PollHandle,
    state: PollState,
}

impl PollScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        info!(
            "Poll scheduler created: interval {}ms, read timeout {}ms, policy {:?}",
            config.poll_interval_ms, config.read_timeout_ms, config.validity_policy
        );
        Self {
            config,
            handle: PollHandle::default(),
            state: PollState::Idle,
        }
    }

    /// Cancellation handle; clones share the same stop flag.
    pub fn handle(&self) -> PollHandle {
        self.handle.clone()
    }

    /// Current loop state.
    pub fn state(&self) -> PollState {
        self.state
    }

    /// Run the poll loop until cancelled.
    ///
    /// The channel must already be open; acquisition failure is the
    /// caller's to report, and the loop is never entered without a link.
    /// Each cycle writes the poll command, performs one bounded read,
    /// decodes, applies the validity policy, and emits one event.
    /// Cancellation is honored between cycles, never mid-decode, and
    /// closes the channel on the way out. A dropped sink ends the loop
    /// the same way.
    pub async fn run<C: ByteChannel>(
        &mut self,
        channel: &mut C,
        events: mpsc::Sender<PollEvent>,
    ) -> Result<(), EcuError> {
        info!("Starting realtime poll loop");

        while !self.handle.is_stop_requested() {
            self.state = PollState::Requesting;
            channel.write(&RT_REQUEST).await?;

            self.state = PollState::AwaitingResponse;
            let reply = channel
                .read(RESPONSE_MAX, self.config.read_timeout())
                .await?;

            self.state = PollState::Decoding;
            let event = if reply.is_empty() {
                debug!("No response this cycle");
                PollEvent::NoResponse
            } else {
                debug!("Raw reply: {}", hex_dump(&reply));
                let words = words_le(&reply);
                let mut sample = decode_words(&words);
                self.config.validity_policy.apply(&words, &mut sample);
                PollEvent::Sample(sample)
            };

            if events.send(event).await.is_err() {
                debug!("Sink closed, stopping poll loop");
                break;
            }

            self.state = PollState::Idle;
            tokio::time::sleep(self.config.poll_interval()).await;
        }

        self.state = PollState::Stopped;
        channel.close().await?;
        info!("Poll loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rt_protocol::MockChannel;

    fn frame(words: [u16; 6]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    fn stop_after(handle: PollHandle, delay: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handle.stop();
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_emits_decoded_sample() {
        let mut chan = MockChannel::new();
        chan.push_reply(frame([3000, 450, 1000, 900, 250, 1470]));

        let mut scheduler = PollScheduler::new(SchedulerConfig::default());
        let stopper = stop_after(scheduler.handle(), Duration::from_millis(150));
        let (tx, mut rx) = mpsc::channel(16);

        scheduler.run(&mut chan, tx).await.unwrap();
        stopper.await.unwrap();

        assert_eq!(scheduler.state(), PollState::Stopped);
        assert!(chan.is_closed());
        assert_eq!(chan.written()[0], RT_REQUEST.to_vec());

        match rx.recv().await.unwrap() {
            PollEvent::Sample(sample) => {
                assert_eq!(sample.rpm, Some(3000.0));
                assert_eq!(sample.tps, Some(45.0));
                assert_eq!(sample.afr, Some(14.70));
            }
            other => panic!("expected a sample, got {:?}", other),
        }
        // script exhausted, second cycle saw nothing
        assert_eq!(rx.recv().await.unwrap(), PollEvent::NoResponse);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reports_no_response() {
        let mut chan = MockChannel::new();

        let mut scheduler = PollScheduler::new(SchedulerConfig::default());
        let stopper = stop_after(scheduler.handle(), Duration::from_millis(50));
        let (tx, mut rx) = mpsc::channel(16);

        scheduler.run(&mut chan, tx).await.unwrap();
        stopper.await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), PollEvent::NoResponse);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_policy_is_applied() {
        let mut chan = MockChannel::new();
        chan.push_reply(frame([0, 450, 1000, 900, 250, 1470]));

        let config = SchedulerConfig {
            validity_policy: ValidityPolicy::PartialBlackout,
            ..Default::default()
        };
        let mut scheduler = PollScheduler::new(config);
        let stopper = stop_after(scheduler.handle(), Duration::from_millis(50));
        let (tx, mut rx) = mpsc::channel(16);

        scheduler.run(&mut chan, tx).await.unwrap();
        stopper.await.unwrap();

        match rx.recv().await.unwrap() {
            PollEvent::Sample(sample) => {
                assert_eq!(sample.rpm, Some(0.0));
                assert_eq!(sample.map, None);
                assert_eq!(sample.tps, Some(45.0));
            }
            other => panic!("expected a sample, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_cycle_emits_nothing() {
        let mut chan = MockChannel::new();
        chan.push_reply(frame([3000, 450, 1000, 900, 250, 1470]));

        let mut scheduler = PollScheduler::new(SchedulerConfig::default());
        scheduler.handle().stop();
        let (tx, mut rx) = mpsc::channel(16);

        scheduler.run(&mut chan, tx).await.unwrap();

        assert_eq!(scheduler.state(), PollState::Stopped);
        assert!(chan.written().is_empty());
        assert!(chan.is_closed());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sink_stops_loop() {
        let mut chan = MockChannel::new();
        let mut scheduler = PollScheduler::new(SchedulerConfig::default());
        let (tx, rx) = mpsc::channel(16);
        drop(rx);

        scheduler.run(&mut chan, tx).await.unwrap();

        assert_eq!(scheduler.state(), PollState::Stopped);
        assert!(chan.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cadence_one_request_per_interval() {
        let mut chan = MockChannel::new();
        let mut scheduler = PollScheduler::new(SchedulerConfig::default());
        // default interval 100ms: cycles land at t=0,100,200,300
        let stopper = stop_after(scheduler.handle(), Duration::from_millis(350));
        let (tx, mut rx) = mpsc::channel(16);

        scheduler.run(&mut chan, tx).await.unwrap();
        stopper.await.unwrap();

        assert_eq!(chan.written().len(), 4);
        for _ in 0..4 {
            assert_eq!(rx.recv().await.unwrap(), PollEvent::NoResponse);
        }
        assert!(rx.try_recv().is_err());
    }
}
