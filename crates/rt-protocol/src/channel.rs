//! Byte channel abstraction over the half-duplex ECU link.
//!
//! The poll loop only sees [`ByteChannel`]. [`SerialChannel`] wraps a
//! tokio-serial stream for real hardware; [`MockChannel`] serves scripted
//! or simulated replies so the rest of the stack runs without an ECU.

use crate::decode::BLOCK_WORDS;
use crate::error::EcuError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

/// Serial link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Serial port device path (e.g. "/dev/ttyUSB0" or "COM3")
    pub port: String,
    /// Baud rate; ECU variants in the field run 9600 or 115200
    pub baud_rate: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115200,
        }
    }
}

/// Half-duplex byte link to the ECU.
///
/// Exactly one request is in flight at a time: the caller writes the poll
/// command, then performs one bounded read. A read that yields no bytes
/// within the timeout is a normal outcome, not an error.
#[allow(async_fn_in_trait)]
pub trait ByteChannel {
    /// Write the full buffer to the link.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), EcuError>;

    /// Read up to `max` bytes, collecting until `timeout` elapses or the
    /// buffer fills.
    async fn read(&mut self, max: usize, timeout: Duration) -> Result<Vec<u8>, EcuError>;

    /// Release the link.
    async fn close(&mut self) -> Result<(), EcuError>;
}

/// [`ByteChannel`] backed by a tokio-serial stream.
pub struct SerialChannel {
    stream: tokio_serial::SerialStream,
    port: String,
}

impl SerialChannel {
    /// Open and configure the serial port.
    ///
    /// Acquisition failure is fatal to the caller; there is no retry.
    pub fn open(config: &ChannelConfig) -> Result<Self, EcuError> {
        let stream = tokio_serial::new(config.port.as_str(), config.baud_rate)
            .open_native_async()
            .map_err(|source| EcuError::ChannelOpen {
                port: config.port.clone(),
                source,
            })?;

        info!("Connected to ECU on {} at {} baud", config.port, config.baud_rate);

        Ok(Self {
            stream,
            port: config.port.clone(),
        })
    }
}

impl ByteChannel for SerialChannel {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), EcuError> {
        self.stream.write_all(bytes).await?;
        Ok(())
    }

    async fn read(&mut self, max: usize, timeout: Duration) -> Result<Vec<u8>, EcuError> {
        // Total-timeout semantics of a plain timed serial read: keep
        // collecting until the deadline passes or the buffer fills.
        let deadline = Instant::now() + timeout;
        let mut buf = vec![0u8; max];
        let mut filled = 0;

        while filled < max {
            match timeout_at(deadline, self.stream.read(&mut buf[filled..])).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => filled += n,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => break, // deadline reached
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }

    async fn close(&mut self) -> Result<(), EcuError> {
        debug!("Releasing serial link on {}", self.port);
        Ok(())
    }
}

/// Scripted [`ByteChannel`] for tests and hardware-free runs.
///
/// Replies are served in script order. Once the script is exhausted a
/// read returns no bytes, like an unplugged ECU. A channel built with
/// [`MockChannel::simulated`] instead synthesizes a plausible warm-idle
/// frame per poll.
#[derive(Debug, Default)]
pub struct MockChannel {
    replies: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    simulate: bool,
    cycle: u64,
    closed: bool,
}

impl MockChannel {
    /// Empty-script mock; every read reports no response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that fabricates an idling engine when the script runs dry.
    pub fn simulated() -> Self {
        info!("Using simulated ECU channel");
        Self {
            simulate: true,
            ..Self::default()
        }
    }

    /// Queue a reply for the next unanswered poll.
    pub fn push_reply(&mut self, reply: impl Into<Vec<u8>>) {
        self.replies.push_back(reply.into());
    }

    /// Every buffer written to the link so far, oldest first.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Little-endian realtime block for a gently wandering warm idle.
    fn synth_frame(cycle: u64) -> Vec<u8> {
        let wander = (cycle % 40) as u16;
        let words: [u16; BLOCK_WORDS] = [
            850 + wander * 5, // rpm
            30,               // tps 3.0 %
            980,              // map 98.0 kPa
            880 + wander,     // clt
            250,              // iat 25.0 °C
            1470,             // afr 14.70
        ];
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }
}

impl ByteChannel for MockChannel {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), EcuError> {
        self.written.push(bytes.to_vec());
        Ok(())
    }

    async fn read(&mut self, max: usize, _timeout: Duration) -> Result<Vec<u8>, EcuError> {
        let mut reply = match self.replies.pop_front() {
            Some(reply) => reply,
            None if self.simulate => Self::synth_frame(self.cycle),
            None => Vec::new(),
        };
        self.cycle += 1;
        reply.truncate(max);
        Ok(reply)
    }

    async fn close(&mut self) -> Result<(), EcuError> {
        self.closed = true;
        Ok(())
    }
}
