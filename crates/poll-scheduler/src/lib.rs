//! Realtime Poll Scheduling
//!
//! Drives the fixed-cadence request/response loop against the ECU link
//! and emits one event per completed cycle to an mpsc sink.

mod scheduler;

pub use scheduler::{PollEvent, PollHandle, PollScheduler, PollState, SchedulerConfig};
