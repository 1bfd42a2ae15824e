//! ECU Realtime Frame Protocol
//!
//! This crate implements the wire protocol for polling an engine-management
//! unit over a half-duplex serial byte link: the realtime poll command,
//! word unpacking of raw replies, and the total decode path from words to
//! calibrated engineering-unit readings.

mod channel;
mod decode;
mod error;
mod frame;

pub use channel::{ByteChannel, ChannelConfig, MockChannel, SerialChannel};
pub use decode::{decode_words, FieldSpec, TelemetrySample, BLOCK_WORDS, FIELDS};
pub use error::EcuError;
pub use frame::{hex_dump, words_le, RESPONSE_MAX, RT_REQUEST};
