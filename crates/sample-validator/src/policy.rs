//! Validity policies over decoded samples.

use rt_protocol::{TelemetrySample, BLOCK_WORDS};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Engine-off invalidation policy.
///
/// Applied once per decoded sample, after per-field domain checks. The
/// engine counts as off when the RPM raw word is 0 or the RPM reading is
/// already invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityPolicy {
    /// Engine off invalidates the whole sample.
    #[default]
    SampleBlackout,
    /// Engine off zeroes RPM and invalidates MAP only; throttle,
    /// temperatures, and AFR stand, since they reflect physical state
    /// independent of crank rotation.
    PartialBlackout,
}

impl ValidityPolicy {
    /// Apply this policy to a freshly decoded sample.
    ///
    /// Short frames are left untouched: every field is already invalid
    /// and there is no RPM word to infer from.
    pub fn apply(self, words: &[u16], sample: &mut TelemetrySample) {
        if words.len() < BLOCK_WORDS {
            return;
        }

        let engine_off = words[0] == 0 || sample.rpm.is_none();
        if !engine_off {
            return;
        }

        trace!("Engine off, applying {:?}", self);
        match self {
            ValidityPolicy::SampleBlackout => {
                *sample = TelemetrySample::default();
            }
            ValidityPolicy::PartialBlackout => {
                sample.rpm = Some(0.0);
                sample.map = None;
            }
        }
    }
}
