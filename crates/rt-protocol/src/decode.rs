//! Field decoding for the realtime telemetry block.
//!
//! Maps fixed word offsets to physical values using per-field domain
//! checks and scale divisors. Decoding is total: any word sequence yields
//! a well-formed sample, with missing or out-of-domain fields marked
//! invalid rather than clamped.

use serde::{Deserialize, Serialize};

/// Static decode parameters for one field of the realtime block.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name for diagnostics
    pub name: &'static str,
    /// Word offset in the realtime block
    pub offset: usize,
    /// Inclusive lower raw-domain bound
    pub min: u16,
    /// Inclusive upper raw-domain bound
    pub max: u16,
    /// Divisor converting the raw integer to the physical unit
    pub divisor: f64,
}

/// Realtime block layout.
///
/// | Field | Offset | Raw domain | Divisor | Unit    |
/// |-------|--------|------------|---------|---------|
/// | RPM   | 0      | 0-16000    | 1       | rev/min |
/// | TPS   | 1      | 0-1000     | 10      | %       |
/// | MAP   | 2      | 0-2550     | 10      | kPa     |
/// | CLT   | 3      | 0-2500     | 10      | °C      |
/// | IAT   | 4      | 0-2500     | 10      | °C      |
/// | AFR   | 5      | 0-2000     | 100     | ratio   |
pub const FIELDS: [FieldSpec; 6] = [
    FieldSpec { name: "rpm", offset: 0, min: 0, max: 16000, divisor: 1.0 },
    FieldSpec { name: "tps", offset: 1, min: 0, max: 1000, divisor: 10.0 },
    FieldSpec { name: "map", offset: 2, min: 0, max: 2550, divisor: 10.0 },
    FieldSpec { name: "clt", offset: 3, min: 0, max: 2500, divisor: 10.0 },
    FieldSpec { name: "iat", offset: 4, min: 0, max: 2500, divisor: 10.0 },
    FieldSpec { name: "afr", offset: 5, min: 0, max: 2000, divisor: 100.0 },
];

/// Number of words in a full realtime block.
pub const BLOCK_WORDS: usize = FIELDS.len();

impl FieldSpec {
    /// Decode this field from a word sequence.
    ///
    /// Returns `None` when the word is missing or outside the raw domain.
    fn decode(&self, words: &[u16]) -> Option<f64> {
        let raw = *words.get(self.offset)?;
        if raw < self.min || raw > self.max {
            return None;
        }
        Some(raw as f64 / self.divisor)
    }
}

/// One decoded poll cycle.
///
/// Each field holds the calibrated physical value, or `None` when the raw
/// word was missing, out of its domain, or invalidated by the engine-off
/// policy. Values are never clamped into range.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Engine speed (rev/min)
    pub rpm: Option<f64>,
    /// Throttle position (%)
    pub tps: Option<f64>,
    /// Manifold absolute pressure (kPa)
    pub map: Option<f64>,
    /// Coolant temperature (°C)
    pub clt: Option<f64>,
    /// Intake air temperature (°C)
    pub iat: Option<f64>,
    /// Air-fuel ratio
    pub afr: Option<f64>,
}

impl TelemetrySample {
    /// True when no field carries a value.
    pub fn all_invalid(&self) -> bool {
        self.rpm.is_none()
            && self.tps.is_none()
            && self.map.is_none()
            && self.clt.is_none()
            && self.iat.is_none()
            && self.afr.is_none()
    }
}

/// Decode a word sequence into a telemetry sample.
///
/// A sequence shorter than the full block yields a sample with every
/// field invalid; no partial sample is produced.
pub fn decode_words(words: &[u16]) -> TelemetrySample {
    if words.len() < BLOCK_WORDS {
        return TelemetrySample::default();
    }

    TelemetrySample {
        rpm: FIELDS[0].decode(words),
        tps: FIELDS[1].decode(words),
        map: FIELDS[2].decode(words),
        clt: FIELDS[3].decode(words),
        iat: FIELDS[4].decode(words),
        afr: FIELDS[5].decode(words),
    }
}
