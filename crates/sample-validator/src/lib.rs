//! Engine-off Validity Inference
//!
//! A stopped crank (RPM raw word of 0, or an RPM reading that failed its
//! domain check) means some in-domain readings still describe conditions
//! that are only meaningful while the engine is turning. ECU firmware
//! variants in the field disagree on how much of the sample to discard,
//! so the choice is an explicit, named policy rather than a rule
//! hard-coded at the decode sites.

mod policy;

pub use policy::ValidityPolicy;
