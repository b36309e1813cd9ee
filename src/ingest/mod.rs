//! Decoding of raw ingress records into typed traffic events.

pub mod record;

pub use record::{decode, MalformedRecord, TrafficEvent, FIELD_DELIMITER};
