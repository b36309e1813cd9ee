use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between the three fields of a raw record.
pub const FIELD_DELIMITER: char = '|';

const FIELD_COUNT: usize = 3;

/// A raw record that could not be decoded. The pipeline drops these.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("expected 3 '|'-separated fields, found {found}")]
    FieldCount { found: usize },

    #[error("invalid timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid feature value {value:?}: {source}")]
    FeatureValue {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// One observed network interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficEvent {
    /// Opaque source identifier, usually an address. Carried, never parsed.
    pub source_identifier: String,
    /// Source-supplied timestamp, seconds since the epoch.
    pub observed_at: i64,
    /// The scalar the detector judges, e.g. payload size.
    pub feature_value: i64,
}

/// Decode one `identifier|timestamp|feature_value` record.
///
/// Numeric fields tolerate surrounding whitespace; the identifier is kept
/// verbatim.
pub fn decode(raw: &str) -> Result<TrafficEvent, MalformedRecord> {
    let fields: Vec<&str> = raw.split(FIELD_DELIMITER).collect();
    if fields.len() != FIELD_COUNT {
        return Err(MalformedRecord::FieldCount {
            found: fields.len(),
        });
    }

    let observed_at = fields[1]
        .trim()
        .parse::<i64>()
        .map_err(|source| MalformedRecord::Timestamp {
            value: fields[1].to_string(),
            source,
        })?;

    let feature_value = fields[2]
        .trim()
        .parse::<i64>()
        .map_err(|source| MalformedRecord::FeatureValue {
            value: fields[2].to_string(),
            source,
        })?;

    Ok(TrafficEvent {
        source_identifier: fields[0].to_string(),
        observed_at,
        feature_value,
    })
}

impl FromStr for TrafficEvent {
    type Err = MalformedRecord;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}
