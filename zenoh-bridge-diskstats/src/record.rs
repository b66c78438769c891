//! Parsing of kernel disk statistics lines.
//!
//! A line of `/proc/diskstats` looks like:
//!
//! ```text
//!    8       0 sda 100 0 200 10 50 0 300 20 0 5 500
//! ```
//!
//! Tokens 0 and 1 are the major/minor numbers, token 2 is the device name and
//! tokens 3..=13 are the eleven counter fields documented in the kernel's
//! `Documentation/admin-guide/iostats.rst`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token count of a classic (Linux 2.6 era) diskstats line.
pub const RECORD_TOKENS: usize = 14;

/// Number of counter fields following the device name.
pub const COUNTER_FIELDS: usize = 11;

const DEVICE_TOKEN: usize = 2;
const FIRST_COUNTER_TOKEN: usize = 3;

/// Which line shapes are considered well-formed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineFormat {
    /// Exactly 14 tokens; anything else is malformed.
    #[default]
    Strict,
    /// Also accept the 18-token (4.18+, discard fields) and 20-token
    /// (5.5+, flush fields) layouts. Only the first 14 tokens are read.
    Extended,
}

impl LineFormat {
    /// Whether a line with `tokens` whitespace-separated tokens is accepted.
    pub fn accepts(self, tokens: usize) -> bool {
        match self {
            LineFormat::Strict => tokens == RECORD_TOKENS,
            LineFormat::Extended => matches!(tokens, RECORD_TOKENS | 18 | 20),
        }
    }
}

/// Why a line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("field {field} is not an unsigned integer: '{token}'")]
    InvalidCounter { field: usize, token: String },
}

/// One parsed diskstats line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCounterRecord {
    /// Device name (e.g. "sda", "nvme0n1p2").
    pub device: String,
    /// Counter fields 1..=11 in kernel order.
    pub fields: [u64; COUNTER_FIELDS],
}

impl RawCounterRecord {
    /// Value of the 1-based kernel field `index`.
    pub fn field(&self, index: usize) -> Option<u64> {
        index
            .checked_sub(1)
            .and_then(|i| self.fields.get(i))
            .copied()
    }
}

/// A line with an accepted token count whose counters are not parsed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTokens<'a> {
    pub device: &'a str,
    counters: [&'a str; COUNTER_FIELDS],
}

impl<'a> RecordTokens<'a> {
    /// Split a line, checking only its token count.
    pub fn split(line: &'a str, format: LineFormat) -> Result<Self, RecordError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        if !format.accepts(tokens.len()) {
            return Err(RecordError::FieldCount {
                expected: RECORD_TOKENS,
                found: tokens.len(),
            });
        }

        let mut counters = [""; COUNTER_FIELDS];
        counters.copy_from_slice(&tokens[FIRST_COUNTER_TOKEN..FIRST_COUNTER_TOKEN + COUNTER_FIELDS]);

        Ok(Self {
            device: tokens[DEVICE_TOKEN],
            counters,
        })
    }

    /// Parse the counter tokens.
    pub fn parse(&self) -> Result<RawCounterRecord, RecordError> {
        let mut fields = [0u64; COUNTER_FIELDS];
        for (i, (slot, token)) in fields.iter_mut().zip(self.counters).enumerate() {
            *slot = token.parse().map_err(|_| RecordError::InvalidCounter {
                field: i + 1,
                token: token.to_string(),
            })?;
        }

        Ok(RawCounterRecord {
            device: self.device.to_string(),
            fields,
        })
    }
}
