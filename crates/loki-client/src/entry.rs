// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Normalization of serialized log records into [`LogEntry`] values.
//!
//! The upstream formatter writes one JSON object per record. Two fields are
//! mandatory: `time`, an RFC 3339 timestamp with a fixed number of fractional
//! digits, and `msg`, the log line. Every other field except `service` is
//! carried along as metadata.
//!
//! ```text
//! {"time":"2024-01-02T03:04:05.123Z","msg":"started","level":"info","port":8080}
//!   -> LogEntry { timestamp_nanos: "1704164645123000000",
//!                 message: "started",
//!                 metadata: {"level": "info", "port": "8080"} }
//! ```

use std::collections::BTreeMap;

use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::constants::{MESSAGE_FIELD, SERVICE_FIELD, TIME_FIELD};
use crate::error::EntryError;

/// Length of `YYYY-MM-DDTHH:MM:SS`, the part preceding the fractional seconds.
const SECONDS_PREFIX_LEN: usize = 19;

/// Number of fractional-second digits a record timestamp must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampPrecision {
    /// `2006-01-02T15:04:05.000Z07:00`
    #[default]
    Millis,
    /// `2006-01-02T15:04:05.000000Z07:00`
    Micros,
    /// `2006-01-02T15:04:05.000000000Z07:00`
    Nanos,
}

impl TimestampPrecision {
    #[must_use]
    pub fn digits(self) -> usize {
        match self {
            TimestampPrecision::Millis => 3,
            TimestampPrecision::Micros => 6,
            TimestampPrecision::Nanos => 9,
        }
    }
}

/// A normalized log record, ready to be queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    timestamp_nanos: String,
    message: String,
    metadata: BTreeMap<String, String>,
}

impl LogEntry {
    #[must_use]
    pub fn new(
        timestamp_nanos: i128,
        message: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            timestamp_nanos: timestamp_nanos.to_string(),
            message: message.into(),
            metadata,
        }
    }

    /// Unix timestamp in nanoseconds, as a decimal string.
    #[must_use]
    pub fn timestamp_nanos(&self) -> &str {
        &self.timestamp_nanos
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

/// Parses one serialized record.
///
/// # Errors
///
/// * [`EntryError::InvalidRecord`] if the input is not a JSON object
/// * [`EntryError::MissingField`] if `time` or `msg` is absent
/// * [`EntryError::InvalidTimestamp`] if `time` is not a string in the expected format
/// * [`EntryError::InvalidMessageType`] if `msg` is not a string
pub fn normalize(raw: &[u8], precision: TimestampPrecision) -> Result<LogEntry, EntryError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| EntryError::InvalidRecord(e.to_string()))?;
    let Value::Object(mut fields) = value else {
        return Err(EntryError::InvalidRecord(
            "record is not a JSON object".to_string(),
        ));
    };

    let time = fields
        .remove(TIME_FIELD)
        .ok_or(EntryError::MissingField(TIME_FIELD))?;
    let timestamp_nanos = parse_timestamp(&time, precision)?;

    let message = match fields.remove(MESSAGE_FIELD) {
        None => return Err(EntryError::MissingField(MESSAGE_FIELD)),
        Some(Value::String(message)) => message,
        Some(_) => return Err(EntryError::InvalidMessageType),
    };

    fields.remove(SERVICE_FIELD);
    let metadata = fields
        .into_iter()
        .map(|(key, value)| (key, stringify(value)))
        .collect();

    Ok(LogEntry::new(timestamp_nanos, message, metadata))
}

fn parse_timestamp(value: &Value, precision: TimestampPrecision) -> Result<i128, EntryError> {
    let Value::String(text) = value else {
        return Err(EntryError::InvalidTimestamp(format!(
            "expected a string, got {value}"
        )));
    };

    if fraction_digits(text) != Some(precision.digits()) {
        return Err(EntryError::InvalidTimestamp(format!(
            "{text:?} does not have {} fractional digits",
            precision.digits()
        )));
    }

    OffsetDateTime::parse(text, &Rfc3339)
        .map(OffsetDateTime::unix_timestamp_nanos)
        .map_err(|e| EntryError::InvalidTimestamp(format!("{text:?}: {e}")))
}

fn fraction_digits(text: &str) -> Option<usize> {
    let fraction = text.get(SECONDS_PREFIX_LEN..)?.strip_prefix('.')?;
    Some(fraction.bytes().take_while(u8::is_ascii_digit).count())
}

fn stringify(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
