// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! JSON body of a push request.
//!
//! ```text
//! {"streams":[{"stream":{<labels>},"values":[["<unix nanos>","<msg>",{<metadata>}],...]}]}
//! ```
//!
//! Each value carries its metadata object as a third element.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::entry::LogEntry;

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    streams: Vec<PushStream<'a>>,
}

#[derive(Debug, Serialize)]
struct PushStream<'a> {
    stream: &'a BTreeMap<String, String>,
    values: Vec<PushValue<'a>>,
}

#[derive(Debug, Serialize)]
struct PushValue<'a>(&'a str, &'a str, &'a BTreeMap<String, String>);

impl<'a> From<&'a LogEntry> for PushValue<'a> {
    fn from(entry: &'a LogEntry) -> Self {
        PushValue(entry.timestamp_nanos(), entry.message(), entry.metadata())
    }
}

/// Serializes `batch` as a single stream labelled with `labels`, keeping
/// the batch order.
pub fn encode(
    labels: &BTreeMap<String, String>,
    batch: &[LogEntry],
) -> Result<Vec<u8>, serde_json::Error> {
    let request = PushRequest {
        streams: vec![PushStream {
            stream: labels,
            values: batch.iter().map(PushValue::from).collect(),
        }],
    };
    serde_json::to_vec(&request)
}
