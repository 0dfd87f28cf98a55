use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use pump_engine::{BoxError, Enumerator, Identifier, IdentifierRecord};
use serde::Deserialize;
use tracing::debug;

use super::{ApiClient, check_status};
use crate::error::{BackendError, Result};

/// Lists recursive pins with `pin/ls`.
///
/// Without streaming the whole listing is fetched before the first record is
/// sent, so the total is known from the start. With streaming, records are
/// sent as the node reports them and the total grows along.
pub struct ApiPinEnumerator {
    client: ApiClient,
    stream: bool,
    total: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct PinListing {
    #[serde(rename = "Keys", default)]
    keys: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PinLine {
    #[serde(rename = "Cid")]
    cid: Option<String>,
    #[serde(rename = "Type")]
    kind: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

impl ApiPinEnumerator {
    pub fn new(client: ApiClient, stream: bool) -> Self {
        Self {
            client,
            stream,
            total: AtomicU64::new(0),
        }
    }

    async fn produce_listing(
        &self,
        out: &flume::Sender<IdentifierRecord>,
    ) -> std::result::Result<(), BoxError> {
        let response = self
            .client
            .command("pin/ls")
            .query(&[("type", "recursive")])
            .send()
            .await
            .map_err(BackendError::from)?;
        let listing: PinListing = check_status(response)
            .await?
            .json()
            .await
            .map_err(BackendError::from)?;

        self.total.store(listing.keys.len() as u64, Ordering::Relaxed);
        debug!(pins = listing.keys.len(), "Pin listing received");

        for key in listing.keys.into_keys() {
            out.send_async(to_record(key)).await?;
        }
        Ok(())
    }

    async fn produce_stream(
        &self,
        out: &flume::Sender<IdentifierRecord>,
    ) -> std::result::Result<(), BoxError> {
        let response = self
            .client
            .command("pin/ls")
            .query(&[("type", "recursive"), ("stream", "true")])
            .send()
            .await
            .map_err(BackendError::from)?;
        let mut chunks = Box::pin(check_status(response).await?.bytes_stream());

        let mut buffer: Vec<u8> = Vec::new();
        while let Some(chunk) = chunks.next().await {
            buffer.extend_from_slice(&chunk.map_err(BackendError::from)?);
            while let Some(end) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=end).collect();
                self.forward(&line, out).await?;
            }
        }
        self.forward(&buffer, out).await?;

        debug!(pins = self.total.load(Ordering::Relaxed), "Pin stream ended");
        Ok(())
    }

    async fn forward(
        &self,
        line: &[u8],
        out: &flume::Sender<IdentifierRecord>,
    ) -> std::result::Result<(), BoxError> {
        if let Some(record) = parse_pin_line(line)? {
            self.total.fetch_add(1, Ordering::Relaxed);
            out.send_async(record).await?;
        }
        Ok(())
    }
}

fn to_record(value: String) -> IdentifierRecord {
    match Identifier::parse(&value) {
        Ok(id) => IdentifierRecord::ok(id),
        Err(e) => IdentifierRecord::failed(Identifier::new(value), BackendError::from(e)),
    }
}

/// Parse one line of a streamed pin listing.
///
/// Blank lines yield `None`. An error object sent by the node is fatal; any
/// other malformed line becomes an item error.
fn parse_pin_line(line: &[u8]) -> Result<Option<IdentifierRecord>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(None);
    }

    let raw = || Identifier::new(String::from_utf8_lossy(line).into_owned());
    match serde_json::from_slice::<PinLine>(line) {
        Ok(PinLine { cid: Some(cid), .. }) => Ok(Some(to_record(cid))),
        Ok(PinLine {
            kind: Some(kind),
            message: Some(message),
            ..
        }) if kind == "error" => Err(BackendError::Api { message }),
        Ok(_) => Ok(Some(IdentifierRecord::failed(
            raw(),
            BackendError::Api {
                message: "pin entry without Cid".to_string(),
            },
        ))),
        Err(e) => Ok(Some(IdentifierRecord::failed(raw(), BackendError::from(e)))),
    }
}

#[async_trait]
impl Enumerator for ApiPinEnumerator {
    async fn produce(
        &self,
        out: flume::Sender<IdentifierRecord>,
    ) -> std::result::Result<(), BoxError> {
        if self.stream {
            self.produce_stream(&out).await
        } else {
            self.produce_listing(&out).await
        }
    }

    fn total_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}
