use async_trait::async_trait;
use bytes::Bytes;
use pump_engine::{Block, BoxError, Collector, Drain, Identifier, IdentifierRecord};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, trace};

use super::{ApiClient, check_status};
use crate::error::Result;

/// Retrieves blocks with `block/get`.
pub struct ApiCollector {
    client: ApiClient,
}

impl ApiCollector {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    async fn get(&self, id: &Identifier) -> Result<Bytes> {
        let response = self
            .client
            .command("block/get")
            .query(&[("arg", id.as_str())])
            .send()
            .await?;
        let data = check_status(response).await?.bytes().await?;
        Ok(data)
    }
}

#[async_trait]
impl Collector for ApiCollector {
    async fn collect(
        &self,
        input: flume::Receiver<IdentifierRecord>,
        out: flume::Sender<Block>,
    ) -> std::result::Result<(), BoxError> {
        while let Ok(record) = input.recv_async().await {
            let block = match self.get(&record.id).await {
                Ok(data) => Block::new(record.id, data),
                Err(e) => Block::failed(record.id, e),
            };
            out.send_async(block).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct BlockPutResponse {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Size", default)]
    size: u64,
}

/// Stores blocks with `block/put`.
pub struct ApiDrain {
    client: ApiClient,
}

impl ApiDrain {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    async fn put(&self, block: &Block) -> Result<()> {
        let body = reqwest::Body::from(block.data.clone());
        let part = Part::stream_with_length(body, block.data.len() as u64)
            .file_name(block.id.to_string())
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("data", part);

        let response = self
            .client
            .command("block/put")
            .multipart(form)
            .send()
            .await?;
        let stored: BlockPutResponse = check_status(response).await?.json().await?;

        if stored.key != block.id.as_str() {
            debug!(
                identifier = %block.id,
                stored_as = %stored.key,
                "Destination stored block under a different identifier"
            );
        }
        trace!(identifier = %block.id, size = stored.size, "Block written");
        Ok(())
    }
}

#[async_trait]
impl Drain for ApiDrain {
    async fn write(&self, block: &Block) -> std::result::Result<(), BoxError> {
        self.put(block).await?;
        Ok(())
    }
}
