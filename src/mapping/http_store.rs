//! Remote mapping store reached over HTTP.
//!
//! Lookup is `GET {base}/{database}/{collection}/{host}`:
//! - `200` with a JSON host record is a hit
//! - `404` means the host is not configured
//! - anything else is a store failure

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use crate::mapping::{HostMapping, MappingStore, StoreError};

#[derive(Debug, Clone)]
pub struct HttpMappingStore {
    base_url: Url,
    database: String,
    collection: String,
    client: reqwest::Client,
}

impl HttpMappingStore {
    pub fn new(
        base_url: &str,
        database: &str,
        collection: &str,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).no_proxy().build()?;

        Ok(Self {
            base_url,
            database: database.to_string(),
            collection: collection.to_string(),
            client,
        })
    }

    /// URL of the record for `host`, with every segment percent-encoded.
    fn record_url(&self, host: &str) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([self.database.as_str(), self.collection.as_str(), host]);
        Ok(url)
    }
}

#[async_trait]
impl MappingStore for HttpMappingStore {
    async fn find(&self, host: &str) -> Result<Option<HostMapping>, StoreError> {
        let url = self.record_url(host)?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().await?;
                let mapping = serde_json::from_slice(&body)
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                Ok(Some(mapping))
            }
            StatusCode::NOT_FOUND => Ok(None),
            other => Err(StoreError::Status(other.as_u16())),
        }
    }

    fn describe(&self) -> String {
        format!("http {} ({}/{})", self.base_url, self.database, self.collection)
    }
}
