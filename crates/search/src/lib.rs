//! Elasticsearch projection of marketplace listings.
//!
//! Each listing is stored as one document under its composite id. The document is
//! the resolved listing with two extra fields: `ownerAddress` and `ipfsHash`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use marketplace_indexer::{ResolvedListing, SearchIndex};
use serde_json::Value;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_INDEX: &str = "listings";

pub struct ElasticsearchIndex {
    client: reqwest::Client,
    base_url: String,
    index: String,
}

impl ElasticsearchIndex {
    pub fn new(base_url: impl Into<String>, index: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build search HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: index.into(),
        })
    }

    pub fn document_url(&self, id: &str) -> String {
        format!(
            "{}/{}/_doc/{}",
            self.base_url,
            self.index,
            urlencoding::encode(id)
        )
    }

    /// Builds the document body stored for `listing`.
    pub fn document(
        owner_address: &str,
        content_ref: Option<&str>,
        listing: &ResolvedListing,
    ) -> Result<Value> {
        let mut document = serde_json::to_value(listing)?;
        if let Value::Object(fields) = &mut document {
            fields.insert("ownerAddress".to_string(), owner_address.into());
            fields.insert(
                "ipfsHash".to_string(),
                content_ref.map_or(Value::Null, Into::into),
            );
        }
        Ok(document)
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn index(
        &self,
        id: &str,
        owner_address: &str,
        content_ref: Option<&str>,
        listing: &ResolvedListing,
    ) -> Result<()> {
        let url = self.document_url(id);
        let document = Self::document(owner_address, content_ref, listing)?;

        let response = self
            .client
            .put(&url)
            .json(&document)
            .send()
            .await
            .with_context(|| format!("search request for {id} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("search index rejected {id}: {status} {body}");
        }

        tracing::debug!(
            target: "marketplace_search::elastic",
            id = %id,
            status = %status,
            "Indexed listing document"
        );
        Ok(())
    }
}
