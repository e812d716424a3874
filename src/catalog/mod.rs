//! Catalog client for the wallpaper backdrop service
//!
//! Two POST round-trips with protobuf bodies: one listing collections, one
//! listing the images of a collection. Neither is retried.

pub mod proto;

use crate::config::{MirrorConfig, Server};
use crate::error::{MirrorError, Result};
use crate::types::{Collection, ImageDescriptor};
use async_trait::async_trait;
use prost::Message;
use reqwest::Client;
use tracing::{debug, warn};

use proto::{
    GetCollectionsRequest, GetCollectionsResponse, GetImagesInCollectionRequest,
    GetImagesInCollectionResponse,
};

const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// Source of collections and image listings
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// List all collections visible for `region` and `filters`
    ///
    /// # Errors
    /// - `CatalogUnavailable` on transport, status or decode failure
    async fn list_collections(&self, region: &str, filters: &[String])
        -> Result<Vec<Collection>>;

    /// List the images of one collection
    ///
    /// # Errors
    /// - `CatalogUnavailable` on transport, status or decode failure
    async fn list_images(
        &self,
        collection_id: &str,
        region: &str,
        filters: &[String],
    ) -> Result<Vec<ImageDescriptor>>;
}

/// HTTP implementation of [`CatalogSource`]
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    collections_url: String,
    images_url: String,
}

impl CatalogClient {
    /// Create a client for `server` with the given request timeout
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(server: Server, timeout: std::time::Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MirrorError::network_error("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            collections_url: server.collections_url(),
            images_url: server.images_url(),
        })
    }

    /// Create a client from a mirror configuration
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn from_config(config: &MirrorConfig) -> Result<Self> {
        Self::new(config.server, config.timeout())
    }

    /// Create a client against explicit endpoint URLs
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn with_endpoints<C: Into<String>, I: Into<String>>(
        collections_url: C,
        images_url: I,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MirrorError::network_error("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            collections_url: collections_url.into(),
            images_url: images_url.into(),
        })
    }

    /// Endpoint used for collection listings
    #[must_use]
    pub fn collections_url(&self) -> &str {
        &self.collections_url
    }

    /// Endpoint used for image listings
    #[must_use]
    pub fn images_url(&self) -> &str {
        &self.images_url
    }

    /// POST a protobuf payload and decode the protobuf answer
    async fn post<Req: Message, Resp: Message + Default>(
        &self,
        url: &str,
        request: &Req,
    ) -> Result<Resp> {
        let payload = request.encode_to_vec();
        debug!(url = %url, bytes = payload.len(), "Sending catalog request");

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE)
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                MirrorError::catalog_unavailable(format!("request to {} failed: {}", url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Catalog request rejected");
            return Err(MirrorError::catalog_unavailable(format!(
                "{} answered with HTTP {}",
                url, status
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            MirrorError::catalog_unavailable(format!("failed to read response from {}: {}", url, e))
        })?;

        Resp::decode(body).map_err(|e| {
            MirrorError::catalog_unavailable(format!("undecodable response from {}: {}", url, e))
        })
    }
}

/// Build the collection-listing request
#[must_use]
pub fn collections_request(region: &str, filters: &[String]) -> GetCollectionsRequest {
    GetCollectionsRequest {
        language: Some(region.to_string()),
        filtering_label: filters.to_vec(),
    }
}

/// Build the image-listing request for one collection
#[must_use]
pub fn images_request(
    collection_id: &str,
    region: &str,
    filters: &[String],
) -> GetImagesInCollectionRequest {
    GetImagesInCollectionRequest {
        collection_id: Some(collection_id.to_string()),
        language: Some(region.to_string()),
        filtering_label: filters.to_vec(),
    }
}

/// Convert a decoded collection listing, dropping incomplete entries
#[must_use]
pub fn collections_from_response(response: GetCollectionsResponse) -> Vec<Collection> {
    response
        .collections
        .into_iter()
        .filter_map(|c| {
            let converted = c.into_collection();
            if converted.is_none() {
                warn!("Skipping collection without id or name");
            }
            converted
        })
        .collect()
}

/// Convert a decoded image listing, dropping incomplete entries
#[must_use]
pub fn images_from_response(response: GetImagesInCollectionResponse) -> Vec<ImageDescriptor> {
    response
        .images
        .into_iter()
        .filter_map(|i| {
            let converted = i.into_descriptor();
            if converted.is_none() {
                warn!("Skipping image without asset id or URL");
            }
            converted
        })
        .collect()
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn list_collections(
        &self,
        region: &str,
        filters: &[String],
    ) -> Result<Vec<Collection>> {
        let request = collections_request(region, filters);
        let response: GetCollectionsResponse = self.post(&self.collections_url, &request).await?;
        let collections = collections_from_response(response);
        debug!(count = collections.len(), "Fetched collection list");
        Ok(collections)
    }

    async fn list_images(
        &self,
        collection_id: &str,
        region: &str,
        filters: &[String],
    ) -> Result<Vec<ImageDescriptor>> {
        let request = images_request(collection_id, region, filters);
        let response: GetImagesInCollectionResponse =
            self.post(&self.images_url, &request).await?;
        let images = images_from_response(response);
        debug!(collection_id = %collection_id, count = images.len(), "Fetched image list");
        Ok(images)
    }
}
