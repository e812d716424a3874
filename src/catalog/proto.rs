//! Protobuf messages exchanged with the wallpaper catalog service
//!
//! Field numbers follow the service's `backdrop_wallpaper.proto`. Only the
//! fields the mirror reads or sends are declared; unknown fields are skipped
//! by the decoder.

use crate::types::{Collection, ImageDescriptor};

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetCollectionsRequest {
    #[prost(string, optional, tag = "1")]
    pub language: Option<String>,
    #[prost(string, repeated, tag = "2")]
    pub filtering_label: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetCollectionsResponse {
    #[prost(message, repeated, tag = "1")]
    pub collections: Vec<CollectionProto>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CollectionProto {
    #[prost(string, optional, tag = "1")]
    pub collection_id: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub collection_name: Option<String>,
    #[prost(message, repeated, tag = "3")]
    pub preview: Vec<ImageProto>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetImagesInCollectionRequest {
    #[prost(string, optional, tag = "1")]
    pub collection_id: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub language: Option<String>,
    #[prost(string, repeated, tag = "3")]
    pub filtering_label: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetImagesInCollectionResponse {
    #[prost(message, repeated, tag = "1")]
    pub images: Vec<ImageProto>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ImageProto {
    #[prost(uint64, optional, tag = "1")]
    pub asset_id: Option<u64>,
    #[prost(string, optional, tag = "2")]
    pub image_url: Option<String>,
    #[prost(message, repeated, tag = "3")]
    pub attribution: Vec<AttributionProto>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AttributionProto {
    #[prost(string, optional, tag = "1")]
    pub text: Option<String>,
}

impl CollectionProto {
    /// Convert to the domain type; `None` when id or name is missing
    #[must_use]
    pub fn into_collection(self) -> Option<Collection> {
        match (self.collection_id, self.collection_name) {
            (Some(id), Some(name)) if !id.is_empty() => Some(Collection { id, name }),
            _ => None,
        }
    }
}

impl ImageProto {
    /// Convert to the domain type; `None` when asset id or URL is missing
    #[must_use]
    pub fn into_descriptor(self) -> Option<ImageDescriptor> {
        let asset_id = self.asset_id?;
        let source_url = self.image_url.filter(|url| !url.is_empty())?;
        let attribution_text = self
            .attribution
            .into_iter()
            .next()
            .and_then(|a| a.text)
            .unwrap_or_default();

        Some(ImageDescriptor {
            asset_id: asset_id.to_string(),
            source_url,
            attribution_text,
        })
    }
}
