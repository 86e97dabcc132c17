//! The control plane, as seen from the resolution layer
//!
//! The actual API client lives elsewhere. Everything here calls through the
//! [ControlPlane] trait, always wrapped in a [RequestContext] so a cancelled
//! request stops issuing calls.

mod context;
mod store;

pub use context::RequestContext;
pub use store::{InMemoryProjectStore, ProjectObjectListStore};

use crate::{
    api::{Image, ImageStream, ImageStreamLayers, ImageStreamMapping, LimitRangeList, SecretList},
    errors::ApiError,
};
use async_trait::async_trait;

/// CRUD operations against the control plane's image, secret and limit
/// range resources
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn get_image_stream(&self, namespace: &str, name: &str) -> Result<ImageStream, ApiError>;

    async fn get_image_stream_layers(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ImageStreamLayers, ApiError>;

    /// Images are cluster-scoped and named by manifest digest
    async fn get_image(&self, name: &str) -> Result<Image, ApiError>;

    async fn create_image_stream_mapping(&self, mapping: &ImageStreamMapping) -> Result<(), ApiError>;

    async fn create_image_stream(&self, stream: &ImageStream) -> Result<ImageStream, ApiError>;

    /// Pull secrets usable by the named image stream
    async fn image_stream_secrets(&self, namespace: &str, name: &str) -> Result<SecretList, ApiError>;

    async fn list_limit_ranges(&self, namespace: &str) -> Result<LimitRangeList, ApiError>;
}
