use crate::{
    api::{Image, ImageStream, ImageStreamLayers},
    client::{ControlPlane, RequestContext},
    errors::{ApiError, GetterError},
    reference::ContentDigest,
};
use std::{collections::HashMap, sync::Arc};

/// Fetches and caches one image stream and its layers view
///
/// Both stay cached for the entire time of handling a single
/// repository-scoped request. Failures are not cached, so a later call may
/// retry the fetch. The only other way in is [Self::cache_image_stream].
pub(crate) struct CachedImageStreamGetter {
    namespace: String,
    name: String,
    client: Arc<dyn ControlPlane>,
    stream: Option<Arc<ImageStream>>,
    layers: Option<Arc<ImageStreamLayers>>,
}

impl CachedImageStreamGetter {
    pub fn new(namespace: &str, name: &str, client: Arc<dyn ControlPlane>) -> Self {
        CachedImageStreamGetter {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            client,
            stream: None,
            layers: None,
        }
    }

    pub async fn get(&mut self, ctx: &RequestContext) -> Result<Arc<ImageStream>, GetterError> {
        if let Some(stream) = &self.stream {
            log::debug!("(cached) image stream {}/{}", self.namespace, self.name);
            return Ok(stream.clone());
        }

        log::debug!("getting image stream {}/{}", self.namespace, self.name);
        let stream = ctx
            .call(self.client.get_image_stream(&self.namespace, &self.name))
            .await
            .map_err(|err| self.classify(err))?;

        let stream = Arc::new(stream);
        self.stream = Some(stream.clone());
        Ok(stream)
    }

    pub async fn layers(
        &mut self,
        ctx: &RequestContext,
    ) -> Result<Arc<ImageStreamLayers>, GetterError> {
        if let Some(layers) = &self.layers {
            log::debug!("(cached) layers for image stream {}/{}", self.namespace, self.name);
            return Ok(layers.clone());
        }

        log::debug!("getting layers for image stream {}/{}", self.namespace, self.name);
        let layers = ctx
            .call(self.client.get_image_stream_layers(&self.namespace, &self.name))
            .await
            .map_err(|err| self.classify(err))?;

        let layers = Arc::new(layers);
        self.layers = Some(layers.clone());
        Ok(layers)
    }

    /// Seed the cache with a stream obtained from a write
    pub fn cache_image_stream(&mut self, stream: ImageStream) {
        if self.stream.is_some() {
            log::debug!(
                "replacing cached image stream {}/{}",
                self.namespace,
                self.name
            );
        }
        self.stream = Some(Arc::new(stream));
    }

    fn classify(&self, err: ApiError) -> GetterError {
        log::debug!(
            "failed to get image stream {}/{}: {}",
            self.namespace,
            self.name,
            err
        );
        GetterError::from(err)
    }
}

/// Fetches images by digest, remembering every image already fetched
///
/// Images are immutable, so nothing here is ever invalidated.
pub(crate) struct CachedImageGetter {
    client: Arc<dyn ControlPlane>,
    images: HashMap<ContentDigest, Arc<Image>>,
}

impl CachedImageGetter {
    pub fn new(client: Arc<dyn ControlPlane>) -> Self {
        CachedImageGetter {
            client,
            images: HashMap::new(),
        }
    }

    pub async fn get(
        &mut self,
        ctx: &RequestContext,
        digest: &ContentDigest,
    ) -> Result<Arc<Image>, ApiError> {
        if let Some(image) = self.images.get(digest) {
            log::debug!("(cached) image {}", digest);
            return Ok(image.clone());
        }

        log::debug!("getting image {}", digest);
        let image = Arc::new(ctx.call(self.client.get_image(digest.as_str())).await?);
        self.images.insert(digest.clone(), image.clone());
        Ok(image)
    }
}
