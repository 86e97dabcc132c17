//! Request-scoped access to one image stream
//!
//! A [ScopedImageStream] is created for each repository-scoped request. It
//! fetches the stream, its layers view and any images it needs at most once,
//! and answers the questions the distribution layer asks about them: which
//! image a digest names, whether insecure transport is allowed, and where a
//! missing blob could be pulled through from.

mod builder;
mod getter;
mod mapping;
mod pullthrough;
mod resolve;

pub use builder::ScopedImageStreamBuilder;
pub use pullthrough::{identify_candidate_repositories, LocalRegistry, PullthroughSpec};
pub use resolve::{find_parent_manifest, latest_image_tag_event, resolve_image_id, DisplayImage};

use crate::{
    api::{ImageStreamLayers, LimitRangeList, Secret},
    client::{ControlPlane, ProjectObjectListStore, RequestContext},
    errors::{ErrorCode, GetterError, ImageStreamError},
    imagestream::getter::{CachedImageGetter, CachedImageStreamGetter},
    reference::{ContentDigest, DefaultRegistry, Registry},
};
use std::{collections::BTreeMap, sync::Arc};

/// One image stream, as seen for the duration of a single request
pub struct ScopedImageStream {
    namespace: String,
    name: String,
    client: Arc<dyn ControlPlane>,
    images: CachedImageGetter,
    getter: CachedImageStreamGetter,
    defaults: DefaultRegistry,
    local_aliases: Vec<Registry>,
}

impl ScopedImageStream {
    /// Access a stream with the default settings
    pub fn new(namespace: &str, name: &str, client: Arc<dyn ControlPlane>) -> Self {
        ScopedImageStream::builder(namespace, name).build(client)
    }

    /// Configure access to a stream
    pub fn builder(namespace: &str, name: &str) -> ScopedImageStreamBuilder {
        ScopedImageStreamBuilder::new(namespace, name)
    }

    /// The `namespace/name` of this stream
    pub fn reference(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Does the stream exist?
    ///
    /// A stream that can't be read for any reason other than being missing
    /// is an error, not a `false`.
    pub async fn exists(&mut self, ctx: &RequestContext) -> Result<bool, ImageStreamError> {
        match self.getter.get(ctx).await {
            Ok(_) => Ok(true),
            Err(GetterError::NotFound(_)) => Ok(false),
            Err(err) => Err(ImageStreamError::from_getter(
                err,
                format!("exists: failed to get image stream {}", self.reference()),
            )),
        }
    }

    /// The image each tag currently points to
    pub async fn tags(
        &mut self,
        ctx: &RequestContext,
    ) -> Result<BTreeMap<String, ContentDigest>, ImageStreamError> {
        let stream = self.getter.get(ctx).await.map_err(|err| {
            ImageStreamError::from_getter(
                err,
                format!("tags: failed to get image stream {}", self.reference()),
            )
        })?;

        let mut tags = BTreeMap::new();
        for history in &stream.status.tags {
            let head = match history.items.first() {
                Some(head) => head,
                None => continue,
            };
            match ContentDigest::parse(&head.image) {
                Ok(digest) => {
                    tags.insert(history.tag.clone(), digest);
                }
                Err(err) => log::error!("bad digest {}: {}", head.image, err),
            }
        }
        Ok(tags)
    }

    /// Is `digest` a layer, a manifest or an image config known to the
    /// stream?
    ///
    /// The layers view is returned alongside whenever it could be fetched.
    /// Failing to fetch it is logged and counts as not found.
    pub async fn has_blob(
        &mut self,
        ctx: &RequestContext,
        digest: &ContentDigest,
    ) -> (bool, Option<Arc<ImageStreamLayers>>) {
        let layers = match self.getter.layers(ctx).await {
            Ok(layers) => layers,
            Err(err) => {
                log::error!(
                    "has_blob: unable to get layers for image stream {}: {}",
                    self.reference(),
                    err
                );
                return (false, None);
            }
        };

        let key = digest.as_str();
        let found = layers.blobs.contains_key(key)
            || layers.images.contains_key(key)
            || layers
                .images
                .values()
                .any(|refs| refs.config.as_deref() == Some(key));
        log::debug!(
            "has_blob: {} {} in image stream {}",
            digest,
            if found { "found" } else { "not found" },
            self.reference()
        );
        (found, Some(layers))
    }

    /// Pull secrets that may be used to import into this stream
    pub async fn secrets(&self, ctx: &RequestContext) -> Result<Vec<Secret>, ImageStreamError> {
        ctx.call(
            self.client
                .image_stream_secrets(&self.namespace, &self.name),
        )
        .await
        .map(|list| list.items)
        .map_err(|err| {
            ImageStreamError::new(
                ErrorCode::Unknown,
                format!(
                    "secrets: error getting secrets for repository {}",
                    self.reference()
                ),
            )
            .caused_by(err)
        })
    }

    /// Limit ranges for the stream's namespace
    ///
    /// The store, when given, is consulted first and filled after a listing.
    /// A store that refuses the new entry doesn't fail the request.
    pub async fn limit_range_list(
        &self,
        ctx: &RequestContext,
        store: Option<&dyn ProjectObjectListStore<LimitRangeList>>,
    ) -> Result<LimitRangeList, ImageStreamError> {
        if let Some(list) = store.and_then(|store| store.get(&self.namespace)) {
            return Ok(list);
        }

        log::debug!("listing limit ranges in namespace {}", self.namespace);
        let list = ctx
            .call(self.client.list_limit_ranges(&self.namespace))
            .await
            .map_err(|err| {
                ImageStreamError::new(
                    ErrorCode::Unknown,
                    format!(
                        "limit_range_list: failed to list limit ranges for {}",
                        self.reference()
                    ),
                )
                .caused_by(err)
            })?;

        if let Some(store) = store {
            if let Err(err) = store.add(&self.namespace, list.clone()) {
                log::error!(
                    "limit_range_list: failed to cache limit range list: {}",
                    err
                );
            }
        }
        Ok(list)
    }
}
