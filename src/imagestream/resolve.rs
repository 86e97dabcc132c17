//! Digest to image resolution within one image stream

use crate::{
    api::{Image, ImageStream, ImageStreamLayers, TagEvent},
    client::RequestContext,
    errors::{ErrorCode, ImageIdError, ImageStreamError},
    imagestream::ScopedImageStream,
    reference::{digest_or_image_match, ContentDigest, ImageReference},
};
use std::{collections::BTreeSet, ops::Deref, sync::Arc};

/// An image whose pull reference has been rewritten for display
///
/// The reference reflects where the stream got the image from (its tag, or
/// the manifest list it belongs to) rather than what the control plane has
/// stored. This type derefs to [Image] for reading, but it cannot be turned
/// back into one, so it can't be written through to the control plane by
/// accident. Use [ScopedImageStream::stored_image] for that.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayImage {
    image: Image,
}

impl DisplayImage {
    fn rewritten(stored: &Image, docker_image_reference: String) -> Self {
        let mut image = stored.clone();
        image.docker_image_reference = docker_image_reference;
        DisplayImage { image }
    }
}

impl Deref for DisplayImage {
    type Target = Image;
    fn deref(&self) -> &Image {
        &self.image
    }
}

/// Find the one tag event recording an image ID anywhere in the history
///
/// Abbreviated IDs are accepted. When more than one distinct image matches,
/// nothing is picked.
pub fn resolve_image_id(stream: &ImageStream, id: &str) -> Result<TagEvent, ImageIdError> {
    let mut found = None;
    let mut matches = BTreeSet::new();
    for history in &stream.status.tags {
        for event in &history.items {
            if digest_or_image_match(&event.image, id) {
                found = Some(event);
                matches.insert(event.image.as_str());
            }
        }
    }
    match (matches.len(), found) {
        (1, Some(event)) => Ok(event.clone()),
        (0, _) | (_, None) => Err(ImageIdError::NotFound(id.to_owned())),
        _ => Err(ImageIdError::Ambiguous {
            id: id.to_owned(),
            matches: matches.into_iter().map(str::to_owned).collect(),
        }),
    }
}

/// Find the most recently created tag event for an image ID, and its tag
pub fn latest_image_tag_event<'a>(
    stream: &'a ImageStream,
    id: &str,
) -> Option<(&'a str, &'a TagEvent)> {
    let mut latest: Option<(&str, &TagEvent)> = None;
    for history in &stream.status.tags {
        for event in &history.items {
            if !digest_or_image_match(&event.image, id) {
                continue;
            }
            let newer = match latest {
                Some((_, prev)) => event.created > prev.created,
                None => true,
            };
            if newer {
                latest = Some((history.tag.as_str(), event));
            }
        }
    }
    latest
}

/// Find the manifest list that has `digest` as one of its child manifests
///
/// Manifest lists are searched in digest order; the first one wins.
pub fn find_parent_manifest<'a>(
    layers: &'a ImageStreamLayers,
    digest: &ContentDigest,
) -> Option<&'a str> {
    layers
        .images
        .iter()
        .find(|(_, refs)| refs.manifests.iter().any(|m| m == digest.as_str()))
        .map(|(parent, _)| parent.as_str())
}

impl ScopedImageStream {
    /// Return the latest tag event for an image digest
    ///
    /// Fails with ImageNotFound when the stream has no such image or more
    /// than one image matches.
    pub async fn resolve_image_id(
        &mut self,
        ctx: &RequestContext,
        digest: &ContentDigest,
    ) -> Result<TagEvent, ImageStreamError> {
        self.resolve_id(ctx, digest.as_str()).await
    }

    async fn resolve_id(
        &mut self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<TagEvent, ImageStreamError> {
        let stream = self.getter.get(ctx).await.map_err(|err| {
            ImageStreamError::from_getter(
                err,
                format!("resolve_image_id: failed to get image stream {}", self.reference()),
            )
        })?;

        resolve_image_id(&stream, id).map_err(|err| {
            ImageStreamError::new(
                ErrorCode::ImageNotFound,
                format!(
                    "resolve_image_id: unable to resolve image id {} in image stream {}",
                    id,
                    self.reference()
                ),
            )
            .caused_by(err)
        })
    }

    /// Retrieve an image without any authorization or membership check
    pub(crate) async fn get_image(
        &mut self,
        ctx: &RequestContext,
        digest: &ContentDigest,
    ) -> Result<Arc<Image>, ImageStreamError> {
        self.images.get(ctx, digest).await.map_err(|err| {
            let (code, verb) = if err.is_not_found() {
                (ErrorCode::ImageNotFound, "find")
            } else {
                (ErrorCode::Unknown, "get")
            };
            ImageStreamError::new(
                code,
                format!(
                    "get_image: unable to {} image digest {} in {}",
                    verb,
                    digest,
                    self.reference()
                ),
            )
            .caused_by(err)
        })
    }

    /// Retrieve the stored image for a digest that belongs to this stream
    ///
    /// The image is exactly as the control plane has it, so it is safe to
    /// send back. The tag event recording it is returned alongside.
    pub async fn stored_image(
        &mut self,
        ctx: &RequestContext,
        digest: &ContentDigest,
    ) -> Result<(Arc<Image>, TagEvent), ImageStreamError> {
        let event = self.resolve_image_id(ctx, digest).await?;
        let image = self.get_image(ctx, digest).await?;
        Ok((image, event))
    }

    async fn tagged_image(
        &mut self,
        ctx: &RequestContext,
        digest: &ContentDigest,
    ) -> Result<DisplayImage, ImageStreamError> {
        let (image, event) = self.stored_image(ctx, digest).await?;
        Ok(DisplayImage::rewritten(&image, event.docker_image_reference))
    }

    /// Resolve a digest to an image as seen through this stream
    ///
    /// The image's pull reference is replaced with the one recorded by the
    /// tag that brought the image in. A child of a manifest list usually has
    /// no history of its own; for those, the reference is inferred from the
    /// parent list's tag event, pinned to the child's digest.
    ///
    /// When both lookups fail, the error from the manifest list lookup is
    /// the one returned.
    pub async fn resolve(
        &mut self,
        ctx: &RequestContext,
        digest: &ContentDigest,
    ) -> Result<DisplayImage, ImageStreamError> {
        match self.tagged_image(ctx, digest).await {
            Ok(image) => return Ok(image),
            Err(err) => log::debug!("{}, looking for a manifest list parent", err),
        }

        let reference = self.resolve_upstream_ref(ctx, digest).await?;
        let image = self.get_image(ctx, digest).await?;
        Ok(DisplayImage::rewritten(
            &image,
            self.defaults.pull_spec(&reference),
        ))
    }

    /// Upstream reference of a child manifest, derived from its parent
    async fn resolve_upstream_ref(
        &mut self,
        ctx: &RequestContext,
        digest: &ContentDigest,
    ) -> Result<ImageReference, ImageStreamError> {
        let layers = self.getter.layers(ctx).await.map_err(|err| {
            ImageStreamError::new(
                ErrorCode::Unknown,
                format!(
                    "resolve_upstream_ref: failed to get layers for image stream {}",
                    self.reference()
                ),
            )
            .caused_by(err)
        })?;

        let parent = match find_parent_manifest(&layers, digest) {
            Some(parent) => parent.to_owned(),
            None => {
                return Err(ImageStreamError::new(
                    ErrorCode::ImageNotFound,
                    format!(
                        "resolve_upstream_ref: unable to find parent for image {} in image stream {}",
                        digest,
                        self.reference()
                    ),
                ))
            }
        };

        let parent_event = self.resolve_id(ctx, &parent).await.map_err(|err| {
            ImageStreamError::wrapping(
                ErrorCode::Unknown,
                format!(
                    "resolve_upstream_ref: unable to get parent event {} in image stream {}",
                    parent,
                    self.reference()
                ),
                err,
            )
        })?;

        let parent_ref = ImageReference::parse(&parent_event.docker_image_reference).map_err(|err| {
            ImageStreamError::new(
                ErrorCode::Unknown,
                format!(
                    "resolve_upstream_ref: unable to parse parent image reference {} in image stream {}",
                    parent_event.docker_image_reference,
                    self.reference()
                ),
            )
            .caused_by(err)
        })?;

        Ok(parent_ref.pinned(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ImageBlobReferences, NamedTagEventList};
    use chrono::{TimeZone, Utc};

    fn event(image: &ContentDigest, reference: &str, hour: u32) -> TagEvent {
        TagEvent {
            created: Utc.with_ymd_and_hms(2021, 1, 1, hour, 0, 0).unwrap(),
            docker_image_reference: reference.to_owned(),
            image: image.as_str().to_owned(),
            generation: 1,
        }
    }

    fn history(tag: &str, items: Vec<TagEvent>) -> NamedTagEventList {
        NamedTagEventList {
            tag: tag.to_owned(),
            items,
        }
    }

    fn stream(tags: Vec<NamedTagEventList>) -> ImageStream {
        let mut stream = ImageStream::named("ns", "app");
        stream.status.tags = tags;
        stream
    }

    #[test]
    fn resolves_single_match() {
        let a = ContentDigest::from_content(b"a");
        let b = ContentDigest::from_content(b"b");
        let s = stream(vec![
            history("v1", vec![event(&a, "quay.io/ns/app@a", 1)]),
            history("v2", vec![event(&b, "quay.io/ns/app@b", 2), event(&a, "quay.io/ns/app@a", 0)]),
        ]);
        let found = resolve_image_id(&s, b.as_str()).unwrap();
        assert_eq!(found.docker_image_reference, "quay.io/ns/app@b");
        let found = resolve_image_id(&s, a.as_str()).unwrap();
        assert_eq!(found.image, a.as_str());
    }

    #[test]
    fn missing_and_ambiguous_ids() {
        let a = ContentDigest::parse("sha256:aaaa0000000000000000000000000000").unwrap();
        let b = ContentDigest::parse("sha256:aaaa1111111111111111111111111111").unwrap();
        let s = stream(vec![history(
            "v1",
            vec![event(&a, "quay.io/ns/app@a", 1), event(&b, "quay.io/ns/app@b", 0)],
        )]);
        assert_eq!(
            resolve_image_id(&s, "sha256:bbbb"),
            Err(ImageIdError::NotFound("sha256:bbbb".to_owned()))
        );
        match resolve_image_id(&s, "aaaa") {
            Err(ImageIdError::Ambiguous { matches, .. }) => assert_eq!(matches.len(), 2),
            other => panic!("expected ambiguity, got {:?}", other),
        }
        assert!(resolve_image_id(&s, "aaaa0").is_ok());
    }

    #[test]
    fn latest_event_wins() {
        let a = ContentDigest::from_content(b"a");
        let s = stream(vec![
            history("old", vec![event(&a, "quay.io/ns/app:old", 1)]),
            history("new", vec![event(&a, "quay.io/ns/app:new", 5)]),
            history("same", vec![event(&a, "quay.io/ns/app:same", 5)]),
        ]);
        let (tag, event) = latest_image_tag_event(&s, a.as_str()).unwrap();
        assert_eq!(tag, "new");
        assert_eq!(event.docker_image_reference, "quay.io/ns/app:new");
        assert!(latest_image_tag_event(&s, ContentDigest::from_content(b"x").as_str()).is_none());
    }

    #[test]
    fn parent_manifest_lookup() {
        let list = ContentDigest::from_content(b"list");
        let child = ContentDigest::from_content(b"child");
        let mut layers = ImageStreamLayers::default();
        layers.images.insert(
            ContentDigest::from_content(b"plain").to_string(),
            ImageBlobReferences {
                layers: vec![ContentDigest::from_content(b"layer").to_string()],
                ..Default::default()
            },
        );
        layers.images.insert(
            list.to_string(),
            ImageBlobReferences {
                manifests: vec![child.to_string()],
                ..Default::default()
            },
        );
        assert_eq!(find_parent_manifest(&layers, &child), Some(list.as_str()));
        assert_eq!(find_parent_manifest(&layers, &list), None);
    }
}
