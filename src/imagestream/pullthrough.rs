//! Choosing where a missing blob or manifest may be pulled through from

use crate::{
    api::{ImageStream, TagEvent},
    client::RequestContext,
    errors::ImageStreamError,
    imagestream::{resolve::latest_image_tag_event, ScopedImageStream},
    reference::{ContentDigest, DefaultRegistry, ImageReference, Registry},
};
use std::collections::HashMap;

/// A remote image to pull, and whether its registry may be reached over
/// insecure transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullthroughSpec {
    pub reference: ImageReference,
    pub insecure: bool,
}

/// Where the local registry itself lives, as far as one stream knows
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalRegistry {
    /// The stream's repository on the local registry, in-cluster location
    /// first and public location second
    pub repositories: Vec<ImageReference>,
    /// Every hostname the local registry answers to
    pub hostnames: Vec<Registry>,
}

impl LocalRegistry {
    /// Parse the stream's recorded repository locations
    ///
    /// Locations that don't parse are logged and left out.
    pub fn from_stream(stream: &ImageStream, aliases: &[Registry]) -> Self {
        let mut local = LocalRegistry {
            repositories: vec![],
            hostnames: aliases.to_vec(),
        };
        let locations = [
            ("dockerImageRepository", &stream.status.docker_image_repository),
            (
                "publicDockerImageRepository",
                &stream.status.public_docker_image_repository,
            ),
        ];
        for (field, location) in locations.iter() {
            if location.is_empty() {
                continue;
            }
            match ImageReference::parse(location) {
                Ok(reference) => local.add(reference),
                Err(err) => log::warn!("unable to parse {} {:?}: {}", field, location, err),
            }
        }
        local
    }

    fn add(&mut self, reference: ImageReference) {
        if let Some(registry) = &reference.registry {
            if !self.hostnames.contains(registry) {
                self.hostnames.push(registry.clone());
            }
            self.repositories.push(reference);
        }
    }

    pub fn is_local(&self, reference: &ImageReference) -> bool {
        match &reference.registry {
            Some(registry) => self.hostnames.contains(registry),
            None => false,
        }
    }
}

/// Ordered, de-duplicated pullthrough candidates
struct Candidates {
    order: Vec<String>,
    specs: HashMap<String, PullthroughSpec>,
}

impl Candidates {
    fn offer(&mut self, reference: ImageReference, insecure: bool) {
        let key = reference.as_repository().exact();
        if self.specs.contains_key(&key) {
            return;
        }
        self.order.push(key.clone());
        self.specs.insert(key, PullthroughSpec { reference, insecure });
    }
}

/// Compute the repositories a missing blob may be pulled through from
///
/// Candidates are keyed by their exact repository (`registry/namespace/name`)
/// and ordered: the local registry's own repositories when `primary` is set,
/// then the head event of every tag, then every older event, each in the
/// order of the stream's tag history. The first appearance of a repository
/// wins. Upstream references pointing back at the local registry are never
/// candidates on their own.
///
/// A candidate is insecure when the stream-wide annotation is set or when the
/// import policy of the tag it came from says so. Once any tag marks a
/// registry insecure, every candidate on that registry is insecure.
pub fn identify_candidate_repositories(
    stream: &ImageStream,
    local: &LocalRegistry,
    primary: bool,
    defaults: &DefaultRegistry,
) -> (Vec<String>, HashMap<String, PullthroughSpec>) {
    let insecure_by_default = stream.is_insecure();
    let mut candidates = Candidates {
        order: vec![],
        specs: HashMap::new(),
    };

    if primary {
        for repository in &local.repositories {
            candidates.offer(repository.clone(), insecure_by_default);
        }
    }

    let heads = stream
        .status
        .tags
        .iter()
        .flat_map(|history| history.items.iter().take(1).map(move |e| (&history.tag, e)));
    let older = stream
        .status
        .tags
        .iter()
        .flat_map(|history| history.items.iter().skip(1).map(move |e| (&history.tag, e)));

    let mut insecure_registries: HashMap<String, bool> = HashMap::new();
    for (tag, event) in heads.chain(older) {
        let reference = match upstream_reference(event, local) {
            Some(reference) => defaults.client_defaults(&reference),
            None => continue,
        };
        let insecure = insecure_by_default
            || stream
                .spec_tag(tag)
                .map(|t| t.import_policy.insecure)
                .unwrap_or(false);
        let registry = reference.registry_hostname().unwrap_or_default().to_owned();
        *insecure_registries.entry(registry).or_insert(false) |= insecure;
        candidates.offer(reference, insecure);
    }

    for spec in candidates.specs.values_mut() {
        let registry = spec.reference.registry_hostname().unwrap_or_default();
        if insecure_registries.get(registry).copied().unwrap_or(false) {
            spec.insecure = true;
        }
    }

    (candidates.order, candidates.specs)
}

fn upstream_reference(event: &TagEvent, local: &LocalRegistry) -> Option<ImageReference> {
    match ImageReference::parse(&event.docker_image_reference) {
        Ok(reference) if local.is_local(&reference) => None,
        Ok(reference) => Some(reference),
        Err(err) => {
            log::debug!(
                "skipping pullthrough candidate {:?}: {}",
                event.docker_image_reference,
                err
            );
            None
        }
    }
}

impl ScopedImageStream {
    /// Does the stream, or the tag an image came from, allow insecure
    /// transport?
    ///
    /// With no tag, the tag is taken from the most recent history event for
    /// the digest.
    pub async fn tag_is_insecure(
        &mut self,
        ctx: &RequestContext,
        tag: Option<&str>,
        digest: &ContentDigest,
    ) -> Result<bool, ImageStreamError> {
        let stream = self.getter.get(ctx).await.map_err(|err| {
            ImageStreamError::from_getter(
                err,
                format!("tag_is_insecure: failed to get image stream {}", self.reference()),
            )
        })?;

        if stream.is_insecure() {
            return Ok(true);
        }

        let tag = match tag {
            Some(tag) if !tag.is_empty() => Some(tag),
            _ => latest_image_tag_event(&stream, digest.as_str()).map(|(tag, _)| tag),
        };

        Ok(tag
            .and_then(|tag| stream.spec_tag(tag))
            .map(|t| t.import_policy.insecure)
            .unwrap_or(false))
    }

    /// Hostnames and repositories of the local registry for this stream
    pub async fn local_registry(
        &mut self,
        ctx: &RequestContext,
    ) -> Result<LocalRegistry, ImageStreamError> {
        let stream = self.getter.get(ctx).await.map_err(|err| {
            ImageStreamError::from_getter(
                err,
                format!("local_registry: failed to get image stream {}", self.reference()),
            )
        })?;
        Ok(LocalRegistry::from_stream(&stream, &self.local_aliases))
    }

    /// Ordered upstream repositories for pullthrough, with a pull spec each
    ///
    /// See [identify_candidate_repositories] for the ordering rules.
    pub async fn identify_candidate_repositories(
        &mut self,
        ctx: &RequestContext,
        primary: bool,
    ) -> Result<(Vec<String>, HashMap<String, PullthroughSpec>), ImageStreamError> {
        let stream = self.getter.get(ctx).await.map_err(|err| {
            ImageStreamError::from_getter(
                err,
                format!(
                    "identify_candidate_repositories: failed to get image stream {}",
                    self.reference()
                ),
            )
        })?;

        let local = LocalRegistry::from_stream(&stream, &self.local_aliases);
        Ok(identify_candidate_repositories(
            &stream,
            &local,
            primary,
            &self.defaults,
        ))
    }
}
