//! Control-plane objects this layer reads and writes
//!
//! Partial models of the image API group, limited to the fields the
//! resolution layer looks at. Field names follow the control plane's JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annotation marking every tag of a stream as importable over insecure
/// transport
pub const INSECURE_REPOSITORY_ANNOTATION: &str = "openshift.io/image.insecureRepository";

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ImageStream {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ImageStreamSpec,
    #[serde(default)]
    pub status: ImageStreamStatus,
}

impl ImageStream {
    /// An empty stream, as created by auto-provisioning
    pub fn named(namespace: &str, name: &str) -> Self {
        ImageStream {
            metadata: ObjectMeta {
                name: name.to_owned(),
                namespace: namespace.to_owned(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Is the stream-wide insecure annotation set to `true`?
    pub fn is_insecure(&self) -> bool {
        self.metadata
            .annotations
            .get(INSECURE_REPOSITORY_ANNOTATION)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    /// Look up a spec tag by name
    pub fn spec_tag(&self, name: &str) -> Option<&TagReference> {
        self.spec.tags.iter().find(|t| t.name == name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ImageStreamSpec {
    #[serde(default)]
    pub tags: Vec<TagReference>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct TagReference {
    pub name: String,
    #[serde(default, rename = "importPolicy")]
    pub import_policy: TagImportPolicy,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct TagImportPolicy {
    #[serde(default)]
    pub insecure: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ImageStreamStatus {
    #[serde(default, rename = "dockerImageRepository")]
    pub docker_image_repository: String,
    #[serde(default, rename = "publicDockerImageRepository")]
    pub public_docker_image_repository: String,
    #[serde(default)]
    pub tags: Vec<NamedTagEventList>,
}

/// History of one tag, newest event first
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct NamedTagEventList {
    pub tag: String,
    #[serde(default)]
    pub items: Vec<TagEvent>,
}

/// One entry in a tag's history
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TagEvent {
    pub created: DateTime<Utc>,
    #[serde(rename = "dockerImageReference")]
    pub docker_image_reference: String,
    pub image: String,
    #[serde(default)]
    pub generation: i64,
}

/// An image record, named by its manifest digest
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Image {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, rename = "dockerImageReference")]
    pub docker_image_reference: String,
    #[serde(default, rename = "dockerImageManifestMediaType")]
    pub docker_image_manifest_media_type: String,
    #[serde(default, rename = "dockerImageLayers")]
    pub docker_image_layers: Vec<ImageLayer>,
    #[serde(default, rename = "dockerImageManifests")]
    pub docker_image_manifests: Vec<ImageManifest>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ImageLayer {
    pub name: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default, rename = "mediaType")]
    pub media_type: String,
}

/// A child manifest of a manifest list
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ImageManifest {
    pub digest: String,
    #[serde(default, rename = "mediaType")]
    pub media_type: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub os: String,
}

/// Registers an image under a tag of a stream
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ImageStreamMapping {
    pub metadata: ObjectMeta,
    pub image: Image,
    pub tag: String,
}

/// Blob and manifest membership of every image referenced by a stream
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ImageStreamLayers {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub blobs: BTreeMap<String, ImageLayerData>,
    #[serde(default)]
    pub images: BTreeMap<String, ImageBlobReferences>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ImageLayerData {
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default, rename = "mediaType")]
    pub media_type: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ImageBlobReferences {
    #[serde(default, rename = "imageMissing")]
    pub image_missing: bool,
    #[serde(default)]
    pub layers: Vec<String>,
    #[serde(default)]
    pub config: Option<String>,
    /// Child manifests, set only for manifest lists
    #[serde(default)]
    pub manifests: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Secret {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, rename = "type")]
    pub secret_type: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct SecretList {
    #[serde(default)]
    pub items: Vec<Secret>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct LimitRangeList {
    #[serde(default)]
    pub items: Vec<LimitRange>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct LimitRange {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: LimitRangeSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct LimitRangeSpec {
    #[serde(default)]
    pub limits: Vec<LimitRangeItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct LimitRangeItem {
    #[serde(rename = "type")]
    pub limit_type: String,
    #[serde(default)]
    pub max: BTreeMap<String, String>,
    #[serde(default)]
    pub min: BTreeMap<String, String>,
}
