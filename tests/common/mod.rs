#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use imagestream::{
    api::{
        Image, ImageStream, ImageStreamLayers, ImageStreamMapping, LimitRangeList,
        NamedTagEventList, SecretList, TagEvent,
    },
    errors::ApiError,
    ContentDigest, ControlPlane,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn digest(seed: &str) -> ContentDigest {
    ContentDigest::from_content(seed.as_bytes())
}

pub fn event(image: &ContentDigest, reference: &str, hour: u32) -> TagEvent {
    TagEvent {
        created: Utc.with_ymd_and_hms(2021, 6, 1, hour, 0, 0).unwrap(),
        docker_image_reference: reference.to_owned(),
        image: image.as_str().to_owned(),
        generation: 1,
    }
}

pub fn history(tag: &str, items: Vec<TagEvent>) -> NamedTagEventList {
    NamedTagEventList {
        tag: tag.to_owned(),
        items,
    }
}

pub fn image(digest: &ContentDigest, stored_reference: &str) -> Image {
    let mut image = Image::default();
    image.metadata.name = digest.as_str().to_owned();
    image.docker_image_reference = stored_reference.to_owned();
    image
}

/// A control plane that serves canned objects and counts every call
#[derive(Default)]
pub struct FakeControlPlane {
    streams: Mutex<HashMap<String, ImageStream>>,
    stream_failures: Mutex<HashMap<String, ApiError>>,
    layers: Mutex<HashMap<String, ImageStreamLayers>>,
    images: Mutex<HashMap<String, Image>>,
    image_failures: Mutex<HashMap<String, ApiError>>,
    mapping_results: Mutex<VecDeque<Result<(), ApiError>>>,
    create_results: Mutex<VecDeque<Result<ImageStream, ApiError>>>,
    mappings: Mutex<Vec<ImageStreamMapping>>,
    secrets: Mutex<Option<Result<SecretList, ApiError>>>,
    limit_ranges: Mutex<Option<Result<LimitRangeList, ApiError>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

fn key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

impl FakeControlPlane {
    pub fn new() -> Self {
        FakeControlPlane::default()
    }

    pub fn with_stream(self, stream: ImageStream) -> Self {
        let k = key(&stream.metadata.namespace, &stream.metadata.name);
        self.streams.lock().unwrap().insert(k, stream);
        self
    }

    pub fn with_stream_failure(self, namespace: &str, name: &str, err: ApiError) -> Self {
        self.stream_failures
            .lock()
            .unwrap()
            .insert(key(namespace, name), err);
        self
    }

    pub fn with_layers(self, namespace: &str, name: &str, layers: ImageStreamLayers) -> Self {
        self.layers
            .lock()
            .unwrap()
            .insert(key(namespace, name), layers);
        self
    }

    pub fn with_image(self, image: Image) -> Self {
        let name = image.metadata.name.clone();
        self.images.lock().unwrap().insert(name, image);
        self
    }

    pub fn with_image_failure(self, name: &str, err: ApiError) -> Self {
        self.image_failures
            .lock()
            .unwrap()
            .insert(name.to_owned(), err);
        self
    }

    /// Mapping writes answer with these, in order, then succeed
    pub fn with_mapping_results(self, results: Vec<Result<(), ApiError>>) -> Self {
        self.mapping_results.lock().unwrap().extend(results);
        self
    }

    /// Stream creation answers with these, in order, then echoes its input
    pub fn with_create_results(self, results: Vec<Result<ImageStream, ApiError>>) -> Self {
        self.create_results.lock().unwrap().extend(results);
        self
    }

    pub fn with_secrets(self, result: Result<SecretList, ApiError>) -> Self {
        *self.secrets.lock().unwrap() = Some(result);
        self
    }

    pub fn with_limit_ranges(self, result: Result<LimitRangeList, ApiError>) -> Self {
        *self.limit_ranges.lock().unwrap() = Some(result);
        self
    }

    /// How many times an operation was called
    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    /// Mappings that were accepted
    pub fn mappings(&self) -> Vec<ImageStreamMapping> {
        self.mappings.lock().unwrap().clone()
    }

    fn count(&self, operation: &'static str) {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn get_image_stream(&self, namespace: &str, name: &str) -> Result<ImageStream, ApiError> {
        self.count("get_image_stream");
        let k = key(namespace, name);
        if let Some(err) = self.stream_failures.lock().unwrap().get(&k) {
            return Err(err.clone());
        }
        self.streams
            .lock()
            .unwrap()
            .get(&k)
            .cloned()
            .ok_or_else(|| ApiError::not_found("imagestreams", name))
    }

    async fn get_image_stream_layers(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ImageStreamLayers, ApiError> {
        self.count("get_image_stream_layers");
        self.layers
            .lock()
            .unwrap()
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| ApiError::not_found("imagestreams", name))
    }

    async fn get_image(&self, name: &str) -> Result<Image, ApiError> {
        self.count("get_image");
        if let Some(err) = self.image_failures.lock().unwrap().get(name) {
            return Err(err.clone());
        }
        self.images
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::not_found("images", name))
    }

    async fn create_image_stream_mapping(&self, mapping: &ImageStreamMapping) -> Result<(), ApiError> {
        self.count("create_image_stream_mapping");
        let result = self
            .mapping_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        if result.is_ok() {
            self.mappings.lock().unwrap().push(mapping.clone());
        }
        result
    }

    async fn create_image_stream(&self, stream: &ImageStream) -> Result<ImageStream, ApiError> {
        self.count("create_image_stream");
        let result = self
            .create_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(stream.clone()));
        if let Ok(created) = &result {
            let k = key(&created.metadata.namespace, &created.metadata.name);
            self.streams.lock().unwrap().insert(k, created.clone());
        }
        result
    }

    async fn image_stream_secrets(&self, _namespace: &str, _name: &str) -> Result<SecretList, ApiError> {
        self.count("image_stream_secrets");
        self.secrets
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(SecretList::default()))
    }

    async fn list_limit_ranges(&self, _namespace: &str) -> Result<LimitRangeList, ApiError> {
        self.count("list_limit_ranges");
        self.limit_ranges
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(LimitRangeList::default()))
    }
}
