use crate::{
    client::ControlPlane,
    imagestream::{
        getter::{CachedImageGetter, CachedImageStreamGetter},
        ScopedImageStream,
    },
    reference::{DefaultRegistry, Registry},
};
use std::sync::Arc;

/// Builder for configuring custom [ScopedImageStream] instances
pub struct ScopedImageStreamBuilder {
    namespace: String,
    name: String,
    default_registry: Option<DefaultRegistry>,
    local_aliases: Vec<Registry>,
}

impl ScopedImageStreamBuilder {
    /// Start configuring access to the stream `namespace/name`
    pub fn new(namespace: &str, name: &str) -> Self {
        ScopedImageStreamBuilder {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            default_registry: None,
            local_aliases: vec![],
        }
    }

    /// Change the default registry
    ///
    /// This registry completes upstream references that don't name one, the
    /// way a Docker client would. If unset, [DefaultRegistry::new()] is used.
    pub fn default_registry(mut self, default_registry: DefaultRegistry) -> Self {
        self.default_registry = Some(default_registry);
        self
    }

    /// Add another hostname the local registry answers to
    ///
    /// The stream's own recorded repository locations always count as local.
    /// Upstream references on any local hostname are never pullthrough
    /// candidates.
    pub fn local_registry(mut self, registry: Registry) -> Self {
        if !self.local_aliases.contains(&registry) {
            self.local_aliases.push(registry);
        }
        self
    }

    /// Construct a [ScopedImageStream] which calls through `client`
    pub fn build(self, client: Arc<dyn ControlPlane>) -> ScopedImageStream {
        ScopedImageStream {
            getter: CachedImageStreamGetter::new(&self.namespace, &self.name, client.clone()),
            images: CachedImageGetter::new(client.clone()),
            namespace: self.namespace,
            name: self.name,
            client,
            defaults: self.default_registry.unwrap_or_else(DefaultRegistry::new),
            local_aliases: self.local_aliases,
        }
    }
}
