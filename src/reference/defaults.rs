//! Docker client defaults for references that leave parts unspecified

use crate::reference::{ImageReference, Registry};

/// Settings used to complete upstream references that omit their registry
///
/// If you don't need aliases or a library namespace, you can convert a plain
/// [Registry] [Into] a [DefaultRegistry]
#[derive(Clone, Debug)]
pub struct DefaultRegistry {
    /// References without a registry are pulled from this one
    pub network_name: Registry,
    /// This registry is also known under additional names
    pub also_known_as: Vec<Registry>,
    /// Namespace for single-component repository names on this registry
    pub library_namespace: Option<String>,
    /// Tag assumed when a reference has neither tag nor digest
    pub default_tag: Option<String>,
}

impl From<Registry> for DefaultRegistry {
    fn from(network_name: Registry) -> Self {
        DefaultRegistry {
            network_name,
            also_known_as: vec![],
            library_namespace: None,
            default_tag: None,
        }
    }
}

impl Default for DefaultRegistry {
    fn default() -> Self {
        DefaultRegistry::new()
    }
}

impl DefaultRegistry {
    /// Return the built-in Docker Hub defaults
    pub fn new() -> Self {
        DefaultRegistry {
            network_name: "docker.io".parse().unwrap(),
            also_known_as: vec![
                "index.docker.io".parse().unwrap(),
                "registry-1.docker.io".parse().unwrap(),
            ],
            library_namespace: Some("library".to_owned()),
            default_tag: Some("latest".to_owned()),
        }
    }

    /// Is the registry named one of ours?
    ///
    /// A missing registry is not "named", so this is false for `None`.
    pub fn is_named(&self, registry: Option<&Registry>) -> bool {
        match registry {
            None => false,
            Some(registry) => {
                registry == &self.network_name || self.also_known_as.contains(registry)
            }
        }
    }

    /// Complete a reference the way a Docker client would before pulling
    ///
    /// Missing registries become `network_name`, aliases collapse onto it,
    /// single-component names on this registry get the library namespace,
    /// and a reference with neither tag nor digest gets the default tag.
    pub fn client_defaults(&self, reference: &ImageReference) -> ImageReference {
        let mut completed = reference.clone();
        if completed.registry.is_none() || self.is_named(completed.registry.as_ref()) {
            completed.registry = Some(self.network_name.clone());
            if completed.namespace.is_none() {
                completed.namespace = self.library_namespace.clone();
            }
        }
        if completed.tag.is_none() && completed.id.is_none() {
            completed.tag = self.default_tag.clone();
        }
        completed
    }

    /// Render a reference as a pull spec
    ///
    /// This is the exact form, except that a single-component name on one of
    /// our named registries gains the library namespace. Nothing is added to
    /// references without a registry.
    pub fn pull_spec(&self, reference: &ImageReference) -> String {
        if reference.namespace.is_none() && self.is_named(reference.registry.as_ref()) {
            let mut spec = reference.clone();
            spec.namespace = self.library_namespace.clone();
            spec.exact()
        } else {
            reference.exact()
        }
    }
}
