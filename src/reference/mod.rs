//! Image references, registries and digests


mod defaults;
mod digest;
mod registry;

pub use defaults::DefaultRegistry;
pub use digest::{digest_or_image_match, ContentDigest};
pub use registry::Registry;

use crate::errors::ReferenceError;
use regex::Regex;
use std::{fmt, str::FromStr};

/// Parsed Docker-style image reference
///
/// A reference is `[registry/][namespace/]name[:tag][@id]`. Only the name is
/// mandatory. Delineating the optional registry from the first repository
/// component follows Docker's heuristic: the first component is a registry
/// when it contains a dot or a colon, or is exactly `localhost`, and is
/// followed by more path.
///
/// A repository with more than two components keeps the first as its
/// namespace and the remaining path as its name.
///
/// Unlike the immutable name types elsewhere in this crate, the parts here
/// are plain fields. Pinning a sub-manifest is done by clearing the tag and
/// replacing the id of an existing reference.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ImageReference {
    pub registry: Option<Registry>,
    pub namespace: Option<String>,
    pub name: String,
    pub tag: Option<String>,
    pub id: Option<String>,
}

impl ImageReference {
    /// Parse a [prim@str] as an [ImageReference]
    pub fn parse(s: &str) -> Result<Self, ReferenceError> {
        lazy_static! {
            static ref PATH: Regex = Regex::new(&format!(
                "^{}(?::{})?(?:@{})?$",
                repository_regex_str(),
                tag_regex_str(),
                ContentDigest::regex_str()
            ))
            .unwrap();
        }
        let invalid = || ReferenceError::InvalidReferenceFormat(s.to_owned());

        let (registry, remainder) = match s.find('/') {
            Some(slash) if Registry::looks_like_registry(&s[..slash]) => {
                let registry = Registry::parse(&s[..slash]).map_err(|_| invalid())?;
                (Some(registry), &s[slash + 1..])
            }
            _ => (None, s),
        };

        let captures = PATH.captures(remainder).ok_or_else(invalid)?;
        let repository = captures.name("repo").ok_or_else(invalid)?.as_str();
        let (namespace, name) = match repository.find('/') {
            None => (None, repository.to_owned()),
            Some(slash) => (
                Some(repository[..slash].to_owned()),
                repository[slash + 1..].to_owned(),
            ),
        };

        Ok(ImageReference {
            registry,
            namespace,
            name,
            tag: captures.name("tag").map(|m| m.as_str().to_owned()),
            id: captures.name("dig").map(|m| m.as_str().to_owned()),
        })
    }

    /// The registry hostname, if the reference names one
    pub fn registry_hostname(&self) -> Option<&str> {
        self.registry.as_ref().map(Registry::as_str)
    }

    /// The repository path, `namespace/name` or just `name`
    pub fn repository_path(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}/{}", namespace, self.name),
            None => self.name.clone(),
        }
    }

    /// The same repository, without tag or id
    pub fn as_repository(&self) -> ImageReference {
        ImageReference {
            tag: None,
            id: None,
            ..self.clone()
        }
    }

    /// The same repository, pinned to exactly one manifest by digest
    pub fn pinned(&self, digest: &ContentDigest) -> ImageReference {
        ImageReference {
            tag: None,
            id: Some(digest.as_str().to_owned()),
            ..self.clone()
        }
    }

    /// Render every part that is set, with no defaulting
    pub fn exact(&self) -> String {
        let mut s = String::new();
        if let Some(registry) = &self.registry {
            s.push_str(registry.as_str());
            s.push('/');
        }
        s.push_str(&self.repository_path());
        if let Some(tag) = &self.tag {
            s.push(':');
            s.push_str(tag);
        }
        if let Some(id) = &self.id {
            s.push('@');
            s.push_str(id);
        }
        s
    }
}

fn repository_regex_str() -> &'static str {
    concat!(
        "(?P<repo>",
        /*  */ "[a-z0-9]+(?:(?:[._]|__|[-]*)[a-z0-9]+)*", // first component
        /*  */ "(?:/[a-z0-9]+(?:(?:[._]|__|[-]*)[a-z0-9]+)*)*", // more components
        ")"
    )
}

fn tag_regex_str() -> &'static str {
    "(?P<tag>[a-zA-Z0-9_][a-zA-Z0-9_.-]{0,127})"
}

impl FromStr for ImageReference {
    type Err = ReferenceError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageReference::parse(s)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.exact())
    }
}
