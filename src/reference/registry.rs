use crate::errors::ReferenceError;
use regex::Regex;
use std::{
    cmp::{Ord, Ordering, PartialOrd},
    fmt,
    hash::{Hash, Hasher},
    ops::Range,
    str::FromStr,
};

/// Hostname of a registry server, with an optional port
///
/// The local registry is usually known under more than one of these: the
/// in-cluster service address recorded as the stream's repository location,
/// and a public route. Upstream references are compared against all of them
/// so the registry never treats itself as an upstream.
#[derive(Clone)]
pub struct Registry {
    serialized: String,
    domain_pos: Range<usize>,
    port: Option<u16>,
}

impl Registry {
    /// Returns a reference to the existing string representation
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// Parse a [prim@str] as a [Registry]
    pub fn parse(s: &str) -> Result<Self, ReferenceError> {
        lazy_static! {
            static ref RE: Regex = Regex::new(&format!("^{}$", Registry::regex_str())).unwrap();
        }
        let invalid = || ReferenceError::InvalidReferenceFormat(s.to_owned());
        let captures = RE.captures(s).ok_or_else(invalid)?;
        let domain = captures.name("reg_d").ok_or_else(invalid)?;
        let port = match captures.name("reg_p") {
            None => None,
            Some(m) => Some(m.as_str().parse().map_err(|_| invalid())?),
        };
        Ok(Registry {
            serialized: s.to_owned(),
            domain_pos: domain.range(),
            port,
        })
    }

    /// The domain name without any port
    pub fn domain(&self) -> &str {
        &self.serialized[self.domain_pos.clone()]
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Would Docker read this as a registry, rather than a repository path
    /// component, when it appears first in a reference?
    pub fn looks_like_registry(component: &str) -> bool {
        component.contains('.') || component.contains(':') || component == "localhost"
    }

    pub(crate) fn regex_str() -> &'static str {
        concat!(
            "(?P<reg>",
            /*  */ "(?P<reg_d>",
            /* -- */ "(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])",
            /* -- */ "(?:\\.(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]))*",
            /*  */ ")",
            /*  */ "(?::(?P<reg_p>[0-9]+))?",
            ")",
        )
    }
}

impl Eq for Registry {}

impl PartialEq for Registry {
    fn eq(&self, other: &Self) -> bool {
        self.serialized.eq(&other.serialized)
    }
}

impl FromStr for Registry {
    type Err = ReferenceError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Registry::parse(s)
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Hash for Registry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serialized.hash(state);
    }
}

impl Ord for Registry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.serialized.cmp(&other.serialized)
    }
}

impl PartialOrd for Registry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
