use crate::errors::ReferenceError;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::{
    cmp::{Ord, Ordering, PartialOrd},
    fmt,
    hash::{Hash, Hasher},
    ops::Range,
    str,
    str::FromStr,
};

/// A digest securely identifies a manifest, a manifest list, or a blob
///
/// Digests are `algorithm:hex`. Images are named by the digest of their
/// manifest, so a [ContentDigest] is also the identity of an image record in
/// the control plane.
#[derive(Clone)]
pub struct ContentDigest {
    serialized: String,
    algorithm_pos: Range<usize>,
    hex_pos: Range<usize>,
}

impl ContentDigest {
    /// Returns a reference to the existing string representation
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// Hash the content with `sha256`
    ///
    /// ```
    /// # use imagestream::ContentDigest;
    /// let digest = ContentDigest::from_content(b"cat");
    /// assert_eq!(digest.as_str(), "sha256:77af778b51abd4a3c51c5ddd97204a9c3ae614ebccb75a606c3b6865aed6744e");
    /// ```
    pub fn from_content(content_bytes: &[u8]) -> Self {
        let hex = format!("{:x}", Sha256::digest(content_bytes));
        let algorithm = "sha256";
        ContentDigest {
            algorithm_pos: 0..algorithm.len(),
            hex_pos: algorithm.len() + 1..algorithm.len() + 1 + hex.len(),
            serialized: format!("{}:{}", algorithm, hex),
        }
    }

    /// Parse a [prim@str] as a [ContentDigest]
    ///
    /// ```
    /// # use imagestream::ContentDigest;
    /// let digest = ContentDigest::parse("sha256:00112233445566778899aabbccddeeff").unwrap();
    /// assert_eq!(digest.algorithm(), "sha256");
    /// assert_eq!(digest.hex(), "00112233445566778899aabbccddeeff")
    /// ```
    pub fn parse(s: &str) -> Result<Self, ReferenceError> {
        lazy_static! {
            static ref RE: Regex =
                Regex::new(&format!("^{}$", ContentDigest::regex_str())).unwrap();
        }
        match RE.captures(s) {
            None => Err(ReferenceError::InvalidDigestFormat(s.to_owned())),
            Some(captures) => match (captures.name("dig_f"), captures.name("dig_h")) {
                (Some(algorithm), Some(hex)) => Ok(ContentDigest {
                    serialized: s.to_owned(),
                    algorithm_pos: algorithm.range(),
                    hex_pos: hex.range(),
                }),
                _ => Err(ReferenceError::InvalidDigestFormat(s.to_owned())),
            },
        }
    }

    /// The hash algorithm, such as `sha256`
    pub fn algorithm(&self) -> &str {
        &self.serialized[self.algorithm_pos.clone()]
    }

    /// The lowercase hex portion, at least 32 digits
    pub fn hex(&self) -> &str {
        &self.serialized[self.hex_pos.clone()]
    }

    /// Does this digest answer to the given image ID?
    ///
    /// Image IDs may be abbreviated: an ID matches when it is a prefix of
    /// either the full digest string or its hex portion.
    pub fn matches_id(&self, id: &str) -> bool {
        !id.is_empty() && (self.hex().starts_with(id) || self.as_str().starts_with(id))
    }

    pub(crate) fn regex_str() -> &'static str {
        concat!(
            "(?P<dig>",
            /*  */ "(?P<dig_f>", // algorithm
            /* -- */ "[a-zA-Z][a-zA-Z0-9]*",
            /* -- */ "(?:[-_+.][a-zA-Z][a-zA-Z0-9]*)*",
            /*  */ ")",
            /*  */ "[:]",
            /*  */ "(?P<dig_h>", // encoded value
            /* -- */ "[a-f0-9]{32,}",
            /*  */ ")",
            ")",
        )
    }
}

/// Match a recorded image name against a requested image ID
///
/// Recorded names are normally digests, in which case abbreviated IDs are
/// accepted. Anything else must match as a plain string prefix.
pub fn digest_or_image_match(image: &str, id: &str) -> bool {
    match ContentDigest::parse(image) {
        Ok(digest) => digest.matches_id(id),
        Err(_) => !id.is_empty() && image.starts_with(id),
    }
}

impl Eq for ContentDigest {}

impl PartialEq for ContentDigest {
    fn eq(&self, other: &Self) -> bool {
        self.serialized.eq(&other.serialized)
    }
}

impl FromStr for ContentDigest {
    type Err = ReferenceError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentDigest::parse(s)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Hash for ContentDigest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serialized.hash(state);
    }
}

impl Ord for ContentDigest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.serialized.cmp(&other.serialized)
    }
}

impl PartialOrd for ContentDigest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ContentDigest::parse(&s).map_err(de::Error::custom)
    }
}
