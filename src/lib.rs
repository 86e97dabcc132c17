//! Image stream resolution for a container image registry front-end
//!
//! The distribution server speaks in digests and tags, while the cluster's
//! control plane keeps image streams: named, versioned mappings from tags to
//! images, with import and security policy attached. This crate answers the
//! questions in between, one request at a time, with a [ScopedImageStream]:
//!
//! - which [api::Image] a digest names, and what its pull reference should
//!   read ([ScopedImageStream::resolve])
//! - whether a tag may be pulled over insecure transport
//!   ([ScopedImageStream::tag_is_insecure])
//! - which upstream repositories a missing blob can be pulled through from
//!   ([ScopedImageStream::identify_candidate_repositories])
//! - registering a pulled image under a tag, creating the stream on the way
//!   if needed ([ScopedImageStream::create_mapping])
//!
//! The control plane itself is reached through the [client::ControlPlane]
//! trait, and every call is bounded by a [client::RequestContext].

#[macro_use] extern crate lazy_static;

pub mod api;
pub mod client;
pub mod errors;
pub mod imagestream;
pub mod reference;

pub use crate::{
    client::{ControlPlane, RequestContext},
    errors::{ErrorCode, ImageStreamError},
    imagestream::{DisplayImage, PullthroughSpec, ScopedImageStream, ScopedImageStreamBuilder},
    reference::{ContentDigest, DefaultRegistry, ImageReference, Registry},
};
