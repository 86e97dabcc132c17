//! Error types you might see while resolving images through an image stream

use http::StatusCode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from parsing image references and digests
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ReferenceError {
    /// invalid image reference format
    #[error("invalid image reference format: {0:?}")]
    InvalidReferenceFormat(String),

    /// invalid content digest format
    #[error("invalid content digest format: {0:?}")]
    InvalidDigestFormat(String),
}

/// Machine-readable reason attached to a control-plane failure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusReason {
    NotFound,
    AlreadyExists,
    Conflict,
    Forbidden,
    Unauthorized,
    Invalid,
    /// the request context was cancelled before or during the call
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// Identifies the object a control-plane failure refers to
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,
}

/// Wire form of a control-plane failure, as found in a response body
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub reason: Option<StatusReason>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<StatusDetails>,
}

/// A failed call to the control plane
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{status} {reason:?}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub reason: StatusReason,
    pub message: String,
    pub details: Option<StatusDetails>,
}

lazy_static! {
    static ref QUOTA_EXCEEDED: Regex = Regex::new("exceeded quota").unwrap();
    static ref QUOTA_UNKNOWN: Regex = Regex::new("status unknown for quota").unwrap();
    static ref LIMIT_EXCEEDED: Regex = Regex::new("exceeds the maximum limit").unwrap();
}

impl ApiError {
    pub fn new(status: StatusCode, reason: StatusReason, message: impl Into<String>) -> Self {
        ApiError {
            status,
            reason,
            message: message.into(),
            details: None,
        }
    }

    /// Attach the kind and name of the object this failure refers to
    pub fn with_details(mut self, kind: &str, name: &str) -> Self {
        self.details = Some(StatusDetails {
            kind: kind.to_owned(),
            name: name.to_owned(),
        });
        self
    }

    pub fn not_found(kind: &str, name: &str) -> Self {
        ApiError::new(
            StatusCode::NOT_FOUND,
            StatusReason::NotFound,
            format!("{} {:?} not found", kind, name),
        )
        .with_details(kind, name)
    }

    pub fn already_exists(kind: &str, name: &str) -> Self {
        ApiError::new(
            StatusCode::CONFLICT,
            StatusReason::AlreadyExists,
            format!("{} {:?} already exists", kind, name),
        )
        .with_details(kind, name)
    }

    pub fn conflict(kind: &str, name: &str, message: &str) -> Self {
        ApiError::new(StatusCode::CONFLICT, StatusReason::Conflict, message).with_details(kind, name)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::FORBIDDEN, StatusReason::Forbidden, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, StatusReason::Unauthorized, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, StatusReason::Invalid, message)
    }

    /// A quota rejection, in the form the quota admission plugin reports it
    pub fn quota_exceeded(resource: &str) -> Self {
        ApiError::forbidden(format!(
            "exceeded quota: {}, requested: count/{}=1",
            resource, resource
        ))
    }

    pub fn cancelled() -> Self {
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            StatusReason::Cancelled,
            "request context cancelled",
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusReason::Unknown,
            message,
        )
    }

    /// Decode a control-plane `Status` response body
    pub fn from_status_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let status: Status = serde_json::from_slice(body)?;
        Ok(status.into())
    }

    pub fn is_not_found(&self) -> bool {
        self.reason == StatusReason::NotFound
    }

    pub fn is_already_exists(&self) -> bool {
        self.reason == StatusReason::AlreadyExists
    }

    pub fn is_conflict(&self) -> bool {
        self.reason == StatusReason::Conflict
    }

    pub fn is_forbidden(&self) -> bool {
        self.reason == StatusReason::Forbidden
    }

    pub fn is_unauthorized(&self) -> bool {
        self.reason == StatusReason::Unauthorized
    }

    /// Is this a rejection by resource quota or limit range admission?
    pub fn is_quota_exceeded(&self) -> bool {
        let message = self.message.to_lowercase();
        match self.reason {
            StatusReason::Forbidden => {
                QUOTA_EXCEEDED.is_match(&message) || QUOTA_UNKNOWN.is_match(&message)
            }
            StatusReason::Invalid => LIMIT_EXCEEDED.is_match(&message),
            _ => false,
        }
    }

    /// Kind of the object named in the failure details, if any
    pub fn details_kind(&self) -> Option<&str> {
        self.details.as_ref().map(|d| d.kind.as_str())
    }

    /// Name of the object named in the failure details, if any
    pub fn details_name(&self) -> Option<&str> {
        self.details.as_ref().map(|d| d.name.as_str())
    }
}

impl From<Status> for ApiError {
    fn from(status: Status) -> Self {
        let code = StatusCode::from_u16(status.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let reason = status.reason.unwrap_or(match code {
            StatusCode::NOT_FOUND => StatusReason::NotFound,
            StatusCode::CONFLICT => StatusReason::Conflict,
            StatusCode::FORBIDDEN => StatusReason::Forbidden,
            StatusCode::UNAUTHORIZED => StatusReason::Unauthorized,
            StatusCode::UNPROCESSABLE_ENTITY => StatusReason::Invalid,
            _ => StatusReason::Unknown,
        });
        ApiError {
            status: code,
            reason,
            message: status.message,
            details: status.details,
        }
    }
}

/// Failure to find exactly one image for an image ID in a stream's history
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ImageIdError {
    #[error("no image in the stream history matches {0:?}")]
    NotFound(String),

    #[error("multiple images match the prefix {id:?}: {}", .matches.join(", "))]
    Ambiguous { id: String, matches: Vec<String> },
}

/// How the request-scoped image stream cache classifies a failed fetch
///
/// Callers remap these into [ImageStreamError] with their own message; the
/// classification itself never leaves the crate's public operations.
#[derive(Error, Clone, Debug)]
pub enum GetterError {
    #[error("image stream not found: {0}")]
    NotFound(ApiError),

    #[error("access to image stream forbidden: {0}")]
    Forbidden(ApiError),

    #[error("unable to get image stream: {0}")]
    Unknown(ApiError),
}

impl From<ApiError> for GetterError {
    fn from(err: ApiError) -> Self {
        if err.is_not_found() {
            GetterError::NotFound(err)
        } else if err.is_forbidden() {
            GetterError::Forbidden(err)
        } else {
            GetterError::Unknown(err)
        }
    }
}

/// Error code of an [ImageStreamError]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Unknown,
    NotFound,
    ImageNotFound,
    Forbidden,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unknown => "ImageStream:Unknown",
            ErrorCode::NotFound => "ImageStream:NotFound",
            ErrorCode::ImageNotFound => "ImageStream:ImageNotFound",
            ErrorCode::Forbidden => "ImageStream:Forbidden",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Underlying failure of an [ImageStreamError]
#[derive(Error, Debug)]
pub enum Cause {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Getter(#[from] GetterError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    ImageId(#[from] ImageIdError),

    #[error(transparent)]
    ImageStream(#[from] Box<ImageStreamError>),
}

/// Errors reported by the public operations of a [crate::ScopedImageStream]
#[derive(Error, Debug)]
#[error("{code} {message}")]
pub struct ImageStreamError {
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<Cause>,
}

impl ImageStreamError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ImageStreamError {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn caused_by(mut self, cause: impl Into<Cause>) -> Self {
        self.source = Some(cause.into());
        self
    }

    /// Wrap another stream error, keeping it as the source
    pub(crate) fn wrapping(code: ErrorCode, message: impl Into<String>, inner: Self) -> Self {
        ImageStreamError::new(code, message).caused_by(Box::new(inner))
    }

    /// Remap a cache classification into the public taxonomy
    pub(crate) fn from_getter(err: GetterError, message: impl Into<String>) -> Self {
        let code = match &err {
            GetterError::NotFound(_) => ErrorCode::NotFound,
            GetterError::Forbidden(_) => ErrorCode::Forbidden,
            GetterError::Unknown(_) => ErrorCode::Unknown,
        };
        ImageStreamError::new(code, message).caused_by(err)
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.source.as_ref()
    }
}

/// Errors from a [crate::client::ProjectObjectListStore]
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// the store cannot take another namespace
    #[error("project object store is full ({0} namespaces)")]
    Full(usize),
}
