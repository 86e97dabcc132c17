use crate::errors::ApiError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Cancellation scope of one repository-scoped request
///
/// Timeouts and client disconnects are decided by the protocol server that
/// owns the request; it cancels the token and every pending or future
/// control-plane call made through this context fails with
/// [crate::errors::StatusReason::Cancelled].
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    token: CancellationToken,
}

impl RequestContext {
    pub fn new() -> Self {
        RequestContext::default()
    }

    /// Share cancellation with a token owned by the caller
    pub fn with_token(token: CancellationToken) -> Self {
        RequestContext { token }
    }

    pub fn cancel(&self) {
        self.token.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run one control-plane call under this context
    ///
    /// The call is never started when the context is already cancelled.
    pub async fn call<T, F>(&self, call: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        if self.token.is_cancelled() {
            log::debug!("request cancelled, skipping control plane call");
            return Err(ApiError::cancelled());
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ApiError::cancelled()),
            result = call => result,
        }
    }
}
