//! Crate-wide error taxonomy for the proxy event core.

use thiserror::Error;

/// Errors observable at the public proxy-event boundary.
///
/// Binding-specific error types are collapsed into [`ProxyError::BindingFailure`]
/// at the facade boundary, except [`ProxyError::NotSubscribed`], which is always
/// passed through verbatim so callers can re-subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProxyError {
    /// A poll or query was issued before a successful `Subscribe`.
    #[error("event is not subscribed")]
    NotSubscribed,

    /// The tracker has no available guards left for this poll.
    #[error("no free sample slots available for this subscription")]
    MaxSamplesReached,

    /// A re-`Subscribe` was issued with a different `max_sample_count` while
    /// already subscribed or pending.
    #[error("max sample count cannot be changed while subscription is active")]
    MaxSampleCountNotRealizable,

    /// `SetReceiveHandler` failed at the binding.
    #[error("failed to register receive handler with binding")]
    SetHandlerNotSet,

    /// `UnsetReceiveHandler` failed at the binding.
    #[error("failed to unregister receive handler from binding")]
    UnsetFailure,

    /// Any other binding-originated failure, collapsed from a binding-specific error.
    #[error("binding operation failed")]
    BindingFailure,

    /// The handle used to construct a proxy or binding was invalid.
    #[error("invalid service instance handle")]
    InvalidHandle,
}

pub type ProxyResult<T> = Result<T, ProxyError>;
