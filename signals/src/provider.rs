use std::ops::Deref;
use std::sync::Arc;

use crate::error::ProviderError;

#[cfg(any(test, feature = "test-helpers"))]
mod manual;
#[cfg(any(test, feature = "test-helpers"))]
pub use manual::*;

/// Opaque token for one live provider-side callback registration.
/// Consumed by [`Provider::unregister`], so a registration can only be released once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct RegistrationHandle(u64);

impl RegistrationHandle {
    pub fn new(raw: u64) -> Self { Self(raw) }

    pub fn raw(&self) -> u64 { self.0 }
}

/// Callback handed to [`Provider::register`]. Invoked on an arbitrary provider thread.
pub type ProviderCallback<R> = Arc<dyn Fn(Lease<R>) + Send + Sync + 'static>;

/// One provider kind of the external signal source.
///
/// Implementations answer synchronous snapshot queries and accept a single callback registration
/// at a time. Calls may block; the hub never makes them while holding a lock the push path needs.
pub trait Provider: Send + Sync + 'static {
    /// Payload delivered by `query` and by the registered callback
    type Raw: Send + 'static;

    fn query(&self) -> Result<Lease<Self::Raw>, ProviderError>;

    fn register(&self, callback: ProviderCallback<Self::Raw>) -> Result<RegistrationHandle, ProviderError>;

    fn unregister(&self, handle: RegistrationHandle) -> Result<(), ProviderError>;
}

/// A provider payload on loan for the duration of one decode.
///
/// Owns the value and an optional release function, which runs exactly once when the lease is dropped,
/// whichever way decoding ends.
pub struct Lease<R> {
    value: Option<R>,
    release: Option<Box<dyn FnOnce(R) + Send + 'static>>,
}

impl<R> Lease<R> {
    /// A payload with nothing to hand back to the provider
    pub fn owned(value: R) -> Self { Self { value: Some(value), release: None } }

    /// A payload that must be returned to the provider through `release`
    pub fn with_release(value: R, release: impl FnOnce(R) + Send + 'static) -> Self { Self { value: Some(value), release: Some(Box::new(release)) } }
}

impl<R> Deref for Lease<R> {
    type Target = R;
    fn deref(&self) -> &R {
        match &self.value {
            Some(value) => value,
            None => unreachable!("lease value is only taken on drop"),
        }
    }
}

impl<R> Drop for Lease<R> {
    fn drop(&mut self) {
        if let (Some(value), Some(release)) = (self.value.take(), self.release.take()) {
            release(value);
        }
    }
}

impl<R: std::fmt::Debug> std::fmt::Debug for Lease<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease").field("value", &self.value).field("release", &self.release.is_some()).finish()
    }
}
