use crate::signal::{ProviderKind, SignalId};
use thiserror::Error;

/// Failure reported by a provider call
#[derive(Error, Debug)]
#[error("{0}")]
pub struct ProviderError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl ProviderError {
    pub fn new<E>(err: E) -> Self
    where E: std::error::Error + Send + Sync + 'static {
        Self(Box::new(err))
    }

    pub fn msg(message: impl Into<String>) -> Self { Self(message.into().into()) }
}

/// A provider payload could not be turned into signal values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unrecognized {what} value {value}")]
    Unrecognized { what: &'static str, value: String },
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("signal {0} is not fed by this provider kind")]
    ForeignSignal(SignalId),
    #[error("signal {signal} does not hold values of type {expected}")]
    WrongType { signal: SignalId, expected: &'static str },
}

impl DecodeError {
    pub fn unrecognized(what: &'static str, value: impl std::fmt::Display) -> Self { Self::Unrecognized { what, value: value.to_string() } }
}

#[derive(Error, Debug)]
pub enum HubError {
    #[error("{kind}: provider query failed: {source}")]
    ProviderQueryFailed { kind: ProviderKind, source: ProviderError },
    #[error("{kind}: provider registration failed: {source}")]
    ProviderRegisterFailed { kind: ProviderKind, source: ProviderError },
    #[error("{kind}: payload decode failed: {source}")]
    DecodeFailed { kind: ProviderKind, source: DecodeError },
    #[error("signal {0} is not registered with this hub")]
    UnknownSignal(SignalId),
    #[error("signal {signal} is not of type {expected}")]
    SignalTypeMismatch { signal: SignalId, expected: &'static str },
    #[error("signal {0} is declared more than once")]
    DuplicateSignal(SignalId),
    #[error("no tokio runtime available to run the notification dispatcher")]
    NoRuntime,
}
