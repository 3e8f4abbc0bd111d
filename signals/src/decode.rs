use std::any::Any;

use crate::error::DecodeError;
use crate::signal::{SignalId, SignalKey, SignalValue};

/// Collects the derived signal values decoded from one provider payload.
///
/// Nothing emitted here touches a cache until the whole decode has succeeded,
/// so a failed decode never leaves a composite half applied.
#[derive(Default)]
pub struct Fanout {
    values: Vec<Emitted>,
}

pub(crate) struct Emitted {
    pub(crate) signal: SignalId,
    pub(crate) value: Box<dyn Any + Send>,
}

impl Fanout {
    pub fn new() -> Self { Self::default() }

    pub fn emit<T: SignalValue>(&mut self, key: SignalKey<T>, value: T) { self.values.push(Emitted { signal: key.id(), value: Box::new(value) }); }

    pub fn len(&self) -> usize { self.values.len() }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Ids of the signals emitted so far, in emission order
    pub fn signals(&self) -> impl Iterator<Item = SignalId> + '_ { self.values.iter().map(|emitted| emitted.signal) }

    /// The value emitted for `key`, if any and if it has the key's type
    pub fn get<T: SignalValue>(&self, key: SignalKey<T>) -> Option<&T> {
        self.values.iter().rev().find(|emitted| emitted.signal == key.id()).and_then(|emitted| emitted.value.downcast_ref::<T>())
    }

    pub(crate) fn into_values(self) -> Vec<Emitted> { self.values }
}

impl std::fmt::Debug for Fanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_list().entries(self.signals()).finish() }
}

/// Turns one raw provider payload into the values of the signals it feeds.
///
/// A simple provider kind emits exactly one value; a composite kind emits one per derived signal.
pub trait Decode<R>: Send + Sync + 'static {
    fn decode(&self, raw: &R, out: &mut Fanout) -> Result<(), DecodeError>;
}

impl<R, F> Decode<R> for F
where F: Fn(&R, &mut Fanout) -> Result<(), DecodeError> + Send + Sync + 'static
{
    fn decode(&self, raw: &R, out: &mut Fanout) -> Result<(), DecodeError> { self(raw, out) }
}

/// Decoder for a provider kind that feeds a single signal
pub fn single<R, T, F>(key: SignalKey<T>, convert: F) -> impl Decode<R>
where
    R: 'static,
    T: SignalValue,
    F: Fn(&R) -> Result<T, DecodeError> + Send + Sync + 'static,
{
    move |raw: &R, out: &mut Fanout| {
        out.emit(key, convert(raw)?);
        Ok(())
    }
}
