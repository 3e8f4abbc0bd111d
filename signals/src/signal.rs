use std::marker::PhantomData;

/// Stable identity of one logical signal within a hub
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SignalId(pub u32);

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "#{}", self.0) }
}

/// Bounds every cached signal value must satisfy.
/// Equality drives change detection: a notification is only owed when the new value differs from the cached one.
pub trait SignalValue: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static {}
impl<T> SignalValue for T where T: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static {}

/// A typed, const-constructible key naming one signal and the type of value it carries.
///
/// ```rust
/// use powerhub_signals::SignalKey;
///
/// const DISPLAY_ON: SignalKey<bool> = SignalKey::new(7, "display_on");
/// assert_eq!(DISPLAY_ON.name(), "display_on");
/// ```
pub struct SignalKey<T> {
    id: SignalId,
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> SignalKey<T> {
    pub const fn new(id: u32, name: &'static str) -> Self { Self { id: SignalId(id), name, _value: PhantomData } }

    pub fn id(&self) -> SignalId { self.id }

    pub fn name(&self) -> &'static str { self.name }
}

impl<T> Clone for SignalKey<T> {
    fn clone(&self) -> Self { *self }
}
impl<T> Copy for SignalKey<T> {}

impl<T> std::fmt::Debug for SignalKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalKey").field("id", &self.id.0).field("name", &self.name).field("type", &std::any::type_name::<T>()).finish()
    }
}

impl<T> std::fmt::Display for SignalKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}{}", self.name, self.id) }
}

/// Names one underlying provider notification source, which may feed one or several signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderKind(&'static str);

impl ProviderKind {
    pub const fn new(name: &'static str) -> Self { Self(name) }

    pub fn name(&self) -> &'static str { self.0 }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.0) }
}
