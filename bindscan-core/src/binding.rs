//! # Binding Module Model
//!
//! The boundary contract with compiler-generated binding code. A generated
//! module is, to us, an opaque namespace of members:
//!
//! * **definition classes** (`<X>Servicer` / `<X>Stub`),
//! * **message classes** (anything carrying a completeness-check and a
//!   serialize operation), and
//! * **legacy registration callables** (`legacy_create_<x>_server` /
//!   `legacy_create_<x>_stub`).
//!
//! The module also holds a single swappable [`CompatSurface`] slot, the legacy
//! registration interface. It is the sole interception point this crate relies
//! on: a scan temporarily replaces it with a recording stand-in and replays the
//! registration callables against it. A module without the slot is an
//! unsupported binding version.
//!
//! Message operation tables live behind `Arc<RwLock<_>>` because a
//! [`SerializerRef`] is a *bound call*: it must observe whatever operations are
//! installed at invocation time, which is exactly what lets a scan resolve it
//! back to the owning class name.
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Completeness-check operation of a message class.
pub type CheckFn = Arc<dyn Fn(&[u8]) -> bool + Send + Sync>;
/// Wire-serialize operation of a message class.
pub type WireFn = Arc<dyn Fn(&[u8]) -> Bytes + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("no registration callable named '{0}'")]
    UnknownRegistrar(String),
    #[error("the compatibility surface is not installed")]
    MissingSurface,
    #[error("registration callable failed: {0}")]
    Callable(String),
}

/// The live operation table of one message class.
#[derive(Clone)]
pub struct MessageOps {
    pub check: CheckFn,
    pub serialize: WireFn,
}

impl std::fmt::Debug for MessageOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageOps").finish_non_exhaustive()
    }
}

impl MessageOps {
    pub fn new(check: CheckFn, serialize: WireFn) -> Self {
        Self { check, serialize }
    }
}

/// Handle to a message class inside a binding module.
///
/// Cloning the handle shares the underlying operation table.
#[derive(Clone)]
pub struct MessageClass {
    name: String,
    ops: Arc<RwLock<MessageOps>>,
}

impl MessageClass {
    pub fn new(name: impl Into<String>, ops: MessageOps) -> Self {
        Self {
            name: name.into(),
            ops: Arc::new(RwLock::new(ops)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the completeness check against a payload.
    pub fn is_initialized(&self, payload: &[u8]) -> bool {
        let ops = read_unpoisoned(&self.ops);
        (ops.check)(payload)
    }

    /// Serializes a payload with the currently installed serialize operation.
    pub fn serialize(&self, payload: &[u8]) -> Bytes {
        let ops = read_unpoisoned(&self.ops);
        (ops.serialize)(payload)
    }

    /// Returns a bound serializer reference.
    ///
    /// The reference deliberately does not expose which class it belongs to;
    /// resolving that identity is the scanner's problem.
    pub fn serializer(&self) -> SerializerRef {
        SerializerRef {
            ops: Arc::clone(&self.ops),
        }
    }

    /// Installs a replacement operation table, returning the previous one.
    pub(crate) fn swap_ops(&self, ops: MessageOps) -> MessageOps {
        let mut slot = write_unpoisoned(&self.ops);
        std::mem::replace(&mut *slot, ops)
    }
}

impl std::fmt::Debug for MessageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageClass")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An opaque, bound serializer call captured during registration.
#[derive(Clone)]
pub struct SerializerRef {
    ops: Arc<RwLock<MessageOps>>,
}

impl SerializerRef {
    pub fn invoke(&self, payload: &[u8]) -> Bytes {
        let ops = read_unpoisoned(&self.ops);
        (ops.serialize)(payload)
    }
}

impl std::fmt::Debug for SerializerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SerializerRef")
    }
}

/// A `service.method` pair as emitted on the legacy registration path.
///
/// The service part may be a dotted full name (`ping.Ping`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodPath {
    pub service: String,
    pub method: String,
}

impl MethodPath {
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
        }
    }

    /// The service name with any package prefix stripped.
    pub fn service_short_name(&self) -> &str {
        self.service.rsplit('.').next().unwrap_or(&self.service)
    }
}

/// Per-method codec maps handed to the compatibility surface.
///
/// Generated server callables fill `request_deserializers` and
/// `response_serializers`; stub callables fill the mirror pair.
#[derive(Clone, Debug, Default)]
pub struct RegistrationOptions {
    pub request_serializers: HashMap<MethodPath, SerializerRef>,
    pub request_deserializers: HashMap<MethodPath, SerializerRef>,
    pub response_serializers: HashMap<MethodPath, SerializerRef>,
    pub response_deserializers: HashMap<MethodPath, SerializerRef>,
}

/// The target a registration callable registers against.
///
/// During a scan the callables are replayed against [`NoopTarget`]; the
/// registrations are observed, never applied.
pub trait RegistrationTarget: Send + Sync {}

/// Placeholder target used for forced registration replays.
pub struct NoopTarget;

impl RegistrationTarget for NoopTarget {}

/// The legacy registration interface inside a binding module.
///
/// Real surfaces wire services into the legacy runtime. This crate only ever
/// swaps the slot for a recording stand-in, so the call shape matters and the
/// original purpose does not.
pub trait CompatSurface: Send {
    fn create_server(&mut self, target: &dyn RegistrationTarget, options: RegistrationOptions);
    fn create_stub(&mut self, target: &dyn RegistrationTarget, options: RegistrationOptions);
}

type RegistrarFn =
    Arc<dyn Fn(&dyn RegistrationTarget, &mut dyn CompatSurface) -> Result<(), BindingError> + Send + Sync>;

/// A legacy registration callable (`legacy_create_<x>_server` / `_stub`).
#[derive(Clone)]
pub struct Registrar {
    name: String,
    run: RegistrarFn,
}

impl Registrar {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&dyn RegistrationTarget, &mut dyn CompatSurface) -> Result<(), BindingError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Registrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A named class inside a binding module.
///
/// Message classes are recognised structurally: they are the classes that
/// carry an operation table. Everything else (definition classes included) is
/// just a name.
#[derive(Clone, Debug)]
pub struct ClassMember {
    name: String,
    ops: Option<Arc<RwLock<MessageOps>>>,
}

impl ClassMember {
    /// A plain class member (definition classes, unrelated classes).
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ops: None,
        }
    }

    /// A message class member sharing the handle's operation table.
    pub fn message(message: &MessageClass) -> Self {
        Self {
            name: message.name.clone(),
            ops: Some(Arc::clone(&message.ops)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a message handle when this class has the message shape.
    pub fn as_message(&self) -> Option<MessageClass> {
        self.ops.as_ref().map(|ops| MessageClass {
            name: self.name.clone(),
            ops: Arc::clone(ops),
        })
    }
}

/// One member of a binding module namespace.
#[derive(Clone, Debug)]
pub enum Member {
    Class(ClassMember),
    Function(Registrar),
}

/// An opaque namespace of generated members, one per schema file.
pub struct BindingModule {
    name: String,
    members: Vec<Member>,
    compat: Mutex<Option<Box<dyn CompatSurface>>>,
    scanning: AtomicBool,
}

impl BindingModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            compat: Mutex::new(None),
            scanning: AtomicBool::new(false),
        }
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_class(self, class: ClassMember) -> Self {
        self.with_member(Member::Class(class))
    }

    pub fn with_registrar(self, registrar: Registrar) -> Self {
        self.with_member(Member::Function(registrar))
    }

    /// Installs the legacy compatibility surface.
    ///
    /// Generated modules always install one; a module built without it models
    /// a binding version that dropped the legacy path.
    pub fn with_compat_surface(self, surface: Box<dyn CompatSurface>) -> Self {
        {
            let mut slot = lock_unpoisoned(&self.compat);
            *slot = Some(surface);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn has_compat_surface(&self) -> bool {
        lock_unpoisoned(&self.compat).is_some()
    }

    /// Replays one registration callable against the installed surface.
    pub fn invoke_registrar(
        &self,
        name: &str,
        target: &dyn RegistrationTarget,
    ) -> Result<(), BindingError> {
        let registrar = self
            .members
            .iter()
            .find_map(|member| match member {
                Member::Function(r) if r.name == name => Some(r),
                _ => None,
            })
            .ok_or_else(|| BindingError::UnknownRegistrar(name.to_string()))?;

        let mut slot = lock_unpoisoned(&self.compat);
        let surface = slot.as_deref_mut().ok_or(BindingError::MissingSurface)?;
        (registrar.run)(target, surface)
    }

    /// Marks the module as under scan. Returns false if a scan is in flight.
    pub(crate) fn begin_scan(&self) -> bool {
        self.scanning
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    pub(crate) fn end_scan(&self) {
        self.scanning.store(false, Ordering::Release);
    }

    pub(crate) fn compat_slot(&self) -> MutexGuard<'_, Option<Box<dyn CompatSurface>>> {
        lock_unpoisoned(&self.compat)
    }
}

impl std::fmt::Debug for BindingModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingModule")
            .field("name", &self.name)
            .field("members", &self.members.len())
            .finish_non_exhaustive()
    }
}

// Restoration must survive a panic on another thread; a poisoned lock still
// holds a usable value.
fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn read_unpoisoned<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_unpoisoned<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(name: &str) -> MessageClass {
        MessageClass::new(
            name,
            MessageOps::new(
                Arc::new(|payload| !payload.is_empty()),
                Arc::new(|payload| Bytes::copy_from_slice(payload)),
            ),
        )
    }

    #[test]
    fn serializer_ref_tracks_swapped_ops() {
        let msg = message("PingRequest");
        let serializer = msg.serializer();

        assert_eq!(serializer.invoke(b"abc"), Bytes::from_static(b"abc"));

        let original = msg.swap_ops(MessageOps::new(
            Arc::new(|_| true),
            Arc::new(|_| Bytes::from_static(b"probe")),
        ));
        assert_eq!(serializer.invoke(b"abc"), Bytes::from_static(b"probe"));

        msg.swap_ops(original);
        assert_eq!(serializer.invoke(b"abc"), Bytes::from_static(b"abc"));
    }

    #[test]
    fn invoke_registrar_requires_surface() {
        let module = BindingModule::new("ping_bindings")
            .with_registrar(Registrar::new("legacy_create_Ping_server", |_, _| Ok(())));

        let err = module
            .invoke_registrar("legacy_create_Ping_server", &NoopTarget)
            .unwrap_err();
        assert!(matches!(err, BindingError::MissingSurface));

        let err = module.invoke_registrar("nope", &NoopTarget).unwrap_err();
        assert!(matches!(err, BindingError::UnknownRegistrar(_)));
    }

    #[test]
    fn method_path_short_name_strips_package() {
        assert_eq!(MethodPath::new("ping.Ping", "Send").service_short_name(), "Ping");
        assert_eq!(MethodPath::new("Ping", "Send").service_short_name(), "Ping");
    }
}
