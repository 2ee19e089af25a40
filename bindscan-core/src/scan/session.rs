//! The capture session.
//!
//! Everything in here is scoped-acquisition/scoped-release: the busy flag,
//! the compatibility-surface swap and the message-operation probes are each
//! held by a guard that restores on drop, so an abort anywhere in the replay
//! pass still leaves the module exactly as it was found.
use super::ScanError;
use super::classify::Scan;
use crate::binding::{
    BindingModule, CompatSurface, MessageClass, MessageOps, MethodPath, NoopTarget,
    RegistrationOptions, RegistrationTarget, SerializerRef,
};
use crate::descriptor::Role;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

/// Transient per-scan record of the observed registration traffic.
#[derive(Clone, Default)]
pub(crate) struct CaptureTable {
    /// Service short name -> method names.
    pub methods: BTreeMap<String, BTreeSet<String>>,
    /// Service short name -> message class names.
    pub messages: BTreeMap<String, BTreeSet<String>>,
}

/// Runs the interception and identity-capture pass over `module`.
pub(crate) fn run(
    module: &BindingModule,
    role: Role,
    scan: &Scan,
) -> Result<CaptureTable, ScanError> {
    let _busy = BusyGuard::acquire(module)?;

    let table = Arc::new(Mutex::new(CaptureTable::default()));
    {
        // Surface first: an unsupported binding must fail before anything,
        // probes included, has been touched.
        let _surface = SurfaceGuard::install(module, role, Arc::clone(&table))?;
        let _probes = ProbeGuard::install(scan.messages.values());

        for callable in scan.registrars.values() {
            trace!(module = module.name(), registrar = %callable, "replaying registration callable");
            module
                .invoke_registrar(callable, &NoopTarget)
                .map_err(|source| ScanError::Registration {
                    name: callable.clone(),
                    source,
                })?;
        }
    }

    let captures = lock_table(&table).clone();
    Ok(captures)
}

struct BusyGuard<'m> {
    module: &'m BindingModule,
}

impl<'m> BusyGuard<'m> {
    fn acquire(module: &'m BindingModule) -> Result<Self, ScanError> {
        if module.begin_scan() {
            Ok(Self { module })
        } else {
            Err(ScanError::BusyModule(module.name().to_string()))
        }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.module.end_scan();
    }
}

/// Swaps the compatibility surface for a [`RecordingSurface`]; restores the
/// original verbatim on drop.
struct SurfaceGuard<'m> {
    module: &'m BindingModule,
    original: Option<Box<dyn CompatSurface>>,
}

impl<'m> SurfaceGuard<'m> {
    fn install(
        module: &'m BindingModule,
        role: Role,
        table: Arc<Mutex<CaptureTable>>,
    ) -> Result<Self, ScanError> {
        let mut slot = module.compat_slot();
        if slot.is_none() {
            return Err(ScanError::UnsupportedBinding(module.name().to_string()));
        }
        let original = slot.replace(Box::new(RecordingSurface { role, table }));
        Ok(Self { module, original })
    }
}

impl Drop for SurfaceGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.module.compat_slot();
        *slot = self.original.take();
    }
}

/// Replaces every discovered message class's operations with probes; restores
/// the originals on drop.
///
/// The probe serializer reports the owning class name, which is what resolves
/// a captured serializer reference back to a message. The probe check accepts
/// any payload; nothing on the replay path consults it, it is swapped so that
/// the whole operation table is a single unit of mutation.
struct ProbeGuard {
    originals: Vec<(MessageClass, MessageOps)>,
}

impl ProbeGuard {
    fn install<'a>(messages: impl Iterator<Item = &'a MessageClass>) -> Self {
        let mut originals = Vec::new();
        for message in messages {
            let name = message.name().to_string();
            let probe = MessageOps::new(
                Arc::new(|_| true),
                Arc::new(move |_| Bytes::copy_from_slice(name.as_bytes())),
            );
            let original = message.swap_ops(probe);
            originals.push((message.clone(), original));
        }
        Self { originals }
    }
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        for (message, ops) in self.originals.drain(..) {
            message.swap_ops(ops);
        }
    }
}

/// The recording stand-in for the compatibility surface.
///
/// Same call shape as the real surface, but instead of registering it records
/// every `(service.method, serializer)` pair it receives, reading the two
/// codec maps that match the scan role.
struct RecordingSurface {
    role: Role,
    table: Arc<Mutex<CaptureTable>>,
}

impl RecordingSurface {
    fn record_map(&self, map: &HashMap<MethodPath, SerializerRef>) {
        for (path, serializer) in map {
            // The probes are installed, so one invocation reports the owning
            // class name.
            let reply = serializer.invoke(&[]);
            let message_name = String::from_utf8_lossy(&reply).into_owned();
            let service = path.service_short_name().to_string();

            let mut table = lock_table(&self.table);
            table
                .methods
                .entry(service.clone())
                .or_default()
                .insert(path.method.clone());
            table.messages.entry(service).or_default().insert(message_name);
        }
    }
}

impl CompatSurface for RecordingSurface {
    fn create_server(&mut self, _target: &dyn RegistrationTarget, options: RegistrationOptions) {
        if self.role == Role::Service {
            self.record_map(&options.request_deserializers);
            self.record_map(&options.response_serializers);
        }
    }

    fn create_stub(&mut self, _target: &dyn RegistrationTarget, options: RegistrationOptions) {
        if self.role == Role::Stub {
            self.record_map(&options.request_serializers);
            self.record_map(&options.response_deserializers);
        }
    }
}

fn lock_table(table: &Mutex<CaptureTable>) -> MutexGuard<'_, CaptureTable> {
    match table.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
