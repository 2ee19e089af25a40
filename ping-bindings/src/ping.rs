//! A hand-written stand-in for compiler-generated bindings.
//!
//! The module mirrors what the generator emits for a schema defining two
//! services (`ping.Ping` with `Send`/`Echo`, `ping.Health` with `Check`):
//! definition classes for both roles, JSON-backed message classes, legacy
//! registration callables and an installed compatibility surface. It also
//! carries the clutter a real module has (`Beta`-prefixed legacy variants
//! and members matching no pattern at all) so scans have something to skip.
use bindscan_core::binding::{
    BindingError, BindingModule, ClassMember, CompatSurface, MessageClass, MessageOps, MethodPath,
    Registrar, RegistrationOptions, RegistrationTarget,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const PING_SERVICE: &str = "ping.Ping";
pub const HEALTH_SERVICE: &str = "ping.Health";

/// A message class whose payloads are JSON documents: the completeness check
/// requires a parsable document, serialization is the identity over bytes.
pub fn json_message(name: &str) -> MessageClass {
    MessageClass::new(
        name,
        MessageOps::new(
            Arc::new(|payload| serde_json::from_slice::<serde_json::Value>(payload).is_ok()),
            Arc::new(Bytes::copy_from_slice),
        ),
    )
}

/// The real compatibility surface of the generated module.
///
/// Registrations are only counted; tests use the counter to verify that a
/// scan put the original surface back.
pub struct LegacyRuntime {
    registrations: Arc<AtomicUsize>,
}

impl LegacyRuntime {
    pub fn new() -> Self {
        Self {
            registrations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn registration_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.registrations)
    }
}

impl Default for LegacyRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl CompatSurface for LegacyRuntime {
    fn create_server(&mut self, _target: &dyn RegistrationTarget, _options: RegistrationOptions) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
    }

    fn create_stub(&mut self, _target: &dyn RegistrationTarget, _options: RegistrationOptions) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
    }
}

/// The generated `ping` binding module with its surface installed.
pub fn module() -> BindingModule {
    module_with_runtime().0
}

/// Like [`module`], exposing the surface's registration counter.
pub fn module_with_runtime() -> (BindingModule, Arc<AtomicUsize>) {
    let runtime = LegacyRuntime::new();
    let counter = runtime.registration_counter();
    let module = base_module().with_compat_surface(Box::new(runtime));
    (module, counter)
}

/// A binding generated by a version without the legacy registration path.
pub fn module_without_surface() -> BindingModule {
    base_module()
}

/// [`module`] plus a `Broken` service whose registration callable fails,
/// forcing an abort in the middle of the replay pass.
pub fn failing_module() -> (BindingModule, Arc<AtomicUsize>) {
    let runtime = LegacyRuntime::new();
    let counter = runtime.registration_counter();
    let module = base_module()
        .with_class(ClassMember::class("BrokenServicer"))
        .with_registrar(Registrar::new("legacy_create_Broken_server", |_, _| {
            Err(BindingError::Callable("broken binding".to_string()))
        }))
        .with_compat_surface(Box::new(runtime));
    (module, counter)
}

fn base_module() -> BindingModule {
    let ping_request = json_message("PingRequest");
    let ping_reply = json_message("PingReply");
    let health_request = json_message("HealthCheckRequest");
    let health_reply = json_message("HealthCheckReply");

    BindingModule::new("ping_bindings")
        .with_class(ClassMember::class("PingServicer"))
        .with_class(ClassMember::class("PingStub"))
        .with_class(ClassMember::class("HealthServicer"))
        .with_class(ClassMember::class("HealthStub"))
        .with_class(ClassMember::class("BetaPingServicer"))
        .with_class(ClassMember::class("BetaPingStub"))
        .with_class(ClassMember::class("Connection"))
        .with_class(ClassMember::message(&ping_request))
        .with_class(ClassMember::message(&ping_reply))
        .with_class(ClassMember::message(&health_request))
        .with_class(ClassMember::message(&health_reply))
        .with_registrar(ping_server_registrar(&ping_request, &ping_reply))
        .with_registrar(ping_stub_registrar(&ping_request, &ping_reply))
        .with_registrar(health_server_registrar(&health_request, &health_reply))
        .with_registrar(health_stub_registrar(&health_request, &health_reply))
        .with_registrar(Registrar::new("internal_helper", |_, _| Ok(())))
}

fn ping_server_registrar(request: &MessageClass, reply: &MessageClass) -> Registrar {
    let request = request.clone();
    let reply = reply.clone();
    Registrar::new("legacy_create_Ping_server", move |target, surface| {
        let mut options = RegistrationOptions::default();
        for method in ["Send", "Echo"] {
            options
                .request_deserializers
                .insert(MethodPath::new(PING_SERVICE, method), request.serializer());
            options
                .response_serializers
                .insert(MethodPath::new(PING_SERVICE, method), reply.serializer());
        }
        surface.create_server(target, options);
        Ok(())
    })
}

fn ping_stub_registrar(request: &MessageClass, reply: &MessageClass) -> Registrar {
    let request = request.clone();
    let reply = reply.clone();
    Registrar::new("legacy_create_Ping_stub", move |target, surface| {
        let mut options = RegistrationOptions::default();
        for method in ["Send", "Echo"] {
            options
                .request_serializers
                .insert(MethodPath::new(PING_SERVICE, method), request.serializer());
            options
                .response_deserializers
                .insert(MethodPath::new(PING_SERVICE, method), reply.serializer());
        }
        surface.create_stub(target, options);
        Ok(())
    })
}

fn health_server_registrar(request: &MessageClass, reply: &MessageClass) -> Registrar {
    let request = request.clone();
    let reply = reply.clone();
    Registrar::new("legacy_create_Health_server", move |target, surface| {
        let mut options = RegistrationOptions::default();
        options
            .request_deserializers
            .insert(MethodPath::new(HEALTH_SERVICE, "Check"), request.serializer());
        options
            .response_serializers
            .insert(MethodPath::new(HEALTH_SERVICE, "Check"), reply.serializer());
        surface.create_server(target, options);
        Ok(())
    })
}

fn health_stub_registrar(request: &MessageClass, reply: &MessageClass) -> Registrar {
    let request = request.clone();
    let reply = reply.clone();
    Registrar::new("legacy_create_Health_stub", move |target, surface| {
        let mut options = RegistrationOptions::default();
        options
            .request_serializers
            .insert(MethodPath::new(HEALTH_SERVICE, "Check"), request.serializer());
        options
            .response_deserializers
            .insert(MethodPath::new(HEALTH_SERVICE, "Check"), reply.serializer());
        surface.create_stub(target, options);
        Ok(())
    })
}
