use bindscan_core::client::{CallError, ClientRegistry, HookContext, RequestHook, UnaryCall};
use bindscan_core::descriptor::Role;
use bindscan_core::registry::{FilterMode, RegistryError};
use bindscan_core::scan;
use bindscan_core::server::ServerRegistry;
use bindscan_core::transport::{ListenerConfig, TransportError};
use bytes::Bytes;
use echo_handler::{EchoHandler, descriptor};
use futures_util::future::BoxFuture;
use ping_bindings::ping;
use ping_bindings::transport::{LocalChannel, LocalListener, SharedRoutes};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

mod echo_handler;

/// A hook that counts interceptions and delegates to the underlying call.
#[derive(Default)]
struct CountingHook {
    hits: AtomicUsize,
}

impl CountingHook {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl RequestHook for CountingHook {
    fn on_request(
        &self,
        _context: &HookContext,
        call: UnaryCall,
        request: Bytes,
    ) -> BoxFuture<'static, Result<Bytes, TransportError>> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        call.invoke(request)
    }
}

/// Brings the ping services up behind a loopback listener and returns the
/// route slot a [`LocalChannel`] can dispatch against.
fn serve_ping_services() -> SharedRoutes {
    let module = ping::module();
    let descriptors = scan::parse(Role::Service, &module).unwrap();

    let mut server = ServerRegistry::new();
    for descriptor in descriptors.into_values() {
        server.add(descriptor, Arc::new(EchoHandler)).unwrap();
    }

    let listener = LocalListener::new();
    let routes = listener.shared_routes();
    server
        .bind(Box::new(listener), ListenerConfig::new("local:ping", 4))
        .unwrap();
    server.start().unwrap();
    routes
}

fn unserved_channel() -> Arc<LocalChannel> {
    Arc::new(LocalChannel::new(SharedRoutes::default()))
}

#[test]
fn duplicate_stub_names_are_rejected() {
    let mut registry = ClientRegistry::new(unserved_channel());

    registry.add(descriptor("Ping", Role::Stub, &["Send"])).unwrap();
    let err = registry
        .add(descriptor("Ping", Role::Stub, &["Send"]))
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateName(_)));
    assert_eq!(registry.len(), 1);

    // An override name or an explicit replace both get past the collision.
    registry
        .add_named("PingAlt", descriptor("Ping", Role::Stub, &["Send"]))
        .unwrap();
    registry.add_or_replace(descriptor("Ping", Role::Stub, &["Send", "Echo"]));
    assert_eq!(registry.names(), ["Ping", "PingAlt"]);
    assert!(registry.stub("Ping").unwrap().descriptor().has_method("Echo"));
}

#[test]
fn load_module_binds_every_discovered_stub() {
    let mut registry = ClientRegistry::new(unserved_channel());

    registry.load_module(&ping::module()).unwrap();

    assert_eq!(registry.names(), ["Health", "Ping"]);
    let stub = registry.stub("Ping").unwrap();
    assert_eq!(stub.descriptor().role(), Role::Stub);
    assert!(stub.descriptor().has_method("Send"));

    // Loading the same module again collides on every name and changes
    // nothing.
    let err = registry.load_module(&ping::module()).unwrap_err();
    assert!(matches!(
        err,
        bindscan_core::client::ClientError::Registry(RegistryError::DuplicateName(_))
    ));
    assert_eq!(registry.len(), 2);
}

#[test]
fn load_module_selected_only_binds_the_named_stubs() {
    let mut registry = ClientRegistry::new(unserved_channel());

    registry
        .load_module_selected(&ping::module(), &["Health"])
        .unwrap();

    assert_eq!(registry.names(), ["Health"]);
}

#[test]
fn filtering_keeps_or_drops_named_stubs() {
    let mut registry = ClientRegistry::new(unserved_channel());
    registry.load_module(&ping::module()).unwrap();

    registry.filter(&["Ping"], FilterMode::Include).unwrap();
    assert_eq!(registry.names(), ["Ping"]);

    // Validation runs before any mutation: an unknown name leaves the
    // registry untouched.
    let err = registry
        .filter(&["Ping", "Ghost"], FilterMode::Exclude)
        .unwrap_err();
    assert!(matches!(err, RegistryError::UnknownName(_)));
    assert_eq!(registry.names(), ["Ping"]);

    registry.filter(&["Ping"], FilterMode::Exclude).unwrap();
    assert!(registry.is_empty());
}

#[tokio::test]
async fn stub_calls_round_trip_through_the_channel() {
    let routes = serve_ping_services();
    let channel = Arc::new(LocalChannel::new(routes));

    let mut registry = ClientRegistry::new(channel.clone());
    registry.load_module(&ping::module()).unwrap();

    let payload = serde_json::to_vec(&serde_json::json!({ "message": "hello" })).unwrap();
    let reply = registry
        .stub("Ping")
        .unwrap()
        .call("Send", Bytes::from(payload.clone()))
        .await
        .unwrap();
    assert_eq!(reply, Bytes::from(payload));

    registry
        .stub("Health")
        .unwrap()
        .call("Check", Bytes::from_static(b"{}"))
        .await
        .unwrap();
    assert_eq!(channel.calls(), 2);
}

#[tokio::test]
async fn calling_an_unknown_method_never_reaches_the_channel() {
    let channel = unserved_channel();
    let mut registry = ClientRegistry::new(channel.clone());
    registry.load_module(&ping::module()).unwrap();

    let err = registry
        .stub("Ping")
        .unwrap()
        .call("Teleport", Bytes::from_static(b"{}"))
        .await
        .unwrap_err();
    match err {
        CallError::UnknownMethod { service, method } => {
            assert_eq!(service, "Ping");
            assert_eq!(method, "Teleport");
        }
        other => panic!("expected an unknown-method error, got {other:?}"),
    }
    assert_eq!(channel.calls(), 0);
}

#[tokio::test]
async fn registry_hook_intercepts_every_call_of_later_stubs() {
    let routes = serve_ping_services();
    let channel = Arc::new(LocalChannel::new(routes));
    let hook = Arc::new(CountingHook::default());

    let mut registry = ClientRegistry::new(channel.clone()).with_request_hook(hook.clone());
    registry.load_module(&ping::module()).unwrap();

    let stub = registry.stub("Ping").unwrap();
    for _ in 0..3 {
        stub.call("Echo", Bytes::from_static(b"{}")).await.unwrap();
    }

    assert_eq!(hook.hits(), 3);
    assert_eq!(channel.calls(), 3);
}

#[tokio::test]
async fn per_call_hook_overrides_the_installed_one() {
    let routes = serve_ping_services();
    let channel = Arc::new(LocalChannel::new(routes));
    let installed = Arc::new(CountingHook::default());

    let mut registry = ClientRegistry::new(channel).with_request_hook(installed.clone());
    registry.load_module(&ping::module()).unwrap();

    let override_hook = CountingHook::default();
    registry
        .stub("Ping")
        .unwrap()
        .call_with_hook("Send", Bytes::from_static(b"{}"), &override_hook)
        .await
        .unwrap();

    assert_eq!(override_hook.hits(), 1);
    assert_eq!(installed.hits(), 0);
}

#[tokio::test]
async fn calls_fail_when_nothing_is_serving() {
    let mut registry = ClientRegistry::new(unserved_channel());
    registry.load_module(&ping::module()).unwrap();

    let err = registry
        .stub("Ping")
        .unwrap()
        .call("Send", Bytes::from_static(b"{}"))
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::Transport(TransportError::NotServing)));
}
