use bindscan_core::binding::ClassMember;
use bindscan_core::descriptor::{Role, ServiceDescriptor};
use bindscan_core::server::ServiceHandler;
use bindscan_core::transport::HandlerError;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use std::collections::{BTreeMap, BTreeSet};

// A minimal handler that echoes the request back for every known method.
// We don't need real logic here, just observable round trips.
pub struct EchoHandler;

impl ServiceHandler for EchoHandler {
    fn dispatch(&self, method: &str, request: Bytes) -> BoxFuture<'static, Result<Bytes, HandlerError>> {
        match method {
            "Send" | "Echo" | "Check" => Box::pin(async move { Ok(request) }),
            other => {
                let message = format!("unhandled method '{other}'");
                Box::pin(async move { Err(HandlerError(message)) })
            }
        }
    }
}

/// A descriptor with the given methods and no messages, for registry tests
/// that don't need a real binding module behind them.
pub fn descriptor(name: &str, role: Role, methods: &[&str]) -> ServiceDescriptor {
    let definition = match role {
        Role::Service => ClassMember::class(format!("{name}Servicer")),
        Role::Stub => ClassMember::class(format!("{name}Stub")),
    };
    ServiceDescriptor::new(
        name,
        role,
        definition,
        methods.iter().map(|m| (*m).to_string()).collect::<BTreeSet<_>>(),
        BTreeMap::new(),
    )
}
