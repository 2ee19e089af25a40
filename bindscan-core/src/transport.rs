//! # Transport Boundary
//!
//! The transport runtime is an external collaborator. This module only defines
//! the seams the registries talk to: a [`Channel`] that can carry a unary call
//! to an address this crate never sees, and a [`Listener`] that takes a fixed
//! [`RouteTable`] when serving starts. Wire format, connection management and
//! dispatch concurrency (worker pools included) are entirely the transport's
//! business.
use bytes::Bytes;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

/// An error produced by a service handler while processing a request.
#[derive(Debug, thiserror::Error)]
#[error("handler error: {0}")]
pub struct HandlerError(pub String);

/// Errors surfaced by a transport implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no route registered for '{0}'")]
    RouteNotFound(String),
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error("transport I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("the transport is not serving")]
    NotServing,
}

/// Errors in listener configuration or registry/transport lifecycle misuse.
#[derive(Debug, thiserror::Error)]
pub enum TransportConfigError {
    #[error("listener address is missing")]
    MissingAddress,
    #[error("listener worker pool size must be non-zero")]
    ZeroWorkers,
    #[error("the registry is already bound to a listener")]
    AlreadyBound,
    #[error("the registry is not bound to a listener")]
    NotBound,
    #[error("the server has started serving; its route table is fixed")]
    AlreadyServing,
    #[error("the server is not serving")]
    NotServing,
}

/// Listener configuration handed through to the transport at start.
#[derive(Clone, Debug)]
pub struct ListenerConfig {
    pub address: String,
    pub workers: usize,
}

impl ListenerConfig {
    pub fn new(address: impl Into<String>, workers: usize) -> Self {
        Self {
            address: address.into(),
            workers,
        }
    }

    pub fn validate(&self) -> Result<(), TransportConfigError> {
        if self.address.trim().is_empty() {
            return Err(TransportConfigError::MissingAddress);
        }
        if self.workers == 0 {
            return Err(TransportConfigError::ZeroWorkers);
        }
        Ok(())
    }
}

/// The HTTP-style route for a service method.
pub fn route_path(service: &str, method: &str) -> String {
    format!("/{service}/{method}")
}

/// A request handler bound to one route.
pub type RouteHandler =
    Arc<dyn Fn(Bytes) -> BoxFuture<'static, Result<Bytes, HandlerError>> + Send + Sync>;

/// The fixed set of routes a server hands to its listener at start.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, RouteHandler>,
}

impl RouteTable {
    pub fn insert(&mut self, path: String, handler: RouteHandler) {
        self.routes.insert(path, handler);
    }

    pub fn handler(&self, path: &str) -> Option<RouteHandler> {
        self.routes.get(path).cloned()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Client-side transport seam: carries one unary call to the remote peer.
pub trait Channel: Send + Sync {
    fn unary(&self, path: &str, request: Bytes) -> BoxFuture<'static, Result<Bytes, TransportError>>;
}

/// Server-side transport seam: a listener bound to an address that serves a
/// fixed route table once started.
pub trait Listener: Send {
    fn start(&mut self, config: &ListenerConfig, routes: RouteTable) -> Result<(), TransportError>;
    fn stop(&mut self) -> Result<(), TransportError>;
}
