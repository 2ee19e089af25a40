//! In-memory loopback transport.
//!
//! [`LocalListener`] publishes the route table it receives at start into a
//! shared slot; [`LocalChannel`] dispatches unary calls against that slot and
//! counts every invocation, which is what the request-hook tests observe.
use bindscan_core::transport::{
    Channel, Listener, ListenerConfig, RouteTable, TransportError,
};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub type SharedRoutes = Arc<Mutex<Option<RouteTable>>>;

#[derive(Default)]
pub struct LocalListener {
    routes: SharedRoutes,
}

impl LocalListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot the listener publishes its routes into; grab it before the
    /// listener is boxed away into a registry.
    pub fn shared_routes(&self) -> SharedRoutes {
        Arc::clone(&self.routes)
    }
}

impl Listener for LocalListener {
    fn start(&mut self, _config: &ListenerConfig, routes: RouteTable) -> Result<(), TransportError> {
        *self.routes.lock().unwrap() = Some(routes);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        *self.routes.lock().unwrap() = None;
        Ok(())
    }
}

pub struct LocalChannel {
    routes: SharedRoutes,
    calls: Arc<AtomicUsize>,
}

impl LocalChannel {
    pub fn new(routes: SharedRoutes) -> Self {
        Self {
            routes,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of unary calls that reached the channel.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Channel for LocalChannel {
    fn unary(&self, path: &str, request: Bytes) -> BoxFuture<'static, Result<Bytes, TransportError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let slot = self.routes.lock().unwrap();
        let handler = match slot.as_ref() {
            Some(routes) => routes.handler(path),
            None => {
                drop(slot);
                return Box::pin(async { Err(TransportError::NotServing) });
            }
        };
        drop(slot);

        let path = path.to_string();
        Box::pin(async move {
            match handler {
                Some(handler) => handler(request).await.map_err(TransportError::from),
                None => Err(TransportError::RouteNotFound(path)),
            }
        })
    }
}
