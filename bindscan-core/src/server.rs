//! # Server Registry
//!
//! Pairs scanned service descriptors with handler implementations and drives
//! the one-way lifecycle `unbound → bound → serving`:
//!
//! * additions and filtering are free while unbound or bound,
//! * [`ServerRegistry::bind`] attaches a listener and validated config,
//! * [`ServerRegistry::start`] freezes the route table and hands it to the
//!   listener; from that point every mutation is rejected, because the
//!   transport has fixed its routes.
//!
//! Unbinding is not supported. Request dispatch concurrency is owned by the
//! transport; this registry only builds the route table.
use crate::descriptor::ServiceDescriptor;
use crate::registry::{EntrySet, FilterMode, RegistryError};
use crate::transport::{
    HandlerError, Listener, ListenerConfig, RouteTable, TransportConfigError, TransportError,
    route_path,
};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Config(#[from] TransportConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A user-implemented service: one dispatch entry point for all of the
/// service's methods.
///
/// Implementations typically back this with a hand-written (or generated)
/// per-method interface; see the `bindscan sync` command for the skeletons.
pub trait ServiceHandler: Send + Sync {
    fn dispatch(&self, method: &str, request: Bytes) -> BoxFuture<'static, Result<Bytes, HandlerError>>;
}

struct ServerEntry {
    descriptor: ServiceDescriptor,
    handler: Arc<dyn ServiceHandler>,
}

enum ServerState {
    Unbound,
    Bound {
        listener: Box<dyn Listener>,
        config: ListenerConfig,
    },
    Serving {
        listener: Box<dyn Listener>,
        config: ListenerConfig,
    },
}

/// The active set of services behind one listener.
pub struct ServerRegistry {
    entries: EntrySet<ServerEntry>,
    state: ServerState,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self {
            entries: EntrySet::new(),
            state: ServerState::Unbound,
        }
    }

    /// Adds a service under its descriptor name; duplicates are rejected.
    pub fn add(
        &mut self,
        descriptor: ServiceDescriptor,
        handler: Arc<dyn ServiceHandler>,
    ) -> Result<(), ServerError> {
        let name = descriptor.name().to_string();
        self.insert(name, descriptor, handler)
    }

    /// Adds a service under an override name; duplicates are rejected.
    pub fn add_named(
        &mut self,
        name: &str,
        descriptor: ServiceDescriptor,
        handler: Arc<dyn ServiceHandler>,
    ) -> Result<(), ServerError> {
        self.insert(name.to_string(), descriptor, handler)
    }

    /// Adds a service under its descriptor name, replacing any existing
    /// entry. Still rejected once serving has started.
    pub fn add_or_replace(
        &mut self,
        descriptor: ServiceDescriptor,
        handler: Arc<dyn ServiceHandler>,
    ) -> Result<(), ServerError> {
        self.ensure_mutable()?;
        let name = descriptor.name().to_string();
        debug!(service = %name, "replacing service in server registry");
        // Uniqueness is off; this cannot fail.
        let _ = self
            .entries
            .insert(name, ServerEntry { descriptor, handler }, false);
        Ok(())
    }

    /// Adds a batch of services, all-or-nothing.
    pub fn add_many(
        &mut self,
        services: impl IntoIterator<Item = (ServiceDescriptor, Arc<dyn ServiceHandler>)>,
    ) -> Result<(), ServerError> {
        self.ensure_mutable()?;
        let batch = services
            .into_iter()
            .map(|(descriptor, handler)| {
                let name = descriptor.name().to_string();
                (name, ServerEntry { descriptor, handler })
            })
            .collect();
        self.entries.insert_many(batch)?;
        Ok(())
    }

    pub fn filter(&mut self, names: &[&str], mode: FilterMode) -> Result<(), ServerError> {
        self.ensure_mutable()?;
        self.entries.filter(names, mode)?;
        Ok(())
    }

    pub fn descriptor(&self, name: &str) -> Result<&ServiceDescriptor, RegistryError> {
        self.entries
            .get(name)
            .map(|entry| &entry.descriptor)
            .ok_or_else(|| RegistryError::UnknownName(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.names()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_serving(&self) -> bool {
        matches!(self.state, ServerState::Serving { .. })
    }

    /// Attaches a listener. One-way: a bound registry cannot be re-bound.
    pub fn bind(
        &mut self,
        listener: Box<dyn Listener>,
        config: ListenerConfig,
    ) -> Result<(), ServerError> {
        config.validate()?;
        if !matches!(self.state, ServerState::Unbound) {
            return Err(TransportConfigError::AlreadyBound.into());
        }
        info!(address = %config.address, workers = config.workers, "binding server registry to listener");
        self.state = ServerState::Bound { listener, config };
        Ok(())
    }

    /// Freezes the route table and starts serving.
    ///
    /// A failed start leaves the registry bound, so the caller may retry on
    /// its own terms.
    pub fn start(&mut self) -> Result<(), ServerError> {
        match std::mem::replace(&mut self.state, ServerState::Unbound) {
            ServerState::Bound {
                mut listener,
                config,
            } => {
                let routes = self.route_table();
                match listener.start(&config, routes) {
                    Ok(()) => {
                        info!(
                            address = %config.address,
                            services = self.entries.len(),
                            "server started serving"
                        );
                        self.state = ServerState::Serving { listener, config };
                        Ok(())
                    }
                    Err(err) => {
                        self.state = ServerState::Bound { listener, config };
                        Err(err.into())
                    }
                }
            }
            state @ ServerState::Unbound => {
                self.state = state;
                Err(TransportConfigError::NotBound.into())
            }
            state @ ServerState::Serving { .. } => {
                self.state = state;
                Err(TransportConfigError::AlreadyServing.into())
            }
        }
    }

    /// Asks the listener to stop serving. The registry stays in the serving
    /// state; unbinding is out of scope.
    pub fn stop(&mut self) -> Result<(), ServerError> {
        match &mut self.state {
            ServerState::Serving { listener, .. } => {
                listener.stop()?;
                Ok(())
            }
            _ => Err(TransportConfigError::NotServing.into()),
        }
    }

    /// The route table the listener would serve: one route per captured
    /// method of every active service.
    pub fn route_table(&self) -> RouteTable {
        let mut routes = RouteTable::default();
        for (name, entry) in self.entries.iter() {
            for method in entry.descriptor.methods() {
                let handler = Arc::clone(&entry.handler);
                let method_name = method.clone();
                routes.insert(
                    route_path(name, method),
                    Arc::new(move |request: Bytes| handler.dispatch(&method_name, request)),
                );
            }
        }
        routes
    }

    fn insert(
        &mut self,
        name: String,
        descriptor: ServiceDescriptor,
        handler: Arc<dyn ServiceHandler>,
    ) -> Result<(), ServerError> {
        self.ensure_mutable()?;
        debug!(service = %name, methods = descriptor.methods().len(), "adding service to server registry");
        self.entries
            .insert(name, ServerEntry { descriptor, handler }, true)?;
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<(), TransportConfigError> {
        if self.is_serving() {
            return Err(TransportConfigError::AlreadyServing);
        }
        Ok(())
    }
}

impl Default for ServerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
