//! # Client Registry
//!
//! Binds scanned service descriptors to a transport [`Channel`] as callable
//! [`BoundStub`]s, with duplicate-name and filtering policy and a
//! request-interception hook point.
//!
//! ## Request hooks
//!
//! A [`RequestHook`] fully replaces the direct call path when present. It
//! receives the underlying [`UnaryCall`], so it can observe, rewrite, retry or
//! simply delegate. A hook installed on the registry applies to every stub
//! added afterwards; a hook passed to [`BoundStub::call_with_hook`] overrides
//! it for one call. Without a hook, calls are a pure pass-through.
//!
//! The registry never mutates shared state while invoking a hook; a hook that
//! keeps its own state must synchronize it itself, since multiple calls may be
//! in flight on a shared channel.
use crate::binding::BindingModule;
use crate::descriptor::{Role, ServiceDescriptor};
use crate::registry::{EntrySet, FilterMode, RegistryError};
use crate::scan::{self, ScanError};
use crate::transport::{Channel, TransportError, route_path};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// Errors from loading a binding module into a client registry.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors from a stub call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("service '{service}' has no method '{method}'")]
    UnknownMethod { service: String, method: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Identifies the call a hook is intercepting.
#[derive(Clone, Debug)]
pub struct HookContext {
    pub service: String,
    pub method: String,
}

/// The underlying transport call handed to a request hook.
///
/// Invoking it performs the call the stub would have performed directly.
pub struct UnaryCall {
    channel: Arc<dyn Channel>,
    path: String,
}

impl UnaryCall {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn invoke(&self, request: Bytes) -> BoxFuture<'static, Result<Bytes, TransportError>> {
        let channel = Arc::clone(&self.channel);
        let path = self.path.clone();
        Box::pin(async move { channel.unary(&path, request).await })
    }
}

/// A request-interception hook.
pub trait RequestHook: Send + Sync {
    fn on_request(
        &self,
        context: &HookContext,
        call: UnaryCall,
        request: Bytes,
    ) -> BoxFuture<'static, Result<Bytes, TransportError>>;
}

/// A service descriptor bound to a live channel.
pub struct BoundStub {
    descriptor: ServiceDescriptor,
    channel: Arc<dyn Channel>,
    hook: Option<Arc<dyn RequestHook>>,
}

impl BoundStub {
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// Performs a unary call, routed through the installed hook if any.
    pub async fn call(&self, method: &str, request: Bytes) -> Result<Bytes, CallError> {
        match &self.hook {
            Some(hook) => self.call_with_hook(method, request, hook.as_ref()).await,
            None => {
                let call = self.unary_call(method)?;
                Ok(call.invoke(request).await?)
            }
        }
    }

    /// Performs a unary call through `hook`, overriding any installed hook.
    pub async fn call_with_hook(
        &self,
        method: &str,
        request: Bytes,
        hook: &dyn RequestHook,
    ) -> Result<Bytes, CallError> {
        let call = self.unary_call(method)?;
        let context = HookContext {
            service: self.descriptor.name().to_string(),
            method: method.to_string(),
        };
        Ok(hook.on_request(&context, call, request).await?)
    }

    fn unary_call(&self, method: &str) -> Result<UnaryCall, CallError> {
        if !self.descriptor.has_method(method) {
            return Err(CallError::UnknownMethod {
                service: self.descriptor.name().to_string(),
                method: method.to_string(),
            });
        }
        Ok(UnaryCall {
            channel: Arc::clone(&self.channel),
            path: route_path(self.descriptor.name(), method),
        })
    }
}

/// The active set of bound client stubs over one channel.
pub struct ClientRegistry {
    channel: Arc<dyn Channel>,
    hook: Option<Arc<dyn RequestHook>>,
    stubs: EntrySet<BoundStub>,
}

impl ClientRegistry {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self {
            channel,
            hook: None,
            stubs: EntrySet::new(),
        }
    }

    /// Installs a registry-level request hook.
    ///
    /// The hook is captured when a stub is bound, so it applies to stubs added
    /// after this call.
    pub fn with_request_hook(mut self, hook: Arc<dyn RequestHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Scans `module` for stubs and adds every discovered service.
    ///
    /// A service name already present in the registry fails the whole call
    /// with `DuplicateName`; nothing is added in that case.
    pub fn load_module(&mut self, module: &BindingModule) -> Result<(), ClientError> {
        let descriptors = scan::parse(Role::Stub, module)?;
        self.add_many(descriptors.into_values())?;
        Ok(())
    }

    /// Like [`load_module`](Self::load_module), restricted to the named stubs.
    pub fn load_module_selected(
        &mut self,
        module: &BindingModule,
        names: &[&str],
    ) -> Result<(), ClientError> {
        let descriptors = scan::parse_selected(Role::Stub, module, names)?;
        self.add_many(descriptors.into_values())?;
        Ok(())
    }

    /// Adds a descriptor under its own name; duplicates are rejected.
    pub fn add(&mut self, descriptor: ServiceDescriptor) -> Result<(), RegistryError> {
        let name = descriptor.name().to_string();
        self.insert(name, descriptor, true)
    }

    /// Adds a descriptor under an override name; duplicates are rejected.
    pub fn add_named(&mut self, name: &str, descriptor: ServiceDescriptor) -> Result<(), RegistryError> {
        self.insert(name.to_string(), descriptor, true)
    }

    /// Adds a descriptor under its own name, replacing any existing entry.
    pub fn add_or_replace(&mut self, descriptor: ServiceDescriptor) {
        let name = descriptor.name().to_string();
        // Uniqueness is off; this cannot fail.
        let _ = self.insert(name, descriptor, false);
    }

    /// Adds a batch of descriptors, all-or-nothing.
    pub fn add_many(
        &mut self,
        descriptors: impl IntoIterator<Item = ServiceDescriptor>,
    ) -> Result<(), RegistryError> {
        let batch = descriptors
            .into_iter()
            .map(|descriptor| (descriptor.name().to_string(), self.bind(descriptor)))
            .collect();
        self.stubs.insert_many(batch)
    }

    pub fn stub(&self, name: &str) -> Result<&BoundStub, RegistryError> {
        self.stubs
            .get(name)
            .ok_or_else(|| RegistryError::UnknownName(name.to_string()))
    }

    pub fn filter(&mut self, names: &[&str], mode: FilterMode) -> Result<(), RegistryError> {
        self.stubs.filter(names, mode)
    }

    pub fn names(&self) -> Vec<&str> {
        self.stubs.names()
    }

    pub fn len(&self) -> usize {
        self.stubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }

    fn insert(
        &mut self,
        name: String,
        descriptor: ServiceDescriptor,
        require_unique: bool,
    ) -> Result<(), RegistryError> {
        let stub = self.bind(descriptor);
        debug!(stub = %name, methods = stub.descriptor.methods().len(), "binding client stub");
        self.stubs.insert(name, stub, require_unique)
    }

    fn bind(&self, descriptor: ServiceDescriptor) -> BoundStub {
        BoundStub {
            descriptor,
            channel: Arc::clone(&self.channel),
            hook: self.hook.clone(),
        }
    }
}
