//! # Bindscan Core
//!
//! `bindscan-core` recovers, at runtime, a structural description of the RPC
//! services defined inside a compiled binding module: which services exist,
//! which methods they expose and which message types those methods use.
//!
//! Compiled bindings do not publish this information as structured metadata.
//! What they do carry is a legacy registration path: free functions that, when
//! invoked, register every method of a service against a compatibility surface
//! inside the module. This crate replays those registration callables against a
//! recording stand-in and assembles the observed traffic into
//! [`ServiceDescriptor`]s.
//!
//! ## Key components
//!
//! * **[`scan::parse`]:** Runs a full capture session over a [`BindingModule`]
//!   and returns one descriptor per discovered service.
//! * **[`client::ClientRegistry`]:** Binds descriptors to a transport channel
//!   as callable stubs, with an optional request-interception hook.
//! * **[`server::ServerRegistry`]:** Pairs descriptors with handler
//!   implementations and hands the resulting route table to a listener.
//!
//! The transport itself is an external collaborator: this crate only defines
//! the [`transport::Channel`] and [`transport::Listener`] seams and never
//! touches the wire.
//!
//! [`ServiceDescriptor`]: descriptor::ServiceDescriptor
//! [`BindingModule`]: binding::BindingModule
pub mod binding;
pub mod client;
pub mod descriptor;
pub mod registry;
pub mod scan;
pub mod server;
pub mod transport;
