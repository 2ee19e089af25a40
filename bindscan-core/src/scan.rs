//! # Binding Module Scanning
//!
//! Reconstructs service schemas from a compiled binding module in four steps:
//!
//! 1. **Classification** ([`classify`]): module members are split into
//!    definition classes, message classes and legacy registration callables by
//!    name pattern and structural shape.
//! 2. **Interception** ([`session`]): the module's compatibility surface is
//!    swapped for a recording stand-in and every role-matching registration
//!    callable is replayed once against a no-op target.
//! 3. **Identity capture**: message operation tables are swapped for probes so
//!    that a captured serializer reference, invoked once, reports its owning
//!    class name.
//! 4. **Assembly**: the capture table is joined with the discovered classes
//!    into [`ServiceDescriptor`]s, strictly after every temporary mutation has
//!    been restored.
//!
//! A scan is a critical section over its module: concurrent scans of the same
//! module fail fast with [`ScanError::BusyModule`]. Restoration of the surface
//! and the message operations is guaranteed on every exit path.
mod classify;
mod session;

use crate::binding::{BindingError, BindingModule};
use crate::descriptor::{Role, ServiceDescriptor};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The module carries no compatibility surface; the binding was generated
    /// by a version without the legacy registration path and cannot be
    /// introspected.
    #[error("binding module '{0}' has no compatibility surface (unsupported binding version)")]
    UnsupportedBinding(String),
    /// Another scan of the same module is in flight.
    #[error("binding module '{0}' is already being scanned")]
    BusyModule(String),
    /// A registration callable failed during the forced replay pass.
    #[error("registration callable '{name}' failed during replay")]
    Registration {
        name: String,
        #[source]
        source: BindingError,
    },
}

/// Scans a binding module and assembles one descriptor per discovered
/// definition class, keyed by clear service name.
pub fn parse(
    role: Role,
    module: &BindingModule,
) -> Result<BTreeMap<String, ServiceDescriptor>, ScanError> {
    parse_inner(role, module, None)
}

/// Like [`parse`], but only the definition classes named in `names` are
/// returned. Messages and registration callables are still scanned
/// unfiltered, so captured method sets stay complete for later lookups.
pub fn parse_selected(
    role: Role,
    module: &BindingModule,
    names: &[&str],
) -> Result<BTreeMap<String, ServiceDescriptor>, ScanError> {
    parse_inner(role, module, Some(names))
}

fn parse_inner(
    role: Role,
    module: &BindingModule,
    allow: Option<&[&str]>,
) -> Result<BTreeMap<String, ServiceDescriptor>, ScanError> {
    let scan = classify::classify(module, role, allow);
    debug!(
        module = module.name(),
        ?role,
        definitions = scan.definitions.len(),
        messages = scan.messages.len(),
        registrars = scan.registrars.len(),
        "classified binding module members"
    );

    let captures = session::run(module, role, &scan)?;

    // Restoration has completed; the descriptors reference fully usable
    // message classes from here on.
    let mut descriptors = BTreeMap::new();
    for (name, definition) in scan.definitions {
        let methods = captures.methods.get(&name).cloned().unwrap_or_default();
        let messages = captures
            .messages
            .get(&name)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|message_name| {
                        scan.messages
                            .get(message_name)
                            .map(|message| (message_name.clone(), message.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        descriptors.insert(
            name.clone(),
            ServiceDescriptor::new(name, role, definition, methods, messages),
        );
    }

    debug!(
        module = module.name(),
        services = descriptors.len(),
        "assembled service descriptors"
    );
    Ok(descriptors)
}
