//! # Service Descriptors
//!
//! The output of a scan: one [`ServiceDescriptor`] per discovered service,
//! plus a flat, serializable [`DescriptorManifest`] that tooling (the
//! `bindscan sync` command) consumes as a build-time artifact.
use crate::binding::{ClassMember, MessageClass};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Which side of a service a scan or registry is concerned with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Service,
    Stub,
}

impl Role {
    /// Suffix of definition class names for this role.
    pub(crate) fn definition_suffix(self) -> &'static str {
        match self {
            Role::Service => "Servicer",
            Role::Stub => "Stub",
        }
    }

    /// Suffix of legacy registration callable names for this role.
    pub(crate) fn registrar_suffix(self) -> &'static str {
        match self {
            Role::Service => "server",
            Role::Stub => "stub",
        }
    }
}

/// Introspected summary of one RPC service.
///
/// Created per `parse` call and never cached by this crate. `methods` comes
/// strictly from captured registrations and may be empty; `messages` holds the
/// discovered message classes whose names were observed for this service.
#[derive(Clone, Debug)]
pub struct ServiceDescriptor {
    name: String,
    role: Role,
    definition: ClassMember,
    methods: BTreeSet<String>,
    messages: BTreeMap<String, MessageClass>,
}

impl ServiceDescriptor {
    pub fn new(
        name: impl Into<String>,
        role: Role,
        definition: ClassMember,
        methods: BTreeSet<String>,
        messages: BTreeMap<String, MessageClass>,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            definition,
            methods,
            messages,
        }
    }

    /// The clear service name (definition class name with its suffix stripped).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The definition class this descriptor was assembled from.
    pub fn definition(&self) -> &ClassMember {
        &self.definition
    }

    pub fn methods(&self) -> &BTreeSet<String> {
        &self.methods
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.methods.contains(method)
    }

    pub fn messages(&self) -> &BTreeMap<String, MessageClass> {
        &self.messages
    }

    pub fn message(&self, name: &str) -> Option<&MessageClass> {
        self.messages.get(name)
    }
}

/// Flat, serializable summary of a set of descriptors.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DescriptorManifest {
    pub services: BTreeMap<String, ManifestEntry>,
}

/// One service in a [`DescriptorManifest`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub role: Role,
    pub methods: BTreeSet<String>,
    pub messages: BTreeSet<String>,
}

impl DescriptorManifest {
    /// Summarizes scan output into the manifest `bindscan sync` consumes.
    ///
    /// The emitting side lives with the binding crate: after compiling its
    /// schemas it scans the resulting module and writes this manifest (as
    /// JSON, conventionally `bindings/manifest.json`) next to the bindings.
    pub fn from_descriptors<'a>(descriptors: impl IntoIterator<Item = &'a ServiceDescriptor>) -> Self {
        let services = descriptors
            .into_iter()
            .map(|descriptor| {
                let entry = ManifestEntry {
                    role: descriptor.role(),
                    methods: descriptor.methods().clone(),
                    messages: descriptor.messages().keys().cloned().collect(),
                };
                (descriptor.name().to_string(), entry)
            })
            .collect();
        Self { services }
    }
}
