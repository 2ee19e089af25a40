//! Member classification.
//!
//! The name patterns below are a versioned contract over the binding
//! generator's output shape: definition classes end in `Servicer` (service
//! role) or `Stub` (stub role), legacy registration callables are named
//! `legacy_create_<x>_server` / `legacy_create_<x>_stub`, and `Beta`-prefixed
//! definition variants are skipped. Message classes are recognised
//! structurally, never by name.
use crate::binding::{BindingModule, ClassMember, Member, MessageClass};
use crate::descriptor::Role;
use std::collections::BTreeMap;

const LEGACY_CREATE_PREFIX: &str = "legacy_create_";
const EXCLUDED_DEFINITION_PREFIX: &str = "Beta";

/// Classified module members, keyed by stripped clear name.
#[derive(Default)]
pub(crate) struct Scan {
    pub definitions: BTreeMap<String, ClassMember>,
    pub messages: BTreeMap<String, MessageClass>,
    /// Clear name -> full callable name.
    pub registrars: BTreeMap<String, String>,
}

pub(crate) fn classify(module: &BindingModule, role: Role, allow: Option<&[&str]>) -> Scan {
    let mut scan = Scan::default();

    for member in module.members() {
        match member {
            Member::Class(class) => {
                if let Some(stem) = definition_stem(class.name(), role) {
                    if allow.is_none_or(|names| names.contains(&stem)) {
                        scan.definitions.insert(stem.to_string(), class.clone());
                    }
                } else if let Some(message) = class.as_message() {
                    scan.messages.insert(message.name().to_string(), message);
                }
            }
            Member::Function(registrar) => {
                if let Some(stem) = registrar_stem(registrar.name(), role) {
                    scan.registrars
                        .insert(stem.to_string(), registrar.name().to_string());
                }
            }
        }
    }

    scan
}

fn definition_stem(name: &str, role: Role) -> Option<&str> {
    if name.starts_with(EXCLUDED_DEFINITION_PREFIX) {
        return None;
    }
    let stem = name.strip_suffix(role.definition_suffix())?;
    (!stem.is_empty()).then_some(stem)
}

fn registrar_stem(name: &str, role: Role) -> Option<&str> {
    let stem = name
        .strip_prefix(LEGACY_CREATE_PREFIX)?
        .strip_suffix(role.registrar_suffix())?
        .strip_suffix('_')?;
    (!stem.is_empty()).then_some(stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_names_follow_role_suffix() {
        assert_eq!(definition_stem("PingServicer", Role::Service), Some("Ping"));
        assert_eq!(definition_stem("PingStub", Role::Stub), Some("Ping"));
        assert_eq!(definition_stem("PingStub", Role::Service), None);
        assert_eq!(definition_stem("Servicer", Role::Service), None);
    }

    #[test]
    fn beta_definitions_are_excluded() {
        assert_eq!(definition_stem("BetaPingServicer", Role::Service), None);
        assert_eq!(definition_stem("BetaPingStub", Role::Stub), None);
    }

    #[test]
    fn registrar_names_strip_marker_and_suffix() {
        assert_eq!(
            registrar_stem("legacy_create_Ping_server", Role::Service),
            Some("Ping")
        );
        assert_eq!(
            registrar_stem("legacy_create_Ping_stub", Role::Stub),
            Some("Ping")
        );
        assert_eq!(registrar_stem("legacy_create_Ping_server", Role::Stub), None);
        assert_eq!(registrar_stem("create_Ping_server", Role::Service), None);
        assert_eq!(registrar_stem("legacy_create__server", Role::Service), None);
    }
}
