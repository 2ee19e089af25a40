//! Route skeleton generation and manifest-driven sync.
//!
//! `sync` keeps `routes/<service>.rs` aligned with the methods a compiled
//! binding module declares. The generated unit is one `impl` block per
//! method, so bringing a file up to date is a pure append: hand-written
//! bodies are never rewritten. Method presence is detected textually by the
//! `fn <name>(` signature, which survives any edit that keeps the signature.
//! The one exception is a file that no longer declares the service struct:
//! appends could not compile against it, so it is regenerated wholesale.
use bindscan_core::descriptor::DescriptorManifest;
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to read manifest '{path}': {source}")]
    ReadManifest {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("manifest '{path}' is not a descriptor manifest: {source}")]
    ParseManifest {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What one service sync did, for reporting.
pub struct SyncReport {
    pub path: PathBuf,
    pub created: bool,
    pub added: Vec<String>,
}

pub fn load_manifest(path: &Path) -> Result<DescriptorManifest, SyncError> {
    let raw = fs::read(path).map_err(|source| SyncError::ReadManifest {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| SyncError::ParseManifest {
        path: path.to_path_buf(),
        source,
    })
}

/// Creates or appends to the route file of one service.
pub fn sync_service(
    routes_dir: &Path,
    service: &str,
    methods: &BTreeSet<String>,
) -> Result<SyncReport, SyncError> {
    let path = routes_dir.join(format!("{}.rs", snake_case(service)));

    if !path.exists() {
        fs::write(&path, skeleton(service, methods))?;
        debug!(service = %service, path = %path.display(), "generated route skeleton");
        return Ok(SyncReport {
            path,
            created: true,
            added: methods.iter().cloned().collect(),
        });
    }

    let existing = fs::read_to_string(&path)?;
    if !has_struct(&existing, service) {
        // Appended `impl` blocks would not compile against a file that lost
        // its struct; start over from a fresh skeleton.
        warn!(service = %service, path = %path.display(), "route file lacks the service struct, regenerating");
        fs::write(&path, skeleton(service, methods))?;
        return Ok(SyncReport {
            path,
            created: true,
            added: methods.iter().cloned().collect(),
        });
    }
    let mut added = Vec::new();
    let mut appended = String::new();
    for method in methods {
        if !has_method(&existing, method) {
            appended.push_str(&method_block(service, method));
            added.push(method.clone());
        }
    }

    if !appended.is_empty() {
        let mut file = OpenOptions::new().append(true).open(&path)?;
        file.write_all(appended.as_bytes())?;
        debug!(service = %service, added = added.len(), "appended handler stubs");
    }

    Ok(SyncReport {
        path,
        created: false,
        added,
    })
}

fn has_method(source: &str, method: &str) -> bool {
    source.contains(&format!("fn {}(", snake_case(method)))
}

fn has_struct(source: &str, service: &str) -> bool {
    source.contains(&format!("struct {service}Routes"))
}

fn skeleton(service: &str, methods: &BTreeSet<String>) -> String {
    let mut source = file_header(service);
    for method in methods {
        source.push_str(&method_block(service, method));
    }
    source
}

fn file_header(service: &str) -> String {
    format!("//! Request handlers for the `{service}` service.\n\npub struct {service}Routes;\n")
}

fn method_block(service: &str, method: &str) -> String {
    format!(
        "\nimpl {service}Routes {{\n    \
         pub fn {snake}(&self, request: &[u8]) -> Vec<u8> {{\n        \
         todo!(\"handle {service}.{method}\")\n    \
         }}\n\
         }}\n",
        snake = snake_case(method),
    )
}

/// `HealthCheck` → `health_check`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

    fn temp_routes_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "bindscan-routes-{}-{}",
            std::process::id(),
            DIR_SEQ.fetch_add(1, Ordering::SeqCst)
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn methods(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn snake_case_splits_camel_case_words() {
        assert_eq!(snake_case("Send"), "send");
        assert_eq!(snake_case("HealthCheck"), "health_check");
        assert_eq!(snake_case("Ping2Pong"), "ping2_pong");
    }

    #[test]
    fn sync_generates_a_full_skeleton_for_a_new_service() {
        let dir = temp_routes_dir();

        let report = sync_service(&dir, "Ping", &methods(&["Send", "Echo"])).unwrap();

        assert!(report.created);
        assert_eq!(report.added, ["Echo", "Send"]);
        let source = fs::read_to_string(&report.path).unwrap();
        assert!(source.starts_with("//! Request handlers for the `Ping` service."));
        assert!(source.contains("pub struct PingRoutes;"));
        assert!(source.contains("pub fn send(&self, request: &[u8]) -> Vec<u8>"));
        assert!(source.contains("pub fn echo(&self, request: &[u8]) -> Vec<u8>"));
    }

    #[test]
    fn sync_appends_only_the_missing_methods() {
        let dir = temp_routes_dir();
        sync_service(&dir, "Ping", &methods(&["Send"])).unwrap();
        let before = fs::read_to_string(dir.join("ping.rs")).unwrap();

        let report = sync_service(&dir, "Ping", &methods(&["Send", "Echo"])).unwrap();

        assert!(!report.created);
        assert_eq!(report.added, ["Echo"]);
        let after = fs::read_to_string(dir.join("ping.rs")).unwrap();
        assert!(after.starts_with(&before));
        assert!(after.contains("pub fn echo("));
    }

    #[test]
    fn sync_leaves_an_up_to_date_file_alone() {
        let dir = temp_routes_dir();
        sync_service(&dir, "Health", &methods(&["Check"])).unwrap();
        let before = fs::read_to_string(dir.join("health.rs")).unwrap();

        let report = sync_service(&dir, "Health", &methods(&["Check"])).unwrap();

        assert!(!report.created);
        assert!(report.added.is_empty());
        assert_eq!(fs::read_to_string(dir.join("health.rs")).unwrap(), before);
    }

    #[test]
    fn a_file_without_the_service_struct_is_regenerated() {
        let dir = temp_routes_dir();
        let path = dir.join("ping.rs");
        fs::write(&path, "// leftover from an older layout\n").unwrap();

        let report = sync_service(&dir, "Ping", &methods(&["Send"])).unwrap();

        assert!(report.created);
        assert_eq!(report.added, ["Send"]);
        let source = fs::read_to_string(&path).unwrap();
        assert!(source.contains("pub struct PingRoutes;"));
        assert!(source.contains("pub fn send("));
        assert!(!source.contains("leftover"));
    }

    #[test]
    fn manifest_flows_from_a_scan_to_route_skeletons() {
        use bindscan_core::descriptor::{DescriptorManifest, Role};

        let dir = temp_routes_dir();
        let module = ping_bindings::ping::module();
        let descriptors = bindscan_core::scan::parse(Role::Service, &module).unwrap();
        let manifest = DescriptorManifest::from_descriptors(descriptors.values());

        let manifest_path = dir.join("manifest.json");
        fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest).unwrap()).unwrap();

        let loaded = load_manifest(&manifest_path).unwrap();
        assert_eq!(loaded.services.keys().collect::<Vec<_>>(), ["Health", "Ping"]);
        assert_eq!(
            loaded.services["Ping"].methods.iter().collect::<Vec<_>>(),
            ["Echo", "Send"]
        );

        for (name, entry) in &loaded.services {
            sync_service(&dir, name, &entry.methods).unwrap();
        }
        let ping = fs::read_to_string(dir.join("ping.rs")).unwrap();
        assert!(ping.contains("pub fn send("));
        assert!(ping.contains("pub fn echo("));
        assert!(fs::read_to_string(dir.join("health.rs"))
            .unwrap()
            .contains("pub fn check("));
    }

    #[test]
    fn hand_edited_signatures_still_count_as_implemented() {
        let dir = temp_routes_dir();
        let path = dir.join("ping.rs");
        fs::write(
            &path,
            "pub struct PingRoutes;\n\nimpl PingRoutes {\n    pub fn send(&self, request: &[u8]) -> Vec<u8> {\n        request.to_vec()\n    }\n}\n",
        )
        .unwrap();

        let report = sync_service(&dir, "Ping", &methods(&["Send", "Echo"])).unwrap();

        assert_eq!(report.added, ["Echo"]);
        let source = fs::read_to_string(&path).unwrap();
        assert!(source.contains("request.to_vec()"));
    }
}
