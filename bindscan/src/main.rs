//! # Bindscan CLI Entry Point
//!
//! The scaffolding executable for schema-compiled services. It drives three
//! workflows over a service directory (`schema/`, `bindings/`, `routes/`):
//!
//! 1. **new**: lay out the directory skeleton with a placeholder schema.
//! 2. **compile**: run the external schema compiler over selected schemas.
//! 3. **sync**: align route handler skeletons with a descriptor manifest.

mod cli;
mod compiler;
mod routes;
mod scaffold;
mod selection;

use clap::Parser;
use cli::{Cli, Commands};
use std::collections::BTreeSet;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    match Cli::parse().command {
        Commands::New { name } => {
            let root = scaffold::create_service(&name)?;
            println!("created service '{}' at ./{}", name, root.display());
        }
        Commands::Compile {
            include,
            exclude,
            compiler,
        } => {
            scaffold::ensure_service_dir()?;
            let stems = scaffold::schema_stems()?;
            let selected = selection::select(&stems, &include, &exclude)?;
            compiler::compile(&compiler, &selected)?;
            println!("compiled {} schema file(s)", selected.len());
        }
        Commands::Sync {
            include,
            exclude,
            manifest,
        } => {
            scaffold::ensure_service_dir()?;
            let manifest = routes::load_manifest(&manifest)?;
            let available: BTreeSet<String> = manifest.services.keys().cloned().collect();
            let selected = selection::select(&available, &include, &exclude)?;

            for name in &selected {
                let entry = &manifest.services[name];
                let report =
                    routes::sync_service(Path::new(scaffold::ROUTES_DIR), name, &entry.methods)?;
                if report.created {
                    println!(
                        "created {} ({} handler(s))",
                        report.path.display(),
                        report.added.len()
                    );
                } else if report.added.is_empty() {
                    println!("{} is up to date", report.path.display());
                } else {
                    println!(
                        "updated {} (+{})",
                        report.path.display(),
                        report.added.join(", +")
                    );
                }
            }
        }
    }

    Ok(())
}
