//! # CLI
//!
//! This module defines the command-line interface of `bindscan` using `clap`.
//!
//! Every command except `new` runs inside a service directory, the layout
//! `bindscan new` creates (`schema/`, `bindings/`, `routes/`).
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bindscan", version, about = "Scaffolding CLI for schema-compiled RPC services")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the directory skeleton for a new service
    ///
    /// Lays out `schema/`, `bindings/` and `routes/` under a directory named
    /// after the service, with a placeholder schema file ready to edit.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// bindscan new ping
    /// ```
    New {
        /// Service name; also the directory and placeholder schema name
        #[arg(value_parser = parse_name)]
        name: String,
    },

    /// Compile schema files into binding modules
    ///
    /// Runs the external schema compiler once per selected `.proto` file
    /// under `schema/`, emitting bindings into `bindings/`.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// bindscan compile
    /// bindscan compile -i ping -i health
    /// bindscan compile -e experimental --compiler protoc-mock
    /// ```
    Compile {
        /// Only compile the named schema files (stem, without `.proto`)
        #[arg(short = 'i', long = "include", value_parser = parse_name)]
        include: Vec<String>,

        /// Compile everything except the named schema files
        #[arg(short = 'e', long = "exclude", value_parser = parse_name)]
        exclude: Vec<String>,

        /// External schema compiler executable
        #[arg(long, default_value = "protoc")]
        compiler: String,
    },

    /// Sync route skeletons with a descriptor manifest
    ///
    /// Reads the manifest produced alongside the compiled bindings and, for
    /// each selected service, creates `routes/<service>.rs` or appends
    /// handler stubs for methods the file does not implement yet. Existing
    /// code is never touched.
    Sync {
        /// Only sync the named services
        #[arg(short = 'i', long = "include", value_parser = parse_name)]
        include: Vec<String>,

        /// Sync everything except the named services
        #[arg(short = 'e', long = "exclude", value_parser = parse_name)]
        exclude: Vec<String>,

        /// Path to the descriptor manifest
        #[arg(long, default_value = "bindings/manifest.json")]
        manifest: PathBuf,
    },
}

fn parse_name(value: &str) -> Result<String, String> {
    let name = value.trim();
    if name.is_empty() {
        return Err("name cannot be empty".to_string());
    }
    if name.contains(['/', '\\']) {
        return Err(format!("'{name}' must be a plain name, not a path"));
    }
    Ok(name.to_string())
}
