//! External schema compiler invocation.
//!
//! The compiler itself is out of scope: it is any executable accepting the
//! conventional arguments (`-I<schema dir> --bindings_out=<out dir> <file>`),
//! `protoc` with a bindings plugin being the usual one.
use crate::scaffold::{BINDINGS_DIR, SCHEMA_DIR};
use std::collections::BTreeSet;
use std::process::{Command, ExitStatus};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("failed to run '{compiler}': {source}")]
    Spawn {
        compiler: String,
        source: std::io::Error,
    },
    #[error("'{compiler}' failed on '{schema}' ({status})")]
    Failed {
        compiler: String,
        schema: String,
        status: ExitStatus,
    },
}

/// Compiles each selected schema file, one compiler run per file. Stops at
/// the first failure.
pub fn compile(compiler: &str, stems: &BTreeSet<String>) -> Result<(), CompileError> {
    for stem in stems {
        let schema = format!("./{SCHEMA_DIR}/{stem}.proto");
        info!(compiler = %compiler, schema = %schema, "compiling schema file");

        let status = Command::new(compiler)
            .arg(format!("-I./{SCHEMA_DIR}"))
            .arg(format!("--bindings_out=./{BINDINGS_DIR}"))
            .arg(&schema)
            .status()
            .map_err(|source| CompileError::Spawn {
                compiler: compiler.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(CompileError::Failed {
                compiler: compiler.to_string(),
                schema,
                status,
            });
        }
    }
    Ok(())
}
