//! C header importer facade.
//!
//! `include` statements bind C declarations into the same node arena as
//! native code. The actual C parsing is an external concern; this module
//! only fixes the contract an importer must fulfil and provides the default
//! implementation used when no C frontend is wired in.

use std::path::PathBuf;

use crate::diagnostics::{Failure, Severity};
use crate::parser::ast::{Ast, NodeId};

/// Macro constants that are already compiler builtins; an importer must not
/// bind them a second time.
pub const BUILTIN_MACROS: &[&str] = &["NULL", "true", "false", "bool"];

/// Binds the declarations of a C header into the arena.
///
/// On success returns the newly allocated declaration nodes, unbuilt, ready
/// to be attached to the requesting `Include`. On failure returns a single
/// structured failure positioned at `pos`; the caller re-reports it as an
/// ordinary build failure.
pub trait HeaderImporter {
    fn import_header(
        &mut self,
        ast: &mut Ast,
        pos: usize,
        name: &str,
        search_paths: &[PathBuf],
    ) -> Result<Vec<NodeId>, Failure>;
}

/// Default importer used when no C frontend is available.
pub struct UnsupportedImporter;

impl HeaderImporter for UnsupportedImporter {
    fn import_header(
        &mut self,
        ast: &mut Ast,
        pos: usize,
        name: &str,
        _search_paths: &[PathBuf],
    ) -> Result<Vec<NodeId>, Failure> {
        Err(Failure::new(
            Severity::Error,
            pos,
            format!("unable to import C header {}: no C frontend available", name),
            ast.entry_file.clone(),
        ))
    }
}
