//! Semantic resolution over the arena tree.
//!
//! The build pass walks every node depth first, binding identifiers to
//! declarations, computing types and rewriting ambiguous nodes into their
//! resolved forms. The walk is not strictly topological: resolving one
//! declaration may recursively trigger the build of another one it
//! references, with the per-node build state preventing duplicate work on
//! forward and mutual references.

mod build;
mod lookup;
mod mangle;
mod types;

pub use lookup::Lookup;
pub use mangle::{emitted_name, mangled_name};

use std::path::PathBuf;

use crate::diagnostics::BuildError;
use crate::parser::ast::{Ast, BuildState, NodeId, NodeKind};

/// Statement list currently being built, tracked so synthesized statements
/// can be hoisted immediately before the one in progress.
pub(crate) struct FlowFrame {
    pub scope: NodeId,
    pub index: usize,
}

/// The build session walking one tree
pub struct Builder<'a> {
    pub ast: &'a mut Ast,
    pub(crate) flow: Vec<FlowFrame>,
}

/// Builtin scalar types seeded into the root scope before anything builds
pub const BUILTIN_TYPES: &[&str] = &[
    "@int", "@int8", "@int16", "@int32", "@int64", "@uint", "@uint8", "@uint16", "@uint32",
    "@uint64", "@float", "@double", "@decimal", "@void", "@bool", "@char", "@size", "@str", "@any",
];

/// Build the whole tree: seed builtins, reset the import dedup state,
/// resolve every top level node and aggregate recorded failures.
pub fn build_ast(ast: &mut Ast, import_paths: Vec<PathBuf>) -> Result<(), BuildError> {
    ast.session.imported.clear();
    ast.session.included.clear();
    ast.session.import_paths = import_paths;
    ast.session.temp_counter = 0;

    let mut builder = Builder { ast: &mut *ast, flow: Vec::new() };
    builder.seed_builtins();

    let root = builder.ast.root;
    let nodes = match builder.ast.kind(root) {
        NodeKind::Root { nodes, .. } => nodes.clone(),
        _ => Vec::new(),
    };
    let mut built = Vec::with_capacity(nodes.len());
    for n in nodes {
        built.push(builder.build(n, root));
    }
    if let NodeKind::Root { nodes, .. } = builder.ast.kind_mut(root) {
        *nodes = built;
    }
    builder.ast.node_mut(root).state = BuildState::Built;

    if ast.failures.is_empty() {
        Ok(())
    } else {
        Err(BuildError::new(ast.failures.clone()))
    }
}

impl<'a> Builder<'a> {
    /// Install the builtin type table and the generic default function type
    /// on the root scope.
    fn seed_builtins(&mut self) {
        let root = self.ast.root;
        let mut builtins = Vec::new();

        let any_sym = self.make_builtin_symbol_unbuilt("@any");
        let default_func = self.ast.alloc(
            0,
            NodeKind::FunctionType { ret: any_sym, args: Vec::new(), variadic: false },
        );
        builtins.push(default_func);

        for name in BUILTIN_TYPES {
            builtins.push(self.ast.alloc(0, NodeKind::BuiltinType { name: (*name).to_string() }));
        }

        if let NodeKind::Root { builtins: slot, .. } = self.ast.kind_mut(root) {
            *slot = builtins.clone();
        }
        for b in builtins {
            self.build(b, root);
        }
    }

    pub(crate) fn make_builtin_symbol_unbuilt(&mut self, name: &str) -> NodeId {
        let ident = self.ast.alloc(0, NodeKind::Identifier { name: name.to_string(), decl: None });
        self.ast.alloc(
            0,
            NodeKind::CompoundIdentifier {
                elems: vec![ident],
                quals: crate::parser::ast::Qualifiers::empty(),
            },
        )
    }

    // ----- flow scope hoisting ----------------------------------------------

    /// Insert a synthesized statement immediately before the statement
    /// currently being built in the innermost flow scope, and build it.
    pub(crate) fn hoist_before_current(&mut self, stmt: NodeId) {
        let frame = match self.flow.last() {
            Some(f) => (f.scope, f.index),
            None => return,
        };
        let (scope, index) = frame;
        match self.ast.kind_mut(scope) {
            NodeKind::FunctionDefinition { body, .. } => body.insert(index, stmt),
            NodeKind::ControlStructure { body, .. } => body.insert(index, stmt),
            NodeKind::SwitchCaseBody { contents, .. } => contents.insert(index, stmt),
            _ => return,
        }
        if let Some(f) = self.flow.last_mut() {
            f.index += 1;
        }
        self.build(stmt, scope);
    }

    /// Build the statement list of a flow scope, tracking the current index
    /// so hoisting can splice in front of it.
    pub(crate) fn build_flow_body(&mut self, scope: NodeId) {
        self.flow.push(FlowFrame { scope, index: 0 });
        loop {
            let (index, stmt) = {
                let frame = self.flow.last().expect("flow frame");
                let body = self.body_list(frame.scope);
                match body.get(frame.index) {
                    Some(s) => (frame.index, *s),
                    None => break,
                }
            };
            let built = self.build(stmt, scope);
            if built != stmt {
                // The statement replaced itself; store the new node in place.
                let frame_index = {
                    let frame = self.flow.last().expect("flow frame");
                    // Hoisting may have shifted our slot to the right.
                    let body = self.body_list(frame.scope);
                    body.iter().rposition(|&s| s == stmt).unwrap_or(index)
                };
                self.replace_in_body(scope, frame_index, built);
            }
            let frame = self.flow.last_mut().expect("flow frame");
            frame.index = frame.index.max(index) + 1;
        }
        self.flow.pop();
    }

    fn body_list(&self, scope: NodeId) -> &[NodeId] {
        match self.ast.kind(scope) {
            NodeKind::FunctionDefinition { body, .. } => body,
            NodeKind::ControlStructure { body, .. } => body,
            NodeKind::SwitchCaseBody { contents, .. } => contents,
            _ => &[],
        }
    }

    fn replace_in_body(&mut self, scope: NodeId, index: usize, new: NodeId) {
        match self.ast.kind_mut(scope) {
            NodeKind::FunctionDefinition { body, .. } => {
                if index < body.len() {
                    body[index] = new;
                }
            }
            NodeKind::ControlStructure { body, .. } => {
                if index < body.len() {
                    body[index] = new;
                }
            }
            NodeKind::SwitchCaseBody { contents, .. } => {
                if index < contents.len() {
                    contents[index] = new;
                }
            }
            _ => {}
        }
    }

    /// Fresh synthesized local name, unique within the build
    pub(crate) fn temp_name(&mut self, base: &str) -> String {
        let n = self.ast.session.temp_counter;
        self.ast.session.temp_counter += 1;
        format!("__{}{}", base, n)
    }
}
