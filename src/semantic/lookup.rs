//! Declaration lookup protocol.
//!
//! Every node answers two questions: `find_declaration` searches as an
//! ancestor, walking own declarations then delegating to the parent;
//! `get_declaration` answers whether the node itself defines a name.
//! Lookups carry a candidate list plus an optional error message so partial
//! matches merge across scopes and "undeclared" is only reported when
//! nothing matched anywhere.

use super::Builder;
use crate::parser::ast::{BuildState, NodeId, NodeKind, Qualifiers};

/// Result of a declaration lookup: candidates found so far and the first
/// error message produced, carried as data rather than raised.
#[derive(Debug, Default, Clone)]
pub struct Lookup {
    pub candidates: Vec<NodeId>,
    pub err: Option<String>,
}

impl Lookup {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(id: NodeId) -> Self {
        Self { candidates: vec![id], err: None }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self { candidates: Vec::new(), err: Some(msg.into()) }
    }

    pub fn found(&self) -> Option<NodeId> {
        self.candidates.first().copied()
    }

    pub fn hit(&self) -> bool {
        !self.candidates.is_empty() || self.err.is_some()
    }

    /// Concatenate candidates; the first non-empty error message wins.
    pub fn merge(&mut self, other: Lookup) {
        self.candidates.extend(other.candidates);
        if self.err.is_none() {
            self.err = other.err;
        }
    }
}

impl<'a> Builder<'a> {
    /// Search for `names` from `node` upward through enclosing scopes.
    pub(crate) fn find_declaration(&mut self, node: NodeId, names: &[String]) -> Lookup {
        // Root: own nodes, then the builtin table.
        if let NodeKind::Root { nodes, builtins, .. } = self.ast.kind(node) {
            let nodes = nodes.clone();
            let builtins = builtins.clone();
            let mut result = Lookup::empty();
            for n in nodes {
                result.merge(self.get_declaration(n, names));
            }
            if result.hit() {
                return result;
            }
            for b in builtins {
                result.merge(self.get_declaration(b, names));
            }
            return result;
        }

        // Unordered scope contents answer in any order.
        if let Some(contents) = self.scope_contents(node) {
            let mut result = Lookup::empty();
            for c in contents {
                result.merge(self.get_declaration(c, names));
            }
            if result.hit() {
                return result;
            }
        }

        // Ordered scope declarations.
        let has_scope = self.ast.scope_data(node).is_some();
        if has_scope {
            let decls = self.ast.scope_data(node).map(|s| s.declarations.clone()).unwrap_or_default();
            let mut result = Lookup::empty();
            for d in decls {
                result.merge(self.get_declaration(d, names));
            }
            if result.hit() {
                return result;
            }
        }

        let parent = match self.ast.parent(node) {
            Some(p) => p,
            None => return Lookup::empty(),
        };
        let up = self.find_declaration(parent, names);

        // A declaration found above this scope that has not been built yet
        // was referenced before its definition point; remember it so the
        // emitter can produce a forward prototype.
        if has_scope {
            if let Some(first) = up.found() {
                if self.ast.node(first).state != BuildState::Built {
                    if let Some(scope) = self.ast.scope_data_mut(node) {
                        if !scope.predeclarations.contains(&first) {
                            scope.predeclarations.push(first);
                        }
                    }
                }
            }
        }
        up
    }

    /// Contents of unordered scopes: any-order visibility
    fn scope_contents(&self, node: NodeId) -> Option<Vec<NodeId>> {
        match self.ast.kind(node) {
            NodeKind::Import { syms, .. } | NodeKind::Include { syms, .. } => Some(syms.clone()),
            NodeKind::Namespace { contents, .. } => Some(contents.clone()),
            NodeKind::EhClass { contents, .. } => contents.clone(),
            _ => None,
        }
    }

    /// Does `node` directly define `names[0]`? Descends into inner members
    /// for dotted paths.
    pub(crate) fn get_declaration(&mut self, node: NodeId, names: &[String]) -> Lookup {
        let first = match names.first() {
            Some(f) => f.clone(),
            None => return Lookup::empty(),
        };
        match self.ast.kind(node) {
            NodeKind::Import { syms, .. } => {
                let syms = syms.clone();
                let mut result = Lookup::empty();
                for s in syms {
                    result.merge(self.get_declaration(s, names));
                }
                // A private symbol is visible but not importable; this is a
                // dedicated failure, distinct from an undeclared identifier.
                if let Some(found) = result.found() {
                    if self.ast.quals_of(found).contains(Qualifiers::PRIVATE) {
                        return Lookup::error(format!(
                            "accessing to private symbol `{}`",
                            first
                        ));
                    }
                }
                result
            }
            NodeKind::Include { syms, .. } => {
                let syms = syms.clone();
                let mut result = Lookup::empty();
                for s in syms {
                    result.merge(self.get_declaration(s, names));
                }
                result
            }
            NodeKind::BuiltinType { name } => {
                if *name == first || name.strip_prefix('@') == Some(first.as_str()) {
                    self.declaration_match(node, names)
                } else {
                    Lookup::empty()
                }
            }
            NodeKind::FunctionType { .. } => Lookup::empty(),
            _ => {
                if self.ast.is_declaration(node)
                    && self.ast.name_of(node).as_deref() == Some(first.as_str())
                {
                    self.declaration_match(node, names)
                } else {
                    Lookup::empty()
                }
            }
        }
    }

    /// The node matched the head of the path; the tail, if any, must match a
    /// structural inner member.
    fn declaration_match(&mut self, node: NodeId, names: &[String]) -> Lookup {
        if names.len() == 1 {
            return Lookup::single(node);
        }
        self.get_inner_declaration(node, &names[1..])
    }

    /// Search strictly inside the declaration: struct fields, class members,
    /// enum variants, namespace contents.
    pub(crate) fn get_inner_declaration(&mut self, node: NodeId, names: &[String]) -> Lookup {
        match self.ast.kind(node) {
            NodeKind::Declaration { .. }
            | NodeKind::VariableDeclaration { .. }
            | NodeKind::FunctionDeclaration { .. }
            | NodeKind::FunctionDefinition { .. } => {
                let typ = self.decl_typ_or_compute(node);
                self.get_inner_declaration(typ, names)
            }
            NodeKind::ClassMethod { inner } | NodeKind::ClassProperty { inner } => {
                let inner = *inner;
                self.get_inner_declaration(inner, names)
            }
            NodeKind::ReferenceType { child, .. } => {
                let child = *child;
                self.get_inner_declaration(child, names)
            }
            NodeKind::Alias { canonical, .. } => match canonical {
                Some(c) => {
                    let c = *c;
                    self.get_inner_declaration(c, names)
                }
                None => Lookup::empty(),
            },
            NodeKind::Struct { sym, fields, .. } => {
                let name = self.ast.identifier_name(*sym).unwrap_or_default();
                self.aggregate_inner(fields.clone(), "struct", &name, names)
            }
            NodeKind::EhUnion { sym, fields, .. } => {
                let name = self.ast.identifier_name(*sym).unwrap_or_default();
                self.aggregate_inner(fields.clone(), "union", &name, names)
            }
            NodeKind::EhEnum { sym, fields, .. } => {
                let name = self.ast.identifier_name(*sym).unwrap_or_default();
                self.aggregate_inner(fields.clone(), "enum", &name, names)
            }
            NodeKind::EhClass { sym, contents, .. } => {
                let name = self.ast.identifier_name(*sym).unwrap_or_default();
                self.aggregate_inner(contents.clone(), "class", &name, names)
            }
            NodeKind::Namespace { contents, .. } => {
                let contents = contents.clone();
                let mut result = Lookup::empty();
                for c in contents {
                    result.merge(self.get_declaration(c, names));
                }
                result
            }
            _ => Lookup::empty(),
        }
    }

    /// Member search shared by every aggregate, with the incomplete-type
    /// failure when only a forward declaration has been seen.
    fn aggregate_inner(
        &mut self,
        members: Option<Vec<NodeId>>,
        display_name: &str,
        name: &str,
        names: &[String],
    ) -> Lookup {
        let members = match members {
            Some(m) => m,
            None => {
                return Lookup::error(format!("accessing incomplete {} {}", display_name, name));
            }
        };
        let mut result = Lookup::empty();
        for m in members {
            result.merge(self.get_declaration(m, names));
        }
        result
    }
}
