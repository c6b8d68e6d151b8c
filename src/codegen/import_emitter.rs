//! Public interface writer: re-serializes externally visible declarations in
//! source syntax so other modules can import this one.

use crate::parser::ast::{Ast, NodeId, NodeKind, Qualifiers};

/// Emits the import file of a built tree
pub struct ImportEmitter<'a> {
    ast: &'a Ast,
    output: String,
}

impl<'a> ImportEmitter<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Self { ast, output: String::new() }
    }

    pub fn emit(mut self) -> String {
        let nodes = match self.ast.kind(self.ast.root) {
            NodeKind::Root { nodes, .. } => nodes.clone(),
            _ => Vec::new(),
        };
        for node in nodes {
            self.write_top(node);
        }
        self.output
    }

    fn push(&mut self, s: &str) {
        self.output.push_str(s);
    }

    /// Private and static declarations stay out of the public interface;
    /// imports and includes contribute nothing of their own.
    fn is_visible(&self, id: NodeId) -> bool {
        let quals = self.ast.quals_of(id);
        !quals.contains(Qualifiers::PRIVATE) && !quals.contains(Qualifiers::STATIC)
    }

    fn write_top(&mut self, id: NodeId) {
        match self.ast.kind(id) {
            NodeKind::Import { .. } | NodeKind::Include { .. } => {}
            NodeKind::Namespace { sym, contents, .. } => {
                let name = self.ast.identifier_name(*sym).unwrap_or_default();
                let contents = contents.clone();
                self.push("namespace ");
                self.push(&name);
                self.push(" {\n");
                for c in contents {
                    self.write_top(c);
                }
                self.push("}\n");
            }
            _ => {
                if self.is_visible(id) {
                    self.write(id);
                }
            }
        }
    }

    fn write(&mut self, id: NodeId) {
        match self.ast.kind(id) {
            NodeKind::FunctionDefinition { .. } | NodeKind::FunctionDeclaration { .. } => {
                self.write_function(id);
            }
            NodeKind::VariableDeclaration { .. } | NodeKind::Declaration { .. } => {
                self.write_declaration(id);
                self.push("\n");
            }
            NodeKind::Struct { .. } | NodeKind::EhUnion { .. } | NodeKind::EhEnum { .. } => {
                self.write_aggregate(id);
            }
            NodeKind::EhClass { .. } => self.write_class(id),
            NodeKind::Alias { .. } => self.write_alias(id),
            _ => {}
        }
    }

    fn write_function(&mut self, id: NodeId) {
        let (typ_src, sym) = match self.ast.kind(id) {
            NodeKind::FunctionDefinition { typ_src, sym, .. }
            | NodeKind::FunctionDeclaration { typ_src, sym, .. } => (*typ_src, *sym),
            _ => return,
        };
        let ft = match self.ast.kind(typ_src) {
            NodeKind::TemplatedIdentifier { types, .. } => match types.first() {
                Some(t) => *t,
                None => return,
            },
            _ => typ_src,
        };
        let (ret, args, variadic) = match self.ast.kind(ft) {
            NodeKind::FunctionType { ret, args, variadic } => (*ret, args.clone(), *variadic),
            _ => return,
        };
        self.write_symbol(ret);
        self.push(" ");
        if let Some(s) = sym {
            let name = self.ast.identifier_name(s).unwrap_or_default();
            self.push(&name);
        }
        self.push("(");
        let skip_this = self
            .ast
            .parent(id)
            .map(|p| matches!(self.ast.kind(p), NodeKind::ClassMethod { .. }))
            .unwrap_or(false);
        let mut first = true;
        for (i, a) in args.iter().enumerate() {
            if skip_this && i == 0 {
                continue;
            }
            if !first {
                self.push(", ");
            }
            first = false;
            self.write_declaration(*a);
        }
        if variadic {
            if !first {
                self.push(", ");
            }
            self.push("...");
        }
        self.push(")\n");
    }

    fn write_declaration(&mut self, id: NodeId) {
        let (typ_src, sym) = match self.ast.kind(id) {
            NodeKind::Declaration { typ_src, sym, .. }
            | NodeKind::VariableDeclaration { typ_src, sym, .. } => (*typ_src, *sym),
            _ => return,
        };
        self.write_symbol(typ_src);
        if let Some(s) = sym {
            self.push(" ");
            let name = self.ast.identifier_name(s).unwrap_or_default();
            self.push(&name);
        }
    }

    /// A type as spelled in source syntax
    fn write_symbol(&mut self, id: NodeId) {
        match self.ast.kind(id) {
            NodeKind::CompoundIdentifier { elems, .. } => {
                let names: Vec<String> = elems
                    .iter()
                    .filter_map(|e| self.ast.identifier_name(*e))
                    .map(|n| n.trim_start_matches('@').to_string())
                    .collect();
                self.push(&names.join("."));
            }
            NodeKind::Identifier { name, .. } => {
                let shown = name.trim_start_matches('@').to_string();
                self.push(&shown);
            }
            NodeKind::Reference { child, .. }
            | NodeKind::ReferenceToType { child, .. }
            | NodeKind::ReferenceToValue { child } => {
                let child = *child;
                if self.ast.quals_of(id).contains(Qualifiers::CONST) {
                    self.push("const ");
                }
                self.push("ref ");
                self.write_symbol(child);
            }
            NodeKind::Array { child, .. } => {
                let child = *child;
                self.write_symbol(child);
                self.push("[]");
            }
            NodeKind::TemplatedIdentifier { name, types, .. } => {
                if name == "func" {
                    if let Some(t) = types.first().copied() {
                        if let NodeKind::FunctionType { ret, args, .. } = self.ast.kind(t) {
                            let ret = *ret;
                            let args = args.clone();
                            self.push("func<");
                            self.write_symbol(ret);
                            self.push("(");
                            for (i, a) in args.iter().enumerate() {
                                if i != 0 {
                                    self.push(", ");
                                }
                                let typ_src = match self.ast.kind(*a) {
                                    NodeKind::Declaration { typ_src, .. }
                                    | NodeKind::VariableDeclaration { typ_src, .. } => *typ_src,
                                    _ => continue,
                                };
                                self.write_symbol(typ_src);
                            }
                            self.push(")>");
                            return;
                        }
                    }
                }
                self.push(name);
            }
            NodeKind::BuiltinType { name } => {
                let shown = name.trim_start_matches('@').to_string();
                self.push(&shown);
            }
            _ => {
                if let Some(name) = self.ast.name_of(id) {
                    self.push(name.trim_start_matches('@'));
                }
            }
        }
    }

    fn write_aggregate(&mut self, id: NodeId) {
        let (keyword, sym, fields) = match self.ast.kind(id) {
            NodeKind::Struct { sym, fields, .. } => ("struct", *sym, fields.clone()),
            NodeKind::EhUnion { sym, fields, .. } => ("union", *sym, fields.clone()),
            NodeKind::EhEnum { sym, fields, .. } => ("enum", *sym, fields.clone()),
            _ => return,
        };
        self.push(keyword);
        self.push(" ");
        let name = self.ast.identifier_name(sym).unwrap_or_default();
        self.push(&name);
        match fields {
            Some(fields) => {
                self.push(" {\n");
                for f in fields {
                    self.push("    ");
                    if matches!(self.ast.kind(id), NodeKind::EhEnum { .. }) {
                        let fname = self.ast.name_of(f).unwrap_or_default();
                        self.push(&fname);
                        self.push(",\n");
                    } else {
                        self.write_declaration(f);
                        self.push("\n");
                    }
                }
                self.push("}\n");
            }
            None => self.push("\n"),
        }
    }

    fn write_class(&mut self, id: NodeId) {
        let (sym, contents) = match self.ast.kind(id) {
            NodeKind::EhClass { sym, contents, .. } => (*sym, contents.clone()),
            _ => return,
        };
        self.push("class ");
        let name = self.ast.identifier_name(sym).unwrap_or_default();
        self.push(&name);
        match contents {
            Some(contents) => {
                self.push(" {\n");
                for c in contents {
                    let inner = match self.ast.kind(c) {
                        NodeKind::ClassMethod { inner } | NodeKind::ClassProperty { inner } => *inner,
                        _ => c,
                    };
                    if !self.is_visible(inner) {
                        continue;
                    }
                    self.push("    ");
                    match self.ast.kind(c) {
                        NodeKind::ClassMethod { .. } => self.write_function(inner),
                        _ => {
                            self.write_declaration(inner);
                            self.push("\n");
                        }
                    }
                }
                self.push("}\n");
            }
            None => self.push("\n"),
        }
    }

    fn write_alias(&mut self, id: NodeId) {
        let (src_sym, dst) = match self.ast.kind(id) {
            NodeKind::Alias { src_sym, dst, .. } => (*src_sym, *dst),
            _ => return,
        };
        self.push("alias ");
        self.write_symbol(src_sym);
        self.push(" ");
        let name = self.ast.identifier_name(dst).unwrap_or_default();
        self.push(&name);
        self.push("\n");
    }
}
