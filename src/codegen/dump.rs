//! Debug writer rendering the built tree as an indented outline.

use crate::parser::ast::{kind_name, Ast, NodeId, NodeKind};

/// Renders the tree structure with box-drawing connectors
pub struct DumpWriter<'a> {
    ast: &'a Ast,
    output: String,
    prefix: String,
}

impl<'a> DumpWriter<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            output: String::new(),
            prefix: String::new(),
        }
    }

    pub fn dump(mut self) -> String {
        self.output.push_str("--- AST ---\n");
        let nodes = match self.ast.kind(self.ast.root) {
            NodeKind::Root { nodes, .. } => nodes.clone(),
            _ => Vec::new(),
        };
        let count = nodes.len();
        for (i, n) in nodes.iter().enumerate() {
            self.print_node(*n, i < count - 1);
        }
        self.output
    }

    fn line(&mut self, connector: &str, text: &str) {
        self.output.push_str(&self.prefix);
        self.output.push_str(connector);
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn print_node(&mut self, id: NodeId, has_next: bool) {
        let label = self.label(id);
        let connector = if has_next { "\u{251c}\u{2500} " } else { "\u{2514}\u{2500} " };
        self.line(connector, &label);

        let children = self.children(id);
        let saved = self.prefix.clone();
        self.prefix.push_str(if has_next { "\u{2502}  " } else { "   " });
        let count = children.len();
        for (i, c) in children.iter().enumerate() {
            self.print_node(*c, i < count - 1);
        }
        self.prefix = saved;
    }

    fn label(&self, id: NodeId) -> String {
        let kind = kind_name(self.ast.kind(id));
        match self.ast.kind(id) {
            NodeKind::Identifier { name, .. } => format!("{} {}", kind, name),
            NodeKind::BuiltinType { name } => format!("{} {}", kind, name),
            NodeKind::Number { value } => format!("{} {}", kind, value),
            NodeKind::StringLiteral { value } => format!("{} \"{}\"", kind, value),
            NodeKind::CharLiteral { value } => format!("{} '{}'", kind, value),
            NodeKind::BoolValue { value } => format!("{} {}", kind, value),
            NodeKind::Operator { op } => format!("{} {}", kind, op),
            NodeKind::Import { lib, .. } => format!("{} {}", kind, lib.join(".")),
            NodeKind::Include { lib, .. } => format!("{} {}", kind, lib.join("/")),
            _ => match self.ast.name_of(id) {
                Some(name) if !name.is_empty() => format!("{} {}", kind, name),
                _ => kind.to_string(),
            },
        }
    }

    /// Structural children rendered under each node
    fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.ast.kind(id) {
            NodeKind::Root { nodes, .. } => nodes.clone(),
            NodeKind::Import { syms, .. } | NodeKind::Include { syms, .. } => syms.clone(),
            NodeKind::Namespace { contents, .. } => contents.clone(),
            NodeKind::Declaration { typ_src, sym, .. }
            | NodeKind::FunctionDeclaration { typ_src, sym, .. } => {
                let mut v = vec![*typ_src];
                v.extend(sym.iter().copied());
                v
            }
            NodeKind::VariableDeclaration { typ_src, sym, assign, .. } => {
                let mut v = vec![*typ_src];
                v.extend(sym.iter().copied());
                v.extend(assign.iter().copied());
                v
            }
            NodeKind::FunctionDefinition { typ_src, sym, body, .. } => {
                let mut v = vec![*typ_src];
                v.extend(sym.iter().copied());
                v.extend(body.iter().copied());
                v
            }
            NodeKind::ClassMethod { inner } | NodeKind::ClassProperty { inner } => vec![*inner],
            NodeKind::Alias { src_sym, dst, .. } => vec![*src_sym, *dst],
            NodeKind::ReferenceType { child, .. }
            | NodeKind::ArrayType { child }
            | NodeKind::Reference { child, .. }
            | NodeKind::ReferenceToValue { child }
            | NodeKind::ReferenceToType { child, .. } => vec![*child],
            NodeKind::FunctionType { ret, args, .. } => {
                let mut v = vec![*ret];
                v.extend(args.iter().copied());
                v
            }
            NodeKind::Struct { sym, fields, .. }
            | NodeKind::EhUnion { sym, fields, .. }
            | NodeKind::EhEnum { sym, fields, .. } => {
                let mut v = vec![*sym];
                v.extend(fields.iter().flatten().copied());
                v
            }
            NodeKind::EhClass { sym, contents, .. } => {
                let mut v = vec![*sym];
                v.extend(contents.iter().flatten().copied());
                v
            }
            NodeKind::CompoundIdentifier { elems, .. } => elems.clone(),
            NodeKind::TemplatedIdentifier { types, .. } => types.clone(),
            NodeKind::Array { child, length, .. } => {
                let mut v = vec![*child];
                v.extend(length.iter().copied());
                v
            }
            NodeKind::ArrayAccess { child, index } => vec![*child, *index],
            NodeKind::FunctionCall { sym, args, .. } => {
                let mut v = vec![*sym];
                v.extend(args.iter().copied());
                v
            }
            NodeKind::Cast { sym, args, .. } => {
                let mut v = vec![*sym];
                v.extend(args.iter().copied());
                v
            }
            NodeKind::Expression { contents, .. }
            | NodeKind::InitializationList { contents } => contents.clone(),
            NodeKind::Assignment { expr, .. } => vec![*expr],
            NodeKind::VariableAssignment { var, assign } => vec![*var, *assign],
            NodeKind::Sizeof { sz_typ } => vec![*sz_typ],
            NodeKind::PrefixOperatorValue { val, .. } | NodeKind::SuffixOperatorValue { val, .. } => {
                vec![*val]
            }
            NodeKind::Statement { expr } => vec![*expr],
            NodeKind::Return { expr } => expr.iter().copied().collect(),
            NodeKind::Condition { branches } => branches.clone(),
            NodeKind::ControlStructure { cond, init, update, body, .. } => {
                let mut v = Vec::new();
                v.extend(init.iter().copied());
                v.extend(cond.iter().copied());
                v.extend(update.iter().copied());
                v.extend(body.iter().copied());
                v
            }
            NodeKind::SwitchCase { tests, body } => {
                let mut v = tests.clone();
                v.push(*body);
                v
            }
            NodeKind::SwitchCaseTest { test } => test.iter().copied().collect(),
            NodeKind::SwitchCaseBody { contents, .. } => contents.clone(),
            _ => Vec::new(),
        }
    }
}
