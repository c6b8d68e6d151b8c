//! C source writer: renders the built tree as a full translation unit.

use crate::parser::ast::{Ast, CtrlKind, NodeId, NodeKind, Qualifiers};
use crate::semantic::emitted_name;

/// Emits C source from a built tree
pub struct CEmitter<'a> {
    ast: &'a Ast,
    output: String,
    indent: usize,
    /// Non-zero while writing imported symbols, which only contribute
    /// prototypes.
    in_import: usize,
}

impl<'a> CEmitter<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            output: String::new(),
            indent: 0,
            in_import: 0,
        }
    }

    pub fn emit(mut self) -> String {
        self.output.push_str("#include <stddef.h>\n#include <stdint.h>\n");
        let nodes = match self.ast.kind(self.ast.root) {
            NodeKind::Root { nodes, .. } => nodes.clone(),
            _ => Vec::new(),
        };
        for node in nodes {
            self.write_top_level(node);
        }
        self.output
    }

    /// At file scope, value declarations need their own terminator; nested
    /// contexts add it themselves.
    fn write_top_level(&mut self, id: NodeId) {
        self.write(id);
        if matches!(
            self.ast.kind(id),
            NodeKind::VariableDeclaration { .. } | NodeKind::Declaration { .. }
        ) {
            self.push(";\n");
        }
    }

    fn builtin_c_type(name: &str) -> &'static str {
        match name {
            "@str" => "char*",
            "@any" => "void*",
            "@void" => "void",
            "@char" => "int8_t",
            "@int" => "int32_t",
            "@int8" => "int8_t",
            "@int16" => "int16_t",
            "@int32" => "int32_t",
            "@int64" => "int64_t",
            "@uint" => "uint32_t",
            "@uint8" => "uint8_t",
            "@uint16" => "uint16_t",
            "@uint32" => "uint32_t",
            "@uint64" => "uint64_t",
            "@size" => "size_t",
            "@bool" => "uint8_t",
            "@float" => "float",
            "@double" => "double",
            "@decimal" => "long double",
            _ => "void*",
        }
    }

    fn push(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
    }

    fn write(&mut self, id: NodeId) {
        match self.ast.kind(id) {
            NodeKind::Root { .. } => {}
            NodeKind::Import { .. } => self.write_import(id),
            NodeKind::Include { .. } => self.write_include(id),
            NodeKind::Namespace { .. } => self.write_namespace(id),
            NodeKind::Declaration { .. } => self.write_declaration(id),
            NodeKind::VariableDeclaration { .. } => self.write_variable_declaration(id),
            NodeKind::FunctionDeclaration { .. } => self.write_function_declaration(id),
            NodeKind::FunctionDefinition { .. } => self.write_function_definition(id),
            NodeKind::ClassMethod { inner } => {
                let inner = *inner;
                self.write(inner);
            }
            NodeKind::ClassProperty { inner } => {
                let inner = *inner;
                self.write(inner);
            }
            NodeKind::Alias { .. } => self.write_alias(id),
            NodeKind::BuiltinType { name } => {
                let t = Self::builtin_c_type(name);
                self.push(t);
            }
            NodeKind::ReferenceType { .. } | NodeKind::ArrayType { .. } => {}
            NodeKind::FunctionType { .. } => self.write_function_type(id),
            NodeKind::Struct { .. } => self.write_struct(id),
            NodeKind::EhUnion { .. } => self.write_union(id),
            NodeKind::EhClass { .. } => self.write_class(id),
            NodeKind::EhEnum { .. } => self.write_enum(id),
            NodeKind::Identifier { .. } => self.write_identifier(id),
            NodeKind::CompoundIdentifier { .. } => self.write_compound_identifier(id),
            NodeKind::TemplatedIdentifier { .. } => self.write_templated_identifier(id),
            NodeKind::Reference { child, .. } => {
                let child = *child;
                self.write(child);
            }
            NodeKind::ReferenceToValue { child } => {
                let child = *child;
                self.write(child);
            }
            NodeKind::ReferenceToType { .. } => self.write_reference_to_type(id),
            NodeKind::Array { .. } => self.write_array(id),
            NodeKind::ArrayAccess { .. } => self.write_array_access(id),
            NodeKind::FunctionCall { .. } => self.write_function_call(id),
            NodeKind::Cast { .. } => self.write_cast(id),
            NodeKind::Expression { .. } => self.write_expression(id),
            NodeKind::InitializationList { .. } => self.write_initialization_list(id),
            NodeKind::Assignment { .. } => self.write_assignment(id),
            NodeKind::VariableAssignment { .. } => self.write_variable_assignment(id),
            NodeKind::Operator { op } => {
                let op = op.clone();
                self.push(&op);
            }
            NodeKind::Sizeof { .. } => self.write_sizeof(id),
            NodeKind::StringLiteral { value } => {
                let value = value.clone();
                self.push("\"");
                self.push(&value);
                self.push("\"");
            }
            NodeKind::CharLiteral { value } => {
                let value = value.clone();
                self.push("'");
                self.push(&value);
                self.push("'");
            }
            NodeKind::Number { value } => {
                let value = value.clone();
                self.push(&value);
            }
            NodeKind::NullValue => self.push("NULL"),
            NodeKind::BoolValue { value } => {
                let s = if *value { "!0" } else { "0" };
                self.push(s);
            }
            NodeKind::PrefixOperatorValue { .. } => self.write_prefix_operator(id),
            NodeKind::SuffixOperatorValue { .. } => self.write_suffix_operator(id),
            NodeKind::Statement { .. } => self.write_statement(id),
            NodeKind::Return { .. } => self.write_return(id),
            NodeKind::Condition { .. } => self.write_condition(id),
            NodeKind::ControlStructure { .. } => self.write_control_structure(id),
            NodeKind::SwitchCase { .. } => self.write_switch_case(id),
            NodeKind::SwitchCaseTest { .. } => self.write_switch_case_test(id),
            NodeKind::SwitchCaseBody { .. } => self.write_switch_case_body(id),
        }
    }

    // ----- value plumbing ----------------------------------------------------

    /// Referencing prefix of a value: & for -1, stars for positive offsets,
    /// then the attached view cast if any.
    fn write_value_prefix(&mut self, id: NodeId) {
        let decl = self.ast.decl_of(id).and_then(|d| match self.ast.kind(d) {
            NodeKind::Alias { canonical, .. } => *canonical,
            _ => Some(d),
        });
        if let Some(d) = decl {
            let is_function = matches!(
                self.ast.kind(d),
                NodeKind::FunctionDeclaration { .. }
                    | NodeKind::FunctionDefinition { .. }
                    | NodeKind::ClassMethod { .. }
            );
            if is_function && !matches!(self.ast.kind(id), NodeKind::FunctionCall { .. }) {
                let mut parent = self.ast.parent(id);
                while let Some(p) = parent {
                    match self.ast.kind(p) {
                        NodeKind::ReferenceToValue { .. } | NodeKind::CompoundIdentifier { .. } => {
                            parent = self.ast.parent(p);
                        }
                        _ => break,
                    }
                }
                let in_call = matches!(
                    parent.map(|p| self.ast.kind(p)),
                    Some(NodeKind::FunctionCall { .. })
                );
                if !in_call {
                    self.push("&");
                    return;
                }
            }
        }
        let offset = self.ast.ref_offset_of(id);
        if offset == -1 {
            self.push("&");
        } else {
            for _ in 0..offset.max(0) {
                self.push("*");
            }
        }
        if let Some(cast) = self.ast.cast_of(id) {
            self.push("(");
            self.write_type_prefix(cast);
            self.write(cast);
            self.push(")");
        }
    }

    /// struct/union/enum keyword prefix when the type needs one in C
    fn write_type_prefix(&mut self, id: NodeId) {
        let inner = self.ast.inner_child(id);
        let canonical = match self.ast.kind(inner) {
            NodeKind::Struct { .. }
            | NodeKind::EhUnion { .. }
            | NodeKind::EhClass { .. }
            | NodeKind::EhEnum { .. } => Some(inner),
            _ => self.ast.canonical_of(inner),
        };
        if let Some(c) = canonical {
            match self.ast.kind(c) {
                NodeKind::Struct { .. } | NodeKind::EhClass { .. } => self.push("struct "),
                NodeKind::EhUnion { .. } => self.push("union "),
                NodeKind::EhEnum { .. } => self.push("enum "),
                _ => {}
            }
        }
    }

    fn is_const_sym(&self, id: NodeId) -> bool {
        self.ast.quals_of(id).contains(Qualifiers::CONST)
    }

    // ----- identifiers -------------------------------------------------------

    fn write_identifier(&mut self, id: NodeId) {
        // The defining occurrence inside a declaration renders the
        // declaration's emitted name.
        if let Some(p) = self.ast.parent(id) {
            if self.ast.is_declaration(p) && self.ast.name_of(p) == self.ast.identifier_name(id) {
                let name = emitted_name(self.ast, p);
                self.push(&name);
                return;
            }
        }

        let decl = self.ast.decl_of(id);
        if let Some(d) = decl {
            if let NodeKind::Alias { canonical: Some(c), .. } = self.ast.kind(d) {
                if self.ast.is_type_node(*c) {
                    let name = emitted_name(self.ast, d);
                    self.push(&name);
                    return;
                }
            }
        }
        match self.ast.canonical_of(id) {
            Some(c) => match self.ast.kind(c) {
                NodeKind::BuiltinType { name } => {
                    let t = Self::builtin_c_type(name);
                    self.push(t);
                }
                _ => {
                    let name = emitted_name(self.ast, c);
                    self.push(&name);
                }
            },
            None => {
                let name = self.ast.identifier_name(id).unwrap_or_default();
                let shown = if name == "this" { "_this".to_string() } else { name };
                self.push(&shown);
            }
        }
    }

    /// Dotted access selects . or -> per element from its pointer depth.
    /// Scope qualifiers (namespace and enum paths) vanish: the mangled final
    /// name already encodes them.
    fn write_compound_identifier(&mut self, id: NodeId) {
        self.write_value_prefix(id);
        let mut elems = match self.ast.kind(id) {
            NodeKind::CompoundIdentifier { elems, .. } => elems.clone(),
            _ => return,
        };
        while elems.len() > 1 {
            let qualifier = match self.ast.canonical_of(elems[0]) {
                Some(c) => matches!(
                    self.ast.kind(c),
                    NodeKind::Namespace { .. } | NodeKind::EhEnum { .. }
                ),
                None => false,
            };
            if qualifier {
                elems.remove(0);
            } else {
                break;
            }
        }
        for (i, e) in elems.iter().enumerate() {
            if i < elems.len() - 1 {
                let mut offset = self.ast.ref_offset_of(*e);
                if offset == 0 {
                    self.write(*e);
                    self.push(".");
                } else if offset == 1 {
                    self.write(*e);
                    self.push("->");
                } else {
                    self.push("(");
                    while offset > 1 {
                        self.push("*");
                        offset -= 1;
                    }
                    self.write(*e);
                    self.push(")->");
                }
            } else {
                self.write(*e);
            }
        }
        if self.ast.is_type_symbol(id) && self.is_const_sym(id) {
            self.push(" const");
        }
    }

    fn write_templated_identifier(&mut self, id: NodeId) {
        let t = match self.ast.kind(id) {
            NodeKind::TemplatedIdentifier { types, .. } => types.first().copied(),
            _ => None,
        };
        if let Some(t) = t {
            self.write(t);
        }
    }

    fn write_reference_to_type(&mut self, id: NodeId) {
        let child = match self.ast.kind(id) {
            NodeKind::ReferenceToType { child, .. } => *child,
            _ => return,
        };
        self.write(child);
        self.push("*");
        if self.is_const_sym(id) {
            self.push(" const");
        }
    }

    fn write_array(&mut self, id: NodeId) {
        let (child, length) = match self.ast.kind(id) {
            NodeKind::Array { child, length, .. } => (*child, *length),
            _ => return,
        };
        self.write(child);
        if length.is_none() {
            self.push("*");
        }
    }

    // ----- declarations ------------------------------------------------------

    fn storage_prefix(&mut self, id: NodeId) {
        let quals = self.ast.quals_of(id);
        if quals.contains(Qualifiers::INLINE) {
            self.push("inline ");
        }
        if quals.contains(Qualifiers::STATIC) || quals.contains(Qualifiers::PRIVATE) {
            self.push("static ");
        }
    }

    fn declaration_parts(&self, id: NodeId) -> (NodeId, Option<NodeId>) {
        match self.ast.kind(id) {
            NodeKind::Declaration { typ_src, sym, .. }
            | NodeKind::VariableDeclaration { typ_src, sym, .. }
            | NodeKind::FunctionDeclaration { typ_src, sym, .. }
            | NodeKind::FunctionDefinition { typ_src, sym, .. } => (*typ_src, *sym),
            _ => (id, None),
        }
    }

    fn write_declaration(&mut self, id: NodeId) {
        let (typ_src, sym) = self.declaration_parts(id);
        self.write_type_prefix(typ_src);
        self.write(typ_src);
        if let Some(sym) = sym {
            self.push(" ");
            self.write(sym);
        }
        self.write_declaration_post(typ_src);
    }

    /// Trailing declarator parts: function pointer parameter lists and array
    /// extents come after the declared name in C.
    fn write_declaration_post(&mut self, id: NodeId) {
        match self.ast.kind(id) {
            NodeKind::TemplatedIdentifier { name, types, .. } if name == "func" => {
                let ft = types.first().copied();
                self.push(")(");
                if let Some(ft) = ft {
                    if let NodeKind::FunctionType { args, .. } = self.ast.kind(ft) {
                        let args = args.clone();
                        for (i, a) in args.iter().enumerate() {
                            if i != 0 {
                                self.push(", ");
                            }
                            self.write_declaration(*a);
                        }
                    }
                }
                self.push(")");
            }
            NodeKind::Array { child, length, .. } => {
                let child = *child;
                let length = *length;
                if let Some(l) = length {
                    self.push("[");
                    self.write(l);
                    self.push("]");
                }
                self.write_declaration_post(child);
            }
            NodeKind::Reference { child, .. }
            | NodeKind::ReferenceToType { child, .. }
            | NodeKind::ReferenceToValue { child } => {
                let child = *child;
                self.write_declaration_post(child);
            }
            _ => {}
        }
    }

    fn write_variable_declaration(&mut self, id: NodeId) {
        self.storage_prefix(id);
        self.write_declaration(id);
        let assign = match self.ast.kind(id) {
            NodeKind::VariableDeclaration { assign, .. } => *assign,
            _ => None,
        };
        if let Some(a) = assign {
            self.write(a);
        }
    }

    fn write_function_type(&mut self, id: NodeId) {
        let ret = match self.ast.kind(id) {
            NodeKind::FunctionType { ret, .. } => *ret,
            _ => return,
        };
        self.write_type_prefix(ret);
        self.write(ret);
        self.push("(*");
    }

    fn function_type_of(&self, id: NodeId) -> Option<NodeId> {
        let t = self.ast.decl_typ(id)?;
        match self.ast.kind(t) {
            NodeKind::FunctionType { .. } => Some(t),
            _ => None,
        }
    }

    fn write_argument_list(&mut self, ft: NodeId, foreign: bool) {
        let (args, variadic) = match self.ast.kind(ft) {
            NodeKind::FunctionType { args, variadic, .. } => (args.clone(), *variadic),
            _ => (Vec::new(), false),
        };
        if args.is_empty() && !variadic {
            self.push("void");
            return;
        }
        for (i, a) in args.iter().enumerate() {
            if i != 0 {
                self.push(", ");
            }
            self.write_declaration(*a);
        }
        if variadic {
            if !args.is_empty() {
                self.push(", ");
            }
            if foreign {
                self.push("...");
            } else {
                // Native varargs travel as a length-prefixed any array.
                self.push("int32_t vargs_len, void* vargs");
            }
        }
    }

    fn write_function_prototype(&mut self, id: NodeId) {
        self.storage_prefix(id);
        let ft = match self.function_type_of(id) {
            Some(f) => f,
            None => return,
        };
        let ret = match self.ast.kind(ft) {
            NodeKind::FunctionType { ret, .. } => *ret,
            _ => return,
        };
        self.write_type_prefix(ret);
        self.write(ret);
        self.push(" ");
        let name = emitted_name(self.ast, id);
        self.push(&name);
        self.push("(");
        let foreign =
            self.ast.decl_type_of(id) == crate::parser::ast::DeclarationType::Foreign;
        self.write_argument_list(ft, foreign);
        self.push(")");
    }

    fn write_function_declaration(&mut self, id: NodeId) {
        self.write_indent();
        self.write_function_prototype(id);
        self.push(";\n");
    }

    fn write_function_definition(&mut self, id: NodeId) {
        if self.in_import > 0 {
            self.write_function_declaration(id);
            return;
        }
        let predeclarations = match self.ast.scope_data(id) {
            Some(s) => s.predeclarations.clone(),
            None => Vec::new(),
        };
        if !predeclarations.is_empty() {
            self.push("\n");
        }
        for decl in predeclarations {
            // A later-defined function only contributes its prototype here.
            match self.ast.kind(decl) {
                NodeKind::FunctionDefinition { .. } | NodeKind::FunctionDeclaration { .. } => {
                    self.write_function_declaration(decl)
                }
                _ => self.write(decl),
            }
        }

        self.push("\n");
        self.write_function_prototype(id);
        self.push("\n{\n");
        let body = match self.ast.kind(id) {
            NodeKind::FunctionDefinition { body, .. } => body.clone(),
            _ => Vec::new(),
        };
        self.indent += 1;
        for instruction in body {
            self.write(instruction);
        }
        self.indent -= 1;
        self.push("}\n");
    }

    fn write_alias(&mut self, id: NodeId) {
        let (src_sym, canonical) = match self.ast.kind(id) {
            NodeKind::Alias { src_sym, canonical, .. } => (*src_sym, *canonical),
            _ => return,
        };
        let is_type = canonical.map(|c| self.ast.is_type_node(c)).unwrap_or(false);
        if !is_type {
            return;
        }
        self.push("typedef ");
        self.write_type_prefix(src_sym);
        self.write(src_sym);
        self.push(" ");
        let name = emitted_name(self.ast, id);
        self.push(&name);
        self.write_declaration_post(src_sym);
        self.push(";\n");
    }

    // ----- aggregates --------------------------------------------------------

    fn write_aggregate_body(&mut self, fields: Option<Vec<NodeId>>) {
        if let Some(fields) = fields {
            self.push("\n{\n");
            self.indent += 1;
            for f in fields {
                self.write_indent();
                self.write(f);
                self.push(";\n");
            }
            self.indent -= 1;
            self.push("}");
        }
        self.push(";\n");
    }

    fn write_struct(&mut self, id: NodeId) {
        let fields = match self.ast.kind(id) {
            NodeKind::Struct { fields, .. } => fields.clone(),
            _ => return,
        };
        self.push("\nstruct ");
        let name = emitted_name(self.ast, id);
        self.push(&name);
        self.write_aggregate_body(fields);
    }

    fn write_union(&mut self, id: NodeId) {
        let fields = match self.ast.kind(id) {
            NodeKind::EhUnion { fields, .. } => fields.clone(),
            _ => return,
        };
        self.push("\nunion ");
        let name = emitted_name(self.ast, id);
        self.push(&name);
        self.write_aggregate_body(fields);
    }

    /// A class lowers to a struct of its properties plus one free function
    /// per method, the bound this pointer already injected during build.
    fn write_class(&mut self, id: NodeId) {
        let contents = match self.ast.kind(id) {
            NodeKind::EhClass { contents, .. } => contents.clone(),
            _ => return,
        };
        self.push("\nstruct ");
        let name = emitted_name(self.ast, id);
        self.push(&name);
        match contents {
            Some(contents) => {
                let mut methods = Vec::new();
                self.push("\n{\n");
                self.indent += 1;
                for c in &contents {
                    match self.ast.kind(*c) {
                        NodeKind::ClassMethod { .. } => methods.push(*c),
                        _ => {
                            self.write_indent();
                            self.write(*c);
                            self.push(";\n");
                        }
                    }
                }
                self.indent -= 1;
                self.push("};\n");
                for m in methods {
                    self.write(m);
                }
            }
            None => self.push(";\n"),
        }
    }

    fn write_enum(&mut self, id: NodeId) {
        let fields = match self.ast.kind(id) {
            NodeKind::EhEnum { fields, .. } => fields.clone(),
            _ => return,
        };
        self.push("\nenum ");
        let name = emitted_name(self.ast, id);
        self.push(&name);
        match fields {
            Some(fields) => {
                self.push("\n{\n");
                self.indent += 1;
                for f in fields {
                    self.write_indent();
                    let fname = emitted_name(self.ast, f);
                    self.push(&fname);
                    self.push(",\n");
                }
                self.indent -= 1;
                self.push("};\n");
            }
            None => self.push(";\n"),
        }
    }

    // ----- inclusions --------------------------------------------------------

    fn write_import(&mut self, id: NodeId) {
        let syms = match self.ast.kind(id) {
            NodeKind::Import { syms, .. } => syms.clone(),
            _ => return,
        };
        self.in_import += 1;
        for sym in syms {
            self.write_top_level(sym);
        }
        self.in_import -= 1;
    }

    fn write_include(&mut self, id: NodeId) {
        let lib = match self.ast.kind(id) {
            NodeKind::Include { lib, .. } => lib.join("/"),
            _ => return,
        };
        self.write_indent();
        self.push("#include <");
        self.push(&lib);
        self.push(">\n");
    }

    fn write_namespace(&mut self, id: NodeId) {
        let contents = match self.ast.kind(id) {
            NodeKind::Namespace { contents, .. } => contents.clone(),
            _ => return,
        };
        for c in contents {
            self.write_top_level(c);
        }
    }

    // ----- values ------------------------------------------------------------

    fn write_expression(&mut self, id: NodeId) {
        let (contents, parenthesised) = match self.ast.kind(id) {
            NodeKind::Expression { contents, parenthesised } => (contents.clone(), *parenthesised),
            _ => return,
        };
        if parenthesised {
            self.push("(");
        }
        for (i, c) in contents.iter().enumerate() {
            if i != 0 {
                self.push(" ");
            }
            self.write(*c);
        }
        if parenthesised {
            self.push(")");
        }
    }

    fn write_initialization_list(&mut self, id: NodeId) {
        let contents = match self.ast.kind(id) {
            NodeKind::InitializationList { contents } => contents.clone(),
            _ => return,
        };
        self.push("{ ");
        for (i, c) in contents.iter().enumerate() {
            if i != 0 {
                self.push(", ");
            }
            self.write(*c);
        }
        self.push(" }");
    }

    fn write_assignment(&mut self, id: NodeId) {
        let (operator, expr) = match self.ast.kind(id) {
            NodeKind::Assignment { operator, expr } => (operator.clone(), *expr),
            _ => return,
        };
        self.push(" ");
        if let Some(op) = operator {
            self.push(&op);
        }
        self.push("= ");
        self.write(expr);
    }

    fn write_variable_assignment(&mut self, id: NodeId) {
        let (var, assign) = match self.ast.kind(id) {
            NodeKind::VariableAssignment { var, assign } => (*var, *assign),
            _ => return,
        };
        self.write(var);
        self.write(assign);
    }

    fn write_cast(&mut self, id: NodeId) {
        let (sym, args) = match self.ast.kind(id) {
            NodeKind::Cast { sym, args, .. } => (*sym, args.clone()),
            _ => return,
        };
        self.push("((");
        self.write_type_prefix(sym);
        self.write(sym);
        self.push(")");
        if let Some(arg) = args.first() {
            self.write(*arg);
        }
        self.push(")");
    }

    fn write_function_call(&mut self, id: NodeId) {
        let (sym, args) = match self.ast.kind(id) {
            NodeKind::FunctionCall { sym, args, .. } => (*sym, args.clone()),
            _ => return,
        };
        self.write_value_prefix(id);
        self.write(sym);
        self.push("(");
        for (i, a) in args.iter().enumerate() {
            if i != 0 {
                self.push(", ");
            }
            self.write(*a);
        }
        self.push(")");
    }

    fn write_array_access(&mut self, id: NodeId) {
        self.write_value_prefix(id);
        let mut indices = Vec::new();
        let mut sym = id;
        while let NodeKind::ArrayAccess { child, index } = self.ast.kind(sym) {
            indices.push(*index);
            sym = *child;
        }
        self.write(sym);
        for idx in indices {
            self.push("[");
            self.write(idx);
            self.push("]");
        }
    }

    fn write_sizeof(&mut self, id: NodeId) {
        let sz_typ = match self.ast.kind(id) {
            NodeKind::Sizeof { sz_typ } => *sz_typ,
            _ => return,
        };
        self.push("sizeof(");
        self.write_type_prefix(sz_typ);
        self.write(sz_typ);
        self.push(")");
    }

    fn write_prefix_operator(&mut self, id: NodeId) {
        let (op, val) = match self.ast.kind(id) {
            NodeKind::PrefixOperatorValue { op, val } => (op.clone(), *val),
            _ => return,
        };
        self.push(&op);
        self.write(val);
    }

    fn write_suffix_operator(&mut self, id: NodeId) {
        let (op, val) = match self.ast.kind(id) {
            NodeKind::SuffixOperatorValue { op, val } => (op.clone(), *val),
            _ => return,
        };
        let needs_parens = self.ast.ref_offset_of(val) != 0;
        if needs_parens {
            self.push("(");
        }
        self.write(val);
        if needs_parens {
            self.push(")");
        }
        self.push(&op);
    }

    // ----- statements --------------------------------------------------------

    fn write_statement(&mut self, id: NodeId) {
        let expr = match self.ast.kind(id) {
            NodeKind::Statement { expr } => *expr,
            _ => return,
        };
        self.write_indent();
        self.write(expr);
        self.push(";\n");
    }

    fn write_return(&mut self, id: NodeId) {
        let expr = match self.ast.kind(id) {
            NodeKind::Return { expr } => *expr,
            _ => return,
        };
        self.push("return");
        if let Some(e) = expr {
            self.push(" (");
            self.write(e);
            self.push(")");
        }
    }

    fn write_condition(&mut self, id: NodeId) {
        let branches = match self.ast.kind(id) {
            NodeKind::Condition { branches } => branches.clone(),
            _ => return,
        };
        for b in branches {
            self.write(b);
        }
    }

    fn write_control_structure(&mut self, id: NodeId) {
        let (ctrl, cond, init, update, body) = match self.ast.kind(id) {
            NodeKind::ControlStructure { ctrl, cond, init, update, body, .. } => {
                (*ctrl, *cond, *init, *update, body.clone())
            }
            _ => return,
        };
        self.write_indent();
        match ctrl {
            CtrlKind::If => self.push("if"),
            CtrlKind::Elif => self.push("else if"),
            CtrlKind::Else => self.push("else"),
            CtrlKind::While => self.push("while"),
            CtrlKind::DoWhile => self.push("do"),
            CtrlKind::Switch => self.push("switch"),
            CtrlKind::For => self.push("for"),
        }
        match ctrl {
            CtrlKind::For => {
                self.push(" (");
                if let Some(i) = init {
                    self.write(i);
                }
                self.push("; ");
                if let Some(c) = cond {
                    self.write(c);
                }
                self.push("; ");
                if let Some(u) = update {
                    self.write(u);
                }
                self.push(")");
            }
            CtrlKind::DoWhile | CtrlKind::Else => {}
            _ => {
                if let Some(c) = cond {
                    self.push(" (");
                    self.write(c);
                    self.push(")");
                }
            }
        }
        self.push("\n");
        self.write_indent();
        self.push("{\n");
        self.indent += 1;
        for instruction in body {
            self.write(instruction);
        }
        self.indent -= 1;
        self.write_indent();
        self.push("}\n");
        if ctrl == CtrlKind::DoWhile {
            self.write_indent();
            self.push("while (");
            if let Some(c) = cond {
                self.write(c);
            }
            self.push(");\n");
        }
    }

    fn write_switch_case(&mut self, id: NodeId) {
        let (tests, body) = match self.ast.kind(id) {
            NodeKind::SwitchCase { tests, body } => (tests.clone(), *body),
            _ => return,
        };
        self.indent = self.indent.saturating_sub(1);
        for t in tests {
            self.write(t);
        }
        self.write(body);
        self.indent += 1;
    }

    fn write_switch_case_test(&mut self, id: NodeId) {
        let test = match self.ast.kind(id) {
            NodeKind::SwitchCaseTest { test } => *test,
            _ => return,
        };
        self.write_indent();
        match test {
            None => self.push("default:\n"),
            Some(t) => {
                self.push("case ");
                self.write(t);
                self.push(":\n");
            }
        }
    }

    fn write_switch_case_body(&mut self, id: NodeId) {
        let (contents, block, fallthrough) = match self.ast.kind(id) {
            NodeKind::SwitchCaseBody { contents, block, fallthrough, .. } => {
                (contents.clone(), *block, *fallthrough)
            }
            _ => return,
        };
        if block {
            self.write_indent();
            self.push("{\n");
        }
        self.indent += 1;
        for i in contents {
            self.write(i);
        }
        if !fallthrough {
            self.write_indent();
            self.push("break;\n");
        }
        self.indent -= 1;
        if block {
            self.write_indent();
            self.push("}\n");
        }
    }
}
