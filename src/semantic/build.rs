//! The per-node build pass: declaration binding, type computation and the
//! node rewrites that depend on resolved symbols.

use std::path::{Path, PathBuf};

use super::Builder;
use crate::diagnostics::Severity;
use crate::parser;
use crate::parser::ast::{BuildState, CtrlKind, DeclarationType, NodeId, NodeKind, Qualifiers};

impl<'a> Builder<'a> {
    /// Build a node. Returns the node that must take its place in the
    /// parent's child slot, which differs from `id` when the build resolved
    /// the node into another kind.
    pub(crate) fn build(&mut self, id: NodeId, parent: NodeId) -> NodeId {
        self.ast.set_parent(id, parent);
        match self.ast.node(id).state {
            BuildState::Built | BuildState::Building => return id,
            BuildState::Unbuilt => {}
        }
        self.ast.node_mut(id).state = BuildState::Building;

        let result = match self.ast.kind(id) {
            NodeKind::Root { .. } => id,
            NodeKind::Import { .. } => self.build_import(id),
            NodeKind::Include { .. } => self.build_include(id),
            NodeKind::Namespace { .. } => self.build_namespace(id),
            NodeKind::Declaration { .. }
            | NodeKind::FunctionDeclaration { .. } => self.build_declaration(id),
            NodeKind::VariableDeclaration { .. } => self.build_variable_declaration(id),
            NodeKind::FunctionDefinition { .. } => self.build_function_definition(id),
            NodeKind::ClassMethod { .. } | NodeKind::ClassProperty { .. } => {
                self.build_class_member(id)
            }
            NodeKind::Alias { .. } => self.build_alias(id),
            NodeKind::BuiltinType { .. } => id,
            NodeKind::ReferenceType { .. } | NodeKind::ArrayType { .. } => {
                if let Some(child) = self.ast.container_child(id) {
                    self.build(child, id);
                }
                id
            }
            NodeKind::FunctionType { .. } => self.build_function_type(id),
            NodeKind::Struct { .. } | NodeKind::EhUnion { .. } | NodeKind::EhEnum { .. } => {
                self.build_aggregate(id)
            }
            NodeKind::EhClass { .. } => self.build_class(id),
            NodeKind::Identifier { .. } => self.build_identifier(id),
            NodeKind::CompoundIdentifier { .. } => self.build_compound_identifier(id),
            NodeKind::TemplatedIdentifier { .. } => self.build_templated_identifier(id),
            NodeKind::Reference { .. } => self.build_reference(id),
            NodeKind::ReferenceToValue { .. } | NodeKind::ReferenceToType { .. } => {
                if let Some(child) = self.ast.container_child(id) {
                    self.build(child, id);
                }
                id
            }
            NodeKind::Array { .. } => self.build_array(id),
            NodeKind::ArrayAccess { .. } => self.build_array_access(id),
            NodeKind::FunctionCall { .. } => self.build_function_call(id),
            NodeKind::Cast { .. } => self.build_cast(id),
            NodeKind::Expression { .. } => self.build_expression(id),
            NodeKind::InitializationList { .. } => self.build_initialization_list(id),
            NodeKind::Assignment { .. } => self.build_assignment(id),
            NodeKind::VariableAssignment { .. } => self.build_variable_assignment(id),
            NodeKind::Operator { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::CharLiteral { .. }
            | NodeKind::Number { .. }
            | NodeKind::NullValue
            | NodeKind::BoolValue { .. } => id,
            NodeKind::Sizeof { .. } => self.build_sizeof(id),
            NodeKind::PrefixOperatorValue { .. } | NodeKind::SuffixOperatorValue { .. } => {
                self.build_unary(id)
            }
            NodeKind::Statement { .. } => self.build_statement(id),
            NodeKind::Return { .. } => self.build_return(id),
            NodeKind::Condition { .. } => self.build_condition(id),
            NodeKind::ControlStructure { .. } => self.build_control_structure(id),
            NodeKind::SwitchCase { .. } => self.build_switch_case(id),
            NodeKind::SwitchCaseTest { .. } => self.build_switch_case_test(id),
            NodeKind::SwitchCaseBody { .. } => self.build_switch_case_body(id),
        };

        self.ast.node_mut(id).state = BuildState::Built;
        self.ast.node_mut(result).state = BuildState::Built;
        result
    }

    // ----- inclusions --------------------------------------------------------

    fn build_import(&mut self, id: NodeId) -> NodeId {
        let parsed = self.import_parse(id);
        let mut syms = Vec::with_capacity(parsed.len());
        for s in parsed {
            syms.push(self.build(s, id));
        }
        if let NodeKind::Import { syms: slot, .. } = self.ast.kind_mut(id) {
            *slot = syms;
        }
        id
    }

    /// Resolve the import path against the search paths and parse whatever
    /// it names, each physical file at most once per build.
    fn import_parse(&mut self, id: NodeId) -> Vec<NodeId> {
        let (lib, pos) = match self.ast.kind(id) {
            NodeKind::Import { lib, .. } => (lib.clone(), self.ast.pos(id)),
            _ => return Vec::new(),
        };
        let rel: PathBuf = lib.iter().collect();
        let paths = self.ast.session.import_paths.clone();

        for p in &paths {
            let full = p.join(&rel);
            if full.is_dir() {
                if !self.ast.session.imported.insert(full.clone()) {
                    return Vec::new();
                }
                return self.import_dir(id, &full);
            }
            let file = full.with_extension("eh");
            if file.is_file() {
                if !self.ast.session.imported.insert(file.clone()) {
                    return Vec::new();
                }
                let display = file.to_string_lossy().to_string();
                if let NodeKind::Import { file: slot, .. } = self.ast.kind_mut(id) {
                    *slot = Some(display.clone());
                }
                return self.parse_import_file(id, &file);
            }
        }
        let shown = lib.join("/");
        self.ast.error(id, pos, format!("{}: no such file or directory", shown));
        Vec::new()
    }

    /// Import a directory recursively, file by file, in a stable order.
    fn import_dir(&mut self, id: NodeId, dir: &Path) -> Vec<NodeId> {
        let mut entries: Vec<PathBuf> = match std::fs::read_dir(dir) {
            Ok(iter) => iter.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => return Vec::new(),
        };
        entries.sort();
        let mut res = Vec::new();
        for entry in entries {
            if !self.ast.session.imported.insert(entry.clone()) {
                continue;
            }
            if entry.is_dir() {
                res.extend(self.import_dir(id, &entry));
            } else if entry.extension().map(|e| e == "eh").unwrap_or(false) {
                res.extend(self.parse_import_file(id, &entry));
            }
        }
        res
    }

    /// Parse one imported file into the arena. Parse failures are re-reported
    /// as ordinary build failures at the import statement's position.
    fn parse_import_file(&mut self, id: NodeId, file: &Path) -> Vec<NodeId> {
        let display = file.to_string_lossy().to_string();
        let source = match std::fs::read_to_string(file) {
            Ok(s) => s,
            Err(_) => {
                let pos = self.ast.pos(id);
                self.ast.error(id, pos, format!("{}: no such file or directory", display));
                return Vec::new();
            }
        };
        self.ast.sources.register(&display, &source);
        match parser::parse_into(self.ast, &display, &source) {
            Ok(nodes) => nodes,
            Err(failure) => {
                let pos = self.ast.pos(id);
                self.ast.fail(id, failure.severity, pos, failure.msg);
                Vec::new()
            }
        }
    }

    fn build_include(&mut self, id: NodeId) -> NodeId {
        let (lib, pos) = match self.ast.kind(id) {
            NodeKind::Include { lib, .. } => (lib.join("/"), self.ast.pos(id)),
            _ => return id,
        };
        if !self.ast.session.included.insert(lib.clone()) {
            return id;
        }
        let paths = self.ast.session.import_paths.clone();
        let mut importer = self.ast.importer.take();
        let result = match importer.as_mut() {
            Some(imp) => imp.import_header(self.ast, pos, &lib, &paths),
            None => {
                let importer_stub = &mut crate::cheader::UnsupportedImporter;
                crate::cheader::HeaderImporter::import_header(importer_stub, self.ast, pos, &lib, &paths)
            }
        };
        self.ast.importer = importer;
        match result {
            Ok(parsed) => {
                let mut syms = Vec::with_capacity(parsed.len());
                for s in parsed {
                    syms.push(self.build(s, id));
                }
                if let NodeKind::Include { syms: slot, .. } = self.ast.kind_mut(id) {
                    *slot = syms;
                }
            }
            Err(failure) => {
                self.ast.fail(id, failure.severity, pos, failure.msg);
            }
        }
        id
    }

    fn build_namespace(&mut self, id: NodeId) -> NodeId {
        self.ast.declare(id, id);
        let (sym, contents) = match self.ast.kind(id) {
            NodeKind::Namespace { sym, contents, .. } => (*sym, contents.clone()),
            _ => return id,
        };
        self.build(sym, id);
        let mut built = Vec::with_capacity(contents.len());
        for c in contents {
            built.push(self.build(c, id));
        }
        if let NodeKind::Namespace { contents: slot, .. } = self.ast.kind_mut(id) {
            *slot = built;
        }
        id
    }

    // ----- declarations ------------------------------------------------------

    fn declaration_parts(&self, id: NodeId) -> Option<(NodeId, Option<NodeId>)> {
        match self.ast.kind(id) {
            NodeKind::Declaration { typ_src, sym, .. }
            | NodeKind::VariableDeclaration { typ_src, sym, .. }
            | NodeKind::FunctionDeclaration { typ_src, sym, .. }
            | NodeKind::FunctionDefinition { typ_src, sym, .. } => Some((*typ_src, *sym)),
            _ => None,
        }
    }

    fn store_typ_src(&mut self, id: NodeId, new: NodeId) {
        match self.ast.kind_mut(id) {
            NodeKind::Declaration { typ_src, .. }
            | NodeKind::VariableDeclaration { typ_src, .. }
            | NodeKind::FunctionDeclaration { typ_src, .. }
            | NodeKind::FunctionDefinition { typ_src, .. } => *typ_src = new,
            _ => {}
        }
    }

    /// Shared declaration build: register with the enclosing scope, resolve
    /// the type source and bind the declared name.
    fn build_declaration(&mut self, id: NodeId) -> NodeId {
        self.ast.declare(id, id);
        let (typ_src, sym) = match self.declaration_parts(id) {
            Some(p) => p,
            None => return id,
        };
        let built_src = self.build(typ_src, id);
        if built_src != typ_src {
            self.store_typ_src(id, built_src);
        }
        if let Some(t) = self.solve(built_src) {
            if self.ast.is_type_node(t) {
                self.store_decl_typ(id, t);
            }
        }
        if let Some(s) = sym {
            self.build(s, id);
        }
        id
    }

    fn build_variable_declaration(&mut self, id: NodeId) -> NodeId {
        self.build_declaration(id);
        let assign = match self.ast.kind(id) {
            NodeKind::VariableDeclaration { assign, .. } => *assign,
            _ => None,
        };
        if let Some(a) = assign {
            self.build(a, id);
            let typ = self.decl_typ_or_compute(id);
            if let NodeKind::Assignment { expr, .. } = self.ast.kind(a) {
                let expr = *expr;
                self.auto_cast(expr, typ);
            }
        }
        id
    }

    fn build_function_definition(&mut self, id: NodeId) -> NodeId {
        self.build_declaration(id);
        if self.ast.is_child_of(id, |k| matches!(k, NodeKind::Import { .. })) {
            // Imported definitions only contribute their prototype.
            return id;
        }
        let body_str = match self.ast.kind(id) {
            NodeKind::FunctionDefinition { body_str, .. } => body_str.clone(),
            _ => None,
        };
        let body_str = match body_str {
            Some(b) => b,
            None => return id,
        };

        let have_return = self.function_returns_value(id);
        let file = self.ast.file_of(id);
        match parser::parse_function_body(self.ast, &file, &body_str.contents, body_str.pos, have_return)
        {
            Ok(body) => {
                if let NodeKind::FunctionDefinition { body: slot, .. } = self.ast.kind_mut(id) {
                    *slot = body;
                }
                self.build_flow_body(id);
            }
            Err(failure) => {
                self.ast.fail(id, failure.severity, failure.pos, failure.msg);
            }
        }
        id
    }

    /// Whether the function's resolved return type is something other than
    /// void, which switches the body grammar for `return`.
    fn function_returns_value(&mut self, id: NodeId) -> bool {
        let ft = self.decl_typ_or_compute(id);
        if let NodeKind::FunctionType { ret, .. } = self.ast.kind(ft) {
            let ret = *ret;
            if let Some(t) = self.solve(ret) {
                return !self.ast.is_builtin_named(t, "@void");
            }
        }
        true
    }

    fn build_function_type(&mut self, id: NodeId) -> NodeId {
        let (ret, args) = match self.ast.kind(id) {
            NodeKind::FunctionType { ret, args, .. } => (*ret, args.clone()),
            _ => return id,
        };
        let built_ret = self.build(ret, id);
        if built_ret != ret {
            if let NodeKind::FunctionType { ret: slot, .. } = self.ast.kind_mut(id) {
                *slot = built_ret;
            }
        }
        for a in args {
            self.build(a, id);
        }
        id
    }

    // ----- aggregates and classes --------------------------------------------

    fn build_aggregate(&mut self, id: NodeId) -> NodeId {
        self.ast.declare(id, id);
        let (sym, fields) = match self.ast.kind(id) {
            NodeKind::Struct { sym, fields, .. }
            | NodeKind::EhUnion { sym, fields, .. }
            | NodeKind::EhEnum { sym, fields, .. } => (*sym, fields.clone()),
            _ => return id,
        };
        self.build(sym, id);
        if let Some(fields) = fields {
            for f in fields {
                self.build(f, id);
            }
        }
        id
    }

    /// A class partitions its contents into properties and methods; methods
    /// get the owning class injected as their leading `this` parameter.
    fn build_class(&mut self, id: NodeId) -> NodeId {
        self.ast.declare(id, id);
        let (sym, contents) = match self.ast.kind(id) {
            NodeKind::EhClass { sym, contents, .. } => (*sym, contents.clone()),
            _ => return id,
        };
        self.build(sym, id);
        let contents = match contents {
            Some(c) => c,
            None => return id,
        };
        let class_name = self.ast.identifier_name(sym).unwrap_or_default();

        let mut wrapped = Vec::with_capacity(contents.len());
        for c in &contents {
            let wrapper = match self.ast.kind(*c) {
                NodeKind::FunctionDefinition { .. } | NodeKind::FunctionDeclaration { .. } => {
                    self.inject_this_parameter(*c, &class_name);
                    self.ast.alloc(self.ast.pos(*c), NodeKind::ClassMethod { inner: *c })
                }
                _ => self.ast.alloc(self.ast.pos(*c), NodeKind::ClassProperty { inner: *c }),
            };
            wrapped.push(wrapper);
        }
        if let NodeKind::EhClass { contents: slot, .. } = self.ast.kind_mut(id) {
            *slot = Some(wrapped.clone());
        }
        for w in wrapped {
            self.build(w, id);
        }
        id
    }

    /// Prepend `ref <Class> this` to a method's parameter list.
    fn inject_this_parameter(&mut self, method: NodeId, class_name: &str) {
        let ft = match self.ast.kind(method) {
            NodeKind::FunctionDefinition { typ_src, .. }
            | NodeKind::FunctionDeclaration { typ_src, .. } => match self.ast.kind(*typ_src) {
                NodeKind::TemplatedIdentifier { types, .. } => match types.first() {
                    Some(t) => *t,
                    None => return,
                },
                _ => return,
            },
            _ => return,
        };
        let pos = self.ast.pos(method);
        let class_ident = self.ast.alloc(
            pos,
            NodeKind::Identifier { name: class_name.to_string(), decl: None },
        );
        let class_sym = self.ast.alloc(
            pos,
            NodeKind::CompoundIdentifier { elems: vec![class_ident], quals: Qualifiers::empty() },
        );
        let reference = self.ast.alloc(
            pos,
            NodeKind::Reference { child: class_sym, quals: Qualifiers::empty() },
        );
        let this_ident = self.ast.alloc(pos, NodeKind::Identifier { name: "this".to_string(), decl: None });
        let this_decl = self.ast.alloc(
            pos,
            NodeKind::VariableDeclaration {
                typ_src: reference,
                sym: Some(this_ident),
                quals: Qualifiers::empty(),
                decl_type: DeclarationType::Native,
                typ: None,
                assign: None,
            },
        );
        if let NodeKind::FunctionType { args, .. } = self.ast.kind_mut(ft) {
            args.insert(0, this_decl);
        }
    }

    fn build_class_member(&mut self, id: NodeId) -> NodeId {
        let inner = match self.ast.kind(id) {
            NodeKind::ClassMethod { inner } | NodeKind::ClassProperty { inner } => *inner,
            _ => return id,
        };
        self.build(inner, id);
        id
    }

    fn build_alias(&mut self, id: NodeId) -> NodeId {
        self.ast.declare(id, id);
        let src_sym = match self.ast.kind(id) {
            NodeKind::Alias { src_sym, .. } => *src_sym,
            _ => return id,
        };
        let built = self.build(src_sym, id);
        let canonical = if self.ast.is_type_node(built) {
            Some(built)
        } else {
            self.solve(built)
        };
        if let NodeKind::Alias { src_sym: slot, canonical: c, .. } = self.ast.kind_mut(id) {
            *slot = built;
            *c = canonical;
        }
        id
    }

    // ----- symbols -----------------------------------------------------------

    /// Only declarations may hold an identifier directly; every other use
    /// site resolves through its compound identifier.
    fn build_identifier(&mut self, id: NodeId) -> NodeId {
        let parent = match self.ast.parent(id) {
            Some(p) => p,
            None => return id,
        };
        if self.ast.is_declaration(parent) {
            return id;
        }
        let compound = match self.ast.kind(parent) {
            NodeKind::CompoundIdentifier { .. } => parent,
            _ => return id,
        };

        let names = self.names_up_to(compound, id);
        let name = self.ast.identifier_name(id).unwrap_or_default();
        let start = match self.ast.parent(compound) {
            Some(p) => p,
            None => return id,
        };
        let lookup = self.find_declaration(start, &names);
        match lookup.found() {
            Some(decl) => {
                if let NodeKind::Identifier { decl: slot, .. } = self.ast.kind_mut(id) {
                    *slot = Some(decl);
                }
                let t = self.typ(id);
                let depth = self.ast.ref_offset_of(t);
                self.ast.node_mut(id).ref_offset = depth;
            }
            None => {
                let msg = Self::lookup_error_message(&lookup, &name);
                let pos = self.ast.pos(id);
                self.ast.error(id, pos, msg);
            }
        }
        id
    }

    fn names_up_to(&self, compound: NodeId, until: NodeId) -> Vec<String> {
        let mut names = Vec::new();
        if let NodeKind::CompoundIdentifier { elems, .. } = self.ast.kind(compound) {
            for e in elems {
                names.push(self.ast.identifier_name(*e).unwrap_or_default());
                if *e == until {
                    break;
                }
            }
        }
        names
    }

    fn build_compound_identifier(&mut self, id: NodeId) -> NodeId {
        self.maybe_inject_this(id);
        let elems = match self.ast.kind(id) {
            NodeKind::CompoundIdentifier { elems, .. } => elems.clone(),
            _ => return id,
        };
        for e in elems {
            self.build(e, id);
        }
        id
    }

    /// Inside a method, a leading element resolving to a member of the
    /// owning class silently gains a `this` prefix.
    fn maybe_inject_this(&mut self, id: NodeId) {
        let method = match self.ast.ancestor(id, |k| matches!(k, NodeKind::ClassMethod { .. })) {
            Some(m) => m,
            None => return,
        };
        let class = match self.ast.ancestor(method, |k| matches!(k, NodeKind::EhClass { .. })) {
            Some(c) => c,
            None => return,
        };
        let first = match self.ast.kind(id) {
            NodeKind::CompoundIdentifier { elems, .. } => match elems.first() {
                Some(f) => *f,
                None => return,
            },
            _ => return,
        };
        let first_name = match self.ast.identifier_name(first) {
            Some(n) => n,
            None => return,
        };
        if first_name == "this" {
            return;
        }
        let members = match self.ast.kind(class) {
            NodeKind::EhClass { contents: Some(c), .. } => c.clone(),
            _ => return,
        };
        let is_member = {
            let mut found = false;
            for m in &members {
                if self.ast.name_of(*m).as_deref() == Some(first_name.as_str()) {
                    found = true;
                    break;
                }
            }
            found
        };
        if !is_member {
            return;
        }
        let pos = self.ast.pos(first);
        let this_ident = self.ast.alloc(pos, NodeKind::Identifier { name: "this".to_string(), decl: None });
        if let NodeKind::CompoundIdentifier { elems, .. } = self.ast.kind_mut(id) {
            elems.insert(0, this_ident);
        }
    }

    fn build_templated_identifier(&mut self, id: NodeId) -> NodeId {
        let types = match self.ast.kind(id) {
            NodeKind::TemplatedIdentifier { types, .. } => types.clone(),
            _ => return id,
        };
        for t in types {
            self.build(t, id);
        }
        id
    }

    /// Syntactic `ref` resolves into a reference to a type or to a value
    /// depending on what its child turned out to be.
    fn build_reference(&mut self, id: NodeId) -> NodeId {
        let (child, quals) = match self.ast.kind(id) {
            NodeKind::Reference { child, quals } => (*child, *quals),
            _ => return id,
        };
        let built_child = self.build(child, id);
        let parent = self.ast.parent(id);
        let is_type = self.ast.is_type_symbol(built_child);
        let new = if is_type {
            self.ast.alloc(self.ast.pos(id), NodeKind::ReferenceToType { child: built_child, quals })
        } else {
            self.ast.alloc(self.ast.pos(id), NodeKind::ReferenceToValue { child: built_child })
        };
        self.ast.reparent(built_child, Some(new));
        if let Some(p) = parent {
            self.ast.set_parent(new, p);
        }
        if !is_type {
            let offset = self.ast.ref_offset_of(built_child);
            self.ast.set_ref_offset_of(built_child, offset - 1);
        }
        new
    }

    fn build_array(&mut self, id: NodeId) -> NodeId {
        let (child, length) = match self.ast.kind(id) {
            NodeKind::Array { child, length, .. } => (*child, *length),
            _ => return id,
        };
        let built = self.build(child, id);
        if built != child {
            self.ast.set_container_child(id, built);
        }
        if let Some(l) = length {
            self.build(l, id);
        }
        id
    }

    fn build_array_access(&mut self, id: NodeId) -> NodeId {
        let (child, index) = match self.ast.kind(id) {
            NodeKind::ArrayAccess { child, index } => (*child, *index),
            _ => return id,
        };
        let built = self.build(child, id);
        if built != child {
            self.ast.set_container_child(id, built);
        }
        self.build(index, id);
        id
    }

    // ----- calls -------------------------------------------------------------

    fn build_function_call(&mut self, id: NodeId) -> NodeId {
        let sym = match self.ast.kind(id) {
            NodeKind::FunctionCall { sym, .. } => *sym,
            _ => return id,
        };
        let built_sym = self.build(sym, id);
        if let NodeKind::FunctionCall { sym: slot, .. } = self.ast.kind_mut(id) {
            *slot = built_sym;
        }

        // A type in call position is a cast expression, not a call.
        if self.ast.is_type_symbol(built_sym) {
            return self.rewrite_into_cast(id, built_sym);
        }

        self.maybe_bind_method(id);

        let args = match self.ast.kind(id) {
            NodeKind::FunctionCall { args, .. } => args.clone(),
            _ => Vec::new(),
        };
        let mut built_args = Vec::with_capacity(args.len());
        for a in args {
            built_args.push(self.build(a, id));
        }
        if let NodeKind::FunctionCall { args: slot, .. } = self.ast.kind_mut(id) {
            *slot = built_args;
        }

        let res = self.reorder_call(id);
        self.check_call(id);
        self.pack_variadic_args(id);
        res
    }

    fn rewrite_into_cast(&mut self, id: NodeId, sym: NodeId) -> NodeId {
        let args = match self.ast.kind(id) {
            NodeKind::FunctionCall { args, .. } => args.clone(),
            _ => Vec::new(),
        };
        let typ = match self.solve(sym) {
            Some(t) if self.ast.is_type_node(t) => t,
            _ => self.make_builtin_type("@any", id),
        };
        let parent = self.ast.parent(id);
        let cast = self.ast.alloc(self.ast.pos(id), NodeKind::Cast { sym, args, typ });
        self.ast.reparent(sym, Some(cast));
        match parent {
            Some(p) => self.build(cast, p),
            None => self.build(cast, id),
        }
    }

    /// A trailing class-method name in call position rewrites the call into
    /// a bound this pointer plus the single method identifier.
    fn maybe_bind_method(&mut self, id: NodeId) {
        let sym = match self.ast.kind(id) {
            NodeKind::FunctionCall { sym, .. } => *sym,
            _ => return,
        };
        let elems = match self.ast.kind(sym) {
            NodeKind::CompoundIdentifier { elems, .. } => elems.clone(),
            _ => return,
        };
        if elems.len() < 2 {
            return;
        }
        let last = *elems.last().expect("nonempty");
        let is_method = matches!(
            self.ast.decl_of(last).map(|d| self.ast.kind(d)),
            Some(NodeKind::ClassMethod { .. })
        );
        if !is_method {
            return;
        }

        let pos = self.ast.pos(sym);
        let obj_elems = elems[..elems.len() - 1].to_vec();
        let obj = self.ast.alloc(
            pos,
            NodeKind::CompoundIdentifier { elems: obj_elems.clone(), quals: Qualifiers::empty() },
        );
        for e in &obj_elems {
            self.ast.reparent(*e, Some(obj));
        }
        self.ast.node_mut(obj).state = BuildState::Built;
        let reference = self.ast.alloc(pos, NodeKind::Reference { child: obj, quals: Qualifiers::empty() });
        let this_arg = self.ast.alloc(
            pos,
            NodeKind::Expression { contents: vec![reference], parenthesised: false },
        );

        let new_sym = self.ast.alloc(
            pos,
            NodeKind::CompoundIdentifier { elems: vec![last], quals: Qualifiers::empty() },
        );
        self.ast.reparent(last, Some(new_sym));
        self.ast.node_mut(new_sym).state = BuildState::Built;
        self.ast.set_parent(new_sym, id);

        if let NodeKind::FunctionCall { sym: slot, args, this_bound } = self.ast.kind_mut(id) {
            *slot = new_sym;
            args.insert(0, this_arg);
            *this_bound = true;
        }
    }

    /// If the callee is wrapped in containers, rotate the call outward so
    /// the outer-visible node shape matches the call expression.
    fn reorder_call(&mut self, id: NodeId) -> NodeId {
        let mut outer: Option<NodeId> = None;
        loop {
            let sym = match self.ast.kind(id) {
                NodeKind::FunctionCall { sym, .. } => *sym,
                _ => break,
            };
            if !self.ast.is_container(sym) {
                break;
            }
            if outer.is_none() {
                outer = Some(sym);
            }
            let inner = match self.ast.container_child(sym) {
                Some(i) => i,
                None => break,
            };
            let call_parent = self.ast.parent(id);
            if let NodeKind::FunctionCall { sym: slot, .. } = self.ast.kind_mut(id) {
                *slot = inner;
            }
            self.ast.reparent(inner, Some(id));
            self.ast.set_container_child(sym, id);
            self.ast.reparent(sym, call_parent);
            self.ast.reparent(id, Some(sym));
        }
        match outer {
            Some(o) => {
                // The final callee keeps no referencing of its own; the call
                // owns the offset now.
                let sym = match self.ast.kind(id) {
                    NodeKind::FunctionCall { sym, .. } => *sym,
                    _ => return o,
                };
                self.ast.set_ref_offset_of(sym, 0);
                o
            }
            None => id,
        }
    }

    /// Arity validation: trailing defaults fill missing arguments, count
    /// mismatches warn, and every positional argument aligns with its
    /// parameter type.
    fn check_call(&mut self, id: NodeId) {
        let (sym, this_bound) = match self.ast.kind(id) {
            NodeKind::FunctionCall { sym, this_bound, .. } => (*sym, *this_bound),
            _ => return,
        };
        let sym_decl = match self.solve(sym) {
            Some(d) => d,
            None => return,
        };
        let typ = self.decl_typ_or_compute(sym_decl);
        let (ft_args, variadic) = match self.ast.kind(typ) {
            NodeKind::FunctionType { args, variadic, .. } => (args.clone(), *variadic),
            _ => {
                let pos = self.ast.pos(id);
                let repr = self.ast.repr_of(sym);
                self.ast.error(id, pos, format!("calling non function type {}", repr));
                return;
            }
        };

        let args_len = match self.ast.kind(id) {
            NodeKind::FunctionCall { args, .. } => args.len(),
            _ => 0,
        };
        let mut diff = args_len as i32 - ft_args.len() as i32;

        // Fill trailing parameters from their own default expressions.
        let mut i = 0;
        while i < ft_args.len() {
            let cur_len = match self.ast.kind(id) {
                NodeKind::FunctionCall { args, .. } => args.len(),
                _ => 0,
            };
            if i >= cur_len {
                let default = match self.ast.kind(ft_args[i]) {
                    NodeKind::VariableDeclaration { assign: Some(a), .. } => {
                        match self.ast.kind(*a) {
                            NodeKind::Assignment { expr, .. } => Some(*expr),
                            _ => None,
                        }
                    }
                    _ => None,
                };
                match default {
                    Some(expr) => {
                        let copy = self.ast.deep_copy(expr);
                        let built = self.build(copy, id);
                        if let NodeKind::FunctionCall { args, .. } = self.ast.kind_mut(id) {
                            args.push(built);
                        }
                        diff += 1;
                    }
                    None => break,
                }
            }
            i += 1;
        }

        let final_len = match self.ast.kind(id) {
            NodeKind::FunctionCall { args, .. } => args.len(),
            _ => 0,
        };
        if diff < 0 || (diff > 0 && !variadic) {
            let pos = self.ast.pos(id);
            let repr = self.ast.repr_of(sym);
            self.ast.warn(
                id,
                pos,
                format!(
                    "{} arguments for call to {}: expected {}, got {}",
                    if diff < 0 { "not enough" } else { "too many" },
                    repr,
                    ft_args.len(),
                    final_len
                ),
            );
        }

        let args = match self.ast.kind(id) {
            NodeKind::FunctionCall { args, .. } => args.clone(),
            _ => Vec::new(),
        };
        let mut i = if this_bound { 1 } else { 0 };
        while i < args.len() && i < ft_args.len() {
            let param_typ = self.decl_typ_or_compute(ft_args[i]);
            self.auto_cast(args[i], param_typ);
            i += 1;
        }
    }

    /// Native variadic calls materialize their trailing arguments into a
    /// synthesized local array hoisted before the current statement, then
    /// pass (count, array). Foreign variadic calls use the C ABI unchanged.
    fn pack_variadic_args(&mut self, id: NodeId) {
        let sym = match self.ast.kind(id) {
            NodeKind::FunctionCall { sym, .. } => *sym,
            _ => return,
        };
        let sym_decl = match self.solve(sym) {
            Some(d) => d,
            None => return,
        };
        if self.ast.decl_type_of(sym_decl) == DeclarationType::Foreign {
            return;
        }
        let typ = self.decl_typ_or_compute(sym_decl);
        let (named, variadic) = match self.ast.kind(typ) {
            NodeKind::FunctionType { args, variadic, .. } => (args.len(), *variadic),
            _ => return,
        };
        if !variadic {
            return;
        }
        let args = match self.ast.kind(id) {
            NodeKind::FunctionCall { args, .. } => args.clone(),
            _ => return,
        };
        if args.len() <= named {
            return;
        }
        let extra = args[named..].to_vec();
        let count = extra.len();
        let pos = self.ast.pos(id);

        // any[] __vargsN = { ... } hoisted right before this statement.
        let tmp = self.temp_name("vargs");
        let init_list = self.ast.alloc(pos, NodeKind::InitializationList { contents: extra.clone() });
        for e in &extra {
            self.ast.reparent(*e, Some(init_list));
        }
        let init_expr = self.ast.alloc(
            pos,
            NodeKind::Expression { contents: vec![init_list], parenthesised: false },
        );
        let assign = self.ast.alloc(pos, NodeKind::Assignment { operator: None, expr: init_expr });
        let elem_ident = self.ast.alloc(pos, NodeKind::Identifier { name: "@any".to_string(), decl: None });
        let elem_sym = self.ast.alloc(
            pos,
            NodeKind::CompoundIdentifier { elems: vec![elem_ident], quals: Qualifiers::empty() },
        );
        let len_node = self.ast.alloc(pos, NodeKind::Number { value: count.to_string() });
        let arr = self.ast.alloc(
            pos,
            NodeKind::Array { child: elem_sym, length: Some(len_node), quals: Qualifiers::empty() },
        );
        let tmp_ident = self.ast.alloc(pos, NodeKind::Identifier { name: tmp.clone(), decl: None });
        let decl = self.ast.alloc(
            pos,
            NodeKind::VariableDeclaration {
                typ_src: arr,
                sym: Some(tmp_ident),
                quals: Qualifiers::empty(),
                decl_type: DeclarationType::Native,
                typ: None,
                assign: Some(assign),
            },
        );
        let stmt = self.ast.alloc(pos, NodeKind::Statement { expr: decl });
        self.hoist_before_current(stmt);

        let count_node = self.ast.alloc(pos, NodeKind::Number { value: count.to_string() });
        let tmp_ref_ident = self.ast.alloc(pos, NodeKind::Identifier { name: tmp, decl: None });
        let tmp_sym = self.ast.alloc(
            pos,
            NodeKind::CompoundIdentifier { elems: vec![tmp_ref_ident], quals: Qualifiers::empty() },
        );
        let built_count = self.build(count_node, id);
        let built_sym = self.build(tmp_sym, id);
        if let NodeKind::FunctionCall { args, .. } = self.ast.kind_mut(id) {
            args.truncate(named);
            args.push(built_count);
            args.push(built_sym);
        }
    }

    fn build_cast(&mut self, id: NodeId) -> NodeId {
        let args = match self.ast.kind(id) {
            NodeKind::Cast { args, .. } => args.clone(),
            _ => return id,
        };
        let pos = self.ast.pos(id);
        if args.is_empty() {
            self.ast.error(id, pos, "cast requires a value");
        } else if args.len() > 1 {
            self.ast.error(id, pos, "too many values for cast expression");
        } else {
            self.build(args[0], id);
        }
        id
    }

    // ----- values ------------------------------------------------------------

    fn build_expression(&mut self, id: NodeId) -> NodeId {
        let contents = match self.ast.kind(id) {
            NodeKind::Expression { contents, .. } => contents.clone(),
            _ => return id,
        };
        let mut built = Vec::with_capacity(contents.len());
        for c in contents {
            built.push(self.build(c, id));
        }
        if let NodeKind::Expression { contents: slot, .. } = self.ast.kind_mut(id) {
            *slot = built;
        }
        id
    }

    /// An initialization list in a plain value position becomes a hoisted
    /// temporary array variable; as a direct initializer it stays in place.
    fn build_initialization_list(&mut self, id: NodeId) -> NodeId {
        let contents = match self.ast.kind(id) {
            NodeKind::InitializationList { contents } => contents.clone(),
            _ => return id,
        };
        let mut built = Vec::with_capacity(contents.len());
        for c in contents {
            built.push(self.build(c, id));
        }
        if let NodeKind::InitializationList { contents: slot } = self.ast.kind_mut(id) {
            *slot = built.clone();
        }

        if self.is_direct_initializer(id) || self.flow.is_empty() {
            return id;
        }

        // Materialize the anonymous literal.
        let pos = self.ast.pos(id);
        let elem_typ = match built.first() {
            Some(first) => {
                let t = self.typ(*first);
                self.ast.name_of(t).unwrap_or_else(|| "@any".to_string())
            }
            None => "@any".to_string(),
        };
        let elem_name = match elem_typ.as_str() {
            "@ref" | "@array" | "@func" => "@any".to_string(),
            other => other.to_string(),
        };
        let tmp = self.temp_name("array");
        let list_expr = self.ast.alloc(
            pos,
            NodeKind::Expression { contents: vec![id], parenthesised: false },
        );
        let assign = self.ast.alloc(pos, NodeKind::Assignment { operator: None, expr: list_expr });
        let elem_ident = self.ast.alloc(pos, NodeKind::Identifier { name: elem_name, decl: None });
        let elem_sym = self.ast.alloc(
            pos,
            NodeKind::CompoundIdentifier { elems: vec![elem_ident], quals: Qualifiers::empty() },
        );
        let len_node = self.ast.alloc(pos, NodeKind::Number { value: built.len().to_string() });
        let arr = self.ast.alloc(
            pos,
            NodeKind::Array { child: elem_sym, length: Some(len_node), quals: Qualifiers::empty() },
        );
        let tmp_ident = self.ast.alloc(pos, NodeKind::Identifier { name: tmp.clone(), decl: None });
        let decl = self.ast.alloc(
            pos,
            NodeKind::VariableDeclaration {
                typ_src: arr,
                sym: Some(tmp_ident),
                quals: Qualifiers::empty(),
                decl_type: DeclarationType::Native,
                typ: None,
                assign: Some(assign),
            },
        );
        let stmt = self.ast.alloc(pos, NodeKind::Statement { expr: decl });
        self.ast.reparent(id, Some(list_expr));
        self.hoist_before_current(stmt);

        let rep_ident = self.ast.alloc(pos, NodeKind::Identifier { name: tmp, decl: None });
        let rep = self.ast.alloc(
            pos,
            NodeKind::CompoundIdentifier { elems: vec![rep_ident], quals: Qualifiers::empty() },
        );
        let parent = self.ast.parent(id).unwrap_or(stmt);
        self.build(rep, parent)
    }

    fn is_direct_initializer(&self, id: NodeId) -> bool {
        let mut cur = self.ast.parent(id);
        while let Some(p) = cur {
            match self.ast.kind(p) {
                NodeKind::Expression { .. } => cur = self.ast.parent(p),
                NodeKind::Assignment { .. } => {
                    return matches!(
                        self.ast.parent(p).map(|pp| self.ast.kind(pp)),
                        Some(NodeKind::VariableDeclaration { .. })
                    );
                }
                _ => return false,
            }
        }
        false
    }

    fn build_assignment(&mut self, id: NodeId) -> NodeId {
        let expr = match self.ast.kind(id) {
            NodeKind::Assignment { expr, .. } => *expr,
            _ => return id,
        };
        let built = self.build(expr, id);
        if let NodeKind::Assignment { expr: slot, .. } = self.ast.kind_mut(id) {
            *slot = built;
        }
        id
    }

    fn build_variable_assignment(&mut self, id: NodeId) -> NodeId {
        let (var, assign) = match self.ast.kind(id) {
            NodeKind::VariableAssignment { var, assign } => (*var, *assign),
            _ => return id,
        };
        let built_var = self.build(var, id);
        if let NodeKind::VariableAssignment { var: slot, .. } = self.ast.kind_mut(id) {
            *slot = built_var;
        }
        self.build(assign, id);
        if let NodeKind::Assignment { expr, .. } = self.ast.kind(assign) {
            let expr = *expr;
            self.auto_cast(expr, built_var);
        }
        id
    }

    fn build_sizeof(&mut self, id: NodeId) -> NodeId {
        let sz_typ = match self.ast.kind(id) {
            NodeKind::Sizeof { sz_typ } => *sz_typ,
            _ => return id,
        };
        let built = self.build(sz_typ, id);
        if let NodeKind::Sizeof { sz_typ: slot } = self.ast.kind_mut(id) {
            *slot = built;
        }
        id
    }

    fn build_unary(&mut self, id: NodeId) -> NodeId {
        let val = match self.ast.kind(id) {
            NodeKind::PrefixOperatorValue { val, .. } | NodeKind::SuffixOperatorValue { val, .. } => {
                *val
            }
            _ => return id,
        };
        let built = self.build(val, id);
        match self.ast.kind_mut(id) {
            NodeKind::PrefixOperatorValue { val: slot, .. }
            | NodeKind::SuffixOperatorValue { val: slot, .. } => *slot = built,
            _ => {}
        }
        id
    }

    // ----- statements --------------------------------------------------------

    fn build_statement(&mut self, id: NodeId) -> NodeId {
        let expr = match self.ast.kind(id) {
            NodeKind::Statement { expr } => *expr,
            _ => return id,
        };
        let built = self.build(expr, id);
        if let NodeKind::Statement { expr: slot } = self.ast.kind_mut(id) {
            *slot = built;
        }
        id
    }

    /// A return value aligns with the enclosing function's return type.
    fn build_return(&mut self, id: NodeId) -> NodeId {
        let expr = match self.ast.kind(id) {
            NodeKind::Return { expr } => *expr,
            _ => return id,
        };
        let expr = match expr {
            Some(e) => e,
            None => return id,
        };
        let built = self.build(expr, id);
        if let NodeKind::Return { expr: slot } = self.ast.kind_mut(id) {
            *slot = Some(built);
        }
        let fun = self.ast.ancestor(id, |k| matches!(k, NodeKind::FunctionDefinition { .. }));
        if let Some(fun) = fun {
            let ft = self.decl_typ_or_compute(fun);
            if let NodeKind::FunctionType { ret, .. } = self.ast.kind(ft) {
                let ret = *ret;
                self.auto_cast(built, ret);
            }
        }
        id
    }

    fn build_condition(&mut self, id: NodeId) -> NodeId {
        let branches = match self.ast.kind(id) {
            NodeKind::Condition { branches } => branches.clone(),
            _ => return id,
        };
        for b in branches {
            self.build(b, id);
        }
        id
    }

    fn build_control_structure(&mut self, id: NodeId) -> NodeId {
        let (ctrl, cond, init, update) = match self.ast.kind(id) {
            NodeKind::ControlStructure { ctrl, cond, init, update, .. } => {
                (*ctrl, *cond, *init, *update)
            }
            _ => return id,
        };
        if let Some(init) = init {
            self.build(init, id);
            if ctrl == CtrlKind::For {
                if let NodeKind::VariableDeclaration { assign: None, sym, .. } = self.ast.kind(init) {
                    let name = sym.and_then(|s| self.ast.identifier_name(s)).unwrap_or_default();
                    let pos = self.ast.pos(init);
                    self.ast.error(id, pos, format!("uninitialized loop variable {}", name));
                }
            }
        }
        if let Some(cond) = cond {
            self.build(cond, id);
        }
        if let Some(update) = update {
            self.build(update, id);
        }
        if ctrl == CtrlKind::Switch {
            let cases = match self.ast.kind(id) {
                NodeKind::ControlStructure { body, .. } => body.clone(),
                _ => Vec::new(),
            };
            for c in cases {
                self.build(c, id);
            }
        } else {
            self.build_flow_body(id);
        }
        id
    }

    fn build_switch_case(&mut self, id: NodeId) -> NodeId {
        let (tests, body) = match self.ast.kind(id) {
            NodeKind::SwitchCase { tests, body } => (tests.clone(), *body),
            _ => return id,
        };
        for t in tests {
            self.build(t, id);
        }
        self.build(body, id);
        id
    }

    fn build_switch_case_test(&mut self, id: NodeId) -> NodeId {
        let test = match self.ast.kind(id) {
            NodeKind::SwitchCaseTest { test } => *test,
            _ => return id,
        };
        if let Some(t) = test {
            self.build(t, id);
        }
        id
    }

    fn build_switch_case_body(&mut self, id: NodeId) -> NodeId {
        self.build_flow_body(id);
        id
    }

    /// Convenience used by tests and collaborators: record a failure from
    /// outside the tree walk.
    #[allow(dead_code)]
    pub(crate) fn report(&mut self, id: NodeId, severity: Severity, msg: impl Into<String>) {
        let pos = self.ast.pos(id);
        self.ast.fail(id, severity, pos, msg);
    }
}
