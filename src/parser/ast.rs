//! Arena-backed syntax tree for Ehlit.
//!
//! Every node lives in one arena owned by [`Ast`]; nodes reference each other
//! through [`NodeId`] indices. Parents exclusively own their children, while
//! declaration back-references (an identifier's resolved declaration) are
//! plain indices into the arena and never freed through the referencing node.

use bitflags::bitflags;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::cheader::HeaderImporter;
use crate::diagnostics::{Failure, Severity, SourceMap};

/// Index of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Semantic resolution state of a node.
///
/// `Building` is what lets mutually-referencing declarations terminate: a
/// node asked to build while already building is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Unbuilt,
    Building,
    Built,
}

bitflags! {
    /// Declaration qualifiers
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct Qualifiers: u8 {
        const CONST = 1 << 0;
        const RESTRICT = 1 << 1;
        const VOLATILE = 1 << 2;
        const INLINE = 1 << 3;
        const STATIC = 1 << 4;
        const PRIVATE = 1 << 5;
    }
}

/// Origin of a declaration. Foreign declarations come from C headers and are
/// never name-mangled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationType {
    Native,
    Foreign,
}

/// Function body text whose parsing is delayed until the surrounding
/// declarations are known.
#[derive(Debug, Clone)]
pub struct UnparsedContents {
    pub contents: String,
    pub pos: usize,
}

/// Declarations exposed by a scoping node, plus the declarations that were
/// referenced before their own definition point and therefore need a forward
/// prototype in the emitted C.
#[derive(Debug, Clone, Default)]
pub struct ScopeData {
    pub declarations: Vec<NodeId>,
    pub predeclarations: Vec<NodeId>,
}

/// Control structure discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlKind {
    If,
    Elif,
    Else,
    While,
    DoWhile,
    For,
    Switch,
}

/// The closed set of node kinds
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// File root; an unordered scope holding top level nodes and the builtin
    /// type table.
    Root {
        nodes: Vec<NodeId>,
        builtins: Vec<NodeId>,
        scope: ScopeData,
    },
    Import {
        lib: Vec<String>,
        syms: Vec<NodeId>,
        scope: ScopeData,
        file: Option<String>,
    },
    Include {
        lib: Vec<String>,
        syms: Vec<NodeId>,
        scope: ScopeData,
    },
    Namespace {
        sym: NodeId,
        contents: Vec<NodeId>,
        scope: ScopeData,
    },

    // Declarations
    Declaration {
        typ_src: NodeId,
        sym: Option<NodeId>,
        quals: Qualifiers,
        decl_type: DeclarationType,
        typ: Option<NodeId>,
    },
    VariableDeclaration {
        typ_src: NodeId,
        sym: Option<NodeId>,
        quals: Qualifiers,
        decl_type: DeclarationType,
        typ: Option<NodeId>,
        assign: Option<NodeId>,
    },
    FunctionDeclaration {
        typ_src: NodeId,
        sym: Option<NodeId>,
        quals: Qualifiers,
        decl_type: DeclarationType,
        typ: Option<NodeId>,
    },
    FunctionDefinition {
        typ_src: NodeId,
        sym: Option<NodeId>,
        quals: Qualifiers,
        decl_type: DeclarationType,
        typ: Option<NodeId>,
        body_str: Option<UnparsedContents>,
        body: Vec<NodeId>,
        scope: ScopeData,
    },
    /// Class-bound function; wraps a FunctionDefinition and injects the
    /// owning class as the leading `this` reference parameter.
    ClassMethod {
        inner: NodeId,
    },
    /// Class-bound variable; wraps a VariableDeclaration.
    ClassProperty {
        inner: NodeId,
    },
    Alias {
        src_sym: NodeId,
        canonical: Option<NodeId>,
        dst: NodeId,
        quals: Qualifiers,
    },

    // Types
    BuiltinType {
        name: String,
    },
    ReferenceType {
        child: NodeId,
        quals: Qualifiers,
    },
    ArrayType {
        child: NodeId,
    },
    FunctionType {
        ret: NodeId,
        args: Vec<NodeId>,
        variadic: bool,
    },
    Struct {
        sym: NodeId,
        fields: Option<Vec<NodeId>>,
        scope: ScopeData,
    },
    EhUnion {
        sym: NodeId,
        fields: Option<Vec<NodeId>>,
        scope: ScopeData,
    },
    EhClass {
        sym: NodeId,
        contents: Option<Vec<NodeId>>,
        scope: ScopeData,
    },
    EhEnum {
        sym: NodeId,
        fields: Option<Vec<NodeId>>,
        scope: ScopeData,
    },

    // Symbols and values
    Identifier {
        name: String,
        decl: Option<NodeId>,
    },
    CompoundIdentifier {
        elems: Vec<NodeId>,
        quals: Qualifiers,
    },
    TemplatedIdentifier {
        name: String,
        types: Vec<NodeId>,
        quals: Qualifiers,
    },
    /// Syntactic `ref`; resolves at build time into ReferenceToValue or
    /// ReferenceToType depending on its child.
    Reference {
        child: NodeId,
        quals: Qualifiers,
    },
    ReferenceToValue {
        child: NodeId,
    },
    ReferenceToType {
        child: NodeId,
        quals: Qualifiers,
    },
    /// Syntactic array wrapper used in type position before resolution.
    Array {
        child: NodeId,
        length: Option<NodeId>,
        quals: Qualifiers,
    },
    ArrayAccess {
        child: NodeId,
        index: NodeId,
    },
    FunctionCall {
        sym: NodeId,
        args: Vec<NodeId>,
        this_bound: bool,
    },
    Cast {
        sym: NodeId,
        args: Vec<NodeId>,
        typ: NodeId,
    },
    Expression {
        contents: Vec<NodeId>,
        parenthesised: bool,
    },
    InitializationList {
        contents: Vec<NodeId>,
    },
    Assignment {
        operator: Option<String>,
        expr: NodeId,
    },
    VariableAssignment {
        var: NodeId,
        assign: NodeId,
    },
    Operator {
        op: String,
    },
    Sizeof {
        sz_typ: NodeId,
    },
    StringLiteral {
        value: String,
    },
    CharLiteral {
        value: String,
    },
    Number {
        value: String,
    },
    NullValue,
    BoolValue {
        value: bool,
    },
    PrefixOperatorValue {
        op: String,
        val: NodeId,
    },
    SuffixOperatorValue {
        op: String,
        val: NodeId,
    },

    // Statements
    Statement {
        expr: NodeId,
    },
    Return {
        expr: Option<NodeId>,
    },
    Condition {
        branches: Vec<NodeId>,
    },
    ControlStructure {
        ctrl: CtrlKind,
        cond: Option<NodeId>,
        init: Option<NodeId>,
        update: Option<NodeId>,
        body: Vec<NodeId>,
        scope: ScopeData,
    },
    SwitchCase {
        tests: Vec<NodeId>,
        body: NodeId,
    },
    SwitchCaseTest {
        test: Option<NodeId>,
    },
    SwitchCaseBody {
        contents: Vec<NodeId>,
        block: bool,
        fallthrough: bool,
        scope: ScopeData,
    },
}

/// A single tree element
#[derive(Debug)]
pub struct Node {
    pub pos: usize,
    pub state: BuildState,
    pub parent: Option<NodeId>,
    /// Referencing offset applied when the value is written to C: -1 takes
    /// the address, n > 0 dereferences n times.
    pub ref_offset: i32,
    /// Type used to reinterpret the value at emission time, if any.
    pub cast: Option<NodeId>,
    pub kind: NodeKind,
}

/// Per-build mutable state shared across the whole tree.
///
/// The dedup sets guarantee every physical file or header is parsed at most
/// once per build; they are owned here so two independent builds never see
/// each other's state.
#[derive(Debug, Default)]
pub struct Session {
    pub imported: HashSet<PathBuf>,
    pub included: HashSet<String>,
    pub import_paths: Vec<PathBuf>,
    pub temp_counter: usize,
}

/// The arena and everything a build accumulates
pub struct Ast {
    nodes: Vec<Node>,
    pub root: NodeId,
    pub failures: Vec<Failure>,
    pub session: Session,
    pub sources: SourceMap,
    /// Name of the file this tree was parsed from; failures with no
    /// enclosing inclusion attribute to it.
    pub entry_file: String,
    pub importer: Option<Box<dyn HeaderImporter>>,
}

impl Ast {
    pub fn new(entry_file: impl Into<String>) -> Self {
        let mut ast = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            failures: Vec::new(),
            session: Session::default(),
            sources: SourceMap::new(),
            entry_file: entry_file.into(),
            importer: None,
        };
        ast.root = ast.alloc(
            0,
            NodeKind::Root {
                nodes: Vec::new(),
                builtins: Vec::new(),
                scope: ScopeData::default(),
            },
        );
        ast
    }

    pub fn alloc(&mut self, pos: usize, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            pos,
            state: BuildState::Unbuilt,
            parent: None,
            ref_offset: 0,
            cast: None,
            kind,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.node_mut(id).kind
    }

    pub fn pos(&self, id: NodeId) -> usize {
        self.node(id).pos
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Attach a node to its parent. The first assignment wins; re-parenting
    /// after construction is ignored.
    pub fn set_parent(&mut self, id: NodeId, parent: NodeId) {
        let node = self.node_mut(id);
        if node.parent.is_none() {
            node.parent = Some(parent);
        }
    }

    /// Forcefully rewire a parent link. Only the call-reordering rotation may
    /// use this; everything else goes through `set_parent`.
    pub fn reparent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.node_mut(id).parent = parent;
    }

    /// Arena watermark, paired with `rewind` for parser backtracking.
    pub fn mark(&self) -> usize {
        self.nodes.len()
    }

    /// Drop every node allocated after `mark`. Only safe while parsing,
    /// before any cross-references to the dropped range exist.
    pub fn rewind(&mut self, mark: usize) {
        self.nodes.truncate(mark);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ----- failure recording -------------------------------------------------

    /// Record a failure, attributing it to the file owning `from`.
    pub fn fail(&mut self, from: NodeId, severity: Severity, pos: usize, msg: impl Into<String>) {
        let file = self.file_of(from);
        self.failures.push(Failure::new(severity, pos, msg, file));
    }

    pub fn error(&mut self, from: NodeId, pos: usize, msg: impl Into<String>) {
        self.fail(from, Severity::Error, pos, msg);
    }

    pub fn warn(&mut self, from: NodeId, pos: usize, msg: impl Into<String>) {
        self.fail(from, Severity::Warning, pos, msg);
    }

    /// File a node belongs to: the nearest enclosing import's resolved path,
    /// or the entry file.
    pub fn file_of(&self, id: NodeId) -> String {
        let mut cur = Some(id);
        while let Some(n) = cur {
            if let NodeKind::Import { file: Some(f), .. } = self.kind(n) {
                return f.clone();
            }
            cur = self.parent(n);
        }
        self.entry_file.clone()
    }

    // ----- classification ----------------------------------------------------

    /// Whether the node is a declaration holder (may answer `get_declaration`).
    pub fn is_declaration(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            NodeKind::Declaration { .. }
                | NodeKind::VariableDeclaration { .. }
                | NodeKind::FunctionDeclaration { .. }
                | NodeKind::FunctionDefinition { .. }
                | NodeKind::ClassMethod { .. }
                | NodeKind::ClassProperty { .. }
                | NodeKind::Alias { .. }
                | NodeKind::BuiltinType { .. }
                | NodeKind::ReferenceType { .. }
                | NodeKind::ArrayType { .. }
                | NodeKind::FunctionType { .. }
                | NodeKind::Struct { .. }
                | NodeKind::EhUnion { .. }
                | NodeKind::EhClass { .. }
                | NodeKind::EhEnum { .. }
                | NodeKind::Namespace { .. }
        )
    }

    /// Whether the node is a resolved type
    pub fn is_type_node(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            NodeKind::BuiltinType { .. }
                | NodeKind::ReferenceType { .. }
                | NodeKind::ArrayType { .. }
                | NodeKind::FunctionType { .. }
                | NodeKind::Struct { .. }
                | NodeKind::EhUnion { .. }
                | NodeKind::EhClass { .. }
                | NodeKind::EhEnum { .. }
        )
    }

    /// Containers wrapping an inner symbol, relevant to call reordering
    pub fn is_container(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            NodeKind::Reference { .. }
                | NodeKind::ReferenceToValue { .. }
                | NodeKind::ReferenceToType { .. }
                | NodeKind::Array { .. }
                | NodeKind::ArrayAccess { .. }
        )
    }

    pub fn container_child(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::Reference { child, .. }
            | NodeKind::ReferenceToValue { child }
            | NodeKind::ReferenceToType { child, .. }
            | NodeKind::Array { child, .. }
            | NodeKind::ArrayAccess { child, .. }
            | NodeKind::ReferenceType { child, .. }
            | NodeKind::ArrayType { child } => Some(*child),
            _ => None,
        }
    }

    pub fn set_container_child(&mut self, id: NodeId, new_child: NodeId) {
        match self.kind_mut(id) {
            NodeKind::Reference { child, .. }
            | NodeKind::ReferenceToValue { child }
            | NodeKind::ReferenceToType { child, .. }
            | NodeKind::Array { child, .. }
            | NodeKind::ArrayAccess { child, .. }
            | NodeKind::ReferenceType { child, .. }
            | NodeKind::ArrayType { child } => *child = new_child,
            _ => {}
        }
    }

    /// Innermost non-container child
    pub fn inner_child(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(child) = self.container_child(cur) {
            cur = child;
        }
        cur
    }

    /// Whether `id` or one of its ancestors matches `pred`
    pub fn is_child_of(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> bool {
        let mut cur = Some(id);
        while let Some(n) = cur {
            if pred(self.kind(n)) {
                return true;
            }
            cur = self.parent(n);
        }
        false
    }

    /// Nearest ancestor (including `id` itself) matching `pred`
    pub fn ancestor(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        let mut cur = Some(id);
        while let Some(n) = cur {
            if pred(self.kind(n)) {
                return Some(n);
            }
            cur = self.parent(n);
        }
        None
    }

    // ----- declaration surface ----------------------------------------------

    /// Name a declaration exposes to lookup, if any
    pub fn name_of(&self, id: NodeId) -> Option<String> {
        match self.kind(id) {
            NodeKind::Declaration { sym, .. }
            | NodeKind::VariableDeclaration { sym, .. }
            | NodeKind::FunctionDeclaration { sym, .. }
            | NodeKind::FunctionDefinition { sym, .. } => sym.and_then(|s| self.identifier_name(s)),
            NodeKind::Alias { dst, .. } => self.identifier_name(*dst),
            NodeKind::BuiltinType { name } => Some(name.clone()),
            NodeKind::ReferenceType { .. } => Some("@ref".to_string()),
            NodeKind::ArrayType { .. } => Some("@array".to_string()),
            NodeKind::FunctionType { .. } => Some("@func".to_string()),
            NodeKind::Struct { sym, .. }
            | NodeKind::EhUnion { sym, .. }
            | NodeKind::EhClass { sym, .. }
            | NodeKind::EhEnum { sym, .. }
            | NodeKind::Namespace { sym, .. } => self.identifier_name(*sym),
            NodeKind::ClassMethod { inner } | NodeKind::ClassProperty { inner } => self.name_of(*inner),
            NodeKind::TemplatedIdentifier { name, .. } => Some(name.clone()),
            _ => None,
        }
    }

    pub fn identifier_name(&self, id: NodeId) -> Option<String> {
        match self.kind(id) {
            NodeKind::Identifier { name, .. } => Some(name.clone()),
            _ => None,
        }
    }

    /// Human-readable spelling of a symbol for diagnostics
    pub fn repr_of(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Identifier { name, .. } => name.clone(),
            NodeKind::CompoundIdentifier { elems, .. } => elems
                .iter()
                .filter_map(|e| self.identifier_name(*e))
                .collect::<Vec<_>>()
                .join("."),
            NodeKind::TemplatedIdentifier { name, .. } => format!("{}<>", name),
            NodeKind::Reference { child, .. } => format!("ref {}", self.repr_of(*child)),
            NodeKind::ReferenceToValue { child } | NodeKind::ReferenceToType { child, .. } => {
                format!("ref {}", self.repr_of(*child))
            }
            NodeKind::Array { child, .. } | NodeKind::ArrayAccess { child, .. } => {
                format!("{}[]", self.repr_of(*child))
            }
            NodeKind::Alias { dst, .. } => self.identifier_name(*dst).unwrap_or_default(),
            _ => self.name_of(id).unwrap_or_else(|| kind_name(self.kind(id)).to_string()),
        }
    }

    /// Qualifiers carried by a declaration or symbol
    pub fn quals_of(&self, id: NodeId) -> Qualifiers {
        match self.kind(id) {
            NodeKind::Declaration { quals, .. }
            | NodeKind::VariableDeclaration { quals, .. }
            | NodeKind::FunctionDeclaration { quals, .. }
            | NodeKind::FunctionDefinition { quals, .. }
            | NodeKind::Alias { quals, .. }
            | NodeKind::CompoundIdentifier { quals, .. }
            | NodeKind::TemplatedIdentifier { quals, .. }
            | NodeKind::Reference { quals, .. }
            | NodeKind::ReferenceToType { quals, .. }
            | NodeKind::Array { quals, .. } => *quals,
            NodeKind::ClassMethod { inner } | NodeKind::ClassProperty { inner } => self.quals_of(*inner),
            _ => Qualifiers::empty(),
        }
    }

    pub fn decl_type_of(&self, id: NodeId) -> DeclarationType {
        match self.kind(id) {
            NodeKind::Declaration { decl_type, .. }
            | NodeKind::VariableDeclaration { decl_type, .. }
            | NodeKind::FunctionDeclaration { decl_type, .. }
            | NodeKind::FunctionDefinition { decl_type, .. } => *decl_type,
            NodeKind::ClassMethod { inner } | NodeKind::ClassProperty { inner } => {
                self.decl_type_of(*inner)
            }
            _ => {
                if self.is_child_of(id, |k| matches!(k, NodeKind::Include { .. })) {
                    DeclarationType::Foreign
                } else {
                    DeclarationType::Native
                }
            }
        }
    }

    // ----- scopes ------------------------------------------------------------

    pub fn scope_data(&self, id: NodeId) -> Option<&ScopeData> {
        match self.kind(id) {
            NodeKind::Root { scope, .. }
            | NodeKind::Import { scope, .. }
            | NodeKind::Include { scope, .. }
            | NodeKind::Namespace { scope, .. }
            | NodeKind::FunctionDefinition { scope, .. }
            | NodeKind::Struct { scope, .. }
            | NodeKind::EhUnion { scope, .. }
            | NodeKind::EhClass { scope, .. }
            | NodeKind::EhEnum { scope, .. }
            | NodeKind::ControlStructure { scope, .. }
            | NodeKind::SwitchCaseBody { scope, .. } => Some(scope),
            _ => None,
        }
    }

    pub fn scope_data_mut(&mut self, id: NodeId) -> Option<&mut ScopeData> {
        match self.kind_mut(id) {
            NodeKind::Root { scope, .. }
            | NodeKind::Import { scope, .. }
            | NodeKind::Include { scope, .. }
            | NodeKind::Namespace { scope, .. }
            | NodeKind::FunctionDefinition { scope, .. }
            | NodeKind::Struct { scope, .. }
            | NodeKind::EhUnion { scope, .. }
            | NodeKind::EhClass { scope, .. }
            | NodeKind::EhEnum { scope, .. }
            | NodeKind::ControlStructure { scope, .. }
            | NodeKind::SwitchCaseBody { scope, .. } => Some(scope),
            _ => None,
        }
    }

    /// Record a declaration on the nearest enclosing scope
    pub fn declare(&mut self, from: NodeId, decl: NodeId) {
        let mut cur = self.parent(from);
        while let Some(n) = cur {
            if let Some(scope) = self.scope_data_mut(n) {
                scope.declarations.push(decl);
                return;
            }
            cur = self.parent(n);
        }
    }

    // ----- read-only resolution queries (post-build, used by writers) --------

    /// Declaration a value resolves to, without allocating
    pub fn decl_of(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::Identifier { decl, .. } => *decl,
            NodeKind::CompoundIdentifier { elems, .. } => elems.last().and_then(|e| self.decl_of(*e)),
            NodeKind::TemplatedIdentifier { types, .. } => types.first().copied(),
            NodeKind::ArrayAccess { child, .. } => self.decl_of(*child),
            NodeKind::FunctionCall { sym, .. } => self.decl_of(*sym),
            NodeKind::Cast { typ, .. } => Some(*typ),
            NodeKind::Alias { canonical, .. } => *canonical,
            NodeKind::PrefixOperatorValue { val, .. } | NodeKind::SuffixOperatorValue { val, .. } => {
                self.decl_of(*val)
            }
            NodeKind::BuiltinType { .. }
            | NodeKind::Struct { .. }
            | NodeKind::EhUnion { .. }
            | NodeKind::EhClass { .. }
            | NodeKind::EhEnum { .. } => Some(id),
            _ => None,
        }
    }

    /// Resolve a value through any chain of symbol declarations to the
    /// canonical declaration it names.
    pub fn canonical_of(&self, id: NodeId) -> Option<NodeId> {
        let mut decl = self.decl_of(id)?;
        let mut hops = 0;
        loop {
            let next = match self.kind(decl) {
                NodeKind::Alias { canonical, .. } => *canonical,
                NodeKind::CompoundIdentifier { .. }
                | NodeKind::TemplatedIdentifier { .. }
                | NodeKind::Reference { .. }
                | NodeKind::ReferenceToValue { .. }
                | NodeKind::ReferenceToType { .. }
                | NodeKind::Array { .. } => self.decl_of(decl),
                _ => return Some(decl),
            };
            match next {
                Some(n) => decl = n,
                None => return None,
            }
            hops += 1;
            if hops > 64 {
                return None;
            }
        }
    }

    /// Recursively copy a subtree, resetting resolution state. Used when a
    /// parse-time expansion or a default argument needs its own copy of an
    /// operand so the tree stays a tree.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let pos = self.pos(id);
        let kind = self.kind(id).clone();
        let new_kind = match kind {
            NodeKind::Identifier { name, .. } => NodeKind::Identifier { name, decl: None },
            NodeKind::CompoundIdentifier { elems, quals } => NodeKind::CompoundIdentifier {
                elems: elems.iter().map(|e| self.deep_copy(*e)).collect(),
                quals,
            },
            NodeKind::TemplatedIdentifier { name, types, quals } => NodeKind::TemplatedIdentifier {
                name,
                types: types.iter().map(|t| self.deep_copy(*t)).collect(),
                quals,
            },
            NodeKind::Reference { child, quals } => NodeKind::Reference {
                child: self.deep_copy(child),
                quals,
            },
            NodeKind::ReferenceToValue { child } => NodeKind::ReferenceToValue {
                child: self.deep_copy(child),
            },
            NodeKind::ReferenceToType { child, quals } => NodeKind::ReferenceToType {
                child: self.deep_copy(child),
                quals,
            },
            NodeKind::ReferenceType { child, quals } => NodeKind::ReferenceType {
                child: self.deep_copy(child),
                quals,
            },
            NodeKind::ArrayType { child } => NodeKind::ArrayType {
                child: self.deep_copy(child),
            },
            NodeKind::Array { child, length, quals } => NodeKind::Array {
                child: self.deep_copy(child),
                length: length.map(|l| self.deep_copy(l)),
                quals,
            },
            NodeKind::ArrayAccess { child, index } => NodeKind::ArrayAccess {
                child: self.deep_copy(child),
                index: self.deep_copy(index),
            },
            NodeKind::FunctionCall { sym, args, this_bound } => NodeKind::FunctionCall {
                sym: self.deep_copy(sym),
                args: args.iter().map(|a| self.deep_copy(*a)).collect(),
                this_bound,
            },
            NodeKind::Cast { sym, args, typ } => NodeKind::Cast {
                sym: self.deep_copy(sym),
                args: args.iter().map(|a| self.deep_copy(*a)).collect(),
                typ,
            },
            NodeKind::Expression { contents, parenthesised } => NodeKind::Expression {
                contents: contents.iter().map(|c| self.deep_copy(*c)).collect(),
                parenthesised,
            },
            NodeKind::InitializationList { contents } => NodeKind::InitializationList {
                contents: contents.iter().map(|c| self.deep_copy(*c)).collect(),
            },
            NodeKind::Assignment { operator, expr } => NodeKind::Assignment {
                operator,
                expr: self.deep_copy(expr),
            },
            NodeKind::VariableAssignment { var, assign } => NodeKind::VariableAssignment {
                var: self.deep_copy(var),
                assign: self.deep_copy(assign),
            },
            NodeKind::Sizeof { sz_typ } => NodeKind::Sizeof {
                sz_typ: self.deep_copy(sz_typ),
            },
            NodeKind::PrefixOperatorValue { op, val } => NodeKind::PrefixOperatorValue {
                op,
                val: self.deep_copy(val),
            },
            NodeKind::SuffixOperatorValue { op, val } => NodeKind::SuffixOperatorValue {
                op,
                val: self.deep_copy(val),
            },
            NodeKind::Statement { expr } => NodeKind::Statement {
                expr: self.deep_copy(expr),
            },
            // Leaves and declaration-level nodes copy their payload as is
            other => other,
        };
        self.alloc(pos, new_kind)
    }

    /// Cached resolved type of a declaration, if its build computed one
    pub fn decl_typ(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::Declaration { typ, .. }
            | NodeKind::VariableDeclaration { typ, .. }
            | NodeKind::FunctionDeclaration { typ, .. }
            | NodeKind::FunctionDefinition { typ, .. } => *typ,
            NodeKind::ClassMethod { inner } | NodeKind::ClassProperty { inner } => {
                self.decl_typ(*inner)
            }
            _ => None,
        }
    }
}

/// Stable name of a node kind, used by the dump writer
pub fn kind_name(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Root { .. } => "Root",
        NodeKind::Import { .. } => "Import",
        NodeKind::Include { .. } => "Include",
        NodeKind::Namespace { .. } => "Namespace",
        NodeKind::Declaration { .. } => "Declaration",
        NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
        NodeKind::FunctionDeclaration { .. } => "FunctionDeclaration",
        NodeKind::FunctionDefinition { .. } => "FunctionDefinition",
        NodeKind::ClassMethod { .. } => "ClassMethod",
        NodeKind::ClassProperty { .. } => "ClassProperty",
        NodeKind::Alias { .. } => "Alias",
        NodeKind::BuiltinType { .. } => "BuiltinType",
        NodeKind::ReferenceType { .. } => "ReferenceType",
        NodeKind::ArrayType { .. } => "ArrayType",
        NodeKind::FunctionType { .. } => "FunctionType",
        NodeKind::Struct { .. } => "Struct",
        NodeKind::EhUnion { .. } => "EhUnion",
        NodeKind::EhClass { .. } => "EhClass",
        NodeKind::EhEnum { .. } => "EhEnum",
        NodeKind::Identifier { .. } => "Identifier",
        NodeKind::CompoundIdentifier { .. } => "CompoundIdentifier",
        NodeKind::TemplatedIdentifier { .. } => "TemplatedIdentifier",
        NodeKind::Reference { .. } => "Reference",
        NodeKind::ReferenceToValue { .. } => "ReferenceToValue",
        NodeKind::ReferenceToType { .. } => "ReferenceToType",
        NodeKind::Array { .. } => "Array",
        NodeKind::ArrayAccess { .. } => "ArrayAccess",
        NodeKind::FunctionCall { .. } => "FunctionCall",
        NodeKind::Cast { .. } => "Cast",
        NodeKind::Expression { .. } => "Expression",
        NodeKind::InitializationList { .. } => "InitializationList",
        NodeKind::Assignment { .. } => "Assignment",
        NodeKind::VariableAssignment { .. } => "VariableAssignment",
        NodeKind::Operator { .. } => "Operator",
        NodeKind::Sizeof { .. } => "Sizeof",
        NodeKind::StringLiteral { .. } => "StringLiteral",
        NodeKind::CharLiteral { .. } => "CharLiteral",
        NodeKind::Number { .. } => "Number",
        NodeKind::NullValue => "NullValue",
        NodeKind::BoolValue { .. } => "BoolValue",
        NodeKind::PrefixOperatorValue { .. } => "PrefixOperatorValue",
        NodeKind::SuffixOperatorValue { .. } => "SuffixOperatorValue",
        NodeKind::Statement { .. } => "Statement",
        NodeKind::Return { .. } => "Return",
        NodeKind::Condition { .. } => "Condition",
        NodeKind::ControlStructure { .. } => "ControlStructure",
        NodeKind::SwitchCase { .. } => "SwitchCase",
        NodeKind::SwitchCaseTest { .. } => "SwitchCaseTest",
        NodeKind::SwitchCaseBody { .. } => "SwitchCaseBody",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_is_set_exactly_once() {
        let mut ast = Ast::new("t.eh");
        let a = ast.alloc(0, NodeKind::NullValue);
        let b = ast.alloc(0, NodeKind::NullValue);
        let root = ast.root;
        ast.set_parent(a, root);
        ast.set_parent(a, b);
        assert_eq!(ast.parent(a), Some(root));
    }

    #[test]
    fn rewind_discards_speculative_nodes() {
        let mut ast = Ast::new("t.eh");
        let mark = ast.mark();
        ast.alloc(0, NodeKind::NullValue);
        ast.alloc(0, NodeKind::NullValue);
        ast.rewind(mark);
        assert_eq!(ast.len(), mark);
    }

    #[test]
    fn declare_reaches_enclosing_scope() {
        let mut ast = Ast::new("t.eh");
        let root = ast.root;
        let ident = ast.alloc(0, NodeKind::Identifier { name: "x".into(), decl: None });
        let decl = ast.alloc(
            0,
            NodeKind::VariableDeclaration {
                typ_src: ident,
                sym: Some(ident),
                quals: Qualifiers::empty(),
                decl_type: DeclarationType::Native,
                typ: None,
                assign: None,
            },
        );
        ast.set_parent(decl, root);
        ast.declare(decl, decl);
        assert_eq!(ast.scope_data(root).unwrap().declarations, vec![decl]);
    }
}
