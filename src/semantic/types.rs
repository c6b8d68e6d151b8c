//! Type resolution and the `any` conversion machinery.
//!
//! `auto_cast` is the single operation making a value binary compatible with
//! an expected type: it aligns pointer depth as an integer `ref_offset`
//! adjustment and, when one side is the universal `any` type, computes the
//! view conversion needed to reinterpret the erased value.

use super::{Builder, Lookup};
use crate::parser::ast::{Ast, BuildState, NodeId, NodeKind, Qualifiers};

impl Ast {
    /// Pointer-level offset of a value or type, following the forwarding
    /// rules of compound identifiers and reference wrappers.
    pub fn ref_offset_of(&self, id: NodeId) -> i32 {
        match self.kind(id) {
            NodeKind::ReferenceType { child, .. } | NodeKind::ReferenceToType { child, .. } => {
                self.ref_offset_of(*child) + 1
            }
            NodeKind::Reference { child, .. } => self.ref_offset_of(*child) + 1,
            NodeKind::ReferenceToValue { child } => self.ref_offset_of(*child),
            NodeKind::CompoundIdentifier { elems, .. } => match elems.last() {
                Some(last) => self.ref_offset_of(*last),
                None => 0,
            },
            NodeKind::Alias { dst, .. } => self.ref_offset_of(*dst),
            NodeKind::BuiltinType { .. }
            | NodeKind::ArrayType { .. }
            | NodeKind::FunctionType { .. }
            | NodeKind::Struct { .. }
            | NodeKind::EhUnion { .. }
            | NodeKind::EhClass { .. }
            | NodeKind::EhEnum { .. } => 0,
            _ => self.node(id).ref_offset,
        }
    }

    pub fn set_ref_offset_of(&mut self, id: NodeId, v: i32) {
        match self.kind(id) {
            NodeKind::ReferenceToValue { child } => {
                let child = *child;
                self.set_ref_offset_of(child, v - 1);
            }
            NodeKind::ReferenceToType { child, .. } => {
                let child = *child;
                self.set_ref_offset_of(child, v);
            }
            NodeKind::CompoundIdentifier { elems, .. } => {
                if let Some(last) = elems.last().copied() {
                    self.set_ref_offset_of(last, v);
                }
            }
            NodeKind::Alias { dst, .. } => {
                let dst = *dst;
                self.set_ref_offset_of(dst, v);
            }
            _ => self.node_mut(id).ref_offset = v,
        }
    }

    /// Extra references an `any` holds compared to the described type: zero
    /// for str and char, one for everything else.
    pub fn any_memory_offset_of(&self, id: NodeId) -> i32 {
        match self.kind(id) {
            NodeKind::BuiltinType { name } => {
                if name == "@str" || name == "@char" {
                    0
                } else {
                    1
                }
            }
            NodeKind::ArrayType { child } | NodeKind::ReferenceType { child, .. } => {
                self.any_memory_offset_of(*child)
            }
            NodeKind::Array { .. } => 0,
            NodeKind::Reference { child, .. }
            | NodeKind::ReferenceToValue { child }
            | NodeKind::ReferenceToType { child, .. } => self.any_memory_offset_of(*child),
            NodeKind::CompoundIdentifier { elems, .. } => match elems.last() {
                Some(last) => self.any_memory_offset_of(*last),
                None => 1,
            },
            NodeKind::Identifier { decl: Some(d), .. } => {
                let d = *d;
                if self.is_type_node(d) {
                    self.any_memory_offset_of(d)
                } else {
                    match self.decl_typ(d) {
                        Some(t) => self.any_memory_offset_of(t),
                        None => 1,
                    }
                }
            }
            _ => 1,
        }
    }

    /// Cast attached to a value, following compound identifier forwarding
    pub fn cast_of(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::CompoundIdentifier { elems, .. } => {
                elems.last().and_then(|last| self.cast_of(*last))
            }
            _ => self.node(id).cast,
        }
    }

    pub fn set_cast_of(&mut self, id: NodeId, cast: Option<NodeId>) {
        match self.kind(id) {
            NodeKind::CompoundIdentifier { elems, .. } => {
                if let Some(last) = elems.last().copied() {
                    self.set_cast_of(last, cast);
                }
            }
            _ => self.node_mut(id).cast = cast,
        }
    }

    /// Whether a symbol names a type at this use site
    pub fn is_type_symbol(&self, id: NodeId) -> bool {
        if self.is_type_node(id) {
            return true;
        }
        match self.kind(id) {
            NodeKind::Identifier { decl: Some(d), .. } => match self.kind(*d) {
                NodeKind::Alias { canonical: Some(c), .. } => self.is_type_node(*c),
                _ => self.is_type_node(*d),
            },
            NodeKind::CompoundIdentifier { elems, .. } => match elems.last() {
                Some(last) => self.is_type_symbol(*last),
                None => false,
            },
            NodeKind::TemplatedIdentifier { .. } => true,
            NodeKind::Reference { child, .. }
            | NodeKind::ReferenceToType { child, .. }
            | NodeKind::Array { child, .. } => self.is_type_symbol(*child),
            NodeKind::Alias { canonical: Some(c), .. } => self.is_type_node(*c),
            _ => false,
        }
    }

    /// Structural equality of resolved types: identity, or same builtin name
    pub fn type_eq(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        match (self.kind(a), self.kind(b)) {
            (NodeKind::BuiltinType { name: na }, NodeKind::BuiltinType { name: nb }) => na == nb,
            _ => false,
        }
    }

    pub fn is_builtin_named(&self, id: NodeId, name: &str) -> bool {
        matches!(self.kind(id), NodeKind::BuiltinType { name: n } if n == name)
    }

    /// Innermost element type under any number of reference layers
    pub fn unwrap_references(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let NodeKind::ReferenceType { child, .. } = self.kind(cur) {
            cur = *child;
        }
        cur
    }
}

impl<'a> Builder<'a> {
    /// Allocate a type node rooted at `parent`, already built.
    pub(crate) fn alloc_type(&mut self, pos: usize, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = self.ast.alloc(pos, kind);
        self.ast.set_parent(id, parent);
        self.ast.node_mut(id).state = BuildState::Built;
        id
    }

    pub(crate) fn make_builtin_type(&mut self, name: &str, parent: NodeId) -> NodeId {
        self.alloc_type(
            self.ast.pos(parent),
            NodeKind::BuiltinType { name: name.to_string() },
            parent,
        )
    }

    /// A compound identifier symbol naming `name`, built in the context of
    /// `parent` so the name resolves through the enclosing scopes.
    pub(crate) fn make_symbol(&mut self, name: &str, parent: NodeId) -> NodeId {
        let pos = self.ast.pos(parent);
        let ident = self.ast.alloc(pos, NodeKind::Identifier { name: name.to_string(), decl: None });
        let comp = self.ast.alloc(
            pos,
            NodeKind::CompoundIdentifier { elems: vec![ident], quals: Qualifiers::empty() },
        );
        self.build(comp, parent)
    }

    /// Resolved type of a value-producing node. May allocate fresh type
    /// nodes for derived types.
    pub(crate) fn typ(&mut self, id: NodeId) -> NodeId {
        match self.ast.kind(id) {
            NodeKind::Identifier { decl: Some(d), .. } => {
                let d = *d;
                if self.ast.is_type_node(d) {
                    self.dup_type(d, id)
                } else {
                    self.decl_typ_or_compute(d)
                }
            }
            NodeKind::Identifier { decl: None, .. } => self.make_builtin_type("@any", id),
            NodeKind::CompoundIdentifier { elems, .. } => match elems.last().copied() {
                Some(last) => self.typ(last),
                None => self.make_builtin_type("@any", id),
            },
            NodeKind::TemplatedIdentifier { types, .. } => match types.first().copied() {
                Some(t) => t,
                None => self.make_builtin_type("@any", id),
            },
            NodeKind::StringLiteral { .. } => self.make_builtin_type("@str", id),
            NodeKind::CharLiteral { .. } => self.make_builtin_type("@char", id),
            NodeKind::Number { .. } => self.make_builtin_type("@int", id),
            NodeKind::NullValue => self.make_builtin_type("@any", id),
            NodeKind::BoolValue { .. } => self.make_builtin_type("@bool", id),
            NodeKind::Sizeof { .. } => self.make_builtin_type("@size", id),
            NodeKind::Expression { contents, .. } => match contents.first().copied() {
                Some(first) => self.typ(first),
                None => self.make_builtin_type("@any", id),
            },
            NodeKind::InitializationList { contents } => match contents.first().copied() {
                Some(first) => {
                    let elem = self.typ(first);
                    self.alloc_type(self.ast.pos(id), NodeKind::ArrayType { child: elem }, id)
                }
                None => {
                    let elem = self.make_builtin_type("@any", id);
                    self.alloc_type(self.ast.pos(id), NodeKind::ArrayType { child: elem }, id)
                }
            },
            NodeKind::Cast { typ, .. } => *typ,
            NodeKind::FunctionCall { sym, .. } => {
                let sym = *sym;
                match self.ast.decl_of(sym) {
                    None => self.make_builtin_type("@any", id),
                    Some(d) => {
                        let dt = self.decl_typ_or_compute(d);
                        match self.ast.kind(dt) {
                            NodeKind::FunctionType { ret, .. } => {
                                let ret = *ret;
                                self.typ(ret)
                            }
                            _ => dt,
                        }
                    }
                }
            }
            NodeKind::ArrayAccess { child, .. } => {
                let child = *child;
                let ct = self.typ(child);
                match self.ast.kind(ct) {
                    NodeKind::ArrayType { child: el } => *el,
                    NodeKind::BuiltinType { name } if name == "@str" => {
                        self.make_builtin_type("@char", id)
                    }
                    _ => ct,
                }
            }
            NodeKind::Reference { child, .. } | NodeKind::ReferenceToType { child, .. } => {
                let child = *child;
                let ct = self.typ(child);
                self.alloc_type(self.ast.pos(id), NodeKind::ReferenceType { child: ct, quals: Qualifiers::empty() }, id)
            }
            NodeKind::ReferenceToValue { child } => {
                let child = *child;
                let inner = self.ast.inner_child(id);
                match self.ast.decl_of(child) {
                    Some(_) => match self.ast.decl_of(inner) {
                        Some(d) => self.decl_typ_or_compute(d),
                        None => self.make_builtin_type("@any", id),
                    },
                    None => self.make_builtin_type("@any", id),
                }
            }
            NodeKind::Array { child, .. } => {
                let child = *child;
                let ct = self.typ(child);
                self.alloc_type(self.ast.pos(id), NodeKind::ArrayType { child: ct }, id)
            }
            NodeKind::PrefixOperatorValue { val, .. } | NodeKind::SuffixOperatorValue { val, .. } => {
                let val = *val;
                self.typ(val)
            }
            NodeKind::Alias { canonical, .. } => match *canonical {
                Some(c) => {
                    if self.ast.is_type_node(c) {
                        c
                    } else {
                        self.decl_typ_or_compute(c)
                    }
                }
                None => self.make_builtin_type("@any", id),
            },
            NodeKind::Declaration { .. }
            | NodeKind::VariableDeclaration { .. }
            | NodeKind::FunctionDeclaration { .. }
            | NodeKind::FunctionDefinition { .. } => self.decl_typ_or_compute(id),
            NodeKind::ClassMethod { inner } | NodeKind::ClassProperty { inner } => {
                let inner = *inner;
                self.decl_typ_or_compute(inner)
            }
            _ if self.ast.is_type_node(id) => id,
            _ => self.make_builtin_type("@any", id),
        }
    }

    /// Resolved type of a declaration, computed lazily and cached. Falls
    /// back to `any` while the declaration's own type is still unresolved.
    pub(crate) fn decl_typ_or_compute(&mut self, d: NodeId) -> NodeId {
        match self.ast.kind(d) {
            NodeKind::ClassMethod { inner } | NodeKind::ClassProperty { inner } => {
                let inner = *inner;
                return self.decl_typ_or_compute(inner);
            }
            NodeKind::Alias { .. } => return self.typ(d),
            _ if self.ast.is_type_node(d) => return d,
            _ => {}
        }
        if let Some(t) = self.ast.decl_typ(d) {
            return t;
        }
        let typ_src = match self.ast.kind(d) {
            NodeKind::Declaration { typ_src, .. }
            | NodeKind::VariableDeclaration { typ_src, .. }
            | NodeKind::FunctionDeclaration { typ_src, .. }
            | NodeKind::FunctionDefinition { typ_src, .. } => *typ_src,
            _ => return self.make_builtin_type("@any", d),
        };
        match self.solve(typ_src) {
            Some(t) if self.ast.is_type_node(t) => {
                self.store_decl_typ(d, t);
                t
            }
            _ => self.make_builtin_type("@any", d),
        }
    }

    pub(crate) fn store_decl_typ(&mut self, d: NodeId, t: NodeId) {
        match self.ast.kind_mut(d) {
            NodeKind::Declaration { typ, .. }
            | NodeKind::VariableDeclaration { typ, .. }
            | NodeKind::FunctionDeclaration { typ, .. }
            | NodeKind::FunctionDefinition { typ, .. } => *typ = Some(t),
            _ => {}
        }
    }

    /// Resolve a symbol to the canonical declaration it names, allocating
    /// resolved container types for array and reference wrappers.
    pub(crate) fn solve(&mut self, id: NodeId) -> Option<NodeId> {
        match self.ast.kind(id) {
            NodeKind::Array { child, .. } => {
                let child = *child;
                let inner = self.solve(child)?;
                Some(self.alloc_type(self.ast.pos(id), NodeKind::ArrayType { child: inner }, id))
            }
            NodeKind::Reference { child, .. } | NodeKind::ReferenceToType { child, .. } => {
                let child = *child;
                let quals = self.ast.quals_of(id);
                let ct = self.typ(child);
                Some(self.alloc_type(self.ast.pos(id), NodeKind::ReferenceType { child: ct, quals }, id))
            }
            _ => self.ast.canonical_of(id),
        }
    }

    /// Fresh copy of a type for use at another tree position
    pub(crate) fn dup_type(&mut self, t: NodeId, parent: NodeId) -> NodeId {
        match self.ast.kind(t).clone() {
            NodeKind::BuiltinType { name } => self.make_builtin_type(&name, parent),
            NodeKind::ArrayType { child } => {
                let c = self.dup_type(child, parent);
                self.alloc_type(self.ast.pos(parent), NodeKind::ArrayType { child: c }, parent)
            }
            NodeKind::ReferenceType { child, quals } => {
                let c = self.dup_type(child, parent);
                self.alloc_type(self.ast.pos(parent), NodeKind::ReferenceType { child: c, quals }, parent)
            }
            NodeKind::FunctionType { ret, args, variadic } => {
                self.alloc_type(self.ast.pos(parent), NodeKind::FunctionType { ret, args, variadic }, parent)
            }
            // Aggregates are their own canonical type
            _ => t,
        }
    }

    // ----- the any conversion algorithm --------------------------------------

    /// Symbol reinterpreting an `any` as the concrete type `t`
    pub(crate) fn from_any(&mut self, t: NodeId, anchor: NodeId) -> NodeId {
        match self.ast.kind(t).clone() {
            NodeKind::BuiltinType { name } => {
                let sym = self.make_symbol(&name, anchor);
                if self.ast.any_memory_offset_of(t) == 0 {
                    sym
                } else {
                    self.reference_wrap(sym, anchor)
                }
            }
            NodeKind::ArrayType { child } => {
                let inner = match self.ast.kind(child) {
                    NodeKind::ArrayType { .. } | NodeKind::ReferenceType { .. } => {
                        self.from_any(child, anchor)
                    }
                    _ => {
                        let name = self.ast.name_of(child).unwrap_or_else(|| "@any".to_string());
                        self.make_symbol(&name, anchor)
                    }
                };
                let arr = self.ast.alloc(
                    self.ast.pos(anchor),
                    NodeKind::Array { child: inner, length: None, quals: Qualifiers::empty() },
                );
                self.build(arr, anchor)
            }
            NodeKind::ReferenceType { child, .. } => {
                if self.ast.any_memory_offset_of(child) == 1
                    && !matches!(self.ast.kind(child), NodeKind::ReferenceType { .. })
                {
                    self.from_any(child, anchor)
                } else {
                    let inner = self.from_any(child, anchor);
                    self.reference_wrap(inner, anchor)
                }
            }
            NodeKind::Struct { sym, .. }
            | NodeKind::EhUnion { sym, .. }
            | NodeKind::EhClass { sym, .. }
            | NodeKind::EhEnum { sym, .. } => {
                let name = self.ast.identifier_name(sym).unwrap_or_default();
                let s = self.make_symbol(&name, anchor);
                self.reference_wrap(s, anchor)
            }
            NodeKind::FunctionType { .. } => {
                let ti = self.ast.alloc(
                    self.ast.pos(anchor),
                    NodeKind::TemplatedIdentifier {
                        name: "func".to_string(),
                        types: vec![t],
                        quals: Qualifiers::empty(),
                    },
                );
                self.build(ti, anchor)
            }
            _ => self.make_symbol("@any", anchor),
        }
    }

    fn reference_wrap(&mut self, sym: NodeId, anchor: NodeId) -> NodeId {
        let r = self.ast.alloc(
            self.ast.pos(anchor),
            NodeKind::Reference { child: sym, quals: Qualifiers::empty() },
        );
        self.build(r, anchor)
    }

    /// Compute the conversion making an `any` binary compatible with
    /// `target`, honoring extra references the code asked for. In a casting
    /// context the result aligns exactly with the target's reference depth;
    /// otherwise the referencing is minimized.
    pub(crate) fn from_any_aligned(
        &mut self,
        target: NodeId,
        source: NodeId,
        is_casting: bool,
        anchor: NodeId,
    ) -> NodeId {
        let target_ref_count = self.ast.ref_offset_of(source);
        let t_typ = if self.ast.is_type_node(target) {
            target
        } else {
            self.typ(target)
        };
        let mut res = self.from_any(t_typ, anchor);

        if is_casting {
            if !self.ast.is_type_node(target) {
                let mut tro = self.ast.ref_offset_of(target);
                while tro > 0 {
                    match self.ast.kind(res) {
                        NodeKind::ReferenceToType { child, .. } => res = *child,
                        _ => break,
                    }
                    tro -= 1;
                }
            }
        } else if matches!(self.ast.kind(res), NodeKind::ReferenceToType { .. }) {
            loop {
                let child = match self.ast.kind(res) {
                    NodeKind::ReferenceToType { child, .. } => *child,
                    _ => break,
                };
                if matches!(self.ast.kind(child), NodeKind::ReferenceToType { .. }) {
                    res = child;
                } else {
                    break;
                }
            }
            if self.ast.any_memory_offset_of(res) == 0 {
                if let NodeKind::ReferenceToType { child, .. } = self.ast.kind(res) {
                    res = *child;
                }
            }
        }

        let mut count = target_ref_count;
        if count != 0 {
            let res_typ = self.typ(res);
            count -= self.ast.ref_offset_of(res) - self.ast.any_memory_offset_of(res_typ);
            while count > 0 {
                res = self.reference_wrap(res, anchor);
                count -= 1;
            }
        }
        res
    }

    /// Make `value` binary compatible with `target` (a symbol or a type).
    pub(crate) fn auto_cast(&mut self, value: NodeId, target: NodeId) {
        match self.ast.kind(value) {
            // Containers propagate the cast to their parts.
            NodeKind::Expression { contents, .. } => {
                let contents = contents.clone();
                for c in contents {
                    self.auto_cast(c, target);
                }
            }
            NodeKind::InitializationList { contents } => {
                let contents = contents.clone();
                let t_typ = if self.ast.is_type_node(target) {
                    target
                } else {
                    self.typ(target)
                };
                let t_typ = self.ast.unwrap_references(t_typ);
                if let NodeKind::ArrayType { child } = self.ast.kind(t_typ) {
                    let elem = *child;
                    for c in contents {
                        self.auto_cast(c, elem);
                    }
                }
            }
            NodeKind::CompoundIdentifier { elems, .. } => {
                if let Some(last) = elems.last().copied() {
                    self.auto_cast(last, target);
                }
            }
            NodeKind::ReferenceToValue { child } => {
                let child = *child;
                self.auto_cast(child, target);
            }
            NodeKind::PrefixOperatorValue { val, .. } | NodeKind::SuffixOperatorValue { val, .. } => {
                let val = *val;
                self.auto_cast(val, target);
            }
            // Literals and operators need no alignment.
            NodeKind::Operator { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::CharLiteral { .. }
            | NodeKind::Number { .. }
            | NodeKind::NullValue
            | NodeKind::BoolValue { .. } => {}
            // A cast already reinterprets its value; keep its own offset out
            // of the computation so it is not applied twice.
            NodeKind::Cast { .. } => {
                let saved = self.ast.node(value).ref_offset;
                self.ast.node_mut(value).ref_offset = 0;
                self.value_auto_cast(value, target);
                self.ast.node_mut(value).ref_offset += saved;
            }
            _ => self.value_auto_cast(value, target),
        }
    }

    fn value_auto_cast(&mut self, value: NodeId, target: NodeId) {
        let src0 = self.typ(value);
        let mut src = src0;
        let mut target_ref_level: i32 = 0;

        let self_typ = self.ast.unwrap_references(src0);
        let t_typ0 = if self.ast.is_type_node(target) {
            target
        } else {
            self.typ(target)
        };
        let target_typ = self.ast.unwrap_references(t_typ0);

        let mut target_eff = target;
        if !self.ast.type_eq(self_typ, target_typ) {
            if self.ast.is_builtin_named(self_typ, "@any") {
                let cast = self.from_any_aligned(target, src0, true, value);
                self.ast.set_cast_of(value, Some(cast));
                src = self.typ(cast);
            } else if self.ast.is_builtin_named(target_typ, "@any") {
                target_eff = self.from_any_aligned(value, target, false, value);
                // Fold address-of layers the surrounding syntax already
                // provides into the offset instead of double referencing.
                let mut p = self.ast.parent(value);
                if let Some(pp) = p {
                    if matches!(self.ast.kind(pp), NodeKind::CompoundIdentifier { .. }) {
                        p = self.ast.parent(pp);
                    }
                }
                while let Some(pp) = p {
                    if matches!(self.ast.kind(pp), NodeKind::ReferenceToValue { .. }) {
                        target_ref_level += 1;
                        p = self.ast.parent(pp);
                    } else {
                        break;
                    }
                }
                if target_ref_level != 0 {
                    target_ref_level -= self.ast.ref_offset_of(target_eff);
                }
            }
        }

        let target_is_typish =
            self.ast.is_type_node(target_eff) || self.ast.is_type_symbol(target_eff);
        if target_is_typish {
            target_ref_level += self.ast.ref_offset_of(target_eff);
        } else {
            let tt = self.typ(target_eff);
            target_ref_level += self.ast.ref_offset_of(tt) - self.ast.ref_offset_of(target_eff);
        }
        let offset = self.ast.ref_offset_of(src) - target_ref_level;
        self.ast.set_ref_offset_of(value, offset);
    }

    /// Report a lookup that produced neither candidates nor error as the
    /// default undeclared-identifier failure.
    pub(crate) fn lookup_error_message(lookup: &Lookup, name: &str) -> String {
        lookup
            .err
            .clone()
            .unwrap_or_else(|| format!("use of undeclared identifier {}", name))
    }
}
