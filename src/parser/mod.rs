//! Parser module building unbuilt arena nodes from tokens.
//!
//! The parser only constructs the tree; every semantic decision (symbol
//! resolution, type computation, node rewrites) happens later in the build
//! pass. Function bodies are captured as raw text and parsed lazily once the
//! enclosing declarations are known.

pub mod ast;
mod expression;
mod statement;

pub use ast::*;

use std::path::Path;

use crate::diagnostics::{BuildError, Failure, Severity};
use crate::lexer::{Scanner, Token, TokenKind};

/// Parse a source file from disk into a fresh tree.
pub fn parse_file(path: &Path) -> Result<Ast, BuildError> {
    let file = path.to_string_lossy().to_string();
    let source = std::fs::read_to_string(path).map_err(|_| {
        BuildError::new(vec![Failure::new(
            Severity::Fatal,
            0,
            format!("{}: no such file or directory", file),
            file.clone(),
        )])
    })?;
    parse_source(&file, &source)
}

/// Parse in-memory source text into a fresh tree.
pub fn parse_source(file: &str, source: &str) -> Result<Ast, BuildError> {
    let mut ast = Ast::new(file);
    ast.sources.register(file, source);
    let nodes = parse_into(&mut ast, file, source).map_err(|f| BuildError::new(vec![f]))?;
    let root = ast.root;
    if let NodeKind::Root { nodes: root_nodes, .. } = ast.kind_mut(root) {
        *root_nodes = nodes;
    }
    Ok(ast)
}

/// Parse source text into an existing arena, returning the top level nodes.
/// Used for the entry file and for every imported file.
pub fn parse_into(ast: &mut Ast, file: &str, source: &str) -> Result<Vec<NodeId>, Failure> {
    let tokens = Scanner::new(source, file, 0).scan_tokens()?;
    let mut parser = Parser::new(ast, tokens, file, source, 0, true);
    parser.top_level()
}

/// Parse an isolated function body substring. `base_pos` is the byte offset
/// of the substring in its file so positions stay absolute; `have_return`
/// selects whether `return` takes a value.
pub fn parse_function_body(
    ast: &mut Ast,
    file: &str,
    source: &str,
    base_pos: usize,
    have_return: bool,
) -> Result<Vec<NodeId>, Failure> {
    let tokens = Scanner::new(source, file, base_pos).scan_tokens()?;
    let mut parser = Parser::new(ast, tokens, file, source, base_pos, have_return);
    parser.instruction_list_until_eof()
}

/// Recursive descent parser over a token stream
pub struct Parser<'a> {
    pub(crate) ast: &'a mut Ast,
    tokens: Vec<Token>,
    current: usize,
    file: String,
    source: &'a str,
    base_offset: usize,
    /// Whether `return` statements carry a value in this body
    pub(crate) return_value: bool,
}

/// Snapshot for backtracking: token cursor plus arena watermark
#[derive(Clone, Copy)]
pub(crate) struct Snapshot {
    current: usize,
    mark: usize,
}

impl<'a> Parser<'a> {
    pub fn new(
        ast: &'a mut Ast,
        tokens: Vec<Token>,
        file: &str,
        source: &'a str,
        base_offset: usize,
        return_value: bool,
    ) -> Self {
        Self {
            ast,
            tokens,
            current: 0,
            file: file.to_string(),
            source,
            base_offset,
            return_value,
        }
    }

    // ----- token plumbing ----------------------------------------------------

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.current + 1)
    }

    pub(crate) fn peek_second_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.current + 1).map(|t| t.kind)
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub(crate) fn at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        if !self.at_end() {
            self.current += 1;
        }
        token
    }

    pub(crate) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, Failure> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.syntax_error(format!("expected {}", what)))
        }
    }

    pub(crate) fn syntax_error(&self, msg: impl Into<String>) -> Failure {
        Failure::new(Severity::Fatal, self.peek().pos, msg, self.file.clone())
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            current: self.current,
            mark: self.ast.mark(),
        }
    }

    pub(crate) fn restore(&mut self, snap: Snapshot) {
        self.current = snap.current;
        self.ast.rewind(snap.mark);
    }

    // ----- top level ---------------------------------------------------------

    pub fn top_level(&mut self) -> Result<Vec<NodeId>, Failure> {
        let mut nodes = Vec::new();
        while !self.at_end() {
            nodes.push(self.top_level_node()?);
        }
        Ok(nodes)
    }

    fn top_level_node(&mut self) -> Result<NodeId, Failure> {
        match self.peek().kind {
            TokenKind::Import => self.import_instruction(),
            TokenKind::Include => self.include_instruction(),
            TokenKind::Namespace => self.namespace(),
            _ => {
                let quals = self.declaration_quals();
                match self.peek().kind {
                    TokenKind::Struct => self.struct_decl(quals),
                    TokenKind::Union => self.union_decl(quals),
                    TokenKind::Class => self.class_decl(quals),
                    TokenKind::Enum => self.enum_decl(quals),
                    TokenKind::Alias => self.alias_decl(quals),
                    _ => self.function_or_variable(quals),
                }
            }
        }
    }

    /// Storage and visibility qualifiers allowed before a declaration
    pub(crate) fn declaration_quals(&mut self) -> Qualifiers {
        let mut quals = Qualifiers::empty();
        loop {
            match self.peek().kind {
                TokenKind::Priv => quals |= Qualifiers::PRIVATE,
                TokenKind::Static => quals |= Qualifiers::STATIC,
                TokenKind::Inline => quals |= Qualifiers::INLINE,
                _ => return quals,
            }
            self.advance();
        }
    }

    /// Type level qualifiers attached to the type symbol itself
    fn type_modifiers(&mut self) -> Qualifiers {
        let mut quals = Qualifiers::empty();
        loop {
            match self.peek().kind {
                TokenKind::Const => quals |= Qualifiers::CONST,
                TokenKind::Restrict => quals |= Qualifiers::RESTRICT,
                TokenKind::Volatile => quals |= Qualifiers::VOLATILE,
                _ => return quals,
            }
            self.advance();
        }
    }

    // ----- types -------------------------------------------------------------

    /// full_type: func type, or modifiers + (ref | compound identifier) +
    /// array suffixes
    pub(crate) fn full_type(&mut self) -> Result<NodeId, Failure> {
        if self.check(TokenKind::Func) {
            return self.function_type();
        }
        let mods = self.type_modifiers();
        let mut base = if self.check(TokenKind::Ref) {
            let pos = self.advance().pos;
            let child = self.full_type()?;
            self.ast.alloc(pos, NodeKind::Reference { child, quals: mods })
        } else {
            let sym = self.compound_identifier()?;
            if let NodeKind::CompoundIdentifier { quals, .. } = self.ast.kind_mut(sym) {
                *quals = mods;
            }
            sym
        };
        base = self.array_suffix(base)?;
        Ok(base)
    }

    /// Array suffixes wrap the base; the first suffix becomes the outermost
    /// wrapper.
    fn array_suffix(&mut self, base: NodeId) -> Result<NodeId, Failure> {
        let mut lengths = Vec::new();
        while self.check(TokenKind::LeftBracket) {
            let pos = self.advance().pos;
            let length = if self.check(TokenKind::RightBracket) {
                None
            } else {
                Some(self.expression()?)
            };
            self.expect(TokenKind::RightBracket, "']'")?;
            lengths.push((pos, length));
        }
        let mut acc = base;
        for (pos, length) in lengths.into_iter().rev() {
            acc = self.ast.alloc(
                pos,
                NodeKind::Array {
                    child: acc,
                    length,
                    quals: Qualifiers::empty(),
                },
            );
        }
        Ok(acc)
    }

    /// func '<' full_type '(' types ')' '>'
    fn function_type(&mut self) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::Func, "'func'")?.pos;
        self.expect(TokenKind::Less, "'<'")?;
        let ret = self.full_type()?;
        self.expect(TokenKind::LeftParen, "'('")?;
        let mut args = Vec::new();
        let mut variadic = false;
        if !self.check(TokenKind::RightParen) {
            loop {
                if self.match_token(TokenKind::Ellipsis) {
                    variadic = true;
                    break;
                }
                let typ_src = self.full_type()?;
                args.push(self.ast.alloc(
                    self.ast.pos(typ_src),
                    NodeKind::Declaration {
                        typ_src,
                        sym: None,
                        quals: Qualifiers::empty(),
                        decl_type: DeclarationType::Native,
                        typ: None,
                    },
                ));
                if !self.match_token(TokenKind::Comma) || self.check(TokenKind::RightParen) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;
        self.expect(TokenKind::Greater, "'>'")?;
        let ft = self.ast.alloc(pos, NodeKind::FunctionType { ret, args, variadic });
        Ok(self.ast.alloc(
            pos,
            NodeKind::TemplatedIdentifier {
                name: "func".to_string(),
                types: vec![ft],
                quals: Qualifiers::empty(),
            },
        ))
    }

    pub(crate) fn identifier(&mut self) -> Result<NodeId, Failure> {
        let token = self.expect(TokenKind::Identifier, "identifier")?;
        Ok(self.ast.alloc(
            token.pos,
            NodeKind::Identifier {
                name: token.lexeme,
                decl: None,
            },
        ))
    }

    pub(crate) fn compound_identifier(&mut self) -> Result<NodeId, Failure> {
        let first = self.identifier()?;
        let pos = self.ast.pos(first);
        let mut elems = vec![first];
        while self.check(TokenKind::Dot)
            && matches!(self.peek_next().map(|t| t.kind), Some(TokenKind::Identifier))
        {
            self.advance();
            elems.push(self.identifier()?);
        }
        Ok(self.ast.alloc(
            pos,
            NodeKind::CompoundIdentifier {
                elems,
                quals: Qualifiers::empty(),
            },
        ))
    }

    // ----- functions and variables -------------------------------------------

    /// Shared prefix: full_type identifier, then '(' selects a function.
    fn function_or_variable(&mut self, quals: Qualifiers) -> Result<NodeId, Failure> {
        let typ_src = self.full_type()?;
        let sym = self.identifier()?;
        if self.check(TokenKind::LeftParen) {
            self.function(quals, typ_src, sym)
        } else {
            self.variable_declaration_tail(quals, typ_src, sym)
        }
    }

    pub(crate) fn variable_declaration_tail(
        &mut self,
        quals: Qualifiers,
        typ_src: NodeId,
        sym: NodeId,
    ) -> Result<NodeId, Failure> {
        let assign = if self.check(TokenKind::Equal) {
            Some(self.assignment()?)
        } else {
            None
        };
        Ok(self.ast.alloc(
            self.ast.pos(sym),
            NodeKind::VariableDeclaration {
                typ_src,
                sym: Some(sym),
                quals,
                decl_type: DeclarationType::Native,
                typ: None,
                assign,
            },
        ))
    }

    pub(crate) fn assignment(&mut self) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::Equal, "'='")?.pos;
        let expr = self.expression()?;
        Ok(self.ast.alloc(pos, NodeKind::Assignment { operator: None, expr }))
    }

    /// Function prototype arguments then either a lazily captured body or a
    /// plain declaration.
    fn function(&mut self, quals: Qualifiers, ret: NodeId, sym: NodeId) -> Result<NodeId, Failure> {
        let pos = self.ast.pos(sym);
        self.expect(TokenKind::LeftParen, "'('")?;
        let mut args = Vec::new();
        let mut variadic = false;
        if !self.check(TokenKind::RightParen) {
            loop {
                if self.match_token(TokenKind::Ellipsis) {
                    variadic = true;
                    break;
                }
                let arg_typ = self.full_type()?;
                let arg_sym = self.identifier()?;
                args.push(self.variable_declaration_tail(Qualifiers::empty(), arg_typ, arg_sym)?);
                if !self.match_token(TokenKind::Comma) || self.check(TokenKind::RightParen) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;

        let ft = self.ast.alloc(pos, NodeKind::FunctionType { ret, args, variadic });
        let typ_src = self.ast.alloc(
            pos,
            NodeKind::TemplatedIdentifier {
                name: "func".to_string(),
                types: vec![ft],
                quals: Qualifiers::empty(),
            },
        );

        if self.check(TokenKind::LeftBrace) {
            let body_str = self.capture_body()?;
            Ok(self.ast.alloc(
                pos,
                NodeKind::FunctionDefinition {
                    typ_src,
                    sym: Some(sym),
                    quals,
                    decl_type: DeclarationType::Native,
                    typ: None,
                    body_str: Some(body_str),
                    body: Vec::new(),
                    scope: ScopeData::default(),
                },
            ))
        } else {
            Ok(self.ast.alloc(
                pos,
                NodeKind::FunctionDeclaration {
                    typ_src,
                    sym: Some(sym),
                    quals,
                    decl_type: DeclarationType::Native,
                    typ: None,
                },
            ))
        }
    }

    /// Capture the raw text between balanced braces without parsing it.
    fn capture_body(&mut self) -> Result<UnparsedContents, Failure> {
        let open = self.expect(TokenKind::LeftBrace, "'{'")?;
        let start = open.pos - self.base_offset + 1;
        let mut depth = 1usize;
        while depth > 0 {
            if self.at_end() {
                return Err(self.syntax_error("expected '}'"));
            }
            let token = self.advance();
            match token.kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => {
                    depth -= 1;
                    if depth == 0 {
                        let end = token.pos - self.base_offset;
                        return Ok(UnparsedContents {
                            contents: self.source[start..end].to_string(),
                            pos: self.base_offset + start,
                        });
                    }
                }
                _ => {}
            }
        }
        unreachable!()
    }

    // ----- aggregates --------------------------------------------------------

    fn struct_decl(&mut self, quals: Qualifiers) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::Struct, "'struct'")?.pos;
        let sym = self.identifier()?;
        let fields = self.aggregate_fields()?;
        let _ = quals;
        Ok(self.ast.alloc(pos, NodeKind::Struct { sym, fields, scope: ScopeData::default() }))
    }

    fn union_decl(&mut self, quals: Qualifiers) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::Union, "'union'")?.pos;
        let sym = self.identifier()?;
        let fields = self.aggregate_fields()?;
        let _ = quals;
        Ok(self.ast.alloc(pos, NodeKind::EhUnion { sym, fields, scope: ScopeData::default() }))
    }

    fn aggregate_fields(&mut self) -> Result<Option<Vec<NodeId>>, Failure> {
        if !self.match_token(TokenKind::LeftBrace) {
            return Ok(None);
        }
        let mut fields = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            let typ_src = self.full_type()?;
            let sym = self.identifier()?;
            fields.push(self.variable_declaration_tail(Qualifiers::empty(), typ_src, sym)?);
        }
        self.expect(TokenKind::RightBrace, "'}'")?;
        Ok(Some(fields))
    }

    fn class_decl(&mut self, quals: Qualifiers) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::Class, "'class'")?.pos;
        let sym = self.identifier()?;
        let _ = quals;
        if !self.match_token(TokenKind::LeftBrace) {
            return Ok(self.ast.alloc(
                pos,
                NodeKind::EhClass { sym, contents: None, scope: ScopeData::default() },
            ));
        }
        let mut contents = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            let member_quals = self.declaration_quals();
            let typ_src = self.full_type()?;
            let member_sym = self.identifier()?;
            if self.check(TokenKind::LeftParen) {
                contents.push(self.function(member_quals, typ_src, member_sym)?);
            } else {
                contents.push(self.variable_declaration_tail(member_quals, typ_src, member_sym)?);
            }
        }
        self.expect(TokenKind::RightBrace, "'}'")?;
        Ok(self.ast.alloc(
            pos,
            NodeKind::EhClass { sym, contents: Some(contents), scope: ScopeData::default() },
        ))
    }

    fn enum_decl(&mut self, quals: Qualifiers) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::Enum, "'enum'")?.pos;
        let sym = self.identifier()?;
        let name = self.ast.identifier_name(sym).unwrap_or_default();
        let _ = quals;
        if !self.match_token(TokenKind::LeftBrace) {
            return Ok(self.ast.alloc(
                pos,
                NodeKind::EhEnum { sym, fields: None, scope: ScopeData::default() },
            ));
        }
        let mut fields = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            let field_sym = self.identifier()?;
            let field_pos = self.ast.pos(field_sym);
            // Enum fields are typed as the enum itself
            let typ_ident = self.ast.alloc(
                field_pos,
                NodeKind::Identifier { name: name.clone(), decl: None },
            );
            let typ_src = self.ast.alloc(
                field_pos,
                NodeKind::CompoundIdentifier { elems: vec![typ_ident], quals: Qualifiers::empty() },
            );
            fields.push(self.ast.alloc(
                field_pos,
                NodeKind::Declaration {
                    typ_src,
                    sym: Some(field_sym),
                    quals: Qualifiers::empty(),
                    decl_type: DeclarationType::Native,
                    typ: None,
                },
            ));
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightBrace, "'}'")?;
        Ok(self.ast.alloc(
            pos,
            NodeKind::EhEnum { sym, fields: Some(fields), scope: ScopeData::default() },
        ))
    }

    fn alias_decl(&mut self, quals: Qualifiers) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::Alias, "'alias'")?.pos;
        let src_sym = self.full_type()?;
        let dst = self.identifier()?;
        Ok(self.ast.alloc(
            pos,
            NodeKind::Alias { src_sym, canonical: None, dst, quals },
        ))
    }

    // ----- namespaces and inclusions -----------------------------------------

    /// namespace a.b { ... } nests one Namespace node per path segment
    fn namespace(&mut self) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::Namespace, "'namespace'")?.pos;
        let mut segments = vec![self.expect(TokenKind::Identifier, "identifier")?];
        while self.match_token(TokenKind::Dot) {
            segments.push(self.expect(TokenKind::Identifier, "identifier")?);
        }
        self.expect(TokenKind::LeftBrace, "'{'")?;
        let mut contents = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            contents.push(self.top_level_node()?);
        }
        self.expect(TokenKind::RightBrace, "'}'")?;

        let mut node = None;
        for segment in segments.into_iter().rev() {
            let sym = self.ast.alloc(
                segment.pos,
                NodeKind::Identifier { name: segment.lexeme, decl: None },
            );
            let inner_contents = match node.take() {
                Some(inner) => vec![inner],
                None => std::mem::take(&mut contents),
            };
            node = Some(self.ast.alloc(
                pos,
                NodeKind::Namespace { sym, contents: inner_contents, scope: ScopeData::default() },
            ));
        }
        Ok(node.expect("namespace path has at least one segment"))
    }

    fn import_instruction(&mut self) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::Import, "'import'")?.pos;
        let mut lib = vec![self.expect(TokenKind::Identifier, "import path part")?.lexeme];
        while self.match_token(TokenKind::Dot) {
            lib.push(self.expect(TokenKind::Identifier, "import path part")?.lexeme);
        }
        Ok(self.ast.alloc(
            pos,
            NodeKind::Import { lib, syms: Vec::new(), scope: ScopeData::default(), file: None },
        ))
    }

    fn include_instruction(&mut self) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::Include, "'include'")?.pos;
        let mut lib = vec![self.include_part()?];
        while self.match_token(TokenKind::Slash) {
            lib.push(self.include_part()?);
        }
        Ok(self.ast.alloc(
            pos,
            NodeKind::Include { lib, syms: Vec::new(), scope: ScopeData::default() },
        ))
    }

    /// One path segment of a C header name, e.g. `stdio.h` or `stat`
    fn include_part(&mut self) -> Result<String, Failure> {
        let mut part = match self.peek().kind {
            TokenKind::Identifier | TokenKind::Number => self.advance().lexeme,
            _ => return Err(self.syntax_error("expected include path part")),
        };
        while self.check(TokenKind::Dot) {
            self.advance();
            match self.peek().kind {
                TokenKind::Identifier | TokenKind::Number => {
                    part.push('.');
                    part.push_str(&self.advance().lexeme);
                }
                _ => return Err(self.syntax_error("expected include path part")),
            }
        }
        Ok(part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Ast {
        parse_source("t.eh", source).expect("parse")
    }

    fn root_nodes(ast: &Ast) -> Vec<NodeId> {
        match ast.kind(ast.root) {
            NodeKind::Root { nodes, .. } => nodes.clone(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn parses_function_definition_with_lazy_body() {
        let ast = parse("int main()\n{\n    return 0\n}\n");
        let nodes = root_nodes(&ast);
        assert_eq!(nodes.len(), 1);
        match ast.kind(nodes[0]) {
            NodeKind::FunctionDefinition { body_str, body, .. } => {
                assert!(body.is_empty());
                let body_str = body_str.as_ref().expect("captured body");
                assert!(body_str.contents.contains("return 0"));
            }
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn parses_forward_struct() {
        let ast = parse("struct Point\n");
        let nodes = root_nodes(&ast);
        match ast.kind(nodes[0]) {
            NodeKind::Struct { fields, .. } => assert!(fields.is_none()),
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn parses_import_path() {
        let ast = parse("import os.path\n");
        let nodes = root_nodes(&ast);
        match ast.kind(nodes[0]) {
            NodeKind::Import { lib, .. } => assert_eq!(lib, &["os".to_string(), "path".to_string()]),
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn parses_namespace_nesting() {
        let ast = parse("namespace a.b { int x = 1 }\n");
        let nodes = root_nodes(&ast);
        match ast.kind(nodes[0]) {
            NodeKind::Namespace { sym, contents, .. } => {
                assert_eq!(ast.identifier_name(*sym).as_deref(), Some("a"));
                match ast.kind(contents[0]) {
                    NodeKind::Namespace { sym, contents, .. } => {
                        assert_eq!(ast.identifier_name(*sym).as_deref(), Some("b"));
                        assert!(matches!(
                            ast.kind(contents[0]),
                            NodeKind::VariableDeclaration { .. }
                        ));
                    }
                    k => panic!("unexpected kind {:?}", k),
                }
            }
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn parses_variadic_prototype() {
        let ast = parse("int printf(str fmt, ...)\n");
        let nodes = root_nodes(&ast);
        match ast.kind(nodes[0]) {
            NodeKind::FunctionDeclaration { typ_src, .. } => {
                let ft = match ast.kind(*typ_src) {
                    NodeKind::TemplatedIdentifier { types, .. } => types[0],
                    k => panic!("unexpected kind {:?}", k),
                };
                match ast.kind(ft) {
                    NodeKind::FunctionType { args, variadic, .. } => {
                        assert_eq!(args.len(), 1);
                        assert!(*variadic);
                    }
                    k => panic!("unexpected kind {:?}", k),
                }
            }
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn parses_private_global() {
        let ast = parse("priv int secret = 42\n");
        let nodes = root_nodes(&ast);
        match ast.kind(nodes[0]) {
            NodeKind::VariableDeclaration { quals, .. } => {
                assert!(quals.contains(Qualifiers::PRIVATE));
            }
            k => panic!("unexpected kind {:?}", k),
        }
    }
}
