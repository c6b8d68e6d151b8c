//! Statement and control structure parsing for function bodies.

use super::ast::{CtrlKind, NodeId, NodeKind, ScopeData};
use super::Parser;
use crate::diagnostics::Failure;
use crate::lexer::TokenKind;

impl<'a> Parser<'a> {
    /// Parse instructions until end of input; the body grammar for lazily
    /// parsed function bodies.
    pub(crate) fn instruction_list_until_eof(&mut self) -> Result<Vec<NodeId>, Failure> {
        let mut nodes = Vec::new();
        while !self.at_end() {
            nodes.push(self.instruction()?);
        }
        Ok(nodes)
    }

    pub(crate) fn instruction(&mut self) -> Result<NodeId, Failure> {
        match self.peek().kind {
            TokenKind::If => self.condition(),
            TokenKind::While => self.while_loop(),
            TokenKind::Do => self.do_while_loop(),
            TokenKind::For => self.for_loop(),
            TokenKind::Switch => self.switch(),
            TokenKind::Alias => {
                let quals = self.declaration_quals();
                self.alias_statement(quals)
            }
            _ => self.statement(),
        }
    }

    fn alias_statement(&mut self, quals: super::ast::Qualifiers) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::Alias, "'alias'")?.pos;
        let src_sym = self.full_type()?;
        let dst = self.identifier()?;
        Ok(self.ast.alloc(pos, NodeKind::Alias { src_sym, canonical: None, dst, quals }))
    }

    /// A single statement: return, variable assignment, variable declaration
    /// or bare expression, tried in that order.
    fn statement(&mut self) -> Result<NodeId, Failure> {
        let pos = self.peek().pos;

        if self.check(TokenKind::Return) {
            self.advance();
            let expr = if self.return_value {
                Some(self.expression()?)
            } else {
                None
            };
            let ret = self.ast.alloc(pos, NodeKind::Return { expr });
            return Ok(self.ast.alloc(pos, NodeKind::Statement { expr: ret }));
        }

        if let Some(assign) = self.try_variable_assignment()? {
            return Ok(self.ast.alloc(pos, NodeKind::Statement { expr: assign }));
        }

        if let Some(decl) = self.try_variable_declaration()? {
            return Ok(self.ast.alloc(pos, NodeKind::Statement { expr: decl }));
        }

        let expr = self.expression()?;
        Ok(self.ast.alloc(pos, NodeKind::Statement { expr }))
    }

    /// writable value, optional array access, then (operator)? '=' expression
    fn try_variable_assignment(&mut self) -> Result<Option<NodeId>, Failure> {
        let snap = self.snapshot();
        let pos = self.peek().pos;

        let var = match self.peek().kind {
            TokenKind::Ref | TokenKind::Identifier => match self.writable_value() {
                Ok(v) => v,
                Err(_) => {
                    self.restore(snap);
                    return Ok(None);
                }
            },
            _ => return Ok(None),
        };
        let var = match self.array_access_suffix(var) {
            Ok(v) => v,
            Err(_) => {
                self.restore(snap);
                return Ok(None);
            }
        };

        let operator = match self.peek().kind {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Percent
                if self.peek_second_kind() == Some(TokenKind::Equal) =>
            {
                Some(self.advance().lexeme)
            }
            _ => None,
        };

        if !self.check(TokenKind::Equal) {
            self.restore(snap);
            return Ok(None);
        }
        self.advance();
        let expr = self.expression()?;
        let assign = self.ast.alloc(pos, NodeKind::Assignment { operator, expr });
        Ok(Some(self.ast.alloc(pos, NodeKind::VariableAssignment { var, assign })))
    }

    fn try_variable_declaration(&mut self) -> Result<Option<NodeId>, Failure> {
        let snap = self.snapshot();
        let quals = self.declaration_quals();
        let typ_src = match self.full_type() {
            Ok(t) => t,
            Err(_) => {
                self.restore(snap);
                return Ok(None);
            }
        };
        if !self.check(TokenKind::Identifier) {
            self.restore(snap);
            return Ok(None);
        }
        let sym = self.identifier()?;
        let decl = self.variable_declaration_tail(quals, typ_src, sym)?;
        Ok(Some(decl))
    }

    // ----- control structures ------------------------------------------------

    /// A branch body: either one instruction or a braced list
    fn control_body(&mut self) -> Result<Vec<NodeId>, Failure> {
        if self.match_token(TokenKind::LeftBrace) {
            let mut body = Vec::new();
            while !self.check(TokenKind::RightBrace) {
                if self.at_end() {
                    return Err(self.syntax_error("expected '}'"));
                }
                body.push(self.instruction()?);
            }
            self.advance();
            Ok(body)
        } else {
            Ok(vec![self.instruction()?])
        }
    }

    fn condition(&mut self) -> Result<NodeId, Failure> {
        let pos = self.peek().pos;
        let mut branches = Vec::new();

        self.expect(TokenKind::If, "'if'")?;
        branches.push(self.branch(CtrlKind::If, pos)?);

        while self.check(TokenKind::Elif) {
            let elif_pos = self.advance().pos;
            branches.push(self.branch(CtrlKind::Elif, elif_pos)?);
        }

        if self.check(TokenKind::Else) {
            let else_pos = self.advance().pos;
            let body = self.control_body()?;
            branches.push(self.ast.alloc(
                else_pos,
                NodeKind::ControlStructure {
                    ctrl: CtrlKind::Else,
                    cond: None,
                    init: None,
                    update: None,
                    body,
                    scope: ScopeData::default(),
                },
            ));
        }

        Ok(self.ast.alloc(pos, NodeKind::Condition { branches }))
    }

    fn branch(&mut self, ctrl: CtrlKind, pos: usize) -> Result<NodeId, Failure> {
        let cond = self.expression()?;
        let body = self.control_body()?;
        Ok(self.ast.alloc(
            pos,
            NodeKind::ControlStructure {
                ctrl,
                cond: Some(cond),
                init: None,
                update: None,
                body,
                scope: ScopeData::default(),
            },
        ))
    }

    fn while_loop(&mut self) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::While, "'while'")?.pos;
        self.branch(CtrlKind::While, pos)
    }

    fn do_while_loop(&mut self) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::Do, "'do'")?.pos;
        let body = self.control_body()?;
        self.expect(TokenKind::While, "'while'")?;
        let cond = self.expression()?;
        Ok(self.ast.alloc(
            pos,
            NodeKind::ControlStructure {
                ctrl: CtrlKind::DoWhile,
                cond: Some(cond),
                init: None,
                update: None,
                body,
                scope: ScopeData::default(),
            },
        ))
    }

    /// for init; cond; update body
    fn for_loop(&mut self) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::For, "'for'")?.pos;

        let init = if self.check(TokenKind::Semicolon) {
            None
        } else if let Some(decl) = self.try_variable_declaration()? {
            Some(decl)
        } else if let Some(assign) = self.try_variable_assignment()? {
            Some(assign)
        } else {
            return Err(self.syntax_error("expected loop initializer"));
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        let cond = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        let update = if self.check(TokenKind::LeftBrace) {
            None
        } else if let Some(assign) = self.try_variable_assignment()? {
            Some(assign)
        } else {
            Some(self.expression()?)
        };

        let body = self.control_body()?;
        Ok(self.ast.alloc(
            pos,
            NodeKind::ControlStructure {
                ctrl: CtrlKind::For,
                cond,
                init,
                update,
                body,
                scope: ScopeData::default(),
            },
        ))
    }

    fn switch(&mut self) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::Switch, "'switch'")?.pos;
        let cond = self.value()?;
        self.expect(TokenKind::LeftBrace, "'{'")?;
        let mut cases = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            if self.at_end() {
                return Err(self.syntax_error("expected '}'"));
            }
            cases.push(self.switch_case()?);
        }
        self.advance();
        Ok(self.ast.alloc(
            pos,
            NodeKind::ControlStructure {
                ctrl: CtrlKind::Switch,
                cond: Some(cond),
                init: None,
                update: None,
                body: cases,
                scope: ScopeData::default(),
            },
        ))
    }

    /// One or more case tests followed by a body, optionally falling through
    fn switch_case(&mut self) -> Result<NodeId, Failure> {
        let pos = self.peek().pos;
        let mut tests = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Case => {
                    let case_pos = self.advance().pos;
                    let test = self.value()?;
                    tests.push(self.ast.alloc(case_pos, NodeKind::SwitchCaseTest { test: Some(test) }));
                }
                TokenKind::Default => {
                    let case_pos = self.advance().pos;
                    tests.push(self.ast.alloc(case_pos, NodeKind::SwitchCaseTest { test: None }));
                }
                _ => break,
            }
        }
        if tests.is_empty() {
            return Err(self.syntax_error("expected 'case' or 'default'"));
        }

        let block = self.check(TokenKind::LeftBrace);
        let mut contents = Vec::new();
        let mut fallthrough = false;
        if block {
            self.advance();
            loop {
                if self.match_token(TokenKind::Fallthrough) {
                    fallthrough = true;
                    break;
                }
                if self.check(TokenKind::RightBrace) {
                    break;
                }
                contents.push(self.instruction()?);
            }
            self.expect(TokenKind::RightBrace, "'}'")?;
        } else {
            loop {
                if self.match_token(TokenKind::Fallthrough) {
                    fallthrough = true;
                    break;
                }
                if matches!(
                    self.peek().kind,
                    TokenKind::Case | TokenKind::Default | TokenKind::RightBrace | TokenKind::Eof
                ) {
                    break;
                }
                contents.push(self.instruction()?);
            }
        }

        let body = self.ast.alloc(
            pos,
            NodeKind::SwitchCaseBody {
                contents,
                block,
                fallthrough,
                scope: ScopeData::default(),
            },
        );
        Ok(self.ast.alloc(pos, NodeKind::SwitchCase { tests, body }))
    }
}
