//! Expression and value parsing.

use super::ast::{NodeId, NodeKind, Qualifiers};
use super::Parser;
use crate::diagnostics::Failure;
use crate::lexer::TokenKind;

impl<'a> Parser<'a> {
    /// expression: comparison sequence, value or parenthesised expression,
    /// optionally continued by an operator and another expression. The result
    /// is a flat content list of values and operators.
    pub(crate) fn expression(&mut self) -> Result<NodeId, Failure> {
        let pos = self.peek().pos;

        if self.check(TokenKind::LeftParen) {
            self.advance();
            let inner = self.expression()?;
            self.expect(TokenKind::RightParen, "')'")?;
            let parenthesised = self.ast.alloc(
                pos,
                NodeKind::Expression { contents: vec![inner], parenthesised: true },
            );
            return self.expression_tail(pos, vec![parenthesised]);
        }

        if let Some(contents) = self.try_operator_sequence()? {
            return self.expression_tail(pos, contents);
        }

        let value = self.value()?;
        self.expression_tail(pos, vec![value])
    }

    /// Optionally extend `contents` with `operator expression`
    fn expression_tail(&mut self, pos: usize, mut contents: Vec<NodeId>) -> Result<NodeId, Failure> {
        if let Some(op) = self.try_operator() {
            let rest = self.expression()?;
            contents.push(op);
            contents.push(rest);
        }
        Ok(self.ast.alloc(pos, NodeKind::Expression { contents, parenthesised: false }))
    }

    fn try_operator(&mut self) -> Option<NodeId> {
        let op = match self.peek().kind {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Percent
            | TokenKind::EqualEqual
            | TokenKind::BangEqual
            | TokenKind::LessEqual
            | TokenKind::GreaterEqual
            | TokenKind::Less
            | TokenKind::Greater
            | TokenKind::AmpAmp
            | TokenKind::PipePipe => self.peek().lexeme.clone(),
            _ => return None,
        };
        // A '=' right behind the operator belongs to an operation assignment
        if matches!(self.peek_second_kind(), Some(TokenKind::Equal))
            && matches!(
                self.peek().kind,
                TokenKind::Plus
                    | TokenKind::Minus
                    | TokenKind::Star
                    | TokenKind::Slash
                    | TokenKind::Percent
            )
        {
            return None;
        }
        let pos = self.advance().pos;
        Some(self.ast.alloc(pos, NodeKind::Operator { op }))
    }

    /// Chained comparisons expand into '&&'-joined pairs, duplicating the
    /// shared operand: `a == b == c` becomes `a == b && a == c`.
    fn try_operator_sequence(&mut self) -> Result<Option<Vec<NodeId>>, Failure> {
        let snap = self.snapshot();

        let first = match self.try_value() {
            Some(v) => v,
            None => return Ok(None),
        };

        let op_kind = self.peek().kind;
        // Reused to detect repeated occurrences of the same comparison.
        let is_eq = matches!(op_kind, TokenKind::EqualEqual | TokenKind::BangEqual);
        let is_cmp = matches!(
            op_kind,
            TokenKind::Less | TokenKind::LessEqual | TokenKind::Greater | TokenKind::GreaterEqual
        );
        if !is_eq && !is_cmp {
            self.restore(snap);
            return Ok(None);
        }
        let op1 = self.advance().lexeme;

        let second = match self.try_value() {
            Some(v) => v,
            None => {
                self.restore(snap);
                return Ok(None);
            }
        };

        if is_eq {
            if !self.check(op_kind) {
                self.restore(snap);
                return Ok(None);
            }
            let mut contents = vec![first, self.op_node(&op1), second];
            while self.check(op_kind) {
                self.advance();
                let next = self.value()?;
                let lhs = self.ast.deep_copy(first);
                contents.push(self.op_node("&&"));
                contents.push(lhs);
                contents.push(self.op_node(&op1));
                contents.push(next);
            }
            return Ok(Some(contents));
        }

        // a < b < c style: exactly three operands
        let op2_kind = self.peek().kind;
        let same_direction = if op1.starts_with('<') {
            matches!(op2_kind, TokenKind::Less | TokenKind::LessEqual)
        } else {
            matches!(op2_kind, TokenKind::Greater | TokenKind::GreaterEqual)
        };
        if !same_direction {
            self.restore(snap);
            return Ok(None);
        }
        let op2 = self.advance().lexeme;
        let third = self.value()?;
        let mid = self.ast.deep_copy(second);
        Ok(Some(vec![
            first,
            self.op_node(&op1),
            second,
            self.op_node("&&"),
            mid,
            self.op_node(&op2),
            third,
        ]))
    }

    fn op_node(&mut self, op: &str) -> NodeId {
        let pos = self.peek().pos;
        self.ast.alloc(pos, NodeKind::Operator { op: op.to_string() })
    }

    fn try_value(&mut self) -> Option<NodeId> {
        let snap = self.snapshot();
        match self.value() {
            Ok(v) => Some(v),
            Err(_) => {
                self.restore(snap);
                None
            }
        }
    }

    /// A single value with optional array access suffixes
    pub(crate) fn value(&mut self) -> Result<NodeId, Failure> {
        let pos = self.peek().pos;
        let base = match self.peek().kind {
            TokenKind::Null => {
                self.advance();
                self.ast.alloc(pos, NodeKind::NullValue)
            }
            TokenKind::True => {
                self.advance();
                self.ast.alloc(pos, NodeKind::BoolValue { value: true })
            }
            TokenKind::False => {
                self.advance();
                self.ast.alloc(pos, NodeKind::BoolValue { value: false })
            }
            TokenKind::Str => {
                let token = self.advance();
                self.ast.alloc(pos, NodeKind::StringLiteral { value: token.lexeme })
            }
            TokenKind::Char => {
                let token = self.advance();
                self.ast.alloc(pos, NodeKind::CharLiteral { value: token.lexeme })
            }
            TokenKind::Number => {
                let token = self.advance();
                self.ast.alloc(pos, NodeKind::Number { value: token.lexeme })
            }
            TokenKind::Sizeof => {
                self.advance();
                self.expect(TokenKind::LeftParen, "'('")?;
                let sz_typ = self.full_type()?;
                self.expect(TokenKind::RightParen, "')'")?;
                self.ast.alloc(pos, NodeKind::Sizeof { sz_typ })
            }
            TokenKind::LeftBrace => self.initialization_list()?,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = self.advance().lexeme;
                let val = self.writable_value()?;
                self.ast.alloc(pos, NodeKind::PrefixOperatorValue { op, val })
            }
            TokenKind::Bang => {
                self.advance();
                let val = self.value()?;
                self.ast.alloc(pos, NodeKind::PrefixOperatorValue { op: "!".to_string(), val })
            }
            TokenKind::Ref => {
                self.advance();
                let child = self.value()?;
                self.ast.alloc(pos, NodeKind::Reference { child, quals: Qualifiers::empty() })
            }
            _ => self.call_or_identifier()?,
        };
        self.array_access_suffix(base)
    }

    /// { expr, expr, ... } — an anonymous array literal
    fn initialization_list(&mut self) -> Result<NodeId, Failure> {
        let pos = self.expect(TokenKind::LeftBrace, "'{'")?.pos;
        let mut contents = Vec::new();
        if !self.check(TokenKind::RightBrace) {
            loop {
                contents.push(self.expression()?);
                if !self.match_token(TokenKind::Comma) || self.check(TokenKind::RightBrace) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightBrace, "'}'")?;
        Ok(self.ast.alloc(pos, NodeKind::InitializationList { contents }))
    }

    /// Call syntax accepts a full type as callee: whether it is a call or a
    /// cast is only known once the callee symbol resolves.
    fn call_or_identifier(&mut self) -> Result<NodeId, Failure> {
        let snap = self.snapshot();
        let pos = self.peek().pos;
        if let Ok(callee) = self.full_type() {
            if self.check(TokenKind::LeftParen) {
                self.advance();
                let mut args = Vec::new();
                if !self.check(TokenKind::RightParen) {
                    loop {
                        args.push(self.expression()?);
                        if !self.match_token(TokenKind::Comma) || self.check(TokenKind::RightParen) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RightParen, "')'")?;
                return Ok(self.ast.alloc(
                    pos,
                    NodeKind::FunctionCall { sym: callee, args, this_bound: false },
                ));
            }
        }
        self.restore(snap);

        let val = self.writable_value()?;
        if matches!(self.peek().kind, TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let op = self.advance().lexeme;
            return Ok(self.ast.alloc(pos, NodeKind::SuffixOperatorValue { op, val }));
        }
        Ok(val)
    }

    /// referenced value or compound identifier
    pub(crate) fn writable_value(&mut self) -> Result<NodeId, Failure> {
        if self.check(TokenKind::Ref) {
            let pos = self.advance().pos;
            let child = self.value()?;
            return Ok(self.ast.alloc(pos, NodeKind::Reference { child, quals: Qualifiers::empty() }));
        }
        self.compound_identifier()
    }

    /// Array access brackets; the first bracket becomes the outermost node.
    pub(crate) fn array_access_suffix(&mut self, base: NodeId) -> Result<NodeId, Failure> {
        let mut indices = Vec::new();
        while self.check(TokenKind::LeftBracket) {
            let pos = self.advance().pos;
            let index = self.expression()?;
            self.expect(TokenKind::RightBracket, "']'")?;
            indices.push((pos, index));
        }
        let mut acc = base;
        for (pos, index) in indices.into_iter().rev() {
            acc = self.ast.alloc(pos, NodeKind::ArrayAccess { child: acc, index });
        }
        Ok(acc)
    }
}
