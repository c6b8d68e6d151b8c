//! Scanner producing Ehlit tokens from source text.

use super::token::{lookup_keyword, Token, TokenKind};
use crate::diagnostics::{Failure, Severity};

/// Scanner that walks a source string and yields spanned tokens.
///
/// `base_offset` shifts every reported position; it is used when scanning a
/// function body substring lazily so positions stay absolute in the file.
pub struct Scanner<'a> {
    source: &'a str,
    file: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    base_offset: usize,
    /// Kind of the previous emitted token, used to tell a negative number
    /// literal apart from a binary minus.
    prev_kind: Option<TokenKind>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str, file: &'a str, base_offset: usize) -> Self {
        Self {
            source,
            file,
            chars: source.char_indices().peekable(),
            base_offset,
            prev_kind: None,
        }
    }

    /// Tokenize the entire source
    pub fn scan_tokens(mut self) -> Result<Vec<Token>, Failure> {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            self.prev_kind = Some(token.kind);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn scan_token(&mut self) -> Result<Token, Failure> {
        self.skip_whitespace_and_comments()?;

        let (offset, c) = match self.chars.next() {
            None => return Ok(Token::eof(self.base_offset + self.source.len())),
            Some(pair) => pair,
        };
        let pos = self.base_offset + offset;

        let token = match c {
            '(' => Token::new(TokenKind::LeftParen, "(", pos),
            ')' => Token::new(TokenKind::RightParen, ")", pos),
            '{' => Token::new(TokenKind::LeftBrace, "{", pos),
            '}' => Token::new(TokenKind::RightBrace, "}", pos),
            '[' => Token::new(TokenKind::LeftBracket, "[", pos),
            ']' => Token::new(TokenKind::RightBracket, "]", pos),
            ',' => Token::new(TokenKind::Comma, ",", pos),
            ';' => Token::new(TokenKind::Semicolon, ";", pos),
            '%' => Token::new(TokenKind::Percent, "%", pos),
            '*' => Token::new(TokenKind::Star, "*", pos),

            '.' => {
                if self.match_char('.') {
                    if self.match_char('.') {
                        Token::new(TokenKind::Ellipsis, "...", pos)
                    } else {
                        return Err(self.fail(pos, "expected '...'"));
                    }
                } else {
                    Token::new(TokenKind::Dot, ".", pos)
                }
            }

            '+' => {
                if self.match_char('+') {
                    Token::new(TokenKind::PlusPlus, "++", pos)
                } else {
                    Token::new(TokenKind::Plus, "+", pos)
                }
            }

            '-' => {
                if self.match_char('-') {
                    Token::new(TokenKind::MinusMinus, "--", pos)
                } else if self.peek_digit() && !self.prev_is_value() {
                    self.number(offset, pos)
                } else {
                    Token::new(TokenKind::Minus, "-", pos)
                }
            }

            '/' => Token::new(TokenKind::Slash, "/", pos),

            '!' => {
                if self.match_char('=') {
                    Token::new(TokenKind::BangEqual, "!=", pos)
                } else {
                    Token::new(TokenKind::Bang, "!", pos)
                }
            }

            '=' => {
                if self.match_char('=') {
                    Token::new(TokenKind::EqualEqual, "==", pos)
                } else {
                    Token::new(TokenKind::Equal, "=", pos)
                }
            }

            '<' => {
                if self.match_char('=') {
                    Token::new(TokenKind::LessEqual, "<=", pos)
                } else {
                    Token::new(TokenKind::Less, "<", pos)
                }
            }

            '>' => {
                if self.match_char('=') {
                    Token::new(TokenKind::GreaterEqual, ">=", pos)
                } else {
                    Token::new(TokenKind::Greater, ">", pos)
                }
            }

            '&' => {
                if self.match_char('&') {
                    Token::new(TokenKind::AmpAmp, "&&", pos)
                } else {
                    return Err(self.fail(pos, "expected '&&'"));
                }
            }

            '|' => {
                if self.match_char('|') {
                    Token::new(TokenKind::PipePipe, "||", pos)
                } else {
                    return Err(self.fail(pos, "expected '||'"));
                }
            }

            '"' => self.string(offset, pos)?,
            '\'' => self.char_literal(offset, pos)?,

            c if c.is_ascii_digit() => self.number(offset, pos),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(offset, pos),

            c => return Err(self.fail(pos, format!("unexpected character '{}'", c))),
        };
        Ok(token)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), Failure> {
        loop {
            match self.chars.peek() {
                Some(&(_, c)) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some(&(offset, '/')) => {
                    let mut ahead = self.source[offset..].chars();
                    ahead.next();
                    match ahead.next() {
                        Some('/') => {
                            while let Some(&(_, c)) = self.chars.peek() {
                                if c == '\n' {
                                    break;
                                }
                                self.chars.next();
                            }
                        }
                        Some('*') => {
                            self.chars.next();
                            self.chars.next();
                            let mut closed = false;
                            while let Some((_, c)) = self.chars.next() {
                                if c == '*' {
                                    if let Some(&(_, '/')) = self.chars.peek() {
                                        self.chars.next();
                                        closed = true;
                                        break;
                                    }
                                }
                            }
                            if !closed {
                                return Err(
                                    self.fail(self.base_offset + offset, "unterminated block comment")
                                );
                            }
                        }
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if let Some(&(_, c)) = self.chars.peek() {
            if c == expected {
                self.chars.next();
                return true;
            }
        }
        false
    }

    fn peek_digit(&mut self) -> bool {
        matches!(self.chars.peek(), Some(&(_, c)) if c.is_ascii_digit())
    }

    /// Whether the previous token could end a value, which makes a following
    /// '-' a binary operator rather than a sign.
    fn prev_is_value(&self) -> bool {
        matches!(
            self.prev_kind,
            Some(
                TokenKind::Identifier
                    | TokenKind::Number
                    | TokenKind::Str
                    | TokenKind::Char
                    | TokenKind::RightParen
                    | TokenKind::RightBracket
                    | TokenKind::PlusPlus
                    | TokenKind::MinusMinus
            )
        )
    }

    fn number(&mut self, start: usize, pos: usize) -> Token {
        let mut end = start + 1;
        while let Some(&(offset, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                end = offset + 1;
                self.chars.next();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Number, &self.source[start..end], pos)
    }

    fn identifier(&mut self, start: usize, pos: usize) -> Token {
        let mut end = start + 1;
        while let Some(&(offset, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                end = offset + 1;
                self.chars.next();
            } else {
                break;
            }
        }
        let text = &self.source[start..end];
        match lookup_keyword(text) {
            Some(kind) => Token::new(kind, text, pos),
            None => Token::new(TokenKind::Identifier, text, pos),
        }
    }

    /// Scan a string literal; the lexeme keeps escapes raw, without quotes.
    fn string(&mut self, start: usize, pos: usize) -> Result<Token, Failure> {
        for (offset, c) in self.chars.by_ref() {
            if c == '"' {
                return Ok(Token::new(TokenKind::Str, &self.source[start + 1..offset], pos));
            }
        }
        Err(self.fail(pos, "unterminated string"))
    }

    fn char_literal(&mut self, start: usize, pos: usize) -> Result<Token, Failure> {
        let mut escaped = false;
        for (offset, c) in self.chars.by_ref() {
            if c == '\'' && !escaped {
                return Ok(Token::new(TokenKind::Char, &self.source[start + 1..offset], pos));
            }
            escaped = c == '\\' && !escaped;
        }
        Err(self.fail(pos, "unterminated character literal"))
    }

    fn fail(&self, pos: usize, msg: impl Into<String>) -> Failure {
        Failure::new(Severity::Fatal, pos, msg, self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source, "t.eh", 0)
            .scan_tokens()
            .expect("scan")
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_declaration() {
        assert_eq!(
            kinds("int a = 42"),
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn negative_number_vs_subtraction() {
        assert_eq!(
            kinds("a - 1"),
            vec![TokenKind::Identifier, TokenKind::Minus, TokenKind::Number, TokenKind::Eof]
        );
        let tokens = Scanner::new("f(-1)", "t.eh", 0).scan_tokens().expect("scan");
        assert_eq!(tokens[2].kind, TokenKind::Number);
        assert_eq!(tokens[2].lexeme, "-1");
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("a // line\n/* block */ b"),
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn base_offset_shifts_positions() {
        let tokens = Scanner::new("x", "t.eh", 100).scan_tokens().expect("scan");
        assert_eq!(tokens[0].pos, 100);
    }

    #[test]
    fn keywords_are_recognized() {
        assert_eq!(kinds("ref")[0], TokenKind::Ref);
        assert_eq!(kinds("fallthrough")[0], TokenKind::Fallthrough);
        assert_eq!(kinds("refx")[0], TokenKind::Identifier);
    }
}
