//! Lexer (tokenizer).
//!
//! The lexer is a finite, restartable token source: it can be drained
//! lazily through [`Iterator`] or materialised with [`Lexer::tokenize`].

use std::rc::Rc;

use crate::error::{LexError, LexErrorKind};
use crate::source::{Source, Span, ANONYMOUS};
use crate::token::{Token, TokenKind};

/// Tokenize a whole anonymous script.
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(Source::new(ANONYMOUS, text)).tokenize()
}

/// Lexer over a shared source.
pub struct Lexer {
    /// Source being scanned.
    source: Rc<Source>,
    /// Current byte position.
    pos: usize,
    /// Current line (1-based).
    line: usize,
    /// Current column (1-based).
    column: usize,
    /// Start of current token.
    token_start: usize,
    token_line: usize,
    token_column: usize,
    /// A line terminator was skipped before the current token.
    newline_before: bool,
    /// Eof or an error has been yielded by the iterator.
    finished: bool,
}

impl Lexer {
    /// Create a new lexer.
    pub fn new(source: Rc<Source>) -> Self {
        Lexer {
            source,
            pos: 0,
            line: 1,
            column: 1,
            token_start: 0,
            token_line: 1,
            token_column: 1,
            newline_before: false,
            finished: false,
        }
    }

    pub fn source(&self) -> &Rc<Source> {
        &self.source
    }

    /// Rewind to the beginning of the source.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.line = 1;
        self.column = 1;
        self.token_start = 0;
        self.token_line = 1;
        self.token_column = 1;
        self.newline_before = false;
        self.finished = false;
    }

    /// Tokenize the remaining source. The result always ends with `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        self.finished = true;
        Ok(tokens)
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.newline_before = false;
        self.skip_whitespace_and_comments()?;

        self.token_start = self.pos;
        self.token_line = self.line;
        self.token_column = self.column;

        if self.is_eof() {
            return Ok(self.make_token(TokenKind::Eof));
        }

        let ch = self.current();

        // Number
        if ch.is_ascii_digit() || (ch == '.' && self.peek().is_ascii_digit()) {
            return self.scan_number();
        }

        // String
        if ch == '"' || ch == '\'' {
            return self.scan_string(ch);
        }

        // Identifier or keyword
        if is_id_start(ch) {
            return Ok(self.scan_identifier());
        }

        self.scan_punctuator()
    }

    /// Skip whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            while !self.is_eof() && is_whitespace(self.current()) {
                if is_line_terminator(self.current()) {
                    self.newline_before = true;
                }
                self.advance();
            }

            // Single-line comment
            if self.current() == '/' && self.peek() == '/' {
                while !self.is_eof() && !is_line_terminator(self.current()) {
                    self.advance();
                }
                continue;
            }

            // Multi-line comment
            if self.current() == '/' && self.peek() == '*' {
                let (line, column) = (self.line, self.column);
                self.advance();
                self.advance();
                loop {
                    if self.is_eof() {
                        return Err(self.error_at(LexErrorKind::UnterminatedComment, line, column));
                    }
                    if self.current() == '*' && self.peek() == '/' {
                        self.advance();
                        self.advance();
                        break;
                    }
                    if is_line_terminator(self.current()) {
                        self.newline_before = true;
                    }
                    self.advance();
                }
                continue;
            }

            return Ok(());
        }
    }

    /// Scan a numeric literal.
    fn scan_number(&mut self) -> Result<Token, LexError> {
        let radix = if self.current() == '0' {
            match self.peek() {
                'x' | 'X' => Some(16),
                'o' | 'O' => Some(8),
                'b' | 'B' => Some(2),
                _ => None,
            }
        } else {
            None
        };

        let value = match radix {
            Some(radix) => {
                self.advance();
                self.advance();
                let digits_start = self.pos;
                while self.current().is_digit(radix) {
                    self.advance();
                }
                if self.pos == digits_start {
                    return Err(self.invalid_number());
                }
                self.source.text[digits_start..self.pos]
                    .chars()
                    .filter_map(|c| c.to_digit(radix))
                    .fold(0.0, |acc, d| acc * radix as f64 + d as f64)
            }
            None => {
                self.skip_digits();
                if self.current() == '.' {
                    self.advance();
                    self.skip_digits();
                }
                if matches!(self.current(), 'e' | 'E') {
                    self.advance();
                    if matches!(self.current(), '+' | '-') {
                        self.advance();
                    }
                    if !self.current().is_ascii_digit() {
                        return Err(self.invalid_number());
                    }
                    self.skip_digits();
                }
                self.source.text[self.token_start..self.pos]
                    .parse::<f64>()
                    .map_err(|_| self.invalid_number())?
            }
        };

        // `3in` or `12abc`: a literal must not run straight into a name.
        if is_id_start(self.current()) || self.current().is_ascii_digit() {
            self.advance();
            return Err(self.invalid_number());
        }

        Ok(self.make_token(TokenKind::Number(value)))
    }

    fn skip_digits(&mut self) {
        while self.current().is_ascii_digit() {
            self.advance();
        }
    }

    /// Scan a string literal, decoding escapes.
    fn scan_string(&mut self, quote: char) -> Result<Token, LexError> {
        self.advance(); // Opening quote
        let mut value = String::new();

        loop {
            if self.is_eof() || is_line_terminator(self.current()) {
                return Err(self.error_at(
                    LexErrorKind::UnterminatedString,
                    self.token_line,
                    self.token_column,
                ));
            }

            let ch = self.current();
            if ch == quote {
                self.advance();
                break;
            }

            if ch == '\\' {
                self.advance();
                self.scan_escape(&mut value)?;
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Ok(self.make_token(TokenKind::String(value)))
    }

    /// Decode the escape following a backslash.
    fn scan_escape(&mut self, out: &mut String) -> Result<(), LexError> {
        if self.is_eof() {
            return Err(self.error_at(
                LexErrorKind::UnterminatedString,
                self.token_line,
                self.token_column,
            ));
        }

        let ch = self.current();
        self.advance();
        match ch {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !self.current().is_ascii_digit() => out.push('\0'),
            'x' => {
                let code = self.scan_hex_digits(2)?;
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            'u' => {
                let code = if self.current() == '{' {
                    self.advance();
                    let start = self.pos;
                    while self.current().is_ascii_hexdigit() {
                        self.advance();
                    }
                    let digits = &self.source.text[start..self.pos];
                    if digits.is_empty() || self.current() != '}' {
                        return Err(self.error_here(LexErrorKind::InvalidEscape));
                    }
                    let code = u32::from_str_radix(digits, 16)
                        .map_err(|_| self.error_here(LexErrorKind::InvalidEscape))?;
                    self.advance();
                    code
                } else {
                    self.scan_hex_digits(4)?
                };
                // Lone surrogates have no `char` representation.
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            '\r' => {
                if self.current() == '\n' {
                    self.advance();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
        Ok(())
    }

    fn scan_hex_digits(&mut self, count: usize) -> Result<u32, LexError> {
        let mut value: u32 = 0;
        for _ in 0..count {
            let digit = self
                .current()
                .to_digit(16)
                .ok_or_else(|| self.error_here(LexErrorKind::InvalidEscape))?;
            value = value * 16 + digit;
            self.advance();
        }
        Ok(value)
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while !self.is_eof() && is_id_continue(self.current()) {
            self.advance();
        }

        let text = &self.source.text[self.token_start..self.pos];
        let kind = TokenKind::keyword_from_str(text)
            .unwrap_or_else(|| TokenKind::Identifier(text.to_string()));
        self.make_token(kind)
    }

    /// Scan a punctuator, preferring the longest match.
    fn scan_punctuator(&mut self) -> Result<Token, LexError> {
        let ch = self.current();
        self.advance();

        let kind = match ch {
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,
            '~' => TokenKind::Tilde,
            '.' => TokenKind::Dot,

            '<' => {
                if self.eat('=') {
                    TokenKind::LessEqual
                } else if self.eat('<') {
                    if self.eat('=') {
                        TokenKind::LeftShiftAssign
                    } else {
                        TokenKind::LeftShift
                    }
                } else {
                    TokenKind::LessThan
                }
            }

            '>' => {
                if self.eat('=') {
                    TokenKind::GreaterEqual
                } else if self.eat('>') {
                    if self.eat('>') {
                        if self.eat('=') {
                            TokenKind::UnsignedRightShiftAssign
                        } else {
                            TokenKind::UnsignedRightShift
                        }
                    } else if self.eat('=') {
                        TokenKind::RightShiftAssign
                    } else {
                        TokenKind::RightShift
                    }
                } else {
                    TokenKind::GreaterThan
                }
            }

            '=' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::StrictEqual
                    } else {
                        TokenKind::Equal
                    }
                } else {
                    TokenKind::Assign
                }
            }

            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::StrictNotEqual
                    } else {
                        TokenKind::NotEqual
                    }
                } else {
                    TokenKind::Bang
                }
            }

            '+' => {
                if self.eat('+') {
                    TokenKind::PlusPlus
                } else if self.eat('=') {
                    TokenKind::PlusAssign
                } else {
                    TokenKind::Plus
                }
            }

            '-' => {
                if self.eat('-') {
                    TokenKind::MinusMinus
                } else if self.eat('=') {
                    TokenKind::MinusAssign
                } else {
                    TokenKind::Minus
                }
            }

            '*' => {
                if self.eat('*') {
                    if self.eat('=') {
                        TokenKind::StarStarAssign
                    } else {
                        TokenKind::StarStar
                    }
                } else if self.eat('=') {
                    TokenKind::StarAssign
                } else {
                    TokenKind::Star
                }
            }

            '/' => {
                if self.eat('=') {
                    TokenKind::SlashAssign
                } else {
                    TokenKind::Slash
                }
            }

            '%' => {
                if self.eat('=') {
                    TokenKind::PercentAssign
                } else {
                    TokenKind::Percent
                }
            }

            '&' => {
                if self.eat('&') {
                    TokenKind::AmpersandAmpersand
                } else if self.eat('=') {
                    TokenKind::AmpersandAssign
                } else {
                    TokenKind::Ampersand
                }
            }

            '|' => {
                if self.eat('|') {
                    TokenKind::PipePipe
                } else if self.eat('=') {
                    TokenKind::PipeAssign
                } else {
                    TokenKind::Pipe
                }
            }

            '^' => {
                if self.eat('=') {
                    TokenKind::CaretAssign
                } else {
                    TokenKind::Caret
                }
            }

            other => {
                return Err(self.error_at(
                    LexErrorKind::UnexpectedCharacter(other),
                    self.token_line,
                    self.token_column,
                ))
            }
        };

        Ok(self.make_token(kind))
    }

    // Helper methods

    fn is_eof(&self) -> bool {
        self.pos >= self.source.text.len()
    }

    fn current(&self) -> char {
        self.source.text[self.pos..].chars().next().unwrap_or('\0')
    }

    fn peek(&self) -> char {
        self.source.text[self.pos..].chars().nth(1).unwrap_or('\0')
    }

    fn advance(&mut self) {
        let ch = self.current();
        if self.is_eof() {
            return;
        }
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if !self.is_eof() && self.current() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            &self.source.text[self.token_start..self.pos],
            Span::new(self.token_start, self.pos, self.token_line, self.token_column),
            self.newline_before,
        )
    }

    fn invalid_number(&self) -> LexError {
        let lexeme = &self.source.text[self.token_start..self.pos];
        self.error_at(
            LexErrorKind::InvalidNumber(lexeme.to_string()),
            self.token_line,
            self.token_column,
        )
    }

    fn error_here(&self, kind: LexErrorKind) -> LexError {
        self.error_at(kind, self.line, self.column)
    }

    fn error_at(&self, kind: LexErrorKind, line: usize, column: usize) -> LexError {
        LexError {
            kind,
            at: self.source.info(Span::new(self.pos, self.pos, line, column)),
        }
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(token) if !token.is_eof() => {}
            _ => self.finished = true,
        }
        Some(result)
    }
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_whitespace(ch: char) -> bool {
    ch.is_whitespace() || ch == '\u{feff}'
}

fn is_id_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_id_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_punctuators_longest_match() {
        assert_eq!(
            kinds("a === b !== c >>>= 1"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::StrictEqual,
                TokenKind::Identifier("b".into()),
                TokenKind::StrictNotEqual,
                TokenKind::Identifier("c".into()),
                TokenKind::UnsignedRightShiftAssign,
                TokenKind::Number(1.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.5 .5 1e3 0xff 0b101 0o17"),
            vec![
                TokenKind::Number(42.0),
                TokenKind::Number(3.5),
                TokenKind::Number(0.5),
                TokenKind::Number(1000.0),
                TokenKind::Number(255.0),
                TokenKind::Number(5.0),
                TokenKind::Number(15.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"'a\nb' "\x41B\u{43}" 'it\'s'"#),
            vec![
                TokenKind::String("a\nb".into()),
                TokenKind::String("ABC".into()),
                TokenKind::String("it's".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_comments() {
        assert_eq!(
            kinds("var x; // trailing\n/* block */ return"),
            vec![
                TokenKind::Var,
                TokenKind::Identifier("x".into()),
                TokenKind::Semicolon,
                TokenKind::Return,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_positions_and_newline_flag() {
        let tokens = tokenize("a\n  b").unwrap();
        assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (2, 3));
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("let s = 'abc\n;").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!((err.at.line, err.at.column), (1, 9));
    }

    #[test]
    fn test_invalid_number() {
        let err = tokenize("x = 12abc").unwrap_err();
        assert!(matches!(err.kind, LexErrorKind::InvalidNumber(_)));
        assert_eq!(err.at.column, 5);
        assert!(tokenize("0x").is_err());
        assert!(tokenize("1e+").is_err());
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("a @ b").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter('@'));
        assert_eq!(err.at.column, 3);
    }

    #[test]
    fn test_unterminated_comment() {
        let err = tokenize("a /* never closed").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedComment);
    }

    #[test]
    fn test_iterator_is_finite_and_restartable() {
        let mut lexer = Lexer::new(Source::new("t.js", "a + b"));
        let first: Vec<_> = lexer.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(first.len(), 4);
        assert!(lexer.next().is_none());

        lexer.reset();
        let second: Vec<_> = lexer.collect::<Result<_, _>>().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unicode_identifiers_keep_columns() {
        let tokens = tokenize("var café = 1").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Identifier("café".into()));
        assert_eq!(tokens[2].span.column, 10);
    }
}
