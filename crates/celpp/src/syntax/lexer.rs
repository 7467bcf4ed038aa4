use crate::error::{LexError, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dot,
    Comma,
    Colon,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AndAnd,
    OrOr,
    In,
    True,
    False,
    Null,
    Identifier,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    Eof,
}

/// A token; `lexeme` is the exact source text, quotes and prefixes included.
#[derive(Debug, Clone)]
pub struct Token {
    pub typ: TokenType,
    pub lexeme: String,
    pub pos: Position,
}

pub struct Lexer {
    input: Vec<char>,
    current: usize,
    offset: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self { input: input.chars().collect(), current: 0, offset: 0, line: 1, column: 1 }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments();

            if self.is_at_end() {
                tokens.push(Token {
                    typ: TokenType::Eof,
                    lexeme: String::new(),
                    pos: self.current_position(),
                });
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let pos = self.current_position();
        let start = self.current;
        let ch = self.advance();

        let typ = match ch {
            '(' => TokenType::LParen,
            ')' => TokenType::RParen,
            '[' => TokenType::LBracket,
            ']' => TokenType::RBracket,
            '{' => TokenType::LBrace,
            '}' => TokenType::RBrace,
            ',' => TokenType::Comma,
            ':' => TokenType::Colon,
            '?' => TokenType::Question,
            '+' => TokenType::Plus,
            '-' => TokenType::Minus,
            '*' => TokenType::Star,
            '/' => TokenType::Slash,
            '%' => TokenType::Percent,
            '.' if self.current_char().is_some_and(|c| c.is_ascii_digit()) => {
                return self.read_number(start, pos);
            }
            '.' => TokenType::Dot,
            '!' if self.match_char('=') => TokenType::BangEqual,
            '!' => TokenType::Bang,
            '=' if self.match_char('=') => TokenType::EqualEqual,
            '<' if self.match_char('=') => TokenType::LessEqual,
            '<' => TokenType::Less,
            '>' if self.match_char('=') => TokenType::GreaterEqual,
            '>' => TokenType::Greater,
            '&' if self.match_char('&') => TokenType::AndAnd,
            '|' if self.match_char('|') => TokenType::OrOr,
            '"' | '\'' => return self.read_string(start, pos, ch, false),
            _ if ch.is_ascii_digit() => return self.read_number(start, pos),
            _ if ch == '_' || ch.is_ascii_alphabetic() => return self.read_identifier(start, pos),
            _ => return Err(LexError::UnexpectedChar { ch, pos }),
        };

        Ok(Token { typ, lexeme: self.lexeme_from(start), pos })
    }

    fn read_identifier(&mut self, start: usize, pos: Position) -> Result<Token, LexError> {
        while let Some(ch) = self.current_char() {
            if ch == '_' || ch.is_ascii_alphanumeric() {
                self.advance();
            } else {
                break;
            }
        }

        let lexeme = self.lexeme_from(start);

        // String prefixes: r, b, rb, br in any case
        if let Some(quote @ ('"' | '\'')) = self.current_char() {
            let lower = lexeme.to_ascii_lowercase();
            if matches!(lower.as_str(), "r" | "b" | "rb" | "br") {
                self.advance();
                return self.read_string(start, pos, quote, lower.contains('r'));
            }
        }

        let typ = match lexeme.as_str() {
            "in" => TokenType::In,
            "true" => TokenType::True,
            "false" => TokenType::False,
            "null" => TokenType::Null,
            _ => TokenType::Identifier,
        };

        Ok(Token { typ, lexeme, pos })
    }

    /// Scans a quoted literal whose opening quote has already been consumed.
    fn read_string(
        &mut self,
        start: usize,
        pos: Position,
        quote: char,
        raw: bool,
    ) -> Result<Token, LexError> {
        let triple = self.current_char() == Some(quote) && self.peek() == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        loop {
            match self.current_char() {
                None => return Err(LexError::UnterminatedString { pos }),
                Some('\n') | Some('\r') if !triple => {
                    return Err(LexError::UnterminatedString { pos })
                }
                Some('\\') if !raw => {
                    self.advance();
                    if self.current_char().is_none() {
                        return Err(LexError::UnterminatedString { pos });
                    }
                    self.advance();
                }
                Some(ch) if ch == quote => {
                    if !triple {
                        self.advance();
                        break;
                    }
                    if self.peek() == Some(quote) && self.peek_at(2) == Some(quote) {
                        self.advance();
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }

        let lexeme = self.lexeme_from(start);
        let is_bytes = lexeme
            .chars()
            .take_while(|c| *c != quote)
            .any(|c| c.eq_ignore_ascii_case(&'b'));
        let typ = if is_bytes { TokenType::Bytes } else { TokenType::String };

        Ok(Token { typ, lexeme, pos })
    }

    /// Scans a numeric literal whose first character has already been consumed.
    fn read_number(&mut self, start: usize, pos: Position) -> Result<Token, LexError> {
        let first = self.input[start];

        if first == '0' && matches!(self.current_char(), Some('x') | Some('X')) {
            self.advance();
            let digits_start = self.current;
            while self.current_char().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance();
            }
            if self.current == digits_start {
                return Err(LexError::InvalidNumber { lexeme: self.lexeme_from(start), pos });
            }
            return Ok(self.finish_integer(start, pos));
        }

        let mut is_double = first == '.';
        self.skip_digits();

        if !is_double
            && self.current_char() == Some('.')
            && self.peek().is_some_and(|c| c.is_ascii_digit())
        {
            is_double = true;
            self.advance();
            self.skip_digits();
        }

        if matches!(self.current_char(), Some('e') | Some('E')) {
            let sign = matches!(self.peek(), Some('+') | Some('-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_double = true;
                for _ in 0..digit_at {
                    self.advance();
                }
                self.skip_digits();
            } else {
                self.advance();
                return Err(LexError::InvalidNumber { lexeme: self.lexeme_from(start), pos });
            }
        }

        if is_double {
            return Ok(Token { typ: TokenType::Double, lexeme: self.lexeme_from(start), pos });
        }

        Ok(self.finish_integer(start, pos))
    }

    fn finish_integer(&mut self, start: usize, pos: Position) -> Token {
        let typ = if matches!(self.current_char(), Some('u') | Some('U')) {
            self.advance();
            TokenType::Uint
        } else {
            TokenType::Int
        };
        Token { typ, lexeme: self.lexeme_from(start), pos }
    }

    fn skip_digits(&mut self) {
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.current_char() {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek() == Some('/') => {
                    // Skip comment until end of line
                    while let Some(ch) = self.current_char() {
                        self.advance();
                        if ch == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn lexeme_from(&self, start: usize) -> String {
        self.input[start..self.current].iter().collect()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.current_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.current).copied()
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(1)
    }

    fn peek_at(&self, distance: usize) -> Option<char> {
        self.input.get(self.current + distance).copied()
    }

    /// Consumes one character; callers check for end of input first.
    fn advance(&mut self) -> char {
        let ch = self.input[self.current];
        self.current += 1;
        self.offset += ch.len_utf8();

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.input.len()
    }

    fn current_position(&self) -> Position {
        Position::new(self.offset, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(input: &str) -> Vec<TokenType> {
        Lexer::new(input).tokenize().unwrap().into_iter().map(|t| t.typ).collect()
    }

    #[test]
    fn test_string_prefix_is_not_identifier() {
        assert_eq!(types("r'x' b\"y\" rb'z'"), vec![
            TokenType::String,
            TokenType::Bytes,
            TokenType::Bytes,
            TokenType::Eof
        ]);
    }

    #[test]
    fn test_member_access_on_int_is_not_double() {
        assert_eq!(types("1.size()"), vec![
            TokenType::Int,
            TokenType::Dot,
            TokenType::Identifier,
            TokenType::LParen,
            TokenType::RParen,
            TokenType::Eof
        ]);
    }

    #[test]
    fn test_triple_quoted_string_spans_lines() {
        let tokens = Lexer::new("'''a\n'b'\n'''").tokenize().unwrap();
        assert_eq!(tokens[0].typ, TokenType::String);
        assert_eq!(tokens[0].lexeme, "'''a\n'b'\n'''");
    }

    #[test]
    fn test_single_quoted_string_stops_at_newline() {
        let err = Lexer::new("'abc\n'").tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }
}
