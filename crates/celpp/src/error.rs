use std::fmt;

use crate::ast::ExprId;

/// Position in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize, // Byte offset
    pub line: usize,   // Line number (1-based)
    pub column: usize, // Column number (1-based, in characters)
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self { offset, line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Lexer errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("Unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: Position },

    #[error("Unterminated string at {pos}")]
    UnterminatedString { pos: Position },

    #[error("Invalid escape sequence '\\{ch}' at {pos}")]
    InvalidEscape { ch: char, pos: Position },

    #[error("Invalid number literal '{lexeme}' at {pos}")]
    InvalidNumber { lexeme: String, pos: Position },
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnexpectedChar { pos, .. }
            | LexError::UnterminatedString { pos }
            | LexError::InvalidEscape { pos, .. }
            | LexError::InvalidNumber { pos, .. } => *pos,
        }
    }
}

/// Parser errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Unexpected token {token:?} at {pos}")]
    UnexpectedToken { token: String, pos: Position },

    #[error("Expected {expected}, found {found} at {pos}")]
    Expected { expected: String, found: String, pos: Position },

    #[error("Reserved identifier '{name}' at {pos}")]
    ReservedIdentifier { name: String, pos: Position },

    #[error("Invalid {kind} literal '{lexeme}' at {pos}: {reason}")]
    InvalidLiteral { kind: &'static str, lexeme: String, reason: String, pos: Position },

    #[error("Expression recursion limit of {limit} exceeded at {pos}")]
    RecursionLimit { limit: usize, pos: Position },

    #[error("Expression size of {size} code points exceeds the limit of {limit}")]
    ExpressionTooLarge { size: usize, limit: usize },

    #[error("Empty input")]
    EmptyInput,

    #[error("Lexer error: {0}")]
    LexError(#[from] LexError),
}

impl ParseError {
    /// Source position the error is attributed to, when it has one.
    pub fn position(&self) -> Option<Position> {
        match self {
            ParseError::UnexpectedToken { pos, .. }
            | ParseError::Expected { pos, .. }
            | ParseError::ReservedIdentifier { pos, .. }
            | ParseError::InvalidLiteral { pos, .. }
            | ParseError::RecursionLimit { pos, .. } => Some(*pos),
            ParseError::LexError(err) => Some(err.position()),
            ParseError::ExpressionTooLarge { .. } | ParseError::EmptyInput => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Failure reported by a macro body, attributed to the node that caused it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct MacroError {
    pub id: ExprId,
    pub message: String,
}

impl MacroError {
    pub fn new(id: ExprId, message: impl Into<String>) -> Self {
        Self { id, message: message.into() }
    }
}

/// Macro registry construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Macro '{key}' is registered more than once")]
    Duplicate { key: String },
}

/// Errors rendering a tree back to text
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnparseError {
    #[error("Operator '{function}' expects {expected} argument(s), found {found}")]
    OperatorArity { function: String, expected: usize, found: usize },

    #[error("Invalid identifier '{name}'")]
    InvalidIdentifier { name: String },

    #[error("Double literal {value} has no textual form")]
    NonFiniteDouble { value: f64 },
}

/// A single positioned diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub message: String,
    pub pos: Option<Position>,
}

impl Issue {
    pub fn new(message: impl Into<String>, pos: Option<Position>) -> Self {
        Self { message: message.into(), pos }
    }
}

impl From<&ParseError> for Issue {
    fn from(err: &ParseError) -> Self {
        // The position is rendered separately, so strip it from the message.
        let message = match err {
            ParseError::UnexpectedToken { token, .. } => format!("unexpected token {token:?}"),
            ParseError::Expected { expected, found, .. } => {
                format!("expected {expected}, found {found}")
            }
            ParseError::ReservedIdentifier { name, .. } => format!("reserved identifier: {name}"),
            ParseError::InvalidLiteral { kind, lexeme, reason, .. } => {
                format!("invalid {kind} literal {lexeme}: {reason}")
            }
            ParseError::RecursionLimit { limit, .. } => {
                format!("expression recursion limit exceeded: {limit}")
            }
            ParseError::LexError(lex) => match lex {
                LexError::UnexpectedChar { ch, .. } => format!("unexpected character '{ch}'"),
                LexError::UnterminatedString { .. } => "unterminated string".to_string(),
                LexError::InvalidEscape { ch, .. } => format!("invalid escape sequence '\\{ch}'"),
                LexError::InvalidNumber { lexeme, .. } => format!("invalid number '{lexeme}'"),
            },
            other => other.to_string(),
        };
        Issue::new(message, err.position())
    }
}

/// All problems found while preprocessing one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issues {
    source: String,
    issues: Vec<Issue>,
}

impl Issues {
    pub fn new(source: impl Into<String>, issues: Vec<Issue>) -> Self {
        Self { source: source.into(), issues }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }
}

// Every issue is followed by the offending source line and a caret.
impl fmt::Display for Issues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match issue.pos {
                Some(pos) => {
                    write!(f, "ERROR: <input>:{}:{}: {}", pos.line, pos.column, issue.message)?;
                    if let Some(line) = self.source.lines().nth(pos.line.saturating_sub(1)) {
                        write!(f, "\n | {}", line)?;
                        write!(f, "\n | {}^", ".".repeat(pos.column.saturating_sub(1)))?;
                    }
                }
                None => write!(f, "ERROR: <input>: {}", issue.message)?,
            }
        }
        Ok(())
    }
}

impl std::error::Error for Issues {}

/// Top-level preprocessing errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("fail to parse expression:\n{0}")]
    Parse(#[from] Issues),

    #[error("unparse: {0}")]
    Unparse(#[from] UnparseError),

    #[error("invalid macro configuration: {0}")]
    Registry(#[from] RegistryError),
}
