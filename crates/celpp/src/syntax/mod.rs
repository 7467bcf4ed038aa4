pub mod lexer;
pub mod parser;
pub mod unescape;
pub mod unparser;

pub use lexer::{Lexer, Token, TokenType};
pub use parser::{parse, Parser, ParserOptions};
pub use unparser::{unparse, Unparser};
