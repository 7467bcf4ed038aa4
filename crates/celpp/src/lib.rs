//! Source-to-source preprocessor for CEL expressions.
//!
//! Expressions are parsed, calls matching a registered [`Macro`] are
//! replaced by the macro's expansion, and the resulting tree is rendered
//! back to plain CEL that any evaluator accepts.
//!
//! ```
//! use celpp::{macros, Preprocessor};
//!
//! let pp = Preprocessor::new(macros::ALL.iter().copied()).unwrap();
//! let out = pp.process(r#"default(self.x, "DEF")"#).unwrap();
//! assert_eq!(out, r#"has(self.x) ? self.x : "DEF""#);
//! ```

pub mod ast;
pub mod error;
pub mod macros;
pub mod preprocessor;
pub mod syntax;

// Re-export commonly used items
pub use ast::{Expr, ExprKind, ParsedExpr, SourceInfo};
pub use error::{
    Error, Issue, Issues, MacroError, ParseError, Position, RegistryError, UnparseError,
};
pub use macros::{Macro, MacroExprFactory, MacroRegistry};
pub use preprocessor::Preprocessor;
pub use syntax::{parse, unparse, ParserOptions};
