pub mod expr;
pub mod factory;
pub mod literal;
pub mod operators;

use std::collections::BTreeMap;

pub use expr::*;
pub use factory::*;
pub use literal::*;

use crate::error::Position;

/// Where the nodes of a parsed tree came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceInfo {
    pub positions: BTreeMap<ExprId, Position>,
    /// Original, unexpanded call for each macro expansion root (when enabled).
    pub macro_calls: BTreeMap<ExprId, Expr>,
}

impl SourceInfo {
    pub fn position(&self, id: ExprId) -> Option<Position> {
        self.positions.get(&id).copied()
    }
}

/// The root of a preprocessed expression
#[derive(Debug, Clone)]
pub struct ParsedExpr {
    pub expr: Expr,
    pub source_info: SourceInfo,
}

impl ParsedExpr {
    pub fn new(expr: Expr, source_info: SourceInfo) -> Self {
        Self { expr, source_info }
    }
}
