use crate::ast::{operators, Expr, ExprFactory, ExprId, Literal};
use crate::error::{MacroError, Position};

/// Node builder handed to macro bodies.
///
/// Every node it creates gets a fresh id positioned at the macro call site,
/// so diagnostics on generated code point back at the invocation.
pub struct MacroExprFactory<'a> {
    factory: &'a mut ExprFactory,
    call_id: ExprId,
    pos: Position,
    max_depth: usize,
}

impl<'a> MacroExprFactory<'a> {
    /// `max_depth` is the nesting still allowed below the call site.
    pub fn new(
        factory: &'a mut ExprFactory,
        call_id: ExprId,
        pos: Position,
        max_depth: usize,
    ) -> Self {
        Self { factory, call_id, pos, max_depth }
    }

    /// Id of the call expression being expanded.
    pub fn call_id(&self) -> ExprId {
        self.call_id
    }

    /// Nesting still allowed below the call site. Expanders that build a
    /// chain per argument reject argument lists longer than this.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Error attributed to the call being expanded.
    pub fn new_error(&self, message: impl Into<String>) -> MacroError {
        MacroError::new(self.call_id, message)
    }

    /// Fresh-id deep copy of an argument, for arguments used more than once.
    pub fn copy(&mut self, expr: &Expr) -> Expr {
        self.factory.copy(expr)
    }

    /// Identifier reference `name`.
    pub fn new_ident(&mut self, name: impl Into<String>) -> Expr {
        self.factory.ident(self.pos, name)
    }

    /// Constant of any literal type.
    pub fn new_literal(&mut self, lit: impl Into<Literal>) -> Expr {
        self.factory.literal(self.pos, lit)
    }

    /// Int constant.
    pub fn new_int(&mut self, value: i64) -> Expr {
        self.factory.literal(self.pos, Literal::Int(value))
    }

    /// `null` constant.
    pub fn new_null(&mut self) -> Expr {
        self.factory.null(self.pos)
    }

    /// `operand.field`, where `field` must be a plain identifier node.
    pub fn new_select(&mut self, operand: Expr, field: &Expr) -> Result<Expr, MacroError> {
        let name = field
            .as_ident()
            .filter(|name| crate::ast::is_simple_ident(name))
            .ok_or_else(|| self.new_error("field selection requires a simple identifier"))?
            .to_string();
        Ok(self.factory.select(self.pos, operand, name))
    }

    /// Chains `base.f1.f2...fn` over the given field identifiers.
    pub fn new_selects(&mut self, base: &Expr, fields: &[Expr]) -> Result<Expr, MacroError> {
        let mut expr = self.copy(base);
        for field in fields {
            expr = self.new_select(expr, field)?;
        }
        Ok(expr)
    }

    /// Global call `function(args...)`; operators use their internal names.
    pub fn new_call(&mut self, function: impl Into<String>, args: Vec<Expr>) -> Expr {
        self.factory.call(self.pos, function, args)
    }

    /// Receiver call `target.function(args...)`.
    pub fn new_member_call(
        &mut self,
        function: impl Into<String>,
        target: Expr,
        args: Vec<Expr>,
    ) -> Expr {
        self.factory.member_call(self.pos, function, target, args)
    }

    /// List literal `[elements...]`.
    pub fn new_list(&mut self, elements: Vec<Expr>) -> Expr {
        self.factory.list(self.pos, elements)
    }

    /// Field-presence test `has(operand)`.
    pub fn new_has(&mut self, operand: Expr) -> Expr {
        self.new_call(operators::HAS, vec![operand])
    }

    /// `condition ? then : otherwise`
    pub fn new_conditional(&mut self, condition: Expr, then: Expr, otherwise: Expr) -> Expr {
        self.new_call(operators::CONDITIONAL, vec![condition, then, otherwise])
    }

    /// Binary operator call, e.g. `new_binary(operators::ADD, l, r)`.
    pub fn new_binary(&mut self, function: &str, lhs: Expr, rhs: Expr) -> Expr {
        self.new_call(function, vec![lhs, rhs])
    }
}
