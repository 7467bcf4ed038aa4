//! Rendering of expression trees back to CEL source text.
//!
//! Output is canonical: binary operators are spaced, lists and maps use
//! `", "` separators and parentheses appear only where precedence needs
//! them. Parsing the output yields a tree equal to the input.

use std::fmt::Write;

use crate::ast::operators::{self, CONDITIONAL};
use crate::ast::*;
use crate::error::UnparseError;

type Result<T> = std::result::Result<T, UnparseError>;

/// Renders `expr` as CEL source text.
pub fn unparse(expr: &Expr) -> Result<String> {
    let mut unparser = Unparser::new();
    unparser.visit(expr)?;
    Ok(unparser.finish())
}

#[derive(Debug, Default)]
pub struct Unparser {
    out: String,
}

impl Unparser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn visit(&mut self, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Ident(name) => self.visit_ident(name),
            ExprKind::Literal(lit) => self.visit_literal(lit),
            ExprKind::Select(select) => self.visit_select(select),
            ExprKind::Call(call) => self.visit_call(call),
            ExprKind::List(elements) => {
                self.out.push('[');
                self.visit_joined(elements)?;
                self.out.push(']');
                Ok(())
            }
            ExprKind::Map(entries) => {
                self.out.push('{');
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.visit(&entry.key)?;
                    self.out.push_str(": ");
                    self.visit(&entry.value)?;
                }
                self.out.push('}');
                Ok(())
            }
            ExprKind::Struct(message) => self.visit_struct(message),
        }
    }

    fn visit_ident(&mut self, name: &str) -> Result<()> {
        let bare = name.strip_prefix('.').unwrap_or(name);
        if !is_simple_ident(bare) {
            return Err(UnparseError::InvalidIdentifier { name: name.to_string() });
        }
        self.out.push_str(name);
        Ok(())
    }

    fn visit_select(&mut self, select: &Select) -> Result<()> {
        if !is_simple_ident(&select.field) {
            return Err(UnparseError::InvalidIdentifier { name: select.field.clone() });
        }
        self.visit_maybe_nested(&select.operand, needs_operand_parens(&select.operand))?;
        self.out.push('.');
        self.out.push_str(&select.field);
        Ok(())
    }

    fn visit_struct(&mut self, message: &StructExpr) -> Result<()> {
        let bare = message.type_name.strip_prefix('.').unwrap_or(&message.type_name);
        if !bare.split('.').all(is_simple_ident) {
            return Err(UnparseError::InvalidIdentifier { name: message.type_name.clone() });
        }
        self.out.push_str(&message.type_name);
        self.out.push('{');
        for (i, field) in message.fields.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            if !is_simple_ident(&field.name) {
                return Err(UnparseError::InvalidIdentifier { name: field.name.clone() });
            }
            self.out.push_str(&field.name);
            self.out.push_str(": ");
            self.visit(&field.value)?;
        }
        self.out.push('}');
        Ok(())
    }

    fn visit_call(&mut self, call: &Call) -> Result<()> {
        let function = call.function.as_str();

        if call.target.is_none() {
            if let Some(expected) = operators::arity(function) {
                if call.args.len() != expected {
                    return Err(UnparseError::OperatorArity {
                        function: function.to_string(),
                        expected,
                        found: call.args.len(),
                    });
                }
                return match function {
                    CONDITIONAL => self.visit_conditional(&call.args),
                    operators::INDEX => self.visit_index(&call.args),
                    _ => match operators::unary_display(function) {
                        Some(op) => self.visit_unary(op, &call.args[0]),
                        None => self.visit_binary(function, &call.args[0], &call.args[1]),
                    },
                };
            }
        }

        if let Some(target) = &call.target {
            self.visit_maybe_nested(target, needs_operand_parens(target))?;
            self.out.push('.');
        }
        self.out.push_str(function);
        self.out.push('(');
        self.visit_joined(&call.args)?;
        self.out.push(')');
        Ok(())
    }

    fn visit_binary(&mut self, function: &str, lhs: &Expr, rhs: &Expr) -> Result<()> {
        if is_logical(function) {
            return self.visit_logical(function, lhs, rhs);
        }
        let op = operators::binary_display(function).unwrap_or(function);

        self.visit_maybe_nested(lhs, is_complex_operator_wrt(function, lhs))?;
        self.out.push(' ');
        self.out.push_str(op);
        self.out.push(' ');

        let nested = is_complex_operator_wrt(function, rhs) || is_same_precedence(function, rhs);
        self.visit_maybe_nested(rhs, nested)
    }

    // The parser rebuilds a flat `&&`/`||` chain as a balanced tree, so only
    // the part of a nested run that already has that shape is printed flat.
    // Subtrees of the same operator below it keep their parentheses.
    fn visit_logical(&mut self, function: &str, lhs: &Expr, rhs: &Expr) -> Result<()> {
        let most = run_terms(function, lhs) + run_terms(function, rhs);
        let terms = (3..=most).rev().find(|&n| fits_pair(function, lhs, rhs, n)).unwrap_or(2);
        self.visit_chain(function, lhs, rhs, terms)
    }

    // `lhs op rhs` printed flat as `terms` operands.
    fn visit_chain(&mut self, function: &str, lhs: &Expr, rhs: &Expr, terms: usize) -> Result<()> {
        let left = left_terms(terms);
        self.visit_run(function, lhs, left)?;
        self.out.push(' ');
        self.out.push_str(operators::binary_display(function).unwrap_or(function));
        self.out.push(' ');
        self.visit_run(function, rhs, terms - left)
    }

    fn visit_run(&mut self, function: &str, expr: &Expr, terms: usize) -> Result<()> {
        match operator_call(expr) {
            Some(call) if terms > 1 => {
                self.visit_chain(function, &call.args[0], &call.args[1], terms)
            }
            _ => {
                let nested =
                    is_complex_operator_wrt(function, expr) || is_same_function(function, expr);
                self.visit_maybe_nested(expr, nested)
            }
        }
    }

    fn visit_conditional(&mut self, args: &[Expr]) -> Result<()> {
        let nested = |e: &Expr| is_same_precedence(CONDITIONAL, e) || is_complex_operator(e);

        self.visit_maybe_nested(&args[0], nested(&args[0]))?;
        self.out.push_str(" ? ");
        self.visit_maybe_nested(&args[1], nested(&args[1]))?;
        self.out.push_str(" : ");
        self.visit_maybe_nested(&args[2], nested(&args[2]))
    }

    fn visit_index(&mut self, args: &[Expr]) -> Result<()> {
        self.visit_maybe_nested(&args[0], needs_operand_parens(&args[0]))?;
        self.out.push('[');
        self.visit(&args[1])?;
        self.out.push(']');
        Ok(())
    }

    // Nested unary operators and numbers after '-' keep their parentheses,
    // since the parser folds `!!x`, `--x` and `-1` on the way back in.
    fn visit_unary(&mut self, op: &str, operand: &Expr) -> Result<()> {
        self.out.push_str(op);
        let nested = is_complex_operator(operand)
            || is_unary(operand)
            || (op == "-" && leads_with_number(operand));
        self.visit_maybe_nested(operand, nested)
    }

    fn visit_literal(&mut self, lit: &Literal) -> Result<()> {
        match lit {
            Literal::Null => self.out.push_str("null"),
            Literal::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Literal::Int(i) => {
                let _ = write!(self.out, "{i}");
            }
            Literal::Uint(u) => {
                let _ = write!(self.out, "{u}u");
            }
            Literal::Double(d) => self.out.push_str(&format_double(*d)?),
            Literal::String(s) => self.out.push_str(&quote(s)),
            Literal::Bytes(bytes) => {
                self.out.push_str("b\"");
                for byte in bytes {
                    let _ = write!(self.out, "\\{byte:03o}");
                }
                self.out.push('"');
            }
        }
        Ok(())
    }

    fn visit_joined(&mut self, exprs: &[Expr]) -> Result<()> {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.visit(expr)?;
        }
        Ok(())
    }

    fn visit_maybe_nested(&mut self, expr: &Expr, nested: bool) -> Result<()> {
        if nested {
            self.out.push('(');
        }
        self.visit(expr)?;
        if nested {
            self.out.push(')');
        }
        Ok(())
    }
}

fn operator_call(expr: &Expr) -> Option<&Call> {
    expr.as_call().filter(|call| call.target.is_none())
}

// Any call with two or more arguments.
fn is_complex_operator(expr: &Expr) -> bool {
    expr.as_call().is_some_and(|call| call.args.len() >= 2)
}

// A complex call that binds looser than `function`.
fn is_complex_operator_wrt(function: &str, expr: &Expr) -> bool {
    let precedence = operators::precedence(function);
    is_complex_operator(expr)
        && operator_call(expr)
            .is_some_and(|call| precedence < operators::precedence(&call.function))
}

fn is_same_precedence(function: &str, expr: &Expr) -> bool {
    let precedence = operators::precedence(function);
    operator_call(expr).is_some_and(|call| precedence == operators::precedence(&call.function))
}

fn is_unary(expr: &Expr) -> bool {
    operator_call(expr).is_some_and(|call| operators::unary_display(&call.function).is_some())
}

// Whether the leftmost token of `expr` is a numeric literal.
fn leads_with_number(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Literal(lit) => matches!(lit, Literal::Int(_) | Literal::Double(_)),
        ExprKind::Select(select) => leads_with_number(&select.operand),
        ExprKind::Call(call) => match &call.target {
            Some(target) => leads_with_number(target),
            None if call.function == operators::INDEX => {
                call.args.first().is_some_and(leads_with_number)
            }
            None => false,
        },
        _ => false,
    }
}

fn is_logical(function: &str) -> bool {
    function == operators::LOGICAL_AND || function == operators::LOGICAL_OR
}

fn is_same_function(function: &str, expr: &Expr) -> bool {
    operator_call(expr).is_some_and(|call| call.function == function && call.args.len() == 2)
}

// Operands of the `function` run rooted at `expr` when printed fully flat.
fn run_terms(function: &str, expr: &Expr) -> usize {
    match operator_call(expr) {
        Some(call) if is_same_function(function, expr) => {
            run_terms(function, &call.args[0]) + run_terms(function, &call.args[1])
        }
        _ => 1,
    }
}

// Operands the parser puts on the left when balancing a chain of `terms`.
fn left_terms(terms: usize) -> usize {
    (terms - 1) / 2 + 1
}

// Whether `expr` is what the parser builds for a flat chain of `terms`
// operands, any of which may be a parenthesized subtree.
fn fits(function: &str, expr: &Expr, terms: usize) -> bool {
    if terms == 1 {
        return true;
    }
    match operator_call(expr) {
        Some(call) if is_same_function(function, expr) => {
            fits_pair(function, &call.args[0], &call.args[1], terms)
        }
        _ => false,
    }
}

fn fits_pair(function: &str, lhs: &Expr, rhs: &Expr, terms: usize) -> bool {
    let left = left_terms(terms);
    fits(function, lhs, left) && fits(function, rhs, terms - left)
}

// Operand of a postfix select, index or member call.
fn needs_operand_parens(expr: &Expr) -> bool {
    is_binary_or_ternary(expr) || is_unary(expr)
}

fn is_binary_or_ternary(expr: &Expr) -> bool {
    is_complex_operator(expr)
        && operator_call(expr).is_some_and(|call| {
            operators::binary_display(&call.function).is_some()
                || operators::precedence(&call.function) == operators::precedence(CONDITIONAL)
        })
}

/// Shortest text that reads back as the same double.
///
/// Exponent notation is used below 1e-4 and from 1e21 up; integral values
/// keep a trailing `.0` so they do not read back as ints.
pub fn format_double(value: f64) -> Result<String> {
    if !value.is_finite() {
        return Err(UnparseError::NonFiniteDouble { value });
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "-1.25e-7".
    let sci = format!("{value:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let mut out = String::from(sign);
    if !(-4..21).contains(&exp) {
        let _ = write!(out, "{mantissa}e{}{:02}", if exp < 0 { '-' } else { '+' }, exp.abs());
        return Ok(out);
    }

    let point = exp + 1;
    let len = digits.len() as i32;
    if point <= 0 {
        out.push_str("0.");
        out.push_str(&"0".repeat(point.unsigned_abs() as usize));
        out.push_str(&digits);
    } else if point >= len {
        out.push_str(&digits);
        out.push_str(&"0".repeat((point - len) as usize));
        out.push_str(".0");
    } else {
        let (int, frac) = digits.split_at(point as usize);
        out.push_str(int);
        out.push('.');
        out.push_str(frac);
    }
    Ok(out)
}

/// Double-quoted string literal with the escapes the lexer understands.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0b}' => out.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
