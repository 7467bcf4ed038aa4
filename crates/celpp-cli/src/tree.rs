//! Indented dump of an expanded tree, one node per line.

use std::fmt::Write;

use celpp::ast::{Expr, ExprKind};
use celpp::{unparse, ParsedExpr};

pub fn render(parsed: &ParsedExpr) -> String {
    let mut out = String::new();
    render_node(&mut out, parsed, &parsed.expr, 0, "");
    if !parsed.source_info.macro_calls.is_empty() {
        out.push_str("macro calls:\n");
        for (id, call) in &parsed.source_info.macro_calls {
            let text = unparse(call).unwrap_or_else(|err| format!("<{err}>"));
            let _ = writeln!(out, "  #{} {}", id.0, text);
        }
    }
    out
}

fn render_node(out: &mut String, parsed: &ParsedExpr, expr: &Expr, depth: usize, label: &str) {
    let indent = "  ".repeat(depth);
    let at = match parsed.source_info.position(expr.id) {
        Some(pos) => format!("{}:{}", pos.line, pos.column),
        None => "?".to_string(),
    };
    let _ = write!(out, "{indent}{label}");

    match &expr.kind {
        ExprKind::Ident(name) => {
            let _ = writeln!(out, "Ident {name} @{at}");
        }
        ExprKind::Literal(lit) => {
            let value = unparse(expr).unwrap_or_else(|err| format!("<{err}>"));
            let _ = writeln!(out, "Literal {} {} @{}", lit.type_name(), value, at);
        }
        ExprKind::Select(select) => {
            let _ = writeln!(out, "Select .{} @{}", select.field, at);
            render_node(out, parsed, &select.operand, depth + 1, "");
        }
        ExprKind::Call(call) => {
            let _ = writeln!(out, "Call {} @{}", call.function, at);
            if let Some(target) = &call.target {
                render_node(out, parsed, target, depth + 1, "target: ");
            }
            for arg in &call.args {
                render_node(out, parsed, arg, depth + 1, "");
            }
        }
        ExprKind::List(elements) => {
            let _ = writeln!(out, "List @{at}");
            for element in elements {
                render_node(out, parsed, element, depth + 1, "");
            }
        }
        ExprKind::Map(entries) => {
            let _ = writeln!(out, "Map @{at}");
            for entry in entries {
                render_node(out, parsed, &entry.key, depth + 1, "key: ");
                render_node(out, parsed, &entry.value, depth + 1, "value: ");
            }
        }
        ExprKind::Struct(message) => {
            let _ = writeln!(out, "Struct {} @{}", message.type_name, at);
            for field in &message.fields {
                render_node(out, parsed, &field.value, depth + 1, &format!("{}: ", field.name));
            }
        }
    }
}
