use super::{fold_left, Macro, MacroExprFactory};
use crate::ast::{is_simple_ident, operators, Expr};
use crate::error::MacroError;

/// `base.index(f1, f2, ...)`: nil-safe traversal of `base.f1.f2...`, `null` when
/// any step is unset.
pub const INDEX_OR_NULL: Macro = Macro::receiver_var_arg("index", expand_index_or_null);

/// `base.index(zero, f1, f2, ...)`: nil-safe traversal of `base.f1.f2...`,
/// `zero` when any step is unset.
pub const INDEX_WITH_FALLBACK: Macro =
    Macro::receiver_var_arg("index", expand_index_with_fallback);

fn expand_index_or_null(
    mef: &mut MacroExprFactory<'_>,
    base: &Expr,
    args: &[Expr],
) -> Result<Expr, MacroError> {
    if args.is_empty() {
        return Err(mef.new_error("index requires at least 1 arg"));
    }
    let fallback = mef.new_null();
    safe_traversal(mef, base, args, fallback)
}

fn expand_index_with_fallback(
    mef: &mut MacroExprFactory<'_>,
    base: &Expr,
    args: &[Expr],
) -> Result<Expr, MacroError> {
    let [zero, fields @ ..] = args else {
        return Err(mef.new_error("index requires at least 2 args"));
    };
    if fields.is_empty() {
        return Err(mef.new_error("index requires at least 2 args"));
    }
    let fallback = mef.copy(zero);
    safe_traversal(mef, base, fields, fallback)
}

/// `has(base.f1) && has(base.f1.f2) && ... ? base.f1.f2... : fallback`
///
/// The conjunction is left-deep with the shallowest prefix first so the
/// evaluator stops at the first missing step.
fn safe_traversal(
    mef: &mut MacroExprFactory<'_>,
    base: &Expr,
    fields: &[Expr],
    fallback: Expr,
) -> Result<Expr, MacroError> {
    if !fields.iter().all(|f| f.as_ident().is_some_and(is_simple_ident)) {
        return Err(mef.new_error("index field arguments must be simple identifiers"));
    }
    if fields.len() > mef.max_depth() {
        return Err(mef.new_error(format!(
            "index has {} fields, more than the nesting limit of {}",
            fields.len(),
            mef.max_depth()
        )));
    }

    let mut checks = Vec::with_capacity(fields.len());
    for depth in 1..=fields.len() {
        let prefix = mef.new_selects(base, &fields[..depth])?;
        checks.push(mef.new_has(prefix));
    }

    let check = fold_left(checks, |l, r| mef.new_binary(operators::LOGICAL_AND, l, r))
        .ok_or_else(|| mef.new_error("index requires at least 1 field"))?;
    let value = mef.new_selects(base, fields)?;
    Ok(mef.new_conditional(check, value, fallback))
}
