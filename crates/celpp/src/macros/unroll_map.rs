use super::{Macro, MacroExprFactory};
use crate::ast::{is_simple_ident, operators, Expr};
use crate::error::MacroError;

/// Largest `count` accepted by `unrollmap`.
pub const UNROLL_MAP_LIMIT: u64 = 10_000;

/// `base.unrollmap(zero, count, x, body)`: a `map` unrolled into a list of
/// exactly `count` elements, for evaluators whose cost estimation cannot
/// bound an ordinary `base.map(x, body)`.
///
/// Element `n` is `size(base) > n ? [base[n]].map(x, body)[0] : zero`, so a
/// shorter `base` pads the tail with `zero`.
pub const UNROLL_MAP: Macro = Macro::receiver_var_arg("unrollmap", expand_unroll_map);

fn expand_unroll_map(
    mef: &mut MacroExprFactory<'_>,
    base: &Expr,
    args: &[Expr],
) -> Result<Expr, MacroError> {
    let [zero, count, var, body] = args else {
        return Err(mef.new_error("unrollmap requires 4 args"));
    };

    let count = count
        .as_literal()
        .and_then(|lit| lit.as_count())
        .ok_or_else(|| mef.new_error("unrollmap count must be a non-negative integer literal"))?;
    if count > UNROLL_MAP_LIMIT {
        return Err(mef.new_error(format!("unrollmap count must not exceed {UNROLL_MAP_LIMIT}")));
    }
    if !var.as_ident().is_some_and(is_simple_ident) {
        return Err(mef.new_error("unrollmap variable must be a simple identifier"));
    }

    let count = count as i64;
    let mut items = Vec::with_capacity(count as usize);
    for n in 0..count {
        let sized = mef.copy(base);
        let size = mef.new_call(operators::SIZE, vec![sized]);
        let bound = mef.new_int(n);
        let size_check = mef.new_binary(operators::GREATER, size, bound);

        let element = mef.copy(base);
        let position = mef.new_int(n);
        let indexed = mef.new_binary(operators::INDEX, element, position);
        let single = mef.new_list(vec![indexed]);
        let var = mef.copy(var);
        let body = mef.copy(body);
        let mapped = mef.new_member_call(operators::MAP, single, vec![var, body]);
        let first = mef.new_int(0);
        let value = mef.new_binary(operators::INDEX, mapped, first);

        let zero = mef.copy(zero);
        items.push(mef.new_conditional(size_check, value, zero));
    }

    Ok(mef.new_list(items))
}
