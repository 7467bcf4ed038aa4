use super::{Macro, MacroExprFactory};
use crate::ast::Expr;
use crate::error::MacroError;

/// `default(value, fallback)`: `value` when it is set, else `fallback`.
///
/// Expands to `has(value) ? value : fallback`.
pub const DEFAULT: Macro = Macro::global("default", 2, expand_default);

fn expand_default(mef: &mut MacroExprFactory<'_>, args: &[Expr]) -> Result<Expr, MacroError> {
    let [value, fallback] = args else {
        return Err(mef.new_error("default requires 2 args"));
    };
    let presence = mef.copy(value);
    let has = mef.new_has(presence);
    let value = mef.copy(value);
    let fallback = mef.copy(fallback);
    Ok(mef.new_conditional(has, value, fallback))
}
