use super::{fold_left, Macro, MacroExprFactory};
use crate::ast::{operators, Expr};
use crate::error::MacroError;

/// `oneof(e1, e2, ...)`: at most one of the fields is set, like a protobuf oneof.
///
/// Expands to `(has(e1) ? 1 : 0) + (has(e2) ? 1 : 0) + ... <= 1`.
pub const ONEOF: Macro = Macro::global_var_arg("oneof", expand_oneof);

fn expand_oneof(mef: &mut MacroExprFactory<'_>, args: &[Expr]) -> Result<Expr, MacroError> {
    if args.len() < 2 {
        return Err(mef.new_error("oneof requires at least 2 args"));
    }
    // The sum nests one level per argument.
    if args.len() > mef.max_depth() {
        return Err(mef.new_error(format!(
            "oneof has {} args, more than the nesting limit of {}",
            args.len(),
            mef.max_depth()
        )));
    }

    let mut checks = Vec::with_capacity(args.len());
    for arg in args {
        let operand = mef.copy(arg);
        let has = mef.new_has(operand);
        let one = mef.new_int(1);
        let zero = mef.new_int(0);
        checks.push(mef.new_conditional(has, one, zero));
    }

    let sum = fold_left(checks, |l, r| mef.new_binary(operators::ADD, l, r))
        .ok_or_else(|| mef.new_error("oneof requires at least 2 args"))?;
    let limit = mef.new_int(1);
    Ok(mef.new_binary(operators::LESS_EQUALS, sum, limit))
}
