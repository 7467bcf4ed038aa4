//! Parse-time macros.
//!
//! A [`Macro`] is bound to one call shape and name. The parser consults a
//! [`MacroRegistry`] each time it reduces a call expression and, on a match,
//! replaces the call with whatever the macro's expander builds.
//!
//! Macro sets are plain values: build a registry from any list of macros, or
//! from one of the bundles [`ALL`] and [`ALL_WITH_INDEX_FALLBACK`].

mod default;
pub mod factory;
mod index;
mod oneof;
mod registry;
mod unroll_map;

use std::fmt;

pub use default::DEFAULT;
pub use factory::MacroExprFactory;
pub use index::{INDEX_OR_NULL, INDEX_WITH_FALLBACK};
pub use oneof::ONEOF;
pub use registry::MacroRegistry;
pub use unroll_map::{UNROLL_MAP, UNROLL_MAP_LIMIT};

use crate::ast::Expr;
use crate::error::MacroError;

/// Builtin macros with the null-fallback `index`.
pub const ALL: &[Macro] = &[DEFAULT, ONEOF, INDEX_OR_NULL, UNROLL_MAP];

/// Builtin macros with the caller-supplied-fallback `index`.
pub const ALL_WITH_INDEX_FALLBACK: &[Macro] = &[DEFAULT, ONEOF, INDEX_WITH_FALLBACK, UNROLL_MAP];

/// Expander of a global macro: `name(args...)`.
pub type GlobalExpander = fn(&mut MacroExprFactory<'_>, &[Expr]) -> Result<Expr, MacroError>;

/// Expander of a receiver macro: `target.name(args...)`.
pub type ReceiverExpander =
    fn(&mut MacroExprFactory<'_>, &Expr, &[Expr]) -> Result<Expr, MacroError>;

/// A macro and the call shape it answers to.
#[derive(Clone, Copy)]
pub enum Macro {
    /// `name(a1, ..., an)` with exactly `arity` arguments.
    GlobalFixed { name: &'static str, arity: usize, expand: GlobalExpander },
    /// `name(a1, ...)` with any number of arguments.
    GlobalVarArg { name: &'static str, expand: GlobalExpander },
    /// `target.name(a1, ...)` with any number of arguments.
    ReceiverVarArg { name: &'static str, expand: ReceiverExpander },
}

impl Macro {
    pub const fn global(name: &'static str, arity: usize, expand: GlobalExpander) -> Self {
        Macro::GlobalFixed { name, arity, expand }
    }

    pub const fn global_var_arg(name: &'static str, expand: GlobalExpander) -> Self {
        Macro::GlobalVarArg { name, expand }
    }

    pub const fn receiver_var_arg(name: &'static str, expand: ReceiverExpander) -> Self {
        Macro::ReceiverVarArg { name, expand }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Macro::GlobalFixed { name, .. }
            | Macro::GlobalVarArg { name, .. }
            | Macro::ReceiverVarArg { name, .. } => name,
        }
    }

    pub fn key(&self) -> MacroKey {
        match *self {
            Macro::GlobalFixed { name, arity, .. } => MacroKey::GlobalFixed(name, arity),
            Macro::GlobalVarArg { name, .. } => MacroKey::GlobalVarArg(name),
            Macro::ReceiverVarArg { name, .. } => MacroKey::ReceiverVarArg(name),
        }
    }

    /// Runs the expander. `target` is only consulted by receiver macros.
    pub fn expand(
        &self,
        mef: &mut MacroExprFactory<'_>,
        target: Option<&Expr>,
        args: &[Expr],
    ) -> Result<Expr, MacroError> {
        match (self, target) {
            (Macro::GlobalFixed { expand, .. } | Macro::GlobalVarArg { expand, .. }, _) => {
                expand(mef, args)
            }
            (Macro::ReceiverVarArg { expand, .. }, Some(target)) => expand(mef, target, args),
            (Macro::ReceiverVarArg { name, .. }, None) => {
                Err(mef.new_error(format!("{name} must be called on a receiver")))
            }
        }
    }
}

impl fmt::Debug for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Macro").field(&self.key()).finish()
    }
}

/// Registry key of a macro: its shape and name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroKey {
    GlobalFixed(&'static str, usize),
    GlobalVarArg(&'static str),
    ReceiverVarArg(&'static str),
}

impl fmt::Display for MacroKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroKey::GlobalFixed(name, arity) => write!(f, "{name}:{arity}:false"),
            MacroKey::GlobalVarArg(name) => write!(f, "{name}:*:false"),
            MacroKey::ReceiverVarArg(name) => write!(f, "{name}:*:true"),
        }
    }
}

/// Folds a non-empty sequence from the left, seeding with the first element.
///
/// Returns `None` for an empty sequence.
pub fn fold_left<T>(
    items: impl IntoIterator<Item = T>,
    mut combine: impl FnMut(T, T) -> T,
) -> Option<T> {
    let mut items = items.into_iter();
    let first = items.next()?;
    Some(items.fold(first, |acc, item| combine(acc, item)))
}
