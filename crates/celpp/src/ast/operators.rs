//! Internal function names of CEL operators and their textual properties.

pub const CONDITIONAL: &str = "_?_:_";
pub const LOGICAL_OR: &str = "_||_";
pub const LOGICAL_AND: &str = "_&&_";
pub const EQUALS: &str = "_==_";
pub const NOT_EQUALS: &str = "_!=_";
pub const LESS: &str = "_<_";
pub const LESS_EQUALS: &str = "_<=_";
pub const GREATER: &str = "_>_";
pub const GREATER_EQUALS: &str = "_>=_";
pub const IN: &str = "@in";
pub const ADD: &str = "_+_";
pub const SUBTRACT: &str = "_-_";
pub const MULTIPLY: &str = "_*_";
pub const DIVIDE: &str = "_/_";
pub const MODULO: &str = "_%_";
pub const LOGICAL_NOT: &str = "!_";
pub const NEGATE: &str = "-_";
pub const INDEX: &str = "_[_]";

// Ordinary functions the builtin macros expand into.
pub const HAS: &str = "has";
pub const SIZE: &str = "size";
pub const MAP: &str = "map";

/// Binding strength of an operator; larger binds looser, 0 means "not an operator".
pub fn precedence(function: &str) -> u8 {
    match function {
        CONDITIONAL => 8,
        LOGICAL_OR => 7,
        LOGICAL_AND => 6,
        EQUALS | NOT_EQUALS | LESS | LESS_EQUALS | GREATER | GREATER_EQUALS | IN => 5,
        ADD | SUBTRACT => 4,
        MULTIPLY | DIVIDE | MODULO => 3,
        LOGICAL_NOT | NEGATE => 2,
        INDEX => 1,
        _ => 0,
    }
}

/// Source spelling of an infix binary operator.
pub fn binary_display(function: &str) -> Option<&'static str> {
    let display = match function {
        LOGICAL_OR => "||",
        LOGICAL_AND => "&&",
        EQUALS => "==",
        NOT_EQUALS => "!=",
        LESS => "<",
        LESS_EQUALS => "<=",
        GREATER => ">",
        GREATER_EQUALS => ">=",
        IN => "in",
        ADD => "+",
        SUBTRACT => "-",
        MULTIPLY => "*",
        DIVIDE => "/",
        MODULO => "%",
        _ => return None,
    };
    Some(display)
}

/// Source spelling of a prefix unary operator.
pub fn unary_display(function: &str) -> Option<&'static str> {
    match function {
        LOGICAL_NOT => Some("!"),
        NEGATE => Some("-"),
        _ => None,
    }
}

/// Number of operands an operator takes, `None` for ordinary functions.
pub fn arity(function: &str) -> Option<usize> {
    if function == CONDITIONAL {
        Some(3)
    } else if function == INDEX || binary_display(function).is_some() {
        Some(2)
    } else if unary_display(function).is_some() {
        Some(1)
    } else {
        None
    }
}

/// Maps a binary operator token to its internal function name.
pub fn from_binary_display(op: &str) -> Option<&'static str> {
    let function = match op {
        "||" => LOGICAL_OR,
        "&&" => LOGICAL_AND,
        "==" => EQUALS,
        "!=" => NOT_EQUALS,
        "<" => LESS,
        "<=" => LESS_EQUALS,
        ">" => GREATER,
        ">=" => GREATER_EQUALS,
        "in" => IN,
        "+" => ADD,
        "-" => SUBTRACT,
        "*" => MULTIPLY,
        "/" => DIVIDE,
        "%" => MODULO,
        _ => return None,
    };
    Some(function)
}
