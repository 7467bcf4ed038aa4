use super::*;

/// Node identity. Assigned by the factory and used only to attribute
/// diagnostics and positions, never for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExprId(pub i64);

/// Expression
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

/// Expression kind
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident(String),
    Literal(Literal),
    Select(Select),
    Call(Call),
    List(Vec<Expr>),
    Map(Vec<MapEntry>),
    Struct(StructExpr),
}

/// Field access `operand.field`
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub operand: Box<Expr>,
    pub field: String,
}

/// Function, method or operator call
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub function: String,
    pub target: Option<Box<Expr>>,
    pub args: Vec<Expr>,
}

impl Call {
    pub fn is_member(&self) -> bool {
        self.target.is_some()
    }
}

/// `key: value` entry of a map literal
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: Expr,
    pub value: Expr,
}

/// Message construction `pkg.Type{field: value}`
#[derive(Debug, Clone, PartialEq)]
pub struct StructExpr {
    pub type_name: String,
    pub fields: Vec<StructField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub value: Expr,
}

impl Expr {
    pub fn new(id: ExprId, kind: ExprKind) -> Self {
        Self { id, kind }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.kind {
            ExprKind::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match &self.kind {
            ExprKind::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_select(&self) -> Option<&Select> {
        match &self.kind {
            ExprKind::Select(select) => Some(select),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Expr]> {
        match &self.kind {
            ExprKind::List(elements) => Some(elements),
            _ => None,
        }
    }

    /// Number of nodes on the longest path from this node down to a leaf.
    ///
    /// Iterative, so it is safe to call on trees of any depth.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((expr, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(expr.children().into_iter().map(|child| (child, depth + 1)));
        }
        deepest
    }

    fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Ident(_) | ExprKind::Literal(_) => Vec::new(),
            ExprKind::Select(select) => vec![select.operand.as_ref()],
            ExprKind::Call(call) => call.target.iter().map(|t| &**t).chain(&call.args).collect(),
            ExprKind::List(elements) => elements.iter().collect(),
            ExprKind::Map(entries) => {
                entries.iter().flat_map(|entry| [&entry.key, &entry.value]).collect()
            }
            ExprKind::Struct(message) => message.fields.iter().map(|f| &f.value).collect(),
        }
    }

    /// Calls `visit` on this node and then on every descendant, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match &self.kind {
            ExprKind::Ident(_) | ExprKind::Literal(_) => {}
            ExprKind::Select(select) => select.operand.walk(visit),
            ExprKind::Call(call) => {
                if let Some(target) = &call.target {
                    target.walk(visit);
                }
                for arg in &call.args {
                    arg.walk(visit);
                }
            }
            ExprKind::List(elements) => {
                for element in elements {
                    element.walk(visit);
                }
            }
            ExprKind::Map(entries) => {
                for entry in entries {
                    entry.key.walk(visit);
                    entry.value.walk(visit);
                }
            }
            ExprKind::Struct(message) => {
                for field in &message.fields {
                    field.value.walk(visit);
                }
            }
        }
    }
}

/// Whether `name` is a plain CEL identifier: `[_a-zA-Z][_a-zA-Z0-9]*` and not reserved.
pub fn is_simple_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric()) && !is_reserved(name)
}

/// Words the grammar refuses as identifiers.
pub fn is_reserved(name: &str) -> bool {
    matches!(
        name,
        "as" | "break"
            | "const"
            | "continue"
            | "else"
            | "false"
            | "for"
            | "function"
            | "if"
            | "import"
            | "in"
            | "let"
            | "loop"
            | "package"
            | "namespace"
            | "null"
            | "return"
            | "true"
            | "var"
            | "void"
            | "while"
    )
}
