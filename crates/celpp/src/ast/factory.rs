use std::collections::BTreeMap;

use super::*;
use crate::error::Position;

/// Hands out node ids and remembers where each node came from.
#[derive(Debug)]
pub struct ExprFactory {
    next_id: i64,
    positions: BTreeMap<ExprId, Position>,
}

impl ExprFactory {
    pub fn new() -> Self {
        Self { next_id: 1, positions: BTreeMap::new() }
    }

    pub fn next_id(&mut self, pos: Position) -> ExprId {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        self.positions.insert(id, pos);
        id
    }

    pub fn position(&self, id: ExprId) -> Option<Position> {
        self.positions.get(&id).copied()
    }

    pub fn ident(&mut self, pos: Position, name: impl Into<String>) -> Expr {
        Expr::new(self.next_id(pos), ExprKind::Ident(name.into()))
    }

    pub fn literal(&mut self, pos: Position, lit: impl Into<Literal>) -> Expr {
        Expr::new(self.next_id(pos), ExprKind::Literal(lit.into()))
    }

    pub fn null(&mut self, pos: Position) -> Expr {
        Expr::new(self.next_id(pos), ExprKind::Literal(Literal::Null))
    }

    pub fn select(&mut self, pos: Position, operand: Expr, field: impl Into<String>) -> Expr {
        let kind = ExprKind::Select(Select { operand: Box::new(operand), field: field.into() });
        Expr::new(self.next_id(pos), kind)
    }

    pub fn call(&mut self, pos: Position, function: impl Into<String>, args: Vec<Expr>) -> Expr {
        let kind = ExprKind::Call(Call { function: function.into(), target: None, args });
        Expr::new(self.next_id(pos), kind)
    }

    pub fn member_call(
        &mut self,
        pos: Position,
        function: impl Into<String>,
        target: Expr,
        args: Vec<Expr>,
    ) -> Expr {
        let target = Some(Box::new(target));
        let kind = ExprKind::Call(Call { function: function.into(), target, args });
        Expr::new(self.next_id(pos), kind)
    }

    pub fn list(&mut self, pos: Position, elements: Vec<Expr>) -> Expr {
        Expr::new(self.next_id(pos), ExprKind::List(elements))
    }

    pub fn map(&mut self, pos: Position, entries: Vec<MapEntry>) -> Expr {
        Expr::new(self.next_id(pos), ExprKind::Map(entries))
    }

    pub fn structure(
        &mut self,
        pos: Position,
        type_name: impl Into<String>,
        fields: Vec<StructField>,
    ) -> Expr {
        let kind = ExprKind::Struct(StructExpr { type_name: type_name.into(), fields });
        Expr::new(self.next_id(pos), kind)
    }

    /// Deep copy of `expr` in which every node gets a fresh id at its original position.
    pub fn copy(&mut self, expr: &Expr) -> Expr {
        let pos = self.position(expr.id).unwrap_or_default();
        let kind = match &expr.kind {
            ExprKind::Ident(name) => ExprKind::Ident(name.clone()),
            ExprKind::Literal(lit) => ExprKind::Literal(lit.clone()),
            ExprKind::Select(select) => ExprKind::Select(Select {
                operand: Box::new(self.copy(&select.operand)),
                field: select.field.clone(),
            }),
            ExprKind::Call(call) => ExprKind::Call(Call {
                function: call.function.clone(),
                target: call.target.as_ref().map(|t| Box::new(self.copy(t))),
                args: call.args.iter().map(|a| self.copy(a)).collect(),
            }),
            ExprKind::List(elements) => {
                ExprKind::List(elements.iter().map(|e| self.copy(e)).collect())
            }
            ExprKind::Map(entries) => ExprKind::Map(
                entries
                    .iter()
                    .map(|e| MapEntry { key: self.copy(&e.key), value: self.copy(&e.value) })
                    .collect(),
            ),
            ExprKind::Struct(message) => ExprKind::Struct(StructExpr {
                type_name: message.type_name.clone(),
                fields: message
                    .fields
                    .iter()
                    .map(|f| StructField { name: f.name.clone(), value: self.copy(&f.value) })
                    .collect(),
            }),
        };
        Expr::new(self.next_id(pos), kind)
    }

    pub fn into_positions(self) -> BTreeMap<ExprId, Position> {
        self.positions
    }
}

impl Default for ExprFactory {
    fn default() -> Self {
        Self::new()
    }
}
