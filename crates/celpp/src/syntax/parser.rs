use std::collections::BTreeMap;

use crate::ast::*;
use crate::error::{Issue, Issues, MacroError, ParseError, Position, Result};
use crate::macros::{Macro, MacroExprFactory, MacroRegistry};
use crate::syntax::lexer::{Lexer, Token, TokenType};
use crate::syntax::unescape::unescape;
use crate::syntax::unparser::unparse;

/// Grammar limits and bookkeeping switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Deepest nesting of sub-expressions accepted before giving up.
    ///
    /// Every level costs stack in the recursive descent; the default stays
    /// within a 2 MiB thread stack in unoptimized builds.
    pub max_recursion_depth: usize,
    /// Largest accepted input, in code points.
    pub expression_size_limit: usize,
    /// Keep the original call of every macro expansion in `SourceInfo::macro_calls`.
    pub populate_macro_calls: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_recursion_depth: 64,
            expression_size_limit: 100_000,
            populate_macro_calls: false,
        }
    }
}

/// Parses `input`, expanding every call that matches a macro in `registry`.
///
/// Macro failures do not stop the parse: they are collected and returned
/// together with a syntax error, if one follows.
pub fn parse(
    input: &str,
    registry: &MacroRegistry,
    options: &ParserOptions,
) -> std::result::Result<ParsedExpr, Issues> {
    let fail = |err: ParseError| Issues::new(input, vec![Issue::from(&err)]);

    let size = input.chars().count();
    if size > options.expression_size_limit {
        return Err(fail(ParseError::ExpressionTooLarge {
            size,
            limit: options.expression_size_limit,
        }));
    }

    let tokens = Lexer::new(input).tokenize().map_err(|err| fail(err.into()))?;
    let mut parser = Parser::new(tokens, registry, options.clone());
    let result = parser.parse();
    let mut issues = std::mem::take(&mut parser.issues);

    match result {
        Ok(expr) if issues.is_empty() => Ok(ParsedExpr::new(expr, parser.into_source_info())),
        Ok(_) => Err(Issues::new(input, issues)),
        Err(err) => {
            issues.push(Issue::from(&err));
            Err(Issues::new(input, issues))
        }
    }
}

pub struct Parser<'r> {
    tokens: Vec<Token>,
    current: usize,
    registry: &'r MacroRegistry,
    options: ParserOptions,
    factory: ExprFactory,
    depth: usize,
    issues: Vec<Issue>,
    macro_calls: BTreeMap<ExprId, Expr>,
}

impl<'r> Parser<'r> {
    pub fn new(tokens: Vec<Token>, registry: &'r MacroRegistry, options: ParserOptions) -> Self {
        Self {
            tokens,
            current: 0,
            registry,
            options,
            factory: ExprFactory::new(),
            depth: 0,
            issues: Vec::new(),
            macro_calls: BTreeMap::new(),
        }
    }

    /// Macro failures recorded so far.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_source_info(self) -> SourceInfo {
        SourceInfo { positions: self.factory.into_positions(), macro_calls: self.macro_calls }
    }

    pub fn parse(&mut self) -> Result<Expr> {
        if self.is_at_end() {
            return Err(ParseError::EmptyInput);
        }

        let expr = self.parse_expr()?;

        if !self.is_at_end() {
            let token = self.current_token()?;
            return Err(ParseError::Expected {
                expected: "end of input".to_string(),
                found: describe(token),
                pos: token.pos,
            });
        }

        Ok(expr)
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let depth = self.depth;
        self.enter()?;
        let result = self.parse_conditional();
        self.depth = depth;
        result
    }

    // e ? e1 : e2, right associative
    fn parse_conditional(&mut self) -> Result<Expr> {
        let condition = self.parse_or()?;

        let Some(question) = self.match_token(TokenType::Question) else {
            return Ok(condition);
        };
        let then = self.parse_or()?;
        self.expect(TokenType::Colon, "':'")?;
        let otherwise = self.parse_expr()?;

        let args = vec![condition, then, otherwise];
        Ok(self.factory.call(question.pos, operators::CONDITIONAL, args))
    }

    fn parse_or(&mut self) -> Result<Expr> {
        self.parse_balanced(TokenType::OrOr, operators::LOGICAL_OR, Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        self.parse_balanced(TokenType::AndAnd, operators::LOGICAL_AND, Self::parse_relation)
    }

    /// Parses a run of one associative logical operator into a balanced tree.
    fn parse_balanced(
        &mut self,
        op: TokenType,
        function: &str,
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut terms = vec![operand(self)?];
        let mut positions = Vec::new();

        while let Some(token) = self.match_token(op) {
            positions.push(token.pos);
            terms.push(operand(self)?);
        }

        if positions.is_empty() {
            return Ok(terms.remove(0));
        }
        let mut terms = terms.into_iter().map(Some).collect::<Vec<_>>();
        Ok(self.balance(function, &mut terms, &positions, 0, positions.len() - 1))
    }

    fn balance(
        &mut self,
        function: &str,
        terms: &mut [Option<Expr>],
        positions: &[Position],
        lo: usize,
        hi: usize,
    ) -> Expr {
        let mid = (lo + hi + 1) / 2;
        let left = if mid == lo {
            terms[mid].take()
        } else {
            Some(self.balance(function, terms, positions, lo, mid - 1))
        };
        let right = if mid == hi {
            terms[mid + 1].take()
        } else {
            Some(self.balance(function, terms, positions, mid + 1, hi))
        };
        // Every term slot is taken exactly once by the split above.
        let args = left.into_iter().chain(right).collect();
        self.factory.call(positions[mid], function, args)
    }

    fn parse_relation(&mut self) -> Result<Expr> {
        let mut expr = self.parse_additive()?;
        let depth = self.depth;

        while let Some((function, pos)) = self.match_operator(&[
            TokenType::Less,
            TokenType::LessEqual,
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::EqualEqual,
            TokenType::BangEqual,
            TokenType::In,
        ]) {
            self.enter()?;
            let rhs = self.parse_additive()?;
            expr = self.factory.call(pos, function, vec![expr, rhs]);
        }

        self.depth = depth;
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut expr = self.parse_multiplicative()?;
        let depth = self.depth;

        while let Some((function, pos)) = self.match_operator(&[TokenType::Plus, TokenType::Minus])
        {
            self.enter()?;
            let rhs = self.parse_multiplicative()?;
            expr = self.factory.call(pos, function, vec![expr, rhs]);
        }

        self.depth = depth;
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut expr = self.parse_unary()?;
        let depth = self.depth;

        while let Some((function, pos)) =
            self.match_operator(&[TokenType::Star, TokenType::Slash, TokenType::Percent])
        {
            self.enter()?;
            let rhs = self.parse_unary()?;
            expr = self.factory.call(pos, function, vec![expr, rhs]);
        }

        self.depth = depth;
        Ok(expr)
    }

    // Runs of '!' or '-' collapse: an even count cancels out.
    fn parse_unary(&mut self) -> Result<Expr> {
        let token = self.current_token()?.clone();

        let function = match token.typ {
            TokenType::Bang => operators::LOGICAL_NOT,
            TokenType::Minus if !self.starts_signed_number() => operators::NEGATE,
            _ => return self.parse_member(),
        };

        let mut count = 0;
        while self.check(token.typ) && !self.starts_signed_number() {
            self.advance();
            count += 1;
        }

        let operand = self.parse_member()?;
        if count % 2 == 0 {
            return Ok(operand);
        }
        Ok(self.factory.call(token.pos, function, vec![operand]))
    }

    fn parse_member(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        let depth = self.depth;

        loop {
            if let Some(dot) = self.match_token(TokenType::Dot) {
                self.enter()?;
                let field = self.expect(TokenType::Identifier, "field name")?;
                if let Some(open) = self.match_token(TokenType::LParen) {
                    let args = self.parse_args()?;
                    expr = self.receiver_call_or_macro(open.pos, field.lexeme, expr, args);
                } else {
                    expr = self.factory.select(dot.pos, expr, field.lexeme);
                }
            } else if let Some(open) = self.match_token(TokenType::LBracket) {
                self.enter()?;
                let index = self.parse_expr()?;
                self.expect(TokenType::RBracket, "']'")?;
                expr = self.factory.call(open.pos, operators::INDEX, vec![expr, index]);
            } else {
                break;
            }
        }

        self.depth = depth;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current_token()?.clone();

        match token.typ {
            TokenType::Identifier | TokenType::Dot => self.parse_ident_or_call(),
            TokenType::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenType::RParen, "')'")?;
                Ok(expr)
            }
            TokenType::LBracket => self.parse_list(),
            TokenType::LBrace => self.parse_map(),
            TokenType::Eof => Err(ParseError::Expected {
                expected: "expression".to_string(),
                found: describe(&token),
                pos: token.pos,
            }),
            _ => self.parse_literal(token),
        }
    }

    // Kept out of `parse_primary`, which sits on every level of nesting.
    #[inline(never)]
    fn parse_literal(&mut self, token: Token) -> Result<Expr> {
        match token.typ {
            TokenType::Minus if self.starts_signed_number() => {
                self.advance();
                let number = self.current_token()?.clone();
                self.advance();
                self.parse_number(&number, token.pos, true)
            }
            TokenType::Int | TokenType::Uint | TokenType::Double => {
                self.advance();
                self.parse_number(&token, token.pos, false)
            }
            TokenType::String => {
                self.advance();
                let bytes = self.decode(&token, "string")?;
                let value = String::from_utf8(bytes).map_err(|err| ParseError::InvalidLiteral {
                    kind: "string",
                    lexeme: token.lexeme.clone(),
                    reason: err.to_string(),
                    pos: token.pos,
                })?;
                Ok(self.factory.literal(token.pos, Literal::String(value)))
            }
            TokenType::Bytes => {
                self.advance();
                let bytes = self.decode(&token, "bytes")?;
                Ok(self.factory.literal(token.pos, Literal::Bytes(bytes)))
            }
            TokenType::True | TokenType::False => {
                self.advance();
                Ok(self.factory.literal(token.pos, Literal::Bool(token.typ == TokenType::True)))
            }
            TokenType::Null => {
                self.advance();
                Ok(self.factory.null(token.pos))
            }
            _ => Err(ParseError::UnexpectedToken { token: token.lexeme, pos: token.pos }),
        }
    }

    fn parse_ident_or_call(&mut self) -> Result<Expr> {
        let leading_dot = self.match_token(TokenType::Dot);
        let ident = self.expect(TokenType::Identifier, "identifier")?;
        let pos = leading_dot.as_ref().map_or(ident.pos, |dot| dot.pos);

        if is_reserved(&ident.lexeme) {
            return Err(ParseError::ReservedIdentifier { name: ident.lexeme, pos: ident.pos });
        }

        let mut name = match leading_dot {
            Some(_) => format!(".{}", ident.lexeme),
            None => ident.lexeme,
        };

        if let Some(open) = self.match_token(TokenType::LParen) {
            let args = self.parse_args()?;
            return Ok(self.global_call_or_macro(open.pos, name, args));
        }

        if self.starts_message() {
            while self.match_token(TokenType::Dot).is_some() {
                let part = self.expect(TokenType::Identifier, "identifier")?;
                name.push('.');
                name.push_str(&part.lexeme);
            }
            return self.parse_message(name);
        }

        Ok(self.factory.ident(pos, name))
    }

    // Arguments after an already consumed '('
    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();

        if self.match_token(TokenType::RParen).is_some() {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expr()?);
            if self.match_token(TokenType::Comma).is_none() {
                break;
            }
        }

        self.expect(TokenType::RParen, "')'")?;
        Ok(args)
    }

    fn parse_list(&mut self) -> Result<Expr> {
        let open = self.expect(TokenType::LBracket, "'['")?;
        let mut elements = Vec::new();

        while !self.check(TokenType::RBracket) {
            elements.push(self.parse_expr()?);
            if self.match_token(TokenType::Comma).is_none() {
                break;
            }
        }

        self.expect(TokenType::RBracket, "']'")?;
        Ok(self.factory.list(open.pos, elements))
    }

    fn parse_map(&mut self) -> Result<Expr> {
        let open = self.expect(TokenType::LBrace, "'{'")?;
        let mut entries = Vec::new();

        while !self.check(TokenType::RBrace) {
            let key = self.parse_expr()?;
            self.expect(TokenType::Colon, "':'")?;
            let value = self.parse_expr()?;
            entries.push(MapEntry { key, value });
            if self.match_token(TokenType::Comma).is_none() {
                break;
            }
        }

        self.expect(TokenType::RBrace, "'}'")?;
        Ok(self.factory.map(open.pos, entries))
    }

    fn parse_message(&mut self, type_name: String) -> Result<Expr> {
        let open = self.expect(TokenType::LBrace, "'{'")?;
        let mut fields = Vec::new();

        while !self.check(TokenType::RBrace) {
            let name = self.expect(TokenType::Identifier, "field name")?;
            self.expect(TokenType::Colon, "':'")?;
            let value = self.parse_expr()?;
            fields.push(StructField { name: name.lexeme, value });
            if self.match_token(TokenType::Comma).is_none() {
                break;
            }
        }

        self.expect(TokenType::RBrace, "'}'")?;
        Ok(self.factory.structure(open.pos, type_name, fields))
    }

    fn parse_number(&mut self, token: &Token, pos: Position, negative: bool) -> Result<Expr> {
        let sign = if negative { "-" } else { "" };
        let invalid = |kind: &'static str, reason: String| ParseError::InvalidLiteral {
            kind,
            lexeme: format!("{sign}{}", token.lexeme),
            reason,
            pos,
        };

        let literal = match token.typ {
            TokenType::Int => {
                let (digits, radix) = split_radix(&token.lexeme);
                let value = i64::from_str_radix(&format!("{sign}{digits}"), radix)
                    .map_err(|err| invalid("int", err.to_string()))?;
                Literal::Int(value)
            }
            TokenType::Uint => {
                let trimmed = token.lexeme.trim_end_matches(['u', 'U']);
                let (digits, radix) = split_radix(trimmed);
                let value = u64::from_str_radix(digits, radix)
                    .map_err(|err| invalid("uint", err.to_string()))?;
                Literal::Uint(value)
            }
            _ => {
                let value = format!("{sign}{}", token.lexeme)
                    .parse::<f64>()
                    .map_err(|err| invalid("double", err.to_string()))?;
                if !value.is_finite() {
                    return Err(invalid("double", "value out of range".to_string()));
                }
                Literal::Double(value)
            }
        };

        Ok(self.factory.literal(pos, literal))
    }

    fn decode(&self, token: &Token, kind: &'static str) -> Result<Vec<u8>> {
        unescape(&token.lexeme).map_err(|reason| ParseError::InvalidLiteral {
            kind,
            lexeme: token.lexeme.clone(),
            reason,
            pos: token.pos,
        })
    }

    fn global_call_or_macro(&mut self, pos: Position, function: String, args: Vec<Expr>) -> Expr {
        match self.registry.find_global(&function, args.len()).copied() {
            Some(mac) => self.expand_macro(mac, pos, function, None, args),
            None => {
                log::trace!("call {}/{} at {} is not a macro", function, args.len(), pos);
                self.factory.call(pos, function, args)
            }
        }
    }

    fn receiver_call_or_macro(
        &mut self,
        pos: Position,
        function: String,
        target: Expr,
        args: Vec<Expr>,
    ) -> Expr {
        match self.registry.find_receiver(&function).copied() {
            Some(mac) => self.expand_macro(mac, pos, function, Some(target), args),
            None => {
                log::trace!("member call {} at {} is not a macro", function, pos);
                self.factory.member_call(pos, function, target, args)
            }
        }
    }

    /// Replaces the call with the macro's expansion. On failure the issue is
    /// recorded and the call is kept as written so parsing can continue.
    fn expand_macro(
        &mut self,
        mac: Macro,
        pos: Position,
        function: String,
        target: Option<Expr>,
        args: Vec<Expr>,
    ) -> Expr {
        let call_id = self.factory.next_id(pos);
        let limit = self.options.max_recursion_depth;
        let result = {
            let budget = limit.saturating_sub(self.depth);
            let mut mef = MacroExprFactory::new(&mut self.factory, call_id, pos, budget);
            mac.expand(&mut mef, target.as_ref(), &args)
        };
        // Nested expansions can each stay within budget and still add up.
        let result = result.and_then(|expanded| {
            let depth = expanded.depth();
            if self.depth + depth > limit {
                return Err(MacroError::new(
                    call_id,
                    format!(
                        "{} expansion nests {} levels, deeper than the recursion limit of {}",
                        mac.name(),
                        depth,
                        limit
                    ),
                ));
            }
            Ok(expanded)
        });
        let call = Expr::new(
            call_id,
            ExprKind::Call(Call { function, target: target.map(Box::new), args }),
        );

        match result {
            Ok(expanded) => {
                if log::log_enabled!(log::Level::Debug) {
                    let text = unparse(&expanded).unwrap_or_else(|err| format!("<{err}>"));
                    log::debug!("expanded {} at {}: {}", mac.key(), pos, text);
                }
                if self.options.populate_macro_calls {
                    self.macro_calls.insert(expanded.id, call);
                }
                expanded
            }
            Err(err) => {
                log::debug!("macro {} failed at {}: {}", mac.key(), pos, err);
                let at = self.factory.position(err.id).unwrap_or(pos);
                self.issues.push(Issue::new(err.message, Some(at)));
                call
            }
        }
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= self.options.max_recursion_depth {
            let pos = self.current_token()?.pos;
            return Err(ParseError::RecursionLimit { limit: self.options.max_recursion_depth, pos });
        }
        self.depth += 1;
        Ok(())
    }

    // '-' directly followed by a numeric literal folds into a signed literal.
    fn starts_signed_number(&self) -> bool {
        self.check(TokenType::Minus)
            && matches!(self.peek_type(1), Some(TokenType::Int) | Some(TokenType::Double))
    }

    // ident ('.' ident)* '{' starts a message construction.
    fn starts_message(&self) -> bool {
        let mut distance = 0;
        while self.peek_type(distance) == Some(TokenType::Dot)
            && self.peek_type(distance + 1) == Some(TokenType::Identifier)
        {
            distance += 2;
        }
        self.peek_type(distance) == Some(TokenType::LBrace)
    }

    fn match_operator(&mut self, types: &[TokenType]) -> Option<(&'static str, Position)> {
        let token = self.current_token().ok()?;
        if !types.contains(&token.typ) {
            return None;
        }
        let function = operators::from_binary_display(&token.lexeme)?;
        let pos = token.pos;
        self.advance();
        Some((function, pos))
    }

    fn match_token(&mut self, typ: TokenType) -> Option<Token> {
        if self.check(typ) {
            let token = self.current_token().ok()?.clone();
            self.advance();
            Some(token)
        } else {
            None
        }
    }

    fn expect(&mut self, typ: TokenType, expected: &str) -> Result<Token> {
        if let Some(token) = self.match_token(typ) {
            return Ok(token);
        }
        let token = self.current_token()?;
        Err(ParseError::Expected {
            expected: expected.to_string(),
            found: describe(token),
            pos: token.pos,
        })
    }

    fn current_token(&self) -> Result<&Token> {
        self.tokens.get(self.current).ok_or(ParseError::EmptyInput)
    }

    fn peek_type(&self, distance: usize) -> Option<TokenType> {
        self.tokens.get(self.current + distance).map(|token| token.typ)
    }

    fn check(&self, typ: TokenType) -> bool {
        self.peek_type(0) == Some(typ)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Ok(token) if token.typ == TokenType::Eof)
            || self.current >= self.tokens.len()
    }
}

fn describe(token: &Token) -> String {
    match token.typ {
        TokenType::Eof => "end of input".to_string(),
        _ => format!("'{}'", token.lexeme),
    }
}

fn split_radix(lexeme: &str) -> (&str, u32) {
    match lexeme.strip_prefix("0x").or_else(|| lexeme.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (lexeme, 10),
    }
}
