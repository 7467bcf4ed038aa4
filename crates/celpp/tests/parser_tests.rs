use celpp::ast::{operators, ExprKind, Literal};
use celpp::{macros, parse, unparse, Issues, MacroRegistry, ParsedExpr, ParserOptions, Preprocessor};

fn parse_plain(input: &str) -> Result<ParsedExpr, Issues> {
    parse(input, &MacroRegistry::empty(), &ParserOptions::default())
}

fn canonical(input: &str) -> String {
    let parsed = parse_plain(input).unwrap();
    unparse(&parsed.expr).unwrap()
}

fn first_message(input: &str, options: &ParserOptions) -> String {
    let issues = parse(input, &MacroRegistry::empty(), options).unwrap_err();
    issues.issues()[0].message.clone()
}

#[test]
fn test_parse_ident() {
    let parsed = parse_plain("foo").unwrap();
    assert_eq!(parsed.expr.as_ident(), Some("foo"));
}

#[test]
fn test_parse_literals() {
    let lit = |input: &str| parse_plain(input).unwrap().expr.as_literal().cloned().unwrap();
    assert_eq!(lit("42"), Literal::Int(42));
    assert_eq!(lit("-42"), Literal::Int(-42));
    assert_eq!(lit("0x10"), Literal::Int(16));
    assert_eq!(lit("-0x10"), Literal::Int(-16));
    assert_eq!(lit("7u"), Literal::Uint(7));
    assert_eq!(lit("2.5"), Literal::Double(2.5));
    assert_eq!(lit("-.5"), Literal::Double(-0.5));
    assert_eq!(lit("true"), Literal::Bool(true));
    assert_eq!(lit("null"), Literal::Null);
    assert_eq!(lit(r#""a\nb""#), Literal::String("a\nb".to_string()));
    assert_eq!(lit(r"b'\x00a'"), Literal::Bytes(vec![0, b'a']));
}

#[test]
fn test_int_bounds() {
    let parsed = parse_plain("-9223372036854775808").unwrap();
    assert_eq!(parsed.expr.as_literal(), Some(&Literal::Int(i64::MIN)));

    let message = first_message("9223372036854775808", &ParserOptions::default());
    assert!(message.starts_with("invalid int literal"), "{message}");
}

#[test]
fn test_double_overflow_is_rejected() {
    let message = first_message("1e400", &ParserOptions::default());
    assert!(message.starts_with("invalid double literal"), "{message}");
}

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(canonical("a + b * c"), "a + b * c");
    assert_eq!(canonical("(a + b) * c"), "(a + b) * c");
    assert_eq!(canonical("a*b+c"), "a * b + c");
    assert_eq!(canonical("a % (b / c)"), "a % (b / c)");
}

#[test]
fn test_left_associativity() {
    assert_eq!(canonical("a - b - c"), "a - b - c");
    assert_eq!(canonical("a - (b - c)"), "a - (b - c)");

    let parsed = parse_plain("a - b - c").unwrap();
    let call = parsed.expr.as_call().unwrap();
    assert_eq!(call.function, operators::SUBTRACT);
    assert_eq!(call.args[1].as_ident(), Some("c"));
}

#[test]
fn test_logical_operators() {
    assert_eq!(canonical("a || b && c"), "a || b && c");
    assert_eq!(canonical("(a || b) && c"), "(a || b) && c");
    assert_eq!(canonical("a && b && c"), "a && b && c");
    assert_eq!(canonical("a && (b && c)"), "a && (b && c)");
    assert_eq!(canonical("a || (b || c) || d"), "a || (b || c) || d");
}

#[test]
fn test_nested_logical_runs_keep_their_shape() {
    for input in [
        "a && (b && c)",
        "(a && b && c) && d",
        "a && b && c && d",
        "(a && b) && ((c && d) && e)",
        "a || (b || (c || d))",
        "(a || b) && (c || (d || e))",
    ] {
        let first = parse_plain(input).unwrap();
        let text = unparse(&first.expr).unwrap();
        let second = parse_plain(&text).unwrap();
        assert_eq!(first.expr, second.expr, "{input} -> {text}");
    }
}

#[test]
fn test_logical_chain_is_balanced() {
    let parsed = parse_plain("a && b && c && d").unwrap();
    let root = parsed.expr.as_call().unwrap();
    assert_eq!(root.function, operators::LOGICAL_AND);
    for side in &root.args {
        let call = side.as_call().unwrap();
        assert_eq!(call.function, operators::LOGICAL_AND);
        assert!(call.args.iter().all(|arg| arg.as_ident().is_some()));
    }
}

#[test]
fn test_relations_and_membership() {
    assert_eq!(canonical("a < b == c"), "a < b == c");
    assert_eq!(canonical("x in [1, 2]"), "x in [1, 2]");
    assert_eq!(canonical("a + 1 >= b"), "a + 1 >= b");
}

#[test]
fn test_conditional() {
    assert_eq!(canonical("a ? b : c"), "a ? b : c");
    assert_eq!(canonical("a ? b : c ? d : e"), "a ? b : (c ? d : e)");
    assert_eq!(canonical("a || b ? c : d"), "(a || b) ? c : d");
}

#[test]
fn test_unary_runs() {
    assert_eq!(canonical("!a"), "!a");
    assert_eq!(canonical("!!a"), "a");
    assert_eq!(canonical("!!!a"), "!a");
    assert_eq!(canonical("--a"), "a");
    assert_eq!(canonical("-(a + b)"), "-(a + b)");
    assert_eq!(canonical("a - -1"), "a - -1");
}

#[test]
fn test_member_and_index() {
    assert_eq!(canonical("a.b.c(d)[0]"), "a.b.c(d)[0]");
    assert_eq!(canonical("a.f(b, c).d"), "a.f(b, c).d");
    assert_eq!(canonical("(a + b).c"), "(a + b).c");
    assert_eq!(canonical("(a ? b : c)[0]"), "(a ? b : c)[0]");
    assert_eq!(canonical("f()"), "f()");
}

#[test]
fn test_aggregates_allow_trailing_comma() {
    assert_eq!(canonical("[1, 2, 3,]"), "[1, 2, 3]");
    assert_eq!(canonical("{'a': 1, 'b': [],}"), r#"{"a": 1, "b": []}"#);
    assert_eq!(canonical("[]"), "[]");
    assert_eq!(canonical("{}"), "{}");
}

#[test]
fn test_message_construction() {
    let parsed = parse_plain("pkg.Msg{f: 1, g: 'x',}").unwrap();
    match &parsed.expr.kind {
        ExprKind::Struct(message) => {
            assert_eq!(message.type_name, "pkg.Msg");
            assert_eq!(message.fields.len(), 2);
        }
        other => panic!("Expected Struct, got {:?}", other),
    }
    assert_eq!(canonical("pkg.Msg{f: 1, g: 'x'}"), r#"pkg.Msg{f: 1, g: "x"}"#);
}

#[test]
fn test_leading_dot_identifier() {
    assert_eq!(canonical(".a.b"), ".a.b");
    assert_eq!(canonical(".f(x)"), ".f(x)");
}

#[test]
fn test_literal_rendering() {
    assert_eq!(canonical("1.0 + 2u"), "1.0 + 2u");
    assert_eq!(canonical("0x10"), "16");
    assert_eq!(canonical("b'ab'"), r#"b"\141\142""#);
    assert_eq!(canonical("'it\\'s'"), r#""it's""#);
    assert_eq!(canonical("1e-7"), "1e-07");
}

#[test]
fn test_comments_and_whitespace() {
    assert_eq!(canonical("a   +\n  b // done"), "a + b");
}

#[test]
fn test_positions_are_recorded() {
    let parsed = parse_plain("a + b").unwrap();
    let root = parsed.source_info.position(parsed.expr.id).unwrap();
    assert_eq!((root.line, root.column), (1, 3));

    let call = parsed.expr.as_call().unwrap();
    let rhs = parsed.source_info.position(call.args[1].id).unwrap();
    assert_eq!(rhs.column, 5);
}

#[test]
fn test_reserved_identifier() {
    let message = first_message("if + 1", &ParserOptions::default());
    assert_eq!(message, "reserved identifier: if");
}

#[test]
fn test_missing_operand() {
    let message = first_message("a +", &ParserOptions::default());
    assert_eq!(message, "expected expression, found end of input");
}

#[test]
fn test_trailing_tokens() {
    let message = first_message("a b", &ParserOptions::default());
    assert_eq!(message, "expected end of input, found 'b'");
}

#[test]
fn test_unbalanced_parens() {
    let message = first_message("(a + b", &ParserOptions::default());
    assert_eq!(message, "expected ')', found end of input");
}

#[test]
fn test_empty_input() {
    assert_eq!(first_message("", &ParserOptions::default()), "Empty input");
    assert_eq!(first_message("  // nothing", &ParserOptions::default()), "Empty input");
}

#[test]
fn test_lex_error_is_reported() {
    let issues = parse_plain("a # b").unwrap_err();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues.issues()[0].message, "unexpected character '#'");
    assert_eq!(issues.issues()[0].pos.map(|p| p.column), Some(3));
}

#[test]
fn test_recursion_limit_on_nesting() {
    let options = ParserOptions { max_recursion_depth: 5, ..ParserOptions::default() };
    let message = first_message("((((((((a))))))))", &options);
    assert!(message.contains("recursion limit"), "{message}");

    assert!(parse("((a))", &MacroRegistry::empty(), &options).is_ok());
}

#[test]
fn test_recursion_limit_on_operator_chains() {
    let options = ParserOptions { max_recursion_depth: 5, ..ParserOptions::default() };
    let message = first_message("a + b + c + d + e + f + g", &options);
    assert!(message.contains("recursion limit"), "{message}");

    let message = first_message("a.b.c.d.e.f.g", &options);
    assert!(message.contains("recursion limit"), "{message}");
}

#[test]
fn test_default_recursion_limit_through_preprocessor() {
    let pp = Preprocessor::new(macros::ALL.iter().copied()).unwrap();
    let limit = ParserOptions::default().max_recursion_depth;
    let nest = |levels: usize| format!("{}a{}", "(".repeat(levels), ")".repeat(levels));

    assert_eq!(pp.process(&nest(limit - 1)).unwrap(), "a");

    let err = pp.process(&nest(limit)).unwrap_err();
    assert!(err.to_string().contains("recursion limit exceeded"), "{err}");

    let calls = format!("{}a{}", "f(".repeat(limit - 1), ")".repeat(limit - 1));
    assert!(pp.process(&calls).is_ok());
    assert!(pp.process(&format!("[{calls}]")).is_err());
}

#[test]
fn test_expression_size_limit_counts_code_points() {
    let options = ParserOptions { expression_size_limit: 5, ..ParserOptions::default() };
    assert!(parse("'ééé'", &MacroRegistry::empty(), &options).is_ok());

    let message = first_message("'éééé'", &options);
    assert!(message.contains("exceeds the limit of 5"), "{message}");
}
