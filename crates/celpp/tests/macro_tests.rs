use std::collections::HashSet;

use celpp::ast::Expr;
use celpp::macros::{self, MacroExprFactory};
use celpp::{unparse, Error, Macro, MacroError, ParserOptions, Preprocessor};

fn all() -> Preprocessor {
    Preprocessor::new(macros::ALL.iter().copied()).unwrap()
}

fn with_fallback() -> Preprocessor {
    Preprocessor::new(macros::ALL_WITH_INDEX_FALLBACK.iter().copied()).unwrap()
}

fn issue_messages(err: Error) -> Vec<String> {
    match err {
        Error::Parse(issues) => issues.iter().map(|issue| issue.message.clone()).collect(),
        other => panic!("Expected Parse error, got {:?}", other),
    }
}

fn expand_error(pp: &Preprocessor, input: &str) -> String {
    let messages = issue_messages(pp.process(input).unwrap_err());
    assert_eq!(messages.len(), 1, "{messages:?}");
    messages[0].clone()
}

#[test]
fn test_default() {
    assert_eq!(
        all().process(r#"default(self.x, "DEF")"#).unwrap(),
        r#"has(self.x) ? self.x : "DEF""#
    );
}

#[test]
fn test_default_parenthesizes_complex_fallback() {
    assert_eq!(
        all().process("default(self.x, a + b)").unwrap(),
        "has(self.x) ? self.x : (a + b)"
    );
}

#[test]
fn test_default_with_wrong_arity_is_left_alone() {
    assert_eq!(all().process("default(self.x)").unwrap(), "default(self.x)");
    assert_eq!(all().process("default(a, b, c)").unwrap(), "default(a, b, c)");
    assert_eq!(all().process("self.default(a, b)").unwrap(), "self.default(a, b)");
}

#[test]
fn test_oneof() {
    assert_eq!(
        all().process("oneof(self.x, self.y, self.z)").unwrap(),
        "(has(self.x) ? 1 : 0) + (has(self.y) ? 1 : 0) + (has(self.z) ? 1 : 0) <= 1"
    );
    assert_eq!(
        all().process("oneof(self.a, self.b)").unwrap(),
        "(has(self.a) ? 1 : 0) + (has(self.b) ? 1 : 0) <= 1"
    );
}

#[test]
fn test_oneof_requires_two_args() {
    assert_eq!(expand_error(&all(), "oneof(self.a)"), "oneof requires at least 2 args");
    assert_eq!(expand_error(&all(), "oneof()"), "oneof requires at least 2 args");
}

#[test]
fn test_index_single_field() {
    assert_eq!(all().process("self.index(x)").unwrap(), "has(self.x) ? self.x : null");
}

#[test]
fn test_index_path() {
    assert_eq!(
        all().process("self.index(x, z, b)").unwrap(),
        "(has(self.x) && has(self.x.z) && has(self.x.z.b)) ? self.x.z.b : null"
    );
}

#[test]
fn test_index_errors() {
    assert_eq!(expand_error(&all(), "self.index()"), "index requires at least 1 arg");
    assert_eq!(
        expand_error(&all(), "self.index(x.y)"),
        "index field arguments must be simple identifiers"
    );
    assert_eq!(
        expand_error(&all(), "self.index(x, 'y')"),
        "index field arguments must be simple identifiers"
    );
}

#[test]
fn test_index_with_fallback() {
    assert_eq!(
        with_fallback().process("self.index({}, x, z)").unwrap(),
        "(has(self.x) && has(self.x.z)) ? self.x.z : {}"
    );
    assert_eq!(
        with_fallback().process("self.index(0, count)").unwrap(),
        "has(self.count) ? self.count : 0"
    );
    assert_eq!(
        expand_error(&with_fallback(), "self.index({})"),
        "index requires at least 2 args"
    );
}

#[test]
fn test_index_on_a_call_receiver() {
    assert_eq!(
        all().process("get().index(a)").unwrap(),
        "has(get().a) ? get().a : null"
    );
}

#[test]
fn test_unrollmap() {
    assert_eq!(
        all().process("self.items.unrollmap(0, 2, x, x * 2)").unwrap(),
        "[(size(self.items) > 0) ? ([self.items[0]].map(x, x * 2)[0]) : 0, \
         (size(self.items) > 1) ? ([self.items[1]].map(x, x * 2)[0]) : 0]"
    );
}

#[test]
fn test_unrollmap_zero_count() {
    assert_eq!(all().process("self.items.unrollmap(0, 0, x, x)").unwrap(), "[]");
}

#[test]
fn test_unrollmap_accepts_uint_count() {
    let parsed = all().process_to_ast("l.unrollmap('', 3u, s, s + '!')").unwrap();
    assert_eq!(parsed.expr.as_list().map(|items| items.len()), Some(3));
}

#[test]
fn test_unrollmap_errors() {
    let pp = all();
    assert_eq!(expand_error(&pp, "l.unrollmap(0, 1, v)"), "unrollmap requires 4 args");
    assert_eq!(
        expand_error(&pp, "l.unrollmap(0, n, v, v)"),
        "unrollmap count must be a non-negative integer literal"
    );
    assert_eq!(
        expand_error(&pp, "l.unrollmap(0, -1, v, v)"),
        "unrollmap count must be a non-negative integer literal"
    );
    assert_eq!(
        expand_error(&pp, "l.unrollmap(0, 1.5, v, v)"),
        "unrollmap count must be a non-negative integer literal"
    );
    assert_eq!(
        expand_error(&pp, "l.unrollmap(0, 10001, v, v)"),
        "unrollmap count must not exceed 10000"
    );
    assert_eq!(
        expand_error(&pp, "l.unrollmap(0, 1, v.w, v)"),
        "unrollmap variable must be a simple identifier"
    );
}

#[test]
fn test_unrollmap_at_limit() {
    let parsed = all().process_to_ast("l.unrollmap(0, 10000, v, v)").unwrap();
    assert_eq!(parsed.expr.as_list().map(|items| items.len()), Some(10_000));
}

#[test]
fn test_macros_inside_aggregates() {
    assert_eq!(
        all().process("[default(self.a, 1), default(self.b, 2)]").unwrap(),
        "[has(self.a) ? self.a : 1, has(self.b) ? self.b : 2]"
    );
}

#[test]
fn test_nested_macros_expand_inside_out() {
    assert_eq!(
        all().process("default(self.a, default(self.b, 0))").unwrap(),
        "has(self.a) ? self.a : (has(self.b) ? self.b : 0)"
    );
}

#[test]
fn test_oneof_argument_count_is_bounded_by_nesting() {
    let input = format!("oneof({})", vec!["a"; 2000].join(", "));
    let message = expand_error(&all(), &input);
    assert!(message.starts_with("oneof has 2000 args"), "{message}");
    assert!(message.contains("more than the nesting limit"), "{message}");

    let input = format!("oneof({})", vec!["self.a"; 40].join(", "));
    assert!(all().process(&input).is_ok());
}

#[test]
fn test_index_field_count_is_bounded_by_nesting() {
    let fields: Vec<String> = (0..2000).map(|i| format!("f{i}")).collect();
    let message = expand_error(&all(), &format!("self.index({})", fields.join(", ")));
    assert!(message.starts_with("index has 2000 fields"), "{message}");

    let message =
        expand_error(&with_fallback(), &format!("self.index(0, {})", fields.join(", ")));
    assert!(message.starts_with("index has 2000 fields"), "{message}");
}

#[test]
fn test_expansion_depth_is_checked_against_recursion_limit() {
    let limit = ParserOptions::default().max_recursion_depth;

    let input = format!("oneof({})", vec!["a"; 62].join(", "));
    let message = expand_error(&all(), &input);
    assert!(message.ends_with(&format!("deeper than the recursion limit of {limit}")), "{message}");

    let inner = format!("oneof({})", vec!["a"; 30].join(", "));
    let outer = format!("oneof({inner}, {})", vec!["a"; 29].join(", "));
    let message = expand_error(&all(), &outer);
    assert!(message.starts_with("oneof expansion nests"), "{message}");
}

fn expand_size(mef: &mut MacroExprFactory<'_>, _args: &[Expr]) -> Result<Expr, MacroError> {
    Ok(mef.new_int(42))
}

#[test]
fn test_expansion_output_is_not_rescanned() {
    let size = Macro::global("size", 1, expand_size);
    let pp = Preprocessor::new([size, macros::UNROLL_MAP]).unwrap();

    assert_eq!(
        pp.process("size(self.items) + self.items.unrollmap(0, 1, x, x)").unwrap(),
        "42 + [(size(self.items) > 0) ? ([self.items[0]].map(x, x)[0]) : 0]"
    );
}

#[test]
fn test_disabled_macros_are_plain_calls() {
    let pp = Preprocessor::new([macros::DEFAULT]).unwrap();
    assert_eq!(pp.process("oneof(a, b)").unwrap(), "oneof(a, b)");
    assert_eq!(pp.process("self.index(x)").unwrap(), "self.index(x)");
}

#[test]
fn test_error_is_positioned_at_the_call() {
    let err = all().process("a + oneof(self.a)").unwrap_err();
    match err {
        Error::Parse(issues) => {
            let pos = issues.issues()[0].pos.unwrap();
            assert_eq!((pos.line, pos.column), (1, 10));
        }
        other => panic!("Expected Parse error, got {:?}", other),
    }
}

#[test]
fn test_macro_errors_are_collected() {
    let messages = issue_messages(all().process("oneof(self.a) || self.index()").unwrap_err());
    assert_eq!(messages, vec![
        "oneof requires at least 2 args".to_string(),
        "index requires at least 1 arg".to_string(),
    ]);
}

#[test]
fn test_macro_errors_precede_syntax_error() {
    let messages = issue_messages(all().process("oneof(self.a) + ").unwrap_err());
    assert_eq!(messages, vec![
        "oneof requires at least 2 args".to_string(),
        "expected expression, found end of input".to_string(),
    ]);
}

#[test]
fn test_expanded_nodes_have_unique_ids() {
    let parsed = all().process_to_ast("self.index(a, b, c) || oneof(self.x, self.y)").unwrap();
    let mut seen = HashSet::new();
    parsed.expr.walk(&mut |node| assert!(seen.insert(node.id), "duplicate id {:?}", node.id));
}

#[test]
fn test_expanded_nodes_are_positioned() {
    let parsed = all().process_to_ast("default(self.x, 1)").unwrap();
    let root = parsed.source_info.position(parsed.expr.id).unwrap();
    assert_eq!(root.column, 8);

    let mut missing = 0;
    parsed.expr.walk(&mut |node| {
        if parsed.source_info.position(node.id).is_none() {
            missing += 1;
        }
    });
    assert_eq!(missing, 0);
}

#[test]
fn test_macro_calls_are_recorded_when_enabled() {
    let options = ParserOptions { populate_macro_calls: true, ..ParserOptions::default() };
    let pp = Preprocessor::with_options(macros::ALL.iter().copied(), options).unwrap();

    let parsed = pp.process_to_ast("default(self.x, 1)").unwrap();
    let original = parsed.source_info.macro_calls.get(&parsed.expr.id).unwrap();
    assert_eq!(unparse(original).unwrap(), "default(self.x, 1)");

    let parsed = all().process_to_ast("default(self.x, 1)").unwrap();
    assert!(parsed.source_info.macro_calls.is_empty());
}

#[test]
fn test_expanded_output_reparses_without_macros() {
    let plain = Preprocessor::new(Vec::<Macro>::new()).unwrap();
    for input in [
        r#"default(self.x, "DEF")"#,
        "oneof(self.x, self.y, self.z)",
        "self.index(x, z, b)",
        "self.items.unrollmap(0, 3, x, x + 1)",
    ] {
        let expanded = all().process_to_ast(input).unwrap();
        let text = unparse(&expanded.expr).unwrap();
        let reparsed = plain.process_to_ast(&text).unwrap();
        assert_eq!(reparsed.expr, expanded.expr, "{input}");
    }
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let err = Preprocessor::new([macros::INDEX_OR_NULL, macros::INDEX_WITH_FALLBACK]).unwrap_err();
    assert!(matches!(err, Error::Registry(_)));
    assert_eq!(
        err.to_string(),
        "invalid macro configuration: Macro 'index:*:true' is registered more than once"
    );
}
