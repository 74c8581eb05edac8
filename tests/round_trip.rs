use jms_selector::{parse, ArithmeticOp, ComparisonOp, Expr, LikePattern, UnaryOp, Value};
use proptest::prelude::*;

fn reparse(e: &Expr) -> Expr {
    let rendered = e.to_string();
    parse(&rendered)
        .unwrap_or_else(|err| panic!("rendering {:?} failed to parse: {}", rendered, err))
        .unwrap_or_else(|| panic!("rendering {:?} parsed as empty", rendered))
}

#[test]
fn test_canonical_rendering_is_stable() {
    let inputs = [
        "a=1 and b='x'",
        "a = 1 OR b = 2 AND c = 3",
        "(a = 1 OR b = 2) AND c = 3",
        "NOT NOT a",
        "not (a = 1 and b = 2)",
        "-a * (b + c) / 2 >= -1.5",
        "a - (b - c) = a - b - c",
        "x = - -5",
        "color not in ('red', 'it''s')",
        r"name like 'a\_%' escape '\'",
        "a not between 1 + 1 and 2 * 3",
        "(a = 1) = (b = 2)",
        "a IS NOT NULL AND b is null",
        "x = 0x10 OR y = 10L OR z = 1e3",
        "TRUE",
    ];

    for input in inputs {
        let once = parse(input).unwrap().unwrap();
        let rendered = once.to_string();
        let twice = parse(&rendered).unwrap().unwrap();
        assert_eq!(once, twice, "Failed for: {} (rendered {})", input, rendered);
        assert_eq!(rendered, twice.to_string(), "Failed for: {}", input);
    }
}

#[test]
fn test_canonical_rendering() {
    let examples = [
        ("a=1 and b='x'", "a = 1 AND b = 'x'"),
        ("(a = 1 OR b = 2) AND c = 3", "(a = 1 OR b = 2) AND c = 3"),
        ("((a = 1)) AND ((b = 2))", "a = 1 AND b = 2"),
        ("x = 0x10", "x = 16"),
        ("x = 1e3", "x = 1000.0"),
        ("color not in ('red')", "color NOT IN ('red')"),
    ];

    for (input, expected) in examples {
        assert_eq!(parse(input).unwrap().unwrap().to_string(), expected, "Failed for: {}", input);
    }
}

fn arb_identifier() -> impl Strategy<Value = Expr> {
    "p[a-z0-9_]{0,4}".prop_map(Expr::Identifier)
}

fn arb_string() -> impl Strategy<Value = String> {
    "[a-z' %_]{0,6}"
}

fn arb_literal() -> impl Strategy<Value = Value> {
    prop_oneof![
        arb_string().prop_map(Value::String),
        (-1_000_000_000i64..1_000_000_000).prop_map(Value::Integer),
        (-4_000_000i32..4_000_000).prop_map(|n| Value::Float(n as f64 / 4.0)),
        any::<bool>().prop_map(Value::Boolean),
    ]
}

fn arb_comparison_op() -> impl Strategy<Value = ComparisonOp> {
    prop_oneof![
        Just(ComparisonOp::Equals),
        Just(ComparisonOp::NotEquals),
        Just(ComparisonOp::Less),
        Just(ComparisonOp::LessOrEqual),
        Just(ComparisonOp::Greater),
        Just(ComparisonOp::GreaterOrEqual),
    ]
}

fn arb_arithmetic_op() -> impl Strategy<Value = ArithmeticOp> {
    prop_oneof![
        Just(ArithmeticOp::Add),
        Just(ArithmeticOp::Subtract),
        Just(ArithmeticOp::Multiply),
        Just(ArithmeticOp::Divide),
    ]
}

fn arb_like_pattern() -> impl Strategy<Value = LikePattern> {
    ("[a-z%_]{0,5}", any::<bool>()).prop_map(|(pattern, escaped)| {
        let escape = if escaped { Some("!") } else { None };
        LikePattern::new(&pattern, escape).unwrap()
    })
}

/// Trees the parser itself can produce: signs never sit directly on a numeric
/// literal (those are folded), and IN, LIKE and IS NULL apply to identifiers.
fn arb_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![arb_identifier(), arb_literal().prop_map(Expr::Literal)];

    leaf.prop_recursive(5, 48, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(Expr::not),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::and(a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::or(a, b)),
            (arb_comparison_op(), inner.clone(), inner.clone())
                .prop_map(|(op, a, b)| Expr::compare(op, a, b)),
            (arb_arithmetic_op(), inner.clone(), inner.clone())
                .prop_map(|(op, a, b)| Expr::arithmetic(op, a, b)),
            (any::<bool>(), inner.clone())
                .prop_filter("signs on numeric literals fold away", |(_, x)| {
                    !x.as_literal().is_some_and(Value::is_numeric)
                })
                .prop_map(|(minus, x)| {
                    let op = if minus { UnaryOp::Minus } else { UnaryOp::Plus };
                    Expr::unary(op, x)
                }),
            (inner.clone(), inner.clone(), inner.clone(), any::<bool>())
                .prop_map(|(x, low, high, negated)| Expr::between(x, low, high, negated)),
            (arb_identifier(), prop::collection::vec(arb_string(), 1..4), any::<bool>())
                .prop_map(|(x, items, negated)| Expr::in_list(x, items, negated)),
            (arb_identifier(), arb_like_pattern(), any::<bool>())
                .prop_map(|(x, pattern, negated)| Expr::like(x, pattern, negated)),
            (arb_identifier(), any::<bool>()).prop_map(|(x, negated)| Expr::is_null(x, negated)),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn rendering_round_trips(expr in arb_expr()) {
        prop_assert_eq!(reparse(&expr), expr);
    }
}
