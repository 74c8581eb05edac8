use jms_selector::parser::MAX_NESTING;
use jms_selector::{parse, SelectorError};

fn parse_err(input: &str) -> SelectorError {
    match parse(input) {
        Ok(e) => panic!("{:?} should fail to parse, got {:?}", input, e),
        Err(e) => e,
    }
}

#[test]
fn test_unterminated_string() {
    for input in [
        "name = 'test",
        "a = 1 AND b = 'x''",
        "color IN ('red') OR x = 'foo bar baz",
        "a IN ('x', 'y",
        "a IN ('x",
        "a LIKE 'ab",
        "a NOT LIKE 'x' ESCAPE '!",
    ] {
        let err = parse_err(input);
        assert!(
            matches!(err, SelectorError::UnterminatedString { .. }),
            "Expected unterminated string for {:?}, got {:?}",
            input,
            err
        );
    }

    let err = parse_err("name = 'test");
    assert_eq!(err.offset(), Some(7));

    let err = parse_err("a IN ('x', 'y");
    assert_eq!(err.offset(), Some(11));
}

#[test]
fn test_trailing_input() {
    for input in ["a = 1 b = 2", "a = 1)", "a = 1 AND b = 2 c", "(a = 1))"] {
        let err = parse_err(input);
        assert!(
            matches!(err, SelectorError::Syntax { .. }),
            "Expected syntax error for {:?}, got {:?}",
            input,
            err
        );
    }
}

#[test]
fn test_syntax_error_reports_position() {
    match parse_err("a = 1 AND b = = 2") {
        SelectorError::Syntax { line, col, span, .. } => {
            assert_eq!(line, 1);
            assert_eq!(col, 15);
            assert_eq!(span.offset(), 14);
        }
        other => panic!("Expected syntax error, got {:?}", other),
    }

    match parse_err("a = 1\nAND") {
        SelectorError::Syntax { line, .. } => assert_eq!(line, 2),
        other => panic!("Expected syntax error, got {:?}", other),
    }
}

#[test]
fn test_malformed_expressions() {
    let inputs = [
        "a =",
        "= 1",
        "a AND",
        "OR a = 1",
        "a = 1 AND AND b = 2",
        "(a = 1",
        "()",
        "a == 1",
        "a != 1",
        "a = 1 = 2",
        "a IN ()",
        "a IN ('x',)",
        "a IN (1, 2)",
        "a IN 'x'",
        "a LIKE b",
        "a BETWEEN 1",
        "a BETWEEN 1 OR 2",
        "a IS",
        "a IS NOT",
        "a # 1",
        "12abc = 1",
        "a = 5e",
        "a = \"x\"",
    ];

    for input in inputs {
        let err = parse_err(input);
        assert!(err.offset().is_some(), "Expected a position for {:?}", input);
    }
}

#[test]
fn test_keywords_are_not_identifiers() {
    for keyword in ["AND", "or", "Not", "between", "LIKE", "in", "IS", "null", "escape"] {
        let input = format!("{} = 1", keyword);
        assert!(parse(&input).is_err(), "Keyword {:?} accepted as identifier", keyword);
    }
}

#[test]
fn test_operators_requiring_identifiers() {
    for (input, operator) in [
        ("'a' IN ('a')", "IN"),
        ("1 + 2 IN ('3')", "IN"),
        ("'abc' LIKE 'a%'", "LIKE"),
        ("(a) LIKE 'a%' AND 1 IS NULL", "IS NULL"),
        ("a + 1 IS NOT NULL", "IS NULL"),
    ] {
        match parse_err(input) {
            SelectorError::IdentifierRequired { operator: op, .. } => {
                assert_eq!(op, operator, "Failed for: {}", input)
            }
            other => panic!("Expected IdentifierRequired for {:?}, got {:?}", input, other),
        }
    }
}

#[test]
fn test_invalid_escape() {
    let err = parse_err("a LIKE 'x' ESCAPE '!!'");
    assert!(matches!(err, SelectorError::InvalidEscape { .. }), "got {:?}", err);
    assert_eq!(err.offset(), Some(18));

    let err = parse_err("a LIKE 'x' ESCAPE ''");
    assert!(matches!(err, SelectorError::InvalidEscape { .. }), "got {:?}", err);

    let err = parse_err("a LIKE 'x!' ESCAPE '!'");
    assert!(matches!(err, SelectorError::DanglingEscape { .. }), "got {:?}", err);
    assert_eq!(err.offset(), Some(7));
}

#[test]
fn test_numbers_out_of_range() {
    for input in ["a = 9223372036854775808", "a = 1e999", "a = 0xFFFFFFFFFFFFFFFFF"] {
        let err = parse_err(input);
        assert!(
            matches!(err, SelectorError::NumberOutOfRange { .. }),
            "Expected out-of-range error for {:?}, got {:?}",
            input,
            err
        );
        assert_eq!(err.offset(), Some(4));
    }
}

#[test]
fn test_negated_minimum_needs_an_adjacent_sign() {
    for input in ["a = -(9223372036854775808)", "a = 9223372036854775808 - 1", "a = -9223372036854775809"] {
        let err = parse_err(input);
        assert!(
            matches!(err, SelectorError::NumberOutOfRange { .. }),
            "Expected out-of-range error for {:?}, got {:?}",
            input,
            err
        );
    }
}

#[test]
fn test_nesting_limit() {
    let deep_parens = format!("{}a = 1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
    let deep_not = format!("{}a", "NOT ".repeat(10_000));
    let deep_signs = format!("a = {}1", "- ".repeat(MAX_NESTING + 1));

    for input in [&deep_parens, &deep_not, &deep_signs] {
        match parse_err(input) {
            SelectorError::NestingTooDeep { limit, .. } => assert_eq!(limit, MAX_NESTING),
            other => panic!("Expected NestingTooDeep, got {:?}", other),
        }
    }

    let err = parse_err(&deep_parens);
    assert_eq!(err.offset(), Some(MAX_NESTING));

    // right at the limit, and quoted parentheses never count
    let at_limit = format!("{}a = 1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
    assert!(parse(&at_limit).is_ok());
    let quoted = format!("a = '{}' AND b IN ('{}')", "(".repeat(500), "NOT ".repeat(500));
    assert!(parse(&quoted).is_ok());
    let chained_minus = format!("a = 1{}", " - (1)".repeat(500));
    assert!(parse(&chained_minus).is_ok());
}

#[test]
fn test_errors_carry_source() {
    let err = parse_err("a = 1 AND");
    match err {
        SelectorError::Syntax { src, .. } => assert_eq!(src, "a = 1 AND"),
        other => panic!("Expected syntax error, got {:?}", other),
    }

    let err = parse_err("x = 'open");
    match err {
        SelectorError::UnterminatedString { src, .. } => assert_eq!(src, "x = 'open"),
        other => panic!("Expected unterminated string, got {:?}", other),
    }
}

#[test]
fn test_error_messages() {
    let err = parse_err("a = 1 AND b = = 2");
    assert_eq!(err.to_string(), "Syntax error at line 1, column 15");

    let err = parse_err("'x' LIKE 'y'");
    assert_eq!(
        err.to_string(),
        "LIKE requires an identifier on its left-hand side, found: 'x'"
    );
}
