use crate::rules::arithmetic::{arithmetic_grammar, compile_source};
use crate::{CompileError, Evaluator, Map, ParseError, Value};

fn run(source: &str, scope: &Map) -> Value {
    let eval = Evaluator::new(source).unwrap_or_else(|e| panic!("{source:?} failed to compile: {e}"));
    eval.evaluate(scope).unwrap_or_else(|e| panic!("{source:?} failed to evaluate: {e}"))
}

#[test]
fn arithmetic_examples_numbers() {
    // Array of (expected_value, input_string)
    let cases: Vec<(f64, &str)> = vec![
        (31.0, "1 - 1 + 1 + 3 * 4 / 2 * 5"),
        (6.0, "((3 + 4) * (7 - 2) + 1) / 6"),
        (3.0, "5 + 0 ? 1 + 2 : 2 + 3"),
        (5.0, "0 * 5 ? 1 + 2 : 2 + 3"),
        (7.0, "1 + 2 * 3"),
        (9.0, "(1 + 2) * 3"),
        (14.0, "2 * 3 + 4 * 2"),
        (3.0, "10 - 4 - 3"),
        (2.0, "8 / 2 / 2"),
        (1.0, "7 % 3"),
        (2.5, "5 / 2"),
        (-3.0, "-3"),
        (3.0, "- -3"),
        (-3.0, "-(1 + 2)"),
        (2.0, "+'2'"),
        (255.0, "0xff"),
        (26.0, "0x1A"),
        (1000.0, "1e3"),
        (0.5, ".5"),
        (8.0, "1 << 3"),
        (-4.0, "-16 >> 2"),
        (4_294_967_295.0, "-1 >>> 0"),
        (1.0, "5 & 3"),
        (6.0, "5 ^ 3"),
        (7.0, "5 | 3"),
        (-6.0, "~5"),
        (3.0, "1 | 2 ^ 3 & 4"),
        (1.0, "3 > 2"),
        (0.0, "3 < 2"),
        (1.0, "2 <= 2"),
        (1.0, "'b' > 'a'"),
        (1.0, "'1' == 1"),
        (0.0, "'1' === 1"),
        (1.0, "'1' !== 1"),
        (1.0, "null == undefined"),
        (0.0, "null === undefined"),
        (1.0, "1 + 2 == 3"),
        (1.0, "1 < 2 == 2 > 1"),
        (1.0, "!0"),
        (0.0, "!'x'"),
        (1.0, "!!3"),
        (2.0, "1 && 2"),
        (0.0, "0 && 2"),
        (3.0, "0 || 3"),
        (1.0, "1 || 0 && 0"),
        (3.0, "1, 2, 3"),
        (2.0, "0 ? 1 : 1 ? 2 : 3"),
        (3.0, "1 ? 0 ? 2 : 3 : 4"),
        (1.0, "1 ? 1 : 0 ? 2 : 3"),
        (4.0, "0 ? 1 : 2, 4"),
        (5.0, "'hello'.length"),
        (1.0, "true"),
        (0.0, "false"),
    ];

    let scope = Map::new();
    for (expected, input) in cases {
        let got = run(input, &scope).to_number();
        assert_eq!(got, expected, "Expected {expected} for {input:?}, got {got}");
    }
}

#[test]
fn arithmetic_examples_strings() {
    let cases: Vec<(&str, &str)> = vec![
        ("ab", "'a' + 'b'"),
        ("12", "'1' + 2"),
        ("3a", "1 + 2 + 'a'"),
        ("a\"b", r#""a\"b""#),
        ("it's", r"'it\'s'"),
        ("line\nnext", r"'line\nnext'"),
        ("q", r"'\q'"),
        ("HI", "'hi'.toUpperCase()"),
        ("b,c", "'a,b,c'.split(',').slice(1).join()"),
        ("b-c", "'a,b,c'.split(',').slice(-2).join('-')"),
        ("undefinedx", "undefined + 'x'"),
        ("NaN", "0 / 0"),
        ("Infinity", "1 / 0"),
        ("0.30000000000000004", "0.1 + 0.2"),
    ];

    let scope = Map::new();
    for (expected, input) in cases {
        assert_eq!(run(input, &scope).to_string(), expected, "evaluating {input:?}");
    }
}

#[test]
fn arithmetic_examples_with_scope() {
    let data: Map = [
        ("list", Value::from(vec![10.into(), 20.into(), 30.into()])),
        ("n", 2.into()),
        ("name", "dialect".into()),
    ]
    .into_iter()
    .collect();
    let add = Value::function("add", |_, args| Ok(args.iter().map(Value::to_number).sum::<f64>().into()));
    let scope: Map = [("data", Value::from(data)), ("add", add), ("key", "n".into())].into_iter().collect();

    let cases: Vec<(f64, &str)> = vec![
        (20.0, "data.list[1]"),
        (30.0, "data.list[data.n - 1] + data.list[0] * data.n - 10"),
        (2.0, "data[key]"),
        (3.0, "data.list.length"),
        (7.0, "data.name.length"),
        (6.0, "add(1, 2, 3)"),
        (3.0, "add((1, 2), 1)"),
        (0.0, "add()"),
        (61.0, "add(data.list[0], data.list[2] + 1, data.n ? 20 : 0)"),
        (1.0, "data.list.indexOf(20)"),
        (1.0, "data.list.includes(30) && !data.list.includes(31)"),
    ];

    for (expected, input) in cases {
        let got = run(input, &scope).to_number();
        assert_eq!(got, expected, "Expected {expected} for {input:?}, got {got}");
    }
}

#[test]
fn canonical_form() {
    let cases: Vec<(&str, &str)> = vec![
        ("((1 + (2 * 3)) - 4)", "1 + 2 * 3 - 4"),
        ("(a ? b : (c ? d : e))", "a ? b : c ? d : e"),
        ("f(a, (b + 1))", "f(a, b + 1)"),
        ("(-(x++))", "-x++"),
        ("a.b[0].c", "a.b[0].c"),
        ("(!(a && b))", "!(a && b)"),
        ("((a || b) || c)", "a || b || c"),
        ("(a, b)", "(a, b)"),
        ("\"q\\\"\"", r#"'q"'"#),
        ("255", "0xFF"),
    ];

    for (expected, input) in cases {
        let expr = compile_source(input).unwrap_or_else(|e| panic!("{input:?}: {e}"));
        assert_eq!(expr.to_string(), expected, "canonical form of {input:?}");
    }
}

#[test]
fn compile_errors() {
    assert_eq!(compile_source("1 +").unwrap_err(), CompileError::Unreduced { offset: 2, remaining: 2 });
    assert_eq!(compile_source("").unwrap_err(), CompileError::Unreduced { offset: 0, remaining: 0 });
    assert_eq!(compile_source("()").unwrap_err(), CompileError::Unreduced { offset: 0, remaining: 0 });
    assert!(matches!(compile_source("a[]"), Err(CompileError::Unreduced { .. })));

    assert_eq!(compile_source("a ? b").unwrap_err(), CompileError::IncompleteTernary { offset: 2 });
    assert_eq!(compile_source("a : b").unwrap_err(), CompileError::IncompleteTernary { offset: 2 });
    assert_eq!(compile_source("a ? b : c : d").unwrap_err(), CompileError::IncompleteTernary { offset: 10 });

    assert!(matches!(compile_source("1 2"), Err(CompileError::Syntax(ParseError::Syntax { offset: 2, .. }))));
    assert!(matches!(compile_source("(1"), Err(CompileError::Syntax(ParseError::Unterminated { offset: 0, .. }))));
    assert!(matches!(compile_source("'open"), Err(CompileError::Syntax(ParseError::Syntax { offset: 0, .. }))));
    assert!(matches!(compile_source("a.1"), Err(CompileError::Syntax(ParseError::Syntax { offset: 2, .. }))));
}

#[test]
fn grammar_tokenizes_longest_operators_and_round_trips() {
    let grammar = arithmetic_grammar();

    let tree = grammar.parse("a>>>b").unwrap();
    let operators: Vec<_> = tree.children().iter().filter_map(|c| c.content()).collect();
    assert_eq!(operators, vec!["a", ">>>", "b"]);

    for text in ["  a . b ( 1 ,2 ) [ 'x' ]  ", "x++ + ++y", "-\t(1)\n", "f()", "a ? b : c"] {
        assert_eq!(grammar.parse(text).unwrap().unparse(), text);
    }
}

#[test]
fn prefix_and_binary_minus_are_distinguished_by_position() {
    let tree = arithmetic_grammar().parse("-a - -b").unwrap();
    let names: Vec<&str> = tree.children().iter().map(|c| c.name()).collect();

    assert_eq!(names, vec!["prefix", "identifier", "operator", "prefix", "identifier"]);
}

#[test]
fn one_grammar_parses_and_compiles_on_many_threads() {
    let grammar = arithmetic_grammar();
    let inputs = ["1 + 2 * 3", "f(a, b)[0].c", "a ? b : c ? d : e", "  x++ - --y  ", "'s'.length, -1"];
    let expected: Vec<_> = inputs.iter().map(|text| grammar.parse(text).unwrap()).collect();

    std::thread::scope(|s| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|&text| {
                s.spawn(move || {
                    let tree = grammar.parse(text).unwrap();
                    let canonical = compile_source(text).unwrap().to_string();
                    (tree, canonical)
                })
            })
            .collect();

        for ((handle, text), expected) in handles.into_iter().zip(inputs).zip(&expected) {
            let (tree, canonical) = handle.join().unwrap();
            assert_eq!(&tree, expected, "tree of {text:?}");
            assert_eq!(tree.unparse(), text);
            assert_eq!(canonical, compile_source(text).unwrap().to_string());
        }
    });
}
