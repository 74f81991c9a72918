//! Table-driven coverage of the design's concrete input/output scenarios.

use nix_manipulator::{edit, parser};
use pretty_assertions::assert_eq;
use test_case::test_case;

#[test_case(
    "{ version = \"0.1.0\"; }",
    "version",
    "\"1.2.3\"",
    "{ version = \"1.2.3\"; }";
    "replace a top-level string value"
)]
#[test_case(
    "{ foo = { \"bar.baz\" = 1; }; }",
    "foo.\"bar.baz\"",
    "2",
    "{ foo = { \"bar.baz\" = 2; }; }";
    "set through a quoted attrpath segment"
)]
#[test_case(
    "{ foo.bar = 1; }",
    "foo.baz",
    "2",
    "{ foo.bar = 1; foo.baz = 2; }";
    "add a sibling compound-key binding, preserving inline layout"
)]
fn set_scenarios(input: &str, npath: &str, value: &str, expected: &str) {
    let mut file = parser::parse(input).unwrap();
    edit::set_value(&mut file, npath, value).unwrap();
    assert_eq!(file.rebuild(), expected);
}

#[test]
fn creates_an_outer_let_scope() {
    let mut file = parser::parse("{ foo = 1; }").unwrap();
    edit::set_value(&mut file, "@bar", "2").unwrap();
    assert_eq!(file.rebuild(), "let\n  bar = 2;\nin\n{ foo = 1; }");
}

#[test]
fn pruning_the_last_scope_binding_drops_the_let_wrapper() {
    let mut file = parser::parse("let\n  bar = 2;\nin\n{ foo = 1; }\n").unwrap();
    edit::remove_value(&mut file, "@bar").unwrap();
    assert_eq!(file.rebuild(), "{ foo = 1; }\n");
}

#[test]
fn double_at_selects_the_outer_of_two_nested_scopes() {
    let mut file = parser::parse("let\n  a = 1;\nin\nlet\n  b = 2;\nin\n{ c = a + b; }\n").unwrap();
    edit::set_value(&mut file, "@@a", "10").unwrap();
    let rebuilt = file.rebuild();
    assert!(rebuilt.contains("a = 10;"), "expected updated outer binding, got: {rebuilt}");
    assert!(rebuilt.contains("b = 2;"), "inner scope should be untouched, got: {rebuilt}");
}
