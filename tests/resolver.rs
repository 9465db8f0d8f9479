mod common;

use pretty_assertions::assert_eq;

use rox::parser::Parser;
use rox::resolver::Resolver;
use rox::scanner::Scanner;

/// Diagnostics from running `source`; resolution errors stop the program
/// before anything is printed.
fn static_errors(source: &str) -> Vec<String> {
    let (stdout, diagnostics) = common::run(source);
    assert_eq!(stdout, "", "nothing should run after a static error");
    diagnostics
}

#[test]
fn local_read_in_own_initializer() {
    assert_eq!(
        static_errors("{ var a = a; }"),
        vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
    );
}

#[test]
fn global_read_in_own_initializer_is_left_to_runtime() {
    let (_, diagnostics) = common::run("var a = a;");

    assert_eq!(diagnostics, vec!["Undefined variable 'a'.\n[line 1]"]);
}

#[test]
fn duplicate_local_declaration() {
    assert_eq!(
        static_errors("fun f() {\n  var a = 1;\n  var a = 2;\n}"),
        vec!["[line 3] Error at 'a': Already a variable with this name in this scope."]
    );
}

#[test]
fn duplicate_parameter() {
    assert_eq!(
        static_errors("fun f(a, a) {}"),
        vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
    );
}

#[test]
fn globals_may_be_redeclared() {
    assert_eq!(common::run_ok("var a = 1; var a = 2; print a;"), "2\n");
}

#[test]
fn return_at_top_level() {
    assert_eq!(
        static_errors("print 1; return 2;"),
        vec!["[line 1] Error at 'return': Can't return from top-level code."]
    );
}

#[test]
fn this_outside_class() {
    assert_eq!(
        static_errors("print this;"),
        vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
    );
    assert_eq!(
        static_errors("fun f() { return this; }"),
        vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
    );
}

#[test]
fn super_outside_class_and_without_superclass() {
    assert_eq!(
        static_errors("super.m();"),
        vec!["[line 1] Error at 'super': Can't use 'super' outside of a class."]
    );
    assert_eq!(
        static_errors("class A { m() { super.m(); } }"),
        vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
    );
}

#[test]
fn class_inheriting_from_itself() {
    assert_eq!(
        static_errors("class A < A {}"),
        vec!["[line 1] Error at 'A': A class can't inherit from itself."]
    );
}

#[test]
fn value_returned_from_initializer() {
    assert_eq!(
        static_errors("class C { init() { return 1; } }"),
        vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
    );
}

#[test]
fn bare_return_in_initializer_is_allowed() {
    assert_eq!(
        common::run_ok("class C { init() { return; } } print C();"),
        "C instance\n"
    );
}

#[test]
fn every_error_is_collected() {
    let diagnostics = static_errors("return 1;\n{ var b = b; }\nprint this;");

    assert_eq!(diagnostics.len(), 3);
}

#[test]
fn records_distance_for_locals_only() {
    common::init_logger();

    let source = "var g = 1; { var l = 2; { print l; print g; } }";
    let (tokens, _) = Scanner::new(source).scan_tokens();
    let statements = Parser::new(&tokens).parse().unwrap();

    let locals = Resolver::new().resolve(&statements).unwrap();

    // Only `l` is resolved; `g` is global and stays out of the table.
    assert_eq!(locals.len(), 1);
    assert_eq!(locals.values().copied().collect::<Vec<usize>>(), vec![1]);
}
