mod common;

use pretty_assertions::assert_eq;

use rox::ast::{Expr, Stmt};
use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::parser::Parser;
use rox::scanner::Scanner;
use rox::token::Token;

fn tokens(source: &str) -> Vec<Token> {
    common::init_logger();

    let (tokens, errors) = Scanner::new(source).scan_tokens();
    assert!(errors.is_empty(), "lex errors: {:?}", errors);
    tokens
}

fn print_expression(source: &str) -> String {
    let tokens = tokens(source);
    let expr: Expr = Parser::new(&tokens)
        .parse_expression()
        .unwrap_or_else(|errors| panic!("parse failed: {:?}", errors));

    AstPrinter::print(&expr)
}

fn parse(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
    let tokens = tokens(source);
    Parser::new(&tokens).parse()
}

fn parse_errors(source: &str) -> Vec<String> {
    match parse(source) {
        Ok(statements) => panic!("expected errors, parsed {:?}", statements),
        Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
    }
}

#[test]
fn precedence_and_associativity() {
    assert_eq!(print_expression("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
    assert_eq!(print_expression("1 - 2 - 3"), "(- (- 1.0 2.0) 3.0)");
    assert_eq!(print_expression("-(1.5) * !true"), "(* (- (group 1.5)) (! true))");
    assert_eq!(
        print_expression("1 < 2 == 3 >= 4"),
        "(== (< 1.0 2.0) (>= 3.0 4.0))"
    );
    assert_eq!(print_expression("a or b and c"), "(or a (and b c))");
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(print_expression("a = b = 1"), "(= a (= b 1.0))");
    assert_eq!(print_expression("a.b.c = nil"), "(= (. (. a b) c) nil)");
}

#[test]
fn calls_and_property_chains() {
    assert_eq!(print_expression("f(1)(2, x).y"), "(. (call (call f 1.0) 2.0 x) y)");
    assert_eq!(print_expression("\"str\""), "str");
}

#[test]
fn for_loop_desugars_into_while() {
    let statements = parse("for (var i = 0; i < 3; i = i + 1) print i;").unwrap();

    assert_eq!(statements.len(), 1);

    let Stmt::Block(outer) = &statements[0] else {
        panic!("expected a block, got {:?}", statements[0]);
    };

    assert_eq!(outer.len(), 2);
    assert!(matches!(outer[0], Stmt::Var { .. }));

    let Stmt::While { body, .. } = &outer[1] else {
        panic!("expected a while loop, got {:?}", outer[1]);
    };

    let Stmt::Block(inner) = body.as_ref() else {
        panic!("expected the body and increment in a block, got {:?}", body);
    };

    assert!(matches!(inner[0], Stmt::Print(_)));
    assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
}

#[test]
fn for_loop_without_clauses_loops_on_true() {
    let statements = parse("for (;;) print 1;").unwrap();

    let Stmt::While { condition, .. } = &statements[0] else {
        panic!("expected a bare while loop, got {:?}", statements[0]);
    };

    assert_eq!(AstPrinter::print(condition), "true");
}

#[test]
fn class_with_superclass_and_methods() {
    let statements = parse("class B < A { init(x) { this.x = x; } get() { return this.x; } }")
        .unwrap();

    let Stmt::Class {
        name,
        superclass,
        methods,
    } = &statements[0]
    else {
        panic!("expected a class, got {:?}", statements[0]);
    };

    assert_eq!(name.lexeme, "B");
    assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));

    let names: Vec<&str> = methods.iter().map(|m| m.name.lexeme.as_str()).collect();
    assert_eq!(names, vec!["init", "get"]);
    assert_eq!(methods[0].params.len(), 1);
}

#[test]
fn recovers_and_reports_every_error() {
    let errors = parse_errors("var = 1;\nprint 2;\nprint (3;\nvar ok = 4;");

    assert_eq!(
        errors,
        vec![
            "[line 1] Error at '=': Expect variable name.",
            "[line 3] Error at ';': Expect ')' after expression.",
        ]
    );
}

#[test]
fn error_at_end_of_input() {
    let errors = parse_errors("print 1");

    assert_eq!(errors, vec!["[line 1] Error at end: Expect ';' after value."]);
}

#[test]
fn invalid_assignment_target_does_not_unwind() {
    let errors = parse_errors("1 + 2 = 3;\nprint 4;");

    assert_eq!(errors, vec!["[line 1] Error at '=': Invalid assignment target."]);
}

#[test]
fn too_many_arguments() {
    let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
    let source = format!("f({});", args.join(", "));

    let errors = parse_errors(&source);

    assert_eq!(
        errors,
        vec!["[line 1] Error at '255': Can't have more than 255 arguments."]
    );
}

#[test]
fn too_many_parameters() {
    let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
    let source = format!("fun f({}) {{}}", params.join(", "));

    let errors = parse_errors(&source);

    assert_eq!(
        errors,
        vec!["[line 1] Error at 'p255': Can't have more than 255 parameters."]
    );
}

#[test]
fn single_expression_rejects_trailing_tokens() {
    let tokens = tokens("1 2");
    let errors = Parser::new(&tokens).parse_expression().unwrap_err();

    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "[line 1] Error at '2': Expect end of expression."
    );
}
