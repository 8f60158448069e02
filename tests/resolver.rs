use pretty_assertions::assert_eq;

use rox::ast::Stmt;
use rox::error::{ResolutionError, ResolutionErrorKind};
use rox::parser::Parser;
use rox::resolver::{Locals, Resolver};
use rox::scanner::scan;

fn parse(source: &str) -> Vec<Stmt> {
    let (tokens, lex_errors) = scan(source);
    assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);

    let (statements, errors) = Parser::new(&tokens).parse();
    assert!(errors.is_empty(), "syntax errors: {:?}", errors);

    statements
}

fn resolve(source: &str) -> (Locals, Vec<ResolutionError>) {
    Resolver::new().resolve(&parse(source))
}

fn kinds(source: &str) -> Vec<ResolutionErrorKind> {
    resolve(source).1.into_iter().map(|e| e.kind).collect()
}

#[test]
fn resolving_twice_gives_the_same_table() {
    let statements = parse(
        "fun outer() {
            var a = 1;
            fun inner() { a = a + 1; return a; }
            { var b = a; print b; }
            return inner;
        }
        class A { m() { return this; } }
        class B < A { m() { return super.m(); } }",
    );

    let (first, first_errors) = Resolver::new().resolve(&statements);
    let (second, second_errors) = Resolver::new().resolve(&statements);

    assert!(first_errors.is_empty());
    assert!(second_errors.is_empty());
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn globals_get_no_table_entry() {
    let (locals, errors) = resolve("var g = 1; print g; g = 2;");

    assert!(errors.is_empty());
    assert!(locals.is_empty());
}

#[test]
fn distances_follow_the_scope_chain() {
    let (locals, errors) = resolve("{ var a = 1; { { print a; } } }");
    assert!(errors.is_empty());

    let mut distances: Vec<usize> = locals.values().copied().collect();
    distances.sort();
    assert_eq!(distances, vec![2]);
}

#[test]
fn self_referencing_initializer() {
    assert_eq!(
        kinds("{ var a = 1; { var a = a; } }"),
        vec![ResolutionErrorKind::VarInitSelfRefer]
    );

    // At top level the name is a global, so this is legal.
    assert!(kinds("var a = a;").is_empty());
}

#[test]
fn loop_control_outside_loops() {
    assert_eq!(kinds("break;"), vec![ResolutionErrorKind::BreakOutsideLoop]);
    assert_eq!(
        kinds("continue;"),
        vec![ResolutionErrorKind::ContinueOutsideLoop]
    );

    // A function body starts a fresh loop context.
    assert_eq!(
        kinds("while (true) { fun f() { break; } break; }"),
        vec![ResolutionErrorKind::BreakOutsideLoop]
    );

    assert!(kinds("for (;;) { if (true) continue; break; }").is_empty());
}

#[test]
fn returns() {
    assert_eq!(
        kinds("return 1;"),
        vec![ResolutionErrorKind::ReturnOutsideFunction]
    );
    assert_eq!(
        kinds("class A { init() { return 1; } }"),
        vec![ResolutionErrorKind::ReturnFromInit]
    );

    // A bare return in an initializer is fine, as is a value from a method.
    assert!(kinds("class A { init() { return; } m() { return 1; } }").is_empty());
}

#[test]
fn this_and_super_placement() {
    assert_eq!(kinds("print this;"), vec![ResolutionErrorKind::ThisOutsideClass]);
    assert_eq!(
        kinds("class A { class make() { return this; } }"),
        vec![ResolutionErrorKind::StaticInit]
    );
    assert_eq!(
        kinds("print super.x;"),
        vec![ResolutionErrorKind::SuperOutsideClass]
    );
    assert_eq!(
        kinds("class A { m() { return super.m(); } }"),
        vec![ResolutionErrorKind::SuperWithoutSuperclass]
    );

    // Getters, setters and closures inside methods may use `this`.
    assert!(kinds(
        "class A {
            get x { return this._x; }
            set x(v) { this._x = v; }
            m() { return fun () { return this; }; }
        }"
    )
    .is_empty());
}

#[test]
fn errors_do_not_stop_the_walk() {
    let (_, errors) = resolve("break; return; print this;");

    assert_eq!(errors.len(), 3);
    assert_eq!(
        errors[0].to_string(),
        "[line 1] Resolution error at 'break': Can't use 'break' outside of a loop."
    );
}
