use pretty_assertions::assert_eq;

use rox::error::{CollectingReporter, ErrorReporter, LoxError};
use rox::Lox;

/// Run `code` in a fresh session with `input` as stdin.
fn run_with_input(code: &str, input: &str) -> (String, CollectingReporter) {
    let mut out: Vec<u8> = Vec::new();
    let mut reporter = CollectingReporter::new();

    {
        let mut lox = Lox::with_io(&mut out, input.as_bytes());
        lox.run(code, &mut reporter);
    }

    (String::from_utf8(out).unwrap(), reporter)
}

fn run(code: &str) -> (String, CollectingReporter) {
    run_with_input(code, "")
}

fn assert_prints(code: &str, expected: &str) {
    let (out, reporter) = run(code);

    assert!(!reporter.had_error(), "static errors: {:?}", reporter);
    assert!(reporter.runtime.is_empty(), "runtime errors: {:?}", reporter.runtime);
    assert_eq!(out, expected);
}

fn assert_runtime_error(code: &str, message: &str) {
    let (_, reporter) = run(code);

    assert_eq!(reporter.runtime.len(), 1, "{:?}", reporter);
    assert_eq!(reporter.runtime[0].message, message);
}

#[test]
fn block_scoping() {
    assert_prints("var a = 1; { var a = 2; print a; } print a;", "2\n1\n");
}

#[test]
fn closures_keep_their_counter() {
    assert_prints(
        "fun makeCounter() {
            var i = 0;
            fun count() { i = i + 1; print i; }
            return count;
        }
        var counter = makeCounter();
        counter();
        counter();",
        "1\n2\n",
    );
}

#[test]
fn closures_bind_at_resolution_time() {
    assert_prints(
        "var a = \"global\";
        {
            fun show() { print a; }
            show();
            var a = \"block\";
            show();
        }",
        "global\nglobal\n",
    );
}

#[test]
fn recursion() {
    assert_prints(
        "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
        print fib(10);",
        "55\n",
    );
}

#[test]
fn super_calls_reach_the_parent() {
    assert_prints(
        "class A { method() { print \"A\"; } }
        class B < A { method() { super.method(); print \"B\"; } }
        B().method();",
        "A\nB\n",
    );
}

#[test]
fn super_results_compose() {
    assert_prints(
        "class A { greet() { return \"A\"; } }
        class B < A { greet() { return super.greet() + \"B\"; } }
        print B().greet();",
        "AB\n",
    );
}

#[test]
fn variables_can_be_reassigned() {
    assert_prints("var v = 1; v = 2; print v; print v + 0 == 2;", "2\ntrue\n");
}

#[test]
fn constants_cannot_be_reassigned() {
    assert_runtime_error("val k = 1; k = 2;", "Cannot reassign constant 'k'.");
    assert_runtime_error("fun f() { val k = 1; k = 2; } f();", "Cannot reassign constant 'k'.");
    assert_runtime_error("clock = 1;", "Cannot reassign constant 'clock'.");
}

#[test]
fn arithmetic_and_comparison() {
    assert_prints(
        "print 1 + 2 * 3;
        print (1 + 2) * 3;
        print 7 / 2;
        print -(3);
        print \"a\" < \"b\";
        print \"b\" <= \"a\";
        print 2 >= 2;
        print \"n: \" + 3;
        print 3 + \"x\";
        print \"a\" == \"a\";
        print nil == false;
        print !nil;",
        "7\n9\n3.5\n-3\ntrue\nfalse\ntrue\nn: 3\n3x\ntrue\nfalse\ntrue\n",
    );
}

#[test]
fn operator_type_errors() {
    assert_runtime_error(
        "print 1 < \"a\";",
        "Operands must be two numbers or two strings.",
    );
    assert_runtime_error("print 1 / 0;", "Division by zero.");
    assert_runtime_error("print 1 - \"a\";", "Operands must be numbers.");
    assert_runtime_error("print -\"a\";", "Operand must be a number.");
    assert_runtime_error(
        "print nil + 1;",
        "Operands must be two numbers or a string and another object.",
    );
}

#[test]
fn runtime_errors_carry_the_line() {
    let (out, reporter) = run("print 1;\nprint nil + 1;\nprint 2;");

    assert_eq!(out, "1\n");
    assert_eq!(reporter.runtime.len(), 1);
    assert_eq!(
        reporter.runtime[0].to_string(),
        "Operands must be two numbers or a string and another object.\n[line 2]"
    );
}

#[test]
fn comma_and_conditional() {
    assert_prints(
        "print (1, 2);
        print true ? \"y\" : \"n\";
        print nil ? 1 : 2;
        print false ? 1 : true ? 2 : 3;",
        "2\ny\n2\n2\n",
    );
}

#[test]
fn logical_operators_return_operands() {
    assert_prints(
        "print nil or \"x\"; print 1 and 2; print false and undefinedName;",
        "x\n2\nfalse\n",
    );
}

#[test]
fn break_and_continue() {
    assert_prints(
        "for (var i = 0; i < 10; i = i + 1) {
            if (i == 2) continue;
            if (i == 5) break;
            print i;
        }",
        "0\n1\n3\n4\n",
    );

    assert_prints(
        "var i = 0;
        while (true) {
            i = i + 1;
            if (i < 3) continue;
            break;
        }
        print i;",
        "3\n",
    );
}

#[test]
fn return_unwinds_out_of_loops() {
    assert_prints(
        "fun first() { for (var i = 0; ; i = i + 1) { if (i == 4) return i; } }
        print first();",
        "4\n",
    );
}

#[test]
fn anonymous_functions() {
    assert_prints(
        "var twice = fun (f, x) { return f(f(x)); };
        print twice(fun (n) { return n * 3; }, 2);
        fun (s) { print s; }(\"now\");
        print fun () {};",
        "18\nnow\n<anon fn>\n",
    );
}

#[test]
fn getters_and_setters() {
    assert_prints(
        "class Circle {
            init(r) { this.r = r; }
            get area { return 3 * this.r * this.r; }
            set radius(value) { this.r = value; }
        }
        var c = Circle(2);
        print c.area;
        c.radius = 3;
        print c.r;
        print c.area;",
        "12\n3\n27\n",
    );
}

#[test]
fn setter_parameters_are_constant() {
    assert_runtime_error(
        "class A { set v(x) { x = 2; } } A().v = 1;",
        "Cannot reassign constant 'x'.",
    );

    // Ordinary method parameters stay mutable.
    assert_prints(
        "class A { m(x) { x = x + 1; return x; } } print A().m(1);",
        "2\n",
    );
}

#[test]
fn getters_run_when_reached_through_super() {
    assert_prints(
        "class A { get g { return \"a\"; } }
        class B < A { get g { return \"g\" + super.g; } }
        print B().g;",
        "ga\n",
    );
}

#[test]
fn class_methods() {
    assert_prints(
        "class Math {
            class square(n) { return n * n; }
        }
        print Math.square(3);
        print Math().square(2);
        print Math.Math;
        print Math;",
        "9\n4\n<cls Math>\n<cls Math>\n",
    );

    assert_prints(
        "class Base { class make() { return \"made\"; } }
        class Derived < Base {}
        print Derived.make();",
        "made\n",
    );
}

#[test]
fn fields_shadow_methods() {
    assert_prints(
        "class A { m() { return \"method\"; } }
        var a = A();
        print a.m();
        a.m = \"field\";
        print a.m;",
        "method\nfield\n",
    );
}

#[test]
fn bound_methods_remember_this() {
    assert_prints(
        "class Person {
            init(name) { this.name = name; }
            greet() { print \"hi \" + this.name; }
        }
        var greet = Person(\"ann\").greet;
        greet();",
        "hi ann\n",
    );
}

#[test]
fn initializer_returns_the_instance() {
    assert_prints(
        "class P { init(x) { this.x = x; return; } }
        var p = P(1);
        print p.init(5) == p;
        print p.x;
        print p;",
        "true\n5\n<inst P>\n",
    );
}

#[test]
fn property_errors() {
    assert_runtime_error("class A {} print A().nope;", "Undefined property 'nope'.");
    assert_runtime_error("class A {} print A.nope;", "Undefined property 'nope'.");
    assert_runtime_error("var s = \"x\"; print s.length;", "Only instances have properties.");
    assert_runtime_error("var s = \"x\"; s.length = 1;", "Only instances have fields.");
    assert_runtime_error("var x = 1; class A < x {}", "Superclass must be a class.");
}

#[test]
fn call_errors() {
    assert_runtime_error("fun f(a) {} f();", "Expected 1 arguments but got 0.");
    assert_runtime_error("class A { init(a, b) {} } A(1);", "Expected 2 arguments but got 1.");
    assert_runtime_error("\"x\"();", "Can only call functions and classes.");
    assert_runtime_error("print y;", "Undefined variable 'y'.");
    assert_runtime_error("y = 1;", "Undefined variable 'y'.");
}

#[test]
fn natives() {
    assert_prints(
        "print abs(-3);
        print round(2.5);
        print uppercase(\"ab\") + lowercase(\"CD\");
        print isNumber(1);
        print isString(1);
        print stringify(3) + \"!\";
        print clock() > 0;
        var r = rand();
        print r >= 0 and r < 1;
        print clock;",
        "3\n3\nABcd\ntrue\nfalse\n3!\ntrue\ntrue\n<native fn clock>\n",
    );

    assert_runtime_error("print abs(\"x\");", "abs() expects a number but got string.");
}

#[test]
fn printed_forms() {
    assert_prints(
        "print 1.5; print 3; print -0.25; print nil; print true;
        fun f() {} print f;",
        "1.5\n3\n-0.25\nnil\ntrue\n<fn f>\n",
    );
}

#[test]
fn special_numbers_print_like_lox() {
    assert_prints(
        "print -0;
        var x = 1;
        for (var i = 0; i < 400; i = i + 1) x = x * 10;
        print x;
        print -x;",
        "-0\nInfinity\n-Infinity\n",
    );
}

#[test]
fn input_reads_from_the_injected_reader() {
    let (out, reporter) = run_with_input(
        "var a; var b; var c; var d;
        input a; input b; input c; input d;
        print a + 1; print b; print c; print d;",
        "41\nhello\ntrue\n",
    );

    assert!(reporter.runtime.is_empty(), "{:?}", reporter.runtime);
    assert_eq!(out, "42\nhello\ntrue\nnil\n");
}

#[test]
fn input_reads_nan_and_infinity_as_numbers() {
    let (out, _) = run_with_input("var x; input x; print isNumber(x); print x;", "NaN\n");
    assert_eq!(out, "true\nNaN\n");

    let (out, _) = run_with_input("var x; input x; print isNumber(x); print x;", "Infinity\n");
    assert_eq!(out, "true\nInfinity\n");

    let (out, _) = run_with_input("var x; input x; print isNumber(x);", "inf\n");
    assert_eq!(out, "false\n");
}

#[test]
fn input_needs_a_declared_mutable_variable() {
    let (_, reporter) = run_with_input("val k = 1; input k;", "2\n");
    assert_eq!(reporter.runtime.len(), 1);
    assert_eq!(reporter.runtime[0].message, "Cannot reassign constant 'k'.");

    let (_, reporter) = run_with_input("{ val k = 1; input k; }", "2\n");
    assert_eq!(reporter.runtime.len(), 1);
    assert_eq!(reporter.runtime[0].message, "Cannot reassign constant 'k'.");

    let (_, reporter) = run_with_input("input nope;", "2\n");
    assert_eq!(reporter.runtime.len(), 1);
    assert_eq!(reporter.runtime[0].message, "Undefined variable 'nope'.");
}

#[test]
fn static_errors_prevent_execution() {
    let (out, reporter) = run("print 1; print ;");
    assert_eq!(out, "");
    assert_eq!(reporter.syntax.len(), 1);

    let (out, reporter) = run("print 1; return 2;");
    assert_eq!(out, "");
    assert_eq!(reporter.resolution.len(), 1);

    let (out, reporter) = run("print 1; @");
    assert_eq!(out, "");
    assert_eq!(reporter.scan.len(), 1);
}

#[test]
fn session_survives_runtime_errors() {
    let mut out: Vec<u8> = Vec::new();
    let mut reporter = CollectingReporter::new();

    {
        let mut lox = Lox::with_io(&mut out, "".as_bytes());

        lox.run("var a = 1; { var a = 2; print nil + 1; }", &mut reporter);
        assert_eq!(reporter.runtime.len(), 1);
        reporter.reset();

        lox.run("print a;", &mut reporter);
        assert!(!reporter.had_runtime_error());
    }

    assert_eq!(String::from_utf8(out).unwrap(), "1\n");
}

#[test]
fn prompt_lines_print_trailing_expressions() {
    let mut out: Vec<u8> = Vec::new();
    let mut reporter = CollectingReporter::new();

    {
        let mut lox = Lox::with_io(&mut out, "".as_bytes());

        lox.run_line("var a = 1; a + 2", &mut reporter);
        lox.run_line("print a;", &mut reporter);
        lox.run_line("a", &mut reporter);
        lox.run_line("fun f() { return a * 10; } f()", &mut reporter);
        lox.run_line("{ var b = 5; }", &mut reporter);
        lox.run_line("{ print 4; } 5", &mut reporter);

        assert!(!reporter.had_error(), "{:?}", reporter);
        assert!(!reporter.had_runtime_error(), "{:?}", reporter);
    }

    assert_eq!(String::from_utf8(out).unwrap(), "3\n1\n1\n10\n4\n5\n");
}

#[test]
fn evaluate_prints_one_expression() {
    let mut out: Vec<u8> = Vec::new();
    let mut reporter = CollectingReporter::new();

    {
        let mut lox = Lox::with_io(&mut out, "".as_bytes());
        lox.evaluate("\"a\" + \"b\"", &mut reporter);
        lox.evaluate("1 +", &mut reporter);
    }

    assert_eq!(String::from_utf8(out).unwrap(), "ab\n");
    assert_eq!(reporter.syntax.len(), 1);
}

#[test]
fn collected_errors_keep_pipeline_order() {
    let mut reporter = CollectingReporter::new();

    {
        let mut lox = Lox::with_io(Vec::new(), "".as_bytes());
        lox.run("print @;", &mut reporter);
        lox.run("print ;", &mut reporter);
        lox.run("break;", &mut reporter);
        lox.run("print -nil;", &mut reporter);
    }

    let errors = reporter.into_errors();
    assert_eq!(errors.len(), 4);
    assert!(matches!(errors[0], LoxError::Lex { line: 1, .. }));
    assert!(matches!(errors[1], LoxError::Syntax(_)));
    assert!(matches!(errors[2], LoxError::Resolution(_)));
    assert!(matches!(errors[3], LoxError::Runtime(_)));
    assert_eq!(errors[3].to_string(), "Operand must be a number.\n[line 1]");
}
