use pretty_assertions::assert_eq;
use treelox::{parse, scan, Error, Interpreter};

fn run_in(interpreter: &mut Interpreter<Vec<u8>>, source: &str) -> Result<(), Error> {
    interpreter.interpret(&parse(scan(source)))
}

fn output_of(source: &str) -> String {
    let mut interpreter = Interpreter::new(Vec::new());
    if let Err(e) = run_in(&mut interpreter, source) {
        panic!("unexpected error: {}", e);
    }
    String::from_utf8_lossy(interpreter.writer()).into_owned()
}

fn lines_of(source: &str) -> Vec<String> {
    output_of(source).lines().map(str::to_owned).collect()
}

#[test]
fn print_statements() {
    assert_eq!(vec!["hello"], lines_of("print 'hello';"));
    assert_eq!(vec!["hello"], lines_of("print \"hello\";"));
    assert_eq!(vec!["true"], lines_of("print 'hello' == \"hello\";"));
    assert_eq!(vec!["true", "false"], lines_of("print 1==1; print 1==2;"));
    assert_eq!(vec!["true"], lines_of("print 1<2;"));
    assert_eq!(vec!["44"], lines_of("print 2*(1+1+(2*10));"));
}

#[test]
fn equality_across_kinds_is_false() {
    assert_eq!(
        vec!["false", "false", "true", "false"],
        lines_of("print 1 == '1'; print nil == false; print nil == nil; print true != true;")
    );
}

#[test]
fn truthiness() {
    let source = "
        if (0) print 'zero'; else print 'no zero';
        if ('') print 'empty'; else print 'no empty';
        if (nil) print 'nil'; else print 'no nil';
        if (false) print 'false'; else print 'no false';
        print !0;
    ";
    assert_eq!(vec!["zero", "empty", "no nil", "no false", "false"], lines_of(source));
}

#[test]
fn block_shadowing() {
    assert_eq!(vec!["2", "1"], lines_of("var x=1; { var x=2; print x; } print x;"));
}

#[test]
fn assignment_reaches_the_enclosing_binding() {
    assert_eq!(vec!["2", "2"], lines_of("var x=1; { x=2; print x; } print x;"));
}

#[test]
fn for_loop_matches_its_while_form() {
    let for_loop = lines_of("for(var i=0;i<3;i=i+1) print i;");
    let while_loop = lines_of("{ var i=0; while (i<3) { print i; i=i+1; } }");
    assert_eq!(vec!["0", "1", "2"], for_loop);
    assert_eq!(while_loop, for_loop);
}

#[test]
fn for_loop_variable_is_scoped_to_the_loop() {
    let mut interpreter = Interpreter::new(Vec::new());
    run_in(&mut interpreter, "for (var i = 0; i < 1; i = i + 1) {}").expect("loop runs");
    let e = run_in(&mut interpreter, "print i;").unwrap_err();
    assert!(matches!(e, Error::UndefinedVariable { .. }));
}

#[test]
fn recursion() {
    let source = "
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(15);
    ";
    assert_eq!(vec!["610"], lines_of(source));
}

#[test]
fn counter_closures_are_independent() {
    let source = "
        fun make_counter() {
            var count = 0;
            fun increment() {
                count = count + 1;
                return count;
            }
            return increment;
        }
        var a = make_counter();
        var b = make_counter();
        print a();
        print a();
        print b();
        print a();
    ";
    assert_eq!(vec!["1", "2", "1", "3"], lines_of(source));
}

#[test]
fn closures_see_later_mutation_after_their_block_exits() {
    let source = "
        var show;
        var set;
        {
            var captured = 'before';
            fun read() { print captured; }
            fun write(v) { captured = v; }
            show = read;
            set = write;
        }
        show();
        set('after');
        show();
    ";
    assert_eq!(vec!["before", "after"], lines_of(source));
}

#[test]
fn closures_use_the_defining_scope_not_the_callers() {
    let source = "
        var x = 'global';
        fun show() { print x; }
        fun caller() {
            var x = 'local';
            show();
        }
        caller();
    ";
    assert_eq!(vec!["global"], lines_of(source));
}

#[test]
fn anonymous_functions_are_values() {
    let source = "
        fun apply(f, v) { return f(v); }
        var double = fun (n) { return n * 2; };
        print apply(double, 21);
        print apply(fun (n) { return n - 1; }, 10);
        print fun (a, b) { return a + b; }(1, 2);
    ";
    assert_eq!(vec!["42", "9", "3"], lines_of(source));
}

#[test]
fn anonymous_functions_are_not_bound_by_name() {
    let mut interpreter = Interpreter::new(Vec::new());
    assert!(parse(scan("var f = fun named() { return 1; };")).is_empty());
    run_in(&mut interpreter, "var f = fun () { return 1; }; print f;").expect("definition runs");
    assert_eq!("<fn>\n", String::from_utf8_lossy(interpreter.writer()));
}

#[test]
fn curried_calls() {
    let source = "
        fun add(a) {
            return fun (b) { return a + b; };
        }
        print add(1)(2);
    ";
    assert_eq!(vec!["3"], lines_of(source));
}

#[test]
fn arity_mismatch_is_fatal() {
    let mut interpreter = Interpreter::new(Vec::new());
    let e = run_in(&mut interpreter, "fun f(a,b){ print 'ran'; } f(1); print 'after';").unwrap_err();
    assert!(e.is_runtime_error());
    assert_eq!("[line 1] Error at ')': Expected 2 arguments but got 1.", e.to_string());
    assert!(interpreter.writer().is_empty());
}

#[test]
fn unbound_reads_and_writes_fail_but_declared_nil_does_not() {
    let mut interpreter = Interpreter::new(Vec::new());
    assert!(matches!(run_in(&mut interpreter, "print missing;"), Err(Error::UndefinedVariable { .. })));
    assert!(matches!(run_in(&mut interpreter, "missing = 1;"), Err(Error::UndefinedVariable { .. })));
    run_in(&mut interpreter, "var declared; print declared;").expect("declared variable reads as nil");
    assert_eq!("nil\n", String::from_utf8_lossy(interpreter.writer()));
}

#[test]
fn definitions_persist_across_runs() {
    let mut interpreter = Interpreter::new(Vec::new());
    run_in(&mut interpreter, "var total = 1;").expect("first line");
    run_in(&mut interpreter, "fun bump() { total = total + 1; }").expect("second line");
    assert!(run_in(&mut interpreter, "bump(1);").is_err());
    run_in(&mut interpreter, "bump(); print total;").expect("fourth line");
    assert_eq!("2\n", String::from_utf8_lossy(interpreter.writer()));
}

#[test]
fn runtime_errors_report_the_line() {
    let mut interpreter = Interpreter::new(Vec::new());
    let e = run_in(&mut interpreter, "var a = 1;\n\nprint a * nil;").unwrap_err();
    assert_eq!(Some(3), e.line());
}

#[test]
fn while_loops_have_no_iteration_cap() {
    let source = "
        var i = 0;
        while (i < 100000) i = i + 1;
        print i;
    ";
    assert_eq!(vec!["100000"], lines_of(source));
}

#[test]
fn partial_parse_still_runs_the_leading_statements() {
    assert_eq!(vec!["1"], lines_of("print 1; print (; print 2;"));
}

#[test]
fn runaway_recursion_stops_the_program_but_not_the_session() {
    let mut interpreter = Interpreter::new(Vec::new());
    let e = run_in(&mut interpreter, "fun f() { f(); }\nprint 'start';\nf();\nprint 'unreached';").unwrap_err();
    assert!(e.is_runtime_error());
    assert_eq!(Some(1), e.line());
    run_in(&mut interpreter, "print 1;").expect("session carries on");
    assert_eq!("start\n1\n", String::from_utf8_lossy(interpreter.writer()));
}
