use std::{
    cell::RefCell,
    io::Write,
    rc::Rc,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    environment::Environment,
    error::{Error, Result},
    expr::{self, Expr},
    stmt::{self, Stmt},
    token::{TokenKind, Token},
    value::Value,
};

/// Deepest chain of active calls before a program is stopped with "Stack overflow.".
const MAX_CALL_DEPTH: usize = 1000;

/// Below this much remaining stack, a call continues on a freshly allocated segment.
const RED_ZONE: usize = 100 * 1024;
const STACK_PER_CALL: usize = 1024 * 1024;

/// How a statement finished. `Return` unwinds to the nearest call.
#[derive(Debug, PartialEq)]
pub(crate) enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter<W> {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    writer: W,
    call_depth: usize,
}

impl <W: Write> Interpreter<W> {
    pub fn new(writer: W) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("clock", Value::new_native_fn("clock", 0, clock));
        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            writer,
            call_depth: 0,
        }
    }

    /// Where `print` output goes.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Runs `statements` in order against the global environment, stopping
    /// at the first runtime error. Definitions persist between calls.
    #[tracing::instrument(level = "trace", skip_all, fields(statements = statements.len()))]
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        for s in statements.iter() {
            self.execute(s)?;
        }
        Ok(())
    }

    fn execute(&mut self, s: &Stmt) -> Result<Flow> {
        match s {
            Stmt::Block(b) => {
                let environment = Environment::from(&self.environment);
                self.execute_block(&b.statements, environment)
            },
            Stmt::Expression(e) => {
                self.evaluate(&e.expression)?;
                Ok(Flow::Normal)
            },
            Stmt::Function(f) => {
                let function = Value::new_function(
                    Some(f.name.clone()),
                    f.params.clone(),
                    Rc::clone(&f.body),
                    Rc::clone(&self.environment),
                );
                self.environment.borrow_mut().define(f.name.lexeme.clone(), function);
                Ok(Flow::Normal)
            },
            Stmt::If(i) => {
                if self.evaluate(&i.condition)?.is_truthy() {
                    self.execute(&i.then_branch)
                } else if let Some(else_branch) = &i.else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            },
            Stmt::Print(p) => {
                let value = self.evaluate(&p.expression)?;
                writeln!(self.writer, "{}", value)?;
                Ok(Flow::Normal)
            },
            Stmt::Return(r) => self.execute_return(r),
            Stmt::Var(v) => {
                let value = if let Some(initializer) = &v.initializer {
                    self.evaluate(initializer)?
                } else {
                    Value::Nil
                };
                self.environment.borrow_mut().define(v.name.lexeme.clone(), value);
                Ok(Flow::Normal)
            },
            Stmt::While(w) => {
                while self.evaluate(&w.condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(&w.body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            },
        }
    }

    fn execute_return(&mut self, r: &stmt::Return) -> Result<Flow> {
        if self.call_depth == 0 {
            return Err(Error::runtime(r.keyword.clone(), "Can't return from top-level code."));
        }
        let value = match &r.value {
            Some(value) => self.evaluate(value)?,
            None => Value::Nil,
        };
        Ok(Flow::Return(value))
    }

    /// Runs `statements` with `environment` as the current scope, putting the
    /// previous scope back however the block is left.
    pub(crate) fn execute_block(&mut self, statements: &[Stmt], environment: Environment) -> Result<Flow> {
        let previous = std::mem::replace(&mut self.environment, Rc::new(RefCell::new(environment)));
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for statement in statements {
            if let Flow::Return(value) = self.execute(statement)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn evaluate(&mut self, e: &Expr) -> Result<Value> {
        match e {
            Expr::Assign(a) => {
                let value = self.evaluate(&a.value)?;
                self.environment.borrow_mut().assign(&a.name, value.clone())?;
                Ok(value)
            },
            Expr::Binary(b) => self.evaluate_binary(b),
            Expr::Call(c) => self.evaluate_call(c),
            Expr::FunctionExpression(f) => Ok(Value::new_function(
                None,
                f.params.clone(),
                Rc::clone(&f.body),
                Rc::clone(&self.environment),
            )),
            Expr::Grouping(g) => self.evaluate(&g.expression),
            Expr::Literal(l) => Ok(Value::from(&l.value)),
            Expr::Logical(l) => {
                let left = self.evaluate(&l.left)?;

                use TokenKind::*;
                Ok(match (&l.op.kind, left.is_truthy()) {
                    (Or, true) | (And, false) => left,
                    (Or, false) | (And, true) => self.evaluate(&l.right)?,
                    _ => unreachable!("Logical expression must be either And or Or.")
                })
            },
            Expr::Ternary(t) => {
                if self.evaluate(&t.left)?.is_truthy() {
                    self.evaluate(&t.middle)
                } else {
                    self.evaluate(&t.right)
                }
            },
            Expr::Unary(u) => self.evaluate_unary(u),
            Expr::Variable(v) => self.look_up(&v.name),
        }
    }

    // The global table is consulted last, after the whole scope chain.
    fn look_up(&self, name: &Token) -> Result<Value> {
        let local = self.environment.borrow().get(&name.lexeme);
        local
            .or_else(|| self.globals.borrow().get(&name.lexeme))
            .ok_or_else(|| Error::undefined_variable(name))
    }

    fn evaluate_binary(&mut self, e: &expr::Binary) -> Result<Value> {
        let left = self.evaluate(e.left.as_ref())?;
        let right = self.evaluate(e.right.as_ref())?;

        use Value::Bool;
        match e.op.kind {
            TokenKind::Minus => compute_if_numbers(&e.op, left, right, |l, r| l - r),
            TokenKind::Plus => compute_if_numbers(&e.op, left, right, |l, r| l + r),
            TokenKind::Slash => compute_if_numbers(&e.op, left, right, |l, r| l / r),
            TokenKind::Star => compute_if_numbers(&e.op, left, right, |l, r| l * r),
            TokenKind::Greater => compute_if_numbers(&e.op, left, right, |l, r| l > r),
            TokenKind::GreaterEqual => compute_if_numbers(&e.op, left, right, |l, r| l >= r),
            TokenKind::Less => compute_if_numbers(&e.op, left, right, |l, r| l < r),
            TokenKind::LessEqual => compute_if_numbers(&e.op, left, right, |l, r| l <= r),
            TokenKind::EqualEqual => Ok(Bool(left.is_equal(&right))),
            TokenKind::BangEqual => Ok(Bool(!left.is_equal(&right))),
            _ => unreachable!("Binary expression with a non-binary operator."),
        }
    }

    fn evaluate_call(&mut self, e: &expr::Call) -> Result<Value> {
        let callee = self.evaluate(&e.callee)?;

        let args: Vec<Value> = e.arguments.iter()
            .map(|a| self.evaluate(a))
            .collect::<Result<_>>()?;

        let callable = callee.callable::<W>()
            .ok_or_else(|| Error::runtime(e.paren.clone(), "Can only call functions."))?;
        if args.len() != callable.arity() {
            return Err(Error::runtime(
                e.paren.clone(),
                format!("Expected {} arguments but got {}.", callable.arity(), args.len())
            ));
        }

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(Error::runtime(e.paren.clone(), "Stack overflow."));
        }

        self.call_depth += 1;
        let result = stacker::maybe_grow(RED_ZONE, STACK_PER_CALL, || callable.call(self, args));
        self.call_depth -= 1;
        result
    }

    fn evaluate_unary(&mut self, e: &expr::Unary) -> Result<Value> {
        let right = self.evaluate(e.right.as_ref())?;

        use Value::*;
        match (&e.op.kind, right) {
            (TokenKind::Minus, Number(right)) => Ok(Number(-right)),
            (TokenKind::Minus, String(right)) => right
                .parse::<f64>()
                .map(|n| Number(-n))
                .map_err(|_| Error::runtime(e.op.clone(), "Operand must be a number.")),
            (TokenKind::Minus, _) => Err(Error::runtime(e.op.clone(), "Operand must be a number.")),
            (TokenKind::Bang, right) => Ok(Bool(!right.is_truthy())),
            _ => unreachable!("Unary expression with a non-unary operator."),
        }
    }
}

fn compute_if_numbers<T: Into<Value>>(
    op: &Token,
    left: Value,
    right: Value,
    f: impl Fn(f64, f64) -> T
) -> Result<Value> {
    use Value::Number;
    if let Number(left) = left {
        if let Number(right) = right {
            return Ok(f(left, right).into())
        }
    }
    Err(Error::runtime(op.clone(), "Operands must be numbers."))
}

fn clock(_args: &[Value]) -> Value {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    Value::from(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::parse, scanner::scan};
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> (String, Result<()>) {
        let mut interpreter = Interpreter::new(Vec::new());
        let result = interpreter.interpret(&parse(scan(source)));
        let output = String::from_utf8_lossy(interpreter.writer()).into_owned();
        (output, result)
    }

    fn output_of(source: &str) -> String {
        let (output, result) = run(source);
        if let Err(e) = result {
            panic!("unexpected error: {}", e);
        }
        output
    }

    fn error_of(source: &str) -> Error {
        match run(source) {
            (_, Err(e)) => e,
            (output, Ok(())) => panic!("expected an error, got output {:?}", output),
        }
    }

    #[test]
    fn arithmetic_follows_precedence() {
        assert_eq!("44\n", output_of("print 2*(1+1+(2*10));"));
        assert_eq!("7\n", output_of("print 1 + 2 * 3;"));
        assert_eq!("-1\n", output_of("print 1 - 4 / 2 / 1;"));
    }

    #[test]
    fn plus_does_not_concatenate() {
        let e = error_of("print 'a' + 'b';");
        assert_eq!("[line 1] Error at '+': Operands must be numbers.", e.to_string());
    }

    #[test]
    fn negation_accepts_numeric_strings() {
        assert_eq!("-3.5\n", output_of("print -'3.5';"));
        assert!(error_of("print -'abc';").to_string().contains("Operand must be a number."));
        assert!(error_of("print -nil;").to_string().contains("Operand must be a number."));
    }

    #[test]
    fn negation_does_not_strip_whitespace() {
        let e = error_of("print -' 3';");
        assert_eq!("[line 1] Error at '-': Operand must be a number.", e.to_string());
        assert!(error_of("print -'3 ';").is_runtime_error());
    }

    #[test]
    fn comparisons_need_numbers() {
        assert_eq!("true\nfalse\n", output_of("print 1 < 2; print 2 <= 1;"));
        assert!(error_of("print 1 < 'b';").is_runtime_error());
    }

    #[test]
    fn logical_operators_short_circuit() {
        let source = "
            var calls = 0;
            fun touch() { calls = calls + 1; return true; }
            print false and touch();
            print true or touch();
            print nil or 'fallback';
            print calls;
        ";
        assert_eq!("false\ntrue\nfallback\n0\n", output_of(source));
    }

    #[test]
    fn ternary_evaluates_one_branch() {
        let source = "
            var hit = 0;
            fun bump() { hit = hit + 1; return hit; }
            print true ? 'yes' : bump();
            print nil ? bump() : 'no';
            print hit;
        ";
        assert_eq!("yes\nno\n0\n", output_of(source));
    }

    #[test]
    fn uninitialised_variables_hold_nil() {
        assert_eq!("nil\n", output_of("var x; print x;"));
    }

    #[test]
    fn undefined_variables_are_errors() {
        assert!(matches!(error_of("print y;"), Error::UndefinedVariable { .. }));
        assert!(matches!(error_of("y = 1;"), Error::UndefinedVariable { .. }));
    }

    #[test]
    fn assignment_is_an_expression() {
        assert_eq!("2\n2\n", output_of("var a = 1; print a = 2; print a;"));
    }

    #[test]
    fn execution_stops_at_the_first_runtime_error() {
        let (output, result) = run("print 1; print nope; print 2;");
        assert_eq!("1\n", output);
        assert!(result.is_err());
    }

    #[test]
    fn return_unwinds_out_of_loops() {
        let source = "
            fun first_over(limit) {
                var i = 0;
                while (true) {
                    if (i > limit) { return i; }
                    i = i + 1;
                }
            }
            print first_over(3);
        ";
        assert_eq!("4\n", output_of(source));
    }

    #[test]
    fn functions_without_return_give_nil() {
        assert_eq!("nil\n", output_of("fun f() { 1; } print f();"));
        assert_eq!("nil\n", output_of("fun f() { return; } print f();"));
    }

    #[test]
    fn top_level_return_is_an_error() {
        let e = error_of("return 1;");
        assert_eq!("[line 1] Error at 'return': Can't return from top-level code.", e.to_string());
    }

    #[test]
    fn arity_must_match_exactly() {
        let e = error_of("fun f(a, b) {} f(1);");
        assert!(e.to_string().contains("Expected 2 arguments but got 1."));
    }

    #[test]
    fn only_functions_are_callable() {
        let e = error_of("var x = 1; x();");
        assert!(e.to_string().contains("Can only call functions."));
    }

    #[test]
    fn environment_is_restored_after_a_failed_block() {
        let mut interpreter = Interpreter::new(Vec::new());
        let failed = interpreter.interpret(&parse(scan("var x = 'global'; { var x = 'local'; nope; }")));
        assert!(failed.is_err());
        interpreter.interpret(&parse(scan("print x;"))).expect("second run succeeds");
        assert_eq!("global\n", String::from_utf8_lossy(interpreter.writer()));
    }

    #[test]
    fn unbounded_recursion_is_a_runtime_error() {
        let mut interpreter = Interpreter::new(Vec::new());
        let e = interpreter.interpret(&parse(scan("fun f() { f(); } f();"))).unwrap_err();
        assert_eq!("[line 1] Error at ')': Stack overflow.", e.to_string());
        assert_eq!(0, interpreter.call_depth);

        interpreter.interpret(&parse(scan("print 1;"))).expect("interpreter is still usable");
        assert_eq!("1\n", String::from_utf8_lossy(interpreter.writer()));
    }

    #[test]
    fn recursion_below_the_limit_completes() {
        let source = "
            fun count(n) { if (n == 0) return 0; return 1 + count(n - 1); }
            print count(900);
        ";
        assert_eq!("900\n", output_of(source));
    }

    #[test]
    fn clock_is_a_native_function() {
        assert_eq!("<native fn>\ntrue\n", output_of("print clock; print clock() > 0;"));
    }

    #[test]
    fn functions_print_by_name() {
        assert_eq!("<fn add>\n<fn>\n", output_of("fun add() {} print add; print fun () {};"));
    }
}
