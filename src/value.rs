use std::{
    cell::RefCell,
    fmt::{self, Debug, Display},
    rc::Rc,
};

use crate::{
    environment::Environment,
    stmt::Stmt,
    token::Token,
};

/// A constant as it appears in the source, before evaluation.
#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Bool(bool),
    Nil,
    Number(f64),
    String(String),
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Literal::Number(n)
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Literal::*;
        match self {
            Bool(b) => write!(f, "{}", b),
            Nil => write!(f, "nil"),
            Number(n) => write!(f, "{}", n),
            String(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Bool(bool),
    Function(Rc<Function>),
    NativeFn(NativeFn),
    Nil,
    Number(f64),
    String(String),
}

impl Value {
    pub(crate) fn new_native_fn(name: &'static str, arity: usize, body: fn(&[Value]) -> Value) -> Self {
        Value::NativeFn(NativeFn { name, arity, body })
    }

    pub(crate) fn new_function(
        name: Option<Token>,
        params: Vec<Token>,
        body: Rc<[Stmt]>,
        closure: Rc<RefCell<Environment>>,
    ) -> Self {
        Value::Function(Rc::new(Function { name, params, body, closure }))
    }

    pub fn is_equal(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Nil, Nil) => true,
            (Bool(s), Bool(o)) => s == o,
            (Number(s), Number(o)) => {
                // NaN == NaN holds here, unlike IEEE 754.
                if s.is_nan() && o.is_nan() {
                    true
                } else {
                    s == o
                }
            },
            (String(s), String(o)) => s == o,
            (Function(s), Function(o)) => s == o,
            (NativeFn(s), NativeFn(o)) => s == o,
            _ => false,
        }
    }

    /// `nil` and `false` are falsey; everything else, `0` and `""` included, is truthy.
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        !matches!(self, Bool(false) | Nil)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&Literal> for Value {
    fn from(l: &Literal) -> Self {
        match l {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Nil => Value::Nil,
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Value::*;
        match self {
            Bool(b) => write!(f, "{}", b),
            Function(fnc) => write!(f, "{}", fnc),
            NativeFn(_) => write!(f, "<native fn>"),
            Nil => write!(f, "nil"),
            Number(n) => write!(f, "{}", n),
            String(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Clone)]
pub struct NativeFn {
    pub(crate) name: &'static str,
    pub(crate) arity: usize,
    pub(crate) body: fn(&[Value]) -> Value,
}

impl Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl PartialEq for NativeFn {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A user function together with the environment it was defined in.
/// Anonymous function expressions have no name.
pub struct Function {
    pub(crate) name: Option<Token>,
    pub(crate) params: Vec<Token>,
    pub(crate) body: Rc<[Stmt]>,
    pub(crate) closure: Rc<RefCell<Environment>>,
}

// Closures may be reachable from their own environment, so neither
// comparison nor debug output may walk into `closure`.
impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body) && Rc::ptr_eq(&self.closure, &other.closure)
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<fn {}>", name.lexeme),
            None => write!(f, "<fn>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_nil_and_false_are_falsey() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String("".into()).is_truthy());
    }

    #[test]
    fn nil_only_equals_nil() {
        assert!(Value::Nil.is_equal(&Value::Nil));
        assert!(!Value::Nil.is_equal(&Value::Bool(false)));
        assert!(!Value::Number(0.0).is_equal(&Value::Nil));
    }

    #[test]
    fn values_of_different_kinds_are_never_equal() {
        assert!(!Value::Number(1.0).is_equal(&Value::String("1".into())));
        assert!(!Value::Bool(true).is_equal(&Value::Number(1.0)));
    }

    #[test]
    fn nan_equals_nan() {
        assert!(Value::Number(f64::NAN).is_equal(&Value::Number(f64::NAN)));
    }

    #[test]
    fn integral_numbers_print_without_a_fraction() {
        assert_eq!("44", Value::Number(44.0).to_string());
        assert_eq!("2.5", Value::Number(2.5).to_string());
    }

    #[test]
    fn functions_print_their_name() {
        let closure = Rc::new(RefCell::new(Environment::new()));
        let name = Token::new(crate::token::TokenKind::Identifier, "add", 1);
        let named = Value::new_function(Some(name), vec![], Rc::from(Vec::new()), Rc::clone(&closure));
        let anonymous = Value::new_function(None, vec![], Rc::from(Vec::new()), closure);
        assert_eq!("<fn add>", named.to_string());
        assert_eq!("<fn>", anonymous.to_string());
    }
}
