use std::rc::Rc;

use astgen::generate_ast;

use crate::{
    stmt::Stmt,
    token::Token,
    value,
};

generate_ast!(
    Expr,
    [
        Assign             => { name: Token, value: Box<Expr> };
        Binary             => { left: Box<Expr>, op: Token, right: Box<Expr> };
        Call               => { callee: Box<Expr>, paren: Token, arguments: Vec<Expr> };
        FunctionExpression => { params: Vec<Token>, body: Rc<[Stmt]> };
        Grouping           => { expression: Box<Expr> };
        Literal            => { value: value::Literal };
        Logical            => { left: Box<Expr>, op: Token, right: Box<Expr> };
        Ternary            => { left: Box<Expr>, left_op: Token, middle: Box<Expr>, right_op: Token, right: Box<Expr> };
        Unary              => { op: Token, right: Box<Expr> };
        Variable           => { name: Token };
    ]
);
