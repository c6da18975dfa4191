use std::rc::Rc;

use astgen::generate_ast;

use crate::{
    expr::Expr,
    token::Token,
};

// `for` loops have no node of their own: the parser lowers them to
// `Block`s around a `While`.
generate_ast!(
    Stmt,
    [
        Block      => { statements: Vec<Stmt> };
        Expression => { expression: Expr };
        Function   => { name: Token, params: Vec<Token>, body: Rc<[Stmt]> };
        If         => { condition: Expr, then_branch: Box<Stmt>, else_branch: Option<Box<Stmt>> };
        Print      => { expression: Expr };
        Return     => { keyword: Token, value: Option<Expr> };
        Var        => { name: Token, initializer: Option<Expr> };
        While      => { condition: Expr, body: Box<Stmt> };
    ]
);
