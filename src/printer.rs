use crate::{
    expr::Expr,
    stmt::Stmt,
    token::Token,
};

/// Renders an expression in parenthesised prefix form, e.g. `(* (- 123) (group 45.67))`.
pub fn print_expr(e: &Expr) -> String {
    match e {
        Expr::Assign(a) => parenthesize(&format!("= {}", a.name.lexeme), &[a.value.as_ref()]),
        Expr::Binary(b) => parenthesize(&b.op.lexeme, &[b.left.as_ref(), b.right.as_ref()]),
        Expr::Call(c) => {
            let mut exprs = vec![c.callee.as_ref()];
            exprs.extend(c.arguments.iter());
            parenthesize("call", &exprs)
        },
        Expr::FunctionExpression(f) => function("fun", &f.params, &f.body),
        Expr::Grouping(g) => parenthesize("group", &[g.expression.as_ref()]),
        Expr::Literal(l) => l.value.to_string(),
        Expr::Logical(l) => parenthesize(&l.op.lexeme, &[l.left.as_ref(), l.right.as_ref()]),
        Expr::Ternary(t) => parenthesize(
            &format!("{}{}", t.left_op.lexeme, t.right_op.lexeme),
            &[t.left.as_ref(), t.middle.as_ref(), t.right.as_ref()],
        ),
        Expr::Unary(u) => parenthesize(&u.op.lexeme, &[u.right.as_ref()]),
        Expr::Variable(v) => v.name.lexeme.clone(),
    }
}

pub fn print_stmt(s: &Stmt) -> String {
    match s {
        Stmt::Block(b) => {
            let mut out = String::from("(block");
            for statement in &b.statements {
                out.push(' ');
                out.push_str(&print_stmt(statement));
            }
            out.push(')');
            out
        },
        Stmt::Expression(e) => parenthesize(";", &[&e.expression]),
        Stmt::Function(f) => function(&format!("fun {}", f.name.lexeme), &f.params, &f.body),
        Stmt::If(i) => {
            let mut out = format!("(if {} {}", print_expr(&i.condition), print_stmt(&i.then_branch));
            if let Some(else_branch) = &i.else_branch {
                out.push(' ');
                out.push_str(&print_stmt(else_branch));
            }
            out.push(')');
            out
        },
        Stmt::Print(p) => parenthesize("print", &[&p.expression]),
        Stmt::Return(r) => match &r.value {
            Some(value) => parenthesize("return", &[value]),
            None => "(return)".to_string(),
        },
        Stmt::Var(v) => match &v.initializer {
            Some(initializer) => parenthesize(&format!("var {}", v.name.lexeme), &[initializer]),
            None => format!("(var {})", v.name.lexeme),
        },
        Stmt::While(w) => format!("(while {} {})", print_expr(&w.condition), print_stmt(&w.body)),
    }
}

fn parenthesize(name: &str, exprs: &[&Expr]) -> String {
    let mut s = String::new();
    s.push('(');
    s.push_str(name);

    for e in exprs.iter() {
        s.push(' ');
        s.push_str(print_expr(e).as_str());
    }

    s.push(')');
    s
}

fn function(head: &str, params: &[Token], body: &[Stmt]) -> String {
    let params: Vec<_> = params.iter().map(|p| p.lexeme.as_str()).collect();
    let mut s = format!("({} ({})", head, params.join(" "));
    for statement in body {
        s.push(' ');
        s.push_str(&print_stmt(statement));
    }
    s.push(')');
    s
}
