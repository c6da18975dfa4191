use std::rc::Rc;

use peekmore::{PeekMore, PeekMoreIterator};

use crate::{
    error::{Error, Result},
    expr::Expr,
    stmt::Stmt,
    token::*,
    value,
};

const MAX_ARGUMENTS: usize = 255;

/// How deeply expressions and blocks may nest inside one another.
const MAX_NESTING: usize = 256;

const RED_ZONE: usize = 100 * 1024;
const STACK_PER_LEVEL: usize = 1024 * 1024;

const EQUALITY_TOKENS: &[&TokenKind] = &[
    &TokenKind::BangEqual,
    &TokenKind::EqualEqual,
];

const COMPARISON_TOKENS: &[&TokenKind] = &[
    &TokenKind::Greater,
    &TokenKind::GreaterEqual,
    &TokenKind::Less,
    &TokenKind::LessEqual,
];

const TERM_TOKENS: &[&TokenKind] = &[
    &TokenKind::Minus,
    &TokenKind::Plus,
];

const FACTOR_TOKENS: &[&TokenKind] = &[
    &TokenKind::Star,
    &TokenKind::Slash,
];

const UNARY_TOKENS: &[&TokenKind] = &[
    &TokenKind::Bang,
    &TokenKind::Minus,
];

/// Parses `tokens`, keeping the statements that precede the first syntax
/// error. Later statements are discarded even if they parse.
pub fn parse(tokens: Vec<Token>) -> Vec<Stmt> {
    let mut statements = Vec::new();
    for result in Parser::new(tokens.into_iter()).parse() {
        match result {
            Ok(statement) => statements.push(statement),
            Err(e) => {
                tracing::warn!(error = %e, "parse aborted");
                break;
            },
        }
    }
    statements
}

pub struct Parser<T: Iterator<Item = Token>> {
    tokens: PeekMoreIterator<T>,
    depth: usize,
}

impl <T: Iterator<Item = Token>> Parser<T> {
    pub fn new(tokens: T) -> Self {
        let tokens = tokens.peekmore();
        Parser { tokens, depth: 0 }
    }

    /// One result per top-level declaration. After an error the parser skips
    /// to the next statement boundary and carries on.
    pub fn parse(&mut self) -> Vec<Result<Stmt>> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            let result = self.declaration();
            if result.is_err() {
                self.synchronise();
            }
            statements.push(result);
        }
        statements
    }

    fn declaration(&mut self) -> Result<Stmt> {
        if self.check_next(&TokenKind::Class) {
            self.class_declaration()
        } else if self.check_next(&TokenKind::Fun) && self.check_nth(1, &TokenKind::Identifier) {
            self.advance()?;
            self.function("function").map(Stmt::Function)
        } else if self.match_single(&TokenKind::Var).is_some() {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let class = self.advance()?;
        Err(Error::syntactic(class, "Classes are not supported."))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(&TokenKind::Identifier, "Expected variable name.")?;

        let initializer = if self.match_single(&TokenKind::Equal).is_some() {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(&TokenKind::Semicolon, "Expected ';' after variable declaration.")?;
        Ok(Stmt::new_var(name, initializer))
    }

    fn statement(&mut self) -> Result<Stmt> {
        if self.match_single(&TokenKind::For).is_some() {
            self.for_statement()
        } else if self.match_single(&TokenKind::If).is_some() {
            self.if_statement()
        } else if self.match_single(&TokenKind::Print).is_some() {
            self.print_statement()
        } else if let Some(token) = self.match_single(&TokenKind::Return) {
            self.return_statement(token)
        } else if self.match_single(&TokenKind::While).is_some() {
            self.while_statement()
        } else if self.match_single(&TokenKind::LeftBrace).is_some() {
            Ok(Stmt::new_block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    // for (init; cond; incr) body  =>  { init; while (cond) { body; incr; } }
    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenKind::LeftParen, "Expected '(' after 'for'.")?;

        let initializer = if self.match_single(&TokenKind::Semicolon).is_some() {
            None
        } else if self.match_single(&TokenKind::Var).is_some() {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check_next(&TokenKind::Semicolon) {
            self.expression()?
        } else { Expr::new_literal(value::Literal::from(true)) };

        self.consume(&TokenKind::Semicolon, "Expected ';' after loop condition.")?;

        let increment = if !self.check_next(&TokenKind::RightParen) {
            Some(Stmt::new_expression(self.expression()?))
        } else { None };

        self.consume(&TokenKind::RightParen, "Expected ')' after for clauses.")?;

        let body = self.statement()?;
        let body = Box::new(match increment {
            Some(i) => Stmt::new_block(vec![body, i]),
            None => body,
        });
        let while_loop = Stmt::new_while(condition, body);
        let while_loop = match initializer {
            Some(i) => Stmt::new_block(vec![i, while_loop]),
            None => while_loop,
        };

        Ok(while_loop)
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenKind::LeftParen, "Expected '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(&TokenKind::RightParen, "Expected ')' after if condition.")?;

        // Taking `else` here binds it to the nearest `if`.
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_single(&TokenKind::Else).is_some() {
            Some(Box::new(self.statement()?))
        } else { None };

        Ok(Stmt::new_if(condition, then_branch, else_branch))
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let expression = self.expression()?;
        self.consume(&TokenKind::Semicolon, "Expected ';' after value.")?;
        Ok(Stmt::new_print(expression))
    }

    fn return_statement(&mut self, keyword: Token) -> Result<Stmt> {
        let value = if !self.check_next(&TokenKind::Semicolon) {
            Some(self.expression()?)
        } else { None };
        self.consume(&TokenKind::Semicolon, "Expected ';' after return value.")?;
        Ok(Stmt::new_return(keyword, value))
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenKind::LeftParen, "Expected '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(&TokenKind::RightParen, "Expected ')' after condition.")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::new_while(condition, body))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expression = self.expression()?;
        self.consume(&TokenKind::Semicolon, "Expected ';' after expression.")?;
        Ok(Stmt::new_expression(expression))
    }

    fn function(&mut self, kind: &str) -> Result<crate::stmt::Function> {
        let name = self.consume(
            &TokenKind::Identifier,
            format!("Expected {} name.", kind).as_str()
        )?;
        self.consume(
            &TokenKind::LeftParen,
            format!("Expected '(' after {} name.", kind).as_str()
        )?;
        let (params, body) = self.function_rest(kind)?;

        Ok(crate::stmt::Function { name, params, body })
    }

    /// Parameter list and body, starting just after the opening '('.
    fn function_rest(&mut self, kind: &str) -> Result<(Vec<Token>, Rc<[Stmt]>)> {
        let mut params = Vec::new();
        if !self.check_next(&TokenKind::RightParen) {
            loop {
                let param = self.consume(&TokenKind::Identifier, "Expected parameter name.")?;
                if params.len() >= MAX_ARGUMENTS {
                    return Err(Error::syntactic(param, "Can't have more than 255 parameters."))
                }
                params.push(param);
                if self.match_single(&TokenKind::Comma).is_none() { break }
            }
        }

        self.consume(&TokenKind::RightParen, "Expected ')' after parameters.")?;
        self.consume(
            &TokenKind::LeftBrace,
            format!("Expected '{{' before {} body.", kind).as_str()
        )?;

        Ok((params, Rc::from(self.block()?)))
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check_next(&TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(&TokenKind::RightBrace, "Expected '}' after block.")?;
        Ok(statements)
    }

    fn expression(&mut self) -> Result<Expr> {
        self.nested(Self::assignment)
    }

    fn nested<R>(&mut self, parse: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        if self.depth >= MAX_NESTING {
            return Err(Error::syntactic(self.peek_token()?, "Too much nesting."));
        }

        self.depth += 1;
        let result = stacker::maybe_grow(RED_ZONE, STACK_PER_LEVEL, || parse(self));
        self.depth -= 1;
        result
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr = self.ternary()?;
        if let Some(equals) = self.match_single(&TokenKind::Equal) {
            if let Expr::Variable(lhs) = expr {
                let value = self.assignment()?;
                Ok(Expr::new_assign(lhs.name, Box::new(value)))
            } else {
                Err(Error::syntactic(equals, "Invalid assignment target."))
            }
        } else {
            Ok(expr)
        }
    }

    fn ternary(&mut self) -> Result<Expr> {
        let condition = self.or()?;
        if let Some(question) = self.match_single(&TokenKind::Question) {
            let middle = self.expression()?;
            let colon = self.consume(&TokenKind::Colon, "Expected ':' in conditional expression.")?;
            let right = self.ternary()?;
            Ok(Expr::new_ternary(
                Box::new(condition),
                question,
                Box::new(middle),
                colon,
                Box::new(right),
            ))
        } else {
            Ok(condition)
        }
    }

    fn or(&mut self) -> Result<Expr> {
        let mut e = self.and()?;

        while let Some(op) = self.match_single(&TokenKind::Or) {
            let right = Box::new(self.and()?);
            e = Expr::new_logical(Box::new(e), op, right);
        }

        Ok(e)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut e = self.equality()?;

        while let Some(op) = self.match_single(&TokenKind::And) {
            let right = Box::new(self.equality()?);
            e = Expr::new_logical(Box::new(e), op, right);
        }

        Ok(e)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.match_binary_precedence_with_tokens(
            Self::comparison,
            EQUALITY_TOKENS
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.match_binary_precedence_with_tokens(
            Self::term,
            COMPARISON_TOKENS
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.match_binary_precedence_with_tokens(
            Self::factor,
            TERM_TOKENS
        )
    }

    fn factor(&mut self) -> Result<Expr> {
        self.match_binary_precedence_with_tokens(
            Self::unary,
            FACTOR_TOKENS
        )
    }

    fn unary(&mut self) -> Result<Expr> {
        if let Some(token) = self.match_any(UNARY_TOKENS) {
            let right = Box::new(self.nested(Self::unary)?);
            Ok(Expr::new_unary(token, right))
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> Result<Expr> {
        let mut e = self.primary()?;

        while self.match_single(&TokenKind::LeftParen).is_some() {
            e = self.finish_call(e)?;
        }

        Ok(e)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut args = Vec::new();

        if !self.check_next(&TokenKind::RightParen) {
            loop {
                if args.len() >= MAX_ARGUMENTS {
                    let token = self.peek_token()?;
                    return Err(Error::syntactic(token, "Can't have more than 255 arguments."))
                }
                args.push(self.expression()?);
                if self.match_single(&TokenKind::Comma).is_none() { break }
            }
        }
        let paren = self.consume(
            &TokenKind::RightParen,
            "Expected ')' after arguments."
        )?;

        Ok(Expr::new_call(Box::new(callee), paren, args))
    }

    fn primary(&mut self) -> Result<Expr> {
        let next = self.peek_token()?;

        let expr = match &next.kind {
            TokenKind::True => Expr::new_literal(true.into()),
            TokenKind::False => Expr::new_literal(false.into()),
            TokenKind::Nil => Expr::new_literal(value::Literal::Nil),
            TokenKind::Number(_) | TokenKind::String(_) => match next.literal() {
                Some(literal) => Expr::new_literal(literal),
                None => return Err(Error::syntactic(next.clone(), "Expected expression.")),
            },
            TokenKind::Identifier => Expr::new_variable(next.clone()),
            TokenKind::LeftParen => {
                self.advance()?;
                let expression = Box::new(self.expression()?);
                self.consume(&TokenKind::RightParen, "Expected ')' after expression.")?;
                return Ok(Expr::new_grouping(expression))
            },
            TokenKind::Fun => {
                self.advance()?;
                self.consume(&TokenKind::LeftParen, "Expected '(' after 'fun'.")?;
                let (params, body) = self.function_rest("function")?;
                return Ok(Expr::new_function_expression(params, body))
            },
            _ => return Err(Error::syntactic(next.clone(), "Expected expression.")),
        };

        self.advance()?;
        Ok(expr)
    }

    fn is_at_end(&mut self) -> bool {
        self.tokens.peek()
            .map_or(true, |t| t.kind == TokenKind::EndOfFile)
    }

    fn check_next(&mut self, kind: &TokenKind) -> bool {
        self.check_nth(0, kind)
    }

    fn check_nth(&mut self, n: usize, kind: &TokenKind) -> bool {
        self.tokens.peek_nth(n)
            .map(|t| &t.kind == kind)
            .unwrap_or(false)
    }

    fn peek_token(&mut self) -> Result<Token> {
        self.tokens.peek().cloned().ok_or_else(Error::unexpected)
    }

    fn advance(&mut self) -> Result<Token> {
        self.tokens.next().ok_or_else(Error::unexpected)
    }

    fn consume(&mut self, kind: &TokenKind, error_msg: &str) -> Result<Token> {
        if let Some(token) = self.match_single(kind) {
            Ok(token)
        } else {
            Err(Error::syntactic(self.peek_token()?, error_msg))
        }
    }

    fn match_binary_precedence_with_tokens(
        &mut self,
        parse: impl Fn(&mut Self) -> Result<Expr>,
        kinds: &[&TokenKind]
    ) -> Result<Expr> {
        let mut e = parse(self)?;

        while let Some(token) = self.match_any(kinds) {
            let right = Box::new(parse(self)?);
            e = Expr::new_binary(Box::new(e), token, right)
        }

        Ok(e)
    }

    fn match_single(&mut self, kind: &TokenKind) -> Option<Token> {
        if self.check_next(kind) {
            self.tokens.next()
        } else {
            None
        }
    }

    fn match_any(&mut self, kinds: &[&TokenKind]) -> Option<Token> {
        kinds.iter().find_map(|k| self.match_single(k))
    }

    // Skips the rest of a broken statement: past the next ';', or up to the
    // next keyword that starts a statement. Always consumes at least one token
    // unless it is already at the end.
    fn synchronise(&mut self) {
        while !self.is_at_end() {
            let current = self.tokens.next();
            if let Some(token) = current {
                tracing::debug!(skipped = %token, "resynchronising");
                if token.kind == TokenKind::Semicolon { break }
            }

            if let Some(next) = self.tokens.peek() {
                use TokenKind::*;
                match next.kind {
                    Class | Fun | Var
                    | For | If | While
                    | Print | Return => break,
                    _ => continue,
                }
            }
        }
    }
}
