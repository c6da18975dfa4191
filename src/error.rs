use std::result;

use thiserror::Error;

use crate::token::{Token, TokenKind};

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("[line {line}] Error: {message}")]
    Lexical { line: usize, message: String },
    #[error("[line {}] Error{}: {}", .token.line, location(.token), .message)]
    Syntactic { token: Token, message: String },
    #[error("[line {}] Error{}: {}", .token.line, location(.token), .message)]
    Runtime { token: Token, message: String },
    #[error("[line {}] Error{}: Undefined variable '{}'.", .token.line, location(.token), .token.lexeme)]
    UndefinedVariable { token: Token },
    #[error("Unexpected end of input.")]
    Unexpected,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn lexical<S: Into<String>>(line: usize, message: S) -> Error {
        Error::Lexical { line, message: message.into() }
    }

    pub fn syntactic<S: Into<String>>(token: Token, message: S) -> Error {
        Error::Syntactic { token, message: message.into() }
    }

    pub fn runtime<S: Into<String>>(token: Token, message: S) -> Error {
        Error::Runtime { token, message: message.into() }
    }

    pub fn undefined_variable(token: &Token) -> Error {
        Error::UndefinedVariable { token: token.clone() }
    }

    pub fn unexpected() -> Error {
        Error::Unexpected
    }

    /// Errors raised while executing, as opposed to scanning or parsing.
    pub fn is_runtime_error(&self) -> bool {
        matches!(self, Error::Runtime { .. } | Error::UndefinedVariable { .. })
    }

    pub fn line(&self) -> Option<usize> {
        use Error::*;
        match self {
            Lexical { line, .. } => Some(*line),
            Syntactic { token, .. } | Runtime { token, .. } | UndefinedVariable { token } => {
                Some(token.line)
            },
            Unexpected | Io(_) => None,
        }
    }
}

fn location(token: &Token) -> String {
    if token.kind == TokenKind::EndOfFile {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> std::io::Error {
        match e {
            Error::Io(e) => e,
            e => std::io::Error::new(std::io::ErrorKind::Other, e),
        }
    }
}
