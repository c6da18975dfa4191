use clap::Parser as _;
use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    process,
};
use treelox::{
    interpreter::Interpreter,
    parser::Parser,
    printer,
    scanner::Scanner,
    Error,
};

#[derive(clap::Parser, Debug)]
#[command(name = "treelox")]
#[command(about = "Runs a script, or starts a REPL when no file is given", long_about = None)]
struct Cli {
    /// Script to run once.
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Dump tokens and parsed statements to stderr before running.
    #[arg(short, long)]
    debug: bool,
}

fn main() -> io::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.file {
        Some(path) => run_file(&path, cli.debug),
        None => run_prompt(cli.debug),
    }
}

/// Only installs a subscriber when `RUST_LOG` is set, e.g. `RUST_LOG=treelox=trace`.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_file(path: &Path, debug: bool) -> io::Result<()> {
    let contents = std::fs::read_to_string(path)?;
    let mut lox = Lox::new(io::stdout(), io::stderr(), debug);
    match lox.run(contents.as_str())? {
        Outcome::Completed => Ok(()),
        Outcome::SyntaxError => process::exit(65),
        Outcome::RuntimeError => process::exit(70),
    }
}

fn run_prompt(debug: bool) -> io::Result<()> {
    let mut buffer = String::new();
    let stdin = io::stdin();
    let mut stdin = stdin.lock();

    let mut lox = Lox::new(io::stdout(), io::stderr(), debug);

    loop {
        print!("> ");
        io::stdout().flush()?;

        buffer.clear();

        let num_bytes = stdin.read_line(&mut buffer)?;
        if num_bytes == 0 { break };

        let line = buffer.trim();
        if line == "exit" || line == "exit()" { break };

        // Errors are reported by `run`; the session carries on regardless.
        lox.run(line)?;
    }

    Ok(())
}

enum Outcome {
    Completed,
    SyntaxError,
    RuntimeError,
}

struct Lox<Out, ErrOut> {
    interpreter: Interpreter<Out>,
    err_out: ErrOut,
    debug: bool,
}

impl <Out: Write, ErrOut: Write> Lox<Out, ErrOut> {
    fn new(out: Out, err_out: ErrOut, debug: bool) -> Self {
        Self {
            interpreter: Interpreter::new(out),
            err_out,
            debug,
        }
    }

    fn run(&mut self, source: &str) -> io::Result<Outcome> {
        let (tokens, errors) = Scanner::new(source).scan_tokens();
        self.report(&errors)?;

        if self.debug {
            writeln!(self.err_out, "== Tokens ==")?;
            for token in tokens.iter() {
                writeln!(self.err_out, "{}", token)?;
            }
        }

        let mut parser = Parser::new(tokens.into_iter());
        let (statements, errors): (Vec<_>, Vec<_>) = parser.parse().into_iter().partition(Result::is_ok);

        let errors: Vec<_> = errors.into_iter().filter_map(Result::err).collect();
        if !errors.is_empty() {
            self.report(&errors)?;
            return Ok(Outcome::SyntaxError);
        }

        let statements: Vec<_> = statements.into_iter().filter_map(Result::ok).collect();
        if self.debug {
            writeln!(self.err_out, "== Parse Tree ==")?;
            for statement in statements.iter() {
                writeln!(self.err_out, "{}", printer::print_stmt(statement))?;
            }
        }

        match self.interpreter.interpret(&statements) {
            Err(Error::Io(e)) => Err(e),
            Err(e) => {
                self.report(&[e])?;
                Ok(Outcome::RuntimeError)
            },
            Ok(()) => Ok(Outcome::Completed),
        }
    }

    fn report(&mut self, errors: &[Error]) -> io::Result<()> {
        for e in errors.iter() {
            writeln!(self.err_out, "{}", e)?;
        }
        Ok(())
    }
}
