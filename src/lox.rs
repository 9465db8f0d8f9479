//! Pipeline driver: scan → parse → resolve → interpret, plus the diagnostic
//! sink every stage reports into.
//!
//! Each stage runs to completion and reports all of its diagnostics; the
//! pipeline stops after the first stage that reported any.  A runtime error
//! aborts the rest of the program.  The driver records what went wrong in two
//! sticky flags that the binary inspects to choose an exit code.

use std::io::{self, Write};

use log::{debug, info};

use crate::ast::{Expr, ExprId, Stmt};
use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::{Locals, Resolver};
use crate::scanner::Scanner;
use crate::token::Token;
use crate::value::Value;

pub struct Lox {
    interpreter: Interpreter,
    had_error: bool,
    had_runtime_error: bool,
    diagnostics: Vec<LoxError>,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    /// A session printing program output to stdout.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    /// A session printing program output to `out`.  Diagnostics still go to
    /// stderr and are kept for [`diagnostics`](Self::diagnostics).
    pub fn with_output<W: Write + 'static>(out: W) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
            had_error: false,
            had_runtime_error: false,
            diagnostics: Vec::new(),
        }
    }

    /// Run one program (a whole file, or one REPL line).  State defined by
    /// earlier runs stays visible.
    pub fn run(&mut self, source: &str) {
        info!("Running {} byte(s) of source", source.len());

        let Some(statements) = self.front_end(source) else {
            return;
        };

        let locals: Locals = match Resolver::new().resolve(&statements) {
            Ok(locals) => locals,
            Err(errors) => {
                errors.into_iter().for_each(|e| self.report(e));
                return;
            }
        };

        // Without a function or class nothing from this program survives
        // the run, so its entries can go once it finishes.
        let transient: Option<Vec<ExprId>> = if statements.iter().any(Stmt::declares_function) {
            None
        } else {
            Some(locals.keys().copied().collect())
        };

        self.interpreter.resolve(locals);

        if let Err(e) = self.interpreter.interpret(&statements) {
            self.report(e);
        }

        if let Some(ids) = transient {
            self.interpreter.forget(ids);
        }
    }

    /// Resolved variable distances the session still keeps.
    pub fn local_count(&self) -> usize {
        self.interpreter.local_count()
    }

    /// Parse `source` as a single expression.
    pub fn parse_expression(&mut self, source: &str) -> Option<Expr> {
        self.diagnostics.clear();

        let tokens: Vec<Token> = self.scan(source);
        let parsed = Parser::new(&tokens).parse_expression();

        match parsed {
            Ok(expr) if self.diagnostics.is_empty() => Some(expr),
            Ok(_) => None,
            Err(errors) => {
                errors.into_iter().for_each(|e| self.report(e));
                None
            }
        }
    }

    /// Evaluate `source` as a single expression.
    pub fn evaluate(&mut self, source: &str) -> Option<Value> {
        let expr: Expr = self.parse_expression(source)?;

        match self.interpreter.evaluate_expression(&expr) {
            Ok(value) => Some(value),
            Err(e) => {
                self.report(e);
                None
            }
        }
    }

    /// A lexical, syntax or resolution error was reported.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// A runtime error was reported.
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Clear the static‑error flag (between REPL lines).
    pub fn reset_error(&mut self) {
        self.had_error = false;
    }

    /// Everything reported by the most recent run.
    pub fn diagnostics(&self) -> &[LoxError] {
        &self.diagnostics
    }

    /// Scan and parse a program; `None` if either stage reported anything.
    fn front_end(&mut self, source: &str) -> Option<Vec<Stmt>> {
        self.diagnostics.clear();

        let tokens: Vec<Token> = self.scan(source);
        let parsed = Parser::new(&tokens).parse();

        match parsed {
            Ok(statements) if self.diagnostics.is_empty() => Some(statements),
            Ok(_) => None,
            Err(errors) => {
                errors.into_iter().for_each(|e| self.report(e));
                None
            }
        }
    }

    fn scan(&mut self, source: &str) -> Vec<Token> {
        let (tokens, errors) = Scanner::new(source).scan_tokens();
        errors.into_iter().for_each(|e| self.report(e));
        tokens
    }

    /// The diagnostic sink: log, print to stderr, raise the matching flag.
    fn report(&mut self, error: LoxError) {
        debug!("Reporting diagnostic: {}", error);

        eprintln!("{}", error);

        if error.is_static() {
            self.had_error = true;
        } else {
            self.had_runtime_error = true;
        }

        self.diagnostics.push(error);
    }
}
