// Shared helpers for the integration tests: run a program through the whole
// pipeline and capture what it printed and what it reported.
#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rox::lox::Lox;

/// A `Write` sink the test keeps a handle to after giving it to the session.
#[derive(Clone, Default)]
pub struct Output(Rc<RefCell<Vec<u8>>>);

impl Output {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A fresh session whose program output is captured.
pub fn session() -> (Lox, Output) {
    init_logger();

    let output = Output::default();
    (Lox::with_output(output.clone()), output)
}

/// Run `source` and return (stdout, rendered diagnostics).
pub fn run(source: &str) -> (String, Vec<String>) {
    let (mut lox, output) = session();
    lox.run(source);

    let diagnostics: Vec<String> = lox.diagnostics().iter().map(|e| e.to_string()).collect();

    (output.contents(), diagnostics)
}

/// Run `source`, asserting it reported nothing, and return what it printed.
pub fn run_ok(source: &str) -> String {
    let (stdout, diagnostics) = run(source);
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics: {:?}",
        diagnostics
    );
    stdout
}
