//! Interactive prompt.  Every line runs through the full pipeline against
//! one persistent [`Lox`] session, so definitions carry over between lines.

use log::{debug, info};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::lox::Lox;

const PROMPT: &str = "> ";

pub struct Repl {
    lox: Lox,
    editor: DefaultEditor,
}

impl Repl {
    pub fn new() -> rustyline::Result<Self> {
        Ok(Self {
            lox: Lox::new(),
            editor: DefaultEditor::new()?,
        })
    }

    /// Read and run lines until end of input.
    pub fn run(&mut self) -> rustyline::Result<()> {
        info!("Starting REPL");

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    // History is a convenience; the line still runs without it.
                    if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                        debug!("Could not record history entry: {}", e);
                    }

                    debug!("REPL input: {}", line);

                    self.lox.run(&line);

                    // A mistake on one line must not poison the next.
                    self.lox.reset_error();
                }
                Err(ReadlineError::Interrupted) => {
                    debug!("REPL interrupted; clearing line");
                }
                Err(ReadlineError::Eof) => {
                    info!("REPL reached end of input");
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}
