use std::{
    io::{self, BufRead},
    sync::Arc,
};

use rustyline::{DefaultEditor, error::ReadlineError};

use crate::{
    config::InterpreterConfig,
    console::{Console, StdConsole},
    diagnostics::{Result, SprigError},
    interpreter::Interpreter,
};

/// Where the interactive loop gets its input, one line at a time.
pub trait LineSource {
    /// The next line without its terminator, or `None` at end of input.
    fn next_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Lines read through the interpreter's console.
pub struct ConsoleLines {
    console: Arc<dyn Console>,
}

impl ConsoleLines {
    pub fn new(console: Arc<dyn Console>) -> Self {
        Self { console }
    }
}

impl LineSource for ConsoleLines {
    fn next_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.console.read_line(prompt)
    }
}

/// Lines from any buffered reader; prompts are ignored.
pub struct ReaderLines<R> {
    reader: R,
}

impl<R: BufRead> ReaderLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderLines<R> {
    fn next_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

/// Line editing with history; `:quit` or `:exit` ends the session.
struct EditorLines {
    editor: DefaultEditor,
}

impl LineSource for EditorLines {
    fn next_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == ":quit" || trimmed == ":exit" {
                    return Ok(None);
                }
                if !trimmed.is_empty() {
                    self.editor.add_history_entry(trimmed).ok();
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Io(err)) => Err(err),
            Err(err) => Err(io::Error::new(io::ErrorKind::Other, err)),
        }
    }
}

/// Terminal session over an interactive interpreter.
pub struct Repl {
    interpreter: Interpreter,
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

impl Repl {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    /// `config` is forced interactive with results shown; end of input
    /// returns from [`Repl::run`] instead of exiting the process.
    pub fn with_config(config: InterpreterConfig) -> Self {
        let config = config.interactive(true).show_results(true).exit_on_eof(false);
        let console: Arc<dyn Console> = Arc::new(StdConsole);
        Self {
            interpreter: Interpreter::with_config(config, console),
        }
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    pub fn run(&mut self) -> Result<()> {
        let editor = DefaultEditor::new()
            .map_err(|err| SprigError::from(io::Error::new(io::ErrorKind::Other, err)))?;
        let mut lines = EditorLines { editor };
        self.interpreter.run_with(&mut lines)
    }
}
