use std::{
    collections::VecDeque,
    io::{self, BufRead, Write},
};

use parking_lot::Mutex;

/// Input and output sinks the interpreter talks to.
pub trait Console: Send + Sync {
    /// Reads one line without its terminator; `None` at end of input.
    fn read_line(&self, prompt: &str) -> io::Result<Option<String>>;

    fn print(&self, text: &str);

    fn println(&self, text: &str) {
        self.print(text);
        self.print("\n");
    }

    fn error(&self, text: &str);
}

/// Raw process stdio, used when the host supplies no console.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn read_line(&self, prompt: &str) -> io::Result<Option<String>> {
        if !prompt.is_empty() {
            let mut out = io::stdout().lock();
            out.write_all(prompt.as_bytes())?;
            out.flush()?;
        }
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    fn print(&self, text: &str) {
        let mut out = io::stdout().lock();
        // a closed stdout is not a script error
        let _ = out.write_all(text.as_bytes()).and_then(|_| out.flush());
    }

    fn error(&self, text: &str) {
        eprintln!("{text}");
    }
}

/// Buffers output and serves queued input lines; for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct CaptureConsole {
    out: Mutex<String>,
    err: Mutex<String>,
    input: Mutex<VecDeque<String>>,
}

impl CaptureConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let console = Self::default();
        console
            .input
            .lock()
            .extend(lines.into_iter().map(Into::into));
        console
    }

    pub fn output(&self) -> String {
        self.out.lock().clone()
    }

    pub fn errors(&self) -> String {
        self.err.lock().clone()
    }

    pub fn take_output(&self) -> String {
        std::mem::take(&mut *self.out.lock())
    }
}

impl Console for CaptureConsole {
    fn read_line(&self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(self.input.lock().pop_front())
    }

    fn print(&self, text: &str) {
        self.out.lock().push_str(text);
    }

    fn error(&self, text: &str) {
        let mut err = self.err.lock();
        err.push_str(text);
        err.push('\n');
    }
}
