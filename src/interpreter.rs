use std::{io::Read, path::Path, sync::Arc};

use tracing::{debug, warn};

use crate::{
    adapter::InterfaceAdapter,
    ast::Stmt,
    callstack::CallStack,
    config::InterpreterConfig,
    console::{Console, StdConsole},
    diagnostics::{EvalError, Result, SprigError},
    eval::{Evaluator, Flow},
    host::ClassLoader,
    lhs::LhsTarget,
    namespace::NameSpace,
    parser::{self, Parser},
    repl::{ConsoleLines, LineSource},
    runtime::{self, Runtime},
    value::Value,
};

/// Entry point for embedding hosts: one global namespace and the call stack
/// scripts evaluated through this handle run on.
pub struct Interpreter {
    runtime: Runtime,
    global: NameSpace,
    stack: CallStack,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Script text with a statement terminator appended when the last
/// statement lacks one.
fn terminated(text: &str) -> String {
    let mut text = text.trim_end().to_string();
    if !text.is_empty() && !text.ends_with(';') && !text.ends_with('}') {
        text.push(';');
    }
    text
}

impl Interpreter {
    /// An interpreter printing to the process's stdio.
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default(), Arc::new(StdConsole))
    }

    pub fn with_console(console: Arc<dyn Console>) -> Self {
        Self::with_config(InterpreterConfig::default(), console)
    }

    pub fn with_config(config: InterpreterConfig, console: Arc<dyn Console>) -> Self {
        let runtime = Runtime::new(config, console);
        let global = runtime.namespace(runtime.global_scope());
        let stack = CallStack::new(global.id());
        Self {
            runtime,
            global,
            stack,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn global(&self) -> &NameSpace {
        &self.global
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn console(&self) -> &Arc<dyn Console> {
        self.runtime.console()
    }

    pub fn set_class_loader(&self, loader: Arc<dyn ClassLoader>) {
        self.runtime.set_class_loader(loader);
    }

    /// Evaluates `text` in the global namespace.
    pub fn eval(&mut self, text: &str) -> Result<Value> {
        let global = self.global.clone();
        self.eval_in(text, &global)
    }

    pub fn eval_in(&mut self, text: &str, namespace: &NameSpace) -> Result<Value> {
        self.eval_labeled(&terminated(text), namespace, None)
    }

    /// Evaluates everything `reader` yields; errors carry `label`.
    pub fn eval_reader(&mut self, mut reader: impl Read, namespace: &NameSpace, label: &str) -> Result<Value> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.eval_labeled(&terminated(&text), namespace, Some(label))
    }

    fn eval_labeled(&mut self, text: &str, namespace: &NameSpace, label: Option<&str>) -> Result<Value> {
        let baseline = self.stack.depth();
        let pushed = self.stack.top() != Some(namespace.id());
        if pushed {
            self.stack.push(namespace.id());
        }
        let result = {
            let mut evaluator = Evaluator::new(&self.runtime, &mut self.stack);
            runtime::eval_units(&mut evaluator, text, label)
        };
        if pushed {
            self.stack.pop();
        }
        runtime::check_depth(&mut self.stack, baseline)?;
        result
    }

    /// Evaluates a file in the global namespace.
    pub fn source(&mut self, path: impl AsRef<Path>) -> Result<Value> {
        let global = self.global.clone();
        self.source_in(path, &global)
    }

    /// Evaluates a file in `namespace` on a child interpreter: same runtime
    /// and console, separate call stack.
    pub fn source_in(&mut self, path: impl AsRef<Path>, namespace: &NameSpace) -> Result<Value> {
        runtime::source_file(&self.runtime, path.as_ref(), namespace.id())
    }

    /// Assigns `value` to `name` (a variable or dotted field path) in the
    /// global namespace. `Value::null()` stores null rather than unbinding.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let target = parser::parse_expression(name)?;
        let mut evaluator = Evaluator::new(&self.runtime, &mut self.stack);
        let lhs = evaluator.lhs_for(&target)?;
        lhs.assign(value.into())?;
        Ok(())
    }

    /// Reads `name` from the global namespace; null and void read as `None`.
    pub fn get(&mut self, name: &str) -> Result<Option<Value>> {
        let expr = parser::parse_expression(name)?;
        let mut evaluator = Evaluator::new(&self.runtime, &mut self.stack);
        let value = evaluator.eval_expr(&expr)?;
        Ok((!value.is_null() && !value.is_void()).then_some(value))
    }

    /// Removes the variable `name` resolves to. Fields and properties cannot
    /// be unset.
    pub fn unset(&mut self, name: &str) -> Result<()> {
        let target = parser::parse_expression(name)?;
        let lhs = Evaluator::new(&self.runtime, &mut self.stack).lhs_for(&target)?;
        match lhs.target() {
            LhsTarget::Variable { scope, name } => {
                self.runtime.namespace(*scope).unset_variable(name)?;
                Ok(())
            }
            _ => Err(EvalError::new(format!("`{name}` does not name a variable")).into()),
        }
    }

    /// The global namespace as an implementation of host interfaces.
    pub fn get_interface(&self, interfaces: &[&str]) -> Result<Arc<InterfaceAdapter>> {
        self.global.as_interface(interfaces)
    }

    /// Reads and evaluates units from the console until end of input.
    pub fn run(&mut self) -> Result<()> {
        let mut lines = ConsoleLines::new(Arc::clone(self.runtime.console()));
        self.run_with(&mut lines)
    }

    /// The read-eval-print loop over an arbitrary line source. Interactive
    /// sessions report failures and keep going; otherwise the first failure
    /// ends the loop.
    pub fn run_with(&mut self, input: &mut dyn LineSource) -> Result<()> {
        let config = self.runtime.config().clone();
        let prompt = if config.interactive {
            config.prompt.as_str()
        } else {
            ""
        };
        let mut buffer = String::new();
        loop {
            let line = input.next_line(if buffer.is_empty() { prompt } else { "" })?;
            let Some(line) = line else {
                if !buffer.trim().is_empty() {
                    self.drain(&mut buffer, true)?;
                }
                break;
            };
            buffer.push_str(&line);
            buffer.push('\n');
            self.drain(&mut buffer, false)?;
        }
        if config.interactive && config.exit_on_eof {
            debug!("end of input; exiting");
            std::process::exit(0);
        }
        Ok(())
    }

    /// Evaluates every complete unit in `buffer`, keeping a trailing
    /// incomplete unit for the next line unless `at_eof`.
    fn drain(&mut self, buffer: &mut String, at_eof: bool) -> Result<()> {
        let text = buffer.clone();
        let mut parser = Parser::new(&text);
        loop {
            let before = parser.consumed();
            match parser.next_unit() {
                Ok(Some(unit)) => {
                    if let Err(err) = self.run_unit(&unit) {
                        buffer.clear();
                        return self.report(err);
                    }
                }
                Ok(None) => {
                    buffer.clear();
                    return Ok(());
                }
                Err(diag) if diag.is_incomplete() && !at_eof => {
                    buffer.drain(..before);
                    return Ok(());
                }
                Err(diag) => {
                    buffer.clear();
                    return self.report(diag.into());
                }
            }
        }
    }

    fn run_unit(&mut self, unit: &Stmt) -> Result<()> {
        let result = {
            let mut evaluator = Evaluator::new(&self.runtime, &mut self.stack);
            evaluator.eval_stmt(unit)
        };
        if self.stack.depth() != 1 || self.stack.top() != Some(self.global.id()) {
            warn!(depth = self.stack.depth(), "resynchronising call stack after unit");
            self.stack.reset(self.global.id());
        }
        let value = match result? {
            Flow::Normal(value) | Flow::Return(value) => value,
            Flow::Break | Flow::Continue => {
                return Err(SprigError::from(EvalError::new("`break` or `continue` outside of a loop"))
                    .at(unit.span, "statement"));
            }
        };
        if self.runtime.config().show_results && !value.is_void() {
            self.runtime.console().println(&value.to_string());
        }
        Ok(())
    }

    fn report(&self, err: SprigError) -> Result<()> {
        if !self.runtime.config().interactive {
            return Err(err);
        }
        self.runtime
            .console()
            .error(&format!("// {}: {err}", err.classify()));
        Ok(())
    }
}
