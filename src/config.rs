/// Where an ambient bound object's members sit relative to parent scopes
/// when an unqualified name is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionOrder {
    /// Each frame's locals, then its bound object, before moving to the parent.
    #[default]
    LocalThenBound,
    /// Every frame's locals up the chain first, then bound objects innermost-out.
    ChainThenBound,
}

/// Knobs the host sets when constructing an interpreter.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    pub interactive: bool,
    /// Interactive loops exit the process at end of input unless cleared.
    pub exit_on_eof: bool,
    pub show_results: bool,
    pub prompt: String,
    pub resolution_order: ResolutionOrder,
    pub max_call_depth: usize,
    pub default_imports: Vec<String>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            interactive: false,
            exit_on_eof: true,
            show_results: false,
            prompt: "sprig % ".into(),
            resolution_order: ResolutionOrder::default(),
            max_call_depth: 200,
            default_imports: vec!["lang".into()],
        }
    }
}

impl InterpreterConfig {
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn exit_on_eof(mut self, exit: bool) -> Self {
        self.exit_on_eof = exit;
        self
    }

    pub fn show_results(mut self, show: bool) -> Self {
        self.show_results = show;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn resolution_order(mut self, order: ResolutionOrder) -> Self {
        self.resolution_order = order;
        self
    }

    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Adds a package imported into the global namespace at startup.
    pub fn import_package(mut self, package: impl Into<String>) -> Self {
        self.default_imports.push(package.into());
        self
    }
}
