use crate::namespace::ScopeId;

/// The active chain of namespace frames; the top is the current scope.
#[derive(Debug, Clone)]
pub struct CallStack {
    frames: Vec<ScopeId>,
}

impl CallStack {
    pub fn new(root: ScopeId) -> Self {
        Self { frames: vec![root] }
    }

    pub fn push(&mut self, scope: ScopeId) {
        self.frames.push(scope);
    }

    pub fn pop(&mut self) -> Option<ScopeId> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<ScopeId> {
        self.frames.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Drops every frame and re-seeds the stack with `root`.
    pub fn reset(&mut self, root: ScopeId) {
        self.frames.clear();
        self.frames.push(root);
    }

    /// Frames above `depth`, innermost last; they are removed from the stack.
    pub(crate) fn split_off(&mut self, depth: usize) -> Vec<ScopeId> {
        if depth >= self.frames.len() {
            return Vec::new();
        }
        self.frames.split_off(depth)
    }

    pub fn frames(&self) -> &[ScopeId] {
        &self.frames
    }
}
