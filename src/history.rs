//! Undo/redo over whole-document snapshots.

pub const DEFAULT_CAPACITY: usize = 50;

/// Bounded list of text snapshots with a cursor on the current one.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<String>,
    current: usize,
    capacity: usize,
}

impl History {
    pub fn new(initial: impl Into<String>) -> Self {
        Self::with_capacity(initial, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(initial: impl Into<String>, capacity: usize) -> Self {
        History {
            snapshots: vec![initial.into()],
            current: 0,
            capacity: capacity.max(1),
        }
    }

    /// Record a new state. Drops anything that could have been redone and
    /// evicts the oldest snapshots beyond capacity.
    pub fn push(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.snapshots[self.current] == text {
            return;
        }
        self.snapshots.truncate(self.current + 1);
        self.snapshots.push(text);
        if self.snapshots.len() > self.capacity {
            let excess = self.snapshots.len() - self.capacity;
            self.snapshots.drain(..excess);
        }
        self.current = self.snapshots.len() - 1;
    }

    pub fn undo(&mut self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        self.current -= 1;
        Some(self.current())
    }

    pub fn redo(&mut self) -> Option<&str> {
        if !self.can_redo() {
            return None;
        }
        self.current += 1;
        Some(self.current())
    }

    pub fn current(&self) -> &str {
        &self.snapshots[self.current]
    }

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
