use super::population::Population;

/// A population as it stood before an advance.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: usize,
    pub population: Population,
}

/// Stack of superseded populations, for single-step undo.
#[derive(Debug, Default)]
pub struct HistoryStack {
    snapshots: Vec<Snapshot>,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, generation: usize, population: Population) {
        self.snapshots.push(Snapshot { generation, population });
    }

    pub fn pop(&mut self) -> Option<Snapshot> {
        self.snapshots.pop()
    }

    pub fn peek(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
