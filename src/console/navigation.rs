use crate::console::paths::Location;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// History collaborator: `push` is the only redirect side effect.
pub trait Navigator: Send + Sync {
    fn push(&self, location: Location);

    fn current(&self) -> Location;
}

/// In-memory history that records every push.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<Location>>,
}

impl MemoryHistory {
    pub fn starting_at(location: Location) -> Self {
        Self {
            entries: Mutex::new(vec![location]),
        }
    }

    pub fn entries(&self) -> Vec<Location> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for MemoryHistory {
    fn push(&self, location: Location) {
        debug!(%location, "navigate");
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(location);
    }

    fn current(&self) -> Location {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .unwrap_or_default()
    }
}
