//! Local preview handles for selected files.

use std::{collections::HashMap, sync::Arc};

use shared::domain::{CandidateFile, PreviewId, PreviewReference};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreviewStats {
    pub created: u64,
    pub released: u64,
}

/// Registry of live previews. Bytes stay resolvable until the handle is released.
#[derive(Debug, Default)]
pub struct PreviewManager {
    live: HashMap<PreviewId, Arc<[u8]>>,
    stats: PreviewStats,
}

impl PreviewManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_preview(&mut self, file: &CandidateFile) -> PreviewReference {
        let id = PreviewId::new();
        self.live.insert(id, Arc::from(file.bytes.as_slice()));
        self.stats.created += 1;
        let reference = PreviewReference::new(id);
        debug!(preview = %reference, size = file.size(), "preview created");
        reference
    }

    /// Releasing an unknown or already-released handle does nothing.
    pub fn release_preview(&mut self, reference: &PreviewReference) {
        if self.live.remove(&reference.id()).is_some() {
            self.stats.released += 1;
            debug!(preview = %reference, "preview released");
        }
    }

    pub fn resolve(&self, reference: &PreviewReference) -> Option<Arc<[u8]>> {
        self.live.get(&reference.id()).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn stats(&self) -> PreviewStats {
        self.stats
    }
}
