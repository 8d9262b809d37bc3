// ===========================================================================
// Edge ID allocator
// ===========================================================================
use crate::graph::EdgeId;

/// Dispenses fresh edge ids, always strictly above every id it has observed.
///
/// The allocator travels with the graph from pass to pass, so ids handed out by
/// an earlier pass are never reused by a later one.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next_id: EdgeId,
}

impl IdAllocator {
    /// Start above `max`, or at 0 for an empty graph.
    pub fn above(max: Option<EdgeId>) -> Self {
        Self {
            next_id: max.map_or(0, |m| m + 1),
        }
    }

    pub fn next_id(&mut self) -> EdgeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Make sure future ids stay above `id`.
    pub fn observe(&mut self, id: EdgeId) {
        if id >= self.next_id {
            self.next_id = id + 1;
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::above(None)
    }
}
