use std::collections::HashMap;
use std::fmt;

use super::vehicle::SpriteId;

/// Handle to a click-listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Click-listener registrations, mapping each listener to its sprite
#[derive(Debug, Default)]
pub struct ClickListeners {
    next_id: u64,
    targets: HashMap<ListenerId, SpriteId>,
}

impl ClickListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, target: SpriteId) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.targets.insert(id, target);
        id
    }

    /// Returns whether the registration was still live
    pub fn release(&mut self, id: ListenerId) -> bool {
        self.targets.remove(&id).is_some()
    }

    /// Sprite a click on `id` is delivered to
    pub fn target(&self, id: ListenerId) -> Option<SpriteId> {
        self.targets.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
