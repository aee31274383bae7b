use std::collections::HashSet;

/// Keys that already produced an "on review" notice this session.
#[derive(Debug, Default, Clone)]
pub struct DedupTracker {
    notified: HashSet<String>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True exactly once per key until the next [`reset`](Self::reset).
    pub fn should_notify_on_review(&mut self, key: &str) -> bool {
        self.notified.insert(key.to_string())
    }

    pub fn reset(&mut self) {
        self.notified.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.notified.contains(key)
    }

    pub fn len(&self) -> usize {
        self.notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notified.is_empty()
    }
}
