//! Bounded queue of recent `field:value` lines for a status display.
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct DisplayQueue {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DisplayQueue {
    /// A zero capacity is bumped to one so the latest line is always visible.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a line, evicting the oldest one when full.
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn latest(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DisplayQueue {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut q = DisplayQueue::new(2);
        q.push("a:1");
        q.push("b:2");
        q.push("c:3");
        assert_eq!(q.lines().collect::<Vec<_>>(), vec!["b:2", "c:3"]);
        assert_eq!(q.latest(), Some("c:3"));
    }

    #[test]
    fn zero_capacity_keeps_latest() {
        let mut q = DisplayQueue::new(0);
        q.push("x:1");
        q.push("y:2");
        assert_eq!(q.capacity(), 1);
        assert_eq!(q.len(), 1);
        assert_eq!(q.latest(), Some("y:2"));
    }
}
