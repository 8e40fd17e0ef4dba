//! Cooperative event loop with a virtual clock
//!
//! Queued tasks run before timers; timers fire in due order and may be
//! cancelled any time before they fire.

use std::collections::{BTreeMap, HashMap, VecDeque};

/// Handle returned by [`EventLoop::set_timeout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
pub struct EventLoop<T> {
    now: u64,
    next_timer: u64,
    queue: VecDeque<T>,
    timers: BTreeMap<(u64, TimerId), T>,
    due: HashMap<TimerId, u64>,
}

impl<T> Default for EventLoop<T> {
    fn default() -> Self {
        Self {
            now: 0,
            next_timer: 0,
            queue: VecDeque::new(),
            timers: BTreeMap::new(),
            due: HashMap::new(),
        }
    }
}

impl<T> EventLoop<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds elapsed on the virtual clock
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Queue a task to run on the next turn
    pub fn queue(&mut self, task: T) {
        self.queue.push_back(task);
    }

    pub fn set_timeout(&mut self, delay_ms: u64, task: T) -> TimerId {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        let at = self.now.saturating_add(delay_ms);
        self.timers.insert((at, id), task);
        self.due.insert(id, at);
        id
    }

    /// Cancel a pending timer; `false` if it already fired or was cleared
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        match self.due.remove(&id) {
            Some(at) => self.timers.remove(&(at, id)).is_some(),
            None => false,
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Next queued task, if any
    pub fn next_task(&mut self) -> Option<T> {
        self.queue.pop_front()
    }

    /// Earliest timer due at or before `until`, moving the clock to its due time
    pub fn next_due(&mut self, until: u64) -> Option<T> {
        let (&(at, id), _) = self.timers.iter().next()?;
        if at > until {
            return None;
        }
        self.due.remove(&id);
        let task = self.timers.remove(&(at, id))?;
        self.now = self.now.max(at);
        Some(task)
    }

    /// Move the clock forward without running anything
    pub fn set_now(&mut self, now: u64) {
        self.now = self.now.max(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timers_fire_in_due_order() {
        let mut lp = EventLoop::new();
        lp.set_timeout(30, "c");
        lp.set_timeout(10, "a");
        lp.set_timeout(10, "b");

        assert_eq!(lp.next_due(5), None);
        assert_eq!(lp.next_due(100), Some("a"));
        assert_eq!(lp.now(), 10);
        assert_eq!(lp.next_due(100), Some("b"));
        assert_eq!(lp.next_due(100), Some("c"));
        assert_eq!(lp.now(), 30);
        assert_eq!(lp.next_due(100), None);
    }

    #[test]
    fn test_clear_timeout() {
        let mut lp = EventLoop::new();
        let id = lp.set_timeout(10, 1);
        assert!(lp.clear_timeout(id));
        assert!(!lp.clear_timeout(id));
        assert_eq!(lp.pending_timers(), 0);
        assert_eq!(lp.next_due(100), None);
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut lp = EventLoop::new();
        lp.queue(1);
        lp.queue(2);
        assert_eq!(lp.next_task(), Some(1));
        assert_eq!(lp.next_task(), Some(2));
        assert_eq!(lp.next_task(), None);
    }
}
