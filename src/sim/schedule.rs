//! Cancelable deferred tasks keyed by session generation
//!
//! Every task is stamped with the generation it was scheduled under.
//! `cancel_all` bumps the generation, so anything issued before a reset or
//! end can never fire, even if a stale handle survives somewhere.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Scheduled<T> {
    due: f64,
    seq: u64,
    generation: u32,
    task: T,
}

/// Delay-then-fire queue driven by the session clock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scheduler<T> {
    tasks: Vec<Scheduled<T>>,
    generation: u32,
    next_seq: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            generation: 0,
            next_seq: 0,
        }
    }

    /// Queue `task` to fire once the clock reaches `due`
    pub fn schedule(&mut self, due: f64, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tasks.push(Scheduled {
            due,
            seq,
            generation: self.generation,
            task,
        });
    }

    /// Drop every pending task and invalidate the current generation
    pub fn cancel_all(&mut self) {
        self.tasks.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Remove and return due tasks of the current generation, earliest
    /// first (ties in scheduling order)
    pub fn drain_due(&mut self, now: f64) -> Vec<T> {
        let generation = self.generation;
        self.tasks.retain(|t| t.generation == generation);

        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|t| t.due <= now);
        self.tasks = pending;

        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|t| t.task).collect()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Number of tasks still waiting
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_in_due_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(2.0, "late");
        scheduler.schedule(1.0, "early");
        scheduler.schedule(1.0, "early-second");
        assert!(scheduler.drain_due(0.5).is_empty());
        assert_eq!(scheduler.drain_due(2.0), vec!["early", "early-second", "late"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_keeps_future_tasks() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1.0, 1);
        scheduler.schedule(5.0, 2);
        assert_eq!(scheduler.drain_due(1.0), vec![1]);
        assert_eq!(scheduler.pending(), 1);
        assert!(scheduler.drain_due(4.9).is_empty());
        assert_eq!(scheduler.drain_due(5.0), vec![2]);
    }

    #[test]
    fn test_cancel_all_drops_stale_generation() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1.0, "stale");
        let before = scheduler.generation();
        scheduler.cancel_all();
        assert_ne!(scheduler.generation(), before);
        scheduler.schedule(1.0, "fresh");
        assert_eq!(scheduler.drain_due(10.0), vec!["fresh"]);
    }
}
