//! Deferred callbacks.
//!
//! The interceptor clears the live status "a little later" after a paste or
//! drop. The browser schedules that with `setTimeout`; tests and the CLI use
//! [`ManualScheduler`] and move its clock by hand.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Runs a callback once after a delay.
pub trait Scheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>);
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        (**self).schedule(delay, task)
    }
}

struct Task {
    due: Duration,
    seq: u64,
    run: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct Queue {
    now: Duration,
    next_seq: u64,
    tasks: Vec<Task>,
}

/// Scheduler with an explicit clock. Clones share the queue.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Rc<RefCell<Queue>>,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.queue.borrow();
        f.debug_struct("ManualScheduler")
            .field("now", &queue.now)
            .field("pending", &queue.tasks.len())
            .finish()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.queue.borrow().now
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().tasks.len()
    }

    /// Move the clock forward, running every task that comes due in order.
    pub fn advance(&self, by: Duration) {
        let target = self.queue.borrow().now + by;
        while let Some(task) = self.pop_due(target) {
            self.queue.borrow_mut().now = task.due;
            // Tasks may schedule more work, so the queue is not borrowed here.
            (task.run)();
        }
        self.queue.borrow_mut().now = target;
    }

    /// Run everything that is queued, however far out.
    pub fn run_all(&self) {
        loop {
            let last_due = self.queue.borrow().tasks.iter().map(|t| t.due).max();
            let Some(due) = last_due else { break };
            let now = self.now();
            self.advance(due.saturating_sub(now));
        }
    }

    fn pop_due(&self, target: Duration) -> Option<Task> {
        let mut queue = self.queue.borrow_mut();
        let index = queue
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due <= target)
            .min_by_key(|(_, task)| (task.due, task.seq))
            .map(|(index, _)| index)?;
        Some(queue.tasks.remove(index))
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        let mut queue = self.queue.borrow_mut();
        let due = queue.now + delay;
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.tasks.push(Task { due, seq, run: task });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_run_when_due_in_order() {
        let scheduler = ManualScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (delay, name) in [(50, "b"), (10, "a"), (50, "c")] {
            let log = log.clone();
            scheduler.schedule(
                Duration::from_millis(delay),
                Box::new(move || log.borrow_mut().push(name)),
            );
        }

        scheduler.advance(Duration::from_millis(9));
        assert!(log.borrow().is_empty());
        scheduler.advance(Duration::from_millis(1));
        assert_eq!(*log.borrow(), ["a"]);
        scheduler.advance(Duration::from_millis(100));
        assert_eq!(*log.borrow(), ["a", "b", "c"]);
        assert_eq!(scheduler.now(), Duration::from_millis(110));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_tasks_can_schedule_more() {
        let scheduler = ManualScheduler::new();
        let hits = Rc::new(RefCell::new(0));
        let inner = scheduler.clone();
        let counter = hits.clone();
        scheduler.schedule(
            Duration::from_millis(5),
            Box::new(move || {
                *counter.borrow_mut() += 1;
                let counter = counter.clone();
                inner.schedule(
                    Duration::from_millis(5),
                    Box::new(move || *counter.borrow_mut() += 1),
                );
            }),
        );
        scheduler.run_all();
        assert_eq!(*hits.borrow(), 2);
        assert_eq!(scheduler.now(), Duration::from_millis(10));
    }
}
