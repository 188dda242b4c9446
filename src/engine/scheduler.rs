//! Generation-tagged deferred tasks on the virtual clock.
//!
//! Combination playback needs delayed starts, and delayed starts need a
//! cancellation guarantee stronger than "remove the timer and hope":
//! rapidly applying combination A then B must never produce a transient
//! union of both. Each task therefore carries the generation counter that
//! was current when it was scheduled, and re-checks it at fire time. A
//! superseding `apply_combination` or `stop_all` only has to bump the
//! generation; stale tasks that still reach their deadline fire as
//! silent no-ops. Cancellation is a property of the data, not of the
//! timer API.

/// What a task does when it fires.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskAction {
    StartLayer(String),
}

/// One pending deferred action, tagged with its scheduling generation.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub generation: u64,
    pub fire_at: f64,
    pub action: TaskAction,
}

pub struct Scheduler {
    generation: u64,
    tasks: Vec<ScheduledTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            generation: 0,
            tasks: Vec::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Invalidate every pending task from earlier generations and return
    /// the new current generation.
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        tracing::debug!(generation = self.generation, "scheduler generation bumped");
        self.generation
    }

    /// Schedule `action` at virtual time `fire_at`, tagged with the
    /// current generation.
    pub fn schedule(&mut self, fire_at: f64, action: TaskAction) {
        self.tasks.push(ScheduledTask {
            generation: self.generation,
            fire_at,
            action,
        });
    }

    /// Remove every task due at or before `now` and return the actions of
    /// those still belonging to the current generation, in fire order.
    /// Stale tasks are consumed silently.
    pub fn take_due(&mut self, now: f64) -> Vec<TaskAction> {
        let mut due: Vec<ScheduledTask> = Vec::new();
        let mut i = 0;
        while i < self.tasks.len() {
            if self.tasks[i].fire_at <= now {
                due.push(self.tasks.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.fire_at.total_cmp(&b.fire_at));

        let current = self.generation;
        due.into_iter()
            .filter_map(|task| {
                if task.generation == current {
                    Some(task.action)
                } else {
                    tracing::debug!(
                        stale = task.generation,
                        current,
                        "stale scheduled task dropped"
                    );
                    None
                }
            })
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(id: &str) -> TaskAction {
        TaskAction::StartLayer(id.into())
    }

    #[test]
    fn tasks_fire_at_their_deadline_in_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0.5, start("b"));
        scheduler.schedule(0.3, start("a"));
        scheduler.schedule(2.0, start("later"));

        assert_eq!(scheduler.take_due(0.1), vec![]);
        assert_eq!(scheduler.take_due(1.0), vec![start("a"), start("b")]);
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn bumped_generation_invalidates_pending_tasks() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0.3, start("old"));

        scheduler.bump_generation();
        scheduler.schedule(0.3, start("new"));

        // Both are due; only the current generation's task fires.
        assert_eq!(scheduler.take_due(1.0), vec![start("new")]);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn stale_tasks_are_consumed_not_retried() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0.3, start("old"));
        scheduler.bump_generation();

        assert_eq!(scheduler.take_due(1.0), vec![]);
        // The stale task is gone, not waiting to fire again.
        assert_eq!(scheduler.take_due(10.0), vec![]);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn tasks_exactly_at_now_fire() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0.3, start("edge"));
        assert_eq!(scheduler.take_due(0.3), vec![start("edge")]);
    }
}
