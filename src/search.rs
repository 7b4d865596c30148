use crate::model::{Board, Task, TaskId};
use crate::schedule::{Deferred, Scheduler, Ticket, Transient};
use std::time::{Duration, Instant};

/// Debounced substring search that highlights matches for a short while.
#[derive(Debug, Default)]
pub struct SearchFilter {
    pending: Option<Ticket>,
    highlighted: Transient<TaskId>,
}

impl SearchFilter {
    pub fn new() -> Self {
        SearchFilter::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_highlighted(&self, id: TaskId) -> bool {
        self.highlighted.contains(id)
    }

    pub fn highlighted_count(&self) -> usize {
        self.highlighted.len()
    }

    /// Handles a change of the search field. Highlights are always cleared first; an
    /// empty query stops there, anything else restarts the debounce.
    pub fn input(&mut self, raw: &str, sched: &mut Scheduler, debounce: Duration, now: Instant) {
        self.highlighted.clear_all(sched);
        if let Some(previous) = self.pending.take() {
            sched.cancel(previous);
        }
        let query = normalize_query(raw);
        if query.is_empty() {
            return;
        }
        self.pending = Some(sched.schedule(Deferred::RunSearch(query), debounce, now));
    }

    /// Debounce fired: highlight every task matching `query`. Returns the matches in
    /// board order.
    pub fn run(
        &mut self,
        query: &str,
        board: &Board,
        sched: &mut Scheduler,
        highlight_for: Duration,
        now: Instant,
    ) -> Vec<TaskId> {
        self.pending = None;
        let matched: Vec<TaskId> = board
            .tasks()
            .filter(|task| matches(task, query))
            .map(|task| task.id)
            .collect();
        for &id in &matched {
            self.highlighted
                .arm(id, Deferred::ClearHighlight(id), highlight_for, sched, now);
        }
        matched
    }

    pub fn clear_highlight(&mut self, id: TaskId) {
        self.highlighted.expire(id);
    }

    pub fn forget(&mut self, id: TaskId, sched: &mut Scheduler) {
        self.highlighted.remove(id, sched);
    }
}

pub fn normalize_query(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Case-insensitive substring match on title or description. `query` must already be
/// normalized.
pub fn matches(task: &Task, query: &str) -> bool {
    task.title.to_lowercase().contains(query) || task.description.to_lowercase().contains(query)
}
