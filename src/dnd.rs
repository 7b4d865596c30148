use crate::model::{Board, ColumnId, MoveOutcome, TaskId};
use crate::schedule::{Deferred, Scheduler, Ticket, Transient};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropOutcome {
    pub task: TaskId,
    pub target: ColumnId,
    pub outcome: MoveOutcome,
}

/// Tracks the single lifted task and the per-column hover highlight.
#[derive(Debug, Default)]
pub struct DragCoordinator {
    lifted: Option<TaskId>,
    dragging: Option<TaskId>,
    style_pending: Option<Ticket>,
    accepting: Option<ColumnId>,
    hover: Transient<ColumnId>,
}

impl DragCoordinator {
    pub fn new() -> Self {
        DragCoordinator::default()
    }

    pub fn lifted(&self) -> Option<TaskId> {
        self.lifted
    }

    /// Whether the task shows the dragging style. Lags `lifted` by one deferral.
    pub fn is_dragging(&self, id: TaskId) -> bool {
        self.dragging == Some(id)
    }

    pub fn is_hovered(&self, column: ColumnId) -> bool {
        self.hover.contains(column)
    }

    pub fn accepting(&self) -> Option<ColumnId> {
        self.accepting
    }

    /// Lifts `task`, replacing any previous lift. The dragging style is applied by a
    /// follow-up so the drag preview is captured without it.
    pub fn drag_start(&mut self, task: TaskId, sched: &mut Scheduler, delay: Duration, now: Instant) {
        if let Some(previous) = self.style_pending.take() {
            sched.cancel(previous);
        }
        self.dragging = None;
        self.lifted = Some(task);
        self.style_pending = Some(sched.schedule(Deferred::ApplyDragging(task), delay, now));
    }

    /// Follow-up from [`drag_start`](Self::drag_start). Only applies while `task` is
    /// still lifted.
    pub fn apply_dragging(&mut self, task: TaskId) {
        self.style_pending = None;
        if self.lifted == Some(task) {
            self.dragging = Some(task);
        }
    }

    pub fn drag_enter(&mut self, column: ColumnId, sched: &mut Scheduler) {
        self.hover.hold(column, sched);
    }

    /// `related` is the column the pointer moved into, if any. Moving within the same
    /// column (onto one of its cards) is not a leave.
    pub fn drag_leave(&mut self, column: ColumnId, related: Option<ColumnId>, sched: &mut Scheduler) {
        if related == Some(column) {
            return;
        }
        self.hover.remove(column, sched);
        if self.accepting == Some(column) {
            self.accepting = None;
        }
    }

    /// Marks `column` as a valid drop target for the current pointer position.
    pub fn drag_over(&mut self, column: ColumnId) {
        self.accepting = Some(column);
    }

    /// Appends the lifted task to `column`. A drop with nothing lifted, or on a column
    /// that never accepted a drag-over, does nothing.
    pub fn drop_on(
        &mut self,
        column: ColumnId,
        board: &mut Board,
        sched: &mut Scheduler,
        linger: Duration,
        now: Instant,
    ) -> Option<DropOutcome> {
        let task = self.lifted?;
        if self.accepting != Some(column) {
            return None;
        }
        self.hover
            .arm(column, Deferred::ClearHover(column), linger, sched, now);
        let outcome = board.move_task(task, column);
        if outcome == MoveOutcome::Missing {
            return None;
        }
        Some(DropOutcome {
            task,
            target: column,
            outcome,
        })
    }

    /// Ends the drag whether or not a drop happened.
    pub fn drag_end(&mut self, sched: &mut Scheduler) {
        if let Some(pending) = self.style_pending.take() {
            sched.cancel(pending);
        }
        self.dragging = None;
        self.lifted = None;
        self.accepting = None;
    }

    pub fn clear_hover(&mut self, column: ColumnId) {
        self.hover.expire(column);
    }

    /// Drops any reference to a task that no longer exists.
    pub fn forget(&mut self, task: TaskId, sched: &mut Scheduler) {
        if self.lifted == Some(task) {
            self.drag_end(sched);
        }
    }
}
