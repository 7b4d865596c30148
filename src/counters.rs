use crate::model::{Board, ColumnId, TaskId};
use crate::schedule::{Deferred, Scheduler, Transient};
use std::time::{Duration, Instant};

/// Displayed per-column badge values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnCounts([usize; 3]);

impl ColumnCounts {
    pub fn of(&self, column: ColumnId) -> usize {
        self.0[column.index()]
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }
}

/// Reads every column's size into fresh counts, then pulses every task sitting in Done.
///
/// The pulse re-arms for all Done tasks on each call, including ones that were already
/// there.
pub fn recompute_counters(
    board: &Board,
    pulses: &mut Transient<TaskId>,
    sched: &mut Scheduler,
    pulse_for: Duration,
    now: Instant,
) -> ColumnCounts {
    let counts = ColumnCounts(ColumnId::ALL.map(|c| board.column(c).len()));
    if counts.of(ColumnId::Done) > 0 {
        for &id in &board.column(ColumnId::Done).task_ids {
            pulses.arm(id, Deferred::ClearPulse(id), pulse_for, sched, now);
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    const PULSE: Duration = Duration::from_millis(1000);

    #[test]
    fn counts_match_column_sizes() {
        let mut board = Board::new();
        let a = board.create_task("a", "").unwrap();
        board.create_task("b", "").unwrap();
        board.move_task(a, ColumnId::Progress);
        let mut pulses = Transient::new();
        let mut sched = Scheduler::new();
        let counts = recompute_counters(&board, &mut pulses, &mut sched, PULSE, Instant::now());
        assert_eq!(counts.of(ColumnId::Todo), 1);
        assert_eq!(counts.of(ColumnId::Progress), 1);
        assert_eq!(counts.of(ColumnId::Done), 0);
        assert_eq!(counts.total(), 2);
        assert!(pulses.is_empty());
        assert!(sched.is_empty());
    }

    #[test]
    fn every_done_task_repulses_on_each_recompute() {
        let mut board = Board::new();
        let a = board.create_task("a", "").unwrap();
        let b = board.create_task("b", "").unwrap();
        board.move_task(a, ColumnId::Done);
        let mut pulses = Transient::new();
        let mut sched = Scheduler::new();
        let start = Instant::now();
        recompute_counters(&board, &mut pulses, &mut sched, PULSE, start);
        assert!(pulses.contains(a));

        board.move_task(b, ColumnId::Done);
        let later = start + Duration::from_millis(600);
        recompute_counters(&board, &mut pulses, &mut sched, PULSE, later);
        assert!(pulses.contains(a) && pulses.contains(b));
        assert_eq!(sched.len(), 2);

        // The first clear for `a` was replaced, so nothing fires at the original deadline.
        assert!(sched.take_due(start + PULSE).is_empty());
        assert_eq!(
            sched.take_due(later + PULSE),
            vec![Deferred::ClearPulse(a), Deferred::ClearPulse(b)]
        );
    }
}
