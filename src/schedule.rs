use crate::model::{ColumnId, TaskId};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deferred {
    FocusTitle,
    ApplyDragging(TaskId),
    ClearPulse(TaskId),
    ClearHighlight(TaskId),
    ClearHover(ColumnId),
    ClearTitleError,
    RunSearch(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug)]
struct Entry {
    deadline: Instant,
    action: Deferred,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    next: u64,
    pending: BTreeMap<Ticket, Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    pub fn schedule(&mut self, action: Deferred, delay: Duration, now: Instant) -> Ticket {
        self.next += 1;
        let ticket = Ticket(self.next);
        self.pending.insert(
            ticket,
            Entry {
                deadline: now + delay,
                action,
            },
        );
        ticket
    }

    /// Returns true if the ticket was still pending.
    pub fn cancel(&mut self, ticket: Ticket) -> bool {
        self.pending.remove(&ticket).is_some()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|e| e.deadline).min()
    }

    /// Removes and returns every action whose deadline has passed, earliest first.
    /// Actions sharing a deadline come out in scheduling order.
    pub fn take_due(&mut self, now: Instant) -> Vec<Deferred> {
        let mut due: Vec<(Instant, Ticket)> = self
            .pending
            .iter()
            .filter(|(_, e)| e.deadline <= now)
            .map(|(t, e)| (e.deadline, *t))
            .collect();
        due.sort();
        due.into_iter()
            .filter_map(|(_, t)| self.pending.remove(&t))
            .map(|e| e.action)
            .collect()
    }
}

/// A set of keys that each carry a self-clearing flag.
///
/// Arming a key that is already set cancels its pending clear and starts a fresh one.
#[derive(Debug)]
pub struct Transient<K> {
    active: HashMap<K, Option<Ticket>>,
}

impl<K> Default for Transient<K> {
    fn default() -> Self {
        Transient {
            active: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> Transient<K> {
    pub fn new() -> Self {
        Transient::default()
    }

    pub fn arm(
        &mut self,
        key: K,
        clear: Deferred,
        delay: Duration,
        sched: &mut Scheduler,
        now: Instant,
    ) {
        let ticket = sched.schedule(clear, delay, now);
        if let Some(Some(previous)) = self.active.insert(key, Some(ticket)) {
            sched.cancel(previous);
        }
    }

    /// Sets the flag with no pending clear.
    pub fn hold(&mut self, key: K, sched: &mut Scheduler) {
        if let Some(Some(previous)) = self.active.insert(key, None) {
            sched.cancel(previous);
        }
    }

    /// Drops the flag and its pending clear, if any.
    pub fn remove(&mut self, key: K, sched: &mut Scheduler) -> bool {
        match self.active.remove(&key) {
            Some(ticket) => {
                if let Some(ticket) = ticket {
                    sched.cancel(ticket);
                }
                true
            }
            None => false,
        }
    }

    /// Called when a clear action fires.
    pub fn expire(&mut self, key: K) {
        self.active.remove(&key);
    }

    pub fn clear_all(&mut self, sched: &mut Scheduler) {
        for ticket in self.active.drain().filter_map(|(_, t)| t) {
            sched.cancel(ticket);
        }
    }

    pub fn contains(&self, key: K) -> bool {
        self.active.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_fire_in_deadline_order() {
        let start = Instant::now();
        let mut sched = Scheduler::new();
        sched.schedule(Deferred::ClearTitleError, Duration::from_millis(1200), start);
        sched.schedule(Deferred::FocusTitle, Duration::from_millis(50), start);
        sched.schedule(Deferred::ClearHover(ColumnId::Done), Duration::from_millis(800), start);

        assert!(sched.take_due(start).is_empty());
        assert_eq!(
            sched.take_due(start + Duration::from_millis(900)),
            vec![Deferred::FocusTitle, Deferred::ClearHover(ColumnId::Done)]
        );
        assert_eq!(sched.len(), 1);
        assert_eq!(
            sched.next_deadline(),
            Some(start + Duration::from_millis(1200))
        );
    }

    #[test]
    fn zero_delay_is_not_immediate() {
        let start = Instant::now();
        let mut sched = Scheduler::new();
        let ticket = sched.schedule(Deferred::FocusTitle, Duration::ZERO, start);
        assert_eq!(sched.len(), 1);
        assert_eq!(sched.take_due(start), vec![Deferred::FocusTitle]);
        assert!(!sched.cancel(ticket));
    }

    #[test]
    fn equal_deadlines_keep_scheduling_order() {
        let start = Instant::now();
        let mut sched = Scheduler::new();
        sched.schedule(Deferred::RunSearch("b".into()), Duration::from_millis(10), start);
        sched.schedule(Deferred::RunSearch("a".into()), Duration::from_millis(10), start);
        assert_eq!(
            sched.take_due(start + Duration::from_millis(10)),
            vec![
                Deferred::RunSearch("b".into()),
                Deferred::RunSearch("a".into())
            ]
        );
    }

    #[test]
    fn rearming_a_transient_cancels_the_older_clear() {
        let start = Instant::now();
        let mut sched = Scheduler::new();
        let mut flags = Transient::new();
        let id = ColumnId::Done;
        flags.arm(id, Deferred::ClearHover(id), Duration::from_millis(800), &mut sched, start);
        let later = start + Duration::from_millis(500);
        flags.arm(id, Deferred::ClearHover(id), Duration::from_millis(800), &mut sched, later);
        assert_eq!(sched.len(), 1);
        assert!(sched.take_due(start + Duration::from_millis(900)).is_empty());
        assert!(flags.contains(id));
        assert_eq!(
            sched.take_due(start + Duration::from_millis(1300)),
            vec![Deferred::ClearHover(id)]
        );
        flags.expire(id);
        assert!(flags.is_empty());
    }

    #[test]
    fn held_flag_survives_until_removed() {
        let mut sched = Scheduler::new();
        let mut flags = Transient::new();
        flags.hold(ColumnId::Todo, &mut sched);
        assert!(sched.is_empty());
        assert!(flags.contains(ColumnId::Todo));
        assert!(flags.remove(ColumnId::Todo, &mut sched));
        assert!(!flags.remove(ColumnId::Todo, &mut sched));
    }

    #[test]
    fn cancelled_actions_never_fire() {
        let start = Instant::now();
        let mut sched = Scheduler::new();
        let ticket = sched.schedule(Deferred::FocusTitle, Duration::from_millis(5), start);
        assert!(sched.cancel(ticket));
        assert!(!sched.cancel(ticket));
        assert!(sched.take_due(start + Duration::from_secs(1)).is_empty());
        assert_eq!(sched.next_deadline(), None);
    }
}
