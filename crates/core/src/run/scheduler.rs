//! Tick-based delayed continuations.

use crate::types::GateId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Deferred {
    ResolveGate { gate: GateId, correct: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Scheduled {
    due: u64,
    action: Deferred,
}

#[derive(Debug, Default)]
pub(super) struct Scheduler {
    now: u64,
    queue: Vec<Scheduled>,
}

impl Scheduler {
    pub(super) fn now(&self) -> u64 {
        self.now
    }

    /// Runs `action` once `delay` more ticks have elapsed; a zero delay fires on the next tick.
    pub(super) fn schedule(&mut self, delay: u32, action: Deferred) {
        let due = self.now + u64::from(delay.max(1));
        self.queue.push(Scheduled { due, action });
    }

    /// Moves the clock one tick and returns what came due, in scheduling order.
    pub(super) fn advance(&mut self) -> Vec<Deferred> {
        self.now += 1;
        let now = self.now;
        let (due, pending): (Vec<Scheduled>, Vec<Scheduled>) =
            self.queue.drain(..).partition(|scheduled| scheduled.due <= now);
        self.queue = pending;
        due.into_iter().map(|scheduled| scheduled.action).collect()
    }

    pub(super) fn clear(&mut self) {
        self.queue.clear();
    }

    pub(super) fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_fire_after_their_delay_in_order() {
        let mut scheduler = Scheduler::default();
        scheduler.schedule(2, Deferred::ResolveGate { gate: GateId(0), correct: true });
        scheduler.schedule(2, Deferred::ResolveGate { gate: GateId(1), correct: false });

        assert!(scheduler.advance().is_empty());
        let fired = scheduler.advance();
        assert_eq!(
            fired,
            vec![
                Deferred::ResolveGate { gate: GateId(0), correct: true },
                Deferred::ResolveGate { gate: GateId(1), correct: false },
            ]
        );
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.now(), 2);
    }

    #[test]
    fn zero_delay_fires_on_the_next_tick() {
        let mut scheduler = Scheduler::default();
        scheduler.schedule(0, Deferred::ResolveGate { gate: GateId(3), correct: true });
        assert_eq!(scheduler.advance().len(), 1);
    }

    #[test]
    fn clear_drops_pending_actions() {
        let mut scheduler = Scheduler::default();
        scheduler.schedule(5, Deferred::ResolveGate { gate: GateId(0), correct: true });
        scheduler.clear();
        for _ in 0..10 {
            assert!(scheduler.advance().is_empty());
        }
    }
}
