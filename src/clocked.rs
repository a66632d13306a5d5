//! The two-phase `operate` / `trigger` contract and the `Clock` that drives it.
//!
//! Every back-end structure separates "read current state, decide what to
//! do" (`operate`) from "current state becomes what was decided" (`trigger`).
//! Because `operate` never observes another component's *future* state, and
//! `trigger` never depends on another component's `operate` having run yet,
//! a whole cycle can call every component's `operate` and `trigger` in any
//! order and still reach the same next state. This is what lets the
//! `Clock` register components without caring what order they tick in.

/// Implemented by every component that participates in the cycle-by-cycle
/// simulation: the ROB, reservation station, LSQ, and execution units.
pub trait Clocked {
    /// Reads current state and queues the next state into the future
    /// buffers. Must not mutate current state.
    fn operate(&mut self);

    /// Current state becomes the queued future state.
    fn trigger(&mut self);

    /// One full cycle: `operate()` then `trigger()`. Components should not
    /// override this — it is the two-phase contract itself, not a hook.
    fn tick(&mut self) {
        self.operate();
        self.trigger();
    }
}

/// Registers a set of [`Clocked`] components and ticks them all once per
/// call to [`Clock::tick`], in registration order. Because every component
/// obeys the two-phase contract, the order does not affect the outcome —
/// see the module docs.
#[derive(Default)]
pub struct Clock<'a> {
    tickables: Vec<&'a mut dyn Clocked>,
}

impl<'a> Clock<'a> {
    pub fn new() -> Self {
        Self {
            tickables: Vec::new(),
        }
    }

    pub fn register(&mut self, component: &'a mut dyn Clocked) {
        self.tickables.push(component);
    }

    pub fn tick(&mut self) {
        for component in &mut self.tickables {
            component.tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        current: u32,
        future: u32,
    }

    impl Clocked for Counter {
        fn operate(&mut self) {
            self.future = self.current + 1;
        }

        fn trigger(&mut self) {
            self.current = self.future;
        }
    }

    #[test]
    fn registration_order_does_not_matter() {
        let mut a = Counter::default();
        let mut b = Counter::default();

        let mut clock = Clock::new();
        clock.register(&mut b);
        clock.register(&mut a);
        clock.tick();
        clock.tick();
        clock.tick();

        assert_eq!(a.current, 3);
        assert_eq!(b.current, 3);
    }
}
