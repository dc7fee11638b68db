//! A one-dimensional sweep over intervals.
//!
//! Each item gets an interval along the sweep axis. Walking a [`SweepQueue`]
//! hands out the items in order of their interval's start, and at every point
//! the queue knows which items' intervals are still open. The overlay uses two
//! of these (one per input region) to find the pairs of curves whose
//! x-extents overlap.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use crate::num::CheapOrderedFloat;

/// Whether an event opens or closes an interval.
///
/// At equal keys, opening sorts first, so intervals that merely touch still
/// get to see each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// The start of an item's interval.
    Open,
    /// The end of an item's interval.
    Close,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Event {
    key: CheapOrderedFloat,
    kind: EventKind,
    // Insertion order, so that ties come out deterministically.
    seq: usize,
}

/// A priority queue of interval events with an active set.
#[derive(Clone, Debug)]
pub struct SweepQueue<T> {
    events: BinaryHeap<Reverse<Event>>,
    items: Vec<T>,
    active: BTreeMap<usize, T>,
}

impl<T> Default for SweepQueue<T> {
    fn default() -> Self {
        SweepQueue {
            events: BinaryHeap::new(),
            items: Vec::new(),
            active: BTreeMap::new(),
        }
    }
}

impl<T: Clone> SweepQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item that is alive on the interval between `a` and `b` (in
    /// either order).
    pub fn add(&mut self, item: T, a: f64, b: f64) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let seq = self.items.len();
        self.items.push(item);
        self.events.push(Reverse(Event {
            key: lo.into(),
            kind: EventKind::Open,
            seq,
        }));
        self.events.push(Reverse(Event {
            key: hi.into(),
            kind: EventKind::Close,
            seq,
        }));
    }

    /// The key and kind of the next event, if there is one.
    pub fn peek(&self) -> Option<(f64, EventKind)> {
        self.events
            .peek()
            .map(|Reverse(ev)| (ev.key.into_inner(), ev.kind))
    }

    /// Activates and returns the next item, retiring any intervals that close
    /// before it opens.
    pub fn take(&mut self) -> Option<T> {
        while let Some(Reverse(ev)) = self.events.pop() {
            match ev.kind {
                EventKind::Close => {
                    self.active.remove(&ev.seq);
                }
                EventKind::Open => {
                    let item = self.items[ev.seq].clone();
                    self.active.insert(ev.seq, item.clone());
                    return Some(item);
                }
            }
        }
        None
    }

    /// Retires the next event if it closes an interval. Returns whether it did.
    fn retire_one(&mut self) -> bool {
        match self.events.peek() {
            Some(Reverse(ev)) if ev.kind == EventKind::Close => {
                let seq = ev.seq;
                self.events.pop();
                self.active.remove(&seq);
                true
            }
            _ => false,
        }
    }

    /// The items whose intervals are currently open, in the order they were
    /// added.
    pub fn active(&self) -> impl Iterator<Item = &T> + '_ {
        self.active.values()
    }

    /// Are there no more events?
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Chooses which of several queues to advance next.
    ///
    /// This is the queue whose next event has the smallest key (ties going to
    /// opening events, and then to the earlier queue). Closing events get
    /// consumed along the way, so that when this returns `Some(i)`, calling
    /// `queues[i].take()` activates the next item and every other queue's
    /// active set is accurate at that item's key.
    pub fn next(queues: &mut [SweepQueue<T>]) -> Option<usize> {
        loop {
            let (idx, kind) = queues
                .iter()
                .enumerate()
                .filter_map(|(i, q)| {
                    q.peek()
                        .map(|(key, kind)| ((CheapOrderedFloat::from(key), kind, i), kind))
                })
                .min_by_key(|(order, _)| *order)
                .map(|((_, _, i), kind)| (i, kind))?;

            match kind {
                EventKind::Open => return Some(idx),
                EventKind::Close => {
                    queues[idx].retire_one();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_in_order() {
        let mut q = SweepQueue::new();
        q.add("b", 2.0, 3.0);
        q.add("a", 1.0, 5.0);
        q.add("c", 4.0, 2.5);
        assert_eq!(q.take(), Some("a"));
        assert_eq!(q.take(), Some("b"));
        assert_eq!(q.active().copied().collect::<Vec<_>>(), vec!["b", "a"]);
        // "c" opens at 2.5, before "b" closes at 3.
        assert_eq!(q.take(), Some("c"));
        assert_eq!(q.active().copied().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(q.take(), None);
        assert!(q.is_empty());
        assert_eq!(q.active().count(), 0);
    }

    #[test]
    fn touching_intervals_overlap() {
        let mut q = SweepQueue::new();
        q.add(0, 0.0, 1.0);
        q.add(1, 1.0, 2.0);
        q.take();
        assert_eq!(q.take(), Some(1));
        assert_eq!(q.active().copied().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn closed_items_leave_the_active_set() {
        let mut q = SweepQueue::new();
        q.add(0, 0.0, 1.0);
        q.add(1, 2.0, 3.0);
        q.take();
        q.take();
        assert_eq!(q.active().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn joint_sweep() {
        let mut qs = [SweepQueue::new(), SweepQueue::new()];
        qs[0].add("a0", 0.0, 1.0);
        qs[0].add("a1", 5.0, 6.0);
        qs[1].add("b0", 0.5, 2.0);
        qs[1].add("b1", 5.0, 5.5);

        let mut order = Vec::new();
        while let Some(i) = SweepQueue::next(&mut qs) {
            let item = qs[i].take().unwrap();
            let other: Vec<_> = qs[1 - i].active().copied().collect();
            order.push((item, other));
        }

        assert_eq!(
            order,
            vec![
                ("a0", vec![]),
                ("b0", vec!["a0"]),
                // b0 closed at 2.0, before a1 opened.
                ("a1", vec![]),
                ("b1", vec!["a1"]),
            ]
        );
    }
}
