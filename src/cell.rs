//! Interior mutability for fields that hold a managed reference.
//!
//! `GcCell<T>` itself does not know which collector owns the object it sits
//! inside, so it cannot fire the write barrier on its own. That's why
//! [`Collector::link`](crate::gc::Collector::link) takes the parent and
//! child references explicitly rather than being a method on the cell.
//! The convention, mirrored by every example below, is: store the new
//! value in the cell, then immediately call `collector.link(parent, new_value)`.

use crate::ptr::Ref;
use crate::trace::{Trace, Visitor};
use std::cell::Cell as StdCell;

/// A `Copy` field that can be mutated in place and re-read, typically
/// `Option<Ref<T>>` or `Ref<T>`. Plain `std::cell::Cell` already provides
/// the get/set semantics; this wrapper exists so `Trace` can be implemented
/// once for "a cell of something traceable" instead of requiring every
/// traceable struct to unsafely reach into a raw `Cell`.
pub struct GcCell<T> {
    inner: StdCell<T>,
}

impl<T: Copy> GcCell<T> {
    pub fn new(value: T) -> Self {
        GcCell {
            inner: StdCell::new(value),
        }
    }

    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Store a new value. Does **not** fire the write barrier by itself.
    /// Call `collector.link(parent, child)` immediately after whenever the
    /// new value is (or contains) a managed reference.
    pub fn set(&self, value: T) {
        self.inner.set(value);
    }
}

impl<T: std::fmt::Debug + Copy> std::fmt::Debug for GcCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcCell").field("value", &self.get()).finish()
    }
}

unsafe impl<T: Trace + Copy> Trace for GcCell<T> {
    const NO_TRACE: bool = T::NO_TRACE;

    fn visit(&self, visitor: &Visitor<'_>) {
        self.get().visit(visitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::SystemAlloc;
    use crate::gc::Collector;
    use crate::roots::RootList;

    struct Node {
        next: GcCell<Option<Ref<Node>>>,
        value: i64,
    }

    unsafe impl Trace for Node {
        fn visit(&self, visitor: &Visitor<'_>) {
            self.next.visit(visitor);
        }
    }

    #[test]
    fn get_set_round_trip() {
        let collector = Collector::new(SystemAlloc, RootList::new());
        let a = collector.allocate(Node {
            next: GcCell::new(None),
            value: 1,
        });
        let b = collector.allocate(Node {
            next: GcCell::new(None),
            value: 2,
        });

        a.next.set(Some(b));
        collector.link(a, b);

        assert_eq!(a.next.get().unwrap().value, 2);
    }

    #[test]
    fn barrier_shades_a_black_parent_gray_when_linking_a_white_child() {
        let collector = Collector::new(SystemAlloc, RootList::new());
        let a = collector.allocate(Node {
            next: GcCell::new(None),
            value: 10,
        });
        let b = collector.allocate(Node {
            next: GcCell::new(None),
            value: 20,
        });

        // Force `a` to black, as if MARK had already scanned it, without
        // driving the whole state machine there. Isolates the barrier's
        // own behavior from mark/sweep scheduling.
        let a_header = a.header();
        let black = unsafe { a_header.as_ref().color() } ^ 1;
        unsafe { a_header.as_ref().set_color(black) };

        a.next.set(Some(b));
        collector.link(a, b);

        assert_eq!(unsafe { a_header.as_ref().color() }, crate::color::GRAY);
    }
}
