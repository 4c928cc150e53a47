//! The from/to object sets: sentinel-headed intrusive circular doubly
//! linked lists.
//!
//! Must be intrusive (not a general-purpose sequence container) because
//! `unlink` and the cursor repositioning in `make_gray` require O(1)
//! removal of the *current* cursor object without invalidating the walk.

use std::ptr::NonNull;

use crate::header::Header;

/// A sentinel-headed circular doubly linked list of [`Header`]s. All
/// non-sentinel objects in a live heap belong to exactly one `ObjectSet` at
/// any moment.
#[derive(Clone, Copy)]
pub(crate) struct ObjectSet {
    sentinel: NonNull<Header>,
}

impl ObjectSet {
    /// Wrap an already-initialized sentinel header (see
    /// [`Header::init_sentinel`]) as an object set. The set starts empty.
    pub(crate) fn new(sentinel: NonNull<Header>) -> Self {
        let set = ObjectSet { sentinel };
        set.clear();
        set
    }

    pub(crate) fn sentinel(&self) -> NonNull<Header> {
        self.sentinel
    }

    /// Reset to empty: the sentinel points to itself in both directions.
    pub(crate) fn clear(&self) {
        unsafe {
            self.sentinel.as_ref().set_next(self.sentinel);
            self.sentinel.as_ref().set_prev(self.sentinel);
        }
    }

    /// Insert `obj` at the tail (immediately before the sentinel). O(1).
    pub(crate) fn push(&self, obj: NonNull<Header>) {
        unsafe {
            let tail = self.sentinel.as_ref().prev();
            tail.as_ref().set_next(obj);
            obj.as_ref().set_prev(tail);
            obj.as_ref().set_next(self.sentinel);
            self.sentinel.as_ref().set_prev(obj);
        }
    }

    /// Splice `obj` out of whichever set it currently belongs to. O(1).
    /// `obj`'s own `next`/`prev` are left stale; the caller is expected to
    /// immediately relink it (e.g. via `push`).
    pub(crate) fn unlink(obj: NonNull<Header>) {
        unsafe {
            let prev = obj.as_ref().prev();
            let next = obj.as_ref().next();
            prev.as_ref().set_next(next);
            next.as_ref().set_prev(prev);
        }
    }

    /// Number of non-sentinel objects currently in the set. O(n); used only
    /// by tests/diagnostics, never on a collector hot path.
    #[cfg(any(test, feature = "trace-steps"))]
    pub(crate) fn len(&self) -> usize {
        let mut n = 0;
        let mut cur = unsafe { self.sentinel.as_ref().next() };
        while cur != self.sentinel {
            n += 1;
            cur = unsafe { cur.as_ref().next() };
        }
        n
    }

    /// Property-test helper: walking `next` from the sentinel returns to
    /// the sentinel, and every header in the traversal satisfies
    /// `H.next.prev == H` and `H.prev.next == H`.
    #[cfg(test)]
    pub(crate) fn debug_validate(&self) -> bool {
        let mut cur = self.sentinel;
        loop {
            let next = unsafe { cur.as_ref().next() };
            if unsafe { next.as_ref().prev() } != cur {
                return false;
            }
            let prev = unsafe { cur.as_ref().prev() };
            if unsafe { prev.as_ref().next() } != cur {
                return false;
            }
            cur = next;
            if cur == self.sentinel {
                return true;
            }
        }
    }
}

impl PartialEq for ObjectSet {
    fn eq(&self, other: &Self) -> bool {
        self.sentinel == other.sentinel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Vtable;
    use std::alloc::{alloc, Layout};
    use proptest::prelude::*;

    fn new_header() -> NonNull<Header> {
        unsafe {
            let layout = Layout::new::<Header>();
            let ptr = NonNull::new(alloc(layout) as *mut Header).unwrap();
            Header::init(ptr, 0, test_vtable());
            ptr
        }
    }

    fn test_vtable() -> &'static Vtable {
        // Safety: never invoked in these tests.
        Box::leak(Box::new(Vtable {
            visit: |_, _| {},
            drop_in_place: |_| {},
            layout: Layout::new::<Header>(),
        }))
    }

    fn new_sentinel() -> NonNull<Header> {
        unsafe {
            let layout = Layout::new::<Header>();
            let ptr = NonNull::new(alloc(layout) as *mut Header).unwrap();
            Header::init_sentinel(ptr);
            ptr
        }
    }

    #[test]
    fn empty_set_self_links() {
        let sentinel = new_sentinel();
        let set = ObjectSet::new(sentinel);
        assert!(set.debug_validate());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn push_and_unlink_maintain_integrity() {
        let sentinel = new_sentinel();
        let set = ObjectSet::new(sentinel);
        let a = new_header();
        let b = new_header();
        let c = new_header();
        set.push(a);
        set.push(b);
        set.push(c);
        assert_eq!(set.len(), 3);
        assert!(set.debug_validate());

        ObjectSet::unlink(b);
        assert!(set.debug_validate());
        assert_eq!(set.len(), 2);

        set.push(b);
        assert_eq!(set.len(), 3);
        assert!(set.debug_validate());
    }

    #[test]
    fn clear_empties_the_list() {
        let sentinel = new_sentinel();
        let set = ObjectSet::new(sentinel);
        let a = new_header();
        set.push(a);
        set.clear();
        assert_eq!(set.len(), 0);
        assert!(set.debug_validate());
    }

    proptest::proptest! {
        /// List integrity: after any sequence of push/unlink-and-repush
        /// moves between two sets, both sets' circular links are still
        /// consistent and every header ends up in exactly one of them.
        #[test]
        fn list_integrity_and_single_set_membership_survive_random_moves(
            moves in proptest::collection::vec(0usize..2, 0..64),
        ) {
            let from_sentinel = new_sentinel();
            let to_sentinel = new_sentinel();
            let from = ObjectSet::new(from_sentinel);
            let to = ObjectSet::new(to_sentinel);

            let headers: Vec<_> = (0..8).map(|_| new_header()).collect();
            for &h in &headers {
                from.push(h);
            }
            // Each header's current owner, tracked independently of the
            // lists themselves so we can check single-set membership.
            let mut owner = vec![0usize; headers.len()]; // 0 = from, 1 = to

            for (i, mv) in moves.iter().enumerate() {
                let h = headers[i % headers.len()];
                let dest = if *mv == 0 { &from } else { &to };
                ObjectSet::unlink(h);
                dest.push(h);
                owner[i % headers.len()] = *mv;

                prop_assert!(from.debug_validate());
                prop_assert!(to.debug_validate());
            }

            for (idx, h) in headers.iter().enumerate() {
                let in_from = {
                    let mut cur = unsafe { from.sentinel().as_ref().next() };
                    let mut found = false;
                    while cur != from.sentinel() {
                        if cur == *h {
                            found = true;
                        }
                        cur = unsafe { cur.as_ref().next() };
                    }
                    found
                };
                let in_to = {
                    let mut cur = unsafe { to.sentinel().as_ref().next() };
                    let mut found = false;
                    while cur != to.sentinel() {
                        if cur == *h {
                            found = true;
                        }
                        cur = unsafe { cur.as_ref().next() };
                    }
                    found
                };
                prop_assert_ne!(in_from, in_to, "header {} must belong to exactly one set", idx);
                prop_assert_eq!(in_to, owner[idx] == 1);
            }
        }
    }
}
