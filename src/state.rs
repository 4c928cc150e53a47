//! The state machine: `Init → Idle → Mark → Sweep → Idle → ...`.
//!
//! Each call to [`Collector::run_step`] performs a single bounded unit of
//! work, which is what makes the collector incremental: the mutator decides
//! how often to call it (once per `allocate`, or in a tight loop from
//! `collect`), and no single call does more than O(1) object visits plus
//! one root enumeration.

use crate::alloc::RawAlloc;
use crate::gc::{Collector, CollectorState};
use crate::header::Header;
use crate::roots::RootSource;
use crate::set::ObjectSet;

impl<A: RawAlloc, R: RootSource> Collector<A, R> {
    pub(crate) fn run_step(&self) {
        if let CollectorState::Init = self.state.get() {
            self.init_heap();
            // INIT falls straight through into the IDLE step it just
            // transitioned to, rather than requiring a second call.
            self.idle_step();
            return;
        }
        match self.state.get() {
            CollectorState::Init => unreachable!("init_heap transitions out of Init"),
            CollectorState::Idle => self.idle_step(),
            CollectorState::Mark => self.mark_step(),
            CollectorState::Sweep => self.sweep_step(),
        }
    }

    /// One-time setup: allocate the `from`/`to` sentinels and position the
    /// cursor at an empty `to`.
    fn init_heap(&self) {
        let from_sentinel = self.alloc_header();
        let to_sentinel = self.alloc_header();
        Header::init_sentinel(from_sentinel);
        Header::init_sentinel(to_sentinel);

        let from = ObjectSet::new(from_sentinel);
        let to = ObjectSet::new(to_sentinel);

        self.from.set(Some(from));
        self.to.set(Some(to));
        self.iter.set(Some(to.sentinel()));
        self.state.set(CollectorState::Idle);
    }

    /// IDLE: enumerate roots, graying everything reachable from outside the
    /// heap, then move on to MARK.
    fn idle_step(&self) {
        self.enumerate_roots();
        self.state.set(CollectorState::Mark);

        #[cfg(feature = "trace-steps")]
        tracing::trace!("idle -> mark");
    }

    /// MARK: advance the cursor by one gray object, blackening it and
    /// visiting its children. When the gray set is exhausted, re-enumerate
    /// roots once more (catching anything grayed by a write barrier since
    /// the last enumeration); if that doesn't produce new work either, the
    /// cycle is done: swap `from`/`to`, flip the white bit, and move on to
    /// SWEEP.
    fn mark_step(&self) {
        let to = self.to.get().expect("collector initialized");
        let cursor = self.iter.get().expect("collector initialized");
        let next = unsafe { cursor.as_ref().next() };

        if next != to.sentinel() {
            self.iter.set(Some(next));
            let black = self.white.get().black();
            unsafe { next.as_ref().set_color(black) };

            let vtable = unsafe { next.as_ref().vtable() };
            self.with_visitor(|visitor| unsafe { (vtable.visit)(next, visitor) });
            return;
        }

        self.enumerate_roots();
        let still_empty = {
            let to = self.to.get().expect("collector initialized");
            let cursor = self.iter.get().expect("collector initialized");
            unsafe { cursor.as_ref().next() == to.sentinel() }
        };
        if !still_empty {
            // A late root produced new gray work; stay in MARK and pick it
            // up on the next step.
            return;
        }

        self.finish_mark();
    }

    fn finish_mark(&self) {
        let old_from = self.from.get().expect("collector initialized");
        let old_to = self.to.get().expect("collector initialized");

        self.from.set(Some(old_to));
        self.to.set(Some(old_from));

        let mut white = self.white.get();
        white.flip();
        self.white.set(white);

        // `old_from` now holds every object that stayed white: unreached
        // this cycle. It becomes the condemned set for SWEEP.
        let first_condemned = unsafe { old_from.sentinel().as_ref().next() };
        self.iter.set(Some(first_condemned));
        self.state.set(CollectorState::Sweep);

        #[cfg(feature = "trace-steps")]
        tracing::trace!("mark -> sweep");
    }

    /// SWEEP: free exactly one condemned object per step. When the
    /// condemned set is exhausted, clear it (ready to become next cycle's
    /// `to`) and return to IDLE.
    fn sweep_step(&self) {
        let condemned = self.to.get().expect("collector initialized");
        let obj = self.iter.get().expect("collector initialized");

        if obj != condemned.sentinel() {
            let next = unsafe { obj.as_ref().next() };
            self.iter.set(Some(next));

            let vtable = unsafe { obj.as_ref().vtable() };
            let layout = vtable.layout;
            unsafe {
                (vtable.drop_in_place)(obj);
                self.alloc.dealloc(obj.cast(), layout);
            }
            self.stats.record_free(layout.size());
            return;
        }

        condemned.clear();
        self.state.set(CollectorState::Idle);
        self.stats.record_cycle_completed();

        #[cfg(feature = "trace-steps")]
        tracing::trace!("sweep -> idle");
    }

    fn enumerate_roots(&self) {
        let mark_fn = |r: crate::ptr::AnyRef| self.mark_any(r);
        let mut roots = self.roots.borrow_mut();
        roots.iterate_roots(&mut |r| mark_fn(r));
    }
}
