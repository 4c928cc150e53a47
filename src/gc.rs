//! The collector's public interface: `allocate`, `link` (write barrier),
//! `mark`, `collect`, and the `Collector` struct that owns the four
//! process-global values the state machine operates on: `from`, `to`,
//! `iter`, `white`.

use std::alloc::Layout;
use std::cell::{Cell, RefCell};
use std::ptr::NonNull;

use crate::alloc::RawAlloc;
use crate::color::White;
use crate::header::{Header, Vtable};
use crate::ptr::{AnyRef, Ref};
use crate::roots::RootSource;
use crate::set::ObjectSet;
use crate::stats::Stats;
use crate::trace::{Trace, Visitor};

/// The four states the collector cycles through: `Init` only ever happens
/// once, on first use; a live collector otherwise alternates `Idle` →
/// `Mark` → `Sweep` → `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Init,
    Idle,
    Mark,
    Sweep,
}

/// An incremental tri-color mark-and-sweep collector.
///
/// `Collector<A, R>` is single-threaded and cooperative: it makes progress
/// only when the mutator calls [`Collector::allocate`], [`Collector::link`],
/// [`Collector::mark`], or [`Collector::collect`]. There is no background
/// thread and no locking; every method here takes `&self` and relies on
/// `Cell`/`RefCell` interior mutability, the non-atomic analog of how a
/// concurrent collector would use atomics, because there is exactly one
/// mutator thread to synchronize with.
///
/// `A` is the untyped byte allocator backing every header+payload
/// allocation; `R` enumerates the roots reachable from outside the managed
/// heap. Neither concern is part of the collector itself; see
/// [`RawAlloc`] and [`RootSource`].
pub struct Collector<A: RawAlloc, R: RootSource> {
    pub(crate) alloc: A,
    pub(crate) roots: RefCell<R>,
    pub(crate) from: Cell<Option<ObjectSet>>,
    pub(crate) to: Cell<Option<ObjectSet>>,
    pub(crate) iter: Cell<Option<NonNull<Header>>>,
    pub(crate) white: Cell<White>,
    pub(crate) state: Cell<CollectorState>,
    pub(crate) stats: Stats,
}

impl<A: RawAlloc, R: RootSource> Collector<A, R> {
    /// Build a collector. The heap starts empty and the state machine
    /// starts in `Init`; the first call to `allocate`/`collect` performs
    /// the one-time setup (allocating the `from`/`to` sentinels).
    pub fn new(alloc: A, roots: R) -> Self {
        Collector {
            alloc,
            roots: RefCell::new(roots),
            from: Cell::new(None),
            to: Cell::new(None),
            iter: Cell::new(None),
            white: Cell::new(White::default()),
            state: Cell::new(CollectorState::Init),
            stats: Stats::default(),
        }
    }

    /// Allocate a fresh managed object. Performs one collector step first;
    /// incremental progress paid for by allocation rate, not by a separate
    /// scheduler.
    pub fn allocate<T: Trace>(&self, value: T) -> Ref<T> {
        self.step();

        let layout = Header::layout_for::<T>();
        let mem = self.alloc.alloc(layout);
        let header_ptr: NonNull<Header> = mem.cast();
        let color = self.white.get().white();
        Header::init(header_ptr, color, Vtable::for_type::<T>());

        let payload = Header::payload_of::<T>(header_ptr);
        unsafe { payload.as_ptr().write(value) };

        self.from
            .get()
            .expect("collector initialized by the preceding step()")
            .push(header_ptr);
        self.stats.record_alloc(layout.size());

        #[cfg(feature = "trace-steps")]
        tracing::trace!(bytes = layout.size(), "allocate");

        Ref::from_payload(payload)
    }

    /// The write barrier, to be called by the mutator immediately after
    /// storing `child` into a field of `parent`.
    ///
    /// If `parent` is black and `child` is white, `parent` is re-colored
    /// gray and moved back into `to` for rescanning: a Dijkstra-style
    /// insertion barrier that shades the parent rather than the child.
    /// Otherwise a no-op. Safe to call in any collector state.
    pub fn link<P, C>(&self, parent: Ref<P>, child: Ref<C>) {
        let parent_header = parent.header();
        let child_header = child.header();
        let white = self.white.get();
        let parent_color = unsafe { parent_header.as_ref().color() };
        let child_color = unsafe { child_header.as_ref().color() };
        if white.is_black(parent_color) && white.is_white(child_color) {
            #[cfg(feature = "trace-steps")]
            tracing::trace!("write barrier: shading parent gray");
            self.make_gray(parent_header);
        }
    }

    /// Gray a white reference; a no-op if it's already gray, black, or
    /// `None`. Used both by root enumeration and by object visitors
    /// marking their children.
    pub fn mark<T>(&self, r: Option<Ref<T>>) {
        if let Some(r) = r {
            self.mark_any(r.erase());
        }
    }

    /// Type-erased variant of [`Collector::mark`], used internally by the
    /// root-enumeration callback and by [`Visitor`].
    pub(crate) fn mark_any(&self, r: AnyRef) {
        self.mark_header(r.header());
    }

    pub(crate) fn mark_header(&self, header: NonNull<Header>) {
        let tag = unsafe { header.as_ref().color() };
        if self.white.get().is_white(tag) {
            self.make_gray(header);
        }
    }

    /// Transition `obj` from wherever it currently sits into the gray set.
    pub(crate) fn make_gray(&self, obj: NonNull<Header>) {
        if self.iter.get() == Some(obj) {
            // The MARK cursor is sitting on `obj`; re-graying it (e.g. via
            // the write barrier, or a cyclic reference found mid-scan)
            // unlinks it out from under the cursor, so step back first.
            self.iter.set(Some(unsafe { obj.as_ref().prev() }));
        }
        ObjectSet::unlink(obj);
        self.to.get().expect("collector initialized").push(obj);
        unsafe { obj.as_ref().set_color(crate::color::GRAY) };
    }

    /// Drive the state machine all the way to `Idle`. A stop-the-world
    /// equivalent for callers that want memory back immediately instead of
    /// paying for collection a step at a time via `allocate`.
    pub fn collect(&self) {
        if matches!(
            self.state.get(),
            CollectorState::Init | CollectorState::Idle
        ) {
            self.step();
        }
        while !matches!(self.state.get(), CollectorState::Idle) {
            self.step();
        }
    }

    /// The current state machine state, for diagnostics and tests.
    pub fn state(&self) -> CollectorState {
        self.state.get()
    }

    /// Perform a bounded unit of collector work, advancing the state
    /// machine by exactly one step. Exposed publicly so embedders (and
    /// tests) can drive collection incrementally instead of only via the
    /// stop-the-world `collect`.
    pub fn step(&self) {
        self.run_step();
    }

    pub fn bytes_allocated(&self) -> usize {
        self.stats.bytes_allocated()
    }

    pub fn live_objects(&self) -> usize {
        self.stats.live_objects()
    }

    pub fn cycles_completed(&self) -> usize {
        self.stats.cycles_completed()
    }

    /// Run `f` with a [`Visitor`] whose `mark` calls back into this
    /// collector. Used both by root enumeration and by the MARK step's
    /// invocation of an object's `Trace::visit`.
    pub(crate) fn with_visitor<Func: FnOnce(&Visitor<'_>)>(&self, f: Func) {
        let mark_fn = |r: AnyRef| self.mark_any(r);
        let visitor = Visitor::new(&mark_fn);
        f(&visitor);
    }

    pub(crate) fn alloc_header(&self) -> NonNull<Header> {
        let layout = Layout::new::<Header>();
        self.alloc.alloc(layout).cast()
    }

    /// Mutate the root source in place, e.g. to register or unregister a
    /// root discovered after the collector was constructed.
    pub fn with_roots<Func: FnOnce(&mut R)>(&self, f: Func) {
        f(&mut self.roots.borrow_mut());
    }
}
