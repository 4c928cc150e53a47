//! The object header: the fixed-size prefix placed immediately before every
//! managed payload.
//!
//! `[ header | payload ]`. The header carries the owning set's circular-list
//! linkage (`next`/`prev`), the 2-bit color tag packed into the low bits of
//! `next`, and a type-erased vtable pointer used to enumerate the object's
//! outgoing references and to drop/free it during sweep.

use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;

use crate::color::Tag;
use crate::trace::{Trace, Visitor};

/// Type-erased per-allocation operations: a visit function plus the
/// bookkeeping (layout, drop) a safe Rust implementation needs to release a
/// `T` properly instead of just reinterpreting raw bytes.
pub(crate) struct Vtable {
    /// `visitFn`: invoked on MARK with the owning header, calls `mark` on
    /// every outgoing child reference of the object.
    pub(crate) visit: unsafe fn(NonNull<Header>, &Visitor<'_>),
    /// Drops the payload in place and returns the `Layout` used to free the
    /// `[header | payload]` allocation.
    pub(crate) drop_in_place: unsafe fn(NonNull<Header>),
    /// Layout of the full `[header | payload]` allocation for this type.
    pub(crate) layout: Layout,
}

/// A vtable that must never be invoked: used only by the sentinel headers,
/// which are never passed to a visitor or to `free`.
static POISON: Vtable = Vtable {
    visit: |_, _| unreachable!("sentinel header must never be visited"),
    drop_in_place: |_| unreachable!("sentinel header must never be dropped"),
    layout: Layout::new::<()>(),
};

impl Vtable {
    pub(crate) fn for_type<T: Trace>() -> &'static Vtable {
        unsafe fn visit_noop(_header: NonNull<Header>, _visitor: &Visitor<'_>) {}

        unsafe fn visit_impl<T: Trace>(header: NonNull<Header>, visitor: &Visitor<'_>) {
            unsafe {
                let payload = Header::payload_of::<T>(header);
                payload.as_ref().visit(visitor);
            }
        }

        unsafe fn drop_impl<T: Trace>(header: NonNull<Header>) {
            unsafe {
                let payload = Header::payload_of::<T>(header).as_ptr();
                std::ptr::drop_in_place(payload);
            }
        }

        // One vtable instance per monomorphization of T, shared by every
        // allocation of that type: no per-object overhead.
        trait VtableFor {
            const VTABLE: Vtable;
        }
        impl<T: Trace> VtableFor for T {
            const VTABLE: Vtable = Vtable {
                visit: if T::NO_TRACE { visit_noop } else { visit_impl::<T> },
                drop_in_place: drop_impl::<T>,
                layout: Header::layout_for::<T>(),
            };
        }
        &<T as VtableFor>::VTABLE
    }
}

/// Header alignment. Also the maximum payload alignment this crate
/// supports: `layout_for` asserts `align_of::<T>() <= HEADER_ALIGN` so that
/// the payload always lands exactly `Header::SIZE` bytes past the header
/// (see `layout_for`'s doc comment for why this needs to hold).
pub(crate) const HEADER_ALIGN: usize = 16;

/// The collector-owned header prefix. Aligned so that its own address's low
/// 2 bits are always free for the color tag, and so that payload pointers
/// handed back to the mutator are correctly aligned.
#[repr(C, align(16))]
pub(crate) struct Header {
    /// High bits: next header in the owning set's circular list. Low 2
    /// bits: color tag.
    next_with_color: Cell<usize>,
    /// Previous header in the owning set's circular list.
    prev: Cell<NonNull<Header>>,
    vtable: &'static Vtable,
}

const COLOR_MASK: usize = 0b11;
const PTR_MASK: usize = !COLOR_MASK;

impl Header {
    /// Header size, rounded up to alignment, such that `payload = header +
    /// HEADER_SIZE` is itself correctly aligned for any `T`.
    pub(crate) const SIZE: usize = std::mem::size_of::<Header>();

    /// Construct a detached header (not yet linked into any set) for a
    /// freshly allocated object. `next`/`prev` are left self-pointing;
    /// the caller (`allocate`) immediately `push`es it into `from`.
    pub(crate) fn init(at: NonNull<Header>, color: Tag, vtable: &'static Vtable) {
        unsafe {
            at.as_ptr().write(Header {
                next_with_color: Cell::new(at.as_ptr() as usize | (color as usize & COLOR_MASK)),
                prev: Cell::new(at),
                vtable,
            });
        }
    }

    /// Initialize a sentinel: an empty circular list (self-linked), poison
    /// vtable, color `0` (never inspected).
    pub(crate) fn init_sentinel(at: NonNull<Header>) {
        Self::init(at, 0, &POISON);
    }

    pub(crate) fn next(&self) -> NonNull<Header> {
        unsafe { NonNull::new_unchecked((self.next_with_color.get() & PTR_MASK) as *mut Header) }
    }

    pub(crate) fn set_next(&self, next: NonNull<Header>) {
        let color = self.next_with_color.get() & COLOR_MASK;
        self.next_with_color
            .set((next.as_ptr() as usize & PTR_MASK) | color);
    }

    pub(crate) fn prev(&self) -> NonNull<Header> {
        self.prev.get()
    }

    pub(crate) fn set_prev(&self, prev: NonNull<Header>) {
        self.prev.set(prev);
    }

    pub(crate) fn color(&self) -> Tag {
        (self.next_with_color.get() & COLOR_MASK) as Tag
    }

    pub(crate) fn set_color(&self, color: Tag) {
        let ptr = self.next_with_color.get() & PTR_MASK;
        self.next_with_color.set(ptr | (color as usize & COLOR_MASK));
    }

    pub(crate) fn vtable(&self) -> &'static Vtable {
        self.vtable
    }

    /// The payload reference for this header: `header_address + header_size`.
    pub(crate) fn payload_of<T>(header: NonNull<Header>) -> NonNull<T> {
        unsafe {
            NonNull::new_unchecked(
                (header.as_ptr() as *mut u8).add(Self::SIZE) as *mut T
            )
        }
    }

    /// The header owning a given payload reference.
    pub(crate) fn of_payload<T>(payload: NonNull<T>) -> NonNull<Header> {
        unsafe {
            NonNull::new_unchecked(
                (payload.as_ptr() as *mut u8).sub(Self::SIZE) as *mut Header
            )
        }
    }

    /// Layout of `[header | T]`, used both to size the allocation and to
    /// free it again on sweep.
    ///
    /// `payload_of`/`of_payload` assume the payload sits at exactly
    /// `Header::SIZE` bytes past the header address. That only holds
    /// because `Header::SIZE` is already a multiple of `HEADER_ALIGN` (the
    /// header is `repr(align(HEADER_ALIGN))`) and `align_of::<T>() <=
    /// HEADER_ALIGN` is asserted below, so `Layout::extend`'s computed
    /// offset for `T` never needs to round `Header::SIZE` further up.
    pub(crate) const fn layout_for<T>() -> Layout {
        assert!(
            std::mem::align_of::<T>() <= HEADER_ALIGN,
            "tristep: payload alignment exceeds the collector's supported maximum"
        );
        let header_layout = Layout::new::<Header>();
        let t_layout = Layout::new::<T>();
        match header_layout.extend(t_layout) {
            Ok((combined, offset)) => {
                debug_assert!(offset == Header::SIZE);
                combined.pad_to_align()
            }
            Err(_) => panic!("tristep: oversize allocation"),
        }
    }
}
