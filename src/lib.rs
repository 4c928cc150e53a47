//! tristep: an incremental tri-color mark-and-sweep garbage collector for a
//! single-threaded managed runtime.
//!
//! Collection happens in small, bounded steps rather than all at once: the
//! collector makes progress every time the mutator allocates
//! ([`Collector::allocate`]), or all the way to completion on demand
//! ([`Collector::collect`]). There is no background thread, no locking, and
//! no support for concurrent mutator threads. See `DESIGN.md` for why
//! that's a deliberate scope boundary rather than an oversight.
//!
//! Rootedness is the embedder's responsibility, not the collector's: a
//! freshly allocated value that isn't registered with a [`RootSource`] (or
//! reached from one) before the next incremental step completes a cycle is
//! legitimately collected, the same way a local variable in a
//! stop-the-world collector must be on the stack to be scanned.
//!
//! # Example
//!
//! ```
//! use tristep::{Collector, RootList, SystemAlloc, Trace, Visitor};
//!
//! struct Node {
//!     value: i64,
//! }
//!
//! unsafe impl Trace for Node {
//!     const NO_TRACE: bool = true;
//!     fn visit(&self, _visitor: &Visitor<'_>) {}
//! }
//!
//! let collector = Collector::new(SystemAlloc, RootList::new());
//! let node = collector.allocate(Node { value: 42 });
//! collector.with_roots(|roots| roots.register(node.erase()));
//!
//! collector.collect();
//! assert_eq!(node.value, 42);
//! ```

mod alloc;
mod cell;
mod color;
mod gc;
mod header;
mod ptr;
mod roots;
mod set;
mod state;
mod stats;
mod trace;

pub use alloc::{RawAlloc, SystemAlloc};
pub use cell::GcCell;
pub use gc::{Collector, CollectorState};
pub use ptr::{AnyRef, Ref};
pub use roots::{RootList, RootSource};
pub use trace::{Trace, Visitor};
