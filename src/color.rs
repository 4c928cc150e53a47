//! Tri-color marking tags.
//!
//! Color is a 2-bit tag. White is not a fixed bit pattern: it is whichever
//! of `{0, 1}` the collector's global white bit currently names, and flips
//! every cycle so the previous cycle's black becomes the next cycle's white
//! without walking the heap. Gray is always the constant tag value `2`.
//!
//! The collector is single-threaded and cooperative (no preemption, no
//! other mutator threads), so unlike a concurrent collector this tag needs
//! no atomics; a plain `Cell` suffices.

/// A raw 2-bit color tag, as stored in the low bits of a header's `next` word.
pub(crate) type Tag = u8;

/// The constant tag value used for gray. Implementations must never compare
/// for "black" directly; compare `tag == white.black()` among `{0, 1}`, and
/// `tag == GRAY` for gray.
pub(crate) const GRAY: Tag = 2;

/// The current cycle's white bit: `0` or `1`. Black is always `!white`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct White(pub Tag);

impl White {
    pub(crate) fn black(self) -> Tag {
        self.0 ^ 1
    }

    pub(crate) fn white(self) -> Tag {
        self.0
    }

    pub(crate) fn is_white(self, tag: Tag) -> bool {
        tag == self.0
    }

    pub(crate) fn is_black(self, tag: Tag) -> bool {
        tag == self.black()
    }

    pub(crate) fn is_gray(tag: Tag) -> bool {
        tag == GRAY
    }

    /// Flip the white bit at a MARK→SWEEP transition.
    pub(crate) fn flip(&mut self) {
        self.0 ^= 1;
    }
}

impl Default for White {
    fn default() -> Self {
        White(0)
    }
}
