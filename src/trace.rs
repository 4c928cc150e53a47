//! The `Trace` trait: the object-specific visitor used during MARK.
//!
//! A type that can hold managed references must implement `Trace` so the
//! collector can enumerate its outgoing children while scanning it.

use crate::ptr::{AnyRef, Ref};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::convert::Infallible;

/// Passed to `Trace::visit`; wraps the collector's `mark` entry point
/// without leaking the collector's allocator/root-source type parameters
/// into every `Trace` implementation.
pub struct Visitor<'a> {
    mark: &'a dyn Fn(AnyRef),
}

impl<'a> Visitor<'a> {
    pub(crate) fn new(mark: &'a dyn Fn(AnyRef)) -> Self {
        Visitor { mark }
    }

    /// Mark a child reference reachable. Safe to call any number of times;
    /// marking an already gray or black object is a no-op.
    pub fn mark<T>(&self, r: Ref<T>) {
        (self.mark)(r.erase());
    }
}

/// Types that can hold managed references and must report them to the
/// collector during MARK.
///
/// # Safety
///
/// Implementations must call `visitor.mark()` on every `Ref<_>` reachable
/// from `self`, directly or indirectly. Failing to trace a reachable
/// reference causes the collector to sweep a still-live object out from
/// under the mutator.
pub unsafe trait Trace {
    /// Set to `true` for leaf types that can never contain a managed
    /// reference (primitives, `String`, ...), so the collector can color
    /// them black immediately during MARK without invoking `visit` at all.
    const NO_TRACE: bool = false;

    fn visit(&self, visitor: &Visitor<'_>);
}

unsafe impl<T> Trace for Ref<T> {
    fn visit(&self, visitor: &Visitor<'_>) {
        visitor.mark(*self);
    }
}

macro_rules! impl_no_trace {
    ($($ty:ty),* $(,)?) => {
        $(
            unsafe impl Trace for $ty {
                const NO_TRACE: bool = true;
                fn visit(&self, _visitor: &Visitor<'_>) {}
            }
        )*
    };
}

impl_no_trace!(
    (), i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
    String, Infallible
);

unsafe impl<T> Trace for std::marker::PhantomData<T> {
    const NO_TRACE: bool = true;
    fn visit(&self, _visitor: &Visitor<'_>) {}
}

macro_rules! impl_trace_deref {
    ($($ty:ident),* $(,)?) => {
        $(
            unsafe impl<T: Trace> Trace for $ty<T> {
                const NO_TRACE: bool = T::NO_TRACE;
                fn visit(&self, visitor: &Visitor<'_>) {
                    T::visit(self, visitor);
                }
            }
        )*
    };
}

impl_trace_deref!(Box);

macro_rules! impl_trace_iterable {
    ($($ty:ident),* $(,)?) => {
        $(
            unsafe impl<T: Trace> Trace for $ty<T> {
                const NO_TRACE: bool = T::NO_TRACE;
                fn visit(&self, visitor: &Visitor<'_>) {
                    for item in self {
                        item.visit(visitor);
                    }
                }
            }
        )*
    };
}

impl_trace_iterable!(Vec, VecDeque, HashSet, BTreeSet);

unsafe impl<K: Trace, V: Trace> Trace for HashMap<K, V> {
    const NO_TRACE: bool = K::NO_TRACE && V::NO_TRACE;
    fn visit(&self, visitor: &Visitor<'_>) {
        for (k, v) in self.iter() {
            k.visit(visitor);
            v.visit(visitor);
        }
    }
}

unsafe impl<K: Trace, V: Trace> Trace for BTreeMap<K, V> {
    const NO_TRACE: bool = K::NO_TRACE && V::NO_TRACE;
    fn visit(&self, visitor: &Visitor<'_>) {
        for (k, v) in self.iter() {
            k.visit(visitor);
            v.visit(visitor);
        }
    }
}

unsafe impl<T: Trace> Trace for Option<T> {
    const NO_TRACE: bool = T::NO_TRACE;
    fn visit(&self, visitor: &Visitor<'_>) {
        if let Some(value) = self {
            value.visit(visitor);
        }
    }
}

unsafe impl<T: Trace, E: Trace> Trace for Result<T, E> {
    const NO_TRACE: bool = T::NO_TRACE && E::NO_TRACE;
    fn visit(&self, visitor: &Visitor<'_>) {
        match self {
            Ok(v) => v.visit(visitor),
            Err(e) => e.visit(visitor),
        }
    }
}

unsafe impl<T: Trace, const N: usize> Trace for [T; N] {
    const NO_TRACE: bool = T::NO_TRACE;
    fn visit(&self, visitor: &Visitor<'_>) {
        for item in self {
            item.visit(visitor);
        }
    }
}
