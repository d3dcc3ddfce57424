//! Cache-line padding to prevent false sharing between hot atomics.
//!
//! Re-exports [`crossbeam_utils::CachePadded`] under a crate-local name so
//! call sites don't need to know which crate supplies it, and pins down the
//! fallback constant used by components that size their own storage by
//! hand (the lock-free ring's slot layout) rather than by wrapping a field.

pub(crate) use crossbeam_utils::CachePadded;

/// Default destructive interference size for platforms
/// `crossbeam_utils` doesn't special-case (most non-x86/ARM targets land
/// here, and it's also `crossbeam_utils`'s own fallback).
pub const DESTRUCTIVE_INTERFERENCE_SIZE: usize = 64;
