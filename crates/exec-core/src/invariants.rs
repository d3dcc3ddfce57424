//! Debug assertion macros for the lock-free ring's turn-counter protocol.
//!
//! Active only in debug builds (`#[cfg(debug_assertions)]`); zero overhead
//! in release. Mirrors the teacher crate's `invariants.rs` pattern of
//! named, documented macros rather than bare `debug_assert!` calls
//! scattered through the algorithm.

/// Assert a slot's turn is even (ready to accept a push) before writing to it.
///
/// **Invariant**: `turn[i]` is even while empty, odd while occupied.
macro_rules! debug_assert_slot_ready_for_push {
    ($turn:expr, $want:expr) => {
        debug_assert_eq!(
            $turn, $want,
            "INV-LFQ-01 violated: slot turn {} does not match expected push turn {}",
            $turn, $want
        )
    };
}

/// Assert a slot's turn is odd (holds a payload) before reading it.
macro_rules! debug_assert_slot_ready_for_pop {
    ($turn:expr, $want:expr) => {
        debug_assert_eq!(
            $turn, $want,
            "INV-LFQ-02 violated: slot turn {} does not match expected pop turn {}",
            $turn, $want
        )
    };
}

/// Assert head/tail never imply an occupancy above capacity.
///
/// **Invariant**: `0 ≤ head - tail ≤ capacity` for the blocking push path,
/// which claims a slot before it necessarily exists; over a long run the
/// distance can only legitimately exceed capacity by the number of
/// in-flight blocked pushes, so this only fires on gross corruption.
macro_rules! debug_assert_head_tail_sane {
    ($head:expr, $tail:expr) => {
        debug_assert!(
            $head >= $tail,
            "INV-LFQ-03 violated: head {} behind tail {}",
            $head,
            $tail
        )
    };
}

pub(crate) use debug_assert_head_tail_sane;
pub(crate) use debug_assert_slot_ready_for_pop;
pub(crate) use debug_assert_slot_ready_for_push;
