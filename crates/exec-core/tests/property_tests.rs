//! Property-based tests for the universal properties in spec §8, following
//! the donor crate's `tests/property_tests.rs` style (proptest over
//! generated operation sequences rather than fixed example inputs).

use exec_core::config::{CvQueueConfig, LfQueueConfig, Multiplicity};
use exec_core::cv_queue::CvQueue;
use exec_core::lfq::LfQueue;
use proptest::prelude::*;

// =============================================================================
// Property 1 — CVQ conservation: popped multiset == pushed multiset.
// =============================================================================

proptest! {
    #[test]
    fn prop_cv_queue_conservation(values in prop::collection::vec(0i64..10_000, 0..200)) {
        let q = CvQueue::<i64>::with_multiplicity(32, Multiplicity::Spsc);
        for &v in &values {
            prop_assert!(q.push_wait(v));
        }
        q.close();
        let mut popped = Vec::new();
        while let Some(v) = q.pop_wait() {
            popped.push(v);
        }
        let mut expected = values.clone();
        expected.sort_unstable();
        popped.sort_unstable();
        prop_assert_eq!(popped, expected);
    }
}

// =============================================================================
// Property 2/3 — SPSC FIFO with queue access, LIFO with stack access.
// =============================================================================

proptest! {
    #[test]
    fn prop_spsc_fifo_with_queue_access(values in prop::collection::vec(0i64..10_000, 1..100)) {
        let q = CvQueue::new(
            CvQueueConfig::new(values.len().max(1), Multiplicity::Spsc)
                .unwrap()
                .with_access(exec_core::config::AccessDiscipline::Queue),
        );
        for &v in &values {
            prop_assert!(q.push_wait(v));
        }
        let mut out = Vec::new();
        for _ in 0..values.len() {
            out.push(q.pop_wait().unwrap());
        }
        prop_assert_eq!(out, values);
    }

    #[test]
    fn prop_spsc_lifo_with_stack_access(values in prop::collection::vec(0i64..10_000, 1..100)) {
        let q = CvQueue::<i64>::new(
            CvQueueConfig::new(values.len().max(1), Multiplicity::Spsc).unwrap(),
        );
        for &v in &values {
            prop_assert!(q.push_wait(v));
        }
        let mut out = Vec::new();
        for _ in 0..values.len() {
            out.push(q.pop_wait().unwrap());
        }
        let mut expected = values.clone();
        expected.reverse();
        prop_assert_eq!(out, expected);
    }
}

// =============================================================================
// Property 5 — LFQ bounded: size() <= capacity at every observation point,
// try_push fails iff full, try_pop fails iff empty.
// =============================================================================

proptest! {
    #[test]
    fn prop_lfq_bounded_and_try_semantics(
        capacity in 1usize..32,
        pushes in 0usize..64,
    ) {
        let q = LfQueue::<i64>::new(LfQueueConfig::new(capacity).unwrap());
        let mut accepted = 0usize;
        for i in 0..pushes {
            match q.try_push(i as i64) {
                Ok(()) => {
                    accepted += 1;
                    prop_assert!(q.len() <= capacity);
                }
                Err(_) => prop_assert_eq!(accepted, capacity),
            }
        }
        let mut drained = 0usize;
        while q.try_pop().is_some() {
            drained += 1;
        }
        prop_assert_eq!(drained, accepted);
        prop_assert!(q.try_pop().is_none());
    }
}
