//! Property test: batas kapasitas N-1 dan FIFO untuk urutan operasi acak

// Loom mengganti atomics buffer; stress test ini hanya untuk build normal
#![cfg(not(feature = "loom"))]

use std::collections::VecDeque;

use corong::core::CircularBuffer;
use corong::{Channel, ChannelError, TrySendError};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Push,
    Pop,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Push), Just(Op::Pop)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn full_at_exactly_n_minus_one(slots in 2usize..64, rounds in 1usize..4) {
        let cb: CircularBuffer<usize> = CircularBuffer::new(slots);

        // Beberapa putaran supaya cursor melewati batas slot
        for _ in 0..rounds {
            for i in 0..slots - 1 {
                prop_assert!(!cb.is_full());
                prop_assert!(cb.push(i).is_ok());
            }
            prop_assert!(cb.is_full());
            prop_assert_eq!(cb.len(), slots - 1);
            prop_assert_eq!(cb.reserve(), None);

            // Satu acquire+release -> tepat satu reserve lagi
            prop_assert_eq!(cb.pop(), Some(0));
            prop_assert!(cb.push(usize::MAX).is_ok());
            prop_assert_eq!(cb.push(0), Err(0));

            while cb.pop().is_some() {}
            prop_assert!(cb.is_empty());
        }
    }

    #[test]
    fn matches_bounded_queue_model(slots in 2usize..16, ops in proptest::collection::vec(op(), 1..300)) {
        let channel: Channel<u32> = Channel::new(slots);
        let mut model: VecDeque<u32> = VecDeque::new();
        let mut next = 0u32;

        for op in ops {
            match op {
                Op::Push => {
                    let result = channel.try_send(next);
                    if model.len() < slots - 1 {
                        prop_assert_eq!(result, Ok(()));
                        model.push_back(next);
                    } else {
                        prop_assert_eq!(result, Err(TrySendError::Full(next)));
                    }
                    next += 1;
                }
                Op::Pop => {
                    let expected = model.pop_front().ok_or(ChannelError::Empty);
                    prop_assert_eq!(channel.try_receive(), expected);
                }
            }
            prop_assert_eq!(channel.len(), model.len());
            prop_assert_eq!(channel.is_full(), model.len() == slots - 1);
        }
    }
}
