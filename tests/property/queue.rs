use std::collections::{HashSet, VecDeque};

use proptest::prelude::*;
use resmirror::queue::EventQueue;

#[derive(Debug, Clone)]
enum Op {
    Add(u8),
    Take,
    Finish,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..5).prop_map(Op::Add),
        2 => Just(Op::Take),
        2 => Just(Op::Finish),
    ]
}

fn key(i: u8) -> String {
    format!("ns/k{i}")
}

proptest! {
    // Keys are handed out at most once at a time, and a key added after its
    // last hand-out is always handed out again before the queue drains.
    #[test]
    fn test_queue_never_double_dispatches_and_loses_nothing(
        ops in proptest::collection::vec(op(), 1..80),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let queue = EventQueue::new("prop");
            let mut held: VecDeque<String> = VecDeque::new();
            let mut owed: HashSet<String> = HashSet::new();

            for op in ops {
                match op {
                    Op::Add(i) => {
                        queue.add(&key(i));
                        owed.insert(key(i));
                    }
                    Op::Take => {
                        if queue.is_empty() {
                            continue;
                        }
                        let k = queue.get().await.unwrap();
                        prop_assert!(!held.contains(&k), "{} handed out twice", k);
                        owed.remove(&k);
                        held.push_back(k);
                    }
                    Op::Finish => {
                        if let Some(k) = held.pop_front() {
                            queue.done(&k);
                        }
                    }
                }
                prop_assert!(queue.len() <= 5);
                prop_assert_eq!(queue.in_flight(), held.len());
            }

            for k in held.drain(..) {
                queue.done(&k);
            }
            queue.shut_down();

            let mut drained = HashSet::new();
            while let Some(k) = queue.get().await {
                prop_assert!(drained.insert(k.clone()), "{} drained twice", k);
                queue.done(&k);
            }
            prop_assert_eq!(drained, owed);
            Ok(())
        })?;
    }
}
