//! Property-based tests for the message and history ledgers

use super::*;
use crate::step::END;
use crate::testing::{steps, RecordingWidget};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    /// Play a step whose type is registered (or not)
    Send { registered: bool },
    Pop,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<bool>().prop_map(|registered| Op::Send { registered }),
        1 => Just(Op::Pop),
    ]
}

/// Engine parked on `END`, so only explicit sends touch the ledgers
fn parked_engine() -> ChatEngine {
    ChatEngine::start(
        EngineProps::new(steps(vec![(END, Step::default())]))
            .initial_step(END)
            .with_widget(Arc::new(RecordingWidget::new("text"))),
    )
}

fn run_paused<F: std::future::Future<Output = T>, T>(future: F) -> T {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    /// Messages count resolved plays minus effective pops; history counts
    /// every play and never shrinks
    #[test]
    fn ledgers_track_plays_and_pops(ops in prop::collection::vec(arb_op(), 0..40)) {
        let (messages, history, expected_messages, expected_history) = run_paused(async move {
            let engine = parked_engine();
            tokio::task::yield_now().await;

            let mut expected_messages = 0usize;
            let mut expected_history = 0usize;
            for op in ops {
                let before = engine.snapshot().history.len();
                match op {
                    Op::Send { registered } => {
                        let kind = if registered { "text" } else { "missing" };
                        let _ = engine.send_message(&Step::new(kind));
                        expected_history += 1;
                        if registered {
                            expected_messages += 1;
                        }
                    }
                    Op::Pop => {
                        let popped = engine.pop_last_message();
                        assert_eq!(popped.is_some(), expected_messages > 0);
                        expected_messages = expected_messages.saturating_sub(1);
                    }
                }
                assert!(engine.snapshot().history.len() >= before);
            }

            let snapshot = engine.snapshot();
            (
                snapshot.messages.len(),
                snapshot.history.len(),
                expected_messages,
                expected_history,
            )
        });

        prop_assert_eq!(messages, expected_messages);
        prop_assert_eq!(history, expected_history);
    }

    /// Message keys stay positional after any mix of sends and pops
    #[test]
    fn message_keys_are_positional(ops in prop::collection::vec(arb_op(), 0..40)) {
        let keys = run_paused(async move {
            let engine = parked_engine();
            for op in ops {
                match op {
                    Op::Send { .. } => {
                        let _ = engine.send_message(&Step::new("text"));
                    }
                    Op::Pop => {
                        let _ = engine.pop_last_message();
                    }
                }
            }
            engine
                .snapshot()
                .messages
                .into_iter()
                .map(|m| m.key)
                .collect::<Vec<_>>()
        });

        let expected: Vec<_> = (0..keys.len()).map(|i| format!("msg-{i}")).collect();
        prop_assert_eq!(keys, expected);
    }
}
