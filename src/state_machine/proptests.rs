//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::transition::*;
use super::*;
use crate::step::{Step, StepMap, END, RESTARTING};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

const KNOWN_KEYS: [&str; 3] = ["greet", "ask", "bye"];

fn test_steps() -> StepMap {
    KNOWN_KEYS
        .iter()
        .map(|key| ((*key).to_string(), Step::new("text")))
        .collect()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(KNOWN_KEYS.to_vec()).prop_map(String::from),
        Just(END.to_string()),
        Just(RESTARTING.to_string()),
        "[a-z]{1,8}",
    ]
}

fn arb_event_name() -> impl Strategy<Value = String> {
    prop_oneof![Just("form_submission".to_string()), "[a-z_]{1,12}"]
}

fn arb_state() -> impl Strategy<Value = EngineState> {
    prop_oneof![
        Just(EngineState::Idle),
        Just(EngineState::Ended),
        arb_key().prop_map(|key| EngineState::ActiveStep { key }),
        arb_key().prop_map(|key| EngineState::Stalled { key }),
        (arb_key(), arb_event_name())
            .prop_map(|(key, event)| EngineState::AwaitingInput { key, event }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_key().prop_map(|key| Event::KeyChanged { key }),
        arb_event_name().prop_map(|event| Event::InputRequested { event }),
        arb_event_name().prop_map(|event| Event::InputReceived { event }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// A key change is accepted from every state
    #[test]
    fn key_change_always_accepted(state in arb_state(), key in arb_key()) {
        let result = transition(&state, &test_steps(), Event::KeyChanged { key });
        prop_assert!(result.is_ok());
    }

    /// END ends the conversation with exactly one notification and no play
    #[test]
    fn end_notifies_exactly_once(state in arb_state()) {
        let result = transition(&state, &test_steps(), Event::key_changed(END)).unwrap();
        prop_assert_eq!(result.new_state, EngineState::Ended);
        prop_assert_eq!(result.effects, vec![Effect::NotifyEnd]);
    }

    /// A step plays if and only if its key is defined
    #[test]
    fn play_iff_key_defined(state in arb_state(), key in arb_key()) {
        let steps = test_steps();
        let result = transition(&state, &steps, Event::KeyChanged { key: key.clone() }).unwrap();
        let plays: Vec<_> = result
            .effects
            .iter()
            .filter(|e| matches!(e, Effect::PlayStep { .. }))
            .collect();

        let should_play = key != END && key != RESTARTING && steps.contains_key(&key);
        prop_assert_eq!(plays.len(), usize::from(should_play));
        if should_play {
            prop_assert_eq!(result.new_state, EngineState::ActiveStep { key });
        }
    }

    /// Input events never produce effects
    #[test]
    fn input_events_are_effect_free(state in arb_state(), event in arb_event()) {
        let is_input = !matches!(event, Event::KeyChanged { .. });
        if let Ok(result) = transition(&state, &test_steps(), event) {
            if is_input {
                prop_assert!(result.effects.is_empty());
            }
        }
    }

    /// Ended only leaves through another key change
    #[test]
    fn ended_is_sticky_for_input(event_name in arb_event_name()) {
        let requested = transition(
            &EngineState::Ended,
            &test_steps(),
            Event::InputRequested { event: event_name.clone() },
        );
        prop_assert!(requested.is_err());

        let received = transition(
            &EngineState::Ended,
            &test_steps(),
            Event::InputReceived { event: event_name },
        );
        prop_assert!(received.is_err());
    }

    /// Waiting keeps the step key it was entered from
    #[test]
    fn waiting_keeps_step_key(key in arb_key(), event_name in arb_event_name()) {
        let state = EngineState::ActiveStep { key: key.clone() };
        let result = transition(
            &state,
            &test_steps(),
            Event::InputRequested { event: event_name.clone() },
        )
        .unwrap();
        prop_assert_eq!(
            result.new_state,
            EngineState::AwaitingInput { key, event: event_name }
        );
    }
}
