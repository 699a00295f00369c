//! Conversation store
//!
//! Every piece of conversation state lives in a [`StateCell`], an observable
//! value backed by a `tokio::sync::watch` channel. Dependents subscribe to a
//! cell and are woken whenever a setter actually changes it.

use crate::step::{HistoryEntry, Message};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;

/// Observable state cell with direct and functional setters
#[derive(Debug)]
pub struct StateCell<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone + PartialEq> StateCell<T> {
    pub fn new(value: T) -> Self {
        let (tx, _) = watch::channel(value);
        Self { tx }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Read the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Replace the value. Subscribers are only woken if it differs.
    pub fn set(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// Compute the new value from the previous one.
    ///
    /// `f` always sees the latest value, so queued updates compose. It runs
    /// while the cell is locked and must not touch this cell itself.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        self.tx.send_if_modified(|current| {
            let next = f(current);
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }

    /// Receiver that wakes on every effective change
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + PartialEq> StateCell<Vec<T>> {
    /// Append one element
    pub fn push(&self, item: T) {
        self.tx.send_modify(|items| items.push(item));
    }

    /// Append one element built from the current length
    pub fn push_with(&self, build: impl FnOnce(usize) -> T) {
        self.tx.send_modify(|items| {
            let item = build(items.len());
            items.push(item);
        });
    }

    /// Remove the last element, if any
    pub fn pop(&self) -> Option<T> {
        let mut popped = None;
        self.tx.send_if_modified(|items| {
            popped = items.pop();
            popped.is_some()
        });
        popped
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }
}

/// Open-ended key/value bag shared by all widgets of a run
pub type InternalState = Map<String, Value>;

/// Reactive state of one conversation.
///
/// A play appends to `history` before `messages`, so anything reacting to
/// the message ledger already sees the matching history entry.
#[derive(Debug)]
pub struct ConversationStore {
    pub active_key: StateCell<String>,
    pub messages: StateCell<Vec<Message>>,
    pub history: StateCell<Vec<HistoryEntry>>,
    pub internal_state: StateCell<InternalState>,
    pub input_is_active: StateCell<bool>,
    /// Bumped by every [`ConversationStore::clear`]
    pub run: StateCell<u64>,
}

impl ConversationStore {
    pub fn new(active_key: impl Into<String>) -> Self {
        Self {
            active_key: StateCell::new(active_key.into()),
            messages: StateCell::new(Vec::new()),
            history: StateCell::new(Vec::new()),
            internal_state: StateCell::new(InternalState::new()),
            input_is_active: StateCell::new(false),
            run: StateCell::new(0),
        }
    }

    /// Copy of the whole state at this instant
    pub fn snapshot(&self, initial_step_key: &str) -> ConversationSnapshot {
        ConversationSnapshot {
            active_key: self.active_key.get(),
            initial_step_key: initial_step_key.to_string(),
            messages: self.messages.get(),
            history: self.history.get(),
            internal_state: self.internal_state.get(),
            input_is_active: self.input_is_active.get(),
            run: self.run.get(),
        }
    }

    /// Empty the ledgers and the internal state
    pub fn clear(&self) {
        self.history.set(Vec::new());
        self.messages.set(Vec::new());
        self.internal_state.set(InternalState::new());
        self.run.update(|run| run + 1);
    }
}

/// Point-in-time view of a conversation, handed to widgets and `on_end`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    pub active_key: String,
    pub initial_step_key: String,
    pub messages: Vec<Message>,
    #[serde(rename = "appHistory")]
    pub history: Vec<HistoryEntry>,
    pub internal_state: InternalState,
    pub input_is_active: bool,
    /// Restarts since the store was created
    pub run: u64,
}

impl ConversationSnapshot {
    /// Plain values every widget sees underneath its step data
    pub fn base_props(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("activeKey".into(), Value::String(self.active_key.clone()));
        props.insert(
            "initialStepKey".into(),
            Value::String(self.initial_step_key.clone()),
        );
        props.insert(
            "internalState".into(),
            Value::Object(self.internal_state.clone()),
        );
        props.insert("inputIsActive".into(), Value::Bool(self.input_is_active));
        props
    }
}
