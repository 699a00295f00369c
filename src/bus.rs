//! One-shot event bus
//!
//! Subscribers register for the *next* publish of an event name and are
//! dropped once it fires. Nothing is queued: a publish with no subscriber is
//! lost.

use crate::error::EngineError;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Event published when the user submits the input form
pub const FORM_SUBMISSION: &str = "form_submission";

/// What a subscriber receives
#[derive(Debug, Clone, PartialEq)]
pub struct BusEvent {
    pub name: String,
    pub data: Value,
}

type Handler = Box<dyn FnOnce(&BusEvent) + Send>;

/// Publish/subscribe primitive with one-shot subscriptions keyed by name
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<String, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for the next publish of `name`.
    pub fn subscribe_once(&self, name: &str, handler: impl FnOnce(&BusEvent) + Send + 'static) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .push(Box::new(handler));
    }

    /// Subscribe to the next publish of `name` and get its payload as a future.
    ///
    /// The subscription is registered immediately, not when the future is
    /// first polled, so a publish that happens before the first `.await` is
    /// still delivered.
    pub fn once(&self, name: &str) -> PendingEvent {
        let (tx, rx) = oneshot::channel();
        self.subscribe_once(name, move |event| {
            // Waiter may have been dropped; nothing to deliver to then.
            let _ = tx.send(event.data.clone());
        });
        PendingEvent {
            event: name.to_string(),
            rx,
        }
    }

    /// Fire every current subscriber of `name` with `payload`, then forget them.
    ///
    /// Returns how many subscribers were notified.
    pub fn publish(&self, name: &str, payload: Value) -> usize {
        // Take the handlers out before calling them so a handler may
        // re-subscribe for the next publish.
        let handlers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .unwrap_or_default();

        let event = BusEvent {
            name: name.to_string(),
            data: payload,
        };
        let fired = handlers.len();
        for handler in handlers {
            handler(&event);
        }
        tracing::debug!(event = %name, subscribers = fired, "Published bus event");
        fired
    }

    /// Number of subscribers waiting on `name`
    pub fn pending(&self, name: &str) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map_or(0, Vec::len)
    }

    /// Drop every pending subscription. Futures from [`EventBus::once`]
    /// resolve with [`EngineError::WaitCancelled`].
    pub fn clear(&self) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let dropped = subscribers.values().map(Vec::len).sum();
        subscribers.clear();
        dropped
    }
}

/// Payload of a single future publish
#[derive(Debug)]
pub struct PendingEvent {
    event: String,
    rx: oneshot::Receiver<Value>,
}

impl PendingEvent {
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl Future for PendingEvent {
    type Output = Result<Value, EngineError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.map_err(|_| EngineError::WaitCancelled {
                event: self.event.clone(),
            })
        })
    }
}
