//! Step player
//!
//! `ChatEngine` owns the conversation store and reacts to every change of the
//! active key: it runs the pure transition, then executes the effects (play
//! a step, notify the end, report a configuration error). Playing a step
//! resolves its widgets, records it in the history ledger and appends the
//! rendered messages. Widgets then run their own behaviour on a task bound to
//! the current run, which a restart cancels.
//!
//! Key changes coalesce: the player acts on the value it observes when it
//! wakes, and a value equal to the last one it acted on is not replayed. A
//! key that is set and replaced before the player wakes is never played.

#[cfg(test)]
mod proptests;

use crate::bus::{EventBus, PendingEvent, FORM_SUBMISSION};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::script::validate;
use crate::state_machine::{transition, Effect, EngineState, Event};
use crate::step::{HistoryEntry, Message, Step, StepMap, RESTARTING};
use crate::store::{ConversationSnapshot, ConversationStore, InternalState};
use crate::surface::RenderingSurface;
use crate::widget::{resolve, Widget, WidgetCatalog, WidgetProps};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Callback invoked with the final snapshot when the conversation reaches `END`
pub type OnEnd = Arc<dyn Fn(&ConversationSnapshot) + Send + Sync>;

/// Everything needed to start a conversation
#[derive(Clone, Default)]
pub struct EngineProps {
    pub steps: StepMap,
    pub widgets: Vec<Arc<dyn Widget>>,
    /// Defaults to the first step of the mapping
    pub initial_step_key: Option<String>,
    pub on_end: Option<OnEnd>,
    pub config: EngineConfig,
}

impl EngineProps {
    pub fn new(steps: StepMap) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_widget(mut self, widget: Arc<dyn Widget>) -> Self {
        self.widgets.push(widget);
        self
    }

    #[must_use]
    pub fn with_widgets(mut self, widgets: impl IntoIterator<Item = Arc<dyn Widget>>) -> Self {
        self.widgets.extend(widgets);
        self
    }

    #[must_use]
    pub fn initial_step(mut self, key: impl Into<String>) -> Self {
        self.initial_step_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn on_end(mut self, on_end: impl Fn(&ConversationSnapshot) + Send + Sync + 'static) -> Self {
        self.on_end = Some(Arc::new(on_end));
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}

/// State machine state plus the last key it acted on
struct Player {
    state: EngineState,
    last_key: Option<String>,
}

struct Inner {
    steps: StepMap,
    catalog: WidgetCatalog,
    initial_step_key: String,
    on_end: Option<OnEnd>,
    config: EngineConfig,
    store: ConversationStore,
    bus: EventBus,
    player: Mutex<Player>,
    /// Held while the ledgers are written, cleared or read as a whole
    ledger: Mutex<()>,
    last_error: Mutex<Option<EngineError>>,
    /// Cancelled and replaced on every restart
    run: Mutex<CancellationToken>,
    surface: Mutex<Option<Arc<dyn RenderingSurface>>>,
}

/// Handle to a running conversation. Cheap to clone; widgets hold one.
#[derive(Clone)]
pub struct ChatEngine {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChatEngine {
    /// Build the engine and start reacting to the active key.
    ///
    /// The initial step is played as soon as the runtime polls the player
    /// task. Must be called from within a Tokio runtime.
    pub fn start(props: EngineProps) -> Self {
        let EngineProps {
            steps,
            widgets,
            initial_step_key,
            on_end,
            config,
        } = props;

        let initial_step_key = initial_step_key
            .or_else(|| steps.keys().next().cloned())
            .unwrap_or_else(|| {
                tracing::error!("Script has no steps, nothing to play");
                RESTARTING.to_string()
            });
        let catalog = WidgetCatalog::new(widgets);

        for issue in validate(&steps, &catalog) {
            tracing::warn!(issue = %issue, "Script validation");
        }

        let engine = Self {
            inner: Arc::new(Inner {
                store: ConversationStore::new(initial_step_key.clone()),
                steps,
                catalog,
                initial_step_key,
                on_end,
                config,
                bus: EventBus::new(),
                player: Mutex::new(Player {
                    state: EngineState::Idle,
                    last_key: None,
                }),
                ledger: Mutex::new(()),
                last_error: Mutex::new(None),
                run: Mutex::new(CancellationToken::new()),
                surface: Mutex::new(None),
            }),
        };

        tracing::info!(
            initial = %engine.inner.initial_step_key,
            steps = engine.inner.steps.len(),
            widgets = ?engine.inner.catalog,
            "Starting step player"
        );

        tokio::spawn(watch_active_key(Arc::downgrade(&engine.inner)));
        engine
    }

    // ==================== State access ====================

    pub fn store(&self) -> &ConversationStore {
        &self.inner.store
    }

    /// Consistent view of the store: never taken halfway through a restart
    pub fn snapshot(&self) -> ConversationSnapshot {
        let _ledger = lock(&self.inner.ledger);
        self.inner.store.snapshot(&self.inner.initial_step_key)
    }

    pub fn state(&self) -> EngineState {
        lock(&self.inner.player).state.clone()
    }

    /// Most recent recoverable error, if any
    pub fn last_error(&self) -> Option<EngineError> {
        lock(&self.inner.last_error).clone()
    }

    pub fn steps(&self) -> &StepMap {
        &self.inner.steps
    }

    pub fn initial_step_key(&self) -> &str {
        &self.inner.initial_step_key
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn active_key(&self) -> String {
        self.inner.store.active_key.get()
    }

    pub fn input_is_active(&self) -> bool {
        self.inner.store.input_is_active.get()
    }

    pub fn internal_state(&self) -> InternalState {
        self.inner.store.internal_state.get()
    }

    // ==================== Setters ====================

    /// Move the conversation. The player reacts asynchronously.
    pub fn set_active_key(&self, key: impl Into<String>) {
        self.inner.store.active_key.set(key.into());
    }

    /// Replace the internal state wholesale
    pub fn set_internal_state(&self, state: InternalState) {
        self.inner.store.internal_state.set(state);
    }

    /// Compute the next internal state from the previous one
    pub fn update_internal_state(&self, f: impl FnOnce(&InternalState) -> InternalState) {
        self.inner.store.internal_state.update(f);
    }

    pub fn set_input_is_active(&self, active: bool) {
        self.inner.store.input_is_active.set(active);
    }

    // ==================== Conversation operations ====================

    /// Play `step` under the current active key.
    ///
    /// The ledgers are updated before this returns; the future completes once
    /// the step's pacing has elapsed, so awaiting several sends in a row
    /// spaces them out.
    pub fn send_message(&self, step: &Step) -> BoxFuture<'static, ()> {
        let run = self.run_token();
        let key = self.active_key();
        let pacing = self.play(&key, step, &run);
        tokio::time::sleep(pacing).boxed()
    }

    /// Remove the most recent message. History is left alone.
    pub fn pop_last_message(&self) -> Option<Message> {
        self.inner.store.messages.pop()
    }

    /// Enable input and suspend until `event` is published once.
    ///
    /// The subscription exists as soon as this returns.
    pub fn wait_for_event(&self, event: &str) -> PendingEvent {
        self.inner.store.input_is_active.set(true);
        self.dispatch(Event::InputRequested {
            event: event.to_string(),
        });
        tracing::debug!(event, "Waiting for event");
        self.inner.bus.once(event)
    }

    /// Wait for the next form submission
    pub fn wait_for_user_response(&self) -> PendingEvent {
        self.wait_for_event(FORM_SUBMISSION)
    }

    /// Called by the rendering surface when the user submits
    pub fn handle_form_submit(&self, payload: Value) {
        self.inner.store.input_is_active.set(false);
        self.publish(FORM_SUBMISSION, payload);
    }

    /// Fire `event` for whoever is waiting on it. Returns how many were.
    pub fn publish(&self, event: &str, payload: Value) -> usize {
        self.dispatch(Event::InputReceived {
            event: event.to_string(),
        });
        self.inner.bus.publish(event, payload)
    }

    /// Start over from the initial step with empty ledgers.
    ///
    /// Widget tasks and pending waits of the current run are cancelled; the
    /// initial step is re-entered after `restart_delay`.
    pub fn restart(&self) {
        let run = {
            let _ledger = lock(&self.inner.ledger);
            let store = &self.inner.store;
            // Key before run: a player holding the new token sees the new key
            store.active_key.set(RESTARTING.to_string());
            let run = self.next_run();
            let dropped = self.inner.bus.clear();
            tracing::info!(cancelled_waits = dropped, "Restarting conversation");

            store.input_is_active.set(false);
            store.clear();
            run
        };
        self.dispatch(Event::key_changed(RESTARTING));

        let engine = self.clone();
        let delay = self.inner.config.restart_delay;
        tokio::spawn(async move {
            tokio::select! {
                () = run.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let initial = engine.initial_step_key().to_string();
                    engine.set_active_key(initial);
                }
            }
        });
    }

    // ==================== Rendering surface ====================

    /// Let `surface` paint the transcript.
    ///
    /// It is painted right away and again whenever the message ledger or the
    /// input flag changes; it is scrolled whenever the number of messages
    /// changes.
    pub fn attach_surface(&self, surface: Arc<dyn RenderingSurface>) {
        *lock(&self.inner.surface) = Some(Arc::clone(&surface));
        tokio::spawn(drive_surface(Arc::downgrade(&self.inner), surface));
    }

    /// Ask the attached surface, if any, to show the newest message
    pub fn scroll_to_bottom(&self) {
        let surface = lock(&self.inner.surface).clone();
        if let Some(surface) = surface {
            surface.scroll_to_bottom();
        }
    }

    // ==================== Internals ====================

    fn run_token(&self) -> CancellationToken {
        lock(&self.inner.run).clone()
    }

    fn next_run(&self) -> CancellationToken {
        let mut run = lock(&self.inner.run);
        run.cancel();
        *run = CancellationToken::new();
        run.clone()
    }

    /// Apply one event to the state machine and run its effects.
    ///
    /// A key change is dropped when it repeats the last key acted on, or
    /// when the active key has already moved past it.
    fn dispatch(&self, event: Event) {
        let (effects, run) = {
            let mut player = lock(&self.inner.player);
            // Token before key: a restart moves the key first
            let run = self.run_token();
            let changed_to = match &event {
                Event::KeyChanged { key } => {
                    if player.last_key.as_deref() == Some(key.as_str()) {
                        tracing::debug!(key = %key, "Active key unchanged");
                        return;
                    }
                    if self.inner.store.active_key.with(|current| current != key) {
                        tracing::debug!(key = %key, "Active key already moved on");
                        return;
                    }
                    Some(key.clone())
                }
                Event::InputRequested { .. } | Event::InputReceived { .. } => None,
            };

            match transition(&player.state, &self.inner.steps, event) {
                Ok(result) => {
                    player.state = result.new_state;
                    if changed_to.is_some() {
                        player.last_key = changed_to;
                    }
                    (result.effects, run)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Event ignored by state machine");
                    return;
                }
            }
        };

        for effect in effects {
            self.execute_effect(effect, &run);
        }
    }

    fn execute_effect(&self, effect: Effect, run: &CancellationToken) {
        match effect {
            Effect::PlayStep { key } => {
                if let Some(step) = self.inner.steps.get(&key) {
                    // Automatic plays do not wait out their pacing
                    let _ = self.play(&key, step, run);
                }
            }
            Effect::NotifyEnd => {
                let snapshot = self.snapshot();
                tracing::info!(
                    messages = snapshot.messages.len(),
                    history = snapshot.history.len(),
                    "Conversation ended"
                );
                if let Some(on_end) = &self.inner.on_end {
                    on_end(&snapshot);
                }
            }
            Effect::ReportError(error) => self.report(error),
        }
    }

    fn report(&self, error: EngineError) {
        tracing::error!(error = %error, "Step player error");
        *lock(&self.inner.last_error) = Some(error);
    }

    /// Record `step` under `key`, render its widgets and start their behaviour.
    /// Returns the step's pacing.
    ///
    /// Every ledger write checks `run` under the ledger lock, so nothing from
    /// a cancelled run lands after a restart has cleared the ledgers.
    fn play(&self, key: &str, step: &Step, run: &CancellationToken) -> Duration {
        let pacing = self.inner.config.pacing(step.delay());
        let snapshot = self.snapshot();
        let resolution = resolve(key, step, &self.inner.catalog, &snapshot);

        {
            let _ledger = lock(&self.inner.ledger);
            if run.is_cancelled() {
                tracing::debug!(key, "Play dropped, run was restarted");
                return pacing;
            }
            self.inner.store.history.push(HistoryEntry {
                step: step.clone(),
                key: key.to_string(),
            });
        }
        if let Some(error) = resolution.error {
            self.report(error);
        }

        for resolved in resolution.widgets {
            let props = WidgetProps {
                chat: self.clone(),
                step_key: key.to_string(),
                values: resolved.props,
            };
            // Rendering runs unlocked; it may call back into the engine
            let body = resolved.widget.render(&props);
            let label = resolved.label;
            {
                let _ledger = lock(&self.inner.ledger);
                if run.is_cancelled() {
                    tracing::debug!(key, widget = %label, "Render dropped, run was restarted");
                    return pacing;
                }
                self.inner.store.messages.push_with(|index| Message {
                    key: format!("msg-{index}"),
                    step_key: key.to_string(),
                    widget: label,
                    body,
                    created_at: Utc::now(),
                });
            }
            Self::activate(resolved.widget, props, run.clone());
        }

        tracing::debug!(key, "Played step");
        pacing
    }

    fn activate(widget: Arc<dyn Widget>, props: WidgetProps, run: CancellationToken) {
        tokio::spawn(async move {
            tokio::select! {
                () = run.cancelled() => {
                    tracing::debug!(widget = %widget.kind(), "Widget cancelled by restart");
                }
                () = widget.activate(props) => {}
            }
        });
    }
}

impl fmt::Debug for ChatEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatEngine")
            .field("initial_step_key", &self.inner.initial_step_key)
            .field("state", &self.state())
            .field("catalog", &self.inner.catalog)
            .finish_non_exhaustive()
    }
}

/// Player loop: one transition per observed active key value.
///
/// Holds only a weak reference so the loop ends once every handle is gone.
async fn watch_active_key(inner: Weak<Inner>) {
    let Some(mut rx) = inner.upgrade().map(|i| i.store.active_key.subscribe()) else {
        return;
    };

    loop {
        let key = rx.borrow_and_update().clone();
        let Some(strong) = inner.upgrade() else {
            break;
        };
        ChatEngine { inner: strong }.dispatch(Event::KeyChanged { key });

        if rx.changed().await.is_err() {
            break;
        }
    }
    tracing::debug!("Step player loop stopped");
}

async fn drive_surface(inner: Weak<Inner>, surface: Arc<dyn RenderingSurface>) {
    let Some((mut messages, mut input)) = inner.upgrade().map(|i| {
        (
            i.store.messages.subscribe(),
            i.store.input_is_active.subscribe(),
        )
    }) else {
        return;
    };

    let mut painted_len = None;
    loop {
        let len = messages.borrow_and_update().len();
        let _ = input.borrow_and_update();
        let Some(strong) = inner.upgrade() else {
            break;
        };
        let engine = ChatEngine { inner: strong };
        surface.paint(&engine.snapshot());
        if painted_len != Some(len) {
            surface.scroll_to_bottom();
            painted_len = Some(len);
        }
        drop(engine);

        tokio::select! {
            changed = messages.changed() => if changed.is_err() { break },
            changed = input.changed() => if changed.is_err() { break },
        }
    }
}
