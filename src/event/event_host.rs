//! # Event Host
//!
//! The EventHost is the process-wide registry of named events. Each event has
//! a [`Schema`] (the exact set of payload keys it carries) and an ordered list
//! of [`Callback`]s. Firing an event spawns every matching callback as its own
//! tokio task; the firer never waits for them.
//!
//! ## Deferred Binding
//!
//! Events and listeners may appear in either order. A callback subscribed to
//! an event that does not exist yet is parked in a pending bucket and becomes
//! active when the event is created. Destroying an event parks its callbacks
//! again, so they survive a destroy/create cycle:
//!
//! ```text
//!  subscribe ──▶ [pending] ──create──▶ [active] ──destroy──▶ [pending]
//! ```
//!
//! ## Locking
//!
//! A single `RwLock` guards the whole registry (events, callback lists and the
//! pending bucket). `fire` holds the read lock only long enough to snapshot
//! the active list; prefilters, preprocessors and targets run unlocked.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    future::Future,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, instrument, trace};

use super::message::Message;

/// Parameter names starting with this prefix are reserved for the host.
pub const RESERVED_PREFIX: char = '_';

/// Event payload: one value per schema parameter.
pub type Payload = HashMap<String, Value>;

/// A single payload value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Float(f64),
    String(String),
    Message(Message),
}

impl Value {
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Value::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// Statically declared parameter set of an event or a callable.
///
/// Order is kept for display, comparison is set-wise.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    params: Vec<String>,
}

impl Schema {
    pub fn new<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Same parameter names, ignoring order.
    pub fn matches(&self, other: &Schema) -> bool {
        let mine: HashSet<&str> = self.params.iter().map(String::as_str).collect();
        let theirs: HashSet<&str> = other.params.iter().map(String::as_str).collect();
        mine == theirs && self.params.len() == other.params.len()
    }

    fn validate(&self, event: &str) -> EventResult<()> {
        let mut seen = HashSet::new();
        for param in &self.params {
            if param.starts_with(RESERVED_PREFIX) {
                return Err(EventError::Schema {
                    event: event.to_string(),
                    message: format!(
                        "parameter \"{}\" must not start with \"{}\"",
                        param, RESERVED_PREFIX
                    ),
                });
            }
            if !seen.insert(param.as_str()) {
                return Err(EventError::Schema {
                    event: event.to_string(),
                    message: format!("parameter \"{}\" is declared twice", param),
                });
            }
        }
        Ok(())
    }

    /// Returns `(missing, extra)` keys of `payload` relative to this schema.
    fn diff(&self, payload: &Payload) -> (Vec<String>, Vec<String>) {
        let missing = self
            .params
            .iter()
            .filter(|p| !payload.contains_key(p.as_str()))
            .cloned()
            .collect();
        let mut extra: Vec<String> = payload
            .keys()
            .filter(|k| !self.params.contains(k))
            .cloned()
            .collect();
        extra.sort();
        (missing, extra)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.params.join(", "))
    }
}

type TargetFn = dyn Fn(Payload) -> BoxFuture<'static, ()> + Send + Sync;
type PrefilterFn = dyn Fn(&Payload) -> bool + Send + Sync;
type PreprocessorFn = dyn Fn(Payload) -> Payload + Send + Sync;

/// The function a callback ultimately runs, on its own task.
#[derive(Clone)]
pub struct Target {
    schema: Schema,
    func: Arc<TargetFn>,
}

impl Target {
    pub fn new<F, Fut>(schema: Schema, func: F) -> Self
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            schema,
            func: Arc::new(move |payload| Box::pin(func(payload))),
        }
    }
}

/// Gate evaluated in the firer before a target is dispatched.
#[derive(Clone)]
pub struct Prefilter {
    schema: Schema,
    func: Arc<PrefilterFn>,
}

impl Prefilter {
    pub fn new<F>(schema: Schema, func: F) -> Self
    where
        F: Fn(&Payload) -> bool + Send + Sync + 'static,
    {
        Self {
            schema,
            func: Arc::new(func),
        }
    }
}

/// Rewrites a copy of the payload before it reaches the target.
#[derive(Clone)]
pub struct Preprocessor {
    schema: Schema,
    func: Arc<PreprocessorFn>,
}

impl Preprocessor {
    pub fn new<F>(schema: Schema, func: F) -> Self
    where
        F: Fn(Payload) -> Payload + Send + Sync + 'static,
    {
        Self {
            schema,
            func: Arc::new(func),
        }
    }
}

// 関数の同一性はArcのポインタで判定する
impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl PartialEq for Prefilter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl PartialEq for Preprocessor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target{}", self.schema)
    }
}

impl fmt::Debug for Prefilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prefilter{}", self.schema)
    }
}

impl fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Preprocessor{}", self.schema)
    }
}

/// A `(target, prefilter, preprocessor)` triple. Equality is identity of all
/// three parts and is what [`EventHost::unsubscribe`] matches on.
#[derive(Clone, Debug, PartialEq)]
pub struct Callback {
    pub target: Target,
    pub prefilter: Option<Prefilter>,
    pub preprocessor: Option<Preprocessor>,
}

impl Callback {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            prefilter: None,
            preprocessor: None,
        }
    }

    pub fn with_prefilter(mut self, prefilter: Prefilter) -> Self {
        self.prefilter = Some(prefilter);
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    fn check(&self, event: &str, schema: &Schema) -> EventResult<()> {
        let parts = [
            ("target", Some(&self.target.schema)),
            ("prefilter", self.prefilter.as_ref().map(|p| &p.schema)),
            ("preprocessor", self.preprocessor.as_ref().map(|p| &p.schema)),
        ];
        for (part, declared) in parts {
            if let Some(declared) = declared {
                if !declared.matches(schema) {
                    return Err(EventError::Signature {
                        event: event.to_string(),
                        part: part.to_string(),
                        expected: schema.to_string(),
                        got: declared.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

struct EventEntry {
    schema: Schema,
    callbacks: Vec<Callback>,
}

#[derive(Default)]
struct Registry {
    events: HashMap<String, EventEntry>,
    pending: HashMap<String, Vec<Callback>>,
}

/// # EventHost
///
/// Explicitly constructed registry; share it as `Arc<EventHost>` between the
/// host process and every feature that subscribes or fires. Its lifetime is
/// the lifetime of the owning process object.
#[derive(Default)]
pub struct EventHost {
    registry: RwLock<Registry>,
}

impl EventHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `name` with its payload schema and activates any callbacks
    /// that were waiting for it.
    ///
    /// # Errors
    ///
    /// * `EventError::Schema` - a parameter uses the reserved prefix or is repeated
    /// * `EventError::AlreadyExists` - `name` is already registered
    /// * `EventError::Signature` - a pending callback does not fit `schema`;
    ///   the registry is left untouched
    pub fn create(&self, name: &str, schema: Schema) -> EventResult<()> {
        schema.validate(name)?;

        let mut registry = self.write();
        if registry.events.contains_key(name) {
            return Err(EventError::AlreadyExists {
                event: name.to_string(),
            });
        }

        let waiting = registry.pending.get(name).cloned().unwrap_or_default();
        for callback in &waiting {
            callback.check(name, &schema)?;
        }
        registry.pending.remove(name);

        debug!(
            "Event created: {} {} ({} waiting listeners)",
            name,
            schema,
            waiting.len()
        );
        registry.events.insert(
            name.to_string(),
            EventEntry {
                schema,
                callbacks: waiting,
            },
        );
        Ok(())
    }

    /// Removes `name`, parking its callbacks until it is created again.
    /// Unknown names are ignored.
    pub fn destroy(&self, name: &str) {
        let mut registry = self.write();
        if let Some(entry) = registry.events.remove(name) {
            debug!(
                "Event destroyed: {} ({} listeners parked)",
                name,
                entry.callbacks.len()
            );
            registry
                .pending
                .entry(name.to_string())
                .or_default()
                .extend(entry.callbacks);
        }
    }

    /// Appends `callback` to `name`, or parks it when `name` does not exist.
    ///
    /// # Errors
    ///
    /// * `EventError::Signature` - a part of the callback declares a parameter
    ///   set different from the event's schema
    pub fn subscribe(&self, name: &str, callback: Callback) -> EventResult<()> {
        let mut registry = self.write();
        match registry.events.get_mut(name) {
            Some(entry) => {
                callback.check(name, &entry.schema)?;
                debug!("New event listener: {} -> {:?}", name, callback.target);
                entry.callbacks.push(callback);
            }
            None => {
                debug!("Waiting event listener: {} -> {:?}", name, callback.target);
                registry
                    .pending
                    .entry(name.to_string())
                    .or_default()
                    .push(callback);
            }
        }
        Ok(())
    }

    /// Removes the first callback identical to `callback`; absent callbacks
    /// are ignored.
    pub fn unsubscribe(&self, name: &str, callback: &Callback) {
        let mut registry = self.write();
        let Registry { events, pending } = &mut *registry;
        let list = match events.get_mut(name) {
            Some(entry) => Some(&mut entry.callbacks),
            None => pending.get_mut(name),
        };
        if let Some(list) = list {
            if let Some(index) = list.iter().position(|c| c == callback) {
                list.remove(index);
                trace!("Removed event listener: {}", name);
            }
        }
    }

    /// Dispatches every matching callback of `name` on its own task.
    ///
    /// For each active callback, in registration order: the prefilter (if any)
    /// gates it, the preprocessor (if any) rewrites a copy of `payload`, and
    /// the target is spawned with the result. The returned handles let the
    /// caller track outstanding work.
    ///
    /// # Errors
    ///
    /// * `EventError::UnknownEvent` - `name` is not registered
    /// * `EventError::PayloadMismatch` - payload keys differ from the schema
    /// * `EventError::RuntimeUnavailable` - called outside a tokio runtime
    #[instrument(level = "debug", skip(self, payload))]
    pub fn fire(&self, name: &str, payload: Payload) -> EventResult<Vec<JoinHandle<()>>> {
        self.dispatch(name, payload, false)
    }

    /// Same as [`EventHost::fire`] but only logs at trace level, for
    /// high-frequency events such as timer ticks.
    pub fn fire_quietly(&self, name: &str, payload: Payload) -> EventResult<Vec<JoinHandle<()>>> {
        self.dispatch(name, payload, true)
    }

    fn dispatch(
        &self,
        name: &str,
        payload: Payload,
        quiet: bool,
    ) -> EventResult<Vec<JoinHandle<()>>> {
        let callbacks = {
            let registry = self.read();
            let entry = registry
                .events
                .get(name)
                .ok_or_else(|| EventError::UnknownEvent {
                    event: name.to_string(),
                })?;

            let (missing, extra) = entry.schema.diff(&payload);
            if !missing.is_empty() || !extra.is_empty() {
                return Err(EventError::PayloadMismatch {
                    event: name.to_string(),
                    missing,
                    extra,
                });
            }
            entry.callbacks.clone()
        };

        if quiet {
            trace!("Firing event: {} ({} listeners)", name, callbacks.len());
        } else {
            debug!("Firing event: {} ({} listeners)", name, callbacks.len());
        }

        let runtime = Handle::try_current().map_err(|e| EventError::RuntimeUnavailable {
            event: name.to_string(),
            message: e.to_string(),
        })?;

        let mut handles = Vec::with_capacity(callbacks.len());
        for callback in callbacks {
            if let Some(prefilter) = &callback.prefilter {
                if !(prefilter.func)(&payload) {
                    continue;
                }
            }
            let mut args = payload.clone();
            if let Some(preprocessor) = &callback.preprocessor {
                args = (preprocessor.func)(args);
            }
            handles.push(runtime.spawn((callback.target.func)(args)));
        }
        Ok(handles)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().events.contains_key(name)
    }

    pub fn schema(&self, name: &str) -> Option<Schema> {
        self.read().events.get(name).map(|entry| entry.schema.clone())
    }

    /// Number of active callbacks on `name`.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.read()
            .events
            .get(name)
            .map_or(0, |entry| entry.callbacks.len())
    }

    /// Number of callbacks parked for `name`.
    pub fn pending_count(&self, name: &str) -> usize {
        self.read().pending.get(name).map_or(0, Vec::len)
    }

    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().events.keys().cloned().collect();
        names.sort();
        names
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventError {
    #[error("No such event \"{event}\"")]
    UnknownEvent { event: String },

    #[error("fire({event}) error: missing keyword arguments {missing:?}, superfluous keyword arguments {extra:?}")]
    PayloadMismatch {
        event: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("Event handler {part} parameter mismatch on \"{event}\": expected {expected}, got {got}")]
    Signature {
        event: String,
        part: String,
        expected: String,
        got: String,
    },

    #[error("Invalid schema for event \"{event}\": {message}")]
    Schema { event: String, message: String },

    #[error("Event already registered: {event}")]
    AlreadyExists { event: String },

    #[error("Cannot dispatch \"{event}\" outside a tokio runtime: {message}")]
    RuntimeUnavailable { event: String, message: String },
}

pub type EventResult<T> = Result<T, EventError>;
