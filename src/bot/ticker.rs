use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant},
};
use tracing::debug;

use crate::event::{CoreEvent, EventHost, Payload, TaskSet, Value};

/// Fires `on_timer_tick { timeval }` at a fixed interval.
pub struct Ticker {
    host: Arc<EventHost>,
    tasks: Arc<TaskSet>,
    tick_interval: Duration,
    running: Arc<AtomicBool>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Ticker {
    pub fn new(host: Arc<EventHost>, tasks: Arc<TaskSet>, tick_interval: Duration) -> Self {
        Self {
            host,
            tasks,
            tick_interval,
            running: Arc::new(AtomicBool::new(false)),
            task_handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// No-op when the interval is zero or the ticker already runs.
    pub fn start(&self) {
        if self.tick_interval.is_zero() {
            debug!("Ticker disabled");
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Ticker started: {:?}", self.tick_interval);

        let host = self.host.clone();
        let tasks = self.tasks.clone();
        let running = self.running.clone();
        let period = self.tick_interval;
        let handle = tokio::spawn(async move {
            let mut interval_timer = interval_at(Instant::now() + period, period);
            while running.load(Ordering::SeqCst) {
                interval_timer.tick().await;
                match host.fire_quietly(CoreEvent::OnTimerTick.name(), tick_payload()) {
                    Ok(handles) => tasks.track(handles),
                    Err(e) => debug!("Tick not dispatched: {}", e),
                }
            }
        });
        *self
            .task_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let handle = self
            .task_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            debug!("Ticker stopping");
            handle.abort();
        }
    }
}

fn tick_payload() -> Payload {
    let timeval = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default();
    let mut payload = Payload::new();
    payload.insert("timeval".to_string(), Value::Float(timeval));
    payload
}
