use std::sync::{Mutex, PoisonError};

use tokio::task::JoinHandle;

/// Join handles of dispatched callbacks that may still be running.
#[derive(Default)]
pub struct TaskSet {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskSet {
    pub fn track(&self, handles: Vec<JoinHandle<()>>) {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(handles);
    }

    /// Forgets finished tasks and returns how many are still running.
    pub fn prune(&self) -> usize {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.retain(|handle| !handle.is_finished());
        handles.len()
    }

    pub(crate) fn drain(&self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
