//! Per-file debounce timers.
//!
//! Each path has at most one pending timer. A new event for the same path
//! aborts the pending timer and starts a fresh one, so a burst of saves
//! results in a single action once the file has been quiet for the
//! debounce duration.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::AbortHandle;

struct Pending {
    generation: u64,
    timer: AbortHandle,
}

#[derive(Default)]
struct State {
    closed: bool,
    next_generation: u64,
    pending: HashMap<PathBuf, Pending>,
}

/// Debounces actions per path.
///
/// Must be used from within a tokio runtime.
pub(crate) struct Debouncer<A> {
    delay: Duration,
    action: A,
    state: Mutex<State>,
}

impl<A, Fut> Debouncer<A>
where
    A: Fn(PathBuf) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    pub fn new(delay: Duration, action: A) -> Arc<Self> {
        Arc::new(Self {
            delay,
            action,
            state: Mutex::new(State::default()),
        })
    }

    /// (Re)start the timer for `path`. Returns `false` once closed.
    pub fn schedule(self: &Arc<Self>, path: PathBuf) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return false;
        }

        if let Some(previous) = state.pending.remove(&path) {
            previous.timer.abort();
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        let this = Arc::clone(self);
        let timer_path = path.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(this.delay).await;
            if this.take_if_current(&timer_path, generation) {
                (this.action)(timer_path).await;
            }
        })
        .abort_handle();

        state.pending.insert(path, Pending { generation, timer });
        true
    }

    /// Remove the pending entry if it still belongs to this timer and the
    /// debouncer is open. Checked under the same lock `close` takes.
    fn take_if_current(&self, path: &PathBuf, generation: u64) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return false;
        }
        match state.pending.get(path) {
            Some(pending) if pending.generation == generation => {
                state.pending.remove(path);
                true
            }
            _ => false,
        }
    }

    /// Abort every pending timer and refuse new ones.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        for (_, pending) in state.pending.drain() {
            pending.timer.abort();
        }
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }
}
