//! Deadline timers backed by spawned Tokio tasks.
//!
//! One task per `(session, kind)`. Re-arming with a new deadline aborts the
//! old task; re-arming with the same deadline is a no-op.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, instrument, trace, warn};

use crate::games::ludo::SessionId;

/// Which session clock a timer tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum TimerKind {
    /// Current turn deadline.
    Turn,
    /// Whole-session deadline.
    Session,
    /// Earliest disconnect deadline.
    Disconnect,
}

#[derive(Debug)]
struct Armed {
    deadline: Instant,
    handle: JoinHandle<()>,
}

/// Timer tasks keyed by session and kind.
#[derive(Debug, Default)]
pub struct TimerArena {
    timers: Mutex<HashMap<(SessionId, TimerKind), Armed>>,
}

impl TimerArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the armed timer match `deadline`.
    ///
    /// `None` disarms. `on_fire` runs on the Tokio runtime once the deadline
    /// passes. Without a runtime nothing is armed and deadlines are only
    /// applied when the next action arrives.
    #[instrument(skip(self, on_fire), fields(session_id = %session_id, kind = %kind))]
    pub fn sync<F>(&self, session_id: &str, kind: TimerKind, deadline: Option<Instant>, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let key = (session_id.to_string(), kind);
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(armed) = timers.get(&key) {
            if Some(armed.deadline) == deadline && !armed.handle.is_finished() {
                trace!("Timer unchanged");
                return;
            }
        }
        if let Some(old) = timers.remove(&key) {
            old.handle.abort();
            trace!("Old timer aborted");
        }

        let Some(deadline) = deadline else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No Tokio runtime, timer not armed");
            return;
        };
        let handle = runtime.spawn(async move {
            sleep_until(deadline).await;
            on_fire();
        });
        debug!("Timer armed");
        timers.insert(key, Armed { deadline, handle });
    }

    /// Deadline currently armed for a key.
    pub fn armed(&self, session_id: &str, kind: TimerKind) -> Option<Instant> {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(session_id.to_string(), kind))
            .filter(|armed| !armed.handle.is_finished())
            .map(|armed| armed.deadline)
    }

    /// Aborts every timer of a session.
    #[instrument(skip(self))]
    pub fn cancel_session(&self, session_id: &str) {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        timers.retain(|(id, _), armed| {
            if id == session_id {
                armed.handle.abort();
                false
            } else {
                true
            }
        });
        debug!("Session timers cancelled");
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if no timers are armed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for TimerArena {
    fn drop(&mut self) {
        let timers = self.timers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, armed) in timers.drain() {
            armed.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_deadline() {
        let arena = TimerArena::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let deadline = Instant::now() + Duration::from_secs(5);
        arena.sync("s", TimerKind::Turn, Some(deadline), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(arena.armed("s", TimerKind::Turn), Some(deadline));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_old_deadline() {
        let arena = TimerArena::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&fired);
        arena.sync("s", TimerKind::Turn, Some(Instant::now() + Duration::from_secs(1)), move || {
            first.fetch_add(1, Ordering::SeqCst);
        });
        let second = Arc::clone(&fired);
        arena.sync("s", TimerKind::Turn, Some(Instant::now() + Duration::from_secs(10)), move || {
            second.fetch_add(10, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_session_disarms_everything() {
        let arena = TimerArena::new();
        let deadline = Instant::now() + Duration::from_secs(1);
        arena.sync("a", TimerKind::Turn, Some(deadline), || {});
        arena.sync("a", TimerKind::Session, Some(deadline), || {});
        arena.sync("b", TimerKind::Turn, Some(deadline), || {});
        arena.cancel_session("a");
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.armed("a", TimerKind::Turn), None);
    }

    #[test]
    fn without_runtime_nothing_is_armed() {
        let arena = TimerArena::new();
        arena.sync("s", TimerKind::Turn, Some(Instant::now()), || {});
        assert!(arena.is_empty());
    }
}
