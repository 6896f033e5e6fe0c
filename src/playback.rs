//! Playback transport.
//!
//! The transport moves the shared cursor through the ordered dates of the
//! current range. Steps wrap in both directions. With no dates at all every
//! command is a no-op and the transport stays paused.
//!
//! [`PlaybackTimer`] (feature `playback`) drives `Next` on a fixed interval while
//! the store says it is playing.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::query::QueryStore;

#[cfg(feature = "playback")]
use {
    crate::pages::Page,
    crate::query::QueryHandle,
    crate::{DashboardError, Result},
    log::info,
    std::sync::Arc,
    std::time::Duration,
    tokio::task::JoinHandle,
};

/// Whether the play head is advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Paused,
    Playing,
}

impl From<bool> for PlaybackState {
    fn from(is_playing: bool) -> Self {
        if is_playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }
}

/// Transport buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportCommand {
    Beginning,
    Previous,
    PlayPause,
    Next,
    End,
}

fn position<S: AsRef<str>>(dates: &[S], current: Option<&str>) -> Option<usize> {
    let current = current?;
    dates.iter().position(|d| d.as_ref() == current)
}

/// Date after `current`, wrapping to the first. A cursor that is not in
/// the list counts as sitting before the first date.
pub fn next_date<S: AsRef<str>>(dates: &[S], current: Option<&str>) -> Option<String> {
    if dates.is_empty() {
        return None;
    }
    let next = match position(dates, current) {
        Some(i) => (i + 1) % dates.len(),
        None => 0,
    };
    Some(dates[next].as_ref().to_string())
}

/// Date before `current`, wrapping to the last. A cursor that is not in
/// the list sits one before the first date, so it steps to the
/// second-to-last (the only date when there is one).
pub fn previous_date<S: AsRef<str>>(dates: &[S], current: Option<&str>) -> Option<String> {
    if dates.is_empty() {
        return None;
    }
    let len = dates.len();
    let previous = match position(dates, current) {
        Some(i) => (i + len - 1) % len,
        None => (len + len - 2) % len,
    };
    Some(dates[previous].as_ref().to_string())
}

/// Apply a transport command to the store and return the resulting state.
pub fn apply<S: AsRef<str>>(
    command: TransportCommand,
    dates: &[S],
    store: &mut QueryStore,
) -> PlaybackState {
    if dates.is_empty() {
        store.current_timestep = None;
        store.is_playing = false;
        return PlaybackState::Paused;
    }

    match command {
        TransportCommand::Beginning => {
            store.update_current_timestep(Some(dates[0].as_ref().to_string()));
        }
        TransportCommand::End => {
            store.update_current_timestep(Some(dates[dates.len() - 1].as_ref().to_string()));
        }
        TransportCommand::Previous => {
            store.update_current_timestep_with(|prev| previous_date(dates, prev));
        }
        TransportCommand::Next => {
            store.update_current_timestep_with(|prev| next_date(dates, prev));
        }
        TransportCommand::PlayPause => store.toggle_playback(),
    }

    debug!(
        "[Transport] {:?} -> {:?} ({})",
        command,
        store.current_timestep,
        if store.is_playing { "playing" } else { "paused" }
    );

    PlaybackState::from(store.is_playing)
}

// ============================================================================
// Interval timer
// ============================================================================

/// Background ticker that applies `Next` while the store is playing.
///
/// One timer per page. Starting it again replaces the running task;
/// [`PlaybackTimer::stop`] or dropping the timer cancels it. The task ends
/// on its own once the store stops playing.
#[cfg(feature = "playback")]
pub struct PlaybackTimer {
    page: Page,
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

#[cfg(feature = "playback")]
impl PlaybackTimer {
    pub fn new(page: Page, interval: Duration) -> Self {
        Self {
            page,
            interval,
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start ticking over `dates`. Must be called inside a Tokio runtime.
    pub fn start(&mut self, store: QueryHandle, dates: Arc<Vec<String>>) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            DashboardError::Internal {
                message: format!("playback timer needs a Tokio runtime: {}", e),
            }
        })?;

        self.stop();

        if self.interval.is_zero() {
            return Err(DashboardError::Config {
                message: format!("playback interval for {} must be positive", self.page.path()),
            });
        }

        info!(
            "[PlaybackTimer] {} ticking every {:?} over {} dates",
            self.page.path(),
            self.interval,
            dates.len()
        );

        let period = self.interval;
        let page = self.page;
        self.task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let playing = store.with(|s| {
                    if !s.is_playing {
                        return false;
                    }
                    apply(TransportCommand::Next, dates.as_slice(), s);
                    s.is_playing
                });
                if !playing {
                    debug!("[PlaybackTimer] {} stopped playing", page.path());
                    break;
                }
            }
        }));

        Ok(())
    }

    /// Cancel the running task, if any.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether a tick task is alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

#[cfg(feature = "playback")]
impl Drop for PlaybackTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
