//! Interactive annotation session.
//!
//! A [`Session`] owns the click list and the action history of one open
//! frame behind a single mutex. Every click after the first starts a
//! background search from the previous click; the search thread attaches
//! its path to the click's action when it finishes. Search threads are
//! chained, each joining its predecessor before it starts, so segments
//! land in click order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cursor_list::{CursorList, Node};
use crate::frame::Frame;
use crate::history::{Action, HistoryTree, Position};
use crate::profile::concat_paths;
use crate::tracer::{LineTracer, TracerKind};
use crate::types::{CancelToken, Coord, CoreError, Path};

/// Parameters for a [`Session`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Strategy connecting consecutive clicks.
    pub tracer: TracerKind,
}

/// Everything the session lock guards.
#[derive(Debug, Default)]
pub struct SessionState {
    clicks: CursorList<Coord>,
    history: HistoryTree<Action>,
    frame: Option<Arc<Frame>>,
}

impl SessionState {
    /// Clicked points; the cursor tracks the history depth.
    #[must_use]
    pub const fn clicks(&self) -> &CursorList<Coord> {
        &self.clicks
    }

    /// Action history, one action per click.
    #[must_use]
    pub const fn history(&self) -> &HistoryTree<Action> {
        &self.history
    }

    /// The open frame.
    #[must_use]
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_deref()
    }

    /// Move the click cursor to match the history depth.
    fn sync_clicks(&mut self) -> Result<(), CoreError> {
        match self.history.depth() {
            0 => self.clicks.init(),
            depth => {
                #[allow(clippy::cast_possible_wrap)]
                self.clicks.goto((depth - 1) as isize)?;
            }
        }
        Ok(())
    }

    fn previous_click(&self) -> Option<Coord> {
        if self.clicks.curr_at_init() {
            return None;
        }
        self.clicks.peek().ok().and_then(|node| node.value().copied())
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<SessionState>,
    in_flight: AtomicUsize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decrements the in-flight counter when a search thread ends, however
/// it ends.
struct InFlight(Arc<Shared>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// One queued search between two consecutive clicks.
struct Job {
    origin: Coord,
    destination: Coord,
    position: Position,
    frame: Arc<Frame>,
    tracer: TracerKind,
    cancel: CancelToken,
    shared: Arc<Shared>,
}

impl Job {
    fn run(self, predecessor: Option<JoinHandle<()>>) {
        let _guard = InFlight(Arc::clone(&self.shared));
        if let Some(handle) = predecessor
            && handle.join().is_err()
        {
            warn!("previous search thread panicked");
        }
        if self.cancel.is_canceled() {
            debug!(origin = %self.origin, destination = %self.destination, "search skipped, canceled");
            return;
        }

        let path = match self
            .tracer
            .trace(self.origin, self.destination, &self.frame, &self.cancel)
        {
            Ok(Some(path)) => path,
            Ok(None) => {
                debug!(origin = %self.origin, destination = %self.destination, "no path");
                return;
            }
            Err(err) => {
                warn!(%err, "search failed");
                return;
            }
        };

        let mut state = self.shared.lock();
        if self.cancel.is_canceled() {
            return;
        }
        let action = Action::click(self.destination).with_path(path.reversed());
        if let Err(err) = state.history.attach_child(self.position, action) {
            warn!(%err, "dropping path for a discarded action");
        }
    }
}

/// Click-driven tracing over one frame with undo and redo.
///
/// Dropping a session cancels outstanding searches and waits for them.
#[derive(Debug)]
pub struct Session {
    shared: Arc<Shared>,
    config: SessionConfig,
    cancel: CancelToken,
    last_worker: Option<JoinHandle<()>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    /// Create a session with no frame open.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            shared: Arc::default(),
            config,
            cancel: CancelToken::new(),
            last_worker: None,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open `frame`, discarding all clicks and history.
    pub fn open(&mut self, frame: Frame) {
        self.cancel();
        let mut state = self.shared.lock();
        info!(width = frame.width(), height = frame.height(), "opening frame");
        state.frame = Some(Arc::new(frame));
        state.clicks.clear();
        state.history.init(Action::default());
    }

    /// Record a click at `coord`.
    ///
    /// If an earlier click precedes it, a search from that click starts
    /// in the background.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if no frame is open or
    /// `coord` lies outside it.
    pub fn click(&mut self, coord: Coord) -> Result<Position, CoreError> {
        let (position, job) = {
            let mut state = self.shared.lock();
            let frame = state
                .frame
                .clone()
                .ok_or_else(|| CoreError::invalid("no frame is open"))?;
            if !coord.within(frame.dimensions()) {
                return Err(CoreError::invalid(format!(
                    "click {coord} is outside the {}x{} frame",
                    frame.width(),
                    frame.height()
                )));
            }

            let previous = state.previous_click();
            state.clicks.push(coord);
            let position = state.history.push(Action::click(coord));
            debug!(%coord, depth = state.history.depth(), "click");

            let job = previous.map(|origin| Job {
                origin,
                destination: coord,
                position,
                frame,
                tracer: self.config.tracer,
                cancel: self.cancel.clone(),
                shared: Arc::clone(&self.shared),
            });
            (position, job)
        };

        if let Some(job) = job {
            self.spawn(job);
        }
        Ok(position)
    }

    fn spawn(&mut self, job: Job) {
        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);
        let predecessor = self.last_worker.take();
        let shared = Arc::clone(&self.shared);
        match thread::Builder::new()
            .name("brightpath-search".to_owned())
            .spawn(move || job.run(predecessor))
        {
            Ok(handle) => self.last_worker = Some(handle),
            Err(err) => {
                // The closure was dropped unrun, so its guard never existed.
                shared.in_flight.fetch_sub(1, Ordering::AcqRel);
                error!(%err, "failed to start search thread");
            }
        }
    }

    /// Cancel every running search. Later clicks search normally.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.cancel = CancelToken::new();
    }

    /// Refuse history moves while a search has yet to land.
    fn ensure_idle(&self) -> Result<(), CoreError> {
        if self.is_searching() {
            debug!("history move refused while searching");
            return Err(CoreError::Underflow);
        }
        Ok(())
    }

    /// Step back one action and return the action now current.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Underflow`] if there is nothing to undo or a
    /// search is still running.
    pub fn undo(&mut self) -> Result<Option<Action>, CoreError> {
        self.ensure_idle()?;
        let mut state = self.shared.lock();
        let action = state.history.undo()?.value().cloned();
        state.sync_clicks()?;
        Ok(action)
    }

    /// Step forward one action and return it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Underflow`] if there is nothing to redo or a
    /// search is still running.
    pub fn redo(&mut self) -> Result<Option<Action>, CoreError> {
        self.ensure_idle()?;
        let mut state = self.shared.lock();
        let action = state.history.redo()?.value().cloned();
        state.sync_clicks()?;
        Ok(action)
    }

    /// Jump to the latest action and return it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Underflow`] if there is nothing to redo or a
    /// search is still running.
    pub fn redo_all(&mut self) -> Result<Option<Action>, CoreError> {
        self.ensure_idle()?;
        let mut state = self.shared.lock();
        let action = state.history.redo_all()?.value().cloned();
        state.sync_clicks()?;
        Ok(action)
    }

    /// Return to the untouched frame, canceling outstanding searches.
    ///
    /// With `remember`, one following [`undo`](Self::undo) restores the
    /// annotations.
    pub fn clear(&mut self, remember: bool) {
        self.cancel();
        let mut state = self.shared.lock();
        state.history.undo_all(remember);
        state.clicks.init();
    }

    /// The traced line from the first click up to the current one.
    ///
    /// Segments whose search has not finished (or found nothing) are
    /// missing from the result.
    #[must_use]
    pub fn traced_line(&self) -> Path {
        let state = self.shared.lock();
        let trail = state.history.trail();
        concat_paths(
            trail
                .iter()
                .filter_map(|node| node.child().and_then(Node::value))
                .filter_map(|action| action.path.as_ref()),
        )
    }

    /// Clicks up to and including the current one.
    #[must_use]
    pub fn clicks(&self) -> Vec<Coord> {
        let state = self.shared.lock();
        let end = state.clicks.cursor_index().map_or(0, |index| index + 1);
        state.clicks.values().take(end).copied().collect()
    }

    /// Returns `true` while any search thread is running.
    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire) > 0
    }

    /// Returns `true` when [`undo`](Self::undo) would succeed.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.is_searching() && self.shared.lock().history.curr_has_prev()
    }

    /// Returns `true` when [`redo`](Self::redo) would succeed.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.is_searching() && self.shared.lock().history.curr_has_next()
    }

    /// Run `f` with the state locked.
    pub fn with_state<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.shared.lock())
    }

    /// Block until every started search has finished.
    pub fn wait(&mut self) {
        if let Some(handle) = self.last_worker.take()
            && handle.join().is_err()
        {
            warn!("search thread panicked");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel();
        self.wait();
    }
}
