//! State reconciliation between periodic refreshes and user edits.
//!
//! Two update paths race for the same [`SystemState`]:
//!
//! ```text
//! timer tick ──> fetch_state ──────────────┐
//!                                          ├──> Reconciler ──> RenderSink
//! ParameterChanged ──> submit_state(form) ─┘
//! ```
//!
//! The rule that keeps them from clobbering each other: a fetch is only
//! issued, and its result only applied, when the tick that triggered it was
//! scheduled at least one suppression window after the latest local edit.
//! Submit responses always apply. Among applied responses the last to arrive
//! wins, and every one replaces the state wholesale.
//!
//! [`Reconciler`] is the bare state machine with time passed in explicitly.
//! [`ReconciliationLoop`] drives it on a single-threaded `LocalSet`: network
//! calls run as local tasks and report back over a channel, so a slow request
//! never blocks ticks or edits, and nothing is ever cancelled.

use std::rc::Rc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::LocalSet;
use tokio::time::{Instant, MissedTickBehavior};

use crate::client::StateService;
use crate::error::NetworkError;
use crate::state::{FormValues, SystemState};
use crate::view::RenderSink;

/// Whether a local edit is waiting for its submit round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    EditPending,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::EditPending => write!(f, "edit pending"),
        }
    }
}

/// Messages from the front end to the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    /// The user changed a control; carries the whole form.
    ParameterChanged(FormValues),
    Shutdown,
}

/// Counters and last error, published after every reaction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoopStatus {
    pub phase: Phase,
    pub fetches_applied: u64,
    pub submits_applied: u64,
    pub ticks_suppressed: u64,
    pub stale_fetches: u64,
    pub failures: u64,
    pub last_error: Option<String>,
}

/// What happened to a response handed to the [`Reconciler`].
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The state was replaced; render it.
    Replaced,
    /// A fetch overtaken by a local edit; dropped.
    Stale,
    /// The request failed; the previous state stays.
    Failed(NetworkError),
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Owns the authoritative state and decides which responses may replace it.
#[derive(Debug, Clone)]
pub struct Reconciler {
    state: SystemState,
    window: Duration,
    last_edit: Option<Instant>,
    in_flight_submits: usize,
    status: LoopStatus,
}

impl Reconciler {
    /// `window` is the suppression window, normally the polling interval.
    pub fn new(window: Duration) -> Self {
        Self {
            state: SystemState::default(),
            window,
            last_edit: None,
            in_flight_submits: 0,
            status: LoopStatus::default(),
        }
    }

    pub fn state(&self) -> &SystemState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.status.phase
    }

    pub fn status(&self) -> &LoopStatus {
        &self.status
    }

    pub fn last_edit(&self) -> Option<Instant> {
        self.last_edit
    }

    pub fn in_flight_submits(&self) -> usize {
        self.in_flight_submits
    }

    /// True if a tick scheduled at `tick_at` falls inside the window of the
    /// latest local edit (or before that edit).
    pub fn is_suppressed(&self, tick_at: Instant) -> bool {
        self.last_edit
            .is_some_and(|edit| tick_at < edit + self.window)
    }

    /// Gate for a timer tick. Counts the tick when it is skipped.
    pub fn should_fetch(&mut self, tick_at: Instant) -> bool {
        if self.is_suppressed(tick_at) {
            self.status.ticks_suppressed += 1;
            false
        } else {
            true
        }
    }

    /// Record a local edit at `now` and enter [`Phase::EditPending`].
    pub fn begin_edit(&mut self, now: Instant) {
        self.last_edit = Some(self.last_edit.map_or(now, |prev| prev.max(now)));
        self.in_flight_submits += 1;
        self.status.phase = Phase::EditPending;
    }

    /// Handle the result of a fetch issued by the tick scheduled at `issued_at`.
    pub fn apply_fetch(
        &mut self,
        issued_at: Instant,
        result: Result<SystemState, NetworkError>,
    ) -> Applied {
        match result {
            Err(err) => self.fail(err),
            Ok(_) if self.is_suppressed(issued_at) => {
                self.status.stale_fetches += 1;
                Applied::Stale
            }
            Ok(state) => {
                self.status.fetches_applied += 1;
                self.replace(state)
            }
        }
    }

    /// Handle the result of a submit. Leaves [`Phase::EditPending`] once no
    /// submit is outstanding, whether or not this one succeeded.
    pub fn apply_submit(&mut self, result: Result<SystemState, NetworkError>) -> Applied {
        self.in_flight_submits = self.in_flight_submits.saturating_sub(1);
        if self.in_flight_submits == 0 {
            self.status.phase = Phase::Idle;
        }
        match result {
            Err(err) => self.fail(err),
            Ok(state) => {
                self.status.submits_applied += 1;
                self.replace(state)
            }
        }
    }

    fn replace(&mut self, state: SystemState) -> Applied {
        self.state = state;
        self.status.last_error = None;
        Applied::Replaced
    }

    fn fail(&mut self, err: NetworkError) -> Applied {
        self.status.failures += 1;
        self.status.last_error = Some(err.to_string());
        Applied::Failed(err)
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Completed network call, reported back to the loop.
enum Outcome {
    Fetched {
        issued_at: Instant,
        result: Result<SystemState, NetworkError>,
    },
    Submitted {
        result: Result<SystemState, NetworkError>,
    },
}

/// Channel the front end uses to reach a [`ReconciliationLoop`].
pub fn event_channel() -> (UnboundedSender<PanelEvent>, UnboundedReceiver<PanelEvent>) {
    mpsc::unbounded_channel()
}

/// Runs the [`Reconciler`] against a [`StateService`] and a [`RenderSink`].
pub struct ReconciliationLoop<C, S> {
    client: Rc<C>,
    sink: S,
    reconciler: Reconciler,
    interval: Duration,
}

impl<C, S> ReconciliationLoop<C, S>
where
    C: StateService + 'static,
    S: RenderSink,
{
    /// `interval` is both the tick period and the suppression window.
    pub fn new(client: C, sink: S, interval: Duration) -> Self {
        Self {
            client: Rc::new(client),
            sink,
            reconciler: Reconciler::new(interval),
            interval,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Run until [`PanelEvent::Shutdown`] arrives or every sender is dropped.
    ///
    /// The first tick fires immediately and performs the initial load.
    /// Requests still in flight at shutdown are dropped. Returns the loop so
    /// callers can inspect the final state.
    pub async fn run(self, events: UnboundedReceiver<PanelEvent>) -> Self {
        LocalSet::new().run_until(self.drive(events)).await
    }

    async fn drive(mut self, mut events: UnboundedReceiver<PanelEvent>) -> Self {
        let (outcome_tx, mut outcomes) = mpsc::unbounded_channel::<Outcome>();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "reconciliation loop started (interval {} ms)",
            self.interval.as_millis()
        );

        loop {
            tokio::select! {
                biased;

                event = events.recv() => match event {
                    Some(PanelEvent::ParameterChanged(form)) => self.on_edit(form, &outcome_tx),
                    Some(PanelEvent::Shutdown) | None => break,
                },
                Some(outcome) = outcomes.recv() => self.on_outcome(outcome),
                tick_at = ticker.tick() => self.on_tick(tick_at, &outcome_tx),
            }
            self.sink.status(self.reconciler.status());
        }

        info!("reconciliation loop stopped");
        self
    }

    fn on_tick(&mut self, tick_at: Instant, outcomes: &UnboundedSender<Outcome>) {
        if !self.reconciler.should_fetch(tick_at) {
            debug!("tick skipped: local edit is fresher than the refresh window");
            return;
        }
        let client = Rc::clone(&self.client);
        let tx = outcomes.clone();
        tokio::task::spawn_local(async move {
            let result = client.fetch_state().await;
            let _ = tx.send(Outcome::Fetched {
                issued_at: tick_at,
                result,
            });
        });
    }

    fn on_edit(&mut self, form: FormValues, outcomes: &UnboundedSender<Outcome>) {
        self.reconciler.begin_edit(Instant::now());
        debug!("submitting form: {}", form.to_json());
        let client = Rc::clone(&self.client);
        let tx = outcomes.clone();
        tokio::task::spawn_local(async move {
            let result = client.submit_state(&form).await;
            let _ = tx.send(Outcome::Submitted { result });
        });
    }

    fn on_outcome(&mut self, outcome: Outcome) {
        let (what, applied) = match outcome {
            Outcome::Fetched { issued_at, result } => {
                ("fetch", self.reconciler.apply_fetch(issued_at, result))
            }
            Outcome::Submitted { result } => ("submit", self.reconciler.apply_submit(result)),
        };
        match applied {
            Applied::Replaced => self.sink.render(self.reconciler.state()),
            Applied::Stale => debug!("{what} result dropped: overtaken by a local edit"),
            Applied::Failed(err) => {
                warn!("{what} failed ({}): {err}", err.kind());
                if let Some(payload) = err.payload() {
                    debug!("{what} response payload: {payload}");
                }
                // Widgets still hold the refused edit; put back the last good state.
                if what == "submit" && !self.reconciler.state().is_empty() {
                    self.sink.render(self.reconciler.state());
                }
            }
        }
    }
}
