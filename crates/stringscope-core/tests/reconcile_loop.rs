//! End-to-end tests of the reconciliation loop against a scripted service.
//!
//! Time is paused, so every sleep below advances the clock exactly and ticks
//! land at 0, 2000, 4000 ms ...

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use stringscope_core::{
    Compactification, FormValues, NetworkError, PanelEvent, Phase, ReconciliationLoop,
    SharedView, StateService, SystemState, WidgetValue, event_channel,
};
use tokio::time::sleep;

const INTERVAL: Duration = Duration::from_millis(2000);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn state(coupling: f64, spectrum: &[f64]) -> SystemState {
    SystemState {
        parameters: BTreeMap::from([
            ("dimensions".to_string(), 10.0),
            ("tension".to_string(), 1.0),
            ("coupling".to_string(), coupling),
            ("alpha_prime".to_string(), 1.0),
        ]),
        compactification: Compactification {
            topology: "Calabi-Yau".into(),
            radius: vec![],
        },
        mass_spectrum: spectrum.to_vec(),
        timestamp: None,
    }
}

/// Behaves like the real service: submits change what later fetches return.
#[derive(Default)]
struct Inner {
    current: RefCell<Option<SystemState>>,
    fetch_delay: Cell<Duration>,
    submit_delay: Cell<Duration>,
    fail_fetches: Cell<u32>,
    reject_submits: Cell<bool>,
    fetches: Cell<u32>,
    submitted: RefCell<Vec<FormValues>>,
}

#[derive(Clone, Default)]
struct Scripted(Rc<Inner>);

impl Scripted {
    fn serving(initial: SystemState) -> Self {
        let service = Self::default();
        *service.0.current.borrow_mut() = Some(initial);
        service
    }

    fn fetches(&self) -> u32 {
        self.0.fetches.get()
    }

    fn submitted(&self) -> Vec<FormValues> {
        self.0.submitted.borrow().clone()
    }
}

impl StateService for Scripted {
    async fn fetch_state(&self) -> Result<SystemState, NetworkError> {
        self.0.fetches.set(self.0.fetches.get() + 1);
        // Snapshot at request time, as a server would.
        let snapshot = self.0.current.borrow().clone();
        sleep(self.0.fetch_delay.get()).await;
        if self.0.fail_fetches.get() > 0 {
            self.0.fail_fetches.set(self.0.fail_fetches.get() - 1);
            return Err(NetworkError::NetworkFailure("connection refused".into()));
        }
        snapshot.ok_or_else(|| NetworkError::malformed("no state", ""))
    }

    async fn submit_state(&self, form: &FormValues) -> Result<SystemState, NetworkError> {
        self.0.submitted.borrow_mut().push(form.clone());
        sleep(self.0.submit_delay.get()).await;
        if self.0.reject_submits.get() {
            return Err(NetworkError::ApplicationError {
                http_status: Some(400),
                payload: r#"{"status":"error","detail":"rejected"}"#.into(),
            });
        }
        let coupling = form.get("coupling").unwrap_or(0.1);
        let next = state(coupling, &[0.0, coupling * 2.0]);
        *self.0.current.borrow_mut() = Some(next.clone());
        Ok(next)
    }
}

fn coupling_widget(view: &SharedView) -> Option<f64> {
    match view.lock().widget("coupling") {
        Some(WidgetValue::Number(v)) => Some(*v),
        _ => None,
    }
}

fn edit_coupling(view: &SharedView, value: f64) -> PanelEvent {
    let mut panel = view.lock();
    assert!(panel.set_number("coupling", value));
    PanelEvent::ParameterChanged(panel.form_values())
}

#[tokio::test(start_paused = true)]
async fn first_tick_loads_initial_state() {
    let service = Scripted::serving(state(0.1, &[0.0, 1.0, 1.41, 1.73]));
    let view = SharedView::default();
    let (tx, rx) = event_channel();
    let driver = ReconciliationLoop::new(service.clone(), view.clone(), INTERVAL);

    let script = async {
        sleep(ms(10)).await;
        let panel = view.snapshot();
        assert_eq!(panel.render_count(), 1);
        assert_eq!(panel.spectrum().len(), 4);
        assert_eq!(panel.degeneracy().values().collect::<Vec<_>>(), vec![1.0, 2.0, 8.0, 24.0]);
        assert!(panel.topology_description().is_some());
        tx.send(PanelEvent::Shutdown).unwrap();
    };

    let (driver, ()) = tokio::join!(driver.run(rx), script);
    assert_eq!(service.fetches(), 1);
    assert_eq!(driver.reconciler().state().mass_spectrum.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn edit_suppresses_refresh_until_submit_returns() {
    let service = Scripted::serving(state(0.1, &[0.0, 1.0]));
    service.0.submit_delay.set(ms(1500));
    let view = SharedView::default();
    let (tx, rx) = event_channel();
    let driver = ReconciliationLoop::new(service.clone(), view.clone(), INTERVAL);

    let script = async {
        sleep(ms(1000)).await;
        assert_eq!(coupling_widget(&view), Some(0.1));

        // Edit at t=1000; the tick at t=2000 is inside the window.
        tx.send(edit_coupling(&view, 0.05)).unwrap();
        sleep(ms(1100)).await;
        assert_eq!(service.fetches(), 1);
        assert_eq!(coupling_widget(&view), Some(0.05));
        assert_eq!(view.lock().loop_status().phase, Phase::EditPending);
        assert_eq!(view.lock().loop_status().ticks_suppressed, 1);

        // Submit answers at t=2500.
        sleep(ms(500)).await;
        let panel = view.snapshot();
        assert_eq!(panel.loop_status().phase, Phase::Idle);
        assert_eq!(panel.loop_status().submits_applied, 1);
        assert_eq!(panel.spectrum().values().collect::<Vec<_>>(), vec![0.0, 0.1]);
        assert_eq!(coupling_widget(&view), Some(0.05));

        // t=4000 is past the window again.
        sleep(ms(1600)).await;
        assert_eq!(service.fetches(), 2);
        drop(tx);
    };

    let (driver, ()) = tokio::join!(driver.run(rx), script);
    let submitted = service.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].get("coupling"), Some(0.05));
    assert_eq!(submitted[0].topology(), Some("Calabi-Yau"));
    assert_eq!(driver.reconciler().state().parameter("coupling"), Some(0.05));
}

#[tokio::test(start_paused = true)]
async fn fetch_overtaken_by_edit_is_discarded() {
    let service = Scripted::serving(state(0.1, &[0.0, 1.0]));
    service.0.fetch_delay.set(ms(500));
    service.0.submit_delay.set(ms(1000));
    let view = SharedView::default();
    let (tx, rx) = event_channel();
    let driver = ReconciliationLoop::new(service.clone(), view.clone(), INTERVAL);

    let script = async {
        // Fetch issued at t=2000 answers at t=2500 with the pre-edit state.
        sleep(ms(2200)).await;
        assert_eq!(service.fetches(), 2);
        tx.send(edit_coupling(&view, 0.3)).unwrap();

        sleep(ms(400)).await;
        let panel = view.snapshot();
        assert_eq!(panel.loop_status().stale_fetches, 1);
        assert_eq!(panel.render_count(), 1);
        assert_eq!(coupling_widget(&view), Some(0.3));

        // Submit lands at t=3200.
        sleep(ms(700)).await;
        assert_eq!(view.lock().render_count(), 2);
        assert_eq!(coupling_widget(&view), Some(0.3));
        tx.send(PanelEvent::Shutdown).unwrap();
    };

    tokio::join!(driver.run(rx), script);
}

#[tokio::test(start_paused = true)]
async fn rejected_submit_keeps_previous_state() {
    let service = Scripted::serving(state(0.1, &[0.0, 1.0]));
    service.0.reject_submits.set(true);
    service.0.submit_delay.set(ms(100));
    let view = SharedView::default();
    let (tx, rx) = event_channel();
    let driver = ReconciliationLoop::new(service.clone(), view.clone(), INTERVAL);

    let script = async {
        sleep(ms(500)).await;
        tx.send(edit_coupling(&view, 5.0)).unwrap();
        sleep(ms(200)).await;

        let panel = view.snapshot();
        assert_eq!(panel.loop_status().phase, Phase::Idle);
        assert_eq!(panel.loop_status().failures, 1);
        assert!(panel.loop_status().last_error.as_deref().unwrap().contains("HTTP 400"));
        assert_eq!(panel.render_count(), 2);
        assert_eq!(coupling_widget(&view), Some(0.1));
        tx.send(PanelEvent::Shutdown).unwrap();
    };

    let (driver, ()) = tokio::join!(driver.run(rx), script);
    assert_eq!(driver.reconciler().state(), &state(0.1, &[0.0, 1.0]));
}

#[tokio::test(start_paused = true)]
async fn refused_edit_is_reverted_in_the_widgets() {
    let service = Scripted::serving(state(0.1, &[0.0, 1.0]));
    service.0.reject_submits.set(true);
    service.0.submit_delay.set(ms(100));
    let view = SharedView::default();
    let (tx, rx) = event_channel();
    let driver = ReconciliationLoop::new(service.clone(), view.clone(), INTERVAL);

    let script = async {
        sleep(ms(500)).await;
        tx.send(edit_coupling(&view, 0.5)).unwrap();
        assert_eq!(coupling_widget(&view), Some(0.5));

        // Rejection lands at t=600.
        sleep(ms(200)).await;
        assert_eq!(coupling_widget(&view), Some(0.1));
        assert!(view.lock().raw_text().contains("0.1"));

        // Tick at t=2000 is still suppressed; nothing brings the refused value back.
        sleep(ms(1500)).await;
        assert_eq!(coupling_widget(&view), Some(0.1));
        tx.send(PanelEvent::Shutdown).unwrap();
    };

    tokio::join!(driver.run(rx), script);
    assert_eq!(service.submitted().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_submit_before_first_load_leaves_view_empty() {
    let service = Scripted::serving(state(0.1, &[0.0, 1.0]));
    service.0.reject_submits.set(true);
    service.0.fail_fetches.set(1);
    let view = SharedView::default();
    let (tx, rx) = event_channel();
    let driver = ReconciliationLoop::new(service.clone(), view.clone(), INTERVAL);

    let script = async {
        sleep(ms(100)).await;
        tx.send(edit_coupling(&view, 0.5)).unwrap();
        sleep(ms(100)).await;
        assert_eq!(view.lock().render_count(), 0);
        assert_eq!(view.lock().loop_status().failures, 2);
        tx.send(PanelEvent::Shutdown).unwrap();
    };

    tokio::join!(driver.run(rx), script);
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_is_retried_on_next_tick() {
    let service = Scripted::serving(state(0.1, &[0.0, 1.0]));
    service.0.fail_fetches.set(1);
    let view = SharedView::default();
    let (tx, rx) = event_channel();
    let driver = ReconciliationLoop::new(service.clone(), view.clone(), INTERVAL);

    let script = async {
        sleep(ms(100)).await;
        assert_eq!(view.lock().render_count(), 0);
        assert_eq!(view.lock().loop_status().failures, 1);
        assert_eq!(view.lock().widget("coupling"), Some(&WidgetValue::Empty));

        sleep(ms(2000)).await;
        assert_eq!(view.lock().render_count(), 1);
        assert_eq!(view.lock().loop_status().last_error, None);
        assert_eq!(coupling_widget(&view), Some(0.1));
        tx.send(PanelEvent::Shutdown).unwrap();
    };

    tokio::join!(driver.run(rx), script);
    assert_eq!(service.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn last_submit_to_arrive_wins() {
    let service = Scripted::serving(state(0.1, &[0.0, 1.0]));
    service.0.submit_delay.set(ms(300));
    let view = SharedView::default();
    let (tx, rx) = event_channel();
    let driver = ReconciliationLoop::new(service.clone(), view.clone(), INTERVAL);

    let script = async {
        sleep(ms(100)).await;
        tx.send(edit_coupling(&view, 0.2)).unwrap();
        sleep(ms(100)).await;
        tx.send(edit_coupling(&view, 0.4)).unwrap();

        // First submit lands at t=400, second at t=500.
        sleep(ms(250)).await;
        assert_eq!(view.lock().loop_status().phase, Phase::EditPending);
        sleep(ms(100)).await;
        assert_eq!(view.lock().loop_status().phase, Phase::Idle);
        tx.send(PanelEvent::Shutdown).unwrap();
    };

    let (driver, ()) = tokio::join!(driver.run(rx), script);
    assert_eq!(driver.reconciler().state().parameter("coupling"), Some(0.4));
    assert_eq!(driver.reconciler().status().submits_applied, 2);
}
