//! TUI application state and event loop.
//!
//! Design: the reconciliation loop runs on a background thread with its own
//! single-threaded runtime and renders into a [`SharedView`]. The UI thread
//! only draws snapshots of that view and turns key presses into widget edits,
//! each followed by one `ParameterChanged` carrying the whole form.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{debug, error};
use ratatui::prelude::*;
use ratatui::widgets::TableState;
use tokio::sync::mpsc::UnboundedSender;

use stringscope_core::{
    HttpStateClient, PanelConfig, PanelEvent, PanelView, ParameterDescriptor, ReconciliationLoop,
    SharedView, WidgetValue, event_channel,
};

/// How long to wait for a key before redrawing.
const FRAME_POLL: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Text being typed into the selected numeric widget.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditBuffer {
    pub text: String,
}

impl EditBuffer {
    fn accepts(c: char) -> bool {
        c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    config: PanelConfig,
    view: SharedView,
    events: Option<UnboundedSender<PanelEvent>>,
    worker: Option<JoinHandle<()>>,
    cursor: usize,
    running: bool,
    editing: Option<EditBuffer>,
    /// Last input problem, shown in the key bar until the next key.
    notice: Option<String>,
    table_state: TableState,
}

impl App {
    pub fn new(config: PanelConfig) -> Self {
        Self {
            config,
            view: SharedView::default(),
            events: None,
            worker: None,
            cursor: 0,
            running: true,
            editing: None,
            notice: None,
            table_state: TableState::default().with_selected(Some(0)),
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        self.start_loop()?;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Install panic hook that restores terminal before printing the panic.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        // Always restore terminal, even if the loop returned an error.
        let _ = std::panic::take_hook(); // remove our hook
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        self.stop_loop();
        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        while self.running {
            let panel = self.view.snapshot();
            terminal.draw(|f| super::ui::draw(f, self, &panel))?;

            if event::poll(FRAME_POLL)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key.code);
            }

            if self.worker.as_ref().is_some_and(|w| w.is_finished()) {
                self.notice = Some("reconciliation loop stopped; see log".into());
            }
        }
        Ok(())
    }

    /// Spawn the reconciliation loop on its own thread.
    fn start_loop(&mut self) -> io::Result<()> {
        let (tx, rx) = event_channel();
        let config = self.config.clone();
        let view = self.view.clone();

        let worker = thread::Builder::new()
            .name("reconcile".into())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("failed to start runtime: {e}");
                        return;
                    }
                };
                let client = match HttpStateClient::new(&config) {
                    Ok(client) => client,
                    Err(e) => {
                        error!("failed to build HTTP client: {e}");
                        return;
                    }
                };
                let driver = ReconciliationLoop::new(client, view, config.suppression_window());
                rt.block_on(driver.run(rx));
            })?;

        self.events = Some(tx);
        self.worker = Some(worker);
        Ok(())
    }

    /// Ask the loop to stop and wait for it. In-flight requests are dropped.
    fn stop_loop(&mut self) {
        if let Some(tx) = self.events.take() {
            let _ = tx.send(PanelEvent::Shutdown);
        }
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            error!("reconciliation thread panicked");
        }
    }

    pub(crate) fn handle_key(&mut self, key: KeyCode) {
        self.notice = None;
        if self.editing.is_some() {
            self.handle_edit_key(key);
            return;
        }

        match key {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
                self.table_state.select(Some(self.cursor));
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let last = self.view.lock().catalog().len().saturating_sub(1);
                self.cursor = (self.cursor + 1).min(last);
                self.table_state.select(Some(self.cursor));
            }
            KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char('l') => {
                self.step_selected(true)
            }
            KeyCode::Left | KeyCode::Char('-') | KeyCode::Char('h') => self.step_selected(false),
            KeyCode::Enter => self.begin_edit(),
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, key: KeyCode) {
        let Some(buffer) = self.editing.as_mut() else {
            return;
        };
        match key {
            KeyCode::Esc => self.editing = None,
            KeyCode::Backspace => {
                buffer.text.pop();
            }
            KeyCode::Char(c) if EditBuffer::accepts(c) => buffer.text.push(c),
            KeyCode::Enter => self.confirm_edit(),
            _ => {}
        }
    }

    /// Enter starts typing on numeric rows and cycles the choice on enumerated ones.
    fn begin_edit(&mut self) {
        let Some(descriptor) = self.selected() else {
            return;
        };
        if !descriptor.is_numeric() {
            self.step_selected(true);
            return;
        }
        let text = match self.view.lock().widget(descriptor.id) {
            Some(WidgetValue::Number(v)) => format!("{v}"),
            _ => String::new(),
        };
        self.editing = Some(EditBuffer { text });
    }

    fn confirm_edit(&mut self) {
        let (Some(buffer), Some(descriptor)) = (self.editing.take(), self.selected()) else {
            return;
        };
        match buffer.text.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => {
                self.view.lock().set_number(descriptor.id, value);
                self.commit();
            }
            _ => self.notice = Some(format!("not a number: {:?}", buffer.text)),
        }
    }

    /// Nudge a numeric widget or cycle an enumerated one, then submit.
    fn step_selected(&mut self, up: bool) {
        let Some(descriptor) = self.selected() else {
            return;
        };
        let changed = {
            let mut view = self.view.lock();
            if descriptor.is_numeric() {
                view.nudge(descriptor.id, up)
            } else {
                view.cycle_choice(descriptor.id, up)
            }
        };
        if changed {
            self.commit();
        }
    }

    /// Send the whole form to the loop.
    fn commit(&mut self) {
        let form = self.view.lock().form_values();
        match &self.events {
            Some(tx) if tx.send(PanelEvent::ParameterChanged(form)).is_ok() => {}
            _ => {
                debug!("edit not sent: reconciliation loop is not running");
                self.notice = Some("not connected; edit kept locally".into());
            }
        }
    }

    fn selected(&self) -> Option<&'static ParameterDescriptor> {
        self.view.lock().catalog().iter().nth(self.cursor)
    }

    // --- accessors for rendering ---

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn editing(&self) -> Option<&EditBuffer> {
        self.editing.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn table_state(&self) -> TableState {
        self.table_state.clone()
    }

    pub fn snapshot(&self) -> PanelView {
        self.view.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use stringscope_core::{Compactification, RenderSink, SystemState};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn loaded_app() -> (App, UnboundedReceiver<PanelEvent>) {
        let mut app = App::new(PanelConfig::default());
        let (tx, rx) = event_channel();
        app.events = Some(tx);
        app.view.clone().render(&SystemState {
            parameters: BTreeMap::from([
                ("dimensions".to_string(), 10.0),
                ("tension".to_string(), 1.0),
                ("coupling".to_string(), 0.1),
                ("alpha_prime".to_string(), 1.0),
            ]),
            compactification: Compactification {
                topology: "Calabi-Yau".into(),
                radius: vec![1.0; 6],
            },
            mass_spectrum: vec![0.0, 1.0, 1.41, 1.73],
            timestamp: None,
        });
        (app, rx)
    }

    fn sent_form(rx: &mut UnboundedReceiver<PanelEvent>) -> stringscope_core::FormValues {
        match rx.try_recv() {
            Ok(PanelEvent::ParameterChanged(form)) => form,
            other => panic!("expected an edit, got {other:?}"),
        }
    }

    #[test]
    fn cursor_stays_in_catalog() {
        let (mut app, _rx) = loaded_app();
        app.handle_key(KeyCode::Up);
        assert_eq!(app.cursor(), 0);
        for _ in 0..10 {
            app.handle_key(KeyCode::Down);
        }
        assert_eq!(app.cursor(), 4);
    }

    #[test]
    fn nudging_dimensions_sends_whole_form() {
        let (mut app, mut rx) = loaded_app();
        app.handle_key(KeyCode::Right);

        let form = sent_form(&mut rx);
        assert_eq!(form.get("dimensions"), Some(11.0));
        assert_eq!(form.get("coupling"), Some(0.1));
        assert_eq!(form.topology(), Some("Calabi-Yau"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn nudging_coupling_down_divides_by_step() {
        let (mut app, mut rx) = loaded_app();
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Char('-'));
        let form = sent_form(&mut rx);
        assert!((form.get("coupling").unwrap() - 0.1 / 1.1).abs() < 1e-12);
    }

    #[test]
    fn typed_value_is_clamped_and_sent() {
        let (mut app, mut rx) = loaded_app();
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.editing().map(|b| b.text.as_str()), Some("0.1"));

        for _ in 0..3 {
            app.handle_key(KeyCode::Backspace);
        }
        for c in "5x".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        assert_eq!(app.editing().map(|b| b.text.as_str()), Some("5"));
        app.handle_key(KeyCode::Enter);

        assert!(app.editing().is_none());
        assert_eq!(sent_form(&mut rx).get("coupling"), Some(1.0));
    }

    #[test]
    fn escape_cancels_typing() {
        let (mut app, mut rx) = loaded_app();
        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::Char('7'));
        app.handle_key(KeyCode::Esc);
        assert!(app.editing().is_none());
        assert!(app.running);
        assert!(rx.try_recv().is_err());
        assert_eq!(
            app.snapshot().widget("dimensions"),
            Some(&WidgetValue::Number(10.0))
        );
    }

    #[test]
    fn garbage_input_shows_notice() {
        let (mut app, mut rx) = loaded_app();
        app.handle_key(KeyCode::Enter);
        for _ in 0..2 {
            app.handle_key(KeyCode::Backspace);
        }
        app.handle_key(KeyCode::Char('-'));
        app.handle_key(KeyCode::Enter);
        assert!(app.notice().is_some());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn topology_cycles_on_arrows_and_enter() {
        let (mut app, mut rx) = loaded_app();
        for _ in 0..4 {
            app.handle_key(KeyCode::Down);
        }
        app.handle_key(KeyCode::Right);
        assert_eq!(sent_form(&mut rx).topology(), Some("Torus"));
        app.handle_key(KeyCode::Enter);
        assert_eq!(sent_form(&mut rx).topology(), Some("Orbifold"));
        app.handle_key(KeyCode::Left);
        assert_eq!(sent_form(&mut rx).topology(), Some("Torus"));
        assert!(app.snapshot().topology_description().unwrap().contains("torus"));
    }

    #[test]
    fn edit_without_loop_stays_local() {
        let mut app = App::new(PanelConfig::default());
        app.handle_key(KeyCode::Right);
        assert_eq!(
            app.snapshot().widget("dimensions"),
            Some(&WidgetValue::Number(4.0))
        );
        assert!(app.notice().is_some());
    }

    #[test]
    fn q_quits() {
        let (mut app, _rx) = loaded_app();
        app.handle_key(KeyCode::Char('q'));
        assert!(!app.running);
    }
}
