//! Rendering sink: the panel's widgets, charts and raw-state text.
//!
//! [`PanelView`] is the view model a front end draws from. Rendering a state
//! overwrites widget values directly and never produces an edit event; edits
//! only reach the reconciliation loop when the front end sends
//! [`PanelEvent::ParameterChanged`](crate::reconcile::PanelEvent) itself.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::catalog::{Catalog, ParameterDescriptor, ParameterKind};
use crate::reconcile::LoopStatus;
use crate::series::{degeneracy, indexed_points};
use crate::state::{FormValues, SystemState};

/// Headroom above the largest observed value on a chart's y axis.
pub const AXIS_PADDING: f64 = 1.1;

/// Receives every state the reconciliation loop accepts.
pub trait RenderSink {
    /// Show `state`. Must be idempotent and must not fail for a well-formed state.
    fn render(&mut self, state: &SystemState);

    /// Loop bookkeeping after each reaction (phase, counters, last error).
    fn status(&mut self, _status: &LoopStatus) {}
}

/// Current value of one control.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WidgetValue {
    /// No value reported yet.
    #[default]
    Empty,
    Number(f64),
    Choice(String),
}

impl std::fmt::Display for WidgetValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, ""),
            Self::Number(v) => write!(f, "{v}"),
            Self::Choice(c) => write!(f, "{c}"),
        }
    }
}

/// Plot-ready series with fixed axis bounds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartSeries {
    pub points: Vec<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl ChartSeries {
    /// Index the values by level and fix the axes for this render.
    pub fn from_values(values: &[f64]) -> Self {
        let x_max = values.len().saturating_sub(1).max(1) as f64;
        Self {
            points: indexed_points(values),
            x_bounds: [0.0, x_max],
            y_bounds: [0.0, axis_upper(values)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|&(_, y)| y)
    }
}

/// Upper y bound: largest value padded by 10%, or 1.0 when there is nothing
/// positive to show.
pub fn axis_upper(values: &[f64]) -> f64 {
    let max = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::MIN, f64::max);
    if max > 0.0 { max * AXIS_PADDING } else { 1.0 }
}

/// Widgets, charts and diagnostic text of the panel.
#[derive(Debug, Clone)]
pub struct PanelView {
    catalog: Catalog,
    /// Parallel to the catalog's display order.
    widgets: Vec<WidgetValue>,
    topology_description: Option<String>,
    spectrum: ChartSeries,
    degeneracy: ChartSeries,
    raw_text: String,
    render_count: u64,
    status: LoopStatus,
}

impl Default for PanelView {
    fn default() -> Self {
        Self::new(Catalog::standard())
    }
}

impl PanelView {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            widgets: vec![WidgetValue::Empty; catalog.len()],
            topology_description: None,
            spectrum: ChartSeries::default(),
            degeneracy: ChartSeries::default(),
            raw_text: String::new(),
            render_count: 0,
            status: LoopStatus::default(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Descriptors with their current widget values, in display order.
    pub fn widgets(&self) -> impl Iterator<Item = (&'static ParameterDescriptor, &WidgetValue)> {
        self.catalog.iter().zip(self.widgets.iter())
    }

    pub fn widget(&self, id: &str) -> Option<&WidgetValue> {
        self.catalog.index_of(id).map(|i| &self.widgets[i])
    }

    pub fn topology_description(&self) -> Option<&str> {
        self.topology_description.as_deref()
    }

    pub fn spectrum(&self) -> &ChartSeries {
        &self.spectrum
    }

    pub fn degeneracy(&self) -> &ChartSeries {
        &self.degeneracy
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    pub fn loop_status(&self) -> &LoopStatus {
        &self.status
    }

    // --- Edits made by the front end. None of these notify the loop. ---

    /// Set a numeric widget, clamped into the parameter's range.
    ///
    /// Returns false for unknown or non-numeric identifiers.
    pub fn set_number(&mut self, id: &str, value: f64) -> bool {
        match self.numeric_slot(id) {
            Some((i, descriptor)) => {
                self.widgets[i] = WidgetValue::Number(descriptor.clamp(value));
                true
            }
            None => false,
        }
    }

    /// Step a numeric widget up or down. An empty widget starts from its lower bound.
    pub fn nudge(&mut self, id: &str, up: bool) -> bool {
        let Some((i, descriptor)) = self.numeric_slot(id) else {
            return false;
        };
        let next = match &self.widgets[i] {
            WidgetValue::Number(v) => descriptor.nudge(*v, up),
            _ => descriptor.bounds().map_or(0.0, |(min, _)| min),
        };
        self.widgets[i] = WidgetValue::Number(next);
        true
    }

    /// Select an enumerated choice by value. Unknown values are refused.
    pub fn set_choice(&mut self, id: &str, value: &str) -> bool {
        let Some(i) = self.catalog.index_of(id) else {
            return false;
        };
        let descriptor = self.catalog.get(id);
        match descriptor.and_then(|d| d.choice(value)) {
            Some(choice) => {
                self.widgets[i] = WidgetValue::Choice(choice.value.to_string());
                self.topology_description = Some(choice.description.to_string());
                true
            }
            None => false,
        }
    }

    /// Move an enumerated widget to the next or previous choice.
    pub fn cycle_choice(&mut self, id: &str, forward: bool) -> bool {
        let Some(descriptor) = self.catalog.get(id) else {
            return false;
        };
        let current = match self.widget(id) {
            Some(WidgetValue::Choice(c)) => c.clone(),
            _ => String::new(),
        };
        match descriptor.cycle_choice(&current, forward) {
            Some(next) => self.set_choice(id, next),
            None => false,
        }
    }

    /// Every widget's current value, ready to submit.
    pub fn form_values(&self) -> FormValues {
        let mut form = FormValues::new();
        for (descriptor, value) in self.widgets() {
            match value {
                WidgetValue::Number(v) if descriptor.is_numeric() => form.set(descriptor.id, *v),
                WidgetValue::Choice(c) if !descriptor.is_numeric() => form.set_topology(c.clone()),
                _ => {}
            }
        }
        form
    }

    fn numeric_slot(&self, id: &str) -> Option<(usize, &'static ParameterDescriptor)> {
        let i = self.catalog.index_of(id)?;
        let descriptor = self.catalog.get(id)?;
        descriptor.is_numeric().then_some((i, descriptor))
    }
}

impl RenderSink for PanelView {
    fn render(&mut self, state: &SystemState) {
        for (i, descriptor) in self.catalog.iter().enumerate() {
            match descriptor.kind {
                ParameterKind::Numeric { .. } => {
                    self.widgets[i] = state
                        .parameter(descriptor.id)
                        .map_or(WidgetValue::Empty, WidgetValue::Number);
                }
                ParameterKind::Enumerated { .. } => {
                    let incoming = state.topology();
                    if incoming.is_empty() {
                        self.widgets[i] = WidgetValue::Empty;
                        self.topology_description = None;
                    } else if self.widgets[i] != WidgetValue::Choice(incoming.to_string()) {
                        self.widgets[i] = WidgetValue::Choice(incoming.to_string());
                        self.topology_description = descriptor
                            .choice(incoming)
                            .map(|c| c.description.to_string());
                    }
                }
            }
        }

        self.spectrum = ChartSeries::from_values(&state.mass_spectrum);
        self.degeneracy = ChartSeries::from_values(&degeneracy(&state.mass_spectrum));
        self.raw_text = state.to_pretty_json();
        self.render_count += 1;
    }

    fn status(&mut self, status: &LoopStatus) {
        self.status = status.clone();
    }
}

/// A [`PanelView`] shared between the reconciliation loop and a front end
/// running on another thread.
#[derive(Debug, Clone, Default)]
pub struct SharedView {
    inner: Arc<Mutex<PanelView>>,
}

impl SharedView {
    pub fn new(view: PanelView) -> Self {
        Self {
            inner: Arc::new(Mutex::new(view)),
        }
    }

    /// Lock the view. A panic on the other side does not make it unusable.
    pub fn lock(&self) -> MutexGuard<'_, PanelView> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Copy of the view for one frame.
    pub fn snapshot(&self) -> PanelView {
        self.lock().clone()
    }
}

impl RenderSink for SharedView {
    fn render(&mut self, state: &SystemState) {
        self.lock().render(state);
    }

    fn status(&mut self, status: &LoopStatus) {
        self.lock().status(status);
    }
}
