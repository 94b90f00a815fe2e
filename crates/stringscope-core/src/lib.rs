//! # stringscope-core
//!
//! Client side of the stringscope panel: a live view of a remote string
//! spectrum model that the user can also edit.
//!
//! ## Quick Start
//!
//! ```no_run
//! use stringscope_core::{
//!     HttpStateClient, PanelConfig, ReconciliationLoop, SharedView, event_channel,
//! };
//!
//! # async fn demo() -> Result<(), stringscope_core::NetworkError> {
//! let config = PanelConfig::default();
//! let client = HttpStateClient::new(&config)?;
//! let view = SharedView::default();
//! let (events, rx) = event_channel();
//!
//! let driver = ReconciliationLoop::new(client, view.clone(), config.poll_interval);
//! # drop(events);
//! driver.run(rx).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Timer / edits → StateService → Reconciler → RenderSink
//!
//! - [`catalog`]: the fixed list of editable parameters and their bounds.
//! - [`client`]: fetch and submit over HTTP, with classified errors.
//! - [`reconcile`]: the refresh/edit arbitration and its async driver.
//! - [`view`]: widgets, chart series and the raw-state text.
//! - [`series`]: spectrum and degeneracy series derived from a state.

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod series;
pub mod state;
pub mod view;

pub use catalog::{
    Catalog, Choice, DEFAULT_TOPOLOGY, ParameterDescriptor, ParameterKind, STANDARD_PARAMETERS,
    Step, TOPOLOGIES,
};
pub use client::{API_PREFIX, HttpStateClient, StateService, decode_response};
pub use config::{DEFAULT_BASE_URL, DEFAULT_POLL_MS, DEFAULT_TIMEOUT_SECS, PanelConfig};
pub use error::NetworkError;
pub use reconcile::{
    Applied, LoopStatus, PanelEvent, Phase, ReconciliationLoop, Reconciler, event_channel,
};
pub use series::{degeneracy, indexed_points, level_degeneracy};
pub use state::{Compactification, FormValues, SystemState};
pub use view::{ChartSeries, PanelView, RenderSink, SharedView, WidgetValue, axis_upper};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
