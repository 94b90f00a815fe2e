pub mod catalog;
pub mod monitor;
pub mod serve;
pub mod set;
pub mod state;

use std::fs::File;

use stringscope_core::{
    Catalog, NetworkError, PanelConfig, SystemState, WidgetValue, degeneracy,
};

/// Where log output goes for a command.
pub enum LogTarget<'a> {
    /// Interactive panel: a file if given, otherwise only when `RUST_LOG` asks.
    Monitor(Option<&'a str>),
    /// One-shot commands log to stderr at this default level.
    Console(&'a str),
}

/// Initialise `env_logger` once. `RUST_LOG` always takes precedence.
pub fn init_logging(target: LogTarget<'_>) {
    let (default_level, file) = match target {
        LogTarget::Monitor(Some(path)) => match File::create(path) {
            Ok(file) => ("info", Some(file)),
            Err(e) => {
                eprintln!("Cannot open log file {path}: {e}");
                std::process::exit(1);
            }
        },
        LogTarget::Monitor(None) => ("off", None),
        LogTarget::Console(level) => (level, None),
    };

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    if let Some(file) = file {
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
}

/// Map the shared CLI flags onto a [`PanelConfig`].
pub fn panel_config(url: &str, poll_ms: u64, timeout_sec: f64) -> PanelConfig {
    PanelConfig::default()
        .with_base_url(url)
        .with_poll_ms(poll_ms)
        .with_timeout_secs(timeout_sec)
}

/// Single-threaded runtime for one-shot commands.
pub fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    }
}

/// Print a request failure, with the response body when there is one, and exit 1.
pub fn exit_with(err: &NetworkError) -> ! {
    eprintln!("Error ({}): {err}", err.kind());
    if let Some(payload) = err.payload().filter(|p| !p.is_empty()) {
        eprintln!("  response: {payload}");
    }
    std::process::exit(1);
}

/// Human-readable dump of a state: parameters, compactification, spectrum.
pub fn print_state(state: &SystemState) {
    let catalog = Catalog::standard();

    println!("Parameters");
    for descriptor in catalog.numeric() {
        let value = state
            .parameter(descriptor.id)
            .map_or(WidgetValue::Empty, WidgetValue::Number);
        println!(
            "  {:<20} {:>12}",
            descriptor.label,
            crate::tui::ui::format_value(descriptor, &value)
        );
    }
    for (id, value) in state
        .parameters
        .iter()
        .filter(|(id, _)| catalog.get(id).is_none())
    {
        println!("  {id:<20} {value:>12}");
    }

    println!();
    println!("Compactification");
    println!("  topology   {}", state.topology());
    if let Some(description) = catalog.topology_description(state.topology()) {
        println!("             {description}");
    }
    if !state.compactification.radius.is_empty() {
        let radii: Vec<String> = state
            .compactification
            .radius
            .iter()
            .map(|r| format!("{r}"))
            .collect();
        println!("  radius     [{}]", radii.join(", "));
    }

    println!();
    println!("  {:>5}  {:>12}  {:>11}", "level", "mass", "degeneracy");
    for (level, (mass, deg)) in state
        .mass_spectrum
        .iter()
        .zip(degeneracy(&state.mass_spectrum))
        .enumerate()
    {
        println!("  {level:>5}  {mass:>12.6}  {deg:>11}");
    }

    if let Some(ts) = &state.timestamp {
        println!();
        println!("  as of {ts}");
    }
}
