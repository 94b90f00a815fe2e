use stringscope_core::PanelConfig;

pub fn run(config: PanelConfig) {
    let mut app = crate::tui::app::App::new(config);
    if let Err(e) = app.run() {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}
