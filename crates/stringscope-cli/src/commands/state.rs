use stringscope_core::{HttpStateClient, PanelConfig, StateService};

pub fn run(config: &PanelConfig, json: bool) {
    let client = match HttpStateClient::new(config) {
        Ok(client) => client,
        Err(e) => super::exit_with(&e),
    };

    let result = super::runtime().block_on(client.fetch_state());
    match result {
        Ok(state) if json => println!("{}", state.to_pretty_json()),
        Ok(state) => {
            println!("{}", client.state_url());
            println!();
            super::print_state(&state);
        }
        Err(e) => super::exit_with(&e),
    }
}
