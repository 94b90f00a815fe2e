use stringscope_core::{
    Catalog, FormValues, HttpStateClient, PanelConfig, ParameterKind, StateService,
};

/// One parsed `key=value` argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Number(&'static str, f64),
    Choice(&'static str, &'static str),
}

/// Parse `key=value` against the catalog. Numbers must be in range; choices
/// match case-insensitively.
pub fn parse_assignment(catalog: &Catalog, arg: &str) -> Result<Assignment, String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {arg:?}"))?;
    let (key, raw) = (key.trim(), raw.trim());
    let descriptor = catalog
        .get(key)
        .ok_or_else(|| format!("unknown parameter {key:?} (see `stringscope catalog`)"))?;

    match descriptor.kind {
        ParameterKind::Numeric { .. } => {
            let value: f64 = raw
                .parse()
                .map_err(|_| format!("{key} expects a number, got {raw:?}"))?;
            descriptor
                .validate(value)
                .map(|v| Assignment::Number(descriptor.id, v))
        }
        ParameterKind::Enumerated { choices } => choices
            .iter()
            .find(|c| c.value.eq_ignore_ascii_case(raw))
            .map(|c| Assignment::Choice(descriptor.id, c.value))
            .ok_or_else(|| {
                let names: Vec<&str> = choices.iter().map(|c| c.value).collect();
                format!("{key} must be one of {}, got {raw:?}", names.join(", "))
            }),
    }
}

/// Apply assignments on top of a form seeded from the current state.
pub fn apply_assignments(form: &mut FormValues, assignments: &[Assignment]) {
    for assignment in assignments {
        match *assignment {
            Assignment::Number(id, value) => form.set(id, value),
            Assignment::Choice(_, value) => form.set_topology(value),
        }
    }
}

pub fn run(config: &PanelConfig, args: &[String]) {
    let catalog = Catalog::standard();
    let assignments: Vec<Assignment> = match args
        .iter()
        .map(|arg| parse_assignment(&catalog, arg))
        .collect()
    {
        Ok(list) => list,
        Err(msg) => {
            eprintln!("Error: {msg}");
            std::process::exit(1);
        }
    };

    let client = match HttpStateClient::new(config) {
        Ok(client) => client,
        Err(e) => super::exit_with(&e),
    };

    let result = super::runtime().block_on(async {
        let current = client.fetch_state().await?;
        let mut form = FormValues::from_state(&catalog, &current);
        apply_assignments(&mut form, &assignments);
        log::info!("submitting {}", form.to_json());
        client.submit_state(&form).await
    });

    match result {
        Ok(state) => super::print_state(&state),
        Err(e) => super::exit_with(&e),
    }
}
