use stringscope_core::{Catalog, ParameterKind};

pub fn run() {
    let catalog = Catalog::standard();
    println!("{} parameters:\n", catalog.len());

    for descriptor in catalog.iter() {
        println!("  {:<12} {}", descriptor.id, descriptor.label);
        match descriptor.kind {
            ParameterKind::Numeric { min, max, step } => {
                println!("  {:<12} range [{min}, {max}], step {step}", "");
            }
            ParameterKind::Enumerated { choices } => {
                for choice in choices {
                    println!("  {:<12} • {:<11} {}", "", choice.value, choice.description);
                }
            }
        }
        println!("  {:<12} {}", "", descriptor.description);
        println!();
    }
}
