use crate::cmd::{format_map, load_config};
use crate::output::{print_json, print_table};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let catalog = load_config(root)?.catalog;

    if json {
        return print_json(&catalog);
    }

    let skills = catalog
        .skills
        .iter()
        .map(|s| {
            vec![
                s.id.clone(),
                s.name.clone(),
                s.description.clone(),
                format_map(&s.example_parameters, false),
            ]
        })
        .collect();
    print_table(&["SKILL", "NAME", "DESCRIPTION", "EXAMPLE"], skills);
    println!();

    let models = catalog
        .models
        .iter()
        .map(|m| vec![m.id.clone(), m.name.clone()])
        .collect();
    print_table(&["MODEL", "NAME"], models);
    Ok(())
}
