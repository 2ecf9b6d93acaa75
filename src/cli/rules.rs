use std::path::Path;

use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::rules::Ruleset;

pub fn check(rules_file: &str) -> Result<()> {
    let rules = Ruleset::load(Path::new(rules_file))?;

    let mut options = Table::new();
    options.set_header(vec!["Option", "Value"]);
    for (name, value) in rules.options() {
        options.add_row(vec![Cell::new(name), Cell::new(value)]);
    }
    println!("Options\n{options}\n");

    let mut defaults = Table::new();
    defaults.set_header(vec!["Field", "Default"]);
    for (field, value) in rules.defaults() {
        defaults.add_row(vec![Cell::new(field), Cell::new(value)]);
    }
    println!("Defaults\n{defaults}\n");

    let mut table = Table::new();
    table.set_header(vec!["#", "Pattern", "Actions"]);
    for (i, rule) in rules.rules().iter().enumerate() {
        let actions: Vec<String> = rule
            .actions
            .iter()
            .map(|(k, v)| format!("{k} = {v}"))
            .collect();
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(rule.pattern.as_str()),
            Cell::new(actions.join("\n")),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}

pub fn matches(rules_file: &str, description: &str) -> Result<()> {
    let rules = Ruleset::load(Path::new(rules_file))?;
    match rules.find_rule(description) {
        Some(rule) => println!("Matched /{}/", rule.pattern.as_str()),
        None => println!("No rule matched; defaults only"),
    }

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    for (field, value) in rules.match_description(description) {
        table.add_row(vec![Cell::new(field), Cell::new(value)]);
    }
    println!("{table}");
    Ok(())
}
