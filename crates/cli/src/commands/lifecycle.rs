use std::path::Path;
use std::process;

use assets_core::{FromStatus, Lifecycle, StatusCategory};
use serde_json::{json, Value};

use crate::{load_registry_or_exit, report_error, OutputFormat};

pub(crate) fn cmd_lifecycle(config: &Path, name: &str, output: OutputFormat, quiet: bool) {
    let registry = load_registry_or_exit(config, output, quiet);
    let Some(lifecycle) = registry.lifecycle(name) else {
        report_error(&format!("unknown lifecycle '{}'", name), output, quiet);
        process::exit(1);
    };
    if quiet {
        return;
    }

    match output {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&lifecycle_json(lifecycle))
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", text);
        }
        OutputFormat::Text => print_lifecycle(lifecycle),
    }
}

/// JSON shape shared by `assets lifecycle --output json` and `GET /lifecycles/{name}`.
///
/// The creation origin is keyed as `""` in `transitions`, matching the
/// configuration file.
pub(crate) fn lifecycle_json(lifecycle: &Lifecycle) -> Value {
    let transitions: serde_json::Map<String, Value> = lifecycle
        .transition_table()
        .iter()
        .map(|(from, targets)| {
            let key = from.as_status().unwrap_or_default().to_string();
            (key, json!(targets))
        })
        .collect();
    let rights: Vec<Value> = lifecycle
        .rights()
        .map(|(from, to, right)| json!({ "from": from, "to": to, "right": right }))
        .collect();

    json!({
        "name": lifecycle.name(),
        "initial": lifecycle.statuses_in(StatusCategory::Initial),
        "active": lifecycle.statuses_in(StatusCategory::Active),
        "inactive": lifecycle.statuses_in(StatusCategory::Inactive),
        "default_on_create": lifecycle.default_status_on_create(),
        "deleted": lifecycle.deleted_status(),
        "transitions": transitions,
        "rights": rights,
    })
}

fn print_lifecycle(lifecycle: &Lifecycle) {
    println!("Lifecycle: {}", lifecycle.name());
    for (label, category) in [
        ("initial", StatusCategory::Initial),
        ("active", StatusCategory::Active),
        ("inactive", StatusCategory::Inactive),
    ] {
        println!("  {:<9} {}", label, lifecycle.statuses_in(category).join(", "));
    }
    println!("  default on create: {}", lifecycle.default_status_on_create());
    println!(
        "  deleted status:    {}",
        lifecycle.deleted_status().unwrap_or("(none)")
    );

    println!("Transitions:");
    for (from, targets) in lifecycle.transition_table() {
        let from = match from {
            FromStatus::None => "(create)",
            FromStatus::Status(s) => s.as_str(),
        };
        let targets: Vec<&str> = targets.iter().map(String::as_str).collect();
        println!("  {} -> {}", from, targets.join(", "));
    }

    let rights: Vec<_> = lifecycle.rights().collect();
    if !rights.is_empty() {
        println!("Rights:");
        for (from, to, right) in rights {
            let from = if from.is_empty() { "(create)".to_string() } else { from };
            println!("  {} -> {} requires {}", from, to, right);
        }
    }
}
