use std::path::Path;
use std::process;

use assets_core::FromStatus;
use serde_json::json;

use crate::{load_registry_or_exit, report_error, OutputFormat};

/// Run one gate decision. Exits 1 with the gate's message on rejection.
pub(crate) fn cmd_transition(
    config: &Path,
    lifecycle: &str,
    from: Option<&str>,
    to: &str,
    output: OutputFormat,
    quiet: bool,
) {
    let registry = load_registry_or_exit(config, output, quiet);
    let Some(lc) = registry.lifecycle(lifecycle) else {
        report_error(&format!("unknown lifecycle '{}'", lifecycle), output, quiet);
        process::exit(1);
    };

    let (origin, decision) = match from {
        None => (FromStatus::None, lc.check_create(Some(to)).map(|_| ())),
        Some(from) => (FromStatus::from(from), lc.check_change(from, to)),
    };
    if let Err(e) = decision {
        report_error(&e.to_string(), output, quiet);
        process::exit(1);
    }
    if quiet {
        return;
    }

    let right = lc.required_right(&origin, to);
    match output {
        OutputFormat::Json => {
            let report = json!({
                "accepted": true,
                "lifecycle": lc.name(),
                "from": origin,
                "to": to,
                "required_right": right,
            });
            println!("{}", report);
        }
        OutputFormat::Text => {
            let from = match &origin {
                FromStatus::None => "(create)",
                FromStatus::Status(s) => s.as_str(),
            };
            match right {
                Some(right) => println!("accepted: {} -> {} (requires {})", from, to, right),
                None => println!("accepted: {} -> {}", from, to),
            }
        }
    }
}
