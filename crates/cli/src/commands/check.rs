use std::path::Path;

use serde_json::json;

use crate::{load_registry_or_exit, OutputFormat};

pub(crate) fn cmd_check(config: &Path, output: OutputFormat, quiet: bool) {
    let registry = load_registry_or_exit(config, output, quiet);
    if quiet {
        return;
    }

    let lifecycles: Vec<&str> = registry.lifecycles().map(|lc| lc.name()).collect();
    match output {
        OutputFormat::Json => {
            let report = json!({
                "valid": true,
                "lifecycles": lifecycles,
                "catalogs": registry.catalogs(),
                "custom_fields": registry.custom_fields(),
                "roles": registry
                    .roles()
                    .iter()
                    .map(|r| json!({ "name": r.name, "single": r.single }))
                    .collect::<Vec<_>>(),
                "grants": registry.grants().len(),
            });
            let text = serde_json::to_string_pretty(&report)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", text);
        }
        OutputFormat::Text => {
            println!("Configuration OK: {}", config.display());
            println!(
                "  Lifecycles:    {} ({})",
                lifecycles.len(),
                lifecycles.join(", ")
            );
            let disabled = registry.catalogs().iter().filter(|c| c.disabled).count();
            println!(
                "  Catalogs:      {} ({} disabled)",
                registry.catalogs().len(),
                disabled
            );
            for catalog in registry.catalogs() {
                println!(
                    "    #{} {} -> {}{}",
                    catalog.id,
                    catalog.name,
                    catalog.lifecycle,
                    if catalog.disabled { " [disabled]" } else { "" }
                );
            }
            println!("  Custom fields: {}", registry.custom_fields().len());
            println!("  Grants:        {}", registry.grants().len());
        }
    }
}
