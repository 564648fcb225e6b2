use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use kimport_mapping::ImportOrder;
use kimport_pipeline::PipelineReport;

/// One row per collection: rows, identifiers and reference outcomes.
pub fn report_table(report: &PipelineReport) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["COLLECTION", "ROWS", "IDENTIFIERS", "REFERENCES", "UNRESOLVED"]);

    for collection in &report.collections {
        let identifiers = collection
            .identity
            .map(|s| s.unique.to_string())
            .unwrap_or_else(|| "-".to_string());
        let resolved: usize = collection.references.iter().map(|r| r.resolved_tokens).sum();
        table.add_row(vec![
            collection.name.clone(),
            collection.rows.to_string(),
            identifiers,
            resolved.to_string(),
            collection.unresolved_tokens().to_string(),
        ]);
    }
    table
}

/// Numbered import order, with cyclic collections called out.
pub fn format_import_order(order: &ImportOrder) -> String {
    let mut out = String::from("Import order:");
    for (i, name) in order.ordered.iter().enumerate() {
        out.push_str(&format!("\n  {:>2}. {name}", i + 1));
    }
    if order.has_cycles() {
        out.push_str(&format!(
            "\n  {} circular references between: {}",
            "warning:".yellow().bold(),
            order.cyclic.join(", ")
        ));
    }
    out
}

/// Unresolved reference samples, one line per degraded column.
pub fn format_unresolved(report: &PipelineReport) -> Option<String> {
    let lines: Vec<String> = report
        .collections
        .iter()
        .flat_map(|c| c.references.iter().map(move |r| (c.name.as_str(), r)))
        .filter(|(_, r)| r.is_degraded())
        .map(|(collection, r)| {
            format!(
                "  {collection}.{} → {}: {} dropped (e.g. {})",
                r.column,
                r.referenced,
                r.unresolved_tokens,
                r.unresolved_sample.join(", ")
            )
        })
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(format!(
            "{} unresolved references were dropped:\n{}",
            "warning:".yellow().bold(),
            lines.join("\n")
        ))
    }
}
