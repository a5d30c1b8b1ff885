use crate::model::{Catalogue, CatalogueEntry};

/// Render the catalogue as a Markdown document.
pub fn render_markdown(catalogue: &Catalogue) -> String {
    let mut lines = Vec::new();

    lines.push("# AVL Dataset Catalogue".to_string());
    lines.push(String::new());
    lines.push(format!("- source: {}", catalogue.source));
    lines.push(format!("- generated_at: {}", catalogue.generated_at));
    lines.push(format!("- datasets: {}", catalogue.entries.len()));
    lines.push(String::new());

    if catalogue.entries.is_empty() {
        lines.push("No datasets found.".to_string());
        lines.push(String::new());
        return lines.join("\n");
    }

    lines.push("| dataset | title | variables | dimensions | time coverage | bbox |".to_string());
    lines.push("| --- | --- | --- | --- | --- | --- |".to_string());
    for entry in &catalogue.entries {
        lines.push(render_row(entry));
    }
    lines.push(String::new());

    let unreadable: Vec<&CatalogueEntry> = catalogue
        .entries
        .iter()
        .filter(|entry| entry.error.is_some())
        .collect();
    if !unreadable.is_empty() {
        lines.push("## Unreadable datasets".to_string());
        for entry in unreadable {
            let error = entry.error.as_deref().unwrap_or_default();
            lines.push(format!("- {}: {}", entry.path, cell(error)));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

fn render_row(entry: &CatalogueEntry) -> String {
    let title = entry.title.as_deref().map(cell).unwrap_or_else(dash);
    let variables = if entry.variables.is_empty() {
        dash()
    } else {
        entry.variables.join(", ")
    };
    let dimensions = if entry.dimensions.is_empty() {
        dash()
    } else {
        entry
            .dimensions
            .iter()
            .map(|(name, size)| format!("{name}={size}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let coverage = match (&entry.time_coverage_start, &entry.time_coverage_end) {
        (Some(start), Some(end)) => format!("{start} / {end}"),
        (Some(start), None) => format!("{start} / -"),
        (None, Some(end)) => format!("- / {end}"),
        (None, None) => dash(),
    };
    let bbox = entry
        .bbox
        .map(|[lon_min, lat_min, lon_max, lat_max]| {
            format!("{lon_min:.4}, {lat_min:.4}, {lon_max:.4}, {lat_max:.4}")
        })
        .unwrap_or_else(dash);

    format!(
        "| [{}]({}) | {} | {} | {} | {} | {} |",
        cell(&entry.name),
        entry.path,
        title,
        variables,
        dimensions,
        coverage,
        bbox
    )
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn dash() -> String {
    "-".to_string()
}
