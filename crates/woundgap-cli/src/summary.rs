use std::path::PathBuf;

use console::Style;
use woundgap_core::pipeline::AnalysisConfig;
use woundgap_core::report::{BatchSummary, Cell, ResultsTable};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    error: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            error: Style::new().red(),
            path: Style::new().underlined(),
        }
    }
}

/// Longest error message shown in the console table; files get the full text.
const MAX_ERROR_WIDTH: usize = 60;

pub fn print_analysis_header(inputs: &[PathBuf], config: &AnalysisConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Wound Gap Analysis"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(18)));
    println!();
    for input in inputs {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Input"),
            s.path.apply_to(input.display())
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Radius"),
        s.value.apply_to(config.entropy_radius)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Bins"),
        s.value.apply_to(config.histogram_bins)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("ND2 planes"),
        s.value.apply_to(format!("{:?}", config.planes))
    );
    if let Some(ref dir) = config.mask_dir {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Masks"),
            s.path.apply_to(dir.display())
        );
    }
    println!();
}

pub fn print_results_table(table: &ResultsTable) {
    let s = Styles::new();
    if table.is_empty() {
        println!("  {}", s.label.apply_to("No results"));
        return;
    }

    let rendered: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(render_cell).collect())
        .collect();
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            rendered
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, &w)| format!("{:<w$}", name))
        .collect();
    println!("  {}", s.header.apply_to(header.join("  ")));

    for (row, cells) in table.rows.iter().zip(&rendered) {
        let line: Vec<String> = row
            .iter()
            .zip(cells)
            .zip(&widths)
            .map(|((cell, text), &w)| match cell {
                Cell::Int(_) | Cell::Float(_) => format!("{:>w$}", text),
                _ => format!("{:<w$}", text),
            })
            .collect();
        let line = line.join("  ");
        if matches!(row.last(), Some(Cell::Text(_))) {
            println!("  {}", s.error.apply_to(line));
        } else {
            println!("  {}", line);
        }
    }
    println!();
}

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Float(v) => format!("{v:.2}"),
        Cell::Text(t) if t.chars().count() > MAX_ERROR_WIDTH => {
            let cut: String = t.chars().take(MAX_ERROR_WIDTH - 3).collect();
            format!("{cut}...")
        }
        other => other.to_string(),
    }
}

pub fn print_batch_summary(summary: &BatchSummary) {
    let s = Styles::new();

    println!("  {}", s.header.apply_to("Summary"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Sources"),
        s.value.apply_to(summary.sources)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Measured"),
        s.value.apply_to(summary.measured)
    );
    let failed = if summary.failed > 0 {
        s.error.apply_to(summary.failed.to_string())
    } else {
        s.value.apply_to(summary.failed.to_string())
    };
    println!("    {:<12}{}", s.label.apply_to("Failed"), failed);

    if let (Some(mean), Some(min), Some(max)) = (
        summary.mean_percentage,
        summary.min_percentage,
        summary.max_percentage,
    ) {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Mean"),
            s.value.apply_to(format!("{mean:.2}%"))
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("Range"),
            s.value.apply_to(format!("{min:.2}% - {max:.2}%"))
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_errors_are_truncated() {
        let long = Cell::Text("x".repeat(100));
        let rendered = render_cell(&long);
        assert_eq!(rendered.chars().count(), MAX_ERROR_WIDTH);
        assert!(rendered.ends_with("..."));
    }

    #[test]
    fn test_floats_use_two_decimals() {
        assert_eq!(render_cell(&Cell::Float(12.3456)), "12.35");
    }
}
