use cadence_core::expander::OccurrenceSpan;
use cadence_core::models::{DateRecord, Occurrence};
use comfy_table::{Attribute, Cell, Row, Table};

pub fn display_dates(dates: &[DateRecord]) {
    if dates.is_empty() {
        println!("No date records found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Start", "End", "All day", "Rule", "Order"]);

    for date in dates {
        let mut row = Row::new();
        row.add_cell(Cell::new(&date.id.to_string()[..8]));
        row.add_cell(Cell::new(date.start_at.format("%Y-%m-%d %H:%M").to_string()));
        row.add_cell(Cell::new(date.end_at.format("%Y-%m-%d %H:%M").to_string()));
        row.add_cell(Cell::new(if date.all_day { "yes" } else { "" }));

        let rule = date
            .rrule
            .as_ref()
            .map(|r| r.encode())
            .unwrap_or_default();
        row.add_cell(Cell::new(rule));
        row.add_cell(Cell::new(date.sort_order.to_string()));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_occurrences(occurrences: &[Occurrence]) {
    if occurrences.is_empty() {
        println!("No occurrences found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Start", "End", "All day", "First"]);

    for occurrence in occurrences {
        let mut row = Row::new();
        let mut start_cell = Cell::new(occurrence.start_at.format("%Y-%m-%d %H:%M").to_string());
        if occurrence.is_first {
            start_cell = start_cell.add_attribute(Attribute::Bold);
        }
        row.add_cell(start_cell);
        row.add_cell(Cell::new(occurrence.end_at.format("%Y-%m-%d %H:%M").to_string()));
        row.add_cell(Cell::new(if occurrence.all_day { "yes" } else { "" }));
        row.add_cell(Cell::new(if occurrence.is_first { "•" } else { "" }));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_spans(spans: &[OccurrenceSpan]) {
    if spans.is_empty() {
        println!("The rule generates no occurrences beyond its anchor.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Start", "End"]);

    for (index, span) in spans.iter().enumerate() {
        table.add_row(vec![
            Cell::new((index + 1).to_string()),
            Cell::new(span.start.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(span.end.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }

    println!("{table}");
}
