//! Table output formatting

use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

const EMPTY: &str = "No apps found.";

/// Rounded table for humans
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    if data.is_empty() {
        return EMPTY.to_string();
    }

    let mut table = Table::new(data);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

/// Borderless table, one row per line, for piping into other tools
pub fn format_plain<T: Tabled>(data: &[T]) -> String {
    if data.is_empty() {
        return EMPTY.to_string();
    }

    let mut table = Table::new(data);
    table.with(Style::blank());
    table.to_string()
}
