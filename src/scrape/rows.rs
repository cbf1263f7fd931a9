// Row mapping: table cell text to ShowingRow.

use crate::showing::ShowingRow;

/// Rows with fewer cells than this are incomplete and skipped.
pub const MIN_CELLS: usize = 4;

/// Map body rows positionally to `name, occurs_at, feedback, source`.
///
/// Short rows are dropped, as are spacer rows where both name and date are
/// blank. Extra trailing cells are ignored. Table order is preserved.
pub fn parse_rows(rows: &[Vec<String>]) -> Vec<ShowingRow> {
    rows.iter()
        .filter(|cells| cells.len() >= MIN_CELLS)
        .map(|cells| ShowingRow::new(&cells[0], &cells[1], &cells[2], &cells[3]))
        .filter(|row| !(row.name.is_empty() && row.occurs_at.is_empty()))
        .collect()
}
