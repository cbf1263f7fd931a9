// Table selectors: the two-tier strategy for finding the showings table.
//
// The markup is third-party and drifts. The strict tier wants all three of
// Name / Showing / Source in the header row; the fallback only wants a
// "Showing" header, trading precision for still getting rows (and a warning)
// when a column is renamed or dropped.

use super::traits::TableSnapshot;

/// A header-based table selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSelector {
    /// Tier name, for logs.
    pub label: &'static str,
    /// Every label must appear in at least one header cell.
    pub required_headers: &'static [&'static str],
}

pub const STRICT: TableSelector = TableSelector {
    label: "strict",
    required_headers: &["Name", "Showing", "Source"],
};

pub const FALLBACK: TableSelector = TableSelector {
    label: "fallback",
    required_headers: &["Showing"],
};

impl TableSelector {
    /// A header cell matches a label when its whitespace-normalized text
    /// contains the label, ignoring case. Column position is irrelevant.
    pub fn matches(&self, headers: &[String]) -> bool {
        let normalized: Vec<String> = headers.iter().map(|h| normalize(h)).collect();
        self.required_headers.iter().all(|label| {
            let label = label.to_lowercase();
            normalized.iter().any(|h| h.contains(&label))
        })
    }

    /// First matching table in document order.
    pub fn find<'a>(&self, tables: &'a [TableSnapshot]) -> Option<&'a TableSnapshot> {
        tables.iter().find(|t| self.matches(&t.headers))
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
