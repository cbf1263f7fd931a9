// Showing rows: one extracted line of the activity table.
//
// A row lives for exactly one poll cycle. The only thing that outlives the
// cycle is its fingerprint, which the seen-set store keeps forever.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One showing scraped from the activity table.
///
/// Fields are trimmed on construction. `occurs_at` is kept as the site's own
/// text: its format is not stable enough to parse into a calendar type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowingRow {
    pub name: String,
    pub occurs_at: String,
    pub feedback: String,
    pub source: String,
}

impl ShowingRow {
    pub fn new(
        name: impl AsRef<str>,
        occurs_at: impl AsRef<str>,
        feedback: impl AsRef<str>,
        source: impl AsRef<str>,
    ) -> Self {
        Self {
            name: name.as_ref().trim().to_string(),
            occurs_at: occurs_at.as_ref().trim().to_string(),
            feedback: feedback.as_ref().trim().to_string(),
            source: source.as_ref().trim().to_string(),
        }
    }

    /// Identity key: `name|occurs_at|source`, each part trimmed.
    ///
    /// Feedback is not part of the key: an agent editing their feedback
    /// after the fact does not re-trigger an alert.
    pub fn fingerprint(&self) -> String {
        [
            self.name.trim(),
            self.occurs_at.trim(),
            self.source.trim(),
        ]
        .join("|")
    }

    /// Short form used by push messages: `name | occurs_at | source`.
    pub fn summary_line(&self) -> String {
        format!("{} | {} | {}", self.name, self.occurs_at, self.source)
    }
}

impl fmt::Display for ShowingRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {}",
            self.name.trim(),
            self.occurs_at.trim(),
            self.feedback.trim(),
            self.source.trim()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_every_field() {
        let row = ShowingRow::new("  Jane Doe ", "\tMay 4, 10:00 AM\n", " ", " Zillow ");
        assert_eq!(row.name, "Jane Doe");
        assert_eq!(row.occurs_at, "May 4, 10:00 AM");
        assert_eq!(row.feedback, "");
        assert_eq!(row.source, "Zillow");
    }

    #[test]
    fn display_includes_feedback() {
        let row = ShowingRow::new("Jane", "May 4", "Loved it", "Zillow");
        assert_eq!(row.to_string(), "Jane | May 4 | Loved it | Zillow");
        assert_eq!(row.summary_line(), "Jane | May 4 | Zillow");
    }

    #[test]
    fn fingerprint_uses_pipe_separator() {
        let row = ShowingRow::new("Jane", "May 4", "", "Zillow");
        assert_eq!(row.fingerprint(), "Jane|May 4|Zillow");
    }
}
