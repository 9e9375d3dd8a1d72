use std::fmt;

use serde::{Deserialize, Serialize};

/// Tabular query output: one named column per projected variable, row values
/// rendered as plain strings (bare IRIs, literal lexical forms).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// True when the query bound no rows at all. Surfaces report this
    /// distinctly ("no data retrieved"), not as an error.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Plain-text rendering with aligned columns, for terminals.
    pub fn render_text(&self) -> String {
        if self.columns.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(flatten(cell).chars().count());
                }
            }
        }

        let mut out = String::new();
        render_row(&mut out, &self.columns, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        render_row(&mut out, &rule, &widths);
        for row in &self.rows {
            let cells: Vec<String> = (0..self.columns.len())
                .map(|i| flatten(row.get(i).map(String::as_str).unwrap_or("")))
                .collect();
            render_row(&mut out, &cells, &widths);
        }
        out
    }
}

fn render_row<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize]) {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        let cell = cell.as_ref();
        line.push_str(cell);
        let pad = widths.get(i).copied().unwrap_or(0).saturating_sub(cell.chars().count());
        line.push_str(&" ".repeat(pad));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

// Literals may embed newlines; keep every value on its row.
fn flatten(cell: &str) -> String {
    cell.replace(['\n', '\r'], " ")
}

impl fmt::Display for QueryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_text())
    }
}
