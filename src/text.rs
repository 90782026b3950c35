use crate::group::GroupId;
use crate::reconcile::AnnotatedTable;
use crate::session::PreservationReport;
use std::fmt::Write;
use unicode_width::UnicodeWidthStr;

/// Plain-text grid renderer. Plaque cells get their RIC value appended.
pub struct TextRenderer {
    pub padding: usize,
    pub precision: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            padding: 1,
            precision: 2,
        }
    }
}

impl TextRenderer {
    /// Display width in terminal columns; full-width characters count 2.
    pub fn text_width(&self, text: &str) -> usize {
        UnicodeWidthStr::width(text)
    }

    fn pad(&self, text: &str, width: usize) -> String {
        let fill = width.saturating_sub(self.text_width(text));
        format!(
            "{}{}{}{}",
            " ".repeat(self.padding),
            text,
            " ".repeat(fill),
            " ".repeat(self.padding)
        )
    }

    fn rule(&self, widths: &[usize]) -> String {
        let mut line = String::from("+");
        for w in widths {
            line.push_str(&"-".repeat(w + self.padding * 2));
            line.push('+');
        }
        line
    }

    pub fn render_table(&self, table: &AnnotatedTable) -> String {
        let header: Vec<String> = table.columns.iter().map(|c| (c + 1).to_string()).collect();
        let body: Vec<Vec<String>> = table
            .rows
            .iter()
            .map(|row| {
                row.cells
                    .iter()
                    .map(|cell| match (cell.shade.is_plaque(), cell.ric) {
                        (true, Some(ric)) => {
                            format!("{} ({:.*})", cell.value, self.precision, ric)
                        }
                        _ => cell.value.clone(),
                    })
                    .collect()
            })
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|h| self.text_width(h)).collect();
        for row in &body {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(self.text_width(cell));
                }
            }
        }

        let rule = self.rule(&widths);
        let mut out = String::new();
        writeln!(&mut out, "{rule}").unwrap();
        writeln!(&mut out, "{}", self.line(&header, &widths)).unwrap();
        writeln!(&mut out, "{rule}").unwrap();
        for row in &body {
            writeln!(&mut out, "{}", self.line(row, &widths)).unwrap();
        }
        writeln!(&mut out, "{rule}").unwrap();
        out
    }

    fn line(&self, cells: &[String], widths: &[usize]) -> String {
        let mut line = String::from("|");
        for (cell, &w) in cells.iter().zip(widths) {
            line.push_str(&self.pad(cell, w));
            line.push('|');
        }
        line
    }

    pub fn render_fds(&self, fds: &[(GroupId, Vec<String>)]) -> String {
        let mut out = String::new();
        for (id, list) in fds {
            writeln!(&mut out, "Table {id}:").unwrap();
            if list.is_empty() {
                writeln!(&mut out, "  No FDs").unwrap();
            }
            for fd in list {
                writeln!(&mut out, "  {fd}").unwrap();
            }
        }
        out
    }

    pub fn render_report(&self, report: &PreservationReport) -> String {
        let mut out = String::new();
        for (_, message) in report.messages() {
            writeln!(&mut out, "{message}").unwrap();
        }
        out
    }

    pub fn render_page(
        &self,
        original: &AnnotatedTable,
        tables: &[AnnotatedTable],
        report: Option<&PreservationReport>,
    ) -> String {
        let mut out = String::new();
        writeln!(&mut out, "Original table").unwrap();
        out.push_str(&self.render_table(original));
        for table in tables {
            let id = table.group.map(|g| g.to_string()).unwrap_or_default();
            writeln!(&mut out, "\nTable {id}").unwrap();
            out.push_str(&self.render_table(table));
        }
        if let Some(report) = report {
            writeln!(&mut out).unwrap();
            out.push_str(&self.render_report(report));
        }
        out
    }
}
