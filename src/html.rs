use crate::group::GroupId;
use crate::reconcile::AnnotatedTable;
use crate::session::{PreservationReport, Severity};
use crate::shade::ShadePalette;
use std::fmt::Write;

/// Renders annotated tables as HTML fragments. Header cells carry the
/// 0-based original index in `data-orig-idx` and show it 1-based.
pub struct HtmlRenderer {
    palette: ShadePalette,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self {
            palette: ShadePalette::default(),
        }
    }
}

impl HtmlRenderer {
    pub fn new(palette: ShadePalette) -> Self {
        Self { palette }
    }

    pub fn render_table(&self, table: &AnnotatedTable) -> String {
        let mut html = String::new();

        match table.group {
            Some(id) => {
                writeln!(&mut html, r#"<table class="data-grid" data-group="{id}">"#).unwrap()
            }
            None => writeln!(&mut html, r#"<table class="data-grid original">"#).unwrap(),
        }

        // Header
        write!(&mut html, "<thead><tr>").unwrap();
        for &column in &table.columns {
            write!(&mut html, r#"<th data-orig-idx="{}">{}</th>"#, column, column + 1).unwrap();
        }
        writeln!(&mut html, "</tr></thead>").unwrap();

        // Body
        writeln!(&mut html, "<tbody>").unwrap();
        for row in &table.rows {
            write!(&mut html, "<tr>").unwrap();
            for cell in &row.cells {
                let background = self.palette.css(cell.shade);
                if cell.shade.is_plaque() {
                    write!(
                        &mut html,
                        r#"<td class="plaque-cell" style="background-color: {};">{}</td>"#,
                        background,
                        escape_html(&cell.value)
                    )
                    .unwrap();
                } else {
                    write!(
                        &mut html,
                        r#"<td style="background-color: {};">{}</td>"#,
                        background,
                        escape_html(&cell.value)
                    )
                    .unwrap();
                }
            }
            writeln!(&mut html, "</tr>").unwrap();
        }
        writeln!(&mut html, "</tbody>").unwrap();
        writeln!(&mut html, "</table>").unwrap();
        html
    }

    /// One list per group; "No FDs" for an empty cache.
    pub fn render_fds(&self, fds: &[(GroupId, Vec<String>)]) -> String {
        let mut html = String::new();
        for (id, list) in fds {
            writeln!(&mut html, r#"<div class="fd-list" data-group="{id}">"#).unwrap();
            writeln!(&mut html, "<h4>Table {id}</h4>").unwrap();
            if list.is_empty() {
                writeln!(&mut html, "<p>No FDs</p>").unwrap();
            } else {
                writeln!(&mut html, "<ul>").unwrap();
                for fd in list {
                    writeln!(&mut html, "<li>{}</li>", escape_html(fd)).unwrap();
                }
                writeln!(&mut html, "</ul>").unwrap();
            }
            writeln!(&mut html, "</div>").unwrap();
        }
        html
    }

    pub fn render_report(&self, report: &PreservationReport) -> String {
        let mut html = String::new();
        for (severity, message) in report.messages() {
            let class = match severity {
                Severity::Ok => "ok",
                Severity::Warning => "warning",
                Severity::Error => "error",
            };
            writeln!(&mut html, r#"<p class="{class}">{message}</p>"#).unwrap();
        }
        html
    }

    /// Original table, then every group, then the report if there is one.
    pub fn render_page(
        &self,
        original: &AnnotatedTable,
        tables: &[AnnotatedTable],
        report: Option<&PreservationReport>,
    ) -> String {
        let mut html = String::new();
        writeln!(&mut html, r#"<section class="original-table">"#).unwrap();
        html.push_str(&self.render_table(original));
        writeln!(&mut html, "</section>").unwrap();

        for table in tables {
            let id = table.group.map(|g| g.to_string()).unwrap_or_default();
            writeln!(&mut html, r#"<section class="decomposed-table" id="table-{id}">"#).unwrap();
            writeln!(&mut html, "<h3>Table {id}</h3>").unwrap();
            html.push_str(&self.render_table(table));
            writeln!(&mut html, "</section>").unwrap();
        }

        if let Some(report) = report {
            writeln!(&mut html, r#"<section class="preservation">"#).unwrap();
            html.push_str(&self.render_report(report));
            writeln!(&mut html, "</section>").unwrap();
        }
        html
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
