use std::io::{self, Write};

const COLUMN_GAP: &str = "  ";

/// Render a header row and data rows as aligned, left-justified columns.
///
/// Each column is as wide as its longest cell (header included), columns are
/// separated by two spaces, a dashed rule follows the header and a blank line
/// ends the table. Missing cells render empty; cells past the header count are
/// dropped.
pub fn render_table<S: AsRef<str>>(headers: &[S], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| cell_width(h.as_ref())).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell_width(cell));
        }
    }

    let mut out = String::new();
    push_row(&mut out, &widths, headers.iter().map(|h| h.as_ref()));

    let rule = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("--");
    out.push_str(&rule);
    out.push('\n');

    for row in rows {
        push_row(&mut out, &widths, row.iter().map(String::as_str));
    }
    out.push('\n');
    out
}

/// Write a rendered table to `out`.
pub fn print_table<W: Write, S: AsRef<str>>(
    out: &mut W,
    headers: &[S],
    rows: &[Vec<String>],
) -> io::Result<()> {
    out.write_all(render_table(headers, rows).as_bytes())
}

fn push_row<'a>(out: &mut String, widths: &[usize], cells: impl Iterator<Item = &'a str>) {
    let mut cells = cells;
    let line = widths
        .iter()
        .map(|width| {
            let cell = cells.next().unwrap_or("");
            let pad = width.saturating_sub(cell_width(cell));
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    out.push_str(&line);
    out.push('\n');
}

fn cell_width(cell: &str) -> usize {
    cell.chars().count()
}
